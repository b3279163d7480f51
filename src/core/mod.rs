//! Core indexing logic.
//!
//! This module contains:
//! - Signature: canonical rule identity derivation
//! - Params: parameter encoding
//! - Resolver: entity get-or-create
//! - Binder: idempotent relation binding
//! - Indexer: the orchestrator driving a full run

pub mod binder;
pub mod indexer;
pub mod params;
pub mod resolver;
pub mod signature;

// Re-export commonly used types
pub use binder::RelationBinder;
pub use indexer::{IndexSummary, Indexer};
pub use params::encode_parameters;
pub use resolver::EntityResolver;
pub use signature::RuleSignature;
