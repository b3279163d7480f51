//! chorus - Choreography indexer for a trigger/rule registry
//!
//! Takes a declarative YAML document describing triggers, the rules they
//! invoke, the event types that fire them, and dependency chains between
//! triggers, and materializes it as a consistent graph of entities and
//! relations in an external registry service.
//!
//! # Architecture
//!
//! The indexer only ever uses idempotent primitives:
//! - Entities (event types, rules, triggers) are resolved find-before-create
//! - Relations are ensured: checked via listing, linked only when missing
//!
//! Re-running the same document is therefore safe; idempotence stands in
//! for transactional rollback after a mid-run failure.
//!
//! # Modules
//!
//! - `domain`: the validated choreography document model
//! - `core`: signature derivation, parameter encoding, entity resolution,
//!   relation binding, and the indexing orchestrator
//! - `adapters`: the `Registry` capability trait and its HTTP implementation
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Index a choreography against the registry
//! chorus index choreography.yml
//!
//! # Validate without touching the network
//! chorus validate choreography.yml
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{HttpRegistry, Registry};
pub use core::{IndexSummary, Indexer, RuleSignature};
pub use domain::{
    ChoreographySpec, LinkSpec, ParamValue, ParametersSpec, RefSpec, RuleSpec, SpecError,
    TargetSpec, TriggerSpec,
};
