//! Adapter interfaces for the external registry service.
//!
//! The indexer consumes the registry through the narrow `Registry` trait;
//! the concrete HTTP transport lives in `http.rs`.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

pub mod http;

// Re-export the HTTP adapter
pub use http::HttpRegistry;

/// An event type as known to the registry
#[derive(Debug, Clone)]
pub struct EventTypeRecord {
    pub id: String,
    pub name: String,
}

/// A rule as known to the registry
#[derive(Debug, Clone)]
pub struct RuleRecord {
    pub id: String,
    pub signature: String,
}

/// A trigger as known to the registry
#[derive(Debug, Clone)]
pub struct TriggerRecord {
    pub id: String,
    pub name: String,
}

/// Creation payload for a rule
#[derive(Debug, Clone, Serialize)]
pub struct NewRule<'a> {
    /// Canonical signature string (deduplication key)
    pub signature: &'a str,

    /// Structured target identity
    pub target: &'a Map<String, Value>,

    /// Encoded parameter schema
    pub parameters: &'a Map<String, Value>,
}

/// Creation payload for a trigger
#[derive(Debug, Clone, Serialize)]
pub struct NewTrigger<'a> {
    pub name: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<&'a str>,
}

/// Optional metadata carried on a trigger chain edge.
///
/// Stored with the relation when present; the registry attaches no
/// scheduling semantics to it today.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChainMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Capability interface over the registry service.
///
/// Find operations return `None` for absent entities; list operations
/// return the related entity ids. All failures surface as errors from the
/// underlying transport.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn find_event_type(&self, name: &str) -> Result<Option<EventTypeRecord>>;
    async fn create_event_type(&self, name: &str) -> Result<String>;

    async fn find_rule(&self, signature: &str) -> Result<Option<RuleRecord>>;
    async fn create_rule(&self, rule: &NewRule<'_>) -> Result<String>;

    async fn find_trigger(&self, name: &str) -> Result<Option<TriggerRecord>>;
    async fn create_trigger(&self, trigger: &NewTrigger<'_>) -> Result<String>;

    async fn list_triggers_for_event_type(&self, event_type_id: &str) -> Result<Vec<String>>;
    async fn link_trigger_to_event_type(&self, event_type_id: &str, trigger_id: &str)
        -> Result<()>;

    async fn list_rules_for_trigger(&self, trigger_id: &str) -> Result<Vec<String>>;
    async fn link_rule_to_trigger(&self, trigger_id: &str, rule_id: &str) -> Result<()>;

    async fn list_trigger_children(&self, parent_id: &str) -> Result<Vec<String>>;
    async fn link_trigger_child(
        &self,
        parent_id: &str,
        child_id: &str,
        meta: Option<&ChainMeta>,
    ) -> Result<()>;
}
