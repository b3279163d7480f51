//! Idempotent relation binding.
//!
//! Each ensure operation checks for the relation via the corresponding
//! list call and links only when missing, so re-running a document never
//! duplicates relations. The caller cannot tell "already existed" from
//! "newly created"; both are success.

use anyhow::{Context, Result};
use tracing::debug;

use crate::adapters::{ChainMeta, Registry};

/// Ensure-relation operations over the registry
pub struct RelationBinder<'a> {
    registry: &'a dyn Registry,
}

impl<'a> RelationBinder<'a> {
    pub fn new(registry: &'a dyn Registry) -> Self {
        Self { registry }
    }

    /// Ensure the event-type ↔ trigger relation
    pub async fn ensure_event_type_trigger(
        &self,
        event_type_id: &str,
        trigger_id: &str,
    ) -> Result<()> {
        let bound = self
            .registry
            .list_triggers_for_event_type(event_type_id)
            .await
            .with_context(|| format!("Failed to list triggers for event type '{}'", event_type_id))?
            .iter()
            .any(|id| id == trigger_id);

        if bound {
            debug!(event_type_id, trigger_id, "Event type already bound to trigger");
            return Ok(());
        }

        self.registry
            .link_trigger_to_event_type(event_type_id, trigger_id)
            .await
            .with_context(|| {
                format!(
                    "Failed to bind trigger '{}' to event type '{}'",
                    trigger_id, event_type_id
                )
            })
    }

    /// Ensure the trigger ↔ rule relation
    pub async fn ensure_trigger_rule(&self, trigger_id: &str, rule_id: &str) -> Result<()> {
        let bound = self
            .registry
            .list_rules_for_trigger(trigger_id)
            .await
            .with_context(|| format!("Failed to list rules for trigger '{}'", trigger_id))?
            .iter()
            .any(|id| id == rule_id);

        if bound {
            debug!(trigger_id, rule_id, "Rule already bound to trigger");
            return Ok(());
        }

        self.registry
            .link_rule_to_trigger(trigger_id, rule_id)
            .await
            .with_context(|| {
                format!("Failed to bind rule '{}' to trigger '{}'", rule_id, trigger_id)
            })
    }

    /// Ensure the parent → child trigger chain relation.
    ///
    /// `meta` carries the legacy link's order/condition when present; it is
    /// stored with the relation but has no scheduling effect.
    pub async fn ensure_trigger_chain(
        &self,
        parent_id: &str,
        child_id: &str,
        meta: Option<&ChainMeta>,
    ) -> Result<()> {
        let bound = self
            .registry
            .list_trigger_children(parent_id)
            .await
            .with_context(|| format!("Failed to list children of trigger '{}'", parent_id))?
            .iter()
            .any(|id| id == child_id);

        if bound {
            debug!(parent_id, child_id, "Trigger chain already present");
            return Ok(());
        }

        self.registry
            .link_trigger_child(parent_id, child_id, meta)
            .await
            .with_context(|| {
                format!(
                    "Failed to chain trigger '{}' under trigger '{}'",
                    child_id, parent_id
                )
            })
    }
}
