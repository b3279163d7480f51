//! Get-or-create resolution of registry entities.
//!
//! Every operation follows the same pattern: find by key, return the id if
//! present, otherwise create and return the new id. There is no locking
//! around the find/create pair: two concurrent runs can both miss the find
//! and create duplicate entities. Closing that gap needs a unique
//! constraint in the registry plus create-or-conflict retry, not a
//! client-side check.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::debug;

use crate::adapters::{NewRule, NewTrigger, Registry};
use crate::core::signature::RuleSignature;
use crate::domain::TriggerSpec;

/// Find-before-create resolution against the registry
pub struct EntityResolver<'a> {
    registry: &'a dyn Registry,
}

impl<'a> EntityResolver<'a> {
    pub fn new(registry: &'a dyn Registry) -> Self {
        Self { registry }
    }

    /// Resolve an event type id by name, creating it if absent
    pub async fn resolve_event_type(&self, name: &str) -> Result<String> {
        let found = self
            .registry
            .find_event_type(name)
            .await
            .with_context(|| format!("Failed to look up event type '{}'", name))?;

        if let Some(record) = found {
            debug!(event_type = name, id = %record.id, "Event type found");
            return Ok(record.id);
        }

        let id = self
            .registry
            .create_event_type(name)
            .await
            .with_context(|| format!("Failed to create event type '{}'", name))?;

        debug!(event_type = name, %id, "Event type created");
        Ok(id)
    }

    /// Resolve a rule id by signature, creating it with the encoded
    /// parameter schema if absent
    pub async fn resolve_rule(
        &self,
        signature: &RuleSignature,
        parameters: &Map<String, Value>,
    ) -> Result<String> {
        let found = self
            .registry
            .find_rule(&signature.key)
            .await
            .with_context(|| format!("Failed to look up rule '{}'", signature.key))?;

        if let Some(record) = found {
            debug!(signature = %signature.key, id = %record.id, "Rule found");
            return Ok(record.id);
        }

        let id = self
            .registry
            .create_rule(&NewRule {
                signature: &signature.key,
                target: &signature.fields,
                parameters,
            })
            .await
            .with_context(|| format!("Failed to create rule '{}'", signature.key))?;

        debug!(signature = %signature.key, %id, "Rule created");
        Ok(id)
    }

    /// Resolve a trigger id by name, creating it if absent.
    ///
    /// The creation payload carries `depends_on` so the registry records
    /// the declared dependency alongside the trigger.
    pub async fn resolve_trigger(&self, trigger: &TriggerSpec) -> Result<String> {
        let found = self
            .registry
            .find_trigger(&trigger.name)
            .await
            .with_context(|| format!("Failed to look up trigger '{}'", trigger.name))?;

        if let Some(record) = found {
            debug!(trigger = %trigger.name, id = %record.id, "Trigger found");
            return Ok(record.id);
        }

        let id = self
            .registry
            .create_trigger(&NewTrigger {
                name: &trigger.name,
                depends_on: trigger.depends_on.as_deref(),
            })
            .await
            .with_context(|| format!("Failed to create trigger '{}'", trigger.name))?;

        debug!(trigger = %trigger.name, %id, "Trigger created");
        Ok(id)
    }
}
