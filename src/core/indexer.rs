//! Orchestration of a full indexing run.
//!
//! Drives the resolver and binder over a validated choreography in
//! document order: event types, rule, trigger, relations per trigger, then
//! trigger chains from `depends_on` and the legacy links list. Fail-fast:
//! the first failure aborts the run with context, and nothing created so
//! far is rolled back. Re-running the same document is safe because every
//! resolve and bind is idempotent.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{ChainMeta, Registry};
use crate::core::binder::RelationBinder;
use crate::core::params::encode_parameters;
use crate::core::resolver::EntityResolver;
use crate::core::signature::RuleSignature;
use crate::domain::ChoreographySpec;

/// Outcome of one indexing run: the id every entity resolved to
#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    /// Event type name → id
    pub event_types: BTreeMap<String, String>,

    /// Trigger name → id
    pub triggers: BTreeMap<String, String>,

    /// Rule signature string → id
    pub rules: BTreeMap<String, String>,

    /// Chain edges ensured (depends_on edges + legacy link edges)
    pub links_count: usize,

    /// When the run finished
    pub indexed_at: DateTime<Utc>,
}

/// Indexing orchestrator
pub struct Indexer {
    registry: Arc<dyn Registry>,
}

impl Indexer {
    /// Create an indexer over a registry
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    /// Index a choreography YAML file
    pub async fn index_from_file(&self, path: &Path) -> Result<IndexSummary> {
        let spec = ChoreographySpec::from_file(path)?;
        self.index(&spec).await
    }

    /// Index choreography YAML text
    pub async fn index_from_yaml(&self, content: &str) -> Result<IndexSummary> {
        let spec = ChoreographySpec::from_yaml(content)?;
        self.index(&spec).await
    }

    /// Index a parsed choreography.
    ///
    /// Validates the document first; no registry call happens for an
    /// invalid document.
    #[instrument(skip(self, spec))]
    pub async fn index(&self, spec: &ChoreographySpec) -> Result<IndexSummary> {
        spec.validate()?;

        let run_id = Uuid::new_v4();
        info!(%run_id, triggers = spec.triggers.len(), "Starting indexing run");

        let resolver = EntityResolver::new(self.registry.as_ref());
        let binder = RelationBinder::new(self.registry.as_ref());

        let mut event_type_ids: BTreeMap<String, String> = BTreeMap::new();
        let mut trigger_ids: BTreeMap<String, String> = BTreeMap::new();
        let mut rule_ids: BTreeMap<String, String> = BTreeMap::new();

        for trigger in &spec.triggers {
            // Event types: the explicit list, or the trigger's own name
            let mut resolved_event_types = Vec::new();
            for name in trigger.event_type_names() {
                let id = resolver.resolve_event_type(name).await.with_context(|| {
                    format!("Indexing trigger '{}': event type resolution failed", trigger.name)
                })?;
                event_type_ids.insert(name.to_string(), id.clone());
                resolved_event_types.push(id);
            }

            // Rule: canonical signature + encoded parameters
            let signature = RuleSignature::derive(&trigger.rule.target)?;
            let parameters = encode_parameters(&trigger.rule.parameters);
            let rule_id = resolver
                .resolve_rule(&signature, &parameters)
                .await
                .with_context(|| {
                    format!("Indexing trigger '{}': rule resolution failed", trigger.name)
                })?;
            rule_ids.insert(signature.key.clone(), rule_id.clone());

            // The trigger itself, carrying depends_on into its payload
            let trigger_id = resolver.resolve_trigger(trigger).await.with_context(|| {
                format!("Indexing trigger '{}': trigger resolution failed", trigger.name)
            })?;
            trigger_ids.insert(trigger.name.clone(), trigger_id.clone());

            binder
                .ensure_trigger_rule(&trigger_id, &rule_id)
                .await
                .with_context(|| {
                    format!("Indexing trigger '{}': rule binding failed", trigger.name)
                })?;

            for event_type_id in &resolved_event_types {
                binder
                    .ensure_event_type_trigger(event_type_id, &trigger_id)
                    .await
                    .with_context(|| {
                        format!("Indexing trigger '{}': event type binding failed", trigger.name)
                    })?;
            }

            info!(trigger = %trigger.name, "Trigger indexed");
        }

        // Chain edges from depends_on: the dependency is the parent, the
        // dependent trigger the child
        let mut links_count = 0;
        for trigger in &spec.triggers {
            let parent_name = match trigger.depends_on.as_deref() {
                Some(name) => name,
                None => continue,
            };

            match (trigger_ids.get(parent_name), trigger_ids.get(&trigger.name)) {
                (Some(parent_id), Some(child_id)) => {
                    binder
                        .ensure_trigger_chain(parent_id, child_id, None)
                        .await
                        .with_context(|| {
                            format!(
                                "Chaining trigger '{}' under dependency '{}' failed",
                                trigger.name, parent_name
                            )
                        })?;
                    links_count += 1;
                }
                _ => {
                    warn!(
                        trigger = %trigger.name,
                        depends_on = parent_name,
                        "Dependency not resolved in this run; skipping chain edge"
                    );
                }
            }
        }

        // Legacy links feed the same chain sink; binder idempotence
        // deduplicates edges that depends_on already produced
        for link in &spec.links {
            match (trigger_ids.get(&link.from), trigger_ids.get(&link.to)) {
                (Some(parent_id), Some(child_id)) => {
                    let meta = ChainMeta {
                        order: link.order,
                        condition: link.condition.clone(),
                    };
                    binder
                        .ensure_trigger_chain(parent_id, child_id, Some(&meta))
                        .await
                        .with_context(|| {
                            format!("Linking trigger '{}' to '{}' failed", link.from, link.to)
                        })?;
                    links_count += 1;
                }
                _ => {
                    warn!(from = %link.from, to = %link.to, "Link endpoints unknown; skipping");
                }
            }
        }

        let summary = IndexSummary {
            event_types: event_type_ids,
            triggers: trigger_ids,
            rules: rule_ids,
            links_count,
            indexed_at: Utc::now(),
        };

        info!(
            %run_id,
            event_types = summary.event_types.len(),
            triggers = summary.triggers.len(),
            rules = summary.rules.len(),
            links = summary.links_count,
            "Indexing run complete"
        );

        Ok(summary)
    }
}
