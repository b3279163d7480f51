//! Integration tests for the indexing orchestrator.
//!
//! Drives the full pipeline against an in-memory registry double that
//! behaves like a deduplicating backend: finds scan stored state, creates
//! append entities with generated ids, links append relations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use chorus::adapters::{
    ChainMeta, EventTypeRecord, NewRule, NewTrigger, Registry, RuleRecord, TriggerRecord,
};
use chorus::core::Indexer;
use chorus::domain::SpecError;

/// In-memory registry double
#[derive(Default)]
struct MemoryRegistry {
    state: Mutex<State>,
    /// Round trips performed, across all operations
    calls: AtomicU64,
    /// When set, trigger creation fails (for fail-fast tests)
    fail_trigger_creates: bool,
}

#[derive(Default)]
struct State {
    next_id: u64,
    event_types: Vec<(String, String)>,
    rules: Vec<(String, String)>,
    triggers: Vec<(String, String, Option<String>)>,
    event_type_triggers: Vec<(String, String)>,
    trigger_rules: Vec<(String, String)>,
    trigger_children: Vec<(String, String, Option<i64>)>,
}

impl State {
    fn mint(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

impl MemoryRegistry {
    fn failing_trigger_creates() -> Self {
        Self {
            fail_trigger_creates: true,
            ..Default::default()
        }
    }

    fn call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn find_event_type(&self, name: &str) -> Result<Option<EventTypeRecord>> {
        self.call();
        let state = self.state.lock().unwrap();
        Ok(state
            .event_types
            .iter()
            .find(|(_, n)| n == name)
            .map(|(id, n)| EventTypeRecord {
                id: id.clone(),
                name: n.clone(),
            }))
    }

    async fn create_event_type(&self, name: &str) -> Result<String> {
        self.call();
        let mut state = self.state.lock().unwrap();
        let id = state.mint("et");
        state.event_types.push((id.clone(), name.to_string()));
        Ok(id)
    }

    async fn find_rule(&self, signature: &str) -> Result<Option<RuleRecord>> {
        self.call();
        let state = self.state.lock().unwrap();
        Ok(state
            .rules
            .iter()
            .find(|(_, s)| s == signature)
            .map(|(id, s)| RuleRecord {
                id: id.clone(),
                signature: s.clone(),
            }))
    }

    async fn create_rule(&self, rule: &NewRule<'_>) -> Result<String> {
        self.call();
        let mut state = self.state.lock().unwrap();
        let id = state.mint("rule");
        state.rules.push((id.clone(), rule.signature.to_string()));
        Ok(id)
    }

    async fn find_trigger(&self, name: &str) -> Result<Option<TriggerRecord>> {
        self.call();
        let state = self.state.lock().unwrap();
        Ok(state
            .triggers
            .iter()
            .find(|(_, n, _)| n == name)
            .map(|(id, n, _)| TriggerRecord {
                id: id.clone(),
                name: n.clone(),
            }))
    }

    async fn create_trigger(&self, trigger: &NewTrigger<'_>) -> Result<String> {
        self.call();
        if self.fail_trigger_creates {
            anyhow::bail!("injected failure creating trigger '{}'", trigger.name);
        }
        let mut state = self.state.lock().unwrap();
        let id = state.mint("trig");
        state.triggers.push((
            id.clone(),
            trigger.name.to_string(),
            trigger.depends_on.map(str::to_string),
        ));
        Ok(id)
    }

    async fn list_triggers_for_event_type(&self, event_type_id: &str) -> Result<Vec<String>> {
        self.call();
        let state = self.state.lock().unwrap();
        Ok(state
            .event_type_triggers
            .iter()
            .filter(|(et, _)| et == event_type_id)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn link_trigger_to_event_type(
        &self,
        event_type_id: &str,
        trigger_id: &str,
    ) -> Result<()> {
        self.call();
        let mut state = self.state.lock().unwrap();
        state
            .event_type_triggers
            .push((event_type_id.to_string(), trigger_id.to_string()));
        Ok(())
    }

    async fn list_rules_for_trigger(&self, trigger_id: &str) -> Result<Vec<String>> {
        self.call();
        let state = self.state.lock().unwrap();
        Ok(state
            .trigger_rules
            .iter()
            .filter(|(t, _)| t == trigger_id)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn link_rule_to_trigger(&self, trigger_id: &str, rule_id: &str) -> Result<()> {
        self.call();
        let mut state = self.state.lock().unwrap();
        state
            .trigger_rules
            .push((trigger_id.to_string(), rule_id.to_string()));
        Ok(())
    }

    async fn list_trigger_children(&self, parent_id: &str) -> Result<Vec<String>> {
        self.call();
        let state = self.state.lock().unwrap();
        Ok(state
            .trigger_children
            .iter()
            .filter(|(p, _, _)| p == parent_id)
            .map(|(_, c, _)| c.clone())
            .collect())
    }

    async fn link_trigger_child(
        &self,
        parent_id: &str,
        child_id: &str,
        meta: Option<&ChainMeta>,
    ) -> Result<()> {
        self.call();
        let mut state = self.state.lock().unwrap();
        state.trigger_children.push((
            parent_id.to_string(),
            child_id.to_string(),
            meta.and_then(|m| m.order),
        ));
        Ok(())
    }
}

fn indexer(registry: &Arc<MemoryRegistry>) -> Indexer {
    Indexer::new(registry.clone() as Arc<dyn Registry>)
}

#[tokio::test]
async fn test_single_trigger_document() {
    let registry = Arc::new(MemoryRegistry::default());

    let yaml = r#"
triggers:
  - name: t1
    rule:
      target: { alias: svc.run }
      parameters:
        call: { x: 1 }
"#;
    let summary = indexer(&registry).index_from_yaml(yaml).await.unwrap();

    // The trigger's own name is auto-used as its event type
    assert_eq!(summary.event_types.len(), 1);
    assert!(summary.event_types.contains_key("t1"));
    assert_eq!(summary.triggers.len(), 1);
    assert_eq!(summary.rules.len(), 1);
    assert!(summary.rules.contains_key("alias:svc.run#run"));
    assert_eq!(summary.links_count, 0);

    let state = registry.state.lock().unwrap();
    assert_eq!(state.event_types.len(), 1);
    assert_eq!(state.rules.len(), 1);
    assert_eq!(state.triggers.len(), 1);
    assert_eq!(state.trigger_rules.len(), 1);
    assert_eq!(state.event_type_triggers.len(), 1);
    assert!(state.trigger_children.is_empty());
}

#[tokio::test]
async fn test_shared_target_creates_one_rule() {
    let registry = Arc::new(MemoryRegistry::default());

    let yaml = r#"
triggers:
  - name: first
    rule:
      target: { alias: etl.load }
      parameters:
        call: { x: 1 }
  - name: second
    rule:
      target: { alias: etl.load }
      parameters:
        call: { y: 2 }
"#;
    let summary = indexer(&registry).index_from_yaml(yaml).await.unwrap();

    // Second resolution finds the rule the first one created
    let state = registry.state.lock().unwrap();
    assert_eq!(state.rules.len(), 1);
    assert_eq!(summary.rules.len(), 1);
    assert_eq!(state.trigger_rules.len(), 2);
}

#[tokio::test]
async fn test_depends_on_chain_edge_direction() {
    let registry = Arc::new(MemoryRegistry::default());

    let yaml = r#"
triggers:
  - name: a
    rule:
      target: { alias: first.run }
      parameters:
        call: { x: 1 }
  - name: b
    depends_on: a
    rule:
      target: { alias: second.run }
      parameters:
        call: { x: 1 }
"#;
    let summary = indexer(&registry).index_from_yaml(yaml).await.unwrap();

    assert_eq!(summary.links_count, 1);

    let state = registry.state.lock().unwrap();
    assert_eq!(state.trigger_children.len(), 1);

    // The dependency is the parent, the dependent trigger the child
    let (parent, child, _) = &state.trigger_children[0];
    assert_eq!(parent, &summary.triggers["a"]);
    assert_eq!(child, &summary.triggers["b"]);
}

#[tokio::test]
async fn test_legacy_links_bound_with_metadata() {
    let registry = Arc::new(MemoryRegistry::default());

    let yaml = r#"
triggers:
  - name: a
    rule:
      target: { alias: first.run }
      parameters:
        call: { x: 1 }
  - name: b
    rule:
      target: { alias: second.run }
      parameters:
        call: { x: 1 }

links:
  - from: a
    to: b
    order: 2
  - from: a
    to: missing
"#;
    let summary = indexer(&registry).index_from_yaml(yaml).await.unwrap();

    // The link with an unknown endpoint is skipped, not an error
    assert_eq!(summary.links_count, 1);

    let state = registry.state.lock().unwrap();
    assert_eq!(state.trigger_children.len(), 1);
    assert_eq!(state.trigger_children[0].2, Some(2));
}

#[tokio::test]
async fn test_depends_on_and_link_share_one_edge() {
    let registry = Arc::new(MemoryRegistry::default());

    let yaml = r#"
triggers:
  - name: a
    rule:
      target: { alias: first.run }
      parameters:
        call: { x: 1 }
  - name: b
    depends_on: a
    rule:
      target: { alias: second.run }
      parameters:
        call: { x: 1 }

links:
  - from: a
    to: b
"#;
    let summary = indexer(&registry).index_from_yaml(yaml).await.unwrap();

    // Both producers feed the binder; its existence check keeps one edge
    let state = registry.state.lock().unwrap();
    assert_eq!(state.trigger_children.len(), 1);
    assert_eq!(summary.links_count, 2);
}

#[tokio::test]
async fn test_reindexing_is_idempotent() {
    let registry = Arc::new(MemoryRegistry::default());

    let yaml = r#"
triggers:
  - name: a
    event_types: [file-arrived]
    rule:
      target: { alias: etl.load }
      parameters:
        init:
          source:
            ref: buckets/raw
  - name: b
    depends_on: a
    rule:
      target:
        bucket_id: models
        key: clf
        method: predict
      parameters:
        call: { threshold: 0.5 }
"#;
    let idx = indexer(&registry);

    let first = idx.index_from_yaml(yaml).await.unwrap();
    let second = idx.index_from_yaml(yaml).await.unwrap();

    // Identical identifiers both times
    assert_eq!(first.event_types, second.event_types);
    assert_eq!(first.triggers, second.triggers);
    assert_eq!(first.rules, second.rules);
    assert_eq!(first.links_count, second.links_count);

    // And no duplicate entities or relations
    let state = registry.state.lock().unwrap();
    assert_eq!(state.event_types.len(), 2);
    assert_eq!(state.rules.len(), 2);
    assert_eq!(state.triggers.len(), 2);
    assert_eq!(state.trigger_rules.len(), 2);
    assert_eq!(state.event_type_triggers.len(), 2);
    assert_eq!(state.trigger_children.len(), 1);
}

#[tokio::test]
async fn test_invalid_document_makes_no_network_calls() {
    let registry = Arc::new(MemoryRegistry::default());

    let err = indexer(&registry)
        .index_from_yaml("triggers: []\n")
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<SpecError>(),
        Some(SpecError::EmptyTriggers)
    ));
    assert_eq!(registry.call_count(), 0);
}

#[tokio::test]
async fn test_failure_aborts_run_without_rollback() {
    let registry = Arc::new(MemoryRegistry::failing_trigger_creates());

    let yaml = r#"
triggers:
  - name: doomed
    rule:
      target: { alias: svc.run }
      parameters:
        call: { x: 1 }
  - name: never-reached
    rule:
      target: { alias: other.run }
      parameters:
        call: { x: 1 }
"#;
    let err = indexer(&registry).index_from_yaml(yaml).await.unwrap_err();
    assert!(format!("{:#}", err).contains("doomed"));

    let state = registry.state.lock().unwrap();

    // Entities resolved before the failure stay; nothing later happened
    assert_eq!(state.event_types.len(), 1);
    assert_eq!(state.rules.len(), 1);
    assert!(state.triggers.is_empty());
    assert!(state.trigger_rules.is_empty());
    assert!(state.event_type_triggers.is_empty());
}
