//! Choreography document model and validation.
//!
//! Choreographies are defined in YAML: a list of triggers, the rule each
//! trigger invokes, the event types that fire it, and optional chaining
//! between triggers (`depends_on` on a trigger, or the legacy `links` list).

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for a choreography document.
///
/// All of these are detected before any registry call is made.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("Choreography must contain at least one trigger")]
    EmptyTriggers,

    #[error("Duplicate trigger name: '{0}'")]
    DuplicateTrigger(String),

    #[error("Target requires 'alias' or ('bucket_id' and 'key')")]
    InvalidTarget,

    #[error("Trigger '{trigger}': target requires 'alias' or ('bucket_id' and 'key')")]
    MissingTarget { trigger: String },

    #[error("Trigger '{trigger}': target must use 'alias' or ('bucket_id' and 'key'), not both")]
    AmbiguousTarget { trigger: String },

    #[error("Trigger '{trigger}': 'bucket_id' and 'key' must be set together")]
    PartialBucketKey { trigger: String },

    #[error("Trigger '{trigger}': provide at least one of 'parameters.init' or 'parameters.call'")]
    EmptyParameters { trigger: String },

    #[error("Trigger '{trigger}': parameter '{parameter}' requires 'ref'/'$ref' or 'value'")]
    EmptyReference { trigger: String, parameter: String },

    #[error("Trigger '{trigger}': parameter '{parameter}' has a malformed 'ref'/'$ref' (must be a string)")]
    MalformedReference { trigger: String, parameter: String },
}

/// Root of a choreography document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoreographySpec {
    /// Optional policy this choreography belongs to
    #[serde(default)]
    pub policy_id: Option<String>,

    /// Optional document version
    #[serde(default)]
    pub version: Option<String>,

    /// Triggers in document order (must not be empty)
    pub triggers: Vec<TriggerSpec>,

    /// Legacy trigger-to-trigger chaining definitions
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

impl ChoreographySpec {
    /// Load a choreography from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read choreography file: {}", path.display()))?;

        Self::from_yaml(&content)
    }

    /// Parse a choreography from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse choreography YAML")
    }

    /// Validate the whole document.
    ///
    /// Checks the trigger list, name uniqueness, every rule target, and
    /// every parameter value. Runs before any network traffic.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.triggers.is_empty() {
            return Err(SpecError::EmptyTriggers);
        }

        let mut seen: HashSet<&str> = HashSet::new();

        for trigger in &self.triggers {
            if !seen.insert(trigger.name.as_str()) {
                return Err(SpecError::DuplicateTrigger(trigger.name.clone()));
            }

            trigger.rule.target.validate(&trigger.name)?;
            trigger.rule.parameters.validate(&trigger.name)?;
        }

        Ok(())
    }
}

/// A trigger definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// Trigger name (unique within the document)
    pub name: String,

    /// Name of another trigger this one depends on (parent → child edge)
    #[serde(default)]
    pub depends_on: Option<String>,

    /// Rule to execute when the trigger fires
    pub rule: RuleSpec,

    /// Event type names to bind; if empty, `name` is used as the sole event type
    #[serde(default)]
    pub event_types: Vec<String>,
}

impl TriggerSpec {
    /// Event type names this trigger binds to
    pub fn event_type_names(&self) -> Vec<&str> {
        if self.event_types.is_empty() {
            vec![self.name.as_str()]
        } else {
            self.event_types.iter().map(String::as_str).collect()
        }
    }
}

/// A rule reference: invocation target plus parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Invocation target identity
    pub target: TargetSpec,

    /// Parameters, split into constructor-time and call-time blocks
    pub parameters: ParametersSpec,
}

/// Identifies the invocation target of a rule.
///
/// Exactly one of two forms must be present:
/// - alias: `"artifact.method"` (a dotless alias leaves the method to the
///   runner's `"run"` convention)
/// - persisted object: `bucket_id` + `key`, with an optional explicit `method`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetSpec {
    #[serde(default)]
    pub alias: Option<String>,

    #[serde(default)]
    pub bucket_id: Option<String>,

    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub method: Option<String>,
}

impl TargetSpec {
    /// True when the alias form is in use (non-empty alias)
    pub fn has_alias(&self) -> bool {
        self.alias.as_deref().map_or(false, |a| !a.is_empty())
    }

    fn validate(&self, trigger: &str) -> Result<(), SpecError> {
        let has_bucket = self.bucket_id.as_deref().map_or(false, |b| !b.is_empty());
        let has_key = self.key.as_deref().map_or(false, |k| !k.is_empty());

        if self.has_alias() {
            if has_bucket || has_key {
                return Err(SpecError::AmbiguousTarget {
                    trigger: trigger.to_string(),
                });
            }
            return Ok(());
        }

        match (has_bucket, has_key) {
            (true, true) => Ok(()),
            (false, false) => Err(SpecError::MissingTarget {
                trigger: trigger.to_string(),
            }),
            _ => Err(SpecError::PartialBucketKey {
                trigger: trigger.to_string(),
            }),
        }
    }
}

/// Split parameters for a rule.
///
/// `init` holds constructor-time arguments, `call` arguments for the
/// selected method. At least one block must be non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParametersSpec {
    #[serde(default)]
    pub init: Option<BTreeMap<String, ParamValue>>,

    #[serde(default)]
    pub call: Option<BTreeMap<String, ParamValue>>,
}

impl ParametersSpec {
    fn validate(&self, trigger: &str) -> Result<(), SpecError> {
        let has_init = self.init.as_ref().map_or(false, |m| !m.is_empty());
        let has_call = self.call.as_ref().map_or(false, |m| !m.is_empty());

        if !has_init && !has_call {
            return Err(SpecError::EmptyParameters {
                trigger: trigger.to_string(),
            });
        }

        for block in [&self.init, &self.call].into_iter().flatten() {
            for (name, value) in block {
                value.validate(trigger, name)?;
            }
        }

        Ok(())
    }
}

/// A single parameter value: an external reference or a plain literal.
///
/// Deserialization tries the reference form first; mappings carrying keys
/// outside the `RefSpec` field set fall through to `Literal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A reference to externally stored data (with optional metadata)
    Reference(RefSpec),

    /// Any plain scalar, list, or mapping
    Literal(serde_json::Value),
}

impl ParamValue {
    fn validate(&self, trigger: &str, parameter: &str) -> Result<(), SpecError> {
        match self {
            ParamValue::Reference(spec) => {
                if spec.effective_ref().is_none() && spec.value.is_none() {
                    return Err(SpecError::EmptyReference {
                        trigger: trigger.to_string(),
                        parameter: parameter.to_string(),
                    });
                }
                Ok(())
            }
            // A mapping that still carries a ref key failed the RefSpec shape
            // (non-string ref, or junk fields next to it)
            ParamValue::Literal(serde_json::Value::Object(map)) => {
                if map.contains_key("ref") || map.contains_key("$ref") {
                    return Err(SpecError::MalformedReference {
                        trigger: trigger.to_string(),
                        parameter: parameter.to_string(),
                    });
                }
                Ok(())
            }
            ParamValue::Literal(_) => Ok(()),
        }
    }
}

/// A parameter value pointing at externally stored data.
///
/// `ref` and `$ref` are interchangeable on input; at least one of
/// `ref`/`$ref`/`value` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefSpec {
    #[serde(default, rename = "ref")]
    pub r#ref: Option<String>,

    #[serde(default, rename = "$ref")]
    pub dollar_ref: Option<String>,

    #[serde(default)]
    pub value: Option<serde_json::Value>,

    #[serde(default, rename = "type")]
    pub r#type: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl RefSpec {
    /// The effective reference, `ref` winning over `$ref`
    pub fn effective_ref(&self) -> Option<&str> {
        self.r#ref.as_deref().or(self.dollar_ref.as_deref())
    }
}

/// Legacy trigger-to-trigger chaining entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    /// Source (parent) trigger name
    pub from: String,

    /// Destination (child) trigger name
    pub to: String,

    /// Optional execution order (pass-through, no scheduling effect)
    #[serde(default)]
    pub order: Option<i64>,

    /// Optional chaining condition (pass-through)
    #[serde(default)]
    pub condition: Option<String>,
}
