//! Canonical rule identity derived from an invocation target.
//!
//! Two triggers invoking the same target must resolve to the same rule
//! entity in the registry; the signature string is the deduplication key
//! that makes that possible.

use serde_json::{json, Map, Value};

use crate::domain::{SpecError, TargetSpec};

/// Canonical identity of a rule target.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSignature {
    /// Structured form, stored with the rule on creation
    pub fields: Map<String, Value>,

    /// String form, used as the deduplication key
    pub key: String,
}

impl RuleSignature {
    /// Derive the signature for a target.
    ///
    /// - Dotted alias `"a.b.c"`: the segment after the last dot is the
    ///   method; key is `"alias:a.b.c#c"`.
    /// - Dotless alias `"x"`: key is `"alias:x"`, no method field. Callers
    ///   must not assume a default method is injected here.
    /// - Persisted form: key is `"persisted:<bucket_id>:<key>"`, with
    ///   `"#<method>"` appended only when a method is given.
    ///
    /// Fails with `SpecError::InvalidTarget` when neither form is present;
    /// unreachable for documents that passed validation.
    pub fn derive(target: &TargetSpec) -> Result<Self, SpecError> {
        if target.has_alias() {
            let alias = target.alias.as_deref().unwrap_or_default();
            let mut fields = Map::new();
            fields.insert("kind".to_string(), json!("alias"));
            fields.insert("alias".to_string(), json!(alias));

            return Ok(match alias.rsplit_once('.') {
                Some((_, method)) => {
                    fields.insert("method".to_string(), json!(method));
                    Self {
                        fields,
                        key: format!("alias:{}#{}", alias, method),
                    }
                }
                None => Self {
                    fields,
                    key: format!("alias:{}", alias),
                },
            });
        }

        match (target.bucket_id.as_deref(), target.key.as_deref()) {
            (Some(bucket_id), Some(key)) if !bucket_id.is_empty() && !key.is_empty() => {
                let mut fields = Map::new();
                fields.insert("kind".to_string(), json!("persisted"));
                fields.insert("bucket_id".to_string(), json!(bucket_id));
                fields.insert("key".to_string(), json!(key));

                let mut signature = format!("persisted:{}:{}", bucket_id, key);
                if let Some(method) = target.method.as_deref() {
                    fields.insert("method".to_string(), json!(method));
                    signature.push('#');
                    signature.push_str(method);
                }

                Ok(Self {
                    fields,
                    key: signature,
                })
            }
            _ => Err(SpecError::InvalidTarget),
        }
    }
}
