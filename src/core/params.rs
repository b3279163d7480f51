//! Parameter normalization for rule creation.
//!
//! Heterogeneous parameter values (literals, external references, nested
//! mappings) are flattened into one serializable schema, split into the
//! `init` and `call` blocks the runner expects. This is a structural
//! transform only; references are not checked for existence.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::domain::{ParamValue, ParametersSpec, RefSpec};

/// Encode both parameter blocks.
///
/// The result carries up to two top-level keys, `"init"` and `"call"`;
/// a block that is empty after encoding is omitted entirely.
pub fn encode_parameters(params: &ParametersSpec) -> Map<String, Value> {
    let mut out = Map::new();

    if let Some(block) = encode_block(params.init.as_ref()) {
        out.insert("init".to_string(), Value::Object(block));
    }
    if let Some(block) = encode_block(params.call.as_ref()) {
        out.insert("call".to_string(), Value::Object(block));
    }

    out
}

fn encode_block(block: Option<&BTreeMap<String, ParamValue>>) -> Option<Map<String, Value>> {
    let block = block?;
    if block.is_empty() {
        return None;
    }

    let mut out = Map::new();
    for (name, value) in block {
        out.insert(name.clone(), encode_value(value));
    }
    Some(out)
}

/// Encode one value, in precedence order: reference, plain mapping, literal.
fn encode_value(value: &ParamValue) -> Value {
    match value {
        ParamValue::Reference(spec) => encode_reference(spec),

        // Plain mapping: copy, dropping null-valued keys
        ParamValue::Literal(Value::Object(map)) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),

        // Any other literal wraps as {"value": ...}
        ParamValue::Literal(other) => {
            let mut wrapped = Map::new();
            wrapped.insert("value".to_string(), other.clone());
            Value::Object(wrapped)
        }
    }
}

/// Serialize a reference keeping only the non-null fields.
///
/// Both input spellings collapse to the `"$ref"` output key.
fn encode_reference(spec: &RefSpec) -> Value {
    let mut out = Map::new();

    if let Some(r) = spec.effective_ref() {
        out.insert("$ref".to_string(), Value::String(r.to_string()));
    }
    if let Some(value) = &spec.value {
        out.insert("value".to_string(), value.clone());
    }
    if let Some(t) = &spec.r#type {
        out.insert("type".to_string(), Value::String(t.clone()));
    }
    if let Some(name) = &spec.name {
        out.insert("name".to_string(), Value::String(name.clone()));
    }
    if let Some(description) = &spec.description {
        out.insert("description".to_string(), Value::String(description.clone()));
    }

    Value::Object(out)
}
