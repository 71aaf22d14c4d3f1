//! JSON-Schema to validator conversion (C6)
//!
//! Translates a recognized subset of JSON Schema into a small runtime
//! [`ValueSchema`] tree. This is intentionally lossy: unknown keywords,
//! `oneOf`/`anyOf`, enums and formats are all dropped. The aggregator is a
//! passthrough and upstreams remain the authority on validation — this
//! converter exists for introspection/documentation, not to gate forwarded
//! calls.

use serde_json::Value;
use std::collections::HashMap;

/// A lossy, structural approximation of a JSON-Schema fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSchema {
    Str,
    Num,
    Int,
    Bool,
    Array(Box<ValueSchema>),
    Object(HashMap<String, ValueSchema>),
    /// Unknown, missing, or unrecognized `type` keyword.
    Any,
}

/// Convert a JSON-Schema object (as emitted by an upstream's `inputSchema`)
/// into a [`ValueSchema`].
pub fn from_json_schema(schema: &Value) -> ValueSchema {
    let Some(obj) = schema.as_object() else {
        return ValueSchema::Any;
    };

    match obj.get("type").and_then(Value::as_str) {
        Some("string") => ValueSchema::Str,
        Some("number") => ValueSchema::Num,
        Some("integer") => ValueSchema::Int,
        Some("boolean") => ValueSchema::Bool,
        Some("array") => {
            let item_schema = obj
                .get("items")
                .and_then(|items| items.get("type"))
                .and_then(Value::as_str);
            let inner = match item_schema {
                Some("string") => ValueSchema::Str,
                Some("number") => ValueSchema::Num,
                Some("integer") => ValueSchema::Int,
                Some("boolean") => ValueSchema::Bool,
                _ => ValueSchema::Any,
            };
            ValueSchema::Array(Box::new(inner))
        }
        Some("object") => {
            if let Some(props) = obj.get("properties").and_then(Value::as_object) {
                let fields = props
                    .iter()
                    .map(|(name, sub_schema)| (name.clone(), from_json_schema(sub_schema)))
                    .collect();
                ValueSchema::Object(fields)
            } else {
                ValueSchema::Object(HashMap::new())
            }
        }
        _ => ValueSchema::Any,
    }
}
