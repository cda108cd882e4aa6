//! Parameter declarations and JSON Schema derivation.
//!
//! Tools declare a flat, ordered list of primitive parameters; the schema sent
//! to the backend is derived from that list so the two can never drift apart.

use serde_json::{json, Map, Value};

/// Primitive parameter types understood by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
}

impl ParamKind {
    fn json_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// One declared tool parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
}

impl ParamSpec {
    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Number, description)
    }

    pub fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Boolean, description)
    }

    /// Mark the parameter as optional (parameters are required by default).
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    fn new(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
        }
    }
}

/// Build `{"type":"object","properties":{..},"required":[..]}` from declarations.
///
/// `required` follows declaration order.
pub fn derive_parameters(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for p in params {
        properties.insert(
            p.name.to_string(),
            json!({
                "type": p.kind.json_type(),
                "description": p.description,
            }),
        );
        if p.required {
            required.push(Value::String(p.name.to_string()));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
