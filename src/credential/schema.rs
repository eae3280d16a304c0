//! Minimal-instance sample data generation for JSON Schema draft-07.
//!
//! `bindCredential` needs *some* concrete `credential` body to attach to a
//! bound VC before it is signed; the upstream schema-to-sample-data
//! algorithm is unspecified (§9 open question). This picks the simplest
//! value that structurally satisfies the schema: the smallest-arity object
//! with only its `required` properties filled in, the zero value for
//! scalars (bumped up to any stated `minimum`/`minLength`/`minItems`), and
//! the first `enum`/`const` value when one is given.

use serde_json::{json, Map, Value};

/// Synthesize the minimal JSON value satisfying `schema`.
pub fn minimal_instance(schema: &Value) -> Value {
    let Some(schema) = schema.as_object() else {
        return Value::Null;
    };

    if let Some(default) = schema.get("default") {
        return default.clone();
    }
    if let Some(constant) = schema.get("const") {
        return constant.clone();
    }
    if let Some(Value::Array(options)) = schema.get("enum") {
        if let Some(first) = options.first() {
            return first.clone();
        }
    }

    match schema.get("type").and_then(Value::as_str) {
        Some("object") | None if schema.contains_key("properties") => object_instance(schema),
        Some("object") => json!({}),
        Some("string") => string_instance(schema),
        Some("integer") => number_instance(schema, true),
        Some("number") => number_instance(schema, false),
        Some("boolean") => Value::Bool(false),
        Some("array") => array_instance(schema),
        Some("null") => Value::Null,
        _ => Value::Null,
    }
}

fn object_instance(schema: &Map<String, Value>) -> Value {
    let properties = schema.get("properties").and_then(Value::as_object);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut out = Map::new();
    if let Some(properties) = properties {
        for key in &required {
            if let Some(prop_schema) = properties.get(*key) {
                out.insert((*key).to_string(), minimal_instance(prop_schema));
            }
        }
    }
    Value::Object(out)
}

fn string_instance(schema: &Map<String, Value>) -> Value {
    let min_length = schema.get("minLength").and_then(Value::as_u64).unwrap_or(0) as usize;
    Value::String("x".repeat(min_length))
}

fn number_instance(schema: &Map<String, Value>, as_integer: bool) -> Value {
    let minimum = schema.get("minimum").and_then(Value::as_f64).unwrap_or(0.0);
    let floor = minimum.max(0.0);
    if as_integer {
        json!(floor.ceil() as i64)
    } else {
        json!(floor)
    }
}

fn array_instance(schema: &Map<String, Value>) -> Value {
    let min_items = schema.get("minItems").and_then(Value::as_u64).unwrap_or(0) as usize;
    let item_schema = schema.get("items").cloned().unwrap_or(json!({}));
    let items: Vec<Value> = (0..min_items).map(|_| minimal_instance(&item_schema)).collect();
    Value::Array(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_schema_yields_empty_object() {
        let schema = json!({"type": "object"});
        assert_eq!(minimal_instance(&schema), json!({}));
    }

    #[test]
    fn test_required_properties_are_filled() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer"},
                "nickname": {"type": "string"}
            },
            "required": ["name", "age"]
        });
        let instance = minimal_instance(&schema);
        assert_eq!(instance, json!({"name": "", "age": 0}));
    }

    #[test]
    fn test_min_length_is_respected() {
        let schema = json!({"type": "string", "minLength": 3});
        assert_eq!(minimal_instance(&schema), json!("xxx"));
    }

    #[test]
    fn test_minimum_is_respected() {
        let schema = json!({"type": "integer", "minimum": 18});
        assert_eq!(minimal_instance(&schema), json!(18));
    }

    #[test]
    fn test_enum_picks_first_option() {
        let schema = json!({"enum": ["gold", "silver", "bronze"]});
        assert_eq!(minimal_instance(&schema), json!("gold"));
    }

    #[test]
    fn test_const_is_used_directly() {
        let schema = json!({"const": 42});
        assert_eq!(minimal_instance(&schema), json!(42));
    }

    #[test]
    fn test_array_with_min_items() {
        let schema = json!({"type": "array", "items": {"type": "integer"}, "minItems": 2});
        assert_eq!(minimal_instance(&schema), json!([0, 0]));
    }

    #[test]
    fn test_nested_object_in_properties() {
        let schema = json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "object",
                    "properties": {"city": {"type": "string"}},
                    "required": ["city"]
                }
            },
            "required": ["address"]
        });
        assert_eq!(minimal_instance(&schema), json!({"address": {"city": ""}}));
    }
}
