//! Tool definitions and JSON-schema argument checks
//!
//! Each tool advertises a small JSON schema to the model. Arguments coming
//! back from the model are checked against that same schema before the tool
//! runs.

use crate::error::AssistantError;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// What the model sees for one callable tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

pub fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

pub fn string(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description,
    })
}

pub fn integer(description: &str) -> Value {
    json!({
        "type": "integer",
        "description": description,
    })
}

pub fn number(description: &str) -> Value {
    json!({
        "type": "number",
        "description": description,
    })
}

/// Check `arguments` against an object schema built with [`object`].
///
/// Only what the builders above can express is enforced: the arguments are
/// an object, required keys are present and non-null, and declared
/// properties have the declared JSON type. Extra keys are tolerated.
pub fn validate(tool_name: &str, schema: &Value, arguments: &Value) -> Result<()> {
    let args = arguments.as_object().ok_or_else(|| {
        AssistantError::InvalidToolInput(format!("{}: arguments must be a JSON object", tool_name))
    })?;

    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|keys| keys.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();

    for key in required {
        if args.get(key).map_or(true, Value::is_null) {
            return Err(AssistantError::InvalidToolInput(format!(
                "{}: missing required argument '{}'",
                tool_name, key
            )));
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (key, value) in args {
        let Some(expected) = properties
            .get(key)
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
        else {
            continue;
        };

        if !matches_type(expected, value) {
            return Err(AssistantError::InvalidToolInput(format!(
                "{}: argument '{}' must be of type {}, got {}",
                tool_name,
                key,
                expected,
                type_name(value)
            )));
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buy_schema() -> Value {
        object(
            json!({
                "stock_symbol": string("Symbol"),
                "number_of_stocks": integer("Quantity"),
                "limit_price": number("Limit"),
            }),
            &["stock_symbol", "number_of_stocks", "limit_price"],
        )
    }

    #[test]
    fn test_schema_builders() {
        let schema = buy_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["stock_symbol"]["type"], "string");
        assert_eq!(schema["properties"]["number_of_stocks"]["type"], "integer");
        assert_eq!(schema["required"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_valid_arguments() {
        let args = json!({"stock_symbol": "AAPL", "number_of_stocks": 5, "limit_price": 100});
        assert!(validate("buy_stock", &buy_schema(), &args).is_ok());

        // Extra keys are tolerated
        let args = json!({"stock_symbol": "AAPL", "number_of_stocks": 5, "limit_price": 99.5, "note": "x"});
        assert!(validate("buy_stock", &buy_schema(), &args).is_ok());
    }

    #[test]
    fn test_missing_required_argument() {
        let args = json!({"stock_symbol": "AAPL", "limit_price": 100.0});
        let err = validate("buy_stock", &buy_schema(), &args).unwrap_err();
        assert!(err.to_string().contains("number_of_stocks"));

        let args = json!({"stock_symbol": null, "number_of_stocks": 1, "limit_price": 1.0});
        assert!(validate("buy_stock", &buy_schema(), &args).is_err());
    }

    #[test]
    fn test_wrong_types() {
        let args = json!({"stock_symbol": "AAPL", "number_of_stocks": "five", "limit_price": 100.0});
        let err = validate("buy_stock", &buy_schema(), &args).unwrap_err();
        assert!(err.to_string().contains("must be of type integer, got string"));

        let args = json!({"stock_symbol": "AAPL", "number_of_stocks": 2.5, "limit_price": 100.0});
        assert!(validate("buy_stock", &buy_schema(), &args).is_err());
    }

    #[test]
    fn test_non_object_arguments() {
        assert!(validate("buy_stock", &buy_schema(), &json!(["AAPL"])).is_err());
        assert!(validate("buy_stock", &buy_schema(), &Value::Null).is_err());
    }
}
