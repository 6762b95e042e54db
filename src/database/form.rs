use serde_json::{Map, Value};

use super::error::TypeError;
use super::schema::IngredientEntry;

/// Typed reader over a JSON request body. Getters return the user-facing
/// validation message for the field they were asked for; `null` values count
/// as absent.
#[derive(Debug)]
pub struct Form {
    inner: Map<String, Value>,
}

impl Form {
    pub fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Object(inner) => Ok(Self { inner }),
            _ => Err(TypeError::new("Request body must be a JSON object.")),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<String, TypeError> {
        match self.optional_str(key)? {
            Some(value) => Ok(value),
            None => Err(TypeError::new(&format!("'{key}' is required"))),
        }
    }

    pub fn optional_str(&self, key: &str) -> Result<Option<String>, TypeError> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.to_string())),
            Some(_) => Err(TypeError::new(&format!(
                "Type Error: '{key}' must be a string"
            ))),
        }
    }

    pub fn optional_bool(&self, key: &str) -> Result<Option<bool>, TypeError> {
        match self.inner.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(value)) => Ok(Some(*value)),
            Some(_) => Err(TypeError::new(&format!(
                "Type Error: '{key}' must be a boolean"
            ))),
        }
    }

    pub fn optional_str_array(&self, key: &str) -> Result<Option<Vec<String>>, TypeError> {
        let values = match self.inner.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(values)) => values,
            Some(_) => {
                return Err(TypeError::new(&format!(
                    "Type Error: '{key}' must be an array"
                )))
            }
        };

        values
            .iter()
            .map(|value| match value {
                Value::String(s) => Ok(s.to_string()),
                _ => Err(TypeError::new(&format!(
                    "Type Error: '{key}' must be an array of strings"
                ))),
            })
            .collect::<Result<Vec<String>, TypeError>>()
            .map(Some)
    }

    /// Ingredients arrive as objects carrying the text plus an optional
    /// footnote companion.
    pub fn optional_ingredient_array(
        &self,
        key: &str,
    ) -> Result<Option<Vec<IngredientEntry>>, TypeError> {
        let values = match self.inner.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(values)) => values,
            Some(_) => {
                return Err(TypeError::new(&format!(
                    "Type Error: '{key}' must be an array"
                )))
            }
        };

        values
            .iter()
            .map(|value| {
                let entry = value
                    .as_object()
                    .ok_or_else(|| TypeError::new("Each ingredient must be an object"))?;

                let ingredient = match entry.get("ingredient") {
                    Some(Value::String(s)) => s.to_string(),
                    _ => {
                        return Err(TypeError::new(
                            "Each ingredient must include an 'ingredient' field",
                        ))
                    }
                };
                let footnote = match entry.get("footnote") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.to_string()),
                    Some(_) => {
                        return Err(TypeError::new(
                            "Type Error: ingredient 'footnote' must be a string",
                        ))
                    }
                };

                Ok(IngredientEntry {
                    ingredient,
                    footnote,
                })
            })
            .collect::<Result<Vec<IngredientEntry>, TypeError>>()
            .map(Some)
    }
}
