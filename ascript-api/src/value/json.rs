use serde_json::{Map, Number};

use super::{Object, ObjectKind, Value};
use crate::errors::ActorError;
use crate::types::ActorResult;

impl Value {
    /// Renders the value as JSON.
    ///
    /// Functions render as `null` and actor references as their path.
    ///
    /// # Errors
    /// `TypeError` when the graph contains a cycle.
    pub fn to_json(&self) -> ActorResult<serde_json::Value> {
        let mut ancestors = Vec::new();
        to_json_inner(self, &mut ancestors)
    }

    /// Builds a mutable value from JSON.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s.as_str()),
            serde_json::Value::Array(items) => Value::array(items.iter().map(Value::from_json)),
            serde_json::Value::Object(map) => {
                Value::record(map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))))
            }
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        serde_json::Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

fn to_json_inner(value: &Value, ancestors: &mut Vec<Object>) -> ActorResult<serde_json::Value> {
    Ok(match value {
        Value::Null | Value::Function(_) => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Actor(actor) => serde_json::Value::String(actor.path().to_string()),
        Value::Object(obj) => {
            if ancestors.iter().any(|seen| seen.ptr_eq(obj)) {
                return Err(ActorError::TypeError(
                    "Converting circular structure to JSON".to_string(),
                ));
            }
            ancestors.push(obj.clone());
            let json = match obj.kind() {
                ObjectKind::Array => serde_json::Value::Array(
                    obj.values()
                        .iter()
                        .map(|item| to_json_inner(item, ancestors))
                        .collect::<ActorResult<Vec<_>>>()?,
                ),
                ObjectKind::Record => {
                    let mut map = Map::new();
                    for (key, item) in obj.entries() {
                        map.insert(key, to_json_inner(&item, ancestors)?);
                    }
                    serde_json::Value::Object(map)
                }
            };
            ancestors.pop();
            json
        }
    })
}
