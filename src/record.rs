use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::{Map, Value};

/// One business record (case or opportunity) as returned by the remote
/// service. Fields are kept as raw json values, derived display fields are
/// written back into the same map.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RecordRow(Map<String, Value>);

impl RecordRow {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Field value as plain text, used for matching and for text columns.
    pub fn text(&self, field: &str) -> String {
        match self.0.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }
}

impl From<Map<String, Value>> for RecordRow {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// Rank of a json value kind in the cross type ordering.
fn kind_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order over field values.
///
/// Missing and null values come first, followed by booleans, numbers,
/// strings and finally nested values. Values of the same kind compare
/// naturally: numbers numerically, strings by code point.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(a @ (Value::Array(_) | Value::Object(_))), Some(b))
            if kind_rank(Some(a)) == kind_rank(Some(b)) =>
        {
            a.to_string().cmp(&b.to_string())
        }
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_compare_numerically() {
        let a = json!(50);
        let b = json!(100.5);
        assert_eq!(compare_values(Some(&a), Some(&b)), Ordering::Less);
        assert_eq!(compare_values(Some(&b), Some(&a)), Ordering::Greater);
        assert_eq!(compare_values(Some(&a), Some(&json!(50.0))), Ordering::Equal);
    }

    #[test]
    fn strings_compare_by_code_point() {
        let a = json!("Apple");
        let b = json!("apple");
        assert_eq!(compare_values(Some(&a), Some(&b)), Ordering::Less);
    }

    #[test]
    fn missing_values_sort_first() {
        let v = json!("x");
        assert_eq!(compare_values(None, Some(&v)), Ordering::Less);
        assert_eq!(compare_values(Some(&Value::Null), None), Ordering::Equal);
        assert_eq!(compare_values(Some(&json!(1)), Some(&json!("1"))), Ordering::Less);
    }

    #[test]
    fn rows_deserialize_from_service_json() {
        let row: RecordRow =
            serde_json::from_value(json!({"Name": "Acme", "Amount": 10})).unwrap();
        assert_eq!(row.text("Name"), "Acme");
        assert_eq!(row.text("Amount"), "10");
        assert_eq!(row.text("Missing"), "");
    }
}
