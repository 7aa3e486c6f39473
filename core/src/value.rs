//! The externally bound value of a control

use crate::item::ItemId;
use serde::{Deserialize, Serialize};

/// Value visible to the host form binding
///
/// Serialises untagged: `null`, a single id/entity, or an array of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalValue {
    #[default]
    Null,
    Many(Vec<serde_json::Value>),
    One(serde_json::Value),
}

impl ExternalValue {
    /// Build from plain JSON, mapping `null` to [`ExternalValue::Null`]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ExternalValue::Null,
            serde_json::Value::Array(values) => ExternalValue::Many(values),
            other => ExternalValue::One(other),
        }
    }

    /// Convert to plain JSON
    pub fn into_json(self) -> serde_json::Value {
        match self {
            ExternalValue::Null => serde_json::Value::Null,
            ExternalValue::One(value) => value,
            ExternalValue::Many(values) => serde_json::Value::Array(values),
        }
    }

    /// Build a list of ids
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ItemId>,
    {
        ExternalValue::Many(ids.into_iter().map(|id| id.into().to_value()).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ExternalValue::Null)
    }

    /// All contained values in order; a single value yields one element
    pub fn values(&self) -> Vec<&serde_json::Value> {
        match self {
            ExternalValue::Null => Vec::new(),
            ExternalValue::One(value) => vec![value],
            ExternalValue::Many(values) => values.iter().collect(),
        }
    }
}

impl From<serde_json::Value> for ExternalValue {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_shapes() {
        assert_eq!(ExternalValue::from_json(json!(null)), ExternalValue::Null);
        assert_eq!(ExternalValue::from_json(json!(4)), ExternalValue::One(json!(4)));
        assert_eq!(
            ExternalValue::from_json(json!([1, 2])),
            ExternalValue::Many(vec![json!(1), json!(2)])
        );
        assert_eq!(ExternalValue::from_ids([1, 2]).into_json(), json!([1, 2]));
    }

    #[test]
    fn test_untagged_serde() {
        let value: ExternalValue = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(value, ExternalValue::One(json!({"id": 1})));

        let value: ExternalValue = serde_json::from_str("[1, \"a\"]").unwrap();
        assert_eq!(value.values().len(), 2);

        assert_eq!(serde_json::to_string(&ExternalValue::Null).unwrap(), "null");
    }
}
