//! Selectable item model and the host adapter that builds items

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Raw host entity, opaque to the control
pub type RawEntity = serde_json::Value;

/// Identifier of a selectable entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(i64),
    Text(String),
}

impl ItemId {
    /// Read an identifier out of a JSON value
    ///
    /// Integers and strings are identifiers; anything else is not.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(ItemId::Number),
            serde_json::Value::String(s) => Some(ItemId::Text(s.clone())),
            _ => None,
        }
    }

    /// Convert back to the JSON form handed out as an external value
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            ItemId::Number(n) => serde_json::Value::from(*n),
            ItemId::Text(s) => serde_json::Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Number(n) => write!(f, "{}", n),
            ItemId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        ItemId::Number(id)
    }
}

impl From<i32> for ItemId {
    fn from(id: i32) -> Self {
        ItemId::Number(i64::from(id))
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId::Text(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        ItemId::Text(id)
    }
}

/// Canonical selectable unit
///
/// `PartialEq` compares every field; use [`Item::same_as`] for identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Identity of the item; `None` when the adapter could not find one
    pub id: Option<ItemId>,

    /// Display text
    pub text: String,

    /// The host entity this item was built from
    pub entity: Arc<RawEntity>,
}

impl Item {
    /// Create a new item
    pub fn new(id: impl Into<ItemId>, text: impl Into<String>, entity: RawEntity) -> Self {
        Self {
            id: Some(id.into()),
            text: text.into(),
            entity: Arc::new(entity),
        }
    }

    /// Whether both items carry the same identifier
    ///
    /// Items without an id never match anything, themselves included.
    pub fn same_as(&self, other: &Item) -> bool {
        matches!((&self.id, &other.id), (Some(a), Some(b)) if a == b)
    }
}

/// Maps a host entity onto the canonical item
///
/// Implementations must be pure and total for every entity the host hands in.
pub trait ItemAdapter: Send + Sync {
    fn adapt(&self, entity: &RawEntity) -> Item;
}

impl<F> ItemAdapter for F
where
    F: Fn(&RawEntity) -> Item + Send + Sync,
{
    fn adapt(&self, entity: &RawEntity) -> Item {
        self(entity)
    }
}

/// Adapter that reads the id and text out of two named JSON fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAdapter {
    pub id_field: String,
    pub text_field: String,
}

impl FieldAdapter {
    pub fn new(id_field: impl Into<String>, text_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            text_field: text_field.into(),
        }
    }
}

impl Default for FieldAdapter {
    fn default() -> Self {
        Self::new("id", "text")
    }
}

impl ItemAdapter for FieldAdapter {
    fn adapt(&self, entity: &RawEntity) -> Item {
        let id = entity.get(&self.id_field).and_then(ItemId::from_value);
        let text = match entity.get(&self.text_field) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        Item {
            id,
            text,
            entity: Arc::new(entity.clone()),
        }
    }
}
