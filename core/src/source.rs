//! Host-supplied data capabilities
//!
//! The control never fetches anything on its own. Remote search and id
//! resolution are injected through the traits below; [`InMemorySource`] is a
//! ready-made implementation over a fixed list of entities.

use crate::error::SourceError;
use crate::item::{ItemId, RawEntity};
use crate::value::ExternalValue;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Result type for capability calls
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Search capability
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Return the entities matching `term`
    ///
    /// `current` is the control's external value at the time the search
    /// started. In client-filter mode this is called once with an empty term.
    async fn search(&self, term: &str, current: &ExternalValue) -> SourceResult<Vec<RawEntity>>;
}

/// Id resolution capability used by id-mode `write_value`
#[async_trait]
pub trait SelectedLookup: Send + Sync {
    /// Resolve the given ids to entities, in any order
    async fn lookup_by_ids(&self, ids: &[ItemId]) -> SourceResult<Vec<RawEntity>>;
}

/// In-memory data source over a fixed list of entities
///
/// Matches by case-insensitive substring on the text field and resolves ids
/// against the id field. An optional latency simulates a remote backend.
#[derive(Debug, Default)]
pub struct InMemorySource {
    entities: Vec<RawEntity>,
    id_field: String,
    text_field: String,
    latency: Option<Duration>,
    search_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
}

impl InMemorySource {
    /// Create a source reading the `id` and `text` fields
    pub fn new(entities: Vec<RawEntity>) -> Self {
        Self::with_fields(entities, "id", "text")
    }

    /// Create a source reading custom id and text fields
    pub fn with_fields(
        entities: Vec<RawEntity>,
        id_field: impl Into<String>,
        text_field: impl Into<String>,
    ) -> Self {
        Self {
            entities,
            id_field: id_field.into(),
            text_field: text_field.into(),
            latency: None,
            search_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
        }
    }

    /// Delay every answer by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `search` calls served so far
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Number of `lookup_by_ids` calls served so far
    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn text_of<'a>(&self, entity: &'a RawEntity) -> Option<&'a str> {
        entity.get(&self.text_field).and_then(|v| v.as_str())
    }
}

#[async_trait]
impl DataSource for InMemorySource {
    async fn search(&self, term: &str, _current: &ExternalValue) -> SourceResult<Vec<RawEntity>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let needle = term.to_lowercase();
        Ok(self
            .entities
            .iter()
            .filter(|entity| {
                self.text_of(entity)
                    .map(|text| text.to_lowercase().contains(&needle))
                    .unwrap_or(needle.is_empty())
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SelectedLookup for InMemorySource {
    async fn lookup_by_ids(&self, ids: &[ItemId]) -> SourceResult<Vec<RawEntity>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        Ok(ids
            .iter()
            .filter_map(|id| {
                self.entities.iter().find(|entity| {
                    entity
                        .get(&self.id_field)
                        .and_then(ItemId::from_value)
                        .as_ref()
                        == Some(id)
                })
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> InMemorySource {
        InMemorySource::new(vec![
            json!({"id": 1, "text": "Apple"}),
            json!({"id": 2, "text": "Banana"}),
            json!({"id": 3, "text": "Pineapple"}),
        ])
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let source = source();
        let found = source.search("APP", &ExternalValue::Null).await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0]["text"], "Apple");
        assert_eq!(found[1]["text"], "Pineapple");
        assert_eq!(source.search_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_term_returns_everything() {
        let source = source();
        let found = source.search("", &ExternalValue::Null).await.unwrap();
        assert_eq!(found.len(), 3);
    }

    #[tokio::test]
    async fn test_lookup_preserves_requested_order() {
        let source = source();
        let found = source
            .lookup_by_ids(&[ItemId::Number(3), ItemId::Number(9), ItemId::Number(1)])
            .await
            .unwrap();

        assert_eq!(found, vec![json!({"id": 3, "text": "Pineapple"}), json!({"id": 1, "text": "Apple"})]);
        assert_eq!(source.lookup_calls(), 1);
    }
}
