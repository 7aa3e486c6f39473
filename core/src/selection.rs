//! Selection and value controller
//!
//! Owns the selected items and translates them to and from the external
//! value. Mode differences live in two strategy objects chosen once at
//! construction: a [`Multiplicity`] (single or multiple) and a
//! [`ReferenceStrategy`] (ids or entities).

use crate::config::{ReferenceMode, SelectConfig};
use crate::item::{Item, ItemAdapter, ItemId};
use crate::source::{SelectedLookup, SourceResult};
use crate::value::ExternalValue;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Ordered selected items with an id index
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    items: Vec<Item>,
    ids: HashSet<ItemId>,
}

impl SelectionSet {
    /// Append an item unless its id is already present
    ///
    /// Returns whether the item was added. Items without an id are always
    /// appended since they cannot be told apart.
    pub fn push(&mut self, item: Item) -> bool {
        if let Some(id) = &item.id {
            if !self.ids.insert(id.clone()) {
                return false;
            }
        }
        self.items.push(item);
        true
    }

    /// Remove the item with the same id
    ///
    /// Items without an id are matched by equality, latest first.
    pub fn remove(&mut self, item: &Item) -> Option<Item> {
        match &item.id {
            Some(id) => self.remove_by_id(id),
            None => {
                let index = self.items.iter().rposition(|selected| selected == item)?;
                Some(self.items.remove(index))
            }
        }
    }

    /// Remove an item by id
    pub fn remove_by_id(&mut self, id: &ItemId) -> Option<Item> {
        if !self.ids.remove(id) {
            return None;
        }
        let index = self
            .items
            .iter()
            .position(|item| item.id.as_ref() == Some(id))?;
        Some(self.items.remove(index))
    }

    /// Replace the whole selection, dropping duplicate ids
    pub fn replace(&mut self, items: Vec<Item>) {
        self.clear();
        for item in items {
            self.push(item);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.ids.clear();
    }

    pub fn contains(&self, item: &Item) -> bool {
        item.id.as_ref().is_some_and(|id| self.ids.contains(id))
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn first(&self) -> Option<&Item> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&Item> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Single or multiple selection behaviour
pub trait Multiplicity: Send + Sync + fmt::Debug {
    fn is_multiple(&self) -> bool;

    /// Put a committed item into the set; returns whether the set changed
    fn commit(&self, set: &mut SelectionSet, item: Item) -> bool;

    /// Keep the resolved items this multiplicity allows
    fn retain_resolved(&self, items: Vec<Item>) -> Vec<Item>;

    /// Raw values carried by an incoming external value
    fn incoming(&self, value: &ExternalValue) -> Vec<Value>;

    /// Shape projected values into an external value
    fn shape(&self, values: Vec<Value>) -> ExternalValue;
}

#[derive(Debug, Default)]
pub struct SingleSelection;

impl Multiplicity for SingleSelection {
    fn is_multiple(&self) -> bool {
        false
    }

    fn commit(&self, set: &mut SelectionSet, item: Item) -> bool {
        set.clear();
        set.push(item)
    }

    fn retain_resolved(&self, items: Vec<Item>) -> Vec<Item> {
        items.into_iter().take(1).collect()
    }

    fn incoming(&self, value: &ExternalValue) -> Vec<Value> {
        value.values().into_iter().take(1).cloned().collect()
    }

    fn shape(&self, values: Vec<Value>) -> ExternalValue {
        values
            .into_iter()
            .next()
            .map(ExternalValue::One)
            .unwrap_or(ExternalValue::Null)
    }
}

#[derive(Debug, Default)]
pub struct MultipleSelection;

impl Multiplicity for MultipleSelection {
    fn is_multiple(&self) -> bool {
        true
    }

    fn commit(&self, set: &mut SelectionSet, item: Item) -> bool {
        set.push(item)
    }

    fn retain_resolved(&self, items: Vec<Item>) -> Vec<Item> {
        items
    }

    fn incoming(&self, value: &ExternalValue) -> Vec<Value> {
        value.values().into_iter().cloned().collect()
    }

    fn shape(&self, values: Vec<Value>) -> ExternalValue {
        ExternalValue::Many(values)
    }
}

/// How selected items map to external values and back
#[async_trait]
pub trait ReferenceStrategy: Send + Sync {
    fn mode(&self) -> ReferenceMode;

    /// External representation of one item
    fn project(&self, item: &Item) -> Value;

    /// Turn incoming external values into items
    async fn resolve(
        &self,
        values: Vec<Value>,
        adapter: &dyn ItemAdapter,
    ) -> SourceResult<Vec<Item>>;
}

/// External value carries ids, resolved through a lookup capability
pub struct IdReference {
    lookup: Option<Arc<dyn SelectedLookup>>,
}

impl IdReference {
    pub fn new(lookup: Option<Arc<dyn SelectedLookup>>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl ReferenceStrategy for IdReference {
    fn mode(&self) -> ReferenceMode {
        ReferenceMode::Id
    }

    fn project(&self, item: &Item) -> Value {
        item.id.as_ref().map(ItemId::to_value).unwrap_or(Value::Null)
    }

    async fn resolve(
        &self,
        values: Vec<Value>,
        adapter: &dyn ItemAdapter,
    ) -> SourceResult<Vec<Item>> {
        let mut seen = HashSet::new();
        let ids: Vec<ItemId> = values
            .iter()
            .filter_map(ItemId::from_value)
            .filter(|id| seen.insert(id.clone()))
            .collect();

        if ids.len() < values.len() {
            debug!(
                "Dropped {} duplicate or malformed ids before lookup",
                values.len() - ids.len()
            );
        }

        let Some(lookup) = &self.lookup else {
            debug!("No lookup capability configured, ids resolve to nothing");
            return Ok(Vec::new());
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let entities = lookup.lookup_by_ids(&ids).await?;
        Ok(entities.iter().map(|entity| adapter.adapt(entity)).collect())
    }
}

/// External value carries the host entities themselves
#[derive(Debug, Default)]
pub struct EntityReference;

#[async_trait]
impl ReferenceStrategy for EntityReference {
    fn mode(&self) -> ReferenceMode {
        ReferenceMode::Entity
    }

    fn project(&self, item: &Item) -> Value {
        item.entity.as_ref().clone()
    }

    async fn resolve(
        &self,
        values: Vec<Value>,
        adapter: &dyn ItemAdapter,
    ) -> SourceResult<Vec<Item>> {
        Ok(values.iter().map(|entity| adapter.adapt(entity)).collect())
    }
}

/// Selected items plus the strategies that give them meaning
pub struct Selection {
    set: SelectionSet,
    placeholder_selected: String,
    multiplicity: Box<dyn Multiplicity>,
    reference: Arc<dyn ReferenceStrategy>,
}

impl Selection {
    /// Build the strategies once from the configuration
    pub fn from_config(config: &SelectConfig, lookup: Option<Arc<dyn SelectedLookup>>) -> Self {
        let multiplicity: Box<dyn Multiplicity> = if config.multiple {
            Box::new(MultipleSelection)
        } else {
            Box::new(SingleSelection)
        };
        let reference: Arc<dyn ReferenceStrategy> = match config.reference_mode {
            ReferenceMode::Id => Arc::new(IdReference::new(lookup)),
            ReferenceMode::Entity => Arc::new(EntityReference),
        };

        Self::new(multiplicity, reference)
    }

    pub fn new(multiplicity: Box<dyn Multiplicity>, reference: Arc<dyn ReferenceStrategy>) -> Self {
        Self {
            set: SelectionSet::default(),
            placeholder_selected: String::new(),
            multiplicity,
            reference,
        }
    }

    pub fn set(&self) -> &SelectionSet {
        &self.set
    }

    pub fn is_multiple(&self) -> bool {
        self.multiplicity.is_multiple()
    }

    /// Reference strategy, shared with resolution tasks
    pub fn reference(&self) -> Arc<dyn ReferenceStrategy> {
        Arc::clone(&self.reference)
    }

    /// Raw values an incoming external value should resolve
    pub fn incoming(&self, value: &ExternalValue) -> Vec<Value> {
        self.multiplicity.incoming(value)
    }

    /// Replace the selection with resolved items from `write_value`
    pub fn apply_resolved(&mut self, items: Vec<Item>) {
        let items = self.multiplicity.retain_resolved(items);
        self.set.replace(items);

        if !self.is_multiple() {
            self.placeholder_selected = self
                .set
                .first()
                .map(|item| item.text.clone())
                .unwrap_or_default();
        }
    }

    /// Drop the selection and the placeholder
    pub fn clear(&mut self) {
        self.set.clear();
        self.placeholder_selected.clear();
    }

    /// Commit a candidate; returns whether the selection changed
    pub fn commit(&mut self, item: Item) -> bool {
        let text = item.text.clone();
        if !self.multiplicity.commit(&mut self.set, item) {
            return false;
        }
        if !self.is_multiple() {
            self.placeholder_selected = text;
        }
        true
    }

    /// Remove an item by id; absent items are ignored
    pub fn remove(&mut self, item: &Item) -> Option<Item> {
        let removed = self.set.remove(item)?;
        if !self.is_multiple() {
            self.placeholder_selected.clear();
        }
        Some(removed)
    }

    /// External value for the current selection
    pub fn build_external_value(&self) -> ExternalValue {
        let values = self
            .set
            .items()
            .iter()
            .map(|item| self.reference.project(item))
            .collect();
        self.multiplicity.shape(values)
    }

    /// Placeholder to display: the selected text, or `default` when empty
    pub fn placeholder<'a>(&'a self, default: &'a str) -> &'a str {
        if self.set.is_empty() {
            default
        } else {
            &self.placeholder_selected
        }
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("set", &self.set)
            .field("placeholder_selected", &self.placeholder_selected)
            .field("multiplicity", &self.multiplicity)
            .field("reference", &self.reference.mode())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::FieldAdapter;
    use crate::source::InMemorySource;
    use serde_json::json;

    fn item(id: i64, text: &str) -> Item {
        Item::new(id, text, json!({"id": id, "text": text}))
    }

    fn selection(multiple: bool, mode: ReferenceMode) -> Selection {
        let config = SelectConfig::new()
            .with_multiple(multiple)
            .with_reference_mode(mode);
        Selection::from_config(&config, None)
    }

    #[test]
    fn test_multiple_commit_never_duplicates() {
        let mut selection = selection(true, ReferenceMode::Id);

        for id in [1, 2, 1, 3, 2, 2] {
            selection.commit(item(id, "x"));
        }

        let ids: Vec<_> = selection.set().items().iter().map(|i| i.id.clone()).collect();
        assert_eq!(
            ids,
            vec![
                Some(ItemId::Number(1)),
                Some(ItemId::Number(2)),
                Some(ItemId::Number(3))
            ]
        );
    }

    #[test]
    fn test_single_commit_replaces() {
        let mut selection = selection(false, ReferenceMode::Id);
        selection.commit(item(1, "One"));
        selection.commit(item(2, "Two"));

        assert_eq!(selection.set().len(), 1);
        assert_eq!(selection.placeholder("Pick"), "Two");
        assert_eq!(selection.build_external_value(), ExternalValue::One(json!(2)));
    }

    #[test]
    fn test_single_remove_clears_value_and_placeholder() {
        let mut selection = selection(false, ReferenceMode::Id);
        selection.commit(item(5, "Five"));

        let removed = selection.remove(&item(5, "whatever"));
        assert!(removed.is_some());
        assert!(selection.set().is_empty());
        assert_eq!(selection.build_external_value(), ExternalValue::Null);
        assert_eq!(selection.placeholder("Pick"), "Pick");
        assert_eq!(selection.placeholder_selected, "");
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut selection = selection(true, ReferenceMode::Id);
        selection.commit(item(1, "One"));

        assert!(selection.remove(&item(2, "Two")).is_none());
        assert_eq!(selection.set().len(), 1);
    }

    #[test]
    fn test_items_without_id_are_removed_by_equality() {
        let adapter = FieldAdapter::default();
        let first = adapter.adapt(&json!({"text": "Loose"}));
        let second = adapter.adapt(&json!({"text": "Other"}));
        let mut selection = selection(true, ReferenceMode::Entity);
        selection.commit(item(1, "One"));
        selection.commit(first.clone());
        selection.commit(second.clone());

        assert_eq!(selection.remove(&first), Some(first.clone()));
        assert!(selection.remove(&first).is_none());
        assert_eq!(selection.remove(&second), Some(second));
        assert_eq!(selection.set().len(), 1);
    }

    #[test]
    fn test_entity_mode_values() {
        let mut selection = selection(true, ReferenceMode::Entity);
        selection.commit(item(1, "One"));
        selection.commit(item(2, "Two"));

        assert_eq!(
            selection.build_external_value(),
            ExternalValue::Many(vec![
                json!({"id": 1, "text": "One"}),
                json!({"id": 2, "text": "Two"})
            ])
        );
    }

    #[test]
    fn test_empty_multiple_value_is_empty_list() {
        let selection = selection(true, ReferenceMode::Id);
        assert_eq!(selection.build_external_value(), ExternalValue::Many(vec![]));
    }

    #[tokio::test]
    async fn test_id_resolution_dedups_before_lookup() {
        let source = Arc::new(InMemorySource::new(vec![
            json!({"id": 1, "text": "One"}),
            json!({"id": 2, "text": "Two"}),
        ]));
        let lookup: Arc<dyn SelectedLookup> = source.clone();
        let reference = IdReference::new(Some(lookup));

        let items = reference
            .resolve(vec![json!(2), json!(1), json!(2), json!({"bad": true})], &FieldAdapter::default())
            .await
            .unwrap();

        let texts: Vec<_> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["Two", "One"]);
        assert_eq!(source.lookup_calls(), 1);
    }

    #[tokio::test]
    async fn test_id_resolution_without_lookup_is_empty() {
        let reference = IdReference::new(None);
        let items = reference
            .resolve(vec![json!(1)], &FieldAdapter::default())
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_entity_resolution_adapts_directly() {
        let mut selection = selection(true, ReferenceMode::Entity);
        let incoming = selection.incoming(&ExternalValue::Many(vec![
            json!({"id": 1, "text": "One"}),
            json!({"id": 1, "text": "One again"}),
            json!({"id": 2, "text": "Two"}),
        ]));

        let items = selection
            .reference()
            .resolve(incoming, &FieldAdapter::default())
            .await
            .unwrap();
        selection.apply_resolved(items);

        assert_eq!(selection.set().len(), 2);
        assert_eq!(selection.set().first().unwrap().text, "One");
    }

    #[test]
    fn test_single_apply_resolved_keeps_first() {
        let mut selection = selection(false, ReferenceMode::Id);
        selection.apply_resolved(vec![item(3, "Three"), item(4, "Four")]);

        assert_eq!(selection.set().len(), 1);
        assert_eq!(selection.placeholder(""), "Three");
    }

    #[test]
    fn test_single_incoming_takes_first_value() {
        let selection = selection(false, ReferenceMode::Id);
        assert_eq!(
            selection.incoming(&ExternalValue::Many(vec![json!(7), json!(8)])),
            vec![json!(7)]
        );
        assert_eq!(selection.incoming(&ExternalValue::One(json!(7))), vec![json!(7)]);
        assert!(selection.incoming(&ExternalValue::Null).is_empty());
    }
}
