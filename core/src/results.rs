//! Result list controller
//!
//! Holds the current candidates, the active cursor and the pointer/keyboard
//! arbitration flag. Rendering is left to the host.

use crate::item::{Item, ItemId};
use crate::messages;
use crate::selection::SelectionSet;

/// Visible candidates with an active cursor
#[derive(Debug, Clone, Default)]
pub struct ResultList {
    items: Vec<Item>,
    active_index: usize,
    max_results: Option<usize>,
    /// Set by keyboard navigation, cleared by pointer movement
    using_keys: bool,
}

impl ResultList {
    /// Create an empty list showing at most `max_results` candidates
    pub fn new(max_results: Option<usize>) -> Self {
        Self {
            items: Vec::new(),
            active_index: 0,
            max_results,
            using_keys: false,
        }
    }

    /// Replace every candidate and reset the cursor
    pub fn replace(&mut self, items: Vec<Item>) {
        self.items = items;
        self.active_index = 0;
    }

    /// Drop all candidates
    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    /// All candidates, including those beyond `max_results`
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The candidates that fit under `max_results`
    pub fn visible(&self) -> &[Item] {
        &self.items[..self.bound()]
    }

    /// Whether some candidates are hidden by `max_results`
    pub fn has_more(&self) -> bool {
        self.bound() < self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// The item under the cursor, if the cursor points at one
    pub fn active(&self) -> Option<&Item> {
        self.visible().get(self.active_index)
    }

    /// Number of positions the cursor cycles over
    fn bound(&self) -> usize {
        match self.max_results {
            Some(max) => max.min(self.items.len()),
            None => self.items.len(),
        }
    }

    /// Move the cursor forward, wrapping to the first item
    pub fn activate_next(&mut self) {
        let bound = self.bound();
        self.active_index = if bound == 0 || self.active_index + 1 >= bound {
            0
        } else {
            self.active_index + 1
        };
        self.using_keys = true;
    }

    /// Move the cursor backward, wrapping to the last visible item
    pub fn activate_previous(&mut self) {
        let bound = self.bound();
        self.active_index = if bound == 0 {
            0
        } else if self.active_index == 0 || self.active_index >= bound {
            bound - 1
        } else {
            self.active_index - 1
        };
        self.using_keys = true;
    }

    /// Take the item under the cursor for commit and reset the cursor
    pub fn take_current(&mut self) -> Option<Item> {
        let item = self.active().cloned()?;
        self.active_index = 0;
        Some(item)
    }

    /// Pointer hovered the item at `index`
    ///
    /// Ignored while keyboard navigation owns the cursor.
    pub fn hover(&mut self, index: usize) {
        if !self.using_keys && index < self.bound() {
            self.active_index = index;
        }
    }

    /// Pointer moved over the list; hover regains control of the cursor
    pub fn pointer_moved(&mut self) {
        self.using_keys = false;
    }

    /// Remove a candidate by id, keeping the cursor in range
    pub fn remove(&mut self, id: &ItemId) -> Option<Item> {
        let index = self
            .items
            .iter()
            .position(|item| item.id.as_ref() == Some(id))?;
        let removed = self.items.remove(index);

        let bound = self.bound();
        if self.active_index >= bound {
            self.active_index = bound.saturating_sub(1);
        }
        Some(removed)
    }

    /// Display-only check: is `item` part of the selection
    pub fn is_selected(&self, item: &Item, selection: &SelectionSet) -> bool {
        selection.contains(item)
    }

    /// Format the "more results" template
    ///
    /// The visible count is the configured maximum; the total counts the
    /// candidates plus the already selected items.
    pub fn count_message(&self, template: &str, selected_len: usize) -> String {
        let visible = self.max_results.unwrap_or(self.items.len());
        messages::format_count(template, visible, self.items.len() + selected_len)
    }
}
