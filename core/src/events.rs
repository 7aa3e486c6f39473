//! Events emitted to the host and the render snapshot

use crate::item::Item;
use crate::value::ExternalValue;
use serde::Serialize;

/// Notifications for the host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SelectEvent {
    /// A candidate was committed to the selection
    Selected(Item),
    /// An item left the selection
    Removed(Item),
    /// The bound value changed through user interaction
    ValueChanged(ExternalValue),
    /// The control lost focus
    Touched,
    /// The search capability failed; the pipeline keeps running
    SearchFailed { term: String, message: String },
    /// Resolving a written value failed; the selection was left unchanged
    LookupFailed { message: String },
}

/// One row of the result list as the host should draw it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateView {
    pub item: Item,
    /// Under the cursor
    pub active: bool,
    /// Already part of the selection
    pub selected: bool,
}

/// Everything a host needs to render the control
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControlSnapshot {
    pub term: String,
    pub focused: bool,
    pub disabled: bool,
    pub results_visible: bool,
    pub loading: bool,
    /// Candidates within `max_results`
    pub candidates: Vec<CandidateView>,
    /// Candidate count before the `max_results` cut
    pub total_candidates: usize,
    pub selected: Vec<Item>,
    pub placeholder: String,
    /// "No results" or "more results" line, when one applies
    pub status: Option<String>,
    pub value: ExternalValue,
}

impl ControlSnapshot {
    /// The candidate under the cursor
    pub fn active(&self) -> Option<&Item> {
        self.candidates
            .iter()
            .find(|candidate| candidate.active)
            .map(|candidate| &candidate.item)
    }

    /// Display texts of the visible candidates
    pub fn candidate_texts(&self) -> Vec<&str> {
        self.candidates
            .iter()
            .map(|candidate| candidate.item.text.as_str())
            .collect()
    }

    /// Display texts of the selected items
    pub fn selected_texts(&self) -> Vec<&str> {
        self.selected.iter().map(|item| item.text.as_str()).collect()
    }
}
