//! Search pipeline
//!
//! Raw keystrokes become candidate lists in four stages: a debounce timer,
//! a distinct-until-changed gate with a minimum length, a fetch (remote or
//! from the cached full dataset), and an exclusion filter. Every accepted term
//! gets a new generation; an outcome whose generation is no longer current is
//! dropped, so only the latest term can ever replace the candidates.

use crate::item::{Item, ItemAdapter};
use crate::selection::SelectionSet;
use crate::source::{DataSource, SourceResult};
use crate::value::ExternalValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Distinct-until-changed and minimum-length gate for debounced terms
#[derive(Debug, Clone, Default)]
pub struct TermGate {
    min_length: usize,
    last_emitted: Option<String>,
}

impl TermGate {
    pub fn new(min_length: usize) -> Self {
        Self {
            min_length,
            last_emitted: None,
        }
    }

    /// Pass a debounced raw value through the distinct check
    ///
    /// Returns the trimmed term when it differs from the previous one.
    pub fn debounced(&mut self, raw: &str) -> Option<String> {
        let term = raw.trim();
        if self.last_emitted.as_deref() == Some(term) {
            return None;
        }
        self.last_emitted = Some(term.to_string());
        Some(term.to_string())
    }

    /// Whether a term is long enough to search
    pub fn accepts(&self, term: &str) -> bool {
        term.chars().count() >= self.min_length
    }

    /// Forget the last emitted term so the same text can search again
    pub fn forget(&mut self) {
        self.last_emitted = None;
    }
}

/// Fetches candidates for a term, remotely or from the cached full dataset
#[derive(Clone)]
pub struct CandidateFetcher {
    source: Arc<dyn DataSource>,
    adapter: Arc<dyn ItemAdapter>,
    client_mode: bool,
    dataset: Arc<OnceCell<Vec<Item>>>,
}

impl CandidateFetcher {
    pub fn new(source: Arc<dyn DataSource>, adapter: Arc<dyn ItemAdapter>, client_mode: bool) -> Self {
        Self {
            source,
            adapter,
            client_mode,
            dataset: Arc::new(OnceCell::new()),
        }
    }

    /// Candidates for `term`, not yet filtered against the selection
    pub async fn fetch(&self, term: &str, current: &ExternalValue) -> SourceResult<Vec<Item>> {
        if !self.client_mode {
            let entities = self.source.search(term, current).await?;
            return Ok(self.adapt_all(&entities));
        }

        let dataset = self
            .dataset
            .get_or_try_init(|| async {
                debug!("Populating full dataset for client-side filtering");
                let entities = self.source.search("", current).await?;
                Ok::<_, crate::error::SourceError>(self.adapt_all(&entities))
            })
            .await?;

        Ok(filter_by_text(dataset, term))
    }

    /// Whether the full dataset has been fetched
    pub fn is_dataset_cached(&self) -> bool {
        self.dataset.initialized()
    }

    fn adapt_all(&self, entities: &[crate::item::RawEntity]) -> Vec<Item> {
        entities.iter().map(|entity| self.adapter.adapt(entity)).collect()
    }
}

/// Case-insensitive substring filter on item text
pub fn filter_by_text(items: &[Item], term: &str) -> Vec<Item> {
    let needle = term.to_lowercase();
    items
        .iter()
        .filter(|item| item.text.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Drop candidates whose id is already selected
pub fn exclude_selected(items: Vec<Item>, selection: &SelectionSet) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| !selection.contains(item))
        .collect()
}

/// Completed fetch, tagged with the generation that started it
#[derive(Debug)]
pub struct SearchOutcome {
    pub generation: u64,
    pub term: String,
    pub result: SourceResult<Vec<Item>>,
}

/// Debounce timer, generation counter and the in-flight fetch task
pub struct SearchPipeline {
    gate: TermGate,
    fetcher: CandidateFetcher,
    debounce: Duration,
    deadline: Option<Instant>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    outcomes: mpsc::UnboundedSender<SearchOutcome>,
}

impl SearchPipeline {
    pub fn new(
        fetcher: CandidateFetcher,
        min_length: usize,
        debounce: Duration,
        outcomes: mpsc::UnboundedSender<SearchOutcome>,
    ) -> Self {
        Self {
            gate: TermGate::new(min_length),
            fetcher,
            debounce,
            deadline: None,
            generation: 0,
            in_flight: None,
            outcomes,
        }
    }

    /// A keystroke arrived; restart the debounce timer
    pub fn touch(&mut self) {
        self.deadline = Some(Instant::now() + self.debounce);
    }

    /// When the pending debounce fires, if one is pending
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the elapsed debounce and run the raw text through the gate
    pub fn take_debounced(&mut self, raw: &str) -> Option<String> {
        self.deadline.take()?;
        self.gate.debounced(raw)
    }

    /// Drop any pending debounce and the distinct memory
    ///
    /// Used when the text is cleared without a search.
    pub fn reset_input(&mut self) {
        self.deadline = None;
        self.gate.forget();
    }

    pub fn accepts(&self, term: &str) -> bool {
        self.gate.accepts(term)
    }

    /// Invalidate the in-flight fetch, if any
    pub fn supersede(&mut self) {
        self.generation += 1;
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }

    /// Start fetching `term` under a fresh generation
    pub fn start(&mut self, term: String, current: ExternalValue) -> u64 {
        self.supersede();
        let generation = self.generation;
        let fetcher = self.fetcher.clone();
        let outcomes = self.outcomes.clone();

        debug!(generation, term = %term, "Starting search");
        self.in_flight = Some(tokio::spawn(async move {
            let result = fetcher.fetch(&term, &current).await;
            let _ = outcomes.send(SearchOutcome {
                generation,
                term,
                result,
            });
        }));
        generation
    }

    /// Whether an outcome may still update the candidates
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.in_flight.is_some()
    }

    /// Mark the current fetch as delivered
    pub fn finish(&mut self) {
        self.in_flight = None;
    }

    /// Whether a fetch is running for the current generation
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }
}

impl Drop for SearchPipeline {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
