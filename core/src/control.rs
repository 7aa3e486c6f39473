//! The select control task and its handle
//!
//! One tokio task owns every piece of mutable state: the raw term, focus and
//! visibility flags, the candidates and the selection. Hosts talk to it
//! through a cloneable [`SelectHandle`]; commands are applied strictly in
//! the order they were sent. Search and lookup results come back on internal
//! channels and are applied on the same task.

use crate::config::SelectConfig;
use crate::error::{Result, SelectError};
use crate::events::{CandidateView, ControlSnapshot, SelectEvent};
use crate::item::{FieldAdapter, Item, ItemAdapter};
use crate::keyboard::{key_down_actions, key_up_action, FocusState, Key, KeyAction, KeyResponse};
use crate::results::ResultList;
use crate::search::{exclude_selected, CandidateFetcher, SearchOutcome, SearchPipeline};
use crate::selection::Selection;
use crate::source::{DataSource, SelectedLookup, SourceResult};
use crate::value::ExternalValue;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CAPACITY: usize = 256;

/// Builder for a select control
pub struct SelectBuilder {
    config: SelectConfig,
    source: Arc<dyn DataSource>,
    lookup: Option<Arc<dyn SelectedLookup>>,
    adapter: Arc<dyn ItemAdapter>,
}

impl SelectBuilder {
    /// Create a builder with the search capability and configuration
    pub fn new(config: SelectConfig, source: Arc<dyn DataSource>) -> Self {
        Self {
            config,
            source,
            lookup: None,
            adapter: Arc::new(FieldAdapter::default()),
        }
    }

    /// Set the id resolution capability used by id-mode `write_value`
    pub fn with_lookup(mut self, lookup: Arc<dyn SelectedLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Set the entity adapter
    pub fn with_adapter(mut self, adapter: Arc<dyn ItemAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: SelectConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and start the control task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> Result<SelectHandle> {
        self.config.validate()?;

        let (commands, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let control = SelectControl::new(self, commands.downgrade(), events.clone());
        let snapshots = control.snapshots.subscribe();

        tokio::spawn(control.run(receiver));

        Ok(SelectHandle {
            commands,
            events,
            snapshots,
        })
    }
}

enum Command {
    Input(String),
    FocusGained,
    FocusLost,
    KeyDown(Key),
    KeyUp(Key),
    Hover(usize),
    PointerMoved,
    SelectAt(usize),
    Select(Item),
    Remove(Item),
    WriteValue(Option<ExternalValue>, oneshot::Sender<Result<()>>),
    SetDisabled(bool),
    Focus,
    FocusAndShowResults,
    Snapshot(oneshot::Sender<ControlSnapshot>),
    Value(oneshot::Sender<ExternalValue>),
}

/// Host-side handle to a running control
///
/// Fire-and-forget methods only fail once the control task is gone.
#[derive(Clone)]
pub struct SelectHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<SelectEvent>,
    snapshots: watch::Receiver<ControlSnapshot>,
}

impl SelectHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command)?;
        Ok(())
    }

    /// The raw text of the input changed
    pub fn input(&self, raw: impl Into<String>) -> Result<()> {
        self.send(Command::Input(raw.into()))
    }

    pub fn focus_gained(&self) -> Result<()> {
        self.send(Command::FocusGained)
    }

    pub fn focus_lost(&self) -> Result<()> {
        self.send(Command::FocusLost)
    }

    /// Forward a key-down; the response says whether to suppress the default
    pub fn key_down(&self, key: Key) -> Result<KeyResponse> {
        self.send(Command::KeyDown(key))?;
        Ok(KeyResponse::for_key_down(key))
    }

    pub fn key_up(&self, key: Key) -> Result<()> {
        self.send(Command::KeyUp(key))
    }

    /// Key-down followed by key-up
    pub fn press(&self, key: Key) -> Result<KeyResponse> {
        let response = self.key_down(key)?;
        self.key_up(key)?;
        Ok(response)
    }

    /// Pointer entered the visible candidate at `index`
    pub fn hover(&self, index: usize) -> Result<()> {
        self.send(Command::Hover(index))
    }

    pub fn pointer_moved(&self) -> Result<()> {
        self.send(Command::PointerMoved)
    }

    /// Pointer clicked the visible candidate at `index`
    pub fn select_at(&self, index: usize) -> Result<()> {
        self.send(Command::SelectAt(index))
    }

    /// Commit an item as if the user had picked it
    pub fn select(&self, item: Item) -> Result<()> {
        self.send(Command::Select(item))
    }

    /// Remove an item from the selection by id
    pub fn remove(&self, item: Item) -> Result<()> {
        self.send(Command::Remove(item))
    }

    /// Focus the input and hide the results
    pub fn focus(&self) -> Result<()> {
        self.send(Command::Focus)
    }

    /// Focus the input and run the empty term
    pub fn focus_and_show_results(&self) -> Result<()> {
        self.send(Command::FocusAndShowResults)
    }

    pub fn set_disabled(&self, disabled: bool) -> Result<()> {
        self.send(Command::SetDisabled(disabled))
    }

    /// Replace the selection from an external value
    ///
    /// Resolves once the value has been applied. Fails with
    /// [`SelectError::Superseded`] when a newer write arrived first, or with
    /// the lookup error when resolution failed.
    pub async fn write_value(&self, value: Option<ExternalValue>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::WriteValue(value, tx))?;
        rx.await?
    }

    /// Current external value
    pub async fn value(&self) -> Result<ExternalValue> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Value(tx))?;
        Ok(rx.await?)
    }

    /// Render state after every command sent so far has been applied
    pub async fn snapshot(&self) -> Result<ControlSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        Ok(rx.await?)
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SelectEvent> {
        self.events.subscribe()
    }

    /// Receiver that is notified whenever the render state changes
    pub fn watch(&self) -> watch::Receiver<ControlSnapshot> {
        self.snapshots.clone()
    }
}

struct LookupOutcome {
    generation: u64,
    result: SourceResult<Vec<Item>>,
}

/// The write_value resolution currently in flight
#[derive(Default)]
struct PendingWrite {
    generation: u64,
    task: Option<JoinHandle<()>>,
    responder: Option<oneshot::Sender<Result<()>>>,
}

impl PendingWrite {
    /// Abort the running resolution and tell its caller
    fn supersede(&mut self) {
        self.generation += 1;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Some(responder) = self.responder.take() {
            debug!("Superseding pending value write");
            let _ = responder.send(Err(SelectError::Superseded));
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.task.is_some()
    }
}

impl Drop for PendingWrite {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct SelectControl {
    config: SelectConfig,
    adapter: Arc<dyn ItemAdapter>,
    selection: Selection,
    results: ResultList,
    search: SearchPipeline,
    search_outcomes: mpsc::UnboundedReceiver<SearchOutcome>,
    pending_write: PendingWrite,
    lookup_sender: mpsc::UnboundedSender<LookupOutcome>,
    lookup_outcomes: mpsc::UnboundedReceiver<LookupOutcome>,
    term: String,
    focused: bool,
    disabled: bool,
    results_visible: bool,
    events: broadcast::Sender<SelectEvent>,
    snapshots: watch::Sender<ControlSnapshot>,
    requeue: mpsc::WeakUnboundedSender<Command>,
}

impl SelectControl {
    fn new(
        builder: SelectBuilder,
        requeue: mpsc::WeakUnboundedSender<Command>,
        events: broadcast::Sender<SelectEvent>,
    ) -> Self {
        let SelectBuilder {
            config,
            source,
            lookup,
            adapter,
        } = builder;

        let (search_sender, search_outcomes) = mpsc::unbounded_channel();
        let (lookup_sender, lookup_outcomes) = mpsc::unbounded_channel();
        let fetcher = CandidateFetcher::new(source, Arc::clone(&adapter), config.client_mode);
        let search = SearchPipeline::new(
            fetcher,
            config.min_term_length,
            config.debounce_delay(),
            search_sender,
        );

        let control = Self {
            selection: Selection::from_config(&config, lookup),
            results: ResultList::new(config.max_results),
            disabled: config.disabled,
            config,
            adapter,
            search,
            search_outcomes,
            pending_write: PendingWrite::default(),
            lookup_sender,
            lookup_outcomes,
            term: String::new(),
            focused: false,
            results_visible: false,
            events,
            snapshots: watch::channel(ControlSnapshot::default()).0,
            requeue,
        };
        let initial = control.snapshot();
        control.snapshots.send_replace(initial);
        control
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        debug!(
            multiple = self.selection.is_multiple(),
            mode = self.config.reference_mode.as_str(),
            "Select control started"
        );

        loop {
            let deadline = self.search.deadline();
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(outcome) = self.search_outcomes.recv() => self.on_search_outcome(outcome),
                Some(outcome) = self.lookup_outcomes.recv() => self.on_lookup_outcome(outcome),
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_debounce_elapsed();
                }
            }
            self.publish();
        }

        debug!("All handles dropped, select control stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Input(raw) => self.on_input(raw),
            Command::FocusGained => self.on_focus_gained(),
            Command::FocusLost => self.blur(),
            Command::KeyDown(key) => self.on_key_down(key),
            Command::KeyUp(key) => self.on_key_up(key),
            Command::Hover(index) => self.results.hover(index),
            Command::PointerMoved => self.results.pointer_moved(),
            Command::SelectAt(index) => self.on_select_at(index),
            Command::Select(item) => self.on_item_selected(item),
            Command::Remove(item) => self.remove_item(&item),
            Command::WriteValue(value, responder) => self.write_value(value, responder),
            Command::SetDisabled(disabled) => self.set_disabled(disabled),
            Command::Focus => self.focus(),
            Command::FocusAndShowResults => self.focus_and_show_results(),
            Command::Snapshot(responder) => {
                let _ = responder.send(self.snapshot());
            }
            Command::Value(responder) => {
                let _ = responder.send(self.selection.build_external_value());
            }
        }
    }

    fn emit(&self, event: SelectEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    /// Run a command after everything already queued
    fn defer(&self, command: Command) {
        if let Some(commands) = self.requeue.upgrade() {
            let _ = commands.send(command);
        }
    }

    fn on_input(&mut self, raw: String) {
        if self.disabled {
            return;
        }
        self.term = raw;
        self.search.touch();
    }

    fn on_debounce_elapsed(&mut self) {
        if let Some(term) = self.search.take_debounced(&self.term) {
            self.run_term(term);
        }
    }

    /// Hide the results and search `term` when it is long enough
    fn run_term(&mut self, term: String) {
        self.results_visible = false;
        self.search.supersede();

        if !self.search.accepts(&term) {
            debug!(term = %term, "Term below minimum length, results hidden");
            return;
        }

        let current = self.selection.build_external_value();
        self.search.start(term, current);
    }

    fn on_search_outcome(&mut self, outcome: SearchOutcome) {
        if !self.search.is_current(outcome.generation) {
            debug!(generation = outcome.generation, "Discarding stale search result");
            return;
        }
        self.search.finish();

        match outcome.result {
            Ok(items) => {
                let items = if self.selection.is_multiple() {
                    exclude_selected(items, self.selection.set())
                } else {
                    items
                };
                debug!(term = %outcome.term, count = items.len(), "Search finished");
                self.results.replace(items);
            }
            Err(err) => {
                warn!(term = %outcome.term, "Search failed: {}", err);
                self.results.clear();
                self.emit(SelectEvent::SearchFailed {
                    term: outcome.term,
                    message: err.to_string(),
                });
            }
        }
        self.results_visible = self.focused;
    }

    fn on_focus_gained(&mut self) {
        if !self.disabled {
            self.focused = true;
        }
    }

    /// Clear the raw text without starting a search
    fn clear_term(&mut self) {
        self.term.clear();
        self.search.reset_input();
    }

    fn blur(&mut self) {
        self.clear_term();
        self.focused = false;
        self.results_visible = false;
        self.emit(SelectEvent::Touched);
    }

    fn focus(&mut self) {
        if self.disabled {
            return;
        }
        self.results_visible = false;
        self.focused = true;
    }

    fn focus_and_show_results(&mut self) {
        if self.disabled {
            return;
        }
        self.focused = true;
        self.run_term(String::new());
    }

    fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled {
            self.focused = false;
            self.results_visible = false;
        }
    }

    fn focus_state(&self) -> FocusState {
        FocusState {
            focused: self.focused && !self.disabled,
            results_visible: self.results_visible,
            term_empty: self.term.is_empty(),
            has_selection: !self.selection.set().is_empty(),
            searches_empty_term: self.config.min_term_length == 0,
        }
    }

    fn on_key_down(&mut self, key: Key) {
        let actions = key_down_actions(key, &self.focus_state());
        trace!(key = %key, ?actions, "Key down");
        for action in actions {
            self.apply(action);
        }
    }

    fn on_key_up(&mut self, key: Key) {
        let action = key_up_action(key, &self.focus_state());
        trace!(key = %key, ?action, "Key up");
        if let Some(action) = action {
            self.apply(action);
        }
    }

    fn apply(&mut self, action: KeyAction) {
        match action {
            KeyAction::RevealResults => self.results_visible = true,
            KeyAction::HideResults => self.results_visible = false,
            KeyAction::RemoveLastSelected => {
                if let Some(last) = self.selection.set().last().cloned() {
                    self.remove_item(&last);
                }
            }
            KeyAction::ActivateNext => self.results.activate_next(),
            KeyAction::ActivatePrevious => self.results.activate_previous(),
            KeyAction::CommitActive => {
                if let Some(item) = self.results.take_current() {
                    self.on_item_selected(item);
                }
            }
            KeyAction::OpenResults => self.focus_and_show_results(),
        }
    }

    fn on_select_at(&mut self, index: usize) {
        if self.disabled || !self.results_visible {
            return;
        }
        if let Some(item) = self.results.visible().get(index).cloned() {
            self.on_item_selected(item);
        }
    }

    fn on_item_selected(&mut self, item: Item) {
        if !self.selection.commit(item.clone()) {
            debug!(id = ?item.id, "Item already selected, ignoring");
            return;
        }
        self.clear_term();

        if self.selection.is_multiple() {
            if let Some(id) = &item.id {
                self.results.remove(id);
            }
            self.emit(SelectEvent::ValueChanged(self.selection.build_external_value()));
            self.emit(SelectEvent::Selected(item));
            self.defer(Command::FocusAndShowResults);
        } else {
            self.emit(SelectEvent::ValueChanged(self.selection.build_external_value()));
            self.blur();
            self.emit(SelectEvent::Selected(item));
        }
    }

    fn remove_item(&mut self, item: &Item) {
        let Some(removed) = self.selection.remove(item) else {
            debug!(id = ?item.id, "Item not selected, nothing to remove");
            return;
        };
        self.emit(SelectEvent::ValueChanged(self.selection.build_external_value()));
        self.emit(SelectEvent::Removed(removed));
    }

    fn write_value(
        &mut self,
        value: Option<ExternalValue>,
        responder: oneshot::Sender<Result<()>>,
    ) {
        self.pending_write.supersede();

        let value = value.unwrap_or_default();
        if value.is_null() {
            debug!("Clearing selection from null value");
            self.selection.clear();
            let _ = responder.send(Ok(()));
            return;
        }

        let values = self.selection.incoming(&value);
        let reference = self.selection.reference();
        let adapter = Arc::clone(&self.adapter);
        let outcomes = self.lookup_sender.clone();
        let generation = self.pending_write.generation;

        debug!(generation, count = values.len(), "Resolving written value");
        self.pending_write.responder = Some(responder);
        self.pending_write.task = Some(tokio::spawn(async move {
            let result = reference.resolve(values, adapter.as_ref()).await;
            let _ = outcomes.send(LookupOutcome { generation, result });
        }));
    }

    fn on_lookup_outcome(&mut self, outcome: LookupOutcome) {
        if !self.pending_write.is_current(outcome.generation) {
            debug!(generation = outcome.generation, "Discarding stale lookup result");
            return;
        }
        self.pending_write.task = None;
        let responder = self.pending_write.responder.take();

        let reply = match outcome.result {
            Ok(items) => {
                self.selection.apply_resolved(items);
                Ok(())
            }
            Err(err) => {
                warn!("Lookup failed, selection left unchanged: {}", err);
                self.emit(SelectEvent::LookupFailed {
                    message: err.to_string(),
                });
                Err(SelectError::from(err))
            }
        };

        if let Some(responder) = responder {
            let _ = responder.send(reply);
        }
    }

    fn status(&self, loading: bool) -> Option<String> {
        if !self.results_visible || loading {
            return None;
        }
        if self.results.is_empty() {
            Some(self.config.message_no_results.clone())
        } else if self.results.has_more() {
            Some(
                self.results
                    .count_message(&self.config.message_more_results, self.selection.set().len()),
            )
        } else {
            None
        }
    }

    fn snapshot(&self) -> ControlSnapshot {
        let loading = self.search.is_loading();
        let active_index = self.results.active_index();
        let candidates = self
            .results
            .visible()
            .iter()
            .enumerate()
            .map(|(index, item)| CandidateView {
                item: item.clone(),
                active: index == active_index,
                selected: self.results.is_selected(item, self.selection.set()),
            })
            .collect();

        ControlSnapshot {
            term: self.term.clone(),
            focused: self.focused,
            disabled: self.disabled,
            results_visible: self.results_visible,
            loading,
            candidates,
            total_candidates: self.results.len(),
            selected: self.selection.set().items().to_vec(),
            placeholder: self.selection.placeholder(&self.config.placeholder).to_string(),
            status: self.status(loading),
            value: self.selection.build_external_value(),
        }
    }

    fn publish(&self) {
        let next = self.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
