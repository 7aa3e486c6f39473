//! # pickr Core
//!
//! Core library for pickr - a searchable select control.
//!
//! This library provides the building blocks of a select-style input: a
//! debounced search pipeline over host-supplied data, a navigable result
//! list, single and multiple selection with id or entity values, and the
//! keyboard/focus routing that ties them together. Rendering is left to the
//! host, which drives a [`SelectHandle`] and draws [`ControlSnapshot`]s.

// Core modules
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod item;
pub mod keyboard;
pub mod messages;
pub mod results;
pub mod search;
pub mod selection;
pub mod source;
pub mod value;

// Re-export commonly used types
pub use config::{ReferenceMode, SelectConfig};
pub use control::{SelectBuilder, SelectHandle};
pub use error::{ConfigError, Result, SelectError, SourceError};
pub use events::{CandidateView, ControlSnapshot, SelectEvent};
pub use item::{FieldAdapter, Item, ItemAdapter, ItemId, RawEntity};
pub use keyboard::{Key, KeyResponse};
pub use source::{DataSource, InMemorySource, SelectedLookup};
pub use value::ExternalValue;

/// Current version of the pickr-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for the library
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize tracing with a specific debug mode
pub fn init_tracing_with_debug(debug: bool) {
    let filter = if debug { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}
