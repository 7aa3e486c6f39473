//! Configuration types for a select control
//!
//! Every option is fixed at construction time. Loading and merging config
//! files happens in the CLI layer.

use crate::error::ConfigError;
use crate::messages;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// How the bound external value refers to selected entities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceMode {
    /// External value holds identifiers, resolved through a lookup capability
    #[default]
    Id,
    /// External value holds the host entities themselves
    Entity,
}

impl ReferenceMode {
    /// Get the mode name as a string
    pub fn as_str(&self) -> &str {
        match self {
            ReferenceMode::Id => "id",
            ReferenceMode::Entity => "entity",
        }
    }
}

impl FromStr for ReferenceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(ReferenceMode::Id),
            "entity" => Ok(ReferenceMode::Entity),
            other => Err(ConfigError::UnknownReferenceMode(other.to_string())),
        }
    }
}

/// Configuration for one select control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectConfig {
    /// Whether the external value carries ids or entities
    pub reference_mode: ReferenceMode,

    /// Allow more than one selected item
    pub multiple: bool,

    /// Placeholder shown while nothing is selected
    pub placeholder: String,

    /// Start disabled
    pub disabled: bool,

    /// Maximum number of candidates shown at once (all when unset)
    pub max_results: Option<usize>,

    /// Fetch the full dataset once and filter locally afterwards
    pub client_mode: bool,

    /// Quiet period after the last keystroke before a search starts
    pub debounce_delay_ms: u64,

    /// Minimum number of characters before a term is searched
    pub min_term_length: usize,

    /// Shown when more candidates exist than `max_results`
    pub message_more_results: String,

    /// Shown when a search produced no candidates
    pub message_no_results: String,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            reference_mode: ReferenceMode::default(),
            multiple: false,
            placeholder: String::new(),
            disabled: false,
            max_results: None,
            client_mode: false,
            debounce_delay_ms: 250,
            min_term_length: 2,
            message_more_results: messages::MORE_RESULTS.to_string(),
            message_no_results: messages::NO_RESULTS.to_string(),
        }
    }
}

impl SelectConfig {
    /// Create a default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reference mode
    pub fn with_reference_mode(mut self, reference_mode: ReferenceMode) -> Self {
        self.reference_mode = reference_mode;
        self
    }

    /// Enable or disable multiple selection
    pub fn with_multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    /// Set the placeholder text
    pub fn with_placeholder<S: Into<String>>(mut self, placeholder: S) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Set the initial disabled flag
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Cap the number of visible candidates
    pub fn with_max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }

    /// Enable or disable client-filter mode
    pub fn with_client_mode(mut self, client_mode: bool) -> Self {
        self.client_mode = client_mode;
        self
    }

    /// Set the debounce delay in milliseconds
    pub fn with_debounce_delay_ms(mut self, debounce_delay_ms: u64) -> Self {
        self.debounce_delay_ms = debounce_delay_ms;
        self
    }

    /// Set the minimum term length
    pub fn with_min_term_length(mut self, min_term_length: usize) -> Self {
        self.min_term_length = min_term_length;
        self
    }

    /// Set the "more results" template
    pub fn with_message_more_results<S: Into<String>>(mut self, message: S) -> Self {
        self.message_more_results = message.into();
        self
    }

    /// Set the "no results" template
    pub fn with_message_no_results<S: Into<String>>(mut self, message: S) -> Self {
        self.message_no_results = message.into();
        self
    }

    /// Debounce delay as a duration
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_results == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_results".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}
