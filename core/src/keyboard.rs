//! Keyboard and focus coordination
//!
//! Pure routing: given a key and the current focus/visibility state, decide
//! which actions the control performs. The control applies them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keys the control reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    ArrowDown,
    ArrowUp,
    ArrowLeft,
    ArrowRight,
    Enter,
    Escape,
    Delete,
    Backspace,
    Tab,
    Char(char),
    Other,
}

impl Key {
    pub fn is_arrow(&self) -> bool {
        matches!(
            self,
            Key::ArrowDown | Key::ArrowUp | Key::ArrowLeft | Key::ArrowRight
        )
    }

    /// Keys that remove the last selected item when the text is empty
    pub fn is_deletion(&self) -> bool {
        matches!(self, Key::Delete | Key::Backspace)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::ArrowDown => write!(f, "down"),
            Key::ArrowUp => write!(f, "up"),
            Key::ArrowLeft => write!(f, "left"),
            Key::ArrowRight => write!(f, "right"),
            Key::Enter => write!(f, "enter"),
            Key::Escape => write!(f, "escape"),
            Key::Delete => write!(f, "delete"),
            Key::Backspace => write!(f, "backspace"),
            Key::Tab => write!(f, "tab"),
            Key::Char(c) => write!(f, "{}", c),
            Key::Other => write!(f, "other"),
        }
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.to_ascii_lowercase().as_str() {
            "down" | "arrowdown" => Key::ArrowDown,
            "up" | "arrowup" => Key::ArrowUp,
            "left" | "arrowleft" => Key::ArrowLeft,
            "right" | "arrowright" => Key::ArrowRight,
            "enter" | "return" => Key::Enter,
            "escape" | "esc" => Key::Escape,
            "delete" | "del" => Key::Delete,
            "backspace" => Key::Backspace,
            "tab" => Key::Tab,
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => return Err(format!("Unknown key: {}", s)),
                }
            }
        };
        Ok(key)
    }
}

/// What the host should do with the native key event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyResponse {
    /// Suppress the input's default behaviour (newline or form submit)
    pub prevent_default: bool,
}

impl KeyResponse {
    /// Response for a key-down, independent of control state
    pub fn for_key_down(key: Key) -> Self {
        Self {
            prevent_default: key == Key::Enter,
        }
    }
}

/// State the router needs to know about
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusState {
    pub focused: bool,
    pub results_visible: bool,
    pub term_empty: bool,
    pub has_selection: bool,
    /// Zero minimum term length: the empty term searches
    pub searches_empty_term: bool,
}

/// Action requested by a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    RevealResults,
    HideResults,
    RemoveLastSelected,
    ActivateNext,
    ActivatePrevious,
    CommitActive,
    OpenResults,
}

/// Route a key-down
///
/// Cursor movement only applies when the results view was already showing
/// before this key; the first arrow on hidden results just reveals them.
pub fn key_down_actions(key: Key, state: &FocusState) -> Vec<KeyAction> {
    let mut actions = Vec::new();
    if !state.focused {
        return actions;
    }

    if !state.results_visible && key.is_arrow() {
        actions.push(KeyAction::RevealResults);
    }

    if key == Key::Escape {
        actions.push(KeyAction::HideResults);
    }

    if key.is_deletion() && state.term_empty && state.has_selection {
        actions.push(KeyAction::RemoveLastSelected);
    }

    if state.results_visible {
        match key {
            Key::ArrowDown => actions.push(KeyAction::ActivateNext),
            Key::ArrowUp => actions.push(KeyAction::ActivatePrevious),
            _ => {}
        }
    }

    actions
}

/// Route a key-up
pub fn key_up_action(key: Key, state: &FocusState) -> Option<KeyAction> {
    if !state.focused {
        return None;
    }

    if state.results_visible {
        return (key == Key::Enter).then_some(KeyAction::CommitActive);
    }

    if state.searches_empty_term && matches!(key, Key::Enter | Key::ArrowDown) {
        return Some(KeyAction::OpenResults);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn focused() -> FocusState {
        FocusState {
            focused: true,
            term_empty: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_arrow_reveals_hidden_results_without_moving() {
        let actions = key_down_actions(Key::ArrowDown, &focused());
        assert_eq!(actions, vec![KeyAction::RevealResults]);

        let actions = key_down_actions(Key::ArrowLeft, &focused());
        assert_eq!(actions, vec![KeyAction::RevealResults]);
    }

    #[test]
    fn test_arrows_move_cursor_when_visible() {
        let state = FocusState {
            results_visible: true,
            ..focused()
        };

        assert_eq!(
            key_down_actions(Key::ArrowDown, &state),
            vec![KeyAction::ActivateNext]
        );
        assert_eq!(
            key_down_actions(Key::ArrowUp, &state),
            vec![KeyAction::ActivatePrevious]
        );
        assert!(key_down_actions(Key::ArrowRight, &state).is_empty());
    }

    #[test]
    fn test_escape_hides() {
        let state = FocusState {
            results_visible: true,
            ..focused()
        };
        assert_eq!(
            key_down_actions(Key::Escape, &state),
            vec![KeyAction::HideResults]
        );
    }

    #[test]
    fn test_delete_removes_last_only_with_empty_text() {
        let state = FocusState {
            has_selection: true,
            ..focused()
        };
        assert_eq!(
            key_down_actions(Key::Delete, &state),
            vec![KeyAction::RemoveLastSelected]
        );
        assert_eq!(
            key_down_actions(Key::Backspace, &state),
            vec![KeyAction::RemoveLastSelected]
        );

        let typing = FocusState {
            term_empty: false,
            ..state
        };
        assert!(key_down_actions(Key::Delete, &typing).is_empty());

        let nothing_selected = FocusState {
            has_selection: false,
            ..state
        };
        assert!(key_down_actions(Key::Delete, &nothing_selected).is_empty());
    }

    #[test]
    fn test_unfocused_ignores_keys() {
        let state = FocusState {
            focused: false,
            results_visible: true,
            has_selection: true,
            ..Default::default()
        };
        assert!(key_down_actions(Key::Delete, &state).is_empty());
        assert_eq!(key_up_action(Key::Enter, &state), None);
    }

    #[test]
    fn test_enter_commits_when_visible() {
        let state = FocusState {
            results_visible: true,
            ..focused()
        };
        assert_eq!(key_up_action(Key::Enter, &state), Some(KeyAction::CommitActive));
        assert_eq!(key_up_action(Key::ArrowDown, &state), None);
    }

    #[test]
    fn test_enter_opens_results_with_zero_min_length() {
        let state = FocusState {
            searches_empty_term: true,
            ..focused()
        };
        assert_eq!(key_up_action(Key::Enter, &state), Some(KeyAction::OpenResults));
        assert_eq!(
            key_up_action(Key::ArrowDown, &state),
            Some(KeyAction::OpenResults)
        );
        assert_eq!(key_up_action(Key::Enter, &focused()), None);
    }

    #[test]
    fn test_enter_always_prevents_default() {
        assert!(KeyResponse::for_key_down(Key::Enter).prevent_default);
        assert!(!KeyResponse::for_key_down(Key::ArrowDown).prevent_default);
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!("down".parse::<Key>(), Ok(Key::ArrowDown));
        assert_eq!("Enter".parse::<Key>(), Ok(Key::Enter));
        assert_eq!("x".parse::<Key>(), Ok(Key::Char('x')));
        assert!("hyper".parse::<Key>().is_err());
    }
}
