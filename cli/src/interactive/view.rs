//! Terminal layout of a control snapshot
//!
//! Pure functions from render state to styled lines, kept apart from the
//! terminal so they can be tested.

use super::text_utils::{text_width, truncate_to_width};
use pickr_core::{ControlSnapshot, SelectEvent};
use std::collections::VecDeque;

/// Row of the input line
pub const INPUT_ROW: u16 = 2;

/// Row of the first candidate
pub const CANDIDATE_ROW: u16 = 3;

/// Prefix in front of the raw text
const PROMPT: &str = "> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Muted,
    Active,
    Selected,
    Status,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLine {
    pub text: String,
    pub tone: Tone,
}

impl ViewLine {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

/// Most recent events, oldest first
#[derive(Debug, Clone)]
pub struct EventLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: &SelectEvent) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(describe(event));
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}

/// One-line description of an event
pub fn describe(event: &SelectEvent) -> String {
    match event {
        SelectEvent::Selected(item) => format!("selected {}", item.text),
        SelectEvent::Removed(item) => format!("removed {}", item.text),
        SelectEvent::ValueChanged(value) => format!(
            "value {}",
            serde_json::to_string(value).unwrap_or_else(|_| "?".to_string())
        ),
        SelectEvent::Touched => "touched".to_string(),
        SelectEvent::SearchFailed { term, message } => {
            format!("search for '{}' failed: {}", term, message)
        }
        SelectEvent::LookupFailed { message } => format!("lookup failed: {}", message),
    }
}

/// Lay out the whole screen
pub fn render(snapshot: &ControlSnapshot, log: &EventLog, width: usize) -> Vec<ViewLine> {
    let fit = |text: String| truncate_to_width(&text, width);
    let mut lines = Vec::new();

    lines.push(ViewLine::new(
        fit(format!(
            "pickr {}  Tab: focus  Ctrl-C: quit",
            pickr_core::VERSION
        )),
        Tone::Muted,
    ));

    lines.push(if snapshot.selected.is_empty() {
        ViewLine::new(fit(snapshot.placeholder.clone()), Tone::Muted)
    } else {
        ViewLine::new(fit(selection_line(snapshot)), Tone::Selected)
    });

    let prompt = if snapshot.focused { PROMPT } else { "  " };
    let tone = if snapshot.disabled { Tone::Muted } else { Tone::Plain };
    lines.push(ViewLine::new(fit(format!("{}{}", prompt, snapshot.term)), tone));

    if snapshot.results_visible {
        for candidate in &snapshot.candidates {
            let marker = if candidate.active { "›" } else { " " };
            let check = if candidate.selected { "✓" } else { " " };
            let tone = if candidate.active {
                Tone::Active
            } else {
                Tone::Plain
            };
            lines.push(ViewLine::new(
                fit(format!("{} {} {}", marker, check, candidate.item.text)),
                tone,
            ));
        }
        if let Some(status) = &snapshot.status {
            lines.push(ViewLine::new(fit(status.clone()), Tone::Status));
        }
    }
    if snapshot.loading {
        lines.push(ViewLine::new("Searching…", Tone::Status));
    }

    lines.push(ViewLine::new("", Tone::Plain));
    for line in log.lines() {
        let tone = if line.contains("failed") {
            Tone::Error
        } else {
            Tone::Muted
        };
        lines.push(ViewLine::new(fit(line.to_string()), tone));
    }

    lines
}

fn selection_line(snapshot: &ControlSnapshot) -> String {
    snapshot
        .selected
        .iter()
        .map(|item| format!("[{}]", item.text))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Column of the text cursor on the input line
pub fn cursor_column(snapshot: &ControlSnapshot) -> u16 {
    let column = text_width(PROMPT) + text_width(&snapshot.term);
    u16::try_from(column).unwrap_or(u16::MAX)
}

/// Candidate index under a terminal row, when a candidate is drawn there
pub fn candidate_at(snapshot: &ControlSnapshot, row: u16) -> Option<usize> {
    if !snapshot.results_visible || row < CANDIDATE_ROW {
        return None;
    }
    let index = usize::from(row - CANDIDATE_ROW);
    (index < snapshot.candidates.len()).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickr_core::{CandidateView, ExternalValue, Item};
    use serde_json::json;

    fn candidate(id: i64, text: &str, active: bool) -> CandidateView {
        CandidateView {
            item: Item::new(id, text, json!({"id": id, "text": text})),
            active,
            selected: false,
        }
    }

    fn open_snapshot() -> ControlSnapshot {
        ControlSnapshot {
            term: "ge".to_string(),
            focused: true,
            results_visible: true,
            candidates: vec![candidate(1, "Germany", true), candidate(2, "Georgia", false)],
            total_candidates: 2,
            placeholder: "Pick a country".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_open_results() {
        let lines = render(&open_snapshot(), &EventLog::new(3), 80);

        assert_eq!(lines[1], ViewLine::new("Pick a country", Tone::Muted));
        assert_eq!(lines[2], ViewLine::new("> ge", Tone::Plain));
        assert_eq!(lines[3], ViewLine::new("›   Germany", Tone::Active));
        assert_eq!(lines[4], ViewLine::new("    Georgia", Tone::Plain));
    }

    #[test]
    fn test_hidden_results_are_not_drawn() {
        let snapshot = ControlSnapshot {
            results_visible: false,
            ..open_snapshot()
        };
        let lines = render(&snapshot, &EventLog::new(3), 80);

        assert!(!lines.iter().any(|line| line.text.contains("Germany")));
    }

    #[test]
    fn test_selected_items_replace_placeholder() {
        let snapshot = ControlSnapshot {
            selected: vec![Item::new(1, "Germany", json!({}))],
            value: ExternalValue::One(json!(1)),
            ..open_snapshot()
        };
        let lines = render(&snapshot, &EventLog::new(3), 80);

        assert_eq!(lines[1], ViewLine::new("[Germany]", Tone::Selected));
    }

    #[test]
    fn test_candidate_rows() {
        let snapshot = open_snapshot();

        assert_eq!(candidate_at(&snapshot, CANDIDATE_ROW), Some(0));
        assert_eq!(candidate_at(&snapshot, CANDIDATE_ROW + 1), Some(1));
        assert_eq!(candidate_at(&snapshot, CANDIDATE_ROW + 2), None);
        assert_eq!(candidate_at(&snapshot, INPUT_ROW), None);
    }

    #[test]
    fn test_event_log_keeps_latest() {
        let mut log = EventLog::new(2);
        log.push(&SelectEvent::Touched);
        log.push(&SelectEvent::Selected(Item::new(1, "Germany", json!({}))));
        log.push(&SelectEvent::LookupFailed {
            message: "offline".to_string(),
        });

        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines, vec!["selected Germany", "lookup failed: offline"]);
    }

    #[test]
    fn test_cursor_column_counts_wide_chars() {
        let snapshot = ControlSnapshot {
            term: "日本".to_string(),
            ..Default::default()
        };
        assert_eq!(cursor_column(&snapshot), 6);
    }
}
