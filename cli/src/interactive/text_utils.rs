//! Text measuring utilities for interactive mode
//!
//! Unicode-aware width calculation so CJK and other wide characters line up
//! in the terminal.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Ellipsis appended to truncated text
const ELLIPSIS: char = '…';

/// Cut `text` so it occupies at most `max_width` columns
///
/// An ellipsis marks the cut; it counts toward the width.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text_width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let budget = max_width - 1;
    let mut truncated = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let width = char_width(ch);
        if used + width > budget {
            break;
        }
        truncated.push(ch);
        used += width;
    }
    truncated.push(ELLIPSIS);
    truncated
}

/// Get terminal width with fallback
pub fn get_terminal_width() -> usize {
    match crossterm::terminal::size() {
        Ok((cols, _)) => std::cmp::max(cols as usize, 20),
        Err(_) => 80,
    }
}

/// Calculate the display width of text considering Unicode characters
pub fn text_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Calculate the display width of a single character
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(truncate_to_width("Hello world", 20), "Hello world");
    }

    #[test]
    fn test_long_text_gets_ellipsis() {
        let truncated = truncate_to_width("This is a very long line", 10);
        assert_eq!(truncated, "This is a…");
        assert_eq!(text_width(&truncated), 10);
    }

    #[test]
    fn test_truncate_unicode() {
        let truncated = truncate_to_width("这是一个包含中文的测试文本", 9);
        assert!(text_width(&truncated) <= 9);
        assert!(truncated.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_zero_width() {
        assert_eq!(truncate_to_width("abc", 0), "");
    }
}
