//! User-facing message templates for the result list

/// Placeholder replaced by the number of results shown
pub const VISIBLE_COUNT_VAR: &str = "%VISIBLE_COUNT%";

/// Placeholder replaced by the total number of matches
pub const MAX_COUNT_VAR: &str = "%MAX_COUNT%";

/// Default message when more results exist than are shown
pub const MORE_RESULTS: &str =
    "Showing %VISIBLE_COUNT% of %MAX_COUNT% results. Refine your search to show more results.";

/// Default message when a search produced nothing
pub const NO_RESULTS: &str = "No results available";

/// Substitute both count placeholders into a template
pub fn format_count(template: &str, visible_count: usize, max_count: usize) -> String {
    template
        .replace(VISIBLE_COUNT_VAR, &visible_count.to_string())
        .replace(MAX_COUNT_VAR, &max_count.to_string())
}
