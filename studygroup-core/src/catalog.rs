//! Course catalog helpers shared by the store and the HTTP layer.

/// Queries shorter than this (after trimming) return no results.
pub const MIN_SEARCH_LEN: usize = 2;

/// Upper bound on search results.
pub const MAX_SEARCH_RESULTS: usize = 10;

/// Turn a raw search string into a case-insensitive `LIKE` pattern.
///
/// Case folding is ASCII-only, matching SQLite's `lower()` and `LIKE`.
/// Non-ASCII letters must match exactly.
///
/// Returns `None` when the query is too short to search. `%`, `_` and `\`
/// are escaped so they match literally; the pattern must be used with
/// `ESCAPE '\'`.
pub fn search_pattern(query: &str) -> Option<String> {
    let query = query.trim();
    if query.chars().count() < MIN_SEARCH_LEN {
        return None;
    }

    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.to_ascii_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

/// Display name of a course, e.g. `"CS 1337"`.
pub fn course_name(department: &str, course_number: &str) -> String {
    format!("{} {}", department, course_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_queries_do_not_search() {
        assert_eq!(search_pattern(""), None);
        assert_eq!(search_pattern(" c "), None);
    }

    #[test]
    fn test_pattern_is_lowercased_and_wrapped() {
        assert_eq!(search_pattern("  Math ").as_deref(), Some("%math%"));
    }

    #[test]
    fn test_non_ascii_letters_are_not_folded() {
        assert_eq!(search_pattern("ÉMILE").as_deref(), Some("%Émile%"));
    }

    #[test]
    fn test_wildcards_are_escaped() {
        assert_eq!(search_pattern("10%_").as_deref(), Some("%10\\%\\_%"));
    }

    #[test]
    fn test_course_name() {
        assert_eq!(course_name("CS", "1337"), "CS 1337");
    }
}
