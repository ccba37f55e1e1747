//! Path argument cleanup.
//!
//! Build tools on Windows pass directory arguments like `"C:\out\"`. The
//! trailing backslash escapes the closing quote, so the program receives
//! `C:\out"` (or a fully quoted string when invoked through another shell).
//! Paths cannot legitimately start or end with a double quote, so those
//! are stripped along with surrounding whitespace.

/// Strip stray quotes and whitespace from both ends of a path argument.
pub fn fix_quoted_path(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_escaped_trailing_quote() {
        assert_eq!(fix_quoted_path(r#"C:\out\""#), r"C:\out\");
        assert_eq!(fix_quoted_path(r#"C:\out""#), r"C:\out");
    }

    #[test]
    fn strips_surrounding_quotes_and_whitespace() {
        assert_eq!(fix_quoted_path(r#"  "/tmp/my app/out"  "#), "/tmp/my app/out");
    }

    #[test]
    fn leaves_clean_paths_alone() {
        assert_eq!(fix_quoted_path("bin/Release/dist"), "bin/Release/dist");
    }

    #[test]
    fn quotes_only_becomes_empty() {
        assert_eq!(fix_quoted_path(r#""""#), "");
        assert_eq!(fix_quoted_path("   "), "");
    }
}
