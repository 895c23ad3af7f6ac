//! Output cleanup for text captured from a terminal program
//!
//! Only SGR (color/style) sequences are removed; this is not a terminal
//! emulator and cursor-movement sequences pass through untouched.

use regex::Regex;
use std::sync::OnceLock;

static SGR_PATTERN: OnceLock<Regex> = OnceLock::new();

fn sgr_pattern() -> &'static Regex {
    SGR_PATTERN.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid SGR regex"))
}

/// Strip SGR escapes, normalize line endings to `\n` and trim.
///
/// Escapes are removed before line endings are touched so that no orphaned
/// control bytes survive.
pub fn sanitize(raw: &str) -> String {
    strip_sgr(raw)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .to_string()
}

/// Remove SGR sequences until none are left.
///
/// Removing one sequence can join its neighbours into a new one
/// (`"\x1b[\x1b[0mm"`), so a single pass is not enough.
fn strip_sgr(raw: &str) -> String {
    let pattern = sgr_pattern();
    let mut text = raw.to_string();
    while pattern.is_match(&text) {
        text = pattern.replace_all(&text, "").into_owned();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_colors_and_line_endings() {
        assert_eq!(sanitize("\x1b[31mHello\x1b[0m\r\nWorld\r"), "Hello\nWorld");
    }

    #[test]
    fn test_compound_sgr() {
        assert_eq!(sanitize("\x1b[1;32;40mok\x1b[m"), "ok");
    }

    #[test]
    fn test_non_sgr_sequences_kept() {
        assert_eq!(sanitize("a\x1b[2Kb"), "a\x1b[2Kb");
    }

    #[test]
    fn test_lone_cr_becomes_lf() {
        assert_eq!(sanitize("one\rtwo\r\nthree"), "one\ntwo\nthree");
    }

    #[test]
    fn test_crlf_is_single_newline() {
        assert_eq!(sanitize("a\r\n\r\nb"), "a\n\nb");
    }

    #[test]
    fn test_nested_sgr_fully_removed() {
        assert_eq!(sanitize("\x1b[\x1b[31mmred"), "red");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "\x1b[31mHello\x1b[0m\r\nWorld\r",
            "  \r\n\x1b[0m padded \x1b[1m\r ",
            "plain",
            "",
            "\x1b[\x1b[31mm",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {:?}", input);
        }
    }
}
