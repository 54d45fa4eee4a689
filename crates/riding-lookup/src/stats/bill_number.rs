//! Best-effort bill number extraction from free-text motion titles.
//!
//! Titles are written by clerks, not machines, so this is a heuristic: it
//! recognizes `C-12` / `S-203` style identifiers and nothing else.

use regex::Regex;
use std::sync::OnceLock;

static BILL_NUMBER: OnceLock<Regex> = OnceLock::new();

fn bill_number_pattern() -> &'static Regex {
    BILL_NUMBER.get_or_init(|| {
        Regex::new(r"(?:^|[,\s])([CS]-\d+)").expect("bill number pattern compiles")
    })
}

/// First `C-`/`S-` bill identifier that starts the title or follows a comma or whitespace.
pub fn extract_bill_number(motion_title: &str) -> Option<String> {
    bill_number_pattern()
        .captures(motion_title)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str().to_string())
}

/// Canonical form used as the category table key: trimmed, uppercase, no inner spaces.
pub fn normalize_bill_number(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_identifier_at_start_of_title() {
        assert_eq!(
            extract_bill_number("C-12, An Act to amend the Customs Act").as_deref(),
            Some("C-12")
        );
        assert_eq!(extract_bill_number("S-203").as_deref(), Some("S-203"));
    }

    #[test]
    fn extracts_identifier_after_space_or_comma() {
        assert_eq!(
            extract_bill_number("3rd reading and adoption of Bill C-69").as_deref(),
            Some("C-69")
        );
        assert_eq!(
            extract_bill_number("Concurrence in Senate amendments,S-5").as_deref(),
            Some("S-5")
        );
        assert_eq!(
            extract_bill_number("Motion respecting\tC-101 (report stage)").as_deref(),
            Some("C-101")
        );
    }

    #[test]
    fn returns_first_identifier_when_several_appear() {
        assert_eq!(
            extract_bill_number("Bill C-3 and Bill S-2 together").as_deref(),
            Some("C-3")
        );
    }

    #[test]
    fn ignores_identifiers_glued_to_other_text() {
        assert_eq!(extract_bill_number("ABC-12 procedural motion"), None);
        assert_eq!(extract_bill_number("(C-12)"), None);
        assert_eq!(extract_bill_number("Bill-C-12"), None);
    }

    #[test]
    fn ignores_other_prefixes_and_malformed_numbers() {
        assert_eq!(extract_bill_number("Motion M-103"), None);
        assert_eq!(extract_bill_number("Bill C- 12"), None);
        assert_eq!(extract_bill_number("Bill C12"), None);
        assert_eq!(extract_bill_number("bill c-12"), None, "prefix is case sensitive");
        assert_eq!(extract_bill_number(""), None);
    }

    #[test]
    fn keeps_only_leading_digits() {
        assert_eq!(
            extract_bill_number("Bill C-12A, reprint").as_deref(),
            Some("C-12")
        );
    }

    #[test]
    fn normalization_uppercases_and_strips_spaces() {
        assert_eq!(normalize_bill_number(" c-12 "), "C-12");
        assert_eq!(normalize_bill_number("S - 5"), "S-5");
    }
}
