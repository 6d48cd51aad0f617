use std::sync::LazyLock;

use regex::Regex;

use super::variant::{RuleTable, TripleOrder};

static CODE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*([0-9]{5,10})").unwrap());
static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:Table|Page)\s+\d+").unwrap());
static TOTAL_LAST_COLUMNS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btheory\b.*\blab\b.*\btotal\b").unwrap());
static CREDITS_FIRST_COLUMNS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blecture\b.*\bpractical\b").unwrap());

/// What a single line of a study plan contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    /// Page furniture ("Page 3 of 10", "Table 2 ..."). Dropped.
    Noise,
    /// Table column header that fixes how numeric triples are read.
    ColumnHeader(TripleOrder),
    StartsRecord { code: &'a str, remainder: &'a str },
    Continuation(&'a str),
}

/// Classify one line. Section headers are not decided here; the section
/// tracker looks at every non-record line first.
pub fn classify_line<'a>(line: &'a str, rules: &RuleTable) -> Line<'a> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }

    if let Some(caps) = CODE_PREFIX_RE.captures(trimmed) {
        let m = caps.get(1).map_or(0..0, |m| m.range());
        let rest = &trimmed[m.end..];
        let starts = match rest.chars().next() {
            None => true,
            Some(c) if c.is_whitespace() => true,
            Some(c) => rules.glued_codes && c.is_alphabetic(),
        };
        if starts && !NOISE_RE.is_match(trimmed) {
            return Line::StartsRecord {
                code: &trimmed[m],
                remainder: rest.trim(),
            };
        }
    }

    if NOISE_RE.is_match(trimmed) {
        return Line::Noise;
    }
    if TOTAL_LAST_COLUMNS_RE.is_match(trimmed) {
        return Line::ColumnHeader(TripleOrder::TotalLast);
    }
    if CREDITS_FIRST_COLUMNS_RE.is_match(trimmed) {
        return Line::ColumnHeader(TripleOrder::CreditsFirst);
    }
    Line::Continuation(trimmed)
}

// ── Tests ──
