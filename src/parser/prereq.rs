use std::sync::LazyLock;

use regex::Regex;

use crate::code::CourseCode;
use crate::model::Prerequisite;

static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[0-9]{6,10}\b").unwrap());
static OR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bor\b").unwrap());
static THRESHOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:>=|=>|≥|\bat\s+least)\s*(\d{1,3})\b").unwrap());
static APPROVAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:approval|permission|consent)\b").unwrap());
static NONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(?:none|nil|n/?a|-+)$").unwrap());
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:Pearson|HTU|HNC|HND|Prerequisites?|Co-?requisites?)\b:?").unwrap()
});
// Text after these belongs to the next table, not the prerequisite.
static STOP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Total|University Elective|College Requirements|Department Requirements|List of Elective)\b").unwrap()
});

/// Collapse whitespace and drop framework / prerequisite label tokens.
pub fn clean_text(text: &str) -> String {
    let stripped = LABEL_RE.replace_all(text, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleanup for raw prerequisite text, which may run into the next table.
pub fn clean_prereq(text: &str) -> String {
    let cut = STOP_RE.find(text).map_or(text, |m| &text[..m.start()]);
    clean_text(cut)
}

/// Turn cleaned prerequisite text into a structured value. `None` means
/// the course has no prerequisite.
pub fn resolve(text: &str) -> Option<Prerequisite> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut codes: Vec<CourseCode> = Vec::new();
    for m in CODE_RE.find_iter(text) {
        let code = CourseCode::from(m.as_str());
        if !codes.contains(&code) {
            codes.push(code);
        }
    }

    if !codes.is_empty() {
        if codes.len() >= 2 && OR_RE.is_match(text) {
            return Some(Prerequisite::AnyOf(codes));
        }
        return Some(Prerequisite::AllOf(codes));
    }

    if let Some(caps) = THRESHOLD_RE.captures(text) {
        if let Ok(hours) = caps[1].parse() {
            return Some(Prerequisite::CreditHours(hours));
        }
    }

    if APPROVAL_RE.is_match(text) {
        return Some(Prerequisite::Condition(canonical_condition(text).to_string()));
    }

    let residue = text.trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
    if residue.chars().count() <= 3
        || NONE_RE.is_match(residue)
        || residue.chars().all(|c| c.is_ascii_digit() || c.is_ascii_punctuation() || c.is_whitespace())
    {
        return None;
    }
    Some(Prerequisite::Condition(residue.to_string()))
}

fn canonical_condition(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("dean") {
        "Dean Approval"
    } else if lower.contains("instructor") {
        "Instructor Permission"
    } else {
        "Department Approval"
    }
}

// ── Tests ──
