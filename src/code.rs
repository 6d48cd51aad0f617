use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical course identifier. Construction always normalizes, so two
/// values compare equal iff their raw forms name the same course.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CourseCode(String);

impl CourseCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CourseCode {
    fn from(raw: &str) -> Self {
        CourseCode(normalize(raw))
    }
}

impl From<String> for CourseCode {
    fn from(raw: String) -> Self {
        CourseCode(normalize(&raw))
    }
}

impl From<CourseCode> for String {
    fn from(code: CourseCode) -> Self {
        code.0
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Strip the two redundant leading zeros of a 10-character code.
/// Everything else passes through (trimmed).
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() == 10 && trimmed.starts_with("00") {
        trimmed[2..].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Year level read from the digit `from_end` places from the end of the
/// code. Anything outside 1..=5 (or a code too short) falls back to 1.
pub fn infer_level(code: &CourseCode, from_end: usize) -> u8 {
    if from_end == 0 {
        return 1;
    }
    code.as_str()
        .chars()
        .rev()
        .nth(from_end - 1)
        .and_then(|c| c.to_digit(10))
        .map(|d| d as u8)
        .filter(|d| (1..=5).contains(d))
        .unwrap_or(1)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_double_zero_prefix() {
        assert_eq!(normalize("0030301121"), "30301121");
        assert_eq!(normalize("  0040201491 "), "40201491");
    }

    #[test]
    fn other_shapes_pass_through() {
        assert_eq!(normalize("30301121"), "30301121");
        // only 10-character codes are touched
        assert_eq!(normalize("00301121"), "00301121");
        assert_eq!(normalize("0130301121"), "0130301121");
        assert_eq!(normalize("10203180"), "10203180");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["0030301121", "0000201391", "30301121", "00123", "", "abc", "0012345678"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn codes_compare_by_canonical_form() {
        assert_eq!(CourseCode::from("0030301121"), CourseCode::from("30301121"));
        assert_ne!(CourseCode::from("30301121"), CourseCode::from("30301122"));
    }

    #[test]
    fn serde_normalizes_on_read() {
        let code: CourseCode = serde_json::from_str("\"0040201251\"").unwrap();
        assert_eq!(code.as_str(), "40201251");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"40201251\"");
    }

    #[test]
    fn level_from_code_position() {
        let code = CourseCode::from("40201391");
        assert_eq!(infer_level(&code, 3), 3);
        let code = CourseCode::from("10203481");
        assert_eq!(infer_level(&code, 4), 3);
        // digit 0 or 9 is not a level
        assert_eq!(infer_level(&CourseCode::from("30101901"), 3), 1);
        assert_eq!(infer_level(&CourseCode::from("12"), 3), 1);
    }
}
