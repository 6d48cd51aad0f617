use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::code::CourseCode;

static THRESHOLD_EXPR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>=\s*(\d{1,4})\b").unwrap());
static CODE_SHAPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{6,10}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    University,
    College,
    #[default]
    Department,
    Elective,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::University,
        Category::College,
        Category::Department,
        Category::Elective,
    ];

    /// Key of this bucket in the serialized catalog.
    pub fn key(self) -> &'static str {
        match self {
            Category::University => "university_requirements",
            Category::College => "college_requirements",
            Category::Department => "department_requirements",
            Category::Elective => "electives",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::University => "University Requirements",
            Category::College => "College Requirements",
            Category::Department => "Department Requirements",
            Category::Elective => "Electives",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Category::University => 0,
            Category::College => 1,
            Category::Department => 2,
            Category::Elective => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Accreditation track label printed next to a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Framework {
    Htu,
    Hnc,
    Hnd,
}

impl Framework {
    pub const ALL: [Framework; 3] = [Framework::Htu, Framework::Hnc, Framework::Hnd];

    pub fn label(self) -> &'static str {
        match self {
            Framework::Htu => "HTU",
            Framework::Hnc => "HNC",
            Framework::Hnd => "HND",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Framework::ALL
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Structured prerequisite. Serialized as the plain-string encoding used by
/// published catalogs: codes joined by `" AND "` / `" OR "`, `">= N"`, or
/// free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prerequisite {
    AllOf(Vec<CourseCode>),
    AnyOf(Vec<CourseCode>),
    CreditHours(u32),
    Condition(String),
}

impl Prerequisite {
    pub fn codes(&self) -> &[CourseCode] {
        match self {
            Prerequisite::AllOf(codes) | Prerequisite::AnyOf(codes) => codes,
            Prerequisite::CreditHours(_) | Prerequisite::Condition(_) => &[],
        }
    }

    /// Strict decoder for the serialized encoding. Returns `None` for
    /// blank input.
    pub fn decode(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        if let Some(caps) = THRESHOLD_EXPR_RE.captures(s) {
            if let Ok(hours) = caps[1].parse() {
                return Some(Prerequisite::CreditHours(hours));
            }
        }
        if let Some(codes) = split_codes(s, " OR ") {
            if codes.len() > 1 {
                return Some(Prerequisite::AnyOf(codes));
            }
        }
        if let Some(codes) = split_codes(s, " AND ") {
            return Some(Prerequisite::AllOf(codes));
        }
        Some(Prerequisite::Condition(s.to_string()))
    }
}

fn split_codes(s: &str, sep: &str) -> Option<Vec<CourseCode>> {
    s.split(sep)
        .map(str::trim)
        .map(|part| CODE_SHAPE_RE.is_match(part).then(|| CourseCode::from(part)))
        .collect()
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |codes: &[CourseCode], sep: &str| {
            codes.iter().map(CourseCode::as_str).collect::<Vec<_>>().join(sep)
        };
        match self {
            Prerequisite::AllOf(codes) => f.write_str(&join(codes, " AND ")),
            Prerequisite::AnyOf(codes) => f.write_str(&join(codes, " OR ")),
            Prerequisite::CreditHours(hours) => write!(f, ">= {hours}"),
            Prerequisite::Condition(text) => f.write_str(text),
        }
    }
}

impl Serialize for Prerequisite {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Prerequisite {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Prerequisite::decode(&raw).ok_or_else(|| serde::de::Error::custom("empty prerequisite"))
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub code: CourseCode,
    #[serde(default)]
    pub name: String,
    /// 0 means "not determined", never a zero-credit course.
    #[serde(rename = "ch", default)]
    pub credit_hours: u8,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_framework"
    )]
    pub framework: Option<Framework>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    /// Implied by the bucket a record is stored in.
    #[serde(skip)]
    pub category: Category,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_prereq"
    )]
    pub prereq: Option<Prerequisite>,
}

impl CourseRecord {
    pub fn has_credit_hours(&self) -> bool {
        self.credit_hours > 0
    }
}

// Published catalogs carry labels outside the known set ("Pearson", "").
fn lenient_framework<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Framework>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().and_then(Framework::from_label))
}

fn optional_prereq<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Prerequisite>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().and_then(Prerequisite::decode))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(raw: &[&str]) -> Vec<CourseCode> {
        raw.iter().map(|c| CourseCode::from(*c)).collect()
    }

    #[test]
    fn prerequisite_encoding() {
        assert_eq!(
            Prerequisite::AllOf(codes(&["30301121", "30301122"])).to_string(),
            "30301121 AND 30301122"
        );
        assert_eq!(
            Prerequisite::AnyOf(codes(&["30301121", "30301122"])).to_string(),
            "30301121 OR 30301122"
        );
        assert_eq!(Prerequisite::CreditHours(90).to_string(), ">= 90");
    }

    #[test]
    fn decode_published_strings() {
        assert_eq!(
            Prerequisite::decode("0030301121"),
            Some(Prerequisite::AllOf(codes(&["30301121"])))
        );
        assert_eq!(
            Prerequisite::decode("30302201 OR 30201112"),
            Some(Prerequisite::AnyOf(codes(&["30302201", "30201112"])))
        );
        assert_eq!(Prerequisite::decode(">= 90 hrs"), Some(Prerequisite::CreditHours(90)));
        assert_eq!(
            Prerequisite::decode("Department Approval"),
            Some(Prerequisite::Condition("Department Approval".into()))
        );
        assert_eq!(Prerequisite::decode("   "), None);
        // five digits is shorter than any prerequisite code
        assert_eq!(
            Prerequisite::decode("12345 OR 12346"),
            Some(Prerequisite::Condition("12345 OR 12346".into()))
        );
    }

    #[test]
    fn blank_prerequisite_is_rejected_standalone() {
        assert!(serde_json::from_str::<Prerequisite>("\"  \"").is_err());
        let record: CourseRecord =
            serde_json::from_str(r#"{"code": "30301121", "name": "Calculus I", "ch": 3, "prereq": ""}"#).unwrap();
        assert_eq!(record.prereq, None);
    }

    #[test]
    fn framework_labels() {
        assert_eq!(Framework::from_label("hnd"), Some(Framework::Hnd));
        assert_eq!(Framework::from_label("Pearson"), None);
        assert_eq!(serde_json::to_string(&Framework::Htu).unwrap(), "\"HTU\"");
    }

    #[test]
    fn record_reads_published_shape() {
        let json = r#"{"code": "0040201291", "name": "Computing Project", "ch": 6,
                       "framework": "Pearson", "prereq": ">= 90", "type": "ignored"}"#;
        let record: CourseRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.code.as_str(), "40201291");
        assert_eq!(record.credit_hours, 6);
        assert_eq!(record.framework, None);
        assert_eq!(record.level, None);
        assert_eq!(record.prereq, Some(Prerequisite::CreditHours(90)));
    }

    #[test]
    fn record_omits_absent_fields() {
        let record = CourseRecord {
            code: CourseCode::from("30301121"),
            name: "Calculus I".into(),
            credit_hours: 3,
            framework: Some(Framework::Htu),
            level: Some(1),
            category: Category::College,
            prereq: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"code": "30301121", "name": "Calculus I", "ch": 3, "framework": "HTU", "level": 1})
        );
    }
}
