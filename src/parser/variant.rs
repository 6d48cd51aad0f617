use std::sync::LazyLock;

use regex::Regex;

use crate::model::Category;

// Credit candidates: 1-2 digits not touching other word characters.
static WORD_CREDIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,2})\b").unwrap());
// Mixed tables glue titles and numbers ("Project4"), so only digits bound it.
static GLUED_CREDIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\d])(\d{1,2})(?:[^\d]|$)").unwrap());
static TRAILING_SPACED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(\d{1,2})\s*$").unwrap());
static TRAILING_GLUED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\d])(\d{1,2})\s*$").unwrap());

static GLUED_CODE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[0-9]{5,10}[A-Za-z]").unwrap());
static SPACED_CODE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[0-9]{5,10}(?:\s|$)").unwrap());
static TRANSCRIPT_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bPlan Course\b|\bStudent Number\b").unwrap());
// Personal details printed on a student's transcript.
static PERSONAL_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bstudent\s+(?:number|name|id)\b|^\s*major\b").unwrap()
});
static ENGINEERING_COLUMNS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\blecture\b.*\bpractical\b|\btheory\b.*\blab\b.*\btotal\b").unwrap()
});

const ENGINEERING_HEADERS: &[(&str, Category)] = &[
    ("university compulsory", Category::University),
    ("ie compulsory", Category::Department),
    ("apprentice", Category::Department),
];

/// Layout family of a study-plan document. Chosen once per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FormatVariant {
    /// "Code Name HTU 3 Prereq" rows labelled with a framework.
    Framework,
    /// "Code Title CH Lecture Practical Type Prereq" rows.
    Engineering,
    /// Bilingual tables with codes glued onto titles.
    Mixed,
    /// Student transcript: "Code Name Plan Course NameCode Prereq Term Grade".
    Transcript,
}

/// How to read three adjacent small integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripleOrder {
    /// Theory / Lab / Total: the last number is the credit value.
    TotalLast,
    /// CH / Lecture / Practical: the first number is the credit value.
    CreditsFirst,
}

impl TripleOrder {
    pub fn pick(self, a: u8, c: u8) -> u8 {
        match self {
            TripleOrder::TotalLast => c,
            TripleOrder::CreditsFirst => a,
        }
    }
}

/// How a record row is laid out after its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    /// Name, framework and numeric columns; rows may wrap.
    Columns,
    /// One row per course with term and grade columns; never wraps.
    Transcript,
}

/// Field-splitting rules supplied by a format variant.
#[derive(Debug, Clone, Copy)]
pub struct RuleTable {
    /// A code may run straight into the title ("40201290Planning").
    pub glued_codes: bool,
    pub credit_re: &'static Regex,
    /// Numeric columns may sit before the framework label.
    pub trailing_credit_re: Option<&'static Regex>,
    pub triple_order: TripleOrder,
    /// Position of the level digit, counted from the end of the code.
    pub level_digit: usize,
    pub ascii_only: bool,
    pub extra_headers: &'static [(&'static str, Category)],
    pub row_shape: RowShape,
    /// Category in effect before any header is seen.
    pub default_category: Option<Category>,
    /// Lines dropped before classification.
    pub skip_re: Option<&'static Regex>,
}

impl RuleTable {
    pub fn skips(&self, line: &str) -> bool {
        self.skip_re.is_some_and(|re| re.is_match(line))
    }

    /// Per-variant text cleanup applied before classification.
    pub fn clean_line(&self, raw: &str) -> String {
        if self.ascii_only {
            raw.chars()
                .map(|c| if c.is_ascii() { c } else { ' ' })
                .collect()
        } else {
            raw.to_string()
        }
    }
}

impl FormatVariant {
    pub fn rules(self) -> RuleTable {
        match self {
            FormatVariant::Framework => RuleTable {
                glued_codes: false,
                credit_re: &*WORD_CREDIT_RE,
                trailing_credit_re: None,
                triple_order: TripleOrder::TotalLast,
                level_digit: 3,
                ascii_only: false,
                extra_headers: &[],
                row_shape: RowShape::Columns,
                default_category: None,
                skip_re: None,
            },
            FormatVariant::Engineering => RuleTable {
                glued_codes: false,
                credit_re: &*WORD_CREDIT_RE,
                trailing_credit_re: Some(&*TRAILING_SPACED_RE),
                triple_order: TripleOrder::CreditsFirst,
                level_digit: 4,
                ascii_only: true,
                extra_headers: ENGINEERING_HEADERS,
                row_shape: RowShape::Columns,
                default_category: None,
                skip_re: None,
            },
            FormatVariant::Mixed => RuleTable {
                glued_codes: true,
                credit_re: &*GLUED_CREDIT_RE,
                trailing_credit_re: Some(&*TRAILING_GLUED_RE),
                triple_order: TripleOrder::TotalLast,
                level_digit: 3,
                ascii_only: true,
                extra_headers: &[],
                row_shape: RowShape::Columns,
                default_category: None,
                skip_re: None,
            },
            FormatVariant::Transcript => RuleTable {
                glued_codes: false,
                credit_re: &*WORD_CREDIT_RE,
                trailing_credit_re: None,
                triple_order: TripleOrder::TotalLast,
                level_digit: 3,
                ascii_only: true,
                extra_headers: &[],
                row_shape: RowShape::Transcript,
                default_category: Some(Category::Department),
                skip_re: Some(&*PERSONAL_LINE_RE),
            },
        }
    }

    pub fn detect(text: &str) -> Self {
        if TRANSCRIPT_MARKER_RE.is_match(text) {
            return FormatVariant::Transcript;
        }
        let glued = GLUED_CODE_LINE_RE.find_iter(text).count();
        let spaced = SPACED_CODE_LINE_RE.find_iter(text).count();
        if glued > 0 && glued >= spaced {
            FormatVariant::Mixed
        } else if text.lines().any(|l| ENGINEERING_COLUMNS_RE.is_match(l)) {
            FormatVariant::Engineering
        } else {
            FormatVariant::Framework
        }
    }
}

// ── Tests ──
