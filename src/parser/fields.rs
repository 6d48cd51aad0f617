use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::variant::{RowShape, RuleTable, TripleOrder};
use crate::model::Framework;

static FRAMEWORK_CH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:Pearson\s+)?(HTU|HNC|HND)\s+(\d+)\b").unwrap());
static FRAMEWORK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:Pearson\s+)?(HTU|HNC|HND)\b").unwrap());
static LEADING_INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,2})\b").unwrap());
static TRIPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(\d{1,2})\s+(\d{1,2})\s+(\d{1,2})(?:\s|$)").unwrap()
});
static TRAILING_TRIPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(\d{1,2})\s+(\d{1,2})\s+(\d{1,2})\s*$").unwrap());
static PLAN_COURSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bPlan Course\b").unwrap());
static SEMESTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:Fall|Spring|Summer|Equivalent)\b").unwrap());
static TERM_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:Fall|Spring|Summer)\s*\d{4}.*$").unwrap());
static REPEATED_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]{5,10}").unwrap());
// Grade followed by attempted and earned hours: "A33", "B+11".
static GRADE_HOURS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+[+-]?(\d)(\d)\s*$").unwrap());
static GRADE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z]+[+-]?\d+\s*$").unwrap());

/// Fields recovered from the text after a course code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    pub name: String,
    pub framework: Option<Framework>,
    /// 0 while undetermined.
    pub credit_hours: u8,
    pub prereq_raw: String,
}

impl Fields {
    /// Nothing anchored the split yet; more lines are needed.
    pub fn is_deferred(&self) -> bool {
        self.framework.is_none() && self.credit_hours == 0
    }
}

/// Splits record text into name / framework / credit hours / prerequisite
/// text. First rule that matches wins.
#[derive(Debug, Clone, Copy)]
pub struct FieldSplitter {
    rules: RuleTable,
    layout: TripleOrder,
    max_credit_hours: u8,
}

impl FieldSplitter {
    pub fn new(rules: RuleTable, layout: TripleOrder, max_credit_hours: u8) -> Self {
        FieldSplitter {
            rules,
            layout,
            max_credit_hours,
        }
    }

    fn plausible(&self, raw: &str) -> Option<u8> {
        raw.parse::<u8>().ok().filter(|v| *v <= self.max_credit_hours)
    }

    fn triple(&self, caps: &Captures) -> Option<u8> {
        let a = caps[1].parse::<u8>().ok()?;
        let c = caps[3].parse::<u8>().ok()?;
        Some(self.layout.pick(a, c)).filter(|v| *v <= self.max_credit_hours)
    }

    pub fn split(&self, text: &str) -> Fields {
        let text = text.trim();
        if self.rules.row_shape == RowShape::Transcript {
            return self.transcript_row(text);
        }
        self.label_with_credits(text)
            .or_else(|| self.label_alone(text))
            .or_else(|| self.triple_columns(text))
            .or_else(|| self.isolated_credits(text))
            .unwrap_or_else(|| Fields {
                name: text.to_string(),
                ..Fields::default()
            })
    }

    // "Name HTU 3 prereq"
    fn label_with_credits(&self, text: &str) -> Option<Fields> {
        FRAMEWORK_CH_RE.captures_iter(text).find_map(|caps| {
            let whole = caps.get(0)?;
            let credit_hours = self.plausible(&caps[2])?;
            Some(Fields {
                name: text[..whole.start()].trim().to_string(),
                framework: Framework::from_label(&caps[1]),
                credit_hours,
                prereq_raw: text[whole.end()..].trim().to_string(),
            })
        })
    }

    // "Name HTU" with credits after the label, or numeric columns before it
    fn label_alone(&self, text: &str) -> Option<Fields> {
        let caps = FRAMEWORK_RE.captures(text)?;
        let whole = caps.get(0)?;
        let framework = Framework::from_label(&caps[1]);
        let before = text[..whole.start()].trim();
        let after = text[whole.end()..].trim();

        if let Some(lead) = LEADING_INT_RE.captures(after) {
            if let Some(credit_hours) = self.plausible(&lead[1]) {
                return Some(Fields {
                    name: before.to_string(),
                    framework,
                    credit_hours,
                    prereq_raw: after[lead[0].len()..].trim().to_string(),
                });
            }
        }

        let (name, credit_hours) = self.trailing_columns(before).unwrap_or((before, 0));
        Some(Fields {
            name: name.trim().to_string(),
            framework,
            credit_hours,
            prereq_raw: after.to_string(),
        })
    }

    fn trailing_columns<'t>(&self, before: &'t str) -> Option<(&'t str, u8)> {
        let trailing = self.rules.trailing_credit_re?;
        if let Some(caps) = TRAILING_TRIPLE_RE.captures(before) {
            if let (Some(ch), Some(m)) = (self.triple(&caps), caps.get(1)) {
                return Some((&before[..m.start()], ch));
            }
        }
        let caps = trailing.captures(before)?;
        let m = caps.get(1)?;
        let ch = self.plausible(m.as_str())?;
        Some((&before[..m.start()], ch))
    }

    // "Name 2 1 3 prereq"
    fn triple_columns(&self, text: &str) -> Option<Fields> {
        let caps = TRIPLE_RE.captures(text)?;
        let credit_hours = self.triple(&caps)?;
        let first = caps.get(1)?;
        let last = caps.get(3)?;
        Some(Fields {
            name: text[..first.start()].trim().to_string(),
            framework: None,
            credit_hours,
            prereq_raw: text[last.end()..].trim().to_string(),
        })
    }

    // "Name 3 prereq": first isolated small integer
    fn isolated_credits(&self, text: &str) -> Option<Fields> {
        self.rules.credit_re.captures_iter(text).find_map(|caps| {
            let m = caps.get(1)?;
            let credit_hours = self.plausible(m.as_str())?;
            Some(Fields {
                name: text[..m.start()].trim().to_string(),
                framework: None,
                credit_hours,
                prereq_raw: text[m.end()..].trim().to_string(),
            })
        })
    }

    /// Transcript rows repeat the title after "Plan Course", glued to the
    /// code, and the prerequisite follows that repeated code. Without the
    /// marker the title ends at the first term word.
    fn transcript_row(&self, text: &str) -> Fields {
        let framework = FRAMEWORK_RE
            .captures(text)
            .and_then(|caps| Framework::from_label(&caps[1]));

        let (name, prereq_raw) = match PLAN_COURSE_RE.find(text) {
            Some(m) => {
                let after = &text[m.end()..];
                let prereq = REPEATED_CODE_RE.find(after).map_or(after, |c| &after[c.end()..]);
                (&text[..m.start()], prereq)
            }
            None => {
                let head = SEMESTER_RE.find(text).map_or(text, |m| &text[..m.start()]).trim_end();
                match head.rsplit_once(char::is_whitespace) {
                    Some((name, last)) if last.len() > 5 && last.chars().all(|c| c.is_ascii_digit()) => {
                        (name, last)
                    }
                    _ => (head, ""),
                }
            }
        };

        let prereq_raw = TERM_TAIL_RE.replace(prereq_raw, "");
        let prereq_raw = GRADE_SUFFIX_RE.replace(&prereq_raw, "");
        let credit_hours = GRADE_HOURS_RE
            .captures(text)
            .filter(|caps| caps[1] == caps[2])
            .and_then(|caps| self.plausible(&caps[1]))
            .filter(|ch| *ch > 0)
            .unwrap_or_else(|| credit_hours_by_title(name));

        Fields {
            name: name.trim().to_string(),
            framework,
            credit_hours,
            prereq_raw: prereq_raw.trim().to_string(),
        }
    }

    /// Reads a continuation line made only of numbers: the first is the
    /// credit value (or the triple rule applies), the rest is prerequisite
    /// text. `None` when the line is not purely numeric or carries no
    /// plausible credit value.
    pub fn numeric_line(&self, line: &str) -> Option<(u8, String)> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() || !tokens.iter().all(|t| t.chars().all(|c| c.is_ascii_digit())) {
            return None;
        }
        if tokens.len() == 3 && tokens.iter().all(|t| t.len() <= 2) {
            let caps = TRIPLE_RE.captures(line.trim())?;
            return Some((self.triple(&caps)?, String::new()));
        }
        if tokens[0].len() > 2 {
            return None;
        }
        let ch = self.plausible(tokens[0])?;
        Some((ch, tokens[1..].join(" ")))
    }
}

// Transcripts print no credit column for ungraded rows.
fn credit_hours_by_title(name: &str) -> u8 {
    let lower = name.to_lowercase();
    if lower.contains("lab") || lower.contains("skills") || lower.contains("writing") {
        1
    } else if (lower.contains("project") && !lower.contains("planning"))
        || (lower.contains("english") && lower.contains("pre"))
    {
        4
    } else {
        3
    }
}

pub fn has_framework_label(text: &str) -> bool {
    FRAMEWORK_RE.is_match(text)
}

// ── Tests ──
