use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::fields::{self, FieldSplitter, Fields};
use super::lines::{self, Line};
use super::prereq;
use super::sections::SectionTracker;
use super::variant::{RowShape, RuleTable, TripleOrder};
use super::{ExtractConfig, ExtractError, ExtractWarning};
use crate::catalog::{Catalog, CatalogBuilder};
use crate::code::{self, CourseCode};
use crate::model::{Category, CourseRecord};

static EMBEDDED_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[0-9]{6,10}\b").unwrap());
static PREREQ_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:prerequisites?|co-?requisites?)\b").unwrap());

/// The record currently collecting continuation lines.
#[derive(Debug)]
struct OpenRecord {
    code: CourseCode,
    line: usize,
    category: Category,
    /// Category came from the default, not a header.
    defaulted: bool,
    fields: Fields,
    /// Continuation lines merged while credit hours were undetermined.
    merged: usize,
}

/// Everything extraction carries from one line to the next. Each step
/// consumes the state and hands back the next one.
pub struct ParseState {
    config: ExtractConfig,
    rules: RuleTable,
    sections: SectionTracker,
    layout: TripleOrder,
    open: Option<OpenRecord>,
    builder: CatalogBuilder,
    warnings: Vec<ExtractWarning>,
    defaulted: usize,
    committed: usize,
}

impl ParseState {
    pub fn new(builder: CatalogBuilder, rules: RuleTable, config: ExtractConfig) -> Self {
        ParseState {
            config,
            rules,
            sections: SectionTracker::new(rules.extra_headers, rules.default_category),
            layout: rules.triple_order,
            open: None,
            builder,
            warnings: Vec::new(),
            defaulted: 0,
            committed: 0,
        }
    }

    fn splitter(&self) -> FieldSplitter {
        FieldSplitter::new(self.rules, self.layout, self.config.max_credit_hours)
    }

    pub fn step(mut self, line_no: usize, raw: &str) -> Result<Self, ExtractError> {
        let cleaned = self.rules.clean_line(raw);
        if self.rules.skips(&cleaned) {
            debug!(line = line_no, "Skipping personal details");
            return Ok(self);
        }
        let kind = lines::classify_line(&cleaned, &self.rules);

        if let Line::StartsRecord { code, remainder } = kind {
            self.commit()?;
            self.start(line_no, code, remainder);
            return Ok(self);
        }

        // "Prerequisite: one Department Elective" names a course, not a section.
        let header = if PREREQ_KEYWORD_RE.is_match(&cleaned) {
            None
        } else {
            self.sections.observe(&cleaned)
        };
        if let Some(category) = header {
            self.commit()?;
            self.layout = self.rules.triple_order;
            debug!(line = line_no, "Entering section: {}", category);
            return Ok(self);
        }

        match kind {
            Line::Blank | Line::StartsRecord { .. } => {}
            Line::Noise => debug!(line = line_no, "Dropping page furniture: {}", cleaned.trim()),
            Line::ColumnHeader(order) => {
                self.commit()?;
                self.layout = order;
                debug!(line = line_no, "Column layout {:?}", order);
            }
            Line::Continuation(text) => self.continue_record(line_no, text),
        }
        Ok(self)
    }

    fn start(&mut self, line_no: usize, raw_code: &str, remainder: &str) {
        let code = CourseCode::from(raw_code);
        let fields = self.splitter().split(remainder);
        debug!(line = line_no, "Record {} opened: {:?}", code, fields);
        self.open = Some(OpenRecord {
            code,
            line: line_no,
            category: self.sections.active(),
            defaulted: !self.sections.is_resolved(),
            fields,
            merged: 0,
        });
    }

    fn continue_record(&mut self, line_no: usize, text: &str) {
        let splitter = self.splitter();
        let budget = self.config.lookahead_budget;
        let Some(open) = self.open.as_mut() else {
            debug!(line = line_no, "Skipping text outside any record: {}", text);
            return;
        };
        if self.rules.row_shape == RowShape::Transcript {
            debug!(line = line_no, "Transcript rows do not wrap; dropping: {}", text);
            return;
        }

        // Prerequisite clauses trail the numeric columns, never the title.
        if open.fields.credit_hours > 0 {
            push_text(&mut open.fields.prereq_raw, text);
            return;
        }

        if open.merged >= budget {
            debug!(line = line_no, "Lookahead budget spent for {}", open.code);
            self.warnings.push(ExtractWarning::OrphanText {
                line: line_no,
                text: text.to_string(),
            });
            return;
        }
        open.merged += 1;

        if let Some((credit_hours, rest)) = splitter.numeric_line(text) {
            open.fields.credit_hours = credit_hours;
            push_text(&mut open.fields.prereq_raw, &rest);
            return;
        }

        if fields::has_framework_label(text) {
            let combined = format!("{} {}", open.fields.name, text);
            let earlier = std::mem::take(&mut open.fields.prereq_raw);
            let mut resplit = splitter.split(&combined);
            resplit.prereq_raw = join_text(&earlier, &resplit.prereq_raw);
            resplit.framework = resplit.framework.or(open.fields.framework);
            open.fields = resplit;
            return;
        }

        if PREREQ_KEYWORD_RE.is_match(text)
            || EMBEDDED_CODE_RE.is_match(text)
            || text.chars().all(|c| c.is_ascii_digit() || c.is_whitespace())
        {
            push_text(&mut open.fields.prereq_raw, text);
            return;
        }

        // Title still wrapping.
        push_text(&mut open.fields.name, text);
        if open.fields.is_deferred() {
            let resplit = splitter.split(&open.fields.name);
            if resplit.credit_hours > 0 {
                let earlier = std::mem::take(&mut open.fields.prereq_raw);
                open.fields = Fields {
                    prereq_raw: join_text(&resplit.prereq_raw, &earlier),
                    ..resplit
                };
            }
        }
    }

    fn commit(&mut self) -> Result<(), ExtractError> {
        let Some(open) = self.open.take() else {
            return Ok(());
        };

        let name = prereq::clean_text(&open.fields.name);
        let credit_hours = open.fields.credit_hours;
        let mut prerequisite = prereq::resolve(&prereq::clean_prereq(&open.fields.prereq_raw));

        if name.is_empty() && credit_hours == 0 {
            warn!(line = open.line, "Malformed record {}: no recoverable fields", open.code);
            self.warnings.push(ExtractWarning::MalformedRecord {
                code: open.code.clone(),
                line: open.line,
            });
            prerequisite = None;
        } else if credit_hours == 0 {
            debug!(line = open.line, "Credit hours undetermined for {}", open.code);
            self.warnings.push(ExtractWarning::UndeterminedCreditHours {
                code: open.code.clone(),
                line: open.line,
            });
        }

        if open.defaulted {
            self.defaulted += 1;
            if self.defaulted > self.config.unresolved_limit {
                return Err(ExtractError::UnresolvedSection {
                    count: self.defaulted,
                    limit: self.config.unresolved_limit,
                });
            }
        }

        let record = CourseRecord {
            level: Some(code::infer_level(&open.code, self.rules.level_digit)),
            code: open.code.clone(),
            name,
            credit_hours,
            framework: open.fields.framework,
            category: open.category,
            prereq: prerequisite,
        };
        if !self.builder.push(record) {
            self.warnings.push(ExtractWarning::DuplicateCode {
                code: open.code,
                category: open.category,
                line: open.line,
            });
        }
        self.committed += 1;
        Ok(())
    }

    /// Close the last record and hand over the catalog.
    pub fn finish(mut self) -> Result<(Catalog, Vec<ExtractWarning>), ExtractError> {
        self.commit()?;
        if self.committed == 0 {
            return Err(ExtractError::EmptyInput);
        }
        Ok((self.builder.build(), self.warnings))
    }
}

fn push_text(field: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !field.is_empty() {
        field.push(' ');
    }
    field.push_str(text);
}

fn join_text(a: &str, b: &str) -> String {
    let mut out = a.trim().to_string();
    push_text(&mut out, b);
    out
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Framework, Prerequisite};
    use crate::parser::variant::FormatVariant;

    fn run(lines: &[&str]) -> (Catalog, Vec<ExtractWarning>) {
        let rules = FormatVariant::Framework.rules();
        let mut state = ParseState::new(
            CatalogBuilder::new("t", "Test"),
            rules,
            ExtractConfig::default(),
        );
        for (i, line) in lines.iter().enumerate() {
            state = state.step(i + 1, line).unwrap();
        }
        state.finish().unwrap()
    }

    fn only(catalog: &Catalog) -> &CourseRecord {
        assert_eq!(catalog.len(), 1);
        catalog.records().next().unwrap()
    }

    #[test]
    fn numeric_line_fills_missing_credits() {
        let (catalog, warnings) = run(&["30302201 Data Structures HTU", "3 30301121"]);
        let rec = only(&catalog);
        assert_eq!(rec.code.as_str(), "30302201");
        assert_eq!(rec.name, "Data Structures");
        assert_eq!(rec.credit_hours, 3);
        assert_eq!(
            rec.prereq,
            Some(Prerequisite::AllOf(vec![CourseCode::from("30301121")]))
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn framework_on_continuation_resplits() {
        let (catalog, _) = run(&[
            "College Requirements",
            "0030101104 Entrepreneurship and",
            "Innovation HTU 3",
        ]);
        let rec = only(&catalog);
        assert_eq!(rec.name, "Entrepreneurship and Innovation");
        assert_eq!(rec.framework, Some(Framework::Htu));
        assert_eq!(rec.credit_hours, 3);
        assert_eq!(rec.category, Category::College);
    }

    #[test]
    fn wrapped_title_then_columns() {
        let (catalog, _) = run(&[
            "Electives",
            "0040201361 Mobile Application",
            "Development",
            "HTU 3 40201251",
        ]);
        let rec = only(&catalog);
        assert_eq!(rec.name, "Mobile Application Development");
        assert_eq!(rec.credit_hours, 3);
        assert_eq!(
            rec.prereq,
            Some(Prerequisite::AllOf(vec![CourseCode::from("40201251")]))
        );
    }

    #[test]
    fn determined_credits_send_lines_to_prerequisite() {
        let (catalog, _) = run(&[
            "Department Requirements",
            "40201391 Software Engineering HTU 3",
            "30302201 or",
        ]);
        // "30302201 or" starts a record of its own
        assert_eq!(catalog.len(), 2);

        let (catalog, _) = run(&[
            "Department Requirements",
            "40201391 Software Engineering HTU 3",
            "Prerequisite: Data Structures",
        ]);
        let rec = only(&catalog);
        assert_eq!(rec.name, "Software Engineering");
        assert_eq!(
            rec.prereq,
            Some(Prerequisite::Condition("Data Structures".into()))
        );
    }

    #[test]
    fn prerequisite_keyword_is_not_title() {
        let (catalog, _) = run(&[
            "Department Requirements",
            "40201391 Software Engineering HTU",
            "Prerequisite 30302201",
            "3",
        ]);
        let rec = only(&catalog);
        assert_eq!(rec.name, "Software Engineering");
        assert_eq!(rec.credit_hours, 3);
        assert_eq!(
            rec.prereq,
            Some(Prerequisite::AllOf(vec![CourseCode::from("30302201")]))
        );
    }

    #[test]
    fn section_words_inside_prerequisite_lines() {
        let (catalog, _) = run(&[
            "Department Requirements",
            "40201391 Software Engineering HTU 3",
            "Prerequisite: one Department Elective",
            "40201392 Software Testing HTU 3",
        ]);
        let first = catalog.get(&CourseCode::from("40201391")).unwrap();
        assert_eq!(
            first.prereq,
            Some(Prerequisite::Condition("one Department Elective".into()))
        );
        assert_eq!(catalog.bucket(Category::Department).len(), 2);
        assert!(catalog.bucket(Category::Elective).is_empty());
    }

    #[test]
    fn malformed_record_is_kept_and_flagged() {
        let (catalog, warnings) = run(&["Electives", "0040201363"]);
        let rec = only(&catalog);
        assert_eq!(rec.name, "");
        assert_eq!(rec.credit_hours, 0);
        assert_eq!(rec.prereq, None);
        assert_eq!(
            warnings,
            vec![ExtractWarning::MalformedRecord {
                code: CourseCode::from("40201363"),
                line: 2
            }]
        );
    }

    #[test]
    fn lookahead_budget_limits_title_growth() {
        let mut lines = vec!["Electives", "40201370 Special Topics"];
        lines.extend(std::iter::repeat("more words").take(8));
        let (catalog, warnings) = run(&lines);
        let rec = only(&catalog);
        assert_eq!(rec.name.matches("more words").count(), 6);
        let orphans = warnings
            .iter()
            .filter(|w| matches!(w, ExtractWarning::OrphanText { .. }))
            .count();
        assert_eq!(orphans, 2);
        assert!(warnings.iter().any(|w| matches!(w, ExtractWarning::UndeterminedCreditHours { .. })));
    }

    #[test]
    fn duplicate_in_bucket_is_dropped() {
        let (catalog, warnings) = run(&[
            "Department Requirements",
            "0040201251 Database Systems HTU 3",
            "40201251 Database Systems HTU 4",
        ]);
        let rec = only(&catalog);
        assert_eq!(rec.credit_hours, 3);
        assert_eq!(
            warnings,
            vec![ExtractWarning::DuplicateCode {
                code: CourseCode::from("40201251"),
                category: Category::Department,
                line: 3
            }]
        );
    }

    #[test]
    fn column_header_switches_triple_reading() {
        let rules = FormatVariant::Engineering.rules();
        let mut state = ParseState::new(CatalogBuilder::new("e", "E"), rules, ExtractConfig::default());
        for (i, line) in [
            "IE Compulsory",
            "10203101 Statics 3 3 0 HTU",
            "Course ID Title Theory Lab Total Type",
            "10203180 Engineering Workshop 0 2 2 HTU",
            "Electives",
            "10203481 Lean Manufacturing 3 3 0 HTU",
        ]
        .iter()
        .enumerate()
        {
            state = state.step(i + 1, line).unwrap();
        }
        let (catalog, _) = state.finish().unwrap();
        let ch: Vec<u8> = catalog.records().map(|r| r.credit_hours).collect();
        assert_eq!(ch, vec![3, 2, 3]);
    }
}
