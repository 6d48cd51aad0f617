pub mod accumulator;
pub mod fields;
pub mod lines;
pub mod prereq;
pub mod sections;
pub mod variant;

use std::fmt;

use tracing::info;

use crate::catalog::{Catalog, CatalogBuilder};
use crate::code::CourseCode;
use crate::model::Category;
use accumulator::ParseState;
pub use variant::FormatVariant;

/// Knobs for one extraction run.
#[derive(Debug, Clone, Copy)]
pub struct ExtractConfig {
    /// Forced layout; detected once per document when `None`.
    pub variant: Option<FormatVariant>,
    /// Records allowed under the default category before giving up.
    pub unresolved_limit: usize,
    /// Continuation lines merged while credit hours are still unknown.
    pub lookahead_budget: usize,
    pub max_credit_hours: u8,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            variant: None,
            unresolved_limit: 5,
            lookahead_budget: 6,
            max_credit_hours: 12,
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("{count} records committed before any section header (limit {limit}); unrecognized layout")]
    UnresolvedSection { count: usize, limit: usize },
    #[error("no course records found in input")]
    EmptyInput,
}

/// Per-record problems. Extraction carries on past all of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractWarning {
    MalformedRecord { code: CourseCode, line: usize },
    DuplicateCode { code: CourseCode, category: Category, line: usize },
    UndeterminedCreditHours { code: CourseCode, line: usize },
    OrphanText { line: usize, text: String },
}

impl fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractWarning::MalformedRecord { code, line } => {
                write!(f, "line {line}: {code} has no recoverable name or credit hours")
            }
            ExtractWarning::DuplicateCode { code, category, line } => {
                write!(f, "line {line}: duplicate {code} in {category} dropped")
            }
            ExtractWarning::UndeterminedCreditHours { code, line } => {
                write!(f, "line {line}: credit hours of {code} could not be determined")
            }
            ExtractWarning::OrphanText { line, text } => {
                write!(f, "line {line}: text past lookahead budget dropped: {text}")
            }
        }
    }
}

pub struct Extraction {
    pub catalog: Catalog,
    pub warnings: Vec<ExtractWarning>,
    pub variant: FormatVariant,
}

/// Line-by-line pass: classify → track sections → split fields →
/// accumulate continuations → commit to the builder.
pub fn extract(
    text: &str,
    builder: CatalogBuilder,
    config: &ExtractConfig,
) -> Result<Extraction, ExtractError> {
    let variant = config.variant.unwrap_or_else(|| FormatVariant::detect(text));
    info!("Reading with {:?} layout", variant);

    let state = text
        .lines()
        .enumerate()
        .try_fold(ParseState::new(builder, variant.rules(), *config), |state, (idx, line)| {
            state.step(idx + 1, line)
        })?;
    let (catalog, warnings) = state.finish()?;

    info!(
        "Extracted {} records ({} warnings) into '{}'",
        catalog.len(),
        warnings.len(),
        catalog.key
    );
    Ok(Extraction {
        catalog,
        warnings,
        variant,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Framework, Prerequisite};

    fn run(text: &str) -> Result<Extraction, ExtractError> {
        extract(text, CatalogBuilder::new("cs", "Computer Science"), &ExtractConfig::default())
    }

    fn codes(raw: &[&str]) -> Vec<CourseCode> {
        raw.iter().map(|c| CourseCode::from(*c)).collect()
    }

    #[test]
    fn single_framework_line() {
        let out = run("0030301121 Calculus I HTU 3\n").unwrap();
        let rec = out.catalog.records().next().unwrap();
        assert_eq!(rec.code.as_str(), "30301121");
        assert_eq!(rec.name, "Calculus I");
        assert_eq!(rec.framework, Some(Framework::Htu));
        assert_eq!(rec.credit_hours, 3);
        assert_eq!(rec.prereq, None);
        assert_eq!(rec.category, Category::Department);
    }

    #[test]
    fn credits_on_following_line() {
        let out = run("30302201 Data Structures HTU\n3 30301121\n").unwrap();
        assert_eq!(out.catalog.len(), 1);
        let rec = out.catalog.records().next().unwrap();
        assert_eq!(rec.code.as_str(), "30302201");
        assert_eq!(rec.credit_hours, 3);
        assert_eq!(rec.prereq, Some(Prerequisite::AllOf(codes(&["30301121"]))));
    }

    #[test]
    fn it_plan_fixture() {
        let text = std::fs::read_to_string("tests/fixtures/it_plan.txt").unwrap();
        let out = run(&text).unwrap();
        let catalog = &out.catalog;
        assert_eq!(out.variant, FormatVariant::Framework);

        let sizes: Vec<usize> = Category::ALL.iter().map(|c| catalog.bucket(*c).len()).collect();
        assert_eq!(sizes, vec![4, 4, 6, 3]);
        let summary = catalog.credit_summary();
        assert_eq!(summary.total, 52);
        assert_eq!(
            summary.per_category,
            vec![
                (Category::University, 12),
                (Category::College, 14),
                (Category::Department, 20),
                (Category::Elective, 6),
            ]
        );
        assert_eq!(
            catalog.framework_counts(),
            vec![
                (Some(Framework::Htu), 14),
                (Some(Framework::Hnc), 1),
                (Some(Framework::Hnd), 1),
                (None, 1),
            ]
        );

        let get = |code: &str| catalog.get(&CourseCode::from(code)).unwrap();
        assert_eq!(get("30101104").name, "Entrepreneurship and Innovation");
        assert_eq!(get("30301122").prereq, Some(Prerequisite::AllOf(codes(&["30301121"]))));
        assert_eq!(get("30302201").prereq, Some(Prerequisite::AllOf(codes(&["30201112"]))));
        assert_eq!(
            get("40201251").prereq,
            Some(Prerequisite::AnyOf(codes(&["30302201", "30201112"])))
        );
        assert_eq!(get("40201251").credit_hours, 3);
        let project = get("40201291");
        assert_eq!(project.name, "Computing Project");
        assert_eq!(project.framework, Some(Framework::Hnd));
        assert_eq!(project.credit_hours, 6);
        assert_eq!(project.prereq, Some(Prerequisite::CreditHours(90)));
        assert_eq!(get("40201391").prereq, Some(Prerequisite::AllOf(codes(&["30302201"]))));
        let capstone = get("40201491");
        assert_eq!(capstone.prereq, Some(Prerequisite::Condition("Department Approval".into())));
        assert_eq!(capstone.level, Some(4));
        let mobile = get("40201361");
        assert_eq!(mobile.name, "Mobile Application Development");
        assert_eq!(mobile.prereq, Some(Prerequisite::AllOf(codes(&["40201251"]))));
        assert_eq!(get("40201362").prereq, None);

        assert_eq!(
            out.warnings,
            vec![
                ExtractWarning::DuplicateCode {
                    code: CourseCode::from("40201251"),
                    category: Category::Department,
                    line: 25,
                },
                ExtractWarning::MalformedRecord {
                    code: CourseCode::from("40201363"),
                    line: 33,
                },
            ]
        );

        let dups = catalog.cross_category_duplicates();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].0.as_str(), "30201111");
    }

    #[test]
    fn engineering_fixture() {
        let text = std::fs::read_to_string("tests/fixtures/engineering_plan.txt").unwrap();
        let out = run(&text).unwrap();
        let catalog = &out.catalog;
        assert_eq!(out.variant, FormatVariant::Engineering);
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);

        let sizes: Vec<usize> = Category::ALL.iter().map(|c| catalog.bucket(*c).len()).collect();
        assert_eq!(sizes, vec![2, 3, 3, 1]);
        assert_eq!(catalog.credit_summary().total, 24);

        let get = |code: &str| catalog.get(&CourseCode::from(code)).unwrap();
        assert_eq!(get("30101101").name, "Arabic Language");
        assert_eq!(get("30101101").prereq, None);
        assert_eq!(get("30301132").credit_hours, 1);
        assert_eq!(get("30301132").prereq, Some(Prerequisite::AllOf(codes(&["30301131"]))));
        // Theory / Lab / Total header in this section
        assert_eq!(get("10203180").credit_hours, 2);
        assert_eq!(get("10203180").level, Some(3));
        assert_eq!(get("10203280").credit_hours, 3);
        assert_eq!(
            get("10203281").prereq,
            Some(Prerequisite::AllOf(codes(&["30301121", "30301131"])))
        );
        assert_eq!(get("10203281").category, Category::Department);
        // header reset: back to credits first
        assert_eq!(get("10203481").credit_hours, 3);
        assert_eq!(get("10203481").prereq, Some(Prerequisite::CreditHours(100)));
    }

    #[test]
    fn mixed_layout_with_glued_codes() {
        let text = "Electives\n40201290Planning a Computing Project4 Pearson HNC\n40201292Networking4 Pearson HNC\n";
        let out = run(text).unwrap();
        assert_eq!(out.variant, FormatVariant::Mixed);
        let names: Vec<(&str, u8)> = out
            .catalog
            .records()
            .map(|r| (r.name.as_str(), r.credit_hours))
            .collect();
        assert_eq!(names, vec![("Planning a Computing Project", 4), ("Networking", 4)]);
        assert!(out.catalog.records().all(|r| r.framework == Some(Framework::Hnc)));
    }

    #[test]
    fn transcript_fixture() {
        let text = std::fs::read_to_string("tests/fixtures/transcript.txt").unwrap();
        let out = run(&text).unwrap();
        let catalog = &out.catalog;
        assert_eq!(out.variant, FormatVariant::Transcript);
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert_eq!(catalog.bucket(Category::Department).len(), 7);
        assert_eq!(catalog.credit_summary().total, 20);

        let get = |code: &str| catalog.get(&CourseCode::from(code)).unwrap();
        assert_eq!(get("30101101").name, "Arabic Language");
        assert_eq!(get("40201111").name, "Programming Fundamentals");
        assert_eq!(get("40201111").prereq, None);
        let ds = get("30302201");
        assert_eq!(ds.name, "Data Structures");
        assert_eq!(ds.prereq, Some(Prerequisite::AllOf(codes(&["40201111"]))));
        assert_eq!(get("30301132").credit_hours, 1);
        assert_eq!(get("40201251").prereq, Some(Prerequisite::AllOf(codes(&["30302201"]))));
        let planning = get("40201290");
        assert_eq!(planning.name, "Planning a Computing Project");
        assert_eq!(planning.framework, Some(Framework::Hnc));
        assert_eq!(planning.credit_hours, 3);
        let grad = get("40201491");
        assert_eq!(grad.credit_hours, 4);
        assert_eq!(grad.prereq, Some(Prerequisite::AllOf(codes(&["40201251"]))));
        assert!(!catalog.records().any(|r| r.code.as_str() == "20190001"));
    }

    #[test]
    fn too_many_records_without_header() {
        let lines: Vec<String> = (1..=6)
            .map(|i| format!("4020110{i} Course {i} HTU 3"))
            .collect();
        assert_eq!(
            run(&lines.join("\n")).err(),
            Some(ExtractError::UnresolvedSection { count: 6, limit: 5 })
        );
        let out = run(&lines[..5].join("\n")).unwrap();
        assert_eq!(out.catalog.bucket(Category::Department).len(), 5);
    }

    #[test]
    fn input_without_records() {
        assert_eq!(run("").err(), Some(ExtractError::EmptyInput));
        assert_eq!(
            run("Study Plan\nDepartment Requirements\nPage 1 of 2\n").err(),
            Some(ExtractError::EmptyInput)
        );
    }

    #[test]
    fn forced_variant_skips_detection() {
        let config = ExtractConfig {
            variant: Some(FormatVariant::Engineering),
            ..ExtractConfig::default()
        };
        let out = extract(
            "College Requirements\n30301121 Calculus I 3 3 0 HTU\n",
            CatalogBuilder::new("eng", "Engineering"),
            &config,
        )
        .unwrap();
        assert_eq!(out.variant, FormatVariant::Engineering);
        assert_eq!(out.catalog.records().next().unwrap().credit_hours, 3);
    }
}
