use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::catalog::Catalog;
use crate::code::CourseCode;
use crate::model::{Category, CourseRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    CreditHours,
    Name,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Field::CreditHours => "creditHours",
            Field::Name => "name",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMismatch {
    pub code: CourseCode,
    pub field: Field,
    pub a: String,
    pub b: String,
}

/// Differences between two catalogs of the same program, keyed by
/// canonical code.
#[derive(Debug, Default, Serialize)]
pub struct MismatchReport {
    pub left: String,
    pub right: String,
    /// In the left catalog only.
    pub missing: Vec<CourseCode>,
    /// In the right catalog only.
    pub extra: Vec<CourseCode>,
    pub differences: Vec<FieldMismatch>,
}

impl MismatchReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.differences.is_empty()
    }
}

impl fmt::Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return writeln!(f, "{} and {} agree.", self.left, self.right);
        }
        if !self.missing.is_empty() {
            writeln!(f, "Only in {} ({}):", self.left, self.missing.len())?;
            for code in &self.missing {
                writeln!(f, "  {code}")?;
            }
        }
        if !self.extra.is_empty() {
            writeln!(f, "Only in {} ({}):", self.right, self.extra.len())?;
            for code in &self.extra {
                writeln!(f, "  {code}")?;
            }
        }
        if !self.differences.is_empty() {
            writeln!(f, "Field differences ({}):", self.differences.len())?;
            writeln!(f, "  {:<10} | {:<11} | {:<32} | {}", "Code", "Field", self.left, self.right)?;
            for d in &self.differences {
                writeln!(f, "  {:<10} | {:<11} | {:<32} | {}", d.code, d.field, d.a, d.b)?;
            }
        }
        Ok(())
    }
}

// First occurrence wins when a code sits in two buckets.
fn index(catalog: &Catalog) -> BTreeMap<&CourseCode, &CourseRecord> {
    let mut map = BTreeMap::new();
    for record in catalog.records() {
        map.entry(&record.code).or_insert(record);
    }
    map
}

fn comparable_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

pub fn reconcile(a: &Catalog, b: &Catalog) -> MismatchReport {
    let left = index(a);
    let right = index(b);

    let missing = left.keys().filter(|c| !right.contains_key(*c)).map(|c| (*c).clone()).collect();
    let extra = right.keys().filter(|c| !left.contains_key(*c)).map(|c| (*c).clone()).collect();

    let mut differences = Vec::new();
    for (code, ra) in &left {
        let Some(rb) = right.get(code) else { continue };

        // 0 is "undetermined", not a value to disagree with
        if ra.has_credit_hours() && rb.has_credit_hours() && ra.credit_hours != rb.credit_hours {
            differences.push(FieldMismatch {
                code: (*code).clone(),
                field: Field::CreditHours,
                a: ra.credit_hours.to_string(),
                b: rb.credit_hours.to_string(),
            });
        }
        if comparable_name(&ra.name) != comparable_name(&rb.name) {
            differences.push(FieldMismatch {
                code: (*code).clone(),
                field: Field::Name,
                a: ra.name.clone(),
                b: rb.name.clone(),
            });
        }
    }

    debug!(
        "Reconciled {} vs {}: {} codes compared",
        a.key,
        b.key,
        left.len().min(right.len())
    );
    MismatchReport {
        left: display_name(a),
        right: display_name(b),
        missing,
        extra,
        differences,
    }
}

fn display_name(catalog: &Catalog) -> String {
    if catalog.key.is_empty() {
        catalog.name.clone()
    } else {
        catalog.key.clone()
    }
}

/// Consistency findings that never fail a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckWarning {
    UnreferencedPrerequisite {
        catalog: String,
        code: CourseCode,
        required_by: CourseCode,
    },
    CrossCategoryDuplicate {
        catalog: String,
        code: CourseCode,
        categories: Vec<Category>,
    },
}

impl fmt::Display for CheckWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckWarning::UnreferencedPrerequisite { catalog, code, required_by } => {
                write!(f, "{catalog}: {required_by} requires {code}, which no catalog lists")
            }
            CheckWarning::CrossCategoryDuplicate { catalog, code, categories } => {
                let names: Vec<&str> = categories.iter().map(|c| c.label()).collect();
                write!(f, "{catalog}: {code} appears in {}", names.join(", "))
            }
        }
    }
}

/// Prerequisite codes that resolve to no record in any of `catalogs`.
pub fn unreferenced_prerequisites(catalogs: &[Catalog]) -> Vec<CheckWarning> {
    let known: HashSet<&CourseCode> = catalogs
        .iter()
        .flat_map(|c| c.records().map(|r| &r.code))
        .collect();

    let mut warnings = Vec::new();
    for catalog in catalogs {
        for record in catalog.records() {
            let Some(prereq) = &record.prereq else { continue };
            for code in prereq.codes() {
                if !known.contains(code) {
                    warnings.push(CheckWarning::UnreferencedPrerequisite {
                        catalog: display_name(catalog),
                        code: code.clone(),
                        required_by: record.code.clone(),
                    });
                }
            }
        }
    }
    warnings
}

pub fn cross_category_warnings(catalog: &Catalog) -> Vec<CheckWarning> {
    catalog
        .cross_category_duplicates()
        .into_iter()
        .map(|(code, categories)| CheckWarning::CrossCategoryDuplicate {
            catalog: display_name(catalog),
            code,
            categories,
        })
        .collect()
}

// ── Tests ──
