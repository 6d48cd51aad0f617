use std::collections::HashSet;

use crate::catalog::Catalog;
use crate::code::CourseCode;
use crate::model::{CourseRecord, Prerequisite};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Blocked { missing: Vec<CourseCode> },
    NeedsCredits { required: u32, have: u32 },
    /// Free-text condition a person has to sign off on.
    NeedsApproval(String),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Credit hours earned by the completed courses this catalog knows about.
pub fn completed_credit_hours(catalog: &Catalog, completed: &HashSet<CourseCode>) -> u32 {
    completed
        .iter()
        .filter_map(|code| catalog.get(code))
        .map(|r| u32::from(r.credit_hours))
        .sum()
}

pub fn evaluate(prereq: Option<&Prerequisite>, completed: &HashSet<CourseCode>, have: u32) -> Eligibility {
    let Some(prereq) = prereq else {
        return Eligibility::Eligible;
    };
    match prereq {
        Prerequisite::AllOf(codes) => {
            let missing: Vec<CourseCode> = codes.iter().filter(|c| !completed.contains(*c)).cloned().collect();
            if missing.is_empty() {
                Eligibility::Eligible
            } else {
                Eligibility::Blocked { missing }
            }
        }
        Prerequisite::AnyOf(codes) => {
            if codes.iter().any(|c| completed.contains(c)) {
                Eligibility::Eligible
            } else {
                Eligibility::Blocked {
                    missing: codes.clone(),
                }
            }
        }
        Prerequisite::CreditHours(required) if have >= *required => Eligibility::Eligible,
        Prerequisite::CreditHours(required) => Eligibility::NeedsCredits {
            required: *required,
            have,
        },
        Prerequisite::Condition(text) => Eligibility::NeedsApproval(text.clone()),
    }
}

/// Status of every course not yet completed: eligible first, then by level
/// and code.
pub fn advise<'c>(catalog: &'c Catalog, completed: &HashSet<CourseCode>) -> Vec<(&'c CourseRecord, Eligibility)> {
    let have = completed_credit_hours(catalog, completed);
    let mut seen = HashSet::new();
    let mut out: Vec<(&CourseRecord, Eligibility)> = catalog
        .records()
        .filter(|r| !completed.contains(&r.code) && seen.insert(r.code.clone()))
        .map(|r| (r, evaluate(r.prereq.as_ref(), completed, have)))
        .collect();
    out.sort_by(|(ra, ea), (rb, eb)| {
        eb.is_eligible()
            .cmp(&ea.is_eligible())
            .then(ra.level.cmp(&rb.level))
            .then(ra.code.cmp(&rb.code))
    });
    out
}

// ── Tests ──
