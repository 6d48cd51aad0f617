use crate::model::Category;

const HEADER_KEYWORDS: &[(&str, Category)] = &[
    ("university requirement", Category::University),
    ("college requirement", Category::College),
    ("school requirement", Category::College),
    ("department requirement", Category::Department),
    ("program requirement", Category::Department),
    ("elective", Category::Elective),
];

// Longer lines are wrapped prose, not headers.
const MAX_HEADER_LEN: usize = 80;

/// Tracks which catalog bucket the current document position belongs to.
#[derive(Debug, Clone)]
pub struct SectionTracker {
    current: Option<Category>,
    extra: &'static [(&'static str, Category)],
}

impl SectionTracker {
    /// `initial` stands in for a header seen before the first line.
    pub fn new(extra: &'static [(&'static str, Category)], initial: Option<Category>) -> Self {
        SectionTracker { current: initial, extra }
    }

    /// Header category named by `line`, if it is a header at all.
    pub fn detect(&self, line: &str) -> Option<Category> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_HEADER_LEN {
            return None;
        }
        let lower = trimmed.to_lowercase();
        HEADER_KEYWORDS
            .iter()
            .chain(self.extra)
            .find(|(kw, _)| lower.contains(kw))
            .map(|(_, cat)| *cat)
    }

    /// Switch to the section named by `line` when it is a header. Returns
    /// the newly entered category.
    pub fn observe(&mut self, line: &str) -> Option<Category> {
        let cat = self.detect(line)?;
        self.current = Some(cat);
        Some(cat)
    }

    /// Active category; department until a header has been seen.
    pub fn active(&self) -> Category {
        self.current.unwrap_or(Category::Department)
    }

    pub fn is_resolved(&self) -> bool {
        self.current.is_some()
    }
}

// ── Tests ──
