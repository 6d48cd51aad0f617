use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::code::CourseCode;
use crate::model::{Category, CourseRecord, Framework};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected catalog shape: {0}")]
    Shape(String),
}

/// Course records of one program, partitioned into the four categories.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub key: String,
    pub name: String,
    pub source: Option<String>,
    /// Declared program total. Informational only.
    pub total_credits: Option<u32>,
    pub extracted_at: Option<DateTime<Utc>>,
    buckets: [Vec<CourseRecord>; 4],
}

/// Serialized body, nested under the catalog key.
#[derive(Serialize, Deserialize)]
struct CatalogBody {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total_credits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extracted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    university_requirements: Vec<CourseRecord>,
    #[serde(default)]
    college_requirements: Vec<CourseRecord>,
    #[serde(default)]
    department_requirements: Vec<CourseRecord>,
    #[serde(default)]
    electives: Vec<CourseRecord>,
}

pub struct CreditSummary {
    pub per_category: Vec<(Category, u32)>,
    pub total: u32,
    pub declared: Option<u32>,
}

impl CreditSummary {
    /// `None` when the catalog declares no target.
    pub fn matches_declared(&self) -> Option<bool> {
        self.declared.map(|d| d == self.total)
    }
}

impl Catalog {
    pub fn bucket(&self, category: Category) -> &[CourseRecord] {
        &self.buckets[category.index()]
    }

    /// All records in category order.
    pub fn records(&self) -> impl Iterator<Item = &CourseRecord> {
        self.buckets.iter().flatten()
    }

    /// First record carrying `code`, in category order.
    pub fn get(&self, code: &CourseCode) -> Option<&CourseRecord> {
        self.records().find(|r| &r.code == code)
    }

    pub fn contains(&self, code: &CourseCode) -> bool {
        self.get(code).is_some()
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn credit_summary(&self) -> CreditSummary {
        let per_category: Vec<(Category, u32)> = Category::ALL
            .into_iter()
            .map(|cat| {
                let sum = self.bucket(cat).iter().map(|r| u32::from(r.credit_hours)).sum();
                (cat, sum)
            })
            .collect();
        let total = per_category.iter().map(|(_, sum)| sum).sum();
        CreditSummary {
            per_category,
            total,
            declared: self.total_credits,
        }
    }

    /// Record count per framework label; the trailing `None` entry counts
    /// unlabelled records.
    pub fn framework_counts(&self) -> Vec<(Option<Framework>, usize)> {
        Framework::ALL
            .into_iter()
            .map(Some)
            .chain(std::iter::once(None))
            .map(|fw| (fw, self.records().filter(|r| r.framework == fw).count()))
            .collect()
    }

    /// Records whose determined credit hours differ from `expected`.
    pub fn unusual_credit_hours(&self, expected: u8) -> Vec<&CourseRecord> {
        self.records()
            .filter(|r| r.has_credit_hours() && r.credit_hours != expected)
            .collect()
    }

    /// Canonical codes that sit in more than one bucket.
    pub fn cross_category_duplicates(&self) -> Vec<(CourseCode, Vec<Category>)> {
        let mut seen: BTreeMap<&CourseCode, Vec<Category>> = BTreeMap::new();
        for record in self.records() {
            let cats = seen.entry(&record.code).or_default();
            if !cats.contains(&record.category) {
                cats.push(record.category);
            }
        }
        seen.into_iter()
            .filter(|(_, cats)| cats.len() > 1)
            .map(|(code, cats)| (code.clone(), cats))
            .collect()
    }

    pub fn to_json_pretty(&self) -> Result<String, CatalogError> {
        let [university, college, department, electives] = self.buckets.clone();
        let body = CatalogBody {
            name: self.name.clone(),
            source: self.source.clone(),
            total_credits: self.total_credits,
            extracted_at: self.extracted_at,
            university_requirements: university,
            college_requirements: college,
            department_requirements: department,
            electives,
        };
        let mut root = serde_json::Map::new();
        root.insert(self.key.clone(), serde_json::to_value(body)?);
        Ok(serde_json::to_string_pretty(&Value::Object(root))?)
    }

    /// Read a catalog, either wrapped as `{ "<key>": { ... } }` or as a bare
    /// body. Codes are normalized and buckets deduplicated on the way in.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(text)?;
        let (key, body) = unwrap_root(value)?;

        if let Value::Object(map) = &body {
            for (k, v) in map {
                if v.is_array() && !Category::ALL.iter().any(|c| c.key() == k) {
                    warn!("Ignoring unrecognized catalog list '{}' ({} entries)", k, v.as_array().map_or(0, Vec::len));
                }
            }
        }

        let body: CatalogBody = serde_json::from_value(body)?;
        let mut builder = CatalogBuilder::new(&key, &body.name);
        builder.catalog.source = body.source;
        builder.catalog.total_credits = body.total_credits;
        builder.catalog.extracted_at = body.extracted_at;

        let lists = [
            (Category::University, body.university_requirements),
            (Category::College, body.college_requirements),
            (Category::Department, body.department_requirements),
            (Category::Elective, body.electives),
        ];
        for (category, records) in lists {
            for mut record in records {
                record.category = category;
                builder.push(record);
            }
        }
        Ok(builder.build())
    }
}

fn has_category_list(map: &serde_json::Map<String, Value>) -> bool {
    Category::ALL.iter().any(|c| map.contains_key(c.key()))
}

fn unwrap_root(value: Value) -> Result<(String, Value), CatalogError> {
    let Value::Object(map) = value else {
        return Err(CatalogError::Shape("top level is not an object".into()));
    };
    if has_category_list(&map) {
        return Ok((String::new(), Value::Object(map)));
    }
    if map.len() == 1 {
        if let Some((key, inner)) = map.into_iter().next() {
            if matches!(&inner, Value::Object(m) if has_category_list(m)) {
                return Ok((key, inner));
            }
        }
    }
    Err(CatalogError::Shape("no category lists found".into()))
}

/// Assembles records into buckets, keeping the first record per canonical
/// code within a bucket.
pub struct CatalogBuilder {
    catalog: Catalog,
    seen: [HashSet<CourseCode>; 4],
}

impl CatalogBuilder {
    pub fn new(key: &str, name: &str) -> Self {
        CatalogBuilder {
            catalog: Catalog {
                key: key.to_string(),
                name: name.to_string(),
                source: None,
                total_credits: None,
                extracted_at: None,
                buckets: Default::default(),
            },
            seen: Default::default(),
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.catalog.source = Some(source.into());
        self
    }

    pub fn total_credits(mut self, total: Option<u32>) -> Self {
        self.catalog.total_credits = total;
        self
    }

    pub fn extracted_at(mut self, at: DateTime<Utc>) -> Self {
        self.catalog.extracted_at = Some(at);
        self
    }

    /// Returns false (and drops the record) when its code is already in the
    /// bucket.
    pub fn push(&mut self, record: CourseRecord) -> bool {
        let idx = record.category.index();
        if !self.seen[idx].insert(record.code.clone()) {
            warn!(
                "Duplicate code {} in {}; keeping first ('{}'), dropping '{}'",
                record.code,
                record.category,
                self.catalog.buckets[idx]
                    .iter()
                    .find(|r| r.code == record.code)
                    .map_or("", |r| r.name.as_str()),
                record.name
            );
            return false;
        }
        debug!("Committed {} '{}' to {}", record.code, record.name, record.category);
        self.catalog.buckets[idx].push(record);
        true
    }

    pub fn build(self) -> Catalog {
        self.catalog
    }
}

// ── Tests ──
