//! Rubric model: the criteria a batch is scored against
//!
//! A rubric is loaded once per run and shared read-only between every
//! candidate evaluation. Criterion names are case-sensitive because the
//! response parser keys on the exact names echoed back by the model.

pub mod loader;

pub use loader::{RubricLoader, RubricRow};

use serde::{Deserialize, Serialize};

/// Name of the spreadsheet row that carries the rubric total rather than a criterion.
pub const TOTAL_POSSIBLE_POINTS: &str = "Total Possible Points";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricEntry {
    pub name: String,
    pub min_points: i64,
    pub max_points: i64,
    pub notes: String,
    pub weight: f64,
}

impl RubricEntry {
    pub fn range_label(&self) -> String {
        format!("{}-{}", self.min_points, self.max_points)
    }

    /// Clamp a reported score into this criterion's range.
    pub fn clamp(&self, score: f64) -> f64 {
        score.clamp(self.min_points as f64, self.max_points as f64)
    }

    /// Contribution of a raw score to the weighted total.
    pub fn weighted(&self, raw: f64) -> f64 {
        (raw / self.max_points as f64) * self.weight
    }
}

/// The metadata row excluded from scoring, kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedRow {
    pub name: String,
    pub points: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    entries: Vec<RubricEntry>,
    excluded: Option<ExcludedRow>,
}

impl Rubric {
    pub(crate) fn new(entries: Vec<RubricEntry>, excluded: Option<ExcludedRow>) -> Self {
        Self { entries, excluded }
    }

    /// Scored criteria in rubric order.
    pub fn entries(&self) -> &[RubricEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&RubricEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn excluded(&self) -> Option<&ExcludedRow> {
        self.excluded.as_ref()
    }

    /// Highest reachable weighted total. Equals 100 only when the weights do.
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|entry| entry.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, min: i64, max: i64, weight: f64) -> RubricEntry {
        RubricEntry {
            name: name.to_string(),
            min_points: min,
            max_points: max,
            notes: String::new(),
            weight,
        }
    }

    #[test]
    fn test_clamp_and_weight() {
        let skills = entry("Skills", 1, 5, 60.0);
        assert_eq!(skills.clamp(8.0), 5.0);
        assert_eq!(skills.clamp(-2.0), 1.0);
        assert_eq!(skills.clamp(3.5), 3.5);
        assert!((skills.weighted(4.0) - 48.0).abs() < 1e-9);
        assert_eq!(skills.range_label(), "1-5");
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let rubric = Rubric::new(vec![entry("Skills", 1, 5, 60.0), entry("Experience", 1, 5, 40.0)], None);
        assert!(rubric.get("Skills").is_some());
        assert!(rubric.get("skills").is_none());
        assert_eq!(rubric.names().collect::<Vec<_>>(), vec!["Skills", "Experience"]);
        assert_eq!(rubric.total_weight(), 100.0);
    }
}
