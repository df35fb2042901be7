//! Weighted aggregation of raw criterion scores

use crate::error::{RankerError, Result};
use crate::llm::ParsedResponse;
use crate::rubric::Rubric;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub per_criterion_raw: BTreeMap<String, f64>,
    pub per_criterion_weighted: BTreeMap<String, f64>,
    pub total_weighted: f64,
}

/// How much of a candidate's score reflects an actual model judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreStatus {
    /// Every criterion was read from the reply.
    Scored,
    /// Some criteria fell back to their minimum.
    Partial,
    /// Nothing usable came back; the score is the rubric floor.
    NeedsReview,
}

impl ScoreStatus {
    pub fn assess(parsed: &ParsedResponse, degraded: bool) -> Self {
        if degraded || parsed.is_unparsed() {
            ScoreStatus::NeedsReview
        } else if parsed.defaulted_count() > 0 {
            ScoreStatus::Partial
        } else {
            ScoreStatus::Scored
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreStatus::Scored => "scored",
            ScoreStatus::Partial => "partial",
            ScoreStatus::NeedsReview => "needs review",
        }
    }
}

/// Sum `(raw / max_points) * weight` over every scored criterion.
///
/// Totals read as "out of 100" only when the rubric weights sum to 100; in
/// general the ceiling is [`Rubric::total_weight`].
pub fn aggregate(per_criterion_raw: BTreeMap<String, f64>, rubric: &Rubric) -> Result<ScoreRecord> {
    if let Some(unknown) = per_criterion_raw.keys().find(|name| rubric.get(name).is_none()) {
        return Err(RankerError::AggregationInvariant(format!(
            "score reported for '{}', which is not a rubric criterion",
            unknown
        )));
    }

    let mut per_criterion_weighted = BTreeMap::new();
    let mut total_weighted = 0.0;

    for entry in rubric.entries() {
        let raw = per_criterion_raw.get(&entry.name).ok_or_else(|| {
            RankerError::AggregationInvariant(format!("no raw score for criterion '{}'", entry.name))
        })?;
        let weighted = entry.weighted(*raw);
        total_weighted += weighted;
        per_criterion_weighted.insert(entry.name.clone(), weighted);
    }

    Ok(ScoreRecord {
        per_criterion_raw,
        per_criterion_weighted,
        total_weighted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{RegexResponseParser, ResponseParser};
    use crate::rubric::{RubricLoader, RubricRow};

    fn rubric() -> Rubric {
        RubricLoader::new()
            .load_rows(vec![
                RubricRow::new("Skills", "1-5", "", "60"),
                RubricRow::new("Experience", "1-5", "", "40"),
            ])
            .unwrap()
    }

    fn raw(skills: f64, experience: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("Skills".to_string(), skills),
            ("Experience".to_string(), experience),
        ])
    }

    #[test]
    fn test_weighted_total() {
        let record = aggregate(raw(4.0, 3.0), &rubric()).unwrap();
        assert!((record.per_criterion_weighted["Skills"] - 48.0).abs() < 1e-9);
        assert!((record.per_criterion_weighted["Experience"] - 24.0).abs() < 1e-9);
        assert!((record.total_weighted - 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_floor_total() {
        let record = aggregate(raw(1.0, 1.0), &rubric()).unwrap();
        assert!((record.total_weighted - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_is_linear() {
        let rubric = rubric();
        let base = aggregate(raw(2.0, 3.0), &rubric).unwrap().total_weighted;

        for k in [0.5, 2.0, 3.0] {
            let scaled = aggregate(raw(2.0 * k, 3.0 * k), &rubric).unwrap().total_weighted;
            assert!((scaled - base * k).abs() < 1e-9, "k = {}", k);
        }
    }

    #[test]
    fn test_missing_criterion_is_an_invariant_violation() {
        let mut partial = raw(4.0, 3.0);
        partial.remove("Experience");
        assert!(matches!(
            aggregate(partial, &rubric()),
            Err(RankerError::AggregationInvariant(_))
        ));
    }

    #[test]
    fn test_unknown_criterion_is_an_invariant_violation() {
        let mut extra = raw(4.0, 3.0);
        extra.insert("Charisma".to_string(), 5.0);
        assert!(matches!(
            aggregate(extra, &rubric()),
            Err(RankerError::AggregationInvariant(_))
        ));
    }

    #[test]
    fn test_status_assessment() {
        let rubric = rubric();
        let full = RegexResponseParser.parse("'Skills': 4 'Experience': 3", &rubric);
        let half = RegexResponseParser.parse("'Skills': 4", &rubric);
        let none = RegexResponseParser.parse("no idea", &rubric);

        assert_eq!(ScoreStatus::assess(&full, false), ScoreStatus::Scored);
        assert_eq!(ScoreStatus::assess(&half, false), ScoreStatus::Partial);
        assert_eq!(ScoreStatus::assess(&none, false), ScoreStatus::NeedsReview);
        assert_eq!(ScoreStatus::assess(&full, true), ScoreStatus::NeedsReview);
    }
}
