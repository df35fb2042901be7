//! Report structures built from a finished ranking

use crate::processing::{RankedResult, ScoreStatus};
use crate::rubric::Rubric;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ranked candidates plus the context needed to read their scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingReport {
    pub summary: RankingSummary,
    pub criteria: Vec<CriterionSummary>,
    pub ranking: RankedResult,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingSummary {
    pub candidate_count: usize,
    pub scored_count: usize,
    pub partial_count: usize,
    pub needs_review_count: usize,
    pub top_candidate: Option<String>,
    pub top_score: Option<f64>,
    pub mean_score: Option<f64>,
    /// Ceiling of `total_weighted`; 100 only when the weights sum to 100.
    pub max_possible: f64,
    pub weights_sum_to_100: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionSummary {
    pub name: String,
    pub range: String,
    pub weight: f64,
    pub notes: String,
    pub average_raw: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub ranker_version: String,
    pub model: String,
    pub job_file: String,
    pub rubric_file: String,
    pub resume_source: String,
    pub processing_time_ms: u64,
}

impl ReportMetadata {
    pub fn new(model: &str, job_file: &str, rubric_file: &str, resume_source: &str, processing_time_ms: u64) -> Self {
        Self {
            generated_at: Utc::now(),
            ranker_version: env!("CARGO_PKG_VERSION").to_string(),
            model: model.to_string(),
            job_file: job_file.to_string(),
            rubric_file: rubric_file.to_string(),
            resume_source: resume_source.to_string(),
            processing_time_ms,
        }
    }
}

impl RankingReport {
    pub fn build(ranking: RankedResult, rubric: &Rubric, metadata: ReportMetadata) -> Self {
        let count_status = |status: ScoreStatus| {
            ranking
                .candidates
                .iter()
                .filter(|candidate| candidate.status == status)
                .count()
        };

        let totals: Vec<f64> = ranking.candidates.iter().map(|c| c.total_weighted).collect();
        let mean_score = (!totals.is_empty()).then(|| totals.iter().sum::<f64>() / totals.len() as f64);
        let top = ranking.candidates.first();

        let summary = RankingSummary {
            candidate_count: ranking.len(),
            scored_count: count_status(ScoreStatus::Scored),
            partial_count: count_status(ScoreStatus::Partial),
            needs_review_count: count_status(ScoreStatus::NeedsReview),
            top_candidate: top.map(|c| c.identifier.clone()),
            top_score: top.map(|c| c.total_weighted),
            mean_score,
            max_possible: ranking.max_possible,
            weights_sum_to_100: (rubric.total_weight() - 100.0).abs() < 1e-6,
        };

        let criteria = rubric
            .entries()
            .iter()
            .map(|entry| {
                let raws: Vec<f64> = ranking
                    .candidates
                    .iter()
                    .filter_map(|c| c.per_criterion_raw.get(&entry.name).copied())
                    .collect();
                CriterionSummary {
                    name: entry.name.clone(),
                    range: entry.range_label(),
                    weight: entry.weight,
                    notes: entry.notes.clone(),
                    average_raw: (!raws.is_empty()).then(|| raws.iter().sum::<f64>() / raws.len() as f64),
                }
            })
            .collect();

        Self {
            summary,
            criteria,
            ranking,
            metadata,
        }
    }

    /// Score as a percentage of the rubric ceiling.
    pub fn percentage(&self, total_weighted: f64) -> f64 {
        if self.summary.max_possible > 0.0 {
            total_weighted / self.summary.max_possible * 100.0
        } else {
            0.0
        }
    }
}
