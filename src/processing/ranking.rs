//! Per-candidate evaluations and the final ranking

use crate::processing::scoring::{ScoreRecord, ScoreStatus};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Everything learned about one candidate during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvaluation {
    pub identifier: String,
    pub contact: String,
    pub record: ScoreRecord,
    pub justifications: BTreeMap<String, String>,
    pub status: ScoreStatus,
    /// Human-readable reasons behind a degraded status.
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub identifier: String,
    pub contact: String,
    pub total_weighted: f64,
    pub per_criterion_raw: BTreeMap<String, f64>,
    pub per_criterion_weighted: BTreeMap<String, f64>,
    pub justifications: BTreeMap<String, String>,
    pub status: ScoreStatus,
    pub issues: Vec<String>,
}

/// Candidates ordered by weighted total, highest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub candidates: Vec<RankedCandidate>,
    /// Highest reachable total under the rubric used for this run.
    pub max_possible: f64,
}

impl RankedResult {
    /// Stable sort: equal totals keep their input order.
    pub fn from_evaluations(mut evaluations: Vec<CandidateEvaluation>, max_possible: f64) -> Self {
        evaluations.sort_by(|a, b| {
            b.record
                .total_weighted
                .partial_cmp(&a.record.total_weighted)
                .unwrap_or(Ordering::Equal)
        });

        let candidates = evaluations
            .into_iter()
            .enumerate()
            .map(|(index, evaluation)| RankedCandidate {
                rank: index + 1,
                identifier: evaluation.identifier,
                contact: evaluation.contact,
                total_weighted: evaluation.record.total_weighted,
                per_criterion_raw: evaluation.record.per_criterion_raw,
                per_criterion_weighted: evaluation.record.per_criterion_weighted,
                justifications: evaluation.justifications,
                status: evaluation.status,
                issues: evaluation.issues,
            })
            .collect();

        Self {
            candidates,
            max_possible,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn top(&self, n: usize) -> &[RankedCandidate] {
        &self.candidates[..n.min(self.candidates.len())]
    }

    pub fn needs_review(&self) -> impl Iterator<Item = &RankedCandidate> {
        self.candidates
            .iter()
            .filter(|candidate| candidate.status == ScoreStatus::NeedsReview)
    }
}
