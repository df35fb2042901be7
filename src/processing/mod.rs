//! Scoring pipeline: aggregation, retries, batch orchestration and ranking

pub mod batch;
pub mod ranking;
pub mod retry;
pub mod scoring;

pub use batch::{BatchEvent, BatchOrchestrator, BatchRun, ProgressEvent};
pub use ranking::{CandidateEvaluation, RankedCandidate, RankedResult};
pub use retry::{predict_with_retry, RetryPolicy};
pub use scoring::{aggregate, ScoreRecord, ScoreStatus};
