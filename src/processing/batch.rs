//! Batch orchestration: score every candidate in order and rank the results
//!
//! A run is driven by one spawned task that walks the candidates strictly
//! sequentially and reports through a bounded channel. The consumer sees one
//! `Progress` event per candidate, in input order, and then exactly one
//! terminal event. Dropping the [`BatchRun`] stops the worker after the
//! candidate in flight; documents it never reached are released in bulk.

use crate::error::{RankerError, Result};
use crate::input::{Candidate, CandidateDocument, DocumentSource};
use crate::llm::{ParsedResponse, PromptTemplates, RegexResponseParser, ResponseParser, ScoringModel};
use crate::processing::ranking::{CandidateEvaluation, RankedResult};
use crate::processing::retry::{predict_with_retry, RetryPolicy};
use crate::processing::scoring::{aggregate, ScoreStatus};
use crate::rubric::Rubric;
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// 1-based position in the input.
    pub index: usize,
    pub total: usize,
    pub candidate: String,
    pub status: ScoreStatus,
    pub total_weighted: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Progress(ProgressEvent),
    Completed(RankedResult),
    Aborted { reason: String },
}

impl BatchEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchEvent::Progress(_))
    }
}

impl fmt::Display for BatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchEvent::Progress(progress) => write!(
                f,
                "Processed {}/{}: {} ({:.1}, {})",
                progress.index,
                progress.total,
                progress.candidate,
                progress.total_weighted,
                progress.status.label()
            ),
            BatchEvent::Completed(ranking) => {
                write!(f, "Completed: {} candidates ranked", ranking.len())
            }
            BatchEvent::Aborted { reason } => write!(f, "Aborted: {}", reason),
        }
    }
}

/// A lazily consumed, single-pass batch run.
pub struct BatchRun {
    events: mpsc::Receiver<BatchEvent>,
    worker: JoinHandle<()>,
    finished: bool,
}

impl BatchRun {
    /// Next event, or `None` once the terminal event has been delivered.
    pub async fn next(&mut self) -> Option<BatchEvent> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await;
        match &event {
            Some(event) if event.is_terminal() => self.finished = true,
            None => self.finished = true,
            _ => {}
        }
        event
    }

    /// Drain the run, handing each progress event to `on_progress`.
    pub async fn into_ranking_with<F>(mut self, mut on_progress: F) -> Result<RankedResult>
    where
        F: FnMut(&ProgressEvent),
    {
        while let Some(event) = self.next().await {
            match event {
                BatchEvent::Progress(progress) => on_progress(&progress),
                BatchEvent::Completed(ranking) => return Ok(ranking),
                BatchEvent::Aborted { reason } => return Err(RankerError::AggregationInvariant(reason)),
            }
        }

        let reason = match (&mut self.worker).await {
            Err(e) if e.is_panic() => "scoring worker panicked".to_string(),
            _ => "event stream closed before completion".to_string(),
        };
        Err(RankerError::BatchInterrupted(reason))
    }

    pub async fn into_ranking(self) -> Result<RankedResult> {
        self.into_ranking_with(|_| {}).await
    }
}

/// Drives candidates through extraction, prompting, scoring and aggregation.
#[derive(Clone)]
pub struct BatchOrchestrator {
    source: Arc<dyn DocumentSource>,
    parser: Arc<dyn ResponseParser>,
    prompts: PromptTemplates,
    retry: RetryPolicy,
    channel_capacity: usize,
}

impl BatchOrchestrator {
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        Self {
            source,
            parser: Arc::new(RegexResponseParser::new()),
            prompts: PromptTemplates::default(),
            retry: RetryPolicy::default(),
            channel_capacity: 16,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn ResponseParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptTemplates) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Start a run on the current tokio runtime.
    pub fn run(
        &self,
        candidates: Vec<CandidateDocument>,
        job_description: &str,
        rubric: Arc<Rubric>,
        scorer: Arc<dyn ScoringModel>,
    ) -> BatchRun {
        let (sender, events) = mpsc::channel(self.channel_capacity);
        let worker = Worker {
            source: Arc::clone(&self.source),
            parser: Arc::clone(&self.parser),
            prompts: self.prompts.clone(),
            retry: self.retry,
            job_description: Arc::from(job_description),
            rubric,
            scorer,
        };

        info!(
            "Starting batch of {} candidates with model {}",
            candidates.len(),
            worker.scorer.model_name()
        );
        let worker = tokio::spawn(worker.drive(candidates, sender));

        BatchRun {
            events,
            worker,
            finished: false,
        }
    }
}

struct Worker {
    source: Arc<dyn DocumentSource>,
    parser: Arc<dyn ResponseParser>,
    prompts: PromptTemplates,
    retry: RetryPolicy,
    job_description: Arc<str>,
    rubric: Arc<Rubric>,
    scorer: Arc<dyn ScoringModel>,
}

impl Worker {
    async fn drive(self, candidates: Vec<CandidateDocument>, sender: mpsc::Sender<BatchEvent>) {
        let total = candidates.len();
        let mut evaluations = Vec::with_capacity(total);
        let mut pending = candidates.into_iter().enumerate();

        while let Some((position, document)) = pending.next() {
            let outcome = self.evaluate(&document).await;
            self.source.release(&document).await;

            let evaluation = match outcome {
                Ok(evaluation) => evaluation,
                Err(e) => {
                    error!("Aborting batch at {}: {}", document.identifier, e);
                    for (_, rest) in pending.by_ref() {
                        self.source.release(&rest).await;
                    }
                    let _ = sender
                        .send(BatchEvent::Aborted {
                            reason: e.to_string(),
                        })
                        .await;
                    return;
                }
            };

            let progress = ProgressEvent {
                index: position + 1,
                total,
                candidate: evaluation.identifier.clone(),
                status: evaluation.status,
                total_weighted: evaluation.record.total_weighted,
            };
            evaluations.push(evaluation);

            if sender.send(BatchEvent::Progress(progress)).await.is_err() {
                info!("Progress consumer went away after {} of {} candidates", position + 1, total);
                for (_, rest) in pending.by_ref() {
                    self.source.release(&rest).await;
                }
                return;
            }
        }

        let ranking = RankedResult::from_evaluations(evaluations, self.rubric.total_weight());
        info!("Ranked {} candidates", ranking.len());
        if sender.send(BatchEvent::Completed(ranking)).await.is_err() {
            debug!("Ranking completed after the consumer went away");
        }
    }

    async fn evaluate(&self, document: &CandidateDocument) -> Result<CandidateEvaluation> {
        let mut issues = Vec::new();
        let mut degraded = false;

        let pages = match self.source.read_pages(document).await {
            Ok(pages) => pages,
            Err(e) => {
                let e = RankerError::DocumentExtraction {
                    document: document.identifier.clone(),
                    reason: e.to_string(),
                };
                warn!("{}; scoring as an empty resume", e);
                issues.push(e.to_string());
                degraded = true;
                Vec::new()
            }
        };
        let candidate = Candidate::from_pages(document.identifier.clone(), &pages);

        let parsed = if candidate.raw_text.trim().is_empty() {
            if !degraded {
                warn!("{} has no extractable text", candidate.source_identifier);
                issues.push("document contains no extractable text".to_string());
                degraded = true;
            }
            ParsedResponse::defaulted(&self.rubric)
        } else {
            let prompt = self
                .prompts
                .render_scoring(&self.job_description, &self.rubric, &candidate.raw_text);
            match predict_with_retry(self.scorer.as_ref(), &prompt, &self.retry).await {
                Ok(response) => self.parser.parse(&response, &self.rubric),
                Err(e) => {
                    let e = RankerError::ScoringService(e);
                    warn!("{}: {}; defaulting to minimum scores", candidate.source_identifier, e);
                    issues.push(e.to_string());
                    degraded = true;
                    ParsedResponse::defaulted(&self.rubric)
                }
            }
        };

        if !degraded && parsed.is_unparsed() {
            issues.push("no criterion scores found in the model reply".to_string());
        }
        let status = ScoreStatus::assess(&parsed, degraded);
        let justifications = parsed.justifications();
        let record = aggregate(parsed.raw_scores(), &self.rubric)?;

        debug!(
            "{} scored {:.2} ({})",
            candidate.source_identifier,
            record.total_weighted,
            status.label()
        );

        Ok(CandidateEvaluation {
            identifier: candidate.source_identifier,
            contact: candidate.contact_identifier,
            record,
            justifications,
            status,
            issues,
        })
    }
}
