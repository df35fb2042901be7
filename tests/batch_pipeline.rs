//! End-to-end batch runs against in-memory documents and a scripted model

use async_trait::async_trait;
use resume_ranker::error::{RankerError, Result, ScoringServiceError};
use resume_ranker::input::{CandidateDocument, DocumentSource};
use resume_ranker::llm::{CriterionScore, ParsedResponse, ResponseParser, ScoreSource, ScoringModel};
use resume_ranker::processing::{BatchEvent, BatchOrchestrator, RetryPolicy, ScoreStatus};
use resume_ranker::rubric::{Rubric, RubricLoader, RubricRow};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const WELL_FORMED: &str =
    "'Skills': 4, justification: strong match 'Experience': 3, justification: adequate";

#[derive(Clone)]
enum Reply {
    Text(&'static str),
    Status(u16),
}

/// Replies keyed by a marker found in the resume text; the last reply repeats.
#[derive(Default)]
struct ScriptedModel {
    scripts: HashMap<&'static str, Vec<Reply>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl ScriptedModel {
    fn with(mut self, marker: &'static str, replies: Vec<Reply>) -> Self {
        self.scripts.insert(marker, replies);
        self
    }

    fn calls_for(&self, marker: &str) -> usize {
        self.calls.lock().unwrap().get(marker).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ScoringModel for ScriptedModel {
    async fn predict(&self, prompt: &str) -> std::result::Result<String, ScoringServiceError> {
        let (marker, replies) = self
            .scripts
            .iter()
            .find(|(marker, _)| prompt.contains(**marker))
            .expect("prompt for an unscripted resume");

        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(*marker).or_insert(0);
            *count += 1;
            *count
        };

        match replies[(attempt - 1).min(replies.len() - 1)].clone() {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Status(status) => Err(ScoringServiceError::Api {
                status,
                message: "scripted failure".to_string(),
            }),
        }
    }
}

/// Documents held in memory; records reads and releases.
#[derive(Default)]
struct MemorySource {
    pages: HashMap<String, std::result::Result<Vec<String>, String>>,
    reads: AtomicUsize,
    released: Mutex<Vec<String>>,
}

impl MemorySource {
    fn with_text(mut self, identifier: &str, text: &str) -> Self {
        self.pages.insert(identifier.to_string(), Ok(vec![text.to_string()]));
        self
    }

    fn with_failure(mut self, identifier: &str, reason: &str) -> Self {
        self.pages.insert(identifier.to_string(), Err(reason.to_string()));
        self
    }

    fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn read_pages(&self, document: &CandidateDocument) -> Result<Vec<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(&document.identifier) {
            Some(Ok(pages)) => Ok(pages.clone()),
            Some(Err(reason)) => Err(RankerError::UnsupportedFormat(reason.clone())),
            None => Err(RankerError::InvalidInput(format!("no document {}", document.identifier))),
        }
    }

    async fn release(&self, document: &CandidateDocument) {
        self.released.lock().unwrap().push(document.identifier.clone());
    }
}

/// Reports a criterion that is not in the rubric.
struct RogueParser;

impl ResponseParser for RogueParser {
    fn parse(&self, _raw_response: &str, _rubric: &Rubric) -> ParsedResponse {
        ParsedResponse {
            scores: vec![CriterionScore {
                criterion: "Charisma".to_string(),
                raw: 5.0,
                source: ScoreSource::Parsed,
                justification: None,
            }],
        }
    }
}

fn rubric() -> Arc<Rubric> {
    Arc::new(
        RubricLoader::new()
            .load_rows(vec![
                RubricRow::new("Skills", "1-5", "Relevant languages", "60"),
                RubricRow::new("Experience", "1-5", "Relevant years", "40"),
            ])
            .unwrap(),
    )
}

fn documents(identifiers: &[&str]) -> Vec<CandidateDocument> {
    identifiers
        .iter()
        .map(|id| CandidateDocument::new(*id, format!("/inbox/{}", id)))
        .collect()
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_scores_and_ranks_candidates() {
    let source = Arc::new(
        MemorySource::default()
            .with_text("low.pdf", "resume-low contact: low@example.com")
            .with_text("high.pdf", "resume-high contact: high@example.com"),
    );
    let model = Arc::new(
        ScriptedModel::default()
            .with("resume-low", vec![Reply::Text("I cannot evaluate this resume.")])
            .with("resume-high", vec![Reply::Text(WELL_FORMED)]),
    );

    let ranking = BatchOrchestrator::new(source.clone())
        .with_retry_policy(fast_retry())
        .run(documents(&["low.pdf", "high.pdf"]), "Backend engineer", rubric(), model)
        .into_ranking()
        .await
        .unwrap();

    assert_eq!(ranking.len(), 2);
    let high = &ranking.candidates[0];
    assert_eq!(high.identifier, "high.pdf");
    assert_eq!(high.rank, 1);
    assert_eq!(high.contact, "high@example.com");
    assert_eq!(high.per_criterion_raw["Skills"], 4.0);
    assert_eq!(high.per_criterion_raw["Experience"], 3.0);
    assert!((high.total_weighted - 72.0).abs() < 1e-9);
    assert_eq!(high.status, ScoreStatus::Scored);
    assert_eq!(high.justifications["Skills"], "strong match");

    let low = &ranking.candidates[1];
    assert_eq!(low.identifier, "low.pdf");
    assert_eq!(low.per_criterion_raw["Skills"], 1.0);
    assert_eq!(low.per_criterion_raw["Experience"], 1.0);
    assert!((low.total_weighted - 20.0).abs() < 1e-9);
    assert_eq!(low.status, ScoreStatus::NeedsReview);

    assert_eq!(source.released(), vec!["low.pdf", "high.pdf"]);
}

#[tokio::test]
async fn test_ties_keep_input_order() {
    let source = Arc::new(
        MemorySource::default()
            .with_text("b.pdf", "resume-b")
            .with_text("a.pdf", "resume-a")
            .with_text("c.pdf", "resume-c"),
    );
    let model = Arc::new(
        ScriptedModel::default()
            .with("resume-b", vec![Reply::Text("'Skills': 3, 'Experience': 3")])
            .with("resume-a", vec![Reply::Text("'Skills': 3, 'Experience': 3")])
            .with("resume-c", vec![Reply::Text("'Skills': 5, 'Experience': 5")]),
    );

    let ranking = BatchOrchestrator::new(source)
        .run(documents(&["b.pdf", "a.pdf", "c.pdf"]), "job", rubric(), model)
        .into_ranking()
        .await
        .unwrap();

    let order: Vec<&str> = ranking.candidates.iter().map(|c| c.identifier.as_str()).collect();
    assert_eq!(order, vec!["c.pdf", "b.pdf", "a.pdf"]);
}

#[tokio::test]
async fn test_one_progress_event_per_candidate_then_terminal() {
    let source = Arc::new(
        MemorySource::default()
            .with_text("one.pdf", "resume-one")
            .with_failure("two.docx", "docx is not supported")
            .with_text("three.pdf", "resume-three"),
    );
    let model = Arc::new(
        ScriptedModel::default()
            .with("resume-one", vec![Reply::Text(WELL_FORMED)])
            .with("resume-three", vec![Reply::Status(401)]),
    );

    let mut run = BatchOrchestrator::new(source)
        .with_retry_policy(fast_retry())
        .run(documents(&["one.pdf", "two.docx", "three.pdf"]), "job", rubric(), model);

    let mut events = Vec::new();
    while let Some(event) = run.next().await {
        events.push(event);
    }

    assert_eq!(events.len(), 4);
    for (position, event) in events[..3].iter().enumerate() {
        match event {
            BatchEvent::Progress(progress) => {
                assert_eq!(progress.index, position + 1);
                assert_eq!(progress.total, 3);
            }
            other => panic!("expected progress, got {:?}", other),
        }
    }
    assert_eq!(events[0].to_string(), "Processed 1/3: one.pdf (72.0, scored)");

    match &events[3] {
        BatchEvent::Completed(ranking) => {
            assert_eq!(ranking.len(), 3);
            assert_eq!(ranking.needs_review().count(), 2);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert!(run.next().await.is_none());
}

#[tokio::test]
async fn test_extraction_failure_is_ranked_for_review() {
    let source = Arc::new(MemorySource::default().with_failure("scan.docx", "docx is not supported"));
    let model = Arc::new(ScriptedModel::default());

    let ranking = BatchOrchestrator::new(source)
        .run(documents(&["scan.docx"]), "job", rubric(), model.clone())
        .into_ranking()
        .await
        .unwrap();

    let candidate = &ranking.candidates[0];
    assert_eq!(candidate.status, ScoreStatus::NeedsReview);
    assert!((candidate.total_weighted - 20.0).abs() < 1e-9);
    assert_eq!(candidate.contact, "Not Found");
    assert!(candidate.issues[0].contains("scan.docx"));
    assert!(model.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_document_skips_the_model() {
    let source = Arc::new(MemorySource::default().with_text("blank.pdf", "   \n  "));
    let model = Arc::new(ScriptedModel::default());

    let ranking = BatchOrchestrator::new(source)
        .run(documents(&["blank.pdf"]), "job", rubric(), model.clone())
        .into_ranking()
        .await
        .unwrap();

    assert_eq!(ranking.candidates[0].status, ScoreStatus::NeedsReview);
    assert!(model.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let source = Arc::new(
        MemorySource::default()
            .with_text("flaky.pdf", "resume-flaky")
            .with_text("down.pdf", "resume-down"),
    );
    let model = Arc::new(
        ScriptedModel::default()
            .with("resume-flaky", vec![Reply::Status(503), Reply::Text(WELL_FORMED)])
            .with("resume-down", vec![Reply::Status(429)]),
    );

    let ranking = BatchOrchestrator::new(source)
        .with_retry_policy(fast_retry())
        .run(documents(&["flaky.pdf", "down.pdf"]), "job", rubric(), model.clone())
        .into_ranking()
        .await
        .unwrap();

    assert_eq!(model.calls_for("resume-flaky"), 2);
    assert_eq!(model.calls_for("resume-down"), 3);

    let flaky = &ranking.candidates[0];
    assert_eq!(flaky.identifier, "flaky.pdf");
    assert_eq!(flaky.status, ScoreStatus::Scored);
    assert!((flaky.total_weighted - 72.0).abs() < 1e-9);

    let down = &ranking.candidates[1];
    assert_eq!(down.status, ScoreStatus::NeedsReview);
    assert!((down.total_weighted - 20.0).abs() < 1e-9);
    assert!(down.issues[0].contains("429"));
}

#[tokio::test]
async fn test_partial_reply_is_flagged() {
    let source = Arc::new(MemorySource::default().with_text("half.pdf", "resume-half"));
    let model = Arc::new(ScriptedModel::default().with("resume-half", vec![Reply::Text("'Skills': 5")]));

    let ranking = BatchOrchestrator::new(source)
        .run(documents(&["half.pdf"]), "job", rubric(), model)
        .into_ranking()
        .await
        .unwrap();

    let candidate = &ranking.candidates[0];
    assert_eq!(candidate.status, ScoreStatus::Partial);
    assert!((candidate.total_weighted - 68.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_dropping_the_run_releases_unprocessed_documents() {
    let ids = ["a.pdf", "b.pdf", "c.pdf", "d.pdf"];
    let source = Arc::new(
        ids.iter()
            .fold(MemorySource::default(), |source, id| source.with_text(id, "resume-any")),
    );
    let model = Arc::new(ScriptedModel::default().with("resume-any", vec![Reply::Text(WELL_FORMED)]));

    let mut run = BatchOrchestrator::new(source.clone())
        .with_channel_capacity(1)
        .run(documents(&ids), "job", rubric(), model);

    assert!(matches!(run.next().await, Some(BatchEvent::Progress(_))));
    drop(run);

    for _ in 0..200 {
        if source.released().len() == ids.len() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let mut released = source.released();
    released.sort();
    assert_eq!(released, ids.to_vec());
    assert!(source.reads.load(Ordering::SeqCst) < ids.len());
}

#[tokio::test]
async fn test_aggregation_defect_aborts_the_run() {
    let source = Arc::new(
        MemorySource::default()
            .with_text("first.pdf", "resume-first")
            .with_text("second.pdf", "resume-second"),
    );
    let model = Arc::new(
        ScriptedModel::default()
            .with("resume-first", vec![Reply::Text(WELL_FORMED)])
            .with("resume-second", vec![Reply::Text(WELL_FORMED)]),
    );

    let result = BatchOrchestrator::new(source.clone())
        .with_parser(Arc::new(RogueParser))
        .run(documents(&["first.pdf", "second.pdf"]), "job", rubric(), model)
        .into_ranking()
        .await;

    match result {
        Err(RankerError::AggregationInvariant(reason)) => assert!(reason.contains("Charisma")),
        other => panic!("expected an aggregation error, got {:?}", other),
    }

    let mut released = source.released();
    released.sort();
    assert_eq!(released, vec!["first.pdf", "second.pdf"]);
}

#[tokio::test]
async fn test_empty_batch_completes() {
    let ranking = BatchOrchestrator::new(Arc::new(MemorySource::default()))
        .run(Vec::new(), "job", rubric(), Arc::new(ScriptedModel::default()))
        .into_ranking()
        .await
        .unwrap();

    assert!(ranking.is_empty());
    assert_eq!(ranking.max_possible, 100.0);
}
