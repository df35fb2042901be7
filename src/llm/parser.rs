//! Extraction of per-criterion scores from free-text model replies
//!
//! Parsing never fails. Each criterion ends up with a raw score inside its
//! rubric range: reported values are clamped to the nearest bound, and a
//! criterion the reply does not mention falls back to its minimum.

use crate::rubric::{Rubric, RubricEntry};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a criterion's raw score came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScoreSource {
    Parsed,
    Clamped { reported: f64 },
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: String,
    pub raw: f64,
    pub source: ScoreSource,
    pub justification: Option<String>,
}

/// Scores for every rubric criterion, in rubric order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub scores: Vec<CriterionScore>,
}

impl ParsedResponse {
    /// Every criterion at its minimum; used when no reply could be obtained.
    pub fn defaulted(rubric: &Rubric) -> Self {
        Self {
            scores: rubric
                .entries()
                .iter()
                .map(|entry| CriterionScore {
                    criterion: entry.name.clone(),
                    raw: entry.min_points as f64,
                    source: ScoreSource::Defaulted,
                    justification: None,
                })
                .collect(),
        }
    }

    pub fn raw_scores(&self) -> BTreeMap<String, f64> {
        self.scores
            .iter()
            .map(|score| (score.criterion.clone(), score.raw))
            .collect()
    }

    pub fn justifications(&self) -> BTreeMap<String, String> {
        self.scores
            .iter()
            .filter_map(|score| {
                score
                    .justification
                    .as_ref()
                    .map(|text| (score.criterion.clone(), text.clone()))
            })
            .collect()
    }

    pub fn defaulted_count(&self) -> usize {
        self.scores
            .iter()
            .filter(|score| score.source == ScoreSource::Defaulted)
            .count()
    }

    /// True when nothing in the reply could be matched.
    pub fn is_unparsed(&self) -> bool {
        self.defaulted_count() == self.scores.len()
    }

    pub fn get(&self, criterion: &str) -> Option<&CriterionScore> {
        self.scores.iter().find(|score| score.criterion == criterion)
    }
}

/// Strategy for turning a model reply into criterion scores.
pub trait ResponseParser: Send + Sync {
    fn parse(&self, response: &str, rubric: &Rubric) -> ParsedResponse;
}

/// Tolerant pattern matcher for `'Criterion': 4, justification: ...` replies.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexResponseParser;

/// A score line located in the reply.
#[derive(Debug, Clone, Copy)]
struct ScoreMatch {
    name_start: usize,
    end: usize,
    value: f64,
}

impl RegexResponseParser {
    pub fn new() -> Self {
        Self
    }

    fn score_pattern(name: &str) -> Regex {
        let pattern = format!(
            r#"({})['"‘’“”`*]{{0,3}}\s*[:=]\s*\**\s*([-+]?\d+(?:\.\d+)?)\s*,?"#,
            regex::escape(name)
        );
        Regex::new(&pattern).expect("escaped criterion pattern is valid")
    }

    /// First occurrence of `entry`'s score line that is not part of a longer criterion name.
    fn find_score(text: &str, entry: &RubricEntry, rubric: &Rubric) -> Option<ScoreMatch> {
        let longer_spans: Vec<(usize, usize)> = rubric
            .names()
            .filter(|other| other.len() > entry.name.len() && other.contains(entry.name.as_str()))
            .flat_map(|other| {
                text.match_indices(other)
                    .map(move |(start, _)| (start, start + other.len()))
            })
            .collect();

        Self::score_pattern(&entry.name)
            .captures_iter(text)
            .filter_map(|caps| {
                let name = caps.get(1)?;
                let value = caps.get(2)?;
                let whole = caps.get(0)?;

                let preceded_by_word = text[..name.start()]
                    .chars()
                    .next_back()
                    .map(|c| c.is_alphanumeric() || c == '_')
                    .unwrap_or(false);
                if preceded_by_word {
                    return None;
                }
                let inside_longer = longer_spans
                    .iter()
                    .any(|&(start, end)| start <= name.start() && name.end() <= end);
                if inside_longer {
                    return None;
                }

                let value = value.as_str().parse::<f64>().ok()?;
                Some(ScoreMatch {
                    name_start: name.start(),
                    end: whole.end(),
                    value,
                })
            })
            .next()
    }

    fn justification(text: &str, from: usize, until: usize) -> Option<String> {
        let label = Regex::new(r"^[\s,]*\**[Jj]ustification\**\s*[:\-]\s*").expect("Invalid justification regex");
        let window = &text[from..until];
        let found = label.find(window)?;

        let body = window[found.end()..]
            .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '\'' | '"' | '‘' | '“' | '*' | '`'))
            .trim();
        (!body.is_empty()).then(|| body.to_string())
    }
}

impl ResponseParser for RegexResponseParser {
    fn parse(&self, response: &str, rubric: &Rubric) -> ParsedResponse {
        let text = response.trim();

        let matches: Vec<Option<ScoreMatch>> = rubric
            .entries()
            .iter()
            .map(|entry| Self::find_score(text, entry, rubric))
            .collect();

        let mut boundaries: Vec<usize> = matches.iter().flatten().map(|m| m.name_start).collect();
        boundaries.sort_unstable();

        let scores = rubric
            .entries()
            .iter()
            .zip(matches)
            .map(|(entry, found)| match found {
                Some(found) => {
                    let raw = entry.clamp(found.value);
                    let source = if raw == found.value {
                        ScoreSource::Parsed
                    } else {
                        debug!(
                            "Clamped {} from {} into {}",
                            entry.name,
                            found.value,
                            entry.range_label()
                        );
                        ScoreSource::Clamped {
                            reported: found.value,
                        }
                    };
                    let until = boundaries
                        .iter()
                        .copied()
                        .find(|&start| start >= found.end)
                        .unwrap_or(text.len());

                    CriterionScore {
                        criterion: entry.name.clone(),
                        raw,
                        source,
                        justification: Self::justification(text, found.end, until),
                    }
                }
                None => {
                    debug!(
                        "No score found for {}. Defaulting to {}",
                        entry.name, entry.min_points
                    );
                    CriterionScore {
                        criterion: entry.name.clone(),
                        raw: entry.min_points as f64,
                        source: ScoreSource::Defaulted,
                        justification: None,
                    }
                }
            })
            .collect();

        ParsedResponse { scores }
    }
}
