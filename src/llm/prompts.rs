//! Scoring prompt rendering
//!
//! The output-format section is a contract with [`crate::llm::parser`]: the
//! model is asked to echo each criterion name verbatim inside single quotes,
//! followed by a colon, the score, and a `justification:` line.

use crate::rubric::Rubric;
use regex::{Captures, Regex};

#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub scoring: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            scoring: SCORING_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Render the scoring prompt for one resume. Pure and deterministic.
    pub fn render_scoring(&self, job_description: &str, rubric: &Rubric, resume_text: &str) -> String {
        let rubric_notes = render_rubric_notes(rubric);
        let output_format = render_output_format(rubric);

        // Single pass, so placeholder-like text inside a resume is left alone.
        let placeholder = Regex::new(r"\{(job|rubric|resume|format)\}").expect("Invalid placeholder regex");
        placeholder
            .replace_all(&self.scoring, |caps: &Captures| match &caps[1] {
                "job" => job_description.trim().to_string(),
                "rubric" => rubric_notes.clone(),
                "resume" => resume_text.trim().to_string(),
                _ => output_format.clone(),
            })
            .into_owned()
    }
}

fn render_rubric_notes(rubric: &Rubric) -> String {
    rubric
        .entries()
        .iter()
        .map(|entry| {
            format!(
                "{}: {} (Score range: {})",
                entry.name,
                entry.notes,
                entry.range_label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_output_format(rubric: &Rubric) -> String {
    let mut lines = vec!["resume_scores =".to_string()];
    for entry in rubric.entries() {
        lines.push(format!(
            "'{}': <score between {} and {}>,",
            entry.name, entry.min_points, entry.max_points
        ));
        lines.push(format!("justification: <justification for {}>,", entry.name));
    }
    lines.join("\n")
}

const SCORING_TEMPLATE: &str = r#"You are an HR professional. Score the following resume based on the provided job description and rubrics.
SCORING MUST BE BASED ONLY ON RELEVANCE TO THE JOB DESCRIPTION.
Keep the scoring strict on the basis of the rubrics provided, but relevance to the job role is a must.
For each criterion, use the given notes and score within the range provided.

Job Description:
{job}

Rubric Notes:
{rubric}

Resume:
{resume}

Provide a score for each criterion within its respective range.
Your output must be formatted exactly like this:
{format}

Keep the names of the criteria exactly as they appear in the rubric. Do not change their case,
and do not add quotes, marks, underscores or extra spaces of your own beyond the format above."#;
