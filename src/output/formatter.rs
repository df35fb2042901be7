//! Output formatters for ranking reports

use crate::config::OutputFormat;
use crate::error::{RankerError, Result};
use crate::output::report::RankingReport;
use crate::processing::{RankedCandidate, ScoreStatus};
use askama::Template;
use colored::{Color, Colorize};
use std::path::Path;

pub trait OutputFormatter {
    fn format_report(&self, report: &RankingReport) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Console formatter with colors and optional per-criterion detail
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
}

pub struct JsonFormatter {
    pretty: bool,
}

pub struct MarkdownFormatter {
    include_metadata: bool,
}

pub struct HtmlFormatter {
    include_styles: bool,
}

/// Report generator that coordinates different formatters
pub struct ReportGenerator {
    console_formatter: ConsoleFormatter,
    json_formatter: JsonFormatter,
    markdown_formatter: MarkdownFormatter,
    html_formatter: HtmlFormatter,
}

#[derive(Template)]
#[template(source = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Candidate Ranking</title>
    {% if include_styles %}
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 1000px;
            margin: 0 auto;
            padding: 20px;
            background: #f8f9fa;
        }
        .container {
            background: white;
            padding: 30px;
            border-radius: 8px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.1);
        }
        .header {
            text-align: center;
            margin-bottom: 30px;
            border-bottom: 3px solid #007acc;
            padding-bottom: 20px;
        }
        table { width: 100%; border-collapse: collapse; margin: 20px 0; }
        th, td { padding: 8px 10px; border-bottom: 1px solid #e9ecef; text-align: left; }
        th { color: #007acc; }
        .status-review { color: #dc3545; font-weight: bold; }
        .status-partial { color: #b58900; }
        .status-scored { color: #28a745; }
        .justification { color: #6c757d; font-size: 0.9em; }
        .metadata {
            background: #e9ecef;
            padding: 15px;
            border-radius: 6px;
            font-size: 0.9em;
        }
    </style>
    {% endif %}
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>Candidate Ranking</h1>
            <p>{{ candidate_count }} candidates scored out of {{ max_possible }}</p>
            {% if !weights_note.is_empty() %}<p>{{ weights_note }}</p>{% endif %}
        </div>

        <div class="section">
            <h2>Ranking</h2>
            <table>
                <tr>
                    <th>#</th><th>Candidate</th><th>Email</th><th>Score</th>
                    {% for name in criterion_names %}<th>{{ name }}</th>{% endfor %}
                    <th>Status</th>
                </tr>
                {% for row in rows %}
                <tr>
                    <td>{{ row.rank }}</td>
                    <td>{{ row.identifier }}</td>
                    <td>{{ row.contact }}</td>
                    <td><strong>{{ row.total }}</strong></td>
                    {% for raw in row.raw_scores %}<td>{{ raw }}</td>{% endfor %}
                    <td class="{{ row.status_class }}">{{ row.status }}</td>
                </tr>
                {% for note in row.notes %}
                <tr><td></td><td colspan="{{ note_span }}" class="justification">{{ note }}</td></tr>
                {% endfor %}
                {% endfor %}
            </table>
        </div>

        <div class="section">
            <h2>Rubric</h2>
            <table>
                <tr><th>Criterion</th><th>Range</th><th>Weight</th><th>Average</th><th>Notes</th></tr>
                {% for criterion in criteria %}
                <tr>
                    <td>{{ criterion.name }}</td>
                    <td>{{ criterion.range }}</td>
                    <td>{{ criterion.weight }}</td>
                    <td>{{ criterion.average }}</td>
                    <td>{{ criterion.notes }}</td>
                </tr>
                {% endfor %}
            </table>
        </div>

        <div class="metadata">
            <p><strong>Generated by Resume Ranker v{{ version }}</strong> at {{ generated_at }}</p>
            <p><strong>Model:</strong> {{ model }} | <strong>Processing time:</strong> {{ processing_time }}ms</p>
            <p><strong>Job:</strong> {{ job_file }} | <strong>Rubric:</strong> {{ rubric_file }}</p>
        </div>
    </div>
</body>
</html>"#, ext = "html")]
struct HtmlTemplate {
    include_styles: bool,
    candidate_count: usize,
    max_possible: String,
    weights_note: String,
    criterion_names: Vec<String>,
    rows: Vec<HtmlRow>,
    note_span: usize,
    criteria: Vec<HtmlCriterion>,
    version: String,
    generated_at: String,
    model: String,
    processing_time: u64,
    job_file: String,
    rubric_file: String,
}

#[derive(Debug, Clone)]
struct HtmlRow {
    rank: usize,
    identifier: String,
    contact: String,
    total: String,
    raw_scores: Vec<String>,
    status: String,
    status_class: String,
    notes: Vec<String>,
}

#[derive(Debug, Clone)]
struct HtmlCriterion {
    name: String,
    range: String,
    weight: String,
    average: String,
    notes: String,
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn weights_note(report: &RankingReport) -> String {
    if report.summary.weights_sum_to_100 {
        String::new()
    } else {
        format!(
            "Rubric weights sum to {}, so totals are out of {} rather than 100.",
            format_number(report.summary.max_possible),
            format_number(report.summary.max_possible)
        )
    }
}

/// Criterion lines for one candidate, in rubric order.
fn criterion_lines(report: &RankingReport, candidate: &RankedCandidate) -> Vec<(String, String, Option<String>)> {
    report
        .criteria
        .iter()
        .map(|criterion| {
            let raw = candidate
                .per_criterion_raw
                .get(&criterion.name)
                .map(|raw| format_number(*raw))
                .unwrap_or_else(|| "-".to_string());
            (
                criterion.name.clone(),
                format!("{}/{}", raw, criterion.range),
                candidate.justifications.get(&criterion.name).cloned(),
            )
        })
        .collect()
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self { use_colors, detailed }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let prefix = match level {
            1 => "█",
            2 => "▓",
            _ => "▒",
        };

        let color = match level {
            1 => Color::Blue,
            2 => Color::Green,
            _ => Color::Yellow,
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    fn format_score_badge(&self, percentage: f64) -> String {
        let (badge, color) = match percentage.round() as i64 {
            80..=i64::MAX => ("STRONG", Color::Green),
            60..=79 => ("GOOD", Color::BrightGreen),
            40..=59 => ("FAIR", Color::Yellow),
            _ => ("WEAK", Color::Red),
        };

        if self.use_colors {
            format!("[{}]", badge.color(color).bold())
        } else {
            format!("[{}]", badge)
        }
    }

    fn format_status(&self, status: ScoreStatus) -> String {
        let color = match status {
            ScoreStatus::Scored => Color::Green,
            ScoreStatus::Partial => Color::Yellow,
            ScoreStatus::NeedsReview => Color::Red,
        };
        self.colorize(status.label(), color)
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &RankingReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header("🏆 CANDIDATE RANKING", 1));
        output.push_str(&format!(
            "Generated: {} | Model: {} | Processing time: {}ms\n",
            report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            report.metadata.model,
            report.metadata.processing_time_ms
        ));

        output.push_str(&self.format_header("Summary", 2));
        output.push_str(&format!(
            "Candidates: {} ({} scored, {} partial, {} needing review)\n",
            report.summary.candidate_count,
            report.summary.scored_count,
            report.summary.partial_count,
            report.summary.needs_review_count
        ));
        if let (Some(top), Some(score)) = (&report.summary.top_candidate, report.summary.top_score) {
            output.push_str(&format!(
                "Top candidate: {} with {} / {}\n",
                self.colorize(top, Color::Cyan),
                format_number(score),
                format_number(report.summary.max_possible)
            ));
        }
        let note = weights_note(report);
        if !note.is_empty() {
            output.push_str(&format!("{}\n", self.colorize(&note, Color::Yellow)));
        }

        output.push_str(&self.format_header("Ranking", 2));
        for candidate in &report.ranking.candidates {
            output.push_str(&format!(
                "{:>3}. {:<32} {:>7} {} {} ({})\n",
                candidate.rank,
                candidate.identifier,
                format!("{:.2}", candidate.total_weighted),
                self.format_score_badge(report.percentage(candidate.total_weighted)),
                candidate.contact,
                self.format_status(candidate.status)
            ));

            if self.detailed {
                for (name, score, justification) in criterion_lines(report, candidate) {
                    output.push_str(&format!("       • {}: {}\n", name, score));
                    if let Some(justification) = justification {
                        output.push_str(&format!("         {}\n", self.colorize(&justification, Color::BrightBlack)));
                    }
                }
                for issue in &candidate.issues {
                    output.push_str(&format!("       ⚠️  {}\n", issue));
                }
            }
        }

        if self.detailed {
            output.push_str(&self.format_header("Rubric", 3));
            for criterion in &report.criteria {
                output.push_str(&format!(
                    "• {} (range {}, weight {}): average {}\n",
                    criterion.name,
                    criterion.range,
                    format_number(criterion.weight),
                    criterion
                        .average_raw
                        .map(|avg| format!("{:.2}", avg))
                        .unwrap_or_else(|| "-".to_string())
                ));
            }
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &RankingReport) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        Ok(json)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

impl HtmlFormatter {
    pub fn new(include_styles: bool) -> Self {
        Self { include_styles }
    }

    fn create_template_data(&self, report: &RankingReport) -> HtmlTemplate {
        let criterion_names: Vec<String> = report.criteria.iter().map(|c| c.name.clone()).collect();

        let rows = report
            .ranking
            .candidates
            .iter()
            .map(|candidate| {
                let lines = criterion_lines(report, candidate);
                let raw_scores = lines.iter().map(|(_, score, _)| score.clone()).collect();
                let mut notes: Vec<String> = lines
                    .into_iter()
                    .filter_map(|(name, _, justification)| {
                        justification.map(|text| format!("{}: {}", name, text))
                    })
                    .collect();
                notes.extend(candidate.issues.iter().cloned());

                let status_class = match candidate.status {
                    ScoreStatus::Scored => "status-scored",
                    ScoreStatus::Partial => "status-partial",
                    ScoreStatus::NeedsReview => "status-review",
                };

                HtmlRow {
                    rank: candidate.rank,
                    identifier: candidate.identifier.clone(),
                    contact: candidate.contact.clone(),
                    total: format!("{:.2}", candidate.total_weighted),
                    raw_scores,
                    status: candidate.status.label().to_string(),
                    status_class: status_class.to_string(),
                    notes,
                }
            })
            .collect();

        let criteria = report
            .criteria
            .iter()
            .map(|criterion| HtmlCriterion {
                name: criterion.name.clone(),
                range: criterion.range.clone(),
                weight: format_number(criterion.weight),
                average: criterion
                    .average_raw
                    .map(|avg| format!("{:.2}", avg))
                    .unwrap_or_else(|| "-".to_string()),
                notes: criterion.notes.clone(),
            })
            .collect();

        HtmlTemplate {
            include_styles: self.include_styles,
            candidate_count: report.summary.candidate_count,
            max_possible: format_number(report.summary.max_possible),
            weights_note: weights_note(report),
            note_span: criterion_names.len() + 4,
            criterion_names,
            rows,
            criteria,
            version: report.metadata.ranker_version.clone(),
            generated_at: report
                .metadata
                .generated_at
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
            model: report.metadata.model.clone(),
            processing_time: report.metadata.processing_time_ms,
            job_file: report.metadata.job_file.clone(),
            rubric_file: report.metadata.rubric_file.clone(),
        }
    }
}

impl OutputFormatter for HtmlFormatter {
    fn format_report(&self, report: &RankingReport) -> Result<String> {
        self.create_template_data(report)
            .render()
            .map_err(|e| RankerError::OutputFormatting(e.to_string()))
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Html
    }
}

impl MarkdownFormatter {
    pub fn new(include_metadata: bool) -> Self {
        Self { include_metadata }
    }

    fn escape_cell(text: &str) -> String {
        text.replace('|', "\\|").replace('\n', " ")
    }
}

impl OutputFormatter for MarkdownFormatter {
    fn format_report(&self, report: &RankingReport) -> Result<String> {
        let mut output = String::new();

        output.push_str("# 🏆 Candidate Ranking\n\n");

        if self.include_metadata {
            output.push_str(&format!(
                "**Generated:** {} | **Model:** {} | **Processing Time:** {}ms\n",
                report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
                report.metadata.model,
                report.metadata.processing_time_ms
            ));
            output.push_str(&format!(
                "**Job:** `{}` | **Rubric:** `{}`\n\n",
                report.metadata.job_file, report.metadata.rubric_file
            ));
        }

        output.push_str("## Summary\n\n");
        output.push_str(&format!(
            "- **Candidates:** {}\n- **Needing review:** {}\n- **Maximum possible score:** {}\n",
            report.summary.candidate_count,
            report.summary.needs_review_count,
            format_number(report.summary.max_possible)
        ));
        let note = weights_note(report);
        if !note.is_empty() {
            output.push_str(&format!("\n> {}\n", note));
        }

        output.push_str("\n## Ranking\n\n");
        let mut header = "| # | Candidate | Email | Score |".to_string();
        let mut divider = "|---|---|---|---|".to_string();
        for criterion in &report.criteria {
            header.push_str(&format!(" {} |", Self::escape_cell(&criterion.name)));
            divider.push_str("---|");
        }
        header.push_str(" Status |");
        divider.push_str("---|");
        output.push_str(&format!("{}\n{}\n", header, divider));

        for candidate in &report.ranking.candidates {
            let mut row = format!(
                "| {} | {} | {} | {:.2} |",
                candidate.rank,
                Self::escape_cell(&candidate.identifier),
                Self::escape_cell(&candidate.contact),
                candidate.total_weighted
            );
            for (_, score, _) in criterion_lines(report, candidate) {
                row.push_str(&format!(" {} |", score));
            }
            row.push_str(&format!(" {} |", candidate.status.label()));
            output.push_str(&format!("{}\n", row));
        }

        let annotated: Vec<&RankedCandidate> = report
            .ranking
            .candidates
            .iter()
            .filter(|c| !c.justifications.is_empty() || !c.issues.is_empty())
            .collect();
        if !annotated.is_empty() {
            output.push_str("\n## Justifications\n");
            for candidate in annotated {
                output.push_str(&format!("\n### {}. {}\n\n", candidate.rank, candidate.identifier));
                for (name, _, justification) in criterion_lines(report, candidate) {
                    if let Some(justification) = justification {
                        output.push_str(&format!("- **{}:** {}\n", name, justification));
                    }
                }
                for issue in &candidate.issues {
                    output.push_str(&format!("- ⚠️ {}\n", issue));
                }
            }
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self::with_options(true, false, true, true, true)
    }

    pub fn with_options(
        use_colors: bool,
        detailed: bool,
        pretty_json: bool,
        include_metadata: bool,
        include_html_styles: bool,
    ) -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(use_colors, detailed),
            json_formatter: JsonFormatter::new(pretty_json),
            markdown_formatter: MarkdownFormatter::new(include_metadata),
            html_formatter: HtmlFormatter::new(include_html_styles),
        }
    }

    pub fn generate_report(&self, report: &RankingReport, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Console => self.console_formatter.format_report(report),
            OutputFormat::Json => self.json_formatter.format_report(report),
            OutputFormat::Markdown => self.markdown_formatter.format_report(report),
            OutputFormat::Html => self.html_formatter.format_report(report),
        }
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn save_report_to_file(content: &str, file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file_path, content)?;
    Ok(())
}

pub fn suggest_filename(format: &OutputFormat, job_name: &str, timestamp: bool) -> String {
    let base_name = Path::new(job_name)
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();

    let timestamp_suffix = if timestamp {
        format!("_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
    } else {
        String::new()
    };

    match format {
        OutputFormat::Console => format!("{}_ranking{}.txt", base_name, timestamp_suffix),
        OutputFormat::Json => format!("{}_ranking{}.json", base_name, timestamp_suffix),
        OutputFormat::Markdown => format!("{}_ranking{}.md", base_name, timestamp_suffix),
        OutputFormat::Html => format!("{}_ranking{}.html", base_name, timestamp_suffix),
    }
}
