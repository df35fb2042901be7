//! Report building and rendering

pub mod formatter;
pub mod report;

pub use formatter::{
    save_report_to_file, suggest_filename, ConsoleFormatter, HtmlFormatter, JsonFormatter,
    MarkdownFormatter, OutputFormatter, ReportGenerator,
};
pub use report::{CriterionSummary, RankingReport, RankingSummary, ReportMetadata};
