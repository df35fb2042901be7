//! CLI interface for the resume ranker

use crate::config::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "resume-ranker")]
#[command(about = "Rubric-based resume scoring and ranking")]
#[command(long_about = "Score a folder of resumes against a job description and a weighted CSV rubric using a hosted LLM, then rank the candidates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score and rank every resume in a directory
    Rank {
        /// Directory containing resumes (PDF, TXT, MD)
        #[arg(short, long)]
        resumes: PathBuf,

        /// Path to job description file (PDF, TXT, MD)
        #[arg(short, long)]
        job: PathBuf,

        /// Path to the rubric CSV (Criteria, Points, Notes, Weightage)
        #[arg(short = 'b', long)]
        rubric: PathBuf,

        /// Model to request from the completion service
        #[arg(short, long)]
        model: Option<String>,

        /// Output format: console, json, markdown, html
        #[arg(short, long)]
        output: Option<String>,

        /// Save output to file
        #[arg(short, long)]
        save: Option<PathBuf>,

        /// Progress display
        #[arg(short, long, value_enum, default_value_t = ProgressMode::Bar)]
        progress: ProgressMode,

        /// Delete each resume once it has been scored
        #[arg(long)]
        remove_processed: bool,

        /// Show per-criterion scores and justifications
        #[arg(short, long)]
        detailed: bool,
    },

    /// Validate a rubric CSV and print its criteria
    Rubric {
        /// Path to the rubric CSV
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Print the scoring prompt for one resume without calling the model
    Prompt {
        /// Path to resume file
        #[arg(short, long)]
        resume: PathBuf,

        /// Path to job description file
        #[arg(short, long)]
        job: PathBuf,

        /// Path to the rubric CSV
        #[arg(short = 'b', long)]
        rubric: PathBuf,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file location
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProgressMode {
    /// Progress bar
    Bar,
    /// One line per processed candidate
    Lines,
}

/// Parse and validate output format
pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" => Ok(OutputFormat::Console),
        "json" => Ok(OutputFormat::Json),
        "markdown" | "md" => Ok(OutputFormat::Markdown),
        "html" => Ok(OutputFormat::Html),
        _ => Err(format!(
            "Invalid output format: {}. Supported: console, json, markdown, html",
            format
        )),
    }
}

/// Validate file extension
pub fn validate_file_extension(path: &Path, allowed_extensions: &[&str]) -> Result<(), String> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            if allowed_extensions.contains(&ext.to_lowercase().as_str()) {
                Ok(())
            } else {
                Err(format!(
                    "Unsupported file extension: .{}. Allowed: {}",
                    ext,
                    allowed_extensions.join(", ")
                ))
            }
        }
        None => Err("File has no extension".to_string()),
    }
}
