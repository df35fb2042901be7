//! Resume ranker: rubric-based resume scoring and ranking

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use resume_ranker::cli::{self, Cli, Commands, ConfigAction, ProgressMode};
use resume_ranker::config::Config;
use resume_ranker::error::{RankerError, Result};
use resume_ranker::input::{
    collect_documents, Candidate, CandidateDocument, CleanupPolicy, DocumentSource,
    FileDocumentSource, InputManager,
};
use resume_ranker::llm::{ChatCompletionClient, PromptTemplates, ScoringModel};
use resume_ranker::output::{
    save_report_to_file, suggest_filename, RankingReport, ReportGenerator, ReportMetadata,
};
use resume_ranker::processing::{BatchEvent, BatchOrchestrator, BatchRun, RankedResult, RetryPolicy};
use resume_ranker::rubric::{Rubric, RubricLoader};
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = match Config::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, &config_path).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, config: Config, config_path: &Path) -> Result<()> {
    match command {
        Commands::Rank {
            resumes,
            job,
            rubric,
            model,
            output,
            save,
            progress,
            remove_processed,
            detailed,
        } => {
            let output_format = match output {
                Some(output) => cli::parse_output_format(&output).map_err(RankerError::InvalidInput)?,
                None => config.output.format,
            };

            println!("🚀 Resume ranking");
            println!("📂 Resumes: {}", resumes.display());
            println!("💼 Job Description: {}", job.display());
            println!("📋 Rubric: {}", rubric.display());

            let rubric_set = Arc::new(load_rubric(&rubric, &config)?);
            println!("✅ Rubric loaded: {} criteria", rubric_set.len());
            if (rubric_set.total_weight() - 100.0).abs() > 1e-6 {
                println!(
                    "⚠️  Weights sum to {:.2}; totals are out of {:.2}",
                    rubric_set.total_weight(),
                    rubric_set.total_weight()
                );
            }

            let job_text = InputManager::new().extract_text(&job).await?;
            if job_text.trim().is_empty() {
                return Err(RankerError::InvalidInput(format!(
                    "Job description {} contains no text",
                    job.display()
                )));
            }

            let documents = collect_documents(&resumes)?;
            if documents.is_empty() {
                println!("⚠️  No resumes found in {}", resumes.display());
            } else {
                println!("📄 Found {} resumes", documents.len());
            }

            let mut llm_config = config.llm.clone();
            if let Some(model) = model {
                llm_config.model = model;
            }
            let scorer: Arc<dyn ScoringModel> = Arc::new(ChatCompletionClient::from_env(&llm_config)?);
            println!("🤖 Model: {}", llm_config.model);

            let cleanup = if remove_processed || config.processing.remove_processed {
                println!("🗑️  Resumes will be removed after scoring");
                CleanupPolicy::RemoveAfterScoring
            } else {
                CleanupPolicy::Keep
            };

            let orchestrator = BatchOrchestrator::new(Arc::new(FileDocumentSource::new(cleanup)))
                .with_retry_policy(RetryPolicy::from_config(&llm_config))
                .with_channel_capacity(config.processing.channel_capacity);

            println!("\n🔄 Scoring candidates...");
            let start = Instant::now();
            let ranking = consume_run(
                orchestrator.run(documents, &job_text, Arc::clone(&rubric_set), scorer),
                progress,
            )
            .await?;
            let elapsed = start.elapsed().as_millis() as u64;
            info!("Batch finished in {}ms", elapsed);

            let needs_review = ranking.needs_review().count();
            println!("\n✅ Ranked {} candidates in {:.1}s", ranking.len(), elapsed as f64 / 1000.0);
            if needs_review > 0 {
                println!("⚠️  {} candidates need manual review", needs_review);
            }

            let report = RankingReport::build(
                ranking,
                &rubric_set,
                ReportMetadata::new(
                    &llm_config.model,
                    &job.display().to_string(),
                    &rubric.display().to_string(),
                    &resumes.display().to_string(),
                    elapsed,
                ),
            );

            let detailed = detailed || config.output.show_justifications;
            let generator =
                ReportGenerator::with_options(config.output.color_output, detailed, true, true, true);
            println!("{}", generator.generate_report(&report, &output_format)?);

            if let Some(save) = save {
                let path = if save.is_dir() {
                    save.join(suggest_filename(&output_format, &job.to_string_lossy(), true))
                } else {
                    save
                };
                let plain = ReportGenerator::with_options(false, detailed, true, true, true);
                save_report_to_file(&plain.generate_report(&report, &output_format)?, &path)?;
                println!("💾 Report saved to {}", path.display());
            }
        }

        Commands::Rubric { path } => {
            let rubric = load_rubric(&path, &config)?;
            println!("📋 Rubric: {}", path.display());
            println!("\n{} criteria:", rubric.len());
            for entry in rubric.entries() {
                println!(
                    "  • {} (range {}, weight {}){}",
                    entry.name,
                    entry.range_label(),
                    entry.weight,
                    if entry.notes.is_empty() {
                        String::new()
                    } else {
                        format!(": {}", entry.notes)
                    }
                );
            }
            if let Some(excluded) = rubric.excluded() {
                println!("\nℹ️  Excluded row '{}' ({})", excluded.name, excluded.points);
            }
            println!("\n📊 Total weight: {:.2}", rubric.total_weight());
            if (rubric.total_weight() - 100.0).abs() > 1e-6 {
                println!("⚠️  Weights do not sum to 100; totals will be out of {:.2}", rubric.total_weight());
            }
        }

        Commands::Prompt { resume, job, rubric } => {
            let rubric = load_rubric(&rubric, &config)?;
            let job_text = InputManager::new().extract_text(&job).await?;

            let document = CandidateDocument::from_path(resume.clone());
            let pages = FileDocumentSource::new(CleanupPolicy::Keep)
                .read_pages(&document)
                .await?;
            let candidate = Candidate::from_pages(document.identifier, &pages);
            info!(
                "Rendering prompt for {} (contact: {})",
                candidate.source_identifier, candidate.contact_identifier
            );

            println!(
                "{}",
                PromptTemplates::default().render_scoring(&job_text, &rubric, &candidate.raw_text)
            );
        }

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                println!("⚙️  Current Configuration\n");
                println!("Endpoint: {}", config.llm.base_url);
                println!("Model: {}", config.llm.model);
                println!("Temperature: {}", config.llm.temperature);
                println!("API key variable: {}", config.llm.api_key_env);
                println!(
                    "Timeout: {}s, attempts: {}, initial backoff: {}ms",
                    config.llm.timeout_secs, config.llm.max_attempts, config.llm.initial_backoff_ms
                );
                println!("Excluded rubric row: {}", config.rubric.excluded_criterion);
                println!("Require weights to sum to 100: {}", config.rubric.require_weights_sum_to_100);
                println!("Remove processed resumes: {}", config.processing.remove_processed);
                println!("Output format: {:?}", config.output.format);
                println!("\nConfig file: {}", config_path.display());
            }
            Some(ConfigAction::Reset) => {
                println!("🔄 Resetting configuration to defaults...");
                Config::default().save_to(config_path)?;
                println!("✅ Configuration reset successfully!");
            }
            Some(ConfigAction::Path) => {
                println!("{}", config_path.display());
            }
        },
    }

    Ok(())
}

fn load_rubric(path: &Path, config: &Config) -> Result<Rubric> {
    cli::validate_file_extension(path, &["csv"])
        .map_err(|e| RankerError::InvalidInput(format!("Rubric file: {}", e)))?;

    RubricLoader::new()
        .with_excluded_criterion(config.rubric.excluded_criterion.clone())
        .with_weight_sum_check(config.rubric.require_weights_sum_to_100)
        .load_path(path)
}

async fn consume_run(run: BatchRun, mode: ProgressMode) -> Result<RankedResult> {
    match mode {
        ProgressMode::Lines => {
            run.into_ranking_with(|progress| {
                println!("{}", BatchEvent::Progress(progress.clone()))
            })
            .await
        }
        ProgressMode::Bar => {
            let bar = ProgressBar::new(0);
            match ProgressStyle::with_template("{spinner} [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
                Ok(style) => bar.set_style(style.progress_chars("█▓░")),
                Err(e) => warn!("Falling back to the default progress style: {}", e),
            }

            let result = run
                .into_ranking_with(|progress| {
                    bar.set_length(progress.total as u64);
                    bar.set_position(progress.index as u64);
                    bar.set_message(progress.candidate.clone());
                })
                .await;
            bar.finish_and_clear();
            result
        }
    }
}
