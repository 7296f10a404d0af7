use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use screener::config::Config;
use screener::llm_client::{AnthropicBackend, InferenceClient, MODEL};
use screener::models::CandidateRecord;
use screener::report::{export_with_fallback, DelimitedReportSink, JsonReportSink};
use screener::stage::{ProgressKind, ProgressReporter};
use screener::{Pipeline, RunReport, Services};

const USAGE: &str = "usage: screener <cv file or directory> <job description file> [output dir]";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting screener v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 || args.len() > 3 {
        bail!(USAGE);
    }
    let cv_path = PathBuf::from(&args[0]);
    let jd_path = PathBuf::from(&args[1]);
    let out_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("reports"));

    let job_description = tokio::fs::read_to_string(&jd_path)
        .await
        .with_context(|| format!("Could not read job description {}", jd_path.display()))?;
    if job_description.trim().is_empty() {
        bail!("Job description {} is empty", jd_path.display());
    }

    // Initialize LLM client
    let backend = Arc::new(AnthropicBackend::new(config.anthropic_api_key.clone()));
    let client = InferenceClient::new(backend, config.pipeline.client_policy());
    info!("LLM client initialized (model: {MODEL})");

    let (progress, mut events) = ProgressReporter::channel();
    let progress_log = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event.kind {
                ProgressKind::ItemCompleted => debug!(
                    "[{}] {}/{} done",
                    event.stage, event.completed, event.total
                ),
                kind => debug!("{kind:?} {}", event.stage),
            }
        }
    });

    let mut pipeline = Pipeline::new(Services::llm(client), config.pipeline.clone(), progress);
    let result = pipeline.run_path(&cv_path, job_description.trim()).await;
    drop(pipeline);
    let _ = progress_log.await;
    let report = result?;

    print_ranking(&report);

    let outcome = export_with_fallback(
        &JsonReportSink,
        &DelimitedReportSink,
        &report.records,
        &out_dir,
    );
    match (outcome.path(), outcome.warning()) {
        (Some(path), None) => println!("\nReport written to {}", path.display()),
        (Some(path), Some(warning)) => {
            println!("\nReport written to {} ({warning})", path.display())
        }
        (None, warning) => warn!("{}", warning.unwrap_or("report not written")),
    }

    Ok(())
}

fn print_ranking(report: &RunReport) {
    println!(
        "\n{:>4}  {:>6}  {:<28}  {:<32}  status",
        "rank", "score", "candidate", "file"
    );
    for (i, record) in report.records.iter().enumerate() {
        println!(
            "{:>4}  {:>6}  {:<28}  {:<32}  {}",
            i + 1,
            score_cell(record),
            truncate(candidate_name(record), 28),
            truncate(&record.file_name, 32),
            record.status_label()
        );
    }
    println!(
        "\n{} candidate(s), {} rated, {} judging fallback(s), {:.1}s",
        report.records.len(),
        report.rated(),
        report.fallbacks(),
        report.elapsed.as_secs_f64()
    );
}

fn score_cell(record: &CandidateRecord) -> String {
    record
        .final_rating()
        .score()
        .map(|s| format!("{s:.2}"))
        .unwrap_or_else(|| "n/a".to_string())
}

fn candidate_name(record: &CandidateRecord) -> &str {
    record
        .profile
        .as_ref()
        .map(|p| p.display_name())
        .unwrap_or("(not extracted)")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
