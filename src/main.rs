//! CLI entry point for `attachsift`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;

use attachsift::batch::{self, ClassifyOptions, EvaluationReport, MessageStatus};
use attachsift::classify::{OpenRouterClient, Outcome};
use attachsift::config::{self, Config};
use attachsift::error::SiftError;
use attachsift::parser::{html, mime};

#[derive(Parser)]
#[command(
    name = "attachsift",
    version,
    about = "Classify email attachments as referenced or decorative, and score the result"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the attachments of every .eml file in a directory
    Classify {
        /// Directory of .eml files (default: paths.input_dir)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Directory for attachments_<n>.json files (default: paths.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Provider API key
        #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        /// Model identifier (overrides config and OPENROUTER_MODEL)
        #[arg(long)]
        model: Option<String>,
    },
    /// Score predicted partitions against ground truth
    Evaluate {
        /// Directory of predicted partitions (default: paths.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Directory of ground-truth partitions (default: paths.ground_truth_dir)
        #[arg(short, long)]
        ground_truth: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Show what extraction finds in one message
    Extract {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Classify {
            input,
            output,
            api_key,
            model,
        } => cmd_classify(&config, input, output, api_key, model),
        Commands::Evaluate {
            output,
            ground_truth,
            json,
        } => cmd_evaluate(&config, output, ground_truth, json),
        Commands::Extract { path, json } => cmd_extract(&path, json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "attachsift.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn progress_bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {label} [{{bar:40.cyan/blue}}] {{pos}}/{{len}}"
            ))
            .expect("valid template")
            .progress_chars("#>-"),
    );
    pb
}

/// Classify every message of the input directory and persist the partitions.
fn cmd_classify(
    config: &Config,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    api_key: Option<String>,
    model: Option<String>,
) -> anyhow::Result<()> {
    let api_key = api_key
        .filter(|k| !k.trim().is_empty())
        .ok_or(SiftError::MissingCredential(config::API_KEY_ENV))?;

    let mut model_config = config.model.clone();
    if let Some(model) = model {
        model_config.model = model;
    }
    let client = OpenRouterClient::new(&model_config, SecretString::from(api_key))?;

    let options = ClassifyOptions {
        input_dir: input.unwrap_or_else(|| config.paths.input_dir.clone()),
        output_dir: output.unwrap_or_else(|| config.paths.output_dir.clone()),
        max_body_chars: config.classify.max_body_chars,
    };

    println!(
        "  Classifying messages in {} with {}",
        options.input_dir.display(),
        client.model()
    );

    let pb = progress_bar("Classifying");
    let start = Instant::now();
    let summary = batch::run_classification(
        &options,
        &client,
        Some(&|current: usize, total: usize| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        }),
    )?;
    pb.finish_and_clear();

    if summary.processed() == 0 {
        println!("  No .eml files found in {}", options.input_dir.display());
        return Ok(());
    }

    println!();
    for record in &summary.records {
        let name = record.file.display();
        match &record.status {
            MessageStatus::Written {
                path,
                included,
                excluded,
                outcome,
            } => {
                let note = match outcome {
                    Outcome::NoAttachments => " (no attachments)".to_string(),
                    Outcome::Classified { warnings } if !warnings.is_empty() => {
                        let suffix = if warnings.len() == 1 { "y" } else { "ies" };
                        format!(" ({} repaired anomal{suffix})", warnings.len())
                    }
                    Outcome::Classified { .. } => String::new(),
                    Outcome::Fallback { kind, .. } => format!(" (fallback: {kind:?} failure)"),
                };
                println!(
                    "  ✓ {name} → {} relevant: {included}, irrelevant: {excluded}{note}",
                    path.display()
                );
            }
            MessageStatus::Failed { reason } => println!("  ✗ {name}: {reason}"),
        }
    }

    let degraded: Vec<_> = summary.degraded().collect();
    let failed: Vec<_> = summary.failed().collect();

    println!();
    println!("  {:<20} {}", "Messages", summary.processed());
    println!("  {:<20} {}", "Written", summary.written());
    println!("  {:<20} {}", "Degraded", degraded.len());
    println!("  {:<20} {}", "Failed", failed.len());
    println!("  {:<20} {:.2?}", "Elapsed", start.elapsed());
    println!();
    println!("  ✓ Processing complete!");

    Ok(())
}

/// Score the predicted partitions against ground truth.
fn cmd_evaluate(
    config: &Config,
    output: Option<PathBuf>,
    ground_truth: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let output_dir = output.unwrap_or_else(|| config.paths.output_dir.clone());
    let truth_dir = ground_truth.unwrap_or_else(|| config.paths.ground_truth_dir.clone());

    let pb = progress_bar("Evaluating");
    let report = batch::run_evaluation(
        &output_dir,
        &truth_dir,
        Some(&|current: usize, total: usize| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        }),
    )?;
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report_table(&report, &truth_dir);
    }
    Ok(())
}

/// Print an evaluation report in the human-readable layout.
fn print_report_table(report: &EvaluationReport, truth_dir: &Path) {
    let found = report.messages.len() + report.unmatched.len() + report.failures.len();
    if found == 0 {
        println!("  No ground truth files found in {}", truth_dir.display());
        return;
    }
    println!("  Found {found} ground truth files");
    println!();

    for path in &report.unmatched {
        println!("  ⚠ {}: No corresponding output file found", file_name(path));
    }
    for failure in &report.failures {
        println!("  ✗ {}: {}", file_name(&failure.ground_truth), failure.reason);
    }

    for m in &report.messages {
        let s = &m.score;
        println!("  {}:", file_name(&m.ground_truth));
        println!("     {:<10} {:.4}", "Accuracy:", s.metrics.accuracy);
        println!("     {:<10} {:.4}", "Precision:", s.metrics.precision);
        println!("     {:<10} {:.4}", "Recall:", s.metrics.recall);
        println!("     {:<10} {:.4}", "F1 Score:", s.metrics.f1_score);
        println!(
            "     TP: {}, TN: {}, FP: {}, FN: {}",
            s.counts.true_positives,
            s.counts.true_negatives,
            s.counts.false_positives,
            s.counts.false_negatives
        );
        if !s.missing.is_empty() {
            println!("     ⚠ Missing: {}", join_ids(&s.missing));
        }
        if !s.extra.is_empty() {
            println!("     ⚠ Extra: {}", join_ids(&s.extra));
        }
        println!();
    }

    if let Some(overall) = &report.overall {
        println!("  {}", "=".repeat(60));
        println!("  OVERALL METRICS ({} messages):", overall.messages);
        println!("  {}", "=".repeat(60));
        println!("  {:<10} {:.4}", "Accuracy:", overall.metrics.accuracy);
        println!("  {:<10} {:.4}", "Precision:", overall.metrics.precision);
        println!("  {:<10} {:.4}", "Recall:", overall.metrics.recall);
        println!("  {:<10} {:.4}", "F1 Score:", overall.metrics.f1_score);
        println!();
        println!(
            "  Total - TP: {}, TN: {}, FP: {}, FN: {}",
            overall.counts.true_positives,
            overall.counts.true_negatives,
            overall.counts.false_positives,
            overall.counts.false_negatives
        );
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn join_ids<'a, I>(ids: I) -> String
where
    I: IntoIterator<Item = &'a attachsift::model::attachment::AttachmentId>,
{
    ids.into_iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Show the body and candidate attachments extraction finds in one message.
fn cmd_extract(path: &Path, json: bool) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let raw = std::fs::read(path).map_err(|e| SiftError::io(path, e))?;
    let message = mime::extract(&raw);
    let normalized = html::normalize(&message.body);

    if json {
        let out = serde_json::json!({
            "file": path.to_string_lossy(),
            "body_bytes": message.body.len(),
            "normalized_chars": normalized.chars().count(),
            "attachments": message.attachment_list(),
            "body": normalized,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    use humansize::{format_size, BINARY};
    let preview: String = normalized.chars().take(300).collect();

    println!();
    println!("  {:<15} {}", "File", path.display());
    println!(
        "  {:<15} {}",
        "HTML body",
        if message.has_body() {
            format_size(message.body.len() as u64, BINARY)
        } else {
            "none".to_string()
        }
    );
    println!("  {:<15} {}", "Attachments", message.attachments.len());
    for id in &message.attachments {
        println!("    {id}");
    }
    if !preview.is_empty() {
        println!();
        println!("  {preview}");
    }
    println!();
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "attachsift", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
