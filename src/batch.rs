//! Batch drivers: classify a directory of messages, evaluate a directory of predictions.
//!
//! Per-message problems are recorded and the batch moves on. Only missing
//! directories abort a run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::classify::{self, ModelCaller, Outcome};
use crate::error::SiftError;
use crate::eval::{self, Aggregator, Overall, Score};
use crate::parser::mime;
use crate::store;

/// Settings for a classification run.
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_body_chars: usize,
}

/// What happened to one input message.
#[derive(Debug, Clone)]
pub enum MessageStatus {
    /// A partition was written (possibly the fallback one).
    Written {
        path: PathBuf,
        included: usize,
        excluded: usize,
        outcome: Outcome,
    },
    /// Nothing was written.
    Failed { reason: String },
}

/// Per-message record of a classification run.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub file: PathBuf,
    pub status: MessageStatus,
}

/// Result of a classification run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub records: Vec<MessageRecord>,
}

impl BatchSummary {
    /// Messages looked at.
    pub fn processed(&self) -> usize {
        self.records.len()
    }

    /// Messages whose partition was written.
    pub fn written(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.status, MessageStatus::Written { .. }))
            .count()
    }

    /// Written messages that fell back to all-excluded.
    pub fn degraded(&self) -> impl Iterator<Item = &MessageRecord> {
        self.records.iter().filter(|r| {
            matches!(&r.status, MessageStatus::Written { outcome, .. } if outcome.is_fallback())
        })
    }

    /// Messages that produced no output.
    pub fn failed(&self) -> impl Iterator<Item = &MessageRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.status, MessageStatus::Failed { .. }))
    }
}

/// Classify every `.eml` file in `options.input_dir`, writing one partition per message.
pub fn run_classification(
    options: &ClassifyOptions,
    caller: &dyn ModelCaller,
    progress: Option<&dyn Fn(usize, usize)>,
) -> anyhow::Result<BatchSummary> {
    let files = match store::list_files(&options.input_dir, "eml") {
        Ok(files) => files,
        Err(SiftError::FileNotFound(dir)) => {
            anyhow::bail!("Input directory {} does not exist", dir.display())
        }
        Err(e) => return Err(e.into()),
    };
    std::fs::create_dir_all(&options.output_dir)
        .map_err(|e| SiftError::io(&options.output_dir, e))?;

    info!(count = files.len(), dir = %options.input_dir.display(), "Classifying messages");

    let mut summary = BatchSummary::default();
    let total = files.len();
    for (i, file) in files.into_iter().enumerate() {
        if let Some(cb) = progress {
            cb(i, total);
        }
        let status = classify_file(&file, options, caller);
        if let MessageStatus::Failed { ref reason } = status {
            warn!(file = %file.display(), reason = %reason, "Message failed");
        }
        summary.records.push(MessageRecord { file, status });
    }
    if let Some(cb) = progress {
        cb(total, total);
    }

    Ok(summary)
}

fn classify_file(
    file: &Path,
    options: &ClassifyOptions,
    caller: &dyn ModelCaller,
) -> MessageStatus {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Some(number) = store::message_number(&name) else {
        return MessageStatus::Failed {
            reason: SiftError::InvalidPath(format!("no message number in '{name}'")).to_string(),
        };
    };

    let raw = match std::fs::read(file) {
        Ok(raw) => raw,
        Err(e) => {
            return MessageStatus::Failed {
                reason: SiftError::io(file, e).to_string(),
            }
        }
    };

    let message = mime::extract(&raw);
    if !message.has_body() {
        warn!(file = %name, "No HTML body found");
    }
    if message.attachments.is_empty() {
        warn!(file = %name, "No attachments found");
    } else {
        let names: Vec<&str> = message.attachments.iter().map(|a| a.as_str()).collect();
        info!(
            file = %name,
            count = names.len(),
            attachments = %names.join(", "),
            "Found attachments"
        );
    }

    let classification = classify::classify_extracted(&message, caller, options.max_body_chars);
    match store::write_partition(&options.output_dir, &number, &classification.partition) {
        Ok(path) => MessageStatus::Written {
            path,
            included: classification.partition.included().len(),
            excluded: classification.partition.excluded().len(),
            outcome: classification.outcome,
        },
        Err(e) => MessageStatus::Failed {
            reason: e.to_string(),
        },
    }
}

/// Score of one message in an evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct MessageEvaluation {
    pub ground_truth: PathBuf,
    pub number: String,
    #[serde(flatten)]
    pub score: Score,
}

/// A ground-truth file that could not be evaluated.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationFailure {
    pub ground_truth: PathBuf,
    pub reason: String,
}

/// Result of an evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    pub messages: Vec<MessageEvaluation>,
    /// Ground-truth files without a matching prediction.
    pub unmatched: Vec<PathBuf>,
    pub failures: Vec<EvaluationFailure>,
    /// `None` when no message could be scored.
    pub overall: Option<Overall>,
}

/// Score every ground-truth partition in `ground_truth_dir` against its
/// counterpart in `output_dir`.
pub fn run_evaluation(
    output_dir: &Path,
    ground_truth_dir: &Path,
    progress: Option<&dyn Fn(usize, usize)>,
) -> anyhow::Result<EvaluationReport> {
    if !output_dir.is_dir() {
        anyhow::bail!("Output directory {} does not exist", output_dir.display());
    }
    if !ground_truth_dir.is_dir() {
        anyhow::bail!(
            "Ground truth directory {} does not exist",
            ground_truth_dir.display()
        );
    }

    let truth_files = store::list_files(ground_truth_dir, "json")?;
    info!(count = truth_files.len(), "Evaluating against ground truth");

    let mut aggregator = Aggregator::new();
    let mut messages = Vec::new();
    let mut unmatched = Vec::new();
    let mut failures = Vec::new();
    let total = truth_files.len();

    for (i, truth_path) in truth_files.into_iter().enumerate() {
        if let Some(cb) = progress {
            cb(i, total);
        }
        let Some(number) = store::partition_number(&truth_path) else {
            failures.push(EvaluationFailure {
                ground_truth: truth_path,
                reason: "file name is not valid UTF-8".into(),
            });
            continue;
        };

        let predicted_path = store::partition_path(output_dir, &number);
        if !predicted_path.exists() {
            warn!(ground_truth = %truth_path.display(), "No corresponding output file found");
            unmatched.push(truth_path);
            continue;
        }

        let scored = store::read_partition(&truth_path).and_then(|truth| {
            store::read_partition(&predicted_path).map(|predicted| eval::score(&predicted, &truth))
        });
        match scored {
            Ok(score) => {
                aggregator.accumulate(score.counts);
                messages.push(MessageEvaluation {
                    ground_truth: truth_path,
                    number,
                    score,
                });
            }
            Err(e) => {
                warn!(ground_truth = %truth_path.display(), error = %e, "Could not evaluate");
                failures.push(EvaluationFailure {
                    ground_truth: truth_path,
                    reason: e.to_string(),
                });
            }
        }
    }
    if let Some(cb) = progress {
        cb(total, total);
    }

    let overall = (aggregator.messages() > 0).then(|| aggregator.finish());
    Ok(EvaluationReport {
        generated_at: Utc::now(),
        messages,
        unmatched,
        failures,
        overall,
    })
}
