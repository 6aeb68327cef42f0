//! Attachment classification: extraction, prompt, one model call, repair, fallback.
//!
//! A failed model call or an unusable answer never propagates as an error.
//! The message is instead classified with every candidate excluded, and the
//! [`Outcome`] records why.

pub mod answer;
pub mod client;
pub mod prompt;

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::error::{FailureKind, Result};
use crate::model::attachment::AttachmentId;
use crate::model::message::ExtractedMessage;
use crate::model::partition::{Partition, RepairWarning};
use crate::parser::{html, mime};

pub use client::{ModelCaller, OpenRouterClient};

/// How a message's partition came about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No candidate attachments; the model was not called.
    NoAttachments,
    /// The model answered and the answer was repaired into a partition.
    Classified { warnings: Vec<RepairWarning> },
    /// The model call or its answer failed; every candidate is excluded.
    Fallback { kind: FailureKind, reason: String },
}

impl Outcome {
    /// Whether this outcome is a degradation to the conservative fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Partition of one message plus how it was obtained.
#[derive(Debug, Clone)]
pub struct Classification {
    pub partition: Partition,
    pub outcome: Outcome,
}

/// Classify the attachments of a raw message.
pub fn classify(
    raw_message: &[u8],
    caller: &dyn ModelCaller,
    max_body_chars: usize,
) -> Classification {
    let message = mime::extract(raw_message);
    classify_extracted(&message, caller, max_body_chars)
}

/// Classify an already extracted message.
///
/// The model is called exactly once, and only when there is at least one candidate.
pub fn classify_extracted(
    message: &ExtractedMessage,
    caller: &dyn ModelCaller,
    max_body_chars: usize,
) -> Classification {
    if message.attachments.is_empty() {
        return Classification {
            partition: Partition::empty(),
            outcome: Outcome::NoAttachments,
        };
    }

    let body = html::normalize_with_limit(&message.body, max_body_chars);
    let prompt = prompt::build_prompt(&message.attachment_list(), &body);

    resolve(caller.call(&prompt), &message.attachments)
}

/// Turn the model's result into a partition of `universe`.
///
/// Pure: transport errors and unparseable answers both yield
/// [`Partition::all_excluded`] with the failure recorded in the outcome.
pub fn resolve(reply: Result<String>, universe: &BTreeSet<AttachmentId>) -> Classification {
    let parsed = reply.and_then(|text| {
        answer::parse_answer(&text).inspect_err(|_| {
            warn!(answer = %text.chars().take(500).collect::<String>(), "Unparseable model answer");
        })
    });

    match parsed {
        Ok(raw) => {
            let repaired = Partition::repair(&raw, universe);
            info!(
                included = repaired.partition.included().len(),
                excluded = repaired.partition.excluded().len(),
                anomalies = repaired.warnings.len(),
                "Classified attachments"
            );
            Classification {
                partition: repaired.partition,
                outcome: Outcome::Classified {
                    warnings: repaired.warnings,
                },
            }
        }
        Err(e) => {
            let kind = e.failure_kind();
            warn!(
                kind = ?kind,
                error = %e,
                "Classification failed, marking all attachments irrelevant"
            );
            Classification {
                partition: Partition::all_excluded(universe),
                outcome: Outcome::Fallback {
                    kind,
                    reason: e.to_string(),
                },
            }
        }
    }
}
