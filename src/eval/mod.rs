//! Scoring predicted partitions against ground truth.
//!
//! "Included" is the positive class. Per-message scores can be summed with an
//! [`Aggregator`]; overall metrics are computed from the summed counts, never
//! by averaging per-message metrics.

use std::collections::BTreeSet;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::Serialize;

use crate::model::attachment::AttachmentId;
use crate::model::partition::Partition;

/// The four outcome tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionCounts {
    pub true_positives: u64,
    pub true_negatives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
}

/// Standard ratios derived from [`ConfusionCounts`]. A ratio with a zero
/// denominator is `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Full comparison of one predicted partition with its ground truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    #[serde(flatten)]
    pub counts: ConfusionCounts,
    #[serde(flatten)]
    pub metrics: Metrics,
    /// Ids the ground truth knows but the prediction does not.
    #[serde(rename = "missing_attachments")]
    pub missing: BTreeSet<AttachmentId>,
    /// Ids the prediction has but the ground truth does not.
    #[serde(rename = "extra_attachments")]
    pub extra: BTreeSet<AttachmentId>,
}

impl ConfusionCounts {
    /// Compare two partitions.
    pub fn between(predicted: &Partition, truth: &Partition) -> Self {
        let overlap = |a: &BTreeSet<AttachmentId>, b: &BTreeSet<AttachmentId>| {
            a.intersection(b).count() as u64
        };
        Self {
            true_positives: overlap(predicted.included(), truth.included()),
            true_negatives: overlap(predicted.excluded(), truth.excluded()),
            false_positives: overlap(predicted.included(), truth.excluded()),
            false_negatives: overlap(predicted.excluded(), truth.included()),
        }
    }

    /// Sum of all four tallies.
    pub fn total(&self) -> u64 {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// Derive accuracy, precision, recall and F1.
    pub fn metrics(&self) -> Metrics {
        let tp = self.true_positives as f64;
        let tn = self.true_negatives as f64;
        let fp = self.false_positives as f64;
        let fn_ = self.false_negatives as f64;

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        Metrics {
            accuracy: ratio(tp + tn, tp + tn + fp + fn_),
            precision,
            recall,
            f1_score: ratio(2.0 * precision * recall, precision + recall),
        }
    }
}

impl Add for ConfusionCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            true_positives: self.true_positives + rhs.true_positives,
            true_negatives: self.true_negatives + rhs.true_negatives,
            false_positives: self.false_positives + rhs.false_positives,
            false_negatives: self.false_negatives + rhs.false_negatives,
        }
    }
}

impl AddAssign for ConfusionCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for ConfusionCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

fn ratio(num: f64, denom: f64) -> f64 {
    if denom > 0.0 {
        num / denom
    } else {
        0.0
    }
}

/// Score a predicted partition against the ground truth.
pub fn score(predicted: &Partition, truth: &Partition) -> Score {
    let counts = ConfusionCounts::between(predicted, truth);
    let predicted_all = predicted.universe();
    let truth_all = truth.universe();

    Score {
        counts,
        metrics: counts.metrics(),
        missing: truth_all.difference(&predicted_all).cloned().collect(),
        extra: predicted_all.difference(&truth_all).cloned().collect(),
    }
}

/// Batch-wide accumulation of confusion counts.
///
/// Owned by the batch driver: create with [`Aggregator::new`], feed every
/// per-message score through [`Aggregator::accumulate`], read the result
/// with [`Aggregator::finish`]. Merging is commutative and associative, so
/// partial aggregators can be combined with [`Aggregator::merge`].
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    counts: ConfusionCounts,
    messages: usize,
}

/// Overall result of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Overall {
    pub messages: usize,
    #[serde(flatten)]
    pub counts: ConfusionCounts,
    #[serde(flatten)]
    pub metrics: Metrics,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one message's counts.
    pub fn accumulate(&mut self, counts: ConfusionCounts) {
        self.counts += counts;
        self.messages += 1;
    }

    /// Fold another aggregator into this one.
    pub fn merge(&mut self, other: Aggregator) {
        self.counts += other.counts;
        self.messages += other.messages;
    }

    /// Number of messages accumulated so far.
    pub fn messages(&self) -> usize {
        self.messages
    }

    /// Overall metrics from the summed counts.
    pub fn finish(&self) -> Overall {
        Overall {
            messages: self.messages,
            counts: self.counts,
            metrics: self.counts.metrics(),
        }
    }
}
