//! Integration tests for extraction, batch classification and evaluation.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use attachsift::batch::{self, ClassifyOptions, MessageStatus};
use attachsift::classify::{self, Outcome};
use attachsift::error::{FailureKind, Result, SiftError};
use attachsift::model::attachment::AttachmentId;
use attachsift::model::partition::Partition;
use attachsift::parser::{html, mime};
use attachsift::store;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn ids(names: &[&str]) -> BTreeSet<AttachmentId> {
    names.iter().map(|n| AttachmentId::from(*n)).collect()
}

fn copy_dir(src: &Path, dst: &Path) {
    std::fs::create_dir_all(dst).unwrap();
    for entry in std::fs::read_dir(src).unwrap() {
        let path = entry.unwrap().path();
        std::fs::copy(&path, dst.join(path.file_name().unwrap())).unwrap();
    }
}

fn options(root: &Path) -> ClassifyOptions {
    let input_dir = root.join("input");
    copy_dir(&fixture("messages"), &input_dir);
    ClassifyOptions {
        input_dir,
        output_dir: root.join("output"),
        max_body_chars: html::MAX_BODY_CHARS,
    }
}

/// Canned model: answers per message, recognised by the ids in the prompt.
fn canned_model(prompt: &str) -> Result<String> {
    if prompt.contains("example_1_attachment_1.pdf") {
        Ok("Here is my analysis:\n```json\n{\"relevant\": [\"example_1_attachment_1.pdf\"], \
            \"irrelevant\": [\"example_1_attachment_3.png\"]}\n```"
            .to_string())
    } else if prompt.contains("example_2_attachment_1.doc") {
        Ok(r#"{"relevant": ["example_2_attachment_1.doc", "example_2_attachment_2.pdf", "bogus.pdf"], "irrelevant": []}"#
            .to_string())
    } else {
        Err(SiftError::AnswerParse("unexpected prompt".into()))
    }
}

// ─── Test 1: Extraction over nested multipart ───────────────────────

#[test]
fn test_extract_nested_multipart() {
    let raw = std::fs::read(fixture("messages/example_1.eml")).unwrap();
    let message = mime::extract(&raw);

    assert!(message.has_body());
    assert!(message.body.contains("order confirmation"));
    assert_eq!(
        message.attachments,
        ids(&[
            "example_1_attachment_1.pdf",
            "example_1_attachment_2.xlsx",
            "example_1_attachment_3.png",
        ]),
        "inline logo counts, signature.asc does not follow the naming convention"
    );

    let normalized = html::normalize(&message.body);
    assert!(normalized.starts_with("<html><body>"));
    assert!(normalized.contains("Kind regards & thanks"));
    assert!(!normalized.contains('\n'));
}

// ─── Test 2: Attachments inside a forwarded message ─────────────────

#[test]
fn test_extract_forwarded_message() {
    let raw = std::fs::read(fixture("messages/example_2.eml")).unwrap();
    let message = mime::extract(&raw);

    assert!(message.body.contains("forwarded contract"));
    assert!(!message.body.contains("Draft contract attached"));
    assert_eq!(
        message.attachments,
        ids(&["example_2_attachment_1.doc", "example_2_attachment_2.pdf"])
    );
}

// ─── Test 3: Single-part message without attachments ───────────────

#[test]
fn test_extract_without_attachments() {
    let raw = std::fs::read(fixture("messages/example_3.eml")).unwrap();
    let message = mime::extract(&raw);
    assert!(message.body.contains("Nothing attached"));
    assert!(message.attachments.is_empty());

    let garbage = mime::extract(b"");
    assert!(!garbage.has_body());
    assert!(garbage.attachments.is_empty());
}

// ─── Test 4: Classification batch ───────────────────────────────────

#[test]
fn test_classification_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let opts = options(tmp.path());

    let calls = Cell::new(0usize);
    let caller = |prompt: &str| -> Result<String> {
        calls.set(calls.get() + 1);
        canned_model(prompt)
    };
    let ticks = RefCell::new(Vec::new());
    let summary = batch::run_classification(
        &opts,
        &caller,
        Some(&|current: usize, total: usize| ticks.borrow_mut().push((current, total))),
    )
    .unwrap();

    assert_eq!(calls.get(), 2, "example_3 has no attachments and must not reach the model");
    assert_eq!(summary.processed(), 4);
    assert_eq!(summary.written(), 3);
    assert_eq!(summary.degraded().count(), 0);
    assert_eq!(ticks.borrow().last(), Some(&(4, 4)));

    let failed: Vec<_> = summary.failed().collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].file.ends_with("notes.eml"));

    // Omitted xlsx defaults to excluded
    let p1 = store::read_partition(&opts.output_dir.join("attachments_1.json")).unwrap();
    assert_eq!(p1.included(), &ids(&["example_1_attachment_1.pdf"]));
    assert_eq!(
        p1.excluded(),
        &ids(&["example_1_attachment_2.xlsx", "example_1_attachment_3.png"])
    );

    // Foreign id is dropped
    let p2 = store::read_partition(&opts.output_dir.join("attachments_2.json")).unwrap();
    assert_eq!(
        p2.included(),
        &ids(&["example_2_attachment_1.doc", "example_2_attachment_2.pdf"])
    );
    assert!(p2.excluded().is_empty());

    let p3 = store::read_partition(&opts.output_dir.join("attachments_3.json")).unwrap();
    assert!(p3.is_empty());

    let record = summary
        .records
        .iter()
        .find(|r| r.file.ends_with("example_1.eml"))
        .unwrap();
    match &record.status {
        MessageStatus::Written {
            included,
            excluded,
            outcome: Outcome::Classified { warnings },
            ..
        } => {
            assert_eq!((*included, *excluded), (1, 2));
            assert_eq!(warnings.len(), 1);
        }
        other => panic!("unexpected status {other:?}"),
    }
}

// ─── Test 5: Transport failure falls back to all excluded ───────────

#[test]
fn test_transport_failure_fallback() {
    let tmp = tempfile::tempdir().unwrap();
    let opts = options(tmp.path());

    let caller =
        |_: &str| -> Result<String> { Err(SiftError::Transport("connection refused".into())) };
    let summary = batch::run_classification(&opts, &caller, None).unwrap();

    assert_eq!(summary.written(), 3);
    let degraded: Vec<_> = summary.degraded().collect();
    assert_eq!(degraded.len(), 2);
    for record in degraded {
        match &record.status {
            MessageStatus::Written {
                included,
                outcome: Outcome::Fallback { kind, .. },
                ..
            } => {
                assert_eq!(*included, 0);
                assert_eq!(*kind, FailureKind::Transport);
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    let p1 = store::read_partition(&opts.output_dir.join("attachments_1.json")).unwrap();
    assert!(p1.included().is_empty());
    assert_eq!(p1.excluded().len(), 3);
}

// ─── Test 6: Missing input directory aborts ─────────────────────────

#[test]
fn test_missing_input_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let opts = ClassifyOptions {
        input_dir: tmp.path().join("nope"),
        output_dir: tmp.path().join("output"),
        max_body_chars: 100,
    };
    let caller = |_: &str| -> Result<String> { panic!("model must not be called") };
    assert!(batch::run_classification(&opts, &caller, None).is_err());
}

// ─── Test 7: Evaluation batch over classified output ────────────────

#[test]
fn test_evaluation_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let opts = options(tmp.path());
    batch::run_classification(&opts, &canned_model, None).unwrap();

    let report = batch::run_evaluation(&opts.output_dir, &fixture("ground_truth"), None).unwrap();

    assert_eq!(report.messages.len(), 3);
    assert!(report.failures.is_empty());
    assert_eq!(report.unmatched.len(), 1);
    assert!(report.unmatched[0].ends_with("attachments_9.json"));

    let first = report.messages.iter().find(|m| m.number == "1").unwrap();
    assert_eq!(first.score.counts.true_positives, 1);
    assert_eq!(first.score.counts.true_negatives, 1);
    assert_eq!(first.score.counts.false_negatives, 1);
    assert_eq!(first.score.counts.false_positives, 0);

    let overall = report.overall.unwrap();
    assert_eq!(overall.messages, 3);
    assert_eq!(overall.counts.true_positives, 3);
    assert_eq!(overall.counts.true_negatives, 1);
    assert_eq!(overall.counts.false_positives, 0);
    assert_eq!(overall.counts.false_negatives, 1);
    assert!((overall.metrics.precision - 1.0).abs() < 1e-9);
    assert!((overall.metrics.recall - 0.75).abs() < 1e-9);
    assert!((overall.metrics.accuracy - 0.8).abs() < 1e-9);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["overall"]["messages"], 3);
    assert_eq!(json["overall"]["true_positives"], 3);
}

// ─── Test 8: Invalid ground truth is reported, not fatal ────────────

#[test]
fn test_evaluation_invalid_partition_file() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("output");
    let truth = tmp.path().join("truth");
    std::fs::create_dir_all(&output).unwrap();
    std::fs::create_dir_all(&truth).unwrap();

    std::fs::write(
        truth.join("attachments_4.json"),
        r#"{"relevant": ["a.pdf"], "irrelevant": ["a.pdf"]}"#,
    )
    .unwrap();
    std::fs::write(output.join("attachments_4.json"), r#"{"relevant": ["a.pdf"]}"#).unwrap();
    std::fs::write(truth.join("attachments_5.json"), "not json").unwrap();
    std::fs::write(output.join("attachments_5.json"), "{}").unwrap();

    let report = batch::run_evaluation(&output, &truth, None).unwrap();
    assert!(report.messages.is_empty());
    assert_eq!(report.failures.len(), 2);
    assert!(report.overall.is_none());

    assert!(batch::run_evaluation(&tmp.path().join("missing"), &truth, None).is_err());
    assert!(batch::run_evaluation(&output, &tmp.path().join("missing"), None).is_err());
}

// ─── Test 9: Classifying raw message bytes ──────────────────────────

#[test]
fn test_classify_raw_message() {
    let raw = std::fs::read(fixture("messages/example_1.eml")).unwrap();
    let calls = Cell::new(0usize);
    let caller = |prompt: &str| -> Result<String> {
        calls.set(calls.get() + 1);
        assert!(prompt.contains("\"example_1_attachment_2.xlsx\""));
        assert!(prompt.contains("Kind regards & thanks"));
        canned_model(prompt)
    };

    let result = classify::classify(&raw, &caller, html::MAX_BODY_CHARS);
    assert_eq!(calls.get(), 1);
    assert_eq!(result.partition.included(), &ids(&["example_1_attachment_1.pdf"]));
    assert_eq!(
        result.partition.excluded(),
        &ids(&["example_1_attachment_2.xlsx", "example_1_attachment_3.png"])
    );
    assert!(matches!(result.outcome, Outcome::Classified { .. }));

    // Unusable answer falls back to all excluded
    let garbled = |_: &str| -> Result<String> { Ok("I cannot help with that.".to_string()) };
    let fallback = classify::classify(&raw, &garbled, html::MAX_BODY_CHARS);
    assert!(fallback.partition.included().is_empty());
    assert_eq!(fallback.partition.excluded().len(), 3);
    assert!(matches!(
        fallback.outcome,
        Outcome::Fallback { kind: FailureKind::Parse, .. }
    ));
}

#[test]
fn test_classify_raw_message_without_attachments() {
    let raw = std::fs::read(fixture("messages/example_3.eml")).unwrap();
    let calls = Cell::new(0usize);
    let caller = |_: &str| -> Result<String> {
        calls.set(calls.get() + 1);
        Ok(r#"{"relevant": [], "irrelevant": []}"#.to_string())
    };

    let result = classify::classify(&raw, &caller, html::MAX_BODY_CHARS);
    assert_eq!(calls.get(), 0);
    assert_eq!(result.partition, Partition::empty());
    assert_eq!(result.outcome, Outcome::NoAttachments);
}
