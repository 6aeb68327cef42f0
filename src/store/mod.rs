//! Flat JSON persistence of partitions, one file per message.
//!
//! Files are named `attachments_<n>.json` where `<n>` is the message number
//! taken from the input name (`example_<n>...`). The number is kept as a
//! string so leading zeros survive.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Result, SiftError};
use crate::model::attachment::AttachmentId;
use crate::model::partition::{Partition, PartitionFile};

/// File name prefix of persisted partitions.
pub const PARTITION_PREFIX: &str = "attachments_";

/// Extract the message number from an input file name (`example_<digits>`).
pub fn message_number(file_name: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"example_(\d+)").expect("valid message number pattern"))
        .captures(file_name)
        .map(|caps| caps[1].to_string())
}

/// Message number of a persisted partition: its stem without the `attachments_` prefix.
pub fn partition_number(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(stem.strip_prefix(PARTITION_PREFIX).unwrap_or(stem).to_string())
}

/// Path of the partition file for message `number` inside `dir`.
pub fn partition_path(dir: &Path, number: &str) -> PathBuf {
    dir.join(format!("{PARTITION_PREFIX}{number}.json"))
}

/// Write a partition as pretty JSON with sorted `relevant` / `irrelevant` lists.
pub fn write_partition(dir: &Path, number: &str, partition: &Partition) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| SiftError::io(dir, e))?;
    let path = partition_path(dir, number);
    let json = serde_json::to_string_pretty(&partition.to_file()).map_err(|e| {
        SiftError::InvalidPartitionFile {
            path: path.clone(),
            reason: e.to_string(),
        }
    })?;
    std::fs::write(&path, json).map_err(|e| SiftError::io(&path, e))?;
    debug!(path = %path.display(), "Wrote partition");
    Ok(path)
}

/// Read and validate a persisted partition.
///
/// Duplicate ids collapse; an id listed as both relevant and irrelevant
/// makes the file invalid.
pub fn read_partition(path: &Path) -> Result<Partition> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SiftError::FileNotFound(path.to_path_buf())
        } else {
            SiftError::io(path, e)
        }
    })?;
    let file: PartitionFile =
        serde_json::from_str(&contents).map_err(|e| SiftError::InvalidPartitionFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let to_set = |names: Vec<String>| -> BTreeSet<AttachmentId> {
        names.into_iter().map(AttachmentId::new).collect()
    };
    Partition::from_disjoint(to_set(file.relevant), to_set(file.irrelevant)).map_err(|overlap| {
        let names: Vec<String> = overlap.iter().map(|id| id.to_string()).collect();
        SiftError::InvalidPartitionFile {
            path: path.to_path_buf(),
            reason: format!("listed as both relevant and irrelevant: {}", names.join(", ")),
        }
    })
}

/// Files in `dir` with the given extension, sorted by name.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SiftError::FileNotFound(dir.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| SiftError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        })
        .collect();
    files.sort();
    Ok(files)
}
