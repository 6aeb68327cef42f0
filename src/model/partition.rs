//! Two-way partitions of a message's attachment ids.
//!
//! A [`Partition`] splits a universe of [`AttachmentId`]s into `included`
//! (substantively referenced, the positive class) and `excluded`
//! (decorative or unreferenced). Its fields are private: the only ways to
//! obtain one are [`Partition::repair`], which turns an untrusted
//! [`RawAnswer`] into a valid cover of a known universe, and
//! [`Partition::from_disjoint`], which validates already-persisted data.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::attachment::AttachmentId;

/// A valid partition: `included ∩ excluded = ∅`.
///
/// The universe of a partition is `included ∪ excluded`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    included: BTreeSet<AttachmentId>,
    excluded: BTreeSet<AttachmentId>,
}

/// Untrusted classification as received from the model or another source.
///
/// Lists may contain duplicates, ids present in both lists, ids outside the
/// universe, or omit ids altogether.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAnswer {
    pub relevant: Vec<String>,
    pub irrelevant: Vec<String>,
}

/// An anomaly found and resolved while repairing a [`RawAnswer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairWarning {
    /// Ids listed more than once in the relevant list.
    DuplicateIncluded(Vec<String>),
    /// Ids listed more than once in the irrelevant list.
    DuplicateExcluded(Vec<String>),
    /// Ids listed in both lists; they were kept as included.
    Overlap(Vec<String>),
    /// Ids not part of the universe; they were dropped.
    Unknown(Vec<String>),
    /// Universe ids absent from both lists; they were added to excluded.
    Omitted(Vec<String>),
}

/// Result of [`Partition::repair`].
#[derive(Debug, Clone)]
pub struct Repaired {
    pub partition: Partition,
    pub warnings: Vec<RepairWarning>,
}

/// On-disk shape shared by predicted output and ground truth.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartitionFile {
    #[serde(default)]
    pub relevant: Vec<String>,
    #[serde(default)]
    pub irrelevant: Vec<String>,
}

impl Partition {
    /// The trivial partition of an empty universe.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Everything excluded: the conservative fallback when no usable
    /// classification exists.
    pub fn all_excluded(universe: &BTreeSet<AttachmentId>) -> Self {
        Self {
            included: BTreeSet::new(),
            excluded: universe.clone(),
        }
    }

    /// Build a partition from two sets that must not overlap.
    ///
    /// Returns the overlapping ids on failure.
    pub fn from_disjoint(
        included: BTreeSet<AttachmentId>,
        excluded: BTreeSet<AttachmentId>,
    ) -> std::result::Result<Self, Vec<AttachmentId>> {
        let overlap: Vec<AttachmentId> = included.intersection(&excluded).cloned().collect();
        if overlap.is_empty() {
            Ok(Self { included, excluded })
        } else {
            Err(overlap)
        }
    }

    /// Repair an untrusted answer into a valid partition covering exactly `universe`.
    ///
    /// Rules, in order:
    /// 1. duplicates within each list collapse;
    /// 2. an id in both lists stays included (false negatives cost more
    ///    than false positives);
    /// 3. ids outside `universe` are dropped;
    /// 4. universe ids named by neither list become excluded.
    ///
    /// Total and idempotent: `repair(repair(a).to_raw(), u) == repair(a, u)`.
    pub fn repair(raw: &RawAnswer, universe: &BTreeSet<AttachmentId>) -> Repaired {
        let mut warnings = Vec::new();

        let (mut included, dup_inc) = collapse(&raw.relevant);
        if !dup_inc.is_empty() {
            warn!(duplicates = ?dup_inc, "Duplicates in 'relevant' list");
            warnings.push(RepairWarning::DuplicateIncluded(dup_inc));
        }
        let (mut excluded, dup_exc) = collapse(&raw.irrelevant);
        if !dup_exc.is_empty() {
            warn!(duplicates = ?dup_exc, "Duplicates in 'irrelevant' list");
            warnings.push(RepairWarning::DuplicateExcluded(dup_exc));
        }

        let overlap: Vec<String> = included
            .intersection(&excluded)
            .map(|id| id.to_string())
            .collect();
        if !overlap.is_empty() {
            warn!(ids = ?overlap, "Ids in both 'relevant' and 'irrelevant', keeping as relevant");
            excluded.retain(|id| !included.contains(id));
            warnings.push(RepairWarning::Overlap(overlap));
        }

        let unknown: Vec<String> = included
            .iter()
            .chain(excluded.iter())
            .filter(|id| !universe.contains(*id))
            .map(|id| id.to_string())
            .collect();
        if !unknown.is_empty() {
            warn!(ids = ?unknown, "Dropping ids that are not attachments of this message");
            included.retain(|id| universe.contains(id));
            excluded.retain(|id| universe.contains(id));
            warnings.push(RepairWarning::Unknown(unknown));
        }

        let omitted: Vec<AttachmentId> = universe
            .iter()
            .filter(|id| !included.contains(*id) && !excluded.contains(*id))
            .cloned()
            .collect();
        if !omitted.is_empty() {
            let names: Vec<String> = omitted.iter().map(|id| id.to_string()).collect();
            warn!(ids = ?names, "Missing classifications, adding to irrelevant");
            excluded.extend(omitted);
            warnings.push(RepairWarning::Omitted(names));
        }

        Repaired {
            partition: Self { included, excluded },
            warnings,
        }
    }

    /// Ids classified as included (the positive class).
    pub fn included(&self) -> &BTreeSet<AttachmentId> {
        &self.included
    }

    /// Ids classified as excluded.
    pub fn excluded(&self) -> &BTreeSet<AttachmentId> {
        &self.excluded
    }

    /// `included ∪ excluded`.
    pub fn universe(&self) -> BTreeSet<AttachmentId> {
        self.included.union(&self.excluded).cloned().collect()
    }

    /// Number of classified ids.
    pub fn len(&self) -> usize {
        self.included.len() + self.excluded.len()
    }

    /// Whether the universe is empty.
    pub fn is_empty(&self) -> bool {
        self.included.is_empty() && self.excluded.is_empty()
    }

    /// View this partition as a raw answer (for re-repair or persistence).
    pub fn to_raw(&self) -> RawAnswer {
        RawAnswer {
            relevant: self.included.iter().map(|id| id.to_string()).collect(),
            irrelevant: self.excluded.iter().map(|id| id.to_string()).collect(),
        }
    }

    /// The sorted on-disk representation.
    pub fn to_file(&self) -> PartitionFile {
        let raw = self.to_raw();
        PartitionFile {
            relevant: raw.relevant,
            irrelevant: raw.irrelevant,
        }
    }
}

impl RawAnswer {
    /// Build from string slices.
    pub fn new<S: AsRef<str>>(relevant: &[S], irrelevant: &[S]) -> Self {
        Self {
            relevant: relevant.iter().map(|s| s.as_ref().to_string()).collect(),
            irrelevant: irrelevant.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}

/// Collapse a list into a set, reporting ids that occurred more than once.
fn collapse(items: &[String]) -> (BTreeSet<AttachmentId>, Vec<String>) {
    let mut set = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for item in items {
        if !set.insert(AttachmentId::new(item.as_str())) {
            duplicates.insert(item.clone());
        }
    }
    (set, duplicates.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> BTreeSet<AttachmentId> {
        names.iter().map(|n| AttachmentId::from(*n)).collect()
    }

    fn check_cover(p: &Partition, universe: &BTreeSet<AttachmentId>) {
        assert!(p.included().is_disjoint(p.excluded()));
        assert_eq!(&p.universe(), universe);
    }

    #[test]
    fn test_default_to_excluded() {
        let universe = ids(&["A", "B", "C"]);
        let raw = RawAnswer::new(&["A"], &[]);
        let repaired = Partition::repair(&raw, &universe);
        assert_eq!(repaired.partition.included(), &ids(&["A"]));
        assert_eq!(repaired.partition.excluded(), &ids(&["B", "C"]));
        assert_eq!(
            repaired.warnings,
            vec![RepairWarning::Omitted(vec!["B".into(), "C".into()])]
        );
    }

    #[test]
    fn test_overlap_prefers_included() {
        let universe = ids(&["x.pdf", "y.png"]);
        let raw = RawAnswer::new(&["x.pdf"], &["x.pdf", "y.png"]);
        let repaired = Partition::repair(&raw, &universe);
        assert_eq!(repaired.partition.included(), &ids(&["x.pdf"]));
        assert_eq!(repaired.partition.excluded(), &ids(&["y.png"]));
        assert!(repaired
            .warnings
            .contains(&RepairWarning::Overlap(vec!["x.pdf".into()])));
    }

    #[test]
    fn test_duplicates_are_flagged_and_collapsed() {
        let universe = ids(&["a.pdf", "c.png"]);
        let raw = RawAnswer::new(&["a.pdf", "a.pdf"], &["c.png", "c.png", "c.png"]);
        let repaired = Partition::repair(&raw, &universe);
        assert_eq!(repaired.partition.included(), &ids(&["a.pdf"]));
        assert_eq!(repaired.partition.excluded(), &ids(&["c.png"]));
        assert_eq!(
            repaired.warnings,
            vec![
                RepairWarning::DuplicateIncluded(vec!["a.pdf".into()]),
                RepairWarning::DuplicateExcluded(vec!["c.png".into()]),
            ]
        );
    }

    #[test]
    fn test_unknown_ids_are_dropped() {
        let universe = ids(&["a.pdf"]);
        let raw = RawAnswer::new(&["a.pdf", "ghost.pdf"], &["logo.png"]);
        let repaired = Partition::repair(&raw, &universe);
        check_cover(&repaired.partition, &universe);
        assert_eq!(repaired.partition.included(), &ids(&["a.pdf"]));
        assert!(repaired.partition.excluded().is_empty());
    }

    #[test]
    fn test_totality_on_hostile_input() {
        let universe = ids(&["a", "b", "c", "d"]);
        let cases = [
            RawAnswer::default(),
            RawAnswer::new(&["z", "z", "y"], &["y", "x"]),
            RawAnswer::new(&["a", "b", "c", "d"], &["a", "b", "c", "d"]),
            RawAnswer::new(&["", " a"], &["d", "d", "A"]),
        ];
        for raw in &cases {
            let repaired = Partition::repair(raw, &universe);
            check_cover(&repaired.partition, &universe);
        }
    }

    #[test]
    fn test_repair_is_idempotent() {
        let universe = ids(&["a", "b", "c", "d"]);
        let cases = [
            RawAnswer::default(),
            RawAnswer::new(&["a", "a", "q"], &["a", "b"]),
            RawAnswer::new(&["d"], &["c", "c", "b", "a"]),
        ];
        for raw in &cases {
            let once = Partition::repair(raw, &universe).partition;
            let twice = Partition::repair(&once.to_raw(), &universe);
            assert_eq!(twice.partition, once);
            assert!(twice.warnings.is_empty());
        }
    }

    #[test]
    fn test_empty_universe_repairs_to_empty() {
        let repaired = Partition::repair(&RawAnswer::new(&["a"], &["b"]), &BTreeSet::new());
        assert!(repaired.partition.is_empty());
    }

    #[test]
    fn test_from_disjoint_rejects_overlap() {
        let err = Partition::from_disjoint(ids(&["a", "b"]), ids(&["b"])).unwrap_err();
        assert_eq!(err, vec![AttachmentId::from("b")]);
        assert!(Partition::from_disjoint(ids(&["a"]), ids(&["b"])).is_ok());
    }

    #[test]
    fn test_all_excluded() {
        let universe = ids(&["a", "b"]);
        let p = Partition::all_excluded(&universe);
        assert!(p.included().is_empty());
        assert_eq!(p.excluded(), &universe);
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_to_file_is_sorted() {
        let universe = ids(&["c", "a", "b"]);
        let p = Partition::repair(&RawAnswer::new(&["c", "a"], &[]), &universe).partition;
        let file = p.to_file();
        assert_eq!(file.relevant, vec!["a", "c"]);
        assert_eq!(file.irrelevant, vec!["b"]);
    }
}
