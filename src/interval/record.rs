/// interval/record.rs — One labeled genomic interval
///
/// A record carries its coordinates, label and split category plus the
/// branch values resolved for it so far. Branch values are attached only
/// through `RecordBuilder`; a built record is read-only.
///
/// KEY FORMAT
/// ───────────────────────────────────────────────────────────────────────
///  chr1_120_170_+_bound
///  │    │   │   │ └─ class label (may itself contain '_')
///  │    │   │   └─── strand: '+', '-' or '.'
///  │    │   └─────── end (exclusive)
///  │    └─────────── start (0-based)
///  └──────────────── chromosome
/// ───────────────────────────────────────────────────────────────────────
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::branch::{Branch, BranchValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
    Unspecified,
}

impl Strand {
    pub fn sign(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::Unspecified => '.',
        }
    }

    /// Anything other than '+' or '-' is unspecified.
    pub fn from_sign(s: &str) -> Self {
        match s {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            _ => Strand::Unspecified,
        }
    }
}

/// Split category of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Unassigned,
    Train,
    Validation,
    Test,
    Blackbox,
}

impl Category {
    /// Categories a split can produce, in slicing order.
    pub const SPLIT: [Category; 4] = [
        Category::Train,
        Category::Validation,
        Category::Test,
        Category::Blackbox,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Unassigned => "unassigned",
            Category::Train => "train",
            Category::Validation => "validation",
            Category::Test => "test",
            Category::Blackbox => "blackbox",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unassigned" => Ok(Category::Unassigned),
            "train" => Ok(Category::Train),
            "validation" => Ok(Category::Validation),
            "test" => Ok(Category::Test),
            "blackbox" => Ok(Category::Blackbox),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalRecord {
    pub chrom: String,
    /// 0-based, inclusive.
    pub start: u64,
    /// Exclusive.
    pub end: u64,
    pub strand: Strand,
    pub klass: String,
    pub category: Category,
    values: BTreeMap<Branch, BranchValue>,
}

impl IntervalRecord {
    pub fn new(
        chrom: impl Into<String>,
        start: u64,
        end: u64,
        strand: Strand,
        klass: impl Into<String>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
            strand,
            klass: klass.into(),
            category: Category::Unassigned,
            values: BTreeMap::new(),
        }
    }

    /// Number of positions covered.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity key, also used as the FASTA name during folding.
    pub fn key(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.chrom,
            self.start,
            self.end,
            self.strand.sign(),
            self.klass
        )
    }

    /// Rebuild an unmapped record from its key.
    pub fn from_key(key: &str) -> Option<Self> {
        let mut parts = key.splitn(5, '_');
        let chrom = parts.next()?;
        let start = parts.next()?.parse().ok()?;
        let end = parts.next()?.parse().ok()?;
        let strand = match parts.next()? {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            "." => Strand::Unspecified,
            _ => return None,
        };
        let klass = parts.next()?;
        if chrom.is_empty() || start > end {
            return None;
        }
        Some(Self::new(chrom, start, end, strand, klass))
    }

    pub fn value(&self, branch: Branch) -> Option<&BranchValue> {
        self.values.get(&branch)
    }

    pub fn has(&self, branch: Branch) -> bool {
        self.values.contains_key(&branch)
    }

    /// Mapped branches in enum order.
    pub fn branches(&self) -> impl Iterator<Item = Branch> + '_ {
        self.values.keys().copied()
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Reopen the record for a stage that attaches or drops values.
    pub fn into_builder(self) -> RecordBuilder {
        RecordBuilder { record: self }
    }
}

/// Stage-boundary writer for branch values.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: IntervalRecord,
}

impl RecordBuilder {
    pub fn branch(mut self, branch: Branch, value: BranchValue) -> Self {
        self.record.values.insert(branch, value);
        self
    }

    /// Drop every value whose branch is not in `keep`.
    pub fn retain_branches(mut self, keep: &[Branch]) -> Self {
        self.record.values.retain(|b, _| keep.contains(b));
        self
    }

    pub fn build(self) -> IntervalRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let r = IntervalRecord::new("chr1", 120, 170, Strand::Forward, "bound");
        assert_eq!(r.key(), "chr1_120_170_+_bound");
        let r = IntervalRecord::new("chrX", 0, 5, Strand::Unspecified, "neg");
        assert_eq!(r.key(), "chrX_0_5_._neg");
    }

    #[test]
    fn test_key_parses_back() {
        let r = IntervalRecord::new("chr2", 10, 40, Strand::Reverse, "low_affinity");
        let back = IntervalRecord::from_key(&r.key()).unwrap();
        assert_eq!(back, r);
        assert_eq!(back.klass, "low_affinity");
    }

    #[test]
    fn test_bad_keys_rejected() {
        assert!(IntervalRecord::from_key("chr1_10_20_+").is_none());
        assert!(IntervalRecord::from_key("chr1_x_20_+_a").is_none());
        assert!(IntervalRecord::from_key("chr1_10_20_?_a").is_none());
        assert!(IntervalRecord::from_key("chr1_30_20_+_a").is_none());
    }

    #[test]
    fn test_builder_attaches_and_retains() {
        let r = IntervalRecord::new("chr1", 0, 2, Strand::Forward, "a")
            .into_builder()
            .branch(Branch::Sequence, BranchValue::Bases("AC".to_string()))
            .branch(Branch::Conservation, BranchValue::Scores(vec![0.5, 1.0]))
            .build();
        assert!(r.has(Branch::Sequence));
        assert_eq!(r.value(Branch::Conservation).unwrap().len(), 2);

        let trimmed = r.into_builder().retain_branches(&[Branch::Conservation]).build();
        assert!(!trimmed.has(Branch::Sequence));
        assert_eq!(trimmed.branches().collect::<Vec<_>>(), vec![Branch::Conservation]);
    }

    #[test]
    fn test_category_names() {
        for c in Category::SPLIT {
            assert_eq!(c.name().parse::<Category>().unwrap(), c);
        }
        assert_eq!(Category::default(), Category::Unassigned);
        assert!("holdout".parse::<Category>().is_err());
    }
}
