/// dataset/mod.rs — Ordered record collections sharing a branch list
///
///   split: train/validation/test/blackbox partitioning
///   io: TSV (optionally zipped) save and load
///
/// A Dataset is what flows between pipeline stages: per-class datasets
/// read from interval files, the merged and mapped dataset, and the
/// per-category datasets written at the end. Every random operation takes
/// an explicit seed.
pub mod io;
pub mod split;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;

use crate::branch::{branch_list, Branch};
use crate::error::{GenosetError, Result};
use crate::interval::{read_intervals, Category, IntervalRecord, Window};
use crate::logging::Diagnostics;
use crate::reference::chrom_rank;

pub use io::{load_from_file, save_to_file};
pub use split::{split, SplitConfig, SplitRatio};

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub branches: Vec<Branch>,
    pub klass: Option<String>,
    pub category: Option<Category>,
    pub records: Vec<IntervalRecord>,
}

/// Size reduction of one class: keep a fraction, or a number of records.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "f64")]
pub enum Reduction {
    /// In (0, 1].
    Ratio(f64),
    /// Greater than 1.
    Count(usize),
}

impl TryFrom<f64> for Reduction {
    type Error = String;

    fn try_from(value: f64) -> std::result::Result<Self, Self::Error> {
        if value > 0.0 && value <= 1.0 {
            Ok(Reduction::Ratio(value))
        } else if value > 1.0 && value.fract() == 0.0 {
            Ok(Reduction::Count(value as usize))
        } else {
            Err(format!(
                "reduction must be a ratio in (0, 1] or a whole number of records, got {}",
                value
            ))
        }
    }
}

impl Reduction {
    /// Number of records kept out of `n`.
    pub fn target(&self, n: usize) -> usize {
        match *self {
            Reduction::Ratio(r) => ((n as f64) * r).floor() as usize,
            Reduction::Count(c) => c.min(n),
        }
    }
}

impl Dataset {
    pub fn new(branches: Vec<Branch>, records: Vec<IntervalRecord>) -> Self {
        Self {
            branches,
            klass: None,
            category: None,
            records,
        }
    }

    /// Unmapped records of one class read from an interval file.
    pub fn from_interval_file(
        path: &Path,
        klass: &str,
        branches: &[Branch],
        window: Option<&Window>,
        diag: &dyn Diagnostics,
    ) -> Result<Self> {
        let records = read_intervals(path, klass, window, diag)?;
        Ok(Self {
            branches: branches.to_vec(),
            klass: Some(klass.to_string()),
            category: None,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of all inputs, in input order. Class and category are kept
    /// only when every input agrees on them.
    pub fn concat(datasets: Vec<Dataset>) -> Result<Dataset> {
        let mut iter = datasets.into_iter();
        let Some(mut merged) = iter.next() else {
            return Ok(Dataset::new(Vec::new(), Vec::new()));
        };
        for next in iter {
            if next.branches != merged.branches {
                return Err(GenosetError::BranchMismatch {
                    expected: branch_list(&merged.branches),
                    got: branch_list(&next.branches),
                });
            }
            if merged.klass != next.klass {
                merged.klass = None;
            }
            if merged.category != next.category {
                merged.category = None;
            }
            merged.records.extend(next.records);
        }
        Ok(merged)
    }

    /// Whitelist order of chromosomes, then start, then end.
    pub fn sort(&mut self) {
        self.records.sort_by(|a, b| {
            let ra = chrom_rank(&a.chrom).unwrap_or(usize::MAX);
            let rb = chrom_rank(&b.chrom).unwrap_or(usize::MAX);
            ra.cmp(&rb)
                .then_with(|| a.chrom.cmp(&b.chrom))
                .then_with(|| a.start.cmp(&b.start))
                .then_with(|| a.end.cmp(&b.end))
        });
    }

    /// Keep a seeded random subset; survivors keep their relative order.
    pub fn reduce(mut self, reduction: Reduction, seed: u64) -> Dataset {
        let n = self.records.len();
        let keep = reduction.target(n);
        if keep >= n {
            return self;
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
        let chosen: BTreeSet<usize> = indices.into_iter().take(keep).collect();

        let records = std::mem::take(&mut self.records);
        self.records = records
            .into_iter()
            .enumerate()
            .filter(|(i, _)| chosen.contains(i))
            .map(|(_, r)| r)
            .collect();
        self
    }

    pub fn of_class(&self, klass: &str) -> Dataset {
        Dataset {
            branches: self.branches.clone(),
            klass: Some(klass.to_string()),
            category: self.category,
            records: self
                .records
                .iter()
                .filter(|r| r.klass == klass)
                .cloned()
                .collect(),
        }
    }

    /// Distinct class labels, sorted.
    pub fn classes(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.klass.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Narrow the branch list to `keep`, dropping other values. Every
    /// record must already carry every kept branch.
    pub fn select_branches(self, keep: &[Branch]) -> Result<Dataset> {
        for branch in keep {
            if !self.branches.contains(branch) {
                return Err(GenosetError::BranchMismatch {
                    expected: branch_list(keep),
                    got: branch_list(&self.branches),
                });
            }
        }
        let mut records = Vec::with_capacity(self.records.len());
        for record in self.records {
            if let Some(missing) = keep.iter().find(|b| !record.has(**b)) {
                return Err(GenosetError::MissingBranch {
                    branch: missing.to_string(),
                    key: record.key(),
                });
            }
            records.push(record.into_builder().retain_branches(keep).build());
        }
        Ok(Dataset {
            branches: keep.to_vec(),
            klass: self.klass,
            category: self.category,
            records,
        })
    }

    /// Per-record numeric matrix of `branch`.
    pub fn values(&self, branch: Branch) -> Result<Vec<Vec<Vec<f32>>>> {
        self.records
            .iter()
            .map(|r| {
                r.value(branch)
                    .map(|v| v.to_matrix())
                    .ok_or_else(|| GenosetError::MissingBranch {
                        branch: branch.to_string(),
                        key: r.key(),
                    })
            })
            .collect()
    }

    /// One-hot class labels over `classes`; unknown classes are all-zero.
    pub fn labels(&self, classes: &[String]) -> Vec<Vec<f32>> {
        self.records
            .iter()
            .map(|r| {
                classes
                    .iter()
                    .map(|c| if *c == r.klass { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect()
    }

    /// Set the category of the dataset and of every record.
    pub fn with_category(mut self, category: Category) -> Dataset {
        self.category = Some(category);
        self.records = self
            .records
            .into_iter()
            .map(|r| r.with_category(category))
            .collect();
        self
    }
}

/// Group datasets by category and concatenate each group in input order.
pub fn merge_by_category(datasets: Vec<Dataset>) -> Result<BTreeMap<Category, Dataset>> {
    let mut expected: Option<Vec<Branch>> = None;
    let mut groups: BTreeMap<Category, Vec<Dataset>> = BTreeMap::new();

    for dataset in datasets {
        match &expected {
            Some(branches) if *branches != dataset.branches => {
                return Err(GenosetError::BranchMismatch {
                    expected: branch_list(branches),
                    got: branch_list(&dataset.branches),
                });
            }
            Some(_) => {}
            None => expected = Some(dataset.branches.clone()),
        }
        let category = dataset.category.unwrap_or_default();
        groups.entry(category).or_default().push(dataset);
    }

    groups
        .into_iter()
        .map(|(category, group)| {
            let mut merged = Dataset::concat(group)?;
            merged.category = Some(category);
            Ok((category, merged))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::BranchValue;
    use crate::interval::Strand;

    fn record(chrom: &str, start: u64, klass: &str) -> IntervalRecord {
        IntervalRecord::new(chrom, start, start + 2, Strand::Forward, klass)
    }

    fn mapped(chrom: &str, start: u64, klass: &str) -> IntervalRecord {
        record(chrom, start, klass)
            .into_builder()
            .branch(Branch::Sequence, BranchValue::Bases("AC".to_string()))
            .branch(Branch::Conservation, BranchValue::Scores(vec![0.5, 1.5]))
            .build()
    }

    #[test]
    fn test_sort_uses_whitelist_order() {
        let mut d = Dataset::new(
            vec![],
            vec![record("chrX", 1, "a"), record("chr10", 5, "a"), record("chr2", 9, "a"), record("chr2", 3, "a")],
        );
        d.sort();
        let keys: Vec<_> = d.records.iter().map(|r| (r.chrom.as_str(), r.start)).collect();
        assert_eq!(keys, vec![("chr2", 3), ("chr2", 9), ("chr10", 5), ("chrX", 1)]);
    }

    #[test]
    fn test_reduce_by_ratio_and_count() {
        let records: Vec<_> = (0..10).map(|i| record("chr1", i * 10, "a")).collect();
        let d = Dataset::new(vec![], records);

        let half = d.clone().reduce(Reduction::Ratio(0.5), 3);
        assert_eq!(half.len(), 5);
        assert_eq!(half, d.clone().reduce(Reduction::Ratio(0.5), 3));
        let starts: Vec<_> = half.records.iter().map(|r| r.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);

        assert_eq!(d.clone().reduce(Reduction::Count(3), 1).len(), 3);
        assert_eq!(d.clone().reduce(Reduction::Count(30), 1).len(), 10);
        assert_eq!(d.reduce(Reduction::Ratio(0.15), 1).len(), 1);
    }

    #[test]
    fn test_reduction_from_number() {
        assert_eq!(Reduction::try_from(0.25).unwrap(), Reduction::Ratio(0.25));
        assert_eq!(Reduction::try_from(1.0).unwrap(), Reduction::Ratio(1.0));
        assert_eq!(Reduction::try_from(200.0).unwrap(), Reduction::Count(200));
        assert!(Reduction::try_from(0.0).is_err());
        assert!(Reduction::try_from(2.5).is_err());
    }

    #[test]
    fn test_class_filtering_and_labels() {
        let d = Dataset::new(
            vec![],
            vec![record("chr1", 0, "pos"), record("chr1", 5, "neg"), record("chr2", 0, "pos")],
        );
        assert_eq!(d.classes(), vec!["neg".to_string(), "pos".to_string()]);
        assert_eq!(d.of_class("pos").len(), 2);
        assert_eq!(
            d.labels(&d.classes()),
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]]
        );
    }

    #[test]
    fn test_select_branches() {
        let d = Dataset::new(
            vec![Branch::Sequence, Branch::Conservation],
            vec![mapped("chr1", 0, "a")],
        );
        let cons = d.clone().select_branches(&[Branch::Conservation]).unwrap();
        assert_eq!(cons.branches, vec![Branch::Conservation]);
        assert!(!cons.records[0].has(Branch::Sequence));
        assert_eq!(cons.values(Branch::Conservation).unwrap(), vec![vec![vec![0.5], vec![1.5]]]);

        assert!(matches!(
            d.select_branches(&[Branch::Structure]),
            Err(GenosetError::BranchMismatch { .. })
        ));
    }

    #[test]
    fn test_values_missing_branch() {
        let d = Dataset::new(vec![Branch::Sequence], vec![record("chr1", 0, "a")]);
        assert!(matches!(d.values(Branch::Sequence), Err(GenosetError::MissingBranch { .. })));
    }

    #[test]
    fn test_merge_by_category() {
        let branches = vec![Branch::Sequence];
        let a_train = Dataset::new(branches.clone(), vec![record("chr1", 0, "a")]).with_category(Category::Train);
        let a_test = Dataset::new(branches.clone(), vec![record("chr1", 9, "a")]).with_category(Category::Test);
        let b_train = Dataset::new(branches.clone(), vec![record("chr2", 0, "b")]).with_category(Category::Train);

        let merged = merge_by_category(vec![a_train, a_test, b_train]).unwrap();
        assert_eq!(merged.len(), 2);
        let train = &merged[&Category::Train];
        assert_eq!(train.records.iter().map(|r| r.klass.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(train.category, Some(Category::Train));
        assert_eq!(train.klass, None);

        let other = Dataset::new(vec![Branch::Structure], vec![]).with_category(Category::Train);
        let again = Dataset::new(branches, vec![]).with_category(Category::Train);
        assert!(matches!(
            merge_by_category(vec![again, other]),
            Err(GenosetError::BranchMismatch { .. })
        ));
    }
}
