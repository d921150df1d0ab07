/// dataset/split.rs — Deterministic train/validation/test/blackbox split
///
/// Two modes:
///
///   by chromosome: every category owns a set of chromosomes; the sets
///     must be disjoint, records elsewhere are dropped
///   random: seeded shuffle, then contiguous slices sized
///     floor(total * part / sum) in category order
///
/// The random mode drops the rounding remainder (at most three records).
/// Same seed and same input order always give the same split.
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::Dataset;
use crate::error::{GenosetError, Result};
use crate::interval::Category;
use crate::logging::Diagnostics;

/// train:validation:test:blackbox proportions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatio([f64; 4]);

impl SplitRatio {
    pub fn new(parts: [f64; 4]) -> Result<Self> {
        let valid = parts.iter().all(|p| p.is_finite() && *p >= 0.0) && parts.iter().sum::<f64>() > 0.0;
        if !valid {
            return Err(GenosetError::InvalidRatio(format_parts(&parts)));
        }
        Ok(Self(parts))
    }

    pub fn parts(&self) -> [f64; 4] {
        self.0
    }

    /// Slice sizes for `total` records, in category order.
    pub fn sizes(&self, total: usize) -> [usize; 4] {
        let sum: f64 = self.0.iter().sum();
        self.0.map(|p| ((total as f64) * p / sum).floor() as usize)
    }
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self([7.0, 1.0, 1.0, 1.0])
    }
}

impl FromStr for SplitRatio {
    type Err = GenosetError;

    fn from_str(s: &str) -> Result<Self> {
        let values: Vec<f64> = s
            .split(':')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| GenosetError::InvalidRatio(s.to_string()))?;
        let parts: [f64; 4] = values
            .try_into()
            .map_err(|_| GenosetError::InvalidRatio(s.to_string()))?;
        Self::new(parts)
    }
}

impl fmt::Display for SplitRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_parts(&self.0))
    }
}

fn format_parts(parts: &[f64; 4]) -> String {
    parts.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(":")
}

#[derive(Debug, Clone, PartialEq)]
pub enum SplitConfig {
    ByChromosome(BTreeMap<Category, Vec<String>>),
    Random { ratio: SplitRatio, seed: u64 },
}

impl SplitConfig {
    /// Reject a chromosome listed under two categories.
    pub fn check(&self) -> Result<()> {
        if let SplitConfig::ByChromosome(sets) = self {
            chromosome_owners(sets)?;
        }
        Ok(())
    }
}

fn chromosome_owners(sets: &BTreeMap<Category, Vec<String>>) -> Result<HashMap<&str, Category>> {
    let mut owner: HashMap<&str, Category> = HashMap::new();
    for (category, chroms) in sets {
        for chrom in chroms {
            if let Some(first) = owner.insert(chrom.as_str(), *category) {
                if first != *category {
                    return Err(GenosetError::OverlappingSplit {
                        chrom: chrom.clone(),
                        first: first.to_string(),
                        second: category.to_string(),
                    });
                }
            }
        }
    }
    Ok(owner)
}

/// Partition `dataset`; every record gets its category.
pub fn split(
    dataset: Dataset,
    config: &SplitConfig,
    diag: &dyn Diagnostics,
) -> Result<BTreeMap<Category, Dataset>> {
    match config {
        SplitConfig::ByChromosome(sets) => split_by_chromosome(dataset, sets, diag),
        SplitConfig::Random { ratio, seed } => Ok(split_random(dataset, ratio, *seed, diag)),
    }
}

fn empty_like(dataset: &Dataset, category: Category) -> Dataset {
    Dataset {
        branches: dataset.branches.clone(),
        klass: dataset.klass.clone(),
        category: Some(category),
        records: Vec::new(),
    }
}

fn split_by_chromosome(
    dataset: Dataset,
    sets: &BTreeMap<Category, Vec<String>>,
    diag: &dyn Diagnostics,
) -> Result<BTreeMap<Category, Dataset>> {
    let owner = chromosome_owners(sets)?;
    let mut out: BTreeMap<Category, Dataset> = sets
        .keys()
        .map(|c| (*c, empty_like(&dataset, *c)))
        .collect();

    let mut dropped = 0usize;
    for record in dataset.records {
        match owner.get(record.chrom.as_str()) {
            Some(category) => {
                if let Some(target) = out.get_mut(category) {
                    target.records.push(record.with_category(*category));
                }
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        diag.info(&format!(
            "{}: {} records on chromosomes outside every split set were dropped",
            dataset.klass.as_deref().unwrap_or("dataset"),
            dropped
        ));
    }
    Ok(out)
}

fn split_random(
    dataset: Dataset,
    ratio: &SplitRatio,
    seed: u64,
    diag: &dyn Diagnostics,
) -> BTreeMap<Category, Dataset> {
    let sizes = ratio.sizes(dataset.records.len());
    let mut out: BTreeMap<Category, Dataset> = Category::SPLIT
        .iter()
        .map(|c| (*c, empty_like(&dataset, *c)))
        .collect();

    let total = dataset.records.len();
    let mut records = dataset.records;
    let mut rng = StdRng::seed_from_u64(seed);
    records.shuffle(&mut rng);

    let mut iter = records.into_iter();
    for (category, size) in Category::SPLIT.iter().zip(sizes) {
        if let Some(target) = out.get_mut(category) {
            target
                .records
                .extend(iter.by_ref().take(size).map(|r| r.with_category(*category)));
        }
    }

    let used: usize = sizes.iter().sum();
    diag.debug(&format!(
        "random split {} of {} records: {:?}, {} left over",
        ratio,
        total,
        sizes,
        total - used
    ));
    out
}
