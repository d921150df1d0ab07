/// config.rs — TOML run file
///
/// Example:
///
///   output = "runs/ctcf"
///   branches = ["seq", "cons"]
///   ncpu = 4
///
///   [references]
///   fasta = "hg38.fa.gz"
///   conservation = "phyloP100way/"
///
///   [window]
///   size = 100
///   placement = "center"
///
///   [[classes]]
///   file = "peaks/bound.bed"
///
///   [[classes]]
///   label = "background"
///   file = "peaks/shuffled.narrowPeak"
///
///   [split]
///   mode = "chromosome"
///   train = ["chr1", "chr2"]
///   validation = ["chr3"]
///   test = ["chr4"]
///
///   [reduce]
///   background = 0.5
///
/// Relative paths are resolved against the directory of the run file.
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::branch::Branch;
use crate::dataset::{Reduction, SplitConfig, SplitRatio};
use crate::error::{GenosetError, Result};
use crate::interval::{Category, Window};
use crate::reference::{GenomicReference, References, ScoreReference};

/// Interval file extensions stripped when deriving a class label.
const INTERVAL_EXTENSIONS: &[&str] = &[".gz", ".bed", ".narrowPeak"];

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub output: PathBuf,
    pub branches: Vec<Branch>,
    /// Complement reverse-strand intervals.
    #[serde(default = "default_true")]
    pub strand: bool,
    /// One-hot encode the sequence branch.
    #[serde(default = "default_true")]
    pub encode_sequence: bool,
    /// Worker budget; 0 uses every available CPU.
    #[serde(default)]
    pub ncpu: usize,
    /// Zip the dataset files.
    #[serde(default = "default_true")]
    pub compress: bool,
    /// Seed of the per-class reduction.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub references: ReferencePaths,
    pub window: Option<Window>,
    #[serde(default)]
    pub classes: Vec<ClassInput>,
    #[serde(default)]
    pub split: SplitSettings,
    /// Class label → ratio in (0, 1] or record count.
    #[serde(default)]
    pub reduce: BTreeMap<String, Reduction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferencePaths {
    pub fasta: Option<PathBuf>,
    pub conservation: Option<PathBuf>,
    pub rnafold: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassInput {
    pub label: Option<String>,
    pub file: PathBuf,
}

impl ClassInput {
    /// Explicit label, else the file name without interval extensions.
    pub fn label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        let mut name = self
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        for ext in INTERVAL_EXTENSIONS {
            if let Some(stripped) = name.strip_suffix(ext) {
                name = stripped.to_string();
            }
        }
        name
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SplitSettings {
    Random {
        #[serde(default = "default_ratio")]
        ratio: String,
        #[serde(default = "default_seed")]
        seed: u64,
    },
    Chromosome {
        #[serde(default)]
        train: Vec<String>,
        #[serde(default)]
        validation: Vec<String>,
        #[serde(default)]
        test: Vec<String>,
        #[serde(default)]
        blackbox: Vec<String>,
    },
}

impl Default for SplitSettings {
    fn default() -> Self {
        SplitSettings::Random {
            ratio: default_ratio(),
            seed: default_seed(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_seed() -> u64 {
    64
}

fn default_ratio() -> String {
    "7:1:1:1".to_string()
}

impl SplitSettings {
    pub fn to_split_config(&self) -> Result<SplitConfig> {
        match self {
            SplitSettings::Random { ratio, seed } => Ok(SplitConfig::Random {
                ratio: ratio.parse::<SplitRatio>()?,
                seed: *seed,
            }),
            SplitSettings::Chromosome {
                train,
                validation,
                test,
                blackbox,
            } => {
                if train.is_empty() || validation.is_empty() || test.is_empty() {
                    return Err(GenosetError::Config(
                        "chromosome split needs train, validation and test chromosomes".to_string(),
                    ));
                }
                let mut sets = BTreeMap::new();
                sets.insert(Category::Train, train.clone());
                sets.insert(Category::Validation, validation.clone());
                sets.insert(Category::Test, test.clone());
                if !blackbox.is_empty() {
                    sets.insert(Category::Blackbox, blackbox.clone());
                }
                let config = SplitConfig::ByChromosome(sets);
                config.check()?;
                Ok(config)
            }
        }
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

impl RunConfig {
    /// Read and parse a run file; relative paths become absolute.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            GenosetError::Config(format!("could not read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml(&contents)
            .map_err(|e| GenosetError::Config(format!("{}: {}", path.display(), e)))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        Ok(config)
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn resolve_paths(&mut self, base: &Path) {
        self.output = resolve_path(base, &self.output);
        let refs = &mut self.references;
        for p in [&mut refs.fasta, &mut refs.conservation].into_iter().flatten() {
            *p = resolve_path(base, p);
        }
        // A bare executable name is looked up on PATH.
        if let Some(tool) = &mut refs.rnafold {
            if tool.components().count() > 1 {
                *tool = resolve_path(base, tool);
            }
        }
        for class in &mut self.classes {
            class.file = resolve_path(base, &class.file);
        }
    }

    /// Check the run file before any work starts. `needs_classes` is set
    /// for runs that read interval files.
    pub fn validate(&self, needs_classes: bool) -> Result<()> {
        if self.branches.is_empty() {
            return Err(GenosetError::Config("at least one branch is required".to_string()));
        }
        let mut seen = HashSet::new();
        for branch in &self.branches {
            if !seen.insert(*branch) {
                return Err(GenosetError::Config(format!("branch '{}' is listed twice", branch)));
            }
            match branch {
                Branch::Sequence | Branch::Structure if self.references.fasta.is_none() => {
                    return Err(GenosetError::Config(format!(
                        "the {} branch needs references.fasta",
                        branch
                    )));
                }
                Branch::Conservation if self.references.conservation.is_none() => {
                    return Err(GenosetError::Config(
                        "the cons branch needs references.conservation".to_string(),
                    ));
                }
                _ => {}
            }
        }

        if let Some(window) = &self.window {
            if window.size == 0 {
                return Err(GenosetError::Config("window size must be positive".to_string()));
            }
        }

        if needs_classes && self.classes.len() < 2 {
            return Err(GenosetError::Config("at least two classes are required".to_string()));
        }
        let labels = self.class_labels();
        let mut unique = HashSet::new();
        for label in &labels {
            if label.is_empty() {
                return Err(GenosetError::Config("class labels must not be empty".to_string()));
            }
            if !unique.insert(label) {
                return Err(GenosetError::Config(format!("class '{}' is defined twice", label)));
            }
        }
        if !labels.is_empty() {
            if let Some(unknown) = self.reduce.keys().find(|k| !labels.contains(*k)) {
                return Err(GenosetError::Config(format!(
                    "reduce names unknown class '{}'",
                    unknown
                )));
            }
        }

        self.split.to_split_config()?;
        Ok(())
    }

    pub fn class_labels(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.label()).collect()
    }

    pub fn split_config(&self) -> Result<SplitConfig> {
        self.split.to_split_config()
    }

    /// Worker count with 0 meaning every available CPU.
    pub fn threads(&self) -> usize {
        if self.ncpu > 0 {
            return self.ncpu;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Load the references the configured branches need.
    pub fn load_references(&self) -> Result<References> {
        let wants = |b: Branch| self.branches.contains(&b);

        let sequence = match &self.references.fasta {
            Some(path) if wants(Branch::Sequence) || wants(Branch::Structure) => {
                Some(GenomicReference::load(path)?)
            }
            _ => None,
        };
        let scores = match &self.references.conservation {
            Some(dir) if wants(Branch::Conservation) => Some(ScoreReference::open(dir)?),
            _ => None,
        };

        Ok(References {
            sequence,
            scores,
            folding_tool: self.references.rnafold.clone(),
        })
    }

    pub fn full_dataset_path(&self) -> PathBuf {
        self.output.join("full_datasets").join("merged_all.tsv")
    }

    pub fn final_dataset_path(&self, category: Category) -> PathBuf {
        self.output
            .join("final_datasets")
            .join(format!("{}.tsv", category.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Placement;
    use tempfile::tempdir;

    const MINIMAL: &str = r#"
        output = "out"
        branches = ["seq"]

        [references]
        fasta = "ref.fa"

        [[classes]]
        file = "pos.bed"

        [[classes]]
        file = "neg.narrowPeak.gz"
    "#;

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_toml(MINIMAL).unwrap();
        assert!(config.strand && config.encode_sequence && config.compress);
        assert_eq!(config.ncpu, 0);
        assert!(config.threads() >= 1);
        assert_eq!(config.class_labels(), vec!["pos".to_string(), "neg".to_string()]);
        assert_eq!(
            config.split,
            SplitSettings::Random { ratio: "7:1:1:1".to_string(), seed: 64 }
        );
        config.validate(true).unwrap();
    }

    #[test]
    fn test_full_file() {
        let text = r#"
            output = "out"
            branches = ["seq", "cons", "fold"]
            ncpu = 3
            compress = false

            [references]
            fasta = "ref.fa"
            conservation = "wig"
            rnafold = "/usr/bin/RNAfold"

            [window]
            size = 100
            placement = "random"
            seed = 5

            [[classes]]
            label = "bound"
            file = "a.bed"

            [[classes]]
            label = "unbound"
            file = "b.bed"

            [split]
            mode = "chromosome"
            train = ["chr1", "chr2"]
            validation = ["chr3"]
            test = ["chr4"]

            [reduce]
            unbound = 0.5
            bound = 300
        "#;
        let config = RunConfig::from_toml(text).unwrap();
        config.validate(true).unwrap();
        assert_eq!(config.window, Some(Window::new(100, Placement::Random, 5)));
        assert_eq!(config.reduce["unbound"], Reduction::Ratio(0.5));
        assert_eq!(config.reduce["bound"], Reduction::Count(300));
        match config.split_config().unwrap() {
            SplitConfig::ByChromosome(sets) => {
                assert_eq!(sets.len(), 3);
                assert_eq!(sets[&Category::Validation], vec!["chr3".to_string()]);
            }
            other => panic!("unexpected split: {other:?}"),
        }
    }

    #[test]
    fn test_missing_reference_rejected() {
        let text = MINIMAL.replace("[\"seq\"]", "[\"seq\", \"cons\"]");
        let err = RunConfig::from_toml(&text).unwrap().validate(true).unwrap_err();
        assert!(err.to_string().contains("references.conservation"));
    }

    #[test]
    fn test_class_rules() {
        let one = r#"
            output = "out"
            branches = ["seq"]
            [references]
            fasta = "ref.fa"
            [[classes]]
            file = "pos.bed"
        "#;
        let config = RunConfig::from_toml(one).unwrap();
        assert!(config.validate(true).is_err());
        assert!(config.validate(false).is_ok());

        let twice = MINIMAL.replace("neg.narrowPeak.gz", "sub/pos.bed");
        assert!(RunConfig::from_toml(&twice).unwrap().validate(true).is_err());
    }

    #[test]
    fn test_bad_split_rejected() {
        let ratio = format!("{}\n[split]\nmode = \"random\"\nratio = \"7:1:1\"\n", MINIMAL);
        let err = RunConfig::from_toml(&ratio).unwrap().validate(true).unwrap_err();
        assert!(matches!(err, GenosetError::InvalidRatio(_)));

        let overlap = format!(
            "{}\n[split]\nmode = \"chromosome\"\ntrain = [\"chr1\"]\nvalidation = [\"chr2\"]\ntest = [\"chr1\"]\n",
            MINIMAL
        );
        let err = RunConfig::from_toml(&overlap).unwrap().validate(true).unwrap_err();
        assert!(matches!(err, GenosetError::OverlappingSplit { .. }));
    }

    #[test]
    fn test_bad_reduction_rejected() {
        let text = format!("{}\n[reduce]\npos = 2.5\n", MINIMAL);
        assert!(RunConfig::from_toml(&text).is_err());
        let text = format!("{}\n[reduce]\nother = 0.5\n", MINIMAL);
        assert!(RunConfig::from_toml(&text).unwrap().validate(true).is_err());
    }

    #[test]
    fn test_paths_resolved_against_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(&path, MINIMAL).unwrap();
        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.output, dir.path().join("out"));
        assert_eq!(config.references.fasta, Some(dir.path().join("ref.fa")));
        assert_eq!(config.classes[1].file, dir.path().join("neg.narrowPeak.gz"));
        assert_eq!(config.final_dataset_path(Category::Test), dir.path().join("out/final_datasets/test.tsv"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let text = MINIMAL.replace("output", "outptu");
        assert!(RunConfig::from_toml(&text).is_err());
        let text = MINIMAL.replace("fasta =", "fsata =");
        assert!(RunConfig::from_toml(&text).is_err());
    }
}
