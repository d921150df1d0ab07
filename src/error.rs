use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenosetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── reference errors ──────────────────────────────────────────────

    /// The sequence or score reference does not follow its format.
    #[error("Malformed reference {path}: {reason}")]
    MalformedReference { path: PathBuf, reason: String },

    /// More than one score file matched a chromosome.
    #[error("Found {count} score files for {chrom} in {dir}")]
    AmbiguousReference {
        chrom: String,
        dir: PathBuf,
        count: usize,
    },

    /// No score file matched a chromosome.
    #[error("No score file for {chrom} in {dir}")]
    MissingReference { chrom: String, dir: PathBuf },

    #[error("Unknown step type '{0}': only fixedStep or variableStep are allowed")]
    UnknownStepType(String),

    // ── interval errors ───────────────────────────────────────────────

    #[error("Invalid interval file {path}, line {line}: {reason}")]
    InvalidInterval {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    // ── integrity errors ──────────────────────────────────────────────

    #[error("Parsed {actual} scores for {key} instead of {expected}")]
    ScoreLengthMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },

    #[error("Folding returned {lines} lines for {records} records (expected {expected}); no structure can be attributed")]
    FoldingCountMismatch {
        records: usize,
        lines: usize,
        expected: usize,
    },

    #[error("Folded structure of {key} has length {actual} instead of {expected}")]
    StructureLengthMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },

    #[error("Folded structure of {key} contains unknown symbol '{symbol}'")]
    InvalidStructure { key: String, symbol: char },

    // ── external tool errors ──────────────────────────────────────────

    #[error("Could not find folding executable '{executable}'. Install it or set {env}")]
    ToolNotFound { executable: String, env: String },

    #[error("Folding command failed with exit code {code}: {cmd}")]
    ToolFailed { cmd: String, code: i32, stderr: String },

    // ── dataset errors ────────────────────────────────────────────────

    #[error("Chromosome {chrom} is assigned to both {first} and {second}")]
    OverlappingSplit {
        chrom: String,
        first: String,
        second: String,
    },

    #[error("Invalid split ratio '{0}': expected four non-negative numbers train:validation:test:blackbox with a positive sum")]
    InvalidRatio(String),

    #[error("Datasets do not share the same branches: {expected} vs {got}")]
    BranchMismatch { expected: String, got: String },

    #[error("Branch '{branch}' is not mapped for {key}")]
    MissingBranch { branch: String, key: String },

    #[error("Invalid dataset file {path}: {reason}")]
    InvalidDatasetFile { path: PathBuf, reason: String },

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── run configuration ─────────────────────────────────────────────

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, GenosetError>;
