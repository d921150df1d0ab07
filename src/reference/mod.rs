/// reference/mod.rs — Reference loaders
///
///   fasta: chromosome → sequence map (sequence and structure branches)
///   wig: per-chromosome step files read through a forward cursor
///   files: directory listing and transparent gzip/zip opening
pub mod fasta;
pub mod files;
pub mod wig;

use std::path::PathBuf;

pub use fasta::{chrom_rank, is_valid_chrom, load_sequence_reference, GenomicReference, VALID_CHRS};
pub use wig::{load_score_reference_cursor, ScoreReference, StepCursor, StepHeader, StepKind};

/// Reference resources handed to the branch mapper.
#[derive(Debug, Default, Clone)]
pub struct References {
    /// Needed by the sequence and structure branches.
    pub sequence: Option<GenomicReference>,
    /// Needed by the conservation branch.
    pub scores: Option<ScoreReference>,
    /// Folding executable; falls back to the environment, then `RNAfold`.
    pub folding_tool: Option<PathBuf>,
}
