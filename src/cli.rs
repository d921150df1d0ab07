/// cli.rs — genoset command-line interface
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// genoset — genomic interval datasets for classifier training
#[derive(Parser, Debug)]
#[command(
    name = "genoset",
    author,
    version,
    about = "Map genomic intervals to sequence, conservation and structure datasets",
    long_about = None
)]
pub struct Cli {
    /// Log progress and per-record drops (a set RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Map every class of a run file and write split datasets
    ///
    /// Reads one interval file per class, applies the window, maps all
    /// configured branches, writes full_datasets/merged_all.tsv and then
    /// final_datasets/<category>.tsv for train, validation, test and
    /// blackbox.
    ///
    /// Examples:
    ///   genoset prepare --config run.toml
    ///   genoset -v prepare --config runs/ctcf.toml
    Prepare {
        /// TOML run file
        #[arg(short, long, value_name = "PATH")]
        config: PathBuf,
    },

    /// Re-split an already mapped file without mapping again
    ///
    /// Keeps the branches listed in the run file, then reduces, splits and
    /// exports as `prepare` does.
    ///
    /// Examples:
    ///   genoset resplit --config run.toml --from out/full_datasets/merged_all.tsv.zip
    Resplit {
        /// TOML run file
        #[arg(short, long, value_name = "PATH")]
        config: PathBuf,

        /// Mapped dataset file (merged_all.tsv or merged_all.tsv.zip)
        #[arg(long, value_name = "PATH")]
        from: PathBuf,
    },

    /// Map a single interval file, without splitting, for prediction
    ///
    /// Examples:
    ///   genoset map --config run.toml --intervals query.bed --to query.tsv
    Map {
        /// TOML run file (classes and split are ignored)
        #[arg(short, long, value_name = "PATH")]
        config: PathBuf,

        /// Interval file (.bed or .narrowPeak, optionally gzipped)
        #[arg(long, value_name = "PATH")]
        intervals: PathBuf,

        /// Output dataset file (".zip" is appended when compressing)
        #[arg(long, value_name = "PATH")]
        to: PathBuf,
    },
}
