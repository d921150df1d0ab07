/// lib.rs — genoset library root
///
/// Turns labeled genomic intervals into branch-encoded datasets:
///
///   reference: sequence (FASTA) and conservation (step file) references
///   interval: labeled intervals, windows, interval file reader
///   branch: sequence, conservation and structure mapping
///   dataset: sort, reduce, split, merge, save and load
///   config: TOML run file
///   pipeline: prepare / resplit / map runs
///   logging: diagnostics sink and logger setup
pub mod branch;
pub mod config;
pub mod dataset;
pub mod error;
pub mod interval;
pub mod logging;
pub mod pipeline;
pub mod reference;

pub use error::{GenosetError, Result};
