/// interval/mod.rs — Labeled genomic intervals
///
///   record: IntervalRecord, its key, strand and category
///   window: fixed-width windows around an anchor
///   bed: interval file reader
pub mod bed;
pub mod record;
pub mod window;

pub use bed::read_intervals;
pub use record::{Category, IntervalRecord, RecordBuilder, Strand};
pub use window::{Placement, Window, WindowPlacer};
