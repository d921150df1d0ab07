/// interval/bed.rs — Interval file reader
///
/// Reads BED-like files (`.bed`, `.narrowPeak`, optionally gzipped) into
/// unmapped records of one class.
///
/// COLUMNS USED
/// ───────────────────────────────────────────────────────────────────────
///  chr1  883401  883409  peak_1  0  +
///
///   1  Chromosome (must be whitelisted, other lines are skipped)
///   2  Start (0-based)
///   3  End (exclusive)
///   6  Strand ('+', '-', anything else is unspecified)
/// ───────────────────────────────────────────────────────────────────────
///
/// Zero-length intervals are skipped unless a window gives them a width.
/// Columns 4, 5 and 7+ are ignored. `#`, `track` and `browser` lines and
/// blank lines are skipped.
use std::io::BufRead;
use std::path::Path;

use crate::error::{GenosetError, Result};
use crate::interval::record::{IntervalRecord, Strand};
use crate::interval::window::Window;
use crate::logging::Diagnostics;
use crate::reference::files::open_text;
use crate::reference::is_valid_chrom;

/// Read every interval of `path` as a record of class `klass`, replacing
/// its coordinates by `window` when one is given.
pub fn read_intervals(
    path: &Path,
    klass: &str,
    window: Option<&Window>,
    diag: &dyn Diagnostics,
) -> Result<Vec<IntervalRecord>> {
    let reader = open_text(path)?;
    let mut placer = window.map(|w| w.placer());

    let mut records = Vec::new();
    let mut skipped = 0usize;
    let mut empty = 0usize;

    for (idx, raw) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw?;
        let line = line.trim_end_matches(['\r', '\n']);

        if line.trim().is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }

        let invalid = |reason: String| GenosetError::InvalidInterval {
            path: path.to_path_buf(),
            line: line_no,
            reason,
        };

        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 3 {
            return Err(invalid(format!(
                "expected at least 3 tab-separated columns, got {}",
                cols.len()
            )));
        }

        let chrom = cols[0].trim();
        if !is_valid_chrom(chrom) {
            skipped += 1;
            continue;
        }

        let start: u64 = cols[1]
            .trim()
            .parse()
            .map_err(|_| invalid(format!("invalid start coordinate '{}'", cols[1])))?;
        let end: u64 = cols[2]
            .trim()
            .parse()
            .map_err(|_| invalid(format!("invalid end coordinate '{}'", cols[2])))?;
        if start > end {
            return Err(invalid(format!("start {} is after end {}", start, end)));
        }

        let strand = cols.get(5).map(|s| Strand::from_sign(s.trim())).unwrap_or(Strand::Unspecified);

        let (start, end) = match placer.as_mut() {
            Some(p) => p.place(start, end),
            None => (start, end),
        };
        // Nothing to map or fold.
        if start == end {
            empty += 1;
            continue;
        }

        records.push(IntervalRecord::new(chrom, start, end, strand, klass));
    }

    if skipped > 0 {
        diag.info(&format!(
            "{}: skipped {} intervals on non-standard chromosomes",
            path.display(),
            skipped
        ));
    }
    if empty > 0 {
        diag.info(&format!(
            "{}: skipped {} zero-length intervals",
            path.display(),
            empty
        ));
    }
    diag.debug(&format!(
        "{}: read {} intervals of class '{}'",
        path.display(),
        records.len(),
        klass
    ));

    Ok(records)
}
