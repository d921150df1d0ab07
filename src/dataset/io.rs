/// dataset/io.rs — Dataset files
///
/// FORMAT
/// ───────────────────────────────────────────────────────────────────────
///  key                    seq      cons
///  chr1_2_6_+_bound       G,T,A,C  0.5,1,1,0.25
///  chr1_2_6_-_bound       C,A,T,G  0.5,1,1,0.25
/// ───────────────────────────────────────────────────────────────────────
///
/// Tab-separated. The header names the branch of every value column, so a
/// file is read back in its own column order. Compressed files are a zip
/// archive `<name>.zip` holding one deflated entry called `<name>`.
///
/// The category of a loaded dataset comes from the file name:
/// `train.tsv.zip` → train, `merged_all.tsv` → none.
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::branch::{Branch, BranchValue};
use crate::dataset::Dataset;
use crate::error::{GenosetError, Result};
use crate::interval::{Category, IntervalRecord};
use crate::reference::files::{base_name, open_text};

const KEY_COLUMN: &str = "key";

/// Write `dataset` to `path`, or to `<path>.zip` when `compress` is set.
/// Returns the path actually written.
pub fn save_to_file(dataset: &Dataset, path: &Path, compress: bool) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    if !compress {
        let mut w = BufWriter::new(File::create(path)?);
        write_table(dataset, &mut w)?;
        w.flush()?;
        return Ok(path.to_path_buf());
    }

    let mut zip_name = path.as_os_str().to_os_string();
    zip_name.push(".zip");
    let zip_path = PathBuf::from(zip_name);

    let mut zip = ZipWriter::new(File::create(&zip_path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(base_name(path), options)?;
    {
        let mut w = BufWriter::new(&mut zip);
        write_table(dataset, &mut w)?;
        w.flush()?;
    }
    zip.finish()?;
    Ok(zip_path)
}

fn write_table<W: Write>(dataset: &Dataset, w: &mut W) -> Result<()> {
    write!(w, "{}", KEY_COLUMN)?;
    for branch in &dataset.branches {
        write!(w, "\t{}", branch.name())?;
    }
    writeln!(w)?;

    for record in &dataset.records {
        write!(w, "{}", record.key())?;
        for branch in &dataset.branches {
            let value = record.value(*branch).ok_or_else(|| GenosetError::MissingBranch {
                branch: branch.to_string(),
                key: record.key(),
            })?;
            write!(w, "\t{}", value.to_field())?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Category named by the file, if any.
pub fn category_from_name(path: &Path) -> Option<Category> {
    base_name(path).split('.').next()?.parse().ok()
}

/// Read a file written by `save_to_file` (plain, gzipped or zipped).
pub fn load_from_file(path: &Path) -> Result<Dataset> {
    let invalid = |reason: String| GenosetError::InvalidDatasetFile {
        path: path.to_path_buf(),
        reason,
    };

    let mut lines = open_text(path)?.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(invalid("empty file".to_string())),
    };
    let mut columns = header.trim_end().split('\t');
    if columns.next() != Some(KEY_COLUMN) {
        return Err(invalid(format!("header must start with '{}'", KEY_COLUMN)));
    }
    let branches: Vec<Branch> = columns
        .map(|c| Branch::from_name(c).ok_or_else(|| invalid(format!("unknown branch column '{}'", c))))
        .collect::<Result<_>>()?;

    let category = category_from_name(path);
    let mut records = Vec::new();

    for (idx, raw) in lines.enumerate() {
        let line_no = idx + 2;
        let line = raw?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }

        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() != branches.len() + 1 {
            return Err(invalid(format!(
                "line {}: expected {} columns, got {}",
                line_no,
                branches.len() + 1,
                cols.len()
            )));
        }

        let record = IntervalRecord::from_key(cols[0])
            .ok_or_else(|| invalid(format!("line {}: invalid key '{}'", line_no, cols[0])))?;
        let mut builder = record
            .with_category(category.unwrap_or_default())
            .into_builder();
        for (branch, field) in branches.iter().zip(&cols[1..]) {
            let value = BranchValue::parse(*branch, field)
                .map_err(|e| invalid(format!("line {}, column {}: {}", line_no, branch, e)))?;
            builder = builder.branch(*branch, value);
        }
        records.push(builder.build());
    }

    Ok(Dataset {
        branches,
        klass: None,
        category,
        records,
    })
}
