/// reference/files.rs — Reference file discovery and opening
///
/// Reference files may be plain text, gzip streams, or zip archives with
/// a single entry. `open_text` hides the difference behind one buffered
/// reader. Zip entries cannot be streamed independently of their archive,
/// so the entry is extracted to a temporary file that lives exactly as
/// long as the reader.
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tempfile::{NamedTempFile, TempPath};
use walkdir::WalkDir;

use crate::error::{GenosetError, Result};

/// Storage kind of a reference or dataset file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Plain,
    Gzip,
    Zip,
}

pub fn kind_of(path: &Path) -> FileKind {
    if has_extension(path, "gz") {
        FileKind::Gzip
    } else if has_extension(path, "zip") {
        FileKind::Zip
    } else {
        FileKind::Plain
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Base name of a path as a string, empty when it has none.
pub fn base_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// A line-readable view over any supported file kind.
pub struct TextReader {
    inner: Box<dyn BufRead + Send>,
    // Dropped after `inner`, so the handle is closed before removal.
    _extracted: Option<TempPath>,
}

impl Read for TextReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for TextReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

/// Open `path` for line reading, decompressing when needed.
pub fn open_text(path: &Path) -> Result<TextReader> {
    match kind_of(path) {
        FileKind::Plain => {
            let file = File::open(path)?;
            Ok(TextReader {
                inner: Box::new(BufReader::new(file)),
                _extracted: None,
            })
        }
        FileKind::Gzip => {
            let file = File::open(path)?;
            Ok(TextReader {
                inner: Box::new(BufReader::new(MultiGzDecoder::new(file))),
                _extracted: None,
            })
        }
        FileKind::Zip => {
            let temp_path = extract_single_entry(path)?;
            let file = File::open(&temp_path)?;
            Ok(TextReader {
                inner: Box::new(BufReader::new(file)),
                _extracted: Some(temp_path),
            })
        }
    }
}

fn extract_single_entry(path: &Path) -> Result<TempPath> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let index = (0..archive.len())
        .find(|&i| {
            archive
                .by_index(i)
                .map(|entry| !entry.is_dir())
                .unwrap_or(false)
        })
        .ok_or_else(|| GenosetError::MalformedReference {
            path: path.to_path_buf(),
            reason: "zip archive contains no file entry".to_string(),
        })?;

    let mut entry = archive.by_index(index)?;
    let mut extracted = NamedTempFile::new()?;
    io::copy(&mut entry, &mut extracted)?;

    Ok(extracted.into_temp_path())
}

/// All files under `dir` whose base name contains `needle`, sorted.
pub fn list_files(dir: &Path, needle: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| base_name(e.path()).contains(needle))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    fn read_all(path: &Path) -> Vec<String> {
        open_text(path)
            .unwrap()
            .lines()
            .map(|l| l.unwrap())
            .collect()
    }

    #[test]
    fn test_kind_by_extension() {
        assert_eq!(kind_of(Path::new("chr1.wig")), FileKind::Plain);
        assert_eq!(kind_of(Path::new("chr1.wig.gz")), FileKind::Gzip);
        assert_eq!(kind_of(Path::new("train.tsv.ZIP")), FileKind::Zip);
    }

    #[test]
    fn test_open_plain_and_gzip() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("a.txt");
        std::fs::write(&plain, "one\ntwo\n").unwrap();
        assert_eq!(read_all(&plain), vec!["one", "two"]);

        let gz = dir.path().join("a.txt.gz");
        let mut enc = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        enc.write_all(b"three\nfour\n").unwrap();
        enc.finish().unwrap();
        assert_eq!(read_all(&gz), vec!["three", "four"]);
    }

    #[test]
    fn test_open_zip_extracts_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chr1.wig.zip");
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        writer
            .start_file("chr1.wig", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"fixedStep chrom=chr1 start=1 step=1\n0.5\n").unwrap();
        writer.finish().unwrap();

        assert_eq!(
            read_all(&path),
            vec!["fixedStep chrom=chr1 start=1 step=1", "0.5"]
        );
    }

    #[test]
    fn test_list_files_filters_and_sorts() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("chr2.phylop.wig"), "").unwrap();
        std::fs::write(dir.path().join("nested/chr1.phylop.wig.gz"), "").unwrap();
        std::fs::write(dir.path().join("README"), "").unwrap();

        let files = list_files(dir.path(), "wig");
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| base_name(p).contains("wig")));
    }
}
