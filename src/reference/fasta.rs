/// reference/fasta.rs — Linear sequence reference
///
/// Parses a multi-record FASTA file once and keeps an in-memory map from
/// chromosome name to its full base sequence. Only whitelisted chromosome
/// names survive the load, so scaffolds and contigs resolve to "absent"
/// rather than to an error.
///
/// Bases are upper-cased while reading, which normalises soft-masked
/// regions, and anything outside A/C/G/T/N becomes N. The complement
/// table and the one-hot alphabet are therefore total over every stored
/// byte.
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::error::{GenosetError, Result};
use crate::reference::files::open_text;

/// Chromosome identifiers retained from any reference, in sort order.
pub const VALID_CHRS: &[&str] = &[
    "chr1", "chr2", "chr3", "chr4", "chr5", "chr6", "chr7", "chr8", "chr9", "chr10", "chr11",
    "chr12", "chr13", "chr14", "chr15", "chr16", "chr17", "chr18", "chr19", "chr20", "chr21",
    "chr22", "chrY", "chrX", "chrM", "chrMT",
];

/// Position of `chrom` in the whitelist, used as the primary sort key.
pub fn chrom_rank(chrom: &str) -> Option<usize> {
    VALID_CHRS.iter().position(|&c| c == chrom)
}

pub fn is_valid_chrom(chrom: &str) -> bool {
    chrom_rank(chrom).is_some()
}

#[inline]
fn normalize_base(b: u8) -> u8 {
    match b.to_ascii_uppercase() {
        x @ (b'A' | b'C' | b'G' | b'T' | b'N') => x,
        _ => b'N',
    }
}

/// Immutable chromosome → sequence map.
#[derive(Debug, Default, Clone)]
pub struct GenomicReference {
    sequences: HashMap<String, String>,
}

impl GenomicReference {
    /// Read a (possibly gzipped) FASTA file.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = open_text(path)?;
        Self::from_reader(reader, path)
    }

    /// Parse FASTA text from any buffered reader. `path` is used in errors.
    pub fn from_reader<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let mut sequences = HashMap::new();
        let mut name: Option<String> = None;
        let mut bases: Vec<u8> = Vec::new();

        for raw in reader.lines() {
            let line = raw?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(header) = line.strip_prefix('>') {
                if let Some(done) = name.take() {
                    Self::keep(&mut sequences, done, std::mem::take(&mut bases));
                }
                let id = header.split_whitespace().next().unwrap_or("").to_string();
                name = Some(id);
                continue;
            }

            if name.is_none() {
                return Err(GenosetError::MalformedReference {
                    path: path.to_path_buf(),
                    reason: "sequence data before the first '>' header".to_string(),
                });
            }
            bases.extend(line.bytes().map(normalize_base));
        }

        if let Some(done) = name {
            Self::keep(&mut sequences, done, bases);
        }

        Ok(Self { sequences })
    }

    /// Build from in-memory pairs, applying the same whitelist and
    /// normalisation as a file load.
    pub fn from_sequences<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut sequences = HashMap::new();
        for (k, v) in pairs {
            let bases = v.as_ref().bytes().map(normalize_base).collect();
            Self::keep(&mut sequences, k.into(), bases);
        }
        Self { sequences }
    }

    fn keep(sequences: &mut HashMap<String, String>, name: String, bases: Vec<u8>) {
        if !is_valid_chrom(&name) {
            return;
        }
        // Every byte went through normalize_base, so this is ASCII.
        let seq = String::from_utf8(bases).unwrap_or_default();
        sequences.insert(name, seq);
    }

    pub fn get(&self, chrom: &str) -> Option<&str> {
        self.sequences.get(chrom).map(|s| s.as_str())
    }

    /// `[start, end)` of a chromosome, or None when the chromosome is
    /// absent or the range runs past its end.
    pub fn slice(&self, chrom: &str, start: u64, end: u64) -> Option<&str> {
        let seq = self.sequences.get(chrom)?;
        let (start, end) = (usize::try_from(start).ok()?, usize::try_from(end).ok()?);
        if start > end || end > seq.len() {
            return None;
        }
        seq.get(start..end)
    }

    /// Loaded chromosome names in whitelist order.
    pub fn chromosomes(&self) -> Vec<&str> {
        VALID_CHRS
            .iter()
            .copied()
            .filter(|c| self.sequences.contains_key(*c))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

/// Load a sequence reference from `path`.
pub fn load_sequence_reference(path: &Path) -> Result<GenomicReference> {
    GenomicReference::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn parse(text: &str) -> Result<GenomicReference> {
        GenomicReference::from_reader(Cursor::new(text), Path::new("test.fa"))
    }

    #[test]
    fn test_multiline_records_are_joined() {
        let reference = parse(">chr1 description\nACGT\nacgt\n>chr2\nGG\n").unwrap();
        assert_eq!(reference.get("chr1"), Some("ACGTACGT"));
        assert_eq!(reference.get("chr2"), Some("GG"));
    }

    #[test]
    fn test_non_whitelisted_records_dropped() {
        let reference = parse(">chrUn_gl000220\nAAAA\n>chr1\nCC\n>chr1_random\nTT\n").unwrap();
        assert_eq!(reference.len(), 1);
        assert!(reference.get("chrUn_gl000220").is_none());
        assert!(reference.get("chr1_random").is_none());
    }

    #[test]
    fn test_missing_header_rejected() {
        let err = parse("ACGT\n>chr1\nAC\n").unwrap_err();
        assert!(matches!(err, GenosetError::MalformedReference { .. }));
    }

    #[test]
    fn test_unknown_bases_become_n() {
        let reference = parse(">chr3\nACRYgt\n").unwrap();
        assert_eq!(reference.get("chr3"), Some("ACNNGT"));
    }

    #[test]
    fn test_slice_bounds() {
        let reference = GenomicReference::from_sequences([("chr1", "ACGTACGT")]);
        assert_eq!(reference.slice("chr1", 2, 6), Some("GTAC"));
        assert_eq!(reference.slice("chr1", 6, 8), Some("GT"));
        assert_eq!(reference.slice("chr1", 6, 9), None);
        assert_eq!(reference.slice("chr2", 0, 1), None);
    }

    #[test]
    fn test_chromosomes_in_whitelist_order() {
        let reference =
            GenomicReference::from_sequences([("chrX", "A"), ("chr10", "A"), ("chr2", "A")]);
        assert_eq!(reference.chromosomes(), vec!["chr2", "chr10", "chrX"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ref.fa");
        std::fs::write(&path, ">chr1\nACGT\n").unwrap();
        let reference = load_sequence_reference(&path).unwrap();
        assert_eq!(reference.get("chr1"), Some("ACGT"));
    }
}
