/// reference/wig.rs — Step-encoded score files and their forward cursor
///
/// FILE SHAPE
/// ───────────────────────────────────────────────────────────────────────
///  fixedStep chrom=chr1 start=5 step=1 [span=1]
///  1.0                       ← covers 5
///  2.0                       ← covers 6
///  variableStep chrom=chr1 [span=1]
///  120 0.25                  ← covers 120
/// ───────────────────────────────────────────────────────────────────────
///
/// Coordinates are used exactly as written in the file. A file may switch
/// between several headers; each one resets the running position.
///
/// The cursor never holds more than the current value line in memory and
/// can only move forward. Queries for one chromosome must therefore come
/// in non-decreasing coordinate order.
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::error::{GenosetError, Result};
use crate::reference::files::{base_name, list_files, open_text, TextReader};

/// Declared step type of a header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Fixed,
    Variable,
}

/// Parsed header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepHeader {
    pub kind: StepKind,
    pub chrom: Option<String>,
    /// For fixedStep: coordinate of the next value line.
    pub start: u64,
    pub step: u64,
    pub span: u64,
}

impl StepHeader {
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let kind = match parts.next() {
            Some("fixedStep") => StepKind::Fixed,
            Some("variableStep") => StepKind::Variable,
            Some(other) => return Err(GenosetError::UnknownStepType(other.to_string())),
            None => return Err(GenosetError::UnknownStepType(String::new())),
        };

        let mut header = StepHeader {
            kind,
            chrom: None,
            start: 0,
            step: 1,
            span: 1,
        };
        let mut has_start = false;

        for part in parts {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                GenosetError::MalformedReference {
                    path: PathBuf::new(),
                    reason: format!("header field '{}' is not key=value", part),
                }
            })?;
            match key {
                "chrom" => header.chrom = Some(value.to_string()),
                "start" => {
                    header.start = parse_u64(value, key)?;
                    has_start = true;
                }
                "step" => header.step = parse_u64(value, key)?,
                "span" => header.span = parse_u64(value, key)?,
                _ => {}
            }
        }

        if kind == StepKind::Fixed && !has_start {
            return Err(GenosetError::MalformedReference {
                path: PathBuf::new(),
                reason: "fixedStep header without start".to_string(),
            });
        }

        Ok(header)
    }
}

fn parse_u64(value: &str, key: &str) -> Result<u64> {
    value.parse().map_err(|_| GenosetError::MalformedReference {
        path: PathBuf::new(),
        reason: format!("invalid {} '{}'", key, value),
    })
}

/// One value line: `value` covers `[start, start + span)`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Block {
    start: u64,
    span: u64,
    value: f32,
}

enum LineKind {
    Skip,
    Header,
    Data,
}

fn classify(line: &str) -> LineKind {
    if line.is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
    {
        LineKind::Skip
    } else if line.contains("chrom=")
        || (line.starts_with(|c: char| c.is_ascii_alphabetic()) && line.contains('='))
    {
        LineKind::Header
    } else {
        LineKind::Data
    }
}

/// Forward-only reader over one step file.
pub struct StepCursor<R: BufRead> {
    reader: R,
    path: PathBuf,
    header: Option<StepHeader>,
    block: Option<Block>,
    buf: String,
    line_no: usize,
}

impl<R: BufRead> StepCursor<R> {
    pub fn new(reader: R, path: &Path) -> Self {
        Self {
            reader,
            path: path.to_path_buf(),
            header: None,
            block: None,
            buf: String::new(),
            line_no: 0,
        }
    }

    /// Move forward until `coordinate` is covered and return its score.
    ///
    /// None when the cursor is already past `coordinate`, when it falls in
    /// a gap between value lines, or when the file is exhausted. The loop
    /// reads at least one line per iteration and stops at EOF.
    pub fn advance_to(&mut self, coordinate: u64) -> Result<Option<f32>> {
        loop {
            if let Some(block) = self.block {
                if coordinate < block.start {
                    return Ok(None);
                }
                if coordinate < block.start + block.span {
                    return Ok(Some(block.value));
                }
            }
            if !self.next_block()? {
                return Ok(None);
            }
        }
    }

    /// True once the current value line starts after `coordinate`.
    pub fn overshot(&self, coordinate: u64) -> bool {
        self.block.map(|b| b.start > coordinate).unwrap_or(false)
    }

    /// Collect consecutive scores for `[start, end)`, stopping at the first
    /// coordinate the file does not cover.
    pub fn scores(&mut self, start: u64, end: u64) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(end.saturating_sub(start) as usize);
        for coordinate in start..end {
            match self.advance_to(coordinate)? {
                Some(value) => scores.push(value),
                None => break,
            }
        }
        Ok(scores)
    }

    /// Read lines until the next value line is parsed. False at EOF.
    fn next_block(&mut self) -> Result<bool> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(false);
            }
            self.line_no += 1;
            let line = self.buf.trim();

            match classify(line) {
                LineKind::Skip => continue,
                LineKind::Header => {
                    let header = StepHeader::parse(line).map_err(|e| self.locate(e))?;
                    self.header = Some(header);
                    self.block = None;
                }
                LineKind::Data => {
                    let block =
                        Self::parse_data(&mut self.header, line, &self.path, self.line_no)?;
                    self.block = Some(block);
                    return Ok(true);
                }
            }
        }
    }

    fn parse_data(
        header: &mut Option<StepHeader>,
        line: &str,
        path: &Path,
        line_no: usize,
    ) -> Result<Block> {
        let malformed = |reason: String| GenosetError::MalformedReference {
            path: path.to_path_buf(),
            reason: format!("line {}: {}", line_no, reason),
        };

        let header = header
            .as_mut()
            .ok_or_else(|| malformed("value line before any step header".to_string()))?;

        match header.kind {
            StepKind::Fixed => {
                let value: f32 = line
                    .parse()
                    .map_err(|_| malformed(format!("invalid score '{}'", line)))?;
                let block = Block {
                    start: header.start,
                    span: header.span,
                    value,
                };
                header.start += header.step;
                Ok(block)
            }
            StepKind::Variable => {
                let mut parts = line.split_whitespace();
                let (coord, value) = match (parts.next(), parts.next()) {
                    (Some(c), Some(v)) => (c, v),
                    _ => return Err(malformed(format!("expected 'coordinate value', got '{}'", line))),
                };
                let start: u64 = coord
                    .parse()
                    .map_err(|_| malformed(format!("invalid coordinate '{}'", coord)))?;
                let value: f32 = value
                    .parse()
                    .map_err(|_| malformed(format!("invalid score '{}'", value)))?;
                Ok(Block {
                    start,
                    span: header.span,
                    value,
                })
            }
        }
    }

    fn locate(&self, err: GenosetError) -> GenosetError {
        match err {
            GenosetError::MalformedReference { reason, .. } => GenosetError::MalformedReference {
                path: self.path.clone(),
                reason: format!("line {}: {}", self.line_no, reason),
            },
            other => other,
        }
    }
}

/// A directory of per-chromosome step files.
#[derive(Debug, Clone)]
pub struct ScoreReference {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl ScoreReference {
    /// List every candidate score file under `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(GenosetError::MalformedReference {
                path: dir.to_path_buf(),
                reason: "score reference must be a directory".to_string(),
            });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            files: list_files(dir, "wig"),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files whose base name contains `<chrom>.`.
    pub fn files_for(&self, chrom: &str) -> Vec<&Path> {
        let needle = format!("{}.", chrom);
        self.files
            .iter()
            .filter(|p| base_name(p).contains(&needle))
            .map(|p| p.as_path())
            .collect()
    }

    /// Open the single score file of `chrom`.
    pub fn cursor_for(&self, chrom: &str) -> Result<StepCursor<TextReader>> {
        let files = self.files_for(chrom);
        match files.as_slice() {
            [] => Err(GenosetError::MissingReference {
                chrom: chrom.to_string(),
                dir: self.dir.clone(),
            }),
            [path] => Ok(StepCursor::new(open_text(path)?, path)),
            many => Err(GenosetError::AmbiguousReference {
                chrom: chrom.to_string(),
                dir: self.dir.clone(),
                count: many.len(),
            }),
        }
    }

    /// Chromosome names inferred from file names (`...chrN.` fragments).
    pub fn chromosomes(&self) -> Vec<String> {
        let mut chroms: Vec<String> = self
            .files
            .iter()
            .filter_map(|p| {
                let name = base_name(p);
                let at = name.find("chr")?;
                let rest = &name[at..];
                let end = rest.find('.')?;
                Some(rest[..end].to_string())
            })
            .collect();
        chroms.sort();
        chroms.dedup();
        chroms
    }
}

/// Open a score reference directory for per-chromosome cursors.
pub fn load_score_reference_cursor(dir: &Path) -> Result<ScoreReference> {
    ScoreReference::open(dir)
}
