/// branch/fold.rs — Secondary structure through an external folding tool
///
/// Writes the batch as FASTA to a temporary file, runs the folder over it
/// and waits for it to finish, then reads structures back from stdout in
/// input order. The temporary file is removed when this module returns,
/// whatever the outcome.
///
/// EXPECTED OUTPUT (three lines per record)
/// ───────────────────────────────────────────────────────────────────────
///  >chr1_100_110_+_bound
///  GGGAAACCCA
///  (((...))). ( -1.20)
/// ───────────────────────────────────────────────────────────────────────
///
/// The structure is the first whitespace token of the third line.
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use tempfile::NamedTempFile;

use crate::branch::alphabet::{one_hot, STRUCTURE_ALPHABET};
use crate::branch::{Branch, BranchValue};
use crate::error::{GenosetError, Result};
use crate::interval::IntervalRecord;

pub const DEFAULT_FOLDING_BIN: &str = "RNAfold";
pub const FOLDING_ENV_BIN: &str = "GENOSET_RNAFOLD_BIN";

const LINES_PER_RECORD: usize = 3;

/// Executable to run: the configured one, else the environment
/// override, else `RNAfold` from PATH.
pub fn folding_executable(configured: Option<&Path>) -> String {
    if let Some(path) = configured {
        return path.display().to_string();
    }
    std::env::var(FOLDING_ENV_BIN)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_FOLDING_BIN.to_string())
}

#[derive(Debug, Clone)]
pub struct FoldingTool {
    executable: String,
    jobs: usize,
}

impl FoldingTool {
    pub fn new(configured: Option<&Path>, jobs: usize) -> Self {
        Self {
            executable: folding_executable(configured),
            jobs: jobs.max(1),
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Fold `sequences[i]` for `records[i]` and attach the one-hot
    /// structure to each record.
    pub fn fold(
        &self,
        records: Vec<IntervalRecord>,
        sequences: &[String],
    ) -> Result<Vec<IntervalRecord>> {
        if records.is_empty() {
            return Ok(records);
        }

        let mut fasta = NamedTempFile::new()?;
        {
            let mut w = std::io::BufWriter::new(fasta.as_file_mut());
            for (record, seq) in records.iter().zip(sequences) {
                writeln!(w, ">{}", record.key())?;
                writeln!(w, "{}", seq)?;
            }
            w.flush()?;
        }

        let stdout = self.run(fasta.path())?;
        attach_structures(records, &stdout)
    }

    fn run(&self, input: &Path) -> Result<String> {
        let args = vec![
            "--noPS".to_string(),
            format!("--jobs={}", self.jobs),
            input.display().to_string(),
        ];

        let output = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    GenosetError::ToolNotFound {
                        executable: self.executable.clone(),
                        env: FOLDING_ENV_BIN.to_string(),
                    }
                } else {
                    GenosetError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(GenosetError::ToolFailed {
                cmd: format!("{} {}", self.executable, args.join(" ")),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Attach the structures in `stdout` to `records`, in order. Nothing is
/// attached unless the output has exactly three lines per record.
pub fn attach_structures(records: Vec<IntervalRecord>, stdout: &str) -> Result<Vec<IntervalRecord>> {
    let lines: Vec<&str> = stdout.lines().filter(|l| !l.trim().is_empty()).collect();
    let expected = records.len() * LINES_PER_RECORD;
    if lines.len() != expected {
        return Err(GenosetError::FoldingCountMismatch {
            records: records.len(),
            lines: lines.len(),
            expected,
        });
    }

    // Encode everything first so a bad record leaves the batch untouched.
    let mut encoded = Vec::with_capacity(records.len());
    for (record, block) in records.iter().zip(lines.chunks(LINES_PER_RECORD)) {
        let structure = block[2].split_whitespace().next().unwrap_or("");
        encoded.push(encode_structure(record, structure)?);
    }

    Ok(records
        .into_iter()
        .zip(encoded)
        .map(|(r, v)| r.into_builder().branch(Branch::Structure, v).build())
        .collect())
}

fn encode_structure(record: &IntervalRecord, structure: &str) -> Result<BranchValue> {
    let actual = structure.chars().count();
    let expected = record.len() as usize;
    if actual != expected {
        return Err(GenosetError::StructureLengthMismatch {
            key: record.key(),
            expected,
            actual,
        });
    }
    structure
        .chars()
        .map(|c| {
            one_hot(c, STRUCTURE_ALPHABET).ok_or_else(|| GenosetError::InvalidStructure {
                key: record.key(),
                symbol: c,
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(BranchValue::OneHot)
}

/// Executable shell script standing in for the folding binary.
#[cfg(all(test, unix))]
pub(crate) fn fake_tool(dir: &Path, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("fake-rnafold");
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Strand;

    fn records() -> Vec<IntervalRecord> {
        vec![
            IntervalRecord::new("chr1", 0, 4, Strand::Forward, "a"),
            IntervalRecord::new("chr1", 10, 13, Strand::Reverse, "a"),
        ]
    }

    #[test]
    fn test_structures_attached_in_order() {
        let stdout = ">chr1_0_4_+_a\nGGCC\n(..) ( -0.40)\n>chr1_10_13_-_a\nAAA\n... (  0.00)\n";
        let out = attach_structures(records(), stdout).unwrap();
        let first = out[0].value(Branch::Structure).unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(
            first.to_matrix()[0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
        assert_eq!(out[1].value(Branch::Structure).unwrap().len(), 3);
    }

    #[test]
    fn test_line_count_mismatch_updates_nothing() {
        let stdout = ">chr1_0_4_+_a\nGGCC\n(..) ( -0.40)\n>chr1_10_13_-_a\nAAA\n";
        let err = attach_structures(records(), stdout).unwrap_err();
        assert!(matches!(
            err,
            GenosetError::FoldingCountMismatch { records: 2, lines: 5, expected: 6 }
        ));
    }

    #[test]
    fn test_structure_length_checked() {
        let stdout = ">a\nGGCC\n(...) ( -0.40)\n>b\nAAA\n... (  0.00)\n";
        let err = attach_structures(records(), stdout).unwrap_err();
        assert!(matches!(err, GenosetError::StructureLengthMismatch { expected: 4, actual: 5, .. }));
    }

    #[test]
    fn test_unknown_symbol_rejected() {
        let stdout = ">a\nGGCC\n(..] ( -0.40)\n>b\nAAA\n... (  0.00)\n";
        let err = attach_structures(records(), stdout).unwrap_err();
        assert!(matches!(err, GenosetError::InvalidStructure { symbol: ']', .. }));
    }

    #[test]
    fn test_configured_executable_wins() {
        assert_eq!(folding_executable(Some(Path::new("/opt/vienna/RNAfold"))), "/opt/vienna/RNAfold");
    }

    #[test]
    fn test_missing_tool() {
        let tool = FoldingTool::new(Some(Path::new("/nonexistent/genoset-rnafold")), 2);
        let err = tool
            .fold(records(), &["GGCC".to_string(), "AAA".to_string()])
            .unwrap_err();
        assert!(matches!(err, GenosetError::ToolNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_fake_tool_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let script = "#!/bin/sh\n\
            for last; do :; done\n\
            while read -r name; do\n\
              read -r seq\n\
              echo \"$name\"\n\
              echo \"$seq\"\n\
              echo \"$(echo \"$seq\" | tr 'ACGTN' '.....') (  0.00)\"\n\
            done < \"$last\"\n";
        let tool = FoldingTool::new(Some(&fake_tool(dir.path(), script)), 2);

        let out = tool
            .fold(records(), &["GGCC".to_string(), "AAA".to_string()])
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].value(Branch::Structure).unwrap().len(), 4);
        assert_eq!(out[1].value(Branch::Structure).unwrap().len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_fake_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FoldingTool::new(
            Some(&fake_tool(dir.path(), "#!/bin/sh\necho broken >&2\nexit 3\n")),
            1,
        );
        let err = tool.fold(records(), &["GGCC".to_string(), "AAA".to_string()]).unwrap_err();
        match err {
            GenosetError::ToolFailed { code, stderr, .. } => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
