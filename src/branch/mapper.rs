/// branch/mapper.rs — Resolve branch values for a list of records
///
/// Branches are resolved one after the other. Each step receives the
/// records that survived the previous one, so a record dropped for its
/// sequence is never looked up in the score files or folded.
///
/// Drops are never errors: records on absent chromosomes, past the
/// chromosome end, or whose first score is missing are logged and left
/// out. Integrity problems (a score run shorter than the interval, a
/// folding output that does not line up) abort the batch.
use std::collections::HashMap;

use rayon::prelude::*;

use crate::branch::alphabet::{complement, one_hot_encode, SEQUENCE_ALPHABET};
use crate::branch::fold::FoldingTool;
use crate::branch::{Branch, BranchValue};
use crate::error::{GenosetError, Result};
use crate::interval::{IntervalRecord, Strand};
use crate::logging::Diagnostics;
use crate::reference::{GenomicReference, References, ScoreReference};

pub struct BranchMapper<'a> {
    references: &'a References,
    strand_aware: bool,
    encode_sequence: bool,
    ncpu: usize,
    diag: &'a dyn Diagnostics,
}

impl<'a> BranchMapper<'a> {
    /// Strand-aware, one-hot sequences, single worker.
    pub fn new(references: &'a References, diag: &'a dyn Diagnostics) -> Self {
        Self {
            references,
            strand_aware: true,
            encode_sequence: true,
            ncpu: 1,
            diag,
        }
    }

    pub fn strand_aware(mut self, on: bool) -> Self {
        self.strand_aware = on;
        self
    }

    pub fn encode_sequence(mut self, on: bool) -> Self {
        self.encode_sequence = on;
        self
    }

    pub fn ncpu(mut self, ncpu: usize) -> Self {
        self.ncpu = ncpu.max(1);
        self
    }

    /// Resolve `branches` in order, each step filtering the list.
    pub fn map(&self, records: Vec<IntervalRecord>, branches: &[Branch]) -> Result<Vec<IntervalRecord>> {
        let mut working = records;
        for &branch in branches {
            let before = working.len();
            working = match branch {
                Branch::Sequence => self.map_sequence(working)?,
                Branch::Conservation => self.map_conservation(working)?,
                Branch::Structure => self.map_structure(working)?,
            };
            self.diag.info(&format!(
                "branch {}: {} of {} records mapped",
                branch,
                working.len(),
                before
            ));
        }
        Ok(working)
    }

    // ── sequence ──────────────────────────────────────────────────────

    pub fn map_sequence(&self, records: Vec<IntervalRecord>) -> Result<Vec<IntervalRecord>> {
        let reference = self.sequence_reference(Branch::Sequence)?;
        let mut out = Vec::with_capacity(records.len());
        let mut dropped = 0usize;

        for record in records {
            let Some(bases) = self.strand_bases(reference, &record) else {
                dropped += 1;
                continue;
            };
            let value = if self.encode_sequence {
                match one_hot_encode(&bases, SEQUENCE_ALPHABET) {
                    Some(rows) => BranchValue::OneHot(rows),
                    None => BranchValue::Bases(bases),
                }
            } else {
                BranchValue::Bases(bases)
            };
            out.push(record.into_builder().branch(Branch::Sequence, value).build());
        }

        self.report_dropped(Branch::Sequence, dropped);
        Ok(out)
    }

    /// Bases of `[start, end)`, complemented for reverse-strand records
    /// when strand-aware. None (and a debug notice) when unresolvable.
    fn strand_bases(&self, reference: &GenomicReference, record: &IntervalRecord) -> Option<String> {
        let Some(bases) = reference.slice(&record.chrom, record.start, record.end) else {
            let reason = if reference.get(&record.chrom).is_none() {
                "chromosome not in the reference"
            } else {
                "interval runs past the chromosome end"
            };
            self.diag.debug(&format!("dropping {}: {}", record.key(), reason));
            return None;
        };
        if self.strand_aware && record.strand == Strand::Reverse {
            Some(complement(bases))
        } else {
            Some(bases.to_string())
        }
    }

    // ── conservation ──────────────────────────────────────────────────

    /// One cursor per chromosome, chromosomes spread over a worker pool.
    /// Output keeps the input order.
    pub fn map_conservation(&self, records: Vec<IntervalRecord>) -> Result<Vec<IntervalRecord>> {
        let scores = self.references.scores.as_ref().ok_or_else(|| {
            GenosetError::Config("the cons branch needs a conservation reference".to_string())
        })?;

        let mut groups: Vec<(String, Vec<(usize, IntervalRecord)>)> = Vec::new();
        let mut slot: HashMap<String, usize> = HashMap::new();
        for (idx, record) in records.into_iter().enumerate() {
            let g = *slot.entry(record.chrom.clone()).or_insert_with(|| {
                groups.push((record.chrom.clone(), Vec::new()));
                groups.len() - 1
            });
            groups[g].1.push((idx, record));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.ncpu)
            .build()?;
        let mapped: Vec<Vec<(usize, IntervalRecord)>> = pool.install(|| {
            groups
                .into_par_iter()
                .map(|(chrom, group)| self.conservation_for_chrom(scores, &chrom, group))
                .collect::<Result<Vec<_>>>()
        })?;

        let mut flat: Vec<(usize, IntervalRecord)> = mapped.into_iter().flatten().collect();
        flat.sort_by_key(|(idx, _)| *idx);
        Ok(flat.into_iter().map(|(_, r)| r).collect())
    }

    fn conservation_for_chrom(
        &self,
        scores: &ScoreReference,
        chrom: &str,
        mut group: Vec<(usize, IntervalRecord)>,
    ) -> Result<Vec<(usize, IntervalRecord)>> {
        let mut cursor = match scores.cursor_for(chrom) {
            Ok(cursor) => cursor,
            Err(e @ (GenosetError::MissingReference { .. } | GenosetError::AmbiguousReference { .. })) => {
                self.diag.warn(&format!("{}; dropping {} records on {}", e, group.len(), chrom));
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        // The cursor only moves forward.
        group.sort_by_key(|(_, r)| (r.start, r.end));

        let mut out = Vec::with_capacity(group.len());
        let mut dropped = 0usize;
        for (idx, record) in group {
            if cursor.overshot(record.start) || cursor.advance_to(record.start)?.is_none() {
                self.diag.debug(&format!("dropping {}: no score at its start", record.key()));
                dropped += 1;
                continue;
            }
            let values = cursor.scores(record.start, record.end)?;
            let expected = record.len() as usize;
            if values.len() != expected {
                return Err(GenosetError::ScoreLengthMismatch {
                    key: record.key(),
                    expected,
                    actual: values.len(),
                });
            }
            out.push((
                idx,
                record
                    .into_builder()
                    .branch(Branch::Conservation, BranchValue::Scores(values))
                    .build(),
            ));
        }

        if dropped > 0 {
            self.diag.info(&format!("{}: {} records without conservation scores", chrom, dropped));
        }
        Ok(out)
    }

    // ── structure ─────────────────────────────────────────────────────

    /// Fold the strand-applied bases of every resolvable record.
    pub fn map_structure(&self, records: Vec<IntervalRecord>) -> Result<Vec<IntervalRecord>> {
        let reference = self.sequence_reference(Branch::Structure)?;
        let mut kept = Vec::with_capacity(records.len());
        let mut sequences = Vec::with_capacity(records.len());
        let mut dropped = 0usize;

        for record in records {
            match self.strand_bases(reference, &record) {
                Some(bases) => {
                    sequences.push(bases);
                    kept.push(record);
                }
                None => dropped += 1,
            }
        }
        self.report_dropped(Branch::Structure, dropped);

        let tool = FoldingTool::new(self.references.folding_tool.as_deref(), self.ncpu);
        self.diag.debug(&format!("folding {} sequences with {}", kept.len(), tool.executable()));
        tool.fold(kept, &sequences)
    }

    fn sequence_reference(&self, branch: Branch) -> Result<&'a GenomicReference> {
        self.references.sequence.as_ref().ok_or_else(|| {
            GenosetError::Config(format!("the {} branch needs a sequence reference", branch))
        })
    }

    fn report_dropped(&self, branch: Branch, dropped: usize) {
        if dropped > 0 {
            self.diag.info(&format!(
                "branch {}: dropped {} records outside the sequence reference",
                branch, dropped
            ));
        }
    }
}
