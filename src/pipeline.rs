/// pipeline.rs — Run orchestration for the CLI subcommands
///
///   prepare:
///     interval files → window → merge → sort → map branches
///       → full_datasets/merged_all.tsv → per class: reduce → split
///       → merge by category → final_datasets/<category>.tsv
///
///   resplit:
///     mapped file → keep configured branches → per class: reduce → split
///       → merge by category → final_datasets/<category>.tsv
///
///   map:
///     one interval file → window → map branches → one dataset file
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::branch::BranchMapper;
use crate::config::{ClassInput, RunConfig};
use crate::dataset::{load_from_file, merge_by_category, save_to_file, split, Dataset};
use crate::error::Result;
use crate::interval::Category;
use crate::logging::Diagnostics;
use crate::reference::References;

/// What a run read, kept and wrote.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Intervals read from interval files, or records of a reused file.
    pub read: usize,
    /// Records that resolved every branch.
    pub mapped: usize,
    pub per_category: BTreeMap<Category, usize>,
    pub written: Vec<PathBuf>,
}

/// Full run from interval files.
pub fn prepare(config: &RunConfig, diag: &dyn Diagnostics) -> Result<RunSummary> {
    config.validate(true)?;
    let mut summary = RunSummary::default();

    // ── Read intervals ────────────────────────────────────────────
    let mut per_class = Vec::with_capacity(config.classes.len());
    for class in &config.classes {
        let label = class.label();
        diag.info(&format!("reading class '{}' from {}", label, class.file.display()));
        per_class.push(Dataset::from_interval_file(
            &class.file,
            &label,
            &config.branches,
            config.window.as_ref(),
            diag,
        )?);
    }

    // Mapping all classes at once keeps a single pass over each reference.
    let mut merged = Dataset::concat(per_class)?;
    merged.klass = None;
    merged.sort();
    summary.read = merged.len();

    // ── Map branches ──────────────────────────────────────────────
    let references = config.load_references()?;
    let merged = map_dataset(config, &references, merged, diag)?;
    summary.mapped = merged.len();

    let full = save_to_file(&merged, &config.full_dataset_path(), config.compress)?;
    diag.info(&format!("mapped samples written to {}", full.display()));
    summary.written.push(full);

    split_and_export(config, &merged, &config.class_labels(), &mut summary, diag)?;
    Ok(summary)
}

/// Re-split an already mapped file with the configured branches.
pub fn resplit(config: &RunConfig, from: &Path, diag: &dyn Diagnostics) -> Result<RunSummary> {
    config.validate(false)?;
    let mut summary = RunSummary::default();

    diag.info(&format!("reading mapped samples from {}", from.display()));
    let mut merged = load_from_file(from)?.select_branches(&config.branches)?;
    merged.category = None;
    summary.read = merged.len();
    summary.mapped = merged.len();

    let full = save_to_file(&merged, &config.full_dataset_path(), config.compress)?;
    summary.written.push(full);

    let labels = if config.classes.is_empty() {
        merged.classes()
    } else {
        config.class_labels()
    };
    split_and_export(config, &merged, &labels, &mut summary, diag)?;
    Ok(summary)
}

/// Map one interval file without splitting.
pub fn map_only(
    config: &RunConfig,
    intervals: &Path,
    to: &Path,
    diag: &dyn Diagnostics,
) -> Result<RunSummary> {
    config.validate(false)?;
    let mut summary = RunSummary::default();

    let label = ClassInput {
        label: None,
        file: intervals.to_path_buf(),
    }
    .label();
    let dataset = Dataset::from_interval_file(
        intervals,
        &label,
        &config.branches,
        config.window.as_ref(),
        diag,
    )?;
    summary.read = dataset.len();

    let references = config.load_references()?;
    let dataset = map_dataset(config, &references, dataset, diag)?;
    summary.mapped = dataset.len();

    summary.written.push(save_to_file(&dataset, to, config.compress)?);
    Ok(summary)
}

fn map_dataset(
    config: &RunConfig,
    references: &References,
    mut dataset: Dataset,
    diag: &dyn Diagnostics,
) -> Result<Dataset> {
    let mapper = BranchMapper::new(references, diag)
        .strand_aware(config.strand)
        .encode_sequence(config.encode_sequence)
        .ncpu(config.threads());
    let records = std::mem::take(&mut dataset.records);
    dataset.records = mapper.map(records, &config.branches)?;
    Ok(dataset)
}

/// Reduce and split every class, regroup by category and write the
/// final files.
fn split_and_export(
    config: &RunConfig,
    merged: &Dataset,
    labels: &[String],
    summary: &mut RunSummary,
    diag: &dyn Diagnostics,
) -> Result<()> {
    let split_config = config.split_config()?;
    let mut parts = Vec::new();

    for label in labels {
        let mut dataset = merged.of_class(label);
        if dataset.is_empty() {
            diag.warn(&format!("class '{}' has no mapped samples", label));
        }
        if let Some(reduction) = config.reduce.get(label) {
            let before = dataset.len();
            dataset = dataset.reduce(*reduction, config.seed);
            diag.info(&format!("class '{}' reduced from {} to {}", label, before, dataset.len()));
        }
        parts.extend(split(dataset, &split_config, diag)?.into_values());
    }

    for (category, dataset) in merge_by_category(parts)? {
        let path = save_to_file(&dataset, &config.final_dataset_path(category), config.compress)?;
        summary.per_category.insert(category, dataset.len());
        summary.written.push(path);
    }
    Ok(())
}

/// Format byte count as human-readable string.
fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Print a summary report to stderr.
pub fn print_summary(summary: &RunSummary) {
    eprintln!();
    eprintln!(
        "  {} intervals read  |  {} mapped  |  {} dropped",
        summary.read,
        summary.mapped,
        summary.read.saturating_sub(summary.mapped)
    );
    if !summary.per_category.is_empty() {
        let counts: Vec<String> = summary
            .per_category
            .iter()
            .map(|(c, n)| format!("{} {}", n, c))
            .collect();
        eprintln!("  {}", counts.join("  |  "));
    }
    if !summary.written.is_empty() {
        eprintln!();
        eprintln!("  Written:");
        for path in &summary.written {
            let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            eprintln!("    {}  ({})", path.display(), human_size(size));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::{Branch, BranchValue};
    use crate::logging::NoopDiagnostics;
    use tempfile::tempdir;

    const GENOME: &str = "ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGT";

    fn write_inputs(dir: &Path) {
        let fasta = format!(">chr1\n{}\n>chr2\n{}\n>chr3\n{}\n", GENOME, GENOME, GENOME);
        fs::write(dir.join("ref.fa"), fasta).unwrap();

        let mut bound = String::new();
        let mut unbound = String::new();
        for chrom in ["chr1", "chr2", "chr3"] {
            for i in 0..4 {
                bound.push_str(&format!("{}\t{}\t{}\tp\t0\t+\n", chrom, i * 8, i * 8 + 6));
                unbound.push_str(&format!("{}\t{}\t{}\tn\t0\t-\n", chrom, 32 + i * 8, 32 + i * 8 + 6));
            }
        }
        // past the chromosome end, dropped while mapping
        bound.push_str("chr1\t60\t70\tp\t0\t+\n");
        fs::write(dir.join("bound.bed"), bound).unwrap();
        fs::write(dir.join("unbound.bed"), unbound).unwrap();
    }

    fn run_file(dir: &Path, extra: &str) -> RunConfig {
        let text = format!(
            r#"
            output = "out"
            branches = ["seq"]
            encode_sequence = false
            ncpu = 1
            {extra}

            [references]
            fasta = "ref.fa"

            [[classes]]
            file = "bound.bed"

            [[classes]]
            file = "unbound.bed"

            [split]
            mode = "chromosome"
            train = ["chr1"]
            validation = ["chr2"]
            test = ["chr3"]
            "#
        );
        let path = dir.join("run.toml");
        fs::write(&path, text).unwrap();
        RunConfig::load(&path).unwrap()
    }

    #[test]
    fn test_prepare_writes_every_stage() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        let config = run_file(dir.path(), "");

        let summary = prepare(&config, &NoopDiagnostics).unwrap();
        assert_eq!(summary.read, 25);
        assert_eq!(summary.mapped, 24);
        assert_eq!(summary.per_category[&Category::Train], 8);
        assert_eq!(summary.per_category[&Category::Test], 8);

        let merged = load_from_file(&dir.path().join("out/full_datasets/merged_all.tsv.zip")).unwrap();
        assert_eq!(merged.len(), 24);
        assert_eq!(merged.records[0].chrom, "chr1");

        let train = load_from_file(&dir.path().join("out/final_datasets/train.tsv.zip")).unwrap();
        assert_eq!(train.category, Some(Category::Train));
        assert!(train.records.iter().all(|r| r.chrom == "chr1"));
        assert_eq!(train.classes(), vec!["bound".to_string(), "unbound".to_string()]);

        // reverse-strand intervals are complemented
        let first_unbound = train.records.iter().find(|r| r.klass == "unbound").unwrap();
        assert_eq!(
            first_unbound.value(Branch::Sequence),
            Some(&BranchValue::Bases("TGCATG".to_string()))
        );
    }

    #[test]
    fn test_resplit_reuses_mapped_file() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        let config = run_file(dir.path(), "compress = false");
        prepare(&config, &NoopDiagnostics).unwrap();

        let mapped = dir.path().join("mapped.tsv");
        fs::copy(dir.path().join("out/full_datasets/merged_all.tsv"), &mapped).unwrap();

        let text = "output = \"again\"\nbranches = [\"seq\"]\ncompress = false\n\
             [references]\nfasta = \"ref.fa\"\n\
             [split]\nmode = \"random\"\nratio = \"1:1:0:0\"\nseed = 3\n\
             [reduce]\nunbound = 0.5\n";
        let path = dir.path().join("again.toml");
        fs::write(&path, text).unwrap();
        let again = RunConfig::load(&path).unwrap();

        let summary = resplit(&again, &mapped, &NoopDiagnostics).unwrap();
        assert_eq!(summary.read, 24);
        // bound: 12 → 6 + 6; unbound reduced to 6 → 3 + 3
        assert_eq!(summary.per_category[&Category::Train], 9);
        assert_eq!(summary.per_category[&Category::Validation], 9);
        assert_eq!(summary.per_category[&Category::Blackbox], 0);
        assert!(dir.path().join("again/final_datasets/test.tsv").exists());
    }

    #[test]
    fn test_map_only_keeps_input_order() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        fs::write(dir.path().join("query.bed"), "chr2\t8\t12\nchr1\t0\t4\n").unwrap();
        let config = run_file(dir.path(), "compress = false");

        let to = dir.path().join("predict/query.tsv");
        let summary = map_only(&config, &dir.path().join("query.bed"), &to, &NoopDiagnostics).unwrap();
        assert_eq!(summary.mapped, 2);

        let mapped = load_from_file(&to).unwrap();
        let keys: Vec<String> = mapped.records.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["chr2_8_12_._query", "chr1_0_4_._query"]);
    }
}
