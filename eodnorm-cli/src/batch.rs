//! Parallel batch normalization over many symbols.
//!
//! Each symbol is read, normalized and written independently; one symbol's
//! failure never stops the others. The run ends with `summary.json` and,
//! when anything failed, `failed_symbols.txt` in the output directory.

use crate::symbols::InputJob;
use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDateTime};
use eodnorm_core::data::{output_path, write_series, OutputFormat, RawIngestor};
use eodnorm_core::stages::DateWindow;
use eodnorm_core::{NormalizeReport, NormalizedSeries, Normalizer};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const SUMMARY_FILE: &str = "summary.json";
pub const FAILED_FILE: &str = "failed_symbols.txt";

/// Where and how outputs are written.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub dir: PathBuf,
    pub format: OutputFormat,
    pub include_symbol: bool,
}

/// Result for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub rows: usize,
    /// blake3 of the serialized output rows.
    pub data_hash: Option<String>,
    pub report: Option<NormalizeReport>,
    pub error: Option<String>,
}

impl SymbolOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    fn failed(job: &InputJob, error: String) -> Self {
        Self {
            symbol: job.request.symbol.clone(),
            input: job.path.clone(),
            output: None,
            rows: 0,
            data_hash: None,
            report: None,
            error: Some(error),
        }
    }
}

/// Everything a batch run did, as written to `summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    pub format: OutputFormat,
    pub calendar_days: Option<usize>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Symbols whose report carries warnings.
    pub with_warnings: usize,
    pub symbols: Vec<SymbolOutcome>,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn failed_symbols(&self) -> Vec<&str> {
        self.symbols
            .iter()
            .filter(|o| !o.succeeded())
            .map(|o| o.symbol.as_str())
            .collect()
    }
}

fn series_hash(series: &NormalizedSeries) -> Result<String> {
    let bytes = serde_json::to_vec(series.rows()).context("hash serialization")?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn run_one(
    normalizer: &Normalizer,
    ingestor: &RawIngestor,
    job: &InputJob,
    output: &OutputOptions,
) -> Result<SymbolOutcome> {
    let symbol = job.request.symbol.as_str();
    let input = job
        .path
        .as_deref()
        .ok_or_else(|| anyhow!("no input file for {symbol}"))?;

    let raw = ingestor.ingest(input)?;
    let window = DateWindow::new(job.request.start, job.request.end);
    let normalized = normalizer.normalize_within(symbol, &raw, None, window)?;

    let path = output_path(&output.dir, symbol, output.format);
    write_series(&normalized.series, &path, output.format, output.include_symbol)?;

    Ok(SymbolOutcome {
        symbol: symbol.to_string(),
        input: Some(input.to_path_buf()),
        output: Some(path),
        rows: normalized.series.len(),
        data_hash: Some(series_hash(&normalized.series)?),
        report: Some(normalized.report),
        error: None,
    })
}

/// Normalize every job in parallel and collect the outcomes in job order.
pub fn run_batch(normalizer: &Normalizer, jobs: &[InputJob], output: &OutputOptions) -> BatchSummary {
    let started_at = Local::now().naive_local();
    let ingestor = RawIngestor::new().with_full_inference();

    info!(
        symbols = jobs.len(),
        output_dir = %output.dir.display(),
        calendar = normalizer.calendar().is_some(),
        "starting batch"
    );

    let symbols: Vec<SymbolOutcome> = jobs
        .par_iter()
        .map(|job| match run_one(normalizer, &ingestor, job, output) {
            Ok(outcome) => {
                info!(symbol = %outcome.symbol, rows = outcome.rows, "normalized");
                outcome
            }
            Err(e) => {
                error!(symbol = %job.request.symbol, error = %format!("{e:#}"), "symbol failed");
                SymbolOutcome::failed(job, format!("{e:#}"))
            }
        })
        .collect();

    let succeeded = symbols.iter().filter(|o| o.succeeded()).count();
    let with_warnings = symbols
        .iter()
        .filter(|o| o.report.as_ref().is_some_and(|r| r.has_warnings()))
        .count();

    BatchSummary {
        started_at,
        finished_at: Local::now().naive_local(),
        format: output.format,
        calendar_days: normalizer.calendar().map(|c| c.len()),
        total: symbols.len(),
        succeeded,
        failed: symbols.len() - succeeded,
        with_warnings,
        symbols,
    }
}

/// Write `summary.json` and, if needed, `failed_symbols.txt`.
pub fn write_summary(summary: &BatchSummary, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let path = dir.join(SUMMARY_FILE);
    let json = serde_json::to_string_pretty(summary).context("summary serialization")?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;

    let failed_path = dir.join(FAILED_FILE);
    let failed = summary.failed_symbols();
    if failed.is_empty() {
        if failed_path.exists() {
            fs::remove_file(&failed_path)
                .with_context(|| format!("removing stale {}", failed_path.display()))?;
        }
    } else {
        warn!(count = failed.len(), path = %failed_path.display(), "some symbols failed");
        let mut content = failed.join("\n");
        content.push('\n');
        fs::write(&failed_path, content)
            .with_context(|| format!("writing {}", failed_path.display()))?;
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{discover_jobs, SymbolRequest};
    use eodnorm_core::{NormalizeConfig, TradingCalendar};
    use std::sync::Arc;

    const RAW: &str = "\
S_INFO_WINDCODE,TRADE_DT,S_DQ_OPEN,S_DQ_HIGH,S_DQ_LOW,S_DQ_CLOSE,S_DQ_VOLUME,S_DQ_AMOUNT,S_DQ_ADJCLOSE
600000.SH,20240102,10,10.5,9.5,10,100,1000,20
600000.SH,20240103,10,10.5,9.5,10,100,1000,20
600000.SH,20240105,11,11.5,10.5,11,100,1100,22
";

    fn output(dir: &Path) -> OutputOptions {
        OutputOptions {
            dir: dir.to_path_buf(),
            format: OutputFormat::Csv,
            include_symbol: true,
        }
    }

    #[test]
    fn batch_writes_outputs_and_summary() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(input.path().join("600000.SH_20240101_20240131.csv"), RAW).unwrap();

        let calendar = TradingCalendar::parse("20240102\n20240103\n20240104\n20240105\n");
        let normalizer = Normalizer::new(NormalizeConfig::default(), Some(Arc::new(calendar)));
        let mut jobs = discover_jobs(input.path()).unwrap();
        jobs.push(InputJob {
            request: SymbolRequest::new("000001.SZ"),
            path: None,
        });

        let summary = run_batch(&normalizer, &jobs, &output(out.path()));
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed_symbols(), vec!["000001.SZ"]);
        assert_eq!(summary.calendar_days, Some(4));

        let ok = &summary.symbols[0];
        assert_eq!(ok.symbol, "600000.SH");
        assert_eq!(ok.rows, 4);
        assert_eq!(ok.data_hash.as_ref().map(|h| h.len()), Some(64));
        assert!(out.path().join("600000.SH.csv").exists());

        let summary_path = write_summary(&summary, out.path()).unwrap();
        let parsed: BatchSummary =
            serde_json::from_str(&fs::read_to_string(summary_path).unwrap()).unwrap();
        assert_eq!(parsed.failed, 1);
        assert_eq!(
            fs::read_to_string(out.path().join(FAILED_FILE)).unwrap(),
            "000001.SZ\n"
        );
    }

    #[test]
    fn identical_input_hashes_identically() {
        let input = tempfile::tempdir().unwrap();
        fs::write(input.path().join("A.csv"), RAW).unwrap();
        fs::write(input.path().join("B.csv"), RAW).unwrap();
        let out = tempfile::tempdir().unwrap();

        let jobs = discover_jobs(input.path()).unwrap();
        let summary = run_batch(&Normalizer::default(), &jobs, &output(out.path()));
        assert!(summary.all_succeeded());
        assert_eq!(summary.symbols[0].data_hash, summary.symbols[1].data_hash);
    }

    #[test]
    fn clean_run_removes_stale_failure_list() {
        let out = tempfile::tempdir().unwrap();
        fs::write(out.path().join(FAILED_FILE), "OLD\n").unwrap();
        let summary = run_batch(&Normalizer::default(), &[], &output(out.path()));
        write_summary(&summary, out.path()).unwrap();
        assert!(!out.path().join(FAILED_FILE).exists());
        assert!(out.path().join(SUMMARY_FILE).exists());
    }
}
