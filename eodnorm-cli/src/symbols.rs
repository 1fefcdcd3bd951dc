//! Symbol lists and input-file discovery.
//!
//! Input files are named `{SYMBOL}.csv` or `{SYMBOL}_{anything}.csv`; the
//! symbol is the file stem up to the first `_`. A symbol list is a
//! tab-separated file with one `symbol [start [end]]` entry per line.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use eodnorm_core::calendar::parse_trading_date;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const HEADER_TOKENS: [&str; 4] = ["symbol", "ticker", "code", "代码"];
const INPUT_EXTENSIONS: [&str; 2] = ["csv", "parquet"];

/// One line of a symbol list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRequest {
    pub symbol: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl SymbolRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            start: None,
            end: None,
        }
    }
}

/// A symbol paired with the file it will be read from.
#[derive(Debug, Clone)]
pub struct InputJob {
    pub request: SymbolRequest,
    pub path: Option<PathBuf>,
}

/// Symbol encoded in an input file name.
pub fn symbol_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let symbol = stem.split('_').next().unwrap_or(stem).trim();
    (!symbol.is_empty()).then(|| symbol.to_string())
}

fn is_input_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| INPUT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading input directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| is_input_file(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Read a tab-separated symbol list.
///
/// Header-looking lines are skipped and repeated symbols keep their first
/// entry. Dates accept `YYYYMMDD` or ISO form; an unparseable date leaves
/// that bound open.
pub fn load_symbol_list(path: &Path) -> Result<Vec<SymbolRequest>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening symbol list {}", path.display()))?;

    let mut seen = HashSet::new();
    let mut requests = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("reading symbol list {}", path.display()))?;
        let Some(symbol) = record.get(0).filter(|s| !s.is_empty()) else {
            continue;
        };
        if HEADER_TOKENS.contains(&symbol.to_lowercase().as_str()) {
            continue;
        }
        if !seen.insert(symbol.to_string()) {
            debug!(symbol, "duplicate entry in symbol list");
            continue;
        }
        let bound = |i: usize| {
            record
                .get(i)
                .filter(|s| !s.is_empty())
                .and_then(|s| parse_trading_date(s, "%Y%m%d"))
        };
        requests.push(SymbolRequest {
            symbol: symbol.to_string(),
            start: bound(1),
            end: bound(2),
        });
    }
    Ok(requests)
}

/// One job per symbol found in `dir`.
pub fn discover_jobs(dir: &Path) -> Result<Vec<InputJob>> {
    let mut seen = HashSet::new();
    let mut jobs = Vec::new();
    for path in input_files(dir)? {
        let Some(symbol) = symbol_from_path(&path) else {
            continue;
        };
        if !seen.insert(symbol.clone()) {
            warn!(symbol, path = %path.display(), "more than one input file; using the first");
            continue;
        }
        jobs.push(InputJob {
            request: SymbolRequest::new(symbol),
            path: Some(path),
        });
    }
    Ok(jobs)
}

/// Pair each requested symbol with its input file in `dir`, if any.
pub fn resolve_jobs(dir: &Path, requests: Vec<SymbolRequest>) -> Result<Vec<InputJob>> {
    let files = input_files(dir)?;
    Ok(requests
        .into_iter()
        .map(|request| {
            let path = files
                .iter()
                .find(|p| symbol_from_path(p).as_deref() == Some(request.symbol.as_str()))
                .cloned();
            InputJob { request, path }
        })
        .collect())
}
