//! Command line inspection for N-body simulator output.
//!
//! The binary (`nbody-inspect`) is a thin layer: it reads files, hands the
//! text to `nbody_trace`, and prints or exports the results. Everything it
//! reports is built here so it can be tested without a terminal.

pub mod export;
pub mod summary;

pub use export::{ExportBody, ExportFrame, TraceExport};
pub use summary::{BenchmarkGroup, BenchmarkSummary, TraceSummary};

use anyhow::{Context, Result};
use nbody_trace::benchmark::{parse_records, parse_run_log, BenchmarkRecord};
use nbody_trace::{ParsedTrace, ReaderConfig, TraceReader};
use std::path::Path;
use tracing::{debug, warn};

/// Reads and parses a trace file.
pub fn load_trace(path: &Path, config: ReaderConfig) -> Result<ParsedTrace> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace {}", path.display()))?;
    let parsed = TraceReader::new(config)
        .parse(&text)
        .with_context(|| format!("Failed to parse trace {}", path.display()))?;
    Ok(parsed)
}

/// Reads benchmark records, either a raw run log or a JSON array.
pub fn load_benchmarks(path: &Path, raw_log: bool) -> Result<Vec<BenchmarkRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read benchmarks {}", path.display()))?;
    let records = if raw_log {
        parse_run_log(&text)
    } else {
        parse_records(&text)
    };
    records.with_context(|| format!("Failed to parse benchmarks {}", path.display()))
}

/// Collates batch job logs into benchmark records.
///
/// Every `<name>.out` in `out_dir` is paired with `<name>.log` in `err_dir`.
/// A job whose logs are missing or unreadable still yields a record carrying
/// only its name, so it shows up as incomplete.
pub fn collate_job_logs(out_dir: &Path, err_dir: &Path) -> Result<Vec<BenchmarkRecord>> {
    let entries = std::fs::read_dir(out_dir)
        .with_context(|| format!("Failed to list job output {}", out_dir.display()))?;

    let mut stdout_paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "out") {
            stdout_paths.push(path);
        }
    }
    stdout_paths.sort();

    let mut records = Vec::with_capacity(stdout_paths.len());
    for stdout_path in stdout_paths {
        let Some(name) = stdout_path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let stderr_path = err_dir.join(format!("{}.log", name));

        let collated = std::fs::read_to_string(&stdout_path)
            .with_context(|| format!("Failed to read {}", stdout_path.display()))
            .and_then(|stdout| {
                let stderr = std::fs::read_to_string(&stderr_path)
                    .with_context(|| format!("Failed to read {}", stderr_path.display()))?;
                Ok(BenchmarkRecord::from_job_logs(&stdout, &stderr)?)
            });

        let mut record = match collated {
            Ok(record) => {
                debug!("Collated job {}", name);
                record
            }
            Err(err) => {
                warn!("Job {} incomplete: {:#}", name, err);
                BenchmarkRecord::default()
            }
        };
        record.name.get_or_insert(name);
        records.push(record);
    }

    Ok(records)
}

/// Resolves a possibly negative timestep index (`-1` is the last one).
pub fn resolve_index(len: usize, index: i64) -> Option<usize> {
    if index >= 0 {
        let index = usize::try_from(index).ok()?;
        (index < len).then_some(index)
    } else {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_index() {
        assert_eq!(resolve_index(3, 0), Some(0));
        assert_eq!(resolve_index(3, 2), Some(2));
        assert_eq!(resolve_index(3, 3), None);
        assert_eq!(resolve_index(3, -1), Some(2));
        assert_eq!(resolve_index(3, -3), Some(0));
        assert_eq!(resolve_index(3, -4), None);
        assert_eq!(resolve_index(0, -1), None);
    }

    #[test]
    fn test_collate_job_logs() {
        let root = std::env::temp_dir().join(format!("nbody-inspect-collate-{}", std::process::id()));
        let out_dir = root.join("batchout");
        let err_dir = root.join("batcherr");
        std::fs::create_dir_all(&out_dir).unwrap();
        std::fs::create_dir_all(&err_dir).unwrap();

        std::fs::write(out_dir.join("b4.out"), "SLURM_JOB_ID=7\n----------------\n").unwrap();
        std::fs::write(
            err_dir.join("b4.log"),
            "'numBodies': 4, 'barnesHut': false,\n\nreal 0m1.000s\nuser 0m0.750s\nsys 0m0.250s\n",
        )
        .unwrap();
        std::fs::write(out_dir.join("b8.out"), "SLURM_JOB_ID=8\n----------------\n").unwrap();

        let records = collate_job_logs(&out_dir, &err_dir).unwrap();
        std::fs::remove_dir_all(&root).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.as_deref(), Some("b4"));
        assert_eq!(records[0].time, Some(1.0));
        assert_eq!(records[0].body_count(), Some(4));
        assert_eq!(records[1].name.as_deref(), Some("b8"));
        assert!(!records[1].is_complete());
    }

    #[test]
    fn test_load_trace_reports_missing_file() {
        let err = load_trace(Path::new("/nonexistent/trace.out"), ReaderConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Failed to read trace"));
    }
}
