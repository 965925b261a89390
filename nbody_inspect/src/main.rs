//! nbody-inspect CLI
//!
//! Summarise, export and restart N-body simulator traces, and collate
//! benchmark records.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nbody_inspect::{
    collate_job_logs, load_benchmarks, load_trace, resolve_index, BenchmarkSummary, TraceExport, TraceSummary,
};
use nbody_trace::{FloatFormat, ReaderConfig, TraceError, TraceWriter};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Inspect N-body simulator traces
#[derive(Parser, Debug)]
#[command(name = "nbody-inspect")]
#[command(about = "Inspect N-body simulator traces and benchmark logs", long_about = None)]
struct Args {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of a trace
    Summary {
        /// Trace file written by the simulator
        trace: PathBuf,

        /// Treat a declared/parsed timestep count mismatch as an error
        #[arg(long)]
        strict: bool,

        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// Export a trace as JSON frames
    Export {
        trace: PathBuf,

        /// Output JSON file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Write a simulator input file starting at a recorded timestep
    Restart {
        trace: PathBuf,

        /// Timestep index (negative counts from the end)
        #[arg(short, long, default_value = "-1", allow_hyphen_values = true)]
        timestep: i64,

        /// Float format: shortest, producer, fixed:<digits>
        #[arg(short, long, default_value = "shortest")]
        format: FloatFormat,

        /// Output input file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Summarise benchmark records
    Benchmarks {
        /// Records file (JSON array, or raw run log with --log)
        file: PathBuf,

        /// Input is the simulator's raw run log
        #[arg(long)]
        log: bool,

        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// Collate batch job logs into a JSON records file
    Collate {
        /// Directory of job stdout files (`<name>.out`)
        #[arg(long, default_value = "batchout")]
        out_dir: PathBuf,

        /// Directory of job stderr files (`<name>.log`)
        #[arg(long, default_value = "batcherr")]
        err_dir: PathBuf,

        /// Output records file
        #[arg(short, long, default_value = "data.json")]
        out: PathBuf,
    },
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if let Err(err) = run(args.command) {
        if let Some(trace_err) = err.downcast_ref::<TraceError>() {
            let location = match (trace_err.block(), trace_err.line()) {
                (Some(block), Some(line)) => format!(" (block {}, line {})", block, line),
                (None, Some(line)) => format!(" (line {})", line),
                _ => String::new(),
            };
            error!("{:?} error{}", trace_err.kind(), location);
        }
        error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Summary { trace, strict, json } => {
            let config = if strict { ReaderConfig::strict() } else { ReaderConfig::default() };
            let parsed = load_trace(&trace, config)?;
            let summary = TraceSummary::new(&trace.display().to_string(), &parsed);

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                for line in summary.lines() {
                    info!("{}", line);
                }
            }
        }

        Command::Export { trace, out } => {
            let parsed = load_trace(&trace, ReaderConfig::default())?;
            let export = TraceExport::new(&trace.display().to_string(), &parsed);
            export
                .write_to_file(&out)
                .with_context(|| format!("Failed to write export {}", out.display()))?;
            info!("Exported {} frames to {}", export.frames.len(), out.display());
        }

        Command::Restart {
            trace,
            timestep,
            format,
            out,
        } => {
            let parsed = load_trace(&trace, ReaderConfig::default())?;
            let len = parsed.trace.len();
            let Some(index) = resolve_index(len, timestep) else {
                bail!("Timestep {} out of range, trace has {} timesteps", timestep, len);
            };

            let Some(initial) = parsed.trace.restart_from(index) else {
                bail!("Timestep {} out of range", index);
            };
            let text = initial.to_input_string_with(&TraceWriter::with_format(format));
            std::fs::write(&out, text)
                .with_context(|| format!("Failed to write input file {}", out.display()))?;
            info!(
                "Wrote restart input at t={} (timestep {}) to {}",
                initial.timestamp,
                index,
                out.display()
            );
        }

        Command::Benchmarks { file, log, json } => {
            let records = load_benchmarks(&file, log)?;
            let summary = BenchmarkSummary::new(&records);

            if json {
                let report = serde_json::json!({
                    "records": records,
                    "summary": summary,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for record in &records {
                    let bodies = record
                        .body_count()
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "?".to_string());
                    match record.time {
                        Some(time) => info!(
                            "bodies={} barnes_hut={} time={:.3}s",
                            bodies,
                            record.uses_barnes_hut(),
                            time
                        ),
                        None => warn!(
                            "bodies={} barnes_hut={} incomplete",
                            bodies,
                            record.uses_barnes_hut()
                        ),
                    }
                }
                info!(
                    "direct: {} runs ({} complete), barnes-hut: {} runs ({} complete)",
                    summary.direct.runs,
                    summary.direct.completed,
                    summary.barnes_hut.runs,
                    summary.barnes_hut.completed
                );
            }
        }

        Command::Collate { out_dir, err_dir, out } => {
            let records = collate_job_logs(&out_dir, &err_dir)?;
            let complete = records.iter().filter(|r| r.is_complete()).count();
            std::fs::write(&out, serde_json::to_string_pretty(&records)?)
                .with_context(|| format!("Failed to write records {}", out.display()))?;
            info!(
                "Collated {} jobs ({} complete) into {}",
                records.len(),
                complete,
                out.display()
            );
        }
    }

    Ok(())
}
