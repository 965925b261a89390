//! Benchmark records produced around simulator runs.
//!
//! Two sources feed the same record shape:
//! - the simulator's own run log (`nbody.log`), one Python-style dict per
//!   run with single quotes and leading commas:
//!   `,\n{ 'numTimeSteps': 10, 'numBodies': 4, 'time': 0.25, 'barnesHut': false }`
//! - collated cluster results (`data.json`), a JSON array whose entries add
//!   the job layout (`nodes`, `tasksPerNode`, `cpusPerTask`) and the timings
//!   reported by the shell `time` builtin.
//!
//! [`BenchmarkRecord::from_job_logs`] builds the collated form from one job's
//! captured output: `KEY=VALUE` scheduler lines in stdout (up to the
//! `----------------` marker), and in stderr a block of run-info fields, a
//! blank line, then the `real` / `user` / `sys` report.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from benchmark log parsing.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    /// Records are not valid JSON after normalisation
    #[error("Invalid benchmark records: {0}")]
    Json(#[from] serde_json::Error),

    /// A `time` duration is not of the form `<minutes>m<seconds>s`
    #[error("Invalid elapsed time `{0}`")]
    Elapsed(String),

    /// A `time` report line is not `<label> <duration>`
    #[error("Invalid time report line `{0}`")]
    TimeReport(String),

    /// A scheduler detail line is not `KEY=VALUE`
    #[error("Invalid scheduler line `{0}`")]
    SchedulerLine(String),
}

/// Marker the job script prints after its scheduler details.
pub const SCHEDULER_SEPARATOR: &str = "----------------";

/// One benchmark run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkRecord {
    /// Job name (collated records only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_time_steps: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_file: Option<String>,

    /// Body count as logged by the simulator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_bodies: Option<u64>,

    /// Body count as set by the job generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bodies: Option<u64>,

    /// CPU time in seconds (user + sys); absent when the job failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leapfrog: Option<bool>,

    /// Barnes-Hut flag as logged by the simulator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barnes_hut: Option<bool>,

    /// Barnes-Hut flag as set by the job generator
    #[serde(
        default,
        rename = "enable_barnes_hut",
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_barnes_hut: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks_per_node: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpus_per_task: Option<u32>,

    /// Any other keys (scheduler variables, raw timings, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BenchmarkRecord {
    /// Body count from whichever source recorded it.
    pub fn body_count(&self) -> Option<u64> {
        self.num_bodies.or(self.bodies)
    }

    /// Whether the run used the Barnes-Hut approximation.
    pub fn uses_barnes_hut(&self) -> bool {
        self.barnes_hut.or(self.enable_barnes_hut).unwrap_or(false)
    }

    /// A record is complete once it carries a timing.
    pub fn is_complete(&self) -> bool {
        self.time.is_some()
    }

    /// Collates one job's captured stdout and stderr into a record.
    ///
    /// Scheduler values are kept as strings. The `time` report adds `real`,
    /// `user` and `sys` in seconds and sets `time = user + sys`. Run-info
    /// fields from stderr take precedence over everything else.
    pub fn from_job_logs(stdout: &str, stderr: &str) -> Result<Self, BenchmarkError> {
        let mut fields = serde_json::Map::new();

        let details = stdout.split(SCHEDULER_SEPARATOR).next().unwrap_or_default();
        for line in details.lines().filter(|l| !l.trim().is_empty()) {
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| BenchmarkError::SchedulerLine(line.to_string()))?;
            fields.insert(key.trim().to_string(), value.trim().into());
        }

        let (info, timings) = split_stderr(stderr);

        let report = TimeReport::parse(&timings)?;
        fields.insert("real".to_string(), report.real.into());
        fields.insert("user".to_string(), report.user.into());
        fields.insert("sys".to_string(), report.sys.into());
        fields.insert("time".to_string(), report.cpu_time().into());

        if !info.trim().is_empty() {
            let info: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&braced(&info))?;
            fields.extend(info);
        }

        Ok(serde_json::from_value(serde_json::Value::Object(fields))?)
    }
}

/// Splits stderr at its first blank line into (run info, time report).
fn split_stderr(stderr: &str) -> (String, String) {
    let mut lines = stderr.lines();
    let info: Vec<&str> = lines.by_ref().take_while(|l| !l.trim().is_empty()).collect();
    let rest: Vec<&str> = lines.collect();
    (info.join("\n"), rest.join("\n"))
}

/// Wraps single-quoted, comma-terminated fields into a JSON object.
fn braced(fields: &str) -> String {
    let normalised = fields.replace('\'', "\"");
    let inner = normalised
        .trim()
        .trim_start_matches('{')
        .trim_end_matches(',')
        .trim_end_matches('}')
        .trim()
        .trim_end_matches(',');
    format!("{{{}}}", inner)
}

/// Parses the simulator's single-quoted run log.
pub fn parse_run_log(text: &str) -> Result<Vec<BenchmarkRecord>, BenchmarkError> {
    let normalised = text.replace('\'', "\"");
    let body = normalised
        .trim()
        .trim_start_matches(',')
        .trim_end_matches(',')
        .trim();
    if body.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&format!("[{}]", body))?)
}

/// Parses a JSON array of records.
pub fn parse_records(text: &str) -> Result<Vec<BenchmarkRecord>, BenchmarkError> {
    Ok(serde_json::from_str(text)?)
}

/// Splits records into (direct summation, Barnes-Hut).
pub fn split_by_barnes_hut(records: &[BenchmarkRecord]) -> (Vec<&BenchmarkRecord>, Vec<&BenchmarkRecord>) {
    records.iter().partition(|r| !r.uses_barnes_hut())
}

/// Parses a `time` builtin duration such as `1m2.500s` into seconds.
pub fn parse_elapsed(value: &str) -> Result<f64, BenchmarkError> {
    let invalid = || BenchmarkError::Elapsed(value.to_string());

    let (minutes, seconds) = value
        .trim()
        .strip_suffix('s')
        .and_then(|rest| rest.split_once('m'))
        .ok_or_else(invalid)?;
    let minutes: f64 = minutes.parse().map_err(|_| invalid())?;
    let seconds: f64 = seconds.parse().map_err(|_| invalid())?;

    Ok(minutes * 60.0 + seconds)
}

/// Wall-clock and CPU times reported by the `time` builtin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeReport {
    pub real: f64,
    pub user: f64,
    pub sys: f64,
}

impl TimeReport {
    /// Parses the `real` / `user` / `sys` lines. Other lines are ignored.
    pub fn parse(text: &str) -> Result<Self, BenchmarkError> {
        let mut report = Self::default();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let mut parts = line.split_whitespace();
            let (Some(label), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
                continue;
            };
            let slot = match label {
                "real" => &mut report.real,
                "user" => &mut report.user,
                "sys" => &mut report.sys,
                _ => continue,
            };
            *slot = parse_elapsed(value).map_err(|_| BenchmarkError::TimeReport(line.to_string()))?;
        }
        Ok(report)
    }

    /// CPU time as recorded in benchmark records.
    pub fn cpu_time(&self) -> f64 {
        self.user + self.sys
    }
}
