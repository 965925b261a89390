//! Trace reader.
//!
//! Turns the complete text output of the simulator into a [`Trace`]. The
//! reader owns no I/O: callers read the file and hand over the buffer.
//!
//! # Format
//! ```text
//! <body_count> <timestep_count> <output_interval> <delta_t>
//! <mass_1>
//! ...
//! <mass_N>
//! <timestamp> <total_energy>
//! <x1> <y1> <vx1> <vy1>
//! ...
//! <xN> <yN> <vxN> <vyN>
//!
//! <timestamp> <total_energy>
//! ...
//! ```
//!
//! Timestep blocks are runs of non-blank lines separated by one or more
//! blank lines. Parsing is all-or-nothing: a malformed region yields a
//! [`TraceError`] and no trace.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{TraceError, TraceWarning};
use crate::model::{check_mass, Body, SimulationHeader, Timestep, Trace};

/// Upper bound on up-front allocation driven by the header's body count.
const PREALLOCATE_LIMIT: usize = 1024;

/// Reader options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Fail instead of warning when parsed and declared timestep counts differ
    pub strict_declared_count: bool,

    /// Warn when a timestamp is lower than the one before it
    pub check_monotonic_time: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            strict_declared_count: false,
            check_monotonic_time: true,
        }
    }
}

impl ReaderConfig {
    /// Config that rejects declared-count mismatches.
    pub fn strict() -> Self {
        Self {
            strict_declared_count: true,
            ..Default::default()
        }
    }
}

/// A successfully parsed trace plus any non-fatal findings.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTrace {
    pub trace: Trace,
    pub warnings: Vec<TraceWarning>,
}

impl ParsedTrace {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Drops the warnings.
    pub fn into_trace(self) -> Trace {
        self.trace
    }

    /// Escalates the first warning, if any, into an error.
    pub fn into_strict(self) -> Result<Trace, TraceError> {
        match self.warnings.into_iter().next() {
            Some(warning) => Err(warning.into_error()),
            None => Ok(self.trace),
        }
    }
}

/// Parses a trace with the default configuration.
pub fn parse(buffer: &str) -> Result<ParsedTrace, TraceError> {
    TraceReader::default().parse(buffer)
}

/// Stateless trace reader.
#[derive(Debug, Clone, Default)]
pub struct TraceReader {
    config: ReaderConfig,
}

impl TraceReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Parses a complete trace buffer.
    pub fn parse(&self, buffer: &str) -> Result<ParsedTrace, TraceError> {
        let mut lines = numbered_lines(buffer);

        let (line, text) = lines
            .next()
            .ok_or_else(|| TraceError::header(1, "input is empty"))?;
        let header = parse_header(line, text)?;

        let masses = parse_masses(&mut lines, header.body_count, line + 1)?;
        let blocks = split_blocks(lines);

        if blocks.is_empty() && header.timestep_count > 0 {
            return Err(TraceError::EmptyTrace {
                declared: header.timestep_count,
            });
        }

        let mut warnings = Vec::new();
        let mut timesteps: Vec<Timestep> = Vec::with_capacity(blocks.len());

        for (index, block) in blocks.iter().enumerate() {
            let timestep = parse_block(index, block, header.body_count)?;

            if self.config.check_monotonic_time {
                if let Some(previous) = timesteps.last().map(|t| t.timestamp) {
                    if timestep.timestamp < previous {
                        warnings.push(TraceWarning::NonMonotonicTimestamp {
                            block: index,
                            line: block[0].0,
                            previous,
                            current: timestep.timestamp,
                        });
                    }
                }
            }

            timesteps.push(timestep);
        }

        if timesteps.len() != header.timestep_count {
            let mismatch = TraceWarning::DeclaredCountMismatch {
                declared: header.timestep_count,
                parsed: timesteps.len(),
            };
            if self.config.strict_declared_count {
                return Err(mismatch.into_error());
            }
            warnings.push(mismatch);
        }

        for warning in &warnings {
            warn!("trace warning: {}", warning);
        }

        debug!(
            "parsed trace: {} bodies, {} timesteps ({} declared), {} warnings",
            header.body_count,
            timesteps.len(),
            header.timestep_count,
            warnings.len()
        );

        Ok(ParsedTrace {
            trace: Trace::new_unchecked(header, masses, timesteps),
            warnings,
        })
    }
}

/// A line paired with its 1-based line number.
pub(crate) type NumberedLine<'a> = (usize, &'a str);

pub(crate) fn numbered_lines(buffer: &str) -> impl Iterator<Item = NumberedLine<'_>> {
    buffer.lines().enumerate().map(|(i, text)| (i + 1, text))
}

/// Parses exactly `N` whitespace-separated floats.
///
/// The error is a human-readable reason, wrapped by the caller into the
/// variant that matches the line's role.
pub(crate) fn parse_fields<const N: usize>(text: &str) -> Result<[f64; N], String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != N {
        return Err(format!("expected {} numeric tokens, found {}", N, tokens.len()));
    }

    let mut fields = [0.0; N];
    for (field, token) in fields.iter_mut().zip(&tokens) {
        *field = parse_float(token)?;
    }
    Ok(fields)
}

fn parse_float(token: &str) -> Result<f64, String> {
    token
        .parse::<f64>()
        .map_err(|_| format!("`{}` is not a number", token))
}

fn parse_count(token: &str, what: &str) -> Result<usize, String> {
    token
        .parse::<usize>()
        .map_err(|_| format!("{} `{}` is not a non-negative integer", what, token))
}

fn parse_header(line: usize, text: &str) -> Result<SimulationHeader, TraceError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 4 {
        return Err(TraceError::header(
            line,
            format!("expected 4 tokens, found {}", tokens.len()),
        ));
    }

    let as_header = |reason: String| TraceError::header(line, reason);
    let header = SimulationHeader::new(
        parse_count(tokens[0], "body count").map_err(as_header)?,
        parse_count(tokens[1], "timestep count").map_err(as_header)?,
        parse_float(tokens[2]).map_err(as_header)?,
        parse_float(tokens[3]).map_err(as_header)?,
    );
    header.validate()?;
    Ok(header)
}

/// Reads `count` single-float lines. `next_line` is the number of the first
/// line expected, used when input ends early.
pub(crate) fn parse_masses<'a, I>(
    lines: &mut I,
    count: usize,
    next_line: usize,
) -> Result<Vec<f64>, TraceError>
where
    I: Iterator<Item = NumberedLine<'a>>,
{
    let mut masses = Vec::with_capacity(count.min(PREALLOCATE_LIMIT));

    while masses.len() < count {
        let Some((line, text)) = lines.next() else {
            return Err(TraceError::MassCountMismatch {
                line: next_line + masses.len(),
                expected: count,
                found: masses.len(),
                reason: "input ended".to_string(),
            });
        };

        let mass = parse_fields::<1>(text)
            .and_then(|[mass]| check_mass(mass))
            .map_err(|reason| TraceError::MassCountMismatch {
                line,
                expected: count,
                found: masses.len(),
                reason,
            })?;
        masses.push(mass);
    }

    Ok(masses)
}

/// Groups the remaining lines into blocks of consecutive non-blank lines.
pub(crate) fn split_blocks<'a, I>(lines: I) -> Vec<Vec<NumberedLine<'a>>>
where
    I: Iterator<Item = NumberedLine<'a>>,
{
    let mut blocks = Vec::new();
    let mut current: Vec<NumberedLine<'a>> = Vec::new();

    for (line, text) in lines {
        if text.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push((line, text));
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

/// Parses one non-empty block into a timestep.
pub(crate) fn parse_block(
    index: usize,
    block: &[NumberedLine<'_>],
    body_count: usize,
) -> Result<Timestep, TraceError> {
    let (header_line, header_text) = block[0];
    let [timestamp, total_energy] =
        parse_fields::<2>(header_text).map_err(|reason| TraceError::MalformedTimestepHeader {
            block: index,
            line: header_line,
            reason,
        })?;

    let mut bodies = Vec::with_capacity(body_count.min(PREALLOCATE_LIMIT));
    for &(line, text) in &block[1..] {
        let [x, y, vx, vy] = parse_fields::<4>(text).map_err(|reason| TraceError::MalformedBodyLine {
            block: index,
            line,
            reason,
        })?;
        bodies.push(Body::new(x, y, vx, vy));
    }

    if bodies.len() != body_count {
        // Point at the first surplus line, or at the block header when short.
        let line = block
            .get(body_count + 1)
            .map(|&(line, _)| line)
            .unwrap_or(header_line);
        return Err(TraceError::BodyCountMismatch {
            block: index,
            line,
            expected: body_count,
            found: bodies.len(),
        });
    }

    Ok(Timestep::new(timestamp, total_energy, bodies))
}
