//! Simulator input files (initial conditions).
//!
//! The simulator starts from a file that looks like one trace block with a
//! shorter header:
//!
//! ```text
//! <body_count>
//! <mass_1>
//! ...
//! <mass_N>
//! <timestamp> <total_energy>
//! <x1> <y1> <vx1> <vy1>
//! ...
//! ```
//!
//! Any recorded timestep can be turned back into such a file with
//! [`Trace::restart_from`], which lets a run be resumed or re-simulated from
//! the middle of a trace.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::TraceError;
use crate::model::{Body, Timestep, Trace};
use crate::reader::{numbered_lines, parse_block, parse_masses, split_blocks};
use crate::writer::TraceWriter;

/// Starting state handed to the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialConditions {
    pub masses: Vec<f64>,
    pub timestamp: f64,
    pub total_energy: f64,
    pub bodies: Vec<Body>,
}

impl InitialConditions {
    /// Parses an input file.
    pub fn parse(buffer: &str) -> Result<Self, TraceError> {
        let mut lines = numbered_lines(buffer);

        let (line, text) = lines
            .next()
            .ok_or_else(|| TraceError::header(1, "input is empty"))?;
        let body_count = match text.split_whitespace().collect::<Vec<_>>().as_slice() {
            [token] => token
                .parse::<usize>()
                .map_err(|_| TraceError::header(line, format!("body count `{}` is not an integer", token)))?,
            tokens => {
                return Err(TraceError::header(
                    line,
                    format!("expected 1 token, found {}", tokens.len()),
                ))
            }
        };
        if body_count == 0 {
            return Err(TraceError::header(line, "body count must be positive"));
        }

        let masses = parse_masses(&mut lines, body_count, line + 1)?;

        let blocks = split_blocks(lines);
        let block = match blocks.as_slice() {
            [] => return Err(TraceError::EmptyTrace { declared: 1 }),
            [block] => block,
            [_, extra, ..] => {
                return Err(TraceError::MalformedTimestepHeader {
                    block: 1,
                    line: extra[0].0,
                    reason: "input files hold a single state block".to_string(),
                })
            }
        };
        let state = parse_block(0, block, body_count)?;

        Ok(Self {
            masses,
            timestamp: state.timestamp,
            total_energy: state.total_energy,
            bodies: state.bodies,
        })
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Renders the input file with shortest round-trip floats.
    pub fn to_input_string(&self) -> String {
        self.to_input_string_with(&TraceWriter::new())
    }

    /// Renders the input file using the writer's float format.
    pub fn to_input_string_with(&self, writer: &TraceWriter) -> String {
        let format = writer.format();
        let single = |value: f64| format.render(value);

        let mut out = String::new();
        let _ = writeln!(out, "{}", self.masses.len());
        for &mass in &self.masses {
            let _ = writeln!(out, "{}", single(mass));
        }
        let _ = writeln!(out, "{} {}", single(self.timestamp), single(self.total_energy));
        for body in &self.bodies {
            let _ = writer.write_body(&mut out, body);
        }
        out
    }

    /// Returns the state as a timestep.
    pub fn as_timestep(&self) -> Timestep {
        Timestep::new(self.timestamp, self.total_energy, self.bodies.clone())
    }
}

impl Trace {
    /// Builds simulator input that restarts the run at timestep `index`.
    pub fn restart_from(&self, index: usize) -> Option<InitialConditions> {
        let timestep = self.timestep(index)?;
        Some(InitialConditions {
            masses: self.masses().to_vec(),
            timestamp: timestep.timestamp,
            total_energy: timestep.total_energy,
            bodies: timestep.bodies.clone(),
        })
    }
}
