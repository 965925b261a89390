//! Trace data model.
//!
//! A [`Trace`] is the full record of one simulator run: a header, the mass
//! vector and the recorded timesteps. Bodies carry no identifier. Body `i`
//! of one timestep is the same physical body as body `i` of every other
//! timestep, and `masses[i]` is its mass. [`Trace::trajectory`] exposes that
//! correspondence directly.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::TraceError;

/// First line of a trace file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationHeader {
    /// Number of simulated bodies (> 0)
    pub body_count: usize,

    /// Timestep count declared by the producer (validation only)
    pub timestep_count: usize,

    /// Producer stride between recorded snapshots
    pub output_interval: f64,

    /// Integration step size
    pub delta_t: f64,
}

impl SimulationHeader {
    /// Creates a header.
    pub fn new(body_count: usize, timestep_count: usize, output_interval: f64, delta_t: f64) -> Self {
        Self {
            body_count,
            timestep_count,
            output_interval,
            delta_t,
        }
    }

    /// Checks the value constraints on the header fields.
    ///
    /// Errors are reported against line 1, where the header lives.
    pub fn validate(&self) -> Result<(), TraceError> {
        if self.body_count == 0 {
            return Err(TraceError::header(1, "body count must be positive"));
        }
        if !(self.output_interval.is_finite() && self.output_interval > 0.0) {
            return Err(TraceError::header(
                1,
                format!("output interval must be positive, got {}", self.output_interval),
            ));
        }
        if !(self.delta_t.is_finite() && self.delta_t > 0.0) {
            return Err(TraceError::header(
                1,
                format!("delta t must be positive, got {}", self.delta_t),
            ));
        }
        Ok(())
    }
}

/// Accepts a mass only if it is finite and positive.
pub(crate) fn check_mass(mass: f64) -> Result<f64, String> {
    if mass.is_finite() && mass > 0.0 {
        Ok(mass)
    } else {
        Err(format!("mass {} is not a positive number", mass))
    }
}

/// Kinematic sample of one body at one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Body {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl Body {
    pub fn new(x: f64, y: f64, vx: f64, vy: f64) -> Self {
        Self { x, y, vx, vy }
    }

    /// Position as a vector.
    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Velocity as a vector.
    pub fn velocity(&self) -> Vector2<f64> {
        Vector2::new(self.vx, self.vy)
    }

    pub fn speed_squared(&self) -> f64 {
        self.vx * self.vx + self.vy * self.vy
    }
}

/// One recorded snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestep {
    /// Simulation time of the snapshot
    pub timestamp: f64,

    /// Producer-computed total energy (diagnostic only)
    pub total_energy: f64,

    /// Index-aligned body samples
    pub bodies: Vec<Body>,
}

impl Timestep {
    pub fn new(timestamp: f64, total_energy: f64, bodies: Vec<Body>) -> Self {
        Self {
            timestamp,
            total_energy,
            bodies,
        }
    }

    /// Returns body `index`, if present.
    pub fn body(&self, index: usize) -> Option<&Body> {
        self.bodies.get(index)
    }
}

/// Complete, validated record of one simulator run.
///
/// Fields are private: a trace is only built through the reader or
/// [`Trace::from_parts`], both of which enforce
/// `body_count == masses.len() == timestep.bodies.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TraceParts")]
pub struct Trace {
    header: SimulationHeader,
    masses: Vec<f64>,
    timesteps: Vec<Timestep>,
}

/// Unvalidated trace fields, used for deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceParts {
    pub header: SimulationHeader,
    pub masses: Vec<f64>,
    pub timesteps: Vec<Timestep>,
}

impl TryFrom<TraceParts> for Trace {
    type Error = TraceError;

    fn try_from(parts: TraceParts) -> Result<Self, Self::Error> {
        Trace::from_parts(parts.header, parts.masses, parts.timesteps)
    }
}

impl Trace {
    /// Builds a trace from its parts, checking the same invariants as the
    /// reader: counts, positive masses, and at least one timestep when the
    /// header declares any.
    ///
    /// Line numbers in errors refer to where the offending line would sit in
    /// the written form of this trace.
    pub fn from_parts(
        header: SimulationHeader,
        masses: Vec<f64>,
        timesteps: Vec<Timestep>,
    ) -> Result<Self, TraceError> {
        header.validate()?;

        let n = header.body_count;
        if masses.len() != n {
            return Err(TraceError::MassCountMismatch {
                line: 2 + masses.len().min(n),
                expected: n,
                found: masses.len(),
                reason: "mass vector length differs from body count".to_string(),
            });
        }
        for (index, &mass) in masses.iter().enumerate() {
            check_mass(mass).map_err(|reason| TraceError::MassCountMismatch {
                line: 2 + index,
                expected: n,
                found: index,
                reason,
            })?;
        }

        if timesteps.is_empty() && header.timestep_count > 0 {
            return Err(TraceError::EmptyTrace {
                declared: header.timestep_count,
            });
        }

        let block_len = n + 2;
        for (block, timestep) in timesteps.iter().enumerate() {
            if timestep.bodies.len() != n {
                return Err(TraceError::BodyCountMismatch {
                    block,
                    line: n + 2 + block * block_len,
                    expected: n,
                    found: timestep.bodies.len(),
                });
            }
        }

        Ok(Self::new_unchecked(header, masses, timesteps))
    }

    /// Only the reader calls this, after it has checked every count.
    pub(crate) fn new_unchecked(
        header: SimulationHeader,
        masses: Vec<f64>,
        timesteps: Vec<Timestep>,
    ) -> Self {
        Self {
            header,
            masses,
            timesteps,
        }
    }

    pub fn header(&self) -> &SimulationHeader {
        &self.header
    }

    /// Per-body masses, all finite and positive.
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn timesteps(&self) -> &[Timestep] {
        &self.timesteps
    }

    pub fn body_count(&self) -> usize {
        self.header.body_count
    }

    /// Number of parsed timesteps (authoritative over the declared count).
    pub fn len(&self) -> usize {
        self.timesteps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timesteps.is_empty()
    }

    pub fn timestep(&self, index: usize) -> Option<&Timestep> {
        self.timesteps.get(index)
    }

    /// Returns the history of one body across every timestep, in order.
    ///
    /// Returns `None` if `body_index` is out of range.
    pub fn trajectory(&self, body_index: usize) -> Option<Trajectory<'_>> {
        if body_index >= self.header.body_count {
            return None;
        }
        Some(Trajectory {
            body_index,
            timesteps: self.timesteps.iter(),
        })
    }

    /// Consumes the trace, returning its parts.
    pub fn into_parts(self) -> (SimulationHeader, Vec<f64>, Vec<Timestep>) {
        (self.header, self.masses, self.timesteps)
    }
}

/// Iterator over one body's samples, see [`Trace::trajectory`].
#[derive(Debug, Clone)]
pub struct Trajectory<'a> {
    body_index: usize,
    timesteps: std::slice::Iter<'a, Timestep>,
}

impl<'a> Trajectory<'a> {
    pub fn body_index(&self) -> usize {
        self.body_index
    }
}

impl<'a> Iterator for Trajectory<'a> {
    type Item = &'a Body;

    fn next(&mut self) -> Option<Self::Item> {
        self.timesteps.next().map(|t| &t.bodies[self.body_index])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.timesteps.size_hint()
    }
}

impl ExactSizeIterator for Trajectory<'_> {}
