//! JSON exporter for external renderers.
//!
//! Flattens a trace into frames where every body carries its index and mass,
//! so plotting tools do not have to re-derive the positional pairing of
//! bodies and masses.

use nbody_trace::analysis::FrameTiming;
use nbody_trace::{Body, ParsedTrace, Timestep};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::summary::TraceSummary;

/// A single recorded timestep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFrame {
    /// Frame number (timestep index)
    pub index: usize,

    /// Playback time in seconds
    pub playback_sec: f64,

    /// Simulation time
    pub timestamp: f64,

    /// Producer-reported total energy
    pub total_energy: f64,

    pub bodies: Vec<ExportBody>,
}

/// Body state paired with its identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportBody {
    pub index: usize,
    pub mass: f64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl ExportBody {
    pub fn new(index: usize, mass: f64, body: &Body) -> Self {
        Self {
            index,
            mass,
            x: body.x,
            y: body.y,
            vx: body.vx,
            vy: body.vy,
        }
    }
}

/// Complete trace export.
#[derive(Debug, Clone, Serialize)]
pub struct TraceExport {
    pub summary: TraceSummary,
    pub frames: Vec<ExportFrame>,
}

impl TraceExport {
    /// Builds the export for a parsed trace.
    pub fn new(source: &str, parsed: &ParsedTrace) -> Self {
        let trace = &parsed.trace;
        let timing = FrameTiming::from_header(trace.header());

        let frames = trace
            .timesteps()
            .iter()
            .enumerate()
            .map(|(index, timestep)| Self::frame(index, &timing, trace.masses(), timestep))
            .collect();

        Self {
            summary: TraceSummary::new(source, parsed),
            frames,
        }
    }

    fn frame(index: usize, timing: &FrameTiming, masses: &[f64], timestep: &Timestep) -> ExportFrame {
        ExportFrame {
            index,
            playback_sec: timing.frame_time(index),
            timestamp: timestep.timestamp,
            total_energy: timestep.total_energy,
            bodies: timestep
                .bodies
                .iter()
                .zip(masses)
                .enumerate()
                .map(|(i, (body, &mass))| ExportBody::new(i, mass, body))
                .collect(),
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbody_trace::parse;

    #[test]
    fn test_frames_pair_bodies_with_masses() {
        let parsed = parse("2 2 1 0.5\n3\n7\n0 0\n1 1 0 0\n2 2 0 0\n\n0.5 0\n1 2 0 0\n2 3 0 0\n").unwrap();
        let export = TraceExport::new("mem", &parsed);

        assert_eq!(export.frames.len(), 2);
        let second = &export.frames[1];
        assert_eq!(second.index, 1);
        assert_eq!(second.playback_sec, 0.5);
        assert_eq!(second.bodies[1].mass, 7.0);
        assert_eq!(second.bodies[1].y, 3.0);
        assert_eq!(second.bodies[1].index, 1);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["frames"][0]["bodies"][0]["mass"], 3.0);
    }
}
