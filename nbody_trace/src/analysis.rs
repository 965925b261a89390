//! Diagnostics computed from a parsed trace.
//!
//! Nothing here feeds back into the trace: these are read-only views for
//! plotting and sanity checks (playback timing, energy conservation, spatial
//! extent, conserved quantities).

use nalgebra::Vector2;
use serde::Serialize;

use crate::model::{Body, SimulationHeader, Timestep, Trace};

/// Gravitational constant used by the simulator, N (m/kg)^2.
pub const GRAVITATIONAL_CONSTANT: f64 = 6.674e-11;

// =============================================================================
// PLAYBACK TIMING
// =============================================================================

/// Playback timing derived from the header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameTiming {
    /// Simulated time between two recorded snapshots
    pub time_per_frame: f64,

    /// Frames per second for real-time playback (at least 1)
    pub fps: u32,
}

impl FrameTiming {
    pub fn from_header(header: &SimulationHeader) -> Self {
        let time_per_frame = header.output_interval * header.delta_t;
        let fps = (1.0 / time_per_frame).round().max(1.0) as u32;
        Self { time_per_frame, fps }
    }

    /// Playback time of frame `index`, in seconds.
    pub fn frame_time(&self, index: usize) -> f64 {
        index as f64 / self.fps as f64
    }

    /// Delay between frames, in milliseconds.
    pub fn frame_interval_ms(&self) -> f64 {
        self.time_per_frame * 1000.0
    }
}

// =============================================================================
// ENERGY
// =============================================================================

/// Summary of the producer-reported total energy over a trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// `std_dev / |mean| * 100`; `None` when the mean is zero
    pub coefficient_of_variation: Option<f64>,
    /// `(last - first) / |first|`; `None` when the first value is zero
    pub relative_drift: Option<f64>,
}

impl EnergyStats {
    /// Returns `None` for traces with fewer than two timesteps.
    pub fn from_trace(trace: &Trace) -> Option<Self> {
        let energies: Vec<f64> = trace.timesteps().iter().map(|t| t.total_energy).collect();
        Self::from_values(&energies)
    }

    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        let std_dev = variance.sqrt();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let first = values[0];
        let last = values[count - 1];

        Some(Self {
            count,
            mean,
            std_dev,
            min,
            max,
            coefficient_of_variation: (mean != 0.0).then(|| std_dev / mean.abs() * 100.0),
            relative_drift: (first != 0.0).then(|| (last - first) / first.abs()),
        })
    }
}

/// Kinetic plus pairwise gravitational potential energy of one snapshot.
///
/// `masses` and `bodies` are index-aligned.
pub fn total_energy(masses: &[f64], bodies: &[Body], g: f64) -> f64 {
    let kinetic: f64 = masses
        .iter()
        .zip(bodies)
        .map(|(m, b)| m * b.speed_squared() / 2.0)
        .sum();

    let mut potential = 0.0;
    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            let r = (bodies[i].position() - bodies[j].position()).norm();
            potential -= g * masses[i] * masses[j] / r;
        }
    }

    kinetic + potential
}

/// Recomputed energy minus reported energy, per timestep.
pub fn energy_residuals(trace: &Trace, g: f64) -> Vec<f64> {
    trace
        .timesteps()
        .iter()
        .map(|t| total_energy(trace.masses(), &t.bodies, g) - t.total_energy)
        .collect()
}

/// Largest absolute residual, relative to `|reported|` where that is non-zero.
///
/// Returns `None` for an empty trace.
pub fn max_relative_energy_residual(trace: &Trace, g: f64) -> Option<f64> {
    trace
        .timesteps()
        .iter()
        .zip(energy_residuals(trace, g))
        .map(|(t, residual)| {
            let scale = t.total_energy.abs();
            if scale > 0.0 {
                residual.abs() / scale
            } else {
                residual.abs()
            }
        })
        .reduce(f64::max)
}

// =============================================================================
// SPATIAL EXTENT
// =============================================================================

/// Axis-aligned bounding box of body positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Extent {
    /// Returns `None` for an empty slice.
    pub fn of(bodies: &[Body]) -> Option<Self> {
        let first = bodies.first()?;
        let init = Self {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        Some(bodies.iter().fold(init, |e, b| e.including(b.x, b.y)))
    }

    pub fn of_timestep(timestep: &Timestep) -> Option<Self> {
        Self::of(&timestep.bodies)
    }

    /// Bounding box over every timestep of a trace.
    pub fn of_trace(trace: &Trace) -> Option<Self> {
        trace
            .timesteps()
            .iter()
            .filter_map(Self::of_timestep)
            .reduce(|a, b| a.union(&b))
    }

    fn including(self, x: f64, y: f64) -> Self {
        Self {
            min_x: self.min_x.min(x),
            max_x: self.max_x.max(x),
            min_y: self.min_y.min(y),
            max_y: self.max_y.max(y),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        self.including(other.min_x, other.min_y)
            .including(other.max_x, other.max_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Larger side of the box (the simulator sizes its root quadtree from it).
    pub fn max_deviation(&self) -> f64 {
        self.width().max(self.height())
    }
}

// =============================================================================
// CONSERVED QUANTITIES
// =============================================================================

/// Mass-weighted mean position. Zero vector if the total mass is zero.
pub fn centre_of_mass(masses: &[f64], bodies: &[Body]) -> Vector2<f64> {
    let total: f64 = masses.iter().sum();
    if total == 0.0 {
        return Vector2::zeros();
    }
    let weighted = masses
        .iter()
        .zip(bodies)
        .fold(Vector2::zeros(), |acc, (m, b)| acc + b.position() * *m);
    weighted / total
}

/// Sum of `m * v` over all bodies.
pub fn total_momentum(masses: &[f64], bodies: &[Body]) -> Vector2<f64> {
    masses
        .iter()
        .zip(bodies)
        .fold(Vector2::zeros(), |acc, (m, b)| acc + b.velocity() * *m)
}

/// Change in conserved quantities between the first and last timestep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConservedDrift {
    /// `|p_last - p_first|`
    pub momentum: f64,

    /// Distance the centre of mass moved
    pub centre_of_mass: f64,
}

impl ConservedDrift {
    /// Returns `None` for an empty trace.
    pub fn from_trace(trace: &Trace) -> Option<Self> {
        let first = trace.timesteps().first()?;
        let last = trace.timesteps().last()?;
        let masses = trace.masses();

        Some(Self {
            momentum: (total_momentum(masses, &last.bodies) - total_momentum(masses, &first.bodies)).norm(),
            centre_of_mass: (centre_of_mass(masses, &last.bodies) - centre_of_mass(masses, &first.bodies))
                .norm(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse;
    use approx::assert_relative_eq;

    #[test]
    fn test_frame_timing() {
        let timing = FrameTiming::from_header(&SimulationHeader::new(2, 10, 10.0, 0.01));
        assert_relative_eq!(timing.time_per_frame, 0.1, epsilon = 1e-12);
        assert_eq!(timing.fps, 10);
        assert_relative_eq!(timing.frame_time(5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(timing.frame_interval_ms(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_frame_timing_slow_playback_clamps_fps() {
        let timing = FrameTiming::from_header(&SimulationHeader::new(1, 1, 100.0, 1.0));
        assert_eq!(timing.fps, 1);
    }

    #[test]
    fn test_energy_stats() {
        let stats = EnergyStats::from_values(&[-10.0, -12.0, -8.0, -10.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert_relative_eq!(stats.mean, -10.0);
        // sample variance = (0 + 4 + 4 + 0) / 3
        assert_relative_eq!(stats.std_dev, (8.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(stats.min, -12.0);
        assert_relative_eq!(stats.max, -8.0);
        assert_relative_eq!(
            stats.coefficient_of_variation.unwrap(),
            (8.0f64 / 3.0).sqrt() / 10.0 * 100.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(stats.relative_drift.unwrap(), 0.0);
    }

    #[test]
    fn test_energy_stats_needs_two_values() {
        assert!(EnergyStats::from_values(&[1.0]).is_none());
        let stats = EnergyStats::from_values(&[0.0, 0.0]).unwrap();
        assert!(stats.coefficient_of_variation.is_none());
        assert!(stats.relative_drift.is_none());
    }

    #[test]
    fn test_two_body_energy() {
        let masses = [2.0, 3.0];
        let bodies = [Body::new(0.0, 0.0, 1.0, 0.0), Body::new(2.0, 0.0, 0.0, 2.0)];
        // kinetic: 2*1/2 + 3*4/2 = 7, potential: -1*2*3/2 = -3
        assert_relative_eq!(total_energy(&masses, &bodies, 1.0), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_energy_residuals() {
        let trace = parse("2 1 1 0.1\n2\n3\n0 4\n0 0 1 0\n2 0 0 2\n").unwrap().trace;
        let residuals = energy_residuals(&trace, 1.0);
        assert_eq!(residuals.len(), 1);
        assert_relative_eq!(residuals[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_max_relative_energy_residual() {
        // recomputed energy is 4 in both snapshots
        let trace = parse("2 2 1 0.1\n2\n3\n0 4\n0 0 1 0\n2 0 0 2\n\n0.1 5\n0 0 1 0\n2 0 0 2\n")
            .unwrap()
            .trace;
        let worst = max_relative_energy_residual(&trace, 1.0).unwrap();
        assert_relative_eq!(worst, 0.2, epsilon = 1e-12);

        let empty = parse("1 0 1 0.1\n1\n").unwrap().trace;
        assert!(max_relative_energy_residual(&empty, 1.0).is_none());
    }

    #[test]
    fn test_extent() {
        let bodies = [Body::new(-1.0, 2.0, 0.0, 0.0), Body::new(3.0, -4.0, 0.0, 0.0)];
        let extent = Extent::of(&bodies).unwrap();
        assert_eq!(extent.width(), 4.0);
        assert_eq!(extent.height(), 6.0);
        assert_eq!(extent.max_deviation(), 6.0);
        assert!(Extent::of(&[]).is_none());
    }

    #[test]
    fn test_extent_of_trace() {
        let trace = parse("1 2 1 0.1\n1\n0 0\n0 0 0 0\n\n1 0\n5 -5 0 0\n").unwrap().trace;
        let extent = Extent::of_trace(&trace).unwrap();
        assert_eq!((extent.min_x, extent.max_x), (0.0, 5.0));
        assert_eq!((extent.min_y, extent.max_y), (-5.0, 0.0));
    }

    #[test]
    fn test_centre_of_mass_and_momentum() {
        let masses = [1.0, 3.0];
        let bodies = [Body::new(0.0, 0.0, 3.0, 0.0), Body::new(4.0, 0.0, -1.0, 0.0)];
        let com = centre_of_mass(&masses, &bodies);
        assert_relative_eq!(com.x, 3.0);
        assert_relative_eq!(com.y, 0.0);
        let p = total_momentum(&masses, &bodies);
        assert_relative_eq!(p.norm(), 0.0);
    }

    #[test]
    fn test_conserved_drift() {
        // body 0 speeds up, the centre of mass moves from x=3 to x=3.25
        let trace = parse("2 2 1 0.1\n1\n3\n0 0\n0 0 3 0\n4 0 -1 0\n\n1 0\n1 0 4 0\n4 0 -1 0\n")
            .unwrap()
            .trace;
        let drift = ConservedDrift::from_trace(&trace).unwrap();
        assert_relative_eq!(drift.momentum, 1.0, epsilon = 1e-12);
        assert_relative_eq!(drift.centre_of_mass, 0.25, epsilon = 1e-12);

        let empty = parse("1 0 1 0.1\n1\n").unwrap().trace;
        assert!(ConservedDrift::from_trace(&empty).is_none());
    }
}
