//! Human and machine readable summaries of traces and benchmark records.

use nbody_trace::analysis::{
    max_relative_energy_residual, ConservedDrift, EnergyStats, Extent, FrameTiming, GRAVITATIONAL_CONSTANT,
};
use nbody_trace::benchmark::{split_by_barnes_hut, BenchmarkRecord};
use nbody_trace::{ParsedTrace, SimulationHeader};
use serde::Serialize;

/// Everything `nbody-inspect summary` reports about a trace.
#[derive(Debug, Clone, Serialize)]
pub struct TraceSummary {
    /// Where the trace was read from
    pub source: String,

    pub header: SimulationHeader,

    /// Timesteps actually parsed
    pub parsed_timesteps: usize,

    pub timing: FrameTiming,

    /// Simulation time of the first and last snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_span: Option<(f64, f64)>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<EnergyStats>,

    /// Worst relative gap between recomputed and reported energy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_energy_residual: Option<f64>,

    /// First-to-last change in momentum and centre of mass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift: Option<ConservedDrift>,

    /// Bounding box over the whole run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Extent>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl TraceSummary {
    pub fn new(source: &str, parsed: &ParsedTrace) -> Self {
        let trace = &parsed.trace;
        let time_span = match (trace.timesteps().first(), trace.timesteps().last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        };

        Self {
            source: source.to_string(),
            header: *trace.header(),
            parsed_timesteps: trace.len(),
            timing: FrameTiming::from_header(trace.header()),
            time_span,
            energy: EnergyStats::from_trace(trace),
            max_energy_residual: max_relative_energy_residual(trace, GRAVITATIONAL_CONSTANT),
            drift: ConservedDrift::from_trace(trace),
            extent: Extent::of_trace(trace),
            warnings: parsed.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Report lines for log output.
    pub fn lines(&self) -> Vec<String> {
        let h = &self.header;
        let mut lines = vec![
            format!("Trace: {}", self.source),
            format!(
                "  bodies={} timesteps={} (declared {}) interval={} dt={}",
                h.body_count, self.parsed_timesteps, h.timestep_count, h.output_interval, h.delta_t
            ),
            format!(
                "  playback: {:.4}s per frame, {} FPS",
                self.timing.time_per_frame, self.timing.fps
            ),
        ];

        if let Some((start, end)) = self.time_span {
            lines.push(format!("  time: {} -> {}", start, end));
        }

        if let Some(energy) = &self.energy {
            let cv = energy
                .coefficient_of_variation
                .map(|cv| format!("{:.6}%", cv))
                .unwrap_or_else(|| "n/a".to_string());
            lines.push(format!(
                "  energy: mean={:.6e} std={:.6e} min={:.6e} max={:.6e} cv={}",
                energy.mean, energy.std_dev, energy.min, energy.max, cv
            ));
        }

        if let Some(residual) = self.max_energy_residual {
            lines.push(format!("  energy residual (recomputed vs reported): {:.6e}", residual));
        }

        if let Some(drift) = &self.drift {
            lines.push(format!(
                "  drift: momentum={:.6e} centre of mass={:.6e}",
                drift.momentum, drift.centre_of_mass
            ));
        }

        if let Some(extent) = &self.extent {
            lines.push(format!(
                "  extent: x=[{}, {}] y=[{}, {}]",
                extent.min_x, extent.max_x, extent.min_y, extent.max_y
            ));
        }

        for warning in &self.warnings {
            lines.push(format!("  warning: {}", warning));
        }

        lines
    }
}

/// Aggregate timings for one group of benchmark runs.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkGroup {
    pub runs: usize,
    pub completed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bodies: Option<u64>,
}

impl BenchmarkGroup {
    fn from_records(records: &[&BenchmarkRecord]) -> Self {
        let times: Vec<f64> = records.iter().filter_map(|r| r.time).collect();
        Self {
            runs: records.len(),
            completed: times.len(),
            mean_time: (!times.is_empty()).then(|| times.iter().sum::<f64>() / times.len() as f64),
            max_bodies: records.iter().filter_map(|r| r.body_count()).max(),
        }
    }
}

/// Benchmark records split by force algorithm.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkSummary {
    pub direct: BenchmarkGroup,
    pub barnes_hut: BenchmarkGroup,
}

impl BenchmarkSummary {
    pub fn new(records: &[BenchmarkRecord]) -> Self {
        let (direct, tree) = split_by_barnes_hut(records);
        Self {
            direct: BenchmarkGroup::from_records(&direct),
            barnes_hut: BenchmarkGroup::from_records(&tree),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nbody_trace::benchmark::parse_records;
    use nbody_trace::parse;

    #[test]
    fn test_trace_summary() {
        let parsed = parse("2 3 10 0.01\n1e14\n2e14\n0 -5\n0 0 0 0\n10 0 0 1\n\n0.1 -5\n0 0 0 0\n10 0.1 0 1\n").unwrap();
        let summary = TraceSummary::new("out", &parsed);

        assert_eq!(summary.parsed_timesteps, 2);
        assert_eq!(summary.timing.fps, 10);
        assert_eq!(summary.time_span, Some((0.0, 0.1)));
        assert_relative_eq!(summary.energy.unwrap().mean, -5.0);
        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.max_energy_residual.is_some());
        // body 1 moves by 0.1 in y: centre of mass moves by 2/3 of that
        let drift = summary.drift.unwrap();
        assert_relative_eq!(drift.momentum, 0.0);
        assert_relative_eq!(drift.centre_of_mass, 0.1 * 2.0 / 3.0, epsilon = 1e-12);

        let lines = summary.lines();
        assert!(lines[0].contains("out"));
        assert!(lines.iter().any(|l| l.contains("warning")));
        assert!(lines.iter().any(|l| l.contains("drift")));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["header"]["body_count"], 2);
    }

    #[test]
    fn test_benchmark_summary() {
        let records = parse_records(
            r#"[{"numBodies": 4, "time": 1.0, "barnesHut": false},
                {"numBodies": 64, "time": 3.0, "barnesHut": false},
                {"numBodies": 64, "barnesHut": true}]"#,
        )
        .unwrap();
        let summary = BenchmarkSummary::new(&records);

        assert_eq!(summary.direct.runs, 2);
        assert_eq!(summary.direct.mean_time, Some(2.0));
        assert_eq!(summary.direct.max_bodies, Some(64));
        assert_eq!(summary.barnes_hut.completed, 0);
        assert!(summary.barnes_hut.mean_time.is_none());
    }
}
