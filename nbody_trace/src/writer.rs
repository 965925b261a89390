//! Trace writer.
//!
//! Emits the same layout the reader accepts. With the default
//! [`FloatFormat::Shortest`] every value is written in its shortest
//! round-trip form, so reading the output back yields an equal [`Trace`].

use std::fmt;
use std::io;

use crate::model::{Body, Trace};

/// How floating-point fields are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatFormat {
    /// Shortest representation that parses back to the same value
    #[default]
    Shortest,

    /// Fixed number of decimals, like the simulator's `%f` (lossy)
    Fixed(usize),
}

impl FloatFormat {
    /// The simulator's own `printf("%f")` layout.
    pub const PRODUCER: FloatFormat = FloatFormat::Fixed(6);

    pub(crate) fn write<W: fmt::Write>(&self, out: &mut W, value: f64) -> fmt::Result {
        match self {
            FloatFormat::Shortest => write!(out, "{}", value),
            FloatFormat::Fixed(decimals) => write!(out, "{:.*}", decimals, value),
        }
    }

    /// Formats a single value.
    pub fn render(&self, value: f64) -> String {
        let mut out = String::new();
        let _ = self.write(&mut out, value);
        out
    }
}

impl std::str::FromStr for FloatFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shortest" | "exact" => Ok(FloatFormat::Shortest),
            "producer" | "printf" => Ok(FloatFormat::PRODUCER),
            other => other
                .strip_prefix("fixed")
                .and_then(|digits| digits.trim_start_matches(':').parse().ok())
                .map(FloatFormat::Fixed)
                .ok_or_else(|| format!("Unknown float format: {}", s)),
        }
    }
}

/// Serialises traces into the simulator's text format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceWriter {
    format: FloatFormat,
}

impl TraceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(format: FloatFormat) -> Self {
        Self { format }
    }

    /// Renders the whole trace into a string.
    pub fn to_string(&self, trace: &Trace) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_fmt_to(trace, &mut out);
        out
    }

    /// Writes the trace to any byte sink.
    pub fn write_to<W: io::Write>(&self, trace: &Trace, mut sink: W) -> io::Result<()> {
        sink.write_all(self.to_string(trace).as_bytes())
    }

    fn write_fmt_to<W: fmt::Write>(&self, trace: &Trace, out: &mut W) -> fmt::Result {
        let header = trace.header();
        write!(out, "{} {} ", header.body_count, header.timestep_count)?;
        self.format.write(out, header.output_interval)?;
        out.write_char(' ')?;
        self.format.write(out, header.delta_t)?;
        out.write_char('\n')?;

        for &mass in trace.masses() {
            self.format.write(out, mass)?;
            out.write_char('\n')?;
        }

        for (index, timestep) in trace.timesteps().iter().enumerate() {
            if index > 0 {
                out.write_char('\n')?;
            }
            self.format.write(out, timestep.timestamp)?;
            out.write_char(' ')?;
            self.format.write(out, timestep.total_energy)?;
            out.write_char('\n')?;

            for body in &timestep.bodies {
                self.write_body(out, body)?;
            }
        }

        Ok(())
    }

    pub(crate) fn write_body<W: fmt::Write>(&self, out: &mut W, body: &Body) -> fmt::Result {
        self.format.write(out, body.x)?;
        out.write_char(' ')?;
        self.format.write(out, body.y)?;
        out.write_char(' ')?;
        self.format.write(out, body.vx)?;
        out.write_char(' ')?;
        self.format.write(out, body.vy)?;
        out.write_char('\n')
    }

    pub(crate) fn format(&self) -> FloatFormat {
        self.format
    }
}

/// Writes a trace with shortest round-trip formatting.
pub fn write_trace(trace: &Trace) -> String {
    TraceWriter::new().to_string(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SimulationHeader, Timestep};
    use crate::reader::parse;
    use proptest::prelude::*;

    fn sample() -> Trace {
        Trace::from_parts(
            SimulationHeader::new(2, 2, 10.0, 0.01),
            vec![5e14, 1e14],
            vec![
                Timestep::new(0.0, -3.5, vec![Body::new(0.0, 0.0, 0.0, 0.0), Body::new(0.0, 10.0, 11.0, 0.0)]),
                Timestep::new(0.1, -3.5, vec![Body::new(0.0, 0.0, 0.0, 0.0), Body::new(1.1, 10.0, 11.0, -0.2)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_layout() {
        let text = write_trace(&sample());
        let expected = "2 2 10 0.01\n500000000000000\n100000000000000\n\
                        0 -3.5\n0 0 0 0\n0 10 11 0\n\n\
                        0.1 -3.5\n0 0 0 0\n1.1 10 11 -0.2\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_producer_format() {
        let text = TraceWriter::with_format(FloatFormat::PRODUCER).to_string(&sample());
        assert!(text.starts_with("2 2 10.000000 0.010000\n500000000000000.000000\n"));
        let reparsed = parse(&text).unwrap();
        assert_eq!(reparsed.trace, sample());
    }

    #[test]
    fn test_float_format_from_str() {
        assert_eq!("shortest".parse::<FloatFormat>().unwrap(), FloatFormat::Shortest);
        assert_eq!("producer".parse::<FloatFormat>().unwrap(), FloatFormat::Fixed(6));
        assert_eq!("fixed:3".parse::<FloatFormat>().unwrap(), FloatFormat::Fixed(3));
        assert!("hex".parse::<FloatFormat>().is_err());
    }

    #[test]
    fn test_round_trip_of_declared_empty_trace() {
        let trace = Trace::from_parts(SimulationHeader::new(1, 0, 1.0, 0.1), vec![2.0], vec![]).unwrap();
        let parsed = parse(&write_trace(&trace)).unwrap();
        assert_eq!(parsed.trace, trace);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_write_to_sink() {
        let mut buf = Vec::new();
        TraceWriter::new().write_to(&sample(), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), write_trace(&sample()));
    }

    fn body_strategy() -> impl Strategy<Value = Body> {
        (-1e6f64..1e6, -1e6f64..1e6, -1e3f64..1e3, -1e3f64..1e3)
            .prop_map(|(x, y, vx, vy)| Body::new(x, y, vx, vy))
    }

    fn trace_strategy() -> impl Strategy<Value = Trace> {
        (1usize..5, 0usize..5).prop_flat_map(|(n, steps)| {
            (
                prop::collection::vec(1e10f64..1e20, n),
                prop::collection::vec(
                    (0f64..1e4, -1e30f64..1e30, prop::collection::vec(body_strategy(), n)),
                    steps,
                ),
                0.5f64..100.0,
                1e-4f64..1.0,
            )
                .prop_map(move |(masses, raw_steps, interval, delta_t)| {
                    let timesteps: Vec<Timestep> = raw_steps
                        .into_iter()
                        .map(|(t, e, bodies)| Timestep::new(t, e, bodies))
                        .collect();
                    let header = SimulationHeader::new(n, timesteps.len(), interval, delta_t);
                    Trace::from_parts(header, masses, timesteps).unwrap()
                })
        })
    }

    proptest! {
        #[test]
        fn prop_write_then_parse_round_trips(trace in trace_strategy()) {
            let text = write_trace(&trace);
            let parsed = parse(&text).unwrap();
            prop_assert_eq!(&parsed.trace, &trace);
            let count_mismatch = parsed
                .warnings
                .iter()
                .any(|w| matches!(w, crate::error::TraceWarning::DeclaredCountMismatch { .. }));
            prop_assert!(!count_mismatch);
        }

        #[test]
        fn prop_parse_is_deterministic(trace in trace_strategy()) {
            let text = write_trace(&trace);
            prop_assert_eq!(parse(&text).unwrap(), parse(&text).unwrap());
        }
    }
}
