//! N-body trace toolkit
//!
//! Reads the plain-text output of an external N-body simulator into a
//! validated, immutable [`Trace`], and provides the pieces downstream tools
//! need around it:
//! 1. **Reader**: one-shot, all-or-nothing parsing with typed errors and
//!    non-fatal warnings
//! 2. **Writer**: the same format back out, exact or `printf`-compatible
//! 3. **Initial conditions**: simulator input files, including restarts
//!    from any recorded timestep
//! 4. **Analysis**: playback timing, energy statistics, conserved-quantity
//!    drift, extents
//! 5. **Benchmarks**: run logs, per-job log collation and collated results
//!
//! # Example
//!
//! ```
//! use nbody_trace::parse;
//!
//! let text = "2 1 0.5 0.1\n10.0\n20.0\n0.0 100.0\n1.0 2.0 0.1 0.2\n3.0 4.0 0.3 0.4";
//! let parsed = parse(text).unwrap();
//! assert!(parsed.warnings.is_empty());
//! assert_eq!(parsed.trace.masses(), &[10.0, 20.0]);
//! ```

pub mod analysis;
pub mod benchmark;
pub mod error;
pub mod initial;
pub mod model;
pub mod reader;
pub mod writer;

// Re-export key types for convenience
pub use error::{ErrorKind, TraceError, TraceWarning};
pub use initial::InitialConditions;
pub use model::{Body, SimulationHeader, Timestep, Trace, Trajectory};
pub use reader::{parse, ParsedTrace, ReaderConfig, TraceReader};
pub use writer::{write_trace, FloatFormat, TraceWriter};
