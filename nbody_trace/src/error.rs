//! Error and warning types for trace parsing.
//!
//! Every fatal condition is its own variant so a caller can tell a file that
//! is not a trace at all (header errors) from a truncated or corrupt trace
//! (count errors) and from a single bad timestep block.

use thiserror::Error;

/// Fatal errors raised while reading a trace or an initial-conditions file.
///
/// `line` is the 1-based line number in the input buffer. `block` is the
/// 0-based index of the timestep block.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum TraceError {
    /// The first line is not `<bodies> <timesteps> <interval> <delta_t>`.
    #[error("Malformed header at line {line}: {reason}")]
    MalformedHeader { line: usize, reason: String },

    /// Fewer mass lines than bodies, or a mass line that is not one float.
    #[error("Mass count mismatch at line {line}: expected {expected} masses, found {found} ({reason})")]
    MassCountMismatch {
        line: usize,
        expected: usize,
        found: usize,
        reason: String,
    },

    /// No timestep blocks although the header declares some.
    #[error("Empty trace: header declares {declared} timesteps but none were found")]
    EmptyTrace { declared: usize },

    /// A block's first line is not `<timestamp> <total_energy>`.
    #[error("Malformed timestep header in block {block} at line {line}: {reason}")]
    MalformedTimestepHeader {
        block: usize,
        line: usize,
        reason: String,
    },

    /// A body line is not `<x> <y> <vx> <vy>`.
    #[error("Malformed body line in block {block} at line {line}: {reason}")]
    MalformedBodyLine {
        block: usize,
        line: usize,
        reason: String,
    },

    /// A block holds a different number of bodies than the header declares.
    #[error("Body count mismatch in block {block} at line {line}: expected {expected} bodies, found {found}")]
    BodyCountMismatch {
        block: usize,
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Declared and parsed timestep counts differ (strict mode only).
    #[error("Declared {declared} timesteps but parsed {parsed}")]
    DeclaredCountMismatch { declared: usize, parsed: usize },

    /// A block's timestamp is lower than the previous block's (escalated warning).
    #[error("Timestamp {current} in block {block} at line {line} precedes previous timestamp {previous}")]
    NonMonotonicTimestamp {
        block: usize,
        line: usize,
        previous: f64,
        current: f64,
    },
}

/// Coarse classification of a [`TraceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input does not look like this format at all.
    Header,
    /// The input is this format but truncated or corrupt.
    Truncated,
    /// A single timestep block is inconsistent.
    Block,
}

impl TraceError {
    /// Creates a header error.
    pub fn header(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            line,
            reason: reason.into(),
        }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedHeader { .. } => ErrorKind::Header,
            Self::MassCountMismatch { .. }
            | Self::EmptyTrace { .. }
            | Self::DeclaredCountMismatch { .. } => ErrorKind::Truncated,
            Self::MalformedTimestepHeader { .. }
            | Self::MalformedBodyLine { .. }
            | Self::BodyCountMismatch { .. }
            | Self::NonMonotonicTimestamp { .. } => ErrorKind::Block,
        }
    }

    /// Returns the input line the error points at, if it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedHeader { line, .. }
            | Self::MassCountMismatch { line, .. }
            | Self::MalformedTimestepHeader { line, .. }
            | Self::MalformedBodyLine { line, .. }
            | Self::BodyCountMismatch { line, .. }
            | Self::NonMonotonicTimestamp { line, .. } => Some(*line),
            Self::EmptyTrace { .. } | Self::DeclaredCountMismatch { .. } => None,
        }
    }

    /// Returns the timestep block index the error points at, if any.
    pub fn block(&self) -> Option<usize> {
        match self {
            Self::MalformedTimestepHeader { block, .. }
            | Self::MalformedBodyLine { block, .. }
            | Self::BodyCountMismatch { block, .. }
            | Self::NonMonotonicTimestamp { block, .. } => Some(*block),
            _ => None,
        }
    }
}

/// Non-fatal conditions surfaced next to a successfully parsed trace.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceWarning {
    /// Number of parsed timesteps differs from the header's declaration.
    DeclaredCountMismatch { declared: usize, parsed: usize },

    /// A timestamp went backwards relative to the previous block.
    NonMonotonicTimestamp {
        block: usize,
        line: usize,
        previous: f64,
        current: f64,
    },
}

impl TraceWarning {
    /// Converts the warning into the matching fatal error.
    pub fn into_error(self) -> TraceError {
        match self {
            Self::DeclaredCountMismatch { declared, parsed } => {
                TraceError::DeclaredCountMismatch { declared, parsed }
            }
            Self::NonMonotonicTimestamp {
                block,
                line,
                previous,
                current,
            } => TraceError::NonMonotonicTimestamp {
                block,
                line,
                previous,
                current,
            },
        }
    }
}

impl std::fmt::Display for TraceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeclaredCountMismatch { declared, parsed } => {
                write!(f, "header declares {} timesteps but {} were parsed", declared, parsed)
            }
            Self::NonMonotonicTimestamp {
                block,
                line,
                previous,
                current,
            } => write!(
                f,
                "timestamp {} in block {} (line {}) precedes previous timestamp {}",
                current, block, line, previous
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_separate_header_truncation_and_block() {
        assert_eq!(TraceError::header(1, "x").kind(), ErrorKind::Header);
        assert_eq!(TraceError::EmptyTrace { declared: 3 }.kind(), ErrorKind::Truncated);
        let err = TraceError::BodyCountMismatch {
            block: 2,
            line: 10,
            expected: 2,
            found: 3,
        };
        assert_eq!(err.kind(), ErrorKind::Block);
        assert_eq!(err.block(), Some(2));
        assert_eq!(err.line(), Some(10));
    }

    #[test]
    fn test_message_names_location() {
        let err = TraceError::MalformedBodyLine {
            block: 0,
            line: 5,
            reason: "expected 4 numeric tokens, found 3".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("block 0"));
        assert!(msg.contains("line 5"));
    }

    #[test]
    fn test_warning_escalates_to_error() {
        let warning = TraceWarning::DeclaredCountMismatch { declared: 5, parsed: 3 };
        assert_eq!(
            warning.into_error(),
            TraceError::DeclaredCountMismatch { declared: 5, parsed: 3 }
        );

        let err = TraceWarning::NonMonotonicTimestamp {
            block: 1,
            line: 6,
            previous: 1.0,
            current: 0.5,
        }
        .into_error();
        assert!(matches!(err, TraceError::NonMonotonicTimestamp { block: 1, line: 6, .. }));
        assert_eq!(err.kind(), ErrorKind::Block);
        assert_eq!(err.line(), Some(6));
    }
}
