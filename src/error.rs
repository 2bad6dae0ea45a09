//! Error types for print-control operations.
//!
//! This module defines all possible errors that can occur while decoding
//! images, building print plans, and driving the printer hardware.

use thiserror::Error;

use crate::motion::{Axis, MotionCommand};
use crate::plan::JobStatus;

/// Main error type for print jobs.
///
/// This enum encompasses everything that can go wrong between handing a
/// PBM text to the decoder and the last feed step of a job, from malformed
/// input to hardware faults mid-print.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed PBM input or bitmap data.
    ///
    /// Raised before any hardware motion; a bad image never partially
    /// prints. Never retried.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Invalid plan configuration.
    ///
    /// Raised when the plan is built, before any hardware motion.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Hardware failure that survived the single automatic retry.
    ///
    /// Carries the row index and the command that failed. The job is left
    /// `Failed` and the motors released; carriage and feed calibration are
    /// no longer trusted, so the job cannot be resumed.
    #[error("{command:?} failed at row {row}: {source}")]
    Hardware {
        row: usize,
        command: MotionCommand,
        #[source]
        source: CommandError,
    },

    /// The bitmap does not fit the device's printable width.
    ///
    /// Detected before the carriage moves; the job stays `Pending` and may
    /// be started on a wider device.
    #[error("bitmap is {width} dots wide but the device prints at most {printable}")]
    TooWide { width: u32, printable: u32 },

    /// Job state machine misuse, e.g. starting a job that is not pending.
    #[error("job is {found:?}, expected {expected}")]
    UnexpectedStatus {
        expected: &'static str,
        found: JobStatus,
    },
}

/// Parse errors for PBM "plain" (P1) input and bitmap construction.
///
/// These reject an image synchronously, before the printer is touched.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    /// The first token was not the `P1` magic.
    ///
    /// Only the ASCII variant is supported; `P4` (binary) input lands
    /// here as well.
    #[error("expected magic token `P1`, found `{found}`")]
    BadMagic { found: String },

    #[error("input ended before the header was complete")]
    TruncatedHeader,

    /// Width or height token is not a base-10 positive integer.
    #[error("invalid dimension token `{token}`")]
    InvalidDimension { token: String },

    #[error("dimensions must be positive, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },

    /// A raster character other than `0`, `1`, whitespace or a comment.
    #[error("raster character `{found}` at bit {index} is not 0 or 1")]
    InvalidBit { found: char, index: usize },

    /// The raster holds too few or too many bits for `width * height`.
    #[error("raster holds {found} bits, expected {expected}")]
    BitCount { expected: usize, found: usize },

    /// A programmatically supplied row differs in length from the first.
    #[error("row {row} is {found} dots wide, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Invalid plan configuration values, rejected at build time.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("feed amount per row must be at least 1")]
    ZeroFeed,
}

/// Axis failures reported by the motion layer.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MotionError {
    /// Target column is outside the device's addressable range.
    ///
    /// The range is discovered from the drive at controller construction;
    /// the check happens before the command reaches the hardware.
    #[error("column {column} is outside the addressable range 0..={max}")]
    OutOfRange { column: u32, max: u32 },

    /// The axis stopped before reaching its target.
    #[error("{0:?} axis stalled before reaching its target")]
    Stall(Axis),
}

/// Print-head failures reported by the actuator.
///
/// These indicate physical problems (a jammed linkage, something under the
/// head) that need operator intervention.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ActuatorError {
    #[error("print head stalled while engaging")]
    Stalled,

    #[error("print head path is obstructed")]
    Obstructed,
}

/// A motion command was issued while another was still in flight.
///
/// The printer has one carriage and one feed path, so commands are strictly
/// sequential. This is a programming-contract violation on the caller's
/// side and is always fatal; it is never retried.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("motion command issued while another is in flight")]
pub struct ConcurrencyError;

/// Everything a single motion-controller command can fail with.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error(transparent)]
    Motion(#[from] MotionError),

    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),
}

impl CommandError {
    /// Whether re-issuing the failed command once is worth trying.
    ///
    /// Transient axis and actuator faults get a single retry; a
    /// concurrency violation indicates a caller bug and never does.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Concurrency(_))
    }
}
