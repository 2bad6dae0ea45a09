//! Dot-Matrix Printer Driver
//!
//! This crate provides the print-control core for hub-driven dot-matrix
//! plotters: machines that print PBM images one struck dot at a time with
//! a carriage motor, a paper feed and a pen actuator.
//!
//! # Example
//!
//! ```rust
//! use dot_printer::{pbm, MotionController, PlanConfig, PrintEngine, SimDrive};
//! use std::time::Duration;
//!
//! let bitmap = pbm::decode("P1\n2 2\n0 1\n1 0\n").unwrap();
//! let mut job = PlanConfig::new().build(&bitmap).unwrap();
//!
//! let motion = MotionController::new(SimDrive::new(1, 1), Duration::from_millis(0));
//! let mut engine = PrintEngine::new(motion);
//! engine.start(&mut job).unwrap();
//!
//! assert_eq!(engine.motion().drive().render(), ".#\n#.");
//! ```

mod bitmap;
mod engine;
mod error;
mod motion;
pub mod pbm;
mod plan;
mod sim;

pub use crate::{
    bitmap::Bitmap,
    engine::{JobControl, JobEvent, PrintEngine},
    error::{
        ActuatorError, CommandError, ConcurrencyError, ConfigError, Error, FormatError,
        MotionError,
    },
    motion::{Axis, Drive, MotionCommand, MotionController, MotionState},
    plan::{Direction, FeedPhase, JobStatus, PlanConfig, PrintJob, RowPlan},
    sim::SimDrive,
};

/// Type alias for the 1-bit dot grids exchanged with drives.
///
/// Each inner `Vec<bool>` is one row of dots, top row first; `true` marks
/// a printed dot. The outer Vec holds the rows in feed order.
pub type DotGrid = Vec<Vec<bool>>;
