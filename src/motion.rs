use std::thread;
use std::time::Duration;

use log::debug;

use crate::error::{ActuatorError, CommandError, ConcurrencyError, MotionError};

/// Mechanical axes of the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Carriage,
    Feed,
}

/// Controller commands as they appear in hardware error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionCommand {
    Home,
    MoveTo,
    Strike,
    Feed,
}

/// Low-level driver seam between the controller and the motors.
///
/// Implementations wrap real hub hardware or a simulation; the controller
/// never talks to a motor any other way. All calls block until the motion
/// is done.
pub trait Drive {
    /// Highest reachable dot column; carriage travel is `0..=max_column`.
    fn max_column(&self) -> u32;

    /// Move the carriage to an absolute dot column.
    fn move_to(&mut self, column: u32) -> Result<(), MotionError>;

    /// Press the head onto the paper.
    fn engage(&mut self) -> Result<(), ActuatorError>;

    /// Lift the head off the paper.
    fn disengage(&mut self) -> Result<(), ActuatorError>;

    /// Advance the paper by `steps` feed steps.
    fn advance(&mut self, steps: u32) -> Result<(), MotionError>;

    /// Cut power to every motor. Must always succeed.
    fn release(&mut self);
}

/// Last mechanical position the controller observed. Updated only after a
/// drive call succeeds, so a failed command leaves the previous reading.
#[derive(Debug, Clone, Copy)]
pub struct MotionState {
    carriage: u32,
    fed: u32,
    engaged: bool,
}

impl MotionState {
    /// Dot column the carriage last reached.
    pub fn carriage_column(&self) -> u32 {
        self.carriage
    }

    /// Total feed steps advanced since the controller was created.
    pub fn feed_position(&self) -> u32 {
        self.fed
    }

    pub fn head_engaged(&self) -> bool {
        self.engaged
    }
}

/// Validated, serialized access to a [`Drive`].
///
/// Range checks happen here, before the drive is touched, and only one
/// command may be in flight at a time.
pub struct MotionController<D: Drive> {
    drive: D,
    max_column: u32,
    dwell: Duration,
    backlash: u32,
    state: MotionState,
    in_flight: bool,
    released: bool,
}

impl<D: Drive> MotionController<D> {
    /// `dwell` is how long the head stays pressed down per strike.
    pub fn new(drive: D, dwell: Duration) -> MotionController<D> {
        let max_column = drive.max_column();
        debug!("motion controller up, columns 0..={}", max_column);
        MotionController {
            drive,
            max_column,
            dwell,
            backlash: 0,
            state: MotionState {
                carriage: 0,
                fed: 0,
                engaged: false,
            },
            in_flight: false,
            released: false,
        }
    }

    /// Enable backlash correction, builder-style: a backward carriage move
    /// overshoots its target by `dots` toward column 0, then approaches it
    /// moving forward, so every strike column is reached from the same
    /// side of the gear train slack. Zero, the default, disables the
    /// correction.
    pub fn with_backlash(self, dots: u32) -> MotionController<D> {
        MotionController {
            backlash: dots,
            ..self
        }
    }

    pub fn max_column(&self) -> u32 {
        self.max_column
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    /// Return the carriage to column 0.
    pub fn home(&mut self) -> Result<(), CommandError> {
        self.guarded(|c| {
            c.drive.move_to(0)?;
            c.state.carriage = 0;
            Ok(())
        })
    }

    /// Move the carriage to `column`. Out-of-range targets are rejected
    /// here; the drive never sees them. Backward moves apply the
    /// [backlash correction](Self::with_backlash) when one is configured.
    pub fn move_carriage_to(&mut self, column: u32) -> Result<(), CommandError> {
        if column > self.max_column {
            return Err(MotionError::OutOfRange {
                column,
                max: self.max_column,
            }
            .into());
        }
        self.guarded(|c| {
            if column < c.state.carriage {
                // The overshoot clamps at column 0 and is skipped when it
                // would land on the target itself.
                let overshoot = column.saturating_sub(c.backlash);
                if overshoot < column {
                    c.drive.move_to(overshoot)?;
                }
            }
            c.drive.move_to(column)?;
            c.state.carriage = column;
            Ok(())
        })
    }

    /// Print one dot at the current column: engage, dwell, disengage.
    pub fn strike(&mut self) -> Result<(), CommandError> {
        self.guarded(|c| {
            c.drive.engage()?;
            c.state.engaged = true;
            thread::sleep(c.dwell);
            c.drive.disengage()?;
            c.state.engaged = false;
            Ok(())
        })
    }

    /// Advance the paper by `steps` feed steps.
    pub fn feed(&mut self, steps: u32) -> Result<(), CommandError> {
        self.guarded(|c| {
            c.drive.advance(steps)?;
            c.state.fed += steps;
            Ok(())
        })
    }

    /// Cut power to the motors so the mechanism can be handled safely.
    /// Repeated calls are no-ops until another command energises the
    /// motors.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.drive.release();
        self.state.engaged = false;
        self.released = true;
        debug!("drive released");
    }

    fn guarded<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, CommandError>,
    ) -> Result<T, CommandError> {
        if self.in_flight {
            return Err(ConcurrencyError.into());
        }
        // Even a command that goes on to stall has energised the motors,
        // so the next release must reach the drive again.
        self.released = false;
        self.in_flight = true;
        let result = op(self);
        self.in_flight = false;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every drive call; optionally stalls carriage moves.
    #[derive(Default)]
    struct RecorderDrive {
        calls: Vec<String>,
        releases: u32,
        stall_moves: bool,
    }

    impl Drive for RecorderDrive {
        fn max_column(&self) -> u32 {
            7
        }

        fn move_to(&mut self, column: u32) -> Result<(), MotionError> {
            if self.stall_moves {
                return Err(MotionError::Stall(Axis::Carriage));
            }
            self.calls.push(format!("move {}", column));
            Ok(())
        }

        fn engage(&mut self) -> Result<(), ActuatorError> {
            self.calls.push("engage".into());
            Ok(())
        }

        fn disengage(&mut self) -> Result<(), ActuatorError> {
            self.calls.push("disengage".into());
            Ok(())
        }

        fn advance(&mut self, steps: u32) -> Result<(), MotionError> {
            self.calls.push(format!("advance {}", steps));
            Ok(())
        }

        fn release(&mut self) {
            self.releases += 1;
        }
    }

    fn controller() -> MotionController<RecorderDrive> {
        MotionController::new(RecorderDrive::default(), Duration::from_millis(0))
    }

    #[test]
    fn move_within_range_updates_state() {
        let mut motion = controller();
        motion.move_carriage_to(5).unwrap();
        assert_eq!(motion.state().carriage_column(), 5);
        assert_eq!(motion.drive().calls, ["move 5"]);
    }

    #[test]
    fn out_of_range_is_rejected_before_the_drive_moves() {
        let mut motion = controller();
        let err = motion.move_carriage_to(8).unwrap_err();
        assert_eq!(
            err,
            CommandError::Motion(MotionError::OutOfRange { column: 8, max: 7 })
        );
        assert_eq!(motion.state().carriage_column(), 0);
        assert!(motion.drive().calls.is_empty());
    }

    #[test]
    fn max_column_itself_is_reachable() {
        let mut motion = controller();
        motion.move_carriage_to(7).unwrap();
        assert_eq!(motion.state().carriage_column(), 7);
    }

    #[test]
    fn backward_move_with_backlash_overshoots_then_approaches() {
        let mut motion = controller().with_backlash(2);
        motion.move_carriage_to(5).unwrap();
        motion.move_carriage_to(3).unwrap();
        assert_eq!(motion.drive().calls, ["move 5", "move 1", "move 3"]);
        assert_eq!(motion.state().carriage_column(), 3);
    }

    #[test]
    fn backlash_overshoot_clamps_at_column_zero() {
        let mut motion = controller().with_backlash(4);
        motion.move_carriage_to(6).unwrap();
        motion.move_carriage_to(2).unwrap();
        motion.move_carriage_to(0).unwrap();
        assert_eq!(
            motion.drive().calls,
            ["move 6", "move 0", "move 2", "move 0"]
        );
    }

    #[test]
    fn backlash_is_off_by_default() {
        let mut motion = controller();
        motion.move_carriage_to(5).unwrap();
        motion.move_carriage_to(1).unwrap();
        assert_eq!(motion.drive().calls, ["move 5", "move 1"]);
    }

    #[test]
    fn strike_engages_then_disengages() {
        let mut motion = controller();
        motion.strike().unwrap();
        assert_eq!(motion.drive().calls, ["engage", "disengage"]);
        assert!(!motion.state().head_engaged());
    }

    #[test]
    fn feed_accumulates_steps() {
        let mut motion = controller();
        motion.feed(4).unwrap();
        motion.feed(4).unwrap();
        assert_eq!(motion.state().feed_position(), 8);
        assert_eq!(motion.drive().calls, ["advance 4", "advance 4"]);
    }

    #[test]
    fn failed_move_leaves_state_untouched() {
        let mut motion = controller();
        motion.move_carriage_to(3).unwrap();
        motion.drive.stall_moves = true;
        let err = motion.move_carriage_to(6).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(motion.state().carriage_column(), 3);
    }

    #[test]
    fn command_while_in_flight_reports_concurrency() {
        let mut motion = controller();
        motion.in_flight = true;
        let err = motion.feed(1).unwrap_err();
        assert!(!err.is_retryable());
        assert!(matches!(err, CommandError::Concurrency(_)));
    }

    #[test]
    fn release_reaches_the_drive_once() {
        let mut motion = controller();
        motion.release();
        motion.release();
        assert_eq!(motion.drive().releases, 1);
    }

    #[test]
    fn home_rearms_motion_after_release() {
        let mut motion = controller();
        motion.release();
        motion.home().unwrap();
        motion.release();
        assert_eq!(motion.drive().releases, 2);
    }

    #[test]
    fn every_command_rearms_motion_after_release() {
        let mut motion = controller();
        motion.release();
        motion.feed(1).unwrap();
        motion.release();
        assert_eq!(motion.drive().releases, 2);
    }

    #[test]
    fn failed_command_still_rearms_motion_after_release() {
        let mut motion = controller();
        motion.release();
        motion.drive.stall_moves = true;
        motion.home().unwrap_err();
        motion.release();
        assert_eq!(motion.drive().releases, 2);
    }
}
