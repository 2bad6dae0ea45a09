use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::{CommandError, Error};
use crate::motion::{Drive, MotionCommand, MotionController};
use crate::plan::{FeedPhase, JobStatus, PrintJob};

const REQ_NONE: u8 = 0;
const REQ_PAUSE: u8 = 1;
const REQ_ABORT: u8 = 2;

/// Progress notifications emitted while a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    StatusChanged(JobStatus),
    RowCompleted { row: usize, total: usize },
}

/// Cloneable handle for pausing or aborting a running job from another
/// thread.
///
/// Requests are sampled at row boundaries only; motion already under way
/// always completes first, so the mechanism is never stopped mid-strike.
#[derive(Debug, Clone, Default)]
pub struct JobControl {
    request: Arc<AtomicU8>,
}

impl JobControl {
    pub fn new() -> JobControl {
        JobControl {
            request: Arc::new(AtomicU8::new(REQ_NONE)),
        }
    }

    /// Ask the engine to pause at the next row boundary.
    pub fn pause(&self) {
        // fetch_max keeps an abort that raced in ahead of this pause.
        self.request.fetch_max(REQ_PAUSE, Ordering::SeqCst);
    }

    /// Ask the engine to stop the job at the next row boundary. Wins over
    /// a pending pause.
    pub fn abort(&self) {
        self.request.fetch_max(REQ_ABORT, Ordering::SeqCst);
    }

    fn take(&self) -> u8 {
        self.request.swap(REQ_NONE, Ordering::SeqCst)
    }

    fn clear(&self) {
        self.request.store(REQ_NONE, Ordering::SeqCst);
    }
}

/// Runs [`PrintJob`]s against a [`MotionController`], row by row.
///
/// The engine owns the job lifecycle: it homes the carriage, walks the
/// planned strikes, retries transient faults once, and always releases
/// the drive when a job reaches a terminal state.
pub struct PrintEngine<D: Drive> {
    motion: MotionController<D>,
    controls: JobControl,
    observer: Option<Box<dyn FnMut(JobEvent)>>,
}

impl<D: Drive> PrintEngine<D> {
    pub fn new(motion: MotionController<D>) -> PrintEngine<D> {
        PrintEngine {
            motion,
            controls: JobControl::new(),
            observer: None,
        }
    }

    /// Register a progress callback, builder-style.
    pub fn with_observer(self, observer: impl FnMut(JobEvent) + 'static) -> Self {
        PrintEngine {
            observer: Some(Box::new(observer)),
            ..self
        }
    }

    /// Handle for pausing or aborting from outside the printing thread.
    pub fn controls(&self) -> JobControl {
        self.controls.clone()
    }

    pub fn motion(&self) -> &MotionController<D> {
        &self.motion
    }

    /// Run a pending job, blocking until it is done, paused, aborted or
    /// failed.
    ///
    /// A bitmap wider than the carriage is rejected before any motion and
    /// the job stays `Pending`. Control requests left over from an
    /// earlier job are discarded.
    pub fn start(&mut self, job: &mut PrintJob) -> Result<(), Error> {
        if job.status() != JobStatus::Pending {
            return Err(Error::UnexpectedStatus {
                expected: "Pending",
                found: job.status(),
            });
        }
        // Bitmap width is never zero; comparing on width - 1 keeps
        // max_column + 1 from wrapping on a drive with full u32 travel.
        if job.width() - 1 > self.motion.max_column() {
            return Err(Error::TooWide {
                width: job.width(),
                printable: self.motion.max_column() + 1,
            });
        }
        self.controls.clear();
        info!(
            "starting job: {} rows, {} strikes",
            job.total_rows(),
            job.strike_count()
        );
        self.set_status(job, JobStatus::Running);
        self.attempt(job, 0, MotionCommand::Home, |m| m.home())?;
        self.run_rows(job)
    }

    /// Continue a paused job from its next unprinted row.
    ///
    /// The carriage is not re-homed: every move is absolute, so the
    /// position held through the pause is still trustworthy.
    pub fn resume(&mut self, job: &mut PrintJob) -> Result<(), Error> {
        if job.status() != JobStatus::Paused {
            return Err(Error::UnexpectedStatus {
                expected: "Paused",
                found: job.status(),
            });
        }
        info!(
            "resuming job at row {}/{}",
            job.current_row(),
            job.total_rows()
        );
        self.set_status(job, JobStatus::Running);
        self.run_rows(job)
    }

    /// Abort a paused job without printing anything further.
    pub fn abort(&mut self, job: &mut PrintJob) -> Result<(), Error> {
        if job.status() != JobStatus::Paused {
            return Err(Error::UnexpectedStatus {
                expected: "Paused",
                found: job.status(),
            });
        }
        self.finish(job, JobStatus::Aborted);
        Ok(())
    }

    fn run_rows(&mut self, job: &mut PrintJob) -> Result<(), Error> {
        while job.current_row() < job.total_rows() {
            match self.controls.take() {
                REQ_ABORT => {
                    self.finish(job, JobStatus::Aborted);
                    return Ok(());
                }
                REQ_PAUSE => {
                    self.set_status(job, JobStatus::Paused);
                    info!(
                        "paused before row {}/{}",
                        job.current_row(),
                        job.total_rows()
                    );
                    return Ok(());
                }
                _ => {}
            }
            let index = job.current_row();
            self.run_row(job, index)?;
            job.advance();
            self.emit(JobEvent::RowCompleted {
                row: index,
                total: job.total_rows(),
            });
        }
        self.finish(job, JobStatus::Done);
        Ok(())
    }

    fn run_row(&mut self, job: &mut PrintJob, index: usize) -> Result<(), Error> {
        let row = job.row(index).clone();
        debug!(
            "row {}/{}: {} strikes, {:?}",
            index + 1,
            job.total_rows(),
            row.strikes().len(),
            row.direction()
        );
        let steps = job.feed_per_row();
        if row.feed_phase() == FeedPhase::BeforeStrikes {
            self.attempt(job, index, MotionCommand::Feed, |m| m.feed(steps))?;
        }
        for &column in row.strikes() {
            self.attempt(job, index, MotionCommand::MoveTo, |m| {
                m.move_carriage_to(column)
            })?;
            self.attempt(job, index, MotionCommand::Strike, |m| m.strike())?;
        }
        if row.feed_phase() == FeedPhase::AfterStrikes {
            self.attempt(job, index, MotionCommand::Feed, |m| m.feed(steps))?;
        }
        Ok(())
    }

    /// One motion command with a single retry for transient faults. A
    /// second failure, or a non-retryable one, fails the job and releases
    /// the drive.
    fn attempt(
        &mut self,
        job: &mut PrintJob,
        row: usize,
        command: MotionCommand,
        op: impl Fn(&mut MotionController<D>) -> Result<(), CommandError>,
    ) -> Result<(), Error> {
        let source = match op(&mut self.motion) {
            Ok(()) => return Ok(()),
            Err(first) if first.is_retryable() => {
                warn!("{:?} failed at row {} ({}), retrying once", command, row, first);
                match op(&mut self.motion) {
                    Ok(()) => return Ok(()),
                    Err(second) => second,
                }
            }
            Err(first) => first,
        };
        self.finish(job, JobStatus::Failed);
        Err(Error::Hardware {
            row,
            command,
            source,
        })
    }

    fn finish(&mut self, job: &mut PrintJob, status: JobStatus) {
        self.set_status(job, status);
        self.motion.release();
        info!(
            "job {:?} at row {}/{}",
            status,
            job.current_row(),
            job.total_rows()
        );
    }

    fn set_status(&mut self, job: &mut PrintJob, status: JobStatus) {
        job.set_status(status);
        self.emit(JobEvent::StatusChanged(status));
    }

    fn emit(&mut self, event: JobEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
    }
}
