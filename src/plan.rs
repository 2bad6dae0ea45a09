use log::{debug, warn};

use crate::bitmap::Bitmap;
use crate::error::ConfigError;

/// Carriage travel direction for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

/// When the paper feed for a row happens relative to its strikes.
///
/// One value per job, stamped on every row; mixing phases within a job
/// would make the vertical position of a row depend on its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    BeforeStrikes,
    AfterStrikes,
}

/// Lifecycle of a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Done,
    Failed,
    Aborted,
}

/// Planned strikes and feed for a single bitmap row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPlan {
    direction: Direction,
    strikes: Vec<u32>,
    feed_phase: FeedPhase,
    collapsed: u32,
}

impl RowPlan {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Dot columns to strike, in the order the carriage passes them.
    pub fn strikes(&self) -> &[u32] {
        &self.strikes
    }

    pub fn feed_phase(&self) -> FeedPhase {
        self.feed_phase
    }

    /// Strikes merged away by the minimum-gap rule, kept for diagnostics.
    pub fn collapsed(&self) -> u32 {
        self.collapsed
    }

    pub fn is_blank(&self) -> bool {
        self.strikes.is_empty()
    }
}

/// An ordered sequence of row plans plus job bookkeeping.
///
/// Built once from a bitmap, then mutated only by the print engine while
/// it runs.
#[derive(Debug, Clone)]
pub struct PrintJob {
    width: u32,
    feed_per_row: u32,
    rows: Vec<RowPlan>,
    cursor: usize,
    status: JobStatus,
}

impl PrintJob {
    /// Width of the source bitmap in dots.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Feed steps issued after (or before) each row.
    pub fn feed_per_row(&self) -> u32 {
        self.feed_per_row
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    /// Index of the next row to print.
    pub fn current_row(&self) -> usize {
        self.cursor
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn row(&self, index: usize) -> &RowPlan {
        &self.rows[index]
    }

    pub fn rows(&self) -> impl Iterator<Item = &RowPlan> {
        self.rows.iter()
    }

    /// Total strikes the job will fire.
    pub fn strike_count(&self) -> usize {
        self.rows.iter().map(|r| r.strikes.len()).sum()
    }

    /// Total strikes merged away by the minimum-gap rule.
    pub fn collapsed_strikes(&self) -> u32 {
        self.rows.iter().map(|r| r.collapsed).sum()
    }

    pub(crate) fn set_status(&mut self, status: JobStatus) {
        self.status = status;
    }

    pub(crate) fn advance(&mut self) {
        self.cursor += 1;
    }
}

/// Print-plan options, chained builder-style:
///
/// ```
/// use dot_printer::PlanConfig;
///
/// let config = PlanConfig::new().bidirectional(false).min_strike_gap(2);
/// ```
#[derive(Debug, Clone)]
pub struct PlanConfig {
    bidirectional: bool,
    min_strike_gap: u32,
    feed_per_row: u32,
    feed_phase: FeedPhase,
}

impl PlanConfig {
    pub fn new() -> PlanConfig {
        PlanConfig {
            bidirectional: true,
            min_strike_gap: 0,
            feed_per_row: 1,
            feed_phase: FeedPhase::AfterStrikes,
        }
    }

    /// Alternate carriage direction per row (serpentine printing) to skip
    /// the full-width return traverse. Enabled by default.
    pub fn bidirectional(self, flag: bool) -> Self {
        PlanConfig {
            bidirectional: flag,
            ..self
        }
    }

    /// Minimum dot-column spacing between consecutive strikes, for heads
    /// that cannot re-fire instantly at full carriage speed. Closer
    /// strikes are merged into the earlier one and counted per row.
    /// 0 (the default) keeps every strike.
    pub fn min_strike_gap(self, gap: u32) -> Self {
        PlanConfig {
            min_strike_gap: gap,
            ..self
        }
    }

    /// Device-specific feed steps per printed row. Must be at least 1.
    pub fn feed_per_row(self, steps: u32) -> Self {
        PlanConfig {
            feed_per_row: steps,
            ..self
        }
    }

    /// Feed the paper before or after each row's strikes.
    pub fn feed_phase(self, phase: FeedPhase) -> Self {
        PlanConfig {
            feed_phase: phase,
            ..self
        }
    }

    /// Turn a bitmap into an ordered print job.
    ///
    /// Pure transformation, no hardware involved: building twice from the
    /// same bitmap and config yields identical jobs. Rows without set bits
    /// get an empty strike list but still consume their feed step, so the
    /// vertical geometry of the output is preserved.
    pub fn build(&self, bitmap: &Bitmap) -> Result<PrintJob, ConfigError> {
        if self.feed_per_row == 0 {
            return Err(ConfigError::ZeroFeed);
        }

        let mut rows = Vec::with_capacity(bitmap.height() as usize);
        for (index, dots) in bitmap.rows().enumerate() {
            let direction = if self.bidirectional && index % 2 == 1 {
                Direction::RightToLeft
            } else {
                Direction::LeftToRight
            };
            let mut offsets: Vec<u32> = dots
                .iter()
                .enumerate()
                .filter(|(_, set)| **set)
                .map(|(column, _)| column as u32)
                .collect();
            if direction == Direction::RightToLeft {
                offsets.reverse();
            }
            let (strikes, collapsed) = collapse(offsets, self.min_strike_gap);
            if collapsed > 0 {
                warn!(
                    "row {}: merged {} strikes closer than {} dots",
                    index, collapsed, self.min_strike_gap
                );
            }
            rows.push(RowPlan {
                direction,
                strikes,
                feed_phase: self.feed_phase,
                collapsed,
            });
        }

        let job = PrintJob {
            width: bitmap.width(),
            feed_per_row: self.feed_per_row,
            rows,
            cursor: 0,
            status: JobStatus::Pending,
        };
        debug!(
            "planned {} rows, {} strikes ({} collapsed)",
            job.total_rows(),
            job.strike_count(),
            job.collapsed_strikes()
        );
        Ok(job)
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Greedy gap filter: keep a strike iff it is the row's first or at least
/// `gap` columns from the last kept one, counting the merged ones.
fn collapse(offsets: Vec<u32>, gap: u32) -> (Vec<u32>, u32) {
    if gap <= 1 {
        // Distinct columns are always at least one apart.
        return (offsets, 0);
    }
    let mut kept: Vec<u32> = Vec::with_capacity(offsets.len());
    let mut merged = 0;
    for offset in offsets {
        match kept.last() {
            Some(last) if offset.abs_diff(*last) < gap => merged += 1,
            _ => kept.push(offset),
        }
    }
    (kept, merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbm;

    fn checker() -> Bitmap {
        pbm::decode("P1\n2 2\n0 1\n1 0\n").unwrap()
    }

    #[test]
    fn serpentine_alternates_direction_by_row_parity() {
        let job = PlanConfig::new().build(&checker()).unwrap();
        assert_eq!(job.total_rows(), 2);
        assert_eq!(job.row(0).direction(), Direction::LeftToRight);
        assert_eq!(job.row(0).strikes(), &[1]);
        assert_eq!(job.row(1).direction(), Direction::RightToLeft);
        assert_eq!(job.row(1).strikes(), &[0]);
        assert_eq!(job.status(), JobStatus::Pending);
    }

    #[test]
    fn unidirectional_keeps_every_row_left_to_right() {
        let bitmap = pbm::decode("P1\n3 2\n1 0 1\n1 0 1\n").unwrap();
        let job = PlanConfig::new().bidirectional(false).build(&bitmap).unwrap();
        for row in job.rows() {
            assert_eq!(row.direction(), Direction::LeftToRight);
            assert_eq!(row.strikes(), &[0, 2]);
        }
    }

    #[test]
    fn right_to_left_rows_list_strikes_in_descending_order() {
        let bitmap = pbm::decode("P1\n4 2\n1 1 1 1\n1 1 1 1\n").unwrap();
        let job = PlanConfig::new().build(&bitmap).unwrap();
        assert_eq!(job.row(0).strikes(), &[0, 1, 2, 3]);
        assert_eq!(job.row(1).strikes(), &[3, 2, 1, 0]);
    }

    #[test]
    fn single_dot_bitmap_plans_one_strike_at_zero() {
        let bitmap = pbm::decode("P1\n1 1\n1\n").unwrap();
        let job = PlanConfig::new().build(&bitmap).unwrap();
        assert_eq!(job.total_rows(), 1);
        assert_eq!(job.row(0).strikes(), &[0]);
        assert_eq!(job.row(0).direction(), Direction::LeftToRight);
    }

    #[test]
    fn blank_rows_keep_their_feed_step() {
        let bitmap = pbm::decode("P1\n2 3\n00\n00\n00\n").unwrap();
        let job = PlanConfig::new().build(&bitmap).unwrap();
        assert_eq!(job.total_rows(), 3);
        assert!(job.rows().all(|r| r.is_blank()));
        assert_eq!(job.strike_count(), 0);
    }

    #[test]
    fn min_gap_merges_close_strikes_and_counts_them() {
        let bitmap = pbm::decode("P1\n8 1\n1 1 0 1 0 0 1 1\n").unwrap();
        let job = PlanConfig::new().min_strike_gap(3).build(&bitmap).unwrap();
        // Columns 0 1 3 6 7 -> keep 0, merge 1, keep 3, keep 6, merge 7.
        assert_eq!(job.row(0).strikes(), &[0, 3, 6]);
        assert_eq!(job.row(0).collapsed(), 2);
        assert_eq!(job.collapsed_strikes(), 2);
    }

    #[test]
    fn kept_strikes_respect_the_gap_in_both_directions() {
        let bitmap = pbm::decode("P1\n10 2\n1111111111\n1111111111\n").unwrap();
        let job = PlanConfig::new().min_strike_gap(4).build(&bitmap).unwrap();
        for row in job.rows() {
            let strikes = row.strikes();
            assert!(!strikes.is_empty());
            for pair in strikes.windows(2) {
                assert!(pair[0].abs_diff(pair[1]) >= 4);
            }
            for s in strikes {
                assert!(*s < 10);
            }
        }
    }

    #[test]
    fn gap_zero_and_one_keep_everything() {
        let bitmap = pbm::decode("P1\n4 1\n1111\n").unwrap();
        for gap in 0..=1 {
            let job = PlanConfig::new().min_strike_gap(gap).build(&bitmap).unwrap();
            assert_eq!(job.row(0).strikes(), &[0, 1, 2, 3]);
            assert_eq!(job.collapsed_strikes(), 0);
        }
    }

    #[test]
    fn building_twice_yields_identical_plans() {
        let bitmap = pbm::decode("P1\n5 4\n10101\n01010\n00000\n11111\n").unwrap();
        let config = PlanConfig::new().min_strike_gap(2).feed_per_row(3);
        let a = config.build(&bitmap).unwrap();
        let b = config.build(&bitmap).unwrap();
        let rows_a: Vec<&RowPlan> = a.rows().collect();
        let rows_b: Vec<&RowPlan> = b.rows().collect();
        assert_eq!(rows_a, rows_b);
        assert_eq!(a.feed_per_row(), b.feed_per_row());
    }

    #[test]
    fn row_count_always_matches_bitmap_height() {
        for text in &["P1\n2 1\n11\n", "P1\n2 4\n00\n10\n00\n01\n"] {
            let bitmap = pbm::decode(text).unwrap();
            let job = PlanConfig::new().build(&bitmap).unwrap();
            assert_eq!(job.total_rows(), bitmap.height() as usize);
        }
    }

    #[test]
    fn zero_feed_is_rejected() {
        let err = PlanConfig::new().feed_per_row(0).build(&checker()).unwrap_err();
        assert_eq!(err, ConfigError::ZeroFeed);
    }

    #[test]
    fn feed_phase_is_stamped_on_every_row() {
        let job = PlanConfig::new()
            .feed_phase(FeedPhase::BeforeStrikes)
            .build(&checker())
            .unwrap();
        assert!(job.rows().all(|r| r.feed_phase() == FeedPhase::BeforeStrikes));
    }
}
