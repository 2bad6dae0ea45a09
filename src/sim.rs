use crate::error::{ActuatorError, MotionError};
use crate::motion::{Axis, Drive};
use crate::DotGrid;

/// In-memory printer for tests and dry runs: strikes land on a growing
/// grid of virtual paper instead of moving motors.
///
/// `steps_per_row` mirrors the feed gearing of a real device; the paper
/// row under the head is `feed_steps / steps_per_row`. Rows the head has
/// fed past are committed to the paper even when nothing was struck on
/// them, so blank bitmap rows show up in the output.
#[derive(Debug)]
pub struct SimDrive {
    max_column: u32,
    steps_per_row: u32,
    column: u32,
    feed_steps: u32,
    engaged: bool,
    paper: DotGrid,
}

impl SimDrive {
    pub fn new(max_column: u32, steps_per_row: u32) -> SimDrive {
        assert!(steps_per_row > 0, "steps_per_row must be at least 1");
        SimDrive {
            max_column,
            steps_per_row,
            column: 0,
            feed_steps: 0,
            engaged: false,
            paper: Vec::new(),
        }
    }

    /// Everything printed so far, top row first. Rows are always
    /// `max_column + 1` dots wide.
    pub fn paper(&self) -> &DotGrid {
        &self.paper
    }

    /// The paper as text, `#` for a struck dot and `.` for blank.
    pub fn render(&self) -> String {
        self.paper
            .iter()
            .map(|row| {
                row.iter()
                    .map(|dot| if *dot { '#' } else { '.' })
                    .collect::<String>()
            })
            .collect::<Vec<String>>()
            .join("\n")
    }

    fn current_row(&self) -> usize {
        (self.feed_steps / self.steps_per_row) as usize
    }

    fn ensure_row(&mut self, row: usize) {
        while self.paper.len() <= row {
            self.paper.push(vec![false; self.max_column as usize + 1]);
        }
    }
}

impl Drive for SimDrive {
    fn max_column(&self) -> u32 {
        self.max_column
    }

    fn move_to(&mut self, column: u32) -> Result<(), MotionError> {
        // The end stop: a real carriage driven past it grinds to a halt.
        if column > self.max_column {
            return Err(MotionError::Stall(Axis::Carriage));
        }
        self.column = column;
        Ok(())
    }

    fn engage(&mut self) -> Result<(), ActuatorError> {
        if self.engaged {
            return Err(ActuatorError::Obstructed);
        }
        let row = self.current_row();
        self.ensure_row(row);
        self.paper[row][self.column as usize] = true;
        self.engaged = true;
        Ok(())
    }

    fn disengage(&mut self) -> Result<(), ActuatorError> {
        self.engaged = false;
        Ok(())
    }

    fn advance(&mut self, steps: u32) -> Result<(), MotionError> {
        let from = self.current_row();
        self.feed_steps += steps;
        let to = self.current_row();
        if to > from {
            self.ensure_row(to - 1);
        }
        Ok(())
    }

    fn release(&mut self) {
        self.engaged = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strikes_land_where_the_head_sits() {
        let mut sim = SimDrive::new(3, 1);
        sim.move_to(2).unwrap();
        sim.engage().unwrap();
        sim.disengage().unwrap();
        sim.advance(1).unwrap();
        assert_eq!(sim.paper(), &vec![vec![false, false, true, false]]);
    }

    #[test]
    fn feeding_past_blank_rows_commits_them() {
        let mut sim = SimDrive::new(1, 1);
        sim.advance(1).unwrap();
        sim.advance(1).unwrap();
        assert_eq!(sim.paper().len(), 2);
        assert!(sim.paper().iter().all(|row| row == &[false, false]));
    }

    #[test]
    fn partial_feed_does_not_commit_a_row() {
        let mut sim = SimDrive::new(0, 4);
        sim.advance(2).unwrap();
        assert!(sim.paper().is_empty());
        sim.advance(2).unwrap();
        assert_eq!(sim.paper().len(), 1);
    }

    #[test]
    fn gearing_maps_steps_to_rows() {
        let mut sim = SimDrive::new(0, 4);
        sim.engage().unwrap();
        sim.disengage().unwrap();
        sim.advance(4).unwrap();
        sim.engage().unwrap();
        sim.disengage().unwrap();
        sim.advance(4).unwrap();
        assert_eq!(sim.paper(), &vec![vec![true], vec![true]]);
    }

    #[test]
    fn driving_past_the_end_stop_stalls() {
        let mut sim = SimDrive::new(3, 1);
        assert_eq!(sim.move_to(4).unwrap_err(), MotionError::Stall(Axis::Carriage));
    }

    #[test]
    fn engaging_twice_is_obstructed() {
        let mut sim = SimDrive::new(0, 1);
        sim.engage().unwrap();
        assert_eq!(sim.engage().unwrap_err(), ActuatorError::Obstructed);
    }

    #[test]
    fn render_uses_hash_for_dots() {
        let mut sim = SimDrive::new(1, 1);
        sim.move_to(0).unwrap();
        sim.engage().unwrap();
        sim.disengage().unwrap();
        sim.advance(1).unwrap();
        sim.advance(1).unwrap();
        assert_eq!(sim.render(), "#.\n..");
    }
}
