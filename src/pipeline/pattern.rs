// The track x step trigger grid, plus per-track mute flags.
//
// Rows are track-major and always exactly `num_steps` long. Every mutation
// here runs to completion on the session's context before anything reads the
// grid again, so a half-resized grid is never observable.

use crate::shared::DEFAULT_STEPS;

#[derive(Clone, Debug, PartialEq)]
pub struct PatternStore {
    rows: Vec<Vec<bool>>,
    mutes: Vec<bool>,
    num_steps: usize,
}

impl Default for PatternStore {
    fn default() -> Self {
        Self::new(0, DEFAULT_STEPS)
    }
}

impl PatternStore {
    pub fn new(num_tracks: usize, num_steps: usize) -> Self {
        let num_steps = num_steps.max(1);
        Self {
            rows: vec![vec![false; num_steps]; num_tracks],
            mutes: vec![false; num_tracks],
            num_steps,
        }
    }

    pub fn num_tracks(&self) -> usize {
        self.rows.len()
    }

    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    // Appends an empty, unmuted row and returns its index.
    pub fn add_track(&mut self) -> usize {
        self.rows.push(vec![false; self.num_steps]);
        self.mutes.push(false);
        self.rows.len() - 1
    }

    // Never drops below one track. Higher indices shift down by one.
    pub fn remove_track(&mut self, track: usize) -> bool {
        if self.rows.len() <= 1 || track >= self.rows.len() {
            return false;
        }
        self.rows.remove(track);
        self.mutes.remove(track);
        true
    }

    // Only the session uses this, right before rebuilding from a snapshot.
    pub(crate) fn clear_tracks(&mut self) {
        self.rows.clear();
        self.mutes.clear();
    }

    /// Grow (pads with `false`) or shrink (drops the tail of) every row.
    pub fn resize_steps(&mut self, new_count: usize) -> bool {
        if new_count == 0 {
            return false;
        }
        // build first, swap in one go
        let resized: Vec<Vec<bool>> = self
            .rows
            .iter()
            .map(|row| {
                let mut r = row.clone();
                r.resize(new_count, false);
                r
            })
            .collect();
        self.rows = resized;
        self.num_steps = new_count;
        true
    }

    pub fn toggle_cell(&mut self, track: usize, step: usize) -> bool {
        match self.rows.get_mut(track).and_then(|row| row.get_mut(step)) {
            Some(cell) => {
                *cell = !*cell;
                true
            }
            None => false,
        }
    }

    pub fn set_cell(&mut self, track: usize, step: usize, on: bool) -> bool {
        match self.rows.get_mut(track).and_then(|row| row.get_mut(step)) {
            Some(cell) => {
                *cell = on;
                true
            }
            None => false,
        }
    }

    pub fn cell(&self, track: usize, step: usize) -> bool {
        self.rows
            .get(track)
            .and_then(|row| row.get(step))
            .copied()
            .unwrap_or(false)
    }

    pub fn row(&self, track: usize) -> Option<&[bool]> {
        self.rows.get(track).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<bool>] {
        &self.rows
    }

    pub fn is_muted(&self, track: usize) -> bool {
        self.mutes.get(track).copied().unwrap_or(false)
    }

    pub fn set_muted(&mut self, track: usize, muted: bool) -> bool {
        match self.mutes.get_mut(track) {
            Some(m) => {
                *m = muted;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_not_ragged(p: &PatternStore) {
        for row in p.rows() {
            assert_eq!(row.len(), p.num_steps());
        }
    }

    #[test]
    fn resize_keeps_every_row_the_same_length() {
        let mut p = PatternStore::new(3, 16);
        p.toggle_cell(1, 15);
        p.toggle_cell(2, 3);
        for n in [32, 8, 8, 1, 64, 16] {
            assert!(p.resize_steps(n));
            assert_eq!(p.num_steps(), n);
            assert_not_ragged(&p);
        }
        // step 15 was dropped by the shrink to 8, step 3 survived
        assert!(!p.cell(1, 15));
        assert!(!p.cell(2, 3)); // ... but then the shrink to 1 dropped it too
    }

    #[test]
    fn growth_pads_with_false_and_keeps_data() {
        let mut p = PatternStore::new(2, 4);
        p.toggle_cell(0, 3);
        p.resize_steps(8);
        assert_eq!(p.row(0).unwrap(), &[false, false, false, true, false, false, false, false]);
    }

    #[test]
    fn zero_steps_is_rejected() {
        let mut p = PatternStore::new(2, 4);
        assert!(!p.resize_steps(0));
        assert_eq!(p.num_steps(), 4);
    }

    #[test]
    fn keeps_at_least_one_track() {
        let mut p = PatternStore::new(1, 16);
        assert_eq!(p.add_track(), 1);
        assert_eq!(p.add_track(), 2);
        assert!(p.remove_track(0));
        assert!(p.remove_track(1));
        assert_eq!(p.num_tracks(), 1);
        assert!(!p.remove_track(0));
        assert_eq!(p.num_tracks(), 1);
    }

    #[test]
    fn removal_shifts_rows_down() {
        let mut p = PatternStore::new(3, 4);
        p.toggle_cell(2, 1);
        p.set_muted(2, true);
        p.remove_track(0);
        assert!(p.cell(1, 1));
        assert!(p.is_muted(1));
    }

    #[test]
    fn out_of_bounds_is_a_no_op() {
        let mut p = PatternStore::new(2, 4);
        assert!(!p.toggle_cell(5, 0));
        assert!(!p.toggle_cell(0, 4));
        assert!(!p.set_muted(9, true));
        assert!(!p.cell(9, 9));
        assert!(p.row(2).is_none());
    }
}
