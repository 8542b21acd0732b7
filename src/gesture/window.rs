// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Fixed-capacity rolling window over recent scalar observations.
//!
//! The gesture controller uses one of these per tracked quantity to confirm
//! a value before acting on it: mean for continuous positions (jitter should
//! average out), median for finger counts (single-frame misclassifications
//! should be rejected outright).

/// A bounded FIFO of scalar samples backed by a ring buffer.
/// Fullness is an O(1) check against `count`.
pub struct SignalWindow {
    samples: Vec<f64>,
    capacity: usize,
    head: usize,
    count: usize,
}

impl SignalWindow {
    /// Creates a window that holds the most recent `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity.max(1)],
            capacity: capacity.max(1),
            head: 0,
            count: 0,
        }
    }

    /// Appends a sample, evicting the oldest if the window is at capacity.
    pub fn push(&mut self, value: f64) {
        self.samples[self.head] = value;
        self.head = (self.head + 1) % self.capacity;
        if self.count < self.capacity {
            self.count += 1;
        }
    }

    /// True once `capacity` samples have been pushed since the last clear.
    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    /// Empties the window, discarding any in-progress aggregation.
    pub fn clear(&mut self) {
        self.head = 0;
        self.count = 0;
    }

    /// The arithmetic mean of the window contents. `None` when empty.
    /// Callers that need a confirmed value should check `is_full` first.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let sum: f64 = self.contents().sum();
        Some(sum / self.count as f64)
    }

    /// The median of the window contents, averaging the two middle values
    /// when the count is even. `None` when empty.
    pub fn median(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let mut sorted: Vec<f64> = self.contents().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    fn contents(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().take(self.count).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_and_evicts() {
        let mut window = SignalWindow::new(3);
        assert!(!window.is_full());
        assert_eq!(window.mean(), None);

        window.push(1.0);
        window.push(2.0);
        assert!(!window.is_full());

        window.push(3.0);
        assert!(window.is_full());
        assert_eq!(window.mean(), Some(2.0));

        // Pushing past capacity evicts the oldest sample.
        window.push(10.0);
        assert!(window.is_full());
        assert_eq!(window.mean(), Some(5.0));
    }

    #[test]
    fn test_clear_discards_accumulation() {
        let mut window = SignalWindow::new(2);
        window.push(1.0);
        window.push(2.0);
        assert!(window.is_full());

        window.clear();
        assert!(!window.is_full());
        assert_eq!(window.mean(), None);
        assert_eq!(window.median(), None);

        // A single post-clear sample is not enough to be full again.
        window.push(5.0);
        assert!(!window.is_full());
    }

    #[test]
    fn test_median_odd_and_even() {
        let mut window = SignalWindow::new(3);
        window.push(5.0);
        window.push(1.0);
        window.push(3.0);
        assert_eq!(window.median(), Some(3.0));

        let mut window = SignalWindow::new(4);
        for v in [0.0, 0.0, 1.0, 1.0] {
            window.push(v);
        }
        assert_eq!(window.median(), Some(0.5));
    }

    #[test]
    fn test_median_resists_outlier() {
        let mut window = SignalWindow::new(4);
        for v in [2.0, 2.0, 5.0, 2.0] {
            window.push(v);
        }
        // One misclassified frame does not move the median.
        assert_eq!(window.median(), Some(2.0));
    }

    #[test]
    fn test_zero_capacity_clamps_to_one() {
        let mut window = SignalWindow::new(0);
        window.push(4.0);
        assert!(window.is_full());
        assert_eq!(window.mean(), Some(4.0));
    }
}
