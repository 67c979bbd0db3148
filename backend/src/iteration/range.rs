//! Stateful range iterator
//!
//! A two-state machine: `Active { current }` until the next candidate would
//! cross `stop` (in the direction of `step`), then `Exhausted` for good.
//! An exhausted iterator never resets; draining it again yields nothing.

use tracing::trace;

use crate::exceptions::{ErrorKind, HostError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeState {
    Active { current: i64 },
    Exhausted,
}

/// Arithmetic progression from `start` by `step`, stopping before `stop`
///
/// # Example
/// ```
/// use host_bridge_core_rs::RangeIterator;
///
/// let mut iter = RangeIterator::new(0, 3, 1).unwrap();
/// assert_eq!(iter.by_ref().collect::<Vec<_>>(), vec![0, 1, 2]);
/// assert!(iter.is_exhausted());
/// assert_eq!(iter.next(), None);
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct RangeIterator {
    state: RangeState,
    stop: i64,
    step: i64,
}

impl RangeIterator {
    /// # Errors
    ///
    /// `StepZeroError` if `step == 0`.
    pub fn new(start: i64, stop: i64, step: i64) -> Result<Self, HostError> {
        if step == 0 {
            return Err(HostError::new(
                ErrorKind::StepZero,
                "range_iterator() step must not be zero",
            ));
        }
        Ok(Self {
            state: RangeState::Active { current: start },
            stop,
            step,
        })
    }

    pub fn stop(&self) -> i64 {
        self.stop
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    /// Next candidate, or `None` once exhausted
    pub fn current(&self) -> Option<i64> {
        match self.state {
            RangeState::Active { current } => Some(current),
            RangeState::Exhausted => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == RangeState::Exhausted
    }

    /// Exact number of values still to be yielded
    pub fn remaining(&self) -> usize {
        let RangeState::Active { current } = self.state else {
            return 0;
        };
        let (current, stop, step) = (i128::from(current), i128::from(self.stop), i128::from(self.step));
        let span = if step > 0 { stop - current } else { current - stop };
        if span <= 0 {
            return 0;
        }
        let magnitude = step.abs();
        let count = (span + magnitude - 1) / magnitude;
        usize::try_from(count).unwrap_or(usize::MAX)
    }
}

impl Iterator for RangeIterator {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let RangeState::Active { current: candidate } = self.state else {
            return None;
        };
        let crossed = if self.step > 0 {
            candidate >= self.stop
        } else {
            candidate <= self.stop
        };
        if crossed {
            trace!(stop = self.stop, step = self.step, "range iterator exhausted");
            self.state = RangeState::Exhausted;
            return None;
        }
        // Past i64 range is past `stop` too
        self.state = match candidate.checked_add(self.step) {
            Some(next) => RangeState::Active { current: next },
            None => RangeState::Exhausted,
        };
        Some(candidate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl std::iter::FusedIterator for RangeIterator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_step_rejected() {
        let err = RangeIterator::new(0, 10, 0).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::StepZero);
    }

    #[test]
    fn test_negative_step() {
        let values: Vec<i64> = RangeIterator::new(10, 0, -2).unwrap().collect();
        assert_eq!(values, vec![10, 8, 6, 4, 2]);
    }

    #[test]
    fn test_overflow_exhausts_after_last_value() {
        let values: Vec<i64> = RangeIterator::new(i64::MAX - 1, i64::MAX, 5).unwrap().collect();
        assert_eq!(values, vec![i64::MAX - 1]);

        let values: Vec<i64> = RangeIterator::new(i64::MIN + 1, i64::MIN, -3).unwrap().collect();
        assert_eq!(values, vec![i64::MIN + 1]);
    }

    #[test]
    fn test_remaining_matches_yield_count() {
        for (start, stop, step) in [(0, 10, 3), (10, -3, -4), (0, 0, 1), (5, 0, 1), (-7, 7, 7)] {
            let iter = RangeIterator::new(start, stop, step).unwrap();
            let expected = iter.remaining();
            assert_eq!(iter.count(), expected, "({}, {}, {})", start, stop, step);
        }
    }

    #[test]
    fn test_exhausted_stays_exhausted() {
        let mut iter = RangeIterator::new(0, 1, 1).unwrap();
        assert_eq!(iter.next(), Some(0));
        assert_eq!(iter.next(), None);
        assert!(iter.is_exhausted());
        assert_eq!(iter.current(), None);
        assert_eq!(iter.next(), None);
    }
}
