//! Pending-failure channel
//!
//! Holds at most one failure at a time. The channel lives on a
//! [`CallContext`](crate::CallContext), never in a process-wide global, and is
//! not `Send`, so it cannot be shared between threads.

use std::cell::RefCell;

use super::HostError;

/// Single-slot holder for the most recent unreported failure
#[derive(Debug, Default)]
pub struct FailureChannel {
    slot: RefCell<Option<HostError>>,
}

impl FailureChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pending failure, replacing any previous one
    pub fn raise(&self, error: HostError) {
        *self.slot.borrow_mut() = Some(error);
    }

    /// Check whether a failure is pending without consuming it
    pub fn is_pending(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Read and clear the pending failure in one step
    pub fn take(&self) -> Option<HostError> {
        self.slot.borrow_mut().take()
    }

    /// Put back a failure previously taken with [`take`](Self::take)
    ///
    /// Passing `None` clears the channel.
    pub fn restore(&self, error: Option<HostError>) {
        *self.slot.borrow_mut() = error;
    }

    /// Discard any pending failure
    pub fn clear(&self) {
        self.slot.borrow_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_slot() {
        let channel = FailureChannel::new();
        channel.raise(HostError::runtime_error("Test error"));
        assert!(channel.is_pending());

        let taken = channel.take().unwrap();
        assert_eq!(taken.message(), "Test error");
        assert!(!channel.is_pending());
        assert!(channel.take().is_none());
    }

    #[test]
    fn test_raise_replaces_previous() {
        let channel = FailureChannel::new();
        channel.raise(HostError::value_error("first"));
        channel.raise(HostError::type_error("second"));

        let taken = channel.take().unwrap();
        assert_eq!(taken.message(), "second");
        assert!(!channel.is_pending());
    }

    #[test]
    fn test_restore_none_clears() {
        let channel = FailureChannel::new();
        channel.raise(HostError::value_error("x"));
        channel.restore(None);
        assert!(!channel.is_pending());
    }
}
