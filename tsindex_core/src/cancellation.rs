//! Cooperative cancellation tokens (spec §9 "Cancellation tokens").
//!
//! Long-running loops (worker pool dispatch, dead-code analysis, disambiguation
//! races) poll [`CancellationToken::is_cancelled`] at natural chunk boundaries
//! rather than being preempted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// A fresh, independent child token (used per dead-code analysis run so
    /// cancelling one run never affects the next).
    pub fn child(&self) -> Self {
        Self::new()
    }
}

/// Outcome of a cancellable computation, distinguishing "finished with a
/// value" from "observed cancellation" (spec §7 item 5).
pub enum Outcome<T> {
    Done(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Done(v) => Some(v),
            Outcome::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled_and_observes_cancel() {
        let tok = CancellationToken::new();
        assert!(!tok.is_cancelled());
        tok.cancel();
        assert!(tok.is_cancelled());
    }

    #[test]
    fn clones_share_state_children_do_not() {
        let tok = CancellationToken::new();
        let clone = tok.clone();
        tok.cancel();
        assert!(clone.is_cancelled());

        let child = tok.child();
        assert!(!child.is_cancelled());
    }
}
