//! # Atomic Turns
//!
//! Apply-or-rollback execution for the sub-actions of a turn.
//!
//! Before a turn runs, the subject's mutable state is captured by value. If
//! any step fails the captured state is written back, so none of the turn's
//! effects are observable, including characters removed from a roster along
//! the way.

use crate::SkirmishResult;
use log::debug;

/// State that can be captured and written back.
pub trait Checkpoint {
    /// Everything a rollback has to restore.
    type Saved;

    fn checkpoint(&self) -> Self::Saved;

    fn restore(&mut self, saved: Self::Saved);
}

/// Runs `body` against `subject`, undoing every change if it fails.
///
/// The error from `body` is returned unchanged.
///
/// # Examples
///
/// ```
/// use skirmish::{atomically, Checkpoint, SkirmishError};
///
/// struct Counter(u32);
///
/// impl Checkpoint for Counter {
///     type Saved = u32;
///     fn checkpoint(&self) -> u32 { self.0 }
///     fn restore(&mut self, saved: u32) { self.0 = saved; }
/// }
///
/// let mut counter = Counter(1);
/// let result: Result<(), _> = atomically(&mut counter, |c| {
///     c.0 += 5;
///     Err(SkirmishError::InvalidAction("nope".to_string()))
/// });
/// assert!(result.is_err());
/// assert_eq!(counter.0, 1);
/// ```
pub fn atomically<S, T, F>(subject: &mut S, body: F) -> SkirmishResult<T>
where
    S: Checkpoint,
    F: FnOnce(&mut S) -> SkirmishResult<T>,
{
    let saved = subject.checkpoint();
    match body(subject) {
        Ok(value) => Ok(value),
        Err(error) => {
            debug!("Rolling back turn: {}", error);
            subject.restore(saved);
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SkirmishError;

    #[derive(Debug, Clone, PartialEq)]
    struct Ledger {
        entries: Vec<u32>,
    }

    impl Checkpoint for Ledger {
        type Saved = Vec<u32>;

        fn checkpoint(&self) -> Vec<u32> {
            self.entries.clone()
        }

        fn restore(&mut self, saved: Vec<u32>) {
            self.entries = saved;
        }
    }

    #[test]
    fn test_success_keeps_changes() {
        let mut ledger = Ledger {
            entries: vec![1, 2],
        };
        let total = atomically(&mut ledger, |l| {
            l.entries.push(3);
            Ok(l.entries.iter().sum::<u32>())
        })
        .unwrap();

        assert_eq!(total, 6);
        assert_eq!(ledger.entries, vec![1, 2, 3]);
    }

    #[test]
    fn test_failure_restores_removed_entries() {
        let mut ledger = Ledger {
            entries: vec![1, 2, 3],
        };
        let before = ledger.clone();

        let result: SkirmishResult<()> = atomically(&mut ledger, |l| {
            l.entries.remove(0);
            l.entries.push(9);
            Err(SkirmishError::OutOfRange("too far".to_string()))
        });

        assert!(matches!(result, Err(SkirmishError::OutOfRange(_))));
        assert_eq!(ledger, before);
    }
}
