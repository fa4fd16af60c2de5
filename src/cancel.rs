//! Cooperative cancellation for blocking socket operations.
//!
//! A [`CancellationToken`] combines a wall-clock deadline with the client's
//! instance-wide stop flag. The connection engine derives one token per phase
//! (connect, transfer) and hands it to every blocking socket call in that phase.
//! Socket implementations check the token between I/O attempts; they never
//! interrupt a syscall in flight.
//!
//! Deadlines are computed once when the token is created and are not renewed on
//! partial progress: a transfer that keeps trickling bytes still fails once the
//! phase deadline passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::SocketError;

/// Why a token reports cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The owning client is shutting down.
    Stopped,
    /// The phase deadline elapsed.
    TimedOut,
}

/// Deadline plus shared stop flag, checked at every suspension point.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    deadline: Option<Instant>,
    stop: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Token expiring `timeout` from now, or when `stop` is raised.
    pub fn with_timeout(timeout: Duration, stop: Arc<AtomicBool>) -> Self {
        CancellationToken {
            deadline: Instant::now().checked_add(timeout),
            stop,
        }
    }

    /// Token that only observes the stop flag.
    pub fn without_deadline(stop: Arc<AtomicBool>) -> Self {
        CancellationToken { deadline: None, stop }
    }

    /// Token that never fires. Useful for tests and one-off socket use.
    pub fn never() -> Self {
        Self::without_deadline(Arc::new(AtomicBool::new(false)))
    }

    /// Returns the reason for cancellation, if cancelled.
    pub fn reason(&self) -> Option<CancelReason> {
        if self.stop.load(Ordering::Acquire) {
            return Some(CancelReason::Stopped);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::TimedOut),
            _ => None,
        }
    }

    /// Whether any blocking operation using this token should give up.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Time left until the deadline. `None` means no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// `Err` with the matching [`SocketError`] once cancelled.
    pub fn check(&self) -> Result<(), SocketError> {
        match self.reason() {
            None => Ok(()),
            Some(CancelReason::Stopped) => Err(SocketError::Cancelled),
            Some(CancelReason::TimedOut) => Err(SocketError::TimedOut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_never_is_not_cancelled() {
        let token = CancellationToken::never();
        assert!(!token.is_cancelled());
        assert!(token.remaining().is_none());
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_stop_flag_cancels() {
        let stop = Arc::new(AtomicBool::new(false));
        let token = CancellationToken::with_timeout(Duration::from_secs(60), stop.clone());
        assert!(!token.is_cancelled());

        stop.store(true, Ordering::Release);
        assert_eq!(token.reason(), Some(CancelReason::Stopped));
        assert!(matches!(token.check(), Err(SocketError::Cancelled)));
    }

    #[test]
    fn test_deadline_elapses() {
        let token = CancellationToken::with_timeout(
            Duration::from_millis(20),
            Arc::new(AtomicBool::new(false)),
        );
        thread::sleep(Duration::from_millis(40));
        assert_eq!(token.reason(), Some(CancelReason::TimedOut));
        assert_eq!(token.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_stop_wins_over_deadline() {
        let stop = Arc::new(AtomicBool::new(true));
        let token = CancellationToken::with_timeout(Duration::ZERO, stop);
        assert_eq!(token.reason(), Some(CancelReason::Stopped));
    }
}
