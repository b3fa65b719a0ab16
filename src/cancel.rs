//! Cooperative cancellation for dataset loads
//!
//! Loads check their token at every record boundary. A fired token aborts
//! the load before anything is committed.

use crate::error::LoadError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation flag with an optional deadline
///
/// Clones share the same flag, so a token can be handed to a load running
/// on another thread and fired from here.
///
/// ```rust
/// use ip2country::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// assert!(token.check().is_ok());
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that only fires when [`cancel`](Self::cancel) is called
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that never fires unless cancelled explicitly
    ///
    /// Used by the plain `lookup`/`reload` entry points.
    pub fn none() -> Self {
        Self::default()
    }

    /// A token that fires once `deadline` has passed
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Some(deadline),
        }
    }

    /// A token that fires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Fire the token
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether the token was fired or its deadline has passed
    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Ok` while the load may continue, otherwise the matching error
    pub fn check(&self) -> Result<(), LoadError> {
        if self.flag.load(Ordering::Acquire) {
            return Err(LoadError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(LoadError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
