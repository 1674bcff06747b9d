//! Error types for Turnstile.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TurnstileError>;

#[derive(Error, Debug)]
pub enum TurnstileError {
    #[error("Invalid capacity {capacity}: {reason}")]
    InvalidCapacity { capacity: usize, reason: &'static str },

    /// A caller-imposed deadline passed before the operation succeeded
    #[error("Operation timed out")]
    Timeout,

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl TurnstileError {
    pub fn capacity(capacity: usize, reason: &'static str) -> Self {
        Self::InvalidCapacity { capacity, reason }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }
}

/// Rejected enqueue. Carries the value back to the caller untouched.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Full(..)")
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue is full")
    }
}

impl<T> std::error::Error for Full<T> {}
