//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Lookups of missing keys are not errors; they report `None` or `false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resize requested with a non-positive capacity
    #[error("Must supply a positive capacity to resize, got {0}")]
    InvalidCapacity(usize),

    /// Reconfiguration would leave min_age above max_age
    #[error("min_age ({min_age:?}) must be less than or equal to max_age ({max_age:?})")]
    InvalidAgeBounds {
        min_age: Duration,
        max_age: Duration,
    },

    /// Active expiration requires a tokio runtime to host the sweeper
    #[error("Active expiration requires a running tokio runtime")]
    NoRuntime,
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
