//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// Only construction and configuration can fail. Lookups report a miss as
/// `None`/`false`, and every other operation is infallible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Capacity of zero requested at construction
    #[error("must provide a positive size")]
    InvalidSize,

    /// Unknown eviction policy name in configuration
    #[error("unknown cache policy: {0}")]
    InvalidPolicy(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
