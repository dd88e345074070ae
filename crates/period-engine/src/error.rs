//! Error types for period-engine operations.

use thiserror::Error;

/// Everything that can go wrong while validating or planning a comparison.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComparisonError {
    /// The comparison request cannot be honoured; callers suppress the
    /// comparison feature entirely.
    #[error("Invalid specification: {0}")]
    InvalidSpec(String),

    /// `repeat_count` above the configured or hard limit.
    #[error("Repeat count {requested} exceeds the maximum of {max}")]
    RepeatCountTooLarge { requested: u32, max: u32 },

    /// Unknown granularity name, or buckets coarser than their context.
    #[error("Invalid granularity: {0}")]
    InvalidGranularity(String),

    /// A calendar computation left the representable date range.
    #[error("Date out of range: {0}")]
    DateOutOfRange(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ComparisonError>;
