//! Error types for tabhold
//!
//! Host communication failures are absorbed at the call site and reported as
//! booleans. These types carry the reason up to that point.

use alloc::string::String;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Unified error type for the tabhold crates
#[derive(Debug, thiserror::Error)]
pub enum TabholdError {
    #[error("Host extension unavailable: {reason}")]
    HostUnavailable { reason: String },

    #[error("Invalid value for setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Channel error: {reason}")]
    Channel { reason: String },

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

impl TabholdError {
    /// Host could not be reached
    pub fn host_unavailable(reason: impl Into<String>) -> Self {
        Self::HostUnavailable {
            reason: reason.into(),
        }
    }

    /// An internal channel was closed or full
    pub fn channel(reason: impl Into<String>) -> Self {
        Self::Channel {
            reason: reason.into(),
        }
    }

    /// Configuration rejected by validation
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

/// Result type alias for tabhold operations
pub type TabholdResult<T> = core::result::Result<T, TabholdError>;
