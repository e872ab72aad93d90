//! Runtime Configuration
//!
//! Fixed parameters of the arbiter runtime. User-facing behaviour lives in
//! [`Settings`](crate::settings::Settings); this is what the embedding
//! process decides.

use crate::errors::{TabholdError, TabholdResult};
use crate::protocol::DEFAULT_HOST_EXTENSION_ID;
use alloc::string::{String, ToString};
use core::time::Duration;

/// Configuration for the arbiter runtime
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Extension id of the host; messages from any other sender are ignored
    pub host_extension_id: String,
    /// Display name sent with `register-self`
    pub extension_name: String,
    /// Delay before the single startup registration retry
    pub registration_retry_delay_ms: u64,
    /// Delay before a "prevent" reply to a mouse-down is delivered
    pub prevent_reply_grace_ms: u64,
    /// Buffer size of the runtime command channel
    pub command_buffer_size: usize,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            host_extension_id: DEFAULT_HOST_EXTENSION_ID.to_string(),
            extension_name: "Tabhold".to_string(),
            registration_retry_delay_ms: 5000,
            prevent_reply_grace_ms: 5000,
            command_buffer_size: 64,
        }
    }
}

impl ArbiterConfig {
    /// Create configuration optimized for testing
    pub fn testing() -> Self {
        Self {
            registration_retry_delay_ms: 50,
            prevent_reply_grace_ms: 50,
            command_buffer_size: 16,
            ..Default::default()
        }
    }

    pub fn registration_retry_delay(&self) -> Duration {
        Duration::from_millis(self.registration_retry_delay_ms)
    }

    pub fn prevent_reply_grace(&self) -> Duration {
        Duration::from_millis(self.prevent_reply_grace_ms)
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> TabholdResult<()> {
        if self.host_extension_id.trim().is_empty() {
            return Err(TabholdError::configuration("host_extension_id must not be empty"));
        }
        if self.extension_name.trim().is_empty() {
            return Err(TabholdError::configuration("extension_name must not be empty"));
        }
        if self.command_buffer_size == 0 {
            return Err(TabholdError::configuration("command_buffer_size must be at least 1"));
        }
        Ok(())
    }
}
