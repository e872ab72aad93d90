//! Host Channel Trait Definition
//!
//! The outbound half of the message channel to the host extension. Concrete
//! implementations live with whatever owns the real channel: the CLI bridge
//! writes to stdout, tests record into memory.

use crate::errors::TabholdResult;
use crate::protocol::OutboundMessage;
use alloc::boxed::Box;
use serde_json::Value;

/// Sends requests to the host extension and awaits its acknowledgement
///
/// An `Err` means the host could not be reached. Callers absorb it into a
/// boolean result.
#[async_trait::async_trait]
pub trait HostChannel: Send + Sync + 'static {
    /// Send one request and wait for the host's reply value
    async fn send(&self, message: OutboundMessage) -> TabholdResult<Value>;
}

#[async_trait::async_trait]
impl<T: HostChannel + ?Sized> HostChannel for alloc::sync::Arc<T> {
    async fn send(&self, message: OutboundMessage) -> TabholdResult<Value> {
        (**self).send(message).await
    }
}
