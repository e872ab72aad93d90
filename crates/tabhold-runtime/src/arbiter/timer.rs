//! Long-Press Timer
//!
//! A cancellable delayed signal. The timer does not touch arbiter state: it
//! posts `LongPressElapsed` back into the arbiter's event loop, which checks
//! that the named decision is still the pending one before acting.

use super::decision::DecisionId;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Internal signals delivered to the arbiter's event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterSignal {
    /// The long-press threshold elapsed for `decision`
    LongPressElapsed { decision: DecisionId },
}

pub type SignalSender = mpsc::UnboundedSender<ArbiterSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<ArbiterSignal>;

/// Create the channel timers report on
pub fn create_signal_channel() -> (SignalSender, SignalReceiver) {
    mpsc::unbounded_channel()
}

/// Timer owned by a pending decision; aborted when dropped
#[derive(Debug)]
pub struct LongPressTimer {
    decision: DecisionId,
    handle: JoinHandle<()>,
}

impl LongPressTimer {
    pub fn start(decision: DecisionId, delay: Duration, signals: SignalSender) -> Self {
        trace!("Long-press timer armed for {} ({:?})", decision, delay);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = signals.send(ArbiterSignal::LongPressElapsed { decision });
        });
        Self { decision, handle }
    }

    pub fn cancel(self) {
        trace!("Long-press timer cancelled for {}", self.decision);
        // Abort happens in Drop
    }
}

impl Drop for LongPressTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
