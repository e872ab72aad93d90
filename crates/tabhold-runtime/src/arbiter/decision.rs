//! Pending Decision and Reply Types
//!
//! A `PendingDecision` owns the only way to complete the host's outstanding
//! reply to a mouse-down. Resolving consumes the decision, so a second
//! resolution has nothing to act on.

use super::timer::LongPressTimer;
use core::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tabhold_core::TabMouseDown;
use tokio::sync::oneshot;

// ----------------------------------------------------------------------------
// Decision Identity
// ----------------------------------------------------------------------------

/// Monotonic identifier of a decision within one arbiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecisionId(u64);

impl DecisionId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Decision Reply
// ----------------------------------------------------------------------------

/// The boolean reply owed to the host for one notification.
///
/// Either already known, or completed later by whichever event or timer
/// resolves the decision. Awaiting it yields `true` for "prevent the default
/// action". A reply whose decision vanished without resolving yields `false`.
#[derive(Debug)]
pub struct DecisionReply {
    state: ReplyState,
}

#[derive(Debug)]
enum ReplyState {
    Ready(Option<bool>),
    Waiting(oneshot::Receiver<bool>),
}

impl DecisionReply {
    /// Reply that is known now
    pub fn immediate(prevent: bool) -> Self {
        Self {
            state: ReplyState::Ready(Some(prevent)),
        }
    }

    /// Reply completed later through the returned resolver
    pub(crate) fn deferred(grace: Duration) -> (Resolver, Self) {
        let (sender, receiver) = oneshot::channel();
        let resolver = Resolver { sender, grace };
        let reply = Self {
            state: ReplyState::Waiting(receiver),
        };
        (resolver, reply)
    }

    /// Whether the value was unknown when the reply was created
    pub fn is_deferred(&self) -> bool {
        matches!(self.state, ReplyState::Waiting(_))
    }
}

impl Future for DecisionReply {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        match &mut self.get_mut().state {
            ReplyState::Ready(value) => Poll::Ready(value.take().unwrap_or(false)),
            ReplyState::Waiting(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(prevent)) => Poll::Ready(prevent),
                Poll::Ready(Err(_)) => Poll::Ready(false),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

/// Completion side of a deferred reply
#[derive(Debug)]
pub(crate) struct Resolver {
    sender: oneshot::Sender<bool>,
    grace: Duration,
}

impl Resolver {
    /// Complete the reply. "Prevent" is delivered after the grace period so
    /// other consumers of the host's drag APIs are not raced; "allow" is
    /// delivered at once.
    fn complete(self, prevent: bool) {
        let Resolver { sender, grace } = self;
        if prevent && !grace.is_zero() {
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                let _ = sender.send(true);
            });
        } else {
            let _ = sender.send(prevent);
        }
    }
}

// ----------------------------------------------------------------------------
// Pending Decision
// ----------------------------------------------------------------------------

/// The single in-flight arbitration opened by a mouse-down
#[derive(Debug)]
pub struct PendingDecision {
    id: DecisionId,
    origin: TabMouseDown,
    resolver: Option<Resolver>,
    timer: Option<LongPressTimer>,
    force_prevent: bool,
}

impl PendingDecision {
    pub(crate) fn open(id: DecisionId, origin: TabMouseDown, resolver: Resolver) -> Self {
        Self {
            id,
            origin,
            resolver: Some(resolver),
            timer: None,
            force_prevent: false,
        }
    }

    pub fn id(&self) -> DecisionId {
        self.id
    }

    /// Mouse-down that opened this decision
    pub fn origin(&self) -> &TabMouseDown {
        &self.origin
    }

    /// Whether a detected long press forced the outcome to "prevent"
    pub fn is_forced(&self) -> bool {
        self.force_prevent
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub(crate) fn arm_timer(&mut self, timer: LongPressTimer) {
        self.cancel_timer();
        self.timer = Some(timer);
    }

    pub(crate) fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Drop the timer after it reported firing. Returns false if no timer was
    /// armed, i.e. the report is stale.
    pub(crate) fn take_fired_timer(&mut self) -> bool {
        self.timer.take().is_some()
    }

    /// Whatever resolves this decision later, the outcome will be "prevent"
    pub(crate) fn force_prevent(&mut self) {
        self.force_prevent = true;
    }

    /// Resolve and consume the decision, returning the delivered outcome
    pub(crate) fn resolve(mut self, prevent: bool) -> bool {
        let outcome = prevent || self.force_prevent;
        self.cancel_timer();
        if let Some(resolver) = self.resolver.take() {
            resolver.complete(outcome);
        }
        outcome
    }
}

impl Drop for PendingDecision {
    fn drop(&mut self) {
        // Dropped without resolving (runtime shutdown): never leave the host waiting
        if let Some(resolver) = self.resolver.take() {
            resolver.complete(false);
        }
    }
}
