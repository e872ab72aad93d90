//! Decision Arbiter
//!
//! The state machine that answers the host's pointer and drag notifications.
//! It holds at most one [`PendingDecision`]: a mouse-down opens it, and a
//! mouse-up, a drag notification, a long press, or the next mouse-down
//! resolves it. The reply to the opening mouse-down is the decision itself.
//!
//! - `decision`: pending decision, deferred reply and its resolver
//! - `timer`: long-press timer and the signals it posts back
//!
//! All methods run on the runtime's single event-loop task. Nothing here
//! blocks; waiting happens in the reply futures and timer tasks.

pub mod decision;
pub mod timer;

pub use decision::{DecisionId, DecisionReply, PendingDecision};
pub use timer::{create_signal_channel, ArbiterSignal, LongPressTimer, SignalReceiver, SignalSender};

use std::time::Duration;
use tabhold_core::{
    InboundMessage, LongPressMode, SettingsMirror, TabMouseDown, TabMouseUp, WindowId,
};
use tracing::{debug, warn};

// ----------------------------------------------------------------------------
// Arbiter Output
// ----------------------------------------------------------------------------

/// Side effects the arbiter asks the runtime to carry out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArbiterEffect {
    /// Ask the host to begin a custom drag in a window (fire-and-forget)
    StartCustomDrag { window_id: WindowId },
}

/// Outcome of handling one host notification
#[derive(Debug)]
pub struct Arbitration {
    pub reply: DecisionReply,
    pub effects: Vec<ArbiterEffect>,
}

impl Arbitration {
    fn reply(prevent: bool) -> Self {
        Self {
            reply: DecisionReply::immediate(prevent),
            effects: Vec::new(),
        }
    }

    fn deferred(reply: DecisionReply) -> Self {
        Self {
            reply,
            effects: Vec::new(),
        }
    }
}

/// Counters for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArbiterStats {
    pub decisions_opened: u64,
    pub decisions_prevented: u64,
    pub decisions_allowed: u64,
    pub decisions_superseded: u64,
    pub long_presses: u64,
    pub stale_signals: u64,
}

// ----------------------------------------------------------------------------
// Decision Arbiter
// ----------------------------------------------------------------------------

pub struct DecisionArbiter {
    settings: SettingsMirror,
    /// Delay before a "prevent" reply to a mouse-down is delivered
    grace: Duration,
    signals: SignalSender,
    pending: Option<PendingDecision>,
    /// Mouse-down of the most recently opened decision, kept after it resolves
    last_origin: Option<TabMouseDown>,
    /// Outcome of a decision resolved since the last mouse-down, for the mouse-up
    last_outcome: Option<bool>,
    next_id: u64,
    stats: ArbiterStats,
}

impl DecisionArbiter {
    pub fn new(settings: SettingsMirror, grace: Duration, signals: SignalSender) -> Self {
        Self {
            settings,
            grace,
            signals,
            pending: None,
            last_origin: None,
            last_outcome: None,
            next_id: 0,
            stats: ArbiterStats::default(),
        }
    }

    pub fn pending(&self) -> Option<&PendingDecision> {
        self.pending.as_ref()
    }

    pub fn stats(&self) -> &ArbiterStats {
        &self.stats
    }

    /// Handle one host notification. `ready` is not the arbiter's concern and
    /// falls through to the default reply like any unknown type.
    pub fn handle(&mut self, message: InboundMessage) -> Arbitration {
        match message {
            InboundMessage::TabMousedown(down) => self.on_mouse_down(down),
            InboundMessage::TabMouseup(up) => self.on_mouse_up(up),
            InboundMessage::NativeTabDragstart => self.on_native_drag_start(),
            InboundMessage::TabDragready => self.on_drag_ready(),
            InboundMessage::TabDragstart => self.on_custom_drag_start(),
            InboundMessage::Ready | InboundMessage::Unrecognized { .. } => Arbitration::reply(false),
        }
    }

    /// Handle a signal from a timer task
    pub fn on_signal(&mut self, signal: ArbiterSignal) -> Vec<ArbiterEffect> {
        match signal {
            ArbiterSignal::LongPressElapsed { decision } => self.on_long_press_elapsed(decision),
        }
    }

    /// Resolve whatever is pending as "do not prevent"
    pub fn shutdown(&mut self) {
        if let Some(decision) = self.pending.take() {
            debug!("Releasing pending decision {} on shutdown", decision.id());
            drop(decision);
        }
    }

    // ------------------------------------------------------------------------
    // Notification Handlers
    // ------------------------------------------------------------------------

    fn on_mouse_down(&mut self, down: TabMouseDown) -> Arbitration {
        if !down.is_primary() || down.is_on_tab_control() {
            return Arbitration::reply(false);
        }

        // A new press supersedes a decision whose mouse-up was lost
        self.last_outcome = None;
        if let Some(previous) = self.pending.take() {
            let id = previous.id();
            let outcome = previous.resolve(false);
            self.stats.decisions_superseded += 1;
            debug!("Decision {} superseded (prevent={})", id, outcome);
        }

        let settings = self.settings.snapshot();
        if settings.prevent_only_for_unloaded_tabs && !down.tab.discarded {
            return Arbitration::reply(false);
        }

        self.next_id += 1;
        let id = DecisionId::new(self.next_id);
        let (resolver, reply) = DecisionReply::deferred(self.grace);
        let mut decision = PendingDecision::open(id, down.clone(), resolver);

        let mode = settings.long_press_mode();
        if mode.uses_timer() {
            decision.arm_timer(LongPressTimer::start(
                id,
                settings.long_press_duration(),
                self.signals.clone(),
            ));
        }

        debug!("Decision {} opened for tab {} (long press: {:?})", id, down.tab.id, mode);
        self.stats.decisions_opened += 1;
        self.last_origin = Some(down);
        self.pending = Some(decision);
        Arbitration::deferred(reply)
    }

    fn on_mouse_up(&mut self, up: TabMouseUp) -> Arbitration {
        if !up.is_primary() {
            return Arbitration::reply(false);
        }

        let released_without_move = self
            .last_origin
            .as_ref()
            .is_some_and(|origin| origin.tab.id == up.tab.id);

        let prevent = match self.pending.take() {
            Some(decision) => self.settle(decision, !released_without_move),
            None => self.last_outcome.unwrap_or(false),
        };
        self.last_outcome = None;
        Arbitration::reply(prevent)
    }

    fn on_native_drag_start(&mut self) -> Arbitration {
        let settings = self.settings.snapshot();
        if !settings.detect_drag_and_drop {
            return Arbitration::reply(false);
        }
        match self.pending.take() {
            Some(decision) => {
                Arbitration::reply(self.settle(decision, settings.prevent_drag_and_dropped_tabs))
            }
            None => Arbitration::reply(false),
        }
    }

    fn on_custom_drag_start(&mut self) -> Arbitration {
        let settings = self.settings.snapshot();
        if !settings.detect_custom_drag {
            return Arbitration::reply(false);
        }
        match self.pending.take() {
            Some(decision) => {
                Arbitration::reply(self.settle(decision, settings.prevent_custom_dragged_tabs))
            }
            None => Arbitration::reply(false),
        }
    }

    fn on_drag_ready(&mut self) -> Arbitration {
        let settings = self.settings.snapshot();
        if settings.long_press_mode() != LongPressMode::LegacyCombined {
            return Arbitration::reply(false);
        }
        let effects = self.on_long_press(true, settings.prevent_long_pressed_tabs);
        Arbitration {
            reply: DecisionReply::immediate(false),
            effects,
        }
    }

    fn on_long_press_elapsed(&mut self, decision: DecisionId) -> Vec<ArbiterEffect> {
        let armed = match self.pending.as_mut() {
            Some(pending) if pending.id() == decision => pending.take_fired_timer(),
            _ => false,
        };
        if !armed {
            self.stats.stale_signals += 1;
            debug!("Ignoring stale long-press signal for {}", decision);
            return Vec::new();
        }

        // Settings may have changed while the timer was running
        let settings = self.settings.snapshot();
        if !settings.detect_long_pressed_tabs {
            return Vec::new();
        }
        self.on_long_press(
            settings.prevent_drag_and_drop_after_long_press
                && !settings.prevent_drag_and_drop_after_long_press_legacy,
            settings.prevent_long_pressed_tabs,
        )
    }

    /// Shared long-press handling for the timer and `tab-dragready`
    fn on_long_press(&mut self, start_custom_drag: bool, prevent_active: bool) -> Vec<ArbiterEffect> {
        self.stats.long_presses += 1;
        let mut effects = Vec::new();

        if start_custom_drag {
            let origin = self
                .pending
                .as_ref()
                .map(PendingDecision::origin)
                .or(self.last_origin.as_ref());
            match origin.and_then(TabMouseDown::window_id) {
                Some(window_id) => effects.push(ArbiterEffect::StartCustomDrag { window_id }),
                None => warn!("Long press without a known window; not starting custom drag"),
            }
        }

        if prevent_active {
            if let Some(pending) = self.pending.as_mut() {
                debug!("Decision {} forced to prevent by long press", pending.id());
                pending.force_prevent();
            }
        } else if let Some(decision) = self.pending.take() {
            self.settle(decision, false);
        }

        effects
    }

    fn settle(&mut self, decision: PendingDecision, prevent: bool) -> bool {
        let id = decision.id();
        let outcome = decision.resolve(prevent);
        if outcome {
            self.stats.decisions_prevented += 1;
        } else {
            self.stats.decisions_allowed += 1;
        }
        debug!("Decision {} resolved (prevent={})", id, outcome);
        self.last_outcome = Some(outcome);
        outcome
    }
}
