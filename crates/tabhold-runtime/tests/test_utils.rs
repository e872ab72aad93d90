//! Test utilities for driving the arbiter runtime deterministically
//!
//! Provides a recording host channel and builders for host notifications.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tabhold_core::{
    HostChannel, InboundMessage, ListeningType, OutboundMessage, TabInfo, TabMouseDown,
    TabMouseUp, TabholdError, TabholdResult,
};

pub const HOST_ID: &str = "treestyletab@piro.sakura.ne.jp";

// ----------------------------------------------------------------------------
// Recording Host
// ----------------------------------------------------------------------------

/// Host channel that records every request it is sent
#[derive(Debug, Default)]
pub struct RecordingHost {
    attempts: Mutex<Vec<OutboundMessage>>,
    unavailable: AtomicBool,
    failures_remaining: AtomicUsize,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Host that rejects every request until made available
    pub fn unavailable() -> Arc<Self> {
        let host = Self::default();
        host.unavailable.store(true, Ordering::SeqCst);
        Arc::new(host)
    }

    /// Host that rejects the next `count` requests
    pub fn failing_first(count: usize) -> Arc<Self> {
        let host = Self::default();
        host.failures_remaining.store(count, Ordering::SeqCst);
        Arc::new(host)
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Every request sent, including rejected ones
    pub fn attempts(&self) -> Vec<OutboundMessage> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Kinds of every request sent, in order
    pub fn kinds(&self) -> Vec<&'static str> {
        self.attempts().iter().map(OutboundMessage::kind).collect()
    }

    /// Listening types of every `register-self` request, in order
    pub fn registrations(&self) -> Vec<Vec<ListeningType>> {
        self.attempts()
            .into_iter()
            .filter_map(|message| match message {
                OutboundMessage::RegisterSelf {
                    listening_types, ..
                } => Some(listening_types),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl HostChannel for RecordingHost {
    async fn send(&self, message: OutboundMessage) -> TabholdResult<Value> {
        self.attempts.lock().unwrap().push(message);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TabholdError::host_unavailable("host not installed"));
        }
        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TabholdError::host_unavailable("host disabled"));
        }
        Ok(json!(true))
    }
}

// ----------------------------------------------------------------------------
// Notification Builders
// ----------------------------------------------------------------------------

pub fn tab(id: i64) -> TabInfo {
    TabInfo {
        id,
        discarded: false,
        window_id: Some(1),
    }
}

pub fn press(tab_id: i64, window_id: i64) -> TabMouseDown {
    TabMouseDown {
        button: 0,
        tab: tab(tab_id),
        closebox: false,
        sound_button: false,
        twisty: false,
        window_id: Some(window_id),
    }
}

pub fn mouse_down(tab_id: i64) -> InboundMessage {
    InboundMessage::TabMousedown(press(tab_id, 1))
}

pub fn mouse_up(tab_id: i64) -> InboundMessage {
    InboundMessage::TabMouseup(TabMouseUp {
        button: 0,
        tab: tab(tab_id),
    })
}

pub fn mouse_down_json(tab_id: i64) -> Value {
    json!({
        "type": "tab-mousedown",
        "button": 0,
        "tab": { "id": tab_id, "discarded": false, "windowId": 1 },
        "windowId": 1,
    })
}

pub fn mouse_up_json(tab_id: i64) -> Value {
    json!({
        "type": "tab-mouseup",
        "button": 0,
        "tab": { "id": tab_id, "windowId": 1 },
    })
}

/// Poll `condition` until it holds, letting paused time advance in between
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
