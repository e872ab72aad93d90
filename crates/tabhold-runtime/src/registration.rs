//! Registration Manager
//!
//! Subscribes this extension to the host's notifications. The subscribed
//! event types depend on the settings, so registration is redone whenever a
//! relevant setting changes or the host announces it is ready.
//!
//! Every registration unregisters first, so repeated calls never leave
//! duplicate subscriptions on the host. Host failures come back as `false`.

use std::sync::Arc;
use std::time::Duration;
use tabhold_core::{
    ArbiterConfig, HostChannel, ListeningType, OutboundMessage, Settings, SettingsMirror,
};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Event types to subscribe to for the given settings
pub fn listening_types(settings: &Settings) -> Vec<ListeningType> {
    let mut types = vec![
        ListeningType::Ready,
        ListeningType::TabMousedown,
        ListeningType::TabMouseup,
    ];
    if settings.detect_drag_and_drop {
        types.push(ListeningType::NativeTabDragstart);
    }
    if settings.detect_custom_drag {
        types.push(ListeningType::TabDragstart);
    }
    if settings.long_press_mode().uses_drag_ready() {
        types.push(ListeningType::TabDragready);
    }
    types
}

// ----------------------------------------------------------------------------
// Registration Manager
// ----------------------------------------------------------------------------

pub struct RegistrationManager<H: HostChannel> {
    host: Arc<H>,
    settings: SettingsMirror,
    extension_name: String,
    retry_delay: Duration,
}

impl<H: HostChannel> RegistrationManager<H> {
    pub fn new(host: Arc<H>, settings: SettingsMirror, config: &ArbiterConfig) -> Self {
        Self {
            host,
            settings,
            extension_name: config.extension_name.clone(),
            retry_delay: config.registration_retry_delay(),
        }
    }

    pub fn settings(&self) -> &SettingsMirror {
        &self.settings
    }

    /// Remove this extension's subscription from the host
    pub async fn unregister(&self) -> bool {
        match self.host.send(OutboundMessage::UnregisterSelf).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Unregister failed: {}", e);
                false
            }
        }
    }

    /// Unregister, then register with the event types of the current settings
    pub async fn register(&self) -> bool {
        // Best-effort; a host that never saw us fails this harmlessly
        self.unregister().await;

        let listening_types = listening_types(&self.settings.snapshot());
        let request = OutboundMessage::RegisterSelf {
            name: self.extension_name.clone(),
            listening_types: listening_types.clone(),
        };
        match self.host.send(request).await {
            Ok(_) => {
                info!(
                    "Registered with host for [{}]",
                    listening_types
                        .iter()
                        .map(ListeningType::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                true
            }
            Err(e) => {
                warn!("Registration with host failed: {}", e);
                false
            }
        }
    }

    /// Register once, and once more after the retry delay if that failed
    pub async fn register_with_retry(&self) -> bool {
        if self.register().await {
            return true;
        }
        debug!("Retrying registration in {:?}", self.retry_delay);
        tokio::time::sleep(self.retry_delay).await;
        self.register().await
    }
}

// ----------------------------------------------------------------------------
// Registration Task
// ----------------------------------------------------------------------------

/// Posts re-registration requests to the registration task
#[derive(Debug, Clone, Default)]
pub struct RegistrationTrigger {
    notify: Arc<Notify>,
}

impl RegistrationTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a registration cycle without waiting for it. Requests made
    /// while a cycle is running collapse into one follow-up cycle.
    pub fn request(&self) {
        self.notify.notify_one();
    }
}

/// Background task running every registration cycle in sequence
pub struct RegistrationTask<H: HostChannel> {
    manager: Arc<RegistrationManager<H>>,
    trigger: RegistrationTrigger,
}

impl<H: HostChannel> RegistrationTask<H> {
    pub fn new(manager: Arc<RegistrationManager<H>>, trigger: RegistrationTrigger) -> Self {
        Self { manager, trigger }
    }

    /// Wait for the settings load, register with one retry, then serve
    /// requests until aborted
    pub async fn run(self) {
        self.manager.settings().wait_loaded().await;
        if !self.manager.register_with_retry().await {
            warn!("Host not reachable; waiting for it to announce itself");
        }

        loop {
            self.trigger.notify.notified().await;
            self.manager.register().await;
        }
    }
}
