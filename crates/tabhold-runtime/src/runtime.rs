//! Arbiter Runtime Task
//!
//! The single task that owns the [`DecisionArbiter`]. Host notifications,
//! settings updates and timer signals are processed one at a time in arrival
//! order, so the arbiter never sees concurrent access.

use crate::arbiter::{ArbiterEffect, ArbiterStats, DecisionArbiter, DecisionReply, SignalReceiver};
use crate::registration::RegistrationTrigger;
use serde_json::{Map, Value};
use std::sync::Arc;
use tabhold_core::{
    ArbiterConfig, HostChannel, InboundMessage, OutboundMessage, SettingsMirror, StorageChanges,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

// ----------------------------------------------------------------------------
// Runtime Commands
// ----------------------------------------------------------------------------

/// Commands accepted by the runtime task
#[derive(Debug)]
pub enum RuntimeCommand {
    /// A message from another extension; answered with `None` when the
    /// sender is not the host
    Dispatch {
        sender: String,
        message: Value,
        respond: oneshot::Sender<Option<DecisionReply>>,
    },
    /// A storage change notification
    StorageChanged { changes: StorageChanges },
    /// The bulk load of persisted settings
    LoadSettings { values: Map<String, Value> },
    /// Snapshot of the runtime counters
    GetStats {
        respond: oneshot::Sender<RuntimeStats>,
    },
    Shutdown,
}

pub type CommandSender = mpsc::Sender<RuntimeCommand>;
pub type CommandReceiver = mpsc::Receiver<RuntimeCommand>;

/// Counters for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub messages_dispatched: u64,
    pub foreign_messages_ignored: u64,
    pub registrations_requested: u64,
    pub effects_sent: u64,
    pub arbiter: ArbiterStats,
}

// ----------------------------------------------------------------------------
// Arbiter Runtime
// ----------------------------------------------------------------------------

pub struct ArbiterRuntime<H: HostChannel> {
    config: ArbiterConfig,
    host: Arc<H>,
    settings: SettingsMirror,
    arbiter: DecisionArbiter,
    registration: RegistrationTrigger,
    command_receiver: CommandReceiver,
    signal_receiver: SignalReceiver,
    stats: RuntimeStats,
    running: bool,
}

impl<H: HostChannel> ArbiterRuntime<H> {
    pub fn new(
        config: ArbiterConfig,
        host: Arc<H>,
        settings: SettingsMirror,
        arbiter: DecisionArbiter,
        registration: RegistrationTrigger,
        command_receiver: CommandReceiver,
        signal_receiver: SignalReceiver,
    ) -> Self {
        Self {
            config,
            host,
            settings,
            arbiter,
            registration,
            command_receiver,
            signal_receiver,
            stats: RuntimeStats::default(),
            running: true,
        }
    }

    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            arbiter: self.arbiter.stats().clone(),
            ..self.stats.clone()
        }
    }

    /// Run until shut down or every command sender is dropped
    pub async fn run(mut self) {
        info!("Arbiter runtime starting");

        while self.running {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => self.process_command(command),
                        None => {
                            info!("Command channel closed, shutting down");
                            break;
                        }
                    }
                }
                Some(signal) = self.signal_receiver.recv() => {
                    let effects = self.arbiter.on_signal(signal);
                    self.apply_effects(effects);
                }
            }
        }

        self.arbiter.shutdown();
        info!("Arbiter runtime stopped");
    }

    fn process_command(&mut self, command: RuntimeCommand) {
        match command {
            RuntimeCommand::Dispatch {
                sender,
                message,
                respond,
            } => {
                let reply = self.dispatch(&sender, message);
                let _ = respond.send(reply);
            }
            RuntimeCommand::StorageChanged { changes } => {
                let applied = self.settings.apply_changes(&changes);
                debug!("Settings changed: {:?}", applied.keys);
                if applied.requires_registration() {
                    self.request_registration();
                }
            }
            RuntimeCommand::LoadSettings { values } => {
                let applied = self.settings.load(&values);
                if applied.requires_registration() {
                    debug!("Settings reload changed {:?}", applied.keys);
                    self.request_registration();
                }
            }
            RuntimeCommand::GetStats { respond } => {
                let _ = respond.send(self.stats());
            }
            RuntimeCommand::Shutdown => {
                self.running = false;
            }
        }
    }

    fn dispatch(&mut self, sender: &str, message: Value) -> Option<DecisionReply> {
        if sender != self.config.host_extension_id {
            self.stats.foreign_messages_ignored += 1;
            debug!("Ignoring message from {}", sender);
            return None;
        }
        self.stats.messages_dispatched += 1;

        let message = InboundMessage::from_value(message);
        debug!("Host notification: {}", message.kind());

        if message == InboundMessage::Ready {
            // Host (re)started: register again without holding up the reply
            self.request_registration();
            return Some(DecisionReply::immediate(true));
        }

        let arbitration = self.arbiter.handle(message);
        self.apply_effects(arbitration.effects);
        Some(arbitration.reply)
    }

    fn request_registration(&mut self) {
        self.stats.registrations_requested += 1;
        self.registration.request();
    }

    fn apply_effects(&mut self, effects: Vec<ArbiterEffect>) {
        for effect in effects {
            let message = match effect {
                ArbiterEffect::StartCustomDrag { window_id } => {
                    OutboundMessage::StartCustomDrag { window_id }
                }
            };
            self.stats.effects_sent += 1;
            let host = Arc::clone(&self.host);
            tokio::spawn(async move {
                let kind = message.kind();
                if let Err(e) = host.send(message).await {
                    warn!("Host did not accept {}: {}", kind, e);
                }
            });
        }
    }
}
