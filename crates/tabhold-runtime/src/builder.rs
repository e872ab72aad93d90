//! Runtime Builder API
//!
//! Wires the settings mirror, registration task and arbiter runtime together
//! and hands back a [`RuntimeHandle`] for feeding in host messages and
//! settings updates.

use crate::arbiter::{create_signal_channel, DecisionArbiter, DecisionReply};
use crate::registration::{RegistrationManager, RegistrationTask, RegistrationTrigger};
use crate::runtime::{ArbiterRuntime, CommandSender, RuntimeCommand, RuntimeStats};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tabhold_core::{
    ArbiterConfig, HostChannel, Settings, SettingsMirror, StorageChanges, TabholdError,
    TabholdResult,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

// ----------------------------------------------------------------------------
// Runtime Builder
// ----------------------------------------------------------------------------

/// Builder for the arbiter runtime
pub struct RuntimeBuilder<H: HostChannel> {
    host: Arc<H>,
    config: ArbiterConfig,
    settings: SettingsMirror,
}

impl<H: HostChannel> RuntimeBuilder<H> {
    /// Create a builder around the channel used to reach the host
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            config: ArbiterConfig::default(),
            settings: SettingsMirror::new(),
        }
    }

    pub fn with_config(mut self, config: ArbiterConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing mirror (it may or may not be loaded yet)
    pub fn with_settings_mirror(mut self, settings: SettingsMirror) -> Self {
        self.settings = settings;
        self
    }

    /// Start from already-loaded settings
    pub fn with_settings(self, settings: Settings) -> Self {
        self.with_settings_mirror(SettingsMirror::with_settings(settings))
    }

    /// Spawn the runtime and registration tasks
    pub fn build_and_start(self) -> TabholdResult<RuntimeHandle> {
        self.config.validate()?;
        info!("Starting arbiter runtime as \"{}\"", self.config.extension_name);

        let (command_sender, command_receiver) = mpsc::channel(self.config.command_buffer_size);
        let (signal_sender, signal_receiver) = create_signal_channel();

        let trigger = RegistrationTrigger::new();
        let manager = Arc::new(RegistrationManager::new(
            Arc::clone(&self.host),
            self.settings.clone(),
            &self.config,
        ));
        let registration_handle =
            tokio::spawn(RegistrationTask::new(manager, trigger.clone()).run());

        let arbiter = DecisionArbiter::new(
            self.settings.clone(),
            self.config.prevent_reply_grace(),
            signal_sender,
        );
        let runtime = ArbiterRuntime::new(
            self.config,
            self.host,
            self.settings.clone(),
            arbiter,
            trigger,
            command_receiver,
            signal_receiver,
        );
        let runtime_handle = tokio::spawn(runtime.run());

        Ok(RuntimeHandle {
            command_sender,
            settings: self.settings,
            runtime_handle: Some(runtime_handle),
            registration_handle: Some(registration_handle),
        })
    }
}

// ----------------------------------------------------------------------------
// Runtime Handle
// ----------------------------------------------------------------------------

/// Handle to a running arbiter runtime
pub struct RuntimeHandle {
    command_sender: CommandSender,
    settings: SettingsMirror,
    runtime_handle: Option<JoinHandle<()>>,
    registration_handle: Option<JoinHandle<()>>,
}

impl RuntimeHandle {
    /// Settings as currently seen by the runtime
    pub fn settings(&self) -> &SettingsMirror {
        &self.settings
    }

    /// Deliver a message from another extension.
    ///
    /// Returns the reply to send back, or `None` when the sender is not the
    /// host and the message was ignored.
    pub async fn dispatch(
        &self,
        sender: impl Into<String>,
        message: Value,
    ) -> TabholdResult<Option<DecisionReply>> {
        let (respond, response) = oneshot::channel();
        self.send_command(RuntimeCommand::Dispatch {
            sender: sender.into(),
            message,
            respond,
        })
        .await?;
        response
            .await
            .map_err(|_| TabholdError::channel("Runtime dropped the dispatch response"))
    }

    /// Deliver a storage change notification
    pub async fn storage_changed(&self, changes: StorageChanges) -> TabholdResult<()> {
        self.send_command(RuntimeCommand::StorageChanged { changes }).await
    }

    /// Deliver the bulk load of persisted settings
    pub async fn load_settings(&self, values: Map<String, Value>) -> TabholdResult<()> {
        self.send_command(RuntimeCommand::LoadSettings { values }).await
    }

    /// Counters of the running runtime
    pub async fn stats(&self) -> TabholdResult<RuntimeStats> {
        let (respond, response) = oneshot::channel();
        self.send_command(RuntimeCommand::GetStats { respond }).await?;
        response
            .await
            .map_err(|_| TabholdError::channel("Runtime dropped the stats response"))
    }

    pub fn is_running(&self) -> bool {
        self.runtime_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the runtime; a pending decision is released as "do not prevent"
    pub async fn shutdown(&mut self) -> TabholdResult<()> {
        info!("Shutting down arbiter runtime");
        let _ = self.send_command(RuntimeCommand::Shutdown).await;

        if let Some(handle) = self.runtime_handle.take() {
            let _ = tokio::time::timeout(Duration::from_secs(10), handle).await;
        }
        if let Some(handle) = self.registration_handle.take() {
            handle.abort();
        }
        Ok(())
    }

    async fn send_command(&self, command: RuntimeCommand) -> TabholdResult<()> {
        self.command_sender
            .send(command)
            .await
            .map_err(|_| TabholdError::channel("Arbiter runtime is not running"))
    }
}

impl Drop for RuntimeHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.registration_handle.take() {
            handle.abort();
        }
    }
}
