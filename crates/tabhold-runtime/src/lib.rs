//! Tabhold Runtime
//!
//! This crate contains the engine that answers the host extension:
//! - `RegistrationManager`: subscribes to the host's notifications
//! - `DecisionArbiter`: the state machine deciding whether to prevent tab
//!   activation, with its pending decision and long-press timer
//! - `ArbiterRuntime`: the single task that owns the arbiter
//! - `RuntimeBuilder` / `RuntimeHandle`: wiring and the embedding API

pub mod arbiter;
pub mod builder;
pub mod registration;
pub mod runtime;

pub use arbiter::{
    ArbiterEffect, ArbiterSignal, ArbiterStats, Arbitration, DecisionArbiter, DecisionId,
    DecisionReply, LongPressTimer, PendingDecision,
};
pub use builder::{RuntimeBuilder, RuntimeHandle};
pub use registration::{listening_types, RegistrationManager, RegistrationTask, RegistrationTrigger};
pub use runtime::{ArbiterRuntime, RuntimeCommand, RuntimeStats};

// Re-export core types for convenience
pub use tabhold_core::{
    ArbiterConfig, HostChannel, InboundMessage, ListeningType, OutboundMessage, Settings,
    SettingsMirror, StorageChange, StorageChanges, TabholdError, TabholdResult,
};
