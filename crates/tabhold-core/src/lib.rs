//! Tabhold Core
//!
//! Foundational types for an extension that decides whether the host tab-tree
//! extension should suppress tab activation for a pointer or drag event:
//! the user settings and their mirror, the host wire protocol, the outbound
//! host channel seam, runtime configuration and errors.
//!
//! The state machine that answers the host lives in `tabhold-runtime`.

extern crate alloc;

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod host;
pub mod mirror;
pub mod protocol;
pub mod settings;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::ArbiterConfig;
pub use errors::{TabholdError, TabholdResult};
pub use host::HostChannel;
pub use mirror::{AppliedChanges, SettingsMirror};
pub use protocol::{
    InboundMessage, ListeningType, OutboundMessage, TabId, TabInfo, TabMouseDown, TabMouseUp,
    WindowId, DEFAULT_HOST_EXTENSION_ID, PRIMARY_BUTTON,
};
pub use settings::{LongPressMode, SettingKey, Settings, StorageChange, StorageChanges};
