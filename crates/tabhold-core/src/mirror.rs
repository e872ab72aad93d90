//! Settings Mirror
//!
//! Process-wide cache of the persisted settings. Readers take an immutable
//! `Arc<Settings>` snapshot; every change notification builds a new snapshot
//! and publishes it in one step, so a reader never observes half of a
//! notification.

use crate::settings::{SettingKey, Settings, StorageChanges};
use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct MirrorState {
    settings: Arc<Settings>,
    /// Keys changed before the bulk load finished; `None` once loaded
    early_keys: Option<BTreeSet<SettingKey>>,
}

/// Result of applying one change notification or settings load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChanges {
    /// Known keys touched by a notification, or changed in value by a load
    pub keys: Vec<SettingKey>,
    /// Whether the bulk load had completed before the update was applied
    pub loaded: bool,
}

impl AppliedChanges {
    /// Whether the subscribed event types must be re-sent to the host
    pub fn requires_registration(&self) -> bool {
        self.loaded && self.keys.iter().any(SettingKey::affects_registration)
    }
}

/// Shared, cheaply cloneable view of the current settings
#[derive(Debug, Clone)]
pub struct SettingsMirror {
    state: Arc<watch::Sender<MirrorState>>,
}

impl Default for SettingsMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsMirror {
    /// Mirror holding defaults, waiting for the bulk load
    pub fn new() -> Self {
        let (sender, _) = watch::channel(MirrorState {
            settings: Arc::new(Settings::default()),
            early_keys: Some(BTreeSet::new()),
        });
        Self {
            state: Arc::new(sender),
        }
    }

    /// Mirror that is already loaded with `settings`
    pub fn with_settings(settings: Settings) -> Self {
        let (sender, _) = watch::channel(MirrorState {
            settings: Arc::new(settings),
            early_keys: None,
        });
        Self {
            state: Arc::new(sender),
        }
    }

    /// Current settings snapshot
    pub fn snapshot(&self) -> Arc<Settings> {
        self.state.borrow().settings.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.borrow().early_keys.is_none()
    }

    /// Resolve once the bulk load has completed
    pub async fn wait_loaded(&self) {
        let mut receiver = self.state.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel
        let _ = receiver.wait_for(|state| state.early_keys.is_none()).await;
    }

    /// Bulk-load persisted values.
    ///
    /// Keys already changed by a notification that arrived before the load are
    /// left alone; the notification is newer than what storage returned.
    /// A load after the first one is applied like a change notification and
    /// reports the keys whose value it changed.
    pub fn load(&self, values: &Map<String, Value>) -> AppliedChanges {
        let mut applied = AppliedChanges {
            keys: Vec::new(),
            loaded: false,
        };
        self.state.send_modify(|state| {
            let early = state.early_keys.take();
            applied.loaded = early.is_none();
            let skip = early.unwrap_or_default();
            let settings = Arc::make_mut(&mut state.settings);
            for (name, value) in values {
                let Some(key) = SettingKey::from_key(name) else {
                    continue;
                };
                if skip.contains(&key) {
                    continue;
                }
                let before = settings.get(key);
                if let Err(e) = settings.set(key, value) {
                    warn!("{}; using default", e);
                    settings.reset(key);
                }
                if settings.get(key) != before {
                    applied.keys.push(key);
                }
            }
            if applied.loaded {
                debug!("Settings reloaded ({} keys changed)", applied.keys.len());
            } else {
                debug!("Settings loaded ({} stored keys, {} kept from early changes)", values.len(), skip.len());
            }
        });
        applied
    }

    /// Apply a storage change notification as one atomic update
    pub fn apply_changes(&self, changes: &StorageChanges) -> AppliedChanges {
        let mut applied = AppliedChanges {
            keys: Vec::new(),
            loaded: false,
        };
        self.state.send_modify(|state| {
            let keys = Arc::make_mut(&mut state.settings).apply_changes(changes);
            match state.early_keys.as_mut() {
                Some(early) => early.extend(keys.iter().copied()),
                None => applied.loaded = true,
            }
            applied.keys = keys;
        });
        applied
    }
}
