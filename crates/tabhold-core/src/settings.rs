//! User Settings Model
//!
//! The flat key/value settings persisted by the extension, their defaults, and
//! the incremental change format delivered by storage change notifications.
//! Every key always has a value: a removed key reads as its default.

use crate::errors::{TabholdError, TabholdResult};
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ----------------------------------------------------------------------------
// Setting Keys
// ----------------------------------------------------------------------------

/// Known setting keys, spelled as they appear in storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SettingKey {
    DetectDragAndDrop,
    PreventDragAndDroppedTabs,
    DetectCustomDrag,
    PreventCustomDraggedTabs,
    DetectLongPressedTabs,
    LongPressTimeInMilliseconds,
    PreventLongPressedTabs,
    PreventDragAndDropAfterLongPress,
    PreventDragAndDropAfterLongPressLegacy,
    PreventOnlyForUnloadedTabs,
}

impl SettingKey {
    pub const ALL: [SettingKey; 10] = [
        SettingKey::DetectDragAndDrop,
        SettingKey::PreventDragAndDroppedTabs,
        SettingKey::DetectCustomDrag,
        SettingKey::PreventCustomDraggedTabs,
        SettingKey::DetectLongPressedTabs,
        SettingKey::LongPressTimeInMilliseconds,
        SettingKey::PreventLongPressedTabs,
        SettingKey::PreventDragAndDropAfterLongPress,
        SettingKey::PreventDragAndDropAfterLongPressLegacy,
        SettingKey::PreventOnlyForUnloadedTabs,
    ];

    /// Storage key name
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::DetectDragAndDrop => "detectDragAndDrop",
            SettingKey::PreventDragAndDroppedTabs => "preventDragAndDroppedTabs",
            SettingKey::DetectCustomDrag => "detectCustomDrag",
            SettingKey::PreventCustomDraggedTabs => "preventCustomDraggedTabs",
            SettingKey::DetectLongPressedTabs => "detectLongPressedTabs",
            SettingKey::LongPressTimeInMilliseconds => "longPressTimeInMilliseconds",
            SettingKey::PreventLongPressedTabs => "preventLongPressedTabs",
            SettingKey::PreventDragAndDropAfterLongPress => "preventDragAndDropAfterLongPress",
            SettingKey::PreventDragAndDropAfterLongPressLegacy => {
                "preventDragAndDropAfterLongPress_Legacy"
            }
            SettingKey::PreventOnlyForUnloadedTabs => "preventOnlyForUnloadedTabs",
        }
    }

    /// Look up a storage key name. Unknown keys return `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == key)
    }

    /// Whether a change to this key changes the set of subscribed event types
    pub fn affects_registration(&self) -> bool {
        matches!(
            self,
            SettingKey::DetectDragAndDrop
                | SettingKey::DetectCustomDrag
                | SettingKey::DetectLongPressedTabs
                | SettingKey::PreventDragAndDropAfterLongPress
                | SettingKey::PreventDragAndDropAfterLongPressLegacy
        )
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Settings
// ----------------------------------------------------------------------------

/// Snapshot of all user settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub detect_drag_and_drop: bool,
    pub prevent_drag_and_dropped_tabs: bool,
    pub detect_custom_drag: bool,
    pub prevent_custom_dragged_tabs: bool,
    pub detect_long_pressed_tabs: bool,
    pub long_press_time_in_milliseconds: u64,
    pub prevent_long_pressed_tabs: bool,
    pub prevent_drag_and_drop_after_long_press: bool,
    #[serde(rename = "preventDragAndDropAfterLongPress_Legacy")]
    pub prevent_drag_and_drop_after_long_press_legacy: bool,
    pub prevent_only_for_unloaded_tabs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prevent_only_for_unloaded_tabs: false,

            detect_long_pressed_tabs: false,
            long_press_time_in_milliseconds: 400,
            prevent_long_pressed_tabs: true,
            prevent_drag_and_drop_after_long_press: false,
            prevent_drag_and_drop_after_long_press_legacy: false,

            detect_drag_and_drop: true,
            prevent_drag_and_dropped_tabs: true,

            detect_custom_drag: true,
            prevent_custom_dragged_tabs: true,
        }
    }
}

impl Settings {
    /// Overwrite one key from a raw storage value
    pub fn set(&mut self, key: SettingKey, value: &Value) -> TabholdResult<()> {
        match key {
            SettingKey::LongPressTimeInMilliseconds => {
                self.long_press_time_in_milliseconds = parse_millis(key, value)?;
            }
            _ => {
                let flag = value.as_bool().ok_or_else(|| invalid(key, "expected a boolean"))?;
                if let Some(slot) = self.flag_mut(key) {
                    *slot = flag;
                }
            }
        }
        Ok(())
    }

    /// Current value of one key, in its storage form
    pub fn get(&self, key: SettingKey) -> Value {
        match key {
            SettingKey::LongPressTimeInMilliseconds => {
                Value::from(self.long_press_time_in_milliseconds)
            }
            _ => Value::Bool(self.flag(key)),
        }
    }

    /// Restore one key to its default value
    pub fn reset(&mut self, key: SettingKey) {
        let mut defaults = Settings::default();
        match key {
            SettingKey::LongPressTimeInMilliseconds => {
                self.long_press_time_in_milliseconds = defaults.long_press_time_in_milliseconds;
            }
            _ => {
                if let (Some(slot), Some(default)) = (self.flag_mut(key), defaults.flag_mut(key)) {
                    *slot = *default;
                }
            }
        }
    }

    /// Apply a storage change notification.
    ///
    /// Keys with a new value are overwritten, removed keys fall back to their
    /// default, values of the wrong type fall back to the default as well.
    /// Unknown keys are ignored. Returns the known keys that were touched.
    pub fn apply_changes(&mut self, changes: &StorageChanges) -> Vec<SettingKey> {
        let mut touched = Vec::new();
        for (name, change) in changes {
            let Some(key) = SettingKey::from_key(name) else {
                continue;
            };
            match &change.new_value {
                Some(value) => {
                    if let Err(e) = self.set(key, value) {
                        tracing::warn!("{}; using default", e);
                        self.reset(key);
                    }
                }
                None => self.reset(key),
            }
            touched.push(key);
        }
        touched
    }

    /// Derive the long-press detection mode from the current flags
    pub fn long_press_mode(&self) -> LongPressMode {
        LongPressMode::from_settings(self)
    }

    /// Configured long-press threshold
    pub fn long_press_duration(&self) -> Duration {
        Duration::from_millis(self.long_press_time_in_milliseconds)
    }

    fn flag(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::DetectDragAndDrop => self.detect_drag_and_drop,
            SettingKey::PreventDragAndDroppedTabs => self.prevent_drag_and_dropped_tabs,
            SettingKey::DetectCustomDrag => self.detect_custom_drag,
            SettingKey::PreventCustomDraggedTabs => self.prevent_custom_dragged_tabs,
            SettingKey::DetectLongPressedTabs => self.detect_long_pressed_tabs,
            SettingKey::PreventLongPressedTabs => self.prevent_long_pressed_tabs,
            SettingKey::PreventDragAndDropAfterLongPress => {
                self.prevent_drag_and_drop_after_long_press
            }
            SettingKey::PreventDragAndDropAfterLongPressLegacy => {
                self.prevent_drag_and_drop_after_long_press_legacy
            }
            SettingKey::PreventOnlyForUnloadedTabs => self.prevent_only_for_unloaded_tabs,
            SettingKey::LongPressTimeInMilliseconds => false,
        }
    }

    fn flag_mut(&mut self, key: SettingKey) -> Option<&mut bool> {
        let slot = match key {
            SettingKey::DetectDragAndDrop => &mut self.detect_drag_and_drop,
            SettingKey::PreventDragAndDroppedTabs => &mut self.prevent_drag_and_dropped_tabs,
            SettingKey::DetectCustomDrag => &mut self.detect_custom_drag,
            SettingKey::PreventCustomDraggedTabs => &mut self.prevent_custom_dragged_tabs,
            SettingKey::DetectLongPressedTabs => &mut self.detect_long_pressed_tabs,
            SettingKey::PreventLongPressedTabs => &mut self.prevent_long_pressed_tabs,
            SettingKey::PreventDragAndDropAfterLongPress => {
                &mut self.prevent_drag_and_drop_after_long_press
            }
            SettingKey::PreventDragAndDropAfterLongPressLegacy => {
                &mut self.prevent_drag_and_drop_after_long_press_legacy
            }
            SettingKey::PreventOnlyForUnloadedTabs => &mut self.prevent_only_for_unloaded_tabs,
            SettingKey::LongPressTimeInMilliseconds => return None,
        };
        Some(slot)
    }
}

fn parse_millis(key: SettingKey, value: &Value) -> TabholdResult<u64> {
    if let Some(ms) = value.as_u64() {
        return Ok(ms);
    }
    match value.as_f64() {
        Some(ms) if ms.is_finite() && ms >= 0.0 => Ok(ms.trunc() as u64),
        Some(_) => Err(invalid(key, "expected a non-negative number")),
        None => Err(invalid(key, "expected a number")),
    }
}

fn invalid(key: SettingKey, reason: &str) -> TabholdError {
    TabholdError::InvalidSetting {
        key: key.as_str().to_string(),
        reason: reason.to_string(),
    }
}

// ----------------------------------------------------------------------------
// Storage Changes
// ----------------------------------------------------------------------------

/// One entry of a storage change notification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageChange {
    /// New value; absent when the key was removed
    #[serde(rename = "newValue", default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

impl StorageChange {
    pub fn set(value: impl Into<Value>) -> Self {
        Self {
            new_value: Some(value.into()),
        }
    }

    pub fn removed() -> Self {
        Self { new_value: None }
    }
}

/// A complete change notification, keyed by storage key name
pub type StorageChanges = BTreeMap<String, StorageChange>;

// ----------------------------------------------------------------------------
// Long-Press Mode
// ----------------------------------------------------------------------------

/// How long presses are detected, derived from settings.
///
/// The flag combinations are taken literally; settings such as
/// `preventDragAndDropAfterLongPress=false` with `_Legacy=true` land in
/// `Modern` without a custom drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongPressMode {
    /// Long presses are not detected
    Disabled,
    /// An internal timer detects the long press
    Modern {
        /// Ask the host to begin a custom drag when the timer fires
        start_custom_drag: bool,
    },
    /// The host signals the long press with `tab-dragready`
    LegacyCombined,
}

impl LongPressMode {
    pub fn from_settings(settings: &Settings) -> Self {
        if !settings.detect_long_pressed_tabs {
            return LongPressMode::Disabled;
        }
        let after = settings.prevent_drag_and_drop_after_long_press;
        let legacy = settings.prevent_drag_and_drop_after_long_press_legacy;
        if after && legacy {
            LongPressMode::LegacyCombined
        } else {
            LongPressMode::Modern {
                start_custom_drag: after && !legacy,
            }
        }
    }

    /// Whether a mouse-down should arm the internal timer
    pub fn uses_timer(&self) -> bool {
        matches!(self, LongPressMode::Modern { .. })
    }

    /// Whether the host should deliver `tab-dragready`
    pub fn uses_drag_ready(&self) -> bool {
        matches!(self, LongPressMode::LegacyCombined)
    }
}
