//! Host Extension Wire Protocol
//!
//! Message types exchanged with the tab-tree host extension. Inbound
//! notifications are parsed leniently: anything that does not match a known
//! shape becomes [`InboundMessage::Unrecognized`] and is answered `false`.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Extension id of Tree Style Tab, the default host
pub const DEFAULT_HOST_EXTENSION_ID: &str = "treestyletab@piro.sakura.ne.jp";

/// Mouse button index of the primary button
pub const PRIMARY_BUTTON: i64 = 0;

pub type TabId = i64;
pub type WindowId = i64;

// ----------------------------------------------------------------------------
// Listening Types
// ----------------------------------------------------------------------------

/// Event types this extension can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListeningType {
    Ready,
    TabMousedown,
    TabMouseup,
    /// Drag and drop of a tab started at the OS level
    NativeTabDragstart,
    /// Drag and drop was replaced by some addon's custom drag handling
    TabDragstart,
    /// Tab was long pressed (legacy host-side detection)
    TabDragready,
}

impl ListeningType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListeningType::Ready => "ready",
            ListeningType::TabMousedown => "tab-mousedown",
            ListeningType::TabMouseup => "tab-mouseup",
            ListeningType::NativeTabDragstart => "native-tab-dragstart",
            ListeningType::TabDragstart => "tab-dragstart",
            ListeningType::TabDragready => "tab-dragready",
        }
    }
}

impl fmt::Display for ListeningType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Outbound: this extension → host
// ----------------------------------------------------------------------------

/// Requests sent to the host extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundMessage {
    RegisterSelf {
        name: String,
        #[serde(rename = "listeningTypes")]
        listening_types: Vec<ListeningType>,
    },
    UnregisterSelf,
    StartCustomDrag {
        #[serde(rename = "windowId")]
        window_id: WindowId,
    },
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::RegisterSelf { .. } => "register-self",
            OutboundMessage::UnregisterSelf => "unregister-self",
            OutboundMessage::StartCustomDrag { .. } => "start-custom-drag",
        }
    }
}

// ----------------------------------------------------------------------------
// Inbound: host → this extension
// ----------------------------------------------------------------------------

/// Tab details carried by pointer notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    #[serde(default)]
    pub discarded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<WindowId>,
}

/// `tab-mousedown` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabMouseDown {
    pub button: i64,
    pub tab: TabInfo,
    #[serde(default)]
    pub closebox: bool,
    #[serde(default)]
    pub sound_button: bool,
    #[serde(default)]
    pub twisty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<WindowId>,
}

impl TabMouseDown {
    /// Pressed on the close box, sound toggle or twisty rather than the tab body
    pub fn is_on_tab_control(&self) -> bool {
        self.closebox || self.sound_button || self.twisty
    }

    pub fn is_primary(&self) -> bool {
        self.button == PRIMARY_BUTTON
    }

    /// Window containing the pressed tab
    pub fn window_id(&self) -> Option<WindowId> {
        self.window_id.or(self.tab.window_id)
    }
}

/// `tab-mouseup` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabMouseUp {
    pub button: i64,
    pub tab: TabInfo,
}

impl TabMouseUp {
    pub fn is_primary(&self) -> bool {
        self.button == PRIMARY_BUTTON
    }
}

/// Notifications delivered by the host extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundMessage {
    Ready,
    TabMousedown(TabMouseDown),
    TabMouseup(TabMouseUp),
    NativeTabDragstart,
    TabDragready,
    TabDragstart,
    /// Unknown type or malformed payload
    #[serde(skip)]
    Unrecognized { kind: Option<String> },
}

impl InboundMessage {
    /// Parse a raw host notification, never failing
    pub fn from_value(value: Value) -> Self {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(|s| s.to_string());
        match serde_json::from_value::<InboundMessage>(value) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Unrecognized host message {:?}: {}", kind, e);
                InboundMessage::Unrecognized { kind }
            }
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            InboundMessage::Ready => "ready",
            InboundMessage::TabMousedown(_) => "tab-mousedown",
            InboundMessage::TabMouseup(_) => "tab-mouseup",
            InboundMessage::NativeTabDragstart => "native-tab-dragstart",
            InboundMessage::TabDragready => "tab-dragready",
            InboundMessage::TabDragstart => "tab-dragstart",
            InboundMessage::Unrecognized { kind } => kind.as_deref().unwrap_or("<none>"),
        }
    }
}
