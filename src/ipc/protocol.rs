//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::events::OverlayEvent;
use crate::keybind::{Action, KeybindConfig};
use crate::state::Lifecycle;

/// Largest accepted message body
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from a presentation surface to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request the current overlay status
    GetStatus,

    /// Subscribe to overlay event notifications
    Subscribe,

    /// Perform an action as if its hotkey was pressed (not debounced)
    Trigger { action: Action },

    /// Replace the guide with a template file
    LoadTemplate { path: PathBuf },

    /// Save the current steps to a template file
    SaveTemplate { path: PathBuf },

    /// Create a template from a name and one step per line, then load it
    CreateTemplate { name: String, steps: String },

    /// Request the active keybinds
    GetKeybinds,

    /// Validate, save and apply new keybinds
    SetKeybinds { keybinds: KeybindConfig },

    /// Restore, save and apply the default keybinds
    ResetKeybinds,
}

/// Responses and notifications from the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current overlay status
    Status(OverlayStatus),

    /// Subscription confirmed
    Subscribed,

    /// Active keybinds and their rendered controls line
    Keybinds {
        keybinds: KeybindConfig,
        controls: String,
    },

    /// A template was loaded or created
    TemplateLoaded {
        title: String,
        total: usize,
        path: PathBuf,
    },

    /// The current steps were written
    TemplateSaved { path: PathBuf },

    /// Pushed to subscribed clients on every overlay event
    Event { event: OverlayEvent },

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl std::fmt::Display) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// Snapshot of everything the overlay displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayStatus {
    /// Daemon version
    pub version: String,

    pub lifecycle: Lifecycle,

    /// Title of the loaded guide
    pub title: String,

    /// Zero-based index of the current step
    pub index: usize,

    pub total: usize,

    /// Text of the current step, if any steps are loaded
    pub text: Option<String>,

    /// Counter line, e.g. `Step 3 of 9`
    pub counter: String,

    /// Controls help line
    pub controls: String,

    /// Whether global hotkeys are being received
    pub hotkeys_active: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}
