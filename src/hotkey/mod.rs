//! Hotkey module for global keyboard event listening
//!
//! A platform key source (evdev on Linux, CGEventTap on macOS) feeds the
//! listener thread, which turns key presses into candidates for the
//! dispatcher.

mod keys;
mod listener;
mod source;

pub use keys::{Modifier, ModifierState};
pub use listener::{HotkeyEvent, HotkeyListener};
pub use source::platform_source;
