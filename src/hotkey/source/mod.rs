//! Platform key sources
//!
//! A source observes system-wide key presses and releases and pushes them
//! into a channel read by the listener thread.

use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use super::keys::KeyInput;
use super::listener::HotkeyError;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;

/// Producer of raw global key input
pub trait KeySource: Send + 'static {
    /// Start delivering input into `tx`
    ///
    /// Delivery should end once `running` is cleared or `tx` is
    /// disconnected. Errors opening the OS input stream are returned here.
    fn spawn(self: Box<Self>, tx: Sender<KeyInput>, running: Arc<AtomicBool>)
        -> Result<(), HotkeyError>;
}

/// The key source for the current platform
#[cfg(target_os = "linux")]
pub fn platform_source() -> Result<Box<dyn KeySource>, HotkeyError> {
    Ok(Box::new(linux::EvdevSource))
}

/// The key source for the current platform
#[cfg(target_os = "macos")]
pub fn platform_source() -> Result<Box<dyn KeySource>, HotkeyError> {
    Ok(Box::new(macos::EventTapSource))
}

/// The key source for the current platform
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn platform_source() -> Result<Box<dyn KeySource>, HotkeyError> {
    Err(HotkeyError::Unsupported)
}
