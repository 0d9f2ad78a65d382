//! Hotkey dispatch with a global debounce window

mod dispatcher;

pub use dispatcher::{Dispatcher, DEFAULT_DEBOUNCE};
