//! Keybind configuration: actions, bindings and their JSON document

mod model;
mod store;

pub use model::{Action, Keybind, KeybindConfig};
pub use store::{validate, KeybindError, KeybindStore};
