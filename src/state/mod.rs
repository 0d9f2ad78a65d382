//! Overlay state: the lifecycle machine and the controller that owns it
//!
//! - Running: overlay visible, hotkeys active
//! - Minimized: overlay hidden, hotkeys still active
//! - Terminated: Quit requested, absorbing

mod machine;
mod overlay;

pub use machine::Lifecycle;
pub use overlay::Overlay;
