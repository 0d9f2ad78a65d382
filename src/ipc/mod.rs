//! IPC module for daemon-presentation communication

mod protocol;
mod server;

pub use protocol::{OverlayStatus, Request, Response};
pub use server::{ControlMessage, Server};
