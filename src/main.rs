//! vtask-tracker: Always-on step guidance overlay daemon
//!
//! Shows one step of a guide (e.g. a speedrun checklist) at a time and
//! moves through it with global hotkeys, whichever application has focus:
//! - Global key capture on a dedicated listener thread
//! - Debounced keybind dispatch, with keybinds persisted as JSON
//! - Guide templates persisted as JSON
//! - IPC server through which an overlay window reads state, receives
//!   step notifications and edits templates and keybinds

mod config;
mod dispatch;
mod events;
mod hotkey;
mod ipc;
mod keybind;
mod lifecycle;
mod state;
mod steps;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::events::OverlayEvent;
use crate::hotkey::HotkeyListener;
use crate::ipc::Server;
use crate::keybind::KeybindStore;
use crate::lifecycle::ShutdownSignal;
use crate::state::Overlay;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "vtask-tracker starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.working_dir, ?config.socket_path, "configuration loaded");

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Persisted state: keybinds and the startup guide
    let store = KeybindStore::new(config.keybind_path.clone());
    let keybinds = store.load();
    info!(controls = %keybinds.controls_text(), "keybinds active");
    let (steps, guide_path) =
        steps::template::load_startup_guide(&config.guide_path, &config.fallback_guide_path);
    info!(?guide_path, title = steps.title(), "guide ready");

    // Create channels for inter-component communication
    // Hotkey listener -> Overlay controller
    let (hotkey_tx, hotkey_rx) = mpsc::channel(32);
    // IPC server -> Overlay controller
    let (control_tx, control_rx) = mpsc::channel(16);
    // Overlay controller -> presentation (log rendering, IPC subscribers)
    let (event_tx, _event_rx) = broadcast::channel::<OverlayEvent>(64);

    let mut overlay = Overlay::new(
        steps,
        Dispatcher::new(keybinds, config.debounce),
        store,
        config.working_dir.clone(),
        event_tx.clone(),
    );

    // Start the hotkey listener (runs on dedicated thread)
    let hotkey_listener = HotkeyListener::new(hotkey_tx);
    match hotkey::platform_source().and_then(|source| hotkey_listener.start(source)) {
        Ok(()) => {
            info!("hotkey listener started");
            overlay.set_hotkeys_active(true);
        }
        Err(e) => {
            error!(error = %e, "failed to start hotkey listener");
            warn!("continuing without hotkey support - steps can still be driven over IPC");
        }
    }

    let server = Server::new(&config.socket_path, control_tx, event_tx.clone())?;

    let mut presentation_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the overlay controller (returns on Quit)
        _ = overlay.run(hotkey_rx, control_rx) => {
            info!("overlay terminated");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Render overlay events
        _ = async {
            loop {
                match presentation_rx.recv().await {
                    Ok(event) => render(&event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "overlay event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("overlay event handler exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    hotkey_listener.stop();
    server.shutdown().await;

    info!("vtask-tracker stopped");

    Ok(())
}

/// Log-based presentation of overlay events
fn render(event: &OverlayEvent) {
    match event {
        OverlayEvent::StepChanged { index, total, text } => {
            info!("Step {} of {}: {}", index + 1, total, text);
        }
        OverlayEvent::StepsReplaced { title, total } => {
            info!(%title, total, "guide loaded");
        }
        OverlayEvent::Hidden => info!("overlay hidden"),
        OverlayEvent::Shown => info!("overlay shown"),
        OverlayEvent::KeybindsChanged { controls } => info!(%controls, "keybinds updated"),
        OverlayEvent::Terminated => info!("quit requested"),
    }
}
