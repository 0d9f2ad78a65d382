//! Global hotkey listener
//!
//! Consumes raw key input from a platform [`KeySource`], tracks held
//! modifiers and forwards candidate triggers to the overlay controller.
//! Runs on a dedicated thread for the lifetime of the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::keys::{Key, KeyInput, ModifierState};
use super::source::KeySource;

/// How often the listener thread checks for a stop request
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Events sent from the hotkey listener to the overlay controller
#[derive(Debug, Clone)]
pub enum HotkeyEvent {
    /// A non-modifier key was pressed
    Candidate {
        modifiers: ModifierState,
        token: String,
        at: Instant,
    },
    /// The key source stopped delivering input
    SourceLost,
}

/// Errors that can occur in the hotkey listener
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hotkey listener is already running")]
    AlreadyRunning,

    #[error("global hotkeys are not supported on this platform")]
    Unsupported,

    #[error("no readable keyboard devices found - check permissions on /dev/input")]
    NoKeyboards,

    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),
}

/// Held-modifier bookkeeping for one listener
#[derive(Debug, Default)]
pub struct KeyTracker {
    pressed: ModifierState,
}

impl KeyTracker {
    pub fn pressed(&self) -> ModifierState {
        self.pressed
    }

    /// Apply one key input; returns a candidate for non-modifier key-downs
    pub fn process(&mut self, input: KeyInput) -> Option<(ModifierState, String)> {
        match input.key {
            Key::Modifier(modifier) => {
                self.pressed.set(modifier, input.pressed);
                None
            }
            key if input.pressed => key.token().map(|token| (self.pressed, token)),
            _ => None,
        }
    }
}

/// Global hotkey listener
pub struct HotkeyListener {
    event_tx: mpsc::Sender<HotkeyEvent>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl HotkeyListener {
    /// Create a new hotkey listener
    pub fn new(event_tx: mpsc::Sender<HotkeyEvent>) -> Self {
        Self {
            event_tx,
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Start listening to `source` on a dedicated thread
    pub fn start(&self, source: Box<dyn KeySource>) -> Result<(), HotkeyError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HotkeyError::AlreadyRunning);
        }

        let (input_tx, input_rx) = std::sync::mpsc::channel();
        if let Err(e) = source.spawn(input_tx, Arc::clone(&self.running)) {
            self.running.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let event_tx = self.event_tx.clone();
        let running = Arc::clone(&self.running);

        let handle = thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!("hotkey listener thread started");
                run_event_loop(input_rx, event_tx, &running);
                running.store(false, Ordering::SeqCst);
                info!("hotkey listener thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                HotkeyError::ThreadSpawn(e.to_string())
            })?;

        if let Ok(mut slot) = self.handle.lock() {
            *slot = Some(handle);
        }
        Ok(())
    }

    /// Stop the listener and wait for its thread; a no-op when not running
    pub fn stop(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        let handle = self.handle.lock().ok().and_then(|mut slot| slot.take());

        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("hotkey listener thread panicked");
            }
        }
        if was_running {
            info!("hotkey listener stopped");
        }
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Translate key input into candidates until stopped
fn run_event_loop(
    input_rx: Receiver<KeyInput>,
    event_tx: mpsc::Sender<HotkeyEvent>,
    running: &AtomicBool,
) {
    let mut tracker = KeyTracker::default();

    while running.load(Ordering::SeqCst) {
        let input = match input_rx.recv_timeout(POLL_INTERVAL) {
            Ok(input) => input,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("key source disconnected");
                let _ = event_tx.blocking_send(HotkeyEvent::SourceLost);
                break;
            }
        };

        let Some((modifiers, token)) = tracker.process(input) else {
            continue;
        };
        debug!(?modifiers, %token, "hotkey candidate");

        let event = HotkeyEvent::Candidate {
            modifiers,
            token,
            at: Instant::now(),
        };
        if event_tx.blocking_send(event).is_err() {
            warn!("failed to send hotkey event - channel closed?");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::Modifier;

    /// Replays a fixed list of inputs, then disconnects
    struct ScriptedSource(Vec<KeyInput>);

    impl KeySource for ScriptedSource {
        fn spawn(
            self: Box<Self>,
            tx: std::sync::mpsc::Sender<KeyInput>,
            _running: Arc<AtomicBool>,
        ) -> Result<(), HotkeyError> {
            for input in self.0 {
                let _ = tx.send(input);
            }
            Ok(())
        }
    }

    /// Never delivers input and keeps the channel open
    struct IdleSource;

    impl KeySource for IdleSource {
        fn spawn(
            self: Box<Self>,
            tx: std::sync::mpsc::Sender<KeyInput>,
            running: Arc<AtomicBool>,
        ) -> Result<(), HotkeyError> {
            thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(10));
                }
                drop(tx);
            });
            Ok(())
        }
    }

    struct FailingSource;

    impl KeySource for FailingSource {
        fn spawn(
            self: Box<Self>,
            _tx: std::sync::mpsc::Sender<KeyInput>,
            _running: Arc<AtomicBool>,
        ) -> Result<(), HotkeyError> {
            Err(HotkeyError::NoKeyboards)
        }
    }

    const SHIFT: Key = Key::Modifier(Modifier::Shift);

    #[test]
    fn test_listener_creation() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = HotkeyListener::new(tx);
        assert!(!listener.is_running());
    }

    #[test]
    fn test_tracker_modifier_then_key() {
        let mut tracker = KeyTracker::default();
        assert_eq!(tracker.process(KeyInput::down(SHIFT)), None);
        assert!(tracker.pressed().shift);

        let (modifiers, token) = tracker.process(KeyInput::down(Key::Char('D'))).unwrap();
        assert!(modifiers.shift);
        assert_eq!(token, "d");

        assert_eq!(tracker.process(KeyInput::up(Key::Char('D'))), None);
        assert_eq!(tracker.process(KeyInput::up(SHIFT)), None);
        assert!(tracker.pressed().is_empty());

        let (modifiers, token) = tracker.process(KeyInput::down(Key::Char('d'))).unwrap();
        assert!(modifiers.is_empty());
        assert_eq!(token, "d");
    }

    #[test]
    fn test_tracker_ignores_unknown_keys() {
        let mut tracker = KeyTracker::default();
        assert_eq!(tracker.process(KeyInput::down(Key::Unknown(0x2a4))), None);
        assert_eq!(
            tracker.process(KeyInput::down(Key::Named("f1"))),
            Some((ModifierState::default(), "f1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_listener_forwards_candidates() {
        let (tx, mut rx) = mpsc::channel(32);
        let listener = HotkeyListener::new(tx);
        let script = vec![
            KeyInput::down(SHIFT),
            KeyInput::down(Key::Char('d')),
            KeyInput::up(Key::Char('d')),
            KeyInput::up(SHIFT),
            KeyInput::down(Key::Named("space")),
        ];
        listener.start(Box::new(ScriptedSource(script))).unwrap();

        match rx.recv().await {
            Some(HotkeyEvent::Candidate {
                modifiers, token, ..
            }) => {
                assert!(modifiers.shift);
                assert_eq!(token, "d");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.recv().await {
            Some(HotkeyEvent::Candidate {
                modifiers, token, ..
            }) => {
                assert!(modifiers.is_empty());
                assert_eq!(token, "space");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(rx.recv().await, Some(HotkeyEvent::SourceLost)));

        listener.stop();
        assert!(!listener.is_running());
    }

    #[test]
    fn test_start_twice_fails() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = HotkeyListener::new(tx);
        listener.start(Box::new(IdleSource)).unwrap();
        assert!(listener.is_running());

        let err = listener.start(Box::new(IdleSource)).unwrap_err();
        assert!(matches!(err, HotkeyError::AlreadyRunning));

        listener.stop();
        assert!(!listener.is_running());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = HotkeyListener::new(tx);
        listener.stop();

        listener.start(Box::new(IdleSource)).unwrap();
        listener.stop();
        listener.stop();
        assert!(!listener.is_running());
    }

    #[test]
    fn test_failed_source_leaves_listener_stopped() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = HotkeyListener::new(tx);
        let err = listener.start(Box::new(FailingSource)).unwrap_err();
        assert!(matches!(err, HotkeyError::NoKeyboards));
        assert!(!listener.is_running());
    }
}
