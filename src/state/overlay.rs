//! Overlay controller
//!
//! Single owner of the step list, lifecycle and keybinds. Hotkey
//! candidates and IPC requests arrive over channels and are handled one at
//! a time on the controller task; every change is broadcast as an
//! [`OverlayEvent`].

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::machine::Lifecycle;
use crate::dispatch::Dispatcher;
use crate::events::OverlayEvent;
use crate::hotkey::HotkeyEvent;
use crate::ipc::{ControlMessage, OverlayStatus, Request, Response};
use crate::keybind::{self, Action, KeybindConfig, KeybindStore};
use crate::steps::{template, StepList, TemplateDocument};

pub struct Overlay {
    steps: StepList,
    lifecycle: Lifecycle,
    dispatcher: Dispatcher,
    store: KeybindStore,
    /// Relative template paths resolve against this directory
    working_dir: PathBuf,
    event_tx: broadcast::Sender<OverlayEvent>,
    hotkeys_active: bool,
    started_at: Instant,
}

impl Overlay {
    pub fn new(
        steps: StepList,
        dispatcher: Dispatcher,
        store: KeybindStore,
        working_dir: PathBuf,
        event_tx: broadcast::Sender<OverlayEvent>,
    ) -> Self {
        Self {
            steps,
            lifecycle: Lifecycle::Running,
            dispatcher,
            store,
            working_dir,
            event_tx,
            hotkeys_active: false,
            started_at: Instant::now(),
        }
    }

    pub fn set_hotkeys_active(&mut self, active: bool) {
        self.hotkeys_active = active;
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn steps(&self) -> &StepList {
        &self.steps
    }

    /// Process hotkey candidates and control requests until Quit
    pub async fn run(
        &mut self,
        mut hotkey_rx: mpsc::Receiver<HotkeyEvent>,
        mut control_rx: mpsc::Receiver<ControlMessage>,
    ) {
        info!(lifecycle = %self.lifecycle, steps = self.steps.len(), "overlay started");
        self.emit_step();

        while !self.lifecycle.is_terminated() {
            tokio::select! {
                Some(event) = hotkey_rx.recv() => {
                    self.handle_hotkey(event);
                }
                Some(message) = control_rx.recv() => {
                    let response = self.handle_request(message.request);
                    let _ = message.reply.send(response);
                }
                else => {
                    info!("all overlay inputs closed");
                    break;
                }
            }
        }

        info!("overlay stopped");
    }

    /// Handle an event from the hotkey listener
    pub fn handle_hotkey(&mut self, event: HotkeyEvent) {
        match event {
            HotkeyEvent::Candidate {
                modifiers,
                token,
                at,
            } => {
                if let Some(action) = self.dispatcher.on_candidate(modifiers, &token, at) {
                    self.perform(action);
                }
            }
            HotkeyEvent::SourceLost => {
                warn!("hotkey source lost, global hotkeys disabled");
                self.hotkeys_active = false;
            }
        }
    }

    /// Execute a bound action
    pub fn perform(&mut self, action: Action) {
        if self.lifecycle.is_terminated() {
            return;
        }
        debug!(%action, "performing action");

        match action {
            Action::NextStep => {
                if self.steps.advance() {
                    self.emit_step();
                }
            }
            Action::PreviousStep => {
                if self.steps.retreat() {
                    self.emit_step();
                }
            }
            Action::ToggleMinimize => self.transition_to(self.lifecycle.toggle_minimize()),
            Action::Quit => self.transition_to(self.lifecycle.quit()),
        }
    }

    /// Answer a control request from the IPC server
    pub fn handle_request(&mut self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,
            Request::Subscribe => Response::Subscribed,
            Request::GetStatus => Response::Status(self.status()),
            Request::Trigger { action } => {
                self.perform(action);
                Response::Status(self.status())
            }
            Request::LoadTemplate { path } => self.load_template(&path),
            Request::SaveTemplate { path } => self.save_template(&path),
            Request::CreateTemplate { name, steps } => self.create_template(&name, &steps),
            Request::GetKeybinds => self.keybinds_response(),
            Request::SetKeybinds { keybinds } => self.apply_keybinds(keybinds),
            Request::ResetKeybinds => self.apply_keybinds(KeybindConfig::default()),
        }
    }

    /// Snapshot of what the overlay shows
    pub fn status(&self) -> OverlayStatus {
        OverlayStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            lifecycle: self.lifecycle,
            title: self.steps.title().to_string(),
            index: self.steps.current_index(),
            total: self.steps.len(),
            text: self.steps.current_step().map(str::to_string),
            counter: self.steps.counter_text(),
            controls: self.dispatcher.config().controls_text(),
            hotkeys_active: self.hotkeys_active,
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    fn load_template(&mut self, path: &Path) -> Response {
        let path = self.working_dir.join(path);
        match template::read(&path) {
            Ok(mut document) => {
                if document.title.is_empty() {
                    document.title = template::title_from_path(&path);
                }
                self.replace_steps(document, path)
            }
            Err(e) => {
                warn!(error = %e, "failed to load template");
                Response::error("load_failed", e)
            }
        }
    }

    fn save_template(&mut self, path: &Path) -> Response {
        if self.steps.is_empty() {
            return Response::error("no_steps", "no steps to save");
        }

        let path = self.working_dir.join(path);
        let document = self.steps.to_document(template::title_from_path(&path));
        match template::write(&path, &document) {
            Ok(()) => {
                info!(?path, steps = document.steps.len(), "template saved");
                Response::TemplateSaved { path }
            }
            Err(e) => {
                warn!(error = %e, "failed to save template");
                Response::error("write_failed", e)
            }
        }
    }

    fn create_template(&mut self, name: &str, steps_text: &str) -> Response {
        let document = match template::new_template(name, steps_text) {
            Ok(document) => document,
            Err(e) => return Response::error("invalid_template", e),
        };

        let path = self.working_dir.join(template::template_file_name(name));
        if let Err(e) = template::write(&path, &document) {
            warn!(error = %e, "failed to write new template");
            return Response::error("write_failed", e);
        }
        info!(?path, title = %document.title, "template created");
        self.replace_steps(document, path)
    }

    fn replace_steps(&mut self, document: TemplateDocument, path: PathBuf) -> Response {
        self.steps.load(document);
        info!(?path, title = self.steps.title(), steps = self.steps.len(), "guide replaced");

        self.emit(OverlayEvent::StepsReplaced {
            title: self.steps.title().to_string(),
            total: self.steps.len(),
        });
        self.emit_step();

        Response::TemplateLoaded {
            title: self.steps.title().to_string(),
            total: self.steps.len(),
            path,
        }
    }

    fn keybinds_response(&self) -> Response {
        let keybinds = self.dispatcher.config().clone();
        Response::Keybinds {
            controls: keybinds.controls_text(),
            keybinds,
        }
    }

    /// Validate, persist, then activate; nothing changes on failure
    fn apply_keybinds(&mut self, candidate: KeybindConfig) -> Response {
        let keybinds = match keybind::validate(candidate) {
            Ok(keybinds) => keybinds,
            Err(e) => {
                warn!(error = %e, "rejected keybinds");
                return Response::error("invalid_keybinds", e);
            }
        };

        if let Err(e) = self.store.save(&keybinds) {
            warn!(error = %e, "failed to save keybinds");
            return Response::error("write_failed", e);
        }

        self.dispatcher.set_config(keybinds);
        self.emit(OverlayEvent::KeybindsChanged {
            controls: self.dispatcher.config().controls_text(),
        });
        self.keybinds_response()
    }

    fn transition_to(&mut self, next: Lifecycle) {
        let previous = self.lifecycle;
        if next == previous {
            return;
        }

        info!(from = %previous, to = %next, "lifecycle transition");
        self.lifecycle = next;

        let event = match next {
            Lifecycle::Running => OverlayEvent::Shown,
            Lifecycle::Minimized => OverlayEvent::Hidden,
            Lifecycle::Terminated => OverlayEvent::Terminated,
        };
        self.emit(event);
    }

    fn emit_step(&self) {
        if let Some(text) = self.steps.current_step() {
            self.emit(OverlayEvent::StepChanged {
                index: self.steps.current_index(),
                total: self.steps.len(),
                text: text.to_string(),
            });
        }
    }

    fn emit(&self, event: OverlayEvent) {
        debug!(%event, "emitting overlay event");
        let _ = self.event_tx.send(event);
    }
}
