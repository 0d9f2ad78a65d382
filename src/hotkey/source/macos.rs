//! Key source backed by a macOS CGEventTap
//!
//! The tap lives on its own thread with its own CFRunLoop. Modifier
//! transitions arrive as FlagsChanged events and are diffed against the
//! previous flags.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTap, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventTapProxy, CGEventType, EventField,
};
use tracing::{error, info, warn};

use super::KeySource;
use crate::hotkey::keys::{Key, KeyInput, Modifier, ModifierState};
use crate::hotkey::listener::HotkeyError;

pub struct EventTapSource;

/// What the tap callback hands to the run loop thread
#[derive(Debug, Clone, Copy)]
enum TapEvent {
    Down(u16),
    Up(u16),
    Flags(CGEventFlags),
}

impl KeySource for EventTapSource {
    fn spawn(
        self: Box<Self>,
        tx: Sender<KeyInput>,
        running: Arc<AtomicBool>,
    ) -> Result<(), HotkeyError> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        thread::Builder::new()
            .name("event-tap".to_string())
            .spawn(move || run_tap(tx, running, ready_tx))
            .map_err(|e| HotkeyError::ThreadSpawn(e.to_string()))?;

        // The tap must be created on the thread that runs its loop
        ready_rx
            .recv()
            .unwrap_or(Err(HotkeyError::EventTapCreation))
    }
}

fn run_tap(
    tx: Sender<KeyInput>,
    running: Arc<AtomicBool>,
    ready: Sender<Result<(), HotkeyError>>,
) {
    let (callback_tx, callback_rx) = std::sync::mpsc::channel::<TapEvent>();

    // CGEventTap callback - must be fast and non-blocking
    let callback = move |_proxy: CGEventTapProxy, event_type: CGEventType, event: &CGEvent| -> Option<CGEvent> {
        let keycode = || event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16;
        match event_type {
            CGEventType::KeyDown => {
                let _ = callback_tx.send(TapEvent::Down(keycode()));
            }
            CGEventType::KeyUp => {
                let _ = callback_tx.send(TapEvent::Up(keycode()));
            }
            CGEventType::FlagsChanged => {
                let _ = callback_tx.send(TapEvent::Flags(event.get_flags()));
            }
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                warn!("event tap disabled by the system");
            }
            _ => {}
        }
        Some(event.clone())
    };

    let tap = match CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown, CGEventType::KeyUp, CGEventType::FlagsChanged],
        callback,
    ) {
        Ok(tap) => tap,
        Err(()) => {
            error!("failed to create event tap - is Accessibility permission granted?");
            let _ = ready.send(Err(HotkeyError::EventTapCreation));
            return;
        }
    };

    let Ok(run_loop_source) = tap.mach_port.create_runloop_source(0) else {
        let _ = ready.send(Err(HotkeyError::EventTapCreation));
        return;
    };
    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }
    tap.enable();

    info!("event tap created and enabled");
    let _ = ready.send(Ok(()));

    let mut modifiers = ModifierState::default();
    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, Duration::from_millis(100), true);
        }

        while let Ok(event) = callback_rx.try_recv() {
            for input in translate(event, &mut modifiers) {
                if tx.send(input).is_err() {
                    return;
                }
            }
        }
    }
}

/// Turn one tap event into key inputs, updating tracked modifier flags
fn translate(event: TapEvent, modifiers: &mut ModifierState) -> Vec<KeyInput> {
    match event {
        TapEvent::Down(code) => vec![KeyInput::down(map_keycode(code))],
        TapEvent::Up(code) => vec![KeyInput::up(map_keycode(code))],
        TapEvent::Flags(flags) => {
            let next = ModifierState {
                shift: flags.contains(CGEventFlags::CGEventFlagShift),
                ctrl: flags.contains(CGEventFlags::CGEventFlagControl),
                alt: flags.contains(CGEventFlags::CGEventFlagAlternate),
            };
            let changed = Modifier::ALL
                .into_iter()
                .filter(|m| next.contains(*m) != modifiers.contains(*m))
                .map(|m| KeyInput {
                    key: Key::Modifier(m),
                    pressed: next.contains(m),
                })
                .collect();
            *modifiers = next;
            changed
        }
    }
}

/// Translate an ANSI virtual key code
fn map_keycode(code: u16) -> Key {
    let c = match code {
        0x00 => 'a',
        0x01 => 's',
        0x02 => 'd',
        0x03 => 'f',
        0x04 => 'h',
        0x05 => 'g',
        0x06 => 'z',
        0x07 => 'x',
        0x08 => 'c',
        0x09 => 'v',
        0x0B => 'b',
        0x0C => 'q',
        0x0D => 'w',
        0x0E => 'e',
        0x0F => 'r',
        0x10 => 'y',
        0x11 => 't',
        0x12 => '1',
        0x13 => '2',
        0x14 => '3',
        0x15 => '4',
        0x16 => '6',
        0x17 => '5',
        0x18 => '=',
        0x19 => '9',
        0x1A => '7',
        0x1B => '-',
        0x1C => '8',
        0x1D => '0',
        0x1E => ']',
        0x1F => 'o',
        0x20 => 'u',
        0x21 => '[',
        0x22 => 'i',
        0x23 => 'p',
        0x25 => 'l',
        0x26 => 'j',
        0x27 => '\'',
        0x28 => 'k',
        0x29 => ';',
        0x2A => '\\',
        0x2B => ',',
        0x2C => '/',
        0x2D => 'n',
        0x2E => 'm',
        0x2F => '.',
        0x32 => '`',

        0x24 | 0x4C => return Key::Named("enter"),
        0x30 => return Key::Named("tab"),
        0x31 => return Key::Named("space"),
        0x33 => return Key::Named("backspace"),
        0x35 => return Key::Named("esc"),
        0x39 => return Key::Named("caps_lock"),
        0x7A => return Key::Named("f1"),
        0x78 => return Key::Named("f2"),
        0x63 => return Key::Named("f3"),
        0x76 => return Key::Named("f4"),
        0x60 => return Key::Named("f5"),
        0x61 => return Key::Named("f6"),
        0x62 => return Key::Named("f7"),
        0x64 => return Key::Named("f8"),
        0x65 => return Key::Named("f9"),
        0x6D => return Key::Named("f10"),
        0x67 => return Key::Named("f11"),
        0x6F => return Key::Named("f12"),
        0x73 => return Key::Named("home"),
        0x74 => return Key::Named("page_up"),
        0x75 => return Key::Named("delete"),
        0x77 => return Key::Named("end"),
        0x79 => return Key::Named("page_down"),
        0x7B => return Key::Named("left"),
        0x7C => return Key::Named("right"),
        0x7D => return Key::Named("down"),
        0x7E => return Key::Named("up"),

        other => return Key::Unknown(u32::from(other)),
    };
    Key::Char(c)
}
