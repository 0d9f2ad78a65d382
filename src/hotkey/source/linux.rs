//! Key source backed by evdev input devices
//!
//! Reads every device under `/dev/input` that reports letter keys. The
//! user needs read access to those nodes (usually the `input` group).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use evdev::{Device, EventType, KeyCode};
use tracing::{debug, info, warn};

use super::KeySource;
use crate::hotkey::keys::{Key, KeyInput, Modifier};
use crate::hotkey::listener::HotkeyError;

pub struct EvdevSource;

impl KeySource for EvdevSource {
    fn spawn(
        self: Box<Self>,
        tx: Sender<KeyInput>,
        running: Arc<AtomicBool>,
    ) -> Result<(), HotkeyError> {
        let keyboards: Vec<(PathBuf, Device)> = evdev::enumerate()
            .filter(|(_, device)| {
                device
                    .supported_keys()
                    .map_or(false, |keys| keys.contains(KeyCode::KEY_A))
            })
            .collect();

        if keyboards.is_empty() {
            return Err(HotkeyError::NoKeyboards);
        }

        for (path, device) in keyboards {
            let tx = tx.clone();
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("keyboard-reader".to_string())
                .spawn(move || read_device(path, device, tx, running))
                .map_err(|e| HotkeyError::ThreadSpawn(e.to_string()))?;
        }

        Ok(())
    }
}

/// Forward key events from one device until stopped
fn read_device(path: PathBuf, mut device: Device, tx: Sender<KeyInput>, running: Arc<AtomicBool>) {
    info!(
        ?path,
        name = device.name().unwrap_or("unknown"),
        "reading keyboard device"
    );

    while running.load(Ordering::SeqCst) {
        let events = match device.fetch_events() {
            Ok(events) => events,
            Err(e) => {
                warn!(?path, ?e, "keyboard device read failed");
                return;
            }
        };

        for event in events {
            if event.event_type() != EventType::KEY {
                continue;
            }
            let input = KeyInput {
                key: map_key(KeyCode::new(event.code())),
                pressed: event.value() != 0,
            };
            if tx.send(input).is_err() {
                debug!(?path, "listener gone, closing keyboard device");
                return;
            }
        }
    }
}

/// Translate an evdev key code; layout is assumed to be US QWERTY
fn map_key(code: KeyCode) -> Key {
    let c = match code {
        KeyCode::KEY_LEFTSHIFT | KeyCode::KEY_RIGHTSHIFT => return Key::Modifier(Modifier::Shift),
        KeyCode::KEY_LEFTCTRL | KeyCode::KEY_RIGHTCTRL => return Key::Modifier(Modifier::Ctrl),
        KeyCode::KEY_LEFTALT | KeyCode::KEY_RIGHTALT => return Key::Modifier(Modifier::Alt),

        KeyCode::KEY_A => 'a',
        KeyCode::KEY_B => 'b',
        KeyCode::KEY_C => 'c',
        KeyCode::KEY_D => 'd',
        KeyCode::KEY_E => 'e',
        KeyCode::KEY_F => 'f',
        KeyCode::KEY_G => 'g',
        KeyCode::KEY_H => 'h',
        KeyCode::KEY_I => 'i',
        KeyCode::KEY_J => 'j',
        KeyCode::KEY_K => 'k',
        KeyCode::KEY_L => 'l',
        KeyCode::KEY_M => 'm',
        KeyCode::KEY_N => 'n',
        KeyCode::KEY_O => 'o',
        KeyCode::KEY_P => 'p',
        KeyCode::KEY_Q => 'q',
        KeyCode::KEY_R => 'r',
        KeyCode::KEY_S => 's',
        KeyCode::KEY_T => 't',
        KeyCode::KEY_U => 'u',
        KeyCode::KEY_V => 'v',
        KeyCode::KEY_W => 'w',
        KeyCode::KEY_X => 'x',
        KeyCode::KEY_Y => 'y',
        KeyCode::KEY_Z => 'z',
        KeyCode::KEY_1 => '1',
        KeyCode::KEY_2 => '2',
        KeyCode::KEY_3 => '3',
        KeyCode::KEY_4 => '4',
        KeyCode::KEY_5 => '5',
        KeyCode::KEY_6 => '6',
        KeyCode::KEY_7 => '7',
        KeyCode::KEY_8 => '8',
        KeyCode::KEY_9 => '9',
        KeyCode::KEY_0 => '0',
        KeyCode::KEY_MINUS => '-',
        KeyCode::KEY_EQUAL => '=',
        KeyCode::KEY_LEFTBRACE => '[',
        KeyCode::KEY_RIGHTBRACE => ']',
        KeyCode::KEY_SEMICOLON => ';',
        KeyCode::KEY_APOSTROPHE => '\'',
        KeyCode::KEY_GRAVE => '`',
        KeyCode::KEY_BACKSLASH => '\\',
        KeyCode::KEY_COMMA => ',',
        KeyCode::KEY_DOT => '.',
        KeyCode::KEY_SLASH => '/',

        KeyCode::KEY_F1 => return Key::Named("f1"),
        KeyCode::KEY_F2 => return Key::Named("f2"),
        KeyCode::KEY_F3 => return Key::Named("f3"),
        KeyCode::KEY_F4 => return Key::Named("f4"),
        KeyCode::KEY_F5 => return Key::Named("f5"),
        KeyCode::KEY_F6 => return Key::Named("f6"),
        KeyCode::KEY_F7 => return Key::Named("f7"),
        KeyCode::KEY_F8 => return Key::Named("f8"),
        KeyCode::KEY_F9 => return Key::Named("f9"),
        KeyCode::KEY_F10 => return Key::Named("f10"),
        KeyCode::KEY_F11 => return Key::Named("f11"),
        KeyCode::KEY_F12 => return Key::Named("f12"),
        KeyCode::KEY_SPACE => return Key::Named("space"),
        KeyCode::KEY_ENTER | KeyCode::KEY_KPENTER => return Key::Named("enter"),
        KeyCode::KEY_TAB => return Key::Named("tab"),
        KeyCode::KEY_ESC => return Key::Named("esc"),
        KeyCode::KEY_BACKSPACE => return Key::Named("backspace"),
        KeyCode::KEY_DELETE => return Key::Named("delete"),
        KeyCode::KEY_INSERT => return Key::Named("insert"),
        KeyCode::KEY_HOME => return Key::Named("home"),
        KeyCode::KEY_END => return Key::Named("end"),
        KeyCode::KEY_PAGEUP => return Key::Named("page_up"),
        KeyCode::KEY_PAGEDOWN => return Key::Named("page_down"),
        KeyCode::KEY_UP => return Key::Named("up"),
        KeyCode::KEY_DOWN => return Key::Named("down"),
        KeyCode::KEY_LEFT => return Key::Named("left"),
        KeyCode::KEY_RIGHT => return Key::Named("right"),
        KeyCode::KEY_CAPSLOCK => return Key::Named("caps_lock"),
        KeyCode::KEY_PAUSE => return Key::Named("pause"),
        KeyCode::KEY_SYSRQ => return Key::Named("print_screen"),

        other => return Key::Unknown(u32::from(other.code())),
    };
    Key::Char(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_letters_and_modifiers() {
        assert_eq!(map_key(KeyCode::KEY_D), Key::Char('d'));
        assert_eq!(map_key(KeyCode::KEY_0), Key::Char('0'));
        assert_eq!(map_key(KeyCode::KEY_RIGHTSHIFT), Key::Modifier(Modifier::Shift));
        assert_eq!(map_key(KeyCode::KEY_LEFTCTRL), Key::Modifier(Modifier::Ctrl));
    }

    #[test]
    fn test_map_named_keys() {
        assert_eq!(map_key(KeyCode::KEY_F5), Key::Named("f5"));
        assert_eq!(map_key(KeyCode::KEY_KPENTER), Key::Named("enter"));
        assert_eq!(map_key(KeyCode::KEY_PAGEDOWN), Key::Named("page_down"));
    }

    #[test]
    fn test_map_unknown_key() {
        assert!(matches!(map_key(KeyCode::KEY_MUTE), Key::Unknown(_)));
    }
}
