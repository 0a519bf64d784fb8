//! Translation of key events into the byte sequences a shell expects on
//! its PTY: C0 controls, CSI/SS3 cursor keys, function-key sequences, and
//! Ctrl-chords.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        const CTRL  = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const SHIFT = 0b0000_0100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Repeat,
    Release,
}

/// Logical keys the GUI layer reports. Printable input arrives separately
/// as character events; `Char` exists for chord handling (Ctrl+letter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub action: KeyAction,
    pub key: Key,
    pub mods: KeyModifiers,
}

impl KeyEvent {
    pub fn press(key: Key, mods: KeyModifiers) -> Self {
        Self {
            action: KeyAction::Press,
            key,
            mods,
        }
    }
}

/// What a handled key event turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    /// Write these bytes to the PTY.
    Bytes(Vec<u8>),
    /// Copy the screen selection to the clipboard (Shift+Ctrl+C).
    Copy,
    /// Write the clipboard contents to the PTY (Shift+Ctrl+V).
    Paste,
}

/// Map a key event to its outbound encoding. `None` means not handled;
/// release events are never handled.
pub fn encode_key(ev: &KeyEvent, app_cursor_keys: bool) -> Option<Encoded> {
    if ev.action == KeyAction::Release {
        return None;
    }

    if ev.mods.is_empty() {
        return encode_plain(ev.key, app_cursor_keys).map(Encoded::Bytes);
    }

    if ev.mods == KeyModifiers::CTRL {
        if let Key::Char(c) = ev.key {
            let c = c.to_ascii_uppercase();
            // A..=] covers the classic control range 0x01..=0x1D.
            if ('A'..=']').contains(&c) {
                return Some(Encoded::Bytes(vec![c as u8 - b'A' + 1]));
            }
        }
        return None;
    }

    if ev.mods == KeyModifiers::CTRL | KeyModifiers::SHIFT {
        return match ev.key {
            Key::Char('c') | Key::Char('C') => Some(Encoded::Copy),
            Key::Char('v') | Key::Char('V') => Some(Encoded::Paste),
            _ => None,
        };
    }

    None
}

fn encode_plain(key: Key, app_cursor_keys: bool) -> Option<Vec<u8>> {
    // Cursor keys switch between CSI and SS3 framing with DECCKM.
    let cursor = |letter: u8| {
        let prefix: &[u8] = if app_cursor_keys { b"\x1bO" } else { b"\x1b[" };
        let mut seq = prefix.to_vec();
        seq.push(letter);
        Some(seq)
    };
    match key {
        Key::Escape => Some(b"\x1b".to_vec()),
        Key::Enter => Some(b"\n".to_vec()),
        Key::Backspace => Some(b"\x08".to_vec()),
        Key::Tab => Some(b"\t".to_vec()),
        Key::Up => cursor(b'A'),
        Key::Down => cursor(b'B'),
        Key::Right => cursor(b'C'),
        Key::Left => cursor(b'D'),
        Key::Home => cursor(b'H'),
        Key::End => cursor(b'F'),
        Key::PageUp => Some(b"\x1b[5~".to_vec()),
        Key::PageDown => Some(b"\x1b[6~".to_vec()),
        Key::Insert => Some(b"\x1b[2~".to_vec()),
        Key::Delete => Some(b"\x1b[3~".to_vec()),
        Key::F(n @ 1..=4) => Some(vec![0x1b, b'O', b'P' + n - 1]),
        Key::F(n @ 5..=12) => {
            let code = match n {
                5 => 15,
                6 => 17,
                7 => 18,
                8 => 19,
                9 => 20,
                10 => 21,
                11 => 23,
                _ => 24,
            };
            Some(format!("\x1b[{code}~").into_bytes())
        }
        Key::F(_) | Key::Char(_) => None,
    }
}

/// Character events pass through as their UTF-8 encoding.
pub fn encode_char(code_point: char) -> Vec<u8> {
    let mut buf = [0u8; 4];
    code_point.encode_utf8(&mut buf).as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(encoded: Option<Encoded>) -> Vec<u8> {
        match encoded {
            Some(Encoded::Bytes(b)) => b,
            other => panic!("expected bytes, got {other:?}"),
        }
    }

    #[test]
    fn release_events_are_not_handled() {
        let ev = KeyEvent {
            action: KeyAction::Release,
            key: Key::Enter,
            mods: KeyModifiers::empty(),
        };
        assert_eq!(encode_key(&ev, false), None);
    }

    #[test]
    fn arrow_up_switches_framing_with_cursor_key_mode() {
        let ev = KeyEvent::press(Key::Up, KeyModifiers::empty());
        assert_eq!(bytes(encode_key(&ev, false)), b"\x1b[A");
        assert_eq!(bytes(encode_key(&ev, true)), b"\x1bOA");
    }

    #[test]
    fn all_cursor_keys_use_the_expected_letters() {
        let cases = [
            (Key::Up, b'A'),
            (Key::Down, b'B'),
            (Key::Right, b'C'),
            (Key::Left, b'D'),
            (Key::End, b'F'),
            (Key::Home, b'H'),
        ];
        for (key, letter) in cases {
            let ev = KeyEvent::press(key, KeyModifiers::empty());
            assert_eq!(bytes(encode_key(&ev, false)), [0x1b, b'[', letter]);
            assert_eq!(bytes(encode_key(&ev, true)), [0x1b, b'O', letter]);
        }
    }

    #[test]
    fn c0_keys() {
        let cases: [(Key, &[u8]); 4] = [
            (Key::Escape, b"\x1b"),
            (Key::Enter, b"\n"),
            (Key::Backspace, b"\x08"),
            (Key::Tab, b"\t"),
        ];
        for (key, expected) in cases {
            let ev = KeyEvent::press(key, KeyModifiers::empty());
            assert_eq!(bytes(encode_key(&ev, false)), expected);
        }
    }

    #[test]
    fn editing_pad_and_function_keys() {
        let cases: [(Key, &[u8]); 8] = [
            (Key::Insert, b"\x1b[2~"),
            (Key::Delete, b"\x1b[3~"),
            (Key::PageUp, b"\x1b[5~"),
            (Key::PageDown, b"\x1b[6~"),
            (Key::F(1), b"\x1bOP"),
            (Key::F(4), b"\x1bOS"),
            (Key::F(5), b"\x1b[15~"),
            (Key::F(12), b"\x1b[24~"),
        ];
        for (key, expected) in cases {
            let ev = KeyEvent::press(key, KeyModifiers::empty());
            assert_eq!(bytes(encode_key(&ev, false)), expected);
        }
    }

    #[test]
    fn ctrl_chords_are_single_control_bytes() {
        let ev = KeyEvent::press(Key::Char('a'), KeyModifiers::CTRL);
        assert_eq!(bytes(encode_key(&ev, false)), [0x01]);
        let ev = KeyEvent::press(Key::Char('Z'), KeyModifiers::CTRL);
        assert_eq!(bytes(encode_key(&ev, false)), [0x1a]);
        let ev = KeyEvent::press(Key::Char(']'), KeyModifiers::CTRL);
        assert_eq!(bytes(encode_key(&ev, false)), [0x1d]);
        // Outside the control range nothing is emitted.
        let ev = KeyEvent::press(Key::Char('1'), KeyModifiers::CTRL);
        assert_eq!(encode_key(&ev, false), None);
    }

    #[test]
    fn shift_ctrl_clipboard_chords() {
        let copy = KeyEvent::press(Key::Char('c'), KeyModifiers::CTRL | KeyModifiers::SHIFT);
        assert_eq!(encode_key(&copy, false), Some(Encoded::Copy));
        let paste = KeyEvent::press(Key::Char('V'), KeyModifiers::CTRL | KeyModifiers::SHIFT);
        assert_eq!(encode_key(&paste, false), Some(Encoded::Paste));
        let other = KeyEvent::press(Key::Char('x'), KeyModifiers::CTRL | KeyModifiers::SHIFT);
        assert_eq!(encode_key(&other, false), None);
    }

    #[test]
    fn plain_characters_are_left_to_char_events() {
        let ev = KeyEvent::press(Key::Char('q'), KeyModifiers::empty());
        assert_eq!(encode_key(&ev, false), None);
    }

    #[test]
    fn char_events_encode_as_utf8() {
        assert_eq!(encode_char('a'), b"a");
        assert_eq!(encode_char('€'), "€".as_bytes());
        assert_eq!(encode_char('🦀'), "🦀".as_bytes());
    }
}
