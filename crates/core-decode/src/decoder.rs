//! Byte-at-a-time decoder for the stream coming out of the PTY: UTF-8 text
//! interleaved with C0 controls, 7-bit escape sequences, CSI and OSC.
//!
//! The decoder never fails. Unrecognized sequences are logged at debug
//! level and dropped; the stream continues at the next byte.

use crate::params::{next_param, parse_params1, parse_params2};
use crate::utf8::partial_tail_len;
use core_screen::{Color, Decoration, FontStyle, Intensity, Screen};
use std::mem;
use tracing::debug;

const ESC: u8 = 0x1B;

/// Reply sent for a primary Device Attributes query: VT100 with advanced
/// video option.
const DA_REPLY: &[u8] = b"\x1b[?1;2c";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Normal,
    Escape,
    /// Two-byte escape: the intermediate has been seen, the final is next.
    EscapeIntermediate,
    Csi,
    Osc,
}

/// The input state machine. Feed it bytes with [`Decoder::decode_input`];
/// it mutates the [`Screen`] and accumulates reply bytes (currently only
/// the DA answer) for the session to flush back into the PTY.
#[derive(Debug, Default)]
pub struct Decoder {
    state: State,
    /// The in-progress escape sequence, verbatim.
    input_seq: Vec<u8>,
    /// Pending printable text; the tail may hold an incomplete UTF-8
    /// code point across calls.
    input_text: Vec<u8>,
    /// Outbound bytes owed to the PTY.
    replies: Vec<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk of PTY output. Complete pending text is committed
    /// to the screen before returning.
    pub fn decode_input(&mut self, screen: &mut Screen, data: &[u8]) {
        for &byte in data {
            match self.state {
                State::Normal => self.on_normal(screen, byte),
                State::Escape => self.on_escape(screen, byte),
                State::EscapeIntermediate => self.on_escape_intermediate(screen, byte),
                State::Csi => self.on_csi(screen, byte),
                State::Osc => self.on_osc(byte),
            }
        }
        self.flush_text(screen);
    }

    /// Take the bytes the decoder wants written back to the PTY.
    pub fn drain_replies(&mut self) -> Vec<u8> {
        mem::take(&mut self.replies)
    }

    // --- states ---------------------------------------------------------

    fn on_normal(&mut self, screen: &mut Screen, byte: u8) {
        match byte {
            0x07 => screen.bell(),
            0x08 => {
                self.flush_text(screen);
                screen.cursor_left(1);
            }
            // Simplified tab: three literal spaces.
            0x09 => self.input_text.extend_from_slice(b"   "),
            0x0A => {
                self.flush_text(screen);
                screen.set_cursor_x(0);
                screen.line_feed();
            }
            0x0D => {
                self.flush_text(screen);
                screen.set_cursor_x(0);
            }
            ESC => {
                self.input_seq.clear();
                self.input_seq.push(ESC);
                self.state = State::Escape;
            }
            c if c < 0x20 => {
                debug!(target: "decode", code = c, "unknown control code");
            }
            c => self.input_text.push(c),
        }
    }

    fn on_escape(&mut self, screen: &mut Screen, byte: u8) {
        match byte {
            // A fresh ESC restarts the sequence.
            ESC => {
                self.input_seq.clear();
                self.input_seq.push(ESC);
            }
            b' ' | b'#' | b'%' | b'(' | b')' | b'*' | b'+' | b'-' | b'.' | b'/' => {
                self.input_seq.push(byte);
                self.state = State::EscapeIntermediate;
            }
            b'7' => {
                // DECSC
                self.flush_text(screen);
                screen.save_cursor();
                self.finish_sequence();
            }
            b'8' => {
                // DECRC
                self.flush_text(screen);
                screen.restore_cursor();
                self.finish_sequence();
            }
            b'D' => {
                // IND
                self.flush_text(screen);
                screen.line_feed();
                self.finish_sequence();
            }
            b'E' => {
                // NEL
                self.flush_text(screen);
                screen.set_cursor_x(0);
                screen.line_feed();
                self.finish_sequence();
            }
            b'M' => {
                // RI
                self.flush_text(screen);
                screen.cursor_up(1);
                self.finish_sequence();
            }
            b'[' => {
                self.input_seq.push(byte);
                self.state = State::Csi;
            }
            b']' => {
                self.input_seq.push(byte);
                self.state = State::Osc;
            }
            c => {
                debug!(target: "decode", final_byte = c as char as u32, "unknown escape sequence");
                self.finish_sequence();
            }
        }
    }

    fn on_escape_intermediate(&mut self, screen: &mut Screen, byte: u8) {
        self.input_seq.push(byte);
        match (self.input_seq[1], byte) {
            // Select US-ASCII for G0: already the only charset.
            (b'(', b'B') => {}
            // DECALN, reduced to homing the cursor.
            (b'#', b'8') => {
                self.flush_text(screen);
                screen.set_cursor_pos(0, 0);
            }
            (intermediate, final_byte) => {
                debug!(
                    target: "decode",
                    intermediate = intermediate as char as u32,
                    final_byte = final_byte as char as u32,
                    "unknown two-byte escape"
                );
            }
        }
        self.finish_sequence();
    }

    fn on_csi(&mut self, screen: &mut Screen, byte: u8) {
        match byte {
            // Parameter bytes: digits, `;`, `:`, `<`, `=`, `>`, `?`.
            0x30..=0x3F => self.input_seq.push(byte),
            // Final byte.
            0x40..=0x7E => {
                self.input_seq.push(byte);
                self.flush_text(screen);
                let seq = mem::take(&mut self.input_seq);
                // Everything between "ESC [" and the final byte.
                let params = &seq[2..seq.len() - 1];
                self.dispatch_csi(screen, byte, params);
                self.state = State::Normal;
            }
            c => {
                debug!(
                    target: "decode.csi",
                    seq = %String::from_utf8_lossy(&self.input_seq),
                    byte = c,
                    "aborting malformed control sequence"
                );
                self.finish_sequence();
            }
        }
    }

    fn on_osc(&mut self, byte: u8) {
        match byte {
            0x08..=0x0D | 0x20..=0x7E => self.input_seq.push(byte),
            _ => {
                // Any byte outside the printable range terminates the OSC.
                // OSC semantics are not implemented; the payload is logged
                // and the terminator consumed.
                debug!(
                    target: "decode.osc",
                    payload = %String::from_utf8_lossy(&self.input_seq[2..]),
                    "ignoring OSC"
                );
                self.finish_sequence();
            }
        }
    }

    fn finish_sequence(&mut self) {
        self.input_seq.clear();
        self.state = State::Normal;
    }

    // --- dispatch -------------------------------------------------------

    fn dispatch_csi(&mut self, screen: &mut Screen, final_byte: u8, params: &[u8]) {
        let private_prefix = matches!(params.first(), Some(&(0x3C..=0x3F)));
        if private_prefix || (0x70..=0x7E).contains(&final_byte) {
            self.dispatch_private(screen, final_byte, params);
        } else {
            self.dispatch_public(screen, final_byte, params);
        }
    }

    fn dispatch_public(&mut self, screen: &mut Screen, final_byte: u8, params: &[u8]) {
        let mut view = params;
        match final_byte {
            b'A' => {
                let mut p = 1;
                parse_params1("CUU", &mut view, &mut p);
                screen.cursor_up(p.max(0) as usize);
            }
            b'B' => {
                let mut p = 1;
                parse_params1("CUD", &mut view, &mut p);
                screen.cursor_down(p.max(0) as usize);
            }
            b'C' => {
                let mut p = 1;
                parse_params1("CUF", &mut view, &mut p);
                screen.cursor_right(p.max(0) as usize);
            }
            b'D' => {
                let mut p = 1;
                parse_params1("CUB", &mut view, &mut p);
                screen.cursor_left(p.max(0) as usize);
            }
            b'G' => {
                let mut col = 1;
                parse_params1("CHA", &mut view, &mut col);
                screen.set_cursor_x((col.max(1) - 1) as usize);
            }
            b'H' | b'f' => {
                let (mut row, mut col) = (1, 1);
                parse_params2("CUP", &mut view, &mut row, &mut col);
                screen.set_cursor_pos((col.max(1) - 1) as usize, (row.max(1) - 1) as usize);
            }
            b'J' => {
                let mut p = 0;
                parse_params1("ED", &mut view, &mut p);
                match p {
                    0 => screen.erase_to_end_of_page(),
                    1 => screen.erase_to_cursor(),
                    2 => screen.erase_page(),
                    3 => screen.erase_buffer(),
                    other => debug!(target: "decode.csi", p = other, "unknown ED mode"),
                }
            }
            b'K' => {
                let mut p = 0;
                parse_params1("EL", &mut view, &mut p);
                match p {
                    0..=2 => screen.erase_in_line(p as usize),
                    other => debug!(target: "decode.csi", p = other, "unknown EL mode"),
                }
            }
            b'P' => {
                let mut p = 1;
                parse_params1("DCH", &mut view, &mut p);
                screen.delete_chars(p.max(0) as usize);
            }
            b'X' => {
                let mut p = 1;
                parse_params1("ECH", &mut view, &mut p);
                screen.erase_chars(p.max(0) as usize);
            }
            b'c' => {
                let mut p = 0;
                parse_params1("DA", &mut view, &mut p);
                if p == 0 {
                    self.replies.extend_from_slice(DA_REPLY);
                } else {
                    debug!(target: "decode.csi", p, "unknown DA request");
                }
            }
            b'd' => {
                let mut p = 1;
                parse_params1("VPA", &mut view, &mut p);
                screen.set_cursor_pos(0, (p.max(1) - 1) as usize);
            }
            b'e' => {
                let mut p = 1;
                parse_params1("VPR", &mut view, &mut p);
                screen.cursor_down(p.max(0) as usize);
            }
            b'h' => {
                let mut p = -1;
                parse_params1("SM", &mut view, &mut p);
                match p {
                    4 => screen.set_insert_mode(true),
                    other => debug!(target: "decode.csi", mode = other, "unknown SM mode"),
                }
            }
            b'l' => {
                let mut p = -1;
                parse_params1("RM", &mut view, &mut p);
                match p {
                    4 => screen.set_insert_mode(false),
                    other => debug!(target: "decode.csi", mode = other, "unknown RM mode"),
                }
            }
            b'm' => self.decode_sgr(screen, params),
            other => {
                debug!(
                    target: "decode.csi",
                    final_byte = other as char as u32,
                    params = %String::from_utf8_lossy(params),
                    "unknown control sequence"
                );
            }
        }
    }

    fn dispatch_private(&mut self, screen: &mut Screen, final_byte: u8, params: &[u8]) {
        match (params.first(), final_byte) {
            (Some(&b'?'), b'h') => Self::decode_dec_modes(screen, &params[1..], true),
            (Some(&b'?'), b'l') => Self::decode_dec_modes(screen, &params[1..], false),
            // DECSTBM: no scrolling region is maintained; home the cursor
            // and move on.
            (_, b'r') => {
                debug!(
                    target: "decode.csi",
                    params = %String::from_utf8_lossy(params),
                    "DECSTBM ignored"
                );
                screen.set_cursor_pos(0, 0);
            }
            _ => {
                debug!(
                    target: "decode.csi",
                    final_byte = final_byte as char as u32,
                    params = %String::from_utf8_lossy(params),
                    "unknown private sequence"
                );
            }
        }
    }

    fn decode_dec_modes(screen: &mut Screen, params: &[u8], set: bool) {
        let mut view = params;
        let mut more = true;
        while more {
            let mut mode = -1;
            more = next_param(&mut view, &mut mode);
            match mode {
                // DECCKM
                1 => screen.set_app_cursor_keys(set),
                // DECCOLM: column switching is not supported.
                3 => debug!(target: "decode.csi", set, "DECCOLM ignored"),
                // DECAWM
                7 => screen.set_autowrap(set),
                47 => {
                    if set != screen.modes().alternate_screen {
                        screen.swap_buffers();
                    }
                }
                1048 => {
                    if set {
                        screen.save_cursor();
                    } else {
                        screen.restore_cursor();
                    }
                }
                1049 => {
                    if set {
                        screen.save_cursor();
                        screen.activate_alternate();
                    } else {
                        screen.activate_primary();
                        screen.restore_cursor();
                    }
                }
                2004 => screen.set_bracketed_paste(set),
                other => {
                    debug!(target: "decode.csi", mode = other, set, "unknown DEC private mode");
                }
            }
        }
    }

    // --- SGR ------------------------------------------------------------

    fn decode_sgr(&mut self, screen: &mut Screen, params: &[u8]) {
        let mut view = params;
        let mut more = true;
        while more {
            let mut p = 0;
            more = next_param(&mut view, &mut p);
            match p {
                0 => screen.reset_attrs(),
                1 => {
                    screen.set_font_style(FontStyle::Bold);
                    screen.set_intensity(Intensity::Bright);
                }
                3 => screen.set_font_style(FontStyle::Italic),
                4 => screen.set_decoration(Decoration::Underline),
                24 => screen.set_decoration(Decoration::None),
                30..=37 => screen.set_fg(Color::Idx4((p - 30) as u8)),
                38 => {
                    let (color, rest) = extended_color(&mut view, more);
                    more = rest;
                    if let Some(color) = color {
                        screen.set_fg(color);
                    }
                }
                39 => screen.set_fg(Color::Default),
                40..=47 => screen.set_bg(Color::Idx4((p - 40) as u8)),
                48 => {
                    let (color, rest) = extended_color(&mut view, more);
                    more = rest;
                    if let Some(color) = color {
                        screen.set_bg(color);
                    }
                }
                49 => screen.set_bg(Color::Default),
                90..=97 => screen.set_fg(Color::Idx4((p - 90 + 8) as u8)),
                100..=107 => screen.set_bg(Color::Idx4((p - 100 + 8) as u8)),
                other => debug!(target: "decode.sgr", p = other, "unknown SGR parameter"),
            }
        }
    }

    // --- pending text ---------------------------------------------------

    /// Commit pending text to the screen, keeping back a trailing
    /// incomplete UTF-8 code point for the next call.
    fn flush_text(&mut self, screen: &mut Screen) {
        if self.input_text.is_empty() {
            return;
        }
        let keep = partial_tail_len(&self.input_text);
        if keep == self.input_text.len() {
            return;
        }
        let tail = self.input_text.split_off(self.input_text.len() - keep);
        let head = mem::replace(&mut self.input_text, tail);
        screen.add_text(&String::from_utf8_lossy(&head));
    }
}

/// Pull the xterm-style extension parameters of SGR 38/48: `5;index` for
/// the 256-color palette, `2;r;g;b` for truecolor. The colon-separated
/// ITU form is not accepted. Returns the color (if the parameters were
/// sound) and whether more SGR parameters follow.
fn extended_color(view: &mut &[u8], more: bool) -> (Option<Color>, bool) {
    if !more {
        debug!(target: "decode.sgr", "extended color without parameters");
        return (None, false);
    }
    let mut mode = -1;
    let mut more = next_param(view, &mut mode);
    match mode {
        5 => {
            if !more {
                debug!(target: "decode.sgr", "8-bit color without index");
                return (None, false);
            }
            let mut index = -1;
            more = next_param(view, &mut index);
            if (0..=255).contains(&index) {
                (Some(Color::Idx8(index as u8)), more)
            } else {
                debug!(target: "decode.sgr", index, "8-bit color index out of range");
                (None, more)
            }
        }
        2 => {
            let mut channels = [0i32; 3];
            for (i, channel) in channels.iter_mut().enumerate() {
                if !more {
                    debug!(target: "decode.sgr", missing = i, "truecolor with missing channels");
                    return (None, false);
                }
                *channel = -1;
                more = next_param(view, channel);
            }
            if channels.iter().all(|c| (0..=255).contains(c)) {
                (
                    Some(Color::Rgb(
                        channels[0] as u8,
                        channels[1] as u8,
                        channels[2] as u8,
                    )),
                    more,
                )
            } else {
                debug!(target: "decode.sgr", ?channels, "truecolor channel out of range");
                (None, more)
            }
        }
        other => {
            debug!(target: "decode.sgr", mode = other, "unknown extended color mode");
            (None, more)
        }
    }
}
