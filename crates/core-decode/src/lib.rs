//! ANSI/VT stream decoding: a byte-at-a-time state machine that recognizes
//! C0 controls, 7-bit escape sequences, CSI/OSC framing, and SGR
//! attributes, and drives the character grid in `core-screen`.

mod decoder;
mod params;
mod utf8;

pub use decoder::Decoder;
pub use params::{next_param, parse_params1, parse_params2};
pub use utf8::partial_tail_len;
