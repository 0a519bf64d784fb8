//! The abstract character grid a renderer draws from: cells, lines,
//! primary/alternate buffers with scrollback, cursor, and graphic
//! attributes. No glyphs are produced here.

mod buffer;
mod line;
mod screen;
mod style;

pub use buffer::Buffer;
pub use line::{Cell, Line};
pub use screen::{Cursor, ModeFlags, Screen};
pub use style::{Color, Decoration, FontStyle, Intensity, Style};
