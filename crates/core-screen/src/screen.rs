//! Screen state: the active buffer, the parked other buffer, cursor and
//! attributes, mode flags, and the scrollback window.

use crate::{Buffer, Line, Style};
use std::mem;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Cell coordinates relative to the visible region. Movements clamp; only
/// line feeds and autowrap drive the cursor past the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub x: usize,
    pub y: usize,
}

/// The five independent terminal modes. Plain bools on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeFlags {
    /// SM 4: new text shifts the tail right instead of overwriting.
    pub insert: bool,
    /// DECSET 1: cursor keys send SS3 instead of CSI.
    pub app_cursor_keys: bool,
    /// DECSET 7: writing past the last column wraps to the next line.
    pub autowrap: bool,
    /// DECSET 2004: paste should be framed (recognized, not yet applied).
    pub bracketed_paste: bool,
    /// True iff the active buffer is the alternate instance.
    pub alternate_screen: bool,
}

const PRIMARY: usize = 0;
const ALTERNATE: usize = 1;

/// The character grid and everything the decoder mutates on it.
pub struct Screen {
    cols: usize,
    rows: usize,
    /// Both screen buffers, owned here; `active` indexes the current one
    /// and the other stays parked until a DECSET 47/1049 switch.
    buffers: [Buffer; 2],
    active: usize,
    cursor: Cursor,
    saved_cursor: Cursor,
    style: Style,
    modes: ModeFlags,
    scrollback_offset: usize,
    /// Upper bound on scrollback lines; 0 means unlimited.
    scrollback_limit: usize,
    bell_pending: bool,
}

impl Screen {
    pub fn new(cols: usize, rows: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            buffers: [Buffer::new(), Buffer::blank(rows)],
            active: PRIMARY,
            cursor: Cursor::default(),
            saved_cursor: Cursor::default(),
            style: Style::default(),
            modes: ModeFlags {
                autowrap: true,
                ..ModeFlags::default()
            },
            scrollback_offset: 0,
            scrollback_limit: 0,
            bell_pending: false,
        }
    }

    /// Cap the number of scrollback lines kept above the visible region.
    pub fn with_scrollback_limit(mut self, limit: usize) -> Self {
        self.scrollback_limit = limit;
        self
    }

    // --- geometry -------------------------------------------------------

    pub fn size_in_cells(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.cols = cols.max(1);
        self.rows = rows.max(1);
        if self.modes.alternate_screen {
            self.buffers[ALTERNATE].reset(self.rows);
        }
        self.clamp_cursor();
        self.scrollback_offset = self.scrollback_offset.min(self.scrollback_len());
    }

    /// Index of the first visible line in the active buffer.
    fn base(&self) -> usize {
        if self.modes.alternate_screen {
            0
        } else {
            self.buffers[self.active].len().saturating_sub(self.rows)
        }
    }

    fn buffer(&self) -> &Buffer {
        &self.buffers[self.active]
    }

    fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffers[self.active]
    }

    // --- cursor ---------------------------------------------------------

    pub fn cursor_pos(&self) -> Cursor {
        self.cursor
    }

    pub fn set_cursor_pos(&mut self, x: usize, y: usize) {
        self.cursor.x = x.min(self.cols - 1);
        self.cursor.y = y.min(self.rows - 1);
    }

    pub fn set_cursor_x(&mut self, x: usize) {
        self.cursor.x = x.min(self.cols - 1);
    }

    pub fn cursor_up(&mut self, n: usize) {
        self.cursor.y = self.cursor.y.saturating_sub(n);
    }

    pub fn cursor_down(&mut self, n: usize) {
        self.cursor.y = (self.cursor.y + n).min(self.rows - 1);
    }

    pub fn cursor_left(&mut self, n: usize) {
        self.cursor.x = self.cursor.x.saturating_sub(n);
    }

    pub fn cursor_right(&mut self, n: usize) {
        self.cursor.x = (self.cursor.x + n).min(self.cols - 1);
    }

    /// Advance one row, scrolling when the cursor sits on the bottom edge.
    /// On the primary buffer scrolling grows the scrollback; on the
    /// alternate buffer the top line is dropped.
    pub fn line_feed(&mut self) {
        if self.cursor.y + 1 < self.rows {
            self.cursor.y += 1;
            return;
        }
        if self.modes.alternate_screen {
            self.buffers[ALTERNATE].drop_front(1);
            self.buffers[ALTERNATE].push_line();
        } else {
            let row = self.base() + self.cursor.y;
            self.buffers[PRIMARY].ensure_line(row);
            self.buffers[PRIMARY].push_line();
            self.trim_scrollback();
        }
    }

    pub fn save_cursor(&mut self) {
        self.saved_cursor = self.cursor;
    }

    pub fn restore_cursor(&mut self) {
        self.cursor = self.saved_cursor;
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        self.cursor.x = self.cursor.x.min(self.cols - 1);
        self.cursor.y = self.cursor.y.min(self.rows - 1);
    }

    // --- attributes and modes -------------------------------------------

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn set_fg(&mut self, color: crate::Color) {
        self.style.fg = color;
    }

    pub fn set_bg(&mut self, color: crate::Color) {
        self.style.bg = color;
    }

    pub fn set_font_style(&mut self, font_style: crate::FontStyle) {
        self.style.font_style = font_style;
    }

    pub fn set_decoration(&mut self, decoration: crate::Decoration) {
        self.style.decoration = decoration;
    }

    pub fn set_intensity(&mut self, intensity: crate::Intensity) {
        self.style.intensity = intensity;
    }

    pub fn reset_attrs(&mut self) {
        self.style = Style::default();
    }

    pub fn modes(&self) -> ModeFlags {
        self.modes
    }

    pub fn set_insert_mode(&mut self, on: bool) {
        self.modes.insert = on;
    }

    pub fn set_app_cursor_keys(&mut self, on: bool) {
        self.modes.app_cursor_keys = on;
    }

    pub fn set_autowrap(&mut self, on: bool) {
        self.modes.autowrap = on;
    }

    pub fn set_bracketed_paste(&mut self, on: bool) {
        self.modes.bracketed_paste = on;
    }

    // --- text -----------------------------------------------------------

    /// Commit decoded text at the cursor, honoring insert mode and
    /// autowrap. One cell per grapheme cluster; a leading combining mark
    /// joins the cell to the left.
    pub fn add_text(&mut self, text: &str) {
        for cluster in text.graphemes(true) {
            let joins_left = cluster.width() == 0 && self.cursor.x > 0;
            if !joins_left && self.cursor.x >= self.cols {
                if self.modes.autowrap {
                    self.cursor.x = 0;
                    self.line_feed();
                } else {
                    self.cursor.x = self.cols - 1;
                }
            }
            let row = self.base() + self.cursor.y;
            let at = self.cursor.x;
            let style = self.style;
            let insert = self.modes.insert;
            self.buffer_mut().ensure_line(row).add_text(at, cluster, style, insert);
            if !joins_left {
                self.cursor.x += 1;
            }
        }
    }

    /// Mutable access to the line under the cursor.
    pub fn current_line(&mut self) -> &mut Line {
        let row = self.base() + self.cursor.y;
        self.buffer_mut().ensure_line(row)
    }

    /// Line `index` of the visible region, ignoring the scrollback window.
    pub fn line(&self, index: usize) -> Option<&Line> {
        self.buffer().line(self.base() + index)
    }

    /// Delete cells at the cursor, shifting the rest of the line left.
    pub fn delete_chars(&mut self, count: usize) {
        let at = self.cursor.x;
        self.current_line().delete_text(at, count);
    }

    /// Blank cells at the cursor without shifting.
    pub fn erase_chars(&mut self, count: usize) {
        let at = self.cursor.x;
        let style = self.style;
        self.current_line().erase_text(at, count, style);
    }

    // --- erasing --------------------------------------------------------

    /// EL: 0 = cursor to end, 1 = start through cursor, 2 = whole line.
    pub fn erase_in_line(&mut self, mode: usize) {
        let x = self.cursor.x;
        let cols = self.cols;
        let style = self.style;
        let line = self.current_line();
        match mode {
            0 => line.erase_text(x, cols.saturating_sub(x), style),
            1 => line.erase_text(0, x + 1, style),
            _ => line.clear(),
        }
    }

    /// ED 0: erase from the cursor to the end of the visible region.
    pub fn erase_to_end_of_page(&mut self) {
        self.erase_in_line(0);
        let base = self.base();
        let from = self.cursor.y + 1;
        let rows = self.rows;
        self.buffer_mut().erase_lines(base + from, base + rows);
    }

    /// ED 1: erase from the top of the visible region through the cursor.
    pub fn erase_to_cursor(&mut self) {
        let base = self.base();
        let to = self.cursor.y;
        self.buffer_mut().erase_lines(base, base + to);
        self.erase_in_line(1);
    }

    /// ED 2: erase the whole visible region; scrollback stays.
    pub fn erase_page(&mut self) {
        let base = self.base();
        let rows = self.rows;
        self.buffer_mut().erase_lines(base, base + rows);
    }

    /// ED 3: drop the scrollback above the visible region.
    pub fn erase_buffer(&mut self) {
        if self.modes.alternate_screen {
            return;
        }
        let above = self.base();
        self.buffers[PRIMARY].drop_front(above);
        self.scrollback_offset = 0;
    }

    // --- buffer switching ----------------------------------------------

    /// DECSET/DECRST 47: install the parked buffer as current and park the
    /// one that was active, swapping cursor with saved cursor. The
    /// alternate side comes up cleared.
    pub fn swap_buffers(&mut self) {
        self.active ^= 1;
        self.modes.alternate_screen = self.active == ALTERNATE;
        if self.modes.alternate_screen {
            self.buffers[ALTERNATE].reset(self.rows);
        }
        mem::swap(&mut self.cursor, &mut self.saved_cursor);
        self.clamp_cursor();
        self.scrollback_offset = 0;
    }

    /// DECSET 1049 path: switch to a cleared alternate screen. The caller
    /// saves the cursor first.
    pub fn activate_alternate(&mut self) {
        if self.modes.alternate_screen {
            return;
        }
        self.active = ALTERNATE;
        self.modes.alternate_screen = true;
        self.buffers[ALTERNATE].reset(self.rows);
        self.scrollback_offset = 0;
    }

    /// DECRST 1049 path: back to the primary buffer, contents untouched.
    pub fn activate_primary(&mut self) {
        if !self.modes.alternate_screen {
            return;
        }
        self.active = PRIMARY;
        self.modes.alternate_screen = false;
    }

    // --- scrollback window ---------------------------------------------

    /// Lines available above the visible region.
    pub fn scrollback_len(&self) -> usize {
        if self.modes.alternate_screen { 0 } else { self.base() }
    }

    pub fn scrollback_offset(&self) -> usize {
        self.scrollback_offset
    }

    /// Move the view window `delta` lines back (positive) or forward
    /// (negative) through history. No effect on the alternate screen.
    pub fn scrollback(&mut self, delta: isize) {
        if self.modes.alternate_screen {
            return;
        }
        let offset = self.scrollback_offset as isize + delta;
        self.scrollback_offset = offset.clamp(0, self.scrollback_len() as isize) as usize;
    }

    pub fn cancel_scrollback(&mut self) {
        self.scrollback_offset = 0;
    }

    /// Line `index` of the window the renderer should paint, honoring the
    /// scrollback offset.
    pub fn render_line(&self, index: usize) -> Option<&Line> {
        let start = self.base().saturating_sub(self.scrollback_offset);
        self.buffer().line(start + index)
    }

    fn trim_scrollback(&mut self) {
        if self.scrollback_limit == 0 {
            return;
        }
        let above = self.base();
        if above > self.scrollback_limit {
            let excess = above - self.scrollback_limit;
            self.buffers[PRIMARY].drop_front(excess);
            self.scrollback_offset = self.scrollback_offset.min(self.scrollback_len());
        }
    }

    // --- bell -----------------------------------------------------------

    pub fn bell(&mut self) {
        self.bell_pending = true;
    }

    /// Consume the pending bell, if any.
    pub fn take_bell(&mut self) -> bool {
        mem::take(&mut self.bell_pending)
    }
}
