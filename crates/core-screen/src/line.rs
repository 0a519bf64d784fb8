//! A single row of cells.

use crate::Style;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// One grid position: a grapheme cluster (base code point plus any
/// combining marks) and the attributes it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    text: String,
    style: Style,
}

impl Cell {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn blank(style: Style) -> Self {
        Self::new(" ", style)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> Style {
        self.style
    }

    /// Display width of the cluster (0 for a bare combining mark).
    pub fn width(&self) -> usize {
        self.text.width()
    }

    fn push_mark(&mut self, mark: &str) {
        self.text.push_str(mark);
    }
}

/// A variable-width sequence of cells, at most as wide as the screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    cells: Vec<Cell>,
}

impl Line {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, column: usize) -> Option<&Cell> {
        self.cells.get(column)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Write `text` starting at `column`, one cell per grapheme cluster.
    /// Writing past the current end pads the gap with blanks. With
    /// `insert` the existing tail shifts right instead of being replaced.
    /// A leading combining mark joins the cell before `column`.
    pub fn add_text(&mut self, column: usize, text: &str, style: Style, insert: bool) {
        let mut at = column;
        for cluster in text.graphemes(true) {
            if cluster.width() == 0 && at > 0 {
                if let Some(prev) = self.cells.get_mut(at - 1) {
                    prev.push_mark(cluster);
                    continue;
                }
            }
            self.pad_to(at, style);
            let cell = Cell::new(cluster, style);
            if insert || at == self.cells.len() {
                self.cells.insert(at, cell);
            } else {
                self.cells[at] = cell;
            }
            at += 1;
        }
    }

    /// Remove up to `count` cells at `column`, shifting the tail left.
    pub fn delete_text(&mut self, column: usize, count: usize) {
        if column >= self.cells.len() {
            return;
        }
        let end = (column + count).min(self.cells.len());
        self.cells.drain(column..end);
    }

    /// Overwrite up to `count` cells at `column` with blanks; no shift.
    pub fn erase_text(&mut self, column: usize, count: usize, style: Style) {
        if column >= self.cells.len() {
            return;
        }
        let end = (column + count).min(self.cells.len());
        for cell in &mut self.cells[column..end] {
            *cell = Cell::blank(style);
        }
    }

    /// Drop every cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// UTF-8 dump of the row.
    pub fn content(&self) -> String {
        self.cells.iter().map(Cell::text).collect()
    }

    fn pad_to(&mut self, column: usize, style: Style) {
        while self.cells.len() < column {
            self.cells.push(Cell::blank(style));
        }
    }
}
