//! Full-frame painter: draws the abstract cell grid onto the host
//! terminal with crossterm. No diffing; a frame is cheap at cell counts a
//! terminal window can hold.

use anyhow::Result;
use core_screen::{Color, Decoration, FontStyle, Intensity, Screen, Style};
use crossterm::{
    cursor::{MoveTo, Show},
    queue,
    style::{
        Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal::{Clear, ClearType},
};
use std::io::{Write, stdout};

pub struct Painter {
    last_style: Option<Style>,
}

impl Default for Painter {
    fn default() -> Self {
        Self::new()
    }
}

impl Painter {
    pub fn new() -> Self {
        Self { last_style: None }
    }

    /// Repaint the whole visible window and park the host cursor on the
    /// session cursor.
    pub fn paint(&mut self, screen: &Screen) -> Result<()> {
        let mut out = stdout();
        let (cols, rows) = screen.size_in_cells();
        self.last_style = None;
        queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;

        for row in 0..rows {
            queue!(out, MoveTo(0, row as u16), Clear(ClearType::CurrentLine))?;
            let Some(line) = screen.render_line(row) else {
                continue;
            };
            for cell in line.cells().iter().take(cols) {
                self.apply_style(&mut out, cell.style())?;
                queue!(out, Print(cell.text()))?;
            }
        }

        let cursor = screen.cursor_pos();
        queue!(
            out,
            ResetColor,
            SetAttribute(Attribute::Reset),
            MoveTo(cursor.x as u16, cursor.y as u16),
            Show
        )?;
        out.flush()?;
        Ok(())
    }

    fn apply_style(&mut self, out: &mut impl Write, style: Style) -> Result<()> {
        if self.last_style == Some(style) {
            return Ok(());
        }
        queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
        queue!(out, SetForegroundColor(convert_color(style.fg, style.intensity)))?;
        queue!(out, SetBackgroundColor(convert_color(style.bg, Intensity::Normal)))?;
        match style.font_style {
            FontStyle::Regular => {}
            FontStyle::Bold => queue!(out, SetAttribute(Attribute::Bold))?,
            FontStyle::Italic => queue!(out, SetAttribute(Attribute::Italic))?,
        }
        if style.decoration == Decoration::Underline {
            queue!(out, SetAttribute(Attribute::Underlined))?;
        }
        self.last_style = Some(style);
        Ok(())
    }
}

fn convert_color(color: Color, intensity: Intensity) -> crossterm::style::Color {
    use crossterm::style::Color as C;
    match color {
        Color::Default => C::Reset,
        Color::Idx4(n) => {
            // Bright intensity promotes the low palette half.
            let n = if intensity == Intensity::Bright && n < 8 {
                n + 8
            } else {
                n
            };
            C::AnsiValue(n)
        }
        Color::Idx8(n) => C::AnsiValue(n),
        Color::Rgb(r, g, b) => C::Rgb { r, g, b },
    }
}
