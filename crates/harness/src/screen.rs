//! Terminal screen model.
//!
//! A fixed-size grid of styled cells plus cursor and scroll-region state.
//! Only the interpreter ([`crate::parser`]) mutates the grid; everything
//! else reads rendered text through [`Screen`].

use bitflags::bitflags;
use regex::Regex;
use unicode_width::UnicodeWidthChar;

use crate::parser::Parser;

bitflags! {
    /// Cell display attributes tracked for style-aware snapshots.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attrs: u8 {
        const BOLD = 1 << 0;
        const UNDERLINE = 1 << 1;
        const INVERSE = 1 << 2;
    }
}

/// Foreground/background color. Only palette indices are tracked; the
/// harness never composites, it only needs colors to be comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    Indexed(u8),
}

/// One grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attrs,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::Default,
            bg: Color::Default,
            attrs: Attrs::empty(),
        }
    }
}

/// Pen state applied to newly written cells (set by SGR sequences).
#[derive(Debug, Clone, Copy, Default)]
pub struct Pen {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attrs,
}

/// The screen grid. Dimensions are fixed for the session lifetime; the
/// cursor is always in bounds.
pub struct Grid {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    pub(crate) cells: Vec<Vec<Cell>>,
    pub(crate) cursor_row: usize,
    pub(crate) cursor_col: usize,
    pub(crate) scroll_top: usize,
    pub(crate) scroll_bottom: usize,
    pub(crate) pen: Pen,
}

impl Grid {
    pub fn new(cols: usize, rows: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            rows,
            cols,
            cells: vec![vec![Cell::default(); cols]; rows],
            cursor_row: 0,
            cursor_col: 0,
            scroll_top: 0,
            scroll_bottom: rows - 1,
            pen: Pen::default(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_row, self.cursor_col)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// Write a character at the cursor with the current pen, advancing and
    /// wrapping per terminal semantics. Zero-width characters are dropped
    /// (the harness compares text, not combining-mark composition).
    pub(crate) fn put_char(&mut self, ch: char) {
        let width = ch.width().unwrap_or(0);
        if width == 0 {
            return;
        }

        if self.cursor_col >= self.cols {
            self.cursor_col = 0;
            self.linefeed();
        }

        let (row, col) = (self.cursor_row, self.cursor_col);
        self.cells[row][col] = Cell {
            ch,
            fg: self.pen.fg,
            bg: self.pen.bg,
            attrs: self.pen.attrs,
        };
        // Wide glyph occupies two columns; blank the spilled-over cell.
        if width > 1 && col + 1 < self.cols {
            self.cells[row][col + 1] = Cell {
                ch: ' ',
                fg: self.pen.fg,
                bg: self.pen.bg,
                attrs: self.pen.attrs,
            };
        }
        self.cursor_col += width;
    }

    pub(crate) fn carriage_return(&mut self) {
        self.cursor_col = 0;
    }

    /// Advance one row, scrolling the region when the cursor sits at its
    /// bottom. Past the last grid row the cursor clamps.
    pub(crate) fn linefeed(&mut self) {
        if self.cursor_row == self.scroll_bottom {
            self.scroll_up(1);
        } else if self.cursor_row + 1 < self.rows {
            self.cursor_row += 1;
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.cursor_col = self.cursor_col.saturating_sub(1).min(self.cols - 1);
    }

    /// Fixed tab stops every 8 columns, clamped at the last column.
    pub(crate) fn tab(&mut self) {
        let next = (self.cursor_col / 8 + 1) * 8;
        self.cursor_col = next.min(self.cols - 1);
    }

    /// Shift the scroll region up `n` rows; rows leaving the top are
    /// discarded, blank rows enter at the bottom.
    pub(crate) fn scroll_up(&mut self, n: usize) {
        let n = n.min(self.scroll_bottom - self.scroll_top + 1);
        for _ in 0..n {
            self.cells.remove(self.scroll_top);
            self.cells
                .insert(self.scroll_bottom, vec![Cell::default(); self.cols]);
        }
    }

    pub(crate) fn cursor_up(&mut self, n: usize) {
        self.cursor_row = self.cursor_row.saturating_sub(n.max(1));
    }

    pub(crate) fn cursor_down(&mut self, n: usize) {
        self.cursor_row = (self.cursor_row + n.max(1)).min(self.rows - 1);
    }

    pub(crate) fn cursor_forward(&mut self, n: usize) {
        self.cursor_col = (self.cursor_col + n.max(1)).min(self.cols - 1);
    }

    pub(crate) fn cursor_back(&mut self, n: usize) {
        self.cursor_col = self.cursor_col.saturating_sub(n.max(1)).min(self.cols - 1);
    }

    /// CUP/HVP with 1-based parameters, clamped into the grid.
    pub(crate) fn cursor_to(&mut self, row: usize, col: usize) {
        self.cursor_row = row.saturating_sub(1).min(self.rows - 1);
        self.cursor_col = col.saturating_sub(1).min(self.cols - 1);
    }

    pub(crate) fn cursor_to_col(&mut self, col: usize) {
        self.cursor_col = col.saturating_sub(1).min(self.cols - 1);
    }

    pub(crate) fn cursor_to_row(&mut self, row: usize) {
        self.cursor_row = row.saturating_sub(1).min(self.rows - 1);
    }

    /// EL: 0 = cursor to end, 1 = start to cursor, 2 = whole line.
    pub(crate) fn erase_in_line(&mut self, mode: u16) {
        let row = self.cursor_row;
        let col = self.cursor_col.min(self.cols - 1);
        let range = match mode {
            0 => col..self.cols,
            1 => 0..col + 1,
            2 => 0..self.cols,
            _ => return,
        };
        for cell in &mut self.cells[row][range] {
            *cell = Cell::default();
        }
    }

    /// ED: 0 = cursor to end of screen, 1 = start to cursor, 2 = all.
    pub(crate) fn erase_in_display(&mut self, mode: u16) {
        match mode {
            0 => {
                self.erase_in_line(0);
                for row in &mut self.cells[self.cursor_row + 1..] {
                    row.fill(Cell::default());
                }
            }
            1 => {
                self.erase_in_line(1);
                for row in &mut self.cells[..self.cursor_row] {
                    row.fill(Cell::default());
                }
            }
            2 => {
                for row in &mut self.cells {
                    row.fill(Cell::default());
                }
            }
            _ => {}
        }
    }

    /// DECSTBM with 1-based parameters; resets the cursor to the origin.
    pub(crate) fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        let top = (top.max(1) as usize - 1).min(self.rows - 1);
        let bottom = if bottom == 0 {
            self.rows - 1
        } else {
            (bottom as usize - 1).min(self.rows - 1)
        };
        if top < bottom {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
            self.cursor_row = 0;
            self.cursor_col = 0;
        }
    }

    /// SGR parameter list applied to the pen. Unknown codes are skipped.
    pub(crate) fn set_graphic_rendition(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.pen = Pen::default();
            return;
        }
        let mut iter = params.iter().copied();
        while let Some(p) = iter.next() {
            match p {
                0 => self.pen = Pen::default(),
                1 => self.pen.attrs |= Attrs::BOLD,
                4 => self.pen.attrs |= Attrs::UNDERLINE,
                7 => self.pen.attrs |= Attrs::INVERSE,
                22 => self.pen.attrs -= Attrs::BOLD,
                24 => self.pen.attrs -= Attrs::UNDERLINE,
                27 => self.pen.attrs -= Attrs::INVERSE,
                30..=37 => self.pen.fg = Color::Indexed((p - 30) as u8),
                39 => self.pen.fg = Color::Default,
                40..=47 => self.pen.bg = Color::Indexed((p - 40) as u8),
                49 => self.pen.bg = Color::Default,
                90..=97 => self.pen.fg = Color::Indexed((p - 90 + 8) as u8),
                100..=107 => self.pen.bg = Color::Indexed((p - 100 + 8) as u8),
                // 38/48 extended color: consume the argument form we
                // understand, drop the rest on the floor.
                38 | 48 => match iter.next() {
                    Some(5) => {
                        if let Some(idx) = iter.next() {
                            let color = Color::Indexed(idx.min(255) as u8);
                            if p == 38 {
                                self.pen.fg = color;
                            } else {
                                self.pen.bg = color;
                            }
                        }
                    }
                    Some(2) => {
                        for _ in 0..3 {
                            iter.next();
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    /// One row as text, trailing blanks trimmed.
    pub fn row_text(&self, row: usize) -> String {
        let line: String = self.cells[row].iter().map(|c| c.ch).collect();
        line.trim_end().to_string()
    }
}

/// Live screen: the grid plus the streaming interpreter feeding it.
pub struct Screen {
    grid: Grid,
    parser: Parser,
}

impl Screen {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            grid: Grid::new(cols, rows),
            parser: Parser::new(),
        }
    }

    /// Feed raw child output through the interpreter. Partial escape
    /// sequences and split UTF-8 scalars are buffered across calls.
    pub fn feed(&mut self, data: &[u8]) {
        self.parser.feed(data, &mut self.grid);
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Visible rows as trimmed text, one entry per row.
    pub fn text(&self) -> Vec<String> {
        (0..self.grid.rows).map(|r| self.grid.row_text(r)).collect()
    }

    /// Full screen as a single string, rows joined with newlines.
    pub fn render(&self) -> String {
        self.text().join("\n")
    }

    /// Row-major plain-text search. Returns (row, col) of the first hit.
    pub fn find(&self, pattern: &str, case_sensitive: bool) -> Option<(usize, usize)> {
        if pattern.is_empty() {
            return None;
        }
        if case_sensitive {
            for row in 0..self.grid.rows {
                let line = self.grid.row_text(row);
                if let Some(byte_idx) = line.find(pattern) {
                    return Some((row, line[..byte_idx].chars().count()));
                }
            }
            return None;
        }

        let needle = pattern.to_lowercase();
        for row in 0..self.grid.rows {
            let line = self.grid.row_text(row);
            // Lowercasing can change lengths ('İ' folds to two scalars),
            // so record which original column produced each folded byte
            // and report the column from that mapping.
            let mut hay = String::with_capacity(line.len());
            let mut origin = Vec::with_capacity(line.len());
            for (col, ch) in line.chars().enumerate() {
                for folded in ch.to_lowercase() {
                    hay.push(folded);
                    origin.resize(hay.len(), col);
                }
            }
            if let Some(byte_idx) = hay.find(&needle) {
                let col = origin.get(byte_idx).copied().unwrap_or(0);
                return Some((row, col));
            }
        }
        None
    }

    /// Regex search over the rendered screen.
    pub fn matches(&self, pattern: &Regex) -> bool {
        pattern.is_match(&self.render())
    }
}

#[cfg(test)]
#[path = "screen_tests.rs"]
mod tests;
