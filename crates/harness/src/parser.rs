//! Streaming VT escape-sequence interpreter.
//!
//! A byte-at-a-time state machine feeding a [`Grid`]. The policy throughout
//! is best-effort render, never fail the stream: unknown or malformed
//! sequences are consumed and dropped without touching grid state.

use crate::screen::Grid;

const ESC: u8 = 0x1b;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Ground,
    Escape,
    CsiParam,
    OscString,
    /// ESC seen inside an OSC payload, waiting for the `\` of ST.
    OscEscape,
}

/// Interpreter state carried across `feed` calls, including any partially
/// received escape sequence or UTF-8 scalar.
pub struct Parser {
    state: State,
    params: Vec<u16>,
    current_param: Option<u16>,
    private: bool,
    utf8: Vec<u8>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            params: Vec::with_capacity(8),
            current_param: None,
            private: false,
            utf8: Vec::with_capacity(4),
        }
    }

    /// Interpret a chunk of raw output against the grid.
    pub fn feed(&mut self, data: &[u8], grid: &mut Grid) {
        for &byte in data {
            self.advance(byte, grid);
        }
    }

    fn advance(&mut self, byte: u8, grid: &mut Grid) {
        // C0 controls act immediately in every state except OSC payload
        // collection, where they would be part of the terminator handling.
        if byte < 0x20 && self.state != State::OscString && self.state != State::OscEscape {
            match byte {
                ESC => self.enter_escape(),
                0x08 => grid.backspace(),
                0x09 => grid.tab(),
                0x0a | 0x0b | 0x0c => grid.linefeed(),
                0x0d => grid.carriage_return(),
                _ => {}
            }
            return;
        }

        match self.state {
            State::Ground => self.ground(byte, grid),
            State::Escape => self.escape(byte, grid),
            State::CsiParam => self.csi_param(byte, grid),
            State::OscString => self.osc(byte),
            State::OscEscape => self.osc_escape(byte),
        }
    }

    fn enter_escape(&mut self) {
        self.state = State::Escape;
        self.params.clear();
        self.current_param = None;
        self.private = false;
        self.utf8.clear();
    }

    fn ground(&mut self, byte: u8, grid: &mut Grid) {
        if byte < 0x80 {
            self.utf8.clear();
            if byte >= 0x20 && byte != 0x7f {
                grid.put_char(byte as char);
            }
            return;
        }

        // Reassemble multi-byte scalars split across chunks. A stray
        // continuation byte or over-long prefix is silently dropped.
        if (0xc0..=0xff).contains(&byte) {
            self.utf8.clear();
        }
        self.utf8.push(byte);
        let needed = match self.utf8.first() {
            Some(b) if (0xc0..0xe0).contains(b) => 2,
            Some(b) if (0xe0..0xf0).contains(b) => 3,
            Some(b) if (0xf0..0xf8).contains(b) => 4,
            _ => {
                self.utf8.clear();
                return;
            }
        };
        if self.utf8.len() == needed {
            if let Ok(s) = std::str::from_utf8(&self.utf8) {
                if let Some(ch) = s.chars().next() {
                    grid.put_char(ch);
                }
            }
            self.utf8.clear();
        }
    }

    fn escape(&mut self, byte: u8, grid: &mut Grid) {
        match byte {
            b'[' => self.state = State::CsiParam,
            b']' => self.state = State::OscString,
            b'D' => {
                grid.linefeed();
                self.state = State::Ground;
            }
            b'E' => {
                grid.carriage_return();
                grid.linefeed();
                self.state = State::Ground;
            }
            b'M' => {
                grid.cursor_up(1);
                self.state = State::Ground;
            }
            // Anything else (charset selection, keypad modes, DECSC/DECRC
            // and friends) is consumed without effect.
            _ => self.state = State::Ground,
        }
    }

    fn csi_param(&mut self, byte: u8, grid: &mut Grid) {
        match byte {
            b'0'..=b'9' => {
                let digit = u16::from(byte - b'0');
                self.current_param = Some(
                    self.current_param
                        .unwrap_or(0)
                        .saturating_mul(10)
                        .saturating_add(digit),
                );
            }
            b';' | b':' => {
                self.params.push(self.current_param.take().unwrap_or(0));
            }
            b'?' | b'>' | b'=' | b'!' => self.private = true,
            0x20..=0x2f => {} // intermediates, tolerated
            0x40..=0x7e => {
                if let Some(p) = self.current_param.take() {
                    self.params.push(p);
                }
                self.dispatch_csi(byte, grid);
                self.state = State::Ground;
            }
            _ => self.state = State::Ground,
        }
    }

    fn dispatch_csi(&mut self, final_byte: u8, grid: &mut Grid) {
        // Private-mode sequences (DECSET/DECRST etc.) are out of scope for
        // a test harness; consume them whole.
        if self.private {
            return;
        }
        let p = |i: usize| self.params.get(i).copied();
        let n = p(0).unwrap_or(1).max(1) as usize;
        match final_byte {
            b'A' => grid.cursor_up(n),
            b'B' => grid.cursor_down(n),
            b'C' => grid.cursor_forward(n),
            b'D' => grid.cursor_back(n),
            b'E' => {
                grid.cursor_down(n);
                grid.carriage_return();
            }
            b'F' => {
                grid.cursor_up(n);
                grid.carriage_return();
            }
            b'G' => grid.cursor_to_col(p(0).unwrap_or(1) as usize),
            b'd' => grid.cursor_to_row(p(0).unwrap_or(1) as usize),
            b'H' | b'f' => {
                grid.cursor_to(p(0).unwrap_or(1) as usize, p(1).unwrap_or(1) as usize)
            }
            b'J' => grid.erase_in_display(p(0).unwrap_or(0)),
            b'K' => grid.erase_in_line(p(0).unwrap_or(0)),
            b'S' => grid.scroll_up(n),
            b'm' => grid.set_graphic_rendition(&self.params),
            b'r' => grid.set_scroll_region(p(0).unwrap_or(1), p(1).unwrap_or(0)),
            // Unknown final byte: sequence already consumed, nothing to do.
            _ => {}
        }
    }

    fn osc(&mut self, byte: u8) {
        match byte {
            0x07 => self.state = State::Ground, // BEL terminator
            ESC => self.state = State::OscEscape,
            // Payload (window titles and such) is irrelevant to assertions.
            _ => {}
        }
    }

    fn osc_escape(&mut self, byte: u8) {
        if byte == b'\\' {
            self.state = State::Ground;
        } else if byte == b'[' {
            // Unterminated OSC followed by a CSI: recover rather than eat
            // the rest of the stream.
            self.state = State::CsiParam;
            self.params.clear();
            self.current_param = None;
            self.private = false;
        } else {
            self.state = State::OscString;
        }
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
