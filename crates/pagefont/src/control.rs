//! Control-code scanning
//!
//! A `§` followed by one character is a formatting code: `0`-`9`/`a`-`f`
//! select a palette color, `r` resets to the caller's color, anything else is
//! consumed silently. Neither character of a code is measured or drawn.

use crate::color::{palette_color, Color};

/// Escape marker that starts a control code
pub const ESCAPE: char = '§';

/// One scanned unit of a string
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    /// A character to measure and (unless whitespace) draw
    Char(char),
    /// End of the current line
    Newline,
    /// Switch to a palette color
    Color(Color),
    /// Restore the color the draw call was invoked with
    Reset,
    /// Unrecognized code, consumed without effect
    Unknown(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    AfterEscape,
}

/// Iterator over the [`Token`]s of a string
#[derive(Debug, Clone)]
pub struct ControlCodes<'a> {
    chars: std::str::Chars<'a>,
    state: ScanState,
}

impl<'a> ControlCodes<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars(),
            state: ScanState::Normal,
        }
    }
}

impl Iterator for ControlCodes<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let c = self.chars.next()?;
            match self.state {
                ScanState::AfterEscape => {
                    self.state = ScanState::Normal;
                    let token = match palette_color(c) {
                        Some(color) => Token::Color(color),
                        None if c.eq_ignore_ascii_case(&'r') => Token::Reset,
                        None => Token::Unknown(c),
                    };
                    return Some(token);
                }
                ScanState::Normal if c == ESCAPE => self.state = ScanState::AfterEscape,
                ScanState::Normal if c == '\n' => return Some(Token::Newline),
                ScanState::Normal => return Some(Token::Char(c)),
            }
        }
    }
}

/// Remove every control code, keeping characters and newlines
pub fn strip_control_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for token in ControlCodes::new(text) {
        match token {
            Token::Char(c) => out.push(c),
            Token::Newline => out.push('\n'),
            Token::Color(_) | Token::Reset | Token::Unknown(_) => {}
        }
    }
    out
}
