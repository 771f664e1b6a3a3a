//! Line-oriented text commands over the attribute interface.

use heapless::String;

use crate::attributes::Attribute;

pub const LINE_LEN: usize = 32;

/// One command per line:
/// `enable=1`, `position=3`, `poll_interval`, `suspend`, `resume`, `dump`.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Show(Attribute),
    Store(Attribute, &'a str),
    Suspend,
    Resume,
    Dump,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnknownAttribute,
    UnknownCommand,
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Result<Self, ParseError> {
        let line = line.trim();
        match line {
            "" => return Err(ParseError::Empty),
            "suspend" => return Ok(Command::Suspend),
            "resume" => return Ok(Command::Resume),
            "dump" => return Ok(Command::Dump),
            _ => {}
        }

        match line.split_once('=') {
            Some((name, value)) => Attribute::from_name(name.trim())
                .map(|attr| Command::Store(attr, value.trim()))
                .ok_or(ParseError::UnknownAttribute),
            None => Attribute::from_name(line)
                .map(Command::Show)
                .ok_or(ParseError::UnknownCommand),
        }
    }
}

/// Collects bytes until a line ending. Commands are plain ASCII, so a line
/// that overflows or carries any other byte is discarded whole.
pub struct LineBuffer {
    line: String<LINE_LEN>,
    discard: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            line: String::new(),
            discard: false,
        }
    }

    /// Returns true once a complete line is buffered.
    pub fn push(&mut self, byte: u8) -> bool {
        if byte == b'\n' || byte == b'\r' {
            if self.discard {
                self.clear();
                return false;
            }
            return !self.line.is_empty();
        }
        if !byte.is_ascii() || self.line.push(char::from(byte)).is_err() {
            self.discard = true;
        }
        false
    }

    pub fn as_str(&self) -> &str {
        self.line.as_str()
    }

    pub fn clear(&mut self) {
        self.line.clear();
        self.discard = false;
    }
}
