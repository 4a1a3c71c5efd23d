//! The calculator that hides the application.
//!
//! The display behaves like a plain calculator entry line. Only typing the
//! unlock code, exactly and from a cleared display, opens the application.

use std::fmt;

use thiserror::Error;

/// Longest display the gate keeps; older digits scroll off the left.
pub const MAX_DISPLAY_LEN: usize = 10;

const DEFAULT_DISPLAY: &str = "0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateConfigError {
    #[error("unlock code must not be empty")]
    Empty,

    #[error("unlock code must be at most 10 digits, got {0}")]
    TooLong(usize),

    #[error("unlock code must contain only the digits 0-9")]
    NonDigit,

    #[error("unlock code must not start with 0")]
    LeadingZero,
}

/// A validated unlock code.
///
/// The display replaces its initial `0` on the first keystroke, so a code
/// starting with `0` could never be typed.
#[derive(Clone, PartialEq, Eq)]
pub struct UnlockCode(String);

impl UnlockCode {
    pub fn new(code: &str) -> Result<Self, GateConfigError> {
        if code.is_empty() {
            return Err(GateConfigError::Empty);
        }
        if !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GateConfigError::NonDigit);
        }
        if code.len() > MAX_DISPLAY_LEN {
            return Err(GateConfigError::TooLong(code.len()));
        }
        if code.starts_with('0') {
            return Err(GateConfigError::LeadingZero);
        }
        Ok(Self(code.to_string()))
    }
}

impl fmt::Debug for UnlockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UnlockCode(<redacted>)")
    }
}

/// Calculator keys the gate reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(u8),
    Equals,
    Clear,
}

impl Key {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' => Some(Self::Digit(c as u8 - b'0')),
            '=' => Some(Self::Equals),
            'c' | 'C' => Some(Self::Clear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Locked,
    Unlocked,
}

pub struct DisguiseGate {
    code: UnlockCode,
    display: String,
}

impl DisguiseGate {
    pub fn new(code: UnlockCode) -> Self {
        Self {
            code,
            display: DEFAULT_DISPLAY.to_string(),
        }
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn reset(&mut self) {
        self.display.clear();
        self.display.push_str(DEFAULT_DISPLAY);
    }

    pub fn press(&mut self, key: Key) -> GateOutcome {
        let digit = match key {
            Key::Digit(d) if d <= 9 => char::from(b'0' + d),
            Key::Digit(_) | Key::Equals => return GateOutcome::Locked,
            Key::Clear => {
                self.reset();
                return GateOutcome::Locked;
            }
        };

        if self.display == DEFAULT_DISPLAY {
            self.display.clear();
        }
        self.display.push(digit);

        if self.display == self.code.0 {
            self.reset();
            return GateOutcome::Unlocked;
        }

        let len = self.display.len();
        if len > MAX_DISPLAY_LEN {
            self.display.drain(..len - MAX_DISPLAY_LEN);
        }
        GateOutcome::Locked
    }
}

impl fmt::Debug for DisguiseGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisguiseGate")
            .field("display", &self.display)
            .finish_non_exhaustive()
    }
}
