use crate::line_buffer::LineBuffer;

pub const DEFAULT_ESCAPE_COMMAND: &str = ";clock";

/// The typed token that leaves Type Mode.
///
/// Matched case-sensitively against the tail of the buffer's logical
/// character stream, so a token split by a line wrap still counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeCommand {
    token: String,
    len: usize,
}

impl EscapeCommand {
    /// `None` for an empty token or one containing control characters.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() || token.chars().any(char::is_control) {
            return None;
        }
        let len = token.chars().count();
        Some(Self { token, len })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn matches(&self, buffer: &LineBuffer) -> bool {
        buffer.logical_tail(self.len) == self.token
    }

    /// If the buffer ends with the token, remove exactly the token's
    /// characters and return `true`.
    pub fn strip_from(&self, buffer: &mut LineBuffer) -> bool {
        if !self.matches(buffer) {
            return false;
        }
        for _ in 0..self.len {
            buffer.pop_char();
        }
        true
    }
}

impl Default for EscapeCommand {
    fn default() -> Self {
        Self {
            token: DEFAULT_ESCAPE_COMMAND.to_string(),
            len: DEFAULT_ESCAPE_COMMAND.chars().count(),
        }
    }
}
