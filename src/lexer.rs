// lexer.rs - single-line token cursor

/// One whitespace-delimited token, with its byte offset in the source line.
///
/// `handled` marks the token as consumed. Resolution peeks at the current
/// token and only marks it handled once it claims it, so several lookups can
/// inspect the same token without pushback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub offset: usize,
    pub handled: bool,
}

/// Cursor over one input line. Only the space byte (0x20) separates tokens;
/// lines are treated as UTF-8-oblivious byte strings.
pub struct Lexer<'a> {
    line: &'a str,
    pos: usize,
    current: Option<Token<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(line: &'a str) -> Self {
        Lexer {
            line,
            pos: 0,
            current: None,
        }
    }

    pub fn line(&self) -> &'a str {
        self.line
    }

    /// Scan the next token, replacing the current one. Returns `None` at end
    /// of line.
    pub fn advance_token(&mut self) -> Option<Token<'a>> {
        let bytes = self.line.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos] == b' ' {
            self.pos += 1;
        }
        if self.pos == bytes.len() {
            self.current = None;
            return None;
        }
        let start = self.pos;
        while self.pos < bytes.len() && bytes[self.pos] != b' ' {
            self.pos += 1;
        }
        let token = Token {
            text: &self.line[start..self.pos],
            offset: start,
            handled: false,
        };
        self.current = Some(token);
        Some(token)
    }

    /// The current unconsumed token, scanning a fresh one when the previous
    /// token was already claimed.
    pub fn current(&mut self) -> Option<Token<'a>> {
        match self.current {
            Some(token) if !token.handled => Some(token),
            _ => self.advance_token(),
        }
    }

    pub fn mark_handled(&mut self) {
        if let Some(token) = &mut self.current {
            token.handled = true;
        }
    }

    /// Location of the most recent token, for error rendering. `None` when
    /// the cursor stopped at end of line.
    pub fn last_token(&self) -> Option<(usize, &'a str)> {
        self.current.map(|t| (t.offset, t.text))
    }
}
