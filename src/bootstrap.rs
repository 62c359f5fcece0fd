// bootstrap.rs - session facade shared by the REPL and the tests

use std::fmt;

use crate::interpreter::Interpreter;
use crate::state::ProgramState;

/// Prelude installed at startup; defines the derived comparison and stack
/// words in the language itself.
pub const PRELUDE: &str = include_str!("prelude.mp");

/// A line that failed, carrying enough context to point at the offending
/// token.
#[derive(Debug, Clone, PartialEq)]
pub struct LineError {
    pub message: String,
    /// Byte offset and text of the token under the cursor when the error
    /// was recorded; `None` when the interpreter stopped at end of line.
    pub token: Option<(usize, String)>,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.token {
            Some((offset, text)) => write!(f, "{} @ {} `{}`", self.message, offset, text),
            None => write!(f, "{} @ end of line", self.message),
        }
    }
}

impl std::error::Error for LineError {}

/// One interpreter session: program state plus the line-evaluation loop.
pub struct Machine {
    pub state: ProgramState,
}

impl Machine {
    pub fn new() -> Self {
        Machine {
            state: ProgramState::new(),
        }
    }

    /// Evaluate one line in Run mode. The caller drains `take_output` for
    /// anything the line printed.
    pub fn eval_line(&mut self, line: &str) -> Result<(), LineError> {
        self.state.clear_error();
        let mut interpreter = Interpreter::new(line, &mut self.state);
        interpreter.run();
        let token = interpreter
            .lexer
            .last_token()
            .map(|(offset, text)| (offset, text.to_string()));
        if let Some(message) = self.state.error.clone() {
            if !self.state.error_handled {
                self.state.error_handled = true;
                return Err(LineError { message, token });
            }
        }
        Ok(())
    }

    /// Install the prelude word set.
    pub fn install_prelude(&mut self) -> Result<(), LineError> {
        for line in PRELUDE.lines() {
            self.eval_line(line)?;
        }
        Ok(())
    }

    pub fn quit_requested(&self) -> bool {
        self.state.quit
    }

    pub fn take_output(&mut self) -> String {
        self.state.take_output()
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}
