//! Error collector shared by the parser, resolver and interpreter.
//!
//! The reference implementation kept two process-wide flags (`had_error`,
//! `had_runtime_error`) that every phase mutated behind the driver's back.
//! Here the same behaviour lives in an explicit [`Diagnostics`] value the
//! driver owns: phases report into it, keep going past static errors so a run
//! can surface several at once, and the driver inspects the accumulated flags
//! afterwards to pick an exit code.

use log::debug;

use crate::error::LoxError;
use crate::token::{Token, TokenType};

/// Accumulates reported errors and remembers whether any occurred.
#[derive(Debug, Default)]
pub struct Diagnostics {
    had_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Has any static (lex/parse/resolve) error been reported?
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// Has any runtime error been reported?
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Clear the static-error flag.  The interactive loop calls this between
    /// lines so one bad input does not poison the rest of the session.
    pub fn reset(&mut self) {
        self.had_error = false;
    }

    /// Report a static error at a bare line number.
    pub fn error<S: Into<String>>(&mut self, line: usize, message: S) {
        self.report(line, "", &message.into());
    }

    /// Report a static error anchored to a token, mirroring the reference
    /// interpreter's " at end" / " at 'lexeme'" context strings.
    pub fn token_error<S: Into<String>>(&mut self, token: &Token, message: S) {
        let message: String = message.into();

        if token.token_type == TokenType::EOF {
            self.report(token.line, " at end", &message);
        } else {
            let context: String = format!(" at '{}'", token.lexeme);
            self.report(token.line, &context, &message);
        }
    }

    /// Record an already-constructed error, routing it to the right flag.
    /// `Runtime` errors flip the runtime flag; everything else is static.
    pub fn push(&mut self, error: &LoxError) {
        debug!("Recording diagnostic: {}", error);

        match error {
            LoxError::Runtime { .. } => self.runtime_error(error),
            _ => {
                eprintln!("{}", error);
                self.had_error = true;
            }
        }
    }

    /// Report a runtime error.  Fire-and-forget: the interpreter has already
    /// abandoned the statement sequence by the time this is called.
    pub fn runtime_error(&mut self, error: &LoxError) {
        debug!("Recording runtime error: {}", error);

        eprintln!("{}", error);
        self.had_runtime_error = true;
    }

    fn report(&mut self, line: usize, context: &str, message: &str) {
        debug!("Reporting [line {}]{}: {}", line, context, message);

        eprintln!("[line {}] Error{}: {}", line, context, message);
        self.had_error = true;
    }
}
