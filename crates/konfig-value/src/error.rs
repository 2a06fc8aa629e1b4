//! Parse error types.

use thiserror::Error;

/// Errors that can occur while parsing configuration text.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The text violates the configuration grammar.
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        /// 1-based line of the offending character.
        line: usize,
        /// 1-based column of the offending character.
        column: usize,
        /// Description of what was expected.
        message: String,
    },

    /// Strict-JSON input could not be parsed.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl ParseError {
    /// Create a new syntax error at the given position.
    pub fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            column,
            message: message.into(),
        }
    }
}
