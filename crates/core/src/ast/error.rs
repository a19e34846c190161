use thiserror::Error;

/// Error raised by the lexer or parser.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("Unexpected character {found:?} on line {line}")]
    UnexpectedCharacter { found: String, line: u32 },

    #[error("Unterminated {what} starting on line {line}")]
    Unterminated { what: &'static str, line: u32 },

    #[error("Invalid numeric literal {literal:?} on line {line}")]
    InvalidNumber { literal: String, line: u32 },

    #[error("Syntax error, unexpected {found}, expecting {expected} on line {line}")]
    UnexpectedToken { expected: String, found: String, line: u32 },

    #[error("Unsupported expression {what} on line {line}")]
    UnsupportedExpression { what: String, line: u32 },
}

/// Convenience result type for the front end.
pub type SyntaxResult<T> = Result<T, SyntaxError>;
