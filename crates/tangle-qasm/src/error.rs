//! Error types for the QASM 2.0 frontend.

use thiserror::Error;

/// Errors that can occur during parsing or emission.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QasmError {
    /// Lexer error (invalid token).
    #[error("lexer error at byte {position}: {message}")]
    LexerError { position: usize, message: String },

    /// Unexpected token.
    #[error("unexpected token at byte {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    /// Unexpected end of input.
    #[error("unexpected end of input: expected {0}")]
    UnexpectedEof(String),

    /// Invalid version header.
    #[error("invalid OPENQASM version: {0}, expected 2.0")]
    InvalidVersion(String),

    /// Duplicate register or gate declaration.
    #[error("duplicate declaration: {0}")]
    DuplicateDeclaration(String),

    /// Unknown math function in an expression.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// IR error surfaced during emission.
    #[error("circuit error: {0}")]
    Circuit(#[from] tangle_ir::IrError),
}

/// Result type for QASM operations.
pub type QasmResult<T> = Result<T, QasmError>;
