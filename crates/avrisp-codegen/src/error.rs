//! Error type for codegen operations

use std::io;

use thiserror::Error;

/// Error type for codegen operations
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Reading or writing a file failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A chip profile failed to parse
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// A chip profile is inconsistent
    #[error("Validation error: {0}")]
    Validation(String),

    /// No built-in chip or profile file matches the name
    #[error("Unknown chip '{0}'")]
    UnknownChip(String),

    /// Decoding, encoding or reading the target failed
    #[error("{0}")]
    Isp(#[from] avrisp_core::Error),

    /// Generated tokens did not form a valid Rust file
    #[error("Generated code does not parse: {0}")]
    Syntax(#[from] syn::Error),
}

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, CodegenError>;
