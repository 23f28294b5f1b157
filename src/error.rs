//! CLI error type

use thiserror::Error;

/// Errors raised by the command implementations
#[derive(Debug, Error)]
pub enum CliError {
    /// The target's signature is not in the chip registry
    #[error("Unsupported chip: signature 0x{signature:04X} is not in the registry (see 'avrisp list-chips')")]
    UnsupportedChip { signature: u16 },

    /// `--chip` names no built-in chip
    #[error("Unknown chip '{0}' (see 'avrisp list-chips')")]
    UnknownChipName(String),

    /// Reading an input or writing an output file failed
    #[error("{path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The ISP engine reported a failure
    #[error("ISP error: {0}")]
    Isp(#[from] avrisp_core::Error),

    /// HEX decoding or source generation failed
    #[error(transparent)]
    Codegen(#[from] avrisp_codegen::CodegenError),
}

impl CliError {
    /// Wrap an I/O error with the path it concerns
    pub fn file(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::File {
            path: path.display().to_string(),
            source,
        }
    }
}
