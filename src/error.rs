use std::io;
use thiserror::Error;

/// Errors surfaced by the recovery pipeline.
///
/// Heuristic fallbacks never produce errors; everything here is treated
/// as fatal by the binary, which reports and terminates rather than
/// continuing with a device it cannot read consistently.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("short read at offset {offset}: expected {expected} bytes")]
    ShortRead { offset: u64, expected: usize },

    #[error("FAT boot signature 55aa not found (set FAT_NO_SIG=1 to ignore)")]
    MissingBootSignature,
}

pub type Result<T> = std::result::Result<T, RecoveryError>;
