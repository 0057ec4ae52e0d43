//! Error taxonomy for decode and editing operations.

use thiserror::Error;

use super::MapSize;

/// Everything the map layer can fail with. Obsolete handling is never an
/// error channel; unresolvable references degrade through the reconciler
/// instead.
#[derive(Debug, Error)]
pub enum MapError {
    /// Malformed dictionary or grid content. Decoding is all-or-nothing,
    /// so a corrupt line aborts the whole load.
    #[error("corrupt map format (line {line}): {msg}")]
    CorruptFormat { line: usize, msg: String },

    /// Grid content exceeds the declared header dimensions. The header is
    /// authoritative; content short of it loads as empty tiles instead.
    #[error("map content exceeds declared size {declared}: {detail}")]
    DimensionMismatch { declared: MapSize, detail: String },

    /// A stamp capture was asked to snapshot zero tiles.
    #[error("selection is empty")]
    EmptySelection,

    #[error("not found: {0}")]
    NotFound(String),
}
