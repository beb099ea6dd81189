use thiserror::Error;

/// Errors raised by the shaping and binding core.
///
/// Neither is transient: both follow from fixed configuration or a malformed
/// frame, so callers skip the offending frame or pair and carry on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    /// A sequence had the wrong length for the current configuration.
    #[error("invalid {what}: expected {expected}, got {actual}")]
    InvalidInput {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A band map entry points past the end of the equalizer's bands.
    #[error("control {control} maps to band {band}, but only {available} bands exist")]
    BandIndexOutOfRange {
        control: usize,
        band: usize,
        available: usize,
    },
}

pub type ShapeResult<T> = Result<T, ShapeError>;
