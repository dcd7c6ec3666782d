//! Parse and validation errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("invalid length for {what}: expected {expected}, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unknown group category: {0}")]
    UnknownCategory(u8),

    #[error("invalid permission string: {0:?}")]
    InvalidPermission(String),

    #[error("invalid server URL: {0:?}")]
    InvalidServerUrl(String),
}
