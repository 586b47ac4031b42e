use thiserror::Error;

/// Failure to read an [`ObjectId`](crate::ObjectId) from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("{input:?} is not hexadecimal: {reason}")]
    InvalidHex { input: String, reason: String },

    #[error("object ids are {expected} bytes, {input:?} decodes to {actual}")]
    InvalidLength {
        input: String,
        expected: usize,
        actual: usize,
    },
}
