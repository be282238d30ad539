use thiserror::Error;

/// Failure while persisting media through an external sink.
#[derive(Debug, Error)]
#[error("media sink failure: {0}")]
pub struct MediaError(pub String);

/// Decode failures are local to one frame on one connection; session and
/// decoder state remain usable for the next frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame truncated: need {needed} more bytes, {remaining} remaining")]
    FrameTruncated { needed: usize, remaining: usize },

    #[error("unknown device {unique_id}")]
    UnknownDevice { unique_id: String },

    #[error("unknown tag 0x{tag:02x}")]
    UnknownTag { tag: u8 },

    #[error("checksum mismatch: frame carries {expected:#06x}, computed {computed:#06x}")]
    ChecksumMismatch { expected: u16, computed: u16 },

    #[error("unexpected transfer chunk {actual}, expected {expected}")]
    UnexpectedChunk { expected: u32, actual: u32 },

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl DecodeError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        DecodeError::Malformed(message.into())
    }
}
