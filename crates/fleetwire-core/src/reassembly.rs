//! Fragmented transfer reassembly.
//!
//! Trackers upload photos and audio in chunks spread across many
//! frames, often behind an explicit request-next-part handshake. A
//! [`Transfer`] accumulates chunks in delivery order; out-of-order
//! delivery is not supported, an index that is not the next expected
//! one fails that frame and leaves the buffer intact.
//!
//! Completion is detected three ways, depending on what the protocol
//! signals: a declared total chunk count (tracked internally), an
//! explicit final-chunk flag, or a short-chunk sentinel (a chunk
//! smaller than the fixed part size). The decoder folds the latter two
//! into the `final_chunk` argument of [`Transfer::append`].

use crate::error::DecodeError;
use crate::media::MediaSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Photo,
    Audio,
}

impl TransferKind {
    pub fn extension(self) -> &'static str {
        match self {
            TransferKind::Photo => "jpg",
            TransferKind::Audio => "amr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Incomplete { next_index: u32 },
    Complete,
}

/// One in-progress transfer, held in a [`DeviceSession`] slot.
///
/// [`DeviceSession`]: crate::session::DeviceSession
#[derive(Debug)]
pub struct Transfer {
    kind: TransferKind,
    buffer: Vec<u8>,
    next_index: u32,
    total: Option<u32>,
}

impl Transfer {
    pub fn begin(kind: TransferKind, total: Option<u32>) -> Self {
        Transfer {
            kind,
            buffer: Vec::new(),
            next_index: 0,
            total,
        }
    }

    pub fn kind(&self) -> TransferKind {
        self.kind
    }

    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Byte offset the next chunk must start at, for protocols that
    /// request by offset rather than index.
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    /// Append the chunk at `index`. The index must be exactly the next
    /// expected one; on mismatch the buffer is left untouched so the
    /// device can retransmit.
    pub fn append(
        &mut self,
        index: u32,
        chunk: &[u8],
        final_chunk: bool,
    ) -> Result<Progress, DecodeError> {
        if index != self.next_index {
            return Err(DecodeError::UnexpectedChunk {
                expected: self.next_index,
                actual: index,
            });
        }
        self.buffer.extend_from_slice(chunk);
        self.next_index += 1;

        let total_reached = self.total.is_some_and(|total| self.next_index >= total);
        if final_chunk || total_reached {
            Ok(Progress::Complete)
        } else {
            Ok(Progress::Incomplete {
                next_index: self.next_index,
            })
        }
    }

    /// Hand the complete payload to the media sink and return the
    /// reference for the emitted Position. Consumes the transfer; the
    /// caller has already taken it out of its session slot.
    pub fn finish(self, sink: &dyn MediaSink, unique_id: &str) -> Result<String, DecodeError> {
        let reference = sink.write_file(unique_id, &self.buffer, self.kind.extension())?;
        Ok(reference)
    }
}
