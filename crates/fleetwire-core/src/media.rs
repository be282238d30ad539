//! External media sink seam.
//!
//! Completed photo/audio transfers are handed to a sink which returns
//! an opaque reference; the reference travels on the emitted Position
//! and nothing else about storage leaks into the core.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::MediaError;

pub trait MediaSink {
    /// Persist one complete media payload, returning the reference to
    /// carry on the Position.
    fn write_file(
        &self,
        device_unique_id: &str,
        data: &[u8],
        extension: &str,
    ) -> Result<String, MediaError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub reference: String,
    pub data: Vec<u8>,
}

/// In-memory sink backing tests and the replay tool.
#[derive(Debug, Default)]
pub struct MemoryMediaSink {
    files: Mutex<Vec<StoredMedia>>,
}

impl MemoryMediaSink {
    pub fn new() -> Self {
        MemoryMediaSink::default()
    }

    fn files(&self) -> MutexGuard<'_, Vec<StoredMedia>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }

    pub fn stored(&self) -> Vec<StoredMedia> {
        self.files().clone()
    }
}

impl MediaSink for MemoryMediaSink {
    fn write_file(
        &self,
        device_unique_id: &str,
        data: &[u8],
        extension: &str,
    ) -> Result<String, MediaError> {
        let mut files = self.files();
        let reference = format!("{device_unique_id}/{}.{extension}", files.len());
        files.push(StoredMedia {
            reference: reference.clone(),
            data: data.to_vec(),
        });
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_are_unique_per_file() {
        let sink = MemoryMediaSink::new();
        let a = sink.write_file("123", b"one", "jpg").unwrap();
        let b = sink.write_file("123", b"two", "jpg").unwrap();
        assert_ne!(a, b);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.stored()[0].data, b"one");
    }
}
