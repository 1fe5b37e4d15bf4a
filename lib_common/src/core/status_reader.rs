//! # Status Reader
//!
//! Read-only projections of the status record for request handlers.

use std::sync::Arc;

use super::status_record::{SpaceApiDocument, StatusRecord};

/// Text served while the space is open.
pub const STATE_OPEN: &str = "open";
/// Text served while the space is closed.
pub const STATE_CLOSED: &str = "closed";

/// Cheap, cloneable read handle over the shared [`StatusRecord`].
#[derive(Debug, Clone)]
pub struct StatusReader {
    record: Arc<StatusRecord>,
}

impl StatusReader {
    /// Wraps a shared record.
    pub fn new(record: Arc<StatusRecord>) -> Self {
        Self { record }
    }

    /// Full SpaceAPI document as of now.
    pub fn document(&self) -> SpaceApiDocument {
        self.record.snapshot()
    }

    /// Current open/closed flag.
    pub fn is_open(&self) -> bool {
        self.record.is_open()
    }

    /// `"open"` or `"closed"`.
    pub fn state_token(&self) -> &'static str {
        if self.record.is_open() {
            STATE_OPEN
        } else {
            STATE_CLOSED
        }
    }

    /// Returns `open` when the space is open, `closed` otherwise.
    ///
    /// The flag is read exactly once, so the choice cannot be based on two
    /// different values.
    pub fn select_payload<T>(&self, open: T, closed: T) -> T {
        if self.record.is_open() {
            open
        } else {
            closed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_and_payload_follow_the_flag() {
        let record = Arc::new(StatusRecord::default());
        let reader = StatusReader::new(Arc::clone(&record));

        assert_eq!(reader.state_token(), "open");
        assert_eq!(reader.select_payload(b"A".to_vec(), b"B".to_vec()), b"A");

        record.set_open(false);
        assert_eq!(reader.state_token(), "closed");
        assert_eq!(reader.select_payload(b"A".to_vec(), b"B".to_vec()), b"B");
        assert!(!reader.document().state.open);
    }

    #[test]
    fn clones_share_the_same_record() {
        let record = Arc::new(StatusRecord::default());
        let reader = StatusReader::new(Arc::clone(&record));
        let other = reader.clone();

        record.set_last_change(99);
        assert_eq!(other.document().state.lastchange, 99);
        assert_eq!(reader.document(), other.document());
    }
}
