use lib_common::core::StatusReader;
use std::io;
use std::path::{Path, PathBuf};

/// Serves the open or closed icon from disk.
///
/// The file is read on every call, so swapping an icon on disk takes effect
/// without a restart.
#[derive(Debug, Clone)]
pub struct PictureManager {
    reader: StatusReader,
    open_image_path: PathBuf,
    closed_image_path: PathBuf,
}

impl PictureManager {
    pub fn new(reader: StatusReader, open_image_path: PathBuf, closed_image_path: PathBuf) -> Self {
        Self {
            reader,
            open_image_path,
            closed_image_path,
        }
    }

    /// Path of the icon matching the current state.
    pub fn current_path(&self) -> &Path {
        self.reader
            .select_payload(&self.open_image_path, &self.closed_image_path)
    }

    pub async fn get_image(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.current_path()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_common::core::StatusRecord;
    use std::sync::Arc;

    #[tokio::test]
    async fn loads_the_icon_matching_the_state() {
        let dir = tempfile::tempdir().unwrap();
        let open = dir.path().join("open.png");
        let closed = dir.path().join("closed.png");
        std::fs::write(&open, b"OPEN").unwrap();
        std::fs::write(&closed, b"CLOSED").unwrap();

        let record = Arc::new(StatusRecord::default());
        let pictures = PictureManager::new(StatusReader::new(Arc::clone(&record)), open, closed);

        assert_eq!(pictures.get_image().await.unwrap(), b"OPEN");
        record.set_open(false);
        assert_eq!(pictures.get_image().await.unwrap(), b"CLOSED");
    }

    #[tokio::test]
    async fn missing_icon_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let record = Arc::new(StatusRecord::default());
        let pictures = PictureManager::new(
            StatusReader::new(record),
            dir.path().join("missing-open.png"),
            dir.path().join("missing-closed.png"),
        );
        assert!(pictures.get_image().await.is_err());
    }
}
