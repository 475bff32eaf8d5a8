//! Fallback manifest data read from local storage.

use std::path::PathBuf;

use tracing::debug;

use crate::domain::{FulfilledPayload, FulfillmentError};

/// A fallback supplier that reads the manifest bytes from `path`
///
/// The file is read each time the supplier runs, so a caller that refreshes
/// the file between acquisitions sees the new contents.
pub fn fallback_from_file(
    path: impl Into<PathBuf>,
    content_type: impl Into<String>,
) -> impl Fn() -> Result<FulfilledPayload, FulfillmentError> + Send + Sync + 'static {
    let path = path.into();
    let content_type = content_type.into();

    move || {
        debug!(path = %path.display(), "Reading fallback manifest");
        std::fs::read(&path)
            .map(|bytes| FulfilledPayload::new(content_type.clone(), bytes))
            .map_err(|e| {
                FulfillmentError::new(format!(
                    "Failed to read fallback manifest {}: {}",
                    path.display(),
                    e
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reads_file_contents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("manifest.json");
        std::fs::write(&path, b"{}").unwrap();

        let supplier = fallback_from_file(&path, "application/audiobook+json");
        let payload = supplier().unwrap();

        assert_eq!(payload.content_type, "application/audiobook+json");
        assert_eq!(payload.bytes, b"{}");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let supplier = fallback_from_file(temp.path().join("absent.json"), "application/json");

        let error = supplier().unwrap_err();
        assert!(error.message.starts_with("Failed to read fallback manifest"));
        assert!(error.server_data.is_none());
    }
}
