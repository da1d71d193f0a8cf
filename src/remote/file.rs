use super::records::{ProviderRecord, RecordsDocument};
use super::{async_trait, RegistrySource, RemoteError};
use std::path::{Path, PathBuf};

/// Provider records exported to a JSON file, either as a collection page or
/// as a bare array
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl RegistrySource for FileSource {
    async fn fetch_records(&self) -> Result<Vec<ProviderRecord>, RemoteError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let document: RecordsDocument = serde_json::from_str(&content).map_err(|e| {
            RemoteError::ParseError(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(document.into_records())
    }

    fn name(&self) -> &'static str {
        "Registry file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_reads_bare_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("providers.json");
        std::fs::write(
            &path,
            r#"[{"type": "epic", "name": "EPIC", "regexes": ["^21\\.T?\\d+/.+$"], "example": "21.T11148/abc"}]"#,
        )
        .unwrap();

        let records = FileSource::new(&path).fetch_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].example.as_deref(), Some("21.T11148/abc"));
    }

    #[tokio::test]
    async fn test_reports_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("providers.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = FileSource::new(&path).fetch_records().await.unwrap_err();
        assert!(matches!(err, RemoteError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = FileSource::new(dir.path().join("absent.json"))
            .fetch_records()
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Io(_)));
    }
}
