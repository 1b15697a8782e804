//! Filesystem adapter for the content-store read interface.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::application::ports::{ContentError, ContentStore};

/// Serves content keys as paths relative to a root directory; a key like
/// `posts/rust-basics.md` maps to `<root>/posts/rust-basics.md`.
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ContentError> {
        let dir = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.root.join(prefix)
        };
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|error| ContentError::Read(format!("{}: {error}", dir.display())))?;

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|error| ContentError::Read(error.to_string()))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|kind| kind.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if prefix.is_empty() {
                keys.push(name);
            } else {
                keys.push(format!("{prefix}/{name}"));
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn read(&self, key: &str) -> Result<String, ContentError> {
        let path = self.root.join(key);
        tokio::fs::read_to_string(&path).await.map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                ContentError::NotFound(key.to_string())
            } else {
                ContentError::Read(format!("{}: {error}", path.display()))
            }
        })
    }
}
