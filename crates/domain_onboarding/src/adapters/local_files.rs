//! Local filesystem document store

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{DomainPort, PortError};

use crate::documents::DocumentUpload;
use crate::ports::FileTransfer;

/// Writes documents to `<root>/<category>/<uuid>-<name>`
///
/// The returned URL is `<public_base_url>/<category>/<uuid>-<name>`; serving
/// that path is left to whatever fronts the upload directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn io_error(action: &str, path: &Path, err: std::io::Error) -> PortError {
        PortError::Internal {
            message: format!("failed to {} {}", action, path.display()),
            source: Some(Box::new(err)),
        }
    }
}

/// Keeps ASCII letters, digits, `.`, `-` and `_`; anything else becomes `_`
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(&['/', '\\'][..]).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}

impl DomainPort for LocalFileStore {}

#[async_trait]
impl FileTransfer for LocalFileStore {
    #[instrument(skip(self, upload), fields(category = %upload.category, size = upload.size()))]
    async fn store(&self, upload: &DocumentUpload) -> Result<String, PortError> {
        let directory = self.root.join(upload.category.slug());
        fs::create_dir_all(&directory)
            .await
            .map_err(|e| Self::io_error("create", &directory, e))?;

        let stored_name = format!("{}-{}", Uuid::now_v7(), sanitize_file_name(&upload.file_name));
        let path = directory.join(&stored_name);
        fs::write(&path, &upload.content)
            .await
            .map_err(|e| Self::io_error("write", &path, e))?;

        debug!(path = %path.display(), "Document written");
        Ok(format!(
            "{}/{}/{}",
            self.public_base_url,
            upload.category.slug(),
            stored_name
        ))
    }
}
