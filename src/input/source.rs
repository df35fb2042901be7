//! Document sources feeding the batch orchestrator

use crate::error::Result;
use crate::input::file_detector::FileType;
use crate::input::manager::InputManager;
use async_trait::async_trait;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Handle to one resume awaiting evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDocument {
    pub identifier: String,
    pub path: PathBuf,
}

impl CandidateDocument {
    pub fn new(identifier: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            identifier: identifier.into(),
            path: path.into(),
        }
    }

    /// Use the file name as identifier.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let identifier = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { identifier, path }
    }
}

/// Supplies page-ordered text for candidate documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn read_pages(&self, document: &CandidateDocument) -> Result<Vec<String>>;

    /// Called once a document is no longer needed, processed or not.
    async fn release(&self, _document: &CandidateDocument) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    #[default]
    Keep,
    RemoveAfterScoring,
}

/// Reads candidate documents from disk through the [`InputManager`].
#[derive(Debug, Clone, Default)]
pub struct FileDocumentSource {
    manager: InputManager,
    cleanup: CleanupPolicy,
}

impl FileDocumentSource {
    pub fn new(cleanup: CleanupPolicy) -> Self {
        Self {
            manager: InputManager::new(),
            cleanup,
        }
    }
}

#[async_trait]
impl DocumentSource for FileDocumentSource {
    async fn read_pages(&self, document: &CandidateDocument) -> Result<Vec<String>> {
        let text = self.manager.extract_text(&document.path).await?;
        Ok(vec![text])
    }

    async fn release(&self, document: &CandidateDocument) {
        if self.cleanup != CleanupPolicy::RemoveAfterScoring {
            return;
        }
        match tokio::fs::remove_file(&document.path).await {
            Ok(()) => debug!("Removed processed document {}", document.path.display()),
            Err(e) => warn!("Failed to remove {}: {}", document.path.display(), e),
        }
    }
}

/// List resume files in `dir`, ordered by file name.
pub fn collect_documents(dir: &Path) -> Result<Vec<CandidateDocument>> {
    let mut paths = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_candidate = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FileType::from_extension(ext).is_candidate_document())
            .unwrap_or(false);
        if is_candidate {
            paths.push(path);
        } else {
            debug!("Skipping non-resume file {}", path.display());
        }
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths.into_iter().map(CandidateDocument::from_path).collect())
}
