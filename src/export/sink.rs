//! Delivery of finished artifacts ("downloads").

use std::io;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// A complete encoded file, ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// `nmri-recording-<model>-<YYYY-MM-DD>.<extension>`.
///
/// Path separators in the model id (e.g. `org/model`) become `_`.
pub fn artifact_file_name(model_id: &str, date: DateTime<Utc>, extension: &str) -> String {
    let model: String = model_id
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!(
        "nmri-recording-{}-{}.{}",
        model,
        date.format("%Y-%m-%d"),
        extension
    )
}

/// Receives finished artifacts. Called at most once per export, and only
/// after the artifact is complete.
pub trait DownloadSink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> io::Result<()>;
}

/// Collects artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub delivered: Vec<ExportArtifact>,
}

impl DownloadSink for MemorySink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> io::Result<()> {
        self.delivered.push(artifact.clone());
        Ok(())
    }
}

/// Writes artifacts into a directory.
///
/// Each file is written to a temporary sibling and renamed into place, so a
/// reader never observes a partially written export.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl DirectorySink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, artifact: &ExportArtifact) -> PathBuf {
        self.dir.join(&artifact.file_name)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl DownloadSink for DirectorySink {
    fn deliver(&mut self, artifact: &ExportArtifact) -> io::Result<()> {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(&artifact.bytes)?;
        file.flush()?;
        let path = self.path_for(artifact);
        file.persist(&path).map_err(|e| e.error)?;
        log::info!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());
        Ok(())
    }
}
