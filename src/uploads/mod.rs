//! Image upload store.
//!
//! Files are written under a single root and referenced from listings as
//! `/uploads/<name>`. Staging writes each payload to `<name>.part` and renames
//! it into place, so a crash mid-write leaves only `.part` files behind, which
//! `init` sweeps on the next start.

pub mod form;

use std::path::{Component, Path, PathBuf};

use axum::body::Bytes;
use chrono::Utc;
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::{AppError, Result};

pub const PUBLIC_PREFIX: &str = "/uploads/";
const PART_SUFFIX: &str = ".part";
const MAX_EXTENSION_LEN: usize = 8;

/// A file payload received from a client, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Outcome of a best-effort cleanup pass.
#[derive(Debug, Default, PartialEq)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: Vec<String>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_file_size: usize,
    max_files: usize,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_file_size: usize, max_files: usize) -> Self {
        Self {
            root: root.into(),
            max_file_size,
            max_files,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.upload_dir.clone(), config.max_upload_size, config.max_upload_files)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Create the root if needed and remove `.part` leftovers. Returns how many were swept.
    pub async fn init(&self) -> Result<usize> {
        tokio::fs::create_dir_all(&self.root).await?;

        let mut swept = 0;
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if !name.to_string_lossy().ends_with(PART_SUFFIX) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => swept += 1,
                Err(e) => warn!(path = %entry.path().display(), error = %e, "failed to sweep partial upload"),
            }
        }

        if swept > 0 {
            info!(swept, root = %self.root.display(), "swept partial uploads");
        }
        Ok(swept)
    }

    /// Reject the whole batch if any file breaks a limit. Nothing is written.
    pub fn check_batch(&self, files: &[IncomingFile]) -> Result<()> {
        if files.len() > self.max_files {
            return Err(AppError::too_large(format!(
                "Too many files. Maximum is {}",
                self.max_files
            )));
        }
        if files.iter().any(|f| f.bytes.len() > self.max_file_size) {
            return Err(AppError::too_large(format!(
                "File too large. Maximum size is {} bytes",
                self.max_file_size
            )));
        }
        if let Some(bad) = files.iter().find(|f| !is_image(f.content_type.as_deref())) {
            return Err(AppError::invalid_file_type(format!(
                "Only image files are allowed (got {})",
                bad.content_type.as_deref().unwrap_or("no content type")
            )));
        }
        Ok(())
    }

    /// Persist a batch and return public paths in the order received.
    ///
    /// If any write fails, files already written by this call are removed
    /// before the error is returned.
    #[instrument(skip_all, fields(count = files.len()))]
    pub async fn stage(&self, files: Vec<IncomingFile>) -> Result<Vec<String>> {
        self.check_batch(&files)?;

        let mut staged = Vec::with_capacity(files.len());
        for file in files {
            let name = storage_name(file.file_name.as_deref());
            match self.write(&name, &file.bytes).await {
                Ok(()) => staged.push(format!("{PUBLIC_PREFIX}{name}")),
                Err(e) => {
                    self.discard(&staged, "failed batch write").await;
                    return Err(e);
                }
            }
        }

        info!(files = ?staged, "staged uploads");
        Ok(staged)
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let target = self.root.join(name);
        let part = self.root.join(format!("{name}{PART_SUFFIX}"));

        if let Err(e) = tokio::fs::write(&part, bytes).await {
            remove_part(&part).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&part, &target).await {
            remove_part(&part).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Delete the files behind `paths`. Failures are logged and counted, never returned.
    pub async fn discard(&self, paths: &[String], context: &str) -> CleanupReport {
        let mut report = CleanupReport::default();

        for path in paths {
            let Some(file) = self.resolve(path) else {
                warn!(%path, context, "refusing to delete path outside upload root");
                report.failed.push(path.clone());
                continue;
            };
            match tokio::fs::remove_file(&file).await {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    warn!(%path, context, error = %e, "failed to delete upload");
                    report.failed.push(path.clone());
                }
            }
        }

        if report.is_clean() {
            info!(removed = report.removed, context, "upload cleanup complete");
        } else {
            warn!(
                removed = report.removed,
                failed = report.failed.len(),
                context,
                "upload cleanup incomplete"
            );
        }
        report
    }

    /// Map `/uploads/<name>` to a file under the root. `None` for anything else.
    pub fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let name = public_path.strip_prefix(PUBLIC_PREFIX)?;
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if !name.contains('\\') => {
                Some(self.root.join(part))
            }
            _ => None,
        }
    }
}

/// Best-effort removal of a `.part` file left by a failed write.
async fn remove_part(part: &Path) {
    match tokio::fs::remove_file(part).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %part.display(), error = %e, "failed to remove partial upload"),
    }
}

fn is_image(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

/// `{millis}-{random hex}{.ext}`. Only the extension of the client name is kept.
pub fn storage_name(file_name: Option<&str>) -> String {
    let token: u64 = rand::thread_rng().gen();
    let ext = file_name.and_then(sanitized_extension).map(|e| format!(".{e}"));
    format!(
        "{}-{:016x}{}",
        Utc::now().timestamp_millis(),
        token,
        ext.unwrap_or_default()
    )
}

fn sanitized_extension(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next()?;
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> IncomingFile {
        IncomingFile {
            file_name: Some(name.into()),
            content_type: Some("image/jpeg".into()),
            bytes: Bytes::from_static(b"\xff\xd8\xff fake jpeg"),
        }
    }

    fn files_in(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn storage_name_keeps_only_a_clean_extension() {
        assert!(storage_name(Some("../../etc/passwd.JPG")).ends_with(".jpg"));
        assert!(!storage_name(Some("../../etc/passwd")).contains('.'));
        assert!(!storage_name(Some("photo.j/pg")).contains('/'));
        assert!(!storage_name(Some(".bashrc")).contains('.'));
        assert!(!storage_name(Some("x.averyverylongext")).contains('.'));
        assert_ne!(storage_name(Some("a.png")), storage_name(Some("a.png")));
    }

    #[test]
    fn resolve_refuses_traversal() {
        let store = UploadStore::new("/srv/uploads", 1024, 10);
        assert_eq!(store.resolve("/uploads/a.jpg"), Some(PathBuf::from("/srv/uploads/a.jpg")));
        assert_eq!(store.resolve("/uploads/../secret"), None);
        assert_eq!(store.resolve("/uploads/a/b.jpg"), None);
        assert_eq!(store.resolve("/uploads/"), None);
        assert_eq!(store.resolve("/etc/passwd"), None);
        assert_eq!(store.resolve("/uploads/..\\x"), None);
    }

    #[tokio::test]
    async fn staged_files_keep_request_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024, 10);

        let paths = store.stage(vec![image("a.png"), image("b.jpg")]).await.unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].starts_with(PUBLIC_PREFIX) && paths[0].ends_with(".png"));
        assert!(paths[1].ends_with(".jpg"));
        for path in &paths {
            assert!(store.resolve(path).unwrap().is_file());
        }
        assert!(files_in(dir.path()).iter().all(|n| !n.ends_with(PART_SUFFIX)));
    }

    #[tokio::test]
    async fn eleven_files_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024, 10);

        let batch = (0..11).map(|i| image(&format!("{i}.jpg"))).collect();
        let err = store.stage(batch).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn one_non_image_rejects_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024, 10);

        let mut text = image("notes.txt");
        text.content_type = Some("text/plain".into());
        let err = store.stage(vec![image("a.jpg"), text]).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidFileType(_)));
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn failed_write_returns_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("missing");
        let store = UploadStore::new(root.clone(), 1024, 10);

        let err = store.stage(vec![image("a.jpg")]).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn partial_cleanup_failure_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join(format!("x{PART_SUFFIX}"));
        std::fs::create_dir(&blocked).unwrap();

        remove_part(&blocked).await;
        remove_part(&dir.path().join("gone.part")).await;
        assert!(blocked.is_dir());
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 4, 10);

        let err = store.stage(vec![image("a.jpg")]).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn discard_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024, 10);
        let mut paths = store.stage(vec![image("a.jpg")]).await.unwrap();
        paths.push("/uploads/never-written.jpg".into());
        paths.push("/uploads/../escape.jpg".into());

        let report = store.discard(&paths, "test").await;
        assert_eq!(report.removed, 1);
        assert_eq!(report.failed.len(), 2);
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn init_sweeps_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1-abc.jpg.part"), b"partial").unwrap();
        std::fs::write(dir.path().join("2-def.jpg"), b"kept").unwrap();

        let store = UploadStore::new(dir.path().join("."), 1024, 10);
        assert_eq!(store.init().await.unwrap(), 1);
        assert_eq!(files_in(dir.path()), vec!["2-def.jpg".to_string()]);
    }
}
