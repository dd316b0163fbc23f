use std::path::Path;

/// Creates the upload folder (and parents). Failures, including an
/// existing path, are logged and ignored.
pub async fn ensure_upload_folder(path: &Path) {
    match tokio::fs::create_dir_all(path).await {
        Ok(()) => tracing::debug!(dir = %path.display(), "upload_folder_ready"),
        Err(e) => tracing::debug!(error = ?e, dir = %path.display(), "upload_folder_create_skipped"),
    }
}
