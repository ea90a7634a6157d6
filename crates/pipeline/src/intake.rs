//! Job intake: turning user files into `Pending` jobs.
//!
//! Filtering to images is the caller's job ([`collect_image_files`] does
//! it for paths on disk). [`build_jobs`] assumes every file it receives
//! is an image and never drops one.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use studiostyle_core::job::{Job, SourceImage};
use studiostyle_core::media;
use studiostyle_core::types::{JobId, Timestamp};

use crate::error::IntakeError;
use crate::preview::PreviewStore;

/// Build one `Pending` job per file, numbering them from `first_seq`.
///
/// Output order matches input order.
pub fn build_jobs(files: Vec<SourceImage>, first_seq: u64, previews: &PreviewStore) -> Vec<Job> {
    files
        .into_iter()
        .zip(first_seq..)
        .map(|(source, seq)| {
            if !media::is_image_mime(&source.mime_type) {
                tracing::warn!(
                    name = %source.name,
                    mime_type = %source.mime_type,
                    "Non-image file reached intake; enqueuing anyway",
                );
            }
            let id = JobId::generate(&source.name, source.modified);
            let preview = previews.register(source.bytes.clone());
            Job::new(id, seq, source, preview)
        })
        .collect()
}

/// Whether a file passes the image content-type predicate.
pub fn accepts(source: &SourceImage) -> bool {
    media::is_image_mime(&source.mime_type)
}

/// Read one file from disk, sniffing its content type.
pub async fn load_source(path: &Path) -> Result<SourceImage, IntakeError> {
    let io_err = |source: std::io::Error| IntakeError::Io {
        path: path.to_path_buf(),
        source,
    };

    let bytes = tokio::fs::read(path).await.map_err(io_err)?;
    let metadata = tokio::fs::metadata(path).await.map_err(io_err)?;
    let modified: Timestamp = metadata
        .modified()
        .map(Timestamp::from)
        .unwrap_or_else(|_| chrono::Utc::now());

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mime = media::detect_mime(path, &bytes).ok_or_else(|| IntakeError::Rejected {
        name: name.clone(),
        mime: "unknown".to_string(),
    })?;

    Ok(SourceImage::new(name, modified, mime, Bytes::from(bytes)))
}

/// Expand `paths` (directories one level deep, sorted by name) and load
/// every image found. Non-images and unreadable files are logged and
/// skipped.
pub async fn collect_image_files(paths: &[PathBuf]) -> Vec<SourceImage> {
    let mut files = Vec::new();
    for path in paths {
        match expand(path).await {
            Ok(expanded) => files.extend(expanded),
            Err(e) => tracing::warn!(error = %e, "Skipping input path"),
        }
    }

    let mut sources = Vec::with_capacity(files.len());
    for file in files {
        match load_source(&file).await {
            Ok(source) if accepts(&source) => sources.push(source),
            Ok(source) => {
                let e = IntakeError::Rejected {
                    name: source.name,
                    mime: source.mime_type,
                };
                tracing::warn!(error = %e, "Skipping file");
            }
            Err(e) => tracing::warn!(error = %e, "Skipping file"),
        }
    }
    sources
}

async fn expand(path: &Path) -> Result<Vec<PathBuf>, IntakeError> {
    let io_err = |source: std::io::Error| IntakeError::Io {
        path: path.to_path_buf(),
        source,
    };

    let metadata = tokio::fs::metadata(path).await.map_err(io_err)?;
    if !metadata.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut entries = tokio::fs::read_dir(path).await.map_err(io_err)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use studiostyle_core::job::JobStatus;

    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn source(name: &str) -> SourceImage {
        SourceImage::new(name, chrono::Utc::now(), "image/png", vec![7u8; 4])
    }

    #[test]
    fn builds_pending_jobs_in_order_with_previews() {
        let previews = PreviewStore::new();
        let jobs = build_jobs(vec![source("a.png"), source("b.png")], 10, &previews);

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].source().name, "a.png");
        assert_eq!(jobs[0].seq(), 10);
        assert_eq!(jobs[1].seq(), 11);
        assert!(jobs.iter().all(|j| j.status() == JobStatus::Pending));
        assert_ne!(jobs[0].id(), jobs[1].id());
        assert_eq!(
            previews.resolve(&jobs[0].preview()),
            Some(Bytes::from(vec![7u8; 4]))
        );
    }

    #[test]
    fn non_images_are_not_dropped_by_build_jobs() {
        let previews = PreviewStore::new();
        let doc = SourceImage::new("notes.txt", chrono::Utc::now(), "text/plain", vec![1]);
        assert!(!accepts(&doc));
        assert_eq!(build_jobs(vec![doc], 0, &previews).len(), 1);
    }

    #[tokio::test]
    async fn collects_only_images_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.png"), PNG_MAGIC).unwrap();
        std::fs::write(dir.path().join("a.jpg"), [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"hello").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let sources = collect_image_files(&[dir.path().to_path_buf()]).await;
        let names: Vec<_> = sources.iter().map(|s| s.name.as_str()).collect();

        assert_eq!(names, vec!["a.jpg", "b.png"]);
        assert_eq!(sources[0].mime_type, "image/jpeg");
        assert_eq!(sources[1].mime_type, "image/png");
    }

    #[tokio::test]
    async fn load_source_rejects_unknown_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"\x00\x01\x02").unwrap();

        assert_matches!(load_source(&path).await, Err(IntakeError::Rejected { .. }));
    }

    #[tokio::test]
    async fn missing_path_is_io_error() {
        let result = load_source(Path::new("/definitely/not/here.png")).await;
        assert_matches!(result, Err(IntakeError::Io { .. }));
    }
}
