//! Deployment artifact packaging and upload

use crate::error::{CloudError, Result};
use crate::provider::{BucketService, ObjectAcl};
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Zip every file under `source_dir` into `archive_path`.
///
/// A stale archive is removed first. Entry names are relative to
/// `source_dir` and always use `/`. `on_file` sees each file as it is added.
/// Returns the number of files written.
pub fn package_archive<F>(source_dir: &Path, archive_path: &Path, mut on_file: F) -> Result<usize>
where
    F: FnMut(&Path),
{
    if archive_path.exists() {
        std::fs::remove_file(archive_path)?;
    }
    if !source_dir.is_dir() {
        return Err(CloudError::Archive(format!(
            "source directory {} does not exist",
            source_dir.display()
        )));
    }
    if let Some(parent) = archive_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut zip = zip::ZipWriter::new(File::create(archive_path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut count = 0;

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if path == archive_path {
            continue;
        }
        let relative = path
            .strip_prefix(source_dir)
            .map_err(|e| CloudError::Archive(e.to_string()))?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let name = relative.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else {
            on_file(relative);
            zip.start_file(name, options)?;
            let mut file = File::open(path)?;
            std::io::copy(&mut file, &mut zip)?;
            count += 1;
        }
    }

    zip.finish()?;
    tracing::debug!("Packaged {} files into {}", count, archive_path.display());
    Ok(count)
}

/// Uploads artifacts to the deployment bucket
pub struct ArtifactPublisher<'a> {
    buckets: &'a dyn BucketService,
}

impl<'a> ArtifactPublisher<'a> {
    pub fn new(buckets: &'a dyn BucketService) -> Self {
        Self { buckets }
    }

    /// Upload each `(key, path)` pair, world-readable so instances can fetch
    /// them during bootstrap.
    pub async fn publish(&self, bucket: &str, files: &[(String, PathBuf)]) -> Result<()> {
        for (key, path) in files {
            let body = tokio::fs::read(path).await.map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    CloudError::ResourceNotFound(format!("artifact {}", path.display()))
                }
                _ => CloudError::Io(e),
            })?;
            tracing::debug!("Uploading {} ({} bytes) to {}", key, body.len(), bucket);
            self.buckets
                .put_object(bucket, key, body, ObjectAcl::PublicRead)
                .await?;
        }
        Ok(())
    }
}
