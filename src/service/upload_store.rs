use crate::error::SchoolsError;
use axum::body::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};
use url::Url;

/// Directory under the public root that holds uploaded images.
pub const IMAGE_DIR_NAME: &str = "schoolImages";

/// URL prefix stored in the database for every image.
pub const PUBLIC_PREFIX: &str = "/schoolImages";

const NAME_ATTEMPTS: usize = 8;

/// Room left for the timestamp prefix under the usual 255-byte name limit.
const MAX_BASE_NAME_BYTES: usize = 200;

/// An image written to the upload directory, not yet owned by any row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub file_name: String,
    pub path: PathBuf,
    pub public_path: String,
    pub size: u64,
}

#[derive(Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: u64,
    last_stamp: Arc<AtomicI64>,
}

impl UploadStore {
    pub fn new(public_dir: impl AsRef<Path>, max_bytes: u64) -> Self {
        Self {
            dir: public_dir.as_ref().join(IMAGE_DIR_NAME),
            max_bytes,
            last_stamp: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Make sure the upload directory exists.
    pub async fn prepare(&self) -> Result<(), SchoolsError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(SchoolsError::UploadDir)
    }

    /// Stream an uploaded part to `{timestamp}-{original}` in the upload
    /// directory. More than `max_bytes` bytes removes the partial file.
    pub async fn persist<S, E>(&self, original_name: &str, content: S) -> Result<StoredImage, SchoolsError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<SchoolsError>,
    {
        let (mut file, mut image) = self.create_target(original_name).await?;

        match self.write_chunks(&mut file, content).await {
            Ok(size) => {
                image.size = size;
                debug!(path = %image.path.display(), size, "stored upload");
                Ok(image)
            }
            Err(e) => {
                drop(file);
                self.discard(&image).await;
                Err(e)
            }
        }
    }

    /// Best-effort removal of an image that will not be referenced by a row.
    pub async fn discard(&self, image: &StoredImage) {
        match fs::remove_file(&image.path).await {
            Ok(()) => info!(path = %image.path.display(), "removed orphaned upload"),
            Err(e) => error!(
                path = %image.path.display(),
                error = %e,
                "failed to remove orphaned upload"
            ),
        }
    }

    async fn write_chunks<S, E>(&self, file: &mut File, content: S) -> Result<u64, SchoolsError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<SchoolsError>,
    {
        let mut content = pin!(content);
        let mut written: u64 = 0;
        while let Some(chunk) = content.next().await {
            let chunk = chunk.map_err(Into::<SchoolsError>::into)?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(SchoolsError::ImageTooLarge {
                    limit: self.max_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(written)
    }

    async fn create_target(&self, original_name: &str) -> Result<(File, StoredImage), SchoolsError> {
        let base = storage_base_name(original_name);
        for _ in 0..NAME_ATTEMPTS {
            let file_name = format!("{}-{}", self.next_stamp(), base);
            let path = self.dir.join(&file_name);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    let public_path = public_path_for(&path);
                    return Ok((
                        file,
                        StoredImage {
                            file_name,
                            path,
                            public_path,
                            size: 0,
                        },
                    ));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free upload name for {base}"),
        )
        .into())
    }

    /// Millisecond timestamp, strictly increasing within this store.
    fn next_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_stamp.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Public URL for a stored file: the prefix plus the file's base name only,
/// percent-encoded as a single path segment.
pub fn public_path_for(path: &Path) -> String {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return format!("{PUBLIC_PREFIX}/{base}");
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(IMAGE_DIR_NAME).push(&base);
    }
    url.path().to_string()
}

/// Last path component of a client-supplied filename. Only separators and
/// control characters are dropped, so the stored name keeps the original.
fn storage_base_name(original: &str) -> String {
    let last = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let mut cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    if cleaned.len() > MAX_BASE_NAME_BYTES {
        let mut end = MAX_BASE_NAME_BYTES;
        while !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        cleaned.truncate(end);
    }
    if cleaned.trim().is_empty() || cleaned == "." || cleaned == ".." {
        "image".to_string()
    } else {
        cleaned
    }
}
