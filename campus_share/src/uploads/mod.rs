//! File intake: receives a single uploaded file, stores it under a generated
//! name in a flat directory and exposes it below `/uploads/`.
//!
//! Files are written incrementally so the size cap is enforced while the
//! payload streams in. An oversized payload is rejected and the partial file
//! removed; nothing is silently truncated.

pub mod errors;

pub use errors::{UploadError, UploadResult};

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

/// Public URL prefix under which stored files are served.
pub const PUBLIC_PREFIX: &str = "/uploads/";

/// Default per-file cap (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Longest sanitized base kept from a client file name.
const MAX_BASE_CHARS: usize = 100;

/// Longest extension kept, without the dot.
const MAX_EXT_CHARS: usize = 16;

/// A file that has been fully written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredUpload {
    pub file_name: String,
    pub public_url: String,
    pub content_type: String,
    pub media_type: String,
    pub size: u64,
}

/// Local-disk upload directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: u64,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Create the upload directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> UploadResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Open a new destination file for `original_name`.
    ///
    /// The stored name is `<unix millis>_<sanitized base><ext>`; if that name
    /// is already taken a numeric suffix is appended.
    pub async fn begin(
        &self,
        original_name: &str,
        content_type: Option<&str>,
    ) -> UploadResult<PendingUpload> {
        self.ensure_dir().await?;

        let (base, ext) = split_name(original_name);
        let stamp = Utc::now().timestamp_millis();

        let mut attempt = 0u32;
        loop {
            let file_name = if attempt == 0 {
                format!("{stamp}_{base}{ext}")
            } else {
                format!("{stamp}_{base}_{attempt}{ext}")
            };
            let path = self.root.join(&file_name);

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    let content_type = content_type
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .unwrap_or(DEFAULT_CONTENT_TYPE)
                        .to_string();

                    return Ok(PendingUpload {
                        file,
                        path,
                        public_url: format!("{PUBLIC_PREFIX}{file_name}"),
                        file_name,
                        content_type,
                        written: 0,
                        max_bytes: self.max_bytes,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt < 100 => {
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Resolve a public `/uploads/<name>` URL to a path inside the store.
    ///
    /// Returns `None` for anything that is not a plain file name under the
    /// public prefix, so stored pointers can never reach outside the directory.
    pub fn path_for(&self, public_url: &str) -> Option<PathBuf> {
        let name = public_url.strip_prefix(PUBLIC_PREFIX)?;
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
        {
            return None;
        }
        Some(self.root.join(name))
    }

    /// Remove a stored file by its public URL. Failures are logged and swallowed.
    pub async fn remove(&self, public_url: &str) {
        let Some(path) = self.path_for(public_url) else {
            return;
        };

        if let Err(e) = fs::remove_file(&path).await {
            log::debug!("Ignoring failed unlink of {}: {}", path.display(), e);
        }
    }
}

/// A destination file being written.
#[derive(Debug)]
pub struct PendingUpload {
    file: fs::File,
    path: PathBuf,
    file_name: String,
    public_url: String,
    content_type: String,
    written: u64,
    max_bytes: u64,
}

impl PendingUpload {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append a chunk, failing with `UploadError::TooLarge` once the cap is exceeded.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> UploadResult<()> {
        let next = self.written + chunk.len() as u64;
        if next > self.max_bytes {
            return Err(UploadError::TooLarge {
                limit: self.max_bytes,
            });
        }

        self.file.write_all(chunk).await?;
        self.written = next;
        Ok(())
    }

    /// Flush and close the file. A failed flush removes the file.
    pub async fn finish(mut self) -> UploadResult<StoredUpload> {
        if let Err(e) = self.file.flush().await {
            log::warn!("Failed to flush {}: {}", self.path.display(), e);
            self.abort().await;
            return Err(e.into());
        }

        Ok(StoredUpload {
            media_type: media_type_of(&self.content_type),
            file_name: self.file_name,
            public_url: self.public_url,
            content_type: self.content_type,
            size: self.written,
        })
    }

    /// Discard the partial file.
    pub async fn abort(self) {
        drop(self.file);
        if let Err(e) = fs::remove_file(&self.path).await {
            log::debug!("Ignoring failed cleanup of {}: {}", self.path.display(), e);
        }
    }
}

/// MIME major type, e.g. `image/png` → `image`.
pub fn media_type_of(content_type: &str) -> String {
    content_type
        .split('/')
        .next()
        .map(|major| major.trim().to_ascii_lowercase())
        .filter(|major| !major.is_empty())
        .unwrap_or_else(|| "application".to_string())
}

/// Keep `[A-Za-z0-9_-]`, replace everything else with `_`.
pub fn sanitize_base(base: &str) -> String {
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Split an uploaded file name into a sanitized base and an extension (with dot).
fn split_name(original_name: &str) -> (String, String) {
    // Browsers may send full client paths.
    let name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);

    let (base, ext) = match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx + 1..]),
        _ => (name, ""),
    };

    // Stored names must stay under NAME_MAX once the stamp is prefixed.
    let base: String = sanitize_base(base).chars().take(MAX_BASE_CHARS).collect();
    let base = if base.is_empty() { "file".to_string() } else { base };

    let ext: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_EXT_CHARS)
        .collect();
    let ext = if ext.is_empty() {
        String::new()
    } else {
        format!(".{ext}")
    };

    (base, ext)
}
