//! Multipart form intake.
//!
//! Text parts are collected into a map; the designated file part is streamed
//! chunk by chunk into the [`UploadStore`], which enforces the size cap. Any
//! failure after a file has been written removes it again.

use axum::extract::Multipart;
use campus_share::uploads::{StoredUpload, UploadStore};
use std::collections::HashMap;

use super::error::{ApiError, ApiResult};
use crate::metrics;

/// Parsed multipart form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub file: Option<StoredUpload>,
}

impl UploadForm {
    /// Text value of `name`, if sent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }
}

/// Read every part of `multipart`, storing the part named `file_field`.
pub async fn read_form(
    multipart: Multipart,
    uploads: &UploadStore,
    file_field: &str,
) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    if let Err(e) = collect(multipart, uploads, file_field, &mut form).await {
        if let Some(file) = form.file.take() {
            uploads.remove(&file.public_url).await;
        }
        return Err(e);
    }

    if let Some(file) = &form.file {
        tracing::info!(
            file = %file.file_name,
            size = file.size,
            media_type = %file.media_type,
            "Stored upload"
        );
        metrics::uploads_stored_total(&file.media_type, file.size);
    }
    Ok(form)
}

async fn collect(
    mut multipart: Multipart,
    uploads: &UploadStore,
    file_field: &str,
    form: &mut UploadForm,
) -> ApiResult<()> {
    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .file_name()
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        match file_name {
            Some(file_name) if name == file_field => {
                let content_type = field.content_type().map(str::to_string);
                let mut pending = uploads.begin(&file_name, content_type.as_deref()).await?;

                loop {
                    let chunk = match field.chunk().await {
                        Ok(Some(chunk)) => chunk,
                        Ok(None) => break,
                        Err(e) => {
                            pending.abort().await;
                            return Err(e.into());
                        }
                    };
                    if let Err(e) = pending.write_chunk(&chunk).await {
                        tracing::warn!(
                            file = pending.file_name(),
                            written = pending.written(),
                            "Discarding partial upload: {}",
                            e
                        );
                        pending.abort().await;
                        return Err(e.into());
                    }
                }

                let stored = pending.finish().await?;
                if let Some(previous) = form.file.replace(stored) {
                    uploads.remove(&previous.public_url).await;
                }
            }
            // Files under any other name are skipped.
            Some(_) => {}
            None => {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
    }
    Ok(())
}
