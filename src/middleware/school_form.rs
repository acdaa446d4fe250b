use axum::extract::{FromRequest, Multipart, Request};
use std::collections::HashMap;
use tracing::debug;

use crate::error::SchoolsError;
use crate::router::SchoolsState;
use crate::service::upload_store::{StoredImage, UploadStore};
use crate::types::school_form::IMAGE_FIELD;

/// A parsed school submission: text fields plus the image already on disk.
///
/// The image is written while the body is parsed, before any other field is
/// looked at. If parsing fails afterwards the image is removed again.
#[derive(Debug)]
pub struct SchoolSubmission {
    pub fields: HashMap<String, String>,
    pub image: Option<StoredImage>,
}

impl FromRequest<SchoolsState> for SchoolSubmission {
    type Rejection = SchoolsError;

    async fn from_request(req: Request, state: &SchoolsState) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        let uploads = &state.uploads;
        uploads.prepare().await?;

        let mut fields = HashMap::new();
        let mut image = None;
        match read_parts(multipart, uploads, &mut fields, &mut image).await {
            Ok(()) => Ok(Self { fields, image }),
            Err(e) => {
                if let Some(stored) = image.take() {
                    uploads.discard(&stored).await;
                }
                Err(e)
            }
        }
    }
}

async fn read_parts(
    mut multipart: Multipart,
    uploads: &UploadStore,
    fields: &mut HashMap<String, String>,
    image: &mut Option<StoredImage>,
) -> Result<(), SchoolsError> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        match file_name {
            Some(original) if name == IMAGE_FIELD => {
                // Browsers send an empty, unnamed part when no file was picked.
                if original.is_empty() {
                    continue;
                }
                if image.is_some() {
                    return Err(SchoolsError::MultipleImages);
                }
                if let Some(content_type) = field.content_type()
                    && !content_type.starts_with("image/")
                {
                    return Err(SchoolsError::NotAnImage(content_type.to_string()));
                }

                let stored = uploads.persist(&original, field).await?;
                if stored.size == 0 {
                    uploads.discard(&stored).await;
                    continue;
                }
                *image = Some(stored);
            }
            Some(_) => {
                debug!(field = %name, "ignoring unexpected file part");
            }
            None => {
                let value = field.text().await?;
                // First value wins.
                fields.entry(name).or_insert(value);
            }
        }
    }
    Ok(())
}
