use crate::db::SchoolsStorage;
use crate::error::SchoolsError;
use crate::service::upload_store::{StoredImage, UploadStore};
use crate::types::school_form::SchoolForm;
use std::collections::HashMap;
use tracing::{info, warn};
use validator::Validate;

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    pub id: Option<i64>,
    pub image_path: String,
}

/// Turns a parsed submission into a `schools` row.
///
/// The image is already on disk when `register` runs. Any failure from here
/// on removes it again; removal is best effort and never masks the original
/// error.
#[derive(Clone)]
pub struct SchoolRegistrar {
    storage: SchoolsStorage,
    uploads: UploadStore,
}

impl SchoolRegistrar {
    pub fn new(storage: SchoolsStorage, uploads: UploadStore) -> Self {
        Self { storage, uploads }
    }

    pub async fn register(
        &self,
        fields: &HashMap<String, String>,
        image: StoredImage,
    ) -> Result<Registered, SchoolsError> {
        let form = SchoolForm::from_fields(fields);
        if let Err(errors) = form.validate() {
            warn!(image = %image.public_path, "submission failed validation");
            self.uploads.discard(&image).await;
            return Err(errors.into());
        }

        let school = form.into_new_school();
        match self.storage.insert(&school, &image.public_path).await {
            Ok(id) => {
                info!(id = ?id, name = %school.name, image = %image.public_path, "school added");
                Ok(Registered {
                    id,
                    image_path: image.public_path,
                })
            }
            Err(e) => {
                self.uploads.discard(&image).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::convert::Infallible;
    use axum::body::Bytes;
    use tempfile::TempDir;

    fn fields() -> HashMap<String, String> {
        [
            ("name", "Riverside High"),
            ("address", "4 Bank Rd"),
            ("city", "Nagpur"),
            ("state", "Maharashtra"),
            ("contact", "0712345678"),
            ("email_id", "desk@riverside.in"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    async fn setup() -> (TempDir, SchoolsStorage, UploadStore, StoredImage) {
        let tmp = TempDir::new().expect("tempdir");
        let uploads = UploadStore::new(tmp.path(), 1024);
        uploads.prepare().await.expect("prepare");
        let image = uploads
            .persist(
                "river.jpg",
                stream::iter([Ok::<_, Infallible>(Bytes::from_static(b"jpeg"))]),
            )
            .await
            .expect("persist");
        let storage = SchoolsStorage::connect("sqlite::memory:", 1)
            .await
            .expect("connect");
        (tmp, storage, uploads, image)
    }

    #[tokio::test]
    async fn registers_row_with_image_path() {
        let (_tmp, storage, uploads, image) = setup().await;
        storage.init_schema().await.expect("schema");
        let registrar = SchoolRegistrar::new(storage.clone(), uploads);

        let registered = registrar
            .register(&fields(), image.clone())
            .await
            .expect("register");

        assert_eq!(registered.image_path, image.public_path);
        assert!(image.path.exists());
        let rows = storage.list().await.expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].image, image.public_path);
        assert_eq!(rows[0].contact, "0712345678");
    }

    #[tokio::test]
    async fn insert_failure_removes_image() {
        let (_tmp, storage, uploads, image) = setup().await;
        // No schema: the insert fails.
        let registrar = SchoolRegistrar::new(storage, uploads);

        let err = registrar.register(&fields(), image.clone()).await.unwrap_err();
        assert!(matches!(err, SchoolsError::InsertFailed(_)));
        assert!(!image.path.exists());
    }

    #[tokio::test]
    async fn invalid_fields_remove_image_without_insert() {
        let (_tmp, storage, uploads, image) = setup().await;
        storage.init_schema().await.expect("schema");
        let registrar = SchoolRegistrar::new(storage.clone(), uploads);

        let mut bad = fields();
        bad.insert("contact".into(), "12345".into());
        let err = registrar.register(&bad, image.clone()).await.unwrap_err();

        assert!(matches!(err, SchoolsError::Validation(_)));
        assert!(!image.path.exists());
        assert!(storage.list().await.expect("list").is_empty());
    }
}
