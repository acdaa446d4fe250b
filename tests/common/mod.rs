#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use school_registry::db::SchoolsStorage;
use school_registry::service::upload_store::UploadStore;
use school_registry::{SchoolsState, schools_router};
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

pub struct TestApp {
    pub app: Router,
    pub storage: SchoolsStorage,
    pub public: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let public = TempDir::new().expect("failed to create public dir");
        let storage = SchoolsStorage::connect("sqlite::memory:", 1)
            .await
            .expect("failed to open sqlite");
        storage.init_schema().await.expect("failed to init schema");
        let uploads = UploadStore::new(public.path(), MAX_IMAGE_BYTES);
        let state = SchoolsState::new(storage.clone(), uploads);
        Self {
            app: schools_router(state),
            storage,
            public,
        }
    }

    pub fn image_dir(&self) -> PathBuf {
        self.public.path().join("schoolImages")
    }

    /// File names currently in the upload directory, sorted.
    pub fn stored_files(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.image_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Minimal multipart/form-data encoder for driving the upload route.
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "----school-registry-boundary-7MA4YWxkTrZu0gW".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .expect("failed to build multipart request")
    }
}

/// The six text fields of a valid submission.
pub fn school_fields(name: &str) -> MultipartBody {
    MultipartBody::new()
        .text("name", name)
        .text("address", "12 MG Road")
        .text("city", "Bengaluru")
        .text("state", "Karnataka")
        .text("contact", "9845012345")
        .text("email_id", "admissions@example.edu")
}

pub fn png_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    let header = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    let n = header.len().min(len);
    bytes[..n].copy_from_slice(&header[..n]);
    bytes
}

pub async fn read_json(resp: Response<Body>) -> Value {
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&body).expect("response body was not json")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}
