use std::any::Any;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        },
    },
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer, services::ServeDir, set_header::SetResponseHeaderLayer,
};
use tracing::error;

use crate::db::SchoolsStorage;
use crate::handlers::schools::{
    create_school, form_contract, get_school, list_schools, preflight,
};
use crate::service::registrar::SchoolRegistrar;
use crate::service::upload_store::{PUBLIC_PREFIX, UploadStore};

/// Room for the text fields and multipart framing on top of the image cap.
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

const ALLOWED_HEADERS: &str = "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, \
    Content-Length, Content-MD5, Content-Type, Date, X-Api-Version";

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct SchoolsState {
    pub storage: SchoolsStorage,
    pub uploads: UploadStore,
    pub registrar: SchoolRegistrar,
}

impl SchoolsState {
    pub fn new(storage: SchoolsStorage, uploads: UploadStore) -> Self {
        let registrar = SchoolRegistrar::new(storage.clone(), uploads.clone());
        Self {
            storage,
            uploads,
            registrar,
        }
    }
}

pub fn schools_router(state: SchoolsState) -> Router {
    let body_limit = usize::try_from(state.uploads.max_bytes() + FORM_OVERHEAD_BYTES)
        .unwrap_or(usize::MAX);
    let images = ServeDir::new(state.uploads.dir());

    Router::new()
        .route(
            "/api/schools",
            get(list_schools).post(create_school).options(preflight),
        )
        .route("/api/schools/form", get(form_contract))
        .route("/api/schools/{id}", get(get_school))
        .nest_service(PUBLIC_PREFIX, images)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET,POST,OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "An unexpected error occurred." })),
    )
        .into_response()
}
