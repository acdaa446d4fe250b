use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use crate::db::School;
use crate::error::SchoolsError;
use crate::middleware::school_form::SchoolSubmission;
use crate::router::SchoolsState;
use crate::types::school_form::{FormContract, SCHOOL_FORM};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolCreated {
    pub message: &'static str,
    pub image_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// POST /api/schools -> store the image, insert the row.
pub async fn create_school(
    State(state): State<SchoolsState>,
    SchoolSubmission { fields, image }: SchoolSubmission,
) -> Result<(StatusCode, Json<SchoolCreated>), SchoolsError> {
    let image = image.ok_or(SchoolsError::MissingImage)?;
    let registered = state.registrar.register(&fields, image).await?;

    Ok((
        StatusCode::CREATED,
        Json(SchoolCreated {
            message: "School added successfully!",
            image_path: registered.image_path,
            id: registered.id,
        }),
    ))
}

/// GET /api/schools -> every row, newest first.
pub async fn list_schools(
    State(state): State<SchoolsState>,
) -> Result<Json<Vec<School>>, SchoolsError> {
    Ok(Json(state.storage.list().await?))
}

/// GET /api/schools/{id}
pub async fn get_school(
    State(state): State<SchoolsState>,
    Path(id): Path<i64>,
) -> Result<Json<School>, SchoolsError> {
    state
        .storage
        .get(id)
        .await?
        .map(Json)
        .ok_or(SchoolsError::NotFound(id))
}

/// GET /api/schools/form -> the field contract the form renders from.
pub async fn form_contract(State(state): State<SchoolsState>) -> Json<FormContract> {
    Json(FormContract {
        fields: SCHOOL_FORM,
        max_image_bytes: state.uploads.max_bytes(),
    })
}

/// OPTIONS /api/schools -> CORS preflight; headers come from the router layers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
