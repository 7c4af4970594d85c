//! Request handlers for the two JSON endpoints the playground client calls.
//! Every outcome, including malformed bodies, is answered with a
//! `{ success, ... }` envelope so the client can rely on one shape.
//!
//! Types:
//!
//! - `SaveRequest` mirrors the body of `POST /api/save-shader`, which carries
//!   single-file saves, multi-file saves, and deletes.
//! - `ApiError` maps `StoreError` onto HTTP status codes and the error envelope.
//!
//! Functions:
//!
//! - `list_shaders` answers `GET /api/list-shaders` from the store's cache.
//! - `save_shader` dispatches on the body to delete, save an exercise, or save a
//!   single file.
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use shaderstore::{ExerciseRef, ExerciseSources, ShaderStore, StoreError, Structure};
use tracing::{debug, error, warn};

#[derive(Debug, Clone)]
pub struct AppState {
    store: Arc<ShaderStore>,
}

impl AppState {
    pub fn new(store: Arc<ShaderStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ShaderStore {
        &self.store
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub content: Option<String>,
    pub path: Option<String>,
    pub is_new: Option<bool>,
    pub delete: Option<bool>,
    pub chapter: Option<String>,
    pub exercise: Option<String>,
    pub fragment: Option<String>,
    pub vertex: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListResponse<'a> {
    success: bool,
    structure: &'a Structure,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    success: bool,
    #[serde(flatten)]
    saved: Option<ExerciseRef>,
}

impl SaveResponse {
    fn ok() -> Self {
        Self {
            success: true,
            saved: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(message) => {
                debug!(%message, "rejected shader request");
                Self::bad_request(message)
            }
            storage @ StoreError::Storage { .. } => {
                error!(error = %storage, "shader storage operation failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: format!("internal server error: {storage}"),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub async fn list_shaders(State(state): State<AppState>) -> Result<Response, ApiError> {
    let structure = state.store().list().await?;
    Ok(Json(ListResponse {
        success: true,
        structure: &structure,
    })
    .into_response())
}

pub async fn save_shader(
    State(state): State<AppState>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "malformed save-shader body");
        ApiError::bad_request(rejection.body_text())
    })?;
    debug!(
        path = ?request.path,
        chapter = ?request.chapter,
        exercise = ?request.exercise,
        delete = ?request.delete,
        is_new = ?request.is_new,
        "received save-shader request"
    );

    if request.delete.unwrap_or(false) {
        return delete_exercise(&state, &request).await;
    }
    if request.fragment.is_some() {
        return save_exercise(&state, &request).await;
    }

    let path = required(&request.path, "path is required to save a shader")?;
    let content = required(&request.content, "content is required to save a shader")?;
    state
        .store()
        .save(content, path, request.is_new.unwrap_or(false))
        .await?;
    Ok(Json(SaveResponse::ok()))
}

async fn delete_exercise(
    state: &AppState,
    request: &SaveRequest,
) -> Result<Json<SaveResponse>, ApiError> {
    let (chapter, exercise) =
        chapter_and_exercise(request, "chapter and exercise are required to delete")?;
    state.store().delete(chapter, exercise).await?;
    Ok(Json(SaveResponse::ok()))
}

async fn save_exercise(
    state: &AppState,
    request: &SaveRequest,
) -> Result<Json<SaveResponse>, ApiError> {
    let (chapter, exercise) = chapter_and_exercise(
        request,
        "chapter and exercise are required to save an exercise",
    )?;
    let sources = ExerciseSources {
        fragment: request.fragment.clone().unwrap_or_default(),
        vertex: request.vertex.clone(),
    };
    let saved = state
        .store()
        .save_exercise(chapter, exercise, &sources, request.is_new.unwrap_or(false))
        .await?;
    Ok(Json(SaveResponse {
        success: true,
        saved: Some(saved),
    }))
}

fn chapter_and_exercise<'a>(
    request: &'a SaveRequest,
    message: &str,
) -> Result<(&'a str, &'a str), ApiError> {
    let chapter = required(&request.chapter, message)?;
    let exercise = required(&request.exercise, message)?;
    Ok((chapter, exercise))
}

fn required<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request(message))
}
