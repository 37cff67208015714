use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, Multipart, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::catalog::{Service, SERVICES};
use super::{
    HealthResponse, PromptRequest, TextRequest, TranscriptResponse, TranslateRequest,
    TranslationResponse, VideoResponse, VisionResponse,
};
use crate::api::routes::AppState;
use crate::error::AppError;

const FILE_FIELD: &str = "file";

/// Pull the `file` field out of a multipart body, rejecting a missing or
/// empty upload.
async fn read_file(multipart: Result<Multipart, MultipartRejection>) -> Result<Bytes, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            let data = field.bytes().await?;
            if data.is_empty() {
                break;
            }
            return Ok(data);
        }
    }

    Err(AppError::MissingFile(FILE_FIELD))
}

pub async fn tts(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let audio = state.synthesizer.synthesize(&request.text).await?;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

pub async fn stt(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let audio = read_file(multipart).await?;
    let transcript = state.recognizer.recognize(&audio).await?;
    Ok(Json(TranscriptResponse { transcript }))
}

pub async fn translate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslationResponse>, AppError> {
    let Json(request) = payload?;
    let translation = state
        .translator
        .translate(&request.text, &request.target)
        .await?;
    Ok(Json(TranslationResponse { translation }))
}

pub async fn vision(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<VisionResponse>, AppError> {
    let image = read_file(multipart).await?;
    let analysis = state.images.analyze_image(&image).await?;
    Ok(Json(VisionResponse {
        labels: analysis.labels,
        text: analysis.text,
    }))
}

pub async fn video(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<VideoResponse>, AppError> {
    let video = read_file(multipart).await?;
    let analysis = state.videos.analyze_video(&video).await?;
    Ok(Json(VideoResponse {
        labels: analysis.labels,
        shots: analysis.shots,
    }))
}

async fn generate(
    state: &AppState,
    model: &str,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(request) = payload?;
    let output = state.generative.invoke(model, &request.prompt).await?;
    Ok(Json(output))
}

pub async fn gemini(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    generate(&state, &state.models.gemini, payload).await
}

pub async fn imagen(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    generate(&state, &state.models.imagen, payload).await
}

pub async fn veo(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    generate(&state, &state.models.veo, payload).await
}

pub async fn services() -> Json<&'static [Service]> {
    Json(SERVICES.as_slice())
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
