pub mod catalog;
pub mod handlers;
pub mod routes;

use serde::{Deserialize, Serialize};

use crate::google::{LabelAnnotation, SegmentLabel, VideoSegment};

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub target: String,
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub transcript: String,
}

#[derive(Debug, Serialize)]
pub struct TranslationResponse {
    pub translation: String,
}

#[derive(Debug, Serialize)]
pub struct VisionResponse {
    pub labels: Vec<LabelAnnotation>,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub labels: Vec<SegmentLabel>,
    pub shots: Vec<VideoSegment>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
