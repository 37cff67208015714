//! Cloud Vision label and text detection.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use super::{GoogleClient, ImageAnalyzer, ProviderError, Status};

const ANNOTATE_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelAnnotation {
    #[serde(default)]
    pub mid: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub topicality: f32,
}

#[derive(Debug, Clone, Default)]
pub struct ImageAnalysis {
    pub labels: Vec<LabelAnnotation>,
    pub text: String,
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest {
    image: Image,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct Image {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
    full_text_annotation: Option<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

impl AnnotateRequest {
    fn new(image: &[u8]) -> Self {
        Self {
            requests: vec![AnnotateImageRequest {
                image: Image {
                    content: STANDARD.encode(image),
                },
                features: vec![
                    Feature {
                        kind: "LABEL_DETECTION",
                    },
                    Feature {
                        kind: "TEXT_DETECTION",
                    },
                ],
            }],
        }
    }
}

impl TryFrom<AnnotateResponse> for ImageAnalysis {
    type Error = ProviderError;

    fn try_from(response: AnnotateResponse) -> Result<Self, Self::Error> {
        let image = response.responses.into_iter().next().unwrap_or_default();

        if let Some(status) = image.error.filter(|s| s.code != 0) {
            return Err(ProviderError::Failed(status.message));
        }

        Ok(Self {
            labels: image.label_annotations,
            text: image
                .full_text_annotation
                .map(|t| t.text)
                .unwrap_or_default(),
        })
    }
}

pub struct VisionClient {
    client: GoogleClient,
}

impl VisionClient {
    pub fn new(client: GoogleClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageAnalyzer for VisionClient {
    async fn analyze_image(&self, image: &[u8]) -> Result<ImageAnalysis, ProviderError> {
        tracing::debug!("Annotating image of {} bytes", image.len());
        let response: AnnotateResponse = self
            .client
            .post_json(ANNOTATE_URL, &AnnotateRequest::new(image))
            .await?;
        response.try_into()
    }
}
