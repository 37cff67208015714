//! Video Intelligence label and shot-change detection.
//!
//! `videos:annotate` is a long-running operation; the client polls it until
//! the provider reports it done.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use super::{GoogleClient, ProviderError, Status, VideoAnalyzer};

const API_BASE: &str = "https://videointelligence.googleapis.com/v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(default)]
    pub entity_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language_code: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSegment {
    #[serde(default)]
    pub start_time_offset: Option<String>,
    #[serde(default)]
    pub end_time_offset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSegment {
    #[serde(default)]
    pub segment: VideoSegment,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentLabel {
    pub entity: Entity,
    #[serde(default)]
    pub category_entities: Vec<Entity>,
    #[serde(default)]
    pub segments: Vec<LabelSegment>,
}

#[derive(Debug, Clone, Default)]
pub struct VideoAnalysis {
    pub labels: Vec<SegmentLabel>,
    pub shots: Vec<VideoSegment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateVideoRequest {
    input_content: String,
    features: [&'static str; 2],
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<Status>,
    response: Option<AnnotateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateVideoResponse {
    #[serde(default)]
    annotation_results: Vec<VideoAnnotationResults>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoAnnotationResults {
    #[serde(default)]
    segment_label_annotations: Vec<SegmentLabel>,
    #[serde(default)]
    shot_annotations: Vec<VideoSegment>,
    error: Option<Status>,
}

impl AnnotateVideoRequest {
    fn new(video: &[u8]) -> Self {
        Self {
            input_content: STANDARD.encode(video),
            features: ["LABEL_DETECTION", "SHOT_CHANGE_DETECTION"],
        }
    }
}

impl Operation {
    /// `None` while the operation is still running.
    fn outcome(self) -> Option<Result<VideoAnalysis, ProviderError>> {
        if !self.done {
            return None;
        }

        if let Some(status) = self.error {
            return Some(Err(ProviderError::Failed(status.message)));
        }

        let results = self
            .response
            .and_then(|r| r.annotation_results.into_iter().next())
            .unwrap_or_default();

        if let Some(status) = results.error.filter(|s| s.code != 0) {
            return Some(Err(ProviderError::Failed(status.message)));
        }

        Some(Ok(VideoAnalysis {
            labels: results.segment_label_annotations,
            shots: results.shot_annotations,
        }))
    }
}

pub struct VideoIntelligenceClient {
    client: GoogleClient,
    api_base: String,
    poll_interval: Duration,
}

impl VideoIntelligenceClient {
    pub fn new(client: GoogleClient, poll_interval: Duration) -> Self {
        Self {
            client,
            api_base: API_BASE.to_string(),
            poll_interval,
        }
    }

    #[cfg(test)]
    fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base;
        self
    }
}

#[async_trait]
impl VideoAnalyzer for VideoIntelligenceClient {
    async fn analyze_video(&self, video: &[u8]) -> Result<VideoAnalysis, ProviderError> {
        let url = format!("{}/videos:annotate", self.api_base);
        let mut operation: Operation = self
            .client
            .post_json(&url, &AnnotateVideoRequest::new(video))
            .await?;
        tracing::debug!("Started video annotation {}", operation.name);

        let poll_url = format!("{}/{}", self.api_base, operation.name);
        loop {
            if let Some(outcome) = operation.outcome() {
                return outcome;
            }
            tokio::time::sleep(self.poll_interval).await;
            operation = self.client.get_json(&poll_url).await?;
        }
    }
}
