//! Google Cloud provider clients.
//!
//! Every capability the gateway exposes sits behind one of the traits below so
//! handlers never see REST details. The concrete clients all share a single
//! [`GoogleClient`], built once at startup.

pub mod auth;
pub mod speech;
pub mod translate;
pub mod vertex;
pub mod video;
pub mod vision;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub use auth::TokenSource;
pub use speech::{SpeechToTextClient, TextToSpeechClient};
pub use translate::TranslateClient;
pub use vertex::VertexClient;
pub use video::{SegmentLabel, VideoAnalysis, VideoIntelligenceClient, VideoSegment};
pub use vision::{ImageAnalysis, LabelAnnotation, VisionClient};

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("Request to provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to obtain access token: {0}")]
    Auth(String),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Provider operation failed: {0}")]
    Failed(String),

    #[error("Unexpected provider response: {0}")]
    Decode(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Build an API error from a non-success response, preferring the message
    /// inside Google's `{"error": {...}}` envelope.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: Status,
        }

        let message = match serde_json::from_slice::<Envelope>(body) {
            Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
            _ => {
                let text = String::from_utf8_lossy(body).trim().to_string();
                if text.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                } else {
                    text
                }
            }
        };

        ProviderError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// `google.rpc.Status` as it appears in error envelopes and operation results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns MP3 audio for `text`.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError>;
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, audio: &[u8]) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: &str) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze_image(&self, image: &[u8]) -> Result<ImageAnalysis, ProviderError>;
}

#[async_trait]
pub trait VideoAnalyzer: Send + Sync {
    async fn analyze_video(&self, video: &[u8]) -> Result<VideoAnalysis, ProviderError>;
}

/// Invoke a generative model by name with a prompt.
///
/// The response is returned as the provider's own JSON so callers can forward
/// it untouched.
#[async_trait]
pub trait GenerativeModels: Send + Sync {
    async fn invoke(&self, model: &str, prompt: &str) -> Result<serde_json::Value, ProviderError>;
}

/// Authenticated JSON-over-HTTPS client shared by all provider clients.
///
/// `quota_project` is sent as `x-goog-user-project` only when explicitly
/// configured.
#[derive(Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    quota_project: Option<String>,
}

impl GoogleClient {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
        quota_project: Option<String>,
    ) -> Self {
        Self {
            http,
            tokens,
            quota_project,
        }
    }

    pub async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(self.http.post(url).json(body)).await
    }

    pub async fn get_json<R>(&self, url: &str) -> Result<R, ProviderError>
    where
        R: DeserializeOwned,
    {
        self.send(self.http.get(url)).await
    }

    async fn send<R>(&self, request: RequestBuilder) -> Result<R, ProviderError>
    where
        R: DeserializeOwned,
    {
        let token = self.tokens.access_token().await?;
        let mut request = request.bearer_auth(token);
        if let Some(project) = &self.quota_project {
            request = request.header("x-goog-user-project", project);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(ProviderError::from_response(status, &body));
        }

        serde_json::from_slice(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}
