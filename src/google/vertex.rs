//! Vertex AI publisher models over REST.
//!
//! Request schema and method depend on the model family: Gemini takes chat
//! `contents`, Imagen and Veo take prediction `instances`.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{GenerativeModels, GoogleClient, ProviderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Gemini,
    Imagen,
    Veo,
}

impl ModelFamily {
    pub fn of(model: &str) -> Self {
        if model.starts_with("imagen") {
            Self::Imagen
        } else if model.starts_with("veo") {
            Self::Veo
        } else {
            Self::Gemini
        }
    }

    pub fn method(self) -> &'static str {
        match self {
            Self::Gemini => "generateContent",
            Self::Imagen => "predict",
            Self::Veo => "predictLongRunning",
        }
    }

    pub fn request_body(self, prompt: &str) -> Value {
        match self {
            Self::Gemini => json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
            }),
            Self::Imagen | Self::Veo => json!({
                "instances": [{ "prompt": prompt }],
                "parameters": { "sampleCount": 1 }
            }),
        }
    }
}

pub struct VertexClient {
    client: GoogleClient,
    project: Option<String>,
    location: String,
    base_url: Option<String>,
}

impl VertexClient {
    pub fn new(client: GoogleClient, project: Option<String>, location: String) -> Self {
        Self {
            client,
            project,
            location,
            base_url: None,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn endpoint(&self, model: &str) -> Result<String, ProviderError> {
        let project = self.project.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("GCP_PROJECT is not set".to_string())
        })?;

        let base = match &self.base_url {
            Some(base) => base.clone(),
            None if self.location == "global" => "https://aiplatform.googleapis.com".to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        };

        Ok(format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
            base,
            project,
            self.location,
            model,
            ModelFamily::of(model).method()
        ))
    }
}

#[async_trait]
impl GenerativeModels for VertexClient {
    async fn invoke(&self, model: &str, prompt: &str) -> Result<Value, ProviderError> {
        let url = self.endpoint(model)?;
        tracing::debug!("Invoking {}", url);
        self.client
            .post_json(&url, &ModelFamily::of(model).request_body(prompt))
            .await
    }
}
