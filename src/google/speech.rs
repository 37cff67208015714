//! Cloud Text-to-Speech and Cloud Speech-to-Text.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use super::{GoogleClient, ProviderError, SpeechRecognizer, SpeechSynthesizer};

const SYNTHESIZE_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";
const RECOGNIZE_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";
const LANGUAGE_CODE: &str = "en-US";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection {
    language_code: &'static str,
    ssml_gender: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

impl SynthesizeResponse {
    fn audio(self) -> Result<Vec<u8>, ProviderError> {
        let audio = STANDARD
            .decode(self.audio_content)
            .map_err(|e| ProviderError::Decode(format!("audioContent: {}", e)))?;
        if audio.is_empty() {
            return Err(ProviderError::Decode("empty audioContent".to_string()));
        }
        Ok(audio)
    }
}

impl<'a> SynthesizeRequest<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: LANGUAGE_CODE,
                ssml_gender: "NEUTRAL",
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        }
    }
}

pub struct TextToSpeechClient {
    client: GoogleClient,
    url: String,
}

impl TextToSpeechClient {
    pub fn new(client: GoogleClient) -> Self {
        Self {
            client,
            url: SYNTHESIZE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for TextToSpeechClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError> {
        tracing::debug!("Synthesizing {} chars", text.len());
        let response: SynthesizeResponse = self
            .client
            .post_json(&self.url, &SynthesizeRequest::new(text))
            .await?;
        response.audio()
    }
}

#[derive(Debug, Serialize)]
struct RecognizeRequest {
    config: RecognitionConfig,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig {
    encoding: &'static str,
    language_code: &'static str,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

impl RecognizeRequest {
    fn new(audio: &[u8]) -> Self {
        Self {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                language_code: LANGUAGE_CODE,
            },
            audio: RecognitionAudio {
                content: STANDARD.encode(audio),
            },
        }
    }
}

impl RecognizeResponse {
    /// Best alternative of each result, one per line.
    fn transcript(&self) -> String {
        self.results
            .iter()
            .filter_map(|r| r.alternatives.first())
            .map(|a| a.transcript.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct SpeechToTextClient {
    client: GoogleClient,
}

impl SpeechToTextClient {
    pub fn new(client: GoogleClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SpeechRecognizer for SpeechToTextClient {
    async fn recognize(&self, audio: &[u8]) -> Result<String, ProviderError> {
        tracing::debug!("Recognizing {} bytes of audio", audio.len());
        let response: RecognizeResponse = self
            .client
            .post_json(RECOGNIZE_URL, &RecognizeRequest::new(audio))
            .await?;
        Ok(response.transcript())
    }
}
