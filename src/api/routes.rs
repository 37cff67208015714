use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::handlers;
use crate::config::{Config, ModelNames};
use crate::google::{
    GenerativeModels, GoogleClient, ImageAnalyzer, SpeechRecognizer, SpeechSynthesizer,
    SpeechToTextClient, TextToSpeechClient, TranslateClient, Translator, VertexClient,
    VideoAnalyzer, VideoIntelligenceClient, VisionClient,
};

/// Provider handles shared by every request. Built once, never mutated.
pub struct AppState {
    pub synthesizer: Box<dyn SpeechSynthesizer>,
    pub recognizer: Box<dyn SpeechRecognizer>,
    pub translator: Box<dyn Translator>,
    pub images: Box<dyn ImageAnalyzer>,
    pub videos: Box<dyn VideoAnalyzer>,
    pub generative: Box<dyn GenerativeModels>,
    pub models: ModelNames,
}

impl AppState {
    pub fn google(config: &Config, client: GoogleClient) -> Self {
        Self {
            synthesizer: Box::new(TextToSpeechClient::new(client.clone())),
            recognizer: Box::new(SpeechToTextClient::new(client.clone())),
            translator: Box::new(TranslateClient::new(client.clone())),
            images: Box::new(VisionClient::new(client.clone())),
            videos: Box::new(VideoIntelligenceClient::new(
                client.clone(),
                config.video_poll_interval,
            )),
            generative: Box::new(VertexClient::new(
                client,
                config.project.clone(),
                config.location.clone(),
            )),
            models: config.models.clone(),
        }
    }
}

pub fn create_router(state: Arc<AppState>, static_dir: &Path, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/tts", post(handlers::tts))
        .route("/stt", post(handlers::stt))
        .route("/translate", post(handlers::translate))
        .route("/vision", post(handlers::vision))
        .route("/video", post(handlers::video))
        .route("/gemini", post(handlers::gemini))
        .route("/imagen", post(handlers::imagen))
        .route("/veo", post(handlers::veo))
        .route("/services", get(handlers::services))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    Router::new()
        .nest("/api", api_routes)
        .fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::catalog::ResultView;
    use crate::google::{
        ImageAnalysis, LabelAnnotation, ProviderError, SegmentLabel, VideoAnalysis,
        VideoSegment,
    };
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tokio::task::JoinSet;
    use tower::ServiceExt;

    const BOUNDARY: &str = "cockpit-test-boundary";

    /// Provider stand-in: echoes its input, or fails every call.
    struct Stub {
        fail: bool,
    }

    impl Stub {
        fn check(&self) -> Result<(), ProviderError> {
            if self.fail {
                Err(ProviderError::Api {
                    status: 503,
                    message: "The service is currently unavailable.".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for Stub {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError> {
            self.check()?;
            let mut audio = b"ID3".to_vec();
            audio.extend_from_slice(text.as_bytes());
            Ok(audio)
        }
    }

    #[async_trait]
    impl SpeechRecognizer for Stub {
        async fn recognize(&self, audio: &[u8]) -> Result<String, ProviderError> {
            self.check()?;
            Ok(String::from_utf8_lossy(audio).to_uppercase())
        }
    }

    #[async_trait]
    impl Translator for Stub {
        async fn translate(&self, text: &str, target: &str) -> Result<String, ProviderError> {
            self.check()?;
            Ok(match (text, target) {
                ("Hello", "fr") => "Bonjour".to_string(),
                ("Good morning", "de") => "Guten Morgen".to_string(),
                _ => format!("[{}] {}", target, text),
            })
        }
    }

    #[async_trait]
    impl ImageAnalyzer for Stub {
        async fn analyze_image(&self, image: &[u8]) -> Result<ImageAnalysis, ProviderError> {
            self.check()?;
            Ok(ImageAnalysis {
                labels: vec![LabelAnnotation {
                    mid: "/m/01yrx".into(),
                    description: "Cat".into(),
                    score: 0.98,
                    topicality: 0.98,
                }],
                text: String::from_utf8_lossy(image).into_owned(),
            })
        }
    }

    #[async_trait]
    impl VideoAnalyzer for Stub {
        async fn analyze_video(&self, video: &[u8]) -> Result<VideoAnalysis, ProviderError> {
            self.check()?;
            let shot = VideoSegment {
                start_time_offset: Some("0s".into()),
                end_time_offset: Some(format!("{}s", video.len())),
            };
            Ok(VideoAnalysis {
                labels: vec![serde_json::from_value::<SegmentLabel>(json!({
                    "entity": { "entityId": "/m/0k4j", "description": "car" },
                    "segments": [{ "segment": { "startTimeOffset": "0s" }, "confidence": 0.9 }]
                }))
                .unwrap()],
                shots: vec![shot],
            })
        }
    }

    #[async_trait]
    impl GenerativeModels for Stub {
        async fn invoke(&self, model: &str, prompt: &str) -> Result<Value, ProviderError> {
            self.check()?;
            Ok(json!({ "model": model, "candidates": [{ "content": { "parts": [{ "text": prompt }] } }] }))
        }
    }

    fn app(fail: bool) -> Router {
        app_with_limit(fail, 1024 * 1024)
    }

    fn app_with_limit(fail: bool, max_upload_bytes: usize) -> Router {
        let state = AppState {
            synthesizer: Box::new(Stub { fail }),
            recognizer: Box::new(Stub { fail }),
            translator: Box::new(Stub { fail }),
            images: Box::new(Stub { fail }),
            videos: Box::new(Stub { fail }),
            generative: Box::new(Stub { fail }),
            models: ModelNames {
                gemini: "gemini-pro".into(),
                imagen: "imagen-2.0".into(),
                veo: "veo-1.5".into(),
            },
        };
        create_router(Arc::new(state), Path::new("static"), max_upload_bytes)
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(uri: &str, field: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> Response {
        app.oneshot(request).await.unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// One well-formed request per operation.
    fn requests() -> Vec<(&'static str, Request<Body>)> {
        vec![
            ("tts", json_request("/api/tts", json!({ "text": "Hello" }))),
            ("stt", multipart_request("/api/stt", "file", b"pcm")),
            (
                "translate",
                json_request("/api/translate", json!({ "text": "Hello", "target": "fr" })),
            ),
            ("vision", multipart_request("/api/vision", "file", b"STOP")),
            ("video", multipart_request("/api/video", "file", b"mp4")),
            ("gemini", json_request("/api/gemini", json!({ "prompt": "hi" }))),
            ("imagen", json_request("/api/imagen", json!({ "prompt": "a fox" }))),
            ("veo", json_request("/api/veo", json!({ "prompt": "a wave" }))),
        ]
    }

    #[tokio::test]
    async fn tts_returns_mpeg_bytes() {
        let response = send(app(false), json_request("/api/tts", json!({ "text": "Hello" }))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ID3Hello");
    }

    #[tokio::test]
    async fn stt_returns_transcript() {
        let response = send(app(false), multipart_request("/api/stt", "file", b"hello")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({ "transcript": "HELLO" }));
    }

    #[tokio::test]
    async fn translate_returns_different_text() {
        for (text, target) in [("Hello", "fr"), ("Good morning", "de")] {
            let response = send(
                app(false),
                json_request("/api/translate", json!({ "text": text, "target": target })),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
            let body = read_json(response).await;
            let translation = body["translation"].as_str().unwrap();
            assert!(!translation.is_empty());
            assert_ne!(translation, text);
        }
    }

    #[tokio::test]
    async fn vision_returns_labels_and_text() {
        let response = send(app(false), multipart_request("/api/vision", "file", b"STOP")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["labels"][0]["description"], "Cat");
        assert_eq!(body["labels"][0]["mid"], "/m/01yrx");
        assert_eq!(body["text"], "STOP");
    }

    #[tokio::test]
    async fn video_returns_labels_and_shots() {
        let response = send(app(false), multipart_request("/api/video", "file", b"mp4")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["labels"][0]["entity"]["description"], "car");
        assert_eq!(
            body["shots"],
            json!([{ "startTimeOffset": "0s", "endTimeOffset": "3s" }])
        );
    }

    #[tokio::test]
    async fn generative_endpoints_use_configured_models() {
        for (path, model) in [
            ("/api/gemini", "gemini-pro"),
            ("/api/imagen", "imagen-2.0"),
            ("/api/veo", "veo-1.5"),
        ] {
            let response = send(app(false), json_request(path, json!({ "prompt": "hi" }))).await;
            assert_eq!(response.status(), StatusCode::OK);
            let body = read_json(response).await;
            assert_eq!(body["model"], model);
            assert_eq!(body["candidates"][0]["content"]["parts"][0]["text"], "hi");
        }
    }

    #[tokio::test]
    async fn provider_failure_is_error_with_message() {
        for (op, request) in requests() {
            let response = send(app(true), request).await;
            assert_eq!(
                response.status(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "{op} should fail"
            );
            let body = read_json(response).await;
            let message = body["error"].as_str().unwrap();
            assert!(message.contains("currently unavailable"), "{op}: {message}");
        }
    }

    #[tokio::test]
    async fn upload_without_file_field_is_rejected() {
        for path in ["/api/stt", "/api/vision", "/api/video"] {
            let response = send(app(false), multipart_request(path, "attachment", b"data")).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
            let body = read_json(response).await;
            assert_eq!(body["code"], "MISSING_FILE");
        }
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let response = send(app(false), multipart_request("/api/vision", "file", b"")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["code"], "MISSING_FILE");
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let request = multipart_request("/api/vision", "file", &[0u8; 4096]);
        let response = send(app_with_limit(false, 1024), request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(read_json(response).await["code"], "INVALID_MULTIPART");
    }

    #[tokio::test]
    async fn non_multipart_upload_is_rejected() {
        let response = send(app(false), json_request("/api/stt", json!({ "file": "x" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let response = send(app(false), json_request("/api/translate", json!({ "text": "Hello" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["code"], "INVALID_JSON");
        assert!(body["error"].as_str().unwrap().contains("target"));
    }

    #[tokio::test]
    async fn json_responses_render_as_raw_text() {
        for (op, request) in requests().into_iter().filter(|(op, _)| *op != "tts") {
            let body = read_json(send(app(false), request).await).await;
            assert_eq!(ResultView::for_payload(&body), ResultView::Raw, "{op}");
        }
    }

    #[tokio::test]
    async fn concurrent_requests_get_matching_responses() {
        let app = app(false);
        let mut tasks = JoinSet::new();

        for i in 0..24 {
            let app = app.clone();
            tasks.spawn(async move {
                let request = match i % 3 {
                    0 => json_request("/api/gemini", json!({ "prompt": format!("prompt {i}") })),
                    1 => multipart_request("/api/stt", "file", format!("clip {i}").as_bytes()),
                    _ => json_request(
                        "/api/translate",
                        json!({ "text": format!("line {i}"), "target": "es" }),
                    ),
                };
                let body = read_json(app.oneshot(request).await.unwrap()).await;
                (i, body)
            });
        }

        let mut seen = 0;
        while let Some(result) = tasks.join_next().await {
            let (i, body) = result.unwrap();
            match i % 3 {
                0 => assert_eq!(
                    body["candidates"][0]["content"]["parts"][0]["text"],
                    format!("prompt {i}")
                ),
                1 => assert_eq!(body["transcript"], format!("CLIP {i}")),
                _ => assert_eq!(body["translation"], format!("[es] line {i}")),
            }
            seen += 1;
        }
        assert_eq!(seen, 24);
    }

    #[tokio::test]
    async fn services_lists_all_operations() {
        let response = send(app(false), Request::get("/api/services").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 8);
        assert_eq!(body[0]["value"], "tts");
    }

    #[tokio::test]
    async fn health_reports_version() {
        let response = send(app(false), Request::get("/api/health").body(Body::empty()).unwrap()).await;
        let body = read_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn any_origin_is_allowed() {
        let request = Request::post("/api/gemini")
            .header(header::ORIGIN, "https://example.com")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"prompt":"hi"}"#))
            .unwrap();
        let response = send(app(false), request).await;
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
