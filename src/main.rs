use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod google;

use api::routes::{create_router, AppState};
use config::Config;
use google::{auth::GoogleAuth, GoogleClient, TokenSource};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().expect("Invalid configuration");
    let addr = config.addr().expect("Invalid address");

    tracing::info!("Cloud AI Cockpit v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Starting server on http://{}", addr);
    tracing::info!(
        "Vertex AI project: {}, location: {}",
        config.project.as_deref().unwrap_or("<unset>"),
        config.location
    );
    tracing::info!("Static directory: {}", config.static_dir.display());

    // Provider clients share one connection pool and token source
    let http = reqwest::Client::builder()
        .user_agent(concat!("cloud-ai-cockpit/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to build HTTP client");
    let tokens = GoogleAuth::discover(http.clone()).expect("Failed to load Google credentials");
    let quota_project = config
        .quota_project
        .clone()
        .or_else(|| tokens.quota_project().map(String::from));
    if let Some(project) = &quota_project {
        tracing::info!("Quota project: {}", project);
    }
    let client = GoogleClient::new(http, tokens, quota_project);

    let state = Arc::new(AppState::google(&config, client));
    let app = create_router(state, &config.static_dir, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
