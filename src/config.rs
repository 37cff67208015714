use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// Model names used by the three generative endpoints.
#[derive(Debug, Clone)]
pub struct ModelNames {
    pub gemini: String,
    pub imagen: String,
    pub veo: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub project: Option<String>,
    /// Billing project sent as `x-goog-user-project`; unset means none is sent.
    pub quota_project: Option<String>,
    pub location: String,
    pub models: ModelNames,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub video_poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let project = lookup("GCP_PROJECT")
            .or_else(|| lookup("GOOGLE_CLOUD_PROJECT"))
            .filter(|v| !v.trim().is_empty());
        let quota_project = lookup("GOOGLE_CLOUD_QUOTA_PROJECT").filter(|v| !v.trim().is_empty());

        let poll_secs: u64 = parse(
            "VIDEO_POLL_INTERVAL_SECS",
            &var("VIDEO_POLL_INTERVAL_SECS", "5"),
        )?;
        if poll_secs == 0 {
            return Err(AppError::Config(
                "VIDEO_POLL_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            host: var("HOST", "0.0.0.0"),
            port: parse("PORT", &var("PORT", "8080"))?,
            project,
            quota_project,
            location: var("VERTEX_LOCATION", "us-central1"),
            models: ModelNames {
                gemini: var("GEMINI_MODEL", "gemini-pro"),
                imagen: var("IMAGEN_MODEL", "imagen-2.0"),
                veo: var("VEO_MODEL", "veo-1.5"),
            },
            static_dir: var("STATIC_DIR", "static").into(),
            max_upload_bytes: parse("MAX_UPLOAD_BYTES", &var("MAX_UPLOAD_BYTES", "52428800"))?,
            video_poll_interval: Duration::from_secs(poll_secs),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid address: {}", e)))
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a number, got '{}'", key, value)))
}
