//! Bearer tokens for Google Cloud REST calls.
//!
//! Resolution order:
//! - `GOOGLE_ACCESS_TOKEN` (static token)
//! - `GOOGLE_APPLICATION_CREDENTIALS`, then the gcloud ADC file
//! - the GCE / Cloud Run metadata server

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::ProviderError;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, ProviderError>;

    /// Quota project named by the credentials, if any.
    fn quota_project(&self) -> Option<&str> {
        None
    }
}

/// A token supplied up front, used as-is for every call.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, ProviderError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone)]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
    MetadataServer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub quota_project_id: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Clone)]
struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at - Duration::minutes(5)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

impl From<TokenResponse> for AccessToken {
    fn from(response: TokenResponse) -> Self {
        Self {
            token: response.access_token,
            expires_at: Utc::now() + Duration::seconds(response.expires_in),
        }
    }
}

/// OAuth2 token source for application credentials, caching each token until
/// shortly before it expires.
pub struct GoogleAuth {
    credentials: Credentials,
    http: reqwest::Client,
    cache: RwLock<Option<AccessToken>>,
}

impl GoogleAuth {
    pub fn new(credentials: Credentials, http: reqwest::Client) -> Self {
        Self {
            credentials,
            http,
            cache: RwLock::new(None),
        }
    }

    /// Pick a token source from the process environment.
    pub fn discover(http: reqwest::Client) -> Result<Arc<dyn TokenSource>, ProviderError> {
        if let Ok(token) = std::env::var("GOOGLE_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                tracing::info!("Using access token from GOOGLE_ACCESS_TOKEN");
                return Ok(Arc::new(StaticToken::new(token.trim())));
            }
        }

        let credentials = match credentials_file() {
            Some(path) => {
                tracing::info!("Using credentials from {}", path.display());
                Self::load_credentials(&path)?
            }
            None => {
                tracing::info!("No credentials file found, using the metadata server");
                Credentials::MetadataServer
            }
        };

        Ok(Arc::new(Self::new(credentials, http)))
    }

    pub fn load_credentials(path: &Path) -> Result<Credentials, ProviderError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::Auth(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse_credentials(&contents)
    }

    pub fn parse_credentials(json: &str) -> Result<Credentials, ProviderError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ProviderError::Auth(format!("Invalid credentials JSON: {}", e)))?;

        let parse_err = |e: serde_json::Error| ProviderError::Auth(e.to_string());
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .map(str::to_owned);
        match kind.as_deref() {
            Some("service_account") => Ok(Credentials::ServiceAccount(
                serde_json::from_value(value).map_err(parse_err)?,
            )),
            Some("authorized_user") => Ok(Credentials::AuthorizedUser(
                serde_json::from_value(value).map_err(parse_err)?,
            )),
            Some(other) => Err(ProviderError::Auth(format!(
                "Unsupported credential type '{}'",
                other
            ))),
            None => Err(ProviderError::Auth("Credential type missing".to_string())),
        }
    }

    async fn fetch(&self) -> Result<AccessToken, ProviderError> {
        let response = match &self.credentials {
            Credentials::ServiceAccount(key) => {
                let assertion = service_account_assertion(key, Utc::now().timestamp())?;
                let params = [
                    ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                    ("assertion", assertion.as_str()),
                ];
                self.http.post(&key.token_uri).form(&params).send().await?
            }
            Credentials::AuthorizedUser(user) => {
                let params = [
                    ("client_id", user.client_id.as_str()),
                    ("client_secret", user.client_secret.as_str()),
                    ("refresh_token", user.refresh_token.as_str()),
                    ("grant_type", "refresh_token"),
                ];
                self.http
                    .post(&user.token_uri)
                    .form(&params)
                    .send()
                    .await?
            }
            Credentials::MetadataServer => {
                let host = std::env::var("GCE_METADATA_HOST")
                    .unwrap_or_else(|_| DEFAULT_METADATA_HOST.to_string());
                let url = format!(
                    "http://{}/computeMetadata/v1/instance/service-accounts/default/token",
                    host
                );
                self.http
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await?
            }
        };

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let reason = ProviderError::from_response(status, &body);
            return Err(ProviderError::Auth(reason.to_string()));
        }

        let token: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| ProviderError::Auth(format!("Invalid token response: {}", e)))?;
        Ok(token.into())
    }
}

#[async_trait]
impl TokenSource for GoogleAuth {
    async fn access_token(&self) -> Result<String, ProviderError> {
        {
            let cache = self.cache.read().await;
            if let Some(token) = cache.as_ref().filter(|t| !t.is_expired()) {
                return Ok(token.token.clone());
            }
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(token) = cache.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.token.clone());
        }

        tracing::debug!("Fetching new access token");
        let token = self.fetch().await?;
        let value = token.token.clone();
        *cache = Some(token);
        Ok(value)
    }

    fn quota_project(&self) -> Option<&str> {
        match &self.credentials {
            Credentials::AuthorizedUser(user) => user.quota_project_id.as_deref(),
            _ => None,
        }
    }
}

fn credentials_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|dir| dir.join("gcloud").join("application_default_credentials.json"))
        .filter(|path| path.exists())
}

fn service_account_assertion(key: &ServiceAccountKey, now: i64) -> Result<String, ProviderError> {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    #[derive(Serialize)]
    struct Claims<'a> {
        iss: &'a str,
        scope: &'a str,
        aud: &'a str,
        exp: i64,
        iat: i64,
    }

    let claims = Claims {
        iss: &key.client_email,
        scope: CLOUD_PLATFORM_SCOPE,
        aud: &key.token_uri,
        exp: now + 3600,
        iat: now,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| ProviderError::Auth(format!("Invalid service account key: {}", e)))?;
    encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| ProviderError::Auth(format!("Failed to sign assertion: {}", e)))
}
