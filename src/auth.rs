//! Credential provider for the Drive API.
//!
//! An [`Authenticator`] is the opaque authenticated handle the HTTP store
//! carries. It is built from a service account document (in memory, from a
//! file, or from the file named by `GOOGLE_APPLICATION_CREDENTIALS`) or from
//! an access token obtained elsewhere.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::{DriveError, Result};
use crate::models::{ServiceAccountCredentials, TokenResponse};

/// Environment variable holding the path of a credentials file.
pub const CREDENTIALS_PATH_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Environment variable holding an inline credentials document.
pub const CREDENTIALS_JSON_ENV: &str = "GOOGLE_CREDENTIALS_JSON";

/// Default Google OAuth2 token endpoint.
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Read/write access to the storage hierarchy.
const DRIVE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/drive.file",
];

#[derive(Debug, Serialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    exp: u64,
    iat: u64,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: SystemTime,
}

#[derive(Clone)]
enum TokenSource {
    ServiceAccount {
        credentials: Arc<ServiceAccountCredentials>,
        cached: Arc<RwLock<Option<CachedToken>>>,
    },
    Static(String),
}

/// Authenticated handle used by [`DriveClient`](crate::client::DriveClient).
#[derive(Clone)]
pub struct Authenticator {
    source: TokenSource,
    client: Client,
}

impl Authenticator {
    /// Build from an in-memory service account JSON document.
    pub fn from_json(document: &str) -> Result<Self> {
        let credentials: ServiceAccountCredentials = serde_json::from_str(document)
            .map_err(|e| {
                DriveError::AuthenticationError(format!("invalid credentials document: {}", e))
            })?;
        Ok(Self::new(credentials))
    }

    /// Build from a service account JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DriveError::AuthenticationError(format!(
                "cannot read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Build from the file named by `GOOGLE_APPLICATION_CREDENTIALS`.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CREDENTIALS_PATH_ENV)
            .map_err(|_| DriveError::MissingEnvVar(CREDENTIALS_PATH_ENV.to_string()))?;
        Self::from_file(path)
    }

    /// Wrap an access token obtained outside this crate. It is never refreshed.
    pub fn from_access_token(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Static(token.into()),
            client: Client::new(),
        }
    }

    /// Create a new authenticator from parsed credentials.
    pub fn new(credentials: ServiceAccountCredentials) -> Self {
        Self {
            source: TokenSource::ServiceAccount {
                credentials: Arc::new(credentials),
                cached: Arc::new(RwLock::new(None)),
            },
            client: Client::new(),
        }
    }

    /// Get a valid access token, exchanging a fresh assertion when the cached
    /// one is within a minute of expiry.
    pub async fn get_access_token(&self) -> Result<String> {
        let (credentials, cached) = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ServiceAccount {
                credentials,
                cached,
            } => (credentials, cached),
        };

        {
            let guard = cached.read().await;
            if let Some(token) = guard.as_ref() {
                if token.expires_at > SystemTime::now() + Duration::from_secs(60) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let fresh = self.exchange(credentials).await?;
        *cached.write().await = Some(fresh.clone());
        Ok(fresh.access_token)
    }

    async fn exchange(&self, credentials: &ServiceAccountCredentials) -> Result<CachedToken> {
        let token_uri = credentials.token_uri.as_deref().unwrap_or(TOKEN_URI);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| DriveError::AuthenticationError(e.to_string()))?
            .as_secs();

        let claims = Claims {
            iss: credentials.client_email.clone(),
            scope: DRIVE_SCOPES.join(" "),
            aud: token_uri.to_string(),
            iat: now,
            exp: now + 3600,
        };

        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())?;
        let jwt = encode(&Header::new(Algorithm::RS256), &claims, &key)?;

        log::debug!("requesting access token for {}", credentials.client_email);

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", jwt.as_str()),
        ];
        let response = self
            .client
            .post(token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| DriveError::AuthenticationError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::AuthenticationError(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DriveError::AuthenticationError(e.to_string()))?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: SystemTime::now() + Duration::from_secs(token.expires_in),
        })
    }
}
