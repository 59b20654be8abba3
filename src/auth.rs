//! Service account authentication for Google APIs.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{DriveError, Result};
use crate::models::{ServiceAccountCredentials, TokenResponse};

/// Google OAuth2 token endpoint, used when the credentials file does not
/// name one.
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Google Drive API scope. Read-only: this crate only ever fetches.
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// JWT claims for service account authentication.
#[derive(Debug, Serialize)]
struct Claims {
    iss: String,   // Issuer (service account email)
    scope: String, // OAuth scope
    aud: String,   // Audience (token endpoint)
    exp: u64,      // Expiration time
    iat: u64,      // Issued at
}

/// Cached access token with expiration.
#[derive(Clone, Debug)]
struct CachedToken {
    access_token: String,
    expires_at: SystemTime,
}

/// Where access tokens come from.
#[derive(Debug)]
enum TokenSource {
    /// Service account credentials, exchanged for short-lived tokens.
    ServiceAccount(ServiceAccountCredentials),
    /// A fixed token supplied by the caller. Never refreshed.
    Static(String),
}

/// Authenticator for Google APIs using service account credentials.
#[derive(Clone, Debug)]
pub struct Authenticator {
    source: Arc<TokenSource>,
    client: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl Authenticator {
    /// Create a new authenticator from a service account JSON file.
    ///
    /// Fails with [`DriveError::MissingCredentialsFile`] when the file does
    /// not exist, so a bad setup surfaces before any download starts.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DriveError::MissingCredentialsFile(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let credentials: ServiceAccountCredentials = serde_json::from_str(&content)?;
        Ok(Self::new(credentials))
    }

    /// Create a new authenticator from credentials.
    pub fn new(credentials: ServiceAccountCredentials) -> Self {
        Self {
            source: Arc::new(TokenSource::ServiceAccount(credentials)),
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Create an authenticator around an existing access token.
    pub fn from_access_token(token: impl Into<String>) -> Self {
        Self {
            source: Arc::new(TokenSource::Static(token.into())),
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_access_token(&self) -> Result<String> {
        let credentials = match self.source.as_ref() {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ServiceAccount(credentials) => credentials,
        };

        // Check if we have a valid cached token
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                // Add 60 second buffer before expiration
                let buffer = Duration::from_secs(60);
                if token.expires_at > SystemTime::now() + buffer {
                    return Ok(token.access_token.clone());
                }
            }
        }

        // Refresh the token
        debug!("refreshing access token for {}", credentials.client_email);
        let new_token = self.refresh_token(credentials).await?;

        // Cache the new token
        {
            let mut cached = self.cached_token.write().await;
            *cached = Some(new_token.clone());
        }

        Ok(new_token.access_token)
    }

    /// Refresh the access token using JWT assertion.
    async fn refresh_token(&self, credentials: &ServiceAccountCredentials) -> Result<CachedToken> {
        let token_uri = credentials.token_uri.as_deref().unwrap_or(TOKEN_URI);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| DriveError::TokenRefreshError(format!("system clock error: {}", e)))?
            .as_secs();

        let claims = Claims {
            iss: credentials.client_email.clone(),
            scope: DRIVE_SCOPE.to_string(),
            aud: token_uri.to_string(),
            iat: now,
            exp: now + 3600, // 1 hour
        };

        // Create JWT
        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())?;
        let jwt = encode(&header, &claims, &key)?;

        // Exchange JWT for access token
        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", &jwt),
        ];

        let response = self.client.post(token_uri).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::TokenRefreshError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response.json().await?;

        let expires_at = SystemTime::now() + Duration::from_secs(token_response.expires_in);

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at,
        })
    }
}
