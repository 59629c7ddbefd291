//! Keeps a valid Google access token for Drive calls.
//!
//! Tokens live in ~/.config/rota/providers/drive/session.toml (mode 0600)
//! and are refreshed through Google's token endpoint when expired.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use rota_core::remote::{AccessToken, CredentialSource};
use rota_core::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app_config::{AppConfig, base_dir};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh a little early so a token never expires mid-request.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Serialize, Deserialize, Clone)]
pub struct SessionData {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn from_tokens(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        SessionData {
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Credential source backed by the session file.
pub struct Session {
    path: PathBuf,
    http: reqwest::Client,
}

impl Session {
    pub fn default_path() -> SyncResult<PathBuf> {
        Ok(base_dir()?.join("session.toml"))
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Session {
            path: path.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn at_default_path() -> SyncResult<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> SyncResult<SessionData> {
        if !self.path.exists() {
            return Err(SyncError::AuthenticationRequired);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        toml::from_str(&contents).map_err(|e| {
            SyncError::Config(format!(
                "Failed to parse session from {}: {e}",
                self.path.display()
            ))
        })
    }

    pub fn save(&self, data: &SessionData) -> SyncResult<()> {
        let contents = toml::to_string_pretty(data)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&self.path, contents)?;

        // Set to owner-only (0600) since file contains OAuth tokens:
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    pub fn sign_out(&self) -> SyncResult<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Exchange a refresh token for an access token and store both.
    pub async fn sign_in_with_refresh_token(&self, refresh_token: &str) -> SyncResult<()> {
        let data = self.refresh(refresh_token).await?;
        self.save(&data)?;
        info!(path = %self.path.display(), "stored Drive session");
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> SyncResult<SessionData> {
        let app = AppConfig::load()?;

        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", app.client_id.as_str()),
                ("client_secret", app.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| SyncError::NetworkFailure(format!("token refresh: {e}")))?;

        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 401 {
            // invalid_grant: the refresh token was revoked or expired
            return Err(SyncError::AuthenticationRequired);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Serialization(format!("token response: {e}")))?;

        // Google typically doesn't return a new refresh_token on refresh
        let refresh_token = tokens
            .refresh_token
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| refresh_token.to_string());

        Ok(SessionData::from_tokens(
            tokens.access_token,
            refresh_token,
            tokens.expires_in,
        ))
    }
}

impl CredentialSource for Session {
    async fn access_token(&self) -> SyncResult<AccessToken> {
        let data = self.load()?;

        if !data.is_expired(Utc::now()) {
            return Ok(AccessToken::new(data.access_token));
        }

        debug!("access token expired, refreshing");
        let refreshed = self.refresh(&data.refresh_token).await?;
        self.save(&refreshed)?;
        Ok(AccessToken::new(refreshed.access_token))
    }
}
