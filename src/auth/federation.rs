//! Federated sign-in against an OAuth identity provider (Google-shaped).
//!
//! A login attempt moves through a short-lived handshake: the client is
//! redirected to the provider with a single-use `state` token, the provider
//! calls back with `state` and an authorization `code`, the code is
//! exchanged for the asserted identity (email + display name), and the
//! asserted email is reconciled with the local account table. The `state`
//! token is the only server-side record of an in-flight attempt; it expires
//! after ten minutes and is consumed on first use.
//!
//! Reconciliation is keyed on the lowercased email alone: an existing
//! account (password or federated) is signed in as-is, a missing one is
//! created without a password hash. Creation is a single atomic upsert, so
//! two concurrent callbacks for the same new email yield one account.

use crate::error::AppError;
use crate::models::{normalize_email, User, USER_COLUMNS};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::env;
use std::sync::Mutex;
use uuid::Uuid;

/// How long a redirect may stay outstanding before its state token lapses.
const STATE_LIFETIME_MINUTES: i64 = 10;

/// Identity-provider endpoints and client credentials, from the environment.
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl ProviderConfig {
    /// Reads the Google client settings. Returns `None` when the deployment
    /// has no federation configured; the endpoints then answer with a
    /// federation failure instead of panicking at startup.
    pub fn from_env() -> Option<Self> {
        let client_id = env::var("GOOGLE_CLIENT_ID").ok()?;
        let client_secret = env::var("GOOGLE_CLIENT_SECRET").ok()?;
        let redirect_uri = env::var("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:8080/api/auth/google/callback".to_string());
        Some(Self {
            client_id,
            client_secret,
            redirect_uri,
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
        })
    }
}

/// The identity the provider asserts for a completed handshake.
#[derive(Debug, Deserialize)]
pub struct ProviderIdentity {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

/// Shared federation state: provider settings, the outbound HTTP client and
/// the in-flight state tokens. The mutex guards only synchronous map
/// operations and is never held across an await.
pub struct FederationState {
    config: Option<ProviderConfig>,
    client: reqwest::Client,
    pending: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl FederationState {
    pub fn new(config: Option<ProviderConfig>) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(ProviderConfig::from_env())
    }

    fn config(&self) -> Result<&ProviderConfig, AppError> {
        self.config
            .as_ref()
            .ok_or_else(|| AppError::FederationFailed("identity provider not configured".into()))
    }

    /// Starts a login attempt: issues a fresh state token and builds the
    /// provider authorization URL to redirect the client to.
    pub fn authorization_redirect(&self) -> Result<String, AppError> {
        let config = self.config()?;
        let state = Uuid::new_v4().to_string();

        {
            let mut pending = self
                .pending
                .lock()
                .map_err(|_| AppError::Internal("federation state store poisoned".into()))?;
            let cutoff = Utc::now() - Duration::minutes(STATE_LIFETIME_MINUTES);
            pending.retain(|_, issued_at| *issued_at > cutoff);
            pending.insert(state.clone(), Utc::now());
        }

        let url = reqwest::Url::parse_with_params(
            &config.auth_url,
            &[
                ("client_id", config.client_id.as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to build authorization URL: {}", e)))?;

        Ok(url.to_string())
    }

    /// Consumes a state token returned by the provider callback. A token is
    /// valid exactly once and only within its lifetime.
    pub fn consume_state(&self, state: &str) -> Result<bool, AppError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| AppError::Internal("federation state store poisoned".into()))?;
        match pending.remove(state) {
            Some(issued_at) => {
                Ok(issued_at > Utc::now() - Duration::minutes(STATE_LIFETIME_MINUTES))
            }
            None => Ok(false),
        }
    }

    /// Exchanges the authorization code for the provider-asserted identity.
    pub async fn fetch_identity(&self, code: &str) -> Result<ProviderIdentity, AppError> {
        let config = self.config()?;

        let response = self
            .client
            .post(&config.token_url)
            .form(&[
                ("code", code),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::FederationFailed(format!(
                "token exchange returned {}",
                response.status()
            )));
        }

        let exchange: TokenExchangeResponse = response.json().await?;

        let response = self
            .client
            .get(&config.userinfo_url)
            .bearer_auth(&exchange.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::FederationFailed(format!(
                "userinfo request returned {}",
                response.status()
            )));
        }

        let identity: ProviderIdentity = response.json().await?;
        if identity.email.is_empty() {
            return Err(AppError::FederationFailed(
                "provider asserted no email".into(),
            ));
        }

        Ok(identity)
    }

    #[cfg(test)]
    fn insert_state_issued_at(&self, state: &str, issued_at: DateTime<Utc>) {
        self.pending
            .lock()
            .unwrap()
            .insert(state.to_string(), issued_at);
    }
}

/// Resolves the asserted email to a local account, creating one when absent.
///
/// The upsert's no-op conflict action makes RETURNING yield the existing row,
/// so find-or-create is one atomic statement: concurrent callbacks for the
/// same brand-new email cannot create two accounts. An existing account is
/// returned untouched: its name and (possibly present) password hash are
/// kept, since the email is the sole federation key.
pub async fn find_or_create_user(
    pool: &PgPool,
    email: &str,
    display_name: Option<&str>,
) -> Result<User, AppError> {
    let email = normalize_email(email);
    let name = match display_name {
        Some(name) if !name.trim().is_empty() => name.trim().chars().take(50).collect::<String>(),
        // Fall back to the email local part when the provider sends no name.
        _ => email
            .split('@')
            .next()
            .unwrap_or(&email)
            .chars()
            .take(50)
            .collect::<String>(),
    };

    let sql = format!(
        "INSERT INTO users (email, name) VALUES ($1, $2)
         ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
         RETURNING {}",
        USER_COLUMNS
    );

    let user = sqlx::query_as::<_, User>(&sql)
        .bind(&email)
        .bind(&name)
        .fetch_one(pool)
        .await?;

    Ok(user)
}
