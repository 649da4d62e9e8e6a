//! Authentication negotiation for A2A calls.
//!
//! For each call the client picks the first supported scheme the agent
//! card declares (`apiKey`, then `oauth2`, then `none`) and produces the
//! request headers. OAuth2 uses the client-credentials grant against the
//! card's `tokenUrl`, with tokens cached per service id for the lifetime
//! of the client.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{A2AError, A2AResult};
use crate::key_manager::KeyManager;
use crate::types::{AgentAuthentication, AgentCard, AuthScheme};

/// Header used by the `apiKey` scheme.
pub(crate) const API_KEY_HEADER: &str = "X-Api-Key";

/// Tokens are refreshed this many seconds before their reported expiry.
pub(crate) const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// A cached OAuth access token. `expires_at` already has the safety
/// margin subtracted; `None` means the token never expires locally.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            None => true,
            Some(expiry) => expiry > now,
        }
    }
}

/// Per-client in-memory token cache, keyed by service id.
///
/// Reads and writes for the same service id are serialised by the mutex.
/// Two concurrent misses may both fetch a token; the insert keeps the
/// invariant that the cached value is always one complete, successfully
/// fetched token.
#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    entries: Mutex<HashMap<String, CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn get_live(&self, service_id: &str) -> Option<String> {
        let entries = self.entries.lock().await;
        let entry = entries.get(service_id)?;
        if entry.is_live(Instant::now()) {
            Some(entry.access_token.clone())
        } else {
            None
        }
    }

    async fn store(&self, service_id: &str, access_token: String, expires_in: Option<u64>) {
        let expires_at = expires_in.map(|secs| {
            Instant::now() + Duration::from_secs(secs).saturating_sub(TOKEN_EXPIRY_MARGIN)
        });
        let mut entries = self.entries.lock().await;
        entries.insert(
            service_id.to_string(),
            CachedToken {
                access_token,
                expires_at,
            },
        );
    }

    /// Test hook: pre-seed a token with an explicit expiry.
    #[cfg(test)]
    async fn seed(&self, service_id: &str, token: &str, expires_at: Option<Instant>) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            service_id.to_string(),
            CachedToken {
                access_token: token.to_string(),
                expires_at,
            },
        );
    }
}

/// Shape of a token endpoint success response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<serde_json::Value>,
    token_type: Option<String>,
    expires_in: Option<serde_json::Value>,
}

/// Build the auth headers for one call against `card`, resolving local
/// credentials through `keys`.
///
/// Scheme priority matches the protocol contract: `apiKey` if declared,
/// else `oauth2`, else `none`. A card that declares none of the schemes
/// this client supports fails with [`A2AError::Authentication`].
pub(crate) async fn auth_headers(
    http: &reqwest::Client,
    timeout: Duration,
    cache: &TokenCache,
    card: &AgentCard,
    keys: &KeyManager,
) -> A2AResult<HeaderMap> {
    let declared: Vec<AuthScheme> = card.auth_schemes.iter().map(|s| s.scheme).collect();
    debug!(agent = %card.human_readable_id, schemes = ?declared, "negotiating auth scheme");

    if let Some(scheme) = find_scheme(card, AuthScheme::ApiKey) {
        return api_key_headers(card, scheme, keys);
    }

    if let Some(scheme) = find_scheme(card, AuthScheme::OAuth2) {
        return oauth2_headers(http, timeout, cache, card, scheme, keys).await;
    }

    if find_scheme(card, AuthScheme::None).is_some() {
        debug!(agent = %card.human_readable_id, "using 'none' authentication scheme");
        return Ok(HeaderMap::new());
    }

    Err(A2AError::Authentication(format!(
        "no compatible authentication scheme for agent '{}'; agent supports {:?}, client supports [\"apiKey\", \"oauth2\", \"none\"]",
        card.human_readable_id, declared
    )))
}

fn find_scheme(card: &AgentCard, kind: AuthScheme) -> Option<&AgentAuthentication> {
    card.auth_schemes.iter().find(|s| s.scheme == kind)
}

fn api_key_headers(
    card: &AgentCard,
    scheme: &AgentAuthentication,
    keys: &KeyManager,
) -> A2AResult<HeaderMap> {
    let service_id = card.service_id_for(scheme);
    let api_key = keys.get_key(service_id).ok_or_else(|| {
        A2AError::Authentication(format!(
            "missing API key for service '{service_id}' required by agent '{}' (scheme: apiKey); check local configuration",
            card.human_readable_id
        ))
    })?;

    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&api_key).map_err(|_| {
        A2AError::Authentication(format!(
            "API key for service '{service_id}' contains characters not valid in a header"
        ))
    })?;
    headers.insert(API_KEY_HEADER, value);
    debug!(service_id = %service_id, "using apiKey scheme");
    Ok(headers)
}

async fn oauth2_headers(
    http: &reqwest::Client,
    timeout: Duration,
    cache: &TokenCache,
    card: &AgentCard,
    scheme: &AgentAuthentication,
    keys: &KeyManager,
) -> A2AResult<HeaderMap> {
    let service_id = card.service_id_for(scheme).to_string();
    let token_url = scheme.token_url.as_deref().ok_or_else(|| {
        A2AError::Authentication(format!(
            "agent card '{}' specifies oauth2 scheme but is missing 'tokenUrl'",
            card.human_readable_id
        ))
    })?;

    if let Some(token) = cache.get_live(&service_id).await {
        debug!(service_id = %service_id, "using cached OAuth token");
        return bearer_headers(&service_id, &token);
    }

    let client_id = keys.get_oauth_client_id(&service_id);
    let client_secret = keys.get_oauth_client_secret(&service_id);
    let (client_id, client_secret) = match (client_id, client_secret) {
        (Some(id), Some(secret)) => (id, secret),
        _ => {
            return Err(A2AError::Authentication(format!(
                "missing OAuth client id or client secret for service '{service_id}'; check local configuration"
            )))
        }
    };

    let mut form: Vec<(&str, String)> = vec![
        ("grant_type", "client_credentials".to_string()),
        ("client_id", client_id),
        ("client_secret", client_secret),
    ];
    if let Some(scopes) = scheme.scopes.as_deref().filter(|s| !s.is_empty()) {
        form.push(("scope", scopes.join(" ")));
    }

    debug!(service_id = %service_id, token_url = %token_url, "requesting OAuth token");
    let response = http
        .post(token_url)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .form(&form)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                A2AError::Authentication(format!(
                    "timeout connecting to token endpoint {token_url}: {e}"
                ))
            } else {
                A2AError::Authentication(format!(
                    "network error communicating with token endpoint {token_url}: {e}"
                ))
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        let detail: String = detail.chars().take(200).collect();
        return Err(match status.as_u16() {
            400 | 401 | 403 => A2AError::Authentication(format!(
                "invalid credentials or request for token endpoint {token_url} (HTTP {status}): {detail}"
            )),
            _ => A2AError::Authentication(format!(
                "token endpoint {token_url} returned server error (HTTP {status}): {detail}"
            )),
        });
    }

    let token: TokenResponse = response.json().await.map_err(|e| {
        A2AError::Authentication(format!(
            "invalid JSON response from token endpoint {token_url}: {e}"
        ))
    })?;

    let access_token = match token.access_token {
        Some(serde_json::Value::String(s)) if !s.is_empty() => s,
        _ => {
            return Err(A2AError::Authentication(format!(
                "invalid token response from {token_url}: missing 'access_token'"
            )))
        }
    };

    if let Some(token_type) = token.token_type.as_deref() {
        if !token_type.eq_ignore_ascii_case("bearer") {
            warn!(
                token_type = %token_type,
                token_url = %token_url,
                "token endpoint returned non-bearer token_type, proceeding anyway"
            );
        }
    }

    // expires_in may arrive as a number or be absent/garbage; only a
    // positive number produces a local expiry.
    let expires_in = token
        .expires_in
        .as_ref()
        .and_then(serde_json::Value::as_u64)
        .filter(|&secs| secs > 0);

    info!(service_id = %service_id, "obtained OAuth token");
    cache.store(&service_id, access_token.clone(), expires_in).await;

    bearer_headers(&service_id, &access_token)
}

fn bearer_headers(service_id: &str, token: &str) -> A2AResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
        A2AError::Authentication(format!(
            "OAuth token for service '{service_id}' contains characters not valid in a header"
        ))
    })?;
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}
