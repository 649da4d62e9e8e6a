//! Credential resolution from layered sources.
//!
//! The [`KeyManager`] loads API keys and OAuth client credentials from, in
//! priority order: a key file (`.env` or `.json`), environment variables,
//! and (on demand) the OS keyring. File and environment sources are parsed
//! once at construction; keyring lookups happen lazily on first request and
//! are memoised. Once a credential is resolved for a service id, the source
//! binding is sticky for the lifetime of the manager.
//!
//! Load failures are logged and non-fatal; only keyring *writes* surface an
//! error ([`A2AError::Credential`]).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, error, info, warn};

use crate::error::{A2AError, A2AResult};

/// Default environment variable prefix for API keys
/// (`AGENTVAULT_KEY_OPENAI=sk-...`).
pub const DEFAULT_ENV_PREFIX: &str = "AGENTVAULT_KEY_";

/// Default environment variable prefix for OAuth client ids.
pub const DEFAULT_OAUTH_CLIENT_ID_PREFIX: &str = "AGENTVAULT_OAUTH_CLIENT_ID_";

/// Default environment variable prefix for OAuth client secrets.
pub const DEFAULT_OAUTH_CLIENT_SECRET_PREFIX: &str = "AGENTVAULT_OAUTH_CLIENT_SECRET_";

/// File key suffix that routes an entry to the OAuth client-id map.
const FILE_OAUTH_CLIENT_ID_SUFFIX: &str = "_oauth_client_id";

/// File key suffix that routes an entry to the OAuth client-secret map.
const FILE_OAUTH_CLIENT_SECRET_SUFFIX: &str = "_oauth_client_secret";

/// Where a credential was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Loaded from the configured key file.
    File,
    /// Loaded from an environment variable.
    Env,
    /// Loaded from the OS keyring.
    Keyring,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::File => write!(f, "file"),
            KeySource::Env => write!(f, "env"),
            KeySource::Keyring => write!(f, "keyring"),
        }
    }
}

/// Which credential kind a lookup refers to. API keys, OAuth client ids,
/// and OAuth client secrets resolve independently, so one service id may
/// end up with a different source for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CredentialKind {
    ApiKey,
    OAuthClientId,
    OAuthClientSecret,
}

/// One resolved credential and the source it was bound to.
#[derive(Debug, Clone)]
struct KeyEntry {
    secret: String,
    source: KeySource,
}

/// Cached credential maps, keyed by (kind, case-folded service id).
#[derive(Debug, Default)]
struct Credentials {
    entries: HashMap<(CredentialKind, String), KeyEntry>,
}

impl Credentials {
    fn get(&self, kind: CredentialKind, id: &str) -> Option<&KeyEntry> {
        self.entries.get(&(kind, id.to_string()))
    }

    /// Insert unless an entry from an earlier (higher-priority) source is
    /// already bound.
    fn insert_if_absent(&mut self, kind: CredentialKind, id: String, entry: KeyEntry) -> bool {
        use std::collections::hash_map::Entry;
        match self.entries.entry((kind, id)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }
}

/// Builder for [`KeyManager`].
#[derive(Debug, Clone)]
pub struct KeyManagerBuilder {
    key_file_path: Option<PathBuf>,
    use_env_vars: bool,
    use_keyring: bool,
    env_prefix: String,
    oauth_client_id_prefix: String,
    oauth_client_secret_prefix: String,
}

impl Default for KeyManagerBuilder {
    fn default() -> Self {
        Self {
            key_file_path: None,
            use_env_vars: true,
            use_keyring: false,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            oauth_client_id_prefix: DEFAULT_OAUTH_CLIENT_ID_PREFIX.to_string(),
            oauth_client_secret_prefix: DEFAULT_OAUTH_CLIENT_SECRET_PREFIX.to_string(),
        }
    }
}

impl KeyManagerBuilder {
    /// Load keys from a `.env` or `.json` file. File keys take precedence
    /// over every other source.
    pub fn key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file_path = Some(path.into());
        self
    }

    /// Enable or disable environment variable loading (default: enabled).
    pub fn env_vars(mut self, enabled: bool) -> Self {
        self.use_env_vars = enabled;
        self
    }

    /// Enable or disable the OS keyring as a fallback source
    /// (default: disabled). Silently downgrades to disabled when keyring
    /// support is not compiled in (`os-keyring` feature).
    pub fn keyring(mut self, enabled: bool) -> Self {
        self.use_keyring = enabled;
        self
    }

    /// Override the environment prefix for API keys.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Override the environment prefixes for OAuth client id / secret.
    pub fn oauth_env_prefixes(
        mut self,
        client_id_prefix: impl Into<String>,
        client_secret_prefix: impl Into<String>,
    ) -> Self {
        self.oauth_client_id_prefix = client_id_prefix.into();
        self.oauth_client_secret_prefix = client_secret_prefix.into();
        self
    }

    /// Build the manager, loading file and environment sources now.
    /// Load errors are logged and non-fatal; a manager is always returned.
    pub fn build(self) -> KeyManager {
        let use_keyring = if self.use_keyring && !keyring_available() {
            warn!(
                "keyring usage requested, but OS keyring support is not available; \
                 enable the 'os-keyring' feature"
            );
            false
        } else {
            self.use_keyring
        };

        let manager = KeyManager {
            use_keyring,
            env_prefix: self.env_prefix,
            oauth_client_id_prefix: self.oauth_client_id_prefix,
            oauth_client_secret_prefix: self.oauth_client_secret_prefix,
            credentials: Mutex::new(Credentials::default()),
        };

        // File first, then env. insert_if_absent keeps file entries sticky.
        if let Some(ref path) = self.key_file_path {
            manager.load_from_file(path);
        }
        if self.use_env_vars {
            manager.load_from_env();
        }
        manager
    }
}

/// Resolves per-service API keys and OAuth client credentials from layered
/// sources: key file > environment > OS keyring.
///
/// # Example
///
/// ```no_run
/// use agentvault::KeyManager;
///
/// let keys = KeyManager::builder()
///     .key_file("/etc/agentvault/keys.env")
///     .keyring(true)
///     .build();
///
/// if let Some(key) = keys.get_key("openai") {
///     // use the key
/// }
/// ```
#[derive(Debug)]
pub struct KeyManager {
    use_keyring: bool,
    env_prefix: String,
    oauth_client_id_prefix: String,
    oauth_client_secret_prefix: String,
    // Read-mostly after construction; the mutex serialises memoisation of
    // lazy keyring hits.
    credentials: Mutex<Credentials>,
}

impl KeyManager {
    /// Build a manager with default options (environment variables only).
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a manager.
    pub fn builder() -> KeyManagerBuilder {
        KeyManagerBuilder::default()
    }

    /// Whether keyring lookups are enabled on this manager.
    pub fn uses_keyring(&self) -> bool {
        self.use_keyring
    }

    /// Retrieve the API key for a service id (case-insensitive).
    ///
    /// Checks the file/env-loaded cache first; if the key is absent and
    /// keyring support is enabled, queries the OS keyring and memoises a
    /// hit. Returns `None` when no source has the key.
    pub fn get_key(&self, service_id: &str) -> Option<String> {
        self.resolve(CredentialKind::ApiKey, service_id)
    }

    /// The source the API key for `service_id` was resolved from, if it
    /// has been resolved at all (keyring-backed keys are only bound after
    /// a [`get_key`](Self::get_key) call).
    pub fn get_key_source(&self, service_id: &str) -> Option<KeySource> {
        let id = fold_id(service_id);
        let credentials = self.credentials.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        credentials
            .get(CredentialKind::ApiKey, &id)
            .map(|entry| entry.source)
    }

    /// Retrieve the OAuth client id for a service id.
    pub fn get_oauth_client_id(&self, service_id: &str) -> Option<String> {
        self.resolve(CredentialKind::OAuthClientId, service_id)
    }

    /// Retrieve the OAuth client secret for a service id.
    pub fn get_oauth_client_secret(&self, service_id: &str) -> Option<String> {
        self.resolve(CredentialKind::OAuthClientSecret, service_id)
    }

    /// Store or update an API key in the OS keyring.
    ///
    /// # Errors
    ///
    /// Returns [`A2AError::Credential`] when keyring support is disabled or
    /// unavailable, or when the underlying store rejects the write.
    pub fn set_key_in_keyring(&self, service_id: &str, secret: &str) -> A2AResult<()> {
        if !self.use_keyring {
            return Err(A2AError::Credential(
                "keyring support is not enabled for this KeyManager".to_string(),
            ));
        }
        let id = fold_id(service_id);
        keyring_set(&keyring_service_name(&id), &id, secret).map_err(|e| {
            error!(service_id = %id, error = %e, "failed to store key in OS keyring");
            A2AError::Credential(format!("failed to set key in keyring for '{id}': {e}"))
        })?;
        info!(service_id = %id, "stored key in OS keyring");
        // Refresh the memoised entry so subsequent reads see the new value.
        let mut credentials = self.credentials.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        credentials.entries.insert(
            (CredentialKind::ApiKey, id),
            KeyEntry {
                secret: secret.to_string(),
                source: KeySource::Keyring,
            },
        );
        Ok(())
    }

    // -- Resolution --

    fn resolve(&self, kind: CredentialKind, service_id: &str) -> Option<String> {
        let id = fold_id(service_id);
        {
            let credentials = self.credentials.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(entry) = credentials.get(kind, &id) {
                debug!(service_id = %id, source = %entry.source, "returning cached credential");
                return Some(entry.secret.clone());
            }
        }

        if !self.use_keyring {
            debug!(service_id = %id, "credential not found in any configured source");
            return None;
        }

        // Lock dropped during the (potentially slow) keyring query; the
        // memoisation below re-checks so a concurrent hit is not clobbered
        // by a racing miss.
        let fetched = self.load_from_keyring(kind, &id)?;
        let mut credentials = self.credentials.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = credentials
            .entries
            .entry((kind, id.clone()))
            .or_insert(KeyEntry {
                secret: fetched,
                source: KeySource::Keyring,
            });
        Some(entry.secret.clone())
    }

    // -- Loaders --

    fn load_from_file(&self, path: &Path) {
        debug!(path = %path.display(), "loading credentials from key file");
        if !path.exists() {
            warn!(path = %path.display(), "key file specified but not found");
            return;
        }
        if !path.is_file() {
            warn!(path = %path.display(), "key file path is not a file");
            return;
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("env") => self.load_env_format(path),
            Some("json") => self.load_json_format(path),
            other => {
                warn!(
                    path = %path.display(),
                    extension = other.unwrap_or(""),
                    "unsupported key file extension, only .env and .json are supported"
                );
            }
        }
    }

    fn load_env_format(&self, path: &Path) {
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read .env key file");
                return;
            }
        };

        let mut loaded = 0usize;
        for item in iter {
            match item {
                Ok((key, value)) => {
                    if value.is_empty() {
                        warn!(key = %key, "skipping empty value in key file");
                        continue;
                    }
                    if self.store_file_entry(&key, value) {
                        loaded += 1;
                    }
                }
                Err(e) => {
                    // Malformed line; keep going with the rest of the file.
                    error!(path = %path.display(), error = %e, "error parsing .env key file line");
                }
            }
        }
        debug!(count = loaded, "finished loading .env key file");
    }

    fn load_json_format(&self, path: &Path) {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read JSON key file");
                return;
            }
        };
        let data: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to decode JSON key file");
                return;
            }
        };
        let object = match data.as_object() {
            Some(object) => object,
            None => {
                error!(
                    path = %path.display(),
                    "invalid JSON key file: root element must be an object"
                );
                return;
            }
        };

        let mut loaded = 0usize;
        for (key, value) in object {
            match value {
                serde_json::Value::String(s) if !s.is_empty() => {
                    if self.store_file_entry(key, s.clone()) {
                        loaded += 1;
                    }
                }
                serde_json::Value::String(_) => {
                    warn!(key = %key, "skipping empty string value in JSON key file");
                }
                other => {
                    warn!(
                        key = %key,
                        value_type = %json_type(other),
                        "skipping non-string value in JSON key file"
                    );
                }
            }
        }
        debug!(count = loaded, "finished loading JSON key file");
    }

    /// Route a file entry into the right credential map based on its name.
    /// Returns whether the entry was stored.
    fn store_file_entry(&self, raw_key: &str, value: String) -> bool {
        let folded = fold_id(raw_key);
        let (kind, id) = if let Some(stem) = folded.strip_suffix(FILE_OAUTH_CLIENT_ID_SUFFIX) {
            (CredentialKind::OAuthClientId, stem.to_string())
        } else if let Some(stem) = folded.strip_suffix(FILE_OAUTH_CLIENT_SECRET_SUFFIX) {
            (CredentialKind::OAuthClientSecret, stem.to_string())
        } else {
            (CredentialKind::ApiKey, folded)
        };

        if id.is_empty() {
            warn!(key = %raw_key, "skipping key file entry with empty service id");
            return false;
        }

        let mut credentials = self.credentials.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let stored = credentials.insert_if_absent(
            kind,
            id.clone(),
            KeyEntry {
                secret: value,
                source: KeySource::File,
            },
        );
        if stored {
            info!(service_id = %id, "loaded credential from key file");
        }
        stored
    }

    fn load_from_env(&self) {
        debug!(prefix = %self.env_prefix, "loading credentials from environment");
        let prefixes = [
            (CredentialKind::ApiKey, self.env_prefix.as_str()),
            (
                CredentialKind::OAuthClientId,
                self.oauth_client_id_prefix.as_str(),
            ),
            (
                CredentialKind::OAuthClientSecret,
                self.oauth_client_secret_prefix.as_str(),
            ),
        ];

        let mut loaded = 0usize;
        for (name, value) in std::env::vars() {
            // The client-id/secret prefixes share a stem with the key
            // prefix in some deployments; the longest matching prefix wins.
            let mut matched: Option<(CredentialKind, &str, usize)> = None;
            for (kind, prefix) in &prefixes {
                if let Some(rest) = name.strip_prefix(prefix) {
                    if matched.map_or(true, |(_, _, len)| prefix.len() > len) {
                        matched = Some((*kind, rest, prefix.len()));
                    }
                }
            }
            let (kind, id_part) = match matched {
                Some((kind, rest, _)) => (kind, rest),
                None => continue,
            };

            if id_part.is_empty() {
                warn!(variable = %name, "skipping environment variable with empty service id part");
                continue;
            }
            if value.is_empty() {
                warn!(variable = %name, "skipping environment variable with empty value");
                continue;
            }

            let id = fold_id(id_part);
            let mut credentials = self.credentials.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if credentials.insert_if_absent(
                kind,
                id.clone(),
                KeyEntry {
                    secret: value,
                    source: KeySource::Env,
                },
            ) {
                info!(service_id = %id, "loaded credential from environment variable");
                loaded += 1;
            } else {
                debug!(
                    service_id = %id,
                    "credential already loaded from key file, skipping environment variable"
                );
            }
        }
        debug!(count = loaded, "finished loading environment credentials");
    }

    fn load_from_keyring(&self, kind: CredentialKind, id: &str) -> Option<String> {
        let (service, user) = keyring_location(kind, id);
        debug!(service = %service, user = %user, "querying OS keyring");
        match keyring_get(&service, &user) {
            Ok(Some(secret)) => {
                info!(service_id = %id, "loaded credential from OS keyring");
                Some(secret)
            }
            Ok(None) => {
                debug!(service_id = %id, "credential not found in OS keyring");
                None
            }
            Err(e) => {
                // Keyring read failures are non-fatal by design contract.
                error!(service_id = %id, error = %e, "failed to query OS keyring");
                None
            }
        }
    }
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}

/// ASCII case-fold, matching how service ids are normalised on ingest and
/// lookup. Unicode-aware folding is intentionally not used.
fn fold_id(id: &str) -> String {
    id.to_ascii_lowercase()
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Keyring service name for an API key.
fn keyring_service_name(id: &str) -> String {
    format!("agentvault:{id}")
}

/// Keyring (service, user) pair for a credential kind.
fn keyring_location(kind: CredentialKind, id: &str) -> (String, String) {
    match kind {
        CredentialKind::ApiKey => (keyring_service_name(id), id.to_string()),
        CredentialKind::OAuthClientId => (format!("agentvault:oauth:{id}"), "client_id".to_string()),
        CredentialKind::OAuthClientSecret => {
            (format!("agentvault:oauth:{id}"), "client_secret".to_string())
        }
    }
}

// -- Keyring backend (feature-gated) --

#[cfg(feature = "os-keyring")]
fn keyring_available() -> bool {
    true
}

#[cfg(feature = "os-keyring")]
fn keyring_get(service: &str, user: &str) -> Result<Option<String>, String> {
    let entry = keyring::Entry::new(service, user).map_err(|e| e.to_string())?;
    match entry.get_password() {
        Ok(secret) => Ok(Some(secret)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(feature = "os-keyring")]
fn keyring_set(service: &str, user: &str, secret: &str) -> Result<(), String> {
    let entry = keyring::Entry::new(service, user).map_err(|e| e.to_string())?;
    entry.set_password(secret).map_err(|e| e.to_string())
}

#[cfg(not(feature = "os-keyring"))]
fn keyring_available() -> bool {
    false
}

#[cfg(not(feature = "os-keyring"))]
fn keyring_get(_service: &str, _user: &str) -> Result<Option<String>, String> {
    Ok(None)
}

#[cfg(not(feature = "os-keyring"))]
fn keyring_set(_service: &str, _user: &str, _secret: &str) -> Result<(), String> {
    Err("keyring support is not compiled in (enable the 'os-keyring' feature)".to_string())
}
