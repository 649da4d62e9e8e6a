//! Ergonomic builders for agent cards and servers.

use crate::error::A2AResult;
use crate::types::{AgentAuthentication, AgentCapabilities, AgentCard, AuthScheme};

/// Schema version written by [`AgentCardBuilder`].
const CARD_SCHEMA_VERSION: &str = "1.0";

/// A2A protocol version advertised by default.
const DEFAULT_A2A_VERSION: &str = "0.2";

/// Builder for [`AgentCard`].
///
/// # Example
///
/// ```
/// use agentvault::AgentCardBuilder;
///
/// let card = AgentCardBuilder::new("my-org/echo", "Echo Agent")
///     .description("Echoes messages back")
///     .url("https://agents.example.com/a2a")
///     .with_api_key_auth(Some("echo-svc"))
///     .build()
///     .unwrap();
/// assert_eq!(card.human_readable_id, "my-org/echo");
/// ```
#[derive(Debug, Clone)]
pub struct AgentCardBuilder {
    human_readable_id: String,
    name: String,
    description: String,
    agent_version: String,
    url: String,
    a2a_version: String,
    mcp_version: Option<String>,
    supported_message_parts: Option<Vec<String>>,
    auth_schemes: Vec<AgentAuthentication>,
}

impl AgentCardBuilder {
    /// Start a card for the given id and display name.
    pub fn new(human_readable_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            human_readable_id: human_readable_id.into(),
            name: name.into(),
            description: String::new(),
            agent_version: "0.1.0".to_string(),
            url: String::new(),
            a2a_version: DEFAULT_A2A_VERSION.to_string(),
            mcp_version: None,
            supported_message_parts: None,
            auth_schemes: Vec::new(),
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the agent software version.
    pub fn agent_version(mut self, version: impl Into<String>) -> Self {
        self.agent_version = version.into();
        self
    }

    /// Set the A2A endpoint URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the advertised A2A protocol version.
    pub fn a2a_version(mut self, version: impl Into<String>) -> Self {
        self.a2a_version = version.into();
        self
    }

    /// Advertise MCP support.
    pub fn mcp_version(mut self, version: impl Into<String>) -> Self {
        self.mcp_version = Some(version.into());
        self
    }

    /// Advertise the message part types the agent accepts.
    pub fn supported_message_parts(mut self, parts: Vec<String>) -> Self {
        self.supported_message_parts = Some(parts);
        self
    }

    /// Declare the `apiKey` scheme, optionally with an explicit service
    /// identifier for credential lookup.
    pub fn with_api_key_auth(mut self, service_identifier: Option<&str>) -> Self {
        let mut scheme = AgentAuthentication::new(AuthScheme::ApiKey);
        scheme.service_identifier = service_identifier.map(String::from);
        self.auth_schemes.push(scheme);
        self
    }

    /// Declare the `oauth2` scheme with its token endpoint and scopes.
    pub fn with_oauth2_auth(
        mut self,
        token_url: impl Into<String>,
        scopes: Option<Vec<String>>,
        service_identifier: Option<&str>,
    ) -> Self {
        let mut scheme = AgentAuthentication::new(AuthScheme::OAuth2);
        scheme.token_url = Some(token_url.into());
        scheme.scopes = scopes;
        scheme.service_identifier = service_identifier.map(String::from);
        self.auth_schemes.push(scheme);
        self
    }

    /// Declare the `none` scheme (open endpoint).
    pub fn with_no_auth(mut self) -> Self {
        self.auth_schemes.push(AgentAuthentication::new(AuthScheme::None));
        self
    }

    /// Build and validate the card.
    ///
    /// A card with no declared schemes gets `none`, keeping the non-empty
    /// `authSchemes` invariant for open endpoints.
    pub fn build(self) -> A2AResult<AgentCard> {
        let auth_schemes = if self.auth_schemes.is_empty() {
            vec![AgentAuthentication::new(AuthScheme::None)]
        } else {
            self.auth_schemes
        };
        let card = AgentCard {
            schema_version: CARD_SCHEMA_VERSION.to_string(),
            human_readable_id: self.human_readable_id,
            agent_version: self.agent_version,
            name: self.name,
            description: self.description,
            url: self.url,
            capabilities: AgentCapabilities {
                a2a_version: self.a2a_version,
                mcp_version: self.mcp_version,
                supported_message_parts: self.supported_message_parts,
            },
            auth_schemes,
        };
        card.validate()?;
        Ok(card)
    }
}

/// Builder for an A2A axum application.
///
/// Wraps [`crate::server::a2a_router`] with store defaulting and optional
/// CORS middleware.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use agentvault::ServerBuilder;
///
/// let app = ServerBuilder::new(Arc::new(MyAgent))
///     .prefix("/a2a")
///     .with_cors(true)
///     .build();
/// ```
#[cfg(feature = "server")]
pub struct ServerBuilder {
    agent: std::sync::Arc<dyn crate::server::A2aAgent>,
    store: Option<std::sync::Arc<dyn crate::server::TaskStore>>,
    prefix: String,
    cors_enabled: bool,
}

#[cfg(feature = "server")]
impl ServerBuilder {
    /// Create a builder for the given agent.
    pub fn new(agent: std::sync::Arc<dyn crate::server::A2aAgent>) -> Self {
        Self {
            agent,
            store: None,
            prefix: String::new(),
            cors_enabled: false,
        }
    }

    /// Set the task store. Defaults to a fresh
    /// [`crate::server::InMemoryTaskStore`].
    pub fn with_task_store(mut self, store: std::sync::Arc<dyn crate::server::TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Mount the endpoint under a route prefix (e.g. `/a2a`).
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Enable or disable permissive CORS middleware.
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors_enabled = enabled;
        self
    }

    /// Build the axum router.
    pub fn build(self) -> axum::Router {
        use crate::server::{a2a_router, InMemoryTaskStore};
        use std::sync::Arc;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryTaskStore::new()));
        let mut router = a2a_router(self.agent, &self.prefix, store);

        if self.cors_enabled {
            use tower_http::cors::CorsLayer;
            router = router.layer(CorsLayer::permissive());
        }

        router
    }
}
