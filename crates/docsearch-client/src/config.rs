//! Client configuration.

use std::time::Duration;

use crate::tasks::WaitOptions;

/// Environment variable holding the service URL.
pub const URL_ENV: &str = "DOCSEARCH_URL";
/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "DOCSEARCH_API_KEY";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the service.
    pub url: String,

    /// API key sent as a bearer token.
    pub api_key: Option<String>,

    /// Per-request timeout applied by the HTTP transport.
    pub request_timeout: Duration,

    /// Default bounds for task polling.
    pub wait: WaitOptions,

    /// Extra identifiers appended to the `User-Agent` header.
    pub client_agents: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:7700".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(30),
            wait: WaitOptions::default(),
            client_agents: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Configuration for the service at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Defaults, overridden by `DOCSEARCH_URL` and `DOCSEARCH_API_KEY`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(URL_ENV) {
            config.url = url;
        }
        config.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_wait_options(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_client_agent(mut self, agent: impl Into<String>) -> Self {
        self.client_agents.push(agent.into());
        self
    }

    /// `User-Agent` header value.
    pub fn user_agent(&self) -> String {
        let mut agent = format!("docsearch-client/{}", env!("CARGO_PKG_VERSION"));
        for extra in &self.client_agents {
            agent.push_str(" ; ");
            agent.push_str(extra);
        }
        agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("http://search.internal:7700")
            .with_api_key("masterKey")
            .with_request_timeout(Duration::from_secs(5))
            .with_client_agent("my-app (v1.2)");

        assert_eq!(config.url, "http://search.internal:7700");
        assert_eq!(config.api_key.as_deref(), Some("masterKey"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.user_agent().ends_with(" ; my-app (v1.2)"));
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.url, "http://localhost:7700");
        assert!(config.api_key.is_none());
        assert_eq!(config.wait, WaitOptions::default());
        assert!(config.user_agent().starts_with("docsearch-client/"));
    }
}
