//! HTTP transport for the REST API.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use docsearch_core::ErrorPayload;

use crate::config::ClientConfig;
use crate::error::{ApiError, ClientError};

/// Thin JSON-over-HTTP transport.
///
/// Serializes request bodies, deserializes response bodies and turns any
/// non-success status into [`ClientError::Api`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ClientError::InvalidConfig(format!("invalid url '{}': {e}", config.url)))?;

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| ClientError::InvalidConfig(format!("invalid api key: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let inner = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent())
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { inner, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a JSON document.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(Method::GET, path, self.request(Method::GET, path))
            .await
    }

    /// GET with query parameters.
    pub async fn get_with_query<Q, T>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::GET, path, self.request(Method::GET, path).query(query))
            .await
    }

    /// POST a JSON body.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, self.request(Method::POST, path).json(body))
            .await
    }

    /// POST with query parameters and no body.
    pub async fn post_query<Q, T>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, self.request(Method::POST, path).query(query))
            .await
    }

    /// POST a JSON body with query parameters.
    pub async fn post_with_query<Q, B, T>(
        &self,
        path: &str,
        query: &Q,
        body: &B,
    ) -> Result<T, ClientError>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).query(query).json(body);
        self.send(Method::POST, path, builder).await
    }

    /// PUT a JSON body.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PUT, path, self.request(Method::PUT, path).json(body))
            .await
    }

    /// PUT a JSON body with query parameters.
    pub async fn put_with_query<Q, B, T>(
        &self,
        path: &str,
        query: &Q,
        body: &B,
    ) -> Result<T, ClientError>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path).query(query).json(body);
        self.send(Method::PUT, path, builder).await
    }

    /// PATCH a JSON body.
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PATCH, path, self.request(Method::PATCH, path).json(body))
            .await
    }

    /// DELETE a resource.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(Method::DELETE, path, self.request(Method::DELETE, path))
            .await
    }

    /// DELETE with query parameters.
    pub async fn delete_with_query<Q, T>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::DELETE, path).query(query);
        self.send(Method::DELETE, path, builder).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<T, ClientError> {
        debug!(method = %method, base_url = %self.base_url, path = %path, "HTTP request");

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), path = %path, "HTTP error response");
            let payload = serde_json::from_str::<ErrorPayload>(&text)
                .unwrap_or_else(|_| ErrorPayload::from_message(text));
            return Err(ApiError::new(status.as_u16(), payload).into());
        }

        if text.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Percent-encode one path segment so `/`, `?` and `#` stay inside it.
pub(crate) fn encode_segment(segment: &str) -> String {
    let Ok(mut url) = Url::parse("http://segment.invalid/") else {
        return segment.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(segment);
    }
    url.path().trim_start_matches('/').to_string()
}
