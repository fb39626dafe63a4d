//! reqwest implementation of the core transport port

use async_trait::async_trait;
use belay_core::HttpTransport;
use belay_domain::{
    ApiConfig, ApiRequest, ApiResponse, BelayError, HttpMethod, RequestBody, TransportError,
    TransportErrorKind,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder};
use url::Url;

use super::client::HttpClient;

/// Sends [`ApiRequest`]s to the Belay API.
///
/// Relative targets resolve against the configured base URL. Only idempotent
/// methods are retried; every status code is handed back to the caller.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: HttpClient,
    base_url: Url,
}

impl ReqwestTransport {
    /// # Errors
    /// Returns [`BelayError::Config`] when `base_url` is not an absolute URL.
    pub fn new(client: HttpClient, base_url: &str) -> Result<Self, BelayError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized)
            .map_err(|e| BelayError::Config(format!("Invalid API base URL '{base_url}': {e}")))?;
        Ok(Self { client, base_url })
    }

    /// Build the client and transport from [`ApiConfig`].
    ///
    /// # Errors
    /// Propagates client construction and base URL errors.
    pub fn from_config(config: &ApiConfig) -> Result<Self, BelayError> {
        let client = HttpClient::builder()
            .timeout(config.timeout())
            .max_attempts(config.max_attempts)
            .user_agent(config.user_agent.clone())
            .build()?;
        Self::new(client, &config.base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, target: &str) -> Result<Url, TransportError> {
        let parsed = if target.starts_with("http://") || target.starts_with("https://") {
            Url::parse(target)
        } else {
            self.base_url.join(target.trim_start_matches('/'))
        };
        parsed.map_err(|e| {
            TransportError::new(TransportErrorKind::Request, format!("invalid URL '{target}': {e}"))
        })
    }

    fn build(&self, request: &ApiRequest) -> Result<RequestBuilder, TransportError> {
        let url = self.resolve(&request.target)?;
        let mut builder = self.client.request(to_method(request.method), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match &request.body {
            Some(RequestBody::Json(value)) => builder = builder.json(value),
            Some(RequestBody::Bytes { content_type, data }) => {
                builder = builder.header(CONTENT_TYPE, content_type.as_str()).body(data.clone());
            }
            None => {}
        }
        Ok(builder)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let builder = self.build(request)?;
        let response = if request.method.is_idempotent() {
            self.client.send(builder).await?
        } else {
            self.client.send_once(builder).await?
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|e| {
            TransportError::new(TransportErrorKind::Body, format!("failed to read body: {e}"))
        })?;

        Ok(ApiResponse { status, headers, body: body.to_vec() })
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}
