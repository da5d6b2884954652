//! # HTTP Retrieval Utilities
//!
//! An asynchronous API client wrapper around `reqwest`, with middleware
//! support for exponential backoff retries.

use std::time::Duration;

use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Serialize;

use crate::error::Result;

/// Outcome of a request that reached the server.
#[derive(Debug)]
pub struct ApiResponse {
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The raw body returned by the server when the request failed.
    pub error_body: Option<String>,
    pub headers: HeaderMap,
}

/// Errors that happen before a response exists.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid request path: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to serialize request body: {0}")]
    Body(#[from] serde_json::Error),
    #[error("{0}")]
    Transport(#[from] reqwest_middleware::Error),
}

/// A flexible asynchronous HTTP client.
///
/// Relative paths are joined onto the base URL, and the bearer token, when
/// present, is injected on every request.
pub struct ApiClient {
    inner: ClientWithMiddleware,
    base_url: Url,
    auth_token: Option<String>,
}

impl ApiClient {
    /// Creates a client with a per-request `timeout`.
    ///
    /// `base_url` must be absolute. A missing trailing slash is added so that
    /// joined paths extend it instead of replacing its last segment. The retry
    /// layer is only installed when `max_retries` is non-zero.
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let mut builder = ClientBuilder::new(client);
        if max_retries > 0 {
            let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(Self {
            inner: builder.build(),
            base_url,
            auth_token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Performs a request and captures status and error body.
    ///
    /// A non-2xx status is a successful call with `success == false`; only
    /// failures to build or send the request are errors.
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> std::result::Result<ApiResponse, RequestError>
    where
        B: Serialize + ?Sized,
    {
        let full_url = self.base_url.join(path)?;
        let mut req = self.inner.request(method, full_url);

        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        if let Some(b) = body {
            let json_body = serde_json::to_string(b)?;
            req = req.header(CONTENT_TYPE, "application/json").body(json_body);
        }

        let response = req.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        if status.is_success() {
            Ok(ApiResponse {
                status: status.as_u16(),
                success: true,
                error_body: None,
                headers,
            })
        } else {
            let error_body = response.text().await.ok().filter(|b| !b.is_empty());
            Ok(ApiResponse {
                status: status.as_u16(),
                success: false,
                error_body,
                headers,
            })
        }
    }

    pub async fn post_json<B>(&self, path: &str, body: &B) -> std::result::Result<ApiResponse, RequestError>
    where
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body)).await
    }
}
