//! Typed HTTP client for the numbers service.

use reqwest::StatusCode;
use tracing::{debug, instrument};
use url::Url;

use crate::api::{ErrorResponse, NumbersResponse};
use crate::error::ClientError;

/// Client for a running sorted-numbers server.
#[derive(Debug, Clone)]
pub struct NumbersClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Server base URL, e.g. `http://127.0.0.1:8080/`.
    base_url: Url,
}

impl NumbersClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_http(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        // joining onto a path without a trailing slash would drop its last segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Store `number` and return every stored number in ascending order.
    #[instrument(skip(self))]
    pub async fn add_number(&self, number: i32) -> Result<Vec<i32>, ClientError> {
        let url = self.base_url.join("numbers")?;
        let response = self
            .http
            .post(url)
            .query(&[("number", number)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            let body: NumbersResponse = response.json().await?;
            debug!(count = body.numbers.len(), "Received sorted numbers");
            return Ok(body.numbers);
        }

        let text = response.text().await?;
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error)
            .unwrap_or(text);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Whether the server reports the store as reachable.
    pub async fn is_ready(&self) -> Result<bool, ClientError> {
        let url = self.base_url.join("ready")?;
        let response = self.http.get(url).send().await?;
        Ok(response.status() == StatusCode::OK)
    }
}
