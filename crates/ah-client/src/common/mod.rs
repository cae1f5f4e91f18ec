//! Common utilities for the Advanced Hosting API client
//!
//! Provides the authenticated HTTP wrapper shared by all endpoints.

pub mod query;

use crate::error::AhError;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

/// HTTP client wrapper with authentication
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Map a non-success response onto the error taxonomy.
    ///
    /// 404 becomes `NotFound` so callers can tell "gone" from "broken".
    async fn check_status(method: &str, path: &str, response: Response) -> Result<Response, AhError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(AhError::NotFound(format!(
                "{} {} - {}",
                method, path, body
            ))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AhError::Authentication(format!(
                "{} {} failed: {} - {}",
                method, path, status, body
            ))),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Err(AhError::InvalidRequest(format!(
                "{} {} rejected: {} - {}",
                method, path, status, body
            ))),
            _ => Err(AhError::Api(format!(
                "{} {} failed: {} - {}",
                method, path, status, body
            ))),
        }
    }

    /// Decode `{"<key>": T}` documents, the shape every endpoint answers with
    fn unwrap_key<T: for<'de> Deserialize<'de>>(
        path: &str,
        key: &str,
        mut document: serde_json::Value,
    ) -> Result<T, AhError> {
        let inner = document
            .get_mut(key)
            .map(serde_json::Value::take)
            .ok_or_else(|| AhError::Api(format!(
                "response of {} is missing '{}' - Response (first 500 chars): {}",
                path,
                key,
                document.to_string().chars().take(500).collect::<String>()
            )))?;
        Ok(serde_json::from_value(inner)?)
    }

    /// Make a GET request and decode the document stored under `key`
    pub async fn get_wrapped<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        key: &str,
    ) -> Result<T, AhError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self.client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(AhError::Http)?;

        let response = Self::check_status("GET", path, response).await?;
        let document: serde_json::Value = response.json().await.map_err(AhError::Http)?;
        Self::unwrap_key(path, key, document)
    }

    /// Make a POST request and decode the document stored under `key`
    pub async fn post_wrapped<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
        key: &str,
    ) -> Result<T, AhError> {
        let url = self.build_url(path);
        debug!("POST {} with body: {}", url, serde_json::to_string(body).unwrap_or_default());

        let response = self.client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(AhError::Http)?;

        let response = Self::check_status("POST", path, response).await?;
        let document: serde_json::Value = response.json().await.map_err(AhError::Http)?;
        Self::unwrap_key(path, key, document)
    }

    /// Make a PATCH request; the accepted response body is ignored
    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), AhError> {
        let url = self.build_url(path);
        debug!("PATCH {} with body: {}", url, serde_json::to_string(body).unwrap_or_default());

        let response = self.client
            .patch(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(AhError::Http)?;

        Self::check_status("PATCH", path, response).await?;
        Ok(())
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), AhError> {
        let url = self.build_url(path);
        debug!("DELETE {}", url);

        let response = self.client
            .delete(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(AhError::Http)?;

        Self::check_status("DELETE", path, response).await?;
        Ok(())
    }

    /// Build query string from equality filters
    pub fn build_query_string(&self, filters: &[(&str, &str)]) -> String {
        filters
            .iter()
            .map(|(k, v)| format!(
                "{}={}",
                urlencoding::encode(&format!("filters[{}][eq]", k)),
                urlencoding::encode(v)
            ))
            .collect::<Vec<_>>()
            .join("&")
    }
}
