use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

/// Error body PostgREST returns for failed statements. `code` is the
/// Postgres SQLSTATE, e.g. `23505` for a unique violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgrestError {
    #[serde(skip)]
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl PostgrestError {
    pub fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some("23505")
    }

    /// Only the `no_data_found` SQLSTATE raised by our functions. A bare
    /// 404 can mean a missing function or table (`PGRST202`, `42P01`).
    pub fn is_no_data_found(&self) -> bool {
        self.code.as_deref() == Some("P0002")
    }

    /// Name of the violated constraint, taken from the quoted identifier
    /// in the Postgres message (`... unique constraint "name"`).
    pub fn constraint(&self) -> Option<&str> {
        let start = self.message.find('"')? + 1;
        let len = self.message[start..].find('"')?;
        Some(&self.message[start..start + len])
    }
}

impl fmt::Display for PostgrestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API error ({}, code {}): {}",
            self.status,
            self.code.as_deref().unwrap_or("-"),
            self.message
        )
    }
}

impl std::error::Error for PostgrestError {}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;

            // PostgREST errors carry a SQLSTATE; keep them typed so callers
            // can tell a unique violation from a transport failure.
            if let Ok(mut pg_error) = serde_json::from_str::<PostgrestError>(&error_text) {
                pg_error.status = status.as_u16();
                if status.is_client_error() {
                    warn!("PostgREST rejected request: {}", pg_error);
                } else {
                    error!("PostgREST failure: {}", pg_error);
                }
                return Err(anyhow::Error::new(pg_error));
            }

            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Calls a Postgres function through `/rest/v1/rpc/{function}`. Each
    /// call runs in its own transaction.
    pub async fn rpc<T>(&self, function: &str, auth_token: Option<&str>, args: Value) -> Result<T>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/rpc/{}", function);
        self.request(Method::POST, &path, auth_token, Some(args)).await
    }
}
