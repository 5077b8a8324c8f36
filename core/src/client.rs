//! Stateless request builder and response parser for the amoCRM v2 API.
//!
//! # Design
//! `AmoClient` holds only the account configuration and carries no mutable
//! state between calls. `build_get`/`build_post` produce an `HttpRequest`
//! with credentials attached; `parse_response` consumes the `HttpResponse`
//! the host got back. Everything amoCRM-specific about the wire lives here:
//! the `USER_LOGIN`/`USER_HASH` query pair, the `{"request": ...}` body
//! wrapper, the `{"response": ...}` reply wrapper and the error envelope.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::Config;
use crate::date::http_date;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub const LOGIN_PARAM: &str = "USER_LOGIN";
pub const HASH_PARAM: &str = "USER_HASH";
pub const MODIFIED_SINCE_HEADER: &str = "if-modified-since";

/// Synchronous, stateless wire client for one amoCRM account.
#[derive(Debug, Clone)]
pub struct AmoClient {
    config: Config,
}

impl AmoClient {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn build_get(
        &self,
        path: &str,
        query: &[(String, String)],
        modified_since: Option<i64>,
    ) -> HttpRequest {
        let mut headers = Vec::new();
        if let Some(ts) = modified_since {
            headers.push((MODIFIED_SINCE_HEADER.to_string(), http_date(ts)));
        }
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url(path),
            query: self.query(query),
            headers,
            body: None,
        }
    }

    pub fn build_post(&self, path: &str, body: &Value) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(&json!({ "request": body }))
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.url(path),
            query: self.query(&[]),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    /// Unwrap the `response` member of a successful reply.
    ///
    /// 204 means "nothing matched" and yields `Value::Null`.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value, ApiError> {
        check_status(&response)?;
        if response.status == 204 || response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        let mut body: Value = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        if let Some(inner) = body.get_mut("response") {
            return Ok(inner.take());
        }
        Ok(body)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }

    fn query(&self, params: &[(String, String)]) -> Vec<(String, String)> {
        let mut query = params.to_vec();
        query.push((LOGIN_PARAM.to_string(), self.config.login.clone()));
        query.push((HASH_PARAM.to_string(), self.config.api_key.clone()));
        query
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        200 | 204 => Ok(()),
        401 => Err(ApiError::Unauthorized),
        status => Err(error_envelope(&response.body).unwrap_or_else(|| ApiError::HttpError {
            status,
            body: response.body.clone(),
        })),
    }
}

#[derive(Deserialize)]
struct ErrorReply {
    response: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    error_code: Option<Value>,
}

/// Read `{"response": {"error": ..., "error_code": ...}}`.
fn error_envelope(body: &str) -> Option<ApiError> {
    let reply: ErrorReply = serde_json::from_str(body).ok()?;
    let code = match reply.response.error_code {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    Some(ApiError::Api {
        code,
        message: reply.response.error,
    })
}
