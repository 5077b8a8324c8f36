//! The seam between entity operations and the network.
//!
//! # Design
//! Entities only see [`Transport`]: a JSON-in, JSON-out GET/POST pair.
//! [`HttpTransport`] is the stock implementation. It lets [`AmoClient`]
//! shape the wire request and hands the actual I/O to a host [`Execute`]
//! implementation, which can be any closure from `HttpRequest` to
//! `HttpResponse`. Errors raised by either half reach the caller as-is.

use serde_json::Value;
use tracing::debug;

use crate::client::AmoClient;
use crate::config::Config;
use crate::error::ApiResult;
use crate::http::{HttpRequest, HttpResponse};

/// Decoded-JSON access to the API.
pub trait Transport {
    fn get(
        &self,
        path: &str,
        query: &[(String, String)],
        modified_since: Option<i64>,
    ) -> ApiResult<Value>;

    fn post(&self, path: &str, body: &Value) -> ApiResult<Value>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(
        &self,
        path: &str,
        query: &[(String, String)],
        modified_since: Option<i64>,
    ) -> ApiResult<Value> {
        (**self).get(path, query, modified_since)
    }

    fn post(&self, path: &str, body: &Value) -> ApiResult<Value> {
        (**self).post(path, body)
    }
}

/// Performs one HTTP round-trip on behalf of the library.
pub trait Execute {
    fn execute(&self, request: HttpRequest) -> ApiResult<HttpResponse>;
}

impl<F> Execute for F
where
    F: Fn(HttpRequest) -> ApiResult<HttpResponse>,
{
    fn execute(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        self(request)
    }
}

/// [`Transport`] over the amoCRM wire format, executed by the host.
#[derive(Debug, Clone)]
pub struct HttpTransport<X> {
    client: AmoClient,
    executor: X,
}

impl<X: Execute> HttpTransport<X> {
    pub fn new(config: Config, executor: X) -> Self {
        Self {
            client: AmoClient::new(config),
            executor,
        }
    }

    pub fn client(&self) -> &AmoClient {
        &self.client
    }
}

impl<X: Execute> Transport for HttpTransport<X> {
    fn get(
        &self,
        path: &str,
        query: &[(String, String)],
        modified_since: Option<i64>,
    ) -> ApiResult<Value> {
        let request = self.client.build_get(path, query, modified_since);
        debug!(url = %request.url, params = query.len(), "GET");
        let response = self.executor.execute(request)?;
        self.client.parse_response(response)
    }

    fn post(&self, path: &str, body: &Value) -> ApiResult<Value> {
        let request = self.client.build_post(path, body)?;
        debug!(url = %request.url, "POST");
        let response = self.executor.execute(request)?;
        self.client.parse_response(response)
    }
}
