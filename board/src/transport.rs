//! Executes the plain-data requests built by `todo_core::TodoClient`.
//!
//! # Design
//! The core never performs I/O. `Transport` is the seam where the host plugs
//! in a real HTTP stack; tests plug in scripted or counting transports.
//! Returned futures are `'static` so the query cache can share them between
//! coalesced callers.

use std::future::Future;
use std::pin::Pin;

use todo_core::{ApiError, HttpMethod, HttpRequest, HttpResponse};

use crate::config::ClientConfig;

pub type TransportFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, ApiError>> + Send + 'static>>;

/// Performs one HTTP round-trip.
///
/// Non-2xx statuses are returned as `Ok` responses; only failures to complete
/// the exchange are `Err(ApiError::Request)`.
pub trait Transport: Send + Sync + 'static {
    fn execute(&self, request: HttpRequest) -> TransportFuture;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

fn method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> TransportFuture {
        let client = self.client.clone();
        Box::pin(async move {
            tracing::trace!(method = %request.method, path = %request.path, "sending request");

            let mut builder = client.request(method(request.method), request.path.as_str());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| ApiError::Request(e.to_string()))?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect();
            let body = response.text().await.map_err(|e| ApiError::Request(e.to_string()))?;

            Ok(HttpResponse { status, headers, body })
        })
    }
}
