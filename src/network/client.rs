use bytes::Bytes;
use crate::errors::ProbeError;
use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Method};
use std::future::Future;
use std::time::Duration;
use url::Url;

/// A fully described outbound request.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Duration,
}

/// What came back, before any interpretation.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Length declared by the server, if any.
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self { status: 200, content_length: Some(body.len() as u64), body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The network boundary of the probe. Everything the probe knows about
/// the outside world goes through `execute`.
pub trait Transport {
    fn execute(
        &self,
        request: RawRequest,
    ) -> impl Future<Output = Result<RawResponse, ProbeError>>;
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport { client: ReqwestClient::new() }
    }

    pub fn with_client(client: ReqwestClient) -> Self {
        HttpTransport { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: RawRequest,
    ) -> Result<RawResponse, ProbeError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(request.timeout);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse { status, content_length, body })
    }
}
