pub mod download;
pub mod ip_lookup;
pub mod ping;
pub mod upload;

use bytes::Bytes;
use crate::errors::ProbeError;
use crate::network::client::{RawRequest, RawResponse, Transport};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Method;
use std::time::Duration;
use url::Url;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");
const REPO: &str = env!("CARGO_PKG_REPOSITORY");

pub(crate) fn user_agent() -> HeaderValue {
    HeaderValue::from_str(&format!("{}/{} ({})", NAME, VERSION, REPO))
        .unwrap_or_else(|_| HeaderValue::from_static("speed-probe"))
}

/// A typed request against one candidate endpoint.
pub trait Request {
    type Response;

    const METHOD: Method = Method::GET;

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, user_agent());

        headers
    }

    fn body(&self) -> Option<Bytes> {
        None
    }

    fn parse(&self, response: RawResponse)
        -> Result<Self::Response, ProbeError>;
}

/// Send `request` to `url` and parse the answer. Non-2xx statuses are
/// failures regardless of the body, and so is anything slower than
/// `timeout`, whatever the transport does on its own.
pub async fn send<T: Transport, R: Request>(
    transport: &T,
    url: &Url,
    request: &R,
    timeout: Duration,
) -> Result<R::Response, ProbeError> {
    let raw = RawRequest {
        method: R::METHOD,
        url: url.clone(),
        headers: request.headers(),
        body: request.body(),
        timeout,
    };

    let response = match tokio::time::timeout(timeout, transport.execute(raw)).await {
        Ok(response) => response.map_err(|e| e.context(url.as_str()))?,
        Err(_) => {
            return Err(ProbeError::timeout(format!(
                "{}: no response within {:?}",
                url, timeout
            )))
        }
    };

    if !response.is_success() {
        return Err(ProbeError::api(format!(
            "{}: HTTP {}",
            url, response.status
        )));
    }

    request.parse(response).map_err(|e| e.context(url.as_str()))
}
