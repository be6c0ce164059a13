use crate::errors::ProbeError;
use crate::network::client::RawResponse;
use crate::network::requests::Request;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, USER_AGENT};

/// A GET whose body is counted and thrown away.
#[derive(Debug, Clone, Copy)]
pub struct Download {
    /// Known fixed payload size of the endpoint, if any.
    pub size_hint: Option<u64>,
}

impl Request for Download {
    /// Bytes credited to the transfer.
    type Response = u64;

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, super::user_agent());
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        headers
    }

    /// Declared content-length first, then the endpoint's known size, then
    /// whatever actually arrived.
    fn parse(&self, response: RawResponse) -> Result<u64, ProbeError> {
        Ok(response
            .content_length
            .or(self.size_hint)
            .unwrap_or(response.body.len() as u64))
    }
}
