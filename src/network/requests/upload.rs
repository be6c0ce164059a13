use bytes::Bytes;
use crate::errors::ProbeError;
use crate::network::client::RawResponse;
use crate::network::requests::Request;
use rand::RngCore;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;

/// POSTs a fixed payload. The payload size is what gets credited, the
/// response body is ignored. Every stream shares the one buffer.
#[derive(Debug, Clone)]
pub struct Upload {
    data: Bytes,
}

impl Upload {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// A payload of `bytes` random bytes so nothing along the way can
    /// compress it.
    pub fn random<R: RngCore>(rng: &mut R, bytes: usize) -> Self {
        let mut data = vec![0u8; bytes];
        rng.fill_bytes(&mut data);
        Self::new(data)
    }

    pub fn bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

impl Request for Upload {
    type Response = u64;

    const METHOD: Method = Method::POST;

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, super::user_agent());
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );

        headers
    }

    fn body(&self) -> Option<Bytes> {
        Some(self.data.clone())
    }

    fn parse(&self, _response: RawResponse) -> Result<u64, ProbeError> {
        Ok(self.bytes())
    }
}
