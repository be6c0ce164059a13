use crate::errors::ProbeError;
use crate::network::client::RawResponse;
use crate::network::requests::Request;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, USER_AGENT};

/// A small GET whose only purpose is to be timed.
#[derive(Debug, Clone, Copy)]
pub struct Ping;

impl Request for Ping {
    type Response = ();

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, super::user_agent());
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        headers
    }

    fn parse(&self, _response: RawResponse) -> Result<(), ProbeError> {
        Ok(())
    }
}
