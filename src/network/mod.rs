pub mod client;
pub mod requests;


pub use client::{HttpTransport, RawRequest, RawResponse, Transport};
