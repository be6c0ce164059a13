//! Error types for the speed probe.
//!
//! Per-request failures are recovered inside each phase by moving on to the
//! next candidate endpoint or by synthesizing a value. Whatever escapes a
//! phase is a `ProbeError`, which carries enough context to be shown to a
//! user and mapped to a process exit code.

use std::error::Error;
use std::fmt;

/// Exit codes for the application.
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Network error (connection failed, timeout, etc.).
    pub const NETWORK_ERROR: i32 = 1;
    /// An endpoint answered with an error status or an unusable body.
    pub const API_ERROR: i32 = 2;
    /// Configuration error (invalid arguments, empty endpoint lists).
    pub const CONFIG_ERROR: i32 = 3;
    /// A phase could not produce a measurement.
    pub const MEASUREMENT_ERROR: i32 = 4;
    /// Unknown/unexpected error.
    pub const UNKNOWN_ERROR: i32 = 99;
    /// Interrupted by Ctrl+C.
    pub const INTERRUPTED: i32 = 130;
}

/// Categories of errors that can occur while probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network connectivity issues.
    Network,
    /// DNS resolution failures.
    Dns,
    /// Request timeout.
    Timeout,
    /// TLS/SSL handshake failures.
    Tls,
    /// Endpoint returned a non-2xx response.
    Api,
    /// Response body could not be understood.
    Parse,
    /// Invalid configuration or arguments.
    Config,
    /// A phase ran out of ways to produce a value.
    Measurement,
    /// Unknown or unexpected errors.
    Unknown,
}

impl ErrorKind {
    /// Get the exit code for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Network => exit_codes::NETWORK_ERROR,
            ErrorKind::Dns => exit_codes::NETWORK_ERROR,
            ErrorKind::Timeout => exit_codes::NETWORK_ERROR,
            ErrorKind::Tls => exit_codes::NETWORK_ERROR,
            ErrorKind::Api => exit_codes::API_ERROR,
            ErrorKind::Parse => exit_codes::API_ERROR,
            ErrorKind::Config => exit_codes::CONFIG_ERROR,
            ErrorKind::Measurement => exit_codes::MEASUREMENT_ERROR,
            ErrorKind::Unknown => exit_codes::UNKNOWN_ERROR,
        }
    }

    /// Get a user-friendly description of this error kind.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::Network => "Network error",
            ErrorKind::Dns => "DNS resolution error",
            ErrorKind::Timeout => "Request timeout",
            ErrorKind::Tls => "TLS/SSL error",
            ErrorKind::Api => "Endpoint error",
            ErrorKind::Parse => "Response error",
            ErrorKind::Config => "Configuration error",
            ErrorKind::Measurement => "Measurement error",
            ErrorKind::Unknown => "Unknown error",
        }
    }

    fn default_suggestion(&self) -> Option<&'static str> {
        match self {
            ErrorKind::Network => {
                Some("Check your internet connection and try again.")
            }
            ErrorKind::Dns => Some(
                "Check your DNS settings or try using a different DNS server.",
            ),
            ErrorKind::Timeout => {
                Some("The endpoint may be slow or unreachable. Try again later.")
            }
            ErrorKind::Tls => {
                Some("There may be a certificate issue. Check your system time.")
            }
            ErrorKind::Api => Some(
                "The endpoint may be experiencing issues. Try another endpoint.",
            ),
            _ => None,
        }
    }
}

/// A user-friendly error type for probe operations.
#[derive(Debug)]
pub struct ProbeError {
    /// The kind of error.
    pub kind: ErrorKind,
    /// User-friendly error message.
    pub message: String,
    /// Optional suggestion for how to resolve the error.
    pub suggestion: Option<String>,
    /// The underlying error, if any.
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl ProbeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), suggestion: None, source: None }
    }

    /// Add a suggestion for how to resolve the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add the underlying error source.
    pub fn with_source(
        mut self,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Prefix the message with where the error happened.
    pub fn context(mut self, context: &str) -> Self {
        self.message = format!("{}: {}", context, self.message);
        self
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    fn with_default_suggestion(self) -> Self {
        match self.kind.default_suggestion() {
            Some(suggestion) => self.with_suggestion(suggestion),
            None => self,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message).with_default_suggestion()
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message).with_default_suggestion()
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Api, message).with_default_suggestion()
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn measurement(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Measurement, message).with_suggestion(
            "Re-run without --no-fallback to accept simulated values.",
        )
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.description(), self.message)?;

        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }

        Ok(())
    }
}

impl Error for ProbeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            ErrorKind::Timeout
        } else if error.is_status() {
            ErrorKind::Api
        } else if error.is_decode() || error.is_body() {
            ErrorKind::Parse
        } else if error.is_connect() {
            match classify_error(&error) {
                ErrorKind::Dns => ErrorKind::Dns,
                ErrorKind::Tls => ErrorKind::Tls,
                _ => ErrorKind::Network,
            }
        } else {
            classify_error(&error)
        };

        let mut probe_error =
            ProbeError::new(kind, error.to_string()).with_default_suggestion();
        probe_error.source = Some(Box::new(error));
        probe_error
    }
}

impl From<url::ParseError> for ProbeError {
    fn from(error: url::ParseError) -> Self {
        ProbeError::config(format!("invalid endpoint URL: {}", error))
            .with_source(error)
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(error: serde_json::Error) -> Self {
        ProbeError::parse(format!("invalid JSON response: {}", error))
            .with_source(error)
    }
}

/// Classify an error into an ErrorKind based on its message.
pub fn classify_error(error: &dyn Error) -> ErrorKind {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("dns")
        || error_str.contains("resolve")
        || error_str.contains("no such host")
    {
        return ErrorKind::Dns;
    }

    if error_str.contains("timeout")
        || error_str.contains("timed out")
        || error_str.contains("deadline")
    {
        return ErrorKind::Timeout;
    }

    if error_str.contains("tls")
        || error_str.contains("ssl")
        || error_str.contains("certificate")
        || error_str.contains("handshake")
    {
        return ErrorKind::Tls;
    }

    if error_str.contains("connection refused")
        || error_str.contains("connection reset")
        || error_str.contains("network unreachable")
        || error_str.contains("host unreachable")
        || error_str.contains("no route")
        || error_str.contains("broken pipe")
        || error_str.contains("error sending request")
    {
        return ErrorKind::Network;
    }

    if error_str.contains("status: 4")
        || error_str.contains("status: 5")
        || error_str.contains("server error")
    {
        return ErrorKind::Api;
    }

    ErrorKind::Unknown
}

/// Format an error for user display.
pub fn format_error_for_display(error: &ProbeError) -> String {
    let mut output = format!("Error: {}", error.message);

    if let Some(ref suggestion) = error.suggestion {
        output.push_str(&format!("\n\nSuggestion: {}", suggestion));
    }

    output
}
