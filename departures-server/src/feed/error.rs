//! Feed client error types.

use std::fmt;

/// Errors from fetching departures upstream.
#[derive(Debug)]
pub enum FeedError {
    /// HTTP request failed (network error, connection reset, etc.)
    Http(reqwest::Error),

    /// Request exceeded the client timeout
    Timeout,

    /// JSON deserialization failed
    Json {
        message: String,
        body: Option<String>,
    },

    /// API returned an error status code
    ApiError { status: u16, message: String },

    /// Rate limited by the API
    RateLimited,

    /// The feed has no departures board for this station
    StationNotFound(String),
}

impl FeedError {
    /// HTTP status code associated with the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FeedError::Http(e) => e.status().map(|s| s.as_u16()),
            FeedError::ApiError { status, .. } if *status != 0 => Some(*status),
            FeedError::RateLimited => Some(429),
            FeedError::StationNotFound(_) => Some(404),
            _ => None,
        }
    }

    /// Short human-readable reason, suitable for status indicators.
    pub fn reason(&self) -> String {
        match self {
            FeedError::Timeout => "Request timed out".to_string(),
            FeedError::Json { .. } => "Invalid response".to_string(),
            _ => match self.status_code() {
                Some(429) => "Rate limit exceeded".to_string(),
                Some(502) => "Bad gateway (server error)".to_string(),
                Some(503) => "Service unavailable".to_string(),
                Some(504) => "Gateway timeout".to_string(),
                Some(status) => format!("HTTP {status}"),
                None => "Unknown error".to_string(),
            },
        }
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Http(e) => write!(f, "HTTP error: {e}"),
            FeedError::Timeout => write!(f, "request timed out"),
            FeedError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            FeedError::ApiError { status, message } => {
                write!(f, "API error {status}: {message}")
            }
            FeedError::RateLimited => write!(f, "rate limited by departures API"),
            FeedError::StationNotFound(id) => write!(f, "no departures board for station {id}"),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout
        } else {
            FeedError::Http(err)
        }
    }
}
