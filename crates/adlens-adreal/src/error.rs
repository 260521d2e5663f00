use thiserror::Error;

/// Errors returned by the AdReal API client.
#[derive(Debug, Error)]
pub enum AdRealError {
    /// Network or TLS failure from the underlying HTTP client, or a non-2xx
    /// HTTP status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The login endpoint rejected the credentials.
    #[error("AdReal login failed for user {username}")]
    LoginFailed { username: String },

    /// The login page did not hand out the CSRF cookie the session needs.
    #[error("missing csrftoken cookie from {url}")]
    MissingCsrfToken { url: String },

    /// The configured base URL could not be parsed.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
