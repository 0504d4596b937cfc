//! Error types for the auction client.

/// Errors that can occur when calling the auction backend.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An HTTP request failed (network error, timeout, or unreadable response).
    #[error("Request failed")]
    RequestFailed,
    /// The backend returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The backend answered 2xx but the body is not a bid response.
    #[error("Malformed bid response: {0}")]
    MalformedPayload(String),
}
