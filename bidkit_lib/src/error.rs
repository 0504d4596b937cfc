//! Error types for the library layer.

/// Errors produced inside the engine.
///
/// None of these cross the public entry points: they are logged and turned
/// into a no-bid outcome. They exist so collaborators (backend, mapper) can
/// report failures with `?` and so logs carry a consistent message.
#[derive(thiserror::Error, Debug)]
pub enum BidKitError {
    /// An error from the underlying auction client.
    #[error("API error: {0}")]
    Api(#[from] bidkit_api::Error),
    /// The ad unit cannot be turned into a cache key.
    #[error("Invalid ad unit: {0}")]
    InvalidAdUnit(String),
    /// The backend answered in a shape the calling contract forbids.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
    /// A CLI or config value failed to parse.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
