//! Error types for card composition

use thiserror::Error;

/// Result type alias for composer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while composing a card
#[derive(Error, Debug)]
pub enum Error {
    /// The font never became usable within the readiness budget
    #[error("フォント \"{spec}\" のロードがタイムアウトしました。 (after {timeout_ms}ms)")]
    FontTimeout { spec: String, timeout_ms: u64 },

    /// A registered font face could not be read or parsed
    #[error("Font load failed: {0}")]
    FontLoad(String),

    /// A font shorthand string could not be parsed
    #[error("Invalid font specification: {0}")]
    InvalidFontSpec(String),

    /// The background asset could not be fetched or decoded
    #[error("Failed to load asset {location}: {reason}")]
    AssetLoad { location: String, reason: String },

    /// Exporting the canvas failed
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
