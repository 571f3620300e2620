//! Error types for the banking assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Banking Provider Errors
    // =============================

    #[error("banking provider error: {0}")]
    Upstream(String),

    #[error("No account found")]
    NoAccount,

    // =============================
    // Payment Errors
    // =============================

    /// Payment amounts must be strictly positive; zero and negative
    /// amounts would corrupt the adjusted-balance arithmetic.
    #[error("Payment amount must be positive")]
    InvalidAmount,

    /// Requested amount exceeds the real (provider-reported) balance.
    #[error("Insufficient funds. Your actual balance is ${available:.2}")]
    InsufficientRealFunds { available: f64 },

    /// Requested amount exceeds the ledger-adjusted balance.
    #[error("Insufficient available balance. Available: ${available:.2}")]
    InsufficientAvailableFunds { available: f64 },

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    // =============================
    // Storage & Configuration
    // =============================

    #[error("ledger persistence error: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
