//! Gateway error taxonomy.

/// Errors surfaced by the gateway to its callers.
///
/// None of these are retried internally. `CredentialExpired` means the caller
/// must re-authenticate; `RateLimited` means it may retry later, never
/// immediately.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// Upstream answered 401
    #[error("Credential expired or revoked")]
    CredentialExpired,

    /// Upstream answered 429
    #[error("Rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other non-2xx answer
    #[error("Upstream error: HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Transport failure (connect, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Queued task panicked or its result was lost
    #[error("Dispatched task aborted")]
    TaskAborted,
}

impl GatewayError {
    /// Map a non-success HTTP status to the taxonomy.
    pub fn from_status(status: u16, body: String, retry_after_secs: Option<u64>) -> Self {
        match status {
            401 => GatewayError::CredentialExpired,
            429 => GatewayError::RateLimited { retry_after_secs },
            _ => GatewayError::Upstream { status, body },
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Decode(e.to_string())
    }
}
