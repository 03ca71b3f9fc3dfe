//! Error types for the Deepscribe pipeline core.
//!
//! Uses `thiserror` for public API error types with structured error variants
//! covering the gateway, web lookup, and configuration domains. Stage-level
//! failures are not errors at all: the stages absorb them into substitute
//! content, so only the collaborator adapters and setup paths surface here.

/// Top-level error type for the Deepscribe core library.
#[derive(Debug, thiserror::Error)]
pub enum DeepscribeError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from model providers and the call gateway.
///
/// Display strings are load-bearing: the gateway classifies quota exhaustion
/// by matching substrings of the rendered error, so the `ApiRequest` variant
/// preserves the provider's HTTP status and response body verbatim.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("No API key found (checked {env})")]
    MissingApiKey { env: String },
}

/// Errors from the web lookup collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LookupError {
    #[error("Search request failed: {message}")]
    RequestFailed { message: String },

    #[error("Search returned HTTP {status}")]
    BadStatus { status: u16 },

    #[error("Search response parse error: {message}")]
    ResponseParse { message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// A type alias for results using the top-level `DeepscribeError`.
pub type Result<T> = std::result::Result<T, DeepscribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_gateway() {
        let err = DeepscribeError::Gateway(GatewayError::ApiRequest {
            message: "HTTP 500: internal error".into(),
        });
        assert_eq!(
            err.to_string(),
            "Gateway error: API request failed: HTTP 500: internal error"
        );
    }

    #[test]
    fn test_error_display_missing_key() {
        let err = GatewayError::MissingApiKey {
            env: "OPENROUTER_API_KEY".into(),
        };
        assert_eq!(
            err.to_string(),
            "No API key found (checked OPENROUTER_API_KEY)"
        );
    }

    #[test]
    fn test_error_display_lookup() {
        let err = DeepscribeError::Lookup(LookupError::BadStatus { status: 503 });
        assert_eq!(err.to_string(), "Lookup error: Search returned HTTP 503");
    }

    #[test]
    fn test_quota_status_survives_rendering() {
        // The cascade's quota classifier reads the rendered string, so the
        // status code must remain visible after formatting.
        let err = GatewayError::ApiRequest {
            message: "HTTP 402: insufficient credits".into(),
        };
        assert!(err.to_string().contains("402"));
        assert!(err.to_string().contains("credits"));
    }
}
