//! Normalized provider error types
//!
//! Every adapter operation fails with a [`ProviderError`]. It is built once,
//! at the point where the vendor call fails, and is never wrapped again by
//! calling layers. Callers branch on [`ProviderError::code`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::types::ProviderType;

/// Machine-readable error code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingCredentials,
    InvalidCredentials,
    ValidationError,
    InvalidAction,
    ProviderNotFound,
    ProviderInactive,
    /// Reserved; adapters report missing instances as `API_ERROR`.
    InstanceNotFound,
    InsufficientResources,
    RateLimitExceeded,
    UnsupportedProvider,
    ProviderNotImplemented,
    ApiError,
    UnknownError,
    /// `HTTP_<status>`
    Http(u16),
    /// Code derived from a vendor error identifier (e.g. `NOT_FOUND`)
    Vendor(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> Cow<'_, str> {
        let s = match self {
            ErrorCode::MissingCredentials => "MISSING_CREDENTIALS",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidAction => "INVALID_ACTION",
            ErrorCode::ProviderNotFound => "PROVIDER_NOT_FOUND",
            ErrorCode::ProviderInactive => "PROVIDER_INACTIVE",
            ErrorCode::InstanceNotFound => "INSTANCE_NOT_FOUND",
            ErrorCode::InsufficientResources => "INSUFFICIENT_RESOURCES",
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::UnsupportedProvider => "UNSUPPORTED_PROVIDER",
            ErrorCode::ProviderNotImplemented => "PROVIDER_NOT_IMPLEMENTED",
            ErrorCode::ApiError => "API_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
            ErrorCode::Http(status) => return Cow::Owned(format!("HTTP_{}", status)),
            ErrorCode::Vendor(code) => return Cow::Borrowed(code.as_str()),
        };
        Cow::Borrowed(s)
    }

    /// Build a code from a vendor error identifier such as `"not_found"` or
    /// `"unprocessable entity"`: upper-cased, non-alphanumerics become `_`.
    pub fn from_identifier(identifier: &str) -> Self {
        let code: String = identifier
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        if code.is_empty() {
            return ErrorCode::UnknownError;
        }
        code.parse().unwrap_or(ErrorCode::Vendor(code))
    }

    /// HTTP status carried by an `HTTP_<status>` code
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ErrorCode::Http(status) => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let code = match s {
            "MISSING_CREDENTIALS" => ErrorCode::MissingCredentials,
            "INVALID_CREDENTIALS" => ErrorCode::InvalidCredentials,
            "VALIDATION_ERROR" => ErrorCode::ValidationError,
            "INVALID_ACTION" => ErrorCode::InvalidAction,
            "PROVIDER_NOT_FOUND" => ErrorCode::ProviderNotFound,
            "PROVIDER_INACTIVE" => ErrorCode::ProviderInactive,
            "INSTANCE_NOT_FOUND" => ErrorCode::InstanceNotFound,
            "INSUFFICIENT_RESOURCES" => ErrorCode::InsufficientResources,
            "RATE_LIMIT_EXCEEDED" => ErrorCode::RateLimitExceeded,
            "UNSUPPORTED_PROVIDER" => ErrorCode::UnsupportedProvider,
            "PROVIDER_NOT_IMPLEMENTED" => ErrorCode::ProviderNotImplemented,
            "API_ERROR" => ErrorCode::ApiError,
            "UNKNOWN_ERROR" => ErrorCode::UnknownError,
            other => match other.strip_prefix("HTTP_").and_then(|s| s.parse::<u16>().ok()) {
                Some(status) => ErrorCode::Http(status),
                None => ErrorCode::Vendor(other.to_string()),
            },
        };
        Ok(code)
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or(ErrorCode::UnknownError))
    }
}

/// Normalized, vendor-agnostic error
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("[{provider}] {code}: {message}")]
pub struct ProviderError {
    pub code: ErrorCode,

    pub message: String,

    /// Offending request field, for validation errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Vendor tag (`linode`, `digitalocean`), or the requested tag/id when
    /// the failure happened before a vendor was selected
    pub provider: String,

    /// Vendor-native payload the error was built from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_error: Option<serde_json::Value>,
}

impl ProviderError {
    pub fn new(code: ErrorCode, message: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            provider: provider.into(),
            original_error: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_original(mut self, original: serde_json::Value) -> Self {
        self.original_error = Some(original);
        self
    }

    pub fn missing_credentials(provider: ProviderType) -> Self {
        Self::new(
            ErrorCode::MissingCredentials,
            format!("{} API token is not configured", provider.display_name()),
            provider.as_str(),
        )
    }

    pub fn invalid_action(provider: ProviderType, action: &str) -> Self {
        Self::new(
            ErrorCode::InvalidAction,
            format!(
                "Action '{}' is not supported by {}",
                action,
                provider.display_name()
            ),
            provider.as_str(),
        )
    }

    pub fn validation(
        provider: ProviderType,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCode::ValidationError, message, provider.as_str()).with_field(field)
    }

    pub fn api(provider: ProviderType, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiError, message, provider.as_str())
    }

    /// Check the error code
    pub fn is(&self, code: &ErrorCode) -> bool {
        &self.code == code
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip_through_string() {
        for code in [
            ErrorCode::MissingCredentials,
            ErrorCode::RateLimitExceeded,
            ErrorCode::Http(503),
            ErrorCode::Vendor("NOT_FOUND".to_string()),
        ] {
            let parsed: ErrorCode = code.to_string().parse().unwrap();
            assert_eq!(parsed, code);
        }
    }

    #[test]
    fn test_from_identifier() {
        assert_eq!(
            ErrorCode::from_identifier("not_found"),
            ErrorCode::Vendor("NOT_FOUND".to_string())
        );
        assert_eq!(
            ErrorCode::from_identifier("unprocessable entity"),
            ErrorCode::Vendor("UNPROCESSABLE_ENTITY".to_string())
        );
        assert_eq!(
            ErrorCode::from_identifier("rate-limit-exceeded"),
            ErrorCode::RateLimitExceeded
        );
        assert_eq!(ErrorCode::from_identifier("  "), ErrorCode::UnknownError);
    }

    #[test]
    fn test_error_serializes_camel_case() {
        let err = ProviderError::validation(ProviderType::Linode, "label", "Label too short")
            .with_original(serde_json::json!({"status": 400}));
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["field"], "label");
        assert_eq!(json["provider"], "linode");
        assert_eq!(json["originalError"]["status"], 400);
    }

    #[test]
    fn test_display() {
        let err = ProviderError::missing_credentials(ProviderType::DigitalOcean);
        assert_eq!(
            err.to_string(),
            "[digitalocean] MISSING_CREDENTIALS: DigitalOcean API token is not configured"
        );
    }
}
