//! Vendor error normalization
//!
//! Pure, total mappings from a vendor-native [`VendorError`] to a
//! [`ProviderError`]. Rules are applied in priority order:
//!
//! 1. structured validation list: first entry becomes `VALIDATION_ERROR`,
//!    whatever the status
//! 2. vendor identifier/message pair: identifier becomes the code
//! 3. HTTP status: `HTTP_<status>` with a default message
//! 4. generic failure: `API_ERROR` (`RATE_LIMIT_EXCEEDED` once retries ran out)
//! 5. anything else: `UNKNOWN_ERROR`

use serde_json::Value;

use crate::client::VendorError;
use crate::error::{ErrorCode, ProviderError};
use crate::types::ProviderType;

const UNKNOWN_MESSAGE: &str = "An unknown error occurred";

/// Normalize an error from any vendor
pub fn normalize_error(provider: ProviderType, error: &VendorError) -> ProviderError {
    match provider {
        ProviderType::Linode => normalize_linode_error(error),
        ProviderType::DigitalOcean => normalize_digitalocean_error(error),
        other => normalize_with(other, error, &GENERIC_SHAPE),
    }
}

/// Linode answers `{"errors": [{"reason": "...", "field": "..."}]}` for
/// every failure, so any status carrying that list is a validation error.
pub fn normalize_linode_error(error: &VendorError) -> ProviderError {
    normalize_with(ProviderType::Linode, error, &LINODE_SHAPE)
}

/// DigitalOcean answers `{"id": "not_found", "message": "..."}`.
pub fn normalize_digitalocean_error(error: &VendorError) -> ProviderError {
    normalize_with(ProviderType::DigitalOcean, error, &DIGITALOCEAN_SHAPE)
}

/// Where a vendor keeps its error details
struct ErrorShape {
    /// Key of the message inside a validation list entry
    entry_message: &'static str,
    /// Whether `{id, message}` pairs are recognized
    identifier_pair: bool,
}

const LINODE_SHAPE: ErrorShape = ErrorShape {
    entry_message: "reason",
    identifier_pair: false,
};

const DIGITALOCEAN_SHAPE: ErrorShape = ErrorShape {
    entry_message: "message",
    identifier_pair: true,
};

const GENERIC_SHAPE: ErrorShape = ErrorShape {
    entry_message: "message",
    identifier_pair: true,
};

fn normalize_with(provider: ProviderType, error: &VendorError, shape: &ErrorShape) -> ProviderError {
    let tag = provider.as_str();
    let normalized = match error {
        VendorError::Response {
            status,
            status_text,
            body,
        } => {
            if let Some((message, field)) = body.as_ref().and_then(|b| first_list_entry(b, shape)) {
                let mut err = ProviderError::new(ErrorCode::ValidationError, message, tag);
                err.field = field;
                err
            } else if let Some((id, message)) = body
                .as_ref()
                .filter(|_| shape.identifier_pair)
                .and_then(identifier_pair)
            {
                ProviderError::new(ErrorCode::from_identifier(&id), message, tag)
            } else if let Some(status) = status {
                let message = status_text
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| status_message(provider, *status));
                ProviderError::new(ErrorCode::Http(*status), message, tag)
            } else {
                ProviderError::new(ErrorCode::UnknownError, UNKNOWN_MESSAGE, tag)
            }
        }
        VendorError::RateLimited { attempts, .. } => ProviderError::new(
            ErrorCode::RateLimitExceeded,
            format!(
                "{} rate limit exceeded after {} attempts",
                provider.display_name(),
                attempts
            ),
            tag,
        ),
        VendorError::Failure(message) if !message.trim().is_empty() => {
            ProviderError::new(ErrorCode::ApiError, message.clone(), tag)
        }
        VendorError::Failure(_) => ProviderError::new(ErrorCode::UnknownError, UNKNOWN_MESSAGE, tag),
    };

    normalized.with_original(error.to_json())
}

/// First entry of an `errors` array as `(message, field)`
fn first_list_entry(body: &Value, shape: &ErrorShape) -> Option<(String, Option<String>)> {
    let first = body.get("errors")?.as_array()?.first()?;
    let message = first
        .get(shape.entry_message)
        .or_else(|| first.get("message"))
        .or_else(|| first.get("reason"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("Validation failed")
        .to_string();
    let field = first
        .get("field")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some((message, field))
}

/// `{id, message}` pair
fn identifier_pair(body: &Value) -> Option<(String, String)> {
    let id = body.get("id")?.as_str()?;
    let message = body.get("message")?.as_str()?;
    if id.trim().is_empty() {
        return None;
    }
    let message = if message.trim().is_empty() {
        UNKNOWN_MESSAGE
    } else {
        message
    };
    Some((id.to_string(), message.to_string()))
}

/// Default message for an HTTP status
pub fn status_message(provider: ProviderType, status: u16) -> String {
    match status {
        401 => "Authentication failed - invalid API token".to_string(),
        403 => "Access forbidden - insufficient permissions".to_string(),
        404 => "Resource not found".to_string(),
        422 => "Validation failed - check request parameters".to_string(),
        429 => "Rate limit exceeded - too many requests".to_string(),
        500..=599 => format!(
            "{} service unavailable - please try again later",
            provider.display_name()
        ),
        other => format!("HTTP error {}", other),
    }
}

/// Sentence suitable for showing to an end user
pub fn user_friendly_message(error: &ProviderError) -> String {
    let message = match &error.code {
        ErrorCode::MissingCredentials => {
            "API credentials are not configured for this provider. Add an API token in the provider settings."
        }
        ErrorCode::InvalidCredentials | ErrorCode::Http(401) => {
            "The provider rejected the API token. Check that it is valid and has not expired."
        }
        ErrorCode::Http(403) => "The API token does not have permission to perform this operation.",
        ErrorCode::ValidationError | ErrorCode::Http(422) => {
            "Some of the submitted values were rejected by the provider. Review the form and try again."
        }
        ErrorCode::InvalidAction => "This action is not available for this server.",
        ErrorCode::ProviderNotFound => "The selected provider could not be found.",
        ErrorCode::ProviderInactive => "The selected provider is currently disabled.",
        ErrorCode::InstanceNotFound | ErrorCode::Http(404) => "The requested server could not be found.",
        ErrorCode::InsufficientResources => {
            "The provider does not have enough capacity for this request. Try another plan or region."
        }
        ErrorCode::RateLimitExceeded | ErrorCode::Http(429) => {
            "Too many requests were sent to the provider. Please wait a moment and try again."
        }
        ErrorCode::Http(500..=599) => {
            "The provider is experiencing problems. Please try again later."
        }
        ErrorCode::UnsupportedProvider | ErrorCode::ProviderNotImplemented => {
            "This provider is not supported yet."
        }
        ErrorCode::ApiError => "The provider returned an error. Please try again.",
        _ => return error.message.clone(),
    };
    message.to_string()
}
