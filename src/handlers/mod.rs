// handlers/mod.rs - resource controllers
//
// Handlers assume their route policy already ran: anything that needs the
// caller takes `CurrentAccount`, which only the Authenticate gate provides.

pub mod chat;
pub mod jobs;
pub mod reviews;
pub mod service;
pub mod uploads;
pub mod users;

use axum::extract::FromRequest;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// JSON body extractor whose rejections use the API error body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Parse a path id. An id that does not parse names nothing, so it is a 404.
pub(crate) fn parse_id(raw: &str, resource: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(format!("{} not found", resource)))
}

/// Require a non-blank string field, returning it trimmed.
pub(crate) fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(format!("{} is required", field))),
    }
}

/// Basic email shape check: one `@`, non-empty local part, dotted domain.
pub(crate) fn validate_email_format(email: &str) -> ApiResult<()> {
    let invalid = || ApiError::bad_request("Invalid email format");

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(())
}
