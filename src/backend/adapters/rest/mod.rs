//! REST adapters for the two backends.
//!
//! Both adapters speak JSON over HTTP with bearer auth and a bounded
//! request timeout. Response classification is shared: 404 surfaces as
//! absence, 401/403 as auth failure, 408/429/5xx as transient, anything
//! else non-2xx as a hard rejection.

mod database;
mod tasklist;

pub use database::DatabaseRestBackend;
pub use tasklist::TasklistRestBackend;

use crate::backend::error::{BackendError, BackendResult};
use reqwest::{Response, StatusCode};
use std::time::Duration;

/// Builds the shared HTTP client with the bounded per-request timeout.
///
/// # Errors
///
/// Returns [`BackendError::Transport`] when client construction fails.
pub(crate) fn build_client(timeout: Duration) -> BackendResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(BackendError::transport)
}

/// Maps a transport-level failure onto the error taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() || err.is_connect() {
        BackendError::transient(err.to_string())
    } else {
        BackendError::transport(err)
    }
}

/// Classifies a non-2xx response. `None` means "not found".
pub(crate) async fn check_status(response: Response) -> BackendResult<Option<Response>> {
    let status = response.status();
    if status.is_success() {
        return Ok(Some(response));
    }
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(BackendError::Auth(body));
    }
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        return Err(BackendError::transient_status(status.as_u16(), body));
    }
    Err(BackendError::Rejected {
        status: status.as_u16(),
        reason: body,
    })
}

/// Parses a JSON response body into a typed record, mapping failures to
/// boundary-validation errors.
pub(crate) async fn parse_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> BackendResult<T> {
    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body).map_err(|err| BackendError::InvalidRecord(err.to_string()))
}
