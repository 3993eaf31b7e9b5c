//! Error → HTTP response mapping
//!
//! Every handler returns [`ApiResult`]. Errors leave as
//! `{ "ok": false, "error": "<message>" }` with a status derived from
//! [`ErrorClass`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use adcon_core::prelude::*;

/// Handler result: a JSON body on success, the error envelope otherwise
pub type ApiResult = std::result::Result<Json<serde_json::Value>, ApiError>;

/// Boundary wrapper so `?` converts any [`Error`] into a response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        status_for(self.0.class())
    }
}

pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Validation => StatusCode::BAD_REQUEST,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected ({}): {}", status.as_u16(), self.0);
        }
        envelope_error(status, self.0.to_string())
    }
}

/// `{ok:false, error}` with the given status
pub fn envelope_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "ok": false, "error": message.into() })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::validation("Missing ?serial="), StatusCode::BAD_REQUEST),
            (Error::not_found("Artifact not found"), StatusCode::NOT_FOUND),
            (Error::conflict("Build already running"), StatusCode::CONFLICT),
            (Error::upstream("adb: device offline"), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::tool_not_found("emulator"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError(error).status(), expected);
        }
    }

    #[test]
    fn test_response_status() {
        let response = ApiError(Error::conflict("Build already running")).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
