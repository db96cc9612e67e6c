//! HTTP error mapping for hub handlers.
//!
//! Every failure renders as `{"ok": false, "error": "..."}`. Dispatch
//! failures also carry the progress made before the failing batch.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use folio_core::Error;

pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Upstream(_) | Error::Configuration(_) | Error::DispatchFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = serde_json::json!({
            "ok": false,
            "error": self.0.to_string(),
        });

        if let Error::DispatchFailed { report, .. } = &self.0 {
            body["totalRecipients"] = report.total_recipients.into();
            body["sent"] = report.sent.into();
            body["batches"] = report.batches.into();
        }

        (status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

/// Malformed JSON bodies are caller errors.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(Error::InvalidInput(rejection.body_text()))
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;
