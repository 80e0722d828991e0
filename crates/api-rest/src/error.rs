use api_shared::ErrorRes;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use triage_core::{ErrorClass, TriageError};

/// A core error on its way out as an HTTP response.
///
/// Resource exhaustion maps to `409 Conflict` with a distinct `code`, so clients can tell
/// "no beds available" apart from a fault.
#[derive(Debug)]
pub struct ApiError(pub TriageError);

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        Self(err)
    }
}

impl From<triage_core::TypesError> for ApiError {
    fn from(err: triage_core::TypesError) -> Self {
        Self(TriageError::from(err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.class() {
            ErrorClass::ResourceExhausted | ErrorClass::InvalidTransition => StatusCode::CONFLICT,
            ErrorClass::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
            ErrorClass::Fault => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:?}", self.0);
            let body = ErrorRes {
                code: self.0.code().to_string(),
                message: "Internal error".into(),
            };
            return (status, Json(body)).into_response();
        }
        (status, Json(ErrorRes::from(&self.0))).into_response()
    }
}
