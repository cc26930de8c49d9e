use axum::{
    Json,
    response::{IntoResponse, Response},
};

use super::{ErrorCode, ErrorResponse};

/// Fallback handler for unmatched routes.
pub async fn not_found() -> Response {
    let code = ErrorCode::RouteNotFound;
    (
        code.status(),
        Json(ErrorResponse::new(code, code.default_message())),
    )
        .into_response()
}

pub async fn method_not_allowed() -> Response {
    let code = ErrorCode::MethodNotAllowed;
    (
        code.status(),
        Json(ErrorResponse::new(code, code.default_message())),
    )
        .into_response()
}
