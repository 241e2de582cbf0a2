use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;
use tracing::error;

use crate::api::dto::ApiResponse;
use crate::domain::report::error::ReportError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    #[error("Body parsing error: {0}")]
    BodyParsingError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Gateway timeout: {0}")]
    GatewayTimeout(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Helper for mapping any unknown error into internal error
pub fn internal_error<E: ToString>(err: E) -> AppError {
    AppError::InternalServerError(err.to_string())
}

/// Map a service error onto a status, using the [`ReportError`] it carries if any.
pub fn domain_error(err: anyhow::Error) -> AppError {
    let message = format!("{err:#}");

    match err.downcast_ref::<ReportError>() {
        Some(ReportError::InvalidWindow(_)) => AppError::BodyParsingError(message),
        Some(ReportError::Connection(_)) => AppError::ServiceUnavailable(message),
        Some(ReportError::DeadlineExceeded(_)) => AppError::GatewayTimeout(message),
        Some(ReportError::Cancelled) => AppError::ServiceUnavailable(message),
        Some(ReportError::Query { .. }) | None => {
            error!(error = %message, "Request failed");
            internal_error(message)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BodyParsingError(_) => StatusCode::BAD_REQUEST,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = Json(ApiResponse::<()>::err(self.to_string()));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};
    use std::time::Duration;

    fn status_of(err: anyhow::Error) -> StatusCode {
        domain_error(err).into_response().status()
    }

    #[test]
    fn report_errors_pick_their_status() {
        assert_eq!(
            status_of(ReportError::Connection("refused".into()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ReportError::DeadlineExceeded(Duration::from_secs(30)).into()),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(ReportError::InvalidWindow("end before start".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(anyhow!("disk full")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn query_context_is_an_internal_error() {
        let err = Err::<(), _>(anyhow!("server has gone away"))
            .context(ReportError::Query { stage: "traffic" })
            .unwrap_err();

        let app_err = domain_error(err);
        assert!(app_err.to_string().contains("traffic"));
        assert_eq!(app_err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
