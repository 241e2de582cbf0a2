//! Report routes (e.g., /api/v1/reports/*)

use axum::{routing::get, Router};
use crate::api::controller::report::ReportController;
use crate::app_state::AppState;

pub fn report_routes() -> Router<AppState> {
    Router::new().route(
        "/usage",
        get(ReportController::get_usage_report).post(ReportController::post_usage_report),
    )
}
