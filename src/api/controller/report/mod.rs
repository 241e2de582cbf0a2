//! Report controller: connects routes to the usage report engine

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;

use crate::api::dto::report_dto::UsageReportQuery;
use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::domain::report::dto::usage_report_request::UsageReportRequest;
use crate::domain::report::model::ReportEntry;
use crate::errors::AppError;

pub struct ReportController;

impl ReportController {
    pub async fn get_usage_report(
        State(state): State<AppState>,
        query: Result<Query<UsageReportQuery>, QueryRejection>,
    ) -> Result<Json<ApiResponse<Vec<ReportEntry>>>, AppError> {
        let Query(query) = query.map_err(|e| AppError::BodyParsingError(e.body_text()))?;
        let control = state.report_service.run_control();

        to_json(
            state
                .report_service
                .get_usage_report(query.into(), &control)
                .await,
        )
    }

    pub async fn post_usage_report(
        State(state): State<AppState>,
        payload: Result<Json<UsageReportRequest>, JsonRejection>,
    ) -> Result<Json<ApiResponse<Vec<ReportEntry>>>, AppError> {
        let Json(payload) = payload.map_err(|e| AppError::BodyParsingError(e.body_text()))?;
        let control = state.report_service.run_control();

        to_json(
            state
                .report_service
                .get_usage_report(payload, &control)
                .await,
        )
    }
}
