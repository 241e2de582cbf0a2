//! Terminal controller: network / inroute group / terminal tree

use axum::extract::State;
use axum::Json;

use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::domain::terminal::model::NetworkNode;
use crate::errors::AppError;

pub struct TerminalController;

impl TerminalController {
    pub async fn get_terminals_tree(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<Vec<NetworkNode>>>, AppError> {
        to_json(state.terminal_service.get_terminals_tree().await)
    }
}
