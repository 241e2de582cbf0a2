//! Terminal routes (e.g., /api/v1/terminals/*)

use axum::{routing::get, Router};
use crate::api::controller::terminal::TerminalController;
use crate::app_state::AppState;

pub fn terminal_routes() -> Router<AppState> {
    Router::new().route("/tree", get(TerminalController::get_terminals_tree))
}
