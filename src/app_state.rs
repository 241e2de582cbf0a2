use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::core::persistence::logs::log_repository::LogRepositoryImpl;
use crate::core::persistence::mysql::mysql_report_store::MySqlReportStore;
use crate::domain::report::service::ReportService;
use crate::domain::system::service::log_service::LogService;
use crate::domain::system::service::status_service::SystemService;
use crate::domain::terminal::service::TerminalService;

#[derive(Clone)]
pub struct AppState {
    pub report_service: Arc<ReportService<MySqlReportStore>>,
    pub terminal_service: Arc<TerminalService<MySqlReportStore>>,
    pub system_service: Arc<SystemService<MySqlReportStore>>,
    pub log_service: Arc<LogService<LogRepositoryImpl>>,
}

/// Wire services over one shared connection pool. Report runs are cancelled
/// when `shutdown` is.
pub fn build_app_state(
    config: &AppConfig,
    store: MySqlReportStore,
    shutdown: CancellationToken,
) -> AppState {
    let settings = config.report_settings();

    AppState {
        report_service: Arc::new(ReportService::new(store.clone(), settings, shutdown)),
        terminal_service: Arc::new(TerminalService::new(store.clone())),
        system_service: Arc::new(SystemService::new(store, settings)),
        log_service: Arc::new(LogService::new(LogRepositoryImpl::new(&config.log_dir))),
    }
}
