pub mod mysql_report_store;
