pub mod usage_report_request;
