//! App Store Connect REST API endpoint constants.

/// Base URL for the App Store Connect REST API.
pub const ASC_BASE_URL: &str = "https://api.appstoreconnect.apple.com";

/// Host of [`ASC_BASE_URL`].
pub const API_HOST: &str = "api.appstoreconnect.apple.com";

/// Apps.
pub const APPS: &str = "/v1/apps";

/// Sales and trends reports.
pub const SALES_REPORTS: &str = "/v1/salesReports";

/// A single app.
pub fn app(id: &str) -> String {
    format!("{APPS}/{id}")
}

/// Segments of an analytics report instance.
pub fn analytics_report_instance_segments(instance_id: &str) -> String {
    format!("/v1/analyticsReportInstances/{instance_id}/segments")
}
