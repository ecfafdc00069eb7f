//! Analytics and sales report endpoints.
//!
//! Analytics segments are served from pre-signed URLs on Apple or CDN hosts.
//! Those URLs are checked with
//! [`TrustPolicy::validate_analytics_download_url`](crate::url_guard::TrustPolicy::validate_analytics_download_url)
//! and fetched without the bearer token.

mod types;

pub use types::*;

use bytes::Bytes;

use crate::error::AscError;
use crate::rest::endpoints::{self, SALES_REPORTS};
use crate::rest::{AscRestClient, RequestDescriptor, checked_id};

/// `Accept` value for analytics segment downloads.
pub const CSV_MEDIA_TYPE: &str = "text/csv";

/// `Accept` value for sales report downloads.
pub const GZIP_MEDIA_TYPE: &str = "application/a-gzip";

impl AscRestClient {
    /// List the segments of an analytics report instance.
    pub async fn list_analytics_report_segments(
        &self,
        instance_id: &str,
    ) -> Result<AnalyticsReportSegmentsResponse, AscError> {
        let path = endpoints::analytics_report_instance_segments(checked_id(instance_id)?);
        self.get(&path).await
    }

    /// Download the file behind an analytics report segment.
    pub async fn download_analytics_segment(
        &self,
        segment: &AnalyticsReportSegment,
    ) -> Result<Bytes, AscError> {
        let url = segment
            .attributes
            .as_ref()
            .and_then(|attributes| attributes.url.as_deref())
            .ok_or_else(|| {
                AscError::InvalidRequest(format!("segment {} has no download URL", segment.id))
            })?;
        self.download_analytics_url(url).await
    }

    /// Download an analytics file from a pre-signed URL.
    ///
    /// The URL must be https on an Apple host, or a signed URL on a known CDN.
    pub async fn download_analytics_url(&self, url: &str) -> Result<Bytes, AscError> {
        let url = self.trust_policy().validate_analytics_download_url(url)?;
        self.download(&self.context(), &url, CSV_MEDIA_TYPE).await
    }

    /// Download a gzip-compressed sales report.
    ///
    /// The body is returned as received; decompression is left to the caller.
    pub async fn download_sales_report(
        &self,
        request: &SalesReportRequest,
    ) -> Result<Bytes, AscError> {
        let query = serde_urlencoded::to_string(request)
            .map_err(|e| AscError::InvalidRequest(e.to_string()))?;
        let descriptor = RequestDescriptor::get(format!("{SALES_REPORTS}?{query}"))
            .with_accept(GZIP_MEDIA_TYPE);
        self.execute(&self.context(), &descriptor).await
    }
}
