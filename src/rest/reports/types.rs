//! Types for the analytics and sales report endpoints.

use serde::{Deserialize, Serialize};

use crate::types::{Document, Resource};

/// Attributes of one downloadable piece of an analytics report instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReportSegmentAttributes {
    /// Checksum of the segment file
    #[serde(default)]
    pub checksum: Option<String>,
    /// Size of the segment file
    #[serde(default)]
    pub size_in_bytes: Option<u64>,
    /// Pre-signed download URL
    #[serde(default)]
    pub url: Option<String>,
}

/// An analytics report segment resource.
pub type AnalyticsReportSegment = Resource<AnalyticsReportSegmentAttributes>;

/// Response of `GET /v1/analyticsReportInstances/{id}/segments`.
pub type AnalyticsReportSegmentsResponse = Document<Vec<AnalyticsReportSegment>>;

/// Period covered by a sales report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Kind of sales report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesReportType {
    Sales,
    PreOrder,
    Newsstand,
    Subscription,
    SubscriptionEvent,
    Subscriber,
    SubscriptionOfferCodeRedemption,
    InstallsByVersion,
}

/// Level of detail of a sales report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesReportSubType {
    Summary,
    Detailed,
    SummaryInstallType,
    SummaryTerritory,
    SummaryChannel,
}

/// Query parameters for `GET /v1/salesReports`.
#[derive(Debug, Clone, Serialize)]
pub struct SalesReportRequest {
    /// Report period
    #[serde(rename = "filter[frequency]")]
    pub frequency: ReportFrequency,
    /// Report kind
    #[serde(rename = "filter[reportType]")]
    pub report_type: SalesReportType,
    /// Report detail level
    #[serde(rename = "filter[reportSubType]")]
    pub report_sub_type: SalesReportSubType,
    /// Vendor number from Payments and Financial Reports
    #[serde(rename = "filter[vendorNumber]")]
    pub vendor_number: String,
    /// Report date: `YYYY-MM-DD`, `YYYY-MM` or `YYYY` depending on frequency.
    /// Omitted for the most recent report.
    #[serde(rename = "filter[reportDate]", skip_serializing_if = "Option::is_none")]
    pub report_date: Option<String>,
    /// Report format version, e.g. `1_0`
    #[serde(rename = "filter[version]", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl SalesReportRequest {
    /// A summary sales report for `vendor_number`.
    pub fn summary(vendor_number: impl Into<String>, frequency: ReportFrequency) -> Self {
        Self {
            frequency,
            report_type: SalesReportType::Sales,
            report_sub_type: SalesReportSubType::Summary,
            vendor_number: vendor_number.into(),
            report_date: None,
            version: None,
        }
    }

    /// Set the report date.
    pub fn report_date(mut self, date: impl Into<String>) -> Self {
        self.report_date = Some(date.into());
        self
    }

    /// Set the report format version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sales_report_query() {
        let request = SalesReportRequest::summary("85012345", ReportFrequency::Daily)
            .report_date("2024-03-01")
            .version("1_0");
        assert_eq!(
            serde_urlencoded::to_string(&request).unwrap(),
            "filter%5Bfrequency%5D=DAILY&filter%5BreportType%5D=SALES\
             &filter%5BreportSubType%5D=SUMMARY&filter%5BvendorNumber%5D=85012345\
             &filter%5BreportDate%5D=2024-03-01&filter%5Bversion%5D=1_0"
        );
    }

    #[test]
    fn test_segments_response() {
        let json = r#"{
            "data": [{
                "type": "analyticsReportSegments",
                "id": "seg-1",
                "attributes": {
                    "checksum": "abc123",
                    "sizeInBytes": 2048,
                    "url": "https://example.cloudfront.net/seg-1.csv.gz?Signature=xyz"
                }
            }],
            "links": {"self": "/v1/analyticsReportInstances/inst-1/segments"}
        }"#;
        let response: AnalyticsReportSegmentsResponse = serde_json::from_str(json).unwrap();
        let attributes = response.data[0].attributes.as_ref().unwrap();
        assert_eq!(attributes.size_in_bytes, Some(2048));
        assert!(attributes.url.as_deref().unwrap().contains("Signature="));
    }
}
