//! Classification of non-2xx responses.
//!
//! 429 and 503 become [`RetryableError`]s carrying the server's `Retry-After`
//! hint. Every other status becomes a permanent [`ApiError`].

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use time::{OffsetDateTime, PrimitiveDateTime, macros::format_description};

use crate::error::{ApiError, AscError, MAX_ERROR_TEXT_CHARS, RetryableError, sanitize_for_display};
use crate::types::ErrorResponse;

/// Whether `status` is a transient failure worth repeating.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
    )
}

/// Turn a non-2xx response into an error.
pub fn classify(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> AscError {
    let api_error = parse_error_body(status.as_u16(), body);

    if is_retryable_status(status) {
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(parse_retry_after)
            .filter(|delay| !delay.is_zero());

        let message = retryable_message(&api_error, status);
        return AscError::Retryable(RetryableError::new(status.as_u16(), message, retry_after));
    }

    AscError::Api(api_error)
}

/// Extract the first JSON:API error object, falling back to a sanitized
/// excerpt of the raw body.
pub fn parse_error_body(status: u16, body: &[u8]) -> ApiError {
    let clean = |text: Option<String>| {
        text.map(|t| sanitize_for_display(&t, MAX_ERROR_TEXT_CHARS))
            .filter(|t| !t.is_empty())
    };

    if let Ok(parsed) = serde_json::from_slice::<ErrorResponse>(body) {
        let additional_errors = parsed.errors.len().saturating_sub(1);
        if let Some(first) = parsed.errors.into_iter().next() {
            let error = ApiError {
                status,
                code: clean(first.code),
                title: clean(first.title),
                detail: clean(first.detail),
                additional_errors,
                raw: None,
            };
            if error.code.is_some() || error.title.is_some() || error.detail.is_some() {
                return error;
            }
        }
    }

    let raw = String::from_utf8_lossy(body);
    ApiError::from_raw(status, sanitize_for_display(&raw, MAX_ERROR_TEXT_CHARS))
}

fn retryable_message(error: &ApiError, status: StatusCode) -> String {
    match (&error.title, &error.detail) {
        (Some(title), Some(detail)) => format!("{title} - {detail}"),
        (Some(text), None) | (None, Some(text)) => text.clone(),
        (None, None) => match error.raw.as_deref().filter(|raw| !raw.is_empty()) {
            Some(raw) => raw.to_string(),
            None => status
                .canonical_reason()
                .unwrap_or("transient failure")
                .to_string(),
        },
    }
}

/// Parse a `Retry-After` header value relative to the current time.
///
/// Returns [`Duration::ZERO`] when the value carries no usable hint.
pub fn parse_retry_after(value: &str) -> Duration {
    parse_retry_after_at(value, OffsetDateTime::now_utc())
}

/// Parse a `Retry-After` header value relative to `now`.
///
/// Accepts a positive number of seconds, or an HTTP date in RFC 1123,
/// RFC 850 or ANSI C `asctime` form. Dates in the past yield zero.
pub fn parse_retry_after_at(value: &str, now: OffsetDateTime) -> Duration {
    let value = value.trim();
    if value.is_empty() {
        return Duration::ZERO;
    }

    if let Ok(seconds) = value.parse::<u64>() {
        if seconds > 0 {
            return Duration::from_secs(seconds);
        }
    }

    let parsers: [fn(&str) -> Option<PrimitiveDateTime>; 3] =
        [parse_rfc1123, parse_rfc850, parse_ansic];
    for parse in parsers {
        let Some(when) = parse(value) else {
            continue;
        };
        let remaining = when.assume_utc() - now;
        if remaining.is_positive() {
            return remaining.unsigned_abs();
        }
    }

    Duration::ZERO
}

fn strip_zone(value: &str) -> Option<&str> {
    value
        .strip_suffix(" GMT")
        .or_else(|| value.strip_suffix(" UTC"))
}

/// `Mon, 02 Jan 2006 15:04:05 GMT`
fn parse_rfc1123(value: &str) -> Option<PrimitiveDateTime> {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second]"
    );
    PrimitiveDateTime::parse(strip_zone(value)?, format).ok()
}

/// `Monday, 02-Jan-06 15:04:05 GMT`
fn parse_rfc850(value: &str) -> Option<PrimitiveDateTime> {
    let (_weekday, rest) = strip_zone(value)?.split_once(", ")?;
    let (date, clock) = rest.split_once(' ')?;
    let mut parts = date.splitn(3, '-');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if year.len() != 2 {
        return None;
    }
    let short_year: i32 = year.parse().ok()?;
    // Two-digit years 69-99 are 1969-1999, 00-68 are 2000-2068.
    let full_year = if short_year >= 69 {
        1900 + short_year
    } else {
        2000 + short_year
    };

    let format =
        format_description!("[day]-[month repr:short]-[year] [hour]:[minute]:[second]");
    PrimitiveDateTime::parse(&format!("{day}-{month}-{full_year} {clock}"), format).ok()
}

/// `Mon Jan  2 15:04:05 2006`
fn parse_ansic(value: &str) -> Option<PrimitiveDateTime> {
    let format = format_description!(
        "[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
    );
    PrimitiveDateTime::parse(value, format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn now() -> OffsetDateTime {
        // Tue, 14 Nov 2023 22:13:20 GMT
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    fn rfc1123(when: OffsetDateTime) -> String {
        let format = format_description!(
            "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
        );
        when.format(format).unwrap()
    }

    #[test]
    fn test_retry_after_seconds() {
        assert_eq!(parse_retry_after_at("120", now()), Duration::from_secs(120));
        assert_eq!(parse_retry_after_at("  5 ", now()), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_after_empty_or_invalid() {
        assert_eq!(parse_retry_after_at("", now()), Duration::ZERO);
        assert_eq!(parse_retry_after_at("   ", now()), Duration::ZERO);
        assert_eq!(parse_retry_after_at("0", now()), Duration::ZERO);
        assert_eq!(parse_retry_after_at("-5", now()), Duration::ZERO);
        assert_eq!(parse_retry_after_at("soon", now()), Duration::ZERO);
    }

    #[test]
    fn test_retry_after_rfc1123_future() {
        let header = rfc1123(now() + time::Duration::seconds(30));
        assert_eq!(header, "Tue, 14 Nov 2023 22:13:50 GMT");
        assert_eq!(parse_retry_after_at(&header, now()), Duration::from_secs(30));
    }

    #[test]
    fn test_retry_after_rfc1123_past() {
        let header = rfc1123(now() - time::Duration::seconds(30));
        assert_eq!(parse_retry_after_at(&header, now()), Duration::ZERO);
    }

    #[test]
    fn test_retry_after_rfc1123_wall_clock() {
        let header = rfc1123(OffsetDateTime::now_utc() + time::Duration::seconds(30));
        let delay = parse_retry_after(&header);
        assert!(delay > Duration::from_secs(27), "{delay:?}");
        assert!(delay <= Duration::from_secs(30), "{delay:?}");
    }

    #[test]
    fn test_retry_after_rfc850() {
        let delay = parse_retry_after_at("Tuesday, 14-Nov-23 22:14:20 GMT", now());
        assert_eq!(delay, Duration::from_secs(60));
    }

    #[test]
    fn test_retry_after_ansic() {
        let delay = parse_retry_after_at("Tue Nov 14 22:15:20 2023", now());
        assert_eq!(delay, Duration::from_secs(120));

        let early = OffsetDateTime::from_unix_timestamp(1_136_214_000).unwrap(); // 2006-01-02 15:00:00
        let delay = parse_retry_after_at("Mon Jan  2 15:04:05 2006", early);
        assert_eq!(delay, Duration::from_secs(245));
    }

    #[test]
    fn test_classify_rate_limit() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        let body = br#"{"errors":[{"status":"429","code":"RATE_LIMIT_EXCEEDED",
            "title":"The request rate limit has been reached.",
            "detail":"We've received too many requests for this API."}]}"#;

        match classify(StatusCode::TOO_MANY_REQUESTS, &headers, body) {
            AscError::Retryable(e) => {
                assert_eq!(e.status, 429);
                assert_eq!(e.retry_after, Some(Duration::from_secs(7)));
                assert!(e.message.starts_with("The request rate limit has been reached."));
                assert_eq!(e.attempts, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_classify_unavailable_without_hint() {
        match classify(StatusCode::SERVICE_UNAVAILABLE, &HeaderMap::new(), b"") {
            AscError::Retryable(e) => {
                assert_eq!(e.status, 503);
                assert_eq!(e.retry_after, None);
                assert_eq!(e.message, "Service Unavailable");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_classify_permanent_json_error() {
        let body = br#"{"errors":[
            {"status":"404","code":"NOT_FOUND","title":"The specified resource does not exist",
             "detail":"There is no resource of type 'apps' with id '42'"},
            {"status":"404","code":"NOT_FOUND","title":"again"}]}"#;

        match classify(StatusCode::NOT_FOUND, &HeaderMap::new(), body) {
            AscError::Api(e) => {
                assert!(e.is_not_found());
                assert_eq!(e.code.as_deref(), Some("NOT_FOUND"));
                assert_eq!(e.title.as_deref(), Some("The specified resource does not exist"));
                assert_eq!(e.additional_errors, 1);
                assert!(e.raw.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_classify_permanent_raw_body_sanitized() {
        let mut body = b"<html>\x1b[2J upstream \x07failure".to_vec();
        body.extend(std::iter::repeat_n(b'x', 2000));

        match classify(StatusCode::BAD_GATEWAY, &HeaderMap::new(), &body) {
            AscError::Api(e) => {
                let raw = e.raw.unwrap();
                assert!(raw.starts_with("<html>[2J upstream failure"));
                assert!(!raw.contains('\x1b'));
                assert!(raw.chars().count() <= MAX_ERROR_TEXT_CHARS + 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_classify_empty_error_array_falls_back() {
        match classify(StatusCode::BAD_REQUEST, &HeaderMap::new(), br#"{"errors":[]}"#) {
            AscError::Api(e) => assert_eq!(e.raw.as_deref(), Some(r#"{"errors":[]}"#)),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
