//! Serde helpers for App Store Connect query parameters.

use serde::Serializer;

/// Serialize an optional list as a comma-separated string, as used by
/// `fields[...]`, `include` and `filter[...]` parameters.
///
/// `None` must be paired with `skip_serializing_if = "Option::is_none"`.
///
/// # Example
///
/// ```rust
/// use serde::Serialize;
/// use asc_api_client::types::serde_helpers::comma_separated;
///
/// #[derive(Serialize)]
/// struct Query {
///     #[serde(rename = "fields[apps]", with = "comma_separated", skip_serializing_if = "Option::is_none")]
///     fields: Option<Vec<String>>,
/// }
///
/// let query = Query { fields: Some(vec!["name".into(), "bundleId".into()]) };
/// assert_eq!(serde_urlencoded::to_string(&query).unwrap(), "fields%5Bapps%5D=name%2CbundleId");
/// ```
pub mod comma_separated {
    use super::*;

    /// Serialize the list joined with commas.
    pub fn serialize<S>(values: &Option<Vec<String>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match values {
            Some(values) => serializer.serialize_str(&values.join(",")),
            None => serializer.serialize_none(),
        }
    }
}
