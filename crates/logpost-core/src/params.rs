//! Raw query parameters as received from a client.

use serde::{Deserialize, Serialize};

/// Query-string parameters for a message listing, before any interpretation.
///
/// Every value stays a string here; [`crate::PaginationPolicy`] and
/// [`crate::FilterParams`] decode them exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    /// Zero-based page number
    pub page: Option<String>,
    /// Page size
    pub per_page: Option<String>,
    /// Sort field
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub order: Option<String>,
    /// Upper time bound (inclusive)
    pub before: Option<String>,
    /// Lower time bound (inclusive)
    pub after: Option<String>,
    /// Exact service name
    pub service: Option<String>,
    /// Substring searched across address, message, service and severity
    pub contains: Option<String>,
}

impl QueryParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `page`.
    #[must_use]
    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    /// Sets `perPage`.
    #[must_use]
    pub fn with_per_page(mut self, per_page: impl Into<String>) -> Self {
        self.per_page = Some(per_page.into());
        self
    }

    /// Sets `sortBy`.
    #[must_use]
    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }

    /// Sets `order`.
    #[must_use]
    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Sets `before`.
    #[must_use]
    pub fn with_before(mut self, before: impl Into<String>) -> Self {
        self.before = Some(before.into());
        self
    }

    /// Sets `after`.
    #[must_use]
    pub fn with_after(mut self, after: impl Into<String>) -> Self {
        self.after = Some(after.into());
        self
    }

    /// Sets `service`.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets `contains`.
    #[must_use]
    pub fn with_contains(mut self, contains: impl Into<String>) -> Self {
        self.contains = Some(contains.into());
        self
    }
}

/// Returns the trimmed value if present and non-empty.
pub(crate) fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Like [`present`], but a value that is not blank is returned verbatim.
pub(crate) fn present_verbatim(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_names() {
        let params: QueryParams = serde_json::from_value(serde_json::json!({
            "perPage": "5",
            "sortBy": "severity",
            "contains": "disk"
        }))
        .unwrap_or_default();

        assert_eq!(params.per_page.as_deref(), Some("5"));
        assert_eq!(params.sort_by.as_deref(), Some("severity"));
        assert_eq!(params.contains.as_deref(), Some("disk"));
        assert!(params.page.is_none());
    }

    #[test]
    fn present_treats_blank_as_absent() {
        assert_eq!(present(Some(&"  ".to_string())), None);
        assert_eq!(present(Some(&String::new())), None);
        assert_eq!(present(Some(&" 3 ".to_string())), Some("3"));
        assert_eq!(present(None), None);
    }

    #[test]
    fn present_verbatim_keeps_surrounding_spaces() {
        assert_eq!(present_verbatim(Some(&" disk full ".to_string())), Some(" disk full "));
        assert_eq!(present_verbatim(Some(&"   ".to_string())), None);
        assert_eq!(present_verbatim(None), None);
    }
}
