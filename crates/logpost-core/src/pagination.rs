//! Pagination policy: defaults and validation for page, size and ordering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};
use crate::params::{present, QueryParams};

/// Fields a listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum SortKey {
    /// Producer timestamp
    CreatedOn,
    /// Severity rank
    Severity,
}

impl SortKey {
    /// Canonical name echoed back to clients.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedOn => "createdOn",
            Self::Severity => "severity",
        }
    }

    /// Name of the indexed document field that carries this key.
    #[must_use]
    pub const fn document_field(self) -> &'static str {
        match self {
            Self::CreatedOn => "createdOn",
            Self::Severity => "severityRank",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "createdOn" | "timeStamp" => Ok(Self::CreatedOn),
            "severity" => Ok(Self::Severity),
            other => Err(LogError::UnknownSortKey(other.to_string())),
        }
    }
}

impl TryFrom<String> for SortKey {
    type Error = LogError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SortKey> for &'static str {
    fn from(key: SortKey) -> Self {
        key.as_str()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum SortOrder {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

impl SortOrder {
    /// Canonical name, also the backend's order keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(LogError::invalid_parameter(
                "order",
                format!("expected asc or desc, got '{s}'"),
            )),
        }
    }
}

impl TryFrom<String> for SortOrder {
    type Error = LogError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SortOrder> for &'static str {
    fn from(order: SortOrder) -> Self {
        order.as_str()
    }
}

/// A normalized pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// Zero-based page number
    pub page: u64,
    /// Page size
    pub per_page: u64,
    /// Sort field
    pub sort_by: SortKey,
    /// Sort direction
    pub order: SortOrder,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: 10,
            sort_by: SortKey::CreatedOn,
            order: SortOrder::Desc,
        }
    }
}

impl PageRequest {
    /// Zero-based offset of the first item on this page.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidParameter`] if `perPage * page` overflows.
    pub fn offset(&self) -> Result<u64> {
        self.per_page
            .checked_mul(self.page)
            .ok_or_else(|| LogError::invalid_parameter("page", "page offset out of range"))
    }
}

/// Applies defaults to raw pagination parameters and validates them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationPolicy {
    defaults: PageRequest,
}

impl PaginationPolicy {
    /// Creates a policy with the given defaults.
    #[must_use]
    pub const fn new(defaults: PageRequest) -> Self {
        Self { defaults }
    }

    /// The defaults applied to absent parameters.
    #[must_use]
    pub const fn defaults(&self) -> &PageRequest {
        &self.defaults
    }

    /// Normalizes raw parameters into a [`PageRequest`].
    ///
    /// Absent or empty parameters take their default independently, so a
    /// caller may override any subset.
    ///
    /// # Errors
    ///
    /// Returns a client error if `page` or `perPage` is not a non-negative
    /// integer, if `sortBy` is not a sortable field, or if `order` is
    /// neither ascending nor descending.
    pub fn normalize(&self, params: &QueryParams) -> Result<PageRequest> {
        let page = match present(params.page.as_ref()) {
            Some(raw) => parse_count("page", raw)?,
            None => self.defaults.page,
        };
        let per_page = match present(params.per_page.as_ref()) {
            Some(raw) => parse_count("perPage", raw)?,
            None => self.defaults.per_page,
        };
        let sort_by = match present(params.sort_by.as_ref()) {
            Some(raw) => raw.parse()?,
            None => self.defaults.sort_by,
        };
        let order = match present(params.order.as_ref()) {
            Some(raw) => raw.parse()?,
            None => self.defaults.order,
        };

        let request = PageRequest {
            page,
            per_page,
            sort_by,
            order,
        };
        request.offset()?;
        Ok(request)
    }
}

fn parse_count(name: &'static str, raw: &str) -> Result<u64> {
    raw.parse::<u64>().map_err(|_| {
        LogError::invalid_parameter(name, format!("expected a non-negative integer, got '{raw}'"))
    })
}
