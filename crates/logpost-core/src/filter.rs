//! Filter parameters and the compiler that turns them into a search request.

use chrono::{DateTime, Utc};

use crate::error::{LogError, Result};
use crate::pagination::PageRequest;
use crate::params::{present, present_verbatim, QueryParams};
use crate::query::{
    Clause, QuerySpec, SearchRequest, SortSpec, CONTAINS_FIELDS, FIELD_CREATED_ON, FIELD_SERVICE,
};

/// Typed, already-validated filter parameters. Absent fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    /// Upper time bound, inclusive
    pub before: Option<DateTime<Utc>>,
    /// Lower time bound, inclusive
    pub after: Option<DateTime<Utc>>,
    /// Exact service name
    pub service: Option<String>,
    /// Substring to search for
    pub contains: Option<String>,
}

impl FilterParams {
    /// Creates an empty filter that matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes filter parameters from raw query parameters.
    ///
    /// Time bounds accept RFC 3339 timestamps or integer Unix milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidParameter`] naming `before` or `after` if
    /// a bound cannot be parsed.
    pub fn parse(params: &QueryParams) -> Result<Self> {
        Ok(Self {
            before: present(params.before.as_ref())
                .map(|raw| parse_time("before", raw))
                .transpose()?,
            after: present(params.after.as_ref())
                .map(|raw| parse_time("after", raw))
                .transpose()?,
            service: present_verbatim(params.service.as_ref()).map(str::to_string),
            contains: present_verbatim(params.contains.as_ref()).map(str::to_string),
        })
    }

    /// Returns true if no filter is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.before.is_none()
            && self.after.is_none()
            && self.service.is_none()
            && self.contains.is_none()
    }

    /// Restricts to one service.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Adds a substring search.
    #[must_use]
    pub fn with_contains(mut self, text: impl Into<String>) -> Self {
        self.contains = Some(text.into());
        self
    }

    /// Sets the lower time bound.
    #[must_use]
    pub const fn with_after(mut self, after: DateTime<Utc>) -> Self {
        self.after = Some(after);
        self
    }

    /// Sets the upper time bound.
    #[must_use]
    pub const fn with_before(mut self, before: DateTime<Utc>) -> Self {
        self.before = Some(before);
        self
    }
}

/// Compiles a page request and filters into a search request.
///
/// With no filters the result takes the match-all path. Otherwise each
/// present filter becomes one clause of a conjunction. An inverted time
/// range (`after` later than `before`) is passed through as is and simply
/// matches nothing.
///
/// # Errors
///
/// Returns [`LogError::InvalidParameter`] if the page offset overflows.
pub fn compile(page: &PageRequest, filters: &FilterParams) -> Result<SearchRequest> {
    let query = if filters.is_empty() {
        QuerySpec::MatchAll
    } else {
        let mut must = Vec::with_capacity(3);
        if let Some(service) = &filters.service {
            must.push(Clause::Term {
                field: FIELD_SERVICE,
                value: service.clone(),
            });
        }
        if let Some(text) = &filters.contains {
            must.push(Clause::Contains {
                text: text.clone(),
                fields: &CONTAINS_FIELDS,
            });
        }
        if filters.after.is_some() || filters.before.is_some() {
            must.push(Clause::Range {
                field: FIELD_CREATED_ON,
                gte: filters.after,
                lte: filters.before,
            });
        }
        QuerySpec::Bool { must }
    };

    Ok(SearchRequest {
        query,
        from: page.offset()?,
        size: page.per_page,
        sort: SortSpec {
            key: page.sort_by,
            order: page.order,
        },
    })
}

fn parse_time(name: &'static str, raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(time.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| {
            LogError::invalid_parameter(
                name,
                format!("expected an RFC 3339 timestamp or Unix milliseconds, got '{raw}'"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{SortKey, SortOrder};
    use chrono::TimeZone;
    use test_case::test_case;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn parse_empty_params() {
        let filters = FilterParams::parse(&QueryParams::new()).unwrap_or_default();
        assert!(filters.is_empty());
    }

    #[test]
    fn parse_all_params() {
        let params = QueryParams::new()
            .with_before("2024-05-01T10:00:00Z")
            .with_after("1714543200000")
            .with_service("billing")
            .with_contains("timeout");
        let filters = FilterParams::parse(&params).unwrap_or_default();

        assert_eq!(filters.before, Some(at(10)));
        assert_eq!(filters.after, Some(at(6)));
        assert_eq!(filters.service.as_deref(), Some("billing"));
        assert_eq!(filters.contains.as_deref(), Some("timeout"));
    }

    #[test]
    fn service_and_contains_are_not_trimmed() {
        let params = QueryParams::new()
            .with_service(" billing")
            .with_contains(" disk full ")
            .with_after(" 1714543200000 ");
        let filters = FilterParams::parse(&params).unwrap_or_default();

        assert_eq!(filters.service.as_deref(), Some(" billing"));
        assert_eq!(filters.contains.as_deref(), Some(" disk full "));
        assert_eq!(filters.after, Some(at(6)));
    }

    #[test]
    fn blank_params_are_absent() {
        let params = QueryParams::new().with_service("").with_contains("  ");
        let filters = FilterParams::parse(&params).unwrap_or_default();
        assert!(filters.is_empty());
    }

    #[test_case("before" ; "before")]
    #[test_case("after" ; "after")]
    fn rejects_unparsable_time(name: &str) {
        let params = if name == "before" {
            QueryParams::new().with_before("yesterday")
        } else {
            QueryParams::new().with_after("yesterday")
        };
        match FilterParams::parse(&params) {
            Err(LogError::InvalidParameter { name: got, .. }) => assert_eq!(got, name),
            other => panic!("expected invalid {name}, got {other:?}"),
        }
    }

    #[test]
    fn no_filters_compiles_to_match_all() {
        let page = PageRequest {
            page: 2,
            per_page: 3,
            sort_by: SortKey::Severity,
            order: SortOrder::Asc,
        };
        let request = compile(&page, &FilterParams::new()).ok();
        assert_eq!(
            request,
            Some(SearchRequest {
                query: QuerySpec::MatchAll,
                from: 6,
                size: 3,
                sort: SortSpec {
                    key: SortKey::Severity,
                    order: SortOrder::Asc,
                },
            })
        );
    }

    #[test]
    fn service_only_compiles_single_term() {
        let request = compile(&PageRequest::default(), &FilterParams::new().with_service("a"));
        let clauses = request.map(|r| r.query.clauses().to_vec()).unwrap_or_default();
        assert_eq!(
            clauses,
            vec![Clause::Term {
                field: FIELD_SERVICE,
                value: "a".into()
            }]
        );
    }

    #[test]
    fn all_filters_compile_in_order() {
        let filters = FilterParams::new()
            .with_service("svc")
            .with_contains("disk")
            .with_after(at(1))
            .with_before(at(2));
        let request = compile(&PageRequest::default(), &filters);
        let clauses = request.map(|r| r.query.clauses().to_vec()).unwrap_or_default();

        assert_eq!(clauses.len(), 3);
        assert!(matches!(clauses[0], Clause::Term { .. }));
        assert!(matches!(clauses[1], Clause::Contains { .. }));
        assert_eq!(
            clauses[2],
            Clause::Range {
                field: FIELD_CREATED_ON,
                gte: Some(at(1)),
                lte: Some(at(2)),
            }
        );
    }

    #[test]
    fn single_bound_range() {
        let request = compile(&PageRequest::default(), &FilterParams::new().with_before(at(4)));
        let clauses = request.map(|r| r.query.clauses().to_vec()).unwrap_or_default();
        assert_eq!(
            clauses,
            vec![Clause::Range {
                field: FIELD_CREATED_ON,
                gte: None,
                lte: Some(at(4)),
            }]
        );
    }

    #[test]
    fn inverted_range_is_passed_through() {
        let filters = FilterParams::new().with_after(at(9)).with_before(at(3));
        let request = compile(&PageRequest::default(), &filters);
        let body = request.map(|r| r.to_json()).unwrap_or_default();

        assert_eq!(
            body["query"]["bool"]["must"][0]["range"]["createdOn"]["gte"],
            "2024-05-01T09:00:00Z"
        );
        assert_eq!(
            body["query"]["bool"]["must"][0]["range"]["createdOn"]["lte"],
            "2024-05-01T03:00:00Z"
        );
    }

    #[test]
    fn offset_and_size_follow_page() {
        let page = PageRequest {
            page: 4,
            per_page: 25,
            ..PageRequest::default()
        };
        let request = compile(&page, &FilterParams::new().with_contains("x")).ok();
        assert_eq!(request.as_ref().map(|r| r.from), Some(100));
        assert_eq!(request.as_ref().map(|r| r.size), Some(25));
    }
}
