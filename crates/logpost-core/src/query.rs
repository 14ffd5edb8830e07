//! Backend-neutral search request model and its JSON query DSL rendering.
//!
//! A [`SearchRequest`] is what the filter compiler produces and what every
//! [`crate::MessageStore`] consumes. [`SearchRequest::to_json`] renders the
//! request in the search engine's native query DSL (`bool`/`must`, `term`,
//! `wildcard`, `range`, `sort`, `from`, `size`).

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::pagination::{SortKey, SortOrder};

/// Indexed document field holding the producer name.
pub const FIELD_SERVICE: &str = "service";
/// Indexed document field holding the producer address.
pub const FIELD_ADDRESS: &str = "address";
/// Indexed document field holding the timestamp.
pub const FIELD_CREATED_ON: &str = "createdOn";
/// Indexed document field holding the severity name.
pub const FIELD_SEVERITY: &str = "severity";
/// Indexed document field holding the severity rank.
pub const FIELD_SEVERITY_RANK: &str = "severityRank";
/// Indexed document field holding the message text.
pub const FIELD_MESSAGE: &str = "message";
/// Indexed document field holding the store sequence number.
pub const FIELD_SEQ: &str = "seq";

/// Fields searched by a `contains` filter.
pub const CONTAINS_FIELDS: [&str; 4] = [FIELD_ADDRESS, FIELD_MESSAGE, FIELD_SERVICE, FIELD_SEVERITY];

/// One constraint in a conjunctive query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Exact match of a keyword field.
    Term {
        /// Document field
        field: &'static str,
        /// Required value
        value: String,
    },
    /// Case-insensitive substring match on any of several fields.
    Contains {
        /// Substring to look for
        text: String,
        /// Fields to search
        fields: &'static [&'static str],
    },
    /// Inclusive range on a date field. Bounds are passed through unchecked.
    Range {
        /// Document field
        field: &'static str,
        /// Lower bound, inclusive
        gte: Option<DateTime<Utc>>,
        /// Upper bound, inclusive
        lte: Option<DateTime<Utc>>,
    },
}

impl Clause {
    /// Renders this clause in the backend DSL.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Term { field, value } => json!({ "term": { *field: value } }),
            Self::Contains { text, fields } => {
                let pattern = format!("*{}*", escape_wildcard(text));
                let should: Vec<Value> = fields
                    .iter()
                    .map(|field| {
                        json!({
                            "wildcard": {
                                *field: { "value": pattern, "case_insensitive": true }
                            }
                        })
                    })
                    .collect();
                json!({ "bool": { "should": should, "minimum_should_match": 1 } })
            }
            Self::Range { field, gte, lte } => {
                let mut bounds = Map::new();
                if let Some(gte) = gte {
                    bounds.insert("gte".to_string(), Value::String(format_time(gte)));
                }
                if let Some(lte) = lte {
                    bounds.insert("lte".to_string(), Value::String(format_time(lte)));
                }
                json!({ "range": { *field: bounds } })
            }
        }
    }
}

/// The query part of a search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySpec {
    /// Every document matches.
    MatchAll,
    /// Documents matching every clause.
    Bool {
        /// Conjunction of clauses
        must: Vec<Clause>,
    },
}

impl QuerySpec {
    /// Renders the query in the backend DSL.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::MatchAll => json!({ "match_all": {} }),
            Self::Bool { must } => {
                let must: Vec<Value> = must.iter().map(Clause::to_json).collect();
                json!({ "bool": { "must": must } })
            }
        }
    }

    /// The clauses a document must satisfy; empty for match-all.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        match self {
            Self::MatchAll => &[],
            Self::Bool { must } => must,
        }
    }
}

/// Primary sort of a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    /// Sort field
    pub key: SortKey,
    /// Direction
    pub order: SortOrder,
}

/// A complete, paginated search against the message index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// What to match
    pub query: QuerySpec,
    /// Offset of the first hit
    pub from: u64,
    /// Maximum hits to return
    pub size: u64,
    /// Ordering
    pub sort: SortSpec,
}

impl SearchRequest {
    /// Returns true if this request takes the unfiltered match-all path.
    #[must_use]
    pub const fn is_match_all(&self) -> bool {
        matches!(self.query, QuerySpec::MatchAll)
    }

    /// Renders the full request body in the backend DSL.
    ///
    /// Ties on the primary sort key are broken by sequence number so that
    /// consecutive pages never overlap.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "query": self.query.to_json(),
            "from": self.from,
            "size": self.size,
            "sort": [
                {
                    self.sort.key.document_field(): {
                        "order": self.sort.order.as_str(),
                        "missing": "_last"
                    }
                },
                { FIELD_SEQ: { "order": "asc" } }
            ],
            "track_total_hits": true
        })
    }
}

/// Formats a timestamp the way documents store it.
#[must_use]
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn escape_wildcard(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
