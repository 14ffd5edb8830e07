//! Index mapping and response decoding.

use logpost_core::query::{
    FIELD_ADDRESS, FIELD_CREATED_ON, FIELD_MESSAGE, FIELD_SEQ, FIELD_SERVICE, FIELD_SEVERITY,
    FIELD_SEVERITY_RANK,
};
use logpost_core::{decode_hits, SearchPage};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ElasticError, Result};

/// Name of the aggregation used to find the highest stored sequence number.
pub const MAX_SEQ_AGG: &str = "max_seq";

/// Settings and mappings sent when creating the message index.
#[must_use]
pub fn index_body() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1
        },
        "mappings": {
            "dynamic": false,
            "properties": {
                FIELD_SERVICE: { "type": "keyword" },
                FIELD_ADDRESS: { "type": "keyword" },
                FIELD_SEVERITY: { "type": "keyword" },
                FIELD_MESSAGE: { "type": "wildcard" },
                FIELD_CREATED_ON: { "type": "date" },
                FIELD_SEVERITY_RANK: { "type": "long" },
                FIELD_SEQ: { "type": "long" },
                "auditData": {
                    "properties": {
                        "actor": { "type": "keyword" },
                        "action": { "type": "keyword" },
                        "actee": { "type": "keyword" }
                    }
                },
                "metricData": {
                    "properties": {
                        "name": { "type": "keyword" },
                        "value": { "type": "double" },
                        "object": { "type": "keyword" }
                    }
                }
            }
        }
    })
}

/// Search body returning only the highest stored sequence number.
#[must_use]
pub fn max_seq_body() -> Value {
    json!({
        "size": 0,
        "aggs": { MAX_SEQ_AGG: { "max": { "field": FIELD_SEQ } } }
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    total: Option<Total>,
    #[serde(default)]
    hits: Vec<Hit>,
}

/// Elasticsearch 6 reports a bare count, 7 and later an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Total {
    Count(u64),
    Object { value: u64 },
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Value,
}

/// Decodes a search response into a page of messages.
///
/// Individual hits that fail to decode are skipped; the total is taken
/// from the backend as reported.
///
/// # Errors
///
/// Returns [`ElasticError::MalformedResponse`] if the envelope itself is
/// not a search response.
pub fn parse_search_response(body: Value) -> Result<SearchPage> {
    let response: SearchResponse = serde_json::from_value(body)
        .map_err(|e| ElasticError::MalformedResponse(e.to_string()))?;

    let returned = response.hits.hits.len() as u64;
    let total = match response.hits.total {
        Some(Total::Count(n) | Total::Object { value: n }) => n,
        None => returned,
    };
    let hits = decode_hits(response.hits.hits.into_iter().map(|hit| (hit.id, hit.source)));

    Ok(SearchPage { hits, total })
}

/// Reads the highest sequence number from a [`max_seq_body`] response.
///
/// An empty index reports `null`, which reads as zero.
///
/// # Errors
///
/// Returns [`ElasticError::MalformedResponse`] if the aggregation is missing.
pub fn parse_max_seq(body: &Value) -> Result<u64> {
    let value = body
        .get("aggregations")
        .and_then(|aggs| aggs.get(MAX_SEQ_AGG))
        .and_then(|agg| agg.get("value"))
        .ok_or_else(|| ElasticError::MalformedResponse(format!("missing {MAX_SEQ_AGG} aggregation")))?;

    match value {
        Value::Null => Ok(0),
        other => other
            .as_f64()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64)
            .ok_or_else(|| ElasticError::MalformedResponse(format!("bad {MAX_SEQ_AGG} value {other}"))),
    }
}
