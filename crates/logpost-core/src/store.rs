//! Id assignment, document encoding, and the in-memory search index.
//!
//! This module provides:
//! - [`IdSequence`] - Mutex-protected sequential id allocator
//! - [`to_document`] / [`decode_hits`] - Conversion between messages and indexed documents
//! - [`MemoryStore`] - In-process implementation of [`MessageStore`] that
//!   evaluates the same [`SearchRequest`] a search engine would

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{LogError, Result};
use crate::pagination::{SortKey, SortOrder};
use crate::query::{Clause, SearchRequest, FIELD_SEQ, FIELD_SEVERITY_RANK};
use crate::traits::{MessageStore, SearchPage};
use crate::types::{Message, MessageId, StoredMessage};

/// Sequential id allocator shared by all concurrent writers of one store.
///
/// The critical section covers only read-increment-release; callers perform
/// the backend write after the lock is dropped, so ids reflect assignment
/// order rather than completion order.
#[derive(Debug)]
pub struct IdSequence {
    next: Mutex<u64>,
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSequence {
    /// Creates a sequence whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: Mutex::new(1),
        }
    }

    /// Allocates the next id.
    pub fn next_id(&self) -> MessageId {
        let mut next = self.next.lock();
        let id = MessageId(*next);
        *next += 1;
        id
    }

    /// Ensures future ids are greater than `highest`.
    pub fn seed(&self, highest: u64) {
        let mut next = self.next.lock();
        if *next <= highest {
            *next = highest + 1;
        }
    }

    /// The id the next call to [`IdSequence::next_id`] will return.
    #[must_use]
    pub fn peek(&self) -> MessageId {
        MessageId(*self.next.lock())
    }
}

/// Encodes a message as an indexed document.
///
/// The document carries the message fields plus `seq` (the numeric id, used
/// as a sort tie-breaker) and `severityRank` (used when sorting by severity).
///
/// # Errors
///
/// Returns [`LogError::Serialization`] if the message cannot be encoded.
pub fn to_document(id: MessageId, message: &Message) -> Result<Value> {
    let mut document = serde_json::to_value(message)?;
    if let Value::Object(fields) = &mut document {
        fields.insert(FIELD_SEQ.to_string(), Value::from(id.0));
        if let Some(severity) = message.severity {
            fields.insert(FIELD_SEVERITY_RANK.to_string(), Value::from(severity.rank()));
        }
    }
    Ok(document)
}

/// Decodes a single stored document, returning `None` if it is malformed.
#[must_use]
pub fn decode_hit(id: &str, source: Value) -> Option<StoredMessage> {
    let Ok(id) = id.parse::<u64>().map(MessageId) else {
        warn!(id = %id, "skipping stored message with non-numeric id");
        return None;
    };
    let message: Message = match serde_json::from_value(source) {
        Ok(message) => message,
        Err(e) => {
            warn!(id = %id, error = %e, "skipping unparsable stored message");
            return None;
        }
    };
    if let Err(e) = message.validate() {
        warn!(id = %id, error = %e, "skipping invalid stored message");
        return None;
    }
    Some(StoredMessage { id, message })
}

/// Decodes a page of raw hits, dropping malformed records and keeping order.
pub fn decode_hits<I>(raw: I) -> Vec<StoredMessage>
where
    I: IntoIterator<Item = (String, Value)>,
{
    raw.into_iter()
        .filter_map(|(id, source)| decode_hit(&id, source))
        .collect()
}

/// In-memory search index implementing [`MessageStore`].
///
/// Documents are kept as raw JSON exactly as a search engine would hold
/// them, so malformed records behave the same way on read.
pub struct MemoryStore {
    /// Documents in insertion order
    documents: RwLock<Vec<(MessageId, Value)>>,
    /// Id allocator
    sequence: IdSequence,
    /// Whether the schema has been created
    schema_ready: AtomicBool,
    /// Number of times the schema was actually created
    schema_creations: AtomicUsize,
    /// Whether the store is accepting requests
    accepting: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("documents", &self.len())
            .field("next_id", &self.sequence.peek())
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            sequence: IdSequence::new(),
            schema_ready: AtomicBool::new(false),
            schema_creations: AtomicUsize::new(0),
            accepting: AtomicBool::new(true),
        }
    }

    /// Number of stored documents, well-formed or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Returns true once [`MessageStore::ensure_schema`] has succeeded.
    #[must_use]
    pub fn schema_ready(&self) -> bool {
        self.schema_ready.load(Ordering::Acquire)
    }

    /// How many times the schema was created rather than found present.
    #[must_use]
    pub fn schema_creations(&self) -> usize {
        self.schema_creations.load(Ordering::Acquire)
    }

    /// Stores an arbitrary document under the next id, bypassing validation.
    ///
    /// Used to import legacy data and to reproduce partially written records.
    pub fn insert_raw(&self, document: Value) -> MessageId {
        let id = self.sequence.next_id();
        self.documents.write().push((id, document));
        id
    }

    /// Replaces the document stored under `id`. Returns false if absent.
    pub fn replace_raw(&self, id: MessageId, document: Value) -> bool {
        let mut documents = self.documents.write();
        match documents.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => {
                slot.1 = document;
                true
            }
            None => false,
        }
    }

    /// Makes every subsequent request fail as if the backend were down.
    pub fn stop(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    /// Resumes serving requests.
    pub fn start(&self) {
        self.accepting.store(true, Ordering::Release);
    }

    fn check_available(&self) -> Result<()> {
        if self.accepting.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(LogError::Backend("search backend unavailable".to_string()))
        }
    }

    fn execute(&self, request: &SearchRequest) -> SearchPage {
        let documents = self.documents.read();
        let clauses = request.query.clauses();

        let mut matched: Vec<(MessageId, Option<i64>, &Value)> = documents
            .iter()
            .filter(|(_, doc)| clauses.iter().all(|clause| clause_matches(clause, doc)))
            .map(|(id, doc)| (*id, sort_value(request.sort.key, doc), doc))
            .collect();

        matched.sort_by(|a, b| {
            compare_sort_values(a.1, b.1, request.sort.order).then_with(|| a.0.cmp(&b.0))
        });

        let total = matched.len() as u64;
        let from = usize::try_from(request.from).unwrap_or(usize::MAX);
        let size = usize::try_from(request.size).unwrap_or(usize::MAX);

        let window = matched
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(id, _, doc)| (id.to_string(), doc.clone()));

        SearchPage {
            hits: decode_hits(window),
            total,
        }
    }
}

impl MessageStore for MemoryStore {
    async fn ensure_schema(&self) -> Result<()> {
        self.check_available()?;
        if self
            .schema_ready
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.schema_creations.fetch_add(1, Ordering::AcqRel);
            debug!("created in-memory message index");
        }
        Ok(())
    }

    async fn write(&self, message: &Message) -> Result<MessageId> {
        self.check_available()?;
        let id = self.sequence.next_id();
        let document = to_document(id, message)?;
        self.documents.write().push((id, document));
        Ok(id)
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        self.check_available()?;
        Ok(self.execute(request))
    }

    async fn teardown(&self) -> Result<()> {
        self.check_available()?;
        self.documents.write().clear();
        self.schema_ready.store(false, Ordering::Release);
        Ok(())
    }
}

fn clause_matches(clause: &Clause, doc: &Value) -> bool {
    match clause {
        Clause::Term { field, value } => {
            doc.get(*field).and_then(Value::as_str) == Some(value.as_str())
        }
        Clause::Contains { text, fields } => {
            let needle = text.to_lowercase();
            fields.iter().any(|field| {
                doc.get(*field)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v.to_lowercase().contains(&needle))
            })
        }
        Clause::Range { field, gte, lte } => {
            let Some(time) = doc
                .get(*field)
                .and_then(Value::as_str)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|t| t.with_timezone(&Utc))
            else {
                return false;
            };
            gte.is_none_or(|gte| time >= gte) && lte.is_none_or(|lte| time <= lte)
        }
    }
}

fn sort_value(key: SortKey, doc: &Value) -> Option<i64> {
    let raw = doc.get(key.document_field())?;
    match key {
        SortKey::CreatedOn => raw
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.timestamp_micros()),
        SortKey::Severity => raw.as_i64(),
    }
}

/// Orders present values by direction; missing values always sort last.
fn compare_sort_values(a: Option<i64>, b: Option<i64>, order: SortOrder) -> CmpOrdering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => a.cmp(&b),
            SortOrder::Desc => b.cmp(&a),
        },
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{compile, FilterParams};
    use crate::pagination::PageRequest;
    use crate::types::Severity;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn message(service: &str, minute: u32, severity: Severity, text: &str) -> Message {
        Message {
            service: service.to_string(),
            address: "10.1.2.3".to_string(),
            created_on: Utc
                .with_ymd_and_hms(2024, 6, 1, 0, minute, 0)
                .single()
                .unwrap_or_default(),
            severity: Some(severity),
            message: text.to_string(),
            audit_data: None,
            metric_data: None,
        }
    }

    fn page(per_page: u64, page: u64, sort_by: SortKey, order: SortOrder) -> PageRequest {
        PageRequest {
            page,
            per_page,
            sort_by,
            order,
        }
    }

    async fn search(
        store: &MemoryStore,
        page: PageRequest,
        filters: &FilterParams,
    ) -> SearchPage {
        let request = compile(&page, filters);
        assert!(request.is_ok());
        let Ok(request) = request else {
            return SearchPage::default();
        };
        store.search(&request).await.unwrap_or_default()
    }

    // ===========================================
    // IdSequence Tests
    // ===========================================

    #[test]
    fn sequence_starts_at_one_and_increments() {
        let seq = IdSequence::new();
        assert_eq!(seq.next_id(), MessageId(1));
        assert_eq!(seq.next_id(), MessageId(2));
        assert_eq!(seq.peek(), MessageId(3));
    }

    #[test]
    fn seed_only_moves_forward() {
        let seq = IdSequence::new();
        seq.seed(41);
        assert_eq!(seq.next_id(), MessageId(42));
        seq.seed(10);
        assert_eq!(seq.next_id(), MessageId(43));
    }

    #[test]
    fn concurrent_allocation_never_collides() {
        let seq = Arc::new(IdSequence::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seq = Arc::clone(&seq);
                std::thread::spawn(move || (0..500).map(|_| seq.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<MessageId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap_or_default())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 4000);
    }

    // ===========================================
    // Document Encoding Tests
    // ===========================================

    #[test]
    fn document_carries_seq_and_rank() {
        let doc = to_document(MessageId(7), &message("a", 1, Severity::Warning, "x"))
            .unwrap_or_default();
        assert_eq!(doc["seq"], 7);
        assert_eq!(doc["severityRank"], 3);
        assert_eq!(doc["severity"], "Warning");
    }

    #[test]
    fn decode_round_trips_document() {
        let original = message("a", 1, Severity::Info, "hello");
        let doc = to_document(MessageId(3), &original).unwrap_or_default();
        let decoded = decode_hit("3", doc);
        assert_eq!(
            decoded,
            Some(StoredMessage {
                id: MessageId(3),
                message: original,
            })
        );
    }

    #[test]
    fn decode_skips_malformed_documents() {
        let good = to_document(MessageId(1), &message("a", 1, Severity::Info, "ok"))
            .unwrap_or_default();
        let hits = decode_hits(vec![
            ("1".to_string(), good),
            ("2".to_string(), Value::String("garbage".into())),
            ("3".to_string(), serde_json::json!({ "service": "only" })),
            ("x".to_string(), serde_json::json!({})),
        ]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, MessageId(1));
    }

    // ===========================================
    // MemoryStore Tests
    // ===========================================

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let store = MemoryStore::new();
        assert!(!store.schema_ready());
        assert!(store.ensure_schema().await.is_ok());
        assert!(store.ensure_schema().await.is_ok());
        assert!(store.schema_ready());
        assert_eq!(store.schema_creations(), 1);
    }

    #[tokio::test]
    async fn write_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.write(&message("a", 1, Severity::Info, "one")).await.ok();
        let b = store.write(&message("a", 2, Severity::Info, "two")).await.ok();
        assert_eq!(a, Some(MessageId(1)));
        assert_eq!(b, Some(MessageId(2)));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn match_all_sorts_and_counts() {
        let store = MemoryStore::new();
        for minute in [3, 1, 2] {
            let _ = store.write(&message("a", minute, Severity::Info, "m")).await;
        }

        let result = search(
            &store,
            page(10, 0, SortKey::CreatedOn, SortOrder::Asc),
            &FilterParams::new(),
        )
        .await;
        let minutes: Vec<_> = result
            .hits
            .iter()
            .map(|h| h.message.created_on.format("%M").to_string())
            .collect();

        assert_eq!(minutes, vec!["01", "02", "03"]);
        assert_eq!(result.total, 3);
    }

    #[tokio::test]
    async fn total_is_independent_of_window() {
        let store = MemoryStore::new();
        for minute in 0..5 {
            let _ = store.write(&message("a", minute, Severity::Info, "m")).await;
        }

        let result = search(
            &store,
            page(3, 1, SortKey::CreatedOn, SortOrder::Asc),
            &FilterParams::new(),
        )
        .await;
        assert_eq!(result.hits.len(), 2);
        assert_eq!(result.total, 5);
        assert_eq!(result.hits[0].message.created_on.format("%M").to_string(), "03");
    }

    #[tokio::test]
    async fn severity_sort_uses_rank_not_name() {
        let store = MemoryStore::new();
        let _ = store.write(&message("a", 1, Severity::Emergency, "e")).await;
        let _ = store.write(&message("a", 2, Severity::Debug, "d")).await;
        let _ = store.write(&message("a", 3, Severity::Alert, "al")).await;

        let result = search(
            &store,
            page(10, 0, SortKey::Severity, SortOrder::Desc),
            &FilterParams::new(),
        )
        .await;
        let order: Vec<_> = result.hits.iter().filter_map(|h| h.message.severity).collect();
        assert_eq!(order, vec![Severity::Emergency, Severity::Alert, Severity::Debug]);
    }

    #[tokio::test]
    async fn ties_break_by_sequence() {
        let store = MemoryStore::new();
        for text in ["first", "second", "third"] {
            let _ = store.write(&message("a", 1, Severity::Info, text)).await;
        }

        for order in [SortOrder::Asc, SortOrder::Desc] {
            let result =
                search(&store, page(10, 0, SortKey::CreatedOn, order), &FilterParams::new()).await;
            let texts: Vec<_> = result.hits.iter().map(|h| h.message.message.as_str()).collect();
            assert_eq!(texts, vec!["first", "second", "third"]);
        }
    }

    #[tokio::test]
    async fn service_and_contains_intersect() {
        let store = MemoryStore::new();
        let _ = store.write(&message("billing", 1, Severity::Info, "disk full")).await;
        let _ = store.write(&message("billing", 2, Severity::Info, "all good")).await;
        let _ = store.write(&message("auth", 3, Severity::Info, "disk full")).await;

        let by_service = search(
            &store,
            PageRequest::default(),
            &FilterParams::new().with_service("billing"),
        )
        .await;
        assert_eq!(by_service.total, 2);

        let both = search(
            &store,
            PageRequest::default(),
            &FilterParams::new().with_service("billing").with_contains("DISK"),
        )
        .await;
        assert_eq!(both.total, 1);
        assert_eq!(both.hits[0].message.message, "disk full");
    }

    #[tokio::test]
    async fn contains_matches_severity_and_address() {
        let store = MemoryStore::new();
        let _ = store.write(&message("a", 1, Severity::Warning, "x")).await;
        let _ = store.write(&message("b", 2, Severity::Info, "y")).await;

        let by_severity = search(
            &store,
            PageRequest::default(),
            &FilterParams::new().with_contains("warn"),
        )
        .await;
        assert_eq!(by_severity.total, 1);

        let by_address = search(
            &store,
            PageRequest::default(),
            &FilterParams::new().with_contains("10.1.2"),
        )
        .await;
        assert_eq!(by_address.total, 2);
    }

    #[tokio::test]
    async fn range_is_inclusive_and_inverted_range_is_empty() {
        let store = MemoryStore::new();
        for minute in 0..5 {
            let _ = store.write(&message("a", minute, Severity::Info, "m")).await;
        }
        let at = |minute| {
            Utc.with_ymd_and_hms(2024, 6, 1, 0, minute, 0)
                .single()
                .unwrap_or_default()
        };

        let inclusive = search(
            &store,
            PageRequest::default(),
            &FilterParams::new().with_after(at(1)).with_before(at(3)),
        )
        .await;
        assert_eq!(inclusive.total, 3);

        let inverted = search(
            &store,
            PageRequest::default(),
            &FilterParams::new().with_after(at(3)).with_before(at(1)),
        )
        .await;
        assert_eq!(inverted.total, 0);
        assert!(inverted.hits.is_empty());
    }

    #[tokio::test]
    async fn corrupt_middle_record_shrinks_page_by_one() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for minute in 0..5 {
            if let Ok(id) = store.write(&message("a", minute, Severity::Info, "m")).await {
                ids.push(id);
            }
        }
        assert!(store.replace_raw(ids[2], Value::String("{not json".into())));

        let result = search(
            &store,
            page(10, 0, SortKey::CreatedOn, SortOrder::Asc),
            &FilterParams::new(),
        )
        .await;
        assert_eq!(result.hits.len(), 4);
        assert_eq!(result.total, 5);
        assert!(result.hits.iter().all(|h| h.id != ids[2]));
    }

    #[tokio::test]
    async fn imported_documents_without_rank_sort_last() {
        let store = MemoryStore::new();
        let _ = store.write(&message("a", 1, Severity::Debug, "ranked")).await;
        let legacy = serde_json::to_value(message("a", 2, Severity::Emergency, "imported"))
            .unwrap_or_default();
        let legacy_id = store.insert_raw(legacy);
        let _ = store.write(&message("a", 3, Severity::Info, "ranked")).await;

        assert_eq!(legacy_id, MessageId(2));
        for order in [SortOrder::Asc, SortOrder::Desc] {
            let result =
                search(&store, page(10, 0, SortKey::Severity, order), &FilterParams::new()).await;
            assert_eq!(result.total, 3);
            assert_eq!(result.hits.len(), 3);
            assert_eq!(result.hits.last().map(|h| h.id), Some(legacy_id));
        }
    }

    #[tokio::test]
    async fn stopped_store_reports_backend_error() {
        let store = MemoryStore::new();
        store.stop();
        let result = store.write(&message("a", 1, Severity::Info, "m")).await;
        assert!(matches!(result, Err(LogError::Backend(_))));
        assert!(store.is_empty());

        store.start();
        assert!(store.write(&message("a", 1, Severity::Info, "m")).await.is_ok());
    }

    #[tokio::test]
    async fn teardown_clears_documents() {
        let store = MemoryStore::new();
        let _ = store.ensure_schema().await;
        let _ = store.write(&message("a", 1, Severity::Info, "m")).await;
        assert!(store.teardown().await.is_ok());
        assert!(store.is_empty());
        assert!(!store.schema_ready());
    }

    // ===========================================
    // Property Tests
    // ===========================================

    fn load(store: &MemoryStore, minutes: &[u32], severities: &[Severity]) {
        for (minute, severity) in minutes.iter().zip(severities.iter().cycle()) {
            let id = store.sequence.next_id();
            let doc = to_document(id, &message("p", *minute, *severity, "m")).unwrap_or_default();
            store.documents.write().push((id, doc));
        }
    }

    fn request(per_page: u64, page: u64, key: SortKey, order: SortOrder) -> SearchRequest {
        compile(&self::page(per_page, page, key, order), &FilterParams::new())
            .unwrap_or_else(|_| SearchRequest {
                query: crate::query::QuerySpec::MatchAll,
                from: 0,
                size: 0,
                sort: crate::query::SortSpec { key, order },
            })
    }

    proptest! {
        #[test]
        fn pages_cover_every_message_once(
            minutes in prop::collection::vec(0u32..60, 0..40),
            per_page in 1u64..8,
        ) {
            let store = MemoryStore::new();
            load(&store, &minutes, &Severity::ALL);
            let n = minutes.len() as u64;

            let mut seen = Vec::new();
            let pages = n.div_ceil(per_page);
            for page in 0..pages {
                let result = store.execute(&request(per_page, page, SortKey::CreatedOn, SortOrder::Desc));
                prop_assert_eq!(result.total, n);
                if page + 1 == pages && n % per_page != 0 {
                    prop_assert_eq!(result.hits.len() as u64, n % per_page);
                } else {
                    prop_assert_eq!(result.hits.len() as u64, per_page);
                }
                seen.extend(result.hits.into_iter().map(|h| h.id));
            }

            let past_end = store.execute(&request(per_page, pages, SortKey::CreatedOn, SortOrder::Desc));
            prop_assert!(past_end.hits.is_empty());

            seen.sort();
            seen.dedup();
            prop_assert_eq!(seen.len() as u64, n);
        }

        #[test]
        fn sort_direction_is_monotonic(
            minutes in prop::collection::vec(0u32..60, 1..30),
            ascending in any::<bool>(),
            by_severity in any::<bool>(),
        ) {
            let store = MemoryStore::new();
            load(&store, &minutes, &[Severity::Error, Severity::Debug, Severity::Alert]);
            let order = if ascending { SortOrder::Asc } else { SortOrder::Desc };
            let key = if by_severity { SortKey::Severity } else { SortKey::CreatedOn };

            let result = store.execute(&request(100, 0, key, order));
            let keys: Vec<i64> = result
                .hits
                .iter()
                .map(|h| match key {
                    SortKey::CreatedOn => h.message.created_on.timestamp(),
                    SortKey::Severity => h.message.severity.map_or(-1, |s| i64::from(s.rank())),
                })
                .collect();

            for pair in keys.windows(2) {
                if ascending {
                    prop_assert!(pair[0] <= pair[1]);
                } else {
                    prop_assert!(pair[0] >= pair[1]);
                }
            }
        }
    }
}
