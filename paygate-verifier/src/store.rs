//! Storage of issued verification records.
//!
//! Records live for the lifetime of the process. The store is the only shared
//! mutable state of a verifier.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use paygate_core::verifier::VerificationRecord;

/// Outcome of inserting a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    Stored,
    /// A record already holds this token; nothing was written.
    TokenExists,
    /// A record already answers this request id; nothing was written.
    RequestExists(VerificationRecord),
}

/// Repository of verification records, keyed by token.
pub trait RecordStore: Send + Sync {
    /// Insert `record` unless its token is taken.
    fn put(&self, record: VerificationRecord) -> PutOutcome;

    /// Insert `record` unless its token is taken or its request id already has a record.
    ///
    /// Records without a request id behave as in [`put`](RecordStore::put).
    fn put_unique_request(&self, record: VerificationRecord) -> PutOutcome;

    fn get(&self, token: &str) -> Option<VerificationRecord>;

    /// The first record stored for `request_id`.
    fn find_by_request(&self, request_id: &str) -> Option<VerificationRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct Records {
    by_token: HashMap<String, VerificationRecord>,
    by_request: HashMap<String, String>,
}

impl Records {
    fn insert(&mut self, record: VerificationRecord) {
        if let Some(request_id) = &record.request_id {
            self.by_request
                .entry(request_id.clone())
                .or_insert_with(|| record.token.0.clone());
        }
        self.by_token.insert(record.token.0.clone(), record);
    }

    fn by_request(&self, request_id: &str) -> Option<&VerificationRecord> {
        self.by_request
            .get(request_id)
            .and_then(|token| self.by_token.get(token))
    }
}

/// In-memory [`RecordStore`] guarded by a single mutex. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    inner: Arc<Mutex<Records>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn put(&self, record: VerificationRecord) -> PutOutcome {
        let mut records = self.inner.lock();
        if records.by_token.contains_key(record.token.as_str()) {
            return PutOutcome::TokenExists;
        }
        records.insert(record);
        PutOutcome::Stored
    }

    fn put_unique_request(&self, record: VerificationRecord) -> PutOutcome {
        let mut records = self.inner.lock();
        if let Some(existing) = record
            .request_id
            .as_deref()
            .and_then(|id| records.by_request(id))
        {
            return PutOutcome::RequestExists(existing.clone());
        }
        if records.by_token.contains_key(record.token.as_str()) {
            return PutOutcome::TokenExists;
        }
        records.insert(record);
        PutOutcome::Stored
    }

    fn get(&self, token: &str) -> Option<VerificationRecord> {
        self.inner.lock().by_token.get(token).cloned()
    }

    fn find_by_request(&self, request_id: &str) -> Option<VerificationRecord> {
        self.inner.lock().by_request(request_id).cloned()
    }

    fn len(&self) -> usize {
        self.inner.lock().by_token.len()
    }
}
