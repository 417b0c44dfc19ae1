//! Hand-written port doubles shared by the use case tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::ports::{StoragePort, TranslatorPort};
use crate::domain::{NewRecord, Record, RecordField};
use crate::error::{EtlError, Result, TranslationError};
use crate::pipeline::storage::InMemoryStorage;

/// Translates word by word with a fixed table and counts every call.
#[derive(Default)]
pub struct CountingTranslator {
    words: HashMap<String, String>,
    failing: Option<(String, TranslationError)>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl CountingTranslator {
    pub fn new(words: &[(&str, &str)]) -> Self {
        Self {
            words: words.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, word: &str, error: TranslationError) -> Self {
        self.failing = Some((word.to_string(), error));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranslatorPort for CountingTranslator {
    async fn translate_word(&self, word: &str, _target_language: &str) -> std::result::Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(word.to_string());
        if let Some((failing_word, error)) = &self.failing {
            if failing_word == word {
                return Err(error.clone());
            }
        }
        Ok(self
            .words
            .get(word)
            .cloned()
            .unwrap_or_else(|| format!("[{}]", word)))
    }
}

/// In-memory storage whose n-th append, page or update call (0-based) fails.
pub struct FailingStorage {
    inner: InMemoryStorage,
    fail_append_on: Option<usize>,
    fail_page_on: Option<usize>,
    fail_update_on: Option<usize>,
    appends: AtomicUsize,
    pages: AtomicUsize,
    updates: AtomicUsize,
}

impl FailingStorage {
    pub fn wrapping(inner: InMemoryStorage) -> Self {
        Self {
            inner,
            fail_append_on: None,
            fail_page_on: None,
            fail_update_on: None,
            appends: AtomicUsize::new(0),
            pages: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }

    pub fn failing_append_on(call: usize) -> Self {
        Self {
            fail_append_on: Some(call),
            ..Self::wrapping(InMemoryStorage::new())
        }
    }

    pub fn failing_page_on(inner: InMemoryStorage, call: usize) -> Self {
        Self {
            fail_page_on: Some(call),
            ..Self::wrapping(inner)
        }
    }

    pub fn failing_update_on(inner: InMemoryStorage, call: usize) -> Self {
        Self {
            fail_update_on: Some(call),
            ..Self::wrapping(inner)
        }
    }
}

fn injected_failure() -> EtlError {
    EtlError::Io(std::io::Error::new(std::io::ErrorKind::Other, "injected storage failure"))
}

#[async_trait]
impl StoragePort for FailingStorage {
    async fn append(&self, records: &[NewRecord]) -> Result<usize> {
        let call = self.appends.fetch_add(1, Ordering::SeqCst);
        if self.fail_append_on == Some(call) {
            return Err(injected_failure());
        }
        self.inner.append(records).await
    }

    async fn query_all(&self) -> Result<Vec<Record>> {
        self.inner.query_all().await
    }

    async fn query_page(&self, after_id: Option<i64>, limit: usize) -> Result<Vec<Record>> {
        let call = self.pages.fetch_add(1, Ordering::SeqCst);
        if self.fail_page_on == Some(call) {
            return Err(injected_failure());
        }
        self.inner.query_page(after_id, limit).await
    }

    async fn update_field(&self, id: i64, field: RecordField, value: Option<&str>) -> Result<()> {
        self.inner.update_field(id, field, value).await
    }

    async fn update_fields(&self, field: RecordField, updates: &[(i64, Option<String>)]) -> Result<()> {
        let call = self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_update_on == Some(call) {
            return Err(injected_failure());
        }
        self.inner.update_fields(field, updates).await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }

    async fn sample(&self) -> Result<Option<Record>> {
        self.inner.sample().await
    }

    async fn reset(&self) -> Result<()> {
        self.inner.reset().await
    }

    async fn has_ingested(&self, digest: &str) -> Result<bool> {
        self.inner.has_ingested(digest).await
    }

    async fn mark_ingested(&self, digest: &str, source_name: &str, rows: usize) -> Result<()> {
        self.inner.mark_ingested(digest, source_name, rows).await
    }
}
