use crate::app::ports::StoragePort;
use crate::domain::{NewRecord, Record, RecordField};
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Default)]
struct State {
    /// Ascending by id
    records: Vec<Record>,
    next_id: i64,
    ingested: HashMap<String, (String, usize)>,
}

/// In-memory storage implementation for development/testing
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<Mutex<State>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| EtlError::Io(std::io::Error::new(std::io::ErrorKind::Other, "in-memory storage lock poisoned")))
    }
}

fn set_field(record: &mut Record, field: RecordField, value: Option<String>) {
    match field {
        RecordField::TranslatedItem => record.translated_item = value,
        RecordField::Category => record.category = value,
    }
}

#[async_trait]
impl StoragePort for InMemoryStorage {
    async fn append(&self, records: &[NewRecord]) -> Result<usize> {
        let mut state = self.state()?;
        for record in records {
            state.next_id += 1;
            let id = state.next_id;
            state.records.push(Record {
                id,
                restaurant: record.restaurant.clone(),
                item: record.item.clone(),
                translated_item: None,
                nutrition: record.nutrition.clone(),
                category: None,
            });
        }
        debug!("Appended {} records", records.len());
        Ok(records.len())
    }

    async fn query_all(&self) -> Result<Vec<Record>> {
        Ok(self.state()?.records.clone())
    }

    async fn query_page(&self, after_id: Option<i64>, limit: usize) -> Result<Vec<Record>> {
        let state = self.state()?;
        let after = after_id.unwrap_or(i64::MIN);
        Ok(state
            .records
            .iter()
            .filter(|r| r.id > after)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_field(&self, id: i64, field: RecordField, value: Option<&str>) -> Result<()> {
        self.update_fields(field, &[(id, value.map(str::to_string))]).await
    }

    async fn update_fields(&self, field: RecordField, updates: &[(i64, Option<String>)]) -> Result<()> {
        let mut state = self.state()?;
        // Validate every id first so a bad batch changes nothing
        let mut positions = Vec::with_capacity(updates.len());
        for (id, _) in updates {
            let position = state
                .records
                .binary_search_by_key(id, |r| r.id)
                .map_err(|_| EtlError::Storage(rusqlite::Error::QueryReturnedNoRows))?;
            positions.push(position);
        }
        for (position, (_, value)) in positions.into_iter().zip(updates) {
            set_field(&mut state.records[position], field, value.clone());
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.state()?.records.len())
    }

    async fn sample(&self) -> Result<Option<Record>> {
        Ok(self.state()?.records.first().cloned())
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state()?;
        *state = State::default();
        Ok(())
    }

    async fn has_ingested(&self, digest: &str) -> Result<bool> {
        Ok(self.state()?.ingested.contains_key(digest))
    }

    async fn mark_ingested(&self, digest: &str, source_name: &str, rows: usize) -> Result<()> {
        self.state()?
            .ingested
            .insert(digest.to_string(), (source_name.to_string(), rows));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Nutrition;

    fn new_record(item: &str) -> NewRecord {
        NewRecord {
            restaurant: "Subway".to_string(),
            item: item.to_string(),
            nutrition: Nutrition::new(),
        }
    }

    #[tokio::test]
    async fn test_append_assigns_ascending_ids() {
        let storage = InMemoryStorage::new();
        storage.append(&[new_record("A"), new_record("B")]).await.unwrap();
        storage.append(&[new_record("C")]).await.unwrap();

        let all = storage.query_all().await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(storage.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_pages() {
        let storage = InMemoryStorage::new();
        storage
            .append(&[new_record("A"), new_record("B"), new_record("C")])
            .await
            .unwrap();

        let first = storage.query_page(None, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        let second = storage.query_page(Some(first[1].id), 2).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].item, "C");
    }

    #[tokio::test]
    async fn test_bad_batch_changes_nothing() {
        let storage = InMemoryStorage::new();
        storage.append(&[new_record("A")]).await.unwrap();

        let result = storage
            .update_fields(RecordField::Category, &[(1, Some("Main".into())), (99, Some("Side".into()))])
            .await;

        assert!(result.is_err());
        assert_eq!(storage.query_all().await.unwrap()[0].category, None);
    }

    #[tokio::test]
    async fn test_reset_clears_ingest_history() {
        let storage = InMemoryStorage::new();
        storage.append(&[new_record("A")]).await.unwrap();
        storage.mark_ingested("abc", "menu.csv", 1).await.unwrap();
        assert!(storage.has_ingested("abc").await.unwrap());

        storage.reset().await.unwrap();

        assert!(!storage.has_ingested("abc").await.unwrap());
        assert_eq!(storage.count().await.unwrap(), 0);
    }
}
