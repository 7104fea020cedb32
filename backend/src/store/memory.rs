//! In-memory adapter used by tests and `memory://` development runs

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use super::{
    object_columns, Collection, Filter, LockedOutcome, LockedUpdate, RecordStore, StoreError,
    StoreResult,
};

type Tables = HashMap<Collection, Vec<Value>>;

pub struct MemoryStore {
    tables: RwLock<Tables>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Load fixture rows; rows without an `id` get one assigned
    pub async fn seed(&self, collection: Collection, rows: Vec<Value>) {
        for row in rows {
            if let Err(e) = self.insert(collection, row).await {
                tracing::warn!(%collection, error = %e, "Skipping fixture row");
            }
        }
    }

    fn insert_row(&self, tables: &mut Tables, collection: Collection, mut record: Value) -> StoreResult<Value> {
        let id = self.assign_id(&mut record);
        let rows = tables.entry(collection).or_default();
        if rows.iter().any(|row| row_id(row) == Some(id)) {
            return Err(StoreError::InvalidRecord {
                collection,
                message: format!("duplicate id {}", id),
            });
        }
        rows.push(record.clone());
        Ok(record)
    }

    fn assign_id(&self, record: &mut Value) -> i64 {
        match record.get("id").and_then(Value::as_i64) {
            Some(id) => {
                self.next_id.fetch_max(id + 1, Ordering::SeqCst);
                id
            }
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                record["id"] = Value::from(id);
                id
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn row_id(row: &Value) -> Option<i64> {
    row.get("id").and_then(Value::as_i64)
}

fn find_row(tables: &Tables, collection: Collection, id: i64) -> Option<&Value> {
    tables
        .get(&collection)
        .and_then(|rows| rows.iter().find(|row| row_id(row) == Some(id)))
}

/// Merge every key but `id` into the row; returns the row after the merge
fn patch_row(tables: &mut Tables, collection: Collection, id: i64, patch: &Value) -> Option<Value> {
    let row = tables
        .get_mut(&collection)?
        .iter_mut()
        .find(|row| row_id(row) == Some(id))?;
    if let (Some(target), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
        for (key, value) in changes {
            if key != "id" {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    Some(row.clone())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_all(&self, collection: Collection, filters: &[Filter]) -> StoreResult<Vec<Value>> {
        let tables = self.tables.read().await;
        let rows = tables
            .get(&collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filters.iter().all(|f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    async fn fetch_one(&self, collection: Collection, id: i64) -> StoreResult<Option<Value>> {
        let tables = self.tables.read().await;
        Ok(find_row(&tables, collection, id).cloned())
    }

    async fn insert(&self, collection: Collection, record: Value) -> StoreResult<Value> {
        object_columns(collection, &record)?;
        let mut tables = self.tables.write().await;
        self.insert_row(&mut tables, collection, record)
    }

    async fn update(&self, collection: Collection, id: i64, patch: Value) -> StoreResult<bool> {
        object_columns(collection, &patch)?;
        let mut tables = self.tables.write().await;
        Ok(patch_row(&mut tables, collection, id, &patch).is_some())
    }

    async fn update_locked(
        &self,
        collection: Collection,
        id: i64,
        update: LockedUpdate<'_>,
    ) -> StoreResult<Option<LockedOutcome>> {
        let mut tables = self.tables.write().await;
        let Some(current) = find_row(&tables, collection, id).cloned() else {
            return Ok(None);
        };
        let write = update(current)?;
        object_columns(collection, &write.patch)?;
        if let Some((dependent, record)) = &write.insert {
            object_columns(*dependent, record)?;
        }
        let inserted = match write.insert {
            Some((dependent, record)) => Some(self.insert_row(&mut tables, dependent, record)?),
            None => None,
        };
        let updated = patch_row(&mut tables, collection, id, &write.patch).ok_or_else(|| {
            StoreError::InvalidRecord {
                collection,
                message: format!("row {} disappeared under lock", id),
            }
        })?;
        Ok(Some(LockedOutcome { updated, inserted }))
    }

    async fn delete(&self, collection: Collection, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&collection) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|row| row_id(row) != Some(id));
        Ok(rows.len() < before)
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LockedWrite;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let store = MemoryStore::new();
        let a = store.insert(Collection::Partners, json!({"nombre": "Ana"})).await.unwrap();
        let b = store.insert(Collection::Partners, json!({"id": 10, "nombre": "Luis"})).await.unwrap();
        let c = store.insert(Collection::Partners, json!({"nombre": "Eva"})).await.unwrap();
        assert_eq!(a["id"], 1);
        assert_eq!(b["id"], 10);
        assert_eq!(c["id"], 11);
        assert!(store.insert(Collection::Partners, json!({"id": 10})).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = MemoryStore::new();
        store.seed(Collection::Items, vec![json!({"id": 1, "stock_actual": 5})]).await;
        assert!(store.update(Collection::Items, 1, json!({"stock_actual": 8})).await.unwrap());
        assert!(!store.update(Collection::Items, 2, json!({"stock_actual": 8})).await.unwrap());
        let row = store.fetch_one(Collection::Items, 1).await.unwrap().unwrap();
        assert_eq!(row["stock_actual"], 8);

        assert!(store.delete(Collection::Items, 1).await.unwrap());
        assert!(!store.delete(Collection::Items, 1).await.unwrap());
        assert!(store.fetch_all(Collection::Items, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_locked_writes_row_and_dependent() {
        let store = MemoryStore::new();
        store.seed(Collection::Items, vec![json!({"id": 1, "stock_actual": 5})]).await;

        let outcome = store
            .update_locked(
                Collection::Items,
                1,
                Box::new(|row: Value| -> StoreResult<LockedWrite> {
                    let stock = row["stock_actual"].as_i64().unwrap_or_default();
                    Ok(LockedWrite {
                        patch: json!({"stock_actual": stock + 3}),
                        insert: Some((Collection::StockMovements, json!({"insumo_id": 1, "cantidad": 3}))),
                    })
                }),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.updated["stock_actual"], 8);
        let movement = outcome.inserted.unwrap();
        assert_eq!(movement["insumo_id"], 1);
        assert_eq!(store.fetch_all(Collection::StockMovements, &[]).await.unwrap().len(), 1);

        let missing = store
            .update_locked(
                Collection::Items,
                9,
                Box::new(|_row: Value| -> StoreResult<LockedWrite> { Ok(LockedWrite::default()) }),
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_update_locked_error_writes_nothing() {
        let store = MemoryStore::new();
        store.seed(Collection::Items, vec![json!({"id": 1, "stock_actual": 5})]).await;

        let result = store
            .update_locked(
                Collection::Items,
                1,
                Box::new(|_row: Value| -> StoreResult<LockedWrite> {
                    Err(StoreError::InvalidRecord {
                        collection: Collection::Items,
                        message: "rejected".to_string(),
                    })
                }),
            )
            .await;
        assert!(result.is_err());

        let bad_column = store
            .update_locked(
                Collection::Items,
                1,
                Box::new(|_row: Value| -> StoreResult<LockedWrite> {
                    Ok(LockedWrite {
                        patch: json!({"Bad Column": 1}),
                        insert: Some((Collection::StockMovements, json!({"cantidad": 1}))),
                    })
                }),
            )
            .await;
        assert!(bad_column.is_err());

        let row = store.fetch_one(Collection::Items, 1).await.unwrap().unwrap();
        assert_eq!(row["stock_actual"], 5);
        assert!(store.fetch_all(Collection::StockMovements, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_applies_filters() {
        let store = MemoryStore::new();
        store
            .seed(
                Collection::Expenses,
                vec![
                    json!({"fecha": "2024-01-05", "monto": 10}),
                    json!({"fecha": "2024-02-05", "monto": 20}),
                ],
            )
            .await;
        let rows = store
            .fetch_all(Collection::Expenses, &[Filter::gte("fecha", "2024-02-01")])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["monto"], 20);
    }
}
