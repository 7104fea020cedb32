//! PostgreSQL adapter: rows travel as JSON through `row_to_json`

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, PgExecutor, PgPool};

use super::{
    object_columns, Collection, Filter, LockedOutcome, LockedUpdate, RecordStore, StoreError,
    StoreResult,
};
use crate::store::is_valid_column;

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Build the WHERE clause; bind parameters start at `$1`
fn where_clause(filters: &[Filter]) -> StoreResult<String> {
    if filters.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(filters.len());
    for (i, filter) in filters.iter().enumerate() {
        if !is_valid_column(&filter.column) {
            return Err(StoreError::InvalidColumn(filter.column.clone()));
        }
        parts.push(format!(
            "to_jsonb(t.{}) {} ${}",
            filter.column,
            filter.op.sql(),
            i + 1
        ));
    }
    Ok(format!(" WHERE {}", parts.join(" AND ")))
}

async fn insert_row<'e, E: PgExecutor<'e>>(
    executor: E,
    collection: Collection,
    record: Value,
) -> StoreResult<Value> {
    let columns = object_columns(collection, &record)?;
    if columns.is_empty() {
        return Err(StoreError::InvalidRecord {
            collection,
            message: "no columns to insert".to_string(),
        });
    }
    let column_list = columns.join(", ");
    let table = collection.table();
    let sql = format!(
        "INSERT INTO {table} ({column_list}) \
         SELECT {column_list} FROM jsonb_populate_record(NULL::{table}, $1) \
         RETURNING row_to_json({table}.*)::jsonb"
    );
    let row = sqlx::query_scalar::<_, Value>(&sql)
        .bind(Json(record))
        .fetch_one(executor)
        .await?;
    Ok(row)
}

/// Partial update returning the row after the write, `None` when the id is unknown
async fn update_row<'e, E: PgExecutor<'e>>(
    executor: E,
    collection: Collection,
    id: i64,
    patch: Value,
) -> StoreResult<Option<Value>> {
    let columns = object_columns(collection, &patch)?;
    let table = collection.table();
    if columns.is_empty() {
        let sql = format!("SELECT row_to_json(t)::jsonb FROM {table} t WHERE t.id = $1");
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        return Ok(row);
    }
    let sql = update_sql(table, &columns);
    let row = sqlx::query_scalar::<_, Value>(&sql)
        .bind(Json(patch))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

fn update_sql(table: &str, columns: &[String]) -> String {
    let assignments = columns
        .iter()
        .map(|c| format!("{c} = r.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {table} SET {assignments} \
         FROM jsonb_populate_record(NULL::{table}, $1) AS r \
         WHERE {table}.id = $2 \
         RETURNING row_to_json({table}.*)::jsonb"
    )
}

#[async_trait]
impl RecordStore for PgStore {
    async fn fetch_all(&self, collection: Collection, filters: &[Filter]) -> StoreResult<Vec<Value>> {
        let sql = format!(
            "SELECT row_to_json(t)::jsonb FROM {} t{} ORDER BY t.id",
            collection.table(),
            where_clause(filters)?
        );
        let mut query = sqlx::query_scalar::<_, Value>(&sql);
        for filter in filters {
            query = query.bind(Json(filter.value.clone()));
        }
        let rows = query.fetch_all(&self.db).await?;
        tracing::debug!(%collection, count = rows.len(), "Fetched rows");
        Ok(rows)
    }

    async fn fetch_one(&self, collection: Collection, id: i64) -> StoreResult<Option<Value>> {
        let sql = format!(
            "SELECT row_to_json(t)::jsonb FROM {} t WHERE t.id = $1",
            collection.table()
        );
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn insert(&self, collection: Collection, record: Value) -> StoreResult<Value> {
        insert_row(&self.db, collection, record).await
    }

    async fn update(&self, collection: Collection, id: i64, patch: Value) -> StoreResult<bool> {
        Ok(update_row(&self.db, collection, id, patch).await?.is_some())
    }

    async fn update_locked(
        &self,
        collection: Collection,
        id: i64,
        update: LockedUpdate<'_>,
    ) -> StoreResult<Option<LockedOutcome>> {
        let mut tx = self.db.begin().await?;
        let sql = format!(
            "SELECT row_to_json(t)::jsonb FROM {} t WHERE t.id = $1 FOR UPDATE",
            collection.table()
        );
        let Some(current) = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        // Dropping `tx` on an early return rolls back
        let write = update(current)?;
        let inserted = match write.insert {
            Some((dependent, record)) => Some(insert_row(&mut *tx, dependent, record).await?),
            None => None,
        };
        let updated = update_row(&mut *tx, collection, id, write.patch)
            .await?
            .ok_or_else(|| StoreError::InvalidRecord {
                collection,
                message: format!("row {} disappeared under lock", id),
            })?;
        tx.commit().await?;
        Ok(Some(LockedOutcome { updated, inserted }))
    }

    async fn delete(&self, collection: Collection, id: i64) -> StoreResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", collection.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.db).await.is_ok()
    }
}
