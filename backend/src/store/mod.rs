//! Data-access layer over the farm backend tables
//!
//! Services only see JSON rows through [`RecordStore`]; typed decoding into
//! the shared models happens in [`decode_rows`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Backend tables the dashboard reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Items,
    StockMovements,
    Sectors,
    Fields,
    IrrigationPrograms,
    Partners,
    WalletMovements,
    Harvests,
    Clients,
    Expenses,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Items => "bodega_insumos",
            Collection::StockMovements => "bodega_movimientos",
            Collection::Sectors => "sectores",
            Collection::Fields => "parcelas",
            Collection::IrrigationPrograms => "programas_riego",
            Collection::Partners => "socios",
            Collection::WalletMovements => "movimientos_billetera",
            Collection::Harvests => "cosechas",
            Collection::Clients => "clientes",
            Collection::Expenses => "gastos",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gte,
    Lte,
}

impl FilterOp {
    pub fn sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Neq => "<>",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
        }
    }
}

/// A single column predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    fn new(column: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    pub fn neq(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Neq, value)
    }

    pub fn gte(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Gte, value)
    }

    pub fn lte(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Lte, value)
    }

    /// Evaluate against an in-memory row; a missing column never matches
    pub fn matches(&self, row: &Value) -> bool {
        let Some(actual) = row.get(&self.column) else {
            return false;
        };
        let ordering = compare_values(actual, &self.value);
        match self.op {
            FilterOp::Eq => ordering == Some(Ordering::Equal),
            FilterOp::Neq => ordering != Some(Ordering::Equal),
            FilterOp::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

/// Numbers compare numerically, strings lexically (ISO dates sort correctly)
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.as_str().cmp(y.as_str())),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Column names reach SQL text, so only `[a-z_]+` is accepted
pub fn is_valid_column(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_lowercase() || b == b'_')
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Invalid record for {collection}: {message}")]
    InvalidRecord {
        collection: Collection,
        message: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Writes computed from a row read under lock
#[derive(Debug, Clone, Default)]
pub struct LockedWrite {
    /// Partial update for the locked row
    pub patch: Value,
    /// Dependent row inserted in the same unit of work
    pub insert: Option<(Collection, Value)>,
}

#[derive(Debug, Clone)]
pub struct LockedOutcome {
    pub updated: Value,
    pub inserted: Option<Value>,
}

/// Computes the writes from the current row; an error aborts without writing
pub type LockedUpdate<'a> = Box<dyn FnOnce(Value) -> StoreResult<LockedWrite> + Send + 'a>;

/// Generic CRUD over backend tables
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_all(&self, collection: Collection, filters: &[Filter]) -> StoreResult<Vec<Value>>;

    async fn fetch_one(&self, collection: Collection, id: i64) -> StoreResult<Option<Value>>;

    /// Insert a row and return it as stored, including its assigned `id`
    async fn insert(&self, collection: Collection, record: Value) -> StoreResult<Value>;

    /// Apply a partial update; returns false when no row has that id
    async fn update(&self, collection: Collection, id: i64, patch: Value) -> StoreResult<bool>;

    /// Read-modify-write of one row with no interleaving writer.
    /// Returns `None` when no row has that id.
    async fn update_locked(
        &self,
        collection: Collection,
        id: i64,
        update: LockedUpdate<'_>,
    ) -> StoreResult<Option<LockedOutcome>>;

    async fn delete(&self, collection: Collection, id: i64) -> StoreResult<bool>;

    /// Cheap connectivity probe for the health endpoint
    async fn ping(&self) -> bool;
}

/// Decode rows into typed records, skipping the ones that do not fit
pub fn decode_rows<T: DeserializeOwned>(collection: Collection, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(%collection, error = %e, "Skipping malformed row");
                None
            }
        })
        .collect()
}

pub fn decode_row<T: DeserializeOwned>(collection: Collection, row: Value) -> StoreResult<T> {
    serde_json::from_value(row).map_err(|e| StoreError::InvalidRecord {
        collection,
        message: e.to_string(),
    })
}

/// Keys of a JSON object, validated as column names
pub(crate) fn object_columns(collection: Collection, record: &Value) -> StoreResult<Vec<String>> {
    let Some(object) = record.as_object() else {
        return Err(StoreError::InvalidRecord {
            collection,
            message: "expected a JSON object".to_string(),
        });
    };
    object
        .keys()
        .map(|key| {
            if is_valid_column(key) {
                Ok(key.clone())
            } else {
                Err(StoreError::InvalidColumn(key.clone()))
            }
        })
        .collect()
}
