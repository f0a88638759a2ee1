//! Record store abstraction.
//!
//! The hierarchy core never talks to a database directly. It is handed a
//! [`RecordStore`] and issues table-level CRUD calls against it; records are
//! plain JSON objects that get decoded into typed nodes at the boundary.

pub mod memory;
pub mod sql;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::StoreResult;
use crate::hierarchy::NodeId;

pub use memory::MemoryRecordStore;
pub use sql::SqlRecordStore;

/// A row as returned by the store
pub type Record = serde_json::Map<String, Value>;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    IsNull,
    NotNull,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    #[serde(default)]
    pub value: Value,
}

impl Filter {
    pub fn new(field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn is_null(field: &str) -> Self {
        Self::new(field, FilterOp::IsNull, Value::Null)
    }

    pub fn is_in<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self::new(
            field,
            FilterOp::In,
            Value::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// `eq`/`neq` against null mean `is_null`/`not_null`
    pub fn normalized_op(&self) -> FilterOp {
        match (self.op, self.value.is_null()) {
            (FilterOp::Eq, true) => FilterOp::IsNull,
            (FilterOp::Neq, true) => FilterOp::NotNull,
            (op, _) => op,
        }
    }
}

/// Which fields a fetch returns
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Field(String),
    /// Embed fields of the row in `table` referenced by `foreign_key`
    Nested {
        alias: String,
        table: String,
        foreign_key: String,
        fields: Vec<String>,
    },
}

impl Selection {
    pub fn field(name: &str) -> Self {
        Selection::Field(name.to_string())
    }

    pub fn nested(alias: &str, table: &str, foreign_key: &str, fields: &[&str]) -> Self {
        Selection::Nested {
            alias: alias.to_string(),
            table: table.to_string(),
            foreign_key: foreign_key.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows of `table` matching every filter, ordered by id
    async fn fetch(
        &self,
        table: &str,
        filters: &[Filter],
        select: &[Selection],
    ) -> StoreResult<Vec<Record>>;

    async fn insert(&self, table: &str, record: Record) -> StoreResult<Record>;

    /// Apply a partial record to row `id`
    async fn update(&self, table: &str, id: NodeId, patch: Record) -> StoreResult<Record>;

    async fn delete(&self, table: &str, id: NodeId) -> StoreResult<()>;
}

fn record_id(record: &Record) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

fn project(record: &Record, fields: &[String]) -> Record {
    let mut projected = Record::new();
    if let Some(id) = record.get("id") {
        projected.insert("id".to_string(), id.clone());
    }
    for field in fields {
        projected.insert(
            field.clone(),
            record.get(field).cloned().unwrap_or(Value::Null),
        );
    }
    projected
}

/// Shape fetched rows according to `select`.
///
/// Shared by every store: nested selections are resolved with one extra
/// `fetch` per nested table, then plain fields are projected. An empty
/// selection returns rows untouched.
pub async fn apply_selection<S>(
    store: &S,
    rows: Vec<Record>,
    select: &[Selection],
) -> StoreResult<Vec<Record>>
where
    S: RecordStore + ?Sized,
{
    if select.is_empty() {
        return Ok(rows);
    }

    let mut embedded: Vec<(String, String, HashMap<i64, Record>)> = Vec::new();
    for selection in select {
        if let Selection::Nested {
            alias,
            table,
            foreign_key,
            fields,
        } = selection
        {
            let keys: Vec<i64> = rows
                .iter()
                .filter_map(|row| row.get(foreign_key).and_then(Value::as_i64))
                .collect();
            let targets = if keys.is_empty() {
                Vec::new()
            } else {
                store
                    .fetch(table, &[Filter::is_in("id", keys)], &[])
                    .await?
            };
            let by_id = targets
                .iter()
                .filter_map(|target| record_id(target).map(|id| (id, project(target, fields))))
                .collect();
            embedded.push((alias.clone(), foreign_key.clone(), by_id));
        }
    }

    let fields: Vec<String> = select
        .iter()
        .filter_map(|s| match s {
            Selection::Field(name) => Some(name.clone()),
            Selection::Nested { .. } => None,
        })
        .collect();

    Ok(rows
        .into_iter()
        .map(|row| {
            let mut shaped = project(&row, &fields);
            for (alias, foreign_key, by_id) in &embedded {
                let nested = row
                    .get(foreign_key)
                    .and_then(Value::as_i64)
                    .and_then(|key| by_id.get(&key))
                    .map(|target| Value::Object(target.clone()))
                    .unwrap_or(Value::Null);
                shaped.insert(alias.clone(), nested);
            }
            shaped
        })
        .collect())
}
