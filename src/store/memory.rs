use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::{apply_selection, Filter, FilterOp, Record, RecordStore, Selection};
use crate::errors::{StoreError, StoreResult};
use crate::hierarchy::{NodeFlavor, NodeId};

#[derive(Default)]
struct Table {
    next_id: NodeId,
    rows: IndexMap<NodeId, Record>,
    /// Field holding a reference back into this same table
    self_reference: Option<&'static str>,
}

/// Record store held entirely in memory.
///
/// Tables are schemaless: a filter on a field a row lacks treats the field as
/// null. The hierarchy tables enforce their parent/supervisor references on
/// write and refuse deletes that would orphan children.
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    /// Store serving the `sites` and `staff` tables
    pub fn new() -> Self {
        let tables = NodeFlavor::ALL
            .into_iter()
            .map(|flavor| {
                (
                    flavor.table().to_string(),
                    Table {
                        next_id: 1,
                        rows: IndexMap::new(),
                        self_reference: Some(flavor.parent_field()),
                    },
                )
            })
            .collect();
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Register an extra table with no reference checks
    pub async fn add_table(&self, table: &str) {
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_insert_with(|| Table {
                next_id: 1,
                ..Default::default()
            });
    }

    /// Load rows verbatim, ids included, skipping reference checks.
    ///
    /// Meant for fixtures that need malformed data such as cycles.
    pub async fn seed(&self, table: &str, rows: Vec<Record>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        for row in rows {
            let id = row
                .get("id")
                .and_then(Value::as_i64)
                .and_then(|id| NodeId::try_from(id).ok())
                .ok_or_else(|| StoreError::InvalidRecord("seeded row needs an integer id".to_string()))?;
            target.next_id = target.next_id.max(id.saturating_add(1));
            target.rows.insert(id, row);
        }
        Ok(())
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    compare(left, right) == Some(Ordering::Equal) || left == right
}

fn row_matches(row: &Record, filter: &Filter) -> bool {
    let value = row.get(&filter.field).unwrap_or(&Value::Null);
    match filter.normalized_op() {
        FilterOp::IsNull => value.is_null(),
        FilterOp::NotNull => !value.is_null(),
        FilterOp::Eq => values_equal(value, &filter.value),
        FilterOp::Neq => !value.is_null() && !values_equal(value, &filter.value),
        FilterOp::Gt => compare(value, &filter.value) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(
            compare(value, &filter.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::Lt => compare(value, &filter.value) == Some(Ordering::Less),
        FilterOp::Lte => matches!(
            compare(value, &filter.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOp::In => filter
            .value
            .as_array()
            .map(|candidates| candidates.iter().any(|c| values_equal(value, c)))
            .unwrap_or(false),
    }
}

fn check_reference(table_name: &str, table: &Table, row_id: NodeId, record: &Record) -> StoreResult<()> {
    let Some(field) = table.self_reference else {
        return Ok(());
    };
    match record.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(value) => {
            let parent = value
                .as_i64()
                .and_then(|id| NodeId::try_from(id).ok())
                .ok_or_else(|| {
                    StoreError::InvalidRecord(format!("{} must be an integer id", field))
                })?;
            if parent == row_id || table.rows.contains_key(&parent) {
                Ok(())
            } else {
                Err(StoreError::ConstraintViolation(format!(
                    "{}.{} references missing row {}",
                    table_name, field, parent
                )))
            }
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch(
        &self,
        table: &str,
        filters: &[Filter],
        select: &[Selection],
    ) -> StoreResult<Vec<Record>> {
        let rows: Vec<Record> = {
            let tables = self.tables.read().await;
            let target = tables
                .get(table)
                .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
            let mut rows: Vec<(NodeId, &Record)> = target
                .rows
                .iter()
                .filter(|(_, row)| filters.iter().all(|f| row_matches(row, f)))
                .map(|(id, row)| (*id, row))
                .collect();
            rows.sort_by_key(|(id, _)| *id);
            rows.into_iter().map(|(_, row)| row.clone()).collect()
        };
        debug!("Fetched {} rows from {}", rows.len(), table);
        apply_selection(self, rows, select).await
    }

    async fn insert(&self, table: &str, mut record: Record) -> StoreResult<Record> {
        let mut tables = self.tables.write().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let id = target.next_id;
        // next_id saturates at NodeId::MAX
        if target.rows.contains_key(&id) {
            return Err(StoreError::ConstraintViolation(format!(
                "{} has no free ids left",
                table
            )));
        }
        check_reference(table, target, id, &record)?;
        record.insert("id".to_string(), Value::from(id));
        target.next_id = id.saturating_add(1);
        target.rows.insert(id, record.clone());
        debug!("Inserted {} into {}", id, table);
        Ok(record)
    }

    async fn update(&self, table: &str, id: NodeId, patch: Record) -> StoreResult<Record> {
        let mut tables = self.tables.write().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        if !target.rows.contains_key(&id) {
            return Err(StoreError::RecordNotFound {
                table: table.to_string(),
                id,
            });
        }

        check_reference(table, target, id, &patch)?;
        let row = target.rows.get_mut(&id).ok_or_else(|| StoreError::RecordNotFound {
            table: table.to_string(),
            id,
        })?;
        for (key, value) in patch {
            if key != "id" {
                row.insert(key, value);
            }
        }
        debug!("Updated {} in {}", id, table);
        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: NodeId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        if let Some(field) = target.self_reference {
            let referenced = target.rows.iter().any(|(row_id, row)| {
                *row_id != id && row.get(field).and_then(Value::as_i64) == Some(i64::from(id))
            });
            if referenced {
                return Err(StoreError::ConstraintViolation(format!(
                    "{} {} is still referenced by {}",
                    table, id, field
                )));
            }
        }

        if target.rows.shift_remove(&id).is_none() {
            return Err(StoreError::RecordNotFound {
                table: table.to_string(),
                id,
            });
        }
        debug!("Deleted {} from {}", id, table);
        Ok(())
    }
}
