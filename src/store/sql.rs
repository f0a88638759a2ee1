//! SQLite-backed record store over the sea-orm entities.

use std::str::FromStr;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IdenStatic,
    Iterable, QueryFilter, QueryOrder,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{apply_selection, Filter, FilterOp, Record, RecordStore, Selection};
use crate::database::entities::{sites, staff};
use crate::errors::{StoreError, StoreResult};
use crate::hierarchy::{NodeFlavor, NodeId};

#[derive(Clone, Debug)]
pub struct SqlRecordStore {
    db: DatabaseConnection,
}

fn unknown_table(table: &str) -> StoreError {
    StoreError::UnknownTable(table.to_string())
}

fn flavor_of(table: &str) -> StoreResult<NodeFlavor> {
    NodeFlavor::from_table(table).ok_or_else(|| unknown_table(table))
}

fn to_record<M: Serialize>(model: &M) -> StoreResult<Record> {
    match serde_json::to_value(model)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidRecord(format!(
            "expected a row object, got {}",
            other
        ))),
    }
}

fn to_db_value(table: &str, field: &str, value: &Value) -> StoreResult<sea_orm::Value> {
    match value {
        Value::Bool(b) => Ok((*b).into()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(i.into()),
            None => n.as_f64().map(Into::into).ok_or_else(|| {
                StoreError::InvalidRecord(format!("{}.{}: unsupported number {}", table, field, n))
            }),
        },
        Value::String(s) => Ok(s.clone().into()),
        other => Err(StoreError::InvalidRecord(format!(
            "{}.{} cannot be compared with {}",
            table, field, other
        ))),
    }
}

/// Match a record field against the SQL column name first (`type`), then the
/// entity field name (`kind`)
fn resolve_column<C>(table: &str, field: &str) -> StoreResult<C>
where
    C: ColumnTrait + FromStr,
{
    C::iter()
        .find(|column| column.as_str() == field)
        .or_else(|| C::from_str(field).ok())
        .ok_or_else(|| StoreError::UnknownField {
            table: table.to_string(),
            field: field.to_string(),
        })
}

fn condition_for<C>(table: &str, filters: &[Filter]) -> StoreResult<Condition>
where
    C: ColumnTrait + FromStr,
{
    let mut condition = Condition::all();
    for filter in filters {
        let column = resolve_column::<C>(table, &filter.field)?;
        let value = || to_db_value(table, &filter.field, &filter.value);
        let expr = match filter.normalized_op() {
            FilterOp::IsNull => column.is_null(),
            FilterOp::NotNull => column.is_not_null(),
            FilterOp::Eq => column.eq(value()?),
            FilterOp::Neq => column.ne(value()?),
            FilterOp::Gt => column.gt(value()?),
            FilterOp::Gte => column.gte(value()?),
            FilterOp::Lt => column.lt(value()?),
            FilterOp::Lte => column.lte(value()?),
            FilterOp::In => {
                let items = filter.value.as_array().ok_or_else(|| {
                    StoreError::InvalidRecord(format!(
                        "{}.{}: `in` expects an array",
                        table, filter.field
                    ))
                })?;
                let values = items
                    .iter()
                    .map(|item| to_db_value(table, &filter.field, item))
                    .collect::<StoreResult<Vec<_>>>()?;
                column.is_in(values)
            }
        };
        condition = condition.add(expr);
    }
    Ok(condition)
}

fn require_name(table: &str, record: &Record) -> StoreResult<()> {
    match record.get("name") {
        Some(Value::String(_)) => Ok(()),
        _ => Err(StoreError::InvalidRecord(format!(
            "{} insert requires a name",
            table
        ))),
    }
}

impl SqlRecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn fetch_rows<E>(&self, table: &str, filters: &[Filter]) -> StoreResult<Vec<Record>>
    where
        E: EntityTrait,
        E::Model: Serialize,
        E::Column: FromStr,
    {
        let condition = condition_for::<E::Column>(table, filters)?;
        let id = resolve_column::<E::Column>(table, "id")?;
        let models = E::find()
            .filter(condition)
            .order_by_asc(id)
            .all(&self.db)
            .await
            .map_err(|e| StoreError::from_db_err(&format!("fetch {}", table), e))?;
        models.iter().map(to_record).collect()
    }
}

#[async_trait]
impl RecordStore for SqlRecordStore {
    async fn fetch(
        &self,
        table: &str,
        filters: &[Filter],
        select: &[Selection],
    ) -> StoreResult<Vec<Record>> {
        let rows = match flavor_of(table)? {
            NodeFlavor::Site => self.fetch_rows::<sites::Entity>(table, filters).await?,
            NodeFlavor::Staff => self.fetch_rows::<staff::Entity>(table, filters).await?,
        };
        debug!("Fetched {} rows from {}", rows.len(), table);
        apply_selection(self, rows, select).await
    }

    async fn insert(&self, table: &str, record: Record) -> StoreResult<Record> {
        require_name(table, &record)?;
        let operation = format!("insert into {}", table);
        let created = match flavor_of(table)? {
            NodeFlavor::Site => {
                let mut model = sites::ActiveModel::new();
                model.apply_record(&record)?;
                let created = model
                    .insert(&self.db)
                    .await
                    .map_err(|e| StoreError::from_db_err(&operation, e))?;
                to_record(&created)?
            }
            NodeFlavor::Staff => {
                let mut model = staff::ActiveModel::new();
                model.apply_record(&record)?;
                let created = model
                    .insert(&self.db)
                    .await
                    .map_err(|e| StoreError::from_db_err(&operation, e))?;
                to_record(&created)?
            }
        };
        debug!("Inserted {} row id {:?}", table, created.get("id"));
        Ok(created)
    }

    async fn update(&self, table: &str, id: NodeId, patch: Record) -> StoreResult<Record> {
        let operation = format!("update {} {}", table, id);
        let not_found = || StoreError::RecordNotFound {
            table: table.to_string(),
            id,
        };
        match flavor_of(table)? {
            NodeFlavor::Site => {
                let existing = sites::Entity::find_by_id(id)
                    .one(&self.db)
                    .await
                    .map_err(|e| StoreError::from_db_err(&operation, e))?
                    .ok_or_else(not_found)?;
                let mut model: sites::ActiveModel = existing.into();
                model.apply_record(&patch)?;
                let updated = model
                    .update(&self.db)
                    .await
                    .map_err(|e| StoreError::from_db_err(&operation, e))?;
                to_record(&updated)
            }
            NodeFlavor::Staff => {
                let existing = staff::Entity::find_by_id(id)
                    .one(&self.db)
                    .await
                    .map_err(|e| StoreError::from_db_err(&operation, e))?
                    .ok_or_else(not_found)?;
                let mut model: staff::ActiveModel = existing.into();
                model.apply_record(&patch)?;
                let updated = model
                    .update(&self.db)
                    .await
                    .map_err(|e| StoreError::from_db_err(&operation, e))?;
                to_record(&updated)
            }
        }
    }

    async fn delete(&self, table: &str, id: NodeId) -> StoreResult<()> {
        let operation = format!("delete {} {}", table, id);
        let result = match flavor_of(table)? {
            NodeFlavor::Site => sites::Entity::delete_by_id(id).exec(&self.db).await,
            NodeFlavor::Staff => staff::Entity::delete_by_id(id).exec(&self.db).await,
        }
        .map_err(|e| StoreError::from_db_err(&operation, e))?;

        if result.rows_affected == 0 {
            return Err(StoreError::RecordNotFound {
                table: table.to_string(),
                id,
            });
        }
        debug!("Deleted {} row id {}", table, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    async fn store() -> SqlRecordStore {
        SqlRecordStore::new(setup_test_db().await)
    }

    #[tokio::test]
    async fn test_insert_and_fetch_site() {
        let store = store().await;
        let root = store
            .insert("sites", record(json!({"name": "HQ", "type": "client"})))
            .await
            .unwrap();
        assert_eq!(root["id"], 1);
        assert_eq!(root["type"], "client");
        assert_eq!(root["parent_id"], Value::Null);

        store
            .insert(
                "sites",
                record(json!({"name": "Depot", "type": "site", "parent_id": 1,
                              "gps_coordinates": "(10.5,20.25)"})),
            )
            .await
            .unwrap();

        let children = store
            .fetch("sites", &[Filter::eq("parent_id", 1)], &[])
            .await
            .unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0]["name"], "Depot");
        assert_eq!(
            children[0]["gps_coordinates"],
            json!({"latitude": 10.5, "longitude": 20.25})
        );
    }

    #[tokio::test]
    async fn test_filters_by_type_column_name() {
        let store = store().await;
        for (name, kind) in [("A", "guard"), ("B", "supervisor"), ("C", "guard")] {
            store
                .insert("staff", record(json!({"name": name, "type": kind})))
                .await
                .unwrap();
        }
        let guards = store
            .fetch("staff", &[Filter::eq("type", "guard")], &[])
            .await
            .unwrap();
        let names: Vec<_> = guards.iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, vec![json!("A"), json!("C")]);

        let some = store
            .fetch("staff", &[Filter::is_in("id", [1, 2])], &[Selection::field("name")])
            .await
            .unwrap();
        assert_eq!(some.len(), 2);
        assert_eq!(Value::Object(some[0].clone()), json!({"id": 1, "name": "A"}));
    }

    #[test]
    fn test_resolve_column_by_column_and_field_name() {
        let by_column = resolve_column::<sites::Column>("sites", "type").unwrap();
        assert_eq!(by_column.as_str(), "type");
        let by_field = resolve_column::<staff::Column>("staff", "kind").unwrap();
        assert_eq!(by_field.as_str(), "type");
        assert_eq!(
            resolve_column::<staff::Column>("staff", "supervisor_id").unwrap().as_str(),
            "supervisor_id"
        );
        assert!(matches!(
            resolve_column::<sites::Column>("sites", "colour"),
            Err(StoreError::UnknownField { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_table_and_field() {
        let store = store().await;
        assert!(matches!(
            store.fetch("clients", &[], &[]).await,
            Err(StoreError::UnknownTable(_))
        ));
        assert!(matches!(
            store.fetch("sites", &[Filter::eq("colour", "red")], &[]).await,
            Err(StoreError::UnknownField { .. })
        ));
        assert!(matches!(
            store.insert("sites", record(json!({"name": "X", "colour": "red"}))).await,
            Err(StoreError::UnknownField { .. })
        ));
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let store = store().await;
        let missing_parent = store
            .insert("staff", record(json!({"name": "Orphan", "supervisor_id": 42})))
            .await;
        assert!(matches!(missing_parent, Err(StoreError::ConstraintViolation(_))));

        store
            .insert("staff", record(json!({"name": "Boss"})))
            .await
            .unwrap();
        store
            .insert("staff", record(json!({"name": "Guard", "supervisor_id": 1})))
            .await
            .unwrap();
        let err = store.delete("staff", 1).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = store().await;
        store
            .insert("staff", record(json!({"name": "Boss"})))
            .await
            .unwrap();
        store
            .insert("staff", record(json!({"name": "Guard", "compliance": 50})))
            .await
            .unwrap();

        let updated = store
            .update("staff", 2, record(json!({"supervisor_id": 1, "compliance": 80.5})))
            .await
            .unwrap();
        assert_eq!(updated["supervisor_id"], 1);
        assert_eq!(updated["compliance"], 80.5);
        assert_eq!(updated["name"], "Guard");

        assert!(store.update("staff", 9, Record::new()).await.unwrap_err().is_not_found());
        store.delete("staff", 2).await.unwrap();
        assert!(store.delete("staff", 2).await.unwrap_err().is_not_found());
    }
}
