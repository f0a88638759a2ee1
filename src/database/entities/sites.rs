use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

use super::record_fields as fields;
use crate::errors::{StoreError, StoreResult};
use crate::store::Record;

/// Sites and organisational entities; `parent_id` forms the site tree
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sites")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub parent_id: Option<i32>,
    pub status: Option<String>,
    #[sea_orm(column_type = "Double", nullable)]
    pub compliance: Option<f64>,
    #[sea_orm(column_type = "Json", nullable)]
    pub address: Option<Json>,
    #[sea_orm(column_type = "Json", nullable)]
    pub gps_coordinates: Option<Json>,
    pub client_id: Option<i32>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "Restrict"
    )]
    Parent,
    #[sea_orm(has_many = "super::staff::Entity")]
    Staff,
}

impl Related<super::staff::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Staff.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new() -> Self {
        Self {
            id: ActiveValue::NotSet,
            name: ActiveValue::NotSet,
            kind: Set(String::new()),
            parent_id: Set(None),
            status: ActiveValue::NotSet,
            compliance: ActiveValue::NotSet,
            address: ActiveValue::NotSet,
            gps_coordinates: ActiveValue::NotSet,
            client_id: ActiveValue::NotSet,
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(chrono::Utc::now()),
        }
    }

    /// Copy the fields present in `record` onto this model
    pub fn apply_record(&mut self, record: &Record) -> StoreResult<()> {
        const TABLE: &str = "sites";
        for (key, value) in record {
            match key.as_str() {
                "id" | "created_at" | "updated_at" => {}
                "name" => self.name = Set(fields::non_empty_string(TABLE, key, value)?),
                "type" | "kind" => {
                    self.kind = Set(fields::opt_string(TABLE, key, value)?.unwrap_or_default())
                }
                "parent_id" => self.parent_id = Set(fields::opt_i32(TABLE, key, value)?),
                "status" => self.status = Set(fields::opt_string(TABLE, key, value)?),
                "compliance" => self.compliance = Set(fields::opt_score(TABLE, key, value)?),
                "address" => self.address = Set(fields::opt_json(value)),
                "gps_coordinates" => {
                    self.gps_coordinates = Set(fields::opt_point(TABLE, key, value)?)
                }
                "client_id" => self.client_id = Set(fields::opt_i32(TABLE, key, value)?),
                _ => {
                    return Err(StoreError::UnknownField {
                        table: TABLE.to_string(),
                        field: key.clone(),
                    })
                }
            }
        }
        self.updated_at = Set(chrono::Utc::now());
        Ok(())
    }
}
