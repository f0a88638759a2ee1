use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

use super::record_fields as fields;
use crate::errors::{StoreError, StoreResult};
use crate::store::Record;

/// Staff and subcontractors; `supervisor_id` forms the org chart
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "staff")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub supervisor_id: Option<i32>,
    pub status: Option<String>,
    #[sea_orm(column_type = "Double", nullable)]
    pub compliance: Option<f64>,
    pub site_id: Option<i32>,
    pub email: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::SupervisorId",
        to = "Column::Id",
        on_delete = "Restrict"
    )]
    Supervisor,
    #[sea_orm(
        belongs_to = "super::sites::Entity",
        from = "Column::SiteId",
        to = "super::sites::Column::Id",
        on_delete = "SetNull"
    )]
    Sites,
}

impl Related<super::sites::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sites.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new() -> Self {
        Self {
            id: ActiveValue::NotSet,
            name: ActiveValue::NotSet,
            kind: Set(String::new()),
            supervisor_id: Set(None),
            status: ActiveValue::NotSet,
            compliance: ActiveValue::NotSet,
            site_id: ActiveValue::NotSet,
            email: ActiveValue::NotSet,
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(chrono::Utc::now()),
        }
    }

    /// Copy the fields present in `record` onto this model
    pub fn apply_record(&mut self, record: &Record) -> StoreResult<()> {
        const TABLE: &str = "staff";
        for (key, value) in record {
            match key.as_str() {
                "id" | "created_at" | "updated_at" => {}
                "name" => self.name = Set(fields::non_empty_string(TABLE, key, value)?),
                "type" | "kind" => {
                    self.kind = Set(fields::opt_string(TABLE, key, value)?.unwrap_or_default())
                }
                "supervisor_id" => self.supervisor_id = Set(fields::opt_i32(TABLE, key, value)?),
                "status" => self.status = Set(fields::opt_string(TABLE, key, value)?),
                "compliance" => self.compliance = Set(fields::opt_score(TABLE, key, value)?),
                "site_id" => self.site_id = Set(fields::opt_i32(TABLE, key, value)?),
                "email" => self.email = Set(fields::opt_string(TABLE, key, value)?),
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
