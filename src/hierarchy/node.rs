use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::gps::GpsPoint;
use crate::errors::{StoreError, StoreResult};
use crate::store::Record;

/// Store-assigned node identifier
pub type NodeId = i32;

/// The two node flavors. A hierarchy never mixes them: sites parent sites,
/// staff supervise staff.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeFlavor {
    Site,
    Staff,
}

impl NodeFlavor {
    pub const ALL: [NodeFlavor; 2] = [NodeFlavor::Site, NodeFlavor::Staff];

    /// Record store table holding this flavor
    pub fn table(&self) -> &'static str {
        match self {
            NodeFlavor::Site => "sites",
            NodeFlavor::Staff => "staff",
        }
    }

    /// Column holding the back-reference to the parent node
    pub fn parent_field(&self) -> &'static str {
        match self {
            NodeFlavor::Site => "parent_id",
            NodeFlavor::Staff => "supervisor_id",
        }
    }

    pub fn from_table(table: &str) -> Option<NodeFlavor> {
        NodeFlavor::ALL.into_iter().find(|f| f.table() == table)
    }
}

impl fmt::Display for NodeFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeFlavor::Site => write!(f, "site"),
            NodeFlavor::Staff => write!(f, "staff"),
        }
    }
}

/// A record that takes part in a hierarchy.
///
/// `kind` is deliberately an open string: any type may parent any other.
pub trait HierarchyNode:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const FLAVOR: NodeFlavor;

    fn id(&self) -> NodeId;
    fn parent_id(&self) -> Option<NodeId>;
    fn label(&self) -> &str;
    fn kind(&self) -> &str;
    fn compliance(&self) -> Option<f64>;

    /// Field checks applied whenever a record crosses the store boundary
    fn validate(&self) -> Result<(), String> {
        if self.label().trim().is_empty() {
            return Err(format!("{} {} has an empty name", Self::FLAVOR, self.id()));
        }
        if let Some(score) = self.compliance() {
            if !(0.0..=100.0).contains(&score) {
                return Err(format!(
                    "{} {} compliance {} is outside 0-100",
                    Self::FLAVOR,
                    self.id(),
                    score
                ));
            }
        }
        Ok(())
    }

    /// Decode and validate a store record
    fn from_record(record: Record) -> StoreResult<Self> {
        let node: Self = serde_json::from_value(Value::Object(record)).map_err(|e| {
            StoreError::InvalidRecord(format!("{} record: {}", Self::FLAVOR, e))
        })?;
        node.validate().map_err(StoreError::InvalidRecord)?;
        Ok(node)
    }
}

/// A site or organisational entity (global, national, region, site,
/// special_activity, ...)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Site {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub parent_id: Option<NodeId>,
    pub status: Option<String>,
    pub compliance: Option<f64>,
    pub address: Option<Value>,
    pub gps_coordinates: Option<GpsPoint>,
    pub client_id: Option<i32>,
}

impl HierarchyNode for Site {
    const FLAVOR: NodeFlavor = NodeFlavor::Site;

    fn id(&self) -> NodeId {
        self.id
    }

    fn parent_id(&self) -> Option<NodeId> {
        self.parent_id
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn compliance(&self) -> Option<f64> {
        self.compliance
    }
}

/// A staff member or subcontractor; `supervisor_id` forms the org chart
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Staff {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub supervisor_id: Option<NodeId>,
    pub status: Option<String>,
    pub compliance: Option<f64>,
    pub site_id: Option<NodeId>,
    pub email: Option<String>,
}

impl HierarchyNode for Staff {
    const FLAVOR: NodeFlavor = NodeFlavor::Staff;

    fn id(&self) -> NodeId {
        self.id
    }

    fn parent_id(&self) -> Option<NodeId> {
        self.supervisor_id
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn compliance(&self) -> Option<f64> {
        self.compliance
    }
}

/// Input for creating a node of either flavor. Flavor-specific attributes
/// go in `attributes` and are passed to the store as-is.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct NewNode {
    pub name: String,
    pub kind: String,
    pub parent_id: Option<NodeId>,
    pub status: Option<String>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
}

impl NewNode {
    pub fn new(name: &str, kind: &str, parent_id: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            parent_id,
            status: Some("Active".to_string()),
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Store record for `flavor`, mapping `parent_id` onto the flavor's
    /// back-reference column
    pub fn to_record(&self, flavor: NodeFlavor) -> Record {
        let mut record = self.attributes.clone();
        record.insert("name".to_string(), Value::from(self.name.trim()));
        record.insert("type".to_string(), Value::from(self.kind.clone()));
        record.insert(
            flavor.parent_field().to_string(),
            self.parent_id.map(Value::from).unwrap_or(Value::Null),
        );
        if let Some(status) = &self.status {
            record.insert("status".to_string(), Value::from(status.clone()));
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_site_from_record_with_postgres_point() {
        let site = Site::from_record(record(json!({
            "id": 4,
            "name": "Northeast",
            "type": "region",
            "parent_id": 2,
            "gps_coordinates": "(42.36,-71.06)",
            "created_at": "2026-01-01T00:00:00Z"
        })))
        .unwrap();

        assert_eq!(site.kind, "region");
        assert_eq!(site.parent_id(), Some(2));
        assert_eq!(site.gps_coordinates.unwrap().latitude, 42.36);
        assert!(site.status.is_none());
    }

    #[test]
    fn test_staff_uses_supervisor_as_parent() {
        let staff = Staff::from_record(record(json!({
            "id": 9,
            "name": "Dana Reyes",
            "type": "Standard Officer",
            "supervisor_id": 3
        })))
        .unwrap();

        assert_eq!(staff.parent_id(), Some(3));
        assert_eq!(Staff::FLAVOR.parent_field(), "supervisor_id");
    }

    #[test]
    fn test_rejects_compliance_out_of_range() {
        let err = Site::from_record(record(json!({
            "id": 1,
            "name": "HQ",
            "compliance": 140
        })))
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
        assert!(err.to_string().contains("compliance"));
    }

    #[test]
    fn test_rejects_blank_name_and_missing_id() {
        assert!(Staff::from_record(record(json!({"id": 1, "name": "  "}))).is_err());
        assert!(Staff::from_record(record(json!({"name": "No Id"}))).is_err());
    }

    #[test]
    fn test_new_node_maps_parent_field_per_flavor() {
        let new = NewNode::new(" Night Shift ", "Supervisor", Some(2)).with_attribute("email", "n@x.io");

        let staff = new.to_record(NodeFlavor::Staff);
        assert_eq!(staff["supervisor_id"], json!(2));
        assert_eq!(staff["name"], json!("Night Shift"));
        assert_eq!(staff["email"], json!("n@x.io"));
        assert!(!staff.contains_key("parent_id"));

        let site = NewNode::new("Depot", "site", None).to_record(NodeFlavor::Site);
        assert_eq!(site["parent_id"], Value::Null);
    }

    #[test]
    fn test_flavor_tables() {
        assert_eq!(NodeFlavor::from_table("sites"), Some(NodeFlavor::Site));
        assert_eq!(NodeFlavor::from_table("staff"), Some(NodeFlavor::Staff));
        assert_eq!(NodeFlavor::from_table("incidents"), None);
    }
}
