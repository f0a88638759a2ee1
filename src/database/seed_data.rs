use serde_json::{json, Value};
use tracing::info;

use crate::errors::{StoreError, StoreResult};
use crate::hierarchy::{NewNode, NodeFlavor, NodeId};
use crate::store::RecordStore;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub sites: usize,
    pub staff: usize,
}

async fn insert_node(
    store: &dyn RecordStore,
    flavor: NodeFlavor,
    node: NewNode,
) -> StoreResult<NodeId> {
    let created = store.insert(flavor.table(), node.to_record(flavor)).await?;
    created
        .get("id")
        .and_then(Value::as_i64)
        .and_then(|id| NodeId::try_from(id).ok())
        .ok_or_else(|| {
            StoreError::InvalidRecord(format!("{} insert returned no id", flavor.table()))
        })
}

async fn is_populated(store: &dyn RecordStore, flavor: NodeFlavor) -> StoreResult<bool> {
    Ok(!store.fetch(flavor.table(), &[], &[]).await?.is_empty())
}

/// Insert a small client/region/site tree and a matching org chart.
///
/// Each table is only seeded while it is empty.
pub async fn seed_sample_hierarchy(store: &dyn RecordStore) -> StoreResult<SeedReport> {
    let mut report = SeedReport::default();

    let mut depot = None;
    if is_populated(store, NodeFlavor::Site).await? {
        info!("Sites already present, skipping site seed data");
    } else {
        info!("Creating example site hierarchy");
        let site = NodeFlavor::Site;
        let client = insert_node(
            store,
            site,
            NewNode::new("Harbourside Holdings", "client", None).with_attribute("compliance", 92.5),
        )
        .await?;
        let north = insert_node(store, site, NewNode::new("North Region", "region", Some(client)))
            .await?;
        let south = insert_node(store, site, NewNode::new("South Region", "region", Some(client)))
            .await?;
        let harbour = insert_node(
            store,
            site,
            NewNode::new("Harbour Depot", "site", Some(north))
                .with_attribute("client_id", client)
                .with_attribute("compliance", 88.0)
                .with_attribute("gps_coordinates", "(51.5072,-0.1276)")
                .with_attribute(
                    "address",
                    json!({"street": "1 Quay Road", "city": "London", "postcode": "E14 1AA"}),
                ),
        )
        .await?;
        insert_node(
            store,
            site,
            NewNode::new("Gatehouse", "building", Some(harbour)).with_attribute("client_id", client),
        )
        .await?;
        insert_node(
            store,
            site,
            NewNode::new("Retail Park", "site", Some(south))
                .with_attribute("client_id", client)
                .with_attribute("compliance", 74.0)
                .with_attribute("gps_coordinates", "(50.9097,-1.4044)"),
        )
        .await?;
        report.sites = 6;
        depot = Some(harbour);
    }

    if is_populated(store, NodeFlavor::Staff).await? {
        info!("Staff already present, skipping staff seed data");
    } else {
        info!("Creating example org chart");
        let staff = NodeFlavor::Staff;
        let director = insert_node(
            store,
            staff,
            NewNode::new("Alex Morgan", "director", None)
                .with_attribute("email", "alex.morgan@secureops.example"),
        )
        .await?;
        let manager = insert_node(
            store,
            staff,
            NewNode::new("Sam Patel", "operations_manager", Some(director))
                .with_attribute("compliance", 97.0),
        )
        .await?;
        let supervisor = insert_node(
            store,
            staff,
            NewNode::new("Jordan Lee", "supervisor", Some(manager))
                .with_attribute("site_id", depot.map(Value::from).unwrap_or(Value::Null))
                .with_attribute("compliance", 91.0),
        )
        .await?;
        for (name, kind) in [
            ("Casey Brown", "guard"),
            ("Riley Chen", "guard"),
            ("Taylor Okafor", "subcontractor"),
        ] {
            insert_node(
                store,
                staff,
                NewNode::new(name, kind, Some(supervisor))
                    .with_attribute("site_id", depot.map(Value::from).unwrap_or(Value::Null)),
            )
            .await?;
        }
        report.staff = 6;
    }

    info!(
        "Seeded {} sites and {} staff records",
        report.sites, report.staff
    );
    Ok(report)
}
