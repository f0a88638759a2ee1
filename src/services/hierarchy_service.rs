use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{HierarchyError, HierarchyResult};
use crate::hierarchy::{HierarchyGraph, HierarchyNode, NewNode, NodeId, TreeNode, DEFAULT_MAX_DEPTH};
use crate::store::{Filter, Record, RecordStore};

/// Loads one node flavor from a record store and guards writes against it.
///
/// Reads always take a fresh snapshot; nothing is cached between calls.
pub struct HierarchyService<N> {
    store: Arc<dyn RecordStore>,
    max_depth: usize,
    _flavor: PhantomData<fn() -> N>,
}

impl<N> Clone for HierarchyService<N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            max_depth: self.max_depth,
            _flavor: PhantomData,
        }
    }
}

fn parse_parent(field: &str, value: &Value) -> HierarchyResult<Option<NodeId>> {
    match value {
        Value::Null => Ok(None),
        _ => value
            .as_i64()
            .and_then(|id| NodeId::try_from(id).ok())
            .map(Some)
            .ok_or_else(|| {
                HierarchyError::Validation(format!("{} must be an integer id, got {}", field, value))
            }),
    }
}

impl<N: HierarchyNode> HierarchyService<N> {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            max_depth: DEFAULT_MAX_DEPTH,
            _flavor: PhantomData,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn table(&self) -> &'static str {
        N::FLAVOR.table()
    }

    /// One batch fetch of the whole flavor
    pub async fn load(&self) -> HierarchyResult<HierarchyGraph<N>> {
        self.load_filtered(&[]).await
    }

    pub async fn load_filtered(&self, filters: &[Filter]) -> HierarchyResult<HierarchyGraph<N>> {
        let records = self.store.fetch(self.table(), filters, &[]).await?;
        let nodes = records
            .into_iter()
            .map(N::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Loaded {} {} nodes", nodes.len(), N::FLAVOR);
        Ok(HierarchyGraph::with_max_depth(nodes, self.max_depth))
    }

    async fn fetch_one(&self, id: NodeId) -> HierarchyResult<Option<N>> {
        let mut records = self
            .store
            .fetch(self.table(), &[Filter::eq("id", id)], &[])
            .await?;
        match records.pop() {
            Some(record) => Ok(Some(N::from_record(record)?)),
            None => Ok(None),
        }
    }

    /// Create a node under an existing parent, or as a root
    pub async fn create(&self, new: NewNode) -> HierarchyResult<N> {
        if new.name.trim().is_empty() {
            return Err(HierarchyError::Validation("Node name cannot be empty".to_string()));
        }
        if let Some(parent_id) = new.parent_id {
            if self.fetch_one(parent_id).await?.is_none() {
                warn!("Rejected new {} under missing parent {}", N::FLAVOR, parent_id);
                return Err(HierarchyError::NodeNotFound(parent_id));
            }
        }

        let created = self
            .store
            .insert(self.table(), new.to_record(N::FLAVOR))
            .await?;
        let node = N::from_record(created)?;
        info!("Created {} {} '{}'", N::FLAVOR, node.id(), node.label());
        Ok(node)
    }

    /// Apply a partial record. A changed back-reference is checked for cycles
    /// against a fresh snapshot first.
    ///
    /// The check and the write are separate store calls, not one transaction.
    /// Two concurrent reparents can each pass against the old snapshot and
    /// together close a cycle; reads still terminate on such data with
    /// `CycleDetected`, and `verify_integrity` reports it.
    pub async fn update(&self, id: NodeId, patch: Record) -> HierarchyResult<N> {
        let parent_field = N::FLAVOR.parent_field();
        if let Some(value) = patch.get(parent_field) {
            let new_parent = parse_parent(parent_field, value)?;
            let graph = self.load().await?;
            let current = graph
                .get_node_by_id(id)
                .ok_or(HierarchyError::NodeNotFound(id))?;
            if current.parent_id() != new_parent {
                if let Err(e) = graph.check_reparent(id, new_parent) {
                    warn!("Rejected reparent of {} {}: {}", N::FLAVOR, id, e);
                    return Err(e);
                }
            }
        }

        let updated = self
            .store
            .update(self.table(), id, patch)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    HierarchyError::NodeNotFound(id)
                } else {
                    e.into()
                }
            })?;
        let node = N::from_record(updated)?;
        debug!("Updated {} {}", N::FLAVOR, id);
        Ok(node)
    }

    /// Move `id` under `new_parent`, or make it a root for `None`.
    ///
    /// Same guarantees as [`Self::update`]: the cycle guard is not atomic with
    /// the write, so callers moving nodes concurrently must serialise moves.
    pub async fn reparent(&self, id: NodeId, new_parent: Option<NodeId>) -> HierarchyResult<N> {
        let mut patch = Record::new();
        patch.insert(
            N::FLAVOR.parent_field().to_string(),
            new_parent.map(Value::from).unwrap_or(Value::Null),
        );
        let node = self.update(id, patch).await?;
        info!(
            "Moved {} {} under {}",
            N::FLAVOR,
            id,
            new_parent.map_or_else(|| "root".to_string(), |p| p.to_string())
        );
        Ok(node)
    }

    /// Delete a leaf node. Nodes that still have children are refused.
    pub async fn delete(&self, id: NodeId) -> HierarchyResult<()> {
        if self.fetch_one(id).await?.is_none() {
            return Err(HierarchyError::NodeNotFound(id));
        }
        let children = self
            .store
            .fetch(
                self.table(),
                &[Filter::eq(N::FLAVOR.parent_field(), id)],
                &[],
            )
            .await?;
        if !children.is_empty() {
            warn!(
                "Refused to delete {} {} with {} children",
                N::FLAVOR,
                id,
                children.len()
            );
            return Err(HierarchyError::Validation(format!(
                "{} {} still has {} children; reassign them first",
                N::FLAVOR,
                id,
                children.len()
            )));
        }

        self.store.delete(self.table(), id).await?;
        info!("Deleted {} {}", N::FLAVOR, id);
        Ok(())
    }

    pub async fn org_chart(&self, root: Option<NodeId>) -> HierarchyResult<Vec<TreeNode<N>>> {
        self.load().await?.subtree(root)
    }

    pub async fn ancestor_chain(&self, id: NodeId) -> HierarchyResult<Vec<N>> {
        let graph = self.load().await?;
        Ok(graph.ancestor_chain(id)?.into_iter().cloned().collect())
    }

    pub async fn children_of(&self, id: Option<NodeId>) -> HierarchyResult<Vec<N>> {
        let graph = self.load().await?;
        Ok(graph.children_of(id).into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{Site, Staff};
    use crate::store::MemoryRecordStore;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    async fn site_service() -> (Arc<MemoryRecordStore>, HierarchyService<Site>) {
        let store = Arc::new(MemoryRecordStore::new());
        let service = HierarchyService::<Site>::new(store.clone());
        let global = service
            .create(NewNode::new("Global", "global", None))
            .await
            .unwrap();
        let na = service
            .create(NewNode::new("NA", "national", Some(global.id)))
            .await
            .unwrap();
        service
            .create(NewNode::new("Northeast", "region", Some(na.id)))
            .await
            .unwrap();
        (store, service)
    }

    #[tokio::test]
    async fn test_create_and_query() {
        let (_, service) = site_service().await;
        let chain = service.ancestor_chain(3).await.unwrap();
        assert_eq!(chain.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2, 1]);

        let children = service.children_of(Some(1)).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "NA");

        let chart = service.org_chart(None).await.unwrap();
        assert_eq!(chart.len(), 1);
        assert_eq!(chart[0].children[0].children[0].node.name, "Northeast");
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let (_, service) = site_service().await;
        let blank = service.create(NewNode::new("  ", "site", None)).await;
        assert!(matches!(blank, Err(HierarchyError::Validation(_))));

        let orphan = service.create(NewNode::new("Depot", "site", Some(99))).await;
        assert!(matches!(orphan, Err(HierarchyError::NodeNotFound(99))));
    }

    #[tokio::test]
    async fn test_any_type_can_parent_any_type() {
        let (_, service) = site_service().await;
        let site = service
            .create(NewNode::new("Depot", "site", Some(3)))
            .await
            .unwrap();
        let global = service
            .create(NewNode::new("Overseas", "global", Some(site.id)))
            .await
            .unwrap();
        assert_eq!(global.parent_id, Some(site.id));
    }

    #[tokio::test]
    async fn test_reparent_onto_descendant_is_rejected() {
        let (store, service) = site_service().await;
        let err = service.reparent(1, Some(3)).await.unwrap_err();
        assert!(matches!(err, HierarchyError::CycleDetected(_)));
        assert_eq!(err.error_code(), "CYCLE_DETECTED");

        let self_parent = service.reparent(2, Some(2)).await.unwrap_err();
        assert!(matches!(self_parent, HierarchyError::CycleDetected(_)));

        let unchanged = store.fetch("sites", &[Filter::eq("id", 1)], &[]).await.unwrap();
        assert_eq!(unchanged[0]["parent_id"], Value::Null);
    }

    #[tokio::test]
    async fn test_reparent_and_promote() {
        let (_, service) = site_service().await;
        let moved = service.reparent(3, Some(1)).await.unwrap();
        assert_eq!(moved.parent_id, Some(1));

        let promoted = service.reparent(2, None).await.unwrap();
        assert_eq!(promoted.parent_id, None);
        assert_eq!(service.load().await.unwrap().roots().len(), 2);
    }

    #[tokio::test]
    async fn test_cycle_written_outside_guard_fails_on_read() {
        let (store, service) = site_service().await;
        // a second writer that checked against an older snapshot
        store
            .update("sites", 1, record(json!({"parent_id": 3})))
            .await
            .unwrap();

        let err = service.ancestor_chain(3).await.unwrap_err();
        assert!(matches!(err, HierarchyError::CycleDetected(_)));
        assert!(matches!(
            service.org_chart(Some(1)).await,
            Err(HierarchyError::CycleDetected(_))
        ));
        assert!(service.load().await.unwrap().verify_integrity().is_err());
    }

    #[tokio::test]
    async fn test_update_without_parent_change_skips_check() {
        let (_, service) = site_service().await;
        let updated = service
            .update(3, record(json!({"status": "Inactive", "parent_id": 2})))
            .await
            .unwrap();
        assert_eq!(updated.status.as_deref(), Some("Inactive"));

        let missing = service.update(42, record(json!({"status": "Inactive"}))).await;
        assert!(matches!(missing, Err(HierarchyError::NodeNotFound(42))));
    }

    #[tokio::test]
    async fn test_delete_refuses_nodes_with_children() {
        let (_, service) = site_service().await;
        let err = service.delete(2).await.unwrap_err();
        assert!(matches!(err, HierarchyError::Validation(_)));

        service.delete(3).await.unwrap();
        service.delete(2).await.unwrap();
        assert!(matches!(
            service.delete(2).await,
            Err(HierarchyError::NodeNotFound(2))
        ));
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_records() {
        let store = Arc::new(MemoryRecordStore::new());
        store
            .seed("staff", vec![record(json!({"id": 1, "name": "Guard", "compliance": 140}))])
            .await
            .unwrap();
        let service = HierarchyService::<Staff>::new(store);
        let err = service.load().await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn test_cyclic_data_surfaces_cycle() {
        let store = Arc::new(MemoryRecordStore::new());
        store
            .seed(
                "staff",
                vec![
                    record(json!({"id": 1, "name": "A", "supervisor_id": 3})),
                    record(json!({"id": 2, "name": "B", "supervisor_id": 1})),
                    record(json!({"id": 3, "name": "C", "supervisor_id": 2})),
                ],
            )
            .await
            .unwrap();
        let service = HierarchyService::<Staff>::new(store);
        assert!(matches!(
            service.ancestor_chain(1).await,
            Err(HierarchyError::CycleDetected(_))
        ));
        assert!(service.load().await.unwrap().verify_integrity().is_err());
    }

    #[tokio::test]
    async fn test_load_filtered() {
        let (_, service) = site_service().await;
        service
            .create(NewNode::new("Depot", "site", Some(3)).with_attribute("client_id", 7))
            .await
            .unwrap();
        let graph = service
            .load_filtered(&[Filter::eq("client_id", 7)])
            .await
            .unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.verify_integrity().is_err());
    }
}
