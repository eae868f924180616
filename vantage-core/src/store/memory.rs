// In-memory asset store backed by a petgraph directed graph

use crate::clock::{Clock, SystemClock};
use crate::error::{StoreError, StoreResult};
use crate::model::{Asset, AssetId, AssetPayload, Relation, RelationId, RelationType};
use crate::store::{AssetStore, relation_order};
use chrono::{DateTime, Utc};
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Default)]
struct AssetGraph {
    graph: StableDiGraph<Asset, Relation>,
    by_content: HashMap<AssetPayload, NodeIndex>,
}

impl AssetGraph {
    fn node(&self, id: AssetId) -> Option<NodeIndex> {
        let idx = NodeIndex::new(usize::try_from(id.0).ok()?);
        self.graph.contains_node(idx).then_some(idx)
    }

    fn upsert_node(&mut self, payload: AssetPayload, now: DateTime<Utc>) -> NodeIndex {
        if let Some(&idx) = self.by_content.get(&payload) {
            self.graph[idx].last_seen = now;
            return idx;
        }

        let idx = self.graph.add_node(Asset {
            id: AssetId(0),
            payload: payload.clone(),
            created_at: now,
            last_seen: now,
        });
        self.graph[idx].id = AssetId(idx.index() as i64);
        self.by_content.insert(payload, idx);
        debug!("Created asset {} ({})", idx.index(), self.graph[idx].payload.content());
        idx
    }

    fn upsert_edge(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        relation_type: RelationType,
        now: DateTime<Utc>,
    ) -> EdgeIndex {
        let existing = self
            .graph
            .edges_directed(from, Direction::Outgoing)
            .find(|e| e.target() == to && e.weight().relation_type == relation_type)
            .map(|e| e.id());

        if let Some(edge) = existing {
            self.graph[edge].last_seen = now;
            return edge;
        }

        let edge = self.graph.add_edge(
            from,
            to,
            Relation {
                id: RelationId(0),
                relation_type,
                from: self.graph[from].id,
                to: self.graph[to].id,
                created_at: now,
                last_seen: now,
            },
        );
        self.graph[edge].id = RelationId(edge.index() as i64);
        edge
    }
}

/// Graph held in process memory. Cheap to build, gone when dropped.
pub struct MemoryStore {
    inner: RwLock<AssetGraph>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(AssetGraph::default()),
            clock,
        }
    }

    pub fn asset_count(&self) -> StoreResult<usize> {
        let g = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(g.graph.node_count())
    }

    pub fn relation_count(&self) -> StoreResult<usize> {
        let g = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(g.graph.edge_count())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetStore for MemoryStore {
    fn find_by_content(
        &self,
        payload: &AssetPayload,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<Asset>> {
        let g = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(g.by_content
            .get(payload)
            .map(|&idx| &g.graph[idx])
            .filter(|asset| asset.last_seen >= since)
            .cloned()
            .into_iter()
            .collect())
    }

    fn find_by_id(&self, id: AssetId, since: DateTime<Utc>) -> StoreResult<Asset> {
        let g = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        g.node(id)
            .map(|idx| &g.graph[idx])
            .filter(|asset| asset.last_seen >= since)
            .cloned()
            .ok_or(StoreError::AssetNotFound(id))
    }

    fn outgoing_relations(
        &self,
        asset: &Asset,
        since: DateTime<Utc>,
        types: &[RelationType],
    ) -> StoreResult<Vec<Relation>> {
        let g = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        let idx = g.node(asset.id).ok_or(StoreError::AssetNotFound(asset.id))?;

        let mut rels: Vec<Relation> = g
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.weight())
            .filter(|rel| rel.last_seen >= since && types.contains(&rel.relation_type))
            .cloned()
            .collect();
        rels.sort_by(relation_order);
        Ok(rels)
    }

    fn create(
        &self,
        parent: Option<(&Asset, RelationType)>,
        payload: AssetPayload,
    ) -> StoreResult<Asset> {
        let now = self.clock.now();
        let mut g = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;

        // Resolve the parent before touching anything so a bad parent creates nothing
        let parent = match parent {
            Some((asset, relation_type)) => Some((
                g.node(asset.id).ok_or(StoreError::AssetNotFound(asset.id))?,
                relation_type,
            )),
            None => None,
        };

        let idx = g.upsert_node(payload, now);
        if let Some((from, relation_type)) = parent {
            g.upsert_edge(from, idx, relation_type, now);
        }

        Ok(g.graph[idx].clone())
    }
}
