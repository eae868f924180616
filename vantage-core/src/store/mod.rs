//! Asset store interface and its backends.
//!
//! Everything above this module talks to the graph through [`AssetStore`]
//! only, so resolution and upsert logic run unchanged against the in-memory
//! graph ([`memory::MemoryStore`]) or a SQLite file ([`sqlite::SqliteStore`]).
//!
//! Identity rules every backend enforces:
//! - an asset is unique by payload kind and canonical content
//! - a relation is unique by (from, type, to)
//! - creating something that already exists returns it and refreshes its
//!   `last_seen` to the store clock's current time
//!
//! The `since` cutoff taken by every lookup keeps records whose `last_seen`
//! is at or after it.

pub mod memory;
pub mod sqlite;

use crate::error::StoreResult;
use crate::model::{Asset, AssetId, AssetPayload, Relation, RelationType};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::Arc;

pub trait AssetStore: Send + Sync {
    /// Assets whose payload equals `payload`, observed at or after `since`.
    fn find_by_content(&self, payload: &AssetPayload, since: DateTime<Utc>)
    -> StoreResult<Vec<Asset>>;

    /// The asset with identifier `id`; [`crate::StoreError::AssetNotFound`] if
    /// it does not exist or was last seen before `since`.
    fn find_by_id(&self, id: AssetId, since: DateTime<Utc>) -> StoreResult<Asset>;

    /// Outgoing relations of `asset` with one of `types`, observed at or after
    /// `since`, ordered by [`relation_order`].
    fn outgoing_relations(
        &self,
        asset: &Asset,
        since: DateTime<Utc>,
        types: &[RelationType],
    ) -> StoreResult<Vec<Relation>>;

    /// Create `payload` (or refresh the existing asset), and when `parent` is
    /// given, the typed edge from the parent to it.
    fn create(
        &self,
        parent: Option<(&Asset, RelationType)>,
        payload: AssetPayload,
    ) -> StoreResult<Asset>;
}

impl<S: AssetStore + ?Sized> AssetStore for Arc<S> {
    fn find_by_content(
        &self,
        payload: &AssetPayload,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<Asset>> {
        (**self).find_by_content(payload, since)
    }

    fn find_by_id(&self, id: AssetId, since: DateTime<Utc>) -> StoreResult<Asset> {
        (**self).find_by_id(id, since)
    }

    fn outgoing_relations(
        &self,
        asset: &Asset,
        since: DateTime<Utc>,
        types: &[RelationType],
    ) -> StoreResult<Vec<Relation>> {
        (**self).outgoing_relations(asset, since, types)
    }

    fn create(
        &self,
        parent: Option<(&Asset, RelationType)>,
        payload: AssetPayload,
    ) -> StoreResult<Asset> {
        (**self).create(parent, payload)
    }
}

/// Deterministic relation order: oldest first, then lowest target id, then
/// lowest relation id.
pub fn relation_order(a: &Relation, b: &Relation) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then(a.to.cmp(&b.to))
        .then(a.id.cmp(&b.id))
}
