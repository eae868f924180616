//! Bounded graph walk.
//!
//! Follows one outgoing edge per step until a node has no qualifying edges or
//! the hop budget is spent. Because the budget always ends the walk, cycles and
//! pathologically long chains are safe to traverse without a visited set.

use crate::error::StoreResult;
use crate::model::{Asset, RelationType};
use crate::store::{AssetStore, relation_order};
use chrono::{DateTime, Utc};
use tracing::debug;

pub const DEFAULT_MAX_HOPS: usize = 10;

/// Where a walk stopped
#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub terminal: Asset,
    /// Number of edges actually followed
    pub hops: usize,
    /// True when the walk ended on the hop budget rather than on a node with no way out
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct BoundedWalk {
    max_hops: usize,
}

impl BoundedWalk {
    pub fn new(max_hops: usize) -> Self {
        Self { max_hops }
    }

    /// Walk from `start`. `edge_types` is asked, for each 1-based hop number,
    /// which relation types may be followed on that hop.
    ///
    /// Among several candidate edges the walk takes the first in
    /// [`relation_order`] whose target can be loaded; edges whose target is
    /// missing or outside the `since` window are passed over. If none load,
    /// the current asset is terminal.
    pub fn walk<S, F>(
        &self,
        store: &S,
        start: Asset,
        since: DateTime<Utc>,
        edge_types: F,
    ) -> StoreResult<WalkOutcome>
    where
        S: AssetStore + ?Sized,
        F: Fn(usize) -> &'static [RelationType],
    {
        let mut current = start;

        for hop in 1..=self.max_hops {
            let mut rels = store.outgoing_relations(&current, since, edge_types(hop))?;
            rels.sort_by(relation_order);

            let next = rels.iter().find_map(|rel| match store.find_by_id(rel.to, since) {
                Ok(asset) => Some(asset),
                Err(e) => {
                    debug!("Skipping {} edge to {}: {}", rel.relation_type, rel.to, e);
                    None
                }
            });

            match next {
                Some(asset) => current = asset,
                None => {
                    return Ok(WalkOutcome {
                        terminal: current,
                        hops: hop - 1,
                        truncated: false,
                    });
                }
            }
        }

        debug!(
            "Walk stopped at asset {} after {} hops",
            current.id, self.max_hops
        );
        Ok(WalkOutcome {
            terminal: current,
            hops: self.max_hops,
            truncated: true,
        })
    }
}

impl Default for BoundedWalk {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HOPS)
    }
}
