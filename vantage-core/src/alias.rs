// Alias chain resolution (CNAME / SRV redirection)

use crate::error::StoreResult;
use crate::model::{Asset, RelationType};
use crate::store::AssetStore;
use crate::walk::{BoundedWalk, WalkOutcome};
use chrono::{DateTime, Utc};

const FIRST_HOP: &[RelationType] = &[RelationType::CnameRecord, RelationType::SrvRecord];
const LATER_HOPS: &[RelationType] = &[RelationType::CnameRecord];

/// Relation types followed on a given 1-based hop: a service name may
/// redirect once through SRV, after that only CNAMEs are chased.
pub fn alias_types_for_hop(hop: usize) -> &'static [RelationType] {
    if hop == 1 { FIRST_HOP } else { LATER_HOPS }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AliasChainResolver {
    walk: BoundedWalk,
}

impl AliasChainResolver {
    pub fn new(max_hops: usize) -> Self {
        Self {
            walk: BoundedWalk::new(max_hops),
        }
    }

    /// Follow alias edges from `start` to the asset that may carry address records.
    pub fn trace<S>(&self, store: &S, start: Asset, since: DateTime<Utc>) -> StoreResult<WalkOutcome>
    where
        S: AssetStore + ?Sized,
    {
        self.walk.walk(store, start, since, alias_types_for_hop)
    }
}
