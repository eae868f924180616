//! Name-to-address resolution over the asset graph.
//!
//! `resolve_addresses` runs three stages:
//! 1. look up each requested name and chase its alias chain to a terminal asset
//! 2. collect the `a_record` / `aaaa_record` targets of every terminal asset,
//!    deduplicated per *originating* name
//! 3. flatten the result into [`NameAddrPair`]s
//!
//! Every lookup honors the `since` cutoff, so re-running with an advancing
//! cutoff only reports relations observed after it.

use crate::addr::try_parse_address;
use crate::alias::AliasChainResolver;
use crate::error::{GraphError, Result};
use crate::model::{Asset, AssetPayload, Fqdn, NameAddrPair, RelationType};
use crate::store::AssetStore;
use crate::walk::DEFAULT_MAX_HOPS;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

const ADDRESS_TYPES: &[RelationType] = &[RelationType::ARecord, RelationType::AaaaRecord];

/// Originating name -> address strings reached from it
pub type AddressMap = BTreeMap<Fqdn, BTreeSet<String>>;

#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    /// Upper bound on alias edges followed per name
    pub max_alias_hops: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_alias_hops: DEFAULT_MAX_HOPS,
        }
    }
}

/// A requested name paired with the asset its alias chain ends on
#[derive(Debug, Clone)]
pub struct Target {
    pub fqdn: Fqdn,
    pub asset: Asset,
}

pub struct Resolver<'a, S: AssetStore + ?Sized> {
    store: &'a S,
    aliases: AliasChainResolver,
}

impl<'a, S: AssetStore + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_options(store, ResolverOptions::default())
    }

    pub fn with_options(store: &'a S, options: ResolverOptions) -> Self {
        Self {
            store,
            aliases: AliasChainResolver::new(options.max_alias_hops),
        }
    }

    /// Every name/address combination reachable from `names`.
    pub fn resolve_addresses<I, T>(&self, names: I, since: DateTime<Utc>) -> Result<Vec<NameAddrPair>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let found = self.find_names(names, since)?;
        let targets = self.targets(found, since)?;
        let addr_map = aggregate_addresses(self.store, &targets, since)?;

        let pairs = generate_pairs(&addr_map);
        if pairs.is_empty() {
            return Err(GraphError::NoAddresses);
        }

        info!(
            "Resolved {} name/address pairs from {} names",
            pairs.len(),
            addr_map.len()
        );
        Ok(pairs)
    }

    /// Look up the FQDN asset of each distinct, well-formed name. Names not
    /// present in the store are left out.
    pub fn find_names<I, T>(&self, names: I, since: DateTime<Utc>) -> Result<Vec<Asset>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for name in names {
            let Ok(fqdn) = Fqdn::new(name.as_ref()) else {
                debug!("Ignoring malformed name {:?}", name.as_ref());
                continue;
            };
            if !seen.insert(fqdn.clone()) {
                continue;
            }

            match self
                .store
                .find_by_content(&AssetPayload::Fqdn(fqdn.clone()), since)?
                .into_iter()
                .next()
            {
                Some(asset) => found.push(asset),
                None => debug!("Name {} not found in the graph", fqdn),
            }
        }

        if found.is_empty() {
            return Err(GraphError::NoNames);
        }
        Ok(found)
    }

    /// Chase each name asset's alias chain to the asset that may carry address records.
    pub fn targets(&self, assets: Vec<Asset>, since: DateTime<Utc>) -> Result<Vec<Target>> {
        let mut targets = Vec::with_capacity(assets.len());

        for asset in assets {
            let Some(fqdn) = asset.payload.as_fqdn().cloned() else {
                continue;
            };

            let outcome = self.aliases.trace(self.store, asset, since)?;
            if outcome.hops > 0 {
                debug!(
                    "{} aliases to {} after {} hops{}",
                    fqdn,
                    outcome.terminal.payload.content(),
                    outcome.hops,
                    if outcome.truncated { " (truncated)" } else { "" }
                );
            }

            targets.push(Target {
                fqdn,
                asset: outcome.terminal,
            });
        }

        if targets.is_empty() {
            return Err(GraphError::NoTargets);
        }
        Ok(targets)
    }
}

/// Gather the address strings behind each target's address records, keyed by
/// the target's originating name so chains that converge on the same terminal
/// asset still report separately. A target whose records all fail to load
/// still gets an (empty) entry.
pub fn aggregate_addresses<S>(store: &S, targets: &[Target], since: DateTime<Utc>) -> Result<AddressMap>
where
    S: AssetStore + ?Sized,
{
    let mut addr_map = AddressMap::new();

    for target in targets {
        let rels = store.outgoing_relations(&target.asset, since, ADDRESS_TYPES)?;
        if rels.is_empty() {
            continue;
        }

        let addrs = addr_map.entry(target.fqdn.clone()).or_default();
        for rel in rels {
            match store.find_by_id(rel.to, since) {
                Ok(found) => {
                    if let Some(ip) = found.payload.as_ip_address() {
                        addrs.insert(ip.address.to_string());
                    }
                }
                Err(e) => debug!("Skipping {} edge to {}: {}", rel.relation_type, rel.to, e),
            }
        }
    }

    if addr_map.is_empty() {
        return Err(GraphError::NoPairs);
    }
    Ok(addr_map)
}

/// Flatten an [`AddressMap`] into pairs, dropping any address that does not parse.
pub fn generate_pairs(addr_map: &AddressMap) -> Vec<NameAddrPair> {
    addr_map
        .iter()
        .flat_map(|(fqdn, addrs)| {
            addrs.iter().filter_map(move |addr| {
                try_parse_address(addr).map(|addr| NameAddrPair {
                    fqdn: fqdn.clone(),
                    addr,
                })
            })
        })
        .collect()
}
