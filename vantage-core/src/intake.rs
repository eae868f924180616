//! Intake of names reported by collectors.
//!
//! Collectors hand over raw candidate names; intake normalizes them, asks the
//! [`Scope`] whether each may be mapped, records the in-scope ones and tells
//! the [`Dispatcher`] about them so downstream handlers can pick them up.

use crate::error::DispatchError;
use crate::model::{Asset, AssetPayload, Fqdn, normalize_name};
use crate::store::AssetStore;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Decides which names the operator is allowed to map
pub trait Scope: Send + Sync {
    fn is_in_scope(&self, name: &str) -> bool;
}

/// A name recorded by intake, handed to the dispatcher
#[derive(Debug, Clone)]
pub struct Discovery {
    pub name: Fqdn,
    pub asset: Asset,
    /// Collector that reported the name
    pub source: String,
}

pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, event: Discovery) -> Result<(), DispatchError>;
}

/// Dispatcher that only logs discoveries
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

impl Dispatcher for LogDispatcher {
    fn dispatch(&self, event: Discovery) -> Result<(), DispatchError> {
        info!("[{}] discovered {}", event.source, event.name);
        Ok(())
    }
}

/// Scope made of registered apex domains. A name is in scope when it is one
/// of them or a subdomain of one.
#[derive(Debug, Clone, Default)]
pub struct DomainScope {
    domains: BTreeSet<String>,
}

impl DomainScope {
    pub fn new<I, T>(domains: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut scope = Self::default();
        for domain in domains {
            scope.add_domain(domain.as_ref());
        }
        scope
    }

    pub fn add_domain(&mut self, domain: &str) {
        if let Ok(fqdn) = Fqdn::new(domain) {
            self.domains.insert(fqdn.as_str().to_string());
        }
    }

    /// The most specific registered domain `name` falls under.
    pub fn which_domain(&self, name: &str) -> Option<&str> {
        let name = normalize_name(name);
        self.domains
            .iter()
            .filter(|domain| {
                name == **domain
                    || name
                        .strip_suffix(domain.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            })
            .max_by_key(|domain| domain.len())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl Scope for DomainScope {
    fn is_in_scope(&self, name: &str) -> bool {
        self.which_domain(name).is_some()
    }
}

pub struct Intake<'a, S: AssetStore + ?Sized> {
    store: &'a S,
    scope: &'a dyn Scope,
    dispatcher: &'a dyn Dispatcher,
    source: String,
}

impl<'a, S: AssetStore + ?Sized> Intake<'a, S> {
    pub fn new(
        store: &'a S,
        scope: &'a dyn Scope,
        dispatcher: &'a dyn Dispatcher,
        source: impl Into<String>,
    ) -> Self {
        Self {
            store,
            scope,
            dispatcher,
            source: source.into(),
        }
    }

    /// Record every distinct in-scope name among `candidates` and dispatch it.
    ///
    /// Per-name store or dispatch failures are logged and do not stop the
    /// rest of the batch. Returns the assets that were recorded.
    pub fn submit_names<I, T>(&self, candidates: I) -> Vec<Asset>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut recorded = Vec::new();

        for candidate in candidates {
            let Ok(name) = Fqdn::new(candidate.as_ref()) else {
                continue;
            };
            if !seen.insert(name.clone()) {
                continue;
            }
            if !self.scope.is_in_scope(name.as_str()) {
                debug!("[{}] {} is out of scope", self.source, name);
                continue;
            }

            let asset = match self.store.create(None, AssetPayload::Fqdn(name.clone())) {
                Ok(asset) => asset,
                Err(e) => {
                    warn!("[{}] failed to record {}: {}", self.source, name, e);
                    continue;
                }
            };

            if let Err(e) = self.dispatcher.dispatch(Discovery {
                name: name.clone(),
                asset: asset.clone(),
                source: self.source.clone(),
            }) {
                warn!("[{}] failed to dispatch {}: {}", self.source, name, e);
            }
            recorded.push(asset);
        }

        recorded
    }
}
