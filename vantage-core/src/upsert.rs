// Write path: idempotent creation of names, addresses and DNS record edges

use crate::addr::parse_address;
use crate::error::{GraphError, Result};
use crate::model::{AddressFamily, Asset, AssetPayload, Fqdn, RelationType};
use crate::store::AssetStore;
use tracing::debug;

/// Records freshly discovered DNS facts into a store.
///
/// All inputs are normalized and validated before they reach the store, so
/// the store's identity rules make every operation idempotent: repeating a
/// call returns the same assets and leaves exactly one edge.
pub struct RecordWriter<'a, S: AssetStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: AssetStore + ?Sized> RecordWriter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn upsert_fqdn(&self, name: &str) -> Result<Asset> {
        let fqdn = Fqdn::new(name)?;
        Ok(self.store.create(None, AssetPayload::Fqdn(fqdn))?)
    }

    /// Create a standalone IP address asset.
    pub fn upsert_address(&self, addr: &str) -> Result<Asset> {
        let ip = parse_address(addr)?;
        Ok(self.store.create(None, AssetPayload::IpAddress(ip))?)
    }

    /// Create `name`, the IPv4 `addr`, and the `a_record` edge between them.
    /// Returns the address asset.
    pub fn upsert_a(&self, name: &str, addr: &str) -> Result<Asset> {
        self.address_record(name, addr, RelationType::ARecord, AddressFamily::IPv4)
    }

    /// Create `name`, the IPv6 `addr`, and the `aaaa_record` edge between them.
    /// Returns the address asset.
    pub fn upsert_aaaa(&self, name: &str, addr: &str) -> Result<Asset> {
        self.address_record(name, addr, RelationType::AaaaRecord, AddressFamily::IPv6)
    }

    /// Record that `name` is a CNAME for `target`. Returns the target asset.
    pub fn upsert_cname(&self, name: &str, target: &str) -> Result<Asset> {
        self.alias_record(name, target, RelationType::CnameRecord)
    }

    /// Record that service name `name` points at `target`. Returns the target asset.
    pub fn upsert_srv(&self, name: &str, target: &str) -> Result<Asset> {
        self.alias_record(name, target, RelationType::SrvRecord)
    }

    fn address_record(
        &self,
        name: &str,
        addr: &str,
        relation: RelationType,
        expected: AddressFamily,
    ) -> Result<Asset> {
        // Validate both halves first so bad input leaves the graph untouched
        let fqdn = Fqdn::new(name)?;
        let ip = parse_address(addr)?;
        if ip.family != expected {
            return Err(GraphError::FamilyMismatch {
                relation,
                expected,
                address: addr.to_string(),
            });
        }

        let name_asset = self.store.create(None, AssetPayload::Fqdn(fqdn))?;
        let addr_asset = self
            .store
            .create(Some((&name_asset, relation)), AssetPayload::IpAddress(ip))?;

        debug!("{} {} -> {}", relation, name_asset.payload.content(), ip);
        Ok(addr_asset)
    }

    fn alias_record(&self, name: &str, target: &str, relation: RelationType) -> Result<Asset> {
        let fqdn = Fqdn::new(name)?;
        let target = Fqdn::new(target)?;

        let name_asset = self.store.create(None, AssetPayload::Fqdn(fqdn))?;
        let target_asset = self
            .store
            .create(Some((&name_asset, relation)), AssetPayload::Fqdn(target))?;

        debug!(
            "{} {} -> {}",
            relation,
            name_asset.payload.content(),
            target_asset.payload.content()
        );
        Ok(target_asset)
    }
}
