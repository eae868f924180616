// Asset graph data model: names, addresses, assets and the relations between them

use crate::error::{GraphError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Stable identifier of an asset within a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub i64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a relation within a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationId(pub i64);

/// Lowercase, whitespace-trimmed form without the root dot, used for every
/// name comparison and lookup.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().trim_end_matches('.').to_lowercase()
}

/// A fully qualified domain name, always held in normalized form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fqdn(String);

impl Fqdn {
    pub fn new(raw: &str) -> Result<Self> {
        let name = normalize_name(raw);
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(GraphError::InvalidName(raw.to_string()));
        }
        Ok(Fqdn(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fqdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressFamily {
    #[serde(rename = "IPv4")]
    IPv4,
    #[serde(rename = "IPv6")]
    IPv6,
}

impl AddressFamily {
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::IPv4,
            IpAddr::V6(_) => AddressFamily::IPv6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressFamily::IPv4 => "IPv4",
            AddressFamily::IPv6 => "IPv6",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "IPv4" => Some(AddressFamily::IPv4),
            "IPv6" => Some(AddressFamily::IPv6),
            _ => None,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An IP address tagged with its family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IpAddress {
    pub address: IpAddr,
    #[serde(rename = "type")]
    pub family: AddressFamily,
}

impl From<IpAddr> for IpAddress {
    fn from(address: IpAddr) -> Self {
        IpAddress {
            address,
            family: AddressFamily::of(&address),
        }
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// Typed content carried by an asset. Two assets with equal payloads are the same asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetPayload {
    Fqdn(Fqdn),
    IpAddress(IpAddress),
}

impl AssetPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            AssetPayload::Fqdn(_) => "fqdn",
            AssetPayload::IpAddress(_) => "ip_address",
        }
    }

    /// Canonical string content, used as the identity key by stores.
    pub fn content(&self) -> String {
        match self {
            AssetPayload::Fqdn(fqdn) => fqdn.as_str().to_string(),
            AssetPayload::IpAddress(ip) => ip.address.to_string(),
        }
    }

    pub fn as_fqdn(&self) -> Option<&Fqdn> {
        match self {
            AssetPayload::Fqdn(fqdn) => Some(fqdn),
            _ => None,
        }
    }

    pub fn as_ip_address(&self) -> Option<&IpAddress> {
        match self {
            AssetPayload::IpAddress(ip) => Some(ip),
            _ => None,
        }
    }
}

impl From<Fqdn> for AssetPayload {
    fn from(fqdn: Fqdn) -> Self {
        AssetPayload::Fqdn(fqdn)
    }
}

impl From<IpAddress> for AssetPayload {
    fn from(ip: IpAddress) -> Self {
        AssetPayload::IpAddress(ip)
    }
}

/// A node in the asset graph
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: AssetId,
    pub payload: AssetPayload,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    CnameRecord,
    SrvRecord,
    ARecord,
    AaaaRecord,
    NsRecord,
    MxRecord,
    PtrRecord,
}

impl RelationType {
    pub const ALL: [RelationType; 7] = [
        RelationType::CnameRecord,
        RelationType::SrvRecord,
        RelationType::ARecord,
        RelationType::AaaaRecord,
        RelationType::NsRecord,
        RelationType::MxRecord,
        RelationType::PtrRecord,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::CnameRecord => "cname_record",
            RelationType::SrvRecord => "srv_record",
            RelationType::ARecord => "a_record",
            RelationType::AaaaRecord => "aaaa_record",
            RelationType::NsRecord => "ns_record",
            RelationType::MxRecord => "mx_record",
            RelationType::PtrRecord => "ptr_record",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        RelationType::ALL.into_iter().find(|rt| rt.as_str() == s)
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed edge between two assets
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub id: RelationId,
    pub relation_type: RelationType,
    pub from: AssetId,
    pub to: AssetId,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A name and an address it eventually resolves to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NameAddrPair {
    pub fqdn: Fqdn,
    pub addr: IpAddress,
}
