// Address normalization: textual IP literal -> family-tagged address

use crate::error::{GraphError, Result};
use crate::model::IpAddress;
use std::net::IpAddr;

/// Parse a textual IP address and tag it with its family.
///
/// IPv4-mapped IPv6 literals such as `::ffff:192.0.2.1` stay IPv6, since the
/// family is taken from the parsed value itself.
pub fn parse_address(raw: &str) -> Result<IpAddress> {
    raw.trim()
        .parse::<IpAddr>()
        .map(IpAddress::from)
        .map_err(|_| GraphError::InvalidAddress(raw.to_string()))
}

/// Like [`parse_address`] but for callers that drop bad input instead of failing.
pub fn try_parse_address(raw: &str) -> Option<IpAddress> {
    parse_address(raw).ok()
}
