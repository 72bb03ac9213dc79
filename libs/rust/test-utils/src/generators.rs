//! Shared proptest generators.
//!
//! Values are shaped the way they arrive at the token service: user
//! identifiers as hyphenated UUID strings, client addresses as textual
//! IPv4/IPv6 addresses, bearer secrets as compact-JWT-looking strings.

use proptest::prelude::*;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Generate lowercase hyphenated UUID-shaped user identifiers.
pub fn user_id_strategy() -> impl Strategy<Value = String> {
    "[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}"
}

/// Generate textual IPv4 addresses.
pub fn ipv4_address_strategy() -> impl Strategy<Value = String> {
    any::<[u8; 4]>().prop_map(|octets| Ipv4Addr::from(octets).to_string())
}

/// Generate textual IPv6 addresses.
pub fn ipv6_address_strategy() -> impl Strategy<Value = String> {
    any::<[u16; 8]>().prop_map(|segments| Ipv6Addr::from(segments).to_string())
}

/// Generate client addresses of either family.
pub fn source_address_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => ipv4_address_strategy(),
        1 => ipv6_address_strategy(),
    ]
}

/// Generate two client addresses that are guaranteed to differ.
pub fn distinct_address_pair_strategy() -> impl Strategy<Value = (String, String)> {
    (source_address_strategy(), source_address_strategy())
        .prop_filter("addresses must differ", |(a, b)| a != b)
}

/// Generate bearer secrets: three base64url segments joined by dots.
pub fn bearer_secret_strategy() -> impl Strategy<Value = String> {
    (
        "[A-Za-z0-9_-]{16,40}",
        "[A-Za-z0-9_-]{32,200}",
        "[A-Za-z0-9_-]{43,86}",
    )
        .prop_map(|(header, payload, signature)| format!("{header}.{payload}.{signature}"))
}

/// Generate two bearer secrets that are guaranteed to differ.
pub fn distinct_secret_pair_strategy() -> impl Strategy<Value = (String, String)> {
    (bearer_secret_strategy(), bearer_secret_strategy())
        .prop_filter("secrets must differ", |(a, b)| a != b)
}

/// Generate token lifetimes in whole seconds (one second to thirty days).
pub fn ttl_seconds_strategy() -> impl Strategy<Value = u64> {
    1u64..=2_592_000
}
