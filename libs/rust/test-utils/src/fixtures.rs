//! Test fixtures with sample data.

/// HS512 signing secret used by tests; never valid outside test builds.
pub const TEST_SIGNING_SECRET: &[u8] =
    b"test-signing-secret-for-token-rotation-tests-only-0123456789abcdef";

/// A second secret, for forging tokens the service must reject.
pub const FOREIGN_SIGNING_SECRET: &[u8] =
    b"foreign-secret-that-the-service-does-not-know-about-0123456789";

/// Sample user identifier.
pub const SAMPLE_USER_ID: &str = "5f0c4a9e-2b1d-4c3e-9a8f-7d6e5c4b3a21";

/// Another sample user identifier.
pub const OTHER_USER_ID: &str = "a1b2c3d4-e5f6-4a7b-8c9d-0e1f2a3b4c5d";

/// Address a session is usually created from.
pub const HOME_ADDRESS: &str = "203.0.113.10";

/// Address used to simulate a session moving to another network.
pub const ROAMING_ADDRESS: &str = "198.51.100.77";

/// IPv6 sample address.
pub const IPV6_ADDRESS: &str = "2001:db8::42";
