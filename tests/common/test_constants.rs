//! Shared literals for integration tests.

/// Well-formed credential: current prefix plus base64 of a 12-byte payload.
pub const VALID_CREDENTIAL: &str = "ARSLAN-MD~MDEyMzQ1Njc4OUFC";

/// Same payload under the legacy parenthesised prefix.
pub const LEGACY_CREDENTIAL: &str = "(ARSLAN-MD~)MDEyMzQ1Njc4OUFC";

/// Reference repository every fork is checked against.
pub const REFERENCE: &str = "Arslan-MD/Arslan-Botz";

/// Ownership prefix of provisioned apps.
pub const APP_PREFIX: &str = "arslan-botz-";
