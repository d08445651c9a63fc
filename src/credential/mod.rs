//! Session credential validation.
//!
//! A session credential is an opaque string made of a literal prefix marker
//! followed by a base64 payload. The payload is never interpreted here; it is
//! handed verbatim to the provisioned instance. Validation only checks the
//! marker, that the remainder decodes, and that the decoded payload is longer
//! than [`MIN_PAYLOAD_EXCLUSIVE`] bytes.

use std::fmt;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Historical prefix marker, wrapped in parentheses.
pub const LEGACY_PREFIX: &str = "(ARSLAN-MD~)";

/// Current prefix marker.
pub const CURRENT_PREFIX: &str = "ARSLAN-MD~";

/// Decoded payloads must be strictly longer than this many bytes.
pub const MIN_PAYLOAD_EXCLUSIVE: usize = 10;

/// Standard alphabet; padding may be present or omitted.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Checks session credentials against a set of accepted prefix markers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CredentialValidator {
    prefixes: Vec<String>,
}

impl Default for CredentialValidator {
    fn default() -> Self {
        Self::new([LEGACY_PREFIX, CURRENT_PREFIX])
    }
}

impl CredentialValidator {
    /// Creates a validator accepting the given prefix markers.
    ///
    /// Blank markers are discarded because an empty prefix would accept any
    /// base64 string.
    #[must_use]
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accepted = prefixes
            .into_iter()
            .map(Into::into)
            .filter(|prefix: &String| !prefix.trim().is_empty())
            .collect();
        Self { prefixes: accepted }
    }

    /// Returns the accepted prefix markers in declaration order.
    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Returns `true` when `credential` carries an accepted marker and a
    /// base64 payload longer than [`MIN_PAYLOAD_EXCLUSIVE`] bytes.
    ///
    /// Total over all inputs: malformed values yield `false`.
    #[must_use]
    pub fn validate(&self, credential: &str) -> bool {
        self.parse(credential).is_some()
    }

    /// Parses `credential` into a [`SessionCredential`] when it is valid.
    #[must_use]
    pub fn parse(&self, credential: &str) -> Option<SessionCredential> {
        let payload = self
            .prefixes
            .iter()
            .find_map(|prefix| credential.strip_prefix(prefix.as_str()))?;
        let decoded = PAYLOAD_ENGINE.decode(payload).ok()?;
        (decoded.len() > MIN_PAYLOAD_EXCLUSIVE).then(|| SessionCredential(credential.to_owned()))
    }

    /// Human-readable format hint used in client-facing rejections.
    #[must_use]
    pub fn format_hint(&self) -> String {
        let prefix = self.prefixes.first().map_or(CURRENT_PREFIX, String::as_str);
        format!("{prefix}base64")
    }
}

/// A credential that passed validation. Holds the original string verbatim.
#[derive(Clone, Eq, PartialEq)]
pub struct SessionCredential(String);

impl SessionCredential {
    /// Returns the credential exactly as submitted.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCredential(<redacted>)")
    }
}
