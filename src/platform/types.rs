//! Newtypes for platform values.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Name of a hosted app. Doubles as its public host label.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct AppName(String);

impl AppName {
    /// Wraps a name without validation; the platform is the authority.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Public HTTPS URL of the app under `domain`.
    #[must_use]
    pub fn public_url(&self, domain: &str) -> String {
        format!("https://{}.{domain}", self.0)
    }
}

impl From<String> for AppName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AppName {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl AsRef<str> for AppName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for AppName {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
