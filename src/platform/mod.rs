//! Hosting platform abstraction.
//!
//! The orchestrator drives a third-party control plane through the
//! [`Platform`] trait: create an app, set its configuration, start a build,
//! list apps and delete them. [`HerokuPlatform`] talks to the Heroku
//! Platform API over REST; tests use the scripted double in
//! [`crate::test_support`].

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod error;
mod heroku;
mod types;

pub use error::PlatformError;
pub use heroku::{HerokuPlatform, HerokuSettings};
pub use types::AppName;

/// Future returned by platform operations.
pub type PlatformFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PlatformError>> + Send + 'a>>;

/// Parameters for creating a new app.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AppRequest {
    /// Globally unique app name.
    pub name: AppName,
    /// Region the app is pinned to.
    pub region: String,
}

/// App as reported by the platform.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct AppRecord {
    /// App name.
    pub name: AppName,
    /// Creation time assigned by the platform.
    pub created_at: DateTime<Utc>,
    /// Public URL when the platform reports one.
    #[serde(default)]
    pub web_url: Option<String>,
}

/// Configuration variables applied to an app.
pub type ConfigVars = BTreeMap<String, String>;

/// Source archive a build is started from.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BuildSource {
    /// URL of a tarball the platform downloads and builds.
    pub url: String,
}

/// Minimal control-plane interface used by the provisioner and the janitor.
pub trait Platform: Send + Sync {
    /// Creates an app and returns the platform's record of it.
    fn create_app<'a>(&'a self, request: &'a AppRequest) -> PlatformFuture<'a, AppRecord>;

    /// Replaces or adds configuration variables on an app.
    fn set_config<'a>(&'a self, name: &'a AppName, vars: &'a ConfigVars) -> PlatformFuture<'a, ()>;

    /// Starts a build of `source` on the app.
    fn trigger_build<'a>(
        &'a self,
        name: &'a AppName,
        source: &'a BuildSource,
    ) -> PlatformFuture<'a, ()>;

    /// Lists every app visible to the configured credential.
    fn list_apps(&self) -> PlatformFuture<'_, Vec<AppRecord>>;

    /// Deletes an app. Returns [`PlatformError::NotFound`] when it is already gone.
    fn delete_app<'a>(&'a self, name: &'a AppName) -> PlatformFuture<'a, ()>;
}
