//! Provisions an app for a deploy request.
//!
//! The workflow creates an app under a fresh owned name, writes the session
//! credential (and optionally the requesting account) into its
//! configuration, and starts a build from the fixed source archive. The
//! steps run strictly in order and the first failure stops the sequence.
//! Nothing is rolled back: an app created before a later step failed stays
//! behind until the janitor reclaims it.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::credential::SessionCredential;
use crate::platform::{AppName, AppRequest, BuildSource, ConfigVars, Platform, PlatformError};

/// Configuration variable carrying the session credential.
pub const SESSION_VAR: &str = "SESSION_ID";

/// Configuration variable carrying the requesting account.
pub const ACCOUNT_VAR: &str = "GITHUB_USERNAME";

/// Step of the provisioning workflow.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProvisionStage {
    /// App creation.
    Create,
    /// Configuration update.
    Configure,
    /// Build trigger.
    Build,
}

impl fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Configure => "configure",
            Self::Build => "build",
        })
    }
}

/// Errors surfaced while provisioning. Each variant names the app and wraps
/// the platform failure of its stage.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Raised when the app cannot be created.
    #[error("failed to create app {name}: {source}")]
    Create {
        /// Name that was requested.
        name: AppName,
        /// Platform failure.
        #[source]
        source: PlatformError,
    },
    /// Raised when the configuration cannot be applied.
    #[error("failed to configure app {name}: {source}")]
    Configure {
        /// App left behind unconfigured.
        name: AppName,
        /// Platform failure.
        #[source]
        source: PlatformError,
    },
    /// Raised when the build cannot be started.
    #[error("failed to start build for app {name}: {source}")]
    Build {
        /// App left behind without a build.
        name: AppName,
        /// Platform failure.
        #[source]
        source: PlatformError,
    },
}

impl ProvisionError {
    /// Stage at which the workflow stopped.
    #[must_use]
    pub const fn stage(&self) -> ProvisionStage {
        match self {
            Self::Create { .. } => ProvisionStage::Create,
            Self::Configure { .. } => ProvisionStage::Configure,
            Self::Build { .. } => ProvisionStage::Build,
        }
    }

    /// App the failure concerns.
    #[must_use]
    pub const fn app_name(&self) -> &AppName {
        match self {
            Self::Create { name, .. } | Self::Configure { name, .. } | Self::Build { name, .. } => {
                name
            }
        }
    }

    /// Platform payload when available, otherwise the transport message.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Create { source, .. }
            | Self::Configure { source, .. }
            | Self::Build { source, .. } => source.detail(),
        }
    }
}

/// Fixed parameters of every provisioned app.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionSettings {
    /// Ownership prefix every app name starts with.
    pub name_prefix: String,
    /// Region apps are created in.
    pub region: String,
    /// Tarball every build is started from.
    pub source_archive_url: String,
    /// Domain public URLs are formed under.
    pub platform_domain: String,
    /// Whether the requesting account is written into the configuration.
    pub include_account: bool,
}

/// Result of a successful provisioning run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Deployment {
    /// Name of the new app.
    pub name: AppName,
    /// Public URL of the new app.
    pub url: String,
}

/// Runs the create, configure, build sequence against a platform.
#[derive(Clone)]
pub struct Provisioner {
    platform: Arc<dyn Platform>,
    settings: ProvisionSettings,
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    /// Creates a provisioner.
    #[must_use]
    pub fn new(platform: Arc<dyn Platform>, settings: ProvisionSettings) -> Self {
        Self { platform, settings }
    }

    /// Provisions a new app for `credential`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] naming the failed stage. Later stages are
    /// not attempted once one fails.
    pub async fn provision(
        &self,
        credential: &SessionCredential,
        account: Option<&str>,
    ) -> Result<Deployment, ProvisionError> {
        let name = app_name_at(&self.settings.name_prefix, Utc::now());

        let request = AppRequest {
            name: name.clone(),
            region: self.settings.region.clone(),
        };
        tracing::debug!(app = %name, region = %request.region, "creating app");
        self.platform
            .create_app(&request)
            .await
            .map_err(|source| ProvisionError::Create {
                name: name.clone(),
                source,
            })?;

        let vars = self.config_vars(credential, account);
        tracing::debug!(app = %name, keys = ?vars.keys().collect::<Vec<_>>(), "setting config vars");
        self.platform
            .set_config(&name, &vars)
            .await
            .map_err(|source| ProvisionError::Configure {
                name: name.clone(),
                source,
            })?;

        let source_blob = BuildSource {
            url: self.settings.source_archive_url.clone(),
        };
        tracing::debug!(app = %name, source = %source_blob.url, "triggering build");
        self.platform
            .trigger_build(&name, &source_blob)
            .await
            .map_err(|source| ProvisionError::Build {
                name: name.clone(),
                source,
            })?;

        let url = name.public_url(&self.settings.platform_domain);
        Ok(Deployment { name, url })
    }

    fn config_vars(&self, credential: &SessionCredential, account: Option<&str>) -> ConfigVars {
        let mut vars = ConfigVars::new();
        vars.insert(SESSION_VAR.to_owned(), credential.expose().to_owned());
        if self.settings.include_account
            && let Some(value) = account.map(str::trim).filter(|value| !value.is_empty())
        {
            vars.insert(ACCOUNT_VAR.to_owned(), value.to_owned());
        }
        vars
    }
}

/// Owned app name for a request handled at `at`: the prefix followed by the
/// Unix time in milliseconds.
#[must_use]
pub fn app_name_at(prefix: &str, at: DateTime<Utc>) -> AppName {
    AppName::new(format!("{prefix}{}", at.timestamp_millis()))
}
