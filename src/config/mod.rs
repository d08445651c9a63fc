//! Configuration loading via `ortho-config`.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::credential::{CURRENT_PREFIX, CredentialValidator, LEGACY_PREFIX};
use crate::fork::{DEFAULT_GITHUB_API_BASE, ReferenceRepository};
use crate::janitor::{DEFAULT_RETENTION_HOURS, JanitorConfig};
use crate::platform::HerokuSettings;
use crate::provision::ProvisionSettings;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default reference repository every deploy is built from.
pub const DEFAULT_REFERENCE_REPOSITORY: &str = "Arslan-MD/Arslan-Botz";

/// Default ownership prefix for app names.
pub const DEFAULT_APP_NAME_PREFIX: &str = "arslan-botz-";

/// Orchestrator settings derived from defaults, `slipway.toml` and
/// `SLIPWAY_*` environment variables. Loaded once at start-up.
#[derive(Clone, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "SLIPWAY")]
pub struct SlipwayConfig {
    /// Bearer token for the hosting platform API. Required; a blank value
    /// fails [`SlipwayConfig::validate`].
    #[ortho_config(default = String::new())]
    pub api_key: String,
    /// TCP port the HTTP server listens on.
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Address the HTTP server binds to.
    #[ortho_config(default = "0.0.0.0".to_owned())]
    pub bind_host: String,
    /// Base URL of the hosting platform API.
    #[ortho_config(default = "https://api.heroku.com".to_owned())]
    pub platform_api_base: String,
    /// Domain public app URLs are formed under.
    #[ortho_config(default = "herokuapp.com".to_owned())]
    pub platform_domain: String,
    /// Base URL of the code-hosting API used for fork checks.
    #[ortho_config(default = DEFAULT_GITHUB_API_BASE.to_owned())]
    pub github_api_base: String,
    /// Region new apps are created in.
    #[ortho_config(default = "eu".to_owned())]
    pub region: String,
    /// Ownership prefix of app names.
    #[ortho_config(default = DEFAULT_APP_NAME_PREFIX.to_owned())]
    pub app_name_prefix: String,
    /// Tarball every build is started from.
    #[ortho_config(default = "https://github.com/Arslan-MD/Arslan-Botz/tarball/main".to_owned())]
    pub source_archive_url: String,
    /// `owner/name` of the repository users must fork.
    #[ortho_config(default = DEFAULT_REFERENCE_REPOSITORY.to_owned())]
    pub reference_repository: String,
    /// Comma-separated credential prefix markers.
    #[ortho_config(default = format!("{LEGACY_PREFIX},{CURRENT_PREFIX}"))]
    pub accepted_prefixes: String,
    /// Whether deploys require a fork of the reference repository. Unset
    /// reads as `true`.
    pub require_fork_check: Option<bool>,
    /// Whether the requesting account is written into app configuration.
    /// Unset reads as `true`.
    pub include_account_in_config: Option<bool>,
    /// Whether the background janitor runs inside `serve`. Unset reads as
    /// `true`.
    pub enable_sweeper: Option<bool>,
    /// Age in hours at which owned apps are reclaimed.
    #[ortho_config(default = DEFAULT_RETENTION_HOURS)]
    pub retention_hours: u64,
    /// Seconds between janitor sweeps.
    #[ortho_config(default = 21_600)]
    pub sweep_interval_secs: u64,
    /// Timeout in seconds applied to every outbound HTTP call.
    #[ortho_config(default = 30)]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for SlipwayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlipwayConfig")
            .field("api_key", &"<redacted>")
            .field("port", &self.port)
            .field("bind_host", &self.bind_host)
            .field("platform_api_base", &self.platform_api_base)
            .field("region", &self.region)
            .field("app_name_prefix", &self.app_name_prefix)
            .field("require_fork_check", &self.require_fork_check())
            .field("include_account_in_config", &self.include_account_in_config())
            .field("enable_sweeper", &self.enable_sweeper())
            .field("retention_hours", &self.retention_hours)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .finish_non_exhaustive()
    }
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to slipway.toml",
            self.description, self.env_var, self.toml_key
        ))
    }

    fn invalid(&self, reason: &str) -> ConfigError {
        ConfigError::Invalid(format!(
            "invalid {} ({reason}): check {} or {} in slipway.toml",
            self.description, self.env_var, self.toml_key
        ))
    }
}

const API_KEY: FieldMetadata =
    FieldMetadata::new("platform API key", "SLIPWAY_API_KEY", "api_key");
const BIND_HOST: FieldMetadata =
    FieldMetadata::new("bind address", "SLIPWAY_BIND_HOST", "bind_host");
const PLATFORM_API_BASE: FieldMetadata = FieldMetadata::new(
    "platform API base URL",
    "SLIPWAY_PLATFORM_API_BASE",
    "platform_api_base",
);
const PLATFORM_DOMAIN: FieldMetadata = FieldMetadata::new(
    "platform domain",
    "SLIPWAY_PLATFORM_DOMAIN",
    "platform_domain",
);
const GITHUB_API_BASE: FieldMetadata = FieldMetadata::new(
    "code-hosting API base URL",
    "SLIPWAY_GITHUB_API_BASE",
    "github_api_base",
);
const REGION: FieldMetadata = FieldMetadata::new("region", "SLIPWAY_REGION", "region");
const APP_NAME_PREFIX: FieldMetadata = FieldMetadata::new(
    "app name prefix",
    "SLIPWAY_APP_NAME_PREFIX",
    "app_name_prefix",
);
const SOURCE_ARCHIVE_URL: FieldMetadata = FieldMetadata::new(
    "source archive URL",
    "SLIPWAY_SOURCE_ARCHIVE_URL",
    "source_archive_url",
);
const REFERENCE_REPOSITORY: FieldMetadata = FieldMetadata::new(
    "reference repository",
    "SLIPWAY_REFERENCE_REPOSITORY",
    "reference_repository",
);
const ACCEPTED_PREFIXES: FieldMetadata = FieldMetadata::new(
    "accepted credential prefixes",
    "SLIPWAY_ACCEPTED_PREFIXES",
    "accepted_prefixes",
);
const RETENTION_HOURS: FieldMetadata = FieldMetadata::new(
    "retention period",
    "SLIPWAY_RETENTION_HOURS",
    "retention_hours",
);
const SWEEP_INTERVAL: FieldMetadata = FieldMetadata::new(
    "sweep interval",
    "SLIPWAY_SWEEP_INTERVAL_SECS",
    "sweep_interval_secs",
);
const REQUEST_TIMEOUT: FieldMetadata = FieldMetadata::new(
    "request timeout",
    "SLIPWAY_REQUEST_TIMEOUT_SECS",
    "request_timeout_secs",
);

/// Deploy-path settings resolved from [`SlipwayConfig`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeploySettings {
    /// Credential validator built from the accepted prefixes.
    pub validator: CredentialValidator,
    /// Reference repository for fork checks and hints.
    pub reference: ReferenceRepository,
    /// Whether deploys require a verified fork.
    pub require_fork_check: bool,
    /// Provisioning parameters.
    pub provision: ProvisionSettings,
}

impl SlipwayConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("slipway")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and the `slipway.toml` key to fix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for blank required values and
    /// [`ConfigError::Invalid`] for values that cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (value, metadata) in [
            (&self.api_key, &API_KEY),
            (&self.bind_host, &BIND_HOST),
            (&self.platform_api_base, &PLATFORM_API_BASE),
            (&self.platform_domain, &PLATFORM_DOMAIN),
            (&self.github_api_base, &GITHUB_API_BASE),
            (&self.region, &REGION),
            (&self.app_name_prefix, &APP_NAME_PREFIX),
            (&self.source_archive_url, &SOURCE_ARCHIVE_URL),
            (&self.reference_repository, &REFERENCE_REPOSITORY),
        ] {
            if value.trim().is_empty() {
                return Err(metadata.missing());
            }
        }

        if self.bind_host.trim().parse::<IpAddr>().is_err() {
            return Err(BIND_HOST.invalid("expected an IP address"));
        }
        if ReferenceRepository::parse(&self.reference_repository).is_none() {
            return Err(REFERENCE_REPOSITORY.invalid("expected owner/name"));
        }
        if self.prefix_list().is_empty() {
            return Err(ACCEPTED_PREFIXES.missing());
        }
        if self.retention_hours == 0 {
            return Err(RETENTION_HOURS.invalid("must be at least one hour"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(SWEEP_INTERVAL.invalid("must be at least one second"));
        }
        if self.request_timeout_secs == 0 {
            return Err(REQUEST_TIMEOUT.invalid("must be at least one second"));
        }
        Ok(())
    }

    fn prefix_list(&self) -> Vec<String> {
        self.accepted_prefixes
            .split(',')
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Whether deploys require a verified fork. Defaults to `true`.
    #[must_use]
    pub fn require_fork_check(&self) -> bool {
        self.require_fork_check.unwrap_or(true)
    }

    /// Whether the account is written into app configuration. Defaults to
    /// `true`.
    #[must_use]
    pub fn include_account_in_config(&self) -> bool {
        self.include_account_in_config.unwrap_or(true)
    }

    /// Whether `serve` runs the background sweeper. Defaults to `true`.
    #[must_use]
    pub fn enable_sweeper(&self) -> bool {
        self.enable_sweeper.unwrap_or(true)
    }

    /// Socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `bind_host` is not an IP address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_host
            .trim()
            .parse::<IpAddr>()
            .map(|ip| SocketAddr::new(ip, self.port))
            .map_err(|_| BIND_HOST.invalid("expected an IP address"))
    }

    /// Timeout for outbound HTTP calls.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Period between janitor sweeps.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Connection settings for the hosting platform client.
    #[must_use]
    pub fn heroku_settings(&self) -> HerokuSettings {
        HerokuSettings {
            api_base: self.platform_api_base.trim().to_owned(),
            api_key: self.api_key.trim().to_owned(),
            timeout: self.request_timeout(),
        }
    }

    /// Resolves the deploy-path settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn deploy_settings(&self) -> Result<DeploySettings, ConfigError> {
        self.validate()?;
        let reference = ReferenceRepository::parse(&self.reference_repository)
            .ok_or_else(|| REFERENCE_REPOSITORY.invalid("expected owner/name"))?;
        Ok(DeploySettings {
            validator: CredentialValidator::new(self.prefix_list()),
            reference,
            require_fork_check: self.require_fork_check(),
            provision: ProvisionSettings {
                name_prefix: self.app_name_prefix.trim().to_owned(),
                region: self.region.trim().to_owned(),
                source_archive_url: self.source_archive_url.trim().to_owned(),
                platform_domain: self.platform_domain.trim().to_owned(),
                include_account: self.include_account_in_config(),
            },
        })
    }

    /// Builds the janitor configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the prefix or retention cannot
    /// be used.
    pub fn janitor_config(&self) -> Result<JanitorConfig, ConfigError> {
        JanitorConfig::new(self.app_name_prefix.as_str(), self.retention_hours)
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configuration value is present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests;
