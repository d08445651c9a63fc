//! Unit tests for configuration validation and derived settings.

use super::*;
use rstest::{fixture, rstest};

#[fixture]
fn valid_config() -> SlipwayConfig {
    SlipwayConfig {
        api_key: String::from("heroku-api-key"),
        port: DEFAULT_PORT,
        bind_host: String::from("0.0.0.0"),
        platform_api_base: String::from("https://api.heroku.com"),
        platform_domain: String::from("herokuapp.com"),
        github_api_base: String::from(DEFAULT_GITHUB_API_BASE),
        region: String::from("eu"),
        app_name_prefix: String::from(DEFAULT_APP_NAME_PREFIX),
        source_archive_url: String::from("https://github.com/Arslan-MD/Arslan-Botz/tarball/main"),
        reference_repository: String::from(DEFAULT_REFERENCE_REPOSITORY),
        accepted_prefixes: format!("{LEGACY_PREFIX},{CURRENT_PREFIX}"),
        require_fork_check: None,
        include_account_in_config: None,
        enable_sweeper: None,
        retention_hours: 24,
        sweep_interval_secs: 21_600,
        request_timeout_secs: 30,
    }
}

#[rstest]
fn valid_config_passes(valid_config: SlipwayConfig) {
    assert_eq!(valid_config.validate(), Ok(()));
}

#[rstest]
fn missing_api_key_names_env_var_and_toml_key(valid_config: SlipwayConfig) {
    let cfg = SlipwayConfig {
        api_key: String::from("   "),
        ..valid_config
    };

    let error = cfg.validate().expect_err("api key is required");
    let ConfigError::MissingField(ref message) = error else {
        panic!("expected MissingField error, got {error:?}");
    };
    assert!(message.contains("SLIPWAY_API_KEY"), "message: {message}");
    assert!(message.contains("api_key"), "message: {message}");
    assert!(message.contains("slipway.toml"), "message: {message}");
}

#[rstest]
#[case::region(|cfg: &mut SlipwayConfig| cfg.region.clear(), "SLIPWAY_REGION")]
#[case::prefix(|cfg: &mut SlipwayConfig| cfg.app_name_prefix.clear(), "SLIPWAY_APP_NAME_PREFIX")]
#[case::source(|cfg: &mut SlipwayConfig| cfg.source_archive_url.clear(), "SLIPWAY_SOURCE_ARCHIVE_URL")]
#[case::prefixes(|cfg: &mut SlipwayConfig| cfg.accepted_prefixes = String::from(" , "), "SLIPWAY_ACCEPTED_PREFIXES")]
#[case::reference(|cfg: &mut SlipwayConfig| cfg.reference_repository = String::from("no-slash"), "SLIPWAY_REFERENCE_REPOSITORY")]
#[case::bind(|cfg: &mut SlipwayConfig| cfg.bind_host = String::from("localhost"), "SLIPWAY_BIND_HOST")]
#[case::retention(|cfg: &mut SlipwayConfig| cfg.retention_hours = 0, "SLIPWAY_RETENTION_HOURS")]
#[case::interval(|cfg: &mut SlipwayConfig| cfg.sweep_interval_secs = 0, "SLIPWAY_SWEEP_INTERVAL_SECS")]
#[case::timeout(|cfg: &mut SlipwayConfig| cfg.request_timeout_secs = 0, "SLIPWAY_REQUEST_TIMEOUT_SECS")]
fn invalid_fields_produce_actionable_errors(
    valid_config: SlipwayConfig,
    #[case] mutate: fn(&mut SlipwayConfig),
    #[case] env_var: &str,
) {
    let mut cfg = valid_config;
    mutate(&mut cfg);
    let message = cfg.validate().expect_err("validation should fail").to_string();
    assert!(message.contains(env_var), "expected {env_var} in: {message}");
}

#[rstest]
fn deploy_settings_split_prefix_list(mut valid_config: SlipwayConfig) {
    valid_config.accepted_prefixes = String::from(" BOT~ ,, (BOT~) ");
    let settings = valid_config.deploy_settings().expect("settings");
    assert_eq!(
        settings.validator.prefixes(),
        [String::from("BOT~"), String::from("(BOT~)")]
    );
}

#[rstest]
fn deploy_settings_carry_variant_switches(mut valid_config: SlipwayConfig) {
    valid_config.require_fork_check = Some(false);
    valid_config.include_account_in_config = Some(false);
    let settings = valid_config.deploy_settings().expect("settings");
    assert!(!settings.require_fork_check);
    assert!(!settings.provision.include_account);
    assert_eq!(settings.provision.region, "eu");
    assert_eq!(settings.reference.full_name(), DEFAULT_REFERENCE_REPOSITORY);
}

#[rstest]
fn unset_variant_switches_default_to_enabled(valid_config: SlipwayConfig) {
    assert!(valid_config.require_fork_check());
    assert!(valid_config.include_account_in_config());
    assert!(valid_config.enable_sweeper());

    let settings = valid_config.deploy_settings().expect("settings");
    assert!(settings.require_fork_check);
    assert!(settings.provision.include_account);
}

#[rstest]
#[case(Some(true), true)]
#[case(Some(false), false)]
#[case(None, true)]
fn sweeper_switch_honours_explicit_values(
    mut valid_config: SlipwayConfig,
    #[case] value: Option<bool>,
    #[case] expected: bool,
) {
    valid_config.enable_sweeper = value;
    assert_eq!(valid_config.enable_sweeper(), expected);
}

#[rstest]
fn listen_addr_combines_host_and_port(mut valid_config: SlipwayConfig) {
    valid_config.bind_host = String::from("127.0.0.1");
    valid_config.port = 8080;
    let addr = valid_config.listen_addr().expect("addr");
    assert_eq!(addr.to_string(), "127.0.0.1:8080");
}

#[rstest]
fn durations_and_janitor_config(valid_config: SlipwayConfig) {
    assert_eq!(valid_config.request_timeout(), Duration::from_secs(30));
    assert_eq!(valid_config.sweep_interval(), Duration::from_secs(6 * 60 * 60));
    let janitor = valid_config.janitor_config().expect("janitor config");
    assert_eq!(janitor.name_prefix(), DEFAULT_APP_NAME_PREFIX);
    assert_eq!(janitor.retention(), chrono::TimeDelta::hours(24));
}

#[rstest]
fn debug_output_redacts_api_key(valid_config: SlipwayConfig) {
    let rendered = format!("{valid_config:?}");
    assert!(!rendered.contains("heroku-api-key"), "leaked: {rendered}");
    let heroku = format!("{:?}", valid_config.heroku_settings());
    assert!(!heroku.contains("heroku-api-key"), "leaked: {heroku}");
}
