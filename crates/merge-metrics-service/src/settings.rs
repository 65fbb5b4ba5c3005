//! Layered configuration loading.
//!
//! Sources, later overriding earlier:
//!  1. `/etc/merge-metrics/service.yaml`: system-wide defaults
//!  2. `./config/service.yaml`: deployment-local override
//!  3. the file named by `MM_CONFIG_FILE`: operator-specified, must exist
//!  4. environment variables `MM__SECTION__KEY`, e.g. `MM__SERVER__PORT=9090`
//!
//! Every field has a default, so missing files are not an error. A malformed
//! file or a value of the wrong type is.

use merge_metrics_api::{ConfigError, ServiceConfig};
use tracing::info;

/// Environment variable naming an explicit configuration file
pub const CONFIG_FILE_ENV: &str = "MM_CONFIG_FILE";

const ENV_PREFIX: &str = "MM";

/// Load and validate the service configuration
pub fn load_config(explicit_path: Option<&str>) -> Result<ServiceConfig, ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/merge-metrics/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(path) = explicit_path.filter(|p| !p.is_empty()) {
        info!(path = %path, "Loading configuration from explicit path");
        builder = builder.add_source(
            config::File::new(path, config::FileFormat::Yaml).required(true),
        );
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("reviews.designated_reviewers")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })?;

    let service_config: ServiceConfig =
        settings.try_deserialize().map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })?;

    service_config.validate()?;
    Ok(service_config)
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
