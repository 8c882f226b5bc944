//! Configuration Loader
//!
//! Layers an optional configuration file (TOML, YAML or JSON, chosen by
//! extension) and `DISPATCH__*` environment variables over the built-in
//! defaults, then validates the result.
//!
//! Environment keys use `__` between path segments:
//! `DISPATCH__PORTS__BASE_PORT=9000` overrides `ports.base_port`.

use super::error::{ConfigResult, ConfigurationError};
use super::DispatchConfig;
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment variable naming a configuration file to load
pub const CONFIG_PATH_VAR: &str = "DISPATCH_CONFIG";

const DEFAULT_ENV_PREFIX: &str = "DISPATCH";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Loader reading `DISPATCH__*` variables and no file
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
        }
    }

    /// Loader that also reads the file named by `DISPATCH_CONFIG`, when set
    pub fn from_env() -> Self {
        let loader = Self::new();
        match env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.is_empty() => loader.with_file(path),
            _ => loader,
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Ignore environment overrides entirely
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Build, deserialize and validate the configuration
    pub fn load(&self) -> ConfigResult<DispatchConfig> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = &self.file {
            if !path.is_file() {
                return Err(ConfigurationError::ConfigFileNotFound { path: path.clone() });
            }
            debug!(path = %path.display(), "Loading dispatch configuration file");
            builder = builder.add_source(::config::File::from(path.as_path()).required(true));
        }

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                ::config::Environment::with_prefix(prefix)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }

        let source_description = self
            .file
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "environment".to_string());

        let config: DispatchConfig = builder
            .build()
            .and_then(|raw| raw.try_deserialize())
            .map_err(|e| ConfigurationError::load_error(&source_description, e))?;

        config.validate()?;

        info!(
            source = %source_description,
            base_port = config.ports.base_port,
            max_ports = config.ports.max_ports,
            trip_seconds = config.trips.duration_seconds,
            liveness_seconds = config.drivers.liveness_window_seconds,
            "⚙️ CONFIG: Dispatch configuration loaded"
        );

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortExhaustionPolicy;
    use std::io::Write;

    fn write_config(extension: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_sources_yield_defaults() {
        let config = ConfigLoader::new().without_env().load().unwrap();
        assert_eq!(config, DispatchConfig::default());
    }

    #[test]
    fn test_partial_toml_file_keeps_other_defaults() {
        let file = write_config(
            ".toml",
            r#"
[ports]
base_port = 9200
max_ports = 8

[dispatch]
port_exhaustion_policy = "assign_without_port"
"#,
        );

        let config = ConfigLoader::new()
            .without_env()
            .with_file(file.path())
            .load()
            .unwrap();

        assert_eq!(config.ports.base_port, 9200);
        assert_eq!(config.ports.max_ports, 8);
        assert!(config.ports.probe_network);
        assert_eq!(config.trips.duration_seconds, 60);
        assert_eq!(
            config.dispatch.port_exhaustion_policy,
            PortExhaustionPolicy::AssignWithoutPort
        );
    }

    #[test]
    fn test_yaml_file_is_supported() {
        let file = write_config(".yaml", "trips:\n  duration_seconds: 5\n");
        let config = ConfigLoader::new()
            .without_env()
            .with_file(file.path())
            .load()
            .unwrap();
        assert_eq!(config.trips.duration_seconds, 5);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config(".toml", "[drivers]\nliveness_window_seconds = 30\n");
        env::set_var("RIDE_LOADER_TEST__DRIVERS__LIVENESS_WINDOW_SECONDS", "45");

        let config = ConfigLoader::new()
            .with_env_prefix("RIDE_LOADER_TEST")
            .with_file(file.path())
            .load()
            .unwrap();

        env::remove_var("RIDE_LOADER_TEST__DRIVERS__LIVENESS_WINDOW_SECONDS");
        assert_eq!(config.drivers.liveness_window_seconds, 45);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = ConfigLoader::new()
            .without_env()
            .with_file("/nonexistent/dispatch.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::ConfigFileNotFound { .. }));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let file = write_config(".toml", "[trips]\nduration_seconds = 0\n");
        let err = ConfigLoader::new()
            .without_env()
            .with_file(file.path())
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }
}
