//! Configuration surface.
//!
//! One TOML file configures both database endpoints and the platform API
//! key. Unrecognized keys are logged and ignored rather than rejected, so a
//! configuration shared with other tools keeps working. The CA-file options
//! collapse into a [`TlsMode`] here, once, at load time.

use std::fs;
use std::path::Path;

use crate::enums::TlsMode;
use crate::error::ConfigError;

/// Value the packaged sample configuration ships in place of a real API
/// key. Treated the same as an absent key.
pub const API_KEY_PLACEHOLDER: &str = "PROVIDE_ATLAS_API_KEY_HERE";

// ============================================================================
// DATABASE ENDPOINT
// ============================================================================

/// Connection parameters for one of the two stores.
#[derive(Debug, Clone, PartialEq)]
pub struct DbEndpoint {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub tls: TlsMode,
}

impl DbEndpoint {
    fn new(port: u16, user: &str, database: &str) -> Self {
        Self {
            server: "localhost".to_string(),
            port,
            user: user.to_string(),
            password: None,
            database: database.to_string(),
            tls: TlsMode::SystemDefault,
        }
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Full configuration: the schedule store, the results store, and the
/// platform API key.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasMnsConfig {
    pub scheduler: DbEndpoint,
    pub results: DbEndpoint,
    pub atlas_api_key: Option<String>,
}

impl Default for AtlasMnsConfig {
    fn default() -> Self {
        Self {
            scheduler: DbEndpoint::new(5432, "scheduler", "atlasmsdb"),
            results: DbEndpoint::new(27017, "importer", "atlasmnsdb"),
            atlas_api_key: None,
        }
    }
}

impl AtlasMnsConfig {
    /// Load the configuration file. An unreadable or syntactically invalid
    /// file is a fatal startup error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Parse configuration text. `origin` names the source in diagnostics.
    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = text.parse().map_err(|e: toml::de::Error| ConfigError::Invalid {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;

        let mut config = Self::default();
        for (key, value) in table {
            match key.as_str() {
                "scheduler_dbserver" => config.scheduler.server = string_value(&value),
                "scheduler_dbport" => apply_port(&mut config.scheduler.port, &key, &value),
                "scheduler_dbuser" => config.scheduler.user = string_value(&value),
                "scheduler_dbpassword" => config.scheduler.password = Some(string_value(&value)),
                "scheduler_database" => config.scheduler.database = string_value(&value),
                "scheduler_cafile" => {
                    config.scheduler.tls = TlsMode::from_config_value(&string_value(&value))
                }

                "results_dbserver" => config.results.server = string_value(&value),
                "results_dbport" => apply_port(&mut config.results.port, &key, &value),
                "results_dbuser" => config.results.user = string_value(&value),
                "results_dbpassword" => config.results.password = Some(string_value(&value)),
                "results_database" => config.results.database = string_value(&value),
                "results_cafile" => {
                    config.results.tls = TlsMode::from_config_value(&string_value(&value))
                }

                "atlas_api_key" => config.atlas_api_key = Some(string_value(&value)),

                other => {
                    tracing::warn!(parameter = other, "unknown parameter is ignored");
                }
            }
        }
        Ok(config)
    }

    /// The platform API key. An absent or placeholder key is a hard
    /// configuration error.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        match self.atlas_api_key.as_deref() {
            Some(key) if !key.is_empty() && key != API_KEY_PLACEHOLDER => Ok(key),
            _ => Err(ConfigError::MissingApiKey),
        }
    }
}

/// String form of a TOML value; bare strings come through unquoted.
fn string_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn apply_port(slot: &mut u16, key: &str, value: &toml::Value) {
    let parsed = match value {
        toml::Value::Integer(n) => u16::try_from(*n).ok(),
        toml::Value::String(s) => s.parse().ok(),
        _ => None,
    };
    match parsed {
        Some(port) => *slot = port,
        None => tracing::warn!(parameter = key, value = %value, "invalid port value is ignored"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_match_the_packaged_setup() {
        let config = AtlasMnsConfig::default();
        assert_eq!(config.scheduler.port, 5432);
        assert_eq!(config.scheduler.user, "scheduler");
        assert_eq!(config.scheduler.database, "atlasmsdb");
        assert_eq!(config.results.port, 27017);
        assert_eq!(config.results.user, "importer");
        assert_eq!(config.results.database, "atlasmnsdb");
        assert!(config.atlas_api_key.is_none());
    }

    #[test]
    fn parses_recognized_keys_and_ignores_unknown_ones() {
        let text = r#"
scheduler_dbserver = "sched.example.net"
scheduler_dbport = 5433
scheduler_dbpassword = "secret"
scheduler_cafile = "IGNORE"
results_dbserver = "results.example.net"
results_cafile = "/etc/ssl/results-ca.pem"
atlas_api_key = "0123456789abcdef"
some_future_option = "whatever"
"#;
        let config = AtlasMnsConfig::parse(text, "test").unwrap();
        assert_eq!(config.scheduler.server, "sched.example.net");
        assert_eq!(config.scheduler.port, 5433);
        assert_eq!(config.scheduler.password.as_deref(), Some("secret"));
        assert_eq!(config.scheduler.tls, TlsMode::Insecure);
        assert_eq!(config.results.server, "results.example.net");
        assert_eq!(
            config.results.tls,
            TlsMode::CustomCa(PathBuf::from("/etc/ssl/results-ca.pem"))
        );
        assert_eq!(config.api_key().unwrap(), "0123456789abcdef");
    }

    #[test]
    fn placeholder_api_key_is_a_configuration_error() {
        let mut config = AtlasMnsConfig::default();
        assert_eq!(config.api_key(), Err(ConfigError::MissingApiKey));
        config.atlas_api_key = Some(API_KEY_PLACEHOLDER.to_string());
        assert_eq!(config.api_key(), Err(ConfigError::MissingApiKey));
        config.atlas_api_key = Some(String::new());
        assert_eq!(config.api_key(), Err(ConfigError::MissingApiKey));
    }

    #[test]
    fn invalid_toml_is_fatal() {
        assert!(matches!(
            AtlasMnsConfig::parse("scheduler_dbport = = 1", "test"),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
