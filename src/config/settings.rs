//! Configuration structures loaded from TOML files and `FOODGRAM_*`
//! environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig, RotationConfig, RotationStrategy};
use crate::services::DEFAULT_SHOPPING_LIST_HEADER;

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "foodgram-rs".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_access_token_expiration() -> i64 {
    1
}

fn default_refresh_token_expiration() -> i64 {
    168
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/foodgram.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation_strategy() -> String {
    "size".to_string()
}

fn default_max_size() -> u64 {
    10 * 1024 * 1024
}

fn default_max_files() -> usize {
    5
}

fn default_shopping_list_header() -> String {
    DEFAULT_SHOPPING_LIST_HEADER.to_string()
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            cors_origins: Vec::new(),
        }
    }
}

/// PostgreSQL connection pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Run pending migrations before serving
    #[serde(default)]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout: default_connection_timeout(),
            auto_migrate: false,
        }
    }
}

/// JWT signing configuration. Lifetimes are in hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HS256 secret; supply it through `FOODGRAM_JWT__SECRET` in production
    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_access_token_expiration")]
    pub access_token_expiration: i64,

    #[serde(default = "default_refresh_token_expiration")]
    pub refresh_token_expiration: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_token_expiration: default_access_token_expiration(),
            refresh_token_expiration: default_refresh_token_expiration(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            colored: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationSettings {
    /// "size", "time" (daily), "hourly", "daily" or "combined"
    #[serde(default = "default_rotation_strategy")]
    pub strategy: String,

    #[serde(default = "default_max_size")]
    pub max_size: u64,

    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default)]
    pub compress: bool,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            strategy: default_rotation_strategy(),
            max_size: default_max_size(),
            max_files: default_max_files(),
            compress: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,

    #[serde(default = "default_true")]
    pub append: bool,

    /// "full", "compact" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,

    #[serde(default)]
    pub rotation: RotationSettings,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: true,
            format: default_log_format(),
            rotation: RotationSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Converts the file representation into the runtime [`LoggerConfig`].
    pub fn to_logger_config(&self) -> Result<LoggerConfig, ConfigError> {
        let format: LogFormat = self
            .file
            .format
            .parse()
            .map_err(|e: crate::logger::LoggerError| {
                ConfigError::validation("logger.file.format", e.to_string())
            })?;
        let strategy: RotationStrategy = self
            .file
            .rotation
            .strategy
            .parse()
            .map_err(|e: crate::logger::LoggerError| {
                ConfigError::validation("logger.file.rotation.strategy", e.to_string())
            })?;

        let config = LoggerConfig {
            level: self.level.clone(),
            console: ConsoleConfig {
                enabled: self.console.enabled,
                colored: self.console.colored,
            },
            file: FileConfig {
                enabled: self.file.enabled,
                path: PathBuf::from(&self.file.path),
                append: self.file.append,
                format,
                rotation: RotationConfig {
                    strategy,
                    max_size: self.file.rotation.max_size,
                    max_files: self.file.rotation.max_files,
                    compress: self.file.rotation.compress,
                },
            },
        };

        config
            .validate()
            .map_err(|e| ConfigError::validation("logger", e.to_string()))?;
        Ok(config)
    }
}

/// Shopping list download configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingListConfig {
    /// First line of the downloaded document
    #[serde(default = "default_shopping_list_header")]
    pub header: String,
}

impl Default for ShoppingListConfig {
    fn default() -> Self {
        Self {
            header: default_shopping_list_header(),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub jwt: JwtConfig,

    #[serde(default)]
    pub logger: LoggerSettings,

    #[serde(default)]
    pub shopping_list: ShoppingListConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_server_config() -> impl Strategy<Value = ServerConfig> {
        (
            prop_oneof![Just("127.0.0.1".to_string()), Just("0.0.0.0".to_string())],
            1u16..=65535u16,
            1u64..=300u64,
            prop::collection::vec("https://[a-z]{3,10}\\.example", 0..3),
        )
            .prop_map(|(host, port, request_timeout, cors_origins)| ServerConfig {
                host,
                port,
                request_timeout,
                cors_origins,
            })
    }

    fn arb_database_config() -> impl Strategy<Value = DatabaseConfig> {
        (
            prop_oneof![
                Just("postgres://localhost/foodgram".to_string()),
                Just("postgresql://user:pass@db:5432/foodgram".to_string()),
            ],
            1u32..=100u32,
            1u32..=10u32,
            1u64..=120u64,
            any::<bool>(),
        )
            .prop_map(|(url, max, min, timeout, auto_migrate)| DatabaseConfig {
                url,
                max_connections: max,
                min_connections: min.min(max),
                connection_timeout: timeout,
                auto_migrate,
            })
    }

    fn arb_jwt_config() -> impl Strategy<Value = JwtConfig> {
        ("[a-zA-Z0-9]{32,64}", 1i64..=24i64, 25i64..=720i64).prop_map(
            |(secret, access, refresh)| JwtConfig {
                secret,
                access_token_expiration: access,
                refresh_token_expiration: refresh,
            },
        )
    }

    fn arb_logger_settings() -> impl Strategy<Value = LoggerSettings> {
        (
            prop::sample::select(vec!["trace", "debug", "info", "warn", "error"]),
            any::<(bool, bool)>(),
            any::<(bool, bool)>(),
            prop::sample::select(vec!["full", "compact", "json"]),
            prop::sample::select(vec!["size", "time", "hourly", "combined"]),
            1024u64..=100_000_000u64,
            1usize..=20usize,
            any::<bool>(),
        )
            .prop_map(
                |(level, (c_on, colored), (f_on, append), format, strategy, max_size, max_files, compress)| {
                    LoggerSettings {
                        level: level.to_string(),
                        console: ConsoleSettings {
                            enabled: c_on,
                            colored,
                        },
                        file: FileSettings {
                            enabled: f_on,
                            path: "logs/foodgram.log".to_string(),
                            append,
                            format: format.to_string(),
                            rotation: RotationSettings {
                                strategy: strategy.to_string(),
                                max_size,
                                max_files,
                                compress,
                            },
                        },
                    }
                },
            )
    }

    fn arb_settings() -> impl Strategy<Value = Settings> {
        (
            arb_server_config(),
            arb_database_config(),
            arb_jwt_config(),
            arb_logger_settings(),
            "[A-Za-z ]{1,20}:",
        )
            .prop_map(|(server, database, jwt, logger, header)| Settings {
                application: ApplicationConfig::default(),
                server,
                database,
                jwt,
                logger,
                shopping_list: ShoppingListConfig { header },
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_settings_toml_round_trip(settings in arb_settings()) {
            let encoded = toml::to_string(&settings).expect("Settings should serialize to TOML");
            let decoded: Settings = toml::from_str(&encoded).expect("TOML should deserialize back");
            prop_assert_eq!(settings, decoded);
        }
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.application.name, "foodgram-rs");
        assert_eq!(settings.application.version, crate::pkg_version());
        assert_eq!(settings.server.address(), "127.0.0.1:8000");
        assert_eq!(settings.database.max_connections, 10);
        assert_eq!(settings.jwt.refresh_token_expiration, 168);
        assert_eq!(settings.logger.level, "info");
        assert_eq!(settings.shopping_list.header, "Shopping list:");
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [server]
            port = 9000

            [shopping_list]
            header = "Список покупок:"
            "#,
        )
        .unwrap();

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.shopping_list.header, "Список покупок:");
        assert_eq!(settings.logger.file.rotation.max_files, 5);
    }

    #[test]
    fn test_logger_settings_conversion() {
        let mut logger = LoggerSettings::default();
        logger.file.enabled = true;
        logger.file.format = "compact".to_string();
        logger.file.rotation.strategy = "hourly".to_string();

        let config = logger.to_logger_config().unwrap();
        assert_eq!(config.file.format, LogFormat::Compact);
        assert_eq!(
            config.file.rotation.strategy,
            RotationStrategy::Time(crate::logger::RotationPeriod::Hourly)
        );
        assert_eq!(config.file.path, PathBuf::from("logs/foodgram.log"));
    }

    #[test]
    fn test_logger_settings_conversion_rejects_bad_values() {
        let mut logger = LoggerSettings::default();
        logger.file.format = "xml".to_string();
        match logger.to_logger_config() {
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, "logger.file.format"),
            other => panic!("Expected ValidationError, got {:?}", other),
        }

        let mut logger = LoggerSettings::default();
        logger.level = "loud".to_string();
        assert!(logger.to_logger_config().is_err());
    }
}
