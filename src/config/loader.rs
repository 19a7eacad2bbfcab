//! Layered configuration loading.
//!
//! Sources, lowest priority first:
//! 1. `default.toml` (required)
//! 2. `{environment}.toml`
//! 3. `local.toml`
//! 4. `FOODGRAM_*` environment variables, `__` separating nested keys
//!
//! Pointing the loader at a single file (`FOODGRAM_CONFIG_FILE` or
//! `--config`) replaces steps 1-3 with that file.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

pub const CONFIG_DIR_ENV: &str = "FOODGRAM_CONFIG_DIR";
pub const CONFIG_FILE_ENV: &str = "FOODGRAM_CONFIG_FILE";
const DEFAULT_CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "FOODGRAM";
const ENV_SEPARATOR: &str = "__";

type Builder = ConfigBuilder<DefaultState>;

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    config_file: Option<PathBuf>,
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Builds a loader from `FOODGRAM_CONFIG_DIR`, `FOODGRAM_CONFIG_FILE`
    /// and `FOODGRAM_APP_ENV`.
    ///
    /// # Errors
    /// `MutualExclusivityError` when both the directory and the file
    /// variables are set.
    pub fn new() -> Result<Self, ConfigError> {
        let dir = std::env::var(CONFIG_DIR_ENV).ok();
        let file = std::env::var(CONFIG_FILE_ENV).ok();

        if dir.is_some() && file.is_some() {
            return Err(ConfigError::mutual_exclusivity(format!(
                "{} and {} cannot both be set",
                CONFIG_DIR_ENV, CONFIG_FILE_ENV
            )));
        }

        Ok(Self {
            config_dir: dir.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR), PathBuf::from),
            config_file: file.map(PathBuf::from),
            environment: AppEnvironment::from_env(),
        })
    }

    /// Loads exactly `path` plus environment overrides.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: Some(path.into()),
            environment: AppEnvironment::from_env(),
        }
    }

    pub fn with_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Merges every source into validated [`Settings`].
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let settings: Settings = self
            .build_config()?
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = match &self.config_file {
            Some(file) => add_file_source(Config::builder(), file, true)?,
            None => self.add_layered_sources(Config::builder())?,
        };

        add_env_source(builder).build().map_err(ConfigError::from)
    }

    fn add_layered_sources(&self, builder: Builder) -> Result<Builder, ConfigError> {
        let builder = add_file_source(builder, &self.config_dir.join("default.toml"), true)?;
        let builder = add_file_source(
            builder,
            &self.config_dir.join(format!("{}.toml", self.environment)),
            false,
        )?;
        add_file_source(builder, &self.config_dir.join("local.toml"), false)
    }
}

fn add_file_source(builder: Builder, path: &Path, required: bool) -> Result<Builder, ConfigError> {
    if required && !path.is_file() {
        return Err(ConfigError::file_not_found(path.display().to_string()));
    }
    let name = path
        .to_str()
        .ok_or_else(|| ConfigError::ParseError(format!("non UTF-8 path: {}", path.display())))?;

    Ok(builder.add_source(File::new(name, FileFormat::Toml).required(required)))
}

/// `FOODGRAM_SERVER__PORT=9000` becomes `server.port = 9000`.
fn add_env_source(builder: Builder) -> Builder {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator(ENV_SEPARATOR)
            .ignore_empty(true)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("server.cors_origins"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::{ENV_LOCK, EnvGuard};
    use std::fs;
    use tempfile::TempDir;

    const DEFAULT_TOML: &str = r#"
        [server]
        host = "0.0.0.0"
        port = 8000

        [database]
        url = "postgres://localhost/foodgram"

        [jwt]
        secret = "0123456789abcdef0123456789abcdef"
    "#;

    fn config_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn clean_env() -> EnvGuard {
        let mut env = EnvGuard::new();
        for key in [
            CONFIG_DIR_ENV,
            CONFIG_FILE_ENV,
            AppEnvironment::ENV_VAR,
            "FOODGRAM_SERVER__PORT",
            "FOODGRAM_DATABASE__URL",
            "FOODGRAM_SHOPPING_LIST__HEADER",
        ] {
            env.remove(key);
        }
        env
    }

    #[test]
    fn test_new_uses_defaults_without_env() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _env = clean_env();

        let loader = ConfigLoader::new().unwrap();
        assert_eq!(loader.config_dir(), Path::new("config"));
        assert!(loader.config_file().is_none());
        assert_eq!(loader.environment(), AppEnvironment::Development);
    }

    #[test]
    fn test_dir_and_file_are_mutually_exclusive() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut env = clean_env();
        env.set(CONFIG_DIR_ENV, "/etc/foodgram");
        env.set(CONFIG_FILE_ENV, "/etc/foodgram/app.toml");

        assert!(matches!(
            ConfigLoader::new(),
            Err(ConfigError::MutualExclusivityError(_))
        ));
    }

    #[test]
    fn test_missing_default_toml() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = config_dir(&[]);
        let mut env = clean_env();
        env.set(CONFIG_DIR_ENV, dir.path().to_str().unwrap());

        let result = ConfigLoader::new().unwrap().load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_layers_override_in_order() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = config_dir(&[
            ("default.toml", DEFAULT_TOML),
            ("production.toml", "[server]\nport = 8080\n[database]\nmax_connections = 50\n"),
            ("local.toml", "[server]\nport = 8081\n"),
        ]);
        let mut env = clean_env();
        env.set(CONFIG_DIR_ENV, dir.path().to_str().unwrap());
        env.set(AppEnvironment::ENV_VAR, "production");

        let settings = ConfigLoader::new().unwrap().load().unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.database.max_connections, 50);
    }

    #[test]
    fn test_env_vars_take_precedence() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = config_dir(&[("default.toml", DEFAULT_TOML)]);
        let mut env = clean_env();
        env.set(CONFIG_DIR_ENV, dir.path().to_str().unwrap());
        env.set("FOODGRAM_SERVER__PORT", "9100");
        env.set("FOODGRAM_SHOPPING_LIST__HEADER", "Купить:");

        let settings = ConfigLoader::new().unwrap().load().unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.shopping_list.header, "Купить:");
    }

    #[test]
    fn test_single_file_skips_layers() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = config_dir(&[
            ("app.toml", DEFAULT_TOML),
            ("local.toml", "[server]\nport = 1234\n"),
        ]);
        let _env = clean_env();

        let settings = ConfigLoader::from_file(dir.path().join("app.toml")).load().unwrap();
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = config_dir(&[(
            "app.toml",
            "[database]\nurl = \"mysql://localhost/foodgram\"\n[jwt]\nsecret = \"0123456789abcdef0123456789abcdef\"\n",
        )]);
        let _env = clean_env();

        let result = ConfigLoader::from_file(dir.path().join("app.toml")).load();
        match result {
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, "database.url"),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_shipped_config_directory_loads() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut env = clean_env();
        let shipped = concat!(env!("CARGO_MANIFEST_DIR"), "/config");
        env.set(CONFIG_DIR_ENV, shipped);

        let development = ConfigLoader::new().unwrap().load().unwrap();
        assert_eq!(development.server.port, 8000);
        assert!(!development.database.auto_migrate);

        let production = ConfigLoader::new()
            .unwrap()
            .with_environment(AppEnvironment::Production)
            .load()
            .unwrap();
        assert_eq!(production.server.host, "0.0.0.0");
        assert!(production.database.auto_migrate);
        assert!(production.logger.file.enabled);
    }
}
