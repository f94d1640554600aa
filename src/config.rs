//! benchsql configuration

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BenchError, BenchResult};
use crate::pipeline::BuildOptions;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG: &str = "benchsql.toml";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub build: BuildConfig,
    pub log: LogConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Fail a build that leaves override tokens in SQL
    pub deny_unresolved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl Config {
    /// Create a new configuration builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> BenchResult<Self> {
        toml::from_str(content).map_err(|e| BenchError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> BenchResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BenchError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content).map_err(|e| BenchError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the first configuration found.
    ///
    /// An `explicit` path must exist. Otherwise `./benchsql.toml` and then
    /// `<config dir>/benchsql/config.toml` are tried, falling back to
    /// defaults when neither exists.
    pub fn load(explicit: Option<&Path>) -> BenchResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        for path in Self::search_paths() {
            if path.is_file() {
                debug!(path = %path.display(), "loading config");
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Candidate locations, in priority order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("benchsql").join("config.toml"));
        }
        paths
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions::new().deny_unresolved(self.build.deny_unresolved)
    }
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn deny_unresolved(mut self, deny: bool) -> Self {
        self.config.build.deny_unresolved = deny;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log.level = level.into();
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.config.output.pretty = pretty;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log.level, "warn");
        assert!(config.output.pretty);
        assert!(!config.build_options().deny_unresolved);
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_toml_str(
            r#"
            [build]
            deny_unresolved = true

            [log]
            level = "benchsql=debug"

            [output]
            pretty = false
            "#,
        )
        .unwrap();
        let expected = Config::builder()
            .deny_unresolved(true)
            .log_level("benchsql=debug")
            .pretty(false)
            .build();
        assert_eq!(config, expected);
        assert!(config.build_options().deny_unresolved);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = Config::from_toml_str("[output]\npretty = false\n").unwrap();
        assert_eq!(config.log.level, "warn");
        assert!(!config.output.pretty);
    }

    #[test]
    fn test_invalid_files_are_errors() {
        assert!(matches!(
            Config::from_toml_str("[build]\ndeny_unresolved = \"yes\""),
            Err(BenchError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[bulid]\n"),
            Err(BenchError::Config(_))
        ));
        assert!(matches!(
            Config::load(Some(Path::new("/nonexistent/benchsql.toml"))),
            Err(BenchError::Config(_))
        ));
    }

    #[test]
    fn test_file_error_is_wrapped_once() {
        let path = std::env::temp_dir().join(format!("benchsql-config-test-{}.toml", std::process::id()));
        std::fs::write(&path, "[log]\nlevel = 3\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        let message = err.to_string();
        assert_eq!(message.matches("Configuration error").count(), 1, "{}", message);
        assert!(message.contains(&path.display().to_string()));
    }

    #[test]
    fn test_search_paths_start_local() {
        assert_eq!(Config::search_paths()[0], PathBuf::from("benchsql.toml"));
    }
}
