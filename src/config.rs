//! Configuration for the `abm` command.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ABM_HOME, ABM_CACHE_DIR, ABM_USER_AGENT)
//! 2. Config file (.abm/config.yaml)
//! 3. Defaults (~/.abm)
//!
//! Config file discovery:
//! - Searches the starting directory and its parents for .abm/config.yaml
//! - Paths in the config file are relative to the .abm/ directory
//!
//! The pipeline itself never reads configuration; the CLI turns a resolved
//! configuration into explicit request collaborators.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::{BasicHttpFactory, StrategyRegistry};
use crate::core::{ExpirationCheck, LicenseCheckChain, ReadingOrderCheck, DEFAULT_USER_AGENT};
use crate::domain::AudioBookManifest;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub http: Option<HttpConfig>,
    #[serde(default)]
    pub license_checks: Option<LicenseChecksConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .abm/)
    pub home: Option<String>,
    /// Fulfillment scratch directory (relative to .abm/)
    pub cache: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LicenseChecksConfig {
    pub expiration: Option<bool>,
    pub reading_order: Option<bool>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Scratch directory handed to fulfillment strategies
    pub cache_dir: PathBuf,
    /// Client identity sent to manifest servers
    pub user_agent: String,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub http_timeout: Duration,
    pub license_checks: LicenseCheckSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicenseCheckSettings {
    pub expiration: bool,
    pub reading_order: bool,
}

impl Default for LicenseCheckSettings {
    fn default() -> Self {
        Self {
            expiration: true,
            reading_order: true,
        }
    }
}

impl ResolvedConfig {
    /// Strategy registry using the configured HTTP timeout
    pub fn strategy_registry(&self) -> StrategyRegistry {
        StrategyRegistry::new().register(BasicHttpFactory::new(self.http_timeout))
    }

    /// License checks enabled by this configuration
    pub fn license_check_chain(&self) -> LicenseCheckChain<AudioBookManifest> {
        let mut chain = LicenseCheckChain::new();
        if self.license_checks.expiration {
            chain.push(ExpirationCheck::new());
        }
        if self.license_checks.reading_order {
            chain.push(ReadingOrderCheck);
        }
        chain
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".abm").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge config file, environment, and defaults
fn resolve<E>(
    config: Option<(PathBuf, ConfigFile)>,
    env: E,
    default_home: PathBuf,
) -> ResolvedConfig
where
    E: Fn(&str) -> Option<String>,
{
    let (config_file, file) = match config {
        Some((path, file)) => (Some(path), Some(file)),
        None => (None, None),
    };
    let abm_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));

    let home = env("ABM_HOME").map(PathBuf::from).unwrap_or_else(|| {
        file.as_ref()
            .and_then(|f| f.paths.home.as_deref())
            .map(|p| resolve_path(abm_dir, p))
            .unwrap_or(default_home)
    });

    let cache_dir = env("ABM_CACHE_DIR").map(PathBuf::from).unwrap_or_else(|| {
        file.as_ref()
            .and_then(|f| f.paths.cache.as_deref())
            .map(|p| resolve_path(abm_dir, p))
            .unwrap_or_else(|| home.join("cache"))
    });

    let user_agent = env("ABM_USER_AGENT")
        .or_else(|| file.as_ref().and_then(|f| f.user_agent.clone()))
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    let http_timeout = file
        .as_ref()
        .and_then(|f| f.http.as_ref())
        .and_then(|h| h.timeout_seconds)
        .map(Duration::from_secs)
        .unwrap_or(crate::adapters::http::DEFAULT_TIMEOUT);

    let checks = file.as_ref().and_then(|f| f.license_checks.as_ref());
    let defaults = LicenseCheckSettings::default();
    let license_checks = LicenseCheckSettings {
        expiration: checks
            .and_then(|c| c.expiration)
            .unwrap_or(defaults.expiration),
        reading_order: checks
            .and_then(|c| c.reading_order)
            .unwrap_or(defaults.reading_order),
    };

    ResolvedConfig {
        home,
        cache_dir,
        user_agent,
        config_file,
        http_timeout,
        license_checks,
    }
}

/// Load configuration, discovering the config file from `start`
pub fn load_from(start: &Path) -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".abm");

    let config = match find_config_file(start) {
        Some(path) => {
            let file = load_config_file(&path)?;
            Some((path, file))
        }
        None => None,
    };

    Ok(resolve(config, |key| std::env::var(key).ok(), default_home))
}

/// Load configuration, discovering the config file from the current directory
pub fn load() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    load_from(&cwd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(None, no_env, PathBuf::from("/home/reader/.abm"));

        assert_eq!(config.home, PathBuf::from("/home/reader/.abm"));
        assert_eq!(config.cache_dir, PathBuf::from("/home/reader/.abm/cache"));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.license_checks, LicenseCheckSettings::default());
        assert!(config.config_file.is_none());
        assert_eq!(config.license_check_chain().names(), vec!["expiration", "reading_order"]);
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let abm_dir = temp.path().join(".abm");
        std::fs::create_dir_all(&abm_dir).unwrap();

        let config_path = abm_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
user_agent: "PalaceReader/1.0"
paths:
  cache: /var/cache/abm
http:
  timeout_seconds: 5
license_checks:
  expiration: false
"#
        )
        .unwrap();

        let nested = temp.path().join("books").join("flatland");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_config_file(&nested), Some(config_path.clone()));

        let parsed = load_config_file(&config_path).unwrap();
        let config = resolve(
            Some((config_path.clone(), parsed)),
            no_env,
            PathBuf::from("/home/reader/.abm"),
        );

        assert_eq!(config.user_agent, "PalaceReader/1.0");
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/abm"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert!(!config.license_checks.expiration);
        assert!(config.license_checks.reading_order);
        assert_eq!(config.license_check_chain().names(), vec!["reading_order"]);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_environment_overrides_file() {
        let file: ConfigFile = serde_yaml::from_str(
            r#"
version: "1.0"
user_agent: "FromFile/1.0"
paths:
  cache: /from/file
"#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [
            ("ABM_CACHE_DIR", "/from/env"),
            ("ABM_USER_AGENT", "FromEnv/2.0"),
        ]
        .into_iter()
        .collect();

        let config = resolve(
            Some((PathBuf::from("/project/.abm/config.yaml"), file)),
            |key| env.get(key).map(|v| v.to_string()),
            PathBuf::from("/home/reader/.abm"),
        );

        assert_eq!(config.cache_dir, PathBuf::from("/from/env"));
        assert_eq!(config.user_agent, "FromEnv/2.0");
        assert_eq!(config.home, PathBuf::from("/home/reader/.abm"));
    }

    #[test]
    fn test_home_override_moves_default_cache() {
        let file: ConfigFile = serde_yaml::from_str(
            r#"
version: "1.0"
paths:
  home: /from/file/home
"#,
        )
        .unwrap();
        let env = |key: &str| (key == "ABM_HOME").then(|| "/from/env/home".to_string());

        let config = resolve(
            Some((PathBuf::from("/project/.abm/config.yaml"), file)),
            env,
            PathBuf::from("/home/reader/.abm"),
        );

        assert_eq!(config.home, PathBuf::from("/from/env/home"));
        assert_eq!(config.cache_dir, PathBuf::from("/from/env/home/cache"));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
