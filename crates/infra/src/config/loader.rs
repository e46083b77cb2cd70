//! Configuration loader
//!
//! Loads sync configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file if one is present
//! 2. Attempts to load from environment variables
//! 3. If `PARTSPRO_DB_PATH` is unset, falls back to a config file
//! 4. Probes multiple paths for config files (JSON or TOML)
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `PARTSPRO_DB_PATH`: Database file path (required for env loading)
//! - `PARTSPRO_DB_POOL_SIZE`: Connection pool size
//! - `PARTSPRO_REMOTE_URL`: Base URL of the remote document store
//! - `PARTSPRO_REMOTE_TOKEN`: Bearer token for the remote store
//! - `PARTSPRO_PUSH_INTERVAL`: Seconds between push passes
//! - `PARTSPRO_PULL_INTERVAL`: Base pull interval in seconds
//! - `PARTSPRO_SYNC_ENABLED`: Whether push and pull run (true/false)
//!
//! ## File Locations
//! 1. `./config.{json,toml}` or `./partspro.{json,toml}`
//! 2. The same names one and two directories up
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};

use partspro_domain::{Config, PartsProError, Result};

const CONFIG_STEMS: &[&str] = &["config", "partspro"];
const CONFIG_EXTENSIONS: &[&str] = &["json", "toml"];

/// Load configuration, environment first and file second.
///
/// # Errors
/// Returns `PartsProError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "Could not read .env file"),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `PARTSPRO_*` environment variables.
///
/// Only `PARTSPRO_DB_PATH` is required; anything unset keeps its default.
///
/// # Errors
/// Returns `PartsProError::Config` if the path is missing or a value does
/// not parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var("PARTSPRO_DB_PATH")?;
    if let Some(pool_size) = env_parse::<u32>("PARTSPRO_DB_POOL_SIZE", "pool size")? {
        config.database.pool_size = pool_size;
    }

    config.remote.base_url = env_opt("PARTSPRO_REMOTE_URL");
    config.remote.api_token = env_opt("PARTSPRO_REMOTE_TOKEN");

    if let Some(interval) = env_parse::<u64>("PARTSPRO_PUSH_INTERVAL", "push interval")? {
        config.push.interval_secs = interval;
    }
    if let Some(base) = env_parse::<u64>("PARTSPRO_PULL_INTERVAL", "pull interval")? {
        let pull = &mut config.pull;
        pull.base_interval_secs = base;
        pull.min_interval_secs = pull.min_interval_secs.min(base);
        pull.max_interval_secs = pull.max_interval_secs.max(base);
    }

    let sync_enabled = env_bool("PARTSPRO_SYNC_ENABLED", true);
    config.push.enabled = sync_enabled;
    config.pull.enabled = sync_enabled;

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
/// Supports JSON and TOML (detected by file extension). Missing sections
/// and fields take their defaults.
///
/// # Errors
/// Returns `PartsProError::Config` if the file is missing, unparsable or
/// fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(PartsProError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            PartsProError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| PartsProError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration text; the format follows the file extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| PartsProError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| PartsProError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(PartsProError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// First existing config file in the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots.iter().flat_map(|root| candidates_under(root)).find(|path| path.exists())
}

fn candidates_under(root: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for dir in [root.to_path_buf(), root.join(".."), root.join("../..")] {
        for stem in CONFIG_STEMS {
            for ext in CONFIG_EXTENSIONS {
                paths.push(dir.join(format!("{stem}.{ext}")));
            }
        }
    }
    paths
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        PartsProError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Non-empty optional environment variable
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str, label: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| PartsProError::Config(format!("Invalid {}: {}", label, e)))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::TempDir;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ENV_KEYS: &[&str] = &[
        "PARTSPRO_DB_PATH",
        "PARTSPRO_DB_POOL_SIZE",
        "PARTSPRO_REMOTE_URL",
        "PARTSPRO_REMOTE_TOKEN",
        "PARTSPRO_PUSH_INTERVAL",
        "PARTSPRO_PULL_INTERVAL",
        "PARTSPRO_SYNC_ENABLED",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn write_config(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        for (key, value) in [("TEST_PP_BOOL_A", "1"), ("TEST_PP_BOOL_B", "On"), ("TEST_PP_BOOL_C", "YES")] {
            std::env::set_var(key, value);
            assert!(env_bool(key, false), "{value}");
            std::env::remove_var(key);
        }
        for (key, value) in [("TEST_PP_BOOL_D", "0"), ("TEST_PP_BOOL_E", "off"), ("TEST_PP_BOOL_F", "nope")] {
            std::env::set_var(key, value);
            assert!(!env_bool(key, true), "{value}");
            std::env::remove_var(key);
        }

        assert!(env_bool("TEST_PP_BOOL_MISSING", true));
        assert!(!env_bool("TEST_PP_BOOL_MISSING", false));
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("PARTSPRO_DB_PATH", "/tmp/partspro-test.db");
        std::env::set_var("PARTSPRO_DB_POOL_SIZE", "5");
        std::env::set_var("PARTSPRO_REMOTE_URL", "https://sync.example.com");
        std::env::set_var("PARTSPRO_REMOTE_TOKEN", "t0ken");
        std::env::set_var("PARTSPRO_PUSH_INTERVAL", "15");
        std::env::set_var("PARTSPRO_PULL_INTERVAL", "120");
        std::env::set_var("PARTSPRO_SYNC_ENABLED", "false");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config from env");
        assert_eq!(config.database.path, "/tmp/partspro-test.db");
        assert_eq!(config.database.pool_size, 5);
        assert_eq!(config.remote.base_url.as_deref(), Some("https://sync.example.com"));
        assert_eq!(config.remote.api_token.as_deref(), Some("t0ken"));
        assert_eq!(config.push.interval_secs, 15);
        assert_eq!(config.pull.base_interval_secs, 120);
        assert_eq!(config.pull.min_interval_secs, 120);
        assert!(!config.push.enabled);
        assert!(!config.pull.enabled);
    }

    #[test]
    fn test_load_from_env_defaults_optional_vars() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("PARTSPRO_DB_PATH", "local.db");

        let result = load_from_env();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.database.pool_size, Config::default().database.pool_size);
        assert!(config.remote.base_url.is_none());
        assert!(config.push.enabled);
    }

    #[test]
    fn test_load_from_env_missing_path() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();

        assert!(matches!(err, PartsProError::Config(msg) if msg.contains("PARTSPRO_DB_PATH")));
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("PARTSPRO_DB_PATH", "local.db");
        std::env::set_var("PARTSPRO_DB_POOL_SIZE", "not-a-number");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(PartsProError::Config(msg)) if msg.contains("pool size")));
    }

    #[test]
    fn test_load_from_env_rejects_invalid_remote() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("PARTSPRO_DB_PATH", "local.db");
        std::env::set_var("PARTSPRO_REMOTE_URL", "ftp://nope");

        let result = load_from_env();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file_json() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "config.json",
            r#"{
                "database": { "path": "test.db", "pool_size": 4 },
                "push": { "interval_secs": 20 },
                "pull": { "collections": ["products"] }
            }"#,
        );

        let config = load_from_file(Some(path)).unwrap();

        assert_eq!(config.database.path, "test.db");
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.push.interval_secs, 20);
        assert_eq!(config.push.item_delay_ms, 50);
        assert_eq!(config.pull.collections, vec!["products".to_string()]);
    }

    #[test]
    fn test_load_from_file_toml() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "partspro.toml",
            r#"
[database]
path = "test.db"
pool_size = 6

[remote]
base_url = "http://localhost:8080"

[pull]
enabled = false
base_interval_secs = 600
"#,
        );

        let config = load_from_file(Some(path)).unwrap();

        assert_eq!(config.database.pool_size, 6);
        assert_eq!(config.remote.base_url.as_deref(), Some("http://localhost:8080"));
        assert!(!config.pull.enabled);
        assert_eq!(config.pull.base_interval_secs, 600);
    }

    #[test]
    fn test_load_from_file_validates() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "config.toml", "[import]\nbatch_size = 0\n");

        let err = load_from_file(Some(path)).unwrap_err();

        assert!(matches!(err, PartsProError::Config(msg) if msg.contains("batch_size")));
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));

        assert!(matches!(result, Err(PartsProError::Config(_))));
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "config.json", r#"{ "this is": "not valid json" "#);

        assert!(load_from_file(Some(path)).is_err());
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", &PathBuf::from("test.yaml"));

        assert!(matches!(result, Err(PartsProError::Config(msg)) if msg.contains("yaml")));
    }

    #[test]
    fn test_candidates_cover_both_stems_and_parents() {
        let root = PathBuf::from("/srv/app");
        let candidates = candidates_under(&root);

        assert_eq!(candidates.len(), 12);
        assert_eq!(candidates[0], root.join("config.json"));
        assert!(candidates.contains(&root.join("../..").join("partspro.toml")));
    }
}
