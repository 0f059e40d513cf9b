//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the path given with `-f`), then applies `CLUSTER_API_BIND`,
//! `CLUSTER_API_LOG_LEVEL` and `CLUSTER_API_MODELS_DIR` env overrides.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Locations of the two fitted artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelsConfig {
    /// Directory holding the artifacts (already expanded, no `~`).
    pub dir: PathBuf,
    /// File name of the serialized clusterer, relative to `dir`.
    pub kmeans: String,
    /// File name of the serialized preprocessor, relative to `dir`.
    pub preprocessor: String,
}

impl ModelsConfig {
    pub fn kmeans_path(&self) -> PathBuf {
        self.dir.join(&self.kmeans)
    }

    pub fn preprocessor_path(&self) -> PathBuf {
        self.dir.join(&self.preprocessor)
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(default_models_dir()),
            kmeans: default_kmeans_file(),
            preprocessor: default_preprocessor_file(),
        }
    }
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    /// Socket address the HTTP listener binds to.
    pub bind: String,
    pub log_level: String,
    pub models: ModelsConfig,
}

/// Env-var overrides applied on top of the TOML file.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides<'a> {
    pub bind: Option<&'a str>,
    pub log_level: Option<&'a str>,
    pub models_dir: Option<&'a str>,
}

/// Raw TOML shape, the `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    service: RawService,
    #[serde(default)]
    models: RawModels,
}

#[derive(Deserialize)]
struct RawService {
    #[serde(default = "default_service_name")]
    name: String,
    #[serde(default = "default_bind")]
    bind: String,
    log_level: String,
}

#[derive(Deserialize)]
struct RawModels {
    #[serde(default = "default_models_dir")]
    dir: String,
    #[serde(default = "default_kmeans_file")]
    kmeans: String,
    #[serde(default = "default_preprocessor_file")]
    preprocessor: String,
}

impl Default for RawModels {
    fn default() -> Self {
        Self {
            dir: default_models_dir(),
            kmeans: default_kmeans_file(),
            preprocessor: default_preprocessor_file(),
        }
    }
}

fn default_service_name() -> String { "kmeans-cluster-api".to_string() }
fn default_bind() -> String { "127.0.0.1:8000".to_string() }
fn default_models_dir() -> String { "models".to_string() }
fn default_kmeans_file() -> String { "kmeans_model.json".to_string() }
fn default_preprocessor_file() -> String { "preprocessor.json".to_string() }

/// Load config from `path` (or `config/default.toml`), then apply env-var
/// overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let bind = env::var("CLUSTER_API_BIND").ok();
    let log_level = env::var("CLUSTER_API_LOG_LEVEL").ok();
    let models_dir = env::var("CLUSTER_API_MODELS_DIR").ok();
    load_from(
        Path::new(path.unwrap_or(DEFAULT_CONFIG_PATH)),
        Overrides {
            bind: bind.as_deref(),
            log_level: log_level.as_deref(),
            models_dir: models_dir.as_deref(),
        },
    )
}

/// Internal loader: accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: Overrides<'_>) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let s = parsed.service;
    let m = parsed.models;

    let bind = overrides.bind.unwrap_or(&s.bind).to_string();
    if bind.trim().is_empty() {
        return Err(AppError::Config("service.bind must not be empty".into()));
    }

    let models_dir = overrides.models_dir.unwrap_or(&m.dir);

    Ok(Config {
        service_name: s.name,
        bind,
        log_level: overrides.log_level.unwrap_or(&s.log_level).to_string(),
        models: ModelsConfig {
            dir: expand_home(models_dir),
            kmeans: m.kmeans,
            preprocessor: m.preprocessor,
        },
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[service]
log_level = "info"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Overrides::default()).unwrap();
        assert_eq!(cfg.service_name, "kmeans-cluster-api");
        assert_eq!(cfg.bind, "127.0.0.1:8000");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.models, ModelsConfig::default());
        assert_eq!(cfg.models.kmeans_path(), PathBuf::from("models/kmeans_model.json"));
        assert_eq!(
            cfg.models.preprocessor_path(),
            PathBuf::from("models/preprocessor.json")
        );
    }

    #[test]
    fn full_config_parses() {
        let f = write_toml(
            r#"
[service]
name = "segmentation"
bind = "0.0.0.0:9000"
log_level = "debug"

[models]
dir = "/srv/models"
kmeans = "km.json"
preprocessor = "prep.json"
"#,
        );
        let cfg = load_from(f.path(), Overrides::default()).unwrap();
        assert_eq!(cfg.service_name, "segmentation");
        assert_eq!(cfg.bind, "0.0.0.0:9000");
        assert_eq!(cfg.models.kmeans_path(), PathBuf::from("/srv/models/km.json"));
        assert_eq!(cfg.models.preprocessor_path(), PathBuf::from("/srv/models/prep.json"));
    }

    #[test]
    fn overrides_win() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(
            f.path(),
            Overrides {
                bind: Some("127.0.0.1:0"),
                log_level: Some("trace"),
                models_dir: Some("/tmp/artifacts"),
            },
        )
        .unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:0");
        assert_eq!(cfg.log_level, "trace");
        assert_eq!(cfg.models.dir, PathBuf::from("/tmp/artifacts"));
    }

    #[test]
    fn missing_service_section_errors() {
        let f = write_toml("[models]\ndir = \"models\"\n");
        let msg = load_from(f.path(), Overrides::default()).unwrap_err().to_string();
        assert!(msg.contains("parse error"));
    }

    #[test]
    fn empty_bind_rejected() {
        let f = write_toml("[service]\nlog_level = \"info\"\nbind = \"  \"\n");
        assert!(load_from(f.path(), Overrides::default()).is_err());
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), Overrides::default());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/models");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with("models"));
    }

    #[test]
    fn relative_path_unchanged() {
        assert_eq!(expand_home("relative/path"), PathBuf::from("relative/path"));
    }

    #[test]
    fn shipped_default_config_loads() {
        let cfg = load_from(Path::new(DEFAULT_CONFIG_PATH), Overrides::default()).unwrap();
        assert_eq!(cfg.models, ModelsConfig::default());
    }
}
