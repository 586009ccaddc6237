//! Bridge configuration.
//!
//! TOML file, path taken from `TVLINK_CONFIG` or `./tvlink.toml`:
//!
//! ```toml
//! listen_port = 8123
//! keys_file = "/var/lib/tvlink/keys.json"
//!
//! [tvs.livingroom]
//! host = "192.168.0.10"
//! secure = true
//!
//! [tvs.bedroom]
//! host = "192.168.0.11"
//! enabled = false
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    #[serde(default = "default_keys_file")]
    pub keys_file: PathBuf,

    /// Managed TVs, keyed by the name used in gateway routes.
    #[serde(default)]
    pub tvs: HashMap<String, TvConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvConfig {
    pub host: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_listen_port() -> u16 {
    8123
}

fn default_keys_file() -> PathBuf {
    PathBuf::from("./keys.json")
}

fn default_true() -> bool {
    true
}

impl BridgeConfig {
    /// Loads and validates the configuration file.
    ///
    /// A config with no TVs is a startup error: the daemon would have
    /// nothing to do.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
        let config: BridgeConfig = toml::from_str(&content)?;
        if config.tvs.is_empty() {
            anyhow::bail!("no TVs configured in {}", path.display());
        }
        Ok(config)
    }
}

/// Configuration file path, honoring the `TVLINK_CONFIG` override.
pub fn config_path() -> PathBuf {
    std::env::var("TVLINK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./tvlink.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tvlink.toml");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn parse_full_config() {
        let (_tmp, path) = write_config(
            r#"
listen_port = 9000
keys_file = "/tmp/keys.json"

[tvs.livingroom]
host = "192.168.0.10"
secure = true

[tvs.bedroom]
host = "192.168.0.11"
enabled = false
"#,
        );
        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.listen_port, 9000);
        assert_eq!(config.keys_file, PathBuf::from("/tmp/keys.json"));
        assert!(config.tvs["livingroom"].secure);
        assert!(config.tvs["livingroom"].enabled);
        assert!(!config.tvs["bedroom"].enabled);
    }

    #[test]
    fn defaults_apply() {
        let (_tmp, path) = write_config(
            r#"
[tvs.tv]
host = "10.0.0.2"
"#,
        );
        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.listen_port, 8123);
        assert_eq!(config.keys_file, PathBuf::from("./keys.json"));
        assert!(!config.tvs["tv"].secure);
        assert!(config.tvs["tv"].enabled);
    }

    #[test]
    fn empty_config_is_an_error() {
        let (_tmp, path) = write_config("listen_port = 8123\n");
        assert!(BridgeConfig::load(&path).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(BridgeConfig::load(&tmp.path().join("nope.toml")).is_err());
    }
}
