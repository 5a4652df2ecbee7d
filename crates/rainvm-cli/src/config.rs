//! Configuration file parsing for rainvm.toml.

use num_bigint::BigUint;
use rainvm_bytecode::constant::uint;
use rainvm_expr::DEFAULT_RAISE_DURATION_SECS;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file names to search for
const CONFIG_NAMES: &[&str] = &["rainvm.toml", ".rainvmrc.toml"];

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Sale bundle settings
    #[serde(default)]
    pub sale: SaleConfig,
}

/// Parameters of the sale bundle.
#[derive(Debug, Deserialize)]
pub struct SaleConfig {
    /// Price per unit while under the wallet cap
    #[serde(default = "default_static_price", with = "uint")]
    pub static_price: BigUint,

    /// Most units one wallet may hold
    #[serde(default = "default_wallet_cap", with = "uint")]
    pub wallet_cap: BigUint,

    /// Unix timestamp the raise opens at (now when unset)
    pub start: Option<u64>,

    /// Raise length in seconds
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Open and close the sale unconditionally
    #[serde(default)]
    pub always: bool,
}

impl Default for SaleConfig {
    fn default() -> Self {
        Self {
            static_price: default_static_price(),
            wallet_cap: default_wallet_cap(),
            start: None,
            duration_secs: default_duration(),
            always: false,
        }
    }
}

fn default_static_price() -> BigUint {
    BigUint::from(100u32)
}

fn default_wallet_cap() -> BigUint {
    BigUint::from(10u32)
}

fn default_duration() -> u64 {
    DEFAULT_RAISE_DURATION_SECS
}

/// Load configuration from a file or search for default config files.
///
/// An explicit path must exist; a missing searched file falls back to defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path
        && !path.exists()
    {
        anyhow::bail!("config file {} does not exist", path.display());
    }

    match path.map(PathBuf::from).or_else(find_config_file) {
        Some(path) => {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

/// Search for a configuration file in the current directory and parent directories.
fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_ancestors(&cwd)
}

/// Search `start` and its ancestors for a config file.
fn find_config_in_ancestors(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        dir = current.parent();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sale.static_price, BigUint::from(100u32));
        assert_eq!(config.sale.wallet_cap, BigUint::from(10u32));
        assert_eq!(config.sale.duration_secs, 1800);
        assert!(config.sale.start.is_none());
        assert!(!config.sale.always);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[sale]
static_price = "1000000000000000000"
wallet_cap = 50
start = 1700000000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.sale.static_price,
            BigUint::from(1_000_000_000_000_000_000u64)
        );
        assert_eq!(config.sale.wallet_cap, BigUint::from(50u32));
        assert_eq!(config.sale.start, Some(1_700_000_000));
        assert_eq!(config.sale.duration_secs, 1800);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[sale]\nalways = true\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert!(config.sale.always);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rainvm.toml");
        std::fs::write(&path, "[sale]\nduration_secs = \"soon\"\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("rainvm.toml"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_find_config_in_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(".rainvmrc.toml"), "").unwrap();

        let found = find_config_in_ancestors(&nested).unwrap();
        assert_eq!(found, dir.path().join(".rainvmrc.toml"));
    }
}
