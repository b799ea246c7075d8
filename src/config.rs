use crate::site::data::{SiteGenParams, SourceMode};
use crate::site::rank::Identity;
use crate::site::report::DEFAULT_DECIMALS;
use crate::site::types::CoordinatePolicy;
use crate::site::viz::VizConfig;
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::process::Command;
use tracing::error;

pub fn load_pkl<T: DeserializeOwned>(config_path: impl AsRef<Path>) -> Result<T> {
    let config_path = config_path.as_ref();
    let output = Command::new("pkl")
        .arg("eval")
        .arg("-f")
        .arg("json")
        .arg(config_path)
        .output()
        .context("Failed to execute pkl command")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!("pkl failed: {}", stderr);
        return Err(anyhow!("pkl failed: {}", stderr));
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    let config: T = serde_json::from_str(&json_str).context("Failed to parse config json")?;
    Ok(config)
}

pub fn load_json<T: DeserializeOwned>(config_path: impl AsRef<Path>) -> Result<T> {
    let config_path = config_path.as_ref();
    let json_str = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config {}", config_path.display()))?;
    let config: T = serde_json::from_str(&json_str).context("Failed to parse config json")?;
    Ok(config)
}

/// Load a `.pkl` or `.json` configuration file.
pub fn load<T: DeserializeOwned>(config_path: impl AsRef<Path>) -> Result<T> {
    let config_path = config_path.as_ref();
    match config_path.extension().and_then(|e| e.to_str()) {
        Some("pkl") => load_pkl(config_path),
        Some("json") => load_json(config_path),
        _ => Err(crate::error::Error::ConfigurationError(format!(
            "unknown config format: {}",
            config_path.display()
        ))
        .into()),
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FileSourceConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
struct SiteSourceWrapper {
    mode: SourceMode,
    #[serde(default)]
    random: Option<SiteGenParams>,
    #[serde(default)]
    file: Option<FileSourceConfig>,
}

/// Where a site collection comes from
#[derive(Debug, Deserialize, Clone)]
#[serde(try_from = "SiteSourceWrapper")]
pub enum SiteSourceConfig {
    Random(SiteGenParams),
    File(FileSourceConfig),
}

impl TryFrom<SiteSourceWrapper> for SiteSourceConfig {
    type Error = crate::error::Error;

    fn try_from(w: SiteSourceWrapper) -> std::result::Result<Self, Self::Error> {
        match w.mode {
            SourceMode::Random => Ok(SiteSourceConfig::Random(w.random.unwrap_or(
                SiteGenParams {
                    count: 20,
                    ..Default::default()
                },
            ))),
            SourceMode::File => w.file.map(SiteSourceConfig::File).ok_or_else(|| {
                crate::error::Error::ConfigurationError(
                    "file mode requires a `file.path`".to_string(),
                )
            }),
        }
    }
}

impl Default for SiteSourceConfig {
    fn default() -> Self {
        SiteSourceConfig::Random(SiteGenParams {
            count: 20,
            ..Default::default()
        })
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    pub candidates: SiteSourceConfig,
    pub targets: SiteSourceConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RankConfig {
    pub k: usize,
    pub exclude_self: bool,
    pub identity: Identity,
    pub strict_coordinates: bool,
    /// Decimal places used when presenting distances
    pub decimals: u32,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            k: 5,
            exclude_self: true,
            identity: Identity::Id,
            strict_coordinates: false,
            decimals: DEFAULT_DECIMALS,
        }
    }
}

impl RankConfig {
    pub fn identity(&self) -> Identity {
        if self.exclude_self {
            self.identity
        } else {
            Identity::Disabled
        }
    }

    pub fn policy(&self) -> CoordinatePolicy {
        if self.strict_coordinates {
            CoordinatePolicy::Strict
        } else {
            CoordinatePolicy::Lenient
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub use_timestamp: bool,
    pub timestamp_fmt: String,
    pub csv_name: String,
    pub log_level: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "results".to_string(),
            use_timestamp: true,
            timestamp_fmt: "%Y-%m-%d_%H-%M-%S".to_string(),
            csv_name: "nearest_neighbors_result.csv".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct RunConfig {
    pub data: DataConfig,
    pub rank: RankConfig,
    pub output: OutputConfig,
    pub viz: VizConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: RunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.rank.k, 5);
        assert!(config.rank.exclude_self);
        assert_eq!(config.rank.decimals, 3);
        assert_eq!(config.output.csv_name, "nearest_neighbors_result.csv");
        assert!(matches!(config.data.candidates, SiteSourceConfig::Random(_)));
    }

    #[test]
    fn test_file_sources_and_identity() {
        let json = r#"{
            "data": {
                "candidates": {"mode": "file", "file": {"path": "all_sites.csv"}},
                "targets": {"mode": "random", "random": {"count": 3, "seed": 1}}
            },
            "rank": {"k": 2, "identity": {"mode": "coordinates", "tolerance_km": 0.05}}
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        match &config.data.candidates {
            SiteSourceConfig::File(f) => assert_eq!(f.path, "all_sites.csv"),
            other => panic!("unexpected source {:?}", other),
        }
        match &config.data.targets {
            SiteSourceConfig::Random(p) => assert_eq!(p.count, 3),
            other => panic!("unexpected source {:?}", other),
        }
        assert_eq!(
            config.rank.identity(),
            Identity::Coordinates { tolerance_km: 0.05 }
        );
    }

    #[test]
    fn test_file_mode_without_path_fails() {
        let json = r#"{"data": {"candidates": {"mode": "file"}}}"#;
        assert!(serde_json::from_str::<RunConfig>(json).is_err());
    }

    #[test]
    fn test_exclude_self_off_disables_identity() {
        let config = RankConfig {
            exclude_self: false,
            ..Default::default()
        };
        assert_eq!(config.identity(), Identity::Disabled);
        assert_eq!(config.policy(), CoordinatePolicy::Lenient);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        assert!(load::<RunConfig>("settings.yaml").is_err());
    }
}
