// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "TRACKER_CONFIG";
pub const ENV_PORT: &str = "TRACKER_PORT";

pub const USAGE: &str = "\
usage: gtfs-rt-tracker [CONFIG]

Track GTFS-realtime vehicle position feeds and push snapshots to listeners.

CONFIG is a TOML or JSON file (default: config/tracker.toml, then
config/tracker.json; override with TRACKER_CONFIG). Example:

    minRefresh = 10        # global interval floor, seconds
    dynamicRefresh = true  # adapt intervals to observed feed changes
    port = 8080

    [[sources]]
    agency = \"Metro\"
    url = \"https://example.com/vehicle-positions.pb\"
    refreshRate = 15       # initial interval, seconds
    hue = 0.6              # map color, in (0,1); omitted = random

TRACKER_PORT overrides the configured port.";

fn default_agency() -> String {
    "Agency".to_string()
}

fn default_refresh_rate() -> u64 {
    15
}

fn default_min_refresh() -> u64 {
    10
}

fn default_dynamic_refresh() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    #[serde(default = "default_agency")]
    pub agency: String,
    pub url: String,
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: u64,
    #[serde(default)]
    pub hue: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub sources: Vec<SourceConfig>,
    #[serde(default = "default_min_refresh")]
    pub min_refresh: u64,
    #[serde(default = "default_dynamic_refresh")]
    pub dynamic_refresh: bool,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl AppConfig {
    /// Load from an explicit path. Format is sniffed from the extension,
    /// with the other format as a fallback.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, &ext)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Resolve the config path: CLI argument, then $TRACKER_CONFIG, then
    /// config/tracker.toml, then config/tracker.json.
    pub fn load(cli_path: Option<&str>) -> Result<Self> {
        if let Some(p) = cli_path {
            return Self::load_from(Path::new(p));
        }
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        for fallback in ["config/tracker.toml", "config/tracker.json"] {
            let pb = PathBuf::from(fallback);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Err(anyhow!("no config file given and no default found"))
    }

    /// Effective bind port, honoring the $TRACKER_PORT override.
    pub fn effective_port(&self) -> Result<u16> {
        match std::env::var(ENV_PORT) {
            Ok(v) => v
                .parse::<u16>()
                .with_context(|| format!("{ENV_PORT}={v} is not a valid port")),
            Err(_) => Ok(self.port),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(anyhow!("config lists no sources"));
        }
        for (i, s) in self.sources.iter().enumerate() {
            reqwest::Url::parse(&s.url)
                .with_context(|| format!("source {i} ({}): invalid url {:?}", s.agency, s.url))?;
            if s.refresh_rate == 0 {
                return Err(anyhow!("source {i} ({}): refreshRate must be > 0", s.agency));
            }
        }
        if self.min_refresh == 0 {
            return Err(anyhow!("minRefresh must be > 0"));
        }
        Ok(())
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    if hint_ext == "json" {
        if let Ok(cfg) = serde_json::from_str(s) {
            return Ok(cfg);
        }
    }
    match toml::from_str(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => {
            serde_json::from_str(s).map_err(|_| anyhow!(toml_err).context("unsupported config format"))
        }
    }
}
