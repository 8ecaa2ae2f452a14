use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use tally_core::Cadence;
use tally_extract::DEFAULT_PAYSTUB_OFFSET_DAYS;
use tally_import::{RetirementLayout, SourceLayouts};
use tally_rollover::{TrackingLayout, DEFAULT_MAX_PERIODS_PER_RUN};

pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// SQLite file backing the ledger workbook.
    pub workbook: PathBuf,
    /// Category catalog, JSON or TOML.
    pub categories: PathBuf,
    /// Directory of paystub text documents.
    pub paystubs: PathBuf,
    /// Directory of retirement statement exports.
    pub statements: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            workbook: PathBuf::from("tally.db"),
            categories: PathBuf::from("categories.json"),
            paystubs: PathBuf::from("paystubs"),
            statements: PathBuf::from("statements"),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloverSettings {
    pub interval_days: u32,
    pub max_periods_per_run: u64,
}

impl Default for RolloverSettings {
    fn default() -> Self {
        Self {
            interval_days: Cadence::default().days(),
            max_periods_per_run: DEFAULT_MAX_PERIODS_PER_RUN,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaystubSettings {
    /// Days from the start of a pay period to its pay date.
    pub offset_days: i64,
    /// File extension of the paystub text documents.
    pub extension: String,
}

impl Default for PaystubSettings {
    fn default() -> Self {
        Self {
            offset_days: DEFAULT_PAYSTUB_OFFSET_DAYS,
            extension: "txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub tracking: TrackingLayout,
    pub sources: SourceLayouts,
    pub retirement: RetirementLayout,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub rollover: RolloverSettings,
    pub paystub: PaystubSettings,
    pub layout: LayoutSettings,
}

impl Settings {
    /// Read settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.cadence()?;
        Ok(settings)
    }

    pub fn cadence(&self) -> Result<Cadence> {
        match Cadence::new(self.rollover.interval_days) {
            Some(cadence) => Ok(cadence),
            None => bail!("rollover.interval_days must be at least 1"),
        }
    }
}
