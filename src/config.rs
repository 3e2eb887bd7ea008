//! TOML-based pipeline configuration.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::data::{CleanOptions, Jurisdiction};
use crate::data::cleaner::{DEFAULT_GRACE_DAYS, MAX_GRACE_DAYS};

/// Top-level pipeline configuration parsed from TOML.
///
/// Every section has defaults matching the three-utility CSI layout. Load
/// from TOML with [`PipelineConfig::from_toml_file`] or use
/// [`PipelineConfig::csi_default`] for the built-in layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory relative input paths resolve against.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Receipt window around each jurisdiction's schedule.
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub regression: RegressionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Input files per jurisdiction.
    #[serde(default = "default_jurisdictions")]
    pub jurisdictions: Vec<JurisdictionConfig>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Receipt window parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    /// Days past the last cutoff a receipt date is still accepted (>= 0).
    pub grace_days: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            grace_days: DEFAULT_GRACE_DAYS,
        }
    }
}

/// Regression stage parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegressionConfig {
    /// First panel month used by the productivity models.
    pub min_month: NaiveDate,
    /// Run the regression stage at all.
    pub enabled: bool,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            min_month: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            enabled: true,
        }
    }
}

/// Output location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("out"),
        }
    }
}

/// Input files of one jurisdiction.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JurisdictionConfig {
    /// Jurisdiction code (`pge`, `sce`, `sdge`).
    pub code: Jurisdiction,
    /// Subsidy cutoff table.
    pub cutoffs: PathBuf,
    /// Interconnection application export.
    pub applications: PathBuf,
}

impl JurisdictionConfig {
    fn csi(code: &str, upper: &str) -> Self {
        Self {
            code: Jurisdiction::new(code),
            cutoffs: PathBuf::from(format!("cutoffs/{code}cutoffs.csv")),
            applications: PathBuf::from(format!(
                "Interconnected_Project_Sites_2021-09-30/{upper}_Interconnected_Project_Sites_2021-09-30.csv"
            )),
        }
    }
}

fn default_jurisdictions() -> Vec<JurisdictionConfig> {
    vec![
        JurisdictionConfig::csi("pge", "PGE"),
        JurisdictionConfig::csi("sce", "SCE"),
        JurisdictionConfig::csi("sdge", "SDGE"),
    ]
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"window.grace_days"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl PipelineConfig {
    /// Returns the three-utility CSI layout with default parameters.
    pub fn csi_default() -> Self {
        Self {
            data_dir: default_data_dir(),
            window: WindowConfig::default(),
            regression: RegressionConfig::default(),
            output: OutputConfig::default(),
            jurisdictions: default_jurisdictions(),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if !(0..=MAX_GRACE_DAYS).contains(&self.window.grace_days) {
            errors.push(ConfigError {
                field: "window.grace_days".into(),
                message: format!("must be in [0, {MAX_GRACE_DAYS}]"),
            });
        }
        if self.output.dir.as_os_str().is_empty() {
            errors.push(ConfigError {
                field: "output.dir".into(),
                message: "must not be empty".into(),
            });
        }
        if self.jurisdictions.is_empty() {
            errors.push(ConfigError {
                field: "jurisdictions".into(),
                message: "at least one jurisdiction is required".into(),
            });
        }

        let mut seen = HashSet::new();
        for (i, j) in self.jurisdictions.iter().enumerate() {
            if j.code.as_str().is_empty() {
                errors.push(ConfigError {
                    field: format!("jurisdictions[{i}].code"),
                    message: "must not be empty".into(),
                });
            } else if !seen.insert(&j.code) {
                errors.push(ConfigError {
                    field: format!("jurisdictions[{i}].code"),
                    message: format!("duplicate jurisdiction \"{}\"", j.code),
                });
            }
            if j.cutoffs.as_os_str().is_empty() {
                errors.push(ConfigError {
                    field: format!("jurisdictions[{i}].cutoffs"),
                    message: "must not be empty".into(),
                });
            }
            if j.applications.as_os_str().is_empty() {
                errors.push(ConfigError {
                    field: format!("jurisdictions[{i}].applications"),
                    message: "must not be empty".into(),
                });
            }
        }

        errors
    }

    /// Configured jurisdictions in declaration order.
    pub fn jurisdiction_codes(&self) -> Vec<Jurisdiction> {
        self.jurisdictions.iter().map(|j| j.code.clone()).collect()
    }

    /// Resolves `path` against `data_dir` unless it is absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    /// Cutoff table path per jurisdiction, resolved.
    pub fn cutoff_paths(&self) -> BTreeMap<Jurisdiction, PathBuf> {
        self.jurisdictions
            .iter()
            .map(|j| (j.code.clone(), self.resolve(&j.cutoffs)))
            .collect()
    }

    /// Application export path per jurisdiction, resolved.
    pub fn application_paths(&self) -> BTreeMap<Jurisdiction, PathBuf> {
        self.jurisdictions
            .iter()
            .map(|j| (j.code.clone(), self.resolve(&j.applications)))
            .collect()
    }

    pub fn clean_options(&self) -> CleanOptions {
        CleanOptions {
            grace_days: self.window.grace_days,
        }
    }
}
