use std::path::{Path, PathBuf};

use led_lut::emit::DEFAULT_VALUES_PER_LINE;
use led_lut::parse::DEFAULT_TAG;
use led_lut::solve::DEFAULT_STEPS;
use led_lut::sync::DEFAULT_MAX_CURRENT;
use led_lut::{Calibrator, PwmMode, SolveOptions, SyncOptions};
use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "LEDCAL_CONFIG";

/// Pipeline configuration loaded from a YAML file.
///
/// Every section is optional. The rig thresholds have no defaults and are
/// only checked when a stage needs them.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub red: RedConfig,

    #[serde(default)]
    pub solve: SolveConfig,

    #[serde(default)]
    pub emit: EmitConfig,
}

/// Log parser settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Sensor tag in front of the channel fields
    #[serde(default = "default_tag")]
    pub tag: String,
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { tag: default_tag() }
    }
}

/// Stream synchronizer settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// All four channels below this mark a black sample
    pub black_threshold: Option<f64>,

    /// Green reading that marks the first green block
    pub green_trigger_threshold: Option<f64>,

    #[serde(default = "default_max_current")]
    pub max_current: u32,

    /// Fail instead of stopping at a series cut off by the end of the log
    #[serde(default)]
    pub abort_on_truncated_series: bool,
}

fn default_max_current() -> u32 {
    DEFAULT_MAX_CURRENT
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            black_threshold: None,
            green_trigger_threshold: None,
            max_current: default_max_current(),
            abort_on_truncated_series: false,
        }
    }
}

/// Red extrapolation settings
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RedConfig {
    /// First red reading above this anchors the extrapolation
    pub threshold: Option<f64>,
}

/// Solver settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SolveConfig {
    #[serde(default = "default_steps")]
    pub steps: usize,

    /// `luminance` or `current`
    #[serde(default = "default_pwm_mode")]
    pub pwm_mode: String,
}

fn default_steps() -> usize {
    DEFAULT_STEPS
}

fn default_pwm_mode() -> String {
    PwmMode::default().to_string()
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            pwm_mode: default_pwm_mode(),
        }
    }
}

/// C emitter settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EmitConfig {
    #[serde(default = "default_values_per_line")]
    pub values_per_line: usize,
}

fn default_values_per_line() -> usize {
    DEFAULT_VALUES_PER_LINE
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            values_per_line: default_values_per_line(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from the file named by
    /// `LEDCAL_CONFIG` when no path is given.
    ///
    /// With neither, the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::load_file(&path),
            None => {
                tracing::debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a YAML file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn black_threshold(&self) -> Result<f64, ConfigError> {
        finite("sync.black_threshold", self.sync.black_threshold)
    }

    pub fn green_trigger_threshold(&self) -> Result<f64, ConfigError> {
        finite(
            "sync.green_trigger_threshold",
            self.sync.green_trigger_threshold,
        )
    }

    pub fn red_threshold(&self) -> Result<f64, ConfigError> {
        finite("red.threshold", self.red.threshold)
    }

    pub fn sync_options(&self) -> Result<SyncOptions, ConfigError> {
        Ok(
            SyncOptions::new(self.black_threshold()?, self.green_trigger_threshold()?)
                .max_current(self.sync.max_current),
        )
    }

    pub fn pwm_mode(&self) -> Result<PwmMode, ConfigError> {
        self.solve
            .pwm_mode
            .parse::<PwmMode>()
            .map_err(|e| ConfigError::Invalid {
                key: "solve.pwm_mode",
                message: e.to_string(),
            })
    }

    pub fn solve_options(&self) -> Result<SolveOptions, ConfigError> {
        if self.solve.steps == 0 {
            return Err(ConfigError::Invalid {
                key: "solve.steps",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(SolveOptions::new()
            .steps(self.solve.steps)
            .pwm_mode(self.pwm_mode()?))
    }

    pub fn values_per_line(&self) -> Result<usize, ConfigError> {
        if self.emit.values_per_line == 0 {
            return Err(ConfigError::Invalid {
                key: "emit.values_per_line",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(self.emit.values_per_line)
    }

    /// Calibrator covering every stage up to the solved table.
    pub fn calibrator(&self) -> Result<Calibrator, ConfigError> {
        let solve = self.solve_options()?;
        Ok(Calibrator::new(self.sync_options()?, self.red_threshold()?)
            .log_tag(&self.log.tag)
            .steps(solve.steps)
            .pwm_mode(solve.pwm_mode)
            .strict_series(self.sync.abort_on_truncated_series))
    }
}

fn finite(key: &'static str, value: Option<f64>) -> Result<f64, ConfigError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(ConfigError::Invalid {
            key,
            message: format!("{v} is not a finite number"),
        }),
        None => Err(ConfigError::Missing(key)),
    }
}
