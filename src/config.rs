use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::logging::STAMP_CONFIG;

/// Token in `dest` replaced by the current date.
pub const DATE_TOKEN: &str = "{DATE}";

/// One `[search, draw, xOffset, yOffset]` entry of `writes`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WriteInstruction(pub String, pub String, pub f32, pub f32);

impl WriteInstruction {
    pub fn new(search: impl Into<String>, draw: impl Into<String>, x: f32, y: f32) -> Self {
        WriteInstruction(search.into(), draw.into(), x, y)
    }

    /// Text to locate on the page.
    pub fn search(&self) -> &str {
        &self.0
    }

    /// Text drawn at the located position.
    pub fn draw(&self) -> &str {
        &self.1
    }

    pub fn offset(&self) -> (f32, f32) {
        (self.2, self.3)
    }
}

/// Stamping run configuration, read from JSON.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    pub src: PathBuf,
    pub dest: String,
    pub font_size: f32,
    pub writes: Vec<WriteInstruction>,
    /// 1-based page searched and drawn on.
    #[serde(default = "default_page")]
    pub page: u32,
    /// RGB components in `0..=1`.
    #[serde(default = "default_color")]
    pub color: [f32; 3],
}

fn default_page() -> u32 {
    1
}

fn default_color() -> [f32; 3] {
    [0.0, 0.0, 1.0]
}

impl Config {
    /// Reads, parses and validates the config at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(target: STAMP_CONFIG, path = %path.display(), "read config");
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field and reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();

        if self.src.as_os_str().is_empty() {
            issues.push("src: must not be empty".to_string());
        }
        if self.dest.is_empty() {
            issues.push("dest: must not be empty".to_string());
        }
        if !(self.font_size >= 1.0) {
            issues.push(format!(
                "fontSize: must be at least 1, got {}",
                self.font_size
            ));
        }
        if self.page < 1 {
            issues.push("page: must be at least 1".to_string());
        }
        for (i, component) in self.color.iter().enumerate() {
            if !(0.0..=1.0).contains(component) {
                issues.push(format!(
                    "color.{i}: must be between 0 and 1, got {component}"
                ));
            }
        }
        for (i, write) in self.writes.iter().enumerate() {
            if write.search().is_empty() {
                issues.push(format!("writes.{i}.0: search text must not be empty"));
            }
            if write.draw().is_empty() {
                issues.push(format!("writes.{i}.1: draw text must not be empty"));
            }
            let (x, y) = write.offset();
            if !x.is_finite() {
                issues.push(format!("writes.{i}.2: x offset must be a finite number"));
            }
            if !y.is_finite() {
                issues.push(format!("writes.{i}.3: y offset must be a finite number"));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }
}
