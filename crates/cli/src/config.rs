//! Optional `config.toml`: default sources and report settings.
//!
//! Flags given on the command line override anything read here.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_TEMPLATE_URL: &str =
    "https://raw.githubusercontent.com/microsoft/mdatp-xplat/master/macos/mobileconfig/combined/mdatp.mobileconfig";
pub const DEFAULT_OVERRIDES: &str = "/Library/Application Support/com.apple.TCC/MDMOverrides.plist";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Read { path: PathBuf, message: String },
    Parse(String),
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "cannot read config {}: {message}", path.display()),
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    /// Local template; takes precedence over `template_url`.
    pub template: Option<PathBuf>,
    #[serde(default = "default_template_url")]
    pub template_url: String,
    /// Exported profiles; when unset the `profiles` command is run.
    pub profiles: Option<PathBuf>,
    #[serde(default = "default_overrides")]
    pub overrides: PathBuf,
    #[serde(default = "default_timeout")]
    pub download_timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            template: None,
            template_url: default_template_url(),
            profiles: None,
            overrides: default_overrides(),
            download_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn default_template_url() -> String {
    DEFAULT_TEMPLATE_URL.into()
}

fn default_overrides() -> PathBuf {
    PathBuf::from(DEFAULT_OVERRIDES)
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default)]
    pub color: ColorMode,
}

/// When to emit ANSI colour in the human report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl CheckConfig {
    /// `<config_dir>/mdmcheck/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mdmcheck")
            .join("config.toml")
    }

    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: CheckConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.sources.template_url;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "template_url must be an http(s) URL, got \"{url}\""
            )));
        }

        if self.sources.download_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "download_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Load an explicit config (must exist), or the default one if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = Self::default_path();
                if !path.exists() {
                    log::debug!("no config at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };

        log::debug!("reading config {}", path.display());
        let text = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Read { path: path.clone(), message: e.to_string() })?;
        Self::from_toml(&text)
    }
}
