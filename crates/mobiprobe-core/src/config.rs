//! Persistent configuration for mobiprobe.
//!
//! Stores user settings in `~/.mobiprobe/config.json`: where the Appium server
//! lives, the capabilities a session is created with, the application
//! namespace used to qualify resource ids, and the settle policy.
//!
//! # Example
//!
//! ```no_run
//! use mobiprobe_core::config::MobiprobeConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = MobiprobeConfig::load();
//! println!("Appium server: {}", config.server_url);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::wait::SettlePolicy;

const CONFIG_FILENAME: &str = "config.json";

/// Errors raised while loading or saving an explicitly named config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Returns the mobiprobe directory path (`~/.mobiprobe/`).
///
/// Creates the directory if it doesn't exist. Falls back to the system temp
/// directory when no home directory is known.
pub fn mobiprobe_dir() -> PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".mobiprobe");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Returns the logs directory path (`~/.mobiprobe/logs/`).
///
/// Creates the directory if it doesn't exist.
pub fn logs_dir() -> PathBuf {
    let dir = mobiprobe_dir().join("logs");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Session capabilities sent when the automation session is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub platform_name: String,
    pub automation_name: String,
    pub device_name: String,
    /// Seconds of inactivity before the server ends the session.
    pub new_command_timeout: u64,
    pub no_reset: bool,
    pub ensure_webviews_have_pages: bool,
    pub native_web_screenshot: bool,
    pub connect_hardware_keyboard: bool,
    /// Additional capabilities passed through verbatim (e.g. `appium:app`).
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            platform_name: "Android".to_string(),
            automation_name: "UiAutomator2".to_string(),
            device_name: "Android Emulator".to_string(),
            new_command_timeout: 300,
            no_reset: false,
            ensure_webviews_have_pages: true,
            native_web_screenshot: true,
            connect_hardware_keyboard: true,
            extra: Map::new(),
        }
    }
}

impl Capabilities {
    /// The W3C capability map, with vendor capabilities under the `appium:` prefix.
    pub fn to_w3c(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        caps.insert("platformName".into(), Value::from(self.platform_name.clone()));
        caps.insert("appium:automationName".into(), Value::from(self.automation_name.clone()));
        caps.insert("appium:deviceName".into(), Value::from(self.device_name.clone()));
        caps.insert("appium:newCommandTimeout".into(), Value::from(self.new_command_timeout));
        caps.insert("appium:noReset".into(), Value::from(self.no_reset));
        caps.insert(
            "appium:ensureWebviewsHavePages".into(),
            Value::from(self.ensure_webviews_have_pages),
        );
        caps.insert("appium:nativeWebScreenshot".into(), Value::from(self.native_web_screenshot));
        caps.insert(
            "appium:connectHardwareKeyboard".into(),
            Value::from(self.connect_hardware_keyboard),
        );
        for (k, v) in &self.extra {
            caps.insert(k.clone(), v.clone());
        }
        caps
    }
}

/// Persistent mobiprobe configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobiprobeConfig {
    /// Base URL of the Appium server.
    pub server_url: String,

    /// Application package used to qualify resource ids (`<namespace>:id/<id>`).
    pub namespace: String,

    /// Implicit wait applied to every element lookup, in milliseconds.
    pub implicit_wait_ms: u64,

    /// Per-request HTTP timeout, in milliseconds.
    pub http_timeout_ms: u64,

    /// Capture a screenshot when a step fails.
    pub capture_failures: bool,

    pub capabilities: Capabilities,

    pub settle: SettlePolicy,
}

impl Default for MobiprobeConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:4723".to_string(),
            namespace: "com.testapp1".to_string(),
            implicit_wait_ms: 10_000,
            http_timeout_ms: 60_000,
            capture_failures: false,
            capabilities: Capabilities::default(),
            settle: SettlePolicy::default(),
        }
    }
}

impl MobiprobeConfig {
    /// Path of the default config file.
    pub fn default_path() -> PathBuf {
        mobiprobe_dir().join(CONFIG_FILENAME)
    }

    /// Load config from `~/.mobiprobe/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        match Self::load_from(&Self::default_path()) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(error = %e, "using default config");
                Self::default()
            }
        }
    }

    /// Load config from an explicit path. Unlike [`load`](Self::load), a
    /// missing or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save config to `~/.mobiprobe/config.json`.
    pub fn save(&self) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(Self::default_path(), json)
    }
}
