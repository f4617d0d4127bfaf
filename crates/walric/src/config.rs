use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use snafu::{ResultExt as _, Snafu};
use tracing::debug;
use walric_gather::GatherOptions;
use walric_gather::source::TimeWindow;

use crate::LOG_TARGET;
use crate::cli::PROJECT_DIRS;

pub const CONFIG_FILE_NAME: &str = "walric.toml";
const DEFAULT_USER_AGENT: &str = concat!("walric/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read {}", path.display()))]
    Read { path: PathBuf, source: io::Error },
    #[snafu(display("Invalid configuration in {}", path.display()))]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reddit: RedditConfig,
    pub walric: WalricConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub user_agent: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalricConfig {
    pub data_dir: Option<PathBuf>,
    pub submission_limit: u32,
    pub time_filter: TimeWindow,
    pub subreddits: Vec<String>,
    pub workers: usize,
}

impl Default for WalricConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            submission_limit: 20,
            time_filter: TimeWindow::default(),
            subreddits: vec![],
            workers: GatherOptions::DEFAULT_WORKERS,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PROJECT_DIRS.config_dir().join(CONFIG_FILE_NAME)
}

impl Config {
    /// Load `path`, or the default location if `None`
    ///
    /// Only a missing file at the default location falls back to defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_owned(), true),
            None => (default_config_path(), false),
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if !explicit && err.kind() == io::ErrorKind::NotFound => {
                debug!(target: LOG_TARGET, path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        let config = toml::from_str(&content).context(ParseSnafu { path: &path })?;
        debug!(target: LOG_TARGET, path = %path.display(), "Loaded config");
        Ok(config)
    }
}
