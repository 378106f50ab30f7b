//! Daemon configuration.
//!
//! The runtime's data root and storage driver can be set in its
//! `daemon.json`.  We read the two keys that change where the layer store
//! lives, so the checker looks at the same store the daemon uses:
//!
//! ```json
//! {
//!     "data-root": "/srv/docker",
//!     "storage-driver": "overlay2"
//! }
//! ```
//!
//! Values given on the command line take precedence over the file, which
//! takes precedence over the built-in defaults.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::store::{DEFAULT_DATA_ROOT, DEFAULT_GRAPH_DRIVER};

/// Where the daemon looks for its configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/docker/daemon.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unsupported storage driver {0:?}, only \"overlay2\" can be checked")]
    UnsupportedDriver(String),
}

/// The subset of `daemon.json` that matters for locating the layer store.
///
/// Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DaemonConfig {
    /// Root of persistent runtime state.
    #[serde(default)]
    pub data_root: Option<PathBuf>,

    /// Deprecated name for `data-root`.
    #[serde(default)]
    pub graph: Option<PathBuf>,

    #[serde(default)]
    pub storage_driver: Option<String>,
}

impl DaemonConfig {
    /// Parses configuration from JSON content.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Loads the configuration file at `path`.  A missing file yields the
    /// empty configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("no daemon configuration at {}", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_json(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The configured data root, preferring `data-root` over `graph`.
    pub fn data_root(&self) -> Option<&Path> {
        self.data_root.as_deref().or(self.graph.as_deref())
    }
}

/// Fully resolved settings for a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_root: PathBuf,
    pub graph_driver: String,
}

impl Settings {
    /// Combines a command line data root with the daemon configuration.
    ///
    /// Fails if the configured storage driver is one we can't check.
    pub fn resolve(data_root: Option<PathBuf>, config: &DaemonConfig) -> Result<Self, ConfigError> {
        let graph_driver = match config.storage_driver.as_deref() {
            None | Some("") | Some(DEFAULT_GRAPH_DRIVER) => DEFAULT_GRAPH_DRIVER.to_string(),
            Some(other) => return Err(ConfigError::UnsupportedDriver(other.to_string())),
        };
        let data_root = data_root
            .or_else(|| config.data_root().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_ROOT));

        Ok(Settings {
            data_root,
            graph_driver,
        })
    }
}
