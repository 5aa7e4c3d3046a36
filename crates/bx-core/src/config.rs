use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENGINE: &str = "docker";
pub const DEFAULT_IMAGE_NAMESPACE: &str = "bx";
pub const DEFAULT_PYTHON: &str = "python3";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
}

impl GlobalOptions {
    /// Console verbosity: quiet silences, each `-v` adds a level above normal.
    #[must_use]
    pub fn console_verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            crate::console::VERBOSITY_NORMAL.saturating_add(self.verbose)
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) engine: String,
    pub(crate) data_path: PathBuf,
    pub(crate) image_namespace: String,
    pub(crate) python: String,
    pub(crate) progress: Option<bool>,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if no data directory is configured and none can be derived.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> anyhow::Result<Self> {
        let data_path = match snapshot.var("BX_DATA_DIR") {
            Some(path) => PathBuf::from(path),
            None => dirs_next::cache_dir()
                .map(|cache| cache.join("bx"))
                .ok_or_else(|| anyhow!("unable to determine the bx data directory"))?,
        };
        Ok(Self {
            engine: snapshot
                .var("BX_CONTAINER_ENGINE")
                .unwrap_or(DEFAULT_ENGINE)
                .trim()
                .to_string(),
            data_path,
            image_namespace: snapshot
                .var("BX_IMAGE_NAMESPACE")
                .unwrap_or(DEFAULT_IMAGE_NAMESPACE)
                .to_string(),
            python: snapshot.var("BX_PYTHON").unwrap_or(DEFAULT_PYTHON).to_string(),
            progress: snapshot.var("BX_PROGRESS").map(|value| value != "0"),
        })
    }

    /// Configuration with explicit values, bypassing the environment.
    pub fn new(engine: impl Into<String>, data_path: impl Into<PathBuf>) -> Self {
        Self {
            engine: engine.into(),
            data_path: data_path.into(),
            image_namespace: DEFAULT_IMAGE_NAMESPACE.to_string(),
            python: DEFAULT_PYTHON.to_string(),
            progress: Some(false),
        }
    }

    /// Program used to drive containers.
    ///
    /// Must speak the Docker CLI: `--version` has to print `Docker version N...`
    /// and the remediation links point at Docker's documentation. Use this to
    /// select a particular `docker` binary, not a different engine.
    #[must_use]
    pub fn engine(&self) -> &str {
        &self.engine
    }

    #[must_use]
    pub fn data_path(&self) -> &PathBuf {
        &self.data_path
    }

    #[must_use]
    pub fn image_namespace(&self) -> &str {
        &self.image_namespace
    }

    /// Interpreter whose version tags the app images.
    #[must_use]
    pub fn python(&self) -> &str {
        &self.python
    }

    /// Explicit progress preference; `None` defers to terminal detection.
    #[must_use]
    pub fn progress(&self) -> Option<bool> {
        self.progress
    }
}
