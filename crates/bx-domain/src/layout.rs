use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::AppDescriptor;
use crate::host::Interpreter;

/// Where a packaging run keeps its files on the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLayout {
    pub base_path: PathBuf,
    pub platform: String,
    pub data_path: PathBuf,
}

impl ProjectLayout {
    pub fn new(
        base_path: impl Into<PathBuf>,
        platform: impl Into<String>,
        data_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_path: base_path.into(),
            platform: platform.into(),
            data_path: data_path.into(),
        }
    }

    /// Root of all build output for the platform.
    #[must_use]
    pub fn platform_path(&self) -> PathBuf {
        self.base_path.join(&self.platform)
    }

    #[must_use]
    pub fn bundle_path(&self, app: &AppDescriptor) -> PathBuf {
        self.platform_path().join(&app.app_name)
    }

    #[must_use]
    pub fn dockerfile(&self, app: &AppDescriptor) -> PathBuf {
        self.bundle_path(app).join("Dockerfile")
    }

    /// Build context for the app's image: the directory holding its first
    /// source package. Apps without sources build from the project root.
    #[must_use]
    pub fn source_context(&self, app: &AppDescriptor) -> PathBuf {
        let Some(source) = app.sources.first() else {
            return self.base_path.clone();
        };
        let mut segments: Vec<&str> = source.split('/').collect();
        segments.pop();
        segments
            .into_iter()
            .filter(|segment| !segment.is_empty())
            .fold(self.base_path.clone(), |acc, segment| acc.join(segment))
    }

    #[must_use]
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }
}

/// Deterministic image tag for an app, stable across runs so images are reused.
#[must_use]
pub fn image_tag(namespace: &str, app: &AppDescriptor, interpreter: &Interpreter) -> String {
    format!(
        "{namespace}/{}.{}:{}",
        app.bundle,
        app.app_name.to_lowercase(),
        interpreter.image_tag_suffix()
    )
}
