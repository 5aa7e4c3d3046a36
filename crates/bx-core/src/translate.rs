//! Rewrites host-side values into their container-side equivalents.
//!
//! Matching is plain substring replacement, not path-segment aware: a host
//! path that happens to appear inside an unrelated value is rewritten too.

use std::path::{Path, PathBuf};

use bx_domain::{Interpreter, ProjectLayout};

/// Mount point of the platform build directory inside the container.
pub const CONTAINER_APP_PATH: &str = "/app";
/// Mount point of the tool's data directory inside the container.
pub const CONTAINER_DATA_PATH: &str = "/home/bx/.cache/bx";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathTranslator {
    interpreter: String,
    interpreter_token: String,
    platform_path: String,
    data_path: String,
}

impl PathTranslator {
    #[must_use]
    pub fn new(interpreter: &Interpreter, platform_path: &Path, data_path: &Path) -> Self {
        Self {
            interpreter: interpreter.executable.to_string_lossy().into_owned(),
            interpreter_token: interpreter.container_token(),
            platform_path: platform_path.to_string_lossy().into_owned(),
            data_path: data_path.to_string_lossy().into_owned(),
        }
    }

    #[must_use]
    pub fn for_layout(interpreter: &Interpreter, layout: &ProjectLayout) -> Self {
        Self::new(interpreter, &layout.platform_path(), layout.data_path())
    }

    /// Container-side equivalent of `value`.
    ///
    /// The interpreter path is replaced wholesale; otherwise every occurrence
    /// of the platform and data directories is rewritten, so composite values
    /// such as `PATH` can carry both.
    #[must_use]
    pub fn translate(&self, value: &str) -> String {
        if value == self.interpreter {
            return self.interpreter_token.clone();
        }
        let mut translated = replace_nonempty(value, &self.platform_path, CONTAINER_APP_PATH);
        translated = replace_nonempty(&translated, &self.data_path, CONTAINER_DATA_PATH);
        translated
    }

    #[must_use]
    pub fn platform_path(&self) -> PathBuf {
        PathBuf::from(&self.platform_path)
    }

    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_path)
    }
}

fn replace_nonempty(value: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        value.to_string()
    } else {
        value.replace(from, to)
    }
}
