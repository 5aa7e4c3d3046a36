use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
    Other(String),
}

impl HostOs {
    #[must_use]
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    #[must_use]
    pub fn from_os_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "linux" => Self::Linux,
            "macos" | "darwin" => Self::MacOs,
            "windows" => Self::Windows,
            other => Self::Other(other.to_string()),
        }
    }

    /// Hosts without a desktop container runtime, where running the tools
    /// natively is a reasonable alternative to containers.
    #[must_use]
    pub fn is_server_class(&self) -> bool {
        matches!(self, Self::Linux | Self::Other(_))
    }

    /// The host lacks POSIX sessions and needs creation flags instead.
    #[must_use]
    pub fn uses_creation_flags(&self) -> bool {
        matches!(self, Self::Windows)
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Linux => "Linux",
            Self::MacOs => "Darwin",
            Self::Windows => "Windows",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The host's language interpreter, as seen from the packaging tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpreter {
    pub executable: PathBuf,
    pub name: String,
    pub version_tag: String,
}

impl Interpreter {
    pub fn new(executable: impl Into<PathBuf>, version_tag: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            name: "python".to_string(),
            version_tag: version_tag.into(),
        }
    }

    /// Interpreter name inside a container, e.g. `python3.11`.
    #[must_use]
    pub fn container_token(&self) -> String {
        format!("{}{}", self.name, self.version_tag)
    }

    #[must_use]
    pub fn image_tag_suffix(&self) -> String {
        format!("py{}", self.version_tag)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub os: HostOs,
    pub uid: u32,
    pub gid: u32,
    pub interpreter: Interpreter,
}

impl HostInfo {
    /// Host information for the running process.
    #[must_use]
    pub fn current(interpreter: Interpreter) -> Self {
        let (uid, gid) = current_ids();
        Self {
            os: HostOs::current(),
            uid,
            gid,
            interpreter,
        }
    }
}

#[cfg(unix)]
fn current_ids() -> (u32, u32) {
    // SAFETY: getuid/getgid cannot fail and touch no memory.
    unsafe { (libc::getuid(), libc::getgid()) }
}

#[cfg(not(unix))]
fn current_ids() -> (u32, u32) {
    (0, 0)
}
