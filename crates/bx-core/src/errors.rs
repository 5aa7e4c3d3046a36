use bx_domain::HostOs;
use serde_json::{json, Value};
use thiserror::Error;

use crate::outcome::InstallUserError;
use crate::process::ProcessError;

pub const MINIMUM_ENGINE_MAJOR: u32 = 19;
const BUG_REPORT_URL: &str = "https://github.com/bx-tools/bx/issues/new";

/// Terminal failures raised while verifying or preparing a tool.
///
/// The display text is the full message shown to the user, remediation included.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{}", engine_not_installed(.engine, .host))]
    NotInstalled { engine: String, host: HostOs },
    #[error("{}", engine_wrong_version(.engine, .detected, .host))]
    WrongVersion {
        engine: String,
        detected: String,
        host: HostOs,
    },
    #[error(
        "{engine} has been installed, but bx is unable to invoke {engine} commands.\n\
         It is possible that your user does not have permissions to invoke {engine}.\n\
         \n\
         See https://docs.docker.com/engine/install/linux-postinstall/\n\
         for details on configuring access to your {engine} installation."
    )]
    PermissionDenied {
        engine: String,
        #[source]
        source: ProcessError,
    },
    #[error(
        "bx is unable to use {engine} commands. It appears the {engine} daemon is not running.\n\
         \n\
         See https://docs.docker.com/config/daemon/ for details on how to\n\
         configure your {engine} daemon."
    )]
    DaemonUnreachable {
        engine: String,
        #[source]
        source: ProcessError,
    },
    #[error("bx was unable to use {engine} commands. Check your {engine} installation, and try again.")]
    GenericFailure {
        engine: String,
        #[source]
        source: ProcessError,
    },
    #[error("Error building {engine} image for {app}.")]
    ImageBuildFailed {
        engine: String,
        app: String,
        #[source]
        source: ProcessError,
    },
    #[error("Unable to locate {tool}. Has it been installed?")]
    MissingTool { tool: String },
    #[error("Unable to install {tool}.")]
    InstallFailed {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} plugin URL {url} does not name a plugin of the form {pattern}.")]
    InvalidPluginUrl {
        tool: String,
        url: String,
        pattern: String,
    },
    #[error("Unable to download {role}; is your computer offline?")]
    NetworkFailure {
        role: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(
        "bx was unable to determine the version of the Python interpreter `{program}`.\n\
         \n\
         Container images are tagged with the host's Python version. Set BX_PYTHON\n\
         to the path of a Python 3 interpreter, or use `bx run --local` to run the\n\
         command without a container."
    )]
    InterpreterUnavailable { program: String, reason: String },
}

impl ToolError {
    /// Stable identifier used in machine-readable output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInstalled { .. } => "BX101",
            Self::WrongVersion { .. } => "BX102",
            Self::PermissionDenied { .. } => "BX103",
            Self::DaemonUnreachable { .. } => "BX104",
            Self::GenericFailure { .. } => "BX105",
            Self::ImageBuildFailed { .. } => "BX106",
            Self::MissingTool { .. }
            | Self::InstallFailed { .. }
            | Self::InvalidPluginUrl { .. } => "BX107",
            Self::NetworkFailure { .. } => "BX108",
            Self::InterpreterUnavailable { .. } => "BX109",
        }
    }

    fn details(&self) -> Value {
        let mut details = json!({ "code": self.code() });
        let cause = match self {
            Self::PermissionDenied { source, .. }
            | Self::DaemonUnreachable { source, .. }
            | Self::GenericFailure { source, .. }
            | Self::ImageBuildFailed { source, .. } => Some(source.to_string()),
            Self::InstallFailed { source, .. } => Some(source.to_string()),
            Self::NetworkFailure { source, .. } => Some(format!("{source:#}")),
            Self::InterpreterUnavailable { reason, .. } => Some(reason.clone()),
            _ => None,
        };
        if let (Some(cause), Value::Object(map)) = (cause, &mut details) {
            map.insert("cause".into(), Value::String(cause));
        }
        details
    }
}

impl From<ToolError> for InstallUserError {
    fn from(err: ToolError) -> Self {
        let details = err.details();
        InstallUserError::new(err.to_string(), details)
    }
}

/// Non-fatal verification findings. Verification continues after reporting them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyWarning {
    VersionUndetermined { engine: String },
    InstallationStatusUnknown { engine: String },
}

impl VerifyWarning {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::VersionUndetermined { .. } => "version-undetermined",
            Self::InstallationStatusUnknown { .. } => "installation-status-unknown",
        }
    }

    #[must_use]
    pub fn banner(&self) -> String {
        let (headline, engine) = match self {
            Self::VersionUndetermined { engine } => {
                (format!("WARNING: Unable to determine the version of {engine}"), engine)
            }
            Self::InstallationStatusUnknown { engine } => {
                (format!("WARNING: Unable to determine if {engine} is installed"), engine)
            }
        };
        let rule = "*".repeat(73);
        format!(
            "\n{rule}\n** {headline:<67} **\n{rule}\n\n    \
             bx will proceed, assuming everything is OK. If you\n    \
             experience problems, this is almost certainly the cause of those\n    \
             problems.\n\n    \
             Please report this as a bug at:\n\n      \
             {BUG_REPORT_URL}\n\n    \
             In your report, please include the output from running:\n\n      \
             {engine} --version\n\n    \
             from the command prompt.\n\n{rule}"
        )
    }
}

/// Download page for the engine on this host.
#[must_use]
pub fn install_url(host: &HostOs) -> &'static str {
    match host {
        HostOs::Windows => "https://docs.docker.com/docker-for-windows/install/",
        HostOs::MacOs => "https://docs.docker.com/docker-for-mac/install/",
        HostOs::Linux | HostOs::Other(_) => "https://docs.docker.com/engine/install/#server",
    }
}

/// Extra guidance on hosts where running without containers is an option.
#[must_use]
pub fn native_fallback_hint(host: &HostOs) -> &'static str {
    if host.is_server_class() {
        "Alternatively, to run bx natively (i.e. without containers), use the\n\
         `--local` command-line argument.\n"
    } else {
        ""
    }
}

fn engine_not_installed(engine: &str, host: &HostOs) -> String {
    format!(
        "bx requires {engine}, but it is not installed (or is not on your PATH).\n\
         Visit:\n\n    {url}\n\n\
         to download and install {engine} manually.\n\
         {hint}\n\
         If you have installed {engine} recently and are still getting this error, you may\n\
         need to restart your terminal session.",
        url = install_url(host),
        hint = native_fallback_hint(host),
    )
}

fn engine_wrong_version(engine: &str, detected: &str, host: &HostOs) -> String {
    format!(
        "bx requires {engine} {MINIMUM_ENGINE_MAJOR} or higher, but you are currently running\n\
         version {detected}. Visit:\n\n    {url}\n\n\
         to download and install an updated version of {engine}.\n\
         {hint}",
        url = install_url(host),
        hint = native_fallback_hint(host),
    )
}
