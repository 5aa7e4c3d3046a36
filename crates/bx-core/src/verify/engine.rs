use bx_domain::{image_tag, AppDescriptor, HostInfo, ProjectLayout};

use super::ToolContext;
use crate::container::ContainerAdapter;
use crate::errors::{ToolError, VerifyWarning, MINIMUM_ENGINE_MAJOR};
use crate::process::{Invocation, ProcessError, ProcessRunner, StderrMode};
use crate::progress::progress_enabled;
use crate::translate::PathTranslator;

/// Only Docker-compatible engines are supported; anything else reports a
/// version this prefix won't match.
const VERSION_PREFIX: &str = "Docker version ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeFailure {
    PermissionDenied,
    DaemonUnreachable,
}

/// Output markers of a failed `info` probe, checked in order.
pub const PROBE_FAILURE_MARKERS: &[(&str, ProbeFailure)] = &[
    (
        "permission denied while trying to connect",
        ProbeFailure::PermissionDenied,
    ),
    ("Is the docker daemon running?", ProbeFailure::DaemonUnreachable),
    ("Is the daemon running?", ProbeFailure::DaemonUnreachable),
    ("connect: connection refused", ProbeFailure::DaemonUnreachable),
];

/// Map a failed capability probe onto the error the user sees.
#[must_use]
pub fn classify_probe_failure(engine: &str, source: ProcessError) -> ToolError {
    let output = source.output_text();
    let engine = engine.to_string();
    let matched = PROBE_FAILURE_MARKERS
        .iter()
        .find(|(marker, _)| output.contains(marker))
        .map(|(_, failure)| *failure);
    match matched {
        Some(ProbeFailure::PermissionDenied) => ToolError::PermissionDenied { engine, source },
        Some(ProbeFailure::DaemonUnreachable) => ToolError::DaemonUnreachable { engine, source },
        None => ToolError::GenericFailure { engine, source },
    }
}

/// A container engine that answered every probe.
#[derive(Clone, Debug)]
pub struct ContainerEngine {
    engine: String,
    version: Option<String>,
    warnings: Vec<VerifyWarning>,
    runner: ProcessRunner,
    image_namespace: String,
    progress: bool,
}

impl ContainerEngine {
    #[must_use]
    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// Version text after the product prefix, when it could be read.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    #[must_use]
    pub fn warnings(&self) -> &[VerifyWarning] {
        &self.warnings
    }

    /// Adapter that runs `app`'s commands in its container.
    ///
    /// The image is tagged with the host interpreter's version.
    #[must_use]
    pub fn adapter(
        &self,
        app: &AppDescriptor,
        layout: &ProjectLayout,
        host: &HostInfo,
    ) -> ContainerAdapter {
        let translator = PathTranslator::for_layout(&host.interpreter, layout);
        let tag = image_tag(&self.image_namespace, app, &host.interpreter);
        ContainerAdapter::new(self.engine.clone(), self.runner.clone(), translator, tag)
            .with_progress(self.progress)
    }
}

enum VersionProbe {
    Detected(String),
    Warned(VerifyWarning),
}

/// Confirm the configured container engine is installed, recent and usable.
///
/// Presence and version problems that leave room for doubt only warn; a
/// failing `info` probe is always fatal.
///
/// # Errors
/// The classified [`ToolError`] for the first fatal finding.
pub fn verify_container_engine(ctx: &ToolContext) -> Result<ContainerEngine, ToolError> {
    let engine = ctx.config.engine().to_string();
    tracing::debug!(%engine, "verifying container engine");

    let mut warnings = Vec::new();
    let version = match probe_version(ctx, &engine)? {
        VersionProbe::Detected(version) => Some(version),
        VersionProbe::Warned(warning) => {
            ctx.console.warning(&warning.banner());
            warnings.push(warning);
            None
        }
    };

    ctx.runner
        .check_output(&probe(&engine, "info"))
        .map_err(|err| match err {
            ProcessError::Exit { .. } => classify_probe_failure(&engine, err),
            ProcessError::Spawn { .. } => ToolError::GenericFailure {
                engine: engine.clone(),
                source: err,
            },
        })?;

    tracing::info!(%engine, version = version.as_deref().unwrap_or("unknown"), "container engine verified");
    Ok(ContainerEngine {
        engine,
        version,
        warnings,
        runner: ctx.runner.clone(),
        image_namespace: ctx.config.image_namespace().to_string(),
        progress: progress_enabled(ctx.config.progress()),
    })
}

fn probe(engine: &str, subcommand: &str) -> Invocation {
    Invocation::new([engine, subcommand]).stderr(StderrMode::MergeIntoStdout)
}

fn probe_version(ctx: &ToolContext, engine: &str) -> Result<VersionProbe, ToolError> {
    let output = match ctx.runner.check_output(&probe(engine, "--version")) {
        Ok(output) => output.into_text(),
        Err(err) if err.is_not_found() => {
            return Err(ToolError::NotInstalled {
                engine: engine.to_string(),
                host: ctx.os.clone(),
            })
        }
        Err(ProcessError::Exit { .. }) => {
            return Ok(VersionProbe::Warned(VerifyWarning::InstallationStatusUnknown {
                engine: engine.to_string(),
            }))
        }
        Err(err) => {
            return Err(ToolError::GenericFailure {
                engine: engine.to_string(),
                source: err,
            })
        }
    };

    let undetermined = || {
        VersionProbe::Warned(VerifyWarning::VersionUndetermined {
            engine: engine.to_string(),
        })
    };
    let Some(detected) = output.trim().strip_prefix(VERSION_PREFIX) else {
        return Ok(undetermined());
    };
    let Ok(major) = detected.split('.').next().unwrap_or_default().parse::<u32>() else {
        return Ok(undetermined());
    };
    if major < MINIMUM_ENGINE_MAJOR {
        return Err(ToolError::WrongVersion {
            engine: engine.to_string(),
            detected: detected.to_string(),
            host: ctx.os.clone(),
        });
    }
    Ok(VersionProbe::Detected(detected.to_string()))
}
