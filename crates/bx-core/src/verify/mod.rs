//! Gate checks run before a tool is used.
//!
//! Each verifier either hands back a ready-to-use handle or a classified
//! [`ToolError`](crate::errors::ToolError). Results live for one command run.

use bx_domain::HostOs;

use crate::config::Config;
use crate::console::Console;
use crate::process::ProcessRunner;

mod engine;
mod helper;

pub use engine::{
    classify_probe_failure, verify_container_engine, ContainerEngine, ProbeFailure,
    PROBE_FAILURE_MARKERS,
};
pub use helper::HelperTool;

/// Everything a verifier needs from the running command.
///
/// Carries the host OS only; verifiers never need the host interpreter.
#[derive(Clone, Debug)]
pub struct ToolContext {
    pub console: Console,
    pub runner: ProcessRunner,
    pub os: HostOs,
    pub config: Config,
}

impl ToolContext {
    /// The host OS is taken from the runner.
    #[must_use]
    pub fn new(config: Config, runner: ProcessRunner) -> Self {
        Self {
            console: runner.console().clone(),
            os: runner.host_os().clone(),
            runner,
            config,
        }
    }

    #[must_use]
    pub fn tools_path(&self) -> std::path::PathBuf {
        self.config.data_path().join("tools")
    }
}
