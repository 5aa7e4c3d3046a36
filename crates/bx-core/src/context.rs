use crate::container::ContainerAdapter;
use crate::process::{Captured, Invocation, ProcessError, ProcessRunner};

/// Something that can run an [`Invocation`]: the host itself or a container.
pub trait Execute {
    /// # Errors
    /// Spawn failures, and non-zero exits when the invocation asks for a check.
    fn run(&self, invocation: &Invocation) -> Result<i32, ProcessError>;

    /// # Errors
    /// Spawn failures and non-zero exits.
    fn check_output(&self, invocation: &Invocation) -> Result<Captured, ProcessError>;
}

impl Execute for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<i32, ProcessError> {
        ProcessRunner::run(self, invocation)
    }

    fn check_output(&self, invocation: &Invocation) -> Result<Captured, ProcessError> {
        ProcessRunner::check_output(self, invocation)
    }
}

impl Execute for ContainerAdapter {
    fn run(&self, invocation: &Invocation) -> Result<i32, ProcessError> {
        ContainerAdapter::run(self, invocation)
    }

    fn check_output(&self, invocation: &Invocation) -> Result<Captured, ProcessError> {
        ContainerAdapter::check_output(self, invocation)
    }
}

/// Where an app's commands run for the lifetime of one command.
#[derive(Clone, Debug)]
pub enum ExecutionContext {
    Local(ProcessRunner),
    Containerized(ContainerAdapter),
}

impl ExecutionContext {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Containerized(_) => "container",
        }
    }
}

impl Execute for ExecutionContext {
    fn run(&self, invocation: &Invocation) -> Result<i32, ProcessError> {
        match self {
            Self::Local(runner) => runner.run(invocation),
            Self::Containerized(adapter) => adapter.run(invocation),
        }
    }

    fn check_output(&self, invocation: &Invocation) -> Result<Captured, ProcessError> {
        match self {
            Self::Local(runner) => runner.check_output(invocation),
            Self::Containerized(adapter) => adapter.check_output(invocation),
        }
    }
}
