pub mod commands;
pub mod config;
pub mod console;
pub mod container;
pub mod context;
pub mod download;
pub mod errors;
pub mod outcome;
pub mod process;
pub mod progress;
pub mod translate;
pub mod verify;

#[cfg(test)]
mod testing;

pub use commands::{AppTarget, CommandContext, FetchToolRequest, RunRequest};
pub use config::{Config, GlobalOptions};
pub use console::{Console, MemorySink, OutputSink};
pub use container::ContainerAdapter;
pub use context::{Execute, ExecutionContext};
pub use errors::{ToolError, VerifyWarning};
pub use outcome::{CommandStatus, ExecutionOutcome, InstallUserError};
pub use process::{Arg, Captured, Invocation, ProcessError, ProcessRunner, StderrMode};
pub use translate::PathTranslator;
pub use verify::{verify_container_engine, ContainerEngine, HelperTool, ToolContext};
