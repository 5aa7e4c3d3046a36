use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Result;
use bx_domain::{AppDescriptor, HostInfo, Interpreter, ProjectLayout};
use serde_json::json;

use crate::config::{Config, GlobalOptions};
use crate::console::Console;
use crate::container::ContainerAdapter;
use crate::context::{ExecutionContext, Execute};
use crate::download::HttpDownloader;
use crate::errors::{ToolError, VerifyWarning};
use crate::outcome::{ExecutionOutcome, InstallUserError};
use crate::process::{Arg, Invocation, ProcessError, ProcessRunner, StderrMode};
use crate::verify::{verify_container_engine, ContainerEngine, HelperTool, ToolContext};

/// State shared by one command run.
///
/// The host interpreter and the container engine are probed at most once,
/// and only by commands that reach a container.
pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    tools: ToolContext,
    host: OnceLock<HostInfo>,
    engine: OnceLock<ContainerEngine>,
}

impl<'a> CommandContext<'a> {
    /// # Errors
    /// Returns an error if the configuration cannot be read from the environment.
    pub fn new(global: &'a GlobalOptions) -> Result<Self> {
        let config = Config::from_env()?;
        let verbosity = global.console_verbosity();
        let console = if global.json {
            Console::stderr(verbosity)
        } else {
            Console::stdout(verbosity)
        };
        let runner = ProcessRunner::system(console);
        Ok(Self::with_runner(global, config, runner))
    }

    #[must_use]
    pub fn with_runner(global: &'a GlobalOptions, config: Config, runner: ProcessRunner) -> Self {
        Self {
            global,
            tools: ToolContext::new(config.clone(), runner),
            config,
            host: OnceLock::new(),
            engine: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn runner(&self) -> &ProcessRunner {
        &self.tools.runner
    }

    #[must_use]
    pub fn tools(&self) -> &ToolContext {
        &self.tools
    }

    /// Host information, detecting the interpreter on first use.
    ///
    /// # Errors
    /// [`ToolError::InterpreterUnavailable`] if the configured interpreter
    /// cannot report its version.
    pub fn host(&self) -> Result<&HostInfo, ToolError> {
        if let Some(host) = self.host.get() {
            return Ok(host);
        }
        let interpreter = detect_interpreter(self.runner(), self.config.python())?;
        Ok(self.host.get_or_init(|| HostInfo::current(interpreter)))
    }

    /// The verified container engine for this run.
    ///
    /// # Errors
    /// The verification failure.
    pub fn container_engine(&self) -> Result<&ContainerEngine, ToolError> {
        if let Some(engine) = self.engine.get() {
            return Ok(engine);
        }
        let engine = verify_container_engine(&self.tools)?;
        Ok(self.engine.get_or_init(|| engine))
    }

    /// A verified engine's adapter for `target`, with the interpreter detected.
    fn container(&self, target: &AppTarget) -> Result<(ContainerAdapter, &HostInfo), ToolError> {
        let engine = self.container_engine()?;
        let host = self.host()?;
        let adapter = engine.adapter(&target.app, &self.layout(target), host);
        Ok((adapter, host))
    }

    fn layout(&self, target: &AppTarget) -> ProjectLayout {
        ProjectLayout::new(
            &target.base_path,
            &target.platform,
            self.config.data_path(),
        )
    }
}

/// Ask `program --version` for the `X.Y` tag used in image names.
fn detect_interpreter(runner: &ProcessRunner, program: &str) -> Result<Interpreter, ToolError> {
    let unavailable = |reason: String| ToolError::InterpreterUnavailable {
        program: program.to_string(),
        reason,
    };
    let executable = which::which(program).unwrap_or_else(|_| PathBuf::from(program));
    let output = runner
        .check_output(
            &Invocation::new([Arg::from(&executable), Arg::from("--version")])
                .stderr(StderrMode::MergeIntoStdout),
        )
        .map_err(|err| unavailable(err.to_string()))?
        .into_text();
    let trimmed = output.trim();
    let unexpected = || unavailable(format!("unexpected version output: {trimmed}"));
    let version = trimmed.strip_prefix("Python ").ok_or_else(unexpected)?;
    let mut parts = version.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) if !major.is_empty() && !minor.is_empty() => {
            Ok(Interpreter::new(executable, format!("{major}.{minor}")))
        }
        _ => Err(unexpected()),
    }
}

/// Which app, and where its build output lives.
#[derive(Clone, Debug)]
pub struct AppTarget {
    pub app: AppDescriptor,
    pub base_path: PathBuf,
    pub platform: String,
}

#[derive(Clone, Debug)]
pub struct RunRequest {
    pub target: AppTarget,
    pub local: bool,
    pub capture: bool,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    pub command: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct FetchToolRequest {
    pub tool: String,
    pub install: bool,
}

fn user_error(err: ToolError) -> ExecutionOutcome {
    InstallUserError::from(err).into()
}

/// `bx verify`: check the container engine.
///
/// # Errors
/// Unexpected failures that are not classified tool errors.
pub fn verify(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let engine = match ctx.container_engine() {
        Ok(engine) => engine,
        Err(err) => return Ok(user_error(err)),
    };
    let warnings: Vec<&str> = engine.warnings().iter().map(VerifyWarning::kind).collect();
    Ok(ExecutionOutcome::success(
        format!("{} is ready", engine.engine()),
        json!({
            "engine": engine.engine(),
            "version": engine.version(),
            "warnings": warnings,
        }),
    ))
}

/// `bx prepare`: verify the engine, then build the app's image.
///
/// # Errors
/// Unexpected failures that are not classified tool errors.
pub fn prepare(ctx: &CommandContext, target: &AppTarget) -> Result<ExecutionOutcome> {
    let (adapter, host) = match ctx.container(target) {
        Ok(container) => container,
        Err(err) => return Ok(user_error(err)),
    };
    if let Err(err) = adapter.prepare(&target.app, &ctx.layout(target), host) {
        return Ok(user_error(err));
    }
    Ok(ExecutionOutcome::success(
        format!("built {}", adapter.image_tag()),
        json!({ "image": adapter.image_tag(), "app": target.app.app_id() }),
    ))
}

/// `bx run`: run a command for an app, in its container unless `local` is set.
///
/// # Errors
/// Unexpected failures that are not classified tool errors.
pub fn run(ctx: &CommandContext, request: &RunRequest) -> Result<ExecutionOutcome> {
    let Some(program) = request.command.first() else {
        return Ok(ExecutionOutcome::user_error(
            "no command given",
            json!({ "hint": "pass the command after `--`" }),
        ));
    };
    let context = if request.local {
        ExecutionContext::Local(ctx.runner().clone())
    } else {
        match ctx.container(&request.target) {
            Ok((adapter, _)) => ExecutionContext::Containerized(adapter),
            Err(err) => return Ok(user_error(err)),
        }
    };

    let mut invocation = Invocation::new(&request.command);
    if !request.env.is_empty() {
        invocation = invocation.env(request.env.iter().cloned());
    }
    if let Some(cwd) = &request.cwd {
        invocation = invocation.cwd(cwd);
    }

    let app_name = &request.target.app.app_name;
    let details = |code: i32| {
        json!({
            "app": app_name,
            "context": context.label(),
            "exit_code": code,
        })
    };
    if request.capture {
        return match context.check_output(&invocation) {
            Ok(output) => {
                let mut payload = details(0);
                payload["passthrough"] = json!(true);
                Ok(ExecutionOutcome::success(output.into_text(), payload))
            }
            Err(err) => Ok(process_failure(app_name, program, err, details)),
        };
    }
    match context.run(&invocation) {
        Ok(0) => Ok(ExecutionOutcome::success(
            format!("{program} finished"),
            details(0),
        )),
        Ok(code) => Ok(ExecutionOutcome::failure(
            format!("{program} exited with status {code}"),
            details(code),
        )),
        Err(err) => Ok(process_failure(app_name, program, err, details)),
    }
}

fn process_failure(
    app_name: &str,
    program: &str,
    err: ProcessError,
    details: impl Fn(i32) -> serde_json::Value,
) -> ExecutionOutcome {
    match err {
        ProcessError::Spawn { .. } => ExecutionOutcome::user_error(
            format!("Unable to start {program} for {app_name}: {err}"),
            details(-1),
        ),
        ProcessError::Exit { code, .. } => {
            let mut payload = details(code);
            payload["output"] = json!(err.output_text());
            ExecutionOutcome::failure(format!("{program} exited with status {code}"), payload)
        }
    }
}

/// `bx fetch-tool`: make sure a helper binary is available.
///
/// # Errors
/// Unexpected failures that are not classified tool errors.
pub fn fetch_tool(ctx: &CommandContext, request: &FetchToolRequest) -> Result<ExecutionOutcome> {
    let tools = ctx.tools();
    let tools_path = tools.tools_path();
    let tool = match request.tool.as_str() {
        "rcedit" => HelperTool::rcedit(&tools_path),
        "linuxdeploy" => HelperTool::linuxdeploy(&tools_path, std::env::consts::ARCH),
        url => match HelperTool::from_url(&tools_path, url) {
            Ok(tool) => tool,
            Err(err) => return Ok(user_error(err)),
        },
    };
    match tool.verify(tools, request.install, &HttpDownloader) {
        Ok(tool) => Ok(ExecutionOutcome::success(
            format!("{} is available", tool.name()),
            json!({ "tool": tool.name(), "path": tool.path().display().to_string() }),
        )),
        Err(err) => Ok(user_error(err)),
    }
}
