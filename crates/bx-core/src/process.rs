use std::borrow::Cow;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use bx_domain::HostOs;
use indexmap::IndexMap;
use thiserror::Error;

use crate::console::Console;

/// Windows process creation flags used to emulate a POSIX session.
pub const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
pub const CREATE_NO_WINDOW: u32 = 0x0800_0000;
/// Flags that give the child its own console, contradicting `CREATE_NO_WINDOW`.
pub const DETACHED_PROCESS: u32 = 0x0000_0008;
pub const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

/// Environment variables layered on top of the inherited environment, in insertion order.
pub type EnvOverlay = IndexMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg {
    Text(String),
    Path(PathBuf),
}

impl Arg {
    /// Textual form handed to the OS; paths use the host's native encoding.
    #[must_use]
    pub fn normalize(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Path(path) => path.to_string_lossy().into_owned(),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<&Path> for Arg {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<PathBuf> for Arg {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&PathBuf> for Arg {
    fn from(value: &PathBuf) -> Self {
        Self::Path(value.clone())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StderrMode {
    #[default]
    Inherit,
    Capture,
    /// Captured stderr is appended to the captured stdout.
    MergeIntoStdout,
}

/// One request to run an external program.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    pub args: Vec<Arg>,
    pub cwd: Option<PathBuf>,
    pub env: Option<EnvOverlay>,
    /// `None` means text mode with UTF-8 decoding.
    pub text: Option<bool>,
    pub stderr: StderrMode,
    pub start_new_session: Option<bool>,
    pub creation_flags: Option<u32>,
    /// Treat a non-zero exit from `run` as an error.
    pub check: bool,
}

impl Invocation {
    pub fn new<I, A>(args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let overlay = self.env.get_or_insert_with(EnvOverlay::new);
        for (key, value) in vars {
            overlay.insert(key.into(), value.into());
        }
        self
    }

    #[must_use]
    pub fn text(mut self, text: bool) -> Self {
        self.text = Some(text);
        self
    }

    #[must_use]
    pub fn stderr(mut self, mode: StderrMode) -> Self {
        self.stderr = mode;
        self
    }

    #[must_use]
    pub fn start_new_session(mut self, detach: bool) -> Self {
        self.start_new_session = Some(detach);
        self
    }

    #[must_use]
    pub fn creation_flags(mut self, flags: u32) -> Self {
        self.creation_flags = Some(flags);
        self
    }

    #[must_use]
    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    #[must_use]
    pub fn text_mode(&self) -> bool {
        self.text.unwrap_or(true)
    }

    #[must_use]
    pub fn normalized_args(&self) -> Vec<String> {
        self.args.iter().map(Arg::normalize).collect()
    }

    /// Same options, different argument vector and environment.
    #[must_use]
    pub(crate) fn rewritten(&self, args: Vec<String>, env: Option<EnvOverlay>) -> Self {
        Self {
            args: args.into_iter().map(Arg::Text).collect(),
            env,
            ..self.clone()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpawnFlags {
    pub start_new_session: Option<bool>,
    pub creation_flags: Option<u32>,
}

/// Maps a "detach into its own session" request onto what the host supports.
///
/// POSIX hosts receive the request verbatim. Windows drops it and ORs
/// `CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW` into the caller's flags.
///
/// # Panics
/// On Windows, if a new session is requested while the caller's flags already
/// ask for a detached process or a new console.
#[must_use]
pub fn resolve_spawn_flags(
    start_new_session: Option<bool>,
    creation_flags: Option<u32>,
    host: &HostOs,
) -> SpawnFlags {
    if !host.uses_creation_flags() {
        return SpawnFlags {
            start_new_session,
            creation_flags,
        };
    }
    if start_new_session != Some(true) {
        return SpawnFlags {
            start_new_session: None,
            creation_flags,
        };
    }
    let existing = creation_flags.unwrap_or(0);
    assert!(
        existing & (DETACHED_PROCESS | CREATE_NEW_CONSOLE) == 0,
        "process invoked with creation flags {existing:#x} that conflict with start_new_session"
    );
    SpawnFlags {
        start_new_session: None,
        creation_flags: Some(existing | CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW),
    }
}

/// Fully normalized request handed to a [`Spawner`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnSpec {
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Option<EnvOverlay>,
    pub stderr: StderrMode,
    pub flags: SpawnFlags,
}

impl SpawnSpec {
    #[must_use]
    pub fn program(&self) -> &str {
        self.args.first().map_or("", String::as_str)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// The OS boundary. Everything above it is deterministic and testable.
pub trait Spawner: Send + Sync {
    /// Run with inherited stdout, returning the exit code.
    ///
    /// # Errors
    /// Returns the spawn error untouched.
    fn status(&self, spec: &SpawnSpec) -> io::Result<i32>;

    /// Run with captured stdout (and stderr unless inherited).
    ///
    /// # Errors
    /// Returns the spawn or read error untouched.
    fn output(&self, spec: &SpawnSpec) -> io::Result<RawOutput>;
}

#[derive(Debug, Default)]
pub struct SystemSpawner;

impl Spawner for SystemSpawner {
    fn status(&self, spec: &SpawnSpec) -> io::Result<i32> {
        let mut command = configured_command(spec)?;
        command.stdout(Stdio::inherit());
        command.stderr(Stdio::inherit());
        let status = command.status()?;
        Ok(status.code().unwrap_or(-1))
    }

    fn output(&self, spec: &SpawnSpec) -> io::Result<RawOutput> {
        let mut command = configured_command(spec)?;
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        match spec.stderr {
            StderrMode::Inherit => command.stderr(Stdio::inherit()),
            StderrMode::Capture | StderrMode::MergeIntoStdout => command.stderr(Stdio::piped()),
        };

        let mut child = command.spawn()?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_handle = thread::spawn(move || read_all(stdout));
        let stderr_handle = thread::spawn(move || read_all(stderr));

        let status = child.wait()?;
        let mut stdout = stdout_handle
            .join()
            .map_err(|_| io::Error::other("stdout reader panicked"))??;
        let mut stderr = stderr_handle
            .join()
            .map_err(|_| io::Error::other("stderr reader panicked"))??;
        if spec.stderr == StderrMode::MergeIntoStdout {
            stdout.append(&mut stderr);
        }
        Ok(RawOutput {
            code: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}

fn configured_command(spec: &SpawnSpec) -> io::Result<Command> {
    let (program, args) = spec
        .args
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
    let mut command = Command::new(program);
    command.args(args);
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }
    if let Some(env) = &spec.env {
        command.envs(env);
    }
    apply_spawn_flags(&mut command, spec.flags);
    Ok(command)
}

#[cfg(unix)]
fn apply_spawn_flags(command: &mut Command, flags: SpawnFlags) {
    use std::os::unix::process::CommandExt;

    if flags.start_new_session == Some(true) {
        // SAFETY: setsid is async-signal-safe and touches no parent state.
        unsafe {
            command.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }
}

#[cfg(windows)]
fn apply_spawn_flags(command: &mut Command, flags: SpawnFlags) {
    use std::os::windows::process::CommandExt;

    if let Some(creation_flags) = flags.creation_flags {
        command.creation_flags(creation_flags);
    }
}

#[cfg(not(any(unix, windows)))]
fn apply_spawn_flags(_command: &mut Command, _flags: SpawnFlags) {}

fn read_all(reader: Option<impl Read>) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buffer)?;
    }
    Ok(buffer)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Captured {
    Text(String),
    Bytes(Vec<u8>),
}

impl Captured {
    fn decode(bytes: Vec<u8>, text: bool) -> Self {
        if text {
            Self::Text(decode_text(&bytes))
        } else {
            Self::Bytes(bytes)
        }
    }

    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Bytes(bytes) => decode_text(&bytes),
        }
    }
}

/// UTF-8 with universal newlines.
fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("unable to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with status {code}")]
    Exit {
        program: String,
        code: i32,
        output: Option<Captured>,
        stderr: Option<String>,
    },
}

impl ProcessError {
    /// The executable itself could not be found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }

    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { code, .. } => Some(*code),
            Self::Spawn { .. } => None,
        }
    }

    /// Everything the failed process printed that was captured.
    #[must_use]
    pub fn output_text(&self) -> String {
        match self {
            Self::Exit { output, stderr, .. } => {
                let mut text = output
                    .as_ref()
                    .map(|captured| captured.text().into_owned())
                    .unwrap_or_default();
                if let Some(stderr) = stderr {
                    text.push_str(stderr);
                }
                text
            }
            Self::Spawn { .. } => String::new(),
        }
    }
}

/// Runs host processes with consistent logging and spawn-flag handling.
///
/// Failures are returned exactly as they happen; callers add the context.
#[derive(Clone)]
pub struct ProcessRunner {
    spawner: Arc<dyn Spawner>,
    console: Console,
    host_os: HostOs,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("console", &self.console)
            .field("host_os", &self.host_os)
            .finish_non_exhaustive()
    }
}

impl ProcessRunner {
    pub fn new(spawner: Arc<dyn Spawner>, console: Console, host_os: HostOs) -> Self {
        Self {
            spawner,
            console,
            host_os,
        }
    }

    #[must_use]
    pub fn system(console: Console) -> Self {
        Self::new(Arc::new(SystemSpawner), console, HostOs::current())
    }

    #[must_use]
    pub fn console(&self) -> &Console {
        &self.console
    }

    #[must_use]
    pub fn host_os(&self) -> &HostOs {
        &self.host_os
    }

    /// Run with inherited output and return the exit code.
    ///
    /// # Errors
    /// Spawn failures always; non-zero exits only when `invocation.check` is set.
    pub fn run(&self, invocation: &Invocation) -> Result<i32, ProcessError> {
        let spec = self.spawn_spec(invocation);
        self.echo_invocation(&spec);
        let code = self
            .spawner
            .status(&spec)
            .map_err(|source| ProcessError::Spawn {
                program: spec.program().to_string(),
                source,
            })?;
        self.console.debug(&format!(">>> Return code: {code}"));
        if invocation.check && code != 0 {
            return Err(ProcessError::Exit {
                program: spec.program().to_string(),
                code,
                output: None,
                stderr: None,
            });
        }
        Ok(code)
    }

    /// Run and capture stdout, failing on a non-zero exit.
    ///
    /// # Errors
    /// Spawn failures and non-zero exits, with whatever output was captured.
    pub fn check_output(&self, invocation: &Invocation) -> Result<Captured, ProcessError> {
        let spec = self.spawn_spec(invocation);
        self.echo_invocation(&spec);
        let raw = self
            .spawner
            .output(&spec)
            .map_err(|source| ProcessError::Spawn {
                program: spec.program().to_string(),
                source,
            })?;
        let output = Captured::decode(raw.stdout, invocation.text_mode());
        self.echo_output(&output, raw.code);
        if raw.code != 0 {
            let stderr = (!raw.stderr.is_empty()).then(|| decode_text(&raw.stderr));
            return Err(ProcessError::Exit {
                program: spec.program().to_string(),
                code: raw.code,
                output: Some(output),
                stderr,
            });
        }
        Ok(output)
    }

    fn spawn_spec(&self, invocation: &Invocation) -> SpawnSpec {
        let spec = SpawnSpec {
            args: invocation.normalized_args(),
            cwd: invocation.cwd.clone(),
            env: invocation.env.clone(),
            stderr: invocation.stderr,
            flags: resolve_spawn_flags(
                invocation.start_new_session,
                invocation.creation_flags,
                &self.host_os,
            ),
        };
        tracing::debug!(
            program = spec.program(),
            args = spec.args.len().saturating_sub(1),
            "spawning process"
        );
        spec
    }

    fn echo_invocation(&self, spec: &SpawnSpec) {
        if !self.console.is_deep_debug() {
            return;
        }
        let cwd = spec
            .cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut lines = vec![
            String::new(),
            ">>> Running Command:".to_string(),
            format!(">>>     {}", command_line(&spec.args)),
            ">>> Working Directory:".to_string(),
            format!(">>>     {}", cwd.display()),
        ];
        if let Some(env) = spec.env.as_ref().filter(|env| !env.is_empty()) {
            lines.push(">>> Environment Overrides:".to_string());
            lines.extend(env.iter().map(|(key, value)| format!(">>>     {key}={value}")));
        }
        self.console.debug(&lines.join("\n"));
    }

    fn echo_output(&self, output: &Captured, code: i32) {
        if !self.console.is_deep_debug() {
            return;
        }
        let text = output.text();
        let mut lines = Vec::new();
        if !text.is_empty() {
            lines.push(">>> Command Output:".to_string());
            lines.extend(text.lines().map(|line| format!(">>>     {line}")));
        }
        lines.push(format!(">>> Return code: {code}"));
        self.console.debug(&lines.join("\n"));
    }
}

/// Reconstructs a readable command line; arguments with spaces or quotes are double-quoted.
#[must_use]
pub fn command_line(args: &[String]) -> String {
    args.iter()
        .map(|arg| quote_arg(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_arg(arg: &str) -> Cow<'_, str> {
    if arg.is_empty() {
        return Cow::Borrowed("\"\"");
    }
    if arg.chars().any(|c| c.is_whitespace() || c == '"') {
        return Cow::Owned(format!("\"{}\"", arg.replace('"', "\\\"")));
    }
    Cow::Borrowed(arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{runner_with, Scripted};

    #[test]
    fn simple_call_is_silent_and_text_mode() {
        for host in [HostOs::Linux, HostOs::MacOs, HostOs::Windows] {
            let (runner, spawner, sink) = runner_with(host, 1, vec![]);
            let code = runner
                .run(&Invocation::new(["hello", "world"]))
                .expect("run");
            assert_eq!(code, 0);
            let spec = spawner.last_spec();
            assert_eq!(spec.args, vec!["hello", "world"]);
            assert_eq!(spec.flags, SpawnFlags::default());
            assert!(sink.lines().is_empty());
        }
    }

    #[test]
    fn path_arguments_are_stringified() {
        let (runner, spawner, _) = runner_with(HostOs::Linux, 1, vec![]);
        let location = PathBuf::from("/tmp/work/location");
        runner
            .run(&Invocation::new(vec![Arg::from("hello"), Arg::from(&location)]).cwd("/tmp/cwd"))
            .expect("run");
        let spec = spawner.last_spec();
        assert_eq!(spec.args, vec!["hello", "/tmp/work/location"]);
        assert_eq!(spec.cwd, Some(PathBuf::from("/tmp/cwd")));
    }

    #[test]
    fn start_new_session_passes_through_on_posix() {
        for host in [HostOs::Linux, HostOs::MacOs] {
            for requested in [None, Some(true), Some(false)] {
                let flags = resolve_spawn_flags(requested, None, &host);
                assert_eq!(flags.start_new_session, requested);
                assert_eq!(flags.creation_flags, None);
            }
        }
    }

    #[test]
    fn start_new_session_becomes_creation_flags_on_windows() {
        let flags = resolve_spawn_flags(Some(true), None, &HostOs::Windows);
        assert_eq!(
            flags,
            SpawnFlags {
                start_new_session: None,
                creation_flags: Some(CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW),
            }
        );
        for requested in [None, Some(false)] {
            assert_eq!(
                resolve_spawn_flags(requested, None, &HostOs::Windows),
                SpawnFlags::default()
            );
        }
    }

    #[test]
    fn compatible_creation_flags_are_merged_on_windows() {
        for (existing, expected) in [
            (0, CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW),
            (
                CREATE_NEW_PROCESS_GROUP,
                CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW,
            ),
            (0x1, CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW | 0x1),
        ] {
            let flags = resolve_spawn_flags(Some(true), Some(existing), &HostOs::Windows);
            assert_eq!(flags.creation_flags, Some(expected));
            assert_eq!(flags.start_new_session, None);
        }
    }

    #[test]
    #[should_panic(expected = "conflict with start_new_session")]
    fn conflicting_creation_flags_fail_loudly() {
        let _ = resolve_spawn_flags(Some(true), Some(DETACHED_PROCESS), &HostOs::Windows);
    }

    #[test]
    fn runner_applies_windows_flags_to_the_spawn() {
        let (runner, spawner, _) = runner_with(HostOs::Windows, 1, vec![]);
        runner
            .run(&Invocation::new(["hello", "world"]).start_new_session(true))
            .expect("run");
        let spec = spawner.last_spec();
        assert_eq!(
            spec.flags.creation_flags,
            Some(CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW)
        );
        assert_eq!(spec.flags.start_new_session, None);
    }

    #[test]
    fn deep_debug_echoes_command_and_cwd() {
        let (runner, _, sink) = runner_with(HostOs::Linux, 2, vec![]);
        runner
            .run(&Invocation::new(["hello", "world"]).cwd("/tmp/cwd"))
            .expect("run");
        assert_eq!(
            sink.contents(),
            "\n\
             >>> Running Command:\n\
             >>>     hello world\n\
             >>> Working Directory:\n\
             >>>     /tmp/cwd\n\
             >>> Return code: 0\n"
        );
    }

    #[test]
    fn deep_debug_echoes_environment_overrides() {
        let (runner, _, sink) = runner_with(HostOs::Linux, 2, vec![]);
        runner
            .run(
                &Invocation::new(["hello", "world"])
                    .cwd("/tmp/cwd")
                    .env([("NewVar", "NewVarValue")]),
            )
            .expect("run");
        let contents = sink.contents();
        assert!(contents.contains(
            ">>> Working Directory:\n>>>     /tmp/cwd\n>>> Environment Overrides:\n>>>     NewVar=NewVarValue\n"
        ));
    }

    #[test]
    fn deep_debug_echoes_captured_output() {
        let (runner, _, sink) = runner_with(
            HostOs::Linux,
            2,
            vec![Scripted::output(0, "goodbye\n")],
        );
        let output = runner
            .check_output(&Invocation::new(["hello", "world"]).cwd("/tmp/cwd"))
            .expect("output");
        assert_eq!(output.text(), "goodbye\n");
        assert!(sink
            .contents()
            .ends_with(">>> Command Output:\n>>>     goodbye\n>>> Return code: 0\n"));
    }

    #[test]
    fn text_mode_can_be_disabled() {
        let (runner, _, _) = runner_with(HostOs::Linux, 1, vec![Scripted::output(0, "a\r\nb")]);
        let text = runner
            .check_output(&Invocation::new(["cat"]))
            .expect("text");
        assert_eq!(text, Captured::Text("a\nb".to_string()));

        let (runner, _, _) = runner_with(HostOs::Linux, 1, vec![Scripted::output(0, "a\r\nb")]);
        let bytes = runner
            .check_output(&Invocation::new(["cat"]).text(false))
            .expect("bytes");
        assert_eq!(bytes, Captured::Bytes(b"a\r\nb".to_vec()));
    }

    #[test]
    fn failures_propagate_unclassified() {
        let (runner, _, _) = runner_with(HostOs::Linux, 1, vec![Scripted::NotFound]);
        let err = runner
            .run(&Invocation::new(["missing-tool"]))
            .expect_err("spawn failure");
        assert!(err.is_not_found());

        let (runner, _, _) = runner_with(HostOs::Linux, 1, vec![Scripted::output(3, "boom")]);
        let err = runner
            .check_output(&Invocation::new(["tool"]))
            .expect_err("exit failure");
        assert_eq!(err.exit_code(), Some(3));
        assert_eq!(err.output_text(), "boom");
    }

    #[test]
    fn run_only_checks_exit_codes_on_request() {
        let (runner, _, _) = runner_with(HostOs::Linux, 1, vec![Scripted::Status(4)]);
        assert_eq!(runner.run(&Invocation::new(["tool"])).expect("code"), 4);

        let (runner, _, _) = runner_with(HostOs::Linux, 1, vec![Scripted::Status(4)]);
        let err = runner
            .run(&Invocation::new(["tool"]).check(true))
            .expect_err("checked");
        assert_eq!(err.exit_code(), Some(4));
    }

    #[test]
    fn command_line_quotes_arguments_with_spaces() {
        let args = vec![
            "--env".to_string(),
            "IMPORTANCE=super high".to_string(),
            String::new(),
        ];
        assert_eq!(command_line(&args), "--env \"IMPORTANCE=super high\" \"\"");
    }

    #[cfg(unix)]
    mod system {
        use super::*;
        use crate::console::MemorySink;

        fn runner() -> ProcessRunner {
            ProcessRunner::system(Console::new(Arc::new(MemorySink::new()), 1))
        }

        #[test]
        fn captures_stdout_exactly() {
            let output = runner()
                .check_output(&Invocation::new(["/bin/sh", "-c", "printf 'goodbye\\n'"]))
                .expect("output");
            assert_eq!(output.into_text(), "goodbye\n");
        }

        #[test]
        fn merges_stderr_when_requested() {
            let err = runner()
                .check_output(
                    &Invocation::new(["/bin/sh", "-c", "printf out; printf err >&2; exit 7"])
                        .stderr(StderrMode::MergeIntoStdout),
                )
                .expect_err("non-zero exit");
            assert_eq!(err.exit_code(), Some(7));
            assert_eq!(err.output_text(), "outerr");
        }

        #[test]
        fn environment_overlay_reaches_the_child() {
            let output = runner()
                .check_output(
                    &Invocation::new(["/bin/sh", "-c", "printf %s \"$BX_MAGIC\""])
                        .env([("BX_MAGIC", "True")]),
                )
                .expect("output");
            assert_eq!(output.text(), "True");
        }

        #[test]
        fn missing_programs_surface_as_not_found() {
            let err = runner()
                .run(&Invocation::new(["bx-definitely-missing-binary"]))
                .expect_err("missing");
            assert!(err.is_not_found(), "unexpected error: {err}");
        }

        #[cfg(target_os = "linux")]
        #[test]
        fn new_session_makes_the_child_a_session_leader() {
            let output = runner()
                .check_output(
                    &Invocation::new([
                        "/bin/sh",
                        "-c",
                        "cut -d' ' -f6 /proc/$$/stat; echo $$",
                    ])
                    .start_new_session(true),
                )
                .expect("output")
                .into_text();
            let lines: Vec<&str> = output.lines().collect();
            assert_eq!(lines.len(), 2, "unexpected output: {output}");
            assert_eq!(lines[0], lines[1]);
        }
    }
}
