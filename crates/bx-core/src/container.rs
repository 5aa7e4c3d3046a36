use std::path::PathBuf;

use bx_domain::{AppDescriptor, HostInfo, ProjectLayout};

use crate::console::Console;
use crate::errors::ToolError;
use crate::process::{Arg, Captured, Invocation, ProcessError, ProcessRunner};
use crate::progress::WaitBar;
use crate::translate::{PathTranslator, CONTAINER_APP_PATH, CONTAINER_DATA_PATH};

/// SELinux relabel hint; engines without SELinux ignore it.
const MOUNT_CONSISTENCY: &str = "z";

#[derive(Clone, Debug, PartialEq, Eq)]
struct Mount {
    host: PathBuf,
    container: String,
    consistency: &'static str,
}

impl Mount {
    fn new(host: PathBuf, container: &str) -> Self {
        Self {
            host,
            container: container.to_string(),
            consistency: MOUNT_CONSISTENCY,
        }
    }

    fn volume_spec(&self) -> String {
        format!(
            "{}:{}:{}",
            self.host.display(),
            self.container,
            self.consistency
        )
    }
}

/// Runs commands inside a throwaway container built for one app.
///
/// Arguments and environment values are rewritten to their container-side
/// form; everything else about the invocation is forwarded untouched.
#[derive(Clone, Debug)]
pub struct ContainerAdapter {
    engine: String,
    runner: ProcessRunner,
    translator: PathTranslator,
    image_tag: String,
    mounts: Vec<Mount>,
    console: Console,
    progress: bool,
}

impl ContainerAdapter {
    pub fn new(
        engine: impl Into<String>,
        runner: ProcessRunner,
        translator: PathTranslator,
        image_tag: impl Into<String>,
    ) -> Self {
        let mounts = vec![
            Mount::new(translator.platform_path(), CONTAINER_APP_PATH),
            Mount::new(translator.data_path(), CONTAINER_DATA_PATH),
        ];
        let console = runner.console().clone();
        Self {
            engine: engine.into(),
            runner,
            translator,
            image_tag: image_tag.into(),
            mounts,
            console,
            progress: false,
        }
    }

    /// Show a spinner while the image builds.
    #[must_use]
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    #[must_use]
    pub fn engine(&self) -> &str {
        &self.engine
    }

    #[must_use]
    pub fn image_tag(&self) -> &str {
        &self.image_tag
    }

    /// The host-side argument vector that runs `invocation` in the container.
    #[must_use]
    pub fn container_args(&self, invocation: &Invocation) -> Vec<String> {
        let mut args = vec![self.engine.clone(), "run".to_string()];
        for mount in &self.mounts {
            args.push("--volume".to_string());
            args.push(mount.volume_spec());
        }
        args.push("--rm".to_string());

        if let Some(env) = &invocation.env {
            for (key, value) in env {
                args.push("--env".to_string());
                args.push(format!("{key}={}", self.translator.translate(value)));
            }
        }

        args.push(self.image_tag.clone());
        args.extend(
            invocation
                .args
                .iter()
                .map(|arg| self.translator.translate(&arg.normalize())),
        );
        args
    }

    /// # Errors
    /// Whatever the runner returns, unclassified.
    pub fn run(&self, invocation: &Invocation) -> Result<i32, ProcessError> {
        self.runner.run(&self.containerized(invocation))
    }

    /// # Errors
    /// Whatever the runner returns, unclassified.
    pub fn check_output(&self, invocation: &Invocation) -> Result<Captured, ProcessError> {
        self.runner.check_output(&self.containerized(invocation))
    }

    fn containerized(&self, invocation: &Invocation) -> Invocation {
        invocation.rewritten(self.container_args(invocation), None)
    }

    /// Build the app's image from its bundle Dockerfile.
    ///
    /// # Errors
    /// Any build failure, wrapped as [`ToolError::ImageBuildFailed`].
    pub fn prepare(
        &self,
        app: &AppDescriptor,
        layout: &ProjectLayout,
        host: &HostInfo,
    ) -> Result<(), ToolError> {
        self.console
            .info(Some(&app.app_name), "Building container image...");
        let build: Vec<Arg> = vec![
            Arg::from(&self.engine),
            "build".into(),
            "--progress".into(),
            "plain".into(),
            "--tag".into(),
            Arg::from(&self.image_tag),
            "--file".into(),
            layout.dockerfile(app).into(),
            "--build-arg".into(),
            format!("PY_VERSION={}", host.interpreter.version_tag).into(),
            "--build-arg".into(),
            format!("SYSTEM_REQUIRES={}", app.system_requires_arg()).into(),
            "--build-arg".into(),
            format!("HOST_UID={}", host.uid).into(),
            "--build-arg".into(),
            format!("HOST_GID={}", host.gid).into(),
            layout.source_context(app).into(),
        ];

        let bar = WaitBar::start("Building container image...", self.progress);
        let result = self.runner.run(&Invocation::new(build).check(true));
        if let Err(source) = result {
            drop(bar);
            return Err(ToolError::ImageBuildFailed {
                engine: self.engine.clone(),
                app: app.app_name.clone(),
                source,
            });
        }
        bar.finish(format!("Built {}", self.image_tag));
        tracing::info!(tag = %self.image_tag, "container image built");
        Ok(())
    }
}
