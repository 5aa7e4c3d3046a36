#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use assert_cmd::{assert::Assert, cargo::cargo_bin_cmd, Command};
use serde_json::Value;
use tempfile::TempDir;

pub const DOCKER_VERSION: &str = "Docker version 24.0.7, build afdd53b";
pub const DAEMON_DOWN: &str = "Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?";

/// Sandbox with stand-in engine and interpreter scripts.
pub struct Sandbox {
    pub temp: TempDir,
    pub engine: PathBuf,
    pub python: PathBuf,
}

impl Sandbox {
    /// Engine that answers the probes and echoes any other invocation.
    pub fn healthy() -> Self {
        Self::with_engine(&format!(
            "case \"$1\" in\n  --version) echo \"{DOCKER_VERSION}\" ;;\n  info) echo \"Server: ok\" ;;\n  *) echo \"$@\" ;;\nesac\n"
        ))
    }

    /// Engine whose daemon never answers.
    pub fn daemon_down() -> Self {
        Self::with_engine(&format!(
            "case \"$1\" in\n  --version) echo \"{DOCKER_VERSION}\" ;;\n  *) echo \"{DAEMON_DOWN}\" >&2; exit 1 ;;\nesac\n"
        ))
    }

    pub fn with_engine(body: &str) -> Self {
        let temp = tempfile::Builder::new()
            .prefix("bx-cli")
            .tempdir()
            .expect("tempdir");
        let engine = write_script(temp.path(), "docker", body);
        let python = write_script(temp.path(), "python", "echo \"Python 3.12.1\"\n");
        fs::create_dir_all(temp.path().join("project")).expect("project dir");
        Self {
            temp,
            engine,
            python,
        }
    }

    pub fn project(&self) -> PathBuf {
        self.temp.path().join("project")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    pub fn bx(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("bx");
        cmd.current_dir(self.project())
            .env("BX_CONTAINER_ENGINE", &self.engine)
            .env("BX_PYTHON", &self.python)
            .env("BX_DATA_DIR", self.data_dir())
            .env("BX_PROGRESS", "0")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    }
    path
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn stdout_text(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).into_owned()
}
