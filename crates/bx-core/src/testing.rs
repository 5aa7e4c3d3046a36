use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use bx_domain::HostOs;

use crate::console::{Console, MemorySink};
use crate::process::{ProcessRunner, RawOutput, SpawnSpec, Spawner};

/// Canned response for the next spawn.
#[derive(Clone, Debug)]
pub(crate) enum Scripted {
    Status(i32),
    Output(RawOutput),
    NotFound,
}

impl Scripted {
    pub(crate) fn output(code: i32, stdout: &str) -> Self {
        Self::Output(RawOutput {
            code,
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        })
    }
}

/// Records every spawn and replays scripted results; unscripted spawns succeed silently.
#[derive(Default)]
pub(crate) struct RecordingSpawner {
    specs: Mutex<Vec<SpawnSpec>>,
    script: Mutex<VecDeque<Scripted>>,
}

impl RecordingSpawner {
    pub(crate) fn new(script: Vec<Scripted>) -> Self {
        Self {
            specs: Mutex::new(Vec::new()),
            script: Mutex::new(script.into()),
        }
    }

    pub(crate) fn specs(&self) -> Vec<SpawnSpec> {
        self.specs.lock().expect("specs lock").clone()
    }

    pub(crate) fn last_spec(&self) -> SpawnSpec {
        self.specs().pop().expect("no process was spawned")
    }

    fn next(&self, spec: &SpawnSpec) -> Option<Scripted> {
        self.specs.lock().expect("specs lock").push(spec.clone());
        self.script.lock().expect("script lock").pop_front()
    }
}

fn not_found(spec: &SpawnSpec) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: not found", spec.program()),
    )
}

impl Spawner for RecordingSpawner {
    fn status(&self, spec: &SpawnSpec) -> io::Result<i32> {
        match self.next(spec) {
            None => Ok(0),
            Some(Scripted::Status(code)) => Ok(code),
            Some(Scripted::Output(raw)) => Ok(raw.code),
            Some(Scripted::NotFound) => Err(not_found(spec)),
        }
    }

    fn output(&self, spec: &SpawnSpec) -> io::Result<RawOutput> {
        match self.next(spec) {
            None => Ok(RawOutput::default()),
            Some(Scripted::Status(code)) => Ok(RawOutput {
                code,
                ..RawOutput::default()
            }),
            Some(Scripted::Output(raw)) => Ok(raw),
            Some(Scripted::NotFound) => Err(not_found(spec)),
        }
    }
}

pub(crate) fn runner_with(
    host: HostOs,
    verbosity: u8,
    script: Vec<Scripted>,
) -> (ProcessRunner, Arc<RecordingSpawner>, MemorySink) {
    let spawner = Arc::new(RecordingSpawner::new(script));
    let sink = MemorySink::new();
    let console = Console::new(Arc::new(sink.clone()), verbosity);
    let runner = ProcessRunner::new(spawner.clone(), console, host);
    (runner, spawner, sink)
}
