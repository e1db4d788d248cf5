use crate::collector::{CollectOptions, ProcessOutputCollector};
use crate::error::CollectError;
use crate::output::Output;
use crate::signal::Killer;
use std::borrow::Cow;
use std::io;
use std::process::ExitStatus;
use tokio::process::Child;

/// Represents the running state of a process.
#[derive(Debug)]
pub enum RunningState {
    /// The process is still running.
    Running,

    /// The process has terminated with the given exit status.
    Terminated(ExitStatus),

    /// Failed to determine process state.
    Uncertain(io::Error),
}

/// A spawned process with piped `stdout` and `stderr`, ready to be collected.
#[derive(Debug)]
pub struct ProcessHandle {
    pub(crate) name: Cow<'static, str>,
    child: Child,
    collect_options: CollectOptions,

    /// The child leads its own process group. Only set on unix.
    process_group: bool,
}

impl ProcessHandle {
    /// Wraps an already spawned `child`. Its `stdout` and `stderr` must have been piped.
    pub fn new_from_child_with_piped_io(name: impl Into<Cow<'static, str>>, child: Child) -> Self {
        Self {
            name: name.into(),
            child,
            collect_options: CollectOptions::default(),
            process_group: false,
        }
    }

    /// Marks the child as leader of its own process group, letting its [Killer] reach the whole
    /// group.
    pub(crate) fn leading_process_group(mut self) -> Self {
        self.process_group = cfg!(unix);
        self
    }

    pub fn with_collect_options(mut self, collect_options: CollectOptions) -> Self {
        self.collect_options = collect_options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    //noinspection RsSelfConvention
    pub fn is_running(&mut self) -> RunningState {
        match self.child.try_wait() {
            Ok(None) => RunningState::Running,
            Ok(Some(exit_status)) => RunningState::Terminated(exit_status),
            Err(err) => RunningState::Uncertain(err),
        }
    }

    /// Returns a [Killer] able to stop this process while it is being collected.
    ///
    /// Returns `None` if the process already was reaped.
    pub fn killer(&self) -> Option<Killer> {
        self.child.id().map(|pid| Killer {
            process_name: self.name.clone(),
            pid,
            process_group: self.process_group,
        })
    }

    /// Waits for the process to exit, collecting everything it wrote to `stdout` and `stderr`.
    ///
    /// Output can only be collected once. A second call fails with
    /// [CollectError::StreamNotCaptured].
    pub async fn collect(&mut self) -> Result<Output, CollectError> {
        ProcessOutputCollector::new(self.name.clone(), self.collect_options)
            .collect(&mut self.child)
            .await
    }
}
