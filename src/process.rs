//! Builder API for spawning a process and running it to completion.

use crate::collector::CollectOptions;
use crate::error::{RunError, SpawnError};
use crate::output::Output;
use crate::process_handle::ProcessHandle;
use std::borrow::Cow;
use std::process::Stdio;

/// Controls which parts of the command make up an automatically generated process name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AutoName {
    /// Example: `"pig"` from `Command::new("pig").arg("-version")`
    Program,

    /// Example: `"pig -version"` from `Command::new("pig").arg("-version")`
    #[default]
    ProgramWithArgs,
}

impl AutoName {
    fn format_cmd(&self, cmd: &std::process::Command) -> String {
        let mut name = cmd.get_program().to_string_lossy().into_owned();
        if *self == AutoName::ProgramWithArgs {
            for arg in cmd.get_args() {
                name.push(' ');
                name.push_str(arg.to_string_lossy().as_ref());
            }
        }
        name
    }
}

/// Specifies how a process should be named in logs and errors.
#[derive(Debug, Clone)]
pub enum ProcessName {
    /// Use an explicit custom name.
    Explicit(Cow<'static, str>),

    /// Derive the name from the command.
    Auto(AutoName),
}

impl Default for ProcessName {
    fn default() -> Self {
        Self::Auto(AutoName::default())
    }
}

impl From<&'static str> for ProcessName {
    fn from(s: &'static str) -> Self {
        Self::Explicit(Cow::Borrowed(s))
    }
}

impl From<String> for ProcessName {
    fn from(s: String) -> Self {
        Self::Explicit(Cow::Owned(s))
    }
}

impl From<AutoName> for ProcessName {
    fn from(mode: AutoName) -> Self {
        Self::Auto(mode)
    }
}

/// A builder for spawning a process with captured output.
///
/// `stdout` and `stderr` are always piped and `stdin` is closed, whatever the given command was
/// configured with. On unix, the process becomes the leader of a new process group, so that
/// signals sent through its [crate::Killer] also reach every process it started.
///
/// # Examples
///
/// ```no_run
/// use pig_runner::Process;
/// use tokio::process::Command;
///
/// # async fn example() -> Result<(), pig_runner::RunError> {
/// let mut cmd = Command::new("pig");
/// cmd.arg("-version");
/// let output = Process::new(cmd).with_name("pig-version").run().await?;
/// println!("pig exited with {}", output.exit_code);
/// # Ok(())
/// # }
/// ```
pub struct Process {
    cmd: tokio::process::Command,
    name: ProcessName,
    collect_options: CollectOptions,
}

impl Process {
    pub fn new(cmd: tokio::process::Command) -> Self {
        Self {
            cmd,
            name: ProcessName::default(),
            collect_options: CollectOptions::default(),
        }
    }

    /// Sets how the process should be named.
    pub fn name(mut self, name: impl Into<ProcessName>) -> Self {
        self.name = name.into();
        self
    }

    /// Convenience method to set an explicit process name.
    pub fn with_name(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name(ProcessName::Explicit(name.into()))
    }

    pub fn collect_options(mut self, collect_options: CollectOptions) -> Self {
        self.collect_options = collect_options;
        self
    }

    fn resolve_name(&self) -> Cow<'static, str> {
        match &self.name {
            ProcessName::Explicit(name) => name.clone(),
            ProcessName::Auto(mode) => Cow::Owned(mode.format_cmd(self.cmd.as_std())),
        }
    }

    pub fn spawn(mut self) -> Result<ProcessHandle, SpawnError> {
        let process_name = self.resolve_name();
        self.cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        self.cmd.process_group(0);

        tracing::debug!(process = %process_name, "Spawning process");
        let child = self
            .cmd
            .spawn()
            .map_err(|source| SpawnError::SpawnFailed {
                process_name: process_name.clone(),
                source,
            })?;

        Ok(ProcessHandle::new_from_child_with_piped_io(process_name, child)
            .with_collect_options(self.collect_options)
            .leading_process_group())
    }

    /// Spawns the process and collects its output until it exited.
    pub async fn run(self) -> Result<Output, RunError> {
        let mut handle = self.spawn()?;
        Ok(handle.collect().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::{AutoName, Process, ProcessName};
    use assertr::prelude::*;
    use tokio::process::Command;

    fn pig_command() -> Command {
        let mut cmd = Command::new("pig");
        cmd.arg("-exectype").arg("local");
        cmd
    }

    #[test]
    fn derives_names_from_the_command() {
        let process = Process::new(pig_command());
        assert_that(process.resolve_name().as_ref()).is_equal_to("pig -exectype local");

        let process = Process::new(pig_command()).name(AutoName::Program);
        assert_that(process.resolve_name().as_ref()).is_equal_to("pig");
    }

    #[test]
    fn prefers_explicit_names() {
        let process = Process::new(pig_command()).with_name(format!("pig-{}", 1));
        assert_that(process.resolve_name().as_ref()).is_equal_to("pig-1");

        let process = Process::new(pig_command()).name(ProcessName::from("local-pig"));
        assert_that(process.resolve_name().as_ref()).is_equal_to("local-pig");
    }
}
