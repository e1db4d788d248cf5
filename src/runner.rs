use crate::collector::CollectOptions;
use crate::config::{PigCommand, PigConfig};
use crate::error::{RunError, SpawnError};
use crate::logging::debug_dump;
use crate::options::PigOptions;
use crate::output::Output;
use crate::process::Process;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Runs pig, or any other command, to completion and returns what it printed.
///
/// The runner is immutable once built. The pig command is resolved from the process environment
/// on every call unless it was set explicitly with [Pig::command].
///
/// # Examples
///
/// ```no_run
/// use pig_runner::{ExecType, Pig, PigConfig, PigOptions};
///
/// # async fn example() -> Result<(), pig_runner::RunError> {
/// let pig = Pig::new(PigConfig::default());
/// let output = pig
///     .pig(PigOptions::new().exectype(ExecType::Local).file("wordcount.pig"))
///     .await?;
/// for line in &output.stdout {
///     println!("{line}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pig {
    config: PigConfig,
    command: Option<PigCommand>,
    collect_options: CollectOptions,
    timeout: Option<Duration>,
}

impl Pig {
    pub fn new(config: PigConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Uses `command` to start pig instead of resolving it from the environment.
    pub fn command(mut self, command: PigCommand) -> Self {
        self.command = Some(command);
        self
    }

    pub fn collect_options(mut self, collect_options: CollectOptions) -> Self {
        self.collect_options = collect_options;
        self
    }

    /// Kills every process still running after `timeout`.
    ///
    /// On unix this includes everything the process started, even after the process itself exited.
    /// A killed process is reported like any other, with the exit code of its termination.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn config(&self) -> &PigConfig {
        &self.config
    }

    pub fn pig_command(&self) -> Result<PigCommand, RunError> {
        match &self.command {
            Some(command) => Ok(command.clone()),
            None => Ok(PigCommand::from_env(&self.config)?),
        }
    }

    /// Runs `args` as a command line, the program being the first element.
    ///
    /// Arguments are passed to the program as they are. No shell is involved.
    pub async fn run<I, S>(&self, args: I) -> Result<Output, RunError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args = args
            .into_iter()
            .map(|arg| arg.as_ref().to_owned())
            .collect::<Vec<_>>();
        let Some((program, program_args)) = args.split_first() else {
            return Err(SpawnError::EmptyCommand.into());
        };

        let command_line = args.join(" ");
        tracing::info!(command = %command_line, "Running command");

        let mut cmd = Command::new(program);
        cmd.args(program_args);
        let mut handle = Process::new(cmd)
            .with_name(command_line)
            .collect_options(self.collect_options)
            .spawn()?;

        let watchdog = self.timeout.zip(handle.killer()).map(|(timeout, killer)| {
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracing::warn!(
                    process = %killer.process_name,
                    ?timeout,
                    "Process did not complete in time, killing it"
                );
                if let Err(err) = killer.kill() {
                    // The process group may have emptied in the meantime.
                    tracing::debug!(error = %err, "Could not kill process");
                }
            })
        });

        let output = handle.collect().await;
        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }
        Ok(output?)
    }

    /// Runs pig with the given `options`.
    ///
    /// Captured output is logged at debug level.
    pub async fn pig(&self, options: PigOptions) -> Result<Output, RunError> {
        let args = self
            .pig_command()?
            .to_argv()
            .into_iter()
            .chain(options.to_args())
            .collect::<Vec<_>>();
        let output = self.run(&args).await?;

        let process = args.join(" ");
        debug_dump(&process, "error", &output.stderr);
        debug_dump(&process, "output", &output.stdout);
        Ok(output)
    }

    /// Runs pig with the options of a test, defaulting to no options at all.
    pub async fn test(&self, options: Option<PigOptions>) -> Result<Output, RunError> {
        self.pig(options.unwrap_or_default()).await
    }
}

/// A test running a single pig script.
///
/// Implementors name the script and the runner. [PigTest::run_script] runs the script with
/// [PigTest::options], always pointing `-file` at [PigTest::script].
pub trait PigTest: Sync {
    /// The pig script to test.
    fn script(&self) -> PathBuf;

    fn runner(&self) -> &Pig;

    fn options(&self) -> Option<PigOptions> {
        None
    }

    fn run_script(&self) -> impl Future<Output = Result<Output, RunError>> + Send {
        async move {
            let options = self.options().unwrap_or_default().file(self.script());
            self.runner().test(Some(options)).await
        }
    }
}
