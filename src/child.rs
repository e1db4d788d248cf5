use std::io;
use std::process::ExitStatus;
use tokio::io::AsyncRead;

/// A spawned process whose output can be collected.
///
/// Implemented for [tokio::process::Child]. Both output streams must have been configured as
/// piped before spawning, otherwise there is nothing to take.
#[cfg_attr(
    test,
    mockall::automock(
        type Stdout = Box<dyn AsyncRead + Unpin + Send>;
        type Stderr = Box<dyn AsyncRead + Unpin + Send>;
    )
)]
pub trait ChildProcess: Send {
    type Stdout: AsyncRead + Unpin + Send + 'static;
    type Stderr: AsyncRead + Unpin + Send + 'static;

    /// Takes ownership of the `stdout` stream. Returns `None` if it was not piped or already taken.
    fn take_stdout(&mut self) -> Option<Self::Stdout>;

    /// Takes ownership of the `stderr` stream. Returns `None` if it was not piped or already taken.
    fn take_stderr(&mut self) -> Option<Self::Stderr>;

    /// Checks, without waiting, whether the process has exited.
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;
}

impl ChildProcess for tokio::process::Child {
    type Stdout = tokio::process::ChildStdout;
    type Stderr = tokio::process::ChildStderr;

    fn take_stdout(&mut self) -> Option<Self::Stdout> {
        self.stdout.take()
    }

    fn take_stderr(&mut self) -> Option<Self::Stderr> {
        self.stderr.take()
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        tokio::process::Child::try_wait(self)
    }
}
