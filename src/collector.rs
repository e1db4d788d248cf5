use crate::child::ChildProcess;
use crate::error::{CloseError, CollectError};
use crate::output::{Output, PENDING_EXIT_CODE};
use crate::output_stream::StreamType;
use crate::output_stream::line_stream_reader::LineStreamReader;
use std::borrow::Cow;
use std::process::ExitStatus;
use std::time::Duration;

/// Controls how a [ProcessOutputCollector] polls and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectOptions {
    /// Longest time to wait for new output before checking again whether the process exited.
    ///
    /// default: 10 ms
    pub poll_interval: Duration,

    /// Mirror every collected `stdout` line to our own `stdout`.
    pub echo_stdout: bool,

    /// Mirror every collected `stderr` line to our own `stderr`.
    pub echo_stderr: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            echo_stdout: false,
            echo_stderr: false,
        }
    }
}

/// Runs a single child process to completion while draining both of its output streams.
///
/// The collector holds no state between runs. Every call to
/// [ProcessOutputCollector::collect] starts with fresh readers and an empty [Output].
#[derive(Debug, Clone)]
pub struct ProcessOutputCollector {
    process_name: Cow<'static, str>,
    options: CollectOptions,
}

struct Readers {
    stdout: LineStreamReader,
    stderr: LineStreamReader,
    options: CollectOptions,
}

impl Readers {
    fn record(&self, ty: StreamType, line: String, output: &mut Output) {
        match ty {
            StreamType::StdErr => {
                if self.options.echo_stderr {
                    eprintln!("{line}");
                }
                output.stderr.push(line);
            }
            StreamType::StdOut => {
                if self.options.echo_stdout {
                    println!("{line}");
                }
                output.stdout.push(line);
            }
        }
    }

    /// Takes at most one line from each reader, without waiting.
    /// Returns whether anything was read.
    async fn read_once(&mut self, output: &mut Output) -> bool {
        let out = self.stdout.try_read_line(None).await;
        let err = self.stderr.try_read_line(None).await;
        let read_any = out.is_some() || err.is_some();
        if let Some(line) = out {
            self.record(StreamType::StdOut, line, output);
        }
        if let Some(line) = err {
            self.record(StreamType::StdErr, line, output);
        }
        read_any
    }

    async fn drain(&mut self, output: &mut Output) {
        while self.read_once(output).await {}
    }

    /// Waits until either reader yields a line or the poll interval elapsed.
    async fn wait_for_line(&mut self, output: &mut Output) {
        let received = tokio::select! {
            Some(line) = self.stdout.next_line() => Some((StreamType::StdOut, line)),
            Some(line) = self.stderr.next_line() => Some((StreamType::StdErr, line)),
            _ = tokio::time::sleep(self.options.poll_interval) => None,
        };
        if let Some((ty, line)) = received {
            self.record(ty, line, output);
        }
    }

    fn reader(&mut self, ty: StreamType) -> &mut LineStreamReader {
        match ty {
            StreamType::StdOut => &mut self.stdout,
            StreamType::StdErr => &mut self.stderr,
        }
    }

    /// Closes one reader, draining whatever is still pending while it is busy.
    async fn close(&mut self, ty: StreamType, output: &mut Output) -> Result<(), CloseError> {
        loop {
            match self.reader(ty).close().await {
                Ok(()) => return Ok(()),
                Err(CloseError::Busy { .. }) => {
                    tracing::trace!(stream = %ty, "Stream still busy, draining before closing");
                    self.drain(output).await;
                    self.wait_for_line(output).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl ProcessOutputCollector {
    pub fn new(process_name: impl Into<Cow<'static, str>>, options: CollectOptions) -> Self {
        Self {
            process_name: process_name.into(),
            options,
        }
    }

    pub fn options(&self) -> &CollectOptions {
        &self.options
    }

    /// Collects all output of `child` until it exited, returning its exit code and the lines it
    /// wrote to `stdout` and `stderr`.
    ///
    /// This never times out. A process that does not terminate keeps this call pending until it
    /// gets killed from the outside (see [crate::Killer]), which then is reported like any other
    /// exit.
    ///
    /// Fails if a stream was not captured, if the exit status could not be queried, or if one of
    /// the streams broke while being read.
    pub async fn collect<C: ChildProcess>(&self, child: &mut C) -> Result<Output, CollectError> {
        let stdout = child
            .take_stdout()
            .ok_or_else(|| CollectError::StreamNotCaptured {
                process_name: self.process_name.clone(),
                stream: StreamType::StdOut,
            })?;
        let stderr = child
            .take_stderr()
            .ok_or_else(|| CollectError::StreamNotCaptured {
                process_name: self.process_name.clone(),
                stream: StreamType::StdErr,
            })?;

        let mut readers = Readers {
            stdout: LineStreamReader::start(stdout, StreamType::StdOut),
            stderr: LineStreamReader::start(stderr, StreamType::StdErr),
            options: self.options,
        };
        let mut output = Output::pending();

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    return Err(CollectError::Wait {
                        process_name: self.process_name.clone(),
                        source,
                    });
                }
            }
            if !readers.read_once(&mut output).await {
                readers.wait_for_line(&mut output).await;
            }
        };
        tracing::debug!(process = %self.process_name, ?status, "Process exited");

        // Our readers hold no write buffers. Whatever the process wrote before exiting is either
        // queued already or still in the pipe, where the readers will pick it up.
        readers.drain(&mut output).await;

        for ty in [StreamType::StdOut, StreamType::StdErr] {
            readers
                .close(ty, &mut output)
                .await
                .map_err(|source| CollectError::StreamClose {
                    process_name: self.process_name.clone(),
                    source,
                })?;
        }
        // Closed readers may still hold lines queued right before they stopped.
        readers.drain(&mut output).await;

        output.exit_code = exit_code(status);
        tracing::debug!(
            process = %self.process_name,
            exit_code = output.exit_code,
            stdout_lines = output.stdout.len(),
            stderr_lines = output.stderr.len(),
            "Collected process output"
        );
        Ok(output)
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    PENDING_EXIT_CODE
}

#[cfg(all(test, unix))]
mod tests {
    use super::{CollectOptions, ProcessOutputCollector, exit_code};
    use crate::child::MockChildProcess;
    use crate::error::{CloseError, CollectError};
    use crate::output_stream::tests::BrokenStream;
    use assertr::prelude::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream};
    use tracing_test::traced_test;

    fn exited_with(code: i32) -> ExitStatus {
        ExitStatus::from_raw(code << 8)
    }

    fn boxed(stream: impl AsyncRead + Unpin + Send + 'static) -> Box<dyn AsyncRead + Unpin + Send> {
        Box::new(stream)
    }

    /// A mocked child exiting with `code` as soon as `exited` is set.
    fn mock_child(
        stdout: Box<dyn AsyncRead + Unpin + Send>,
        stderr: Box<dyn AsyncRead + Unpin + Send>,
        exited: Arc<AtomicBool>,
        code: i32,
    ) -> MockChildProcess {
        let mut child = MockChildProcess::new();
        child.expect_take_stdout().return_once(move || Some(stdout));
        child.expect_take_stderr().return_once(move || Some(stderr));
        child.expect_try_wait().returning(move || {
            Ok(exited
                .load(Ordering::SeqCst)
                .then(|| exited_with(code)))
        });
        child
    }

    fn pipes() -> (DuplexStream, DuplexStream, DuplexStream, DuplexStream) {
        let (stdout_read, stdout_write) = tokio::io::duplex(256);
        let (stderr_read, stderr_write) = tokio::io::duplex(256);
        (stdout_read, stdout_write, stderr_read, stderr_write)
    }

    #[tokio::test]
    async fn collects_both_streams_and_the_exit_code() {
        let (stdout_read, mut stdout_write, stderr_read, mut stderr_write) = pipes();
        let exited = Arc::new(AtomicBool::new(false));
        let mut child = mock_child(boxed(stdout_read), boxed(stderr_read), exited.clone(), 3);

        let process = tokio::spawn(async move {
            stdout_write.write_all(b"a\n").await.unwrap();
            stderr_write.write_all(b"b\n").await.unwrap();
            drop(stdout_write);
            drop(stderr_write);
            exited.store(true, Ordering::SeqCst);
        });

        let collector = ProcessOutputCollector::new("mock", CollectOptions::default());
        let output = collector.collect(&mut child).await.unwrap();
        process.await.unwrap();

        assert_that(output.into_parts()).is_equal_to((
            3,
            vec![String::from("a")],
            vec![String::from("b")],
        ));
    }

    #[tokio::test]
    async fn echoing_lines_still_collects_them() {
        let (stdout_read, mut stdout_write, stderr_read, mut stderr_write) = pipes();
        let exited = Arc::new(AtomicBool::new(false));
        let mut child = mock_child(boxed(stdout_read), boxed(stderr_read), exited.clone(), 1);

        let process = tokio::spawn(async move {
            stdout_write.write_all(b"echoed out\n").await.unwrap();
            stderr_write.write_all(b"echoed err\n").await.unwrap();
            drop(stdout_write);
            drop(stderr_write);
            exited.store(true, Ordering::SeqCst);
        });

        let options = CollectOptions {
            echo_stdout: true,
            echo_stderr: true,
            ..CollectOptions::default()
        };
        let collector = ProcessOutputCollector::new("mock", options);
        let output = collector.collect(&mut child).await.unwrap();
        process.await.unwrap();

        assert_that(collector.options().echo_stderr).is_true();
        assert_that(output.into_parts()).is_equal_to((
            1,
            vec![String::from("echoed out")],
            vec![String::from("echoed err")],
        ));
    }

    #[tokio::test]
    async fn collects_output_written_after_the_exit_was_observed() {
        let (stdout_read, mut stdout_write, stderr_read, mut stderr_write) = pipes();
        let exited = Arc::new(AtomicBool::new(true));
        let mut child = mock_child(boxed(stdout_read), boxed(stderr_read), exited, 0);

        let late_writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            for i in 0..20 {
                stdout_write
                    .write_all(format!("late {i}\n").as_bytes())
                    .await
                    .unwrap();
            }
            stderr_write.write_all(b"late error").await.unwrap();
        });

        let collector = ProcessOutputCollector::new("mock", CollectOptions::default());
        let output = collector.collect(&mut child).await.unwrap();
        late_writer.await.unwrap();

        let expected = (0..20).map(|i| format!("late {i}")).collect::<Vec<_>>();
        assert_that(output.exit_code).is_equal_to(0);
        assert_that(output.stdout).is_equal_to(expected);
        assert_that(output.stderr).is_equal_to(&["late error"]);
    }

    #[tokio::test]
    async fn reports_missing_streams() {
        let mut child = MockChildProcess::new();
        child.expect_take_stdout().return_once(|| None);
        child.expect_take_stderr().never();
        child.expect_try_wait().never();

        let collector = ProcessOutputCollector::new("mock", CollectOptions::default());
        let err = collector.collect(&mut child).await.unwrap_err();

        assert_that(matches!(err, CollectError::StreamNotCaptured { .. })).is_true();
    }

    #[tokio::test]
    async fn reports_failing_exit_polls() {
        let (stdout_read, _stdout_write, stderr_read, _stderr_write) = pipes();
        let mut child = MockChildProcess::new();
        child
            .expect_take_stdout()
            .return_once(move || Some(boxed(stdout_read)));
        child
            .expect_take_stderr()
            .return_once(move || Some(boxed(stderr_read)));
        child
            .expect_try_wait()
            .returning(|| Err(std::io::Error::other("no such process")));

        let collector = ProcessOutputCollector::new("mock", CollectOptions::default());
        let err = collector.collect(&mut child).await.unwrap_err();

        assert_that(matches!(err, CollectError::Wait { .. })).is_true();
    }

    #[tokio::test]
    #[traced_test]
    async fn surfaces_broken_streams_instead_of_truncating_output() {
        let (stdout_read, mut stdout_write, _stderr_read, _stderr_write) = pipes();
        let exited = Arc::new(AtomicBool::new(true));
        let mut child = mock_child(boxed(stdout_read), boxed(BrokenStream), exited, 0);
        stdout_write.write_all(b"fine\n").await.unwrap();
        drop(stdout_write);

        let collector = ProcessOutputCollector::new("mock", CollectOptions::default());
        let err = collector.collect(&mut child).await.unwrap_err();

        match err {
            CollectError::StreamClose {
                process_name,
                source: CloseError::Read { stream, .. },
            } => {
                assert_that(process_name.as_ref()).is_equal_to("mock");
                assert_that(stream.to_string()).is_equal_to("stderr");
            }
            other => panic!("expected a broken stream, got {other:?}"),
        }
        assert_that(logs_contain("Could not read from stream")).is_true();
    }

    #[test]
    fn maps_exit_statuses_to_codes() {
        assert_that(exit_code(exited_with(0))).is_equal_to(0);
        assert_that(exit_code(exited_with(3))).is_equal_to(3);
        // Killed by SIGKILL.
        assert_that(exit_code(ExitStatus::from_raw(9))).is_equal_to(137);
    }
}
