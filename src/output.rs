/// Exit code reported until the real exit status of a process is known.
pub const PENDING_EXIT_CODE: i32 = 255;

/// Full output of a process that terminated.
///
/// Both its `stdout` and `stderr` streams were collected as individual lines, without their line
/// terminators. Lines of one stream keep their order. How lines of `stdout` interleaved with lines
/// of `stderr` is not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Code the process exited with.
    ///
    /// On unix, a process killed by a signal reports `128 + signal`, like a shell would.
    pub exit_code: i32,

    /// The processes entire output on its `stdout` stream, collected into individual lines.
    pub stdout: Vec<String>,

    /// The processes entire output on its `stderr` stream, collected into individual lines.
    pub stderr: Vec<String>,
}

impl Output {
    pub(crate) fn pending() -> Self {
        Self {
            exit_code: PENDING_EXIT_CODE,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Splits this output into `(exit_code, stdout, stderr)`.
    pub fn into_parts(self) -> (i32, Vec<String>, Vec<String>) {
        (self.exit_code, self.stdout, self.stderr)
    }
}
