use crate::error::SignalError;
use std::borrow::Cow;

/// Sends termination requests to a running process, independently of whoever waits for it.
///
/// Collecting output never times out on its own. To bound a run, hold on to a `Killer` obtained
/// before collecting and signal the process from elsewhere. The collector then observes the
/// termination like any other exit.
///
/// On unix, processes spawned through [crate::Process] lead their own process group. Their
/// `Killer` signals the whole group, reaching every process they started. A group without any
/// remaining member makes signalling fail, so such a `Killer` stays safe to use after the leader
/// was reaped.
///
/// Otherwise a `Killer` only knows the process id. Do not use it after the process was reaped, as
/// the id may have been reused by then.
#[derive(Debug, Clone)]
pub struct Killer {
    pub(crate) process_name: Cow<'static, str>,
    pub(crate) pid: u32,
    pub(crate) process_group: bool,
}

impl Killer {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether signals are sent to the process group led by [Killer::pid].
    pub fn signals_process_group(&self) -> bool {
        self.process_group
    }

    /// Ask the process to terminate gracefully.
    /// This signal is typically sent to a process by its controlling terminal when a user wishes to
    /// interrupt the process, initiated by pressing `Ctrl+C`.
    ///
    /// - on `cfg(unix)`: Sends a `SIGINT` to the process.
    /// - on `cfg(windows)`: Sends a `CTRL_C_EVENT` to the process.
    pub fn interrupt(&self) -> Result<(), SignalError> {
        #[cfg(unix)]
        {
            self.send(nix::sys::signal::Signal::SIGINT, "SIGINT")
        }

        #[cfg(windows)]
        {
            self.send_console_event(windows_sys::Win32::System::Console::CTRL_C_EVENT, "CTRL_C")
        }

        #[cfg(not(any(unix, windows)))]
        {
            Err(self.unsupported("SIGINT"))
        }
    }

    /// Ask the process to terminate gracefully. Nearly identical to `interrupt`.
    /// This signal is typically sent to a process when the operating system requests a termination.
    ///
    /// - on `cfg(unix)`: Sends a `SIGTERM` to the process.
    /// - on `cfg(windows)`: Sends a `CTRL_BREAK_EVENT` to the process.
    pub fn terminate(&self) -> Result<(), SignalError> {
        #[cfg(unix)]
        {
            self.send(nix::sys::signal::Signal::SIGTERM, "SIGTERM")
        }

        #[cfg(windows)]
        {
            self.send_console_event(
                windows_sys::Win32::System::Console::CTRL_BREAK_EVENT,
                "CTRL_BREAK",
            )
        }

        #[cfg(not(any(unix, windows)))]
        {
            Err(self.unsupported("SIGTERM"))
        }
    }

    /// Forcefully stop the process. It gets no chance to clean up.
    ///
    /// - on `cfg(unix)`: Sends a `SIGKILL` to the process.
    /// - on `cfg(windows)`: Calls `TerminateProcess`.
    pub fn kill(&self) -> Result<(), SignalError> {
        #[cfg(unix)]
        {
            self.send(nix::sys::signal::Signal::SIGKILL, "SIGKILL")
        }

        #[cfg(windows)]
        {
            use windows_sys::Win32::Foundation::CloseHandle;
            use windows_sys::Win32::System::Threading::{
                OpenProcess, PROCESS_TERMINATE, TerminateProcess,
            };

            let handle = unsafe { OpenProcess(PROCESS_TERMINATE, 0, self.pid) };
            if handle.is_null() {
                return Err(self.error("TERMINATE", std::io::Error::last_os_error()));
            }
            let success = unsafe { TerminateProcess(handle, 1) };
            let result = if success == 0 {
                Err(self.error("TERMINATE", std::io::Error::last_os_error()))
            } else {
                Ok(())
            };
            unsafe { CloseHandle(handle) };
            result
        }

        #[cfg(not(any(unix, windows)))]
        {
            Err(self.unsupported("SIGKILL"))
        }
    }

    fn error(&self, signal: &'static str, source: std::io::Error) -> SignalError {
        SignalError {
            process_name: self.process_name.clone(),
            signal,
            source,
        }
    }

    #[cfg(not(any(unix, windows)))]
    fn unsupported(&self, signal: &'static str) -> SignalError {
        self.error(signal, std::io::Error::from(std::io::ErrorKind::Unsupported))
    }

    #[cfg(unix)]
    fn send(
        &self,
        signal: nix::sys::signal::Signal,
        signal_name: &'static str,
    ) -> Result<(), SignalError> {
        use nix::unistd::Pid;

        tracing::debug!(
            process = %self.process_name,
            signal = signal_name,
            process_group = self.process_group,
            "Sending signal"
        );
        let pid = Pid::from_raw(self.pid as i32);
        let result = if self.process_group {
            nix::sys::signal::killpg(pid, signal)
        } else {
            nix::sys::signal::kill(pid, signal)
        };
        result.map_err(|errno| self.error(signal_name, std::io::Error::from(errno)))
    }

    #[cfg(windows)]
    fn send_console_event(&self, event: u32, signal_name: &'static str) -> Result<(), SignalError> {
        use windows_sys::Win32::System::Console::GenerateConsoleCtrlEvent;

        tracing::debug!(process = %self.process_name, signal = signal_name, "Sending signal");
        let success = unsafe { GenerateConsoleCtrlEvent(event, self.pid) };
        if success == 0 {
            return Err(self.error(signal_name, std::io::Error::last_os_error()));
        }
        Ok(())
    }
}
