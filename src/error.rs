//! Error types for spawning, collecting and configuring processes.

use crate::StreamType;
use std::borrow::Cow;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when closing a [crate::LineStreamReader].
#[derive(Debug, Error)]
pub enum CloseError {
    /// The background reader still owns the stream. More data may be pending.
    #[error("Stream '{stream}' is still being read")]
    Busy {
        /// The stream that could not be closed yet.
        stream: StreamType,
    },

    /// The background reader stopped because reading from the stream failed.
    #[error("Reading from stream '{stream}' failed: {source}")]
    Read {
        /// The stream that failed.
        stream: StreamType,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The background reader could not be joined.
    #[error("The reader of stream '{stream}' could not be joined: {source}")]
    Join {
        /// The stream whose reader was lost.
        stream: StreamType,
        /// The underlying join error.
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Errors that can occur when collecting the output of a process.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The process was spawned without a piped stream.
    #[error("Process '{process_name}' has no captured {stream} stream")]
    StreamNotCaptured {
        /// The name of the process.
        process_name: Cow<'static, str>,
        /// The missing stream.
        stream: StreamType,
    },

    /// Polling the process for its exit status failed.
    #[error("IO error occurred while waiting for process '{process_name}': {source}")]
    Wait {
        /// The name of the process.
        process_name: Cow<'static, str>,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// One of the output streams could not be closed.
    #[error("Could not close output of process '{process_name}': {source}")]
    StreamClose {
        /// The name of the process.
        process_name: Cow<'static, str>,
        /// The close failure.
        #[source]
        source: CloseError,
    },
}

/// Errors that can occur when spawning a process.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// Failed to spawn the process.
    #[error("Failed to spawn process '{process_name}': {source}")]
    SpawnFailed {
        /// The name or description of the process being spawned.
        process_name: Cow<'static, str>,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// No program was given.
    #[error("Cannot spawn a process from an empty command")]
    EmptyCommand,
}

/// Errors that can occur when sending a signal to a process.
#[derive(Debug, Error)]
#[error("Failed to send '{signal}' signal to process '{process_name}': {source}")]
pub struct SignalError {
    /// The name of the process.
    pub process_name: Cow<'static, str>,
    /// The signal that could not be sent.
    pub signal: &'static str,
    /// The underlying IO error.
    #[source]
    pub source: io::Error,
}

/// Errors that can occur when running a command to completion.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors that can occur when loading configuration or resolving the pig binary.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Environment variable '{name}' is not set")]
    MissingEnv { name: &'static str },
}
