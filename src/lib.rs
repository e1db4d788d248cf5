mod child;
mod collector;
mod config;
mod error;
mod logging;
mod options;
mod output;
mod output_stream;
mod process;
mod process_handle;
mod runner;
mod signal;

pub use child::ChildProcess;
pub use collector::{CollectOptions, ProcessOutputCollector};
pub use config::{PIG_ENV, PIG_JAR_ENV, PigCommand, PigConfig};
pub use error::{CloseError, CollectError, ConfigError, RunError, SignalError, SpawnError};
pub use options::{ExecType, LogLevel, PigOptions, safe_quote};
pub use output::{Output, PENDING_EXIT_CODE};
pub use output_stream::line_stream_reader::LineStreamReader;
pub use output_stream::{DEFAULT_CHUNK_SIZE, StreamType};
pub use process::{AutoName, Process, ProcessName};
pub use process_handle::{ProcessHandle, RunningState};
pub use runner::{Pig, PigTest};
pub use signal::Killer;
