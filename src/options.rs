//! Command line options understood by `pig`.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Log level passed with `-debug`. Pig defaults to `INFO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
        })
    }
}

/// Execution mode passed with `-exectype`. Pig defaults to `mapreduce`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecType {
    Local,
    MapReduce,
}

impl Display for ExecType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ExecType::Local => "local",
            ExecType::MapReduce => "mapreduce",
        })
    }
}

/// The options of a single pig invocation.
///
/// Every option is unset by default, leaving the choice to pig itself.
/// Turn the options into arguments with [PigOptions::to_args].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PigOptions {
    /// Log4j configuration file, overrides the log configuration.
    pub log4jconf: Option<PathBuf>,
    /// Brief logging (no timestamps).
    pub brief: bool,
    /// Syntax check only.
    pub check: bool,
    pub debug: Option<LogLevel>,
    /// Commands to execute.
    pub execute: Option<String>,
    /// Path to the script to execute.
    pub file: Option<PathBuf>,
    /// ScriptEngine classname or keyword for the ScriptEngine.
    pub embedded: Option<String>,
    /// Print the help message. Overrides every other option.
    pub help: bool,
    /// Print version information. Overrides every other option but `help`.
    pub version: bool,
    /// Path to the client side log file.
    pub logfile: Option<PathBuf>,
    pub param_file: Option<PathBuf>,
    /// Parameters substituted into the script.
    pub params: BTreeMap<String, String>,
    /// Produce the script with substituted parameters without executing it.
    pub dryrun: bool,
    /// Print all error messages to the screen.
    pub verbose: bool,
    /// Turn warning logging on. This also turns warning aggregation off.
    pub warning: bool,
    pub exectype: Option<ExecType>,
    /// Abort execution on the first failed job.
    pub stop_on_failure: bool,
    /// Turn multiquery optimization off.
    pub no_multiquery: bool,
    pub property_file: Option<PathBuf>,
}

impl PigOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log4jconf(mut self, path: impl Into<PathBuf>) -> Self {
        self.log4jconf = Some(path.into());
        self
    }

    pub fn brief(mut self, brief: bool) -> Self {
        self.brief = brief;
        self
    }

    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    pub fn debug(mut self, level: LogLevel) -> Self {
        self.debug = Some(level);
        self
    }

    pub fn execute(mut self, commands: impl Into<String>) -> Self {
        self.execute = Some(commands.into());
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn embedded(mut self, engine: impl Into<String>) -> Self {
        self.embedded = Some(engine.into());
        self
    }

    pub fn help(mut self, help: bool) -> Self {
        self.help = help;
        self
    }

    pub fn version(mut self, version: bool) -> Self {
        self.version = version;
        self
    }

    pub fn logfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.logfile = Some(path.into());
        self
    }

    pub fn param_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.param_file = Some(path.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn dryrun(mut self, dryrun: bool) -> Self {
        self.dryrun = dryrun;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn warning(mut self, warning: bool) -> Self {
        self.warning = warning;
        self
    }

    pub fn exectype(mut self, exectype: ExecType) -> Self {
        self.exectype = Some(exectype);
        self
    }

    pub fn stop_on_failure(mut self, stop_on_failure: bool) -> Self {
        self.stop_on_failure = stop_on_failure;
        self
    }

    pub fn no_multiquery(mut self, no_multiquery: bool) -> Self {
        self.no_multiquery = no_multiquery;
        self
    }

    pub fn property_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.property_file = Some(path.into());
        self
    }

    /// Converts the options into the arguments passed to pig on the command line.
    ///
    /// `help` and `version` short-circuit: when set, they are the only argument returned.
    /// Parameter values are quoted with [safe_quote].
    pub fn to_args(&self) -> Vec<String> {
        if self.help {
            return vec![String::from("-help")];
        }
        if self.version {
            return vec![String::from("-version")];
        }

        let path = |path: &Option<PathBuf>| path.as_ref().map(|p| p.display().to_string());

        let mut args = Vec::new();
        push_value(&mut args, "-log4jconf", path(&self.log4jconf));
        push_flag(&mut args, "-brief", self.brief);
        push_flag(&mut args, "-check", self.check);
        push_value(&mut args, "-debug", self.debug.map(|level| level.to_string()));
        push_value(&mut args, "-execute", self.execute.clone());
        push_value(&mut args, "-file", path(&self.file));
        push_value(&mut args, "-embedded", self.embedded.clone());
        push_value(&mut args, "-logfile", path(&self.logfile));
        push_value(&mut args, "-param_file", path(&self.param_file));
        for (key, value) in &self.params {
            push_value(&mut args, "-param", Some(format!("{key}={}", safe_quote(value))));
        }
        push_flag(&mut args, "-dryrun", self.dryrun);
        push_flag(&mut args, "-verbose", self.verbose);
        push_flag(&mut args, "-warning", self.warning);
        push_value(&mut args, "-exectype", self.exectype.map(|e| e.to_string()));
        push_flag(&mut args, "-stop_on_failure", self.stop_on_failure);
        push_flag(&mut args, "-no_multiquery", self.no_multiquery);
        push_value(&mut args, "-propertyFile", path(&self.property_file));
        args
    }
}

fn push_value(args: &mut Vec<String>, flag: &str, value: Option<String>) {
    if let Some(value) = value {
        args.push(flag.to_owned());
        args.push(value);
    }
}

fn push_flag(args: &mut Vec<String>, flag: &str, set: bool) {
    if set {
        args.push(flag.to_owned());
    }
}

/// Quotes `value` for pig's parameter substitution.
///
/// Double quotes inside the value are replaced by `'"'"'` and the result is wrapped in double
/// quotes.
pub fn safe_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "'\"'\"'"))
}
