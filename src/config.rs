//! Runner configuration and resolution of the pig executable.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Names the pig launcher script. Used unless pig runs from a jar.
pub const PIG_ENV: &str = "PIG";

/// Names the pig jar. When it points to an existing file, pig runs through `java -jar`.
pub const PIG_JAR_ENV: &str = "PIG_JAR";

/// Configuration of a [crate::Pig] runner, usually loaded from a YAML file.
///
/// ```yaml
/// is_jar: true
/// ```
///
/// Unknown keys are kept in [PigConfig::extra].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PigConfig {
    /// Run pig from the jar named by `PIG_JAR`. When unset, this is decided by whether that jar
    /// exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_jar: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl PigConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), ?config, "Loaded pig config");
        Ok(config)
    }

    /// Parses a YAML document. An empty document yields the default config.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn with_is_jar(mut self, is_jar: bool) -> Self {
        self.is_jar = Some(is_jar);
        self
    }

    /// Looks up a key not otherwise known to this config.
    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.extra.get(key)
    }
}

/// The program, and its leading arguments, that start pig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PigCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PigCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Resolves the pig command from the variables of the current process environment.
    pub fn from_env(config: &PigConfig) -> Result<Self, ConfigError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolves the pig command, reading environment variables through `env`.
    ///
    /// - Jar mode runs `java -jar $PIG_JAR`.
    /// - Otherwise `$PIG` is run.
    pub fn resolve(
        config: &PigConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let pig_jar = env(PIG_JAR_ENV);
        let is_jar = config.is_jar.unwrap_or_else(|| {
            pig_jar
                .as_deref()
                .is_some_and(|jar| Path::new(jar).exists())
        });

        if is_jar {
            let jar = pig_jar.ok_or(ConfigError::MissingEnv { name: PIG_JAR_ENV })?;
            let jar = Path::new(&jar).components().collect::<PathBuf>();
            return Ok(Self::new("java")
                .arg("-jar")
                .arg(jar.display().to_string()));
        }

        let pig = env(PIG_ENV).ok_or(ConfigError::MissingEnv { name: PIG_ENV })?;
        Ok(Self::new(pig))
    }

    /// The full argument vector, program first.
    pub fn to_argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}
