//! Startup configuration
//!
//! Values come from an optional TOML settings file, then command-line
//! overrides, then defaults. Resolution happens once; the bridge only ever
//! sees absolute paths.

use crate::{ChatConfig, ChatError, Result, DEFAULT_ORCHESTRATOR_CONFIG, DEFAULT_PROGRAM};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Orchestrator binary
    pub program: Option<String>,
    /// Orchestrator config file, relative paths resolve against `working_dir`
    pub config: Option<PathBuf>,
    /// Directory the orchestrator runs in
    pub working_dir: Option<PathBuf>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Load the settings file at `path`, or the default location if it exists.
    ///
    /// An explicit path must exist; the default one is optional.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_settings_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// `<config_dir>/mcphost-chat/config.toml`
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mcphost-chat").join("config.toml"))
}

/// Values given on the command line; they win over the settings file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub program: Option<String>,
    pub config: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

/// Merge settings and overrides into a [`ChatConfig`] with absolute paths.
pub fn resolve(settings: Settings, overrides: Overrides) -> Result<ChatConfig> {
    let working_dir = overrides
        .working_dir
        .or(settings.working_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let working_dir = std::fs::canonicalize(&working_dir).map_err(|e| {
        ChatError::Config(format!("working directory {}: {}", working_dir.display(), e))
    })?;
    if !working_dir.is_dir() {
        return Err(ChatError::Config(format!(
            "working directory {} is not a directory",
            working_dir.display()
        )));
    }

    let program = overrides
        .program
        .or(settings.program)
        .unwrap_or_else(|| DEFAULT_PROGRAM.to_string());
    if program.trim().is_empty() {
        return Err(ChatError::Config("program name is empty".to_string()));
    }

    let orchestrator_config = overrides
        .config
        .or(settings.config)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ORCHESTRATOR_CONFIG));
    let orchestrator_config = absolutize(&working_dir, orchestrator_config);

    Ok(ChatConfig::new(working_dir)
        .with_program(program)
        .with_orchestrator_config(orchestrator_config))
}

/// Resolve `path` against `base`; canonicalize when it exists.
fn absolutize(base: &Path, path: PathBuf) -> PathBuf {
    let joined = if path.is_absolute() {
        path
    } else {
        base.join(path)
    };
    std::fs::canonicalize(&joined).unwrap_or(joined)
}
