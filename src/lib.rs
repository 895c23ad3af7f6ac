//! mcphost-chat
//!
//! A conversational front-end for the `mcphost` CLI:
//! - Accumulates the conversation and replays it as one prompt per request
//! - Runs the orchestrator once per request and collects its merged output
//! - Strips terminal color codes before showing the reply

pub mod bridge;
pub mod config;
pub mod context;
pub mod sanitize;
pub mod session;
pub mod tui;

pub use bridge::{Bridge, InvocationRequest, ProcessBridge};
pub use context::{ContextBuilder, Role, Turn};
pub use sanitize::sanitize;
pub use session::{Outcome, SessionController, SessionState, Status};

use std::path::PathBuf;

/// Program invoked when no other orchestrator is configured
pub const DEFAULT_PROGRAM: &str = "mcphost";

/// Orchestrator config file looked up inside the working directory by default
pub const DEFAULT_ORCHESTRATOR_CONFIG: &str = ".mcphost.yml";

/// Resolved startup configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Orchestrator binary to spawn
    pub program: String,

    /// Absolute path passed to the orchestrator's `--config` flag
    pub orchestrator_config: PathBuf,

    /// Absolute working directory for every invocation
    pub working_dir: PathBuf,

    /// Where to write logs while the TUI owns the terminal
    pub log_file: Option<PathBuf>,

    /// Whether to log at debug level
    pub verbose: bool,
}

impl ChatConfig {
    pub fn new(working_dir: PathBuf) -> Self {
        let orchestrator_config = working_dir.join(DEFAULT_ORCHESTRATOR_CONFIG);
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            orchestrator_config,
            working_dir,
            log_file: None,
            verbose: false,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_orchestrator_config(mut self, path: PathBuf) -> Self {
        self.orchestrator_config = path;
        self
    }

    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Result type for chat operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors that can occur while relaying a conversation
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("failed to start {program}: {source}")]
    SpawnFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} {status}")]
    ProcessFailure { program: String, status: String },

    #[error("failed to read orchestrator output: {0}")]
    Stream(std::io::Error),

    #[error("request task failed: {0}")]
    Task(String),

    #[error("message is empty")]
    EmptyInput,

    #[error("a request is already in flight")]
    Busy,

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
