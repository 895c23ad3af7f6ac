//! mcphost-chat CLI
//!
//! Chat with the `mcphost` orchestrator from the terminal.

use clap::Parser;
use mcphost_chat::config::{self, Overrides, Settings};
use mcphost_chat::tui::App;
use mcphost_chat::{ChatConfig, Outcome, ProcessBridge, SessionController};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Chat with a command-line orchestrator
#[derive(Parser, Debug)]
#[command(name = "mcphost-chat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Working directory the orchestrator runs in
    #[arg(short = 'C', long)]
    cwd: Option<PathBuf>,

    /// Orchestrator config file passed to `--config`
    #[arg(long)]
    config: Option<PathBuf>,

    /// Orchestrator program to run
    #[arg(long)]
    program: Option<String>,

    /// Settings file (defaults to <config dir>/mcphost-chat/config.toml)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write logs to this file (the TUI otherwise logs nothing)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Verbose output: debug-level logs
    #[arg(short, long)]
    verbose: bool,

    /// Disable TUI and use plain text mode
    #[arg(long)]
    no_tui: bool,

    /// Initial message to send
    #[arg(trailing_var_arg = true)]
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::discover(cli.settings.as_deref())?;
    let config = config::resolve(
        settings,
        Overrides {
            program: cli.program.clone(),
            config: cli.config.clone(),
            working_dir: cli.cwd.clone(),
        },
    )?
    .with_log_file(cli.log_file.clone())
    .with_verbose(cli.verbose);

    let initial_prompt = cli.prompt.join(" ");

    if cli.no_tui {
        run_plain_mode(config, initial_prompt).await
    } else {
        run_tui_mode(config, initial_prompt).await
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}

async fn run_tui_mode(config: ChatConfig, initial_prompt: String) -> anyhow::Result<()> {
    // The terminal belongs to ratatui, so logs only go to an explicit file
    if let Some(path) = &config.log_file {
        let file = File::create(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(config.verbose))
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    }

    info!("Starting mcphost-chat (TUI)");
    log_config(&config);

    let project_name = config
        .working_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let mut app = App::new(project_name, ProcessBridge::from_config(&config))?;
    if !initial_prompt.trim().is_empty() {
        app.submit(&initial_prompt);
    }

    app.run().await?;
    Ok(())
}

async fn run_plain_mode(config: ChatConfig, initial_prompt: String) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config.verbose))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    info!("Starting mcphost-chat (plain mode)");
    log_config(&config);

    let bridge = ProcessBridge::from_config(&config);
    let mut session = SessionController::new();

    if !initial_prompt.trim().is_empty() {
        relay(&mut session, &bridge, &initial_prompt).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        relay(&mut session, &bridge, &line).await?;
    }

    Ok(())
}

/// Send one message and print whatever comes back
async fn relay(
    session: &mut SessionController,
    bridge: &ProcessBridge,
    text: &str,
) -> anyhow::Result<()> {
    info!("Status: {}", session.status());
    let outcome = session.submit(bridge, text).await?;
    info!("Status: {}", session.status());

    let mut stdout = io::stdout();
    match outcome {
        Outcome::Reply(reply) => writeln!(stdout, "{}\n", reply)?,
        Outcome::Failure(reason) => writeln!(stdout, "Error: {}\n", reason)?,
    }
    stdout.flush()?;
    Ok(())
}

fn log_config(config: &ChatConfig) {
    info!("Program: {}", config.program);
    info!("Working directory: {:?}", config.working_dir);
    info!("Orchestrator config: {:?}", config.orchestrator_config);
    if !config.orchestrator_config.exists() {
        warn!(
            "Orchestrator config {:?} does not exist",
            config.orchestrator_config
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_overrides() {
        let cli = Cli::parse_from([
            "mcphost-chat",
            "-C",
            "/srv/roles",
            "--config",
            "/srv/roles/.mcphost.yml",
            "--no-tui",
            "list",
            "roles",
        ]);
        assert_eq!(cli.cwd, Some(PathBuf::from("/srv/roles")));
        assert_eq!(cli.config, Some(PathBuf::from("/srv/roles/.mcphost.yml")));
        assert!(cli.no_tui);
        assert_eq!(cli.prompt.join(" "), "list roles");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["mcphost-chat"]);
        assert!(cli.cwd.is_none());
        assert!(cli.program.is_none());
        assert!(!cli.verbose);
        assert!(cli.prompt.is_empty());
    }
}
