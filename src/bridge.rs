//! Process bridge to the orchestrator CLI
//!
//! Every request spawns the orchestrator once, collects its stdout and stderr
//! as a single stream and hands back the sanitized text.

use crate::sanitize::sanitize;
use crate::{ChatConfig, ChatError, Result};
use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Read size for each pipe
const CHUNK_SIZE: usize = 8 * 1024;

/// Something that can answer a serialized conversation
pub trait Bridge {
    fn invoke(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Arguments for a single orchestrator run; built per call, never kept
#[derive(Debug, Clone, Copy)]
pub struct InvocationRequest<'a> {
    pub prompt: &'a str,
    pub config_path: &'a Path,
    pub working_dir: &'a Path,
}

impl InvocationRequest<'_> {
    /// `-p <prompt> --quiet --config <path>`
    pub fn args(&self) -> Vec<OsString> {
        vec![
            OsString::from("-p"),
            OsString::from(self.prompt),
            OsString::from("--quiet"),
            OsString::from("--config"),
            self.config_path.as_os_str().to_os_string(),
        ]
    }
}

/// Runs the orchestrator as a subprocess
#[derive(Debug, Clone)]
pub struct ProcessBridge {
    program: String,
    config_path: PathBuf,
    working_dir: PathBuf,
}

impl ProcessBridge {
    pub fn new(program: impl Into<String>, config_path: PathBuf, working_dir: PathBuf) -> Self {
        Self {
            program: program.into(),
            config_path,
            working_dir,
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.orchestrator_config.clone(),
            config.working_dir.clone(),
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn request<'a>(&'a self, prompt: &'a str) -> InvocationRequest<'a> {
        InvocationRequest {
            prompt,
            config_path: &self.config_path,
            working_dir: &self.working_dir,
        }
    }

    /// Spawn the orchestrator, wait for it and return its sanitized output.
    ///
    /// Output gathered before a failure is dropped, never returned.
    pub async fn run(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }

        let request = self.request(prompt);
        info!(
            "Invoking {} in {:?} with config {:?} ({} prompt bytes)",
            self.program,
            request.working_dir,
            request.config_path,
            prompt.len()
        );

        let mut child = Command::new(&self.program)
            .args(request.args())
            .current_dir(request.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ChatError::SpawnFailure {
                program: self.program.clone(),
                source,
            })?;

        debug!("{} started with pid {:?}", self.program, child.id());

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ChatError::Stream(missing_pipe("stdout")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ChatError::Stream(missing_pipe("stderr")))?;

        let output = match read_merged(stdout, stderr).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Lost {} output stream: {}", self.program, e);
                if let Err(kill_err) = child.kill().await {
                    debug!("Could not kill {}: {}", self.program, kill_err);
                }
                return Err(ChatError::Stream(e));
            }
        };

        let status = child.wait().await.map_err(ChatError::Stream)?;
        if !status.success() {
            debug!("Discarding {} bytes of partial output", output.len());
            return Err(ChatError::ProcessFailure {
                program: self.program.clone(),
                status: describe_exit(status),
            });
        }

        let text = sanitize(&String::from_utf8_lossy(&output));
        info!("{} replied with {} bytes", self.program, text.len());
        Ok(text)
    }
}

impl Bridge for ProcessBridge {
    fn invoke(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send {
        self.run(prompt)
    }
}

fn missing_pipe(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, format!("{name} was not captured"))
}

fn describe_exit(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exited with code {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

/// Drain two pipes into one buffer in arrival order until both reach EOF.
///
/// Bytes are kept raw so a UTF-8 sequence split across chunks is decoded
/// intact once the stream ends.
async fn read_merged<O, E>(mut stdout: O, mut stderr: E) -> io::Result<Vec<u8>>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut output = Vec::new();
    let mut out_chunk = vec![0u8; CHUNK_SIZE];
    let mut err_chunk = vec![0u8; CHUNK_SIZE];
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            read = stdout.read(&mut out_chunk), if out_open => match read? {
                0 => out_open = false,
                n => output.extend_from_slice(&out_chunk[..n]),
            },
            read = stderr.read(&mut err_chunk), if err_open => match read? {
                0 => err_open = false,
                n => output.extend_from_slice(&err_chunk[..n]),
            },
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_args() {
        let bridge = ProcessBridge::new(
            "mcphost",
            PathBuf::from("/srv/roles/.mcphost.yml"),
            PathBuf::from("/srv/roles"),
        );
        let request = bridge.request("User: Hi");
        assert_eq!(
            request.args(),
            vec![
                OsString::from("-p"),
                OsString::from("User: Hi"),
                OsString::from("--quiet"),
                OsString::from("--config"),
                OsString::from("/srv/roles/.mcphost.yml"),
            ]
        );
        assert_eq!(request.working_dir, Path::new("/srv/roles"));
    }

    #[test]
    fn test_from_config() {
        let config = ChatConfig::new(PathBuf::from("/work")).with_program("orchestrate");
        let bridge = ProcessBridge::from_config(&config);
        assert_eq!(bridge.program(), "orchestrate");
        assert_eq!(bridge.working_dir(), Path::new("/work"));
        assert_eq!(bridge.request("x").config_path, Path::new("/work/.mcphost.yml"));
    }

    #[tokio::test]
    async fn test_read_merged_collects_both_pipes() {
        let output = read_merged(&b"from stdout "[..], &b"from stderr"[..])
            .await
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.len(), "from stdout from stderr".len());
        assert!(text.contains("from stdout "));
        assert!(text.contains("from stderr"));
    }

    #[tokio::test]
    async fn test_read_merged_empty_streams() {
        let output = read_merged(&b""[..], &b""[..]).await.unwrap();
        assert!(output.is_empty());
    }

    struct BrokenPipe;

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")))
        }
    }

    #[tokio::test]
    async fn test_read_merged_propagates_read_error() {
        let err = read_merged(&b"partial"[..], BrokenPipe).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_blank_prompt_is_not_sent() {
        let bridge = ProcessBridge::new(
            "/nonexistent/orchestrator",
            PathBuf::from("/tmp/c.yml"),
            PathBuf::from("/tmp"),
        );
        assert!(matches!(bridge.run("  ").await, Err(ChatError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_failure() {
        let bridge = ProcessBridge::new(
            "/nonexistent/orchestrator",
            PathBuf::from("/tmp/c.yml"),
            std::env::temp_dir(),
        );
        let err = bridge.invoke("User: Hi").await.unwrap_err();
        assert!(matches!(err, ChatError::SpawnFailure { .. }));
        assert!(err.to_string().contains("/nonexistent/orchestrator"));
    }
}
