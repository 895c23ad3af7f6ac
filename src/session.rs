//! Session controller and status indicator
//!
//! Owns the transcript and the status shown to the user, and moves a single
//! request through `Idle -> Awaiting -> Idle`.

use crate::bridge::Bridge;
use crate::context::{ContextBuilder, Turn};
use crate::{ChatError, Result};
use std::fmt;
use tracing::{debug, info, warn};

/// What the status display shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Connected,
    Thinking,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Connected => "connected",
            Status::Thinking => "thinking",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Request lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// One request is in flight
    Awaiting,
}

/// How a request settled, shown to the user exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The orchestrator answered; the text is now part of the transcript
    Reply(String),
    /// The request failed; the reason is not part of the transcript
    Failure(String),
}

/// Drives one conversation
#[derive(Debug, Default)]
pub struct SessionController {
    context: ContextBuilder,
    state: SessionState,
    status: Status,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn transcript(&self) -> &ContextBuilder {
        &self.context
    }

    /// Whether a new submission would be accepted right now
    pub fn can_submit(&self) -> bool {
        self.state == SessionState::Idle
    }

    /// Record the user's message and return the prompt to send.
    ///
    /// Blank input and submissions while a request is in flight are rejected
    /// without touching any state.
    pub fn begin(&mut self, input: &str) -> Result<String> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyInput);
        }
        if self.state == SessionState::Awaiting {
            debug!("Rejected submission while a request is in flight");
            return Err(ChatError::Busy);
        }

        self.context.append(Turn::user(text))?;
        self.status = Status::Thinking;
        self.state = SessionState::Awaiting;
        info!("Request started ({} turns)", self.context.len());

        Ok(self.context.serialize())
    }

    /// Apply the result of the in-flight request and return to `Idle`.
    pub fn settle(&mut self, result: Result<String>) -> Outcome {
        if self.state != SessionState::Awaiting {
            warn!("Settled a request that was never started");
        }

        let outcome = match result {
            Ok(text) => match self.context.append(Turn::assistant(text.clone())) {
                Ok(()) => Outcome::Reply(text),
                Err(e) => Outcome::Failure(e.to_string()),
            },
            Err(e) => {
                warn!("Request failed: {}", e);
                Outcome::Failure(e.to_string())
            }
        };

        self.status = Status::Connected;
        self.state = SessionState::Idle;
        outcome
    }

    /// Run one full request against `bridge`.
    ///
    /// Only rejected submissions return `Err`; bridge failures come back as
    /// [`Outcome::Failure`].
    pub async fn submit<B: Bridge>(&mut self, bridge: &B, input: &str) -> Result<Outcome> {
        let prompt = self.begin(input)?;
        let result = bridge.invoke(&prompt).await;
        Ok(self.settle(result))
    }
}
