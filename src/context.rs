//! Conversation transcript and prompt serialization
//!
//! The orchestrator is stateless between invocations, so every request
//! replays the whole conversation as one prompt.

use crate::{ChatError, Result};
use std::fmt;

/// Blank line between serialized turns
const TURN_SEPARATOR: &str = "\n\n";

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used in front of each turn in the serialized prompt
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }

    fn all() -> [Role; 2] {
        [Role::User, Role::Assistant]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry in the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Accumulates the transcript in chronological order
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    turns: Vec<Turn>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn to the end of the transcript.
    ///
    /// User turns must carry non-blank content. Assistant turns are taken
    /// as-is since the orchestrator may legitimately print nothing.
    pub fn append(&mut self, turn: Turn) -> Result<()> {
        if turn.role == Role::User && turn.content.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }
        self.turns.push(turn);
        Ok(())
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render the transcript as `"<Role>: <content>"` blocks separated by a
    /// blank line, right-trimmed.
    pub fn serialize(&self) -> String {
        let mut prompt = String::new();
        for turn in &self.turns {
            prompt.push_str(turn.role.label());
            prompt.push_str(": ");
            prompt.push_str(&turn.content);
            prompt.push_str(TURN_SEPARATOR);
        }
        prompt.truncate(prompt.trim_end().len());
        prompt
    }

    /// Split a serialized prompt back into `(role, content)` pairs.
    ///
    /// A new turn starts only at the beginning of the text or after a blank
    /// line followed by a role label, so content containing a literal
    /// `"\n\nUser: "` cannot be told apart from a turn boundary.
    pub fn parse(serialized: &str) -> Vec<(Role, String)> {
        let mut pairs = Vec::new();
        let mut rest = serialized;

        let Some((mut role, header_len)) = leading_role(rest) else {
            return pairs;
        };
        rest = &rest[header_len..];

        loop {
            match next_boundary(rest) {
                Some((idx, next_role, next_header_len)) => {
                    pairs.push((role, rest[..idx].to_string()));
                    rest = &rest[idx + TURN_SEPARATOR.len() + next_header_len..];
                    role = next_role;
                }
                None => {
                    pairs.push((role, rest.to_string()));
                    break;
                }
            }
        }

        pairs
    }
}

/// Role label at the start of `text` and the length of its header.
///
/// The header is `"<Label>: "`, or a bare `"<Label>:"` when it ends the
/// text: an empty final turn loses its space to the right-trim.
fn leading_role(text: &str) -> Option<(Role, usize)> {
    Role::all().into_iter().find_map(|role| {
        let after = text.strip_prefix(role.label())?;
        if after.starts_with(": ") {
            Some((role, role.label().len() + 2))
        } else if after == ":" {
            Some((role, role.label().len() + 1))
        } else {
            None
        }
    })
}

/// Byte offset of the earliest separator that introduces a new turn
fn next_boundary(text: &str) -> Option<(usize, Role, usize)> {
    let mut search_from = 0;
    while let Some(found) = text[search_from..].find(TURN_SEPARATOR) {
        let idx = search_from + found;
        if let Some((role, header_len)) = leading_role(&text[idx + TURN_SEPARATOR.len()..]) {
            return Some((idx, role, header_len));
        }
        search_from = idx + 1;
    }
    None
}
