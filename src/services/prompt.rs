// src/services/prompt.rs

//! Confirmation dialogs for review actions.
//!
//! A prompt either yields the user's answer or reports that the user backed
//! out; backing out is never an error.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::models::Submission;

/// Asks the reviewer for input before an action hits the network.
#[async_trait]
pub trait ReviewPrompt: Send + Sync {
    /// Reason for rejecting `submission`; `None` abandons the rejection.
    async fn rejection_note(&self, submission: &Submission) -> Option<String>;

    /// Whether `display_name` should really be deleted.
    async fn confirm_delete(&self, display_name: &str) -> bool;
}

/// Answers fixed in advance, e.g. from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct PresetPrompt {
    pub note: Option<String>,
    pub confirm: bool,
}

impl PresetPrompt {
    pub fn new(note: Option<String>, confirm: bool) -> Self {
        Self { note, confirm }
    }
}

#[async_trait]
impl ReviewPrompt for PresetPrompt {
    async fn rejection_note(&self, _submission: &Submission) -> Option<String> {
        self.note.clone()
    }

    async fn confirm_delete(&self, _display_name: &str) -> bool {
        self.confirm
    }
}

/// Interactive prompt on stdin/stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    async fn ask(question: &str) -> Option<String> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(question.as_bytes()).await.ok()?;
        stdout.flush().await.ok()?;

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

#[async_trait]
impl ReviewPrompt for TerminalPrompt {
    async fn rejection_note(&self, submission: &Submission) -> Option<String> {
        Self::ask(&format!("Reason for rejecting {}: ", submission.name))
            .await
            .filter(|note| !note.is_empty())
    }

    async fn confirm_delete(&self, display_name: &str) -> bool {
        Self::ask(&format!("Delete {display_name}? This cannot be undone [y/N]: "))
            .await
            .is_some_and(|answer| matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }
}
