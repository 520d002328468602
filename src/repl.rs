//! Interactive console loop
//!
//! Reads one question per line, prints the model's answer, and keeps going
//! until input ends or the shutdown signal fires. The signal is honored both
//! while waiting for input and while a turn is in flight.

use crate::conversation::Conversation;
use crate::Result;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info};

pub const PROMPT: &str = "Ask: ";

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplExit {
    EndOfInput,
    Interrupted,
}

pub struct Repl {
    conversation: Conversation,
}

impl Repl {
    pub fn new(conversation: Conversation) -> Self {
        Self { conversation }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub async fn run<R, W, S>(&mut self, reader: R, mut writer: W, shutdown: S) -> Result<ReplExit>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut lines = reader.lines();

        loop {
            writer.write_all(PROMPT.as_bytes()).await?;
            writer.flush().await?;

            let line = tokio::select! {
                _ = &mut shutdown => {
                    return finish(&mut writer, ReplExit::Interrupted).await;
                }
                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                return finish(&mut writer, ReplExit::EndOfInput).await;
            };

            let query = line.trim();
            if query.is_empty() {
                continue;
            }

            let outcome = tokio::select! {
                _ = &mut shutdown => {
                    return finish(&mut writer, ReplExit::Interrupted).await;
                }
                outcome = self.conversation.say(query) => outcome,
            };

            let rendered = match outcome {
                Ok(turn) => format!("Answer: {}\n\n", turn.answer),
                Err(e) => {
                    error!(error = %e, "Turn failed");
                    format!("Error: {}\n\n", e)
                }
            };
            writer.write_all(rendered.as_bytes()).await?;
            writer.flush().await?;
        }
    }
}

async fn finish<W: AsyncWrite + Unpin>(writer: &mut W, exit: ReplExit) -> Result<ReplExit> {
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    info!(?exit, "Console loop stopped");
    Ok(exit)
}
