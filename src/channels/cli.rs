//! CLI channel — stdin/stdout REPL for local use.
//!
//! Order messages span several lines, so input is collected until an empty
//! line (or EOF) and sent as one message. Single-line commands such as
//! `orders` or `/quit` are sent as soon as they are entered.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// A simple CLI channel that reads from stdin and writes to stdout.
#[derive(Default)]
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

/// Whether a single line should be sent immediately instead of buffered.
fn is_command_line(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    lower == "orders" || lower.starts_with('/')
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();
            let mut buffer: Vec<String> = Vec::new();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if buffer.is_empty() && is_command_line(&line) {
                            let msg = IncomingMessage::new("cli", "local-user", line.trim());
                            if tx.send(msg).is_err() {
                                break;
                            }
                            continue;
                        }

                        if !line.trim().is_empty() {
                            buffer.push(line);
                            eprint!(". ");
                            continue;
                        }

                        if buffer.is_empty() {
                            eprint!("> ");
                            continue;
                        }

                        let text = buffer.join("\n");
                        buffer.clear();
                        let msg = IncomingMessage::new("cli", "local-user", &text);
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        if !buffer.is_empty() {
                            let msg = IncomingMessage::new("cli", "local-user", &buffer.join("\n"));
                            let _ = tx.send(msg);
                        }
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("\n{}", response.content);
        for attachment in &response.attachments {
            println!(
                "--- {} ({}, {} bytes) ---",
                attachment.name,
                attachment.content_type,
                attachment.data.len()
            );
            println!("{}", String::from_utf8_lossy(&attachment.data));
        }
        println!();
        eprint!("> ");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
