//! Order bot loop.
//!
//! Pulls messages from every channel, one at a time, and either merges the
//! parsed order into the store or replies with the CSV export. A message is
//! fully handled (parse, merge, reply) before the next one is read, so the
//! store needs no lock. Messages from different channels are handled in the
//! order they arrive on the merged stream, which is not deterministic when
//! they arrive at the same time.

use std::sync::Arc;

use futures::StreamExt;

use crate::agent::submission::{Submission, SubmissionParser};
use crate::channels::{Attachment, ChannelManager, IncomingMessage, OutgoingResponse};
use crate::config::BotConfig;
use crate::error::Error;
use crate::orders::{EXPORT_CONTENT_TYPE, OrderStore, export_file_name, parse_orders};

pub const ORDERS_COLLECTED: &str = "Orders have been collected.";
pub const PARSE_FAILED: &str = "Could not parse the order. Please check the format.";
pub const EXPORT_CAPTION: &str = "Here are the collected orders:";

pub const HELP_TEXT: &str = "\
Send orders for one week in this format:

1.hét:
hétfő: pizza, kóla
kedd: saláta

Send `orders` to get everything collected so far as a CSV file.";

/// The order-taking bot. Owns the order store for the life of the process.
pub struct OrderBot {
    config: BotConfig,
    channels: Arc<ChannelManager>,
    store: OrderStore,
}

impl OrderBot {
    pub fn new(config: BotConfig, channels: ChannelManager) -> Self {
        Self {
            config,
            channels: Arc::new(channels),
            store: OrderStore::new(),
        }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    // ── Main loop ───────────────────────────────────────────────────

    /// Run until Ctrl+C, `/quit`, or every channel stream has ended.
    pub async fn run(mut self) -> Result<(), Error> {
        let mut message_stream = self.channels.start_all().await?;

        tracing::info!("Bot {} ready and listening", self.config.name);

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("All channel streams ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            let response = match self.handle_message(&message) {
                Ok(Some(response)) => response,
                Ok(None) => {
                    tracing::info!("Shutdown command received, exiting...");
                    if let Err(e) = self
                        .channels
                        .respond(&message, OutgoingResponse::text("Bye."))
                        .await
                    {
                        tracing::warn!(channel = %message.channel, error = %e, "Failed to send goodbye");
                    }
                    break;
                }
                Err(e) => {
                    tracing::error!("Error handling message: {}", e);
                    OutgoingResponse::text(format!("Error: {}", e))
                }
            };

            if let Err(e) = self.channels.respond(&message, response).await {
                tracing::error!(channel = %message.channel, error = %e, "Failed to send response");
            }
        }

        tracing::info!("Bot shutting down...");
        self.channels.shutdown_all().await?;

        Ok(())
    }

    // ── Message dispatch ────────────────────────────────────────────

    /// Handle one message. `Ok(None)` means the bot should stop, which only the
    /// CLI channel may request.
    pub fn handle_message(
        &mut self,
        message: &IncomingMessage,
    ) -> Result<Option<OutgoingResponse>, Error> {
        tracing::debug!(
            user = %message.user_id,
            channel = %message.channel,
            received_at = %message.received_at,
            chars = message.content.len(),
            "Received message"
        );

        let response = match SubmissionParser::parse(&message.content) {
            Submission::OrderText { content } => self.collect_orders(message, &content),
            Submission::ExportOrders => self.export_orders()?,
            Submission::Help => OutgoingResponse::text(HELP_TEXT),
            Submission::Quit if message.channel == "cli" => return Ok(None),
            Submission::Quit => OutgoingResponse::text("The bot can only be stopped from the console."),
        };

        Ok(Some(response))
    }

    fn collect_orders(&mut self, message: &IncomingMessage, content: &str) -> OutgoingResponse {
        let parsed = parse_orders(content);
        if parsed.is_empty() {
            tracing::info!(user = %message.user_id, channel = %message.channel, "Could not parse order");
            return OutgoingResponse::text(PARSE_FAILED);
        }

        let items: usize = parsed
            .values()
            .flat_map(|days| days.values())
            .map(Vec::len)
            .sum();
        tracing::info!(
            user = %message.user_id,
            channel = %message.channel,
            weeks = ?parsed.keys().collect::<Vec<_>>(),
            items,
            "Orders collected"
        );

        self.store.merge(parsed);
        OutgoingResponse::text(ORDERS_COLLECTED)
    }

    fn export_orders(&self) -> Result<OutgoingResponse, Error> {
        let csv = self.store.export()?;
        let attachment = Attachment::new(export_file_name(), EXPORT_CONTENT_TYPE, csv);
        Ok(OutgoingResponse::text(EXPORT_CAPTION).with_attachment(attachment))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use futures::stream;
    use tokio::sync::Mutex;

    use super::*;
    use crate::channels::{Channel, MessageStream};
    use crate::error::ChannelError;

    /// Channel that replays fixed inputs and fails every reply.
    struct FailingChannel {
        inputs: Vec<&'static str>,
        attempts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Channel for FailingChannel {
        fn name(&self) -> &str {
            "cli"
        }

        async fn start(&self) -> Result<MessageStream, ChannelError> {
            let msgs: Vec<_> = self
                .inputs
                .iter()
                .map(|text| IncomingMessage::new("cli", "tester", text))
                .collect();
            Ok(Box::pin(stream::iter(msgs)))
        }

        async fn respond(
            &self,
            _msg: &IncomingMessage,
            response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            self.attempts.lock().await.push(response.content);
            Err(ChannelError::SendFailed {
                name: "cli".into(),
                reason: "closed".into(),
            })
        }

        async fn health_check(&self) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn shutdown(&self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn bot() -> OrderBot {
        OrderBot::new(BotConfig::default(), ChannelManager::new())
    }

    fn send(bot: &mut OrderBot, text: &str) -> OutgoingResponse {
        let msg = IncomingMessage::new("cli", "tester", text);
        bot.handle_message(&msg).unwrap().unwrap()
    }

    fn csv_lines(response: &OutgoingResponse) -> Vec<String> {
        let text = String::from_utf8(response.attachments[0].data.clone()).unwrap();
        text.lines().map(String::from).collect()
    }

    #[test]
    fn order_is_acknowledged_and_stored() {
        let mut bot = bot();
        let resp = send(&mut bot, "1.hét:\nhétfő: pizza, kóla\nkedd: saláta\n");

        assert_eq!(resp, OutgoingResponse::text(ORDERS_COLLECTED));
        assert_eq!(
            bot.store().day_items("1", "hétfő").unwrap(),
            ["pizza", "kóla"]
        );
    }

    #[test]
    fn unparseable_text_gets_format_hint() {
        let mut bot = bot();
        let resp = send(&mut bot, "random text with no week marker");

        assert_eq!(resp.content, PARSE_FAILED);
        assert!(resp.attachments.is_empty());
        assert!(bot.store().is_empty());
    }

    #[test]
    fn empty_week_block_counts_as_collected() {
        let mut bot = bot();
        let resp = send(&mut bot, "2.hét:");
        assert_eq!(resp.content, ORDERS_COLLECTED);
        assert_eq!(bot.store().week_count(), 1);
    }

    #[test]
    fn mixed_case_orders_command_exports() {
        let mut bot = bot();
        send(&mut bot, "1.hét:\nhétfő: pizza, kóla\nkedd: saláta\n");
        send(&mut bot, "1.hét:\nhétfő: pizza, kóla\nkedd: saláta\n");

        let resp = send(&mut bot, "Orders");
        assert_eq!(resp.content, EXPORT_CAPTION);
        assert_eq!(resp.attachments.len(), 1);

        let attachment = &resp.attachments[0];
        assert_eq!(attachment.content_type, "text/csv");
        assert!(attachment.name.starts_with("orders_"));
        assert!(attachment.name.ends_with(".csv"));
        assert_eq!(
            csv_lines(&resp),
            vec!["1", "pizza_1", "kóla_1", "pizza_1", "kóla_1", "saláta_2", "saláta_2"]
        );
    }

    #[test]
    fn export_does_not_clear_store() {
        let mut bot = bot();
        send(&mut bot, "1.hét:\nkedd: leves");
        send(&mut bot, "orders");
        let resp = send(&mut bot, "orders");
        assert_eq!(csv_lines(&resp), vec!["1", "leves_2"]);
    }

    #[test]
    fn export_of_nothing_is_an_empty_file() {
        let mut bot = bot();
        let resp = send(&mut bot, "orders");
        assert_eq!(resp.content, EXPORT_CAPTION);
        assert!(resp.attachments[0].data.is_empty());
    }

    #[test]
    fn help_describes_format() {
        let mut bot = bot();
        let resp = send(&mut bot, "/help");
        assert!(resp.content.contains("1.hét:"));
        assert!(bot.store().is_empty());
    }

    #[test]
    fn quit_stops_the_bot() {
        let mut bot = bot();
        let msg = IncomingMessage::new("cli", "tester", "/quit");
        assert!(bot.handle_message(&msg).unwrap().is_none());
    }

    #[test]
    fn quit_from_remote_channel_is_refused() {
        let mut bot = bot();
        let msg = IncomingMessage::new("http", "someone", "/quit");
        let resp = bot.handle_message(&msg).unwrap().unwrap();
        assert!(resp.content.contains("console"));
    }

    #[tokio::test]
    async fn run_survives_failed_replies_and_stops_on_quit() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let mut channels = ChannelManager::new();
        channels.add(Box::new(FailingChannel {
            inputs: vec!["1.hét:\nkedd: leves", "/quit", "orders"],
            attempts: Arc::clone(&attempts),
        }));

        let bot = OrderBot::new(BotConfig::default(), channels);
        bot.run().await.unwrap();

        assert_eq!(*attempts.lock().await, vec![ORDERS_COLLECTED, "Bye."]);
    }
}
