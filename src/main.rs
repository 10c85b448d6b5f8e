use order_bot::agent::OrderBot;
use order_bot::channels::{Channel, ChannelManager, CliChannel, HttpChannel, TelegramChannel};
use order_bot::config::{BotConfig, TelegramConfig};
use tower_http::cors::CorsLayer;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the tracing subscriber: stderr always, plus a daily log file when
/// a log directory is configured. The guard must live until exit.
fn init_tracing(config: &BotConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "order-bot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotConfig::from_env()?;
    let _log_guard = init_tracing(&config);

    eprintln!("🍕 Order Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Activities: http://0.0.0.0:{}/api/messages",
        config.http_port
    );

    let mut channels = ChannelManager::new();

    // HTTP activity endpoint is always on
    let http_channel = HttpChannel::new(config.reply_timeout);
    let app = http_channel.router().layer(CorsLayer::permissive());
    channels.add(Box::new(http_channel));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port)).await?;
    let http_port = config.http_port;
    tokio::spawn(async move {
        tracing::info!(port = http_port, "HTTP activity server started");
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "HTTP server stopped");
        }
    });

    if config.cli_enabled {
        channels.add(Box::new(CliChannel::new()));
        eprintln!("   CLI: enabled (finish an order with an empty line, /quit to exit)");
    }

    if let Some(telegram) = TelegramConfig::from_env() {
        eprintln!("   Telegram: enabled (allowed: {})", telegram.allowed_summary());
        let channel = TelegramChannel::new(telegram);
        if let Err(e) = channel.health_check().await {
            tracing::warn!(error = %e, "Telegram health check failed");
        }
        channels.add(Box::new(channel));
    }

    eprintln!("   Channels: {}\n", channels.names().join(", "));

    let bot = OrderBot::new(config, channels);
    bot.run().await?;

    Ok(())
}
