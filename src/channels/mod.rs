//! Channel abstraction for message I/O.

pub mod channel;
pub mod cli;
pub mod http;
pub mod manager;
pub mod telegram;

pub use channel::*;
pub use cli::CliChannel;
pub use http::HttpChannel;
pub use manager::ChannelManager;
pub use telegram::TelegramChannel;
