//! Agent module — submission parsing and the order bot loop.

pub mod order_bot;
pub mod submission;

pub use order_bot::OrderBot;
