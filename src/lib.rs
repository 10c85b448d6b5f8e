//! Order Bot — collects weekly food orders from chat and exports them as CSV.

pub mod agent;
pub mod channels;
pub mod config;
pub mod error;
pub mod orders;
