//! Order parsing and accumulation.

pub mod model;
pub mod parser;
pub mod store;

pub use model::{Orders, WeekOrders, Weekday};
pub use parser::parse_orders;
pub use store::{EXPORT_CONTENT_TYPE, OrderStore, export_file_name};
