//! Order text parser.
//!
//! Two regex passes over a free-form message:
//! 1. find the first `<n>.hét:` block and the `word: text` lines after it
//! 2. split that block into day segments, where a segment starts at a line
//!    whose leading token (two or more word characters) begins with one of
//!    [`WEEKDAY_INITIALS`]
//!
//! Lines inside the block that do not start with a weekday initial are not
//! day headers; their text is absorbed into the preceding day.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::model::{Orders, WEEKDAY_INITIALS, WeekOrders};

/// `<digits>.hét:` followed by any number of `word: text` lines.
static WEEK_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\.hét:\s*((?:\w+:[^\n]+\n?)*)").expect("week block pattern compiles")
});

/// A day header at the start of a line: `<weekday-initial><word chars>:`,
/// at least two characters long.
static DAY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    let initials: String = WEEKDAY_INITIALS
        .chars()
        .flat_map(|c| [c, c.to_ascii_uppercase()])
        .collect();
    Regex::new(&format!(r"(?m)^([{initials}]\w+):")).expect("day header pattern compiles")
});

/// Parse an order message into `week -> day -> items`.
///
/// Returns an empty map when the text holds no week block. Only the first
/// week block is read; anything around it is ignored.
pub fn parse_orders(text: &str) -> Orders {
    let text = text.trim();
    let mut orders = Orders::new();

    let Some(caps) = WEEK_BLOCK.captures(text) else {
        debug!(chars = text.len(), "No week block found in message");
        return orders;
    };

    let week = caps[1].to_string();
    let block = caps.get(2).map_or("", |m| m.as_str()).trim();
    let days = parse_days(block);

    debug!(week = %week, days = days.len(), "Parsed week block");
    orders.insert(week, days);
    orders
}

/// Split a week block into day segments.
///
/// A day repeated within the same block keeps its first position but takes
/// the items of its last segment.
fn parse_days(block: &str) -> WeekOrders {
    let headers: Vec<_> = DAY_HEADER.captures_iter(block).collect();
    let mut days = WeekOrders::new();

    for (i, caps) in headers.iter().enumerate() {
        let (Some(whole), Some(token)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = headers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(block.len(), |m| m.start());

        let items = split_items(&block[whole.end()..end]);
        days.insert(token.as_str().to_lowercase(), items);
    }

    days
}

/// Split a day's item text on commas and line breaks, dropping blanks.
fn split_items(text: &str) -> Vec<String> {
    text.split([',', '\n'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
