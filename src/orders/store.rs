//! In-memory order accumulator and CSV export.

use tracing::{debug, info};
use uuid::Uuid;

use super::model::{Orders, Weekday};
use crate::error::ExportError;

/// MIME type of the exported file.
pub const EXPORT_CONTENT_TYPE: &str = "text/csv";

/// Accumulated orders for the lifetime of the process.
///
/// Weeks and days keep the order in which they were first seen. Nothing is
/// ever removed; the only way to reset is to drop the store.
#[derive(Debug, Default, Clone)]
pub struct OrderStore {
    weeks: Orders,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a parse result into the store.
    ///
    /// Missing weeks and days are created; items are appended after the ones
    /// already collected for that day.
    pub fn merge(&mut self, parsed: Orders) {
        for (week, days) in parsed {
            let bucket = self.weeks.entry(week.clone()).or_default();
            for (day, items) in days {
                let count = items.len();
                bucket.entry(day.clone()).or_default().extend(items);
                debug!(week = %week, day = %day, added = count, "Merged day orders");
            }
        }
    }

    /// Serialize every collected order as CSV.
    ///
    /// Each week produces a record holding the week identifier, followed by
    /// one `<item>_<ordinal>` record per item. Days are written in the order
    /// they were first collected; days outside the weekday vocabulary are
    /// skipped.
    pub fn export(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());

        let mut records = 0usize;
        for (week, days) in &self.weeks {
            writer.write_record([week.as_str()])?;
            records += 1;

            for (day, items) in days {
                let Some(weekday) = Weekday::from_key(day) else {
                    debug!(week = %week, day = %day, skipped = items.len(), "Skipping unknown day on export");
                    continue;
                };
                for item in items {
                    writer.write_record([format!("{item}_{}", weekday.ordinal())])?;
                    records += 1;
                }
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))?;

        info!(weeks = self.weeks.len(), records, bytes = bytes.len(), "Exported orders");
        Ok(bytes)
    }

    /// Items collected for one day of one week.
    pub fn day_items(&self, week: &str, day: &str) -> Option<&[String]> {
        self.weeks
            .get(week)
            .and_then(|days| days.get(day))
            .map(Vec::as_slice)
    }

    pub fn week_count(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }
}

/// File name for an export attachment, unique per export.
pub fn export_file_name() -> String {
    format!("orders_{}.csv", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::model::WeekOrders;
    use crate::orders::parser::parse_orders;

    const SAMPLE: &str = "1.hét:\nhétfő: pizza, kóla\nkedd: saláta\n";

    fn export_lines(store: &OrderStore) -> Vec<String> {
        let bytes = store.export().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        text.split("\r\n")
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    }

    fn week(days: &[(&str, &[&str])]) -> WeekOrders {
        days.iter()
            .map(|(day, items)| {
                (
                    day.to_string(),
                    items.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn new_store_is_empty() {
        let store = OrderStore::new();
        assert!(store.is_empty());
        assert_eq!(store.week_count(), 0);
        assert!(store.day_items("1", "hétfő").is_none());
    }

    #[test]
    fn merge_twice_appends() {
        let mut store = OrderStore::new();
        store.merge(parse_orders(SAMPLE));
        store.merge(parse_orders(SAMPLE));

        assert_eq!(
            store.day_items("1", "hétfő").unwrap(),
            ["pizza", "kóla", "pizza", "kóla"]
        );
        assert_eq!(store.day_items("1", "kedd").unwrap(), ["saláta", "saláta"]);
        assert_eq!(store.week_count(), 1);
    }

    #[test]
    fn merge_concatenates_in_merge_order() {
        let mut store = OrderStore::new();
        let mut first = Orders::new();
        first.insert("5".into(), week(&[("szerda", &["a", "b"])]));
        let mut second = Orders::new();
        second.insert("5".into(), week(&[("szerda", &["c"]), ("péntek", &["d"])]));

        store.merge(first);
        store.merge(second);

        assert_eq!(store.day_items("5", "szerda").unwrap(), ["a", "b", "c"]);
        assert_eq!(store.day_items("5", "péntek").unwrap(), ["d"]);
        let days: Vec<&str> = store.weeks["5"].keys().map(String::as_str).collect();
        assert_eq!(days, vec!["szerda", "péntek"]);
    }

    #[test]
    fn merge_keeps_empty_week_and_day() {
        let mut store = OrderStore::new();
        store.merge(parse_orders("9.hét:"));
        store.merge(parse_orders("10.hét:\nkedd: ,"));

        assert_eq!(store.week_count(), 2);
        assert!(store.weeks["9"].is_empty());
        assert_eq!(store.day_items("10", "kedd").unwrap().len(), 0);
    }

    #[test]
    fn export_matches_merged_state() {
        let mut store = OrderStore::new();
        store.merge(parse_orders(SAMPLE));
        store.merge(parse_orders(SAMPLE));

        assert_eq!(
            export_lines(&store),
            vec!["1", "pizza_1", "kóla_1", "pizza_1", "kóla_1", "saláta_2", "saláta_2"]
        );
    }

    #[test]
    fn export_bytes_use_crlf_records() {
        let mut store = OrderStore::new();
        store.merge(parse_orders("1.hét:\nkedd: saláta"));
        let bytes = store.export().unwrap();
        assert_eq!(bytes, "1\r\nsaláta_2\r\n".as_bytes());
    }

    #[test]
    fn export_of_empty_store_has_no_records() {
        let store = OrderStore::new();
        assert!(store.export().unwrap().is_empty());
    }

    #[test]
    fn export_skips_unknown_days() {
        let mut store = OrderStore::new();
        store.merge(parse_orders("2.hét:\nszombat: pizza\nkedd: leves\nhetfo: hal"));

        assert_eq!(export_lines(&store), vec!["2", "leves_2"]);
    }

    #[test]
    fn export_follows_collection_order_not_weekday_order() {
        let mut store = OrderStore::new();
        store.merge(parse_orders("3.hét:\npéntek: hal\nhétfő: leves"));
        store.merge(parse_orders("1.hét:\ncsütörtök: rizs"));

        assert_eq!(
            export_lines(&store),
            vec!["3", "hal_5", "leves_1", "1", "rizs_4"]
        );
    }

    #[test]
    fn export_tags_every_weekday() {
        let mut store = OrderStore::new();
        store.merge(parse_orders(
            "1.hét:\nhétfő: a\nkedd: b\nszerda: c\ncsütörtök: d\npéntek: e",
        ));
        assert_eq!(
            export_lines(&store),
            vec!["1", "a_1", "b_2", "c_3", "d_4", "e_5"]
        );
    }

    #[test]
    fn export_quotes_fields_with_quotes() {
        let mut store = OrderStore::new();
        let mut orders = Orders::new();
        orders.insert("1".into(), week(&[("kedd", &["a \"special\" one"])]));
        store.merge(orders);

        let text = String::from_utf8(store.export().unwrap()).unwrap();
        assert_eq!(text, "1\r\n\"a \"\"special\"\" one_2\"\r\n");
    }

    #[test]
    fn export_file_name_is_unique_csv() {
        let a = export_file_name();
        let b = export_file_name();
        assert!(a.starts_with("orders_"));
        assert!(a.ends_with(".csv"));
        assert_ne!(a, b);
    }
}
