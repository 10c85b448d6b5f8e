//! Order data model — nested week/day buckets and the weekday vocabulary.

use indexmap::IndexMap;

/// Items ordered for each day of a week, keyed by lower-cased day token.
///
/// Iteration follows first-insertion order of the day keys.
pub type WeekOrders = IndexMap<String, Vec<String>>;

/// Orders keyed by week identifier (the number before `.hét`).
pub type Orders = IndexMap<String, WeekOrders>;

/// Letters a day token may start with (first letters of the five weekday names).
pub const WEEKDAY_INITIALS: &str = "hkscp";

/// One of the five canonical weekdays that can be exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    /// The day name as it is written in order messages.
    pub fn key(self) -> &'static str {
        match self {
            Weekday::Monday => "hétfő",
            Weekday::Tuesday => "kedd",
            Weekday::Wednesday => "szerda",
            Weekday::Thursday => "csütörtök",
            Weekday::Friday => "péntek",
        }
    }

    /// Position of the day in the export (1-5).
    pub fn ordinal(self) -> u8 {
        match self {
            Weekday::Monday => 1,
            Weekday::Tuesday => 2,
            Weekday::Wednesday => 3,
            Weekday::Thursday => 4,
            Weekday::Friday => 5,
        }
    }

    /// Look up a canonical weekday by its exact (lower-case) name.
    ///
    /// Anything outside the vocabulary — abbreviations, typos, other
    /// languages — returns `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|day| day.key() == key)
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
