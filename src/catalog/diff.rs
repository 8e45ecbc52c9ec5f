//! Missing-episode diff and aired/future classification
//!
//! Given the canonical episode list of a show and the episodes present in the
//! library, computes which episodes are missing and splits them into those
//! that have already aired and those still to come. The manual re-match path
//! runs exactly the same code as the scan.

use std::collections::{BTreeMap, HashSet};

use chrono::{Local, NaiveDate};
use serde::Serialize;

/// Season/episode coordinate. Orders by season, then episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EpisodeKey {
    pub season: i32,
    pub episode: i32,
}

impl EpisodeKey {
    pub fn new(season: i32, episode: i32) -> Self {
        Self { season, episode }
    }
}

impl std::fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

/// Whether every aired canonical episode is owned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Completeness {
    Unknown,
    Complete,
    Incomplete,
}

impl Completeness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Completeness::Unknown => "Unknown",
            Completeness::Complete => "Complete",
            Completeness::Incomplete => "Incomplete",
        }
    }
}

impl std::fmt::Display for Completeness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of diffing one show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowDiff {
    pub aired_missing: Vec<EpisodeKey>,
    pub future_missing: Vec<EpisodeKey>,
    pub completeness: Completeness,
    pub display_status: String,
}

impl ShowDiff {
    /// Diff for a show without a canonical match
    pub fn unknown() -> Self {
        Self {
            aired_missing: Vec::new(),
            future_missing: Vec::new(),
            completeness: Completeness::Unknown,
            display_status: Completeness::Unknown.to_string(),
        }
    }
}

/// First day that does not count as aired yet, in local time
pub fn start_of_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a `YYYY-MM-DD` air date
pub fn parse_air_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// An episode counts as aired when its date is strictly before today.
/// Missing or unparseable dates count as aired.
pub fn is_aired(air_date: Option<&str>, today: NaiveDate) -> bool {
    match air_date.and_then(parse_air_date) {
        Some(date) => date < today,
        None => true,
    }
}

/// Diff canonical episodes (with their air dates) against the owned set.
///
/// `canonical_status` is the metadata source's series status string
/// ("Returning Series", "Ended", "Canceled", ...).
pub fn diff_episodes(
    canonical: &BTreeMap<EpisodeKey, Option<String>>,
    owned: &HashSet<EpisodeKey>,
    canonical_status: Option<&str>,
    today: NaiveDate,
) -> ShowDiff {
    let mut aired_missing = Vec::new();
    let mut future_missing = Vec::new();

    // BTreeMap iteration keeps both partitions sorted by (season, episode)
    for (key, air_date) in canonical {
        if owned.contains(key) {
            continue;
        }
        if is_aired(air_date.as_deref(), today) {
            aired_missing.push(*key);
        } else {
            future_missing.push(*key);
        }
    }

    let completeness = if aired_missing.is_empty() {
        Completeness::Complete
    } else {
        Completeness::Incomplete
    };

    let display_status = display_status(completeness, !future_missing.is_empty(), canonical_status);

    ShowDiff {
        aired_missing,
        future_missing,
        completeness,
        display_status,
    }
}

/// Compose the display status shown next to a show.
///
/// Priority: upcoming episodes, then an airing series, then an ended or
/// canceled one; anything else is "Unknown".
pub fn display_status(
    completeness: Completeness,
    has_future: bool,
    canonical_status: Option<&str>,
) -> String {
    if has_future {
        return format!("{} - Upcoming", completeness);
    }

    match canonical_status.map(str::trim) {
        Some(status) if is_airing(status) => format!("{} - Ongoing", completeness),
        Some(status) if is_finished(status) => format!("{} - {}", completeness, status),
        _ => Completeness::Unknown.to_string(),
    }
}

fn is_airing(status: &str) -> bool {
    status.eq_ignore_ascii_case("Returning Series") || status.eq_ignore_ascii_case("In Production")
}

fn is_finished(status: &str) -> bool {
    status.eq_ignore_ascii_case("Ended")
        || status.eq_ignore_ascii_case("Canceled")
        || status.eq_ignore_ascii_case("Cancelled")
}
