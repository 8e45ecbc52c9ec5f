//! Release title ownership matching
//!
//! Decides whether an indexer release (free text such as
//! `The.Expanse.S03.1080p.BluRay.x264`) refers to something already in the
//! catalog. Checks run in this order and the first hit wins:
//!
//! 1. Movie shape: `<title> <year>` or `<title> (<year>)`. The title is
//!    matched against owned movie titles.
//! 2. TV shape, first matching pattern only:
//!    `<title> S<NN>`, `<title> season`, `<title> <year>`, `<title> complete`.
//!    The title is matched against owned show titles.
//! 3. The whole raw release title, compared case-insensitively for equality
//!    with owned movie titles, then owned show titles.
//!
//! Title matches in steps 1 and 2 are case-insensitive substring tests: the
//! extracted title must occur inside an owned title. This is a heuristic;
//! unusual naming produces misses and short titles can collide.

use once_cell::sync::Lazy;
use regex::Regex;

static MOVIE_WITH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<title>.+?)\s*[\(\[]?(?P<year>\d{4})[\)\]]?(?:\s|$)").expect("valid regex")
});

/// TV patterns in priority order
static TV_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(?P<title>.+?)\s+S\d{1,2}(?:E\d{1,3})?(?:\s|$)",
        r"(?i)^(?P<title>.+?)\s+season\b",
        r"^(?P<title>.+?)\s+[\(\[]?\d{4}[\)\]]?(?:\s|$)",
        r"(?i)^(?P<title>.+?)\s+complete\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

/// Owned titles, lowercased once per search
#[derive(Debug, Clone, Default)]
pub struct OwnedTitles {
    movies: Vec<String>,
    shows: Vec<String>,
}

impl OwnedTitles {
    pub fn new<M, S>(movies: M, shows: S) -> Self
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        Self {
            movies: movies.into_iter().map(|t| t.as_ref().trim().to_lowercase()).collect(),
            shows: shows.into_iter().map(|t| t.as_ref().trim().to_lowercase()).collect(),
        }
    }

    fn movie_contains(&self, title: &str) -> bool {
        contains_title(&self.movies, title)
    }

    fn show_contains(&self, title: &str) -> bool {
        contains_title(&self.shows, title)
    }

    fn movie_equals(&self, raw: &str) -> bool {
        let raw = raw.trim().to_lowercase();
        self.movies.iter().any(|owned| *owned == raw)
    }

    fn show_equals(&self, raw: &str) -> bool {
        let raw = raw.trim().to_lowercase();
        self.shows.iter().any(|owned| *owned == raw)
    }
}

/// Whether the release refers to an owned movie or show
pub fn is_owned(release_title: &str, owned: &OwnedTitles) -> bool {
    if let Some(title) = movie_title(release_title)
        && owned.movie_contains(&title)
    {
        return true;
    }

    if let Some(title) = tv_title(release_title)
        && owned.show_contains(&title)
    {
        return true;
    }

    owned.movie_equals(release_title) || owned.show_equals(release_title)
}

/// Title part of a movie-shaped release name
pub fn movie_title(release_title: &str) -> Option<String> {
    extract(&MOVIE_WITH_YEAR, &normalize(release_title))
}

/// Title part of a TV-shaped release name, using the first pattern that matches
pub fn tv_title(release_title: &str) -> Option<String> {
    let cleaned = normalize(release_title);
    TV_PATTERNS
        .iter()
        .find(|pattern| pattern.is_match(&cleaned))
        .and_then(|pattern| extract(pattern, &cleaned))
}

fn extract(pattern: &Regex, cleaned: &str) -> Option<String> {
    let caps = pattern.captures(cleaned)?;
    let title = caps
        .name("title")?
        .as_str()
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '(' | '['))
        .trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Lowercase, read `.` and `_` as spaces, collapse whitespace
fn normalize(title: &str) -> String {
    title
        .to_lowercase()
        .replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn contains_title(owned: &[String], title: &str) -> bool {
    let title = normalize(title);
    !title.is_empty() && owned.iter().any(|candidate| normalize(candidate).contains(&title))
}
