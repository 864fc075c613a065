//! Player and season identifiers
//!
//! Upstream speaks in numeric person IDs and season labels of the form
//! `YYYY-YY` (`2014-15`). Internally a season is its starting year.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Earliest season the upstream service publishes game logs for
pub const FIRST_SEASON: u16 = 1946;

/// Upper bound accepted for season years
pub const LAST_SEASON: u16 = 2100;

/// Numeric player identifier as assigned by the stats service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Wrap a raw upstream ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parse an ID from text, rejecting zero and non-numeric input
    ///
    /// # Examples
    ///
    /// ```
    /// use gamelog_collector::identifier::EntityId;
    ///
    /// let id = EntityId::parse(" 201939 ").unwrap();
    /// assert_eq!(id.as_u64(), 201939);
    /// assert!(EntityId::parse("curry").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        let trimmed = s.trim();
        let id: u64 = trimmed
            .parse()
            .map_err(|_| IdentifierError::InvalidEntity(trimmed.to_string()))?;
        if id == 0 {
            return Err(IdentifierError::InvalidEntity(trimmed.to_string()));
        }
        Ok(Self(id))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A season, identified by the calendar year it starts in
///
/// # Examples
///
/// ```
/// use gamelog_collector::identifier::Season;
///
/// let season = Season::parse("2014-15").unwrap();
/// assert_eq!(season.start_year(), 2014);
/// assert_eq!(season.label(), "2014-15");
/// assert_eq!(Season::parse("2014").unwrap(), season);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Season(u16);

impl Season {
    /// Create a season from its starting year
    pub fn new(start_year: u16) -> Result<Self, IdentifierError> {
        if !(FIRST_SEASON..=LAST_SEASON).contains(&start_year) {
            return Err(IdentifierError::SeasonOutOfRange(start_year));
        }
        Ok(Self(start_year))
    }

    /// Parse either `YYYY` or `YYYY-YY`
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        let s = s.trim();
        let (start, suffix) = match s.split_once('-') {
            Some((start, suffix)) => (start, Some(suffix)),
            None => (s, None),
        };

        let year: u16 = start
            .parse()
            .map_err(|_| IdentifierError::InvalidSeason(s.to_string()))?;
        let season = Self::new(year)?;

        if let Some(suffix) = suffix {
            let expected = format!("{:02}", (year + 1) % 100);
            if suffix != expected {
                return Err(IdentifierError::InvalidSeason(format!(
                    "{s}: expected {year}-{expected}"
                )));
            }
        }

        Ok(season)
    }

    /// Starting calendar year
    pub fn start_year(&self) -> u16 {
        self.0
    }

    /// Wire label used by the stats service (`2014-15`)
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.0, (self.0 + 1) % 100)
    }

    /// Season in progress (or most recently started) at the given date
    ///
    /// Seasons tip off in October; anything before that belongs to the
    /// season that started the previous year.
    pub fn containing(date: chrono::NaiveDate) -> Self {
        use chrono::Datelike;
        let year = date.year() as u16;
        let start = if date.month() >= 10 { year } else { year - 1 };
        Self(start.clamp(FIRST_SEASON, LAST_SEASON))
    }

    /// Season in progress today (UTC)
    pub fn current() -> Self {
        Self::containing(chrono::Utc::now().date_naive())
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Season {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Inclusive range of seasons, iterated in increasing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRange {
    start: Season,
    end: Season,
}

impl SeasonRange {
    /// Build a range; `end` must not precede `start`
    pub fn new(start: Season, end: Season) -> Result<Self, IdentifierError> {
        if end < start {
            return Err(IdentifierError::EmptyRange {
                start: start.label(),
                end: end.label(),
            });
        }
        Ok(Self { start, end })
    }

    /// First season
    pub fn start(&self) -> Season {
        self.start
    }

    /// Last season (inclusive)
    pub fn end(&self) -> Season {
        self.end
    }

    /// Number of seasons covered
    pub fn len(&self) -> usize {
        usize::from(self.end.0 - self.start.0) + 1
    }

    /// Always false; a range holds at least one season
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the season lies inside the range
    pub fn contains(&self, season: Season) -> bool {
        season >= self.start && season <= self.end
    }

    /// Whether a career spanning `[from_year, to_year]` touches this range
    ///
    /// The roster reports careers by starting year of the first and last
    /// season played.
    pub fn overlaps_years(&self, from_year: u16, to_year: u16) -> bool {
        from_year <= self.end.0 && to_year >= self.start.0
    }

    /// Seasons in increasing order
    pub fn iter(&self) -> impl Iterator<Item = Season> {
        (self.start.0..=self.end.0).map(Season)
    }
}

impl fmt::Display for SeasonRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.start_year(), self.end.start_year())
    }
}

/// Errors that can occur during identifier parsing
#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    /// Player ID is not a positive integer
    #[error("invalid player id: {0:?}")]
    InvalidEntity(String),

    /// Season text is malformed
    #[error("invalid season: {0}")]
    InvalidSeason(String),

    /// Season year outside supported bounds
    #[error("season {0} outside supported range {FIRST_SEASON}..={LAST_SEASON}")]
    SeasonOutOfRange(u16),

    /// Range end precedes its start
    #[error("season range {start}..{end} is empty")]
    EmptyRange {
        /// Requested first season
        start: String,
        /// Requested last season
        end: String,
    },
}
