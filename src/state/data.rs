/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the catalog store and the UI layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ValidationError};

/// Highest rating a game can carry (stars)
pub const MAX_RATING: u8 = 5;

/// Play status of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameStatus {
    #[default]
    Backlog,
    Playing,
    Done,
}

impl GameStatus {
    pub const ALL: [GameStatus; 3] = [GameStatus::Backlog, GameStatus::Playing, GameStatus::Done];

    /// Stored name (e.g. "PLAYING")
    pub fn name(&self) -> &'static str {
        match self {
            GameStatus::Backlog => "BACKLOG",
            GameStatus::Playing => "PLAYING",
            GameStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GameStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BACKLOG" => Ok(GameStatus::Backlog),
            "PLAYING" => Ok(GameStatus::Playing),
            "DONE" => Ok(GameStatus::Done),
            other => Err(Error::Fetch(format!("unknown game status '{}'", other))),
        }
    }
}

/// Represents a single game in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Store-assigned document ID (None until first upsert)
    pub id: Option<String>,
    pub title: String,
    pub platform: String,
    pub status: GameStatus,
    /// Star rating, 0..=5
    pub rating: u8,
    /// Free-form notes (may be empty)
    pub notes: String,
    /// Download URL of the cover image, empty when there is no cover
    pub cover_url: String,
}

impl CatalogItem {
    /// Create a new, not yet persisted item
    pub fn new(title: impl Into<String>, platform: impl Into<String>, status: GameStatus, rating: u8) -> Self {
        Self {
            id: None,
            title: title.into(),
            platform: platform.into(),
            status,
            rating,
            notes: String::new(),
            cover_url: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn has_cover(&self) -> bool {
        !self.cover_url.trim().is_empty()
    }

    /// Check the local form invariants before anything is sent to a store
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::TitleMissing);
        }
        check_rating(i64::from(self.rating))?;
        Ok(())
    }
}

/// Rating must stay within 0..=MAX_RATING
pub fn check_rating(rating: i64) -> Result<u8, ValidationError> {
    if (0..=i64::from(MAX_RATING)).contains(&rating) {
        Ok(rating as u8)
    } else {
        Err(ValidationError::RatingOutOfRange(rating))
    }
}

/// Presentation ordering selector for the game list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Title,
    Platform,
    Status,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [SortKey::Title, SortKey::Platform, SortKey::Status];
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Title => "Title",
            SortKey::Platform => "Platform",
            SortKey::Status => "Status",
        })
    }
}
