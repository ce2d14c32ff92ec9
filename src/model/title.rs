//! Title model and the records hanging off a title (rating, episodes).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tsv::registry::PLACEHOLDER;

/// A title: the basic unit everything else relates to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    /// Natural key (e.g. `tt0000001`)
    pub title_id: String,

    /// Title type name (movie, short, tvSeries, ...)
    pub title_type: Option<String>,

    pub primary_title: String,
    pub original_title: String,
    pub is_adult: Option<bool>,

    /// Release year, or start year for series
    pub premiered: Option<i64>,

    /// End year for series
    pub ended: Option<i64>,

    pub runtime_minutes: Option<i64>,

    /// Comma-joined, up to three genres
    pub genres: String,
}

impl Title {
    /// Link to the title's page on imdb.com.
    #[must_use]
    pub fn imdb_url(&self) -> String {
        format!("https://www.imdb.com/title/{}/", self.title_id)
    }

    #[must_use]
    pub fn genre_list(&self) -> Vec<&str> {
        self.genres.split(',').filter(|g| !g.is_empty()).collect()
    }

    /// Every year the title ran, inclusive.
    ///
    /// Just the premiere year when there is no end year, and nothing when
    /// the premiere year is unknown.
    #[must_use]
    pub fn year_list(&self) -> Vec<i64> {
        match (self.premiered, self.ended) {
            (Some(start), Some(end)) => (start..=end).collect(),
            (Some(start), None) => vec![start],
            _ => Vec::new(),
        }
    }

    /// Directory-safe name such as `Carmencita (1894)`.
    #[must_use]
    pub fn dirname(&self) -> String {
        let year = self
            .premiered
            .map_or_else(|| "None".to_string(), |y| y.to_string());
        format!("{} ({year})", self.primary_title).replace(std::path::MAIN_SEPARATOR, "_")
    }

    /// True for rows only created to satisfy a reference.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.primary_title == PLACEHOLDER
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) - {} ({})",
            self.title_id,
            self.title_type.as_deref().unwrap_or("?"),
            self.primary_title,
            self.premiered.map_or_else(|| "?".to_string(), |y| y.to_string())
        )
    }
}

/// Average rating and vote count of a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub title_id: String,
    pub rating: Option<f64>,
    pub votes: Option<i64>,
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rating = self.rating.map_or_else(|| "?".to_string(), |r| format!("{r:.1}"));
        write!(
            f,
            "{} rating {rating} ({} votes)",
            self.title_id,
            self.votes.unwrap_or(0)
        )
    }
}

/// Link between a show and one of its episodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub episode_title_id: String,
    pub show_title_id: String,
    pub season_number: Option<i64>,
    pub episode_number: Option<i64>,
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Show {} episode {}", self.show_title_id, self.episode_title_id)?;
        if let (Some(season), Some(episode)) = (self.season_number, self.episode_number) {
            write!(f, " (S{season:02}E{episode:02})")?;
        }
        Ok(())
    }
}
