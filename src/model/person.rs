//! Person and crew models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cast or crew member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Natural key (e.g. `nm0000001`)
    pub person_id: String,
    pub name: String,
    pub born: Option<i64>,
    pub died: Option<i64>,
    pub primary_professions: String,
    pub known_for_titles: String,
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = |y: Option<i64>| y.map_or_else(|| "unknown".to_string(), |y| y.to_string());
        write!(
            f,
            "{} {} ({}-{})",
            self.person_id,
            self.name,
            year(self.born),
            year(self.died)
        )
    }
}

/// One principal credit of a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crew {
    pub title_id: String,
    pub ordering: i64,
    pub person_id: Option<String>,
    /// Joined from the person table for display.
    pub person_name: Option<String>,
    pub category: Option<String>,
    pub job: String,
    /// Bracket list as it appears in the feed, e.g. `["Self"]`.
    pub characters: String,
}

impl Crew {
    /// Characters with the list brackets removed.
    #[must_use]
    pub fn clean_characters(&self) -> String {
        self.characters.replace(['[', ']'], "")
    }
}

impl fmt::Display for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let person = self
            .person_name
            .as_deref()
            .or(self.person_id.as_deref())
            .unwrap_or("?");
        write!(
            f,
            "{person} worked as {} ",
            self.category.as_deref().unwrap_or("?")
        )?;
        if !self.characters.is_empty() {
            write!(f, "(played {}) ", self.clean_characters())?;
        }
        write!(f, "on {}", self.title_id)
    }
}
