//! Alternate title model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An original or alternative title of a title, one per region/language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aka {
    pub title_id: String,
    pub ordering: i64,
    pub aka: String,
    pub region: Option<String>,
    pub language: Option<String>,
    pub aka_type: Option<String>,
    pub attributes: String,
    pub is_original_title: Option<bool>,
}

impl fmt::Display for Aka {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} AKA '{}' (type: {}, language: {}, region: {})",
            self.title_id,
            self.aka,
            self.aka_type.as_deref().unwrap_or("N/A"),
            self.language.as_deref().unwrap_or("N/A"),
            self.region.as_deref().unwrap_or("N/A"),
        )
    }
}
