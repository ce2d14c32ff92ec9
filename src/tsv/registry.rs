//! Static descriptors for every TSV entity type.
//!
//! Each [`TsvSchema`] describes one feed file: where it comes from, how its
//! columns map onto table fields, which fields name dimension rows that must
//! exist before a record is written, and which fields identify a row for
//! upserts. Import and export are driven entirely by these descriptors, so a
//! new entity type only needs a new descriptor and its table DDL.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::cast::Cast;

/// Value used for rows that only exist to satisfy a reference.
pub const PLACEHOLDER: &str = "PLACEHOLDER";

/// One mapped column: table field, feed column and conversion.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    /// Column name in the storage table.
    pub field: &'static str,
    /// Header name in the TSV file.
    pub column: &'static str,
    /// Conversion between feed text and stored value.
    pub cast: Cast,
}

/// A field whose value is the natural key of another table's row.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    /// Referencing field (must also appear in the field map).
    pub field: &'static str,
    /// Referenced table.
    pub table: &'static str,
    /// Natural-key column of the referenced table.
    pub key: &'static str,
}

/// Descriptor of one TSV entity type.
#[derive(Debug)]
pub struct TsvSchema {
    pub kind: EntityKind,
    /// Storage table.
    pub table: &'static str,
    /// Feed file name, also used for exports.
    pub filename: &'static str,
    /// Ordered column mapping; the order is the export column order.
    pub fields: &'static [FieldMap],
    /// Natural-key references that are created on first sight.
    pub foreign_keys: &'static [ForeignKey],
    /// Fields of the uniqueness constraint used for conflict resolution.
    pub unique_fields: &'static [&'static str],
    /// Name of the caller flag that skips this entity type.
    pub skip_flag: &'static str,
    /// `ORDER BY` clause for deterministic exports.
    pub order_by: &'static str,
    /// Field that holds [`PLACEHOLDER`] on rows that must not be exported.
    pub placeholder_field: Option<&'static str>,
    /// `(lower, upper)` integer fields; `upper` may not be below `lower`
    /// when both are present.
    pub ordered_fields: Option<(&'static str, &'static str)>,
}

impl TsvSchema {
    /// Names of all mapped fields, in column order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.field).collect()
    }

    /// Feed header names, in column order.
    #[must_use]
    pub fn columns(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.column).collect()
    }

    /// Look up the mapping of a table field.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&FieldMap> {
        self.fields.iter().find(|f| f.field == field)
    }

    /// Position of a table field in the column mapping.
    #[must_use]
    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.field == field)
    }

    /// Whether the field names a dimension row.
    #[must_use]
    pub fn is_reference(&self, field: &str) -> bool {
        self.foreign_keys.iter().any(|fk| fk.field == field)
    }
}

/// The entity types present in the feed, in import order.
///
/// Later types reference earlier ones, so the order of [`EntityKind::ALL`] is
/// a correctness requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Title,
    Person,
    Aka,
    Crew,
    Episode,
    Rating,
}

impl EntityKind {
    pub const ALL: [Self; 6] = [
        Self::Title,
        Self::Person,
        Self::Aka,
        Self::Crew,
        Self::Episode,
        Self::Rating,
    ];

    /// The descriptor for this entity type.
    #[must_use]
    pub fn schema(self) -> &'static TsvSchema {
        match self {
            Self::Title => &TITLE,
            Self::Person => &PERSON,
            Self::Aka => &AKA,
            Self::Crew => &CREW,
            Self::Episode => &EPISODE,
            Self::Rating => &RATING,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Person => "person",
            Self::Aka => "aka",
            Self::Crew => "crew",
            Self::Episode => "episode",
            Self::Rating => "rating",
        }
    }

    /// Resolve a skip flag name (e.g. `skip_title_akas`).
    #[must_use]
    pub fn from_skip_flag(flag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.schema().skip_flag == flag)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s || k.schema().filename == s)
            .ok_or_else(|| format!("Unknown entity type: {s}"))
    }
}

const fn map(field: &'static str, column: &'static str, cast: Cast) -> FieldMap {
    FieldMap { field, column, cast }
}

const fn fk(field: &'static str, table: &'static str, key: &'static str) -> ForeignKey {
    ForeignKey { field, table, key }
}

static TITLE: TsvSchema = TsvSchema {
    kind: EntityKind::Title,
    table: "title",
    filename: "title.basics.tsv.gz",
    fields: &[
        map("title_id", "tconst", Cast::Text),
        map("title_type_id", "titleType", Cast::Text),
        map("primary_title", "primaryTitle", Cast::Text),
        map("original_title", "originalTitle", Cast::Text),
        map("is_adult", "isAdult", Cast::Boolean),
        map("premiered", "startYear", Cast::Integer),
        map("ended", "endYear", Cast::Integer),
        map("runtime_minutes", "runtimeMinutes", Cast::Integer),
        map("genres", "genres", Cast::Text),
    ],
    foreign_keys: &[fk("title_type_id", "title_type", "name")],
    unique_fields: &["title_id"],
    skip_flag: "skip_title_basics",
    order_by: "title_id",
    placeholder_field: Some("primary_title"),
    ordered_fields: Some(("premiered", "ended")),
};

static PERSON: TsvSchema = TsvSchema {
    kind: EntityKind::Person,
    table: "person",
    filename: "name.basics.tsv.gz",
    fields: &[
        map("person_id", "nconst", Cast::Text),
        map("name", "primaryName", Cast::Text),
        map("born", "birthYear", Cast::Integer),
        map("died", "deathYear", Cast::Integer),
        map("primary_professions", "primaryProfession", Cast::Text),
        map("known_for_titles", "knownForTitles", Cast::Text),
    ],
    foreign_keys: &[],
    unique_fields: &["person_id"],
    skip_flag: "skip_name_basics",
    order_by: "person_id",
    placeholder_field: Some("name"),
    ordered_fields: None,
};

static AKA: TsvSchema = TsvSchema {
    kind: EntityKind::Aka,
    table: "aka",
    filename: "title.akas.tsv.gz",
    fields: &[
        map("title_id", "titleId", Cast::Text),
        map("ordering", "ordering", Cast::Integer),
        map("aka", "title", Cast::Text),
        map("region_id", "region", Cast::Text),
        map("language_id", "language", Cast::Text),
        map("aka_type_id", "types", Cast::Text),
        map("attributes", "attributes", Cast::Text),
        map("is_original_title", "isOriginalTitle", Cast::Boolean),
    ],
    foreign_keys: &[
        fk("title_id", "title", "title_id"),
        fk("region_id", "aka_region", "name"),
        fk("language_id", "aka_language", "name"),
        fk("aka_type_id", "aka_type", "name"),
    ],
    unique_fields: &["title_id", "ordering"],
    skip_flag: "skip_title_akas",
    order_by: "id",
    placeholder_field: None,
    ordered_fields: None,
};

static CREW: TsvSchema = TsvSchema {
    kind: EntityKind::Crew,
    table: "crew",
    filename: "title.principals.tsv.gz",
    fields: &[
        map("title_id", "tconst", Cast::Text),
        map("ordering", "ordering", Cast::Integer),
        map("person_id", "nconst", Cast::Text),
        map("category_id", "category", Cast::Text),
        map("job", "job", Cast::Text),
        map("characters", "characters", Cast::Text),
    ],
    foreign_keys: &[
        fk("title_id", "title", "title_id"),
        fk("person_id", "person", "person_id"),
        fk("category_id", "crew_category", "name"),
    ],
    unique_fields: &["title_id", "ordering"],
    skip_flag: "skip_title_principals",
    order_by: "id",
    placeholder_field: None,
    ordered_fields: None,
};

static EPISODE: TsvSchema = TsvSchema {
    kind: EntityKind::Episode,
    table: "episode",
    filename: "title.episode.tsv.gz",
    fields: &[
        map("episode_title_id", "tconst", Cast::Text),
        map("show_title_id", "parentTconst", Cast::Text),
        map("season_number", "seasonNumber", Cast::Integer),
        map("episode_number", "episodeNumber", Cast::Integer),
    ],
    foreign_keys: &[
        fk("show_title_id", "title", "title_id"),
        fk("episode_title_id", "title", "title_id"),
    ],
    unique_fields: &["show_title_id", "episode_title_id"],
    skip_flag: "skip_title_episodes",
    order_by: "id",
    placeholder_field: None,
    ordered_fields: None,
};

static RATING: TsvSchema = TsvSchema {
    kind: EntityKind::Rating,
    table: "rating",
    filename: "title.ratings.tsv.gz",
    fields: &[
        map("title_id", "tconst", Cast::Text),
        map("rating", "averageRating", Cast::Float),
        map("votes", "numVotes", Cast::Integer),
    ],
    foreign_keys: &[fk("title_id", "title", "title_id")],
    unique_fields: &["title_id"],
    skip_flag: "skip_title_ratings",
    order_by: "id",
    placeholder_field: None,
    ordered_fields: None,
};
