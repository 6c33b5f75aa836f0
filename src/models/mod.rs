use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A journal entry.
///
/// The serde renames pin the JSON contract: the same shape lives in the
/// localStorage slot, in export files and in relay request bodies.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct Story {
    pub id: String,
    pub title: String,
    pub content: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub favorite: bool,

    /// ISO-8601, set once at creation. Edits never touch it.
    #[serde(rename = "createdAt")]
    pub created_at: String,

    /// Relay-side id, present once the story was created remotely.
    #[serde(rename = "remoteRef", default, skip_serializing_if = "Option::is_none")]
    pub remote_ref: Option<String>,
}

/// How the browse panel lays stories out. Persisted as its string form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum ViewMode {
    #[default]
    List,
    Timeline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum SortOrder {
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

/// Tag-panel selection. `Favorites` replaces the magic "#favorites" tag
/// value older export files may still mention; it never collides with a
/// real tag.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub(crate) enum TagFilter {
    #[default]
    All,
    Favorites,
    Tag(String),
}

/// Everything the filter/sort pipeline needs, in one value. What the main
/// panel shows is a pure function of (stories, query, view mode).
#[derive(Clone, Debug, PartialEq, Default)]
pub(crate) struct ViewQuery {
    pub secret_mode: bool,
    pub filter: TagFilter,
    pub sort: SortOrder,
}
