//! The fixed tag catalog used to filter the blog index.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The active filter of the blog index.
///
/// The catalog is closed: `All` plus the five selectable labels. Any other
/// value is rejected at the boundary by [`TagFilter::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagFilter {
    #[default]
    All,
    Tech,
    Productivity,
    Thought,
    BookReview,
    Resources,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tag `{0}`")]
pub struct UnknownTag(pub String);

impl TagFilter {
    /// Selector order, `All` first.
    pub const CATALOG: [TagFilter; 6] = [
        TagFilter::All,
        TagFilter::Tech,
        TagFilter::Productivity,
        TagFilter::Thought,
        TagFilter::BookReview,
        TagFilter::Resources,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            TagFilter::All => "all",
            TagFilter::Tech => "tech",
            TagFilter::Productivity => "productivity",
            TagFilter::Thought => "thought",
            TagFilter::BookReview => "book-review",
            TagFilter::Resources => "resources",
        }
    }

    /// Position within [`TagFilter::CATALOG`].
    pub const fn ordinal(self) -> usize {
        match self {
            TagFilter::All => 0,
            TagFilter::Tech => 1,
            TagFilter::Productivity => 2,
            TagFilter::Thought => 3,
            TagFilter::BookReview => 4,
            TagFilter::Resources => 5,
        }
    }

    pub const fn is_all(self) -> bool {
        matches!(self, TagFilter::All)
    }

    /// Display label: first character upper-cased, the rest untouched.
    pub fn label(self) -> String {
        capitalize_first(self.as_str())
    }

    /// Whether a post carrying `tags` passes this filter.
    pub fn matches<S: AsRef<str>>(self, tags: &[S]) -> bool {
        match self {
            TagFilter::All => true,
            other => tags.iter().any(|tag| tag.as_ref() == other.as_str()),
        }
    }

    /// Parse an optional query value; an absent or empty value means `All`.
    pub fn from_query(value: Option<&str>) -> Result<Self, UnknownTag> {
        match value {
            None | Some("") => Ok(TagFilter::All),
            Some(raw) => raw.parse(),
        }
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagFilter {
    type Err = UnknownTag;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        TagFilter::CATALOG
            .into_iter()
            .find(|tag| tag.as_str() == value)
            .ok_or_else(|| UnknownTag(value.to_string()))
    }
}

pub fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => {
            let mut out = String::with_capacity(value.len());
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
            out
        }
        None => String::new(),
    }
}
