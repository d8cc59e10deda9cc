//! Read-only post store loaded once at startup.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::domain::{
    error::DomainError,
    posts::{self, Post},
};

const BUILTIN_POSTS: &str = include_str!("../../content/posts.toml");

/// Ordered, immutable sequence of posts backing the blog index.
pub trait PostSource: Send + Sync {
    fn posts(&self) -> &[Post];
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read post store `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse post store {origin}: {source}")]
    Parse {
        origin: StoreOrigin,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid post store {origin}: {source}")]
    Invalid {
        origin: StoreOrigin,
        #[source]
        source: DomainError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOrigin {
    Builtin,
    File(PathBuf),
    Inline,
}

impl fmt::Display for StoreOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOrigin::Builtin => f.write_str("(builtin)"),
            StoreOrigin::File(path) => write!(f, "`{}`", path.display()),
            StoreOrigin::Inline => f.write_str("(inline)"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreFile {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Debug, Clone)]
pub struct PostStore {
    posts: Arc<[Post]>,
    origin: StoreOrigin,
}

impl PostStore {
    /// Load from `posts_file` when configured, otherwise the embedded catalog.
    pub fn load(posts_file: Option<&Path>) -> Result<Self, StoreError> {
        let store = match posts_file {
            Some(path) => Self::from_path(path)?,
            None => Self::builtin()?,
        };

        info!(
            target = "postgrid::store",
            origin = %store.origin,
            posts = store.len(),
            "Post store loaded"
        );
        Ok(store)
    }

    pub fn builtin() -> Result<Self, StoreError> {
        Self::parse(BUILTIN_POSTS, StoreOrigin::Builtin)
    }

    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, StoreOrigin::File(path.to_path_buf()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, StoreError> {
        Self::parse(raw, StoreOrigin::Inline)
    }

    pub fn from_posts(posts: Vec<Post>) -> Result<Self, StoreError> {
        Self::validated(posts, StoreOrigin::Inline)
    }

    fn parse(raw: &str, origin: StoreOrigin) -> Result<Self, StoreError> {
        let file: StoreFile = toml::from_str(raw).map_err(|source| StoreError::Parse {
            origin: origin.clone(),
            source,
        })?;
        Self::validated(file.posts, origin)
    }

    fn validated(posts: Vec<Post>, origin: StoreOrigin) -> Result<Self, StoreError> {
        posts::validate_posts(&posts).map_err(|source| StoreError::Invalid {
            origin: origin.clone(),
            source,
        })?;
        Ok(Self {
            posts: posts.into(),
            origin,
        })
    }

    pub fn origin(&self) -> &StoreOrigin {
        &self.origin
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl PostSource for PostStore {
    fn posts(&self) -> &[Post] {
        &self.posts
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const TWO_POSTS: &str = r#"
[[posts]]
id = "first"
title = "First"
excerpt = "One"
image = "/img/first.jpg"
date = "2024-03-15T09:00:00Z"
read_time = "3 min"
tags = ["tech"]

[posts.author]
name = "Ada"
avatar = "/img/ada.png"

[[posts]]
id = "second"
title = "Second"
excerpt = "Two"
image = "/img/second.jpg"
date = "2024-03-16T09:00:00+02:00"
read_time = "4 min"
tags = ["thought", "tech"]

[posts.author]
name = "Grace"
avatar = "/img/grace.png"
"#;

    #[test]
    fn builtin_catalog_is_valid() {
        let store = PostStore::builtin().expect("builtin catalog parses");
        assert!(!store.is_empty());
        assert_eq!(store.origin(), &StoreOrigin::Builtin);
    }

    #[test]
    fn inline_store_preserves_order() {
        let store = PostStore::from_toml_str(TWO_POSTS).expect("valid store");
        let ids = store
            .posts()
            .iter()
            .map(|post| post.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["first", "second"]);
        assert_eq!(store.posts()[1].tags, ["thought", "tech"]);
    }

    #[test]
    fn empty_file_is_an_empty_store() {
        let store = PostStore::from_toml_str("").expect("empty store");
        assert!(store.is_empty());
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(TWO_POSTS.as_bytes()).expect("write store");

        let store = PostStore::load(Some(file.path())).expect("load from disk");
        assert_eq!(store.len(), 2);
        assert_eq!(store.origin(), &StoreOrigin::File(file.path().to_path_buf()));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = PostStore::from_path(Path::new("/nonexistent/posts.toml"))
            .expect_err("missing file");
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/posts.toml"));
    }

    #[test]
    fn malformed_date_is_a_parse_error() {
        let raw = TWO_POSTS.replace("2024-03-15T09:00:00Z", "yesterday");
        let err = PostStore::from_toml_str(&raw).expect_err("bad date");
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn misspelled_table_is_a_parse_error() {
        let err = PostStore::from_toml_str("[[post]]\nid = \"x\"\n").expect_err("unknown table");
        assert!(matches!(err, StoreError::Parse { .. }));
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn unknown_post_fields_are_parse_errors() {
        let raw = TWO_POSTS.replace("read_time = \"3 min\"", "read_time = \"3 min\"\nreadTime = \"3 min\"");
        let err = PostStore::from_toml_str(&raw).expect_err("unknown post field");
        assert!(matches!(err, StoreError::Parse { .. }));

        let raw = TWO_POSTS.replace("name = \"Ada\"", "name = \"Ada\"\nurl = \"https://ada.example\"");
        let err = PostStore::from_toml_str(&raw).expect_err("unknown author field");
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = TWO_POSTS.replace("id = \"second\"", "id = \"first\"");
        let err = PostStore::from_toml_str(&raw).expect_err("duplicate id");
        assert!(matches!(err, StoreError::Invalid { .. }));
    }
}
