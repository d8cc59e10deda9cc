use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{error::DomainError, tags::TagFilter};

/// Opaque post identifier; keys both the card list and the `blog/<id>` fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Author {
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub excerpt: String,
    pub image: String,
    pub author: Author,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub read_time: String,
    pub tags: Vec<String>,
}

/// Positions of the posts visible under `filter`, in source order.
pub fn filter_indices(posts: &[Post], filter: TagFilter) -> Vec<usize> {
    posts
        .iter()
        .enumerate()
        .filter(|(_, post)| filter.matches(post.tags.as_slice()))
        .map(|(index, _)| index)
        .collect()
}

/// Check the record shape the view relies on.
pub fn validate_posts(posts: &[Post]) -> Result<(), DomainError> {
    let mut seen = HashSet::with_capacity(posts.len());

    for (position, post) in posts.iter().enumerate() {
        let id = post.id.as_str();
        if id.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "post #{position} has an empty id"
            )));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(format!(
                "post `{id}` id must not contain whitespace"
            )));
        }
        if !seen.insert(id) {
            return Err(DomainError::invariant(format!("duplicate post id `{id}`")));
        }
        if post.title.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "post `{id}` has an empty title"
            )));
        }
        if post.author.name.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "post `{id}` has an empty author name"
            )));
        }
        if post.tags.is_empty() {
            return Err(DomainError::validation(format!("post `{id}` has no tags")));
        }
        if post.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(DomainError::validation(format!(
                "post `{id}` has an empty tag"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use time::macros::datetime;

    use super::*;

    pub fn post(id: &str, tags: &[&str]) -> Post {
        Post {
            id: PostId::new(id),
            title: format!("Post {id}"),
            excerpt: format!("Excerpt for {id}"),
            image: format!("https://images.example.com/{id}.jpg"),
            author: Author {
                name: "Ada".to_string(),
                avatar: "https://images.example.com/ada.png".to_string(),
            },
            date: datetime!(2024-03-15 09:00 UTC),
            read_time: "5 min".to_string(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::post;
    use super::*;

    fn sample() -> Vec<Post> {
        vec![
            post("1", &["tech"]),
            post("2", &["productivity", "thought"]),
            post("3", &["tech", "resources"]),
        ]
    }

    #[test]
    fn filter_keeps_source_order() {
        let posts = sample();
        assert_eq!(filter_indices(&posts, TagFilter::Tech), [0, 2]);
        assert_eq!(filter_indices(&posts, TagFilter::Resources), [2]);
        assert_eq!(filter_indices(&posts, TagFilter::All), [0, 1, 2]);
        assert!(filter_indices(&posts, TagFilter::BookReview).is_empty());
    }

    #[test]
    fn validation_rejects_duplicate_ids() {
        let posts = vec![post("a", &["tech"]), post("a", &["thought"])];
        let err = validate_posts(&posts).expect_err("duplicate ids");
        assert!(matches!(err, DomainError::Invariant { .. }));
    }

    #[test]
    fn validation_rejects_untagged_posts() {
        let posts = vec![post("a", &[])];
        let err = validate_posts(&posts).expect_err("missing tags");
        assert!(err.to_string().contains("has no tags"));
    }

    #[test]
    fn validation_accepts_tags_outside_the_catalog() {
        let posts = vec![post("a", &["rust", "tech"])];
        validate_posts(&posts).expect("free-form tags are allowed");
        assert_eq!(filter_indices(&posts, TagFilter::Tech), [0]);
    }

    #[test]
    fn validation_rejects_whitespace_in_ids() {
        let posts = vec![post("two words", &["tech"])];
        assert!(validate_posts(&posts).is_err());
    }
}
