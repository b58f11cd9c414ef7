//! Persisted story records and the identifiers around them.

use crate::graph::StoryGraph;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a stored story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoryId(Uuid);

impl StoryId {
    /// Create a new unique story ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StoryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Identity of a story author, as supplied by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorId(String);

impl AuthorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque public token for reading a story without being its author.
///
/// Minted once from 16 random bytes, hex encoded, and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShareId(String);

impl ShareId {
    /// Number of random bytes behind a share token.
    pub const BYTES: usize = 16;

    /// Mint a fresh random share token.
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShareId {
    fn from(token: &str) -> Self {
        Self(token.trim().to_string())
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A story as kept by the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRecord {
    pub id: StoryId,
    pub author_id: AuthorId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub story_data: StoryGraph,
    #[serde(default)]
    pub is_public: bool,
    pub share_id: ShareId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoryRecord {
    /// Create a private record with a fresh id and share token.
    pub fn new(author_id: AuthorId, story: NewStory) -> Self {
        let now = Utc::now();
        Self {
            id: StoryId::new(),
            author_id,
            title: story.title.trim().to_string(),
            description: story.description.trim().to_string(),
            story_data: story.story_data,
            is_public: false,
            share_id: ShareId::generate(),
            created_at: now,
            updated_at: now,
        }
    }

    /// A private copy owned by the same author, titled "<title> (Copy)".
    pub fn duplicate(&self) -> Self {
        let story = NewStory {
            title: format!("{} (Copy)", self.title),
            description: self.description.clone(),
            story_data: self.story_data.clone(),
        };
        Self::new(self.author_id.clone(), story)
    }

    /// Apply the supplied fields and refresh `updated_at`.
    pub fn apply(&mut self, patch: StoryPatch) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(story_data) = patch.story_data {
            self.story_data = story_data;
        }
        if let Some(is_public) = patch.is_public {
            self.is_public = is_public;
        }
        self.updated_at = Utc::now().max(self.updated_at);
    }

    pub fn is_owned_by(&self, author: &AuthorId) -> bool {
        &self.author_id == author
    }

    pub fn summary(&self) -> StorySummary {
        StorySummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            share_id: self.share_id.clone(),
            is_public: self.is_public,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// The view served through a share link: no author, no visibility flag.
    pub fn public_view(&self) -> PublicStory {
        PublicStory {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            story_data: self.story_data.clone(),
            share_id: self.share_id.clone(),
            created_at: self.created_at,
        }
    }
}

/// Fields needed to create a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStory {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub story_data: StoryGraph,
}

impl NewStory {
    pub fn new(title: impl Into<String>, story_data: StoryGraph) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            story_data,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub story_data: Option<StoryGraph>,
    pub is_public: Option<bool>,
}

impl StoryPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn story_data(mut self, story_data: StoryGraph) -> Self {
        self.story_data = Some(story_data);
        self
    }

    pub fn visibility(mut self, is_public: bool) -> Self {
        self.is_public = Some(is_public);
        self
    }
}

/// Dashboard listing entry; omits the story graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySummary {
    pub id: StoryId,
    pub title: String,
    pub description: String,
    pub share_id: ShareId,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a reader following a share link receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStory {
    pub id: StoryId,
    pub title: String,
    pub description: String,
    pub story_data: StoryGraph,
    pub share_id: ShareId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Page, PageId};

    fn sample_graph() -> StoryGraph {
        StoryGraph::new().with_page(PageId::FIRST, Page::new("Hello"))
    }

    #[test]
    fn test_share_id_shape() {
        let share = ShareId::generate();
        assert_eq!(share.as_str().len(), ShareId::BYTES * 2);
        assert!(share.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(share, ShareId::generate());
    }

    #[test]
    fn test_new_record_is_private_and_trimmed() {
        let author = AuthorId::new("alice");
        let record = StoryRecord::new(
            author.clone(),
            NewStory::new("  Foo  ", sample_graph()).with_description(" A tale "),
        );

        assert_eq!(record.title, "Foo");
        assert_eq!(record.description, "A tale");
        assert!(!record.is_public);
        assert!(record.is_owned_by(&author));
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_duplicate() {
        let mut original = StoryRecord::new(AuthorId::new("alice"), NewStory::new("Foo", sample_graph()));
        original.is_public = true;

        let copy = original.duplicate();
        assert_eq!(copy.title, "Foo (Copy)");
        assert_eq!(copy.story_data, original.story_data);
        assert_eq!(copy.author_id, original.author_id);
        assert!(!copy.is_public);
        assert_ne!(copy.share_id, original.share_id);
        assert_ne!(copy.id, original.id);
    }

    #[test]
    fn test_apply_patch_keeps_share_id() {
        let mut record = StoryRecord::new(AuthorId::new("bob"), NewStory::new("Foo", sample_graph()));
        let share = record.share_id.clone();
        let before = record.updated_at;

        record.apply(StoryPatch::default().title(" Bar ").visibility(true));

        assert_eq!(record.title, "Bar");
        assert!(record.is_public);
        assert_eq!(record.share_id, share);
        assert!(record.updated_at >= before);
        assert_eq!(record.story_data, sample_graph());
    }

    #[test]
    fn test_record_wire_names() {
        let record = StoryRecord::new(AuthorId::new("carol"), NewStory::new("Foo", sample_graph()));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["authorId"], "carol");
        assert_eq!(json["isPublic"], false);
        assert_eq!(json["storyData"]["1"]["text"], "Hello");
        assert!(json["shareId"].is_string());
    }

    #[test]
    fn test_story_id_parse() {
        let id = StoryId::new();
        assert_eq!(id.to_string().parse::<StoryId>().unwrap(), id);
        assert!("nope".parse::<StoryId>().is_err());
    }
}
