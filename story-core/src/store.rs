//! Story storage.
//!
//! [`StoryStore`] is the seam to whatever keeps story documents. Every
//! author-scoped call takes the author id and treats a story owned by
//! someone else exactly like a missing one. Two implementations ship here:
//! [`MemoryStore`] for tests and embedding, and [`FileStore`], which keeps
//! one JSON document per story under a directory.

use crate::record::{AuthorId, NewStory, ShareId, StoryId, StoryPatch, StoryRecord, StorySummary};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Errors from story storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Story not found")]
    NotFound,

    #[error("Invalid story: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence operations for story records.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Store a new private story for `author`.
    async fn create(&self, author: &AuthorId, story: NewStory) -> Result<StoryRecord, StoreError>;

    /// Fetch a story owned by `author`.
    async fn get(&self, id: StoryId, author: &AuthorId) -> Result<StoryRecord, StoreError>;

    /// Fetch a story by share token. No ownership check.
    async fn get_by_share_id(&self, share_id: &ShareId) -> Result<StoryRecord, StoreError>;

    /// Apply a partial update to a story owned by `author`.
    async fn update(
        &self,
        id: StoryId,
        author: &AuthorId,
        patch: StoryPatch,
    ) -> Result<StoryRecord, StoreError>;

    /// Remove a story owned by `author`.
    async fn delete(&self, id: StoryId, author: &AuthorId) -> Result<(), StoreError>;

    /// Copy a story owned by `author` into a new private story.
    async fn duplicate(&self, id: StoryId, author: &AuthorId) -> Result<StoryRecord, StoreError>;

    /// Summaries of an author's stories, most recently updated first.
    async fn list_by_author(&self, author: &AuthorId) -> Result<Vec<StorySummary>, StoreError>;

    /// Summaries of all public stories, most recently updated first.
    async fn list_public(&self) -> Result<Vec<StorySummary>, StoreError>;
}

/// Reject titles that are blank once trimmed.
pub fn check_title(title: &str) -> Result<(), StoreError> {
    if title.trim().is_empty() {
        Err(StoreError::Validation("title must not be empty".to_string()))
    } else {
        Ok(())
    }
}

fn check_patch(patch: &StoryPatch) -> Result<(), StoreError> {
    match &patch.title {
        Some(title) => check_title(title),
        None => Ok(()),
    }
}

fn sorted_summaries<'a>(records: impl Iterator<Item = &'a StoryRecord>) -> Vec<StorySummary> {
    let mut summaries: Vec<_> = records.map(StoryRecord::summary).collect();
    summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    summaries
}

// ============================================================================
// In-memory store
// ============================================================================

/// A store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    stories: RwLock<HashMap<StoryId, StoryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored stories across all authors.
    pub async fn len(&self) -> usize {
        self.stories.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.stories.read().await.is_empty()
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn create(&self, author: &AuthorId, story: NewStory) -> Result<StoryRecord, StoreError> {
        check_title(&story.title)?;
        let record = StoryRecord::new(author.clone(), story);
        self.stories.write().await.insert(record.id, record.clone());
        debug!(story_id = %record.id, author_id = %author, "story created");
        Ok(record)
    }

    async fn get(&self, id: StoryId, author: &AuthorId) -> Result<StoryRecord, StoreError> {
        self.stories
            .read()
            .await
            .get(&id)
            .filter(|r| r.is_owned_by(author))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_share_id(&self, share_id: &ShareId) -> Result<StoryRecord, StoreError> {
        self.stories
            .read()
            .await
            .values()
            .find(|r| &r.share_id == share_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(
        &self,
        id: StoryId,
        author: &AuthorId,
        patch: StoryPatch,
    ) -> Result<StoryRecord, StoreError> {
        check_patch(&patch)?;
        let mut stories = self.stories.write().await;
        let record = stories
            .get_mut(&id)
            .filter(|r| r.is_owned_by(author))
            .ok_or(StoreError::NotFound)?;
        record.apply(patch);
        debug!(story_id = %id, author_id = %author, "story updated");
        Ok(record.clone())
    }

    async fn delete(&self, id: StoryId, author: &AuthorId) -> Result<(), StoreError> {
        let mut stories = self.stories.write().await;
        let owned = stories
            .get(&id)
            .map(|r| r.is_owned_by(author))
            .unwrap_or(false);
        if !owned {
            return Err(StoreError::NotFound);
        }
        stories.remove(&id);
        debug!(story_id = %id, author_id = %author, "story deleted");
        Ok(())
    }

    async fn duplicate(&self, id: StoryId, author: &AuthorId) -> Result<StoryRecord, StoreError> {
        let mut stories = self.stories.write().await;
        let copy = stories
            .get(&id)
            .filter(|r| r.is_owned_by(author))
            .map(StoryRecord::duplicate)
            .ok_or(StoreError::NotFound)?;
        stories.insert(copy.id, copy.clone());
        debug!(story_id = %id, copy_id = %copy.id, "story duplicated");
        Ok(copy)
    }

    async fn list_by_author(&self, author: &AuthorId) -> Result<Vec<StorySummary>, StoreError> {
        let stories = self.stories.read().await;
        Ok(sorted_summaries(
            stories.values().filter(|r| r.is_owned_by(author)),
        ))
    }

    async fn list_public(&self) -> Result<Vec<StorySummary>, StoreError> {
        let stories = self.stories.read().await;
        Ok(sorted_summaries(stories.values().filter(|r| r.is_public)))
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// A store that writes each story to `<dir>/<id>.json`.
///
/// Lookups by share token and listings scan the directory. Files that cannot
/// be read or parsed are skipped with a warning rather than failing the
/// listing.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), "opened story store");
        Ok(Self {
            dir,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: StoryId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read(&self, id: StoryId) -> Result<StoryRecord, StoreError> {
        let content = match fs::read_to_string(self.path_for(id)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    async fn read_owned(&self, id: StoryId, author: &AuthorId) -> Result<StoryRecord, StoreError> {
        let record = self.read(id).await?;
        if record.is_owned_by(author) {
            Ok(record)
        } else {
            Err(StoreError::NotFound)
        }
    }

    /// Write through a temporary file so readers never see a torn document.
    async fn write(&self, record: &StoryRecord) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(record)?;
        let path = self.path_for(record.id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<StoryRecord>, StoreError> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            match entry.file_type().await {
                Ok(kind) if kind.is_file() => {}
                _ => continue,
            }
            let parsed = match fs::read(&path).await {
                Ok(content) => serde_json::from_slice::<StoryRecord>(&content).map_err(StoreError::from),
                Err(e) => Err(StoreError::from(e)),
            };
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable story"),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl StoryStore for FileStore {
    async fn create(&self, author: &AuthorId, story: NewStory) -> Result<StoryRecord, StoreError> {
        check_title(&story.title)?;
        let record = StoryRecord::new(author.clone(), story);
        let _guard = self.write_lock.lock().await;
        self.write(&record).await?;
        debug!(story_id = %record.id, author_id = %author, "story created");
        Ok(record)
    }

    async fn get(&self, id: StoryId, author: &AuthorId) -> Result<StoryRecord, StoreError> {
        self.read_owned(id, author).await
    }

    async fn get_by_share_id(&self, share_id: &ShareId) -> Result<StoryRecord, StoreError> {
        self.scan()
            .await?
            .into_iter()
            .find(|r| &r.share_id == share_id)
            .ok_or(StoreError::NotFound)
    }

    async fn update(
        &self,
        id: StoryId,
        author: &AuthorId,
        patch: StoryPatch,
    ) -> Result<StoryRecord, StoreError> {
        check_patch(&patch)?;
        let _guard = self.write_lock.lock().await;
        let mut record = self.read_owned(id, author).await?;
        record.apply(patch);
        self.write(&record).await?;
        debug!(story_id = %id, author_id = %author, "story updated");
        Ok(record)
    }

    async fn delete(&self, id: StoryId, author: &AuthorId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.read_owned(id, author).await?;
        fs::remove_file(self.path_for(id)).await?;
        debug!(story_id = %id, author_id = %author, "story deleted");
        Ok(())
    }

    async fn duplicate(&self, id: StoryId, author: &AuthorId) -> Result<StoryRecord, StoreError> {
        let _guard = self.write_lock.lock().await;
        let copy = self.read_owned(id, author).await?.duplicate();
        self.write(&copy).await?;
        debug!(story_id = %id, copy_id = %copy.id, "story duplicated");
        Ok(copy)
    }

    async fn list_by_author(&self, author: &AuthorId) -> Result<Vec<StorySummary>, StoreError> {
        let records = self.scan().await?;
        Ok(sorted_summaries(
            records.iter().filter(|r| r.is_owned_by(author)),
        ))
    }

    async fn list_public(&self) -> Result<Vec<StorySummary>, StoreError> {
        let records = self.scan().await?;
        Ok(sorted_summaries(records.iter().filter(|r| r.is_public)))
    }
}
