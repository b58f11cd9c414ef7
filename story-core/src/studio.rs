//! Studio - the primary public API for authoring and reading stories.
//!
//! This module wires the story store, the image store and the editor
//! together. Author-scoped operations take an [`AuthSession`]; reading a
//! shared story needs only its share token.

use crate::config::StudioConfig;
use crate::editor::{EditorError, SaveRequest, StoryDraft, ValidationError};
use crate::images::{
    DirImageStore, ImageError, ImageId, ImageLimits, ImageRef, ImageStore, MemoryImageStore, StoredImage,
};
use crate::reader::{Background, Reader, ReaderError};
use crate::record::{PublicStory, ShareId, StoryId, StoryPatch, StoryRecord, StorySummary};
use crate::session::AuthSession;
use crate::store::{FileStore, MemoryStore, StoreError, StoryStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from studio operations.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error(transparent)]
    Reader(#[from] ReaderError),
}

impl StudioError {
    /// The story or image does not exist, or is not the caller's.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StudioError::Store(StoreError::NotFound) | StudioError::Image(ImageError::NotFound(_))
        )
    }

    /// Bad input the user can fix.
    pub fn is_validation(&self) -> bool {
        match self {
            StudioError::Validation(_) | StudioError::Editor(_) => true,
            StudioError::Store(StoreError::Validation(_)) => true,
            StudioError::Image(err) => matches!(
                err,
                ImageError::UnsupportedType(_) | ImageError::TooLarge { .. } | ImageError::Empty
            ),
            _ => false,
        }
    }

    /// A collaborator failed; the same call may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StudioError::Store(StoreError::Io(_) | StoreError::Json(_))
                | StudioError::Image(ImageError::Io(_) | ImageError::Json(_))
        )
    }
}

/// Authoring and reading over a pair of storage collaborators.
#[derive(Clone)]
pub struct Studio {
    stories: Arc<dyn StoryStore>,
    images: Arc<dyn ImageStore>,
    config: StudioConfig,
}

impl Studio {
    /// Build a studio over existing stores.
    pub fn new(stories: Arc<dyn StoryStore>, images: Arc<dyn ImageStore>, config: StudioConfig) -> Self {
        Self {
            stories,
            images,
            config,
        }
    }

    /// Open file-backed stores under the configured data directory.
    pub async fn open(config: StudioConfig) -> Result<Self, StudioError> {
        let stories = FileStore::open(config.stories_dir()).await?;
        let images =
            DirImageStore::open(config.images_dir(), ImageLimits::new(config.max_image_bytes)).await?;
        info!(data_dir = %config.data_dir.display(), "Studio opened");
        Ok(Self::new(Arc::new(stories), Arc::new(images), config))
    }

    /// A studio that keeps everything in memory.
    pub fn in_memory(config: StudioConfig) -> Self {
        let images = MemoryImageStore::new(ImageLimits::new(config.max_image_bytes));
        Self::new(Arc::new(MemoryStore::new()), Arc::new(images), config)
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn stories(&self) -> &dyn StoryStore {
        self.stories.as_ref()
    }

    pub fn images(&self) -> &dyn ImageStore {
        self.images.as_ref()
    }

    // =========================================================================
    // Authoring
    // =========================================================================

    /// Load one of the caller's stories into a draft.
    pub async fn open_draft(&self, session: &AuthSession, id: StoryId) -> Result<StoryDraft, StudioError> {
        let record = self.stories.get(id, session.author()).await?;
        debug!(story_id = %id, author_id = %session.author(), "Draft opened");
        Ok(StoryDraft::from_record(&record))
    }

    /// Validate and store a draft: create on first save, update afterwards.
    ///
    /// On any failure the draft is left exactly as it was, unsaved flag
    /// included, so the caller can retry.
    pub async fn save_draft(
        &self,
        session: &AuthSession,
        draft: &mut StoryDraft,
    ) -> Result<StoryRecord, StudioError> {
        let author = session.author();
        let record = match draft.save_request()? {
            SaveRequest::Create(story) => self.stories.create(author, story).await,
            SaveRequest::Update(id, patch) => self.stories.update(id, author, patch).await,
        };
        let record = record.map_err(|err| {
            warn!(author_id = %author, error = %err, "Save failed");
            err
        })?;

        draft.mark_saved(&record);
        info!(story_id = %record.id, author_id = %author, pages = record.story_data.len(), "Story saved");
        Ok(record)
    }

    /// One of the caller's stories.
    pub async fn story(&self, session: &AuthSession, id: StoryId) -> Result<StoryRecord, StudioError> {
        Ok(self.stories.get(id, session.author()).await?)
    }

    /// The caller's stories, most recently updated first.
    pub async fn dashboard(&self, session: &AuthSession) -> Result<Vec<StorySummary>, StudioError> {
        Ok(self.stories.list_by_author(session.author()).await?)
    }

    pub async fn delete(&self, session: &AuthSession, id: StoryId) -> Result<(), StudioError> {
        self.stories.delete(id, session.author()).await?;
        info!(story_id = %id, author_id = %session.author(), "Story deleted");
        Ok(())
    }

    /// Copy a story into a new private one.
    pub async fn duplicate(&self, session: &AuthSession, id: StoryId) -> Result<StoryRecord, StudioError> {
        let copy = self.stories.duplicate(id, session.author()).await?;
        info!(story_id = %id, copy_id = %copy.id, "Story duplicated");
        Ok(copy)
    }

    pub async fn publish(&self, session: &AuthSession, id: StoryId) -> Result<StoryRecord, StudioError> {
        self.set_visibility(session, id, true).await
    }

    pub async fn unpublish(&self, session: &AuthSession, id: StoryId) -> Result<StoryRecord, StudioError> {
        self.set_visibility(session, id, false).await
    }

    async fn set_visibility(
        &self,
        session: &AuthSession,
        id: StoryId,
        is_public: bool,
    ) -> Result<StoryRecord, StudioError> {
        let record = self
            .stories
            .update(id, session.author(), StoryPatch::default().visibility(is_public))
            .await?;
        info!(story_id = %id, is_public, "Visibility changed");
        Ok(record)
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// The public view of a story behind a share link.
    pub async fn shared_story(&self, share_id: &ShareId) -> Result<PublicStory, StudioError> {
        let record = self.stories.get_by_share_id(share_id).await?;
        debug!(share_id = %share_id, story_id = %record.id, "Shared story fetched");
        Ok(record.public_view())
    }

    /// A reader positioned at the start of a shared story.
    pub async fn read_shared(&self, share_id: &ShareId) -> Result<(PublicStory, Reader), StudioError> {
        let story = self.shared_story(share_id).await?;
        let reader = Reader::new(story.story_data.clone());
        Ok((story, reader))
    }

    /// Stories anyone may browse, most recently updated first.
    pub async fn public_stories(&self) -> Result<Vec<StorySummary>, StudioError> {
        Ok(self.stories.list_public().await?)
    }

    /// Fetch the background of the reader's current page.
    pub async fn resolve_background(&self, reader: &Reader) -> Result<Option<Background>, StudioError> {
        Ok(reader
            .resolve_background(self.images.as_ref(), &self.config.image_url_prefix)
            .await?)
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Store an uploaded image and return its id.
    pub async fn upload_image(
        &self,
        session: &AuthSession,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<ImageId, StudioError> {
        let size = bytes.len();
        let id = self.images.store(bytes, content_type).await?;
        info!(image_id = %id, author_id = %session.author(), size, content_type, "Image uploaded");
        Ok(id)
    }

    pub async fn delete_image(&self, session: &AuthSession, id: &ImageId) -> Result<(), StudioError> {
        self.images.delete(id).await?;
        info!(image_id = %id, author_id = %session.author(), "Image deleted");
        Ok(())
    }

    pub async fn image(&self, id: &ImageId) -> Result<StoredImage, StudioError> {
        Ok(self.images.retrieve(id).await?)
    }

    /// The public URL a page background should hold for a stored image.
    pub fn image_url(&self, id: &ImageId) -> String {
        ImageRef::Stored(id.clone()).url(&self.config.image_url_prefix)
    }
}
