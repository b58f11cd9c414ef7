//! Branching story engine: authoring, storage and reading.
//!
//! This crate provides:
//! - A typed story graph of pages and choices keyed by page id
//! - A strict JSON import validator and the interchange export format
//! - An in-memory editor with add/delete page and reference repair
//! - A reader that walks a story and tolerates dangling choices
//! - Story and image storage collaborators, in memory or on disk
//!
//! # Quick Start
//!
//! ```ignore
//! use story_core::{AuthSession, AuthorId, StoryDraft, Studio, StudioConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let studio = Studio::open(StudioConfig::from_env()).await?;
//!     let session = AuthSession::login(AuthorId::new("alice"));
//!
//!     let mut draft = StoryDraft::new();
//!     draft.set_title("The Cave");
//!     draft.set_text(story_core::PageId::FIRST, "You stand at the mouth of a cave.")?;
//!     let record = studio.save_draft(&session, &mut draft).await?;
//!
//!     let (_, mut reader) = studio.read_shared(&record.share_id).await?;
//!     reader.choose(0)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod editor;
pub mod graph;
pub mod images;
pub mod import;
pub mod reader;
pub mod record;
pub mod session;
pub mod store;
pub mod studio;
pub mod testing;

// Primary public API
pub use config::StudioConfig;
pub use editor::{EditorError, SaveRequest, StoryDraft, ValidationError};
pub use graph::{Choice, DanglingReference, GraphError, Page, PageId, StoryGraph};
pub use images::{
    DirImageStore, ImageError, ImageId, ImageLimits, ImageRef, ImageStore, MemoryImageStore, StoredImage,
};
pub use import::{export_story, parse_story, story_from_value, ImportError};
pub use reader::{Background, PageView, Reader, ReaderError, Step};
pub use record::{AuthorId, NewStory, PublicStory, ShareId, StoryId, StoryPatch, StoryRecord, StorySummary};
pub use session::AuthSession;
pub use store::{FileStore, MemoryStore, StoreError, StoryStore};
pub use studio::{Studio, StudioError};
pub use testing::TestStudio;
