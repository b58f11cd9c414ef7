//! Testing utilities for stories.
//!
//! This module provides tools for integration testing:
//! - Sample graphs covering endings, cycles and dangling choices
//! - `TestStudio` for scripted authoring scenarios against in-memory stores
//! - Assertion helpers for reader state

use crate::config::StudioConfig;
use crate::editor::StoryDraft;
use crate::graph::{Page, PageId, StoryGraph};
use crate::reader::{Reader, Step};
use crate::record::{AuthorId, StoryRecord};
use crate::session::AuthSession;
use crate::studio::{Studio, StudioError};

fn page_id(n: u32) -> PageId {
    PageId::new(n).unwrap_or(PageId::FIRST)
}

/// Page 1 leads to page 2, which ends the story.
pub fn two_page_story() -> StoryGraph {
    StoryGraph::new()
        .with_page(PageId::FIRST, Page::new("Start").with_choice("Go", page_id(2)))
        .with_page(page_id(2), Page::new("End"))
}

/// A single page whose only choice points at page 99, which does not exist.
pub fn dangling_story() -> StoryGraph {
    StoryGraph::new().with_page(PageId::FIRST, Page::new("A").with_choice("go", page_id(99)))
}

/// A small maze: a loop between the hall and the cellar, and one way out.
pub fn looping_story() -> StoryGraph {
    StoryGraph::new()
        .with_page(
            PageId::FIRST,
            Page::new("The hall")
                .with_choice("Go down", page_id(2))
                .with_choice("Leave", page_id(3)),
        )
        .with_page(
            page_id(2),
            Page::new("The cellar").with_choice("Go up", PageId::FIRST),
        )
        .with_page(page_id(3), Page::new("Outside. The end."))
}

/// Test harness for authoring scenarios.
pub struct TestStudio {
    /// The studio under test, backed by in-memory stores.
    pub studio: Studio,
    /// The logged-in author.
    pub session: AuthSession,
}

impl TestStudio {
    /// An in-memory studio with `author` logged in.
    pub fn new(author: &str) -> Self {
        Self::with_config(author, StudioConfig::default())
    }

    pub fn with_config(author: &str, config: StudioConfig) -> Self {
        Self {
            studio: Studio::in_memory(config),
            session: AuthSession::login(AuthorId::new(author)),
        }
    }

    /// Another session on the same studio.
    pub fn login(&self, author: &str) -> AuthSession {
        AuthSession::login(AuthorId::new(author))
    }

    /// Save `graph` as a new story titled `title`.
    pub async fn save(&self, title: &str, graph: StoryGraph) -> Result<StoryRecord, StudioError> {
        let mut draft = StoryDraft::from_graph(title, graph);
        self.studio.save_draft(&self.session, &mut draft).await
    }

    /// Save and publish in one step.
    pub async fn publish(&self, title: &str, graph: StoryGraph) -> Result<StoryRecord, StudioError> {
        let record = self.save(title, graph).await?;
        self.studio.publish(&self.session, record.id).await
    }
}

impl Default for TestStudio {
    fn default() -> Self {
        Self::new("test-author")
    }
}

/// Follow a sequence of choice indexes, panicking on the first one that
/// cannot be taken.
#[track_caller]
pub fn follow(reader: &mut Reader, choices: &[usize]) {
    for &index in choices {
        if let Err(err) = reader.choose(index).map(|_| ()) {
            panic!("Choice {index} from page {} failed: {err}", reader.current());
        }
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert that the reader is on an existing page showing `text`.
#[track_caller]
pub fn assert_page_text(reader: &Reader, text: &str) {
    match reader.step() {
        Step::Page(view) => assert_eq!(
            view.text(),
            text,
            "Expected page {} to read {text:?}",
            view.id
        ),
        Step::InvalidStep(id) => panic!("Expected page text {text:?}, but page {id} does not exist"),
    }
}

/// Assert that the reader is on a page with no choices.
#[track_caller]
pub fn assert_ending(reader: &Reader) {
    assert!(
        reader.step().is_ending(),
        "Expected page {} to be an ending",
        reader.current()
    );
}

/// Assert that the reader has landed on a missing page.
#[track_caller]
pub fn assert_invalid_step(reader: &Reader, id: u32) {
    assert_eq!(
        reader.step(),
        Step::InvalidStep(page_id(id)),
        "Expected an invalid step at page {id}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_well_formed() {
        assert!(two_page_story().dangling_references().is_empty());
        assert_eq!(dangling_story().dangling_references().len(), 1);
        assert!(looping_story().dangling_references().is_empty());
    }

    #[test]
    fn test_follow_loop() {
        let mut reader = Reader::new(looping_story());
        follow(&mut reader, &[0, 0, 0, 0]);
        assert_page_text(&reader, "The hall");
        follow(&mut reader, &[1]);
        assert_ending(&reader);
    }

    #[test]
    fn test_follow_dangling() {
        let mut reader = Reader::new(dangling_story());
        follow(&mut reader, &[0]);
        assert_invalid_step(&reader, 99);
    }

    #[tokio::test]
    async fn test_harness_saves() {
        let harness = TestStudio::default();
        let record = harness.publish("Maze", looping_story()).await.unwrap();
        assert!(record.is_public);

        let stranger = harness.login("stranger");
        assert!(harness.studio.dashboard(&stranger).await.unwrap().is_empty());
        assert_eq!(harness.studio.public_stories().await.unwrap().len(), 1);
    }
}
