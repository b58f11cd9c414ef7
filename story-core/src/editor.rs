//! In-memory editing of a story before it is saved.
//!
//! A [`StoryDraft`] is owned by one author for the length of an editing
//! session. Every operation is synchronous and either applies completely or
//! returns an error with the draft unchanged. Nothing is persisted until the
//! draft is handed to [`crate::studio::Studio::save_draft`]; dropping a draft
//! discards its edits.

use crate::graph::{Choice, GraphError, Page, PageId, StoryGraph};
use crate::import::{export_story, parse_story, ImportError};
use crate::record::{NewStory, StoryId, StoryPatch, StoryRecord};
use thiserror::Error;
use tracing::debug;

/// Save-time problems with a draft.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    EmptyTitle,

    #[error("At least one page with text is required")]
    NoReadablePage,
}

/// Errors from editing operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No page ids left to allocate")]
    PageIdsExhausted,
}

/// What saving a draft should do at the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveRequest {
    /// First save: create a new record.
    Create(NewStory),
    /// Later saves: update the existing record.
    Update(StoryId, StoryPatch),
}

/// A story being edited.
#[derive(Debug, Clone)]
pub struct StoryDraft {
    story_id: Option<StoryId>,
    title: String,
    description: String,
    graph: StoryGraph,
    next_page_id: PageId,
    dirty: bool,
}

impl Default for StoryDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl StoryDraft {
    /// A fresh, unsaved story with one blank page.
    pub fn new() -> Self {
        let graph = StoryGraph::starter();
        let next_page_id = graph.next_page_id();
        Self {
            story_id: None,
            title: String::new(),
            description: String::new(),
            graph,
            next_page_id,
            dirty: false,
        }
    }

    /// Open a stored story for editing.
    pub fn from_record(record: &StoryRecord) -> Self {
        Self {
            story_id: Some(record.id),
            title: record.title.clone(),
            description: record.description.clone(),
            next_page_id: record.story_data.next_page_id(),
            graph: record.story_data.clone(),
            dirty: false,
        }
    }

    /// An unsaved draft around an existing graph.
    pub fn from_graph(title: impl Into<String>, graph: StoryGraph) -> Self {
        Self {
            story_id: None,
            title: title.into(),
            description: String::new(),
            next_page_id: graph.next_page_id(),
            graph,
            dirty: true,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The stored story this draft edits, once it has been saved.
    pub fn story_id(&self) -> Option<StoryId> {
        self.story_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn graph(&self) -> &StoryGraph {
        &self.graph
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.graph.page(id)
    }

    /// The id the next added page will get.
    pub fn next_page_id(&self) -> PageId {
        self.next_page_id
    }

    /// Whether there are edits since the draft was opened or last saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // =========================================================================
    // Story fields
    // =========================================================================

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.dirty = true;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.dirty = true;
    }

    // =========================================================================
    // Pages
    // =========================================================================

    /// Append a blank page under the next unused id.
    ///
    /// Ids handed out here are never reused in the same draft, even after
    /// the page is deleted.
    pub fn add_page(&mut self) -> Result<PageId, EditorError> {
        let id = self.next_page_id;
        if self.graph.contains(id) {
            return Err(EditorError::PageIdsExhausted);
        }
        self.graph.insert(id, Page::blank());
        self.next_page_id = id.checked_next().unwrap_or(PageId::MAX);
        self.dirty = true;
        debug!(page_id = %id, "page added");
        Ok(id)
    }

    /// Delete a page and point every choice that targeted it at page 1.
    ///
    /// The repair runs even when page 1 itself is gone, leaving those
    /// choices dangling. Returns how many choices were redirected.
    pub fn delete_page(&mut self, id: PageId) -> Result<usize, EditorError> {
        if self.graph.remove(id).is_none() {
            return Err(GraphError::UnknownPage(id).into());
        }
        let redirected = self.graph.redirect_references(id, PageId::FIRST);
        self.dirty = true;
        debug!(page_id = %id, redirected, "page deleted");
        Ok(redirected)
    }

    pub fn set_text(&mut self, id: PageId, text: impl Into<String>) -> Result<(), EditorError> {
        self.graph.page_mut(id)?.text = text.into();
        self.dirty = true;
        Ok(())
    }

    pub fn set_background(
        &mut self,
        id: PageId,
        background: impl Into<String>,
    ) -> Result<(), EditorError> {
        self.graph.page_mut(id)?.background = background.into();
        self.dirty = true;
        Ok(())
    }

    pub fn clear_background(&mut self, id: PageId) -> Result<(), EditorError> {
        self.set_background(id, "")
    }

    /// Replace a page's whole choice list.
    pub fn set_choices(&mut self, id: PageId, choices: Vec<Choice>) -> Result<(), EditorError> {
        self.graph.page_mut(id)?.choices = choices;
        self.dirty = true;
        Ok(())
    }

    // =========================================================================
    // Choices
    // =========================================================================

    /// Append a default choice (empty label, page 1). Returns its index.
    pub fn add_choice(&mut self, id: PageId) -> Result<usize, EditorError> {
        let page = self.graph.page_mut(id)?;
        page.choices.push(Choice::default());
        self.dirty = true;
        Ok(page.choices.len() - 1)
    }

    pub fn set_choice_text(
        &mut self,
        id: PageId,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), EditorError> {
        self.choice_mut(id, index)?.text = text.into();
        self.dirty = true;
        Ok(())
    }

    /// Set a choice's target from author input; anything that is not a
    /// page number becomes page 1. Returns the target that was stored.
    pub fn set_choice_target(
        &mut self,
        id: PageId,
        index: usize,
        input: &str,
    ) -> Result<PageId, EditorError> {
        let target = PageId::parse_or_first(input);
        self.choice_mut(id, index)?.next = target;
        self.dirty = true;
        Ok(target)
    }

    pub fn remove_choice(&mut self, id: PageId, index: usize) -> Result<Choice, EditorError> {
        let page = self.graph.page_mut(id)?;
        let len = page.choices.len();
        if index >= len {
            return Err(GraphError::ChoiceOutOfRange {
                page: id,
                index,
                len,
            }
            .into());
        }
        self.dirty = true;
        Ok(page.choices.remove(index))
    }

    fn choice_mut(&mut self, id: PageId, index: usize) -> Result<&mut Choice, EditorError> {
        let page = self.graph.page_mut(id)?;
        let len = page.choices.len();
        page.choices.get_mut(index).ok_or_else(|| {
            GraphError::ChoiceOutOfRange {
                page: id,
                index,
                len,
            }
            .into()
        })
    }

    // =========================================================================
    // JSON import/export
    // =========================================================================

    /// Replace the whole graph with validated JSON. All or nothing: on error
    /// the current graph and next page id are kept.
    pub fn import_json(&mut self, input: &str) -> Result<(), EditorError> {
        let graph = parse_story(input)?;
        self.next_page_id = graph.next_page_id();
        debug!(pages = graph.len(), next_page_id = %self.next_page_id, "story imported");
        self.graph = graph;
        self.dirty = true;
        Ok(())
    }

    /// The graph in the interchange format.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        export_story(&self.graph)
    }

    // =========================================================================
    // Saving
    // =========================================================================

    /// Check the rules a story must meet before it is stored.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if !self.graph.has_readable_page() {
            return Err(ValidationError::NoReadablePage);
        }
        Ok(())
    }

    /// Build the store call that saves this draft.
    pub fn save_request(&self) -> Result<SaveRequest, ValidationError> {
        self.validate()?;
        Ok(match self.story_id {
            None => SaveRequest::Create(
                NewStory::new(self.title.clone(), self.graph.clone())
                    .with_description(self.description.clone()),
            ),
            Some(id) => SaveRequest::Update(
                id,
                StoryPatch::default()
                    .title(self.title.clone())
                    .description(self.description.clone())
                    .story_data(self.graph.clone()),
            ),
        })
    }

    /// Record a successful save.
    pub fn mark_saved(&mut self, record: &StoryRecord) {
        self.story_id = Some(record.id);
        self.title = record.title.clone();
        self.description = record.description.clone();
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AuthorId;

    fn id(n: u32) -> PageId {
        PageId::new(n).unwrap()
    }

    #[test]
    fn test_new_draft() {
        let draft = StoryDraft::new();
        assert_eq!(draft.graph().len(), 1);
        assert_eq!(draft.page(PageId::FIRST), Some(&Page::blank()));
        assert_eq!(draft.next_page_id(), id(2));
        assert!(!draft.is_dirty());
        assert!(draft.story_id().is_none());
    }

    #[test]
    fn test_add_page() {
        let mut draft = StoryDraft::new();
        assert_eq!(draft.add_page().unwrap(), id(2));
        assert_eq!(draft.add_page().unwrap(), id(3));

        let page = draft.page(id(3)).unwrap();
        assert_eq!(page.text, "");
        assert_eq!(page.background, "");
        assert_eq!(page.choices, vec![Choice::new("", PageId::FIRST)]);
        assert!(draft.is_dirty());
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let mut draft = StoryDraft::new();
        let two = draft.add_page().unwrap();
        draft.delete_page(two).unwrap();
        assert_eq!(draft.add_page().unwrap(), id(3));
    }

    #[test]
    fn test_delete_page_repairs_references() {
        let mut draft = StoryDraft::new();
        let two = draft.add_page().unwrap();
        let three = draft.add_page().unwrap();
        draft.set_choice_target(PageId::FIRST, 0, "3").unwrap();
        draft.set_choice_target(two, 0, "3").unwrap();
        draft.add_choice(two).unwrap();
        draft.set_choice_target(two, 1, "2").unwrap();

        let redirected = draft.delete_page(three).unwrap();
        assert_eq!(redirected, 2);
        assert!(draft.page(three).is_none());
        assert_eq!(draft.page(PageId::FIRST).unwrap().choices[0].next, PageId::FIRST);
        assert_eq!(draft.page(two).unwrap().choices[0].next, PageId::FIRST);
        assert_eq!(draft.page(two).unwrap().choices[1].next, two);
    }

    #[test]
    fn test_delete_first_page_leaves_dangling_repairs() {
        let mut draft = StoryDraft::new();
        let two = draft.add_page().unwrap();

        draft.delete_page(PageId::FIRST).unwrap();
        assert_eq!(draft.page(two).unwrap().choices[0].next, PageId::FIRST);
        assert_eq!(draft.graph().dangling_references().len(), 1);
    }

    #[test]
    fn test_delete_unknown_page() {
        let mut draft = StoryDraft::new();
        let before = draft.graph().clone();
        assert_eq!(
            draft.delete_page(id(8)),
            Err(EditorError::Graph(GraphError::UnknownPage(id(8))))
        );
        assert_eq!(draft.graph(), &before);
        assert!(!draft.is_dirty());
    }

    #[test]
    fn test_edit_fields() {
        let mut draft = StoryDraft::new();
        draft.set_text(PageId::FIRST, "A dark forest").unwrap();
        draft.set_background(PageId::FIRST, "img42").unwrap();
        assert_eq!(draft.page(PageId::FIRST).unwrap().background(), Some("img42"));
        draft.clear_background(PageId::FIRST).unwrap();
        assert_eq!(draft.page(PageId::FIRST).unwrap().background(), None);

        draft
            .set_choices(PageId::FIRST, vec![Choice::new("Run", id(5))])
            .unwrap();
        assert_eq!(
            draft.page(PageId::FIRST).unwrap().choices,
            vec![Choice::new("Run", id(5))]
        );

        assert!(matches!(
            draft.set_text(id(9), "nope"),
            Err(EditorError::Graph(GraphError::UnknownPage(_)))
        ));
    }

    #[test]
    fn test_choice_editing() {
        let mut draft = StoryDraft::new();
        let index = draft.add_choice(PageId::FIRST).unwrap();
        assert_eq!(index, 1);

        draft.set_choice_text(PageId::FIRST, 1, "Open the door").unwrap();
        assert_eq!(draft.set_choice_target(PageId::FIRST, 1, "4").unwrap(), id(4));
        assert_eq!(
            draft.set_choice_target(PageId::FIRST, 0, "not a number").unwrap(),
            PageId::FIRST
        );

        let removed = draft.remove_choice(PageId::FIRST, 0).unwrap();
        assert_eq!(removed, Choice::new("", PageId::FIRST));
        assert_eq!(
            draft.page(PageId::FIRST).unwrap().choices,
            vec![Choice::new("Open the door", id(4))]
        );

        assert_eq!(
            draft.remove_choice(PageId::FIRST, 3),
            Err(EditorError::Graph(GraphError::ChoiceOutOfRange {
                page: PageId::FIRST,
                index: 3,
                len: 1
            }))
        );
        assert!(draft.set_choice_text(PageId::FIRST, 1, "x").is_err());
    }

    #[test]
    fn test_import_replaces_graph() {
        let mut draft = StoryDraft::new();
        draft.add_page().unwrap();
        draft.add_page().unwrap();

        draft
            .import_json(
                r#"{"1": {"text": "Start", "background": "", "choices": [{"text": "Go", "next": 2}]},
                    "2": {"text": "End", "choices": []}}"#,
            )
            .unwrap();
        assert_eq!(draft.graph().len(), 2);
        assert_eq!(draft.next_page_id(), id(3));
    }

    #[test]
    fn test_failed_import_keeps_state() {
        let mut draft = StoryDraft::new();
        draft.add_page().unwrap();
        let before = draft.graph().clone();

        let err = draft.import_json(r#"{"1": {"choices": []}}"#).unwrap_err();
        assert_eq!(err, EditorError::Import(ImportError::InvalidText(PageId::FIRST)));
        assert_eq!(draft.graph(), &before);
        assert_eq!(draft.next_page_id(), id(3));
    }

    #[test]
    fn test_validation() {
        let mut draft = StoryDraft::new();
        assert_eq!(draft.validate(), Err(ValidationError::EmptyTitle));

        draft.set_title("   ");
        assert_eq!(draft.validate(), Err(ValidationError::EmptyTitle));

        draft.set_title("Foo");
        assert_eq!(draft.validate(), Err(ValidationError::NoReadablePage));

        draft.set_text(PageId::FIRST, "  ").unwrap();
        assert_eq!(draft.validate(), Err(ValidationError::NoReadablePage));

        draft.set_text(PageId::FIRST, "Once upon a time").unwrap();
        assert_eq!(draft.validate(), Ok(()));
    }

    #[test]
    fn test_save_request_create_then_update() {
        let mut draft = StoryDraft::new();
        draft.set_title("Foo");
        draft.set_text(PageId::FIRST, "Hello").unwrap();

        let request = draft.save_request().unwrap();
        let SaveRequest::Create(new_story) = request else {
            panic!("expected a create request");
        };
        assert_eq!(new_story.title, "Foo");

        let record = StoryRecord::new(AuthorId::new("alice"), new_story);
        draft.mark_saved(&record);
        assert!(!draft.is_dirty());
        assert_eq!(draft.story_id(), Some(record.id));

        draft.set_description("More");
        match draft.save_request().unwrap() {
            SaveRequest::Update(story_id, patch) => {
                assert_eq!(story_id, record.id);
                assert_eq!(patch.description.as_deref(), Some("More"));
                assert!(patch.is_public.is_none());
            }
            other => panic!("expected an update request, got {other:?}"),
        }
    }

    #[test]
    fn test_from_record_recomputes_next_page_id() {
        let graph = StoryGraph::new()
            .with_page(id(4), Page::new("four"))
            .with_page(id(7), Page::new("seven"));
        let record = StoryRecord::new(AuthorId::new("alice"), NewStory::new("Foo", graph));

        let draft = StoryDraft::from_record(&record);
        assert_eq!(draft.next_page_id(), id(8));
        assert_eq!(draft.story_id(), Some(record.id));
        assert!(!draft.is_dirty());
    }

    #[test]
    fn test_json_view_needs_labelled_choices() {
        let mut draft = StoryDraft::new();
        draft.add_page().unwrap();
        let json = draft.export_json().unwrap();

        // Fresh pages carry an unlabelled default choice, which import rejects.
        let err = draft.import_json(&json).unwrap_err();
        assert_eq!(
            err,
            EditorError::Import(ImportError::InvalidChoice {
                page: PageId::FIRST,
                index: 0,
                reason: "text required and next must be a number",
            })
        );

        draft.set_choice_text(PageId::FIRST, 0, "Onward").unwrap();
        draft.set_choice_text(id(2), 0, "Back").unwrap();
        let json = draft.export_json().unwrap();
        let before = draft.graph().clone();
        draft.import_json(&json).unwrap();
        assert_eq!(draft.graph(), &before);
    }
}
