//! The story graph: pages keyed by page id, each with outgoing choices.
//!
//! A [`StoryGraph`] serializes to the interchange format directly: a JSON
//! object whose keys are decimal page ids and whose values are pages.
//! Choices may point at pages that do not exist; those dangling references
//! are legal and only surface when a reader lands on them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from graph lookups and page edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Invalid page id: {0}")]
    InvalidPageId(String),

    #[error("Page {0} does not exist")]
    UnknownPage(PageId),

    #[error("Page {page} has no choice {index} (it has {len})")]
    ChoiceOutOfRange {
        page: PageId,
        index: usize,
        len: usize,
    },
}

/// Identifier of a page within one story.
///
/// Page ids are positive integers. Id 1 is the canonical fallback target
/// used when a page is deleted; it is not guaranteed to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageId(u32);

impl PageId {
    /// The canonical first page and delete-repair target.
    pub const FIRST: PageId = PageId(1);

    /// Largest representable page id.
    pub const MAX: PageId = PageId(u32::MAX);

    /// Create a page id, rejecting 0.
    pub fn new(value: u32) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Parse a target typed by an author, falling back to page 1.
    pub fn parse_or_first(input: &str) -> Self {
        input.trim().parse().unwrap_or(Self::FIRST)
    }

    /// The raw integer value.
    pub fn get(self) -> u32 {
        self.0
    }

    /// The id after this one, unless this is [`PageId::MAX`].
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for PageId {
    type Error = GraphError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| GraphError::InvalidPageId(value.to_string()))
    }
}

impl From<PageId> for u32 {
    fn from(id: PageId) -> Self {
        id.0
    }
}

impl FromStr for PageId {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| GraphError::InvalidPageId(s.to_string()))
    }
}

/// A labeled edge from one page to a target page id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Label shown to the reader.
    pub text: String,
    /// Target page. Need not exist.
    pub next: PageId,
}

impl Choice {
    pub fn new(text: impl Into<String>, next: PageId) -> Self {
        Self {
            text: text.into(),
            next,
        }
    }
}

impl Default for Choice {
    fn default() -> Self {
        Self::new("", PageId::FIRST)
    }
}

/// One scene of a story.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Reader-visible content. May be empty while editing.
    pub text: String,
    /// Image reference; the empty string means no background.
    #[serde(default)]
    pub background: String,
    /// Outgoing choices, in display order.
    pub choices: Vec<Choice>,
}

impl Page {
    /// Create a page with text and no choices.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            background: String::new(),
            choices: Vec::new(),
        }
    }

    /// The page a new story or "add page" starts from: empty text, no
    /// background, one default choice pointing at page 1.
    pub fn blank() -> Self {
        Self {
            text: String::new(),
            background: String::new(),
            choices: vec![Choice::default()],
        }
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    pub fn with_choice(mut self, text: impl Into<String>, next: PageId) -> Self {
        self.choices.push(Choice::new(text, next));
        self
    }

    /// The background reference, if one is set.
    pub fn background(&self) -> Option<&str> {
        if self.background.is_empty() {
            None
        } else {
            Some(&self.background)
        }
    }

    /// Whether the page has non-whitespace text.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// A page without choices ends the story.
    pub fn is_dead_end(&self) -> bool {
        self.choices.is_empty()
    }

    /// Get a choice by index.
    pub fn choice(&self, page: PageId, index: usize) -> Result<&Choice, GraphError> {
        let len = self.choices.len();
        self.choices
            .get(index)
            .ok_or(GraphError::ChoiceOutOfRange { page, index, len })
    }
}

/// A choice whose target page does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DanglingReference {
    /// Page holding the choice.
    pub page: PageId,
    /// Position of the choice on that page.
    pub index: usize,
    /// The missing target.
    pub target: PageId,
}

/// All pages of one story, keyed by page id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryGraph {
    pages: BTreeMap<PageId, Page>,
}

impl StoryGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The graph a fresh draft starts with: a single blank page 1.
    pub fn starter() -> Self {
        let mut graph = Self::new();
        graph.insert(PageId::FIRST, Page::blank());
        graph
    }

    pub fn with_page(mut self, id: PageId, page: Page) -> Self {
        self.insert(id, page);
        self
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.get(&id)
    }

    pub(crate) fn page_mut(&mut self, id: PageId) -> Result<&mut Page, GraphError> {
        self.pages.get_mut(&id).ok_or(GraphError::UnknownPage(id))
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.pages.contains_key(&id)
    }

    /// Insert or replace a page, returning the previous one.
    pub fn insert(&mut self, id: PageId, page: Page) -> Option<Page> {
        self.pages.insert(id, page)
    }

    /// Remove a page without touching references to it.
    pub fn remove(&mut self, id: PageId) -> Option<Page> {
        self.pages.remove(&id)
    }

    /// Page ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = PageId> + '_ {
        self.pages.keys().copied()
    }

    /// Pages in ascending id order.
    pub fn pages(&self) -> impl Iterator<Item = (PageId, &Page)> {
        self.pages.iter().map(|(id, page)| (*id, page))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// The smallest page id present, where reading starts.
    pub fn first_page_id(&self) -> Option<PageId> {
        self.pages.keys().next().copied()
    }

    /// The next unused page id: one past the largest key, or 1 when empty.
    ///
    /// Saturates at [`PageId::MAX`]; callers allocating ids must check that
    /// the result is actually free.
    pub fn next_page_id(&self) -> PageId {
        self.pages
            .keys()
            .next_back()
            .map(|max| max.checked_next().unwrap_or(PageId::MAX))
            .unwrap_or(PageId::FIRST)
    }

    /// Whether at least one page has non-whitespace text.
    pub fn has_readable_page(&self) -> bool {
        self.pages.values().any(Page::has_text)
    }

    /// Point every choice targeting `from` at `to`. Returns how many
    /// choices were rewritten.
    pub fn redirect_references(&mut self, from: PageId, to: PageId) -> usize {
        let mut rewritten = 0;
        for page in self.pages.values_mut() {
            for choice in page.choices.iter_mut().filter(|c| c.next == from) {
                choice.next = to;
                rewritten += 1;
            }
        }
        rewritten
    }

    /// Choices whose target page is missing, in page then choice order.
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let graph = self;
        self.pages()
            .flat_map(move |(page, p)| {
                p.choices
                    .iter()
                    .enumerate()
                    .filter(move |(_, c)| !graph.contains(c.next))
                    .map(move |(index, c)| DanglingReference {
                        page,
                        index,
                        target: c.next,
                    })
            })
            .collect()
    }
}

impl FromIterator<(PageId, Page)> for StoryGraph {
    fn from_iter<T: IntoIterator<Item = (PageId, Page)>>(iter: T) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}
