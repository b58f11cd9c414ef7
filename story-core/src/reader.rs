//! Reader mode: walking a story one page at a time.
//!
//! The reader's whole state is the current page id. It starts at the
//! smallest page id in the graph and moves to whatever page a chosen
//! choice names, without checking that the target exists first. Landing on
//! a missing page is an ordinary outcome reported as
//! [`Step::InvalidStep`]; a page with no choices is a valid ending.
//! Cycles are fine: the reader never looks further than one step ahead.

use crate::graph::{Choice, Page, PageId, StoryGraph};
use crate::images::{ImageError, ImageId, ImageRef, ImageStore, StoredImage};
use thiserror::Error;

/// Why a choice could not be taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReaderError {
    #[error("Invalid story step: page {0} does not exist")]
    InvalidStep(PageId),

    #[error("Page {0} is the end of the story")]
    DeadEnd(PageId),

    #[error("Page {page} has no choice {index} (it has {len})")]
    ChoiceOutOfRange {
        page: PageId,
        index: usize,
        len: usize,
    },
}

/// A page as shown to the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageView<'a> {
    pub id: PageId,
    page: &'a Page,
}

impl<'a> PageView<'a> {
    pub fn text(&self) -> &'a str {
        &self.page.text
    }

    /// The background reference, if the page has one.
    pub fn background(&self) -> Option<&'a str> {
        self.page.background()
    }

    pub fn choices(&self) -> &'a [Choice] {
        &self.page.choices
    }

    /// Choice labels in display order.
    pub fn labels(&self) -> impl Iterator<Item = &'a str> {
        self.page.choices.iter().map(|c| c.text.as_str())
    }

    /// No choices: the story ends here.
    pub fn is_dead_end(&self) -> bool {
        self.page.is_dead_end()
    }
}

/// Where the reader currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    /// A page that exists.
    Page(PageView<'a>),
    /// The current id has no page.
    InvalidStep(PageId),
}

impl<'a> Step<'a> {
    pub fn page_id(&self) -> PageId {
        match self {
            Step::Page(view) => view.id,
            Step::InvalidStep(id) => *id,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Step::InvalidStep(_))
    }

    /// True for a real page with no way onward.
    pub fn is_ending(&self) -> bool {
        matches!(self, Step::Page(view) if view.is_dead_end())
    }
}

/// A resolved background ready to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    /// Bytes fetched from the image store.
    Stored { id: ImageId, image: StoredImage },
    /// A URL the client loads itself.
    External(String),
}

/// Traversal state over one story graph.
#[derive(Debug, Clone)]
pub struct Reader {
    graph: StoryGraph,
    start: PageId,
    current: PageId,
    path: Vec<PageId>,
}

impl Reader {
    /// Start reading at the smallest page id. An empty graph starts at
    /// page 1, which immediately reads as an invalid step.
    pub fn new(graph: StoryGraph) -> Self {
        let start = graph.first_page_id().unwrap_or(PageId::FIRST);
        Self {
            graph,
            start,
            current: start,
            path: vec![start],
        }
    }

    pub fn graph(&self) -> &StoryGraph {
        &self.graph
    }

    pub fn start(&self) -> PageId {
        self.start
    }

    pub fn current(&self) -> PageId {
        self.current
    }

    /// Every page id visited so far, starting with the start page.
    pub fn path(&self) -> &[PageId] {
        &self.path
    }

    /// Resolve the current state.
    pub fn step(&self) -> Step<'_> {
        match self.graph.page(self.current) {
            Some(page) => Step::Page(PageView {
                id: self.current,
                page,
            }),
            None => Step::InvalidStep(self.current),
        }
    }

    /// Take the choice at `index` on the current page.
    ///
    /// The target is followed unconditionally; check the returned step to
    /// see whether it exists.
    pub fn choose(&mut self, index: usize) -> Result<Step<'_>, ReaderError> {
        let page = self
            .graph
            .page(self.current)
            .ok_or(ReaderError::InvalidStep(self.current))?;
        if page.is_dead_end() {
            return Err(ReaderError::DeadEnd(self.current));
        }
        let next = page
            .choices
            .get(index)
            .map(|c| c.next)
            .ok_or(ReaderError::ChoiceOutOfRange {
                page: self.current,
                index,
                len: page.choices.len(),
            })?;

        self.current = next;
        self.path.push(next);
        Ok(self.step())
    }

    /// Go back to the start page and forget the path.
    pub fn restart(&mut self) {
        self.current = self.start;
        self.path = vec![self.start];
    }

    /// The current page's background, interpreted against `prefix`.
    pub fn background(&self, prefix: &str) -> Option<ImageRef> {
        self.graph
            .page(self.current)
            .and_then(Page::background)
            .and_then(|bg| ImageRef::parse(bg, prefix))
    }

    /// Fetch the current background from the image store. External URLs are
    /// passed through untouched; no background yields `None`.
    pub async fn resolve_background(
        &self,
        images: &dyn ImageStore,
        prefix: &str,
    ) -> Result<Option<Background>, ImageError> {
        match self.background(prefix) {
            None => Ok(None),
            Some(ImageRef::External(url)) => Ok(Some(Background::External(url))),
            Some(ImageRef::Stored(id)) => {
                let image = images.retrieve(&id).await?;
                Ok(Some(Background::Stored { id, image }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::{ImageLimits, MemoryImageStore, DEFAULT_IMAGE_URL_PREFIX};
    use crate::import::parse_story;

    fn id(n: u32) -> PageId {
        PageId::new(n).unwrap()
    }

    fn two_pages() -> StoryGraph {
        parse_story(
            r#"{"1": {"text": "Start", "background": "", "choices": [{"text": "Go", "next": 2}]},
                "2": {"text": "End", "choices": []}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_walk_to_dead_end() {
        let mut reader = Reader::new(two_pages());
        let Step::Page(view) = reader.step() else {
            panic!("start page should exist");
        };
        assert_eq!(view.text(), "Start");
        assert_eq!(view.labels().collect::<Vec<_>>(), vec!["Go"]);

        let step = reader.choose(0).unwrap();
        assert_eq!(step.page_id(), id(2));
        assert!(step.is_ending());

        assert_eq!(reader.choose(0), Err(ReaderError::DeadEnd(id(2))));
        assert_eq!(reader.path(), &[id(1), id(2)]);
    }

    #[test]
    fn test_dangling_choice_is_invalid_step() {
        let graph =
            parse_story(r#"{"1": {"text": "A", "choices": [{"text": "go", "next": 99}]}}"#).unwrap();
        let mut reader = Reader::new(graph);

        let step = reader.choose(0).unwrap();
        assert_eq!(step, Step::InvalidStep(id(99)));
        assert!(step.is_invalid());
        assert_eq!(reader.current(), id(99));

        assert_eq!(reader.choose(0), Err(ReaderError::InvalidStep(id(99))));
        reader.restart();
        assert_eq!(reader.current(), id(1));
    }

    #[test]
    fn test_starts_at_smallest_key() {
        let graph = StoryGraph::new()
            .with_page(id(12), Page::new("twelve"))
            .with_page(id(5), Page::new("five").with_choice("on", id(12)));
        let reader = Reader::new(graph);
        assert_eq!(reader.start(), id(5));
        assert_eq!(reader.current(), id(5));
    }

    #[test]
    fn test_empty_graph_is_invalid_step() {
        let reader = Reader::new(StoryGraph::new());
        assert_eq!(reader.step(), Step::InvalidStep(PageId::FIRST));
    }

    #[test]
    fn test_cycles_are_followed() {
        let graph = StoryGraph::new()
            .with_page(id(1), Page::new("ping").with_choice("pong", id(2)))
            .with_page(id(2), Page::new("pong").with_choice("ping", id(1)));
        let mut reader = Reader::new(graph);
        for _ in 0..10 {
            reader.choose(0).unwrap();
        }
        assert_eq!(reader.current(), id(1));
        assert_eq!(reader.path().len(), 11);
    }

    #[test]
    fn test_choice_out_of_range() {
        let mut reader = Reader::new(two_pages());
        assert_eq!(
            reader.choose(3),
            Err(ReaderError::ChoiceOutOfRange {
                page: id(1),
                index: 3,
                len: 1
            })
        );
        assert_eq!(reader.current(), id(1));
    }

    #[tokio::test]
    async fn test_resolve_background() {
        let images = MemoryImageStore::new(ImageLimits::default());
        let image_id = images.store(vec![1, 2, 3], "image/png").await.unwrap();

        let graph = StoryGraph::new()
            .with_page(
                id(1),
                Page::new("stored")
                    .with_background(format!("/api/images/{image_id}"))
                    .with_choice("next", id(2)),
            )
            .with_page(
                id(2),
                Page::new("remote")
                    .with_background("https://cdn.example/x.png")
                    .with_choice("next", id(3)),
            )
            .with_page(id(3), Page::new("plain"));
        let mut reader = Reader::new(graph);
        let prefix = DEFAULT_IMAGE_URL_PREFIX;

        match reader.resolve_background(&images, prefix).await.unwrap() {
            Some(Background::Stored { id, image }) => {
                assert_eq!(id, image_id);
                assert_eq!(image.bytes, vec![1, 2, 3]);
            }
            other => panic!("expected stored background, got {other:?}"),
        }

        reader.choose(0).unwrap();
        assert_eq!(
            reader.resolve_background(&images, prefix).await.unwrap(),
            Some(Background::External("https://cdn.example/x.png".to_string()))
        );

        reader.choose(0).unwrap();
        assert_eq!(reader.resolve_background(&images, prefix).await.unwrap(), None);
    }
}
