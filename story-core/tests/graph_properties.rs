//! Property tests for page id allocation and delete repair.

use proptest::prelude::*;
use story_core::{Page, PageId, StoryDraft, StoryGraph};

/// Graphs with up to a dozen pages, ids in 1..=40, choices aimed at 1..=45 so
/// some of them dangle.
fn arb_graph() -> impl Strategy<Value = StoryGraph> {
    let choices = prop::collection::vec(1u32..=45, 0..4);
    prop::collection::btree_map(1u32..=40, choices, 0..12).prop_map(|pages| {
        pages
            .into_iter()
            .filter_map(|(id, targets)| {
                let id = PageId::new(id)?;
                let page = targets
                    .into_iter()
                    .filter_map(PageId::new)
                    .fold(Page::new(format!("page {id}")), |page, next| {
                        page.with_choice(format!("to {next}"), next)
                    });
                Some((id, page))
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn next_page_id_is_past_every_key(graph in arb_graph()) {
        let next = graph.next_page_id();
        match graph.ids().max() {
            Some(max) => prop_assert!(next > max),
            None => prop_assert_eq!(next, PageId::FIRST),
        }
        prop_assert!(!graph.contains(next));
    }

    #[test]
    fn delete_repairs_every_reference(graph in arb_graph(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!graph.is_empty());
        let ids: Vec<_> = graph.ids().collect();
        let victim = ids[pick.index(ids.len())];

        // Remember which choices pointed at the victim before the delete.
        let pointed: Vec<(PageId, usize)> = graph
            .pages()
            .filter(|(id, _)| *id != victim)
            .flat_map(|(id, page)| {
                page.choices
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.next == victim)
                    .map(move |(i, _)| (id, i))
            })
            .collect();

        let mut draft = StoryDraft::from_graph("Props", graph.clone());
        let next_before = draft.next_page_id();
        let repaired = draft.delete_page(victim).unwrap();
        prop_assert_eq!(repaired, pointed.len());

        let after = draft.graph();
        prop_assert!(!after.contains(victim));
        for (_, page) in after.pages() {
            if victim != PageId::FIRST {
                prop_assert!(page.choices.iter().all(|c| c.next != victim));
            }
        }
        for (id, index) in pointed {
            prop_assert_eq!(after.page(id).unwrap().choices[index].next, PageId::FIRST);
        }
        // Allocation never reuses a deleted id within the draft.
        prop_assert_eq!(draft.next_page_id(), next_before);
    }

    #[test]
    fn add_page_never_collides(graph in arb_graph(), adds in 1usize..5) {
        let mut draft = StoryDraft::from_graph("Props", graph);
        for _ in 0..adds {
            let before = draft.graph().len();
            let id = draft.add_page().unwrap();
            prop_assert_eq!(draft.graph().len(), before + 1);
            prop_assert!(draft.next_page_id() > id);
        }
    }
}
