//! Import validation and interchange round trips through the editor.

use story_core::testing::looping_story;
use story_core::{export_story, parse_story, EditorError, ImportError, PageId, StoryDraft};

#[test]
fn test_rejections_name_the_page() {
    let cases = [
        ("\"not an object\"", "must be an object", None),
        (r#"{"1": {"choices": []}}"#, "missing or invalid text", Some(1)),
        (r#"{"3": {"text": "x", "choices": {}}}"#, "choices must be an array", Some(3)),
        (r#"{"1": {"text": "x", "choices": [{"next": 2}]}}"#, "", Some(1)),
        (r#"{"1": {"text": "x", "choices": [{"text": "go", "next": "2"}]}}"#, "", Some(1)),
    ];

    for (input, phrase, page) in cases {
        let err = parse_story(input).expect_err(input);
        assert!(err.to_string().contains(phrase), "{input}: {err}");
        assert_eq!(err.page().map(PageId::get), page, "{input}");
    }
}

#[test]
fn test_import_replaces_graph_and_next_id() {
    let mut draft = StoryDraft::new();
    draft
        .import_json(
            r#"{"1": {"text": "Start", "background": "", "choices": [{"text": "Go", "next": 2}]},
                "2": {"text": "End", "choices": []}}"#,
        )
        .expect("valid story");

    assert_eq!(draft.graph().len(), 2);
    assert_eq!(draft.next_page_id().get(), 3);
    assert!(draft.is_dirty());
}

#[test]
fn test_failed_import_changes_nothing() {
    let mut draft = StoryDraft::from_graph("Maze", looping_story());
    let before = draft.graph().clone();
    let next = draft.next_page_id();

    let err = draft
        .import_json(r#"{"1": {"text": "ok", "choices": []}, "2": {"text": 5, "choices": []}}"#)
        .expect_err("page 2 has no text");
    assert!(matches!(
        err,
        EditorError::Import(ImportError::InvalidText(id)) if id.get() == 2
    ));
    assert_eq!(draft.graph(), &before);
    assert_eq!(draft.next_page_id(), next);
}

#[test]
fn test_export_reimport_preserves_pages_and_order() {
    let mut draft = StoryDraft::from_graph("Maze", looping_story());
    draft
        .set_background(PageId::FIRST, "https://cdn.example/hall.png")
        .expect("page exists");

    let json = draft.export_json().expect("serializable");
    let value: serde_json::Value = serde_json::from_str(&json).expect("json");
    assert!(value.is_object());
    assert_eq!(value["1"]["choices"][1]["text"], "Leave");
    assert_eq!(value["1"]["choices"][1]["next"], 3);

    let reimported = parse_story(&json).expect("exported json imports");
    assert_eq!(&reimported, draft.graph());

    let labels: Vec<_> = reimported
        .page(PageId::FIRST)
        .expect("page 1")
        .choices
        .iter()
        .map(|c| c.text.as_str())
        .collect();
    assert_eq!(labels, ["Go down", "Leave"]);
    assert_eq!(export_story(&reimported).expect("serializable"), json);
}
