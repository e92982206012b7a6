mod common;

use common::fixture;
use docsearch::graph::EntityKind;
use docsearch::session::{Session, SessionError, View};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_search_groups_results_by_library() {
    let fx = fixture();
    let mut session = Session::new(fx.services.clone());

    let count = session.search("  contract ").await.unwrap();
    assert_eq!(count, 2);
    assert_eq!(fx.index.queries.lock().unwrap().as_slice(), ["contract"]);
    assert_eq!(session.view(), View::Search);

    let groups = session.grouped_results();
    assert_eq!(groups.len(), 1);
    let names: Vec<_> = groups["HR"].iter().map(|d| d.display_name()).collect();
    assert_eq!(names, vec!["contract.pdf", "memo.docx"]);
}

#[tokio::test]
async fn test_blank_search_keeps_previous_results() {
    let fx = fixture();
    let mut session = Session::new(fx.services.clone());

    session.search("Ayala").await.unwrap();
    let count = session.search("   ").await.unwrap();

    assert_eq!(count, 2);
    assert_eq!(fx.index.queries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_open_result_by_key() {
    let fx = fixture();
    let mut session = Session::new(fx.services.clone());
    session.search("contract").await.unwrap();

    let doc = session.open_result("HR_1").unwrap();
    assert_eq!(doc.display_name(), "memo.docx");
    assert_eq!(session.view(), View::Document);

    assert!(matches!(session.open_result("HR_9"), Err(SessionError::NotFound(_))));
    assert!(matches!(session.open_result("Finance_0"), Err(SessionError::NotFound(_))));
    assert!(matches!(session.open_result(""), Err(SessionError::Key(_))));
}

#[tokio::test]
async fn test_entity_must_be_mentioned_by_open_document() {
    let fx = fixture();
    let mut session = Session::new(fx.services.clone());
    session.search("contract").await.unwrap();

    assert!(matches!(
        session.toggle_entity(EntityKind::Person, "Ben Reyes"),
        Err(SessionError::NoDocument)
    ));

    session.open_result("HR_1").unwrap();
    assert!(matches!(
        session.toggle_entity(EntityKind::Person, "Ana Cruz"),
        Err(SessionError::UnknownEntity(_))
    ));
    assert!(session.toggle_entity(EntityKind::Person, "Ben Reyes").unwrap());
    assert!(!session.toggle_entity(EntityKind::Person, "Ben Reyes").unwrap());
    assert!(session.selection().is_empty());
}

#[tokio::test]
async fn test_find_similar_requires_selection() {
    let fx = fixture();
    let mut session = Session::new(fx.services.clone());
    session.search("contract").await.unwrap();
    session.open_result("HR_0").unwrap();

    let err = session.find_similar().await.unwrap_err();
    assert!(matches!(err, SessionError::NoEntitiesSelected));
    assert_eq!(
        err.to_string(),
        "Please select at least one entity to find similar documents."
    );
    assert_eq!(fx.graph.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pivot_history_and_previous_results() {
    let fx = fixture();
    let mut session = Session::new(fx.services.clone());
    session.search("contract").await.unwrap();
    session.open_result("HR_0").unwrap();
    session.select_entity(EntityKind::Person, "Ana Cruz").unwrap();

    assert_eq!(session.find_similar().await.unwrap(), 1);
    assert_eq!(session.view(), View::Similar);
    assert!(session.state().search_results.is_none());
    assert_eq!(session.search_path(), vec!["Search 1: People: Ana Cruz"]);

    // Pivot again from a document in the similar view
    session.open_similar("contract.pdf").await.unwrap();
    assert_eq!(session.view(), View::Document);
    assert!(session.selection().is_empty());
    session.select_entity(EntityKind::Organization, "Ayala Land").unwrap();

    assert_eq!(session.find_similar().await.unwrap(), 3);
    let grouped = session.grouped_similar();
    let libraries: Vec<_> = grouped.keys().map(String::as_str).collect();
    assert_eq!(libraries, vec!["HR", "Ayala_Annual_Report", "Ayala_Legal_Docs"]);
    assert_eq!(
        session.search_path(),
        vec![
            "Search 1: People: Ana Cruz",
            "Search 2: Organizations: Ayala Land",
        ]
    );

    assert_eq!(session.previous_results().await.unwrap(), 1);
    assert_eq!(session.state().history.len(), 1);
    assert!(session.selection().contains(EntityKind::Person, "Ana Cruz"));
    assert!(!session.selection().contains(EntityKind::Organization, "Ayala Land"));
    assert!(session.state().similar_document.is_none());

    assert!(matches!(
        session.previous_results().await,
        Err(SessionError::NoPreviousResults)
    ));
}

#[tokio::test]
async fn test_graph_failure_leaves_state_untouched() {
    let fx = fixture();
    let mut session = Session::new(fx.services.clone());
    session.search("contract").await.unwrap();
    session.open_result("HR_0").unwrap();
    session.select_entity(EntityKind::Location, "Makati").unwrap();

    fx.graph.fail.store(true, Ordering::SeqCst);
    let err = session.find_similar().await.unwrap_err();
    assert!(matches!(err, SessionError::Graph(_)));
    assert!(err.to_string().starts_with("Error querying related documents"));

    assert_eq!(session.view(), View::Document);
    assert!(session.state().history.is_empty());
    assert_eq!(session.grouped_results()["HR"].len(), 2);
    assert!(session.selection().contains(EntityKind::Location, "Makati"));
}

#[tokio::test]
async fn test_previous_results_failure_keeps_history() {
    let fx = fixture();
    let mut session = Session::new(fx.services.clone());
    session.search("contract").await.unwrap();
    session.open_result("HR_0").unwrap();
    session.select_entity(EntityKind::Person, "Ana Cruz").unwrap();
    session.find_similar().await.unwrap();
    session.open_similar("annual-2023.pdf").await.unwrap();
    session.select_entity(EntityKind::Location, "Makati").unwrap();
    session.find_similar().await.unwrap();

    let before = session.state().clone();
    fx.graph.fail.store(true, Ordering::SeqCst);
    let err = session.previous_results().await.unwrap_err();
    assert!(matches!(err, SessionError::Graph(_)));

    let after = session.state();
    assert_eq!(after.history, before.history);
    assert_eq!(after.selection, before.selection);
    assert_eq!(after.similar_docs, before.similar_docs);
    assert_eq!(after.view, View::Similar);
    assert_eq!(session.search_path().len(), 2);
}

#[tokio::test]
async fn test_unnamed_result_opens_by_key() {
    let fx = fixture();
    let mut session = Session::new(fx.services.clone());
    session.search("payroll").await.unwrap();

    let doc = session.open_result("HR_0").unwrap();
    assert!(doc.name.is_none());
    assert_eq!(doc.content(), "Payroll register for March");

    session.summary().await.unwrap();
    session.summary().await.unwrap();
    assert_eq!(fx.summarizer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_back_navigation() {
    let fx = fixture();
    let mut session = Session::new(fx.services.clone());
    session.search("contract").await.unwrap();
    session.open_result("HR_0").unwrap();
    assert_eq!(session.back(), View::Search);

    session.open_result("HR_0").unwrap();
    session.select_entity(EntityKind::Location, "Makati").unwrap();
    session.find_similar().await.unwrap();
    session.open_similar("annual-2023.pdf").await.unwrap();
    assert_eq!(session.current_document().unwrap().library_name(), "Ayala_Annual_Report");

    // A document opened from the similar view returns there
    assert_eq!(session.back(), View::Similar);
    assert!(session.current_document().is_none());

    assert_eq!(session.back(), View::Search);
    assert!(session.state().history.is_empty());
    assert!(session.state().similar_docs.is_empty());
    assert!(!session.state().show_similar);
}

#[tokio::test]
async fn test_open_similar_missing_document() {
    let fx = fixture();
    let mut session = Session::new(fx.services.clone());

    let err = session.open_similar("lease.pdf").await.unwrap_err();
    assert!(matches!(err, SessionError::NotFound(name) if name == "lease.pdf"));
    assert_eq!(session.view(), View::Search);
}

#[tokio::test]
async fn test_summary_is_cached_per_document() {
    let fx = fixture();
    let mut session = Session::new(fx.services.clone());
    assert!(matches!(session.summary().await, Err(SessionError::NoDocument)));

    session.search("contract").await.unwrap();
    session.open_result("HR_0").unwrap();

    let first = session.summary().await.unwrap();
    let second = session.summary().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, "- Point 1: 10 words");
    assert_eq!(fx.summarizer.calls.load(Ordering::SeqCst), 1);

    session.back();
    session.open_result("HR_1").unwrap();
    session.summary().await.unwrap();
    assert_eq!(fx.summarizer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_summary_errors_are_retried() {
    let fx = fixture();
    let mut session = Session::new(fx.services.clone());
    session.search("contract").await.unwrap();
    session.open_result("HR_0").unwrap();

    fx.summarizer.fail.store(true, Ordering::SeqCst);
    assert!(matches!(session.summary().await, Err(SessionError::Summary(_))));

    fx.summarizer.fail.store(false, Ordering::SeqCst);
    assert!(session.summary().await.is_ok());
    assert_eq!(fx.summarizer.calls.load(Ordering::SeqCst), 2);
}
