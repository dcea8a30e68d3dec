//! End-to-end rewrite pipeline scenarios: chunk, select, run, reintegrate.

use redraft_rewrite::{
    consolidate, merge_all, merge_into_document, shared, ChunkStatus, ChunkStore, Document,
    EditingSession, MergedDocument, MockRewriteService, Orchestrator, RunOutcome, RunRequest,
    SharedChunkStore,
};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

fn store(text: &str, max_words: usize) -> SharedChunkStore {
    shared(ChunkStore::new(&Document::new("doc", text), max_words).unwrap())
}

fn uppercase() -> RunRequest {
    RunRequest::new("uppercase", "mock")
}

#[tokio::test]
async fn end_to_end_uppercase() {
    let store = store("w1 w2 w3 w4 w5", 2);
    {
        let store = store.read().await;
        let texts: Vec<&str> = store.chunks().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["w1 w2", "w3 w4", "w5"]);
    }

    store.write().await.toggle(1).unwrap();
    store.write().await.toggle(3).unwrap();

    let orchestrator = Orchestrator::new(Arc::new(MockRewriteService::uppercase()));
    let report = orchestrator
        .run_selection(&store, &uppercase(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.submitted, vec![1, 3]);
    assert_eq!(report.rewritten, vec![1, 3]);

    let store = store.read().await;
    assert_eq!(store.get(1).unwrap().output.as_deref(), Some("W1 W2"));
    assert_eq!(store.get(3).unwrap().output.as_deref(), Some("W5"));
    assert_eq!(store.get(2).unwrap().status, ChunkStatus::Pending);
    assert_eq!(consolidate(&store), "W1 W2\n\nW5");
}

#[tokio::test]
async fn abort_on_failing_chunk() {
    let store = store("w1 w2 w3 w4 w5", 2);
    store.write().await.select_indices(&[1, 3]).unwrap();

    let orchestrator = Orchestrator::new(Arc::new(MockRewriteService::uppercase().failing_on("w5")));
    let report = orchestrator
        .run_selection(&store, &uppercase(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted { at_index: 3 });
    assert_eq!(report.failure.as_ref().map(|f| f.index), Some(3));

    let store = store.read().await;
    assert_eq!(store.get(1).unwrap().output.as_deref(), Some("W1 W2"));
    assert_eq!(store.get(3).unwrap().status, ChunkStatus::Failed);
    assert!(store.get(3).unwrap().error.is_some());
    assert_eq!(consolidate(&store), "W1 W2");
}

#[tokio::test]
async fn failure_stops_the_queue() {
    // Ten one-word chunks; run over [2, 5, 7] with chunk 5 failing.
    let store = store("c1 c2 c3 c4 c5 c6 c7 c8 c9 c10", 1);
    store.write().await.select_indices(&[2, 5, 7]).unwrap();

    let service = Arc::new(MockRewriteService::uppercase().failing_on("c5"));
    let orchestrator = Orchestrator::new(service.clone());
    let report = orchestrator
        .run_selection(&store, &uppercase(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted { at_index: 5 });
    assert_eq!(report.not_attempted(), vec![7]);

    let texts: Vec<String> = service.calls().into_iter().map(|c| c.text).collect();
    assert_eq!(texts, vec!["c2", "c5"]);

    let store = store.read().await;
    assert_eq!(store.get(2).unwrap().status, ChunkStatus::Rewritten);
    assert_eq!(store.get(5).unwrap().status, ChunkStatus::Failed);
    assert_eq!(store.get(7).unwrap().status, ChunkStatus::Selected);
    assert_eq!(store.summary().in_progress, 0);
}

#[tokio::test]
async fn rerun_retries_from_failure_point() {
    let store = store("c1 c2 c3 c4", 1);
    store.write().await.select_all();

    let failing = Orchestrator::new(Arc::new(MockRewriteService::uppercase().failing_on("c2")));
    failing
        .run_selection(&store, &uppercase(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(store.read().await.selected_indices(), vec![2, 3, 4]);

    let service = Arc::new(MockRewriteService::uppercase());
    let healthy = Orchestrator::new(service.clone());
    let report = healthy
        .run_selection(&store, &uppercase(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.outcome.is_completed());
    assert_eq!(service.call_count(), 3);
    assert_eq!(consolidate(&*store.read().await), "C1\n\nC2\n\nC3\n\nC4");
}

#[tokio::test]
async fn reselected_chunk_is_rewritten_again() {
    let store = store("w1 w2 w3", 2);
    store.write().await.select(1).unwrap();

    let orchestrator = Orchestrator::new(Arc::new(MockRewriteService::uppercase()));
    orchestrator
        .run_selection(&store, &uppercase(), &CancellationToken::new())
        .await
        .unwrap();

    store.write().await.toggle(1).unwrap();
    let reverse = Orchestrator::new(Arc::new(MockRewriteService::new(|text| {
        Ok(text.chars().rev().collect())
    })));
    reverse
        .run_selection(&store, &RunRequest::new("reverse", "mock"), &CancellationToken::new())
        .await
        .unwrap();

    let store = store.read().await;
    assert_eq!(store.get(1).unwrap().output.as_deref(), Some("2w 1w"));
}

#[tokio::test]
async fn consolidate_is_idempotent() {
    let store = store("alpha beta gamma delta epsilon", 2);
    store.write().await.select_all();
    Orchestrator::new(Arc::new(MockRewriteService::uppercase()))
        .run_selection(&store, &uppercase(), &CancellationToken::new())
        .await
        .unwrap();

    let store = store.read().await;
    let first = consolidate(&store);
    let second = consolidate(&store);
    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(first, "ALPHA BETA\n\nGAMMA DELTA\n\nEPSILON");
}

#[tokio::test]
async fn toggle_leaves_other_chunks_untouched() {
    let store = store("a b c d e f g h", 2);
    store.write().await.select_indices(&[1, 2]).unwrap();
    Orchestrator::new(Arc::new(MockRewriteService::uppercase()))
        .run(&store, &[1], &uppercase(), &CancellationToken::new())
        .await
        .unwrap();

    let before = store.read().await.chunks().to_vec();
    store.write().await.toggle(3).unwrap();
    let after = store.read().await.chunks().to_vec();

    for (old, new) in before.iter().zip(&after) {
        if old.index != 3 {
            assert_eq!(old.status, new.status);
            assert_eq!(old.output, new.output);
        }
    }
    assert_eq!(after[2].status, ChunkStatus::Selected);
}

#[tokio::test]
async fn cancellation_takes_effect_at_chunk_boundary() {
    let store = store("c1 c2 c3 c4", 1);
    store.write().await.select_all();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let service = Arc::new(MockRewriteService::uppercase().with_hook(move |request| {
        if request.text == "c2" {
            trigger.cancel();
        }
    }));

    let report = Orchestrator::new(service.clone())
        .run_selection(&store, &uppercase(), &cancel)
        .await
        .unwrap();

    // The call in flight when cancellation arrived still completes.
    assert_eq!(report.outcome, RunOutcome::Cancelled { next_index: 3 });
    assert_eq!(report.rewritten, vec![1, 2]);
    assert_eq!(service.call_count(), 2);

    let store = store.read().await;
    assert_eq!(store.get(2).unwrap().output.as_deref(), Some("C2"));
    assert_eq!(store.get(3).unwrap().status, ChunkStatus::Selected);
    assert!(!store.is_running());
}

#[tokio::test]
async fn selection_edits_during_run_do_not_change_the_queue() {
    let store = store("c1 c2 c3", 1);
    store.write().await.select_all();

    let edits = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&edits);
    let live = store.clone();
    let service = Arc::new(MockRewriteService::uppercase().with_hook(move |request| {
        if request.text != "c1" {
            return;
        }
        // The orchestrator holds no lock while the service works.
        let mut store = live.try_write().expect("store is free during a rewrite call");
        let toggled = store
            .toggle(3)
            .map(|chunk| (chunk.status, chunk.included))
            .unwrap();

        let mut stale = store.get(2).unwrap().clone();
        stale.status = ChunkStatus::Pending;
        stale.included = false;
        let replaced = store.replace(2, stale);

        log.lock().unwrap().push((toggled, replaced.unwrap_err().is_consistency()));
    }));

    let report = Orchestrator::new(service.clone())
        .run_selection(&store, &uppercase(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        edits.lock().unwrap().as_slice(),
        &[((ChunkStatus::Selected, false), true)]
    );

    assert!(report.outcome.is_completed());
    assert_eq!(report.rewritten, vec![1, 2, 3]);
    let texts: Vec<String> = service.calls().into_iter().map(|c| c.text).collect();
    assert_eq!(texts, vec!["c1", "c2", "c3"]);

    let store = store.read().await;
    assert_eq!(store.get(2).unwrap().output.as_deref(), Some("C2"));
    assert_eq!(store.get(3).unwrap().status, ChunkStatus::Rewritten);
    assert!(!store.get(3).unwrap().included);
    assert!(store.selected_indices().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_concurrent_run_is_rejected() {
    let store = store("c1 c2", 1);
    store.write().await.select_all();

    let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
    let started_tx = Mutex::new(Some(started_tx));
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let blocking = Arc::new(MockRewriteService::uppercase().with_hook(move |_| {
        if let Some(tx) = started_tx.lock().unwrap().take() {
            let _ = tx.send(());
            let _ = release_rx.lock().unwrap().recv();
        }
    }));

    let first_store = store.clone();
    let first = tokio::spawn(async move {
        Orchestrator::new(blocking)
            .run_selection(&first_store, &uppercase(), &CancellationToken::new())
            .await
    });
    started_rx.await.unwrap();

    let err = Orchestrator::new(Arc::new(MockRewriteService::uppercase()))
        .run(&store, &[1], &uppercase(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_consistency());

    release_tx.send(()).unwrap();
    let report = first.await.unwrap().unwrap();
    assert!(report.outcome.is_completed());
}

#[tokio::test]
async fn merge_keeps_original_layout() {
    let text = "First para one two.\n\nSecond para three four.\n";
    let session = EditingSession::load(
        Document::new("essay", text),
        redraft_rewrite::ChunkerConfig {
            rewrite_max_words: 3,
            display_max_words: 10,
        },
    )
    .unwrap();

    session.store().write().await.select(2).unwrap();
    Orchestrator::new(Arc::new(MockRewriteService::uppercase()))
        .run_selection(session.store(), &uppercase(), &CancellationToken::new())
        .await
        .unwrap();

    let merged = session.merged().await.unwrap();
    assert_eq!(merged.text(), "First para one TWO. SECOND PARA three four.\n");

    let store = session.store().read().await;
    let base = MergedDocument::new(Arc::clone(session.document()), &store).unwrap();
    assert!(merge_into_document(&base, &store, 1).unwrap_err().is_consistency());
    assert_eq!(merge_all(&base, &store).unwrap().text(), merged.text());
}
