//! Background refresh picking up external edits

use cellgraph::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn test_refresher_publishes_external_edit() {
    let source = Arc::new(MemorySource::new().with_document(
        "doc",
        DocumentSnapshot::new(vec![SheetSnapshot::new(
            "Sheet1",
            vec![CellSnapshot::value(1, 1, "1")],
        )]),
    ));
    let service = Arc::new(GraphService::open(Arc::clone(&source), "doc").unwrap());
    let reloads = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&reloads);
    let handle = Refresher::new(
        Arc::clone(&service),
        RefreshOptions {
            interval: Duration::from_millis(20),
            ..Default::default()
        },
    )
    .on_reload(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .start()
    .unwrap();

    // another writer edits the document behind the service's back
    source.write_cell("doc", "Sheet1", "B1", "=A1*10").unwrap();

    assert!(wait_until(Duration::from_secs(5), || service
        .dependents_of("A1")
        .contains("Sheet1!B1")));
    assert!(reloads.load(Ordering::SeqCst) >= 1);

    handle.stop().unwrap();
}

#[test]
fn test_readers_keep_their_snapshot_during_reload() {
    let source = Arc::new(MemorySource::new().with_document(
        "doc",
        DocumentSnapshot::new(vec![SheetSnapshot::new(
            "Sheet1",
            vec![CellSnapshot::value(1, 1, "1"), CellSnapshot::formula(1, 2, "=A1")],
        )]),
    ));
    let service = GraphService::open(Arc::clone(&source), "doc").unwrap();

    let held = service.snapshot();
    source.write_cell("doc", "Sheet1", "C1", "=B1").unwrap();
    service.reload().unwrap();

    assert_eq!(held.graph.cell_count(), 2);
    assert_eq!(service.snapshot().graph.cell_count(), 3);
}
