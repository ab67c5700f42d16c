//! End-to-end tests for graph construction and dependency queries

use cellgraph::prelude::*;
use cellgraph::{EdgeKind, GraphBuilder};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn open(sheets: Vec<SheetSnapshot>) -> GraphService<MemorySource> {
    let source = MemorySource::new().with_document("doc", DocumentSnapshot::new(sheets));
    GraphService::open(source, "doc").unwrap()
}

/// Employees has five rows of three columns; Sales!E2 counts columns A and B
fn staff_document() -> Vec<SheetSnapshot> {
    let mut employees = Vec::new();
    for row in 1..=5 {
        employees.push(CellSnapshot::value(row, 1, format!("name{row}")));
        employees.push(CellSnapshot::value(row, 2, format!("dept{row}")));
        employees.push(CellSnapshot::value(row, 3, format!("{}", row * 1000)));
    }
    vec![
        SheetSnapshot::new("Employees", employees),
        SheetSnapshot::new(
            "Sales",
            vec![CellSnapshot::formula(2, 5, "=COUNTA(Employees!A:B)")],
        ),
    ]
}

#[test]
fn test_same_sheet_reference() {
    let service = open(vec![SheetSnapshot::new(
        "Sheet1",
        vec![CellSnapshot::value(1, 1, "10"), CellSnapshot::formula(1, 2, "=A1*2")],
    )]);

    assert_eq!(service.dependencies_of("B1"), ids(&["Sheet1!A1"]));
    assert_eq!(service.dependents_of("A1"), ids(&["Sheet1!B1"]));
    assert!(service.dependencies_of("A1").is_empty());
}

#[test]
fn test_transitive_chain() {
    let service = open(vec![SheetSnapshot::new(
        "Sheet1",
        vec![
            CellSnapshot::value(1, 1, "1"),
            CellSnapshot::formula(1, 2, "=A1+1"),
            CellSnapshot::formula(1, 3, "=B1+1"),
        ],
    )]);

    assert_eq!(service.dependents_of("A1"), ids(&["Sheet1!B1", "Sheet1!C1"]));
    assert_eq!(service.dependencies_of("C1"), ids(&["Sheet1!A1", "Sheet1!B1"]));
}

#[test]
fn test_cycles_terminate_and_exclude_self() {
    let service = open(vec![SheetSnapshot::new(
        "Sheet1",
        vec![
            CellSnapshot::formula(1, 1, "=B1"),
            CellSnapshot::formula(1, 2, "=A1"),
            CellSnapshot::formula(2, 1, "=B2"),
            CellSnapshot::formula(2, 2, "=C2"),
            CellSnapshot::formula(2, 3, "=D2"),
            CellSnapshot::formula(2, 4, "=A2"),
        ],
    )]);

    assert_eq!(service.dependencies_of("A1"), ids(&["Sheet1!B1"]));
    assert_eq!(service.dependents_of("A1"), ids(&["Sheet1!B1"]));
    assert!(service.is_circular("A1"));

    assert_eq!(
        service.dependencies_of("A2"),
        ids(&["Sheet1!B2", "Sheet1!C2", "Sheet1!D2"])
    );

    // the engine itself reports the start node when it sits on a cycle
    let snapshot = service.snapshot();
    assert!(snapshot
        .graph
        .transitive_dependencies("Sheet1!A1")
        .contains("Sheet1!A1"));
}

#[test]
fn test_qualified_column_range() {
    let service = open(staff_document());
    let snapshot = service.snapshot();

    let targets: BTreeSet<&str> = snapshot
        .graph
        .forward_edges_of("Sales!E2")
        .filter(|(kind, _)| *kind == EdgeKind::DependsOn)
        .map(|(_, id)| id)
        .collect();
    assert_eq!(targets.len(), 10);
    assert!(targets.iter().all(|id| !id.starts_with("Employees!C")));
    assert_eq!(snapshot.stats.cross_sheet_edges, 10);

    assert_eq!(service.dependents_of("Employees!B3"), ids(&["Sales!E2"]));
    assert!(service.dependents_of("Employees!C3").is_empty());
}

#[test]
fn test_bare_column_range_never_resolves() {
    let service = open(vec![SheetSnapshot::new(
        "Sheet1",
        vec![
            CellSnapshot::value(1, 3, "1"),
            CellSnapshot::value(2, 3, "2"),
            CellSnapshot::formula(1, 1, "=SUM(C:C)"),
        ],
    )]);

    assert_eq!(service.snapshot().graph.edge_count_of(EdgeKind::DependsOn), 0);
    assert!(service.dependencies_of("A1").is_empty());
}

#[test]
fn test_references_to_later_sheets() {
    let service = open(vec![
        SheetSnapshot::new("Summary", vec![CellSnapshot::formula(1, 1, "=Data!A1+Data!A2")]),
        SheetSnapshot::new(
            "Data",
            vec![CellSnapshot::value(1, 1, "5"), CellSnapshot::value(2, 1, "6")],
        ),
    ]);

    assert_eq!(
        service.dependencies_of("Summary!A1"),
        ids(&["Data!A1", "Data!A2"])
    );
}

#[test]
fn test_unknown_targets_are_empty() {
    let service = open(staff_document());

    assert!(service.dependencies_of("NoSuchSheet!Z9").is_empty());
    assert!(service.dependents_of("Employees!Z99").is_empty());
    assert!(!service.is_circular("NoSuchSheet!Z9"));
}

#[test]
fn test_reload_replaces_previous_graph() {
    let source = std::sync::Arc::new(MemorySource::new().with_document(
        "doc",
        DocumentSnapshot::new(staff_document()),
    ));
    let service = GraphService::open(std::sync::Arc::clone(&source), "doc").unwrap();
    assert_eq!(service.summary().sheet_count, 2);

    source.insert(
        "doc",
        DocumentSnapshot::new(vec![SheetSnapshot::new(
            "Only",
            vec![CellSnapshot::value(1, 1, "x")],
        )]),
    );
    let summary = service.reload().unwrap();

    assert_eq!(summary.sheet_count, 1);
    assert_eq!(summary.cell_count, 1);
    assert!(service.snapshot().graph.cell("Employees!A1").is_none());
    assert!(service.dependents_of("Employees!A1").is_empty());
}

fn edge_set(graph: &Graph) -> BTreeSet<(EdgeKind, String, String)> {
    graph
        .edges()
        .map(|(kind, from, to)| (kind, from.to_string(), to.to_string()))
        .collect()
}

fn node_set(graph: &Graph) -> BTreeSet<String> {
    graph.nodes().map(|node| node.id().to_string()).collect()
}

fn mixed_document() -> DocumentSnapshot {
    DocumentSnapshot::new(vec![
        SheetSnapshot::new(
            "Inputs",
            vec![
                CellSnapshot::value(1, 1, "100"),
                CellSnapshot::value(2, 1, "200"),
                CellSnapshot::formula(3, 1, "=SUM(A1:A2)"),
                CellSnapshot::formula(1, 2, "=Report!B2*2"),
            ],
        ),
        SheetSnapshot::new(
            "Report",
            vec![
                CellSnapshot::formula(1, 1, "=Inputs!A3"),
                CellSnapshot::formula(2, 2, "=A1+Inputs!A1:A2"),
                CellSnapshot::formula(3, 3, "=COUNTA(Inputs!A:A)"),
            ],
        ),
    ])
}

#[test]
fn test_rebuild_is_idempotent() {
    let document = mixed_document();
    let (mut graph, first) = GraphBuilder::build(&document);
    let nodes = node_set(&graph);
    let edges = edge_set(&graph);

    let second = GraphBuilder::rebuild(&mut graph, &document);

    assert_eq!(first, second);
    assert_eq!(node_set(&graph), nodes);
    assert_eq!(edge_set(&graph), edges);
}

proptest! {
    #[test]
    fn prop_cell_order_does_not_change_graph(
        inputs in Just(mixed_document().sheets[0].cells.clone()).prop_shuffle(),
        report in Just(mixed_document().sheets[1].cells.clone()).prop_shuffle(),
    ) {
        let (expected, _) = GraphBuilder::build(&mixed_document());
        let shuffled = DocumentSnapshot::new(vec![
            SheetSnapshot::new("Inputs", inputs),
            SheetSnapshot::new("Report", report),
        ]);
        let (graph, _) = GraphBuilder::build(&shuffled);

        prop_assert_eq!(node_set(&graph), node_set(&expected));
        prop_assert_eq!(edge_set(&graph), edge_set(&expected));
    }
}
