use arboretum_pid::graph::{BaseGraph, EditableGraph};
use arboretum_pid::io::{PaceReader, PaceWriter, TdReader};
use arboretum_pid::solver::{Solver, UpperboundHeuristicType};
use arboretum_pid::tree_decomposition::TreeDecomposition;
use arboretum_pid::TreewidthError;
use std::convert::TryFrom;
use std::io::Cursor;

fn generalized_petersen(n: usize, k: usize) -> EditableGraph {
    let mut edges = Vec::with_capacity(3 * n);
    for i in 0..n {
        edges.push((i, (i + 1) % n));
        edges.push((i, n + i));
        edges.push((n + i, n + (i + k) % n));
    }
    EditableGraph::from_edges(2 * n, &edges)
}

fn to_pace(graph: &EditableGraph) -> String {
    let mut text = format!("c generated\np tw {} {}\n", graph.capacity(), graph.edge_count());
    for (u, v) in graph.edges() {
        text.push_str(&format!("{} {}\n", u + 1, v + 1));
    }
    text
}

#[test]
fn petersen() {
    let graph = generalized_petersen(5, 2);
    assert_eq!(graph.order(), 10);
    let result = Solver::default().solve(&graph).unwrap();
    assert_eq!(result.width, 4);
    assert_eq!(result.tree_decomposition.verify(&graph), Ok(()));
}

#[test]
fn nauru() {
    let graph = generalized_petersen(12, 5);
    assert!(graph.vertices().all(|v| graph.degree(v) == 3));
    let result = Solver::default().solve(&graph).unwrap();
    assert_eq!(result.width, 6);
    assert_eq!(result.tree_decomposition.verify(&graph), Ok(()));

    let shortcut = Solver::default()
        .upperbound_heuristic(Some(UpperboundHeuristicType::MinFill))
        .solve(&graph)
        .unwrap();
    assert_eq!(shortcut.width, 6);
}

#[test]
fn pace_round_trip() {
    let graph = generalized_petersen(6, 1);
    let parsed = EditableGraph::try_from(PaceReader(Cursor::new(to_pace(&graph)))).unwrap();
    assert_eq!(parsed.edge_count(), graph.edge_count());

    let result = Solver::default().solve(&parsed).unwrap();
    let mut out = Vec::new();
    PaceWriter::new(&result.tree_decomposition, &parsed, &mut out)
        .output()
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with(&format!(
        "s td {} {} 12\n",
        result.tree_decomposition.bags().len(),
        result.width + 1
    )));

    let td = TreeDecomposition::try_from(TdReader(Cursor::new(text))).unwrap();
    assert_eq!(td.width(), result.width);
    assert_eq!(td.verify(&graph), Ok(()));
}

#[test]
fn malformed_graph_is_rejected() {
    let text = "p tw 3 2\n1 2\n2 four\n";
    match EditableGraph::try_from(PaceReader(Cursor::new(text))) {
        Err(TreewidthError::Format { line, .. }) => assert_eq!(line, 3),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("accepted malformed input"),
    }
}
