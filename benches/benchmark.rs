use arboretum_pid::exact::TreewidthSearch;
use arboretum_pid::graph::EditableGraph;
use arboretum_pid::lowerbound::MinorMinWidth;
use arboretum_pid::solver::Solver;
use arboretum_pid::upperbound::MinFillDecomposer;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// Generalized Petersen graph GP(n, k).
fn generalized_petersen(n: usize, k: usize) -> EditableGraph {
    let mut edges = Vec::with_capacity(3 * n);
    for i in 0..n {
        edges.push((i, (i + 1) % n));
        edges.push((i, n + i));
        edges.push((n + i, n + (i + k) % n));
    }
    EditableGraph::from_edges(2 * n, &edges)
}

fn grid(rows: usize, cols: usize) -> EditableGraph {
    let mut edges = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            let v = r * cols + c;
            if c + 1 < cols {
                edges.push((v, v + 1));
            }
            if r + 1 < rows {
                edges.push((v, v + cols));
            }
        }
    }
    EditableGraph::from_edges(rows * cols, &edges)
}

fn exact(c: &mut Criterion) {
    let nauru = generalized_petersen(12, 5);
    c.bench_function("solver_nauru", |b| {
        b.iter(|| Solver::default().solve(black_box(&nauru)))
    });

    let grid = grid(5, 5);
    c.bench_function("search_grid_5x5", |b| {
        b.iter(|| {
            let (frozen, _) = grid.reduce();
            TreewidthSearch::new(frozen).decompose(0)
        })
    });
}

fn bounds(c: &mut Criterion) {
    let graph = generalized_petersen(20, 7);
    c.bench_function("minor_min_width_gp_20_7", |b| {
        b.iter(|| MinorMinWidth::with_graph(black_box(&graph)).compute())
    });
    c.bench_function("min_fill_gp_20_7", |b| {
        b.iter(|| MinFillDecomposer::new(black_box(&graph)).compute())
    });
}

criterion_group!(benches, exact, bounds);
criterion_main!(benches);
