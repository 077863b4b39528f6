use crate::error::{Result, TreewidthError};
use crate::graph::{BaseGraph, EditableGraph, MutableGraph};
use crate::tree_decomposition::TreeDecomposition;
use fxhash::FxHashSet;
use std::convert::TryFrom;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

fn parse_numbers(line: &str, line_no: usize) -> Result<Vec<usize>> {
    line.split_whitespace()
        .map(|token| {
            token.parse().map_err(|_| {
                TreewidthError::format(line_no, format!("expected a number, found '{}'", token))
            })
        })
        .collect()
}

/// Parses a `p tw <n> <m>` header.
fn pace_header(line: &str, line_no: usize) -> Result<(usize, usize)> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("p") || tokens.next() != Some("tw") {
        return Err(TreewidthError::format(line_no, "expected 'p tw <n> <m>'"));
    }
    match parse_numbers(&tokens.collect::<Vec<_>>().join(" "), line_no)?.as_slice() {
        [n, m] => Ok((*n, *m)),
        _ => Err(TreewidthError::format(line_no, "expected 'p tw <n> <m>'")),
    }
}

/// Converts a 1-based vertex id into a 0-based one.
fn vertex(id: usize, n: usize, line_no: usize) -> Result<usize> {
    if id == 0 || id > n {
        Err(TreewidthError::format(
            line_no,
            format!("vertex {} out of range 1..={}", id, n),
        ))
    } else {
        Ok(id - 1)
    }
}

fn is_comment(line: &str) -> bool {
    let line = line.trim_start();
    line.is_empty() || line.starts_with('c')
}

/// Reader for graphs in the PACE `.gr` format.
pub struct PaceReader<T: BufRead>(pub T);

impl<T: BufRead> TryFrom<PaceReader<T>> for EditableGraph {
    type Error = TreewidthError;

    fn try_from(reader: PaceReader<T>) -> Result<Self> {
        let mut graph: Option<EditableGraph> = None;
        for (idx, line) in reader.0.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            if is_comment(&line) {
                continue;
            }
            if let Some(graph) = graph.as_mut() {
                if line.trim_start().starts_with('p') {
                    return Err(TreewidthError::format(line_no, "duplicate header"));
                }
                let n = graph.capacity();
                match parse_numbers(&line, line_no)?.as_slice() {
                    [u, v] => {
                        let u = vertex(*u, n, line_no)?;
                        let v = vertex(*v, n, line_no)?;
                        graph.add_edge(u, v);
                    }
                    _ => return Err(TreewidthError::format(line_no, "expected '<u> <v>'")),
                }
                continue;
            }
            let (n, _) = pace_header(&line, line_no)?;
            graph = Some(EditableGraph::new(n));
        }
        graph.ok_or_else(|| TreewidthError::format(0, "missing 'p tw' header"))
    }
}

pub fn read_graph<P: AsRef<Path>>(path: P) -> Result<EditableGraph> {
    let file = File::open(path)?;
    EditableGraph::try_from(PaceReader(BufReader::new(file)))
}

/// Writes a tree decomposition in the PACE `.td` format.
pub struct PaceWriter<'a, G: BaseGraph, W: Write> {
    td: &'a TreeDecomposition,
    graph: &'a G,
    writer: W,
}

impl<'a, G: BaseGraph, W: Write> PaceWriter<'a, G, W> {
    pub fn new(td: &'a TreeDecomposition, graph: &'a G, writer: W) -> Self {
        Self { td, graph, writer }
    }

    pub fn output(mut self) -> std::io::Result<()> {
        let bags = self.td.bags();
        writeln!(
            self.writer,
            "s td {} {} {}",
            bags.len(),
            self.td.max_bag_size,
            self.graph.order()
        )?;
        for bag in bags {
            let mut vertices: Vec<_> = bag.vertex_set.iter().map(|v| v + 1).collect();
            vertices.sort_unstable();
            let vertices: Vec<_> = vertices.iter().map(|v| v.to_string()).collect();
            if vertices.is_empty() {
                writeln!(self.writer, "b {}", bag.id + 1)?;
            } else {
                writeln!(self.writer, "b {} {}", bag.id + 1, vertices.join(" "))?;
            }
        }
        for bag in bags {
            let mut neighbors: Vec<_> = bag.neighbors.iter().filter(|n| **n > bag.id).collect();
            neighbors.sort_unstable();
            for neighbor in neighbors {
                writeln!(self.writer, "{} {}", bag.id + 1, neighbor + 1)?;
            }
        }
        self.writer.flush()
    }
}

/// Reader for tree decompositions in the PACE `.td` format.
pub struct TdReader<T: BufRead>(pub T);

impl<T: BufRead> TryFrom<TdReader<T>> for TreeDecomposition {
    type Error = TreewidthError;

    fn try_from(reader: TdReader<T>) -> Result<Self> {
        let mut td = TreeDecomposition::default();
        let mut header: Option<(usize, usize, usize)> = None;
        for (idx, line) in reader.0.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            if is_comment(&line) {
                continue;
            }
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("s") => {
                    if header.is_some() || tokens.next() != Some("td") {
                        return Err(TreewidthError::format(line_no, "expected one 's td' header"));
                    }
                    match parse_numbers(&tokens.collect::<Vec<_>>().join(" "), line_no)?.as_slice()
                    {
                        [bags, max_bag, n] => header = Some((*bags, *max_bag, *n)),
                        _ => {
                            return Err(TreewidthError::format(
                                line_no,
                                "expected 's td <bags> <width+1> <n>'",
                            ))
                        }
                    }
                }
                Some("b") => {
                    let (bags, _, n) = header
                        .ok_or_else(|| TreewidthError::format(line_no, "bag before header"))?;
                    let numbers = parse_numbers(&tokens.collect::<Vec<_>>().join(" "), line_no)?;
                    let (id, vertices) = numbers
                        .split_first()
                        .ok_or_else(|| TreewidthError::format(line_no, "bag without id"))?;
                    if *id != td.bags().len() + 1 || *id > bags {
                        return Err(TreewidthError::format(
                            line_no,
                            format!("unexpected bag id {}", id),
                        ));
                    }
                    let vertex_set = vertices
                        .iter()
                        .map(|v| vertex(*v, n, line_no))
                        .collect::<Result<FxHashSet<_>>>()?;
                    td.add_bag(vertex_set);
                }
                Some(_) => {
                    let (bags, _, _) = header
                        .ok_or_else(|| TreewidthError::format(line_no, "edge before header"))?;
                    match parse_numbers(&line, line_no)?.as_slice() {
                        [a, b] if *a >= 1 && *b >= 1 && *a <= bags && *b <= bags && a != b => {
                            if *a > td.bags().len() || *b > td.bags().len() {
                                return Err(TreewidthError::format(
                                    line_no,
                                    "edge to an undeclared bag",
                                ));
                            }
                            td.add_edge(a - 1, b - 1);
                        }
                        _ => return Err(TreewidthError::format(line_no, "malformed tree edge")),
                    }
                }
                None => {}
            }
        }
        match header {
            Some((bags, _, _)) if bags == td.bags().len() => Ok(td),
            Some((bags, _, _)) => Err(TreewidthError::format(
                0,
                format!("declared {} bags, found {}", bags, td.bags().len()),
            )),
            None => Err(TreewidthError::format(0, "missing 's td' header")),
        }
    }
}
