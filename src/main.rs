use arboretum_pid::graph::EditableGraph;
use arboretum_pid::io::{PaceReader, PaceWriter};
use arboretum_pid::logging::{init_pace_logger, level_from_verbosity};
use arboretum_pid::solver::{SolveResult, Solver, UpperboundHeuristicType};
use arboretum_pid::{Result, TreewidthError};
use log::{error, info, warn};
use std::convert::TryFrom;
use std::fs::{File, OpenOptions};
use std::io::{stdin, stdout, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "arboretum-pid-cli",
    about = "Computes exact treewidth and an optimal tree decomposition."
)]
struct Opt {
    /// Input files, using the graph format of the PACE challenge. `stdin` if none are given.
    #[structopt(parse(from_os_str))]
    inputs: Vec<PathBuf>,

    /// Output file for a single input, output directory for several. Defaults to `stdout` for a
    /// single input and to `<input>.td` next to each input otherwise.
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Per-instance time limit in seconds.
    #[structopt(short, long)]
    timeout: Option<u64>,

    /// Logging verbosity, repeat for more.
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    /// Runs a min-fill elimination first and stops the exact search at its width.
    #[structopt(long)]
    heuristic_upperbound: bool,

    /// Skips the simplicial reduction rules.
    #[structopt(long)]
    no_reductions: bool,

    /// Skips cut vertex and clique separator decomposition.
    #[structopt(long)]
    no_separators: bool,

    /// Seed for tie breaking in the heuristic upper bound.
    #[structopt(long, default_value = "0")]
    seed: u64,
}

impl Opt {
    fn solver(&self) -> Solver {
        let heuristic = if self.heuristic_upperbound {
            Some(UpperboundHeuristicType::MinFill)
        } else {
            None
        };
        Solver::default()
            .apply_reduction_rules(!self.no_reductions)
            .use_separators(!self.no_separators)
            .upperbound_heuristic(heuristic)
            .seed(self.seed)
    }

    fn output_for(&self, input: &Path) -> Option<PathBuf> {
        let file_name = input.with_extension("td");
        match (&self.output, self.inputs.len()) {
            (Some(output), 1) => Some(output.clone()),
            (Some(dir), _) => file_name.file_name().map(|name| dir.join(name)),
            (None, 1) => None,
            (None, _) => Some(file_name),
        }
    }
}

fn write_result(result: &SolveResult, graph: &EditableGraph, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let writer = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            PaceWriter::new(&result.tree_decomposition, graph, writer).output()?;
        }
        None => {
            let writer = stdout();
            PaceWriter::new(&result.tree_decomposition, graph, writer.lock()).output()?;
        }
    }
    Ok(())
}

/// Solves on a worker thread. On timeout the worker is abandoned and `Ok(None)` returned.
fn solve_with_timeout(
    solver: Solver,
    graph: EditableGraph,
    timeout: Option<Duration>,
) -> Result<Option<(SolveResult, EditableGraph)>> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let result = solver.solve(&graph).map(|result| (result, graph));
        // the receiver is gone once the instance timed out
        let _ = sender.send(result);
    });
    let received = match timeout {
        Some(timeout) => match receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => return Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(TreewidthError::InternalConsistency(
                    "solver thread panicked".to_string(),
                ))
            }
        },
        None => receiver.recv().map_err(|_| {
            TreewidthError::InternalConsistency("solver thread panicked".to_string())
        })?,
    };
    received.map(Some)
}

fn run(opt: &Opt, graph: EditableGraph, output: Option<&Path>, name: &str) -> Result<()> {
    let timeout = opt.timeout.map(Duration::from_secs);
    let start = Instant::now();
    match solve_with_timeout(opt.solver(), graph, timeout)? {
        Some((result, graph)) => {
            info!(
                "{}: treewidth {} in {:.3}s",
                name,
                result.width,
                start.elapsed().as_secs_f64()
            );
            write_result(&result, &graph, output)
        }
        None => {
            warn!("{}: timed out after {:.3}s", name, start.elapsed().as_secs_f64());
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    if init_pace_logger(Some(level_from_verbosity(opt.verbose))).is_err() {
        eprintln!("c logger already initialised");
    }

    if opt.inputs.is_empty() {
        let stdin = stdin();
        let graph = EditableGraph::try_from(PaceReader(stdin.lock()))?;
        return run(&opt, graph, opt.output.as_deref(), "stdin");
    }

    let failures = solve_files(&opt);
    stdout().flush()?;
    if failures > 0 {
        warn!("{} of {} instances failed", failures, opt.inputs.len());
        exit(1);
    }
    Ok(())
}

/// Solves every input file, logging failures instead of stopping. Returns the number of failed
/// instances.
fn solve_files(opt: &Opt) -> usize {
    let mut failures = 0;
    for input in &opt.inputs {
        let name = input.display().to_string();
        let result = File::open(input)
            .map_err(TreewidthError::from)
            .and_then(|file| EditableGraph::try_from(PaceReader(BufReader::new(file))))
            .and_then(|graph| run(opt, graph, opt.output_for(input).as_deref(), &name));
        if let Err(e) = result {
            error!("{}: {}", name, e);
            failures += 1;
        }
    }
    failures
}
