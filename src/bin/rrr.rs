//! Command-line entry point (SPEC_FULL.md §6). Mirrors the option
//! surface `examples/original_source/src/application/ssr.cpp` parses
//! via `ssr -R<seed> -T<timeout> ...`, expressed as a `clap::Parser`.

use clap::{Parser, ValueEnum};
use rrr::config::{AnalyzerKind, OptimizerFlow, Parameter, SchedulerFlow};
use rrr::scheduler::abc::{NullAbcSession, ProcessAbcSession};
use rrr::scheduler::Scheduler;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum AnalyzerArg {
    /// Bit-parallel simulator confirmed by SAT (default).
    Sim,
    /// BDD-based CSPF.
    Cspf,
    /// BDD-based MSPF.
    Mspf,
    /// SAT miter alone.
    Sat,
}

impl From<AnalyzerArg> for AnalyzerKind {
    fn from(a: AnalyzerArg) -> Self {
        match a {
            AnalyzerArg::Sim => AnalyzerKind::SimulatorSat,
            AnalyzerArg::Cspf => AnalyzerKind::BddCspf,
            AnalyzerArg::Mspf => AnalyzerKind::BddMspf,
            AnalyzerArg::Sat => AnalyzerKind::SatOnly,
        }
    }
}

/// Redundancy-removal and resubstitution over And-Inverter Graphs.
#[derive(Parser, Debug)]
#[command(name = "rrr", about = "AIG redundancy-removal/resubstitution engine")]
struct Cli {
    /// Input AIGER (.aag) path. Omit to run a tiny built-in demo circuit.
    input: Option<PathBuf>,

    /// Output AIGER path (-o).
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// RNG seed (-R).
    #[arg(short = 'R', long, default_value_t = 0)]
    seed: u64,

    /// Timeout in seconds, 0 means unbounded (-T).
    #[arg(short = 'T', long, default_value_t = 0)]
    timeout: u64,

    /// Worker thread count (-J).
    #[arg(short = 'J', long, default_value_t = 1)]
    threads: usize,

    /// Number of synthesis jobs to run.
    #[arg(long, default_value_t = 1)]
    jobs: usize,

    /// Partition window size, 0 disables partitioning (-K).
    #[arg(short = 'K', long, default_value_t = 0)]
    partition_size: usize,

    /// Minimum partition size (-L).
    #[arg(short = 'L', long, default_value_t = 0)]
    partition_min: usize,

    /// Max partition inputs (-I).
    #[arg(short = 'I', long, default_value_t = usize::MAX)]
    partition_max_inputs: usize,

    /// Max live parallel partitions (-B).
    #[arg(short = 'B', long, default_value_t = 1)]
    parallel_partitions: usize,

    /// Scheduler flow (-Y): 0, 1 (TransStoch), or 2 (DeepSyn).
    #[arg(short = 'Y', long, default_value_t = 0)]
    scheduler_flow: u8,

    /// Optimizer flow (-X): 0 reduce-only, 1 resub-only, 2 both, 3 exhaustive.
    #[arg(short = 'X', long, default_value_t = 2)]
    optimizer_flow: u8,

    /// Analyzer kind (-U).
    #[arg(short = 'U', long, value_enum, default_value_t = AnalyzerArg::Sim)]
    analyzer: AnalyzerArg,

    /// SAT conflict limit, 0 means unbounded (-C).
    #[arg(short = 'C', long, default_value_t = 0)]
    conflict_limit: usize,

    /// Simulation words per node (-W).
    #[arg(short = 'W', long, default_value_t = 1)]
    words: usize,

    /// Deterministic scheduling (-d).
    #[arg(short = 'd', long, default_value_t = false)]
    deterministic: bool,

    /// Greedy checkpoint-backed acceptance (-g).
    #[arg(short = 'g', long, default_value_t = false)]
    greedy: bool,

    /// Run ABC-composed flows against a real `abc` binary instead of
    /// the pass-through stub (requires `abc` on PATH).
    #[arg(long, default_value_t = false)]
    real_abc: bool,
}

fn build_demo_network() -> rrr::Network {
    // PI a, PI b, PI c; u = a & b; t = u & c; PO p = t.
    // Scenario 2 of SPEC_FULL.md §8: c turns out redundant through u.
    let mut net = rrr::Network::new();
    let a = net.add_pi();
    let b = net.add_pi();
    let c = net.add_pi();
    let u = net.add_and(vec![(a, false), (b, false)]);
    let t = net.add_and(vec![(u, false), (c, false)]);
    net.add_po(t, false);
    net
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::try_init().ok();
    let cli = Cli::parse();

    let net = match &cli.input {
        Some(path) => rrr::aiger::read(path)?,
        None => build_demo_network(),
    };

    let scheduler_flow = match cli.scheduler_flow {
        0 => SchedulerFlow::Flow0,
        1 => SchedulerFlow::Flow1TransStoch,
        2 => SchedulerFlow::Flow2DeepSyn,
        other => return Err(rrr::Error::Usage(format!("unsupported scheduler flow -Y{other}")).into()),
    };
    let optimizer_flow = match cli.optimizer_flow {
        0 => OptimizerFlow::ReduceOnly,
        1 => OptimizerFlow::ResubOnly,
        2 => OptimizerFlow::ReduceThenResub,
        3 => OptimizerFlow::Exhaustive,
        other => return Err(rrr::Error::Usage(format!("unsupported optimizer flow -X{other}")).into()),
    };

    let param = Parameter {
        num_words: cli.words.max(1),
        seed: cli.seed,
        timeout: (cli.timeout > 0).then(|| Duration::from_secs(cli.timeout)),
        num_threads: cli.threads.max(1),
        num_jobs: cli.jobs.max(1),
        partition_size: cli.partition_size,
        partition_min: cli.partition_min,
        partition_max_inputs: cli.partition_max_inputs,
        num_parallel_partitions: cli.parallel_partitions.max(1),
        scheduler_flow,
        optimizer_flow,
        analyzer_kind: cli.analyzer.into(),
        conflict_limit: cli.conflict_limit,
        deterministic: cli.deterministic,
        greedy: cli.greedy,
        output_path: cli.output.clone(),
        ..Parameter::default()
    };

    let result = if cli.real_abc {
        Scheduler::new(param, ProcessAbcSession::default()).run(&net)
    } else {
        Scheduler::new(param, NullAbcSession).run(&net)
    };

    println!(
        "nodes: {} -> {} | cost: {} -> {}",
        net.num_nodes(),
        result.num_nodes(),
        rrr::optimizer::Optimizer::cost(&net),
        rrr::optimizer::Optimizer::cost(&result),
    );

    if let Some(out) = &cli.output {
        rrr::aiger::write(&result, out)?;
    }

    Ok(())
}
