//! Every knob the CLI / scheduler / optimizer / analyzers read.
//!
//! Mirrors `rrrParameter.h`'s base fields (`nWords`, `iSeed`, the three
//! verbosity counters, the two BDD-mode flags) widened with the rest
//! of the surface `ssr.cpp` actually populates from its CLI flags
//! (SPEC_FULL.md §6).

use std::time::Duration;

/// Which Analyzer the Optimizer should attach.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnalyzerKind {
    /// Bit-parallel simulator combined with SAT confirmation (default).
    SimulatorSat,
    /// BDD-based CSPF.
    BddCspf,
    /// BDD-based MSPF.
    BddMspf,
    /// SAT miter alone, no simulator pre-filter.
    SatOnly,
}

impl Default for AnalyzerKind {
    fn default() -> Self {
        AnalyzerKind::SimulatorSat
    }
}

/// Scheduler flow selector (`-Y`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SchedulerFlow {
    /// Run the optimizer once per job.
    Flow0,
    /// "TransStoch": optimizer/ABC-compress alternation + restructuring hop.
    Flow1TransStoch,
    /// "DeepSyn": randomized ABC composition + optimizer rounds.
    Flow2DeepSyn,
}

impl Default for SchedulerFlow {
    fn default() -> Self {
        SchedulerFlow::Flow0
    }
}

/// Optimizer flow selector (`-X`): greedy reduce only, resub only,
/// both, or the exhaustive search variant.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OptimizerFlow {
    ReduceOnly,
    ResubOnly,
    ReduceThenResub,
    Exhaustive,
}

impl Default for OptimizerFlow {
    fn default() -> Self {
        OptimizerFlow::ReduceThenResub
    }
}

/// The full parameter surface shared by every component.
#[derive(Clone, Debug)]
pub struct Parameter {
    /// Number of 64-bit simulation words per node (`-W`).
    pub num_words: usize,
    /// RNG seed (`-R`).
    pub seed: u64,
    /// Wall-clock budget; `None` means unbounded (`-T`).
    pub timeout: Option<Duration>,
    /// Worker thread count; 1 means single-threaded inline (`-J`).
    pub num_threads: usize,
    /// Number of synthesis jobs to run (one Network copy + seed each).
    pub num_jobs: usize,
    /// Partition window size in nodes, 0 disables partitioning (`-K`).
    pub partition_size: usize,
    /// Minimum partition size (`-L`).
    pub partition_min: usize,
    /// Max partition inputs (`-I`).
    pub partition_max_inputs: usize,
    /// Max live parallel partitions (`-B`).
    pub num_parallel_partitions: usize,
    /// Use the loop-excluding partition boundary mode instead of the
    /// default fixpoint-pull-in mode (SPEC_FULL.md §4.8).
    pub exclude_loops: bool,
    pub scheduler_flow: SchedulerFlow,
    pub optimizer_flow: OptimizerFlow,
    pub analyzer_kind: AnalyzerKind,
    /// SAT conflict limit, 0 means unbounded (`-C`).
    pub conflict_limit: usize,
    /// Component verbosities (`-V/-P/-O/-A/-Q/-S`).
    pub scheduler_verbose: u8,
    pub partitioner_verbose: u8,
    pub optimizer_verbose: u8,
    pub analyzer_verbose: u8,
    pub aiger_verbose: u8,
    pub sat_verbose: u8,
    /// Deterministic scheduling (`-d`): finished jobs drain in job-id order.
    pub deterministic: bool,
    /// Greedy acceptance in the optimizer (`-g`).
    pub greedy: bool,
    /// Output AIGER path (`-o`); `None` means stdout / no write.
    pub output_path: Option<std::path::PathBuf>,
}

impl Default for Parameter {
    fn default() -> Self {
        Parameter {
            num_words: 1,
            seed: 0,
            timeout: None,
            num_threads: 1,
            num_jobs: 1,
            partition_size: 0,
            partition_min: 0,
            partition_max_inputs: usize::MAX,
            num_parallel_partitions: 1,
            exclude_loops: false,
            scheduler_flow: SchedulerFlow::default(),
            optimizer_flow: OptimizerFlow::default(),
            analyzer_kind: AnalyzerKind::default(),
            conflict_limit: 0,
            scheduler_verbose: 0,
            partitioner_verbose: 0,
            optimizer_verbose: 0,
            analyzer_verbose: 0,
            aiger_verbose: 0,
            sat_verbose: 0,
            deterministic: false,
            greedy: false,
            output_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameter_matches_source_defaults() {
        let p = Parameter::default();
        assert_eq!(p.num_words, 1);
        assert_eq!(p.seed, 0);
        assert_eq!(p.analyzer_kind, AnalyzerKind::SimulatorSat);
        assert!(!p.deterministic);
    }
}
