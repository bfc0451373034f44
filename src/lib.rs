#![doc = r#"
`rrr` — a redundancy-removal-and-resubstitution engine for combinational
And-Inverter Graphs.

Modules:
- types: node kinds, the Action broadcast payload, SAT outcomes
- config: the `Parameter` surface shared by every component
- error: crate-wide `Error`/`Result` for I/O, parse, and usage failures
- network: the mutable AIG — fanin/fanout lists, checkpoints, the Action bus
- pattern: packed-bit simulation stimuli
- bdd_manager / sat_solver: the external-library boundary traits plus
  reference backends (`reference-backends` feature)
- analyzer: the Analyzer contract and its Simulator/BDD/SAT/combinator
  implementations
- optimizer: greedy reduce, resubstitution, and the exhaustive search driver
- partitioner: k-hop window extraction and re-insertion
- scheduler: job queue, flows, and cost-based acceptance
- aiger: minimal ASCII AIGER read/write for round-tripping networks
"#]

pub mod aiger;
pub mod analyzer;
pub mod bdd_manager;
pub mod config;
pub mod error;
pub mod network;
pub mod optimizer;
pub mod partitioner;
pub mod pattern;
pub mod sat_solver;
pub mod scheduler;
pub mod types;

pub use config::Parameter;
pub use error::{Error, Result};
pub use network::Network;
