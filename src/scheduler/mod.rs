//! Job scheduling across one or more worker threads (SPEC_FULL.md
//! §4.9, §5). Grounded on the general queue/worker shape shared by
//! `examples/original_source/src/scheduler/rrrRotatingThresholdScheduler.h`,
//! `rrrCsoScheduler.h` and `rrrDlsScheduler.h` (a dispatcher that hands
//! out `(network, seed)` jobs to workers and drains results by id);
//! Flow 0/1/2's actual bodies and the partitioning-mode loop are
//! specified directly by SPEC_FULL.md §4.9 rather than ported from any
//! one of those three (each targets a different scheduling policy, not
//! a different flow body).

pub mod abc;

use crate::analyzer;
use crate::config::{AnalyzerKind, Parameter, SchedulerFlow};
use crate::network::Network;
use crate::optimizer::Optimizer;
use crate::partitioner::Partitioner;
use abc::AbcSession;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// One unit of work: an AIGER-serialized network copy plus the seed
/// its Analyzer's random pattern set (if any) should use. Networks
/// cross thread boundaries as plain bytes rather than as `Network`
/// values themselves, since `Network`'s callback slots are `!Send`
/// closures tied to whichever Analyzer most recently subscribed.
struct Job {
    id: usize,
    seed: u64,
    bytes: Vec<u8>,
}

/// A finished job result, ordered by ascending id so a `BinaryHeap`
/// (a max-heap) can be driven as a min-heap for deterministic,
/// job-id-ordered draining.
struct Finished {
    id: usize,
    bytes: Vec<u8>,
}

impl PartialEq for Finished {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Finished {}
impl PartialOrd for Finished {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Finished {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.id.cmp(&self.id)
    }
}

struct PendingQueue {
    jobs: std::collections::VecDeque<Job>,
    closed: bool,
}

struct FinishedQueue {
    next_to_drain: usize,
    heap: BinaryHeap<Finished>,
}

/// Owns the job queue and (optionally) a worker thread pool; drives
/// the configured scheduler Flow over every queued job and, in
/// partitioning mode, the k-hop windows it extracts along the way.
pub struct Scheduler<B: AbcSession + Send + 'static> {
    param: Parameter,
    abc: Arc<Mutex<B>>,
    start: Instant,
}

impl<B: AbcSession + Send + 'static> Scheduler<B> {
    pub fn new(param: Parameter, abc: B) -> Self {
        Scheduler { param, abc: Arc::new(Mutex::new(abc)), start: Instant::now() }
    }

    fn remaining_time(&self) -> Option<Duration> {
        self.param.timeout.map(|limit| limit.saturating_sub(self.start.elapsed()))
    }

    fn timed_out(&self) -> bool {
        matches!(self.remaining_time(), Some(d) if d.is_zero())
    }

    fn build_analyzer(&self, num_inputs: usize, seed: u64) -> Box<dyn analyzer::Analyzer> {
        analyzer::build(self.param.analyzer_kind, num_inputs, self.param.num_words, seed, self.param.conflict_limit)
    }

    /// Run one job's network through the configured Flow, returning the
    /// (possibly improved) result. `abc` is the per-call handle into the
    /// shared, mutex-serialized external ABC session.
    fn run_job(&self, mut net: Network, seed: u64, abc: &Arc<Mutex<B>>) -> Network {
        let baseline_cost = Optimizer::cost(&net);

        let analyzer = self.build_analyzer(net.num_pis(), seed);
        let mut opt = Optimizer::new(analyzer);
        opt.assign_network(&mut net, false);

        let result = match self.param.scheduler_flow {
            SchedulerFlow::Flow0 => self.flow0(&mut opt, net, baseline_cost),
            SchedulerFlow::Flow1TransStoch => self.flow1(&mut opt, net, baseline_cost, abc),
            SchedulerFlow::Flow2DeepSyn => self.flow2(&mut opt, net, baseline_cost, abc),
        };
        result
    }

    /// Flow 0: run the optimizer once per job.
    fn flow0(&self, opt: &mut Optimizer, mut net: Network, baseline_cost: usize) -> Network {
        opt.run(&mut net, self.param.optimizer_flow, self.remaining_time());
        let cost = Optimizer::cost(&net);
        debug!(baseline_cost, cost, "flow0 finished");
        net
    }

    /// Flow 1 "TransStoch": alternate `optimizer -> ABC compress` until
    /// a round makes no improvement, then take one bounded
    /// restructuring hop (`&if -K 6; &mfs; &st`) and repeat the
    /// alternation, up to a fixed hop bound.
    fn flow1(&self, opt: &mut Optimizer, mut net: Network, baseline_cost: usize, abc: &Arc<Mutex<B>>) -> Network {
        const MAX_HOPS: usize = 4;
        let mut best = net.structural_clone();
        let mut best_cost = baseline_cost;

        for hop in 0..MAX_HOPS {
            if self.timed_out() {
                break;
            }
            loop {
                if self.timed_out() {
                    break;
                }
                opt.run(&mut net, self.param.optimizer_flow, self.remaining_time());
                let compressed = {
                    let mut guard = abc.lock().unwrap();
                    guard.run_script(&net, "compress2rs")
                };
                let Ok(compressed) = compressed else { break };
                let new_cost = Optimizer::cost(&compressed);
                let cur_cost = Optimizer::cost(&net);
                if new_cost >= cur_cost {
                    break;
                }
                net = compressed;
                opt.assign_network(&mut net, false);
            }
            let cost = Optimizer::cost(&net);
            if cost < best_cost {
                best = net.structural_clone();
                best_cost = cost;
            }
            if hop + 1 == MAX_HOPS || self.timed_out() {
                break;
            }
            let hopped = {
                let mut guard = abc.lock().unwrap();
                guard.run_script(&net, "&if -K 6; &mfs; &st")
            };
            match hopped {
                Ok(n) => {
                    net = n;
                    opt.assign_network(&mut net, false);
                }
                Err(_) => break,
            }
        }
        debug!(baseline_cost, best_cost, "flow1 (TransStoch) finished");
        best
    }

    /// Flow 2 "DeepSyn": each iteration composes a random short ABC
    /// script from a fixed library of synthesis commands, then runs N
    /// rounds of optimizer + compress, tracking the best result seen.
    fn flow2(&self, opt: &mut Optimizer, mut net: Network, baseline_cost: usize, abc: &Arc<Mutex<B>>) -> Network {
        const SCRIPTS: &[&str] = &[
            "&dch; &if -K 6; &mfs",
            "&fx; &st; compress2rs",
            "&if -K 6; &mfs; &st",
            "compress2rs; &dch; &if -K 6",
        ];
        const ROUNDS_PER_ITERATION: usize = 2;
        const MAX_ITERATIONS: usize = 6;

        let mut rng = {
            use rand::{RngCore, SeedableRng};
            rand::rngs::StdRng::seed_from_u64(self.param.seed).next_u64()
        };
        let mut best = net.structural_clone();
        let mut best_cost = baseline_cost;

        for iteration in 0..MAX_ITERATIONS {
            if self.timed_out() {
                break;
            }
            let script = SCRIPTS[(rng as usize + iteration) % SCRIPTS.len()];
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);

            let attempted = {
                let mut guard = abc.lock().unwrap();
                guard.run_script(&net, script)
            };
            let Ok(mut candidate) = attempted else { continue };
            opt.assign_network(&mut candidate, false);
            for _ in 0..ROUNDS_PER_ITERATION {
                if self.timed_out() {
                    break;
                }
                opt.run(&mut candidate, self.param.optimizer_flow, self.remaining_time());
                let compressed = {
                    let mut guard = abc.lock().unwrap();
                    guard.run_script(&candidate, "compress2rs")
                };
                if let Ok(c) = compressed {
                    candidate = c;
                    opt.assign_network(&mut candidate, false);
                }
            }
            let cost = Optimizer::cost(&candidate);
            if cost < best_cost {
                best = candidate.structural_clone();
                best_cost = cost;
                net = candidate;
            }
        }
        debug!(baseline_cost, best_cost, "flow2 (DeepSyn) finished");
        best
    }

    /// Run every job in `param.num_jobs`, splitting across
    /// `param.num_threads` workers when configured for more than one,
    /// and return the best (lowest-cost) resulting network.
    pub fn run(&self, seed_net: &Network) -> Network {
        if self.param.partition_size > 0 {
            return self.run_partitioned(seed_net);
        }

        let jobs: Vec<Job> = (0..self.param.num_jobs.max(1))
            .map(|i| Job { id: i, seed: self.param.seed.wrapping_add(i as u64), bytes: crate::aiger::render(seed_net) })
            .collect();

        let results = if self.param.num_threads <= 1 {
            jobs.into_iter()
                .map(|job| {
                    let net = crate::aiger::from_bytes(&job.bytes).expect("job bytes were produced by this run");
                    (job.id, self.run_job(net, job.seed, &self.abc))
                })
                .collect::<Vec<_>>()
        } else {
            self.run_threaded(jobs)
        };

        let baseline_cost = Optimizer::cost(seed_net);
        let mut best = seed_net.structural_clone();
        let mut best_cost = baseline_cost;
        for (_, net) in results {
            let cost = Optimizer::cost(&net);
            if cost < best_cost {
                best_cost = cost;
                best = net;
            }
        }
        best
    }

    /// The multi-threaded path: a pending queue and a finished queue,
    /// each behind a `Mutex` + `Condvar`, plus the shared ABC session
    /// (already behind its own mutex via `self.abc`). In deterministic
    /// mode the dispatcher only drains `next_to_drain` in sequence;
    /// otherwise it takes whatever finishes first.
    fn run_threaded(&self, jobs: Vec<Job>) -> Vec<(usize, Network)> {
        let num_jobs = jobs.len();
        // Every job this run will ever submit is already enqueued, so
        // the pending queue starts closed: workers drain it to
        // completion and exit, no further submissions arrive.
        let pending = Arc::new((Mutex::new(PendingQueue { jobs: jobs.into(), closed: true }), Condvar::new()));
        let finished = Arc::new((Mutex::new(FinishedQueue { next_to_drain: 0, heap: BinaryHeap::new() }), Condvar::new()));

        std::thread::scope(|scope| {
            for _ in 0..self.param.num_threads.min(num_jobs.max(1)) {
                let pending = Arc::clone(&pending);
                let finished = Arc::clone(&finished);
                let abc = Arc::clone(&self.abc);
                scope.spawn(move || loop {
                    let job = {
                        let (lock, cvar) = &*pending;
                        let mut guard = lock.lock().unwrap();
                        loop {
                            if let Some(job) = guard.jobs.pop_front() {
                                break Some(job);
                            }
                            if guard.closed {
                                break None;
                            }
                            guard = cvar.wait(guard).unwrap();
                        }
                    };
                    let Some(job) = job else { break };
                    let net = crate::aiger::from_bytes(&job.bytes).expect("job bytes were produced by this run");
                    let result = self.run_job(net, job.seed, &abc);
                    let bytes = crate::aiger::render(&result);
                    let (lock, cvar) = &*finished;
                    let mut guard = lock.lock().unwrap();
                    guard.heap.push(Finished { id: job.id, bytes });
                    cvar.notify_all();
                });
            }

            {
                let (lock, _) = &*pending;
                lock.lock().unwrap().closed = true;
            }
            let (pcvar) = &pending.1;
            pcvar.notify_all();

            let mut drained = Vec::with_capacity(num_jobs);
            let (lock, cvar) = &*finished;
            let mut guard = lock.lock().unwrap();
            while drained.len() < num_jobs {
                while guard.heap.peek().is_none_or(|top| self.param.deterministic && top.id != guard.next_to_drain) {
                    guard = cvar.wait(guard).unwrap();
                }
                let next = guard.heap.pop().unwrap();
                guard.next_to_drain = next.id + 1;
                let net = crate::aiger::from_bytes(&next.bytes).expect("finished job bytes round-trip");
                drained.push((next.id, net));
            }
            drained
        })
    }

    /// Partitioning mode: extract k-hop windows (up to
    /// `num_parallel_partitions` live at once), optimize each as its
    /// own job, and splice the result back in before extracting the
    /// next window.
    fn run_partitioned(&self, seed_net: &Network) -> Network {
        let mut net = seed_net.structural_clone();
        let mut partitioner = Partitioner::new(self.param.partition_size, self.param.exclude_loops);

        let mut job_id = 0usize;
        loop {
            if self.timed_out() {
                break;
            }
            let seeds: Vec<usize> = {
                let mut v = Vec::new();
                net.for_each_int(|id| v.push(id));
                v
            };
            if seeds.is_empty() {
                break;
            }

            let batch: Vec<usize> = seeds.into_iter().take(self.param.num_parallel_partitions.max(1)).collect();
            let mut any_improved = false;
            for seed in batch {
                if !net.exists(seed) || !net.is_and(seed) {
                    continue;
                }
                if net.num_fanins(seed) < self.param.partition_min.max(2) {
                    continue;
                }
                let (window, token) = partitioner.extract(&net, seed);
                if window.num_pis() > self.param.partition_max_inputs {
                    continue;
                }
                let job_seed = self.param.seed.wrapping_add(job_id as u64);
                job_id += 1;
                let before = Optimizer::cost(&window);
                let optimized = self.run_job(window, job_seed, &self.abc);
                let after = Optimizer::cost(&optimized);
                if after < before {
                    any_improved = true;
                    partitioner.insert(&mut net, token, &optimized);
                }
            }
            if !any_improved {
                break;
            }
        }
        net
    }
}
