//! Greedy redundancy removal and add-based resubstitution
//! (SPEC_FULL.md §4.7). Grounded on
//! `examples/original_source/src/rrrOptimizer.h` (read in full):
//! `ReduceFanin`/`Reduce`/`RemoveRedundancy` (the production greedy
//! pass), `SingleAdd`/`MultiAdd` with their "just-added" exclusion
//! set, and `SingleResub`/`MultiResub`/`Run`'s production sequencing.
//! The research-fork variants (`ReduceRandom`, `RemoveRedundancyRandom`,
//! `SingleResubRandom`, the commented-out `SingleReplace`) are not
//! ported: `Run` never calls them, so they have no externally
//! observable effect (§9 Open Questions). `exhaustive` ports the
//! branch-and-restore search from
//! `examples/original_source/src/optimizer/rrrOptimizer2.h`, the
//! variant `examples/original_source/src/application/ssr.cpp` wires
//! up for `-X3`.

use crate::analyzer::Analyzer;
use crate::config::OptimizerFlow;
use crate::network::Network;
use crate::types::Action;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::debug;

/// Drives one network's reduction/resubstitution passes through a
/// boxed `Analyzer` (open kind set, §6a) while the network itself
/// stays a concrete `Network` (closed shape).
pub struct Optimizer {
    analyzer: Box<dyn Analyzer>,
    /// Fanins added by the current `SingleAdd`/`MultiAdd` pass, kept
    /// out of `ReduceFanin`'s candidates until cleared so a
    /// resubstitution can't immediately undo its own addition.
    new_fanins: HashMap<usize, HashSet<usize>>,
    timeout: Option<std::time::Duration>,
    start: Option<std::time::Instant>,
}

impl Optimizer {
    pub fn new(analyzer: Box<dyn Analyzer>) -> Self {
        Optimizer { analyzer, new_fanins: HashMap::new(), timeout: None, start: None }
    }

    pub fn assign_network(&mut self, net: &mut Network, reuse: bool) {
        self.analyzer.assign_network(net, reuse);
    }

    /// `sum(num_fanins - 1)` over internal nodes: the two-input-gate
    /// count the network would expand to.
    pub fn cost(net: &Network) -> usize {
        let mut total = 0usize;
        net.for_each_int(|id| total += net.num_fanins(id) - 1);
        total
    }

    fn timed_out(&self) -> bool {
        match (self.timeout, self.start) {
            (Some(limit), Some(start)) => start.elapsed() > limit,
            _ => false,
        }
    }

    /// Test every fanin of `id` for redundancy, removing each that
    /// passes and retrying the same index (the remaining fanins shift
    /// down by one). Fanins just added by this pass's own `SingleAdd`/
    /// `MultiAdd` call are skipped.
    fn reduce_fanin(&mut self, net: &mut Network, id: usize, remove_unused: bool) -> bool {
        debug_assert!(net.num_fanouts(id) > 0);
        let mut removed_any = false;
        let mut idx = 0usize;
        while idx < net.num_fanins(id) {
            let (fi, _) = net.get_fanin(id, idx);
            if self.new_fanins.get(&id).is_some_and(|s| s.contains(&fi)) {
                idx += 1;
                continue;
            }
            if self.analyzer.check_redundancy(net, id, idx) {
                net.remove_fanin(id, idx);
                removed_any = true;
                if remove_unused && net.num_fanouts(fi) == 0 {
                    net.sweep(false);
                }
            } else {
                idx += 1;
            }
        }
        removed_any
    }

    /// Single pass, no restart on success (§4.7 *Reduce*).
    pub fn reduce(&mut self, net: &mut Network) {
        let ints: Vec<usize> = {
            let mut v = Vec::new();
            net.for_each_int(|id| v.push(id));
            v
        };
        for id in ints.into_iter().rev() {
            if !net.is_and(id) {
                continue;
            }
            if net.num_fanouts(id) == 0 {
                net.sweep(false);
                continue;
            }
            self.reduce_fanin(net, id, false);
            if net.num_fanins(id) <= 1 {
                net.propagate(id);
            }
        }
    }

    /// The production greedy pass: reverse-topological walk, restarting
    /// from the tail whenever any node's fanin list shrinks.
    pub fn remove_redundancy(&mut self, net: &mut Network) {
        loop {
            let ints: Vec<usize> = {
                let mut v = Vec::new();
                net.for_each_int(|id| v.push(id));
                v
            };
            let mut reduced_any = false;
            for id in ints.into_iter().rev() {
                if !net.is_and(id) {
                    continue;
                }
                if net.num_fanouts(id) == 0 {
                    net.sweep(false);
                    continue;
                }
                let reduced = self.reduce_fanin(net, id, false);
                if net.num_fanins(id) <= 1 {
                    net.propagate(id);
                }
                if reduced {
                    reduced_any = true;
                    break;
                }
            }
            if !reduced_any {
                break;
            }
        }
    }

    /// Nodes reachable from `id`'s transitive fanout, plus `id` and its
    /// current fanins: ineligible resubstitution candidates (`MarkTfo`
    /// plus the per-fanin marking in `SingleAdd`/`MultiAdd`).
    fn ineligible(net: &Network, id: usize) -> HashSet<usize> {
        let mut marks = HashSet::new();
        marks.insert(id);
        net.for_each_tfo(id, false, |fo| {
            marks.insert(fo);
        });
        for &(fi, _) in net.fanins(id) {
            marks.insert(fi);
        }
        marks
    }

    /// Try candidates in order, adding the first one that is feasible
    /// (either polarity) as a new fanin of `id`. Returns the index into
    /// `candidates` just past the one consumed, or `candidates.len()`
    /// if none worked.
    fn single_add(&mut self, net: &mut Network, id: usize, candidates: &[usize], start: usize) -> usize {
        let marks = Self::ineligible(net, id);
        let mut it = start;
        while it < candidates.len() {
            let cand = candidates[it];
            if marks.contains(&cand) {
                it += 1;
                continue;
            }
            if !net.is_and(cand) && !net.is_pi(cand) {
                it += 1;
                continue;
            }
            if self.analyzer.check_feasibility(net, id, cand, false) {
                net.add_fanin(id, cand, false);
            } else if self.analyzer.check_feasibility(net, id, cand, true) {
                net.add_fanin(id, cand, true);
            } else {
                it += 1;
                continue;
            }
            self.new_fanins.entry(id).or_default().insert(cand);
            return it;
        }
        it
    }

    fn multi_add(&mut self, net: &mut Network, id: usize, candidates: &[usize], max: usize) -> usize {
        let marks = Self::ineligible(net, id);
        let mut added = 0usize;
        for &cand in candidates {
            if max != 0 && added == max {
                break;
            }
            if marks.contains(&cand) {
                continue;
            }
            if !net.is_and(cand) && !net.is_pi(cand) {
                continue;
            }
            if self.analyzer.check_feasibility(net, id, cand, false) {
                net.add_fanin(id, cand, false);
            } else if self.analyzer.check_feasibility(net, id, cand, true) {
                net.add_fanin(id, cand, true);
            } else {
                continue;
            }
            self.new_fanins.entry(id).or_default().insert(cand);
            added += 1;
        }
        added
    }

    fn all_candidates(net: &Network) -> Vec<usize> {
        let mut v = net.pis().to_vec();
        net.for_each_int(|id| v.push(id));
        v
    }

    /// For each node (reverse topo order): trivially flatten, try
    /// adding one new fanin at a time, re-run `remove_redundancy` after
    /// each successful add, then trivially re-decompose. `greedy`
    /// checkpoints before the pass and accepts a step only if it does
    /// not increase `cost` (§4.7).
    pub fn single_resub(&mut self, net: &mut Network, greedy: bool) {
        let slot = if greedy { Some(net.save()) } else { None };
        let mut cost = Self::cost(net);
        let ints: Vec<usize> = {
            let mut v = Vec::new();
            net.for_each_int(|id| v.push(id));
            v
        };
        for id in ints.into_iter().rev() {
            if self.timed_out() {
                break;
            }
            if !net.is_and(id) {
                continue;
            }
            debug_assert!(net.num_fanouts(id) != 0);
            debug_assert!(net.num_fanins(id) > 1);
            net.trivial_collapse(id);
            let candidates = Self::all_candidates(net);
            let mut cursor = 0usize;
            loop {
                if self.timed_out() {
                    break;
                }
                cursor = self.single_add(net, id, &candidates, cursor);
                if cursor >= candidates.len() {
                    break;
                }
                self.remove_redundancy(net);
                self.new_fanins.clear();
                if !net.is_and(id) {
                    cost = Self::cost(net);
                    debug!(new_cost = cost, "single_resub collapsed node");
                    if let Some(slot) = slot {
                        net.save_into(slot);
                    }
                    break;
                }
                let new_cost = Self::cost(net);
                if greedy {
                    let slot = slot.unwrap();
                    if new_cost <= cost {
                        net.save_into(slot);
                        cost = new_cost;
                    } else {
                        net.load(slot);
                    }
                } else {
                    cost = new_cost;
                }
                cursor += 1;
            }
            if net.is_and(id) && net.num_fanins(id) > 2 {
                net.trivial_decompose(id, 2);
            }
        }
        if let Some(slot) = slot {
            net.load(slot);
            net.pop_back();
        }
    }

    /// For each node: trivially flatten, add as many feasible new
    /// fanins as possible in one shot, run `remove_redundancy` twice
    /// (once before and once after clearing the exclusion set), then
    /// trivially re-decompose. `greedy` accepts/rejects exactly as
    /// `single_resub` does.
    pub fn multi_resub(&mut self, net: &mut Network, greedy: bool, max: usize) {
        let slot = if greedy { Some(net.save()) } else { None };
        let mut cost = Self::cost(net);
        let ints: Vec<usize> = {
            let mut v = Vec::new();
            net.for_each_int(|id| v.push(id));
            v
        };
        for id in ints.into_iter().rev() {
            if self.timed_out() {
                break;
            }
            if !net.is_and(id) {
                continue;
            }
            debug_assert!(net.num_fanouts(id) != 0);
            debug_assert!(net.num_fanins(id) > 1);
            net.trivial_collapse(id);
            let candidates = Self::all_candidates(net);
            self.multi_add(net, id, &candidates, max);
            self.remove_redundancy(net);
            self.new_fanins.clear();
            self.remove_redundancy(net);
            let new_cost = Self::cost(net);
            if greedy {
                let slot = slot.unwrap();
                if new_cost <= cost {
                    net.save_into(slot);
                    cost = new_cost;
                } else {
                    net.load(slot);
                }
            }
            if net.is_and(id) && net.num_fanins(id) > 2 {
                net.trivial_decompose(id, 2);
            }
        }
        if slot.is_some() {
            net.pop_back();
        }
    }

    /// The production entry point: `RemoveRedundancy(); SingleResub();
    /// MultiResub();`, matching `Optimizer::Run` in the source exactly
    /// (the commented-out random/replace variants are never invoked
    /// there either).
    fn run_production(&mut self, net: &mut Network, timeout: Option<std::time::Duration>) {
        self.timeout = timeout;
        self.start = Some(std::time::Instant::now());
        self.remove_redundancy(net);
        self.single_resub(net, true);
        self.multi_resub(net, true, 0);
    }

    /// Dispatch to the `-X` flow the scheduler was configured with
    /// (SPEC_FULL.md §6/§4.7).
    pub fn run(&mut self, net: &mut Network, flow: OptimizerFlow, timeout: Option<std::time::Duration>) {
        self.timeout = timeout;
        self.start = Some(std::time::Instant::now());
        match flow {
            OptimizerFlow::ReduceOnly => self.remove_redundancy(net),
            OptimizerFlow::ResubOnly => {
                self.single_resub(net, true);
                self.multi_resub(net, true, 0);
            }
            OptimizerFlow::ReduceThenResub => self.run_production(net, timeout),
            OptimizerFlow::Exhaustive => self.exhaustive(net, timeout),
        }
    }

    /// The exhaustive search variant (`Optimizer2::Run`, §4.7
    /// *Exhaustive search variant*): an iterative-deepening
    /// branch-and-restore search over every (target node, candidate
    /// fanin) pair. `targetChoices` is implicit in recursion depth
    /// here; `choices[depth]` is the source's `faninChoices` cursor
    /// for `targets[depth]` (`0` encodes "leave this target alone",
    /// `k+1` encodes "try candidate `k`"). Every committed choice
    /// saves a Network checkpoint and pushes a fresh frame onto the
    /// action log so a backtrack's `Load` rewinds the log alongside
    /// the network state, mirroring the source's `vvActions[slot]`.
    fn exhaustive(&mut self, net: &mut Network, timeout: Option<std::time::Duration>) {
        self.timeout = timeout;
        self.start = Some(std::time::Instant::now());
        self.remove_redundancy(net);

        let targets: Vec<usize> = {
            let mut v = Vec::new();
            net.for_each_int(|id| {
                if net.is_and(id) {
                    v.push(id);
                }
            });
            v
        };
        if targets.is_empty() {
            return;
        }

        // Absent an explicit timeout the search space is combinatorial;
        // bound the number of leaves visited so a pathological network
        // cannot hang the optimizer (the source relies solely on
        // `GetRemainingTime()`, which this crate's callers always set
        // for this flow in practice).
        const MAX_TRIALS: usize = 20_000;
        let mut trials = 0usize;

        let action_log: Rc<RefCell<Vec<Vec<Action>>>> = Rc::new(RefCell::new(vec![Vec::new()]));
        let log_for_cb = Rc::clone(&action_log);
        let cb_handle = net.add_callback(Box::new(move |a: &Action| {
            log_for_cb.borrow_mut().last_mut().expect("action log always has a frame").push(a.clone());
        }));

        let mut choices: Vec<usize> = vec![0];
        let mut applied: Vec<Option<usize>> = Vec::new();
        let mut best_cost = Self::cost(net);
        let mut best_path: Vec<usize> = Vec::new();

        loop {
            if self.timed_out() || trials >= MAX_TRIALS {
                break;
            }
            let depth = applied.len();

            let should_backtrack = if depth == targets.len() {
                trials += 1;
                let cost = Self::cost(net);
                if cost < best_cost {
                    best_cost = cost;
                    best_path = choices[..depth].to_vec();
                }
                true
            } else {
                let id = targets[depth];
                let choice = choices[depth];
                if choice == 0 {
                    applied.push(None);
                    action_log.borrow_mut().push(Vec::new());
                    choices.push(0);
                    false
                } else if !net.is_and(id) || net.num_fanouts(id) == 0 {
                    true
                } else {
                    let candidates = Self::all_candidates(net);
                    let cand_idx = choice - 1;
                    if cand_idx >= candidates.len() {
                        true
                    } else {
                        let cand = candidates[cand_idx];
                        let marks = Self::ineligible(net, id);
                        let eligible = !marks.contains(&cand) && (net.is_and(cand) || net.is_pi(cand));
                        let feasible = eligible
                            && (self.analyzer.check_feasibility(net, id, cand, false)
                                || self.analyzer.check_feasibility(net, id, cand, true));
                        if !feasible {
                            choices[depth] += 1;
                            continue;
                        }
                        let complement = !self.analyzer.check_feasibility(net, id, cand, false);
                        let slot = net.save();
                        action_log.borrow_mut().push(Vec::new());
                        net.add_fanin(id, cand, complement);
                        self.new_fanins.entry(id).or_default().insert(cand);
                        self.reduce_fanin(net, id, false);
                        self.new_fanins.clear();
                        if net.is_and(id) && net.num_fanins(id) <= 1 {
                            net.propagate(id);
                        }
                        applied.push(Some(slot));
                        choices.push(0);
                        false
                    }
                }
            };

            if should_backtrack {
                choices.pop();
                let Some(slot_opt) = applied.pop() else { break };
                if let Some(slot) = slot_opt {
                    net.load(slot);
                    net.pop_back();
                }
                action_log.borrow_mut().pop();
                if choices.is_empty() {
                    break;
                }
                *choices.last_mut().unwrap() += 1;
            }
        }

        // Fully unwind back to the state `exhaustive` was called with.
        while let Some(slot_opt) = applied.pop() {
            if let Some(slot) = slot_opt {
                net.load(slot);
                net.pop_back();
            }
        }
        net.delete_callback(cb_handle);

        // Replay the winning path for real, so the surviving Actions
        // are genuinely broadcast to every subscriber (the analyzer
        // included) rather than reconstructed from the discarded log.
        for (depth, &choice) in best_path.iter().enumerate() {
            if choice == 0 {
                continue;
            }
            let id = targets[depth];
            if !net.is_and(id) || net.num_fanouts(id) == 0 {
                continue;
            }
            let candidates = Self::all_candidates(net);
            let cand_idx = choice - 1;
            if cand_idx >= candidates.len() {
                continue;
            }
            let cand = candidates[cand_idx];
            let marks = Self::ineligible(net, id);
            if marks.contains(&cand) || (!net.is_and(cand) && !net.is_pi(cand)) {
                continue;
            }
            let complement = if self.analyzer.check_feasibility(net, id, cand, false) {
                false
            } else if self.analyzer.check_feasibility(net, id, cand, true) {
                true
            } else {
                continue;
            };
            net.add_fanin(id, cand, complement);
            self.new_fanins.entry(id).or_default().insert(cand);
            self.reduce_fanin(net, id, false);
            self.new_fanins.clear();
            if net.is_and(id) && net.num_fanins(id) <= 1 {
                net.propagate(id);
            }
        }
        self.remove_redundancy(net);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::simulator::Simulator;
    use crate::pattern::Pattern;

    fn always_true_pattern(num_inputs: usize) -> Pattern {
        Pattern::random(num_inputs, 4, 7)
    }

    #[test]
    fn remove_redundancy_strips_dominated_fanin() {
        let mut net = Network::new();
        let a = net.add_pi();
        let b = net.add_pi();
        let u = net.add_and(vec![(a, false), (b, false)]);
        let t = net.add_and(vec![(u, false), (b, false)]);
        let _p = net.add_po(t, false);

        let pattern = always_true_pattern(net.num_pis());
        let mut sim = Simulator::new(pattern);
        sim.assign_network(&mut net, false);
        let mut opt = Optimizer::new(Box::new(sim));
        opt.remove_redundancy(&mut net);

        assert_eq!(net.num_fanins(t), 1);
    }

    #[test]
    fn cost_counts_two_input_equivalent_gates() {
        let mut net = Network::new();
        let a = net.add_pi();
        let b = net.add_pi();
        let c = net.add_pi();
        let _n = net.add_and(vec![(a, false), (b, false), (c, false)]);
        assert_eq!(Optimizer::cost(&net), 2);
    }
}
