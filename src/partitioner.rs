//! k-hop neighborhood windowing (SPEC_FULL.md §4.8). Grounded on
//! `examples/original_source/src/rrrPartitioner.h` (read in full):
//! `Extract`'s tentative-boundary computation and its two
//! cycle-avoidance modes (pull in "inner" nodes to a fixpoint, or drop
//! loop-causing outputs and their fanin cone), and `Insert`'s
//! round-trip back into the live network.

use crate::network::Network;
use std::collections::{HashMap, HashSet};

/// Opaque handle for an in-flight extracted window, standing in for
/// the source's raw `Ntk *` map key (Rust has no stable pointer
/// identity to key on once the sub-network is handed to the caller).
pub type WindowToken = usize;

/// Extracts a k-hop neighborhood around a seed node into a standalone
/// `Network`, and splices an edited version back in afterward.
pub struct Partitioner {
    k: usize,
    exclude_loops: bool,
    next_token: WindowToken,
    windows: HashMap<WindowToken, (Vec<usize>, Vec<usize>)>,
}

fn successors(net: &Network, seeds: &HashSet<usize>) -> HashSet<usize> {
    let mut visited: HashSet<usize> = HashSet::new();
    let mut queue: Vec<usize> = seeds.iter().copied().collect();
    while let Some(id) = queue.pop() {
        if !visited.insert(id) {
            continue;
        }
        for &(fo, _) in net.fanouts(id) {
            if !visited.contains(&fo) {
                queue.push(fo);
            }
        }
    }
    visited
}

fn predecessors(net: &Network, seeds: &HashSet<usize>) -> HashSet<usize> {
    let mut visited: HashSet<usize> = HashSet::new();
    let mut queue: Vec<usize> = seeds.iter().copied().collect();
    while let Some(id) = queue.pop() {
        if !visited.insert(id) {
            continue;
        }
        for &(fi, _) in net.fanins(id) {
            if !visited.contains(&fi) {
                queue.push(fi);
            }
        }
    }
    visited
}

/// Nodes lying on a path from `fanouts` (outside the tentative window)
/// back to `inputs` (the window's own boundary inputs): pulling these
/// in breaks the loop the window would otherwise close (`GetInners`).
fn get_inners(net: &Network, fanouts: &HashSet<usize>, inputs: &HashSet<usize>) -> Vec<usize> {
    let reachable_from_fanouts = successors(net, fanouts);
    let can_reach_inputs = predecessors(net, inputs);
    let mut inner: Vec<usize> = reachable_from_fanouts
        .intersection(&can_reach_inputs)
        .copied()
        .filter(|id| !fanouts.contains(id) && !inputs.contains(id))
        .collect();
    inner.sort_unstable();
    inner
}

fn k_hop_neighbors(net: &Network, id: usize, k: usize) -> HashSet<usize> {
    let mut visited: HashSet<usize> = HashSet::new();
    visited.insert(id);
    let mut frontier = vec![id];
    for _ in 0..k {
        let mut next = Vec::new();
        for &n in &frontier {
            for &(fi, _) in net.fanins(n) {
                if visited.insert(fi) {
                    next.push(fi);
                }
            }
            for &(fo, _) in net.fanouts(n) {
                if visited.insert(fo) {
                    next.push(fo);
                }
            }
        }
        frontier = next;
    }
    visited.remove(&id);
    visited
}

fn boundary(net: &Network, nodes: &HashSet<usize>) -> (HashSet<usize>, HashSet<usize>) {
    let mut inputs = HashSet::new();
    let mut outputs = HashSet::new();
    for &id in nodes {
        for &(fi, _) in net.fanins(id) {
            if !nodes.contains(&fi) {
                inputs.insert(fi);
            }
        }
        let has_external_consumer = net.fanouts(id).iter().any(|&(fo, _)| !nodes.contains(&fo)) || net.is_po_driver(id);
        if has_external_consumer {
            outputs.insert(id);
        }
    }
    (inputs, outputs)
}

impl Partitioner {
    pub fn new(k: usize, exclude_loops: bool) -> Self {
        Partitioner { k, exclude_loops, next_token: 0, windows: HashMap::new() }
    }

    /// Extract a window around `seed`. Returns the sub-network plus a
    /// token to hand back to `insert` once the window is done with.
    pub fn extract(&mut self, net: &Network, seed: usize) -> (Network, WindowToken) {
        let mut nodes: HashSet<usize> = k_hop_neighbors(net, seed, self.k);
        nodes.insert(seed);

        let (mut inputs, mut outputs) = boundary(net, &nodes);

        if !self.exclude_loops {
            loop {
                let mut fanouts_outside: HashSet<usize> = HashSet::new();
                for &id in &outputs {
                    for &(fo, _) in net.fanouts(id) {
                        if !nodes.contains(&fo) {
                            fanouts_outside.insert(fo);
                        }
                    }
                }
                let inners = get_inners(net, &fanouts_outside, &inputs);
                if inners.is_empty() {
                    break;
                }
                nodes.extend(inners);
                let (new_inputs, new_outputs) = boundary(net, &nodes);
                inputs = new_inputs;
                outputs = new_outputs;
            }
        } else {
            let candidates: Vec<usize> = outputs.iter().copied().collect();
            for id in candidates {
                if !nodes.contains(&id) {
                    continue;
                }
                let mut fanouts_outside: HashSet<usize> = HashSet::new();
                for &(fo, _) in net.fanouts(id) {
                    if !nodes.contains(&fo) {
                        fanouts_outside.insert(fo);
                    }
                }
                let reaches_inputs = !successors(net, &fanouts_outside).is_disjoint(&inputs);
                if reaches_inputs {
                    nodes.remove(&id);
                    let tfi_in_window: HashSet<usize> = predecessors(net, &HashSet::from([id]))
                        .into_iter()
                        .filter(|n| nodes.contains(n))
                        .collect();
                    for n in tfi_in_window {
                        nodes.remove(&n);
                    }
                }
            }
            let (new_inputs, new_outputs) = boundary(net, &nodes);
            inputs = new_inputs;
            outputs = new_outputs;
        }

        let mut sorted_inputs: Vec<usize> = inputs.into_iter().collect();
        sorted_inputs.sort_unstable();
        let mut sorted_outputs: Vec<usize> = outputs.into_iter().collect();
        sorted_outputs.sort_unstable();

        let (sub_net, sub_pi_origins) = self.build_subnet(net, &nodes, &sorted_inputs, &sorted_outputs);

        let token = self.next_token;
        self.next_token += 1;
        self.windows.insert(token, (sub_pi_origins, sorted_outputs));
        (sub_net, token)
    }

    /// Build the standalone sub-network. A sub-PI is allocated for
    /// every boundary `input` *and* for every PrimaryInput of `net`
    /// that itself lies inside `nodes` (an interior PI the window
    /// swallowed whole, e.g. a 0-hop window around it never shows up
    /// as a fanin crossing the boundary). Returns the sub-network
    /// alongside the original node id each sub-PI was allocated for,
    /// in exactly the order `sub.pis()` lists them, so `insert` can
    /// zip the two back together positionally.
    fn build_subnet(
        &self,
        net: &Network,
        nodes: &HashSet<usize>,
        inputs: &[usize],
        outputs: &[usize],
    ) -> (Network, Vec<usize>) {
        let mut sub = Network::new();
        let mut map: HashMap<usize, usize> = HashMap::new();
        let mut pi_origins: Vec<usize> = Vec::new();
        map.insert(net.const0_id(), sub.const0_id());
        for &orig_pi in inputs {
            map.insert(orig_pi, sub.add_pi());
            pi_origins.push(orig_pi);
        }
        let order = net.topo_order();
        for id in order {
            if !nodes.contains(&id) || map.contains_key(&id) {
                continue;
            }
            if net.is_pi(id) {
                map.insert(id, sub.add_pi());
                pi_origins.push(id);
                continue;
            }
            if !net.is_and(id) {
                continue;
            }
            let fanins: Vec<(usize, bool)> = net
                .fanins(id)
                .iter()
                .map(|&(fi, c)| (*map.get(&fi).expect("window boundary missing a mapped fanin"), c))
                .collect();
            let new_id = sub.add_and(fanins);
            map.insert(id, new_id);
        }
        for &out in outputs {
            let sub_id = *map.get(&out).expect("window output missing from extracted nodes");
            sub.add_po(sub_id, false);
        }
        (sub, pi_origins)
    }

    /// Splice `sub_net` back into `net`, rewiring every window output
    /// onto the driver it now maps to and sweeping the superseded
    /// window internals.
    pub fn insert(&mut self, net: &mut Network, token: WindowToken, sub_net: &Network) {
        let (orig_inputs, orig_outputs) = self.windows.remove(&token).expect("unknown window token");

        let mut sub_to_orig: HashMap<usize, usize> = HashMap::new();
        sub_to_orig.insert(sub_net.const0_id(), net.const0_id());
        for (i, &sub_pi) in sub_net.pis().iter().enumerate() {
            sub_to_orig.insert(sub_pi, orig_inputs[i]);
        }

        let mut order = Vec::new();
        sub_net.for_each_int(|id| order.push(id));
        for id in order {
            if sub_to_orig.contains_key(&id) {
                continue;
            }
            let fanins: Vec<(usize, bool)> = sub_net
                .fanins(id)
                .iter()
                .map(|&(fi, c)| (*sub_to_orig.get(&fi).expect("unresolved sub-network fanin"), c))
                .collect();
            debug_assert!(fanins.len() >= 2, "optimized sub-network violates the And-node fanin invariant");
            let new_id = net.add_and(fanins);
            sub_to_orig.insert(id, new_id);
        }

        for (i, &orig_out) in orig_outputs.iter().enumerate() {
            let (sub_driver, sub_c) = sub_net.get_fanin(sub_net.pos()[i], 0);
            let new_src = *sub_to_orig.get(&sub_driver).expect("PO driver missing from rebuilt window");
            net.rewire_consumers(orig_out, new_src, sub_c);
        }
        net.insert_window(&orig_outputs);
        net.sweep(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_network() -> (Network, usize) {
        let mut net = Network::new();
        let a = net.add_pi();
        let b = net.add_pi();
        let c = net.add_pi();
        let u1 = net.add_and(vec![(a, false), (b, false)]);
        let u2 = net.add_and(vec![(u1, false), (c, false)]);
        let _p = net.add_po(u2, false);
        (net, u2)
    }

    #[test]
    fn extract_captures_a_neighborhood_and_round_trips() {
        let (mut net, u2) = chain_network();
        let mut part = Partitioner::new(2, false);
        let (sub, token) = part.extract(&net, u2);
        assert!(sub.num_pos() >= 1);
        part.insert(&mut net, token, &sub);
        assert_eq!(net.num_pos(), 1);
    }

    #[test]
    fn k_hop_neighbors_excludes_center() {
        let (net, u2) = chain_network();
        let neighbors = k_hop_neighbors(&net, u2, 1);
        assert!(!neighbors.contains(&u2));
    }
}
