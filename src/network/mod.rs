//! The mutable And-Inverter Network: dense-id node storage, fanin/
//! fanout edge lists, the checkpoint stack, and the Action broadcast
//! bus (SPEC_FULL.md §3, §4.1).
//!
//! The id-stable fanin/fanout-edge-list-with-callback-broadcast model
//! is this crate's own reconstruction of the contract every Analyzer
//! in `examples/original_source/` assumes (no single original-source
//! network header was present in the retrieval pack); the concrete
//! struct-of-vectors / sweep / topological-order coding style is
//! grounded on `examples/other_examples/...quaigh__src-network-network.rs`.

mod node;

pub use node::NodeData;

use crate::types::{Action, ActionKind};
use std::collections::{HashSet, VecDeque};

#[derive(Clone)]
struct Checkpoint {
    nodes: Vec<Option<NodeData>>,
    pis: Vec<usize>,
    pos: Vec<usize>,
}

/// The And-Inverter Network. Id 0 is always the constant-zero node
/// (I4). All other nodes are allocated by `add_pi`/`add_and`/`add_po`
/// or by `trivial_decompose`.
pub struct Network {
    nodes: Vec<Option<NodeData>>,
    pis: Vec<usize>,
    pos: Vec<usize>,
    callbacks: Vec<Option<Box<dyn FnMut(&Action)>>>,
    checkpoints: Vec<Checkpoint>,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    pub fn new() -> Self {
        let mut net = Network {
            nodes: Vec::new(),
            pis: Vec::new(),
            pos: Vec::new(),
            callbacks: Vec::new(),
            checkpoints: Vec::new(),
        };
        net.nodes
            .push(Some(NodeData::new(crate::types::NodeType::Const0)));
        net
    }

    fn node(&self, id: usize) -> &NodeData {
        self.nodes[id].as_ref().expect("use of a swept/destroyed node")
    }

    fn node_mut(&mut self, id: usize) -> &mut NodeData {
        self.nodes[id]
            .as_mut()
            .expect("use of a swept/destroyed node")
    }

    // ---- construction (quiet: no broadcast, per SPEC_FULL.md §3 Lifecycle) ----

    pub fn const0_id(&self) -> usize {
        0
    }

    pub fn add_pi(&mut self) -> usize {
        let id = self.nodes.len();
        self.nodes
            .push(Some(NodeData::new(crate::types::NodeType::PrimaryInput)));
        self.pis.push(id);
        id
    }

    /// Construct a new And node with the given fanins. Must have at
    /// least two fanins (I2); building a would-be buffer/constant
    /// directly is a caller error — go through `propagate` instead.
    pub fn add_and(&mut self, fanins: Vec<(usize, bool)>) -> usize {
        assert!(fanins.len() >= 2, "an And node needs at least 2 fanins (I2)");
        let id = self.nodes.len();
        self.nodes
            .push(Some(NodeData::new(crate::types::NodeType::And)));
        self.node_mut(id).fanins = fanins;
        self.rebuild_fanouts_for(id);
        id
    }

    pub fn add_po(&mut self, fanin: usize, complement: bool) -> usize {
        let id = self.nodes.len();
        self.nodes
            .push(Some(NodeData::new(crate::types::NodeType::PrimaryOutput)));
        self.node_mut(id).fanins.push((fanin, complement));
        self.rebuild_fanouts_for(id);
        self.pos.push(id);
        id
    }

    // ---- structural queries ----

    pub fn num_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_pis(&self) -> usize {
        self.pis.len()
    }

    pub fn num_pos(&self) -> usize {
        self.pos.len()
    }

    pub fn pis(&self) -> &[usize] {
        &self.pis
    }

    pub fn pos(&self) -> &[usize] {
        &self.pos
    }

    pub fn exists(&self, id: usize) -> bool {
        id < self.nodes.len() && self.nodes[id].is_some()
    }

    pub fn num_fanins(&self, id: usize) -> usize {
        self.node(id).fanins.len()
    }

    pub fn num_fanouts(&self, id: usize) -> usize {
        self.node(id).fanouts.len()
    }

    pub fn get_fanin(&self, id: usize, idx: usize) -> (usize, bool) {
        self.node(id).fanins[idx]
    }

    pub fn fanins(&self, id: usize) -> &[(usize, bool)] {
        &self.node(id).fanins
    }

    pub fn fanouts(&self, id: usize) -> &[(usize, usize)] {
        &self.node(id).fanouts
    }

    pub fn get_node_type(&self, id: usize) -> crate::types::NodeType {
        self.node(id).ntype
    }

    pub fn is_pi(&self, id: usize) -> bool {
        self.node(id).ntype == crate::types::NodeType::PrimaryInput
    }

    pub fn is_po(&self, id: usize) -> bool {
        self.node(id).ntype == crate::types::NodeType::PrimaryOutput
    }

    pub fn is_and(&self, id: usize) -> bool {
        self.node(id).ntype == crate::types::NodeType::And
    }

    /// True iff `id` feeds at least one PrimaryOutput directly.
    pub fn is_po_driver(&self, id: usize) -> bool {
        self.node(id)
            .fanouts
            .iter()
            .any(|&(cons, _)| self.is_po(cons))
    }

    pub fn is_reachable(&self, source: usize, target: usize) -> bool {
        if source == target {
            return true;
        }
        self.tfo_ids(&[source]).contains(&target)
    }

    // ---- fanout bookkeeping ----

    /// Remove every fanout back-reference that `id`'s *current* fanin
    /// list would register, i.e. undo `rebuild_fanouts_for(id)`. Call
    /// before mutating `id`'s fanin vector.
    fn clear_fanouts_for(&mut self, id: usize) {
        let fanins = self.node(id).fanins.clone();
        for (idx, (src, _)) in fanins.into_iter().enumerate() {
            if let Some(nd) = &mut self.nodes[src] {
                if let Some(pos) = nd
                    .fanouts
                    .iter()
                    .position(|&(cons, i)| cons == id && i == idx)
                {
                    nd.fanouts.remove(pos);
                }
            }
        }
    }

    /// Register a fanout back-reference for every edge currently in
    /// `id`'s fanin list. Call after mutating `id`'s fanin vector.
    fn rebuild_fanouts_for(&mut self, id: usize) {
        let fanins = self.node(id).fanins.clone();
        for (idx, (src, _)) in fanins.into_iter().enumerate() {
            self.node_mut(src).fanouts.push((id, idx));
        }
    }

    // ---- broadcast ----

    /// Subscribe a callback; returns a handle usable with `delete_callback`.
    pub fn add_callback(&mut self, cb: Box<dyn FnMut(&Action)>) -> usize {
        self.callbacks.push(Some(cb));
        self.callbacks.len() - 1
    }

    pub fn delete_callback(&mut self, handle: usize) {
        if handle < self.callbacks.len() {
            self.callbacks[handle] = None;
        }
    }

    fn broadcast(&mut self, action: &Action) {
        for cb in self.callbacks.iter_mut().flatten() {
            cb(action);
        }
    }

    // ---- mutation ----

    pub fn add_fanin(&mut self, id: usize, fi: usize, complement: bool) {
        self.clear_fanouts_for(id);
        self.node_mut(id).fanins.push((fi, complement));
        self.rebuild_fanouts_for(id);
        let idx = self.node(id).fanins.len() - 1;
        let action = Action::new(ActionKind::AddFanin)
            .with_id(id)
            .with_idx(idx)
            .with_fi(fi, complement);
        self.broadcast(&action);
    }

    pub fn remove_fanin(&mut self, id: usize, idx: usize) {
        self.clear_fanouts_for(id);
        let (fi, complement) = self.node_mut(id).fanins.remove(idx);
        self.rebuild_fanouts_for(id);
        let action = Action::new(ActionKind::RemoveFanin)
            .with_id(id)
            .with_idx(idx)
            .with_fi(fi, complement);
        self.broadcast(&action);
    }

    pub fn sort_fanins(&mut self, id: usize) {
        self.clear_fanouts_for(id);
        self.node_mut(id).fanins.sort_by_key(|&(src, c)| (src, c));
        self.rebuild_fanouts_for(id);
        self.broadcast(&Action::new(ActionKind::SortFanins).with_id(id));
    }

    /// Collapse a node whose effective fanin count is <= 1 into a
    /// buffer (1 fanin) or a constant propagation (0 fanins), rewiring
    /// every consumer directly onto the replacement.
    pub fn propagate(&mut self, id: usize) {
        let fanins = self.node(id).fanins.clone();
        match fanins.len() {
            0 => {
                self.replace_node_with(id, 0, false);
                self.broadcast(&Action::new(ActionKind::RemoveConst).with_id(id));
            }
            1 => {
                let (src, c) = fanins[0];
                self.replace_node_with(id, src, c);
                self.broadcast(
                    &Action::new(ActionKind::RemoveBuffer)
                        .with_id(id)
                        .with_fi(src, c),
                );
            }
            _ => {}
        }
    }

    fn replace_node_with(&mut self, id: usize, new_src: usize, new_c: bool) {
        let fanouts = self.node(id).fanouts.clone();
        for &(cons, idx) in &fanouts {
            let (_, old_c) = self.node(cons).fanins[idx];
            self.node_mut(cons).fanins[idx] = (new_src, old_c ^ new_c);
        }
        self.node_mut(id).fanouts.clear();
        for (cons, idx) in fanouts {
            self.node_mut(new_src).fanouts.push((cons, idx));
        }
    }

    /// Remove every node unreachable from any PrimaryOutput (I6).
    pub fn sweep(&mut self, _strict: bool) {
        let mut stack: Vec<usize> = (1..self.nodes.len())
            .filter(|&id| self.nodes[id].is_some() && !self.node(id).is_live())
            .collect();
        let mut removed = Vec::new();
        while let Some(id) = stack.pop() {
            if self.nodes[id].is_none() || self.node(id).is_live() {
                continue;
            }
            let fanins = self.node(id).fanins.clone();
            for (src, _) in &fanins {
                if let Some(nd) = &mut self.nodes[*src] {
                    nd.fanouts.retain(|&(cons, _)| cons != id);
                }
            }
            self.nodes[id] = None;
            removed.push(id);
            for (src, _) in fanins {
                if self.nodes[src].is_some() && !self.node(src).is_live() {
                    stack.push(src);
                }
            }
        }
        if !removed.is_empty() {
            removed.sort_unstable();
            self.broadcast(&Action::new(ActionKind::RemoveUnused).with_indices(removed));
        }
    }

    /// Merge an And into its single-fanout And parent, when the edge
    /// between them is uncomplemented (so flattening preserves the
    /// conjunction).
    pub fn trivial_collapse(&mut self, id: usize) -> bool {
        if !self.is_and(id) || self.node(id).fanouts.len() != 1 {
            return false;
        }
        let (cons, idx) = self.node(id).fanouts[0];
        if !self.is_and(cons) {
            return false;
        }
        let (_, edge_c) = self.node(cons).fanins[idx];
        if edge_c {
            return false;
        }
        let child_fanins = self.node(id).fanins.clone();
        self.clear_fanouts_for(cons);
        self.node_mut(cons).fanins.remove(idx);
        self.node_mut(cons).fanins.extend(child_fanins.iter().copied());
        self.rebuild_fanouts_for(cons);
        self.node_mut(id).fanouts.clear();
        let action = Action::new(ActionKind::TrivialCollapse)
            .with_id(cons)
            .with_fi(id, false)
            .with_fanins(child_fanins);
        self.broadcast(&action);
        true
    }

    /// Split the first `k` fanins of `id` off into a fresh And node,
    /// leaving that node as `id`'s new fanin 0. Returns the new id.
    pub fn trivial_decompose(&mut self, id: usize, k: usize) -> usize {
        let fanins = self.node(id).fanins.clone();
        assert!(k >= 2 && k < fanins.len(), "decompose prefix out of range");
        let split: Vec<(usize, bool)> = fanins[..k].to_vec();
        let rest: Vec<(usize, bool)> = fanins[k..].to_vec();

        let new_id = self.nodes.len();
        self.nodes
            .push(Some(NodeData::new(crate::types::NodeType::And)));
        self.node_mut(new_id).fanins = split.clone();
        self.rebuild_fanouts_for(new_id);

        self.clear_fanouts_for(id);
        let mut new_fanins = Vec::with_capacity(1 + rest.len());
        new_fanins.push((new_id, false));
        new_fanins.extend(rest);
        self.node_mut(id).fanins = new_fanins;
        self.rebuild_fanouts_for(id);

        let action = Action::new(ActionKind::TrivialDecompose)
            .with_id(id)
            .with_fi(new_id, false)
            .with_fanins(split);
        self.broadcast(&action);
        new_id
    }

    // ---- checkpoints ----

    pub fn save(&mut self) -> usize {
        let slot = self.checkpoints.len();
        self.checkpoints.push(Checkpoint {
            nodes: self.nodes.clone(),
            pis: self.pis.clone(),
            pos: self.pos.clone(),
        });
        self.broadcast(&Action::new(ActionKind::Save).with_id(slot));
        slot
    }

    pub fn load(&mut self, slot: usize) {
        let cp = self.checkpoints[slot].clone();
        self.nodes = cp.nodes;
        self.pis = cp.pis;
        self.pos = cp.pos;
        self.broadcast(&Action::new(ActionKind::Load).with_id(slot));
    }

    /// Drop the most-recently-saved checkpoint.
    pub fn pop_back(&mut self) {
        self.checkpoints.pop();
        self.broadcast(&Action::new(ActionKind::PopBack));
    }

    pub fn num_checkpoints(&self) -> usize {
        self.checkpoints.len()
    }

    /// Overwrite an already-allocated checkpoint slot with the current
    /// state, used by the Optimizer's greedy accept step (`Save(slot)`
    /// in `rrrOptimizer.h`, as opposed to `save`'s always-append form).
    pub fn save_into(&mut self, slot: usize) {
        self.checkpoints[slot] = Checkpoint {
            nodes: self.nodes.clone(),
            pis: self.pis.clone(),
            pos: self.pos.clone(),
        };
        self.broadcast(&Action::new(ActionKind::Save).with_id(slot));
    }

    // ---- traversal ----

    /// Full topological order over every live node (PIs, internal
    /// Ands, POs, and const0), ties broken by ascending id.
    pub fn topo_order(&self) -> Vec<usize> {
        let n = self.nodes.len();
        let mut indeg = vec![0usize; n];
        for (id, slot) in self.nodes.iter().enumerate() {
            if let Some(nd) = slot {
                indeg[id] = nd.fanins.len();
            }
        }
        let mut ready: std::collections::BinaryHeap<std::cmp::Reverse<usize>> =
            std::collections::BinaryHeap::new();
        for (id, slot) in self.nodes.iter().enumerate() {
            if slot.is_some() && indeg[id] == 0 {
                ready.push(std::cmp::Reverse(id));
            }
        }
        let mut order = Vec::with_capacity(n);
        while let Some(std::cmp::Reverse(id)) = ready.pop() {
            order.push(id);
            let fanouts = self.node(id).fanouts.clone();
            for (cons, _idx) in fanouts {
                indeg[cons] -= 1;
                if indeg[cons] == 0 {
                    ready.push(std::cmp::Reverse(cons));
                }
            }
        }
        order
    }

    /// Topological order restricted to internal And nodes (excludes
    /// PI/PO/const0).
    pub fn for_each_int<F: FnMut(usize)>(&self, mut f: F) {
        for id in self.topo_order() {
            if self.is_and(id) {
                f(id);
            }
        }
    }

    pub fn for_each_int_reverse<F: FnMut(usize)>(&self, mut f: F) {
        let mut order: Vec<usize> = self.topo_order().into_iter().filter(|&id| self.is_and(id)).collect();
        order.reverse();
        for id in order {
            f(id);
        }
    }

    fn tfo_ids(&self, seeds: &[usize]) -> HashSet<usize> {
        let mut visited: HashSet<usize> = HashSet::new();
        let mut queue: VecDeque<usize> = seeds.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            for &(cons, _) in self.node(id).fanouts.iter() {
                if !visited.contains(&cons) {
                    queue.push_back(cons);
                }
            }
        }
        visited
    }

    fn tfi_ids(&self, seeds: &[usize]) -> HashSet<usize> {
        let mut visited: HashSet<usize> = HashSet::new();
        let mut queue: VecDeque<usize> = seeds.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            for &(src, _) in self.node(id).fanins.iter() {
                if !visited.contains(&src) {
                    queue.push_back(src);
                }
            }
        }
        visited
    }

    /// Transitive fanout cone of `id`, topological order, excluding
    /// `id` itself unless `include_self`.
    pub fn for_each_tfo<F: FnMut(usize)>(&self, id: usize, include_self: bool, mut f: F) {
        let set = self.tfo_ids(&[id]);
        for n in self.topo_order() {
            if set.contains(&n) && (include_self || n != id) {
                f(n);
            }
        }
    }

    /// Transitive fanin cone of `id`, topological order, including `id`.
    pub fn for_each_tfi<F: FnMut(usize)>(&self, id: usize, mut f: F) {
        let set = self.tfi_ids(&[id]);
        for n in self.topo_order() {
            if set.contains(&n) {
                f(n);
            }
        }
    }

    /// Visit the union of TFO cones of `seeds` in topological order,
    /// calling `changed(id)` only for a seed or a node with at least
    /// one fanin already marked changed; nodes whose predecessors
    /// never changed are skipped entirely.
    pub fn for_each_tfo_update<F: FnMut(usize) -> bool>(&self, seeds: &[usize], mut changed: F) {
        let tfo_set = self.tfo_ids(seeds);
        let seed_set: HashSet<usize> = seeds.iter().copied().collect();
        let mut changed_set: HashSet<usize> = HashSet::new();
        for id in self.topo_order() {
            if !tfo_set.contains(&id) {
                continue;
            }
            let fanin_changed = self
                .node(id)
                .fanins
                .iter()
                .any(|&(src, _)| changed_set.contains(&src));
            if seed_set.contains(&id) || fanin_changed {
                if changed(id) {
                    changed_set.insert(id);
                }
            }
        }
    }

    /// Splice a disjoint set of nodes built by a `Partitioner` window
    /// back into this network, firing one INSERT action.
    pub fn insert_window(&mut self, window_ids: &[usize]) {
        self.broadcast(&Action::new(ActionKind::Insert).with_indices(window_ids.to_vec()));
    }

    /// Re-load the network's entire content (used when refreshing an
    /// already-subscribed network from a freshly parsed AIGER file),
    /// firing a single READ action rather than per-node mutations.
    pub fn mark_read(&mut self) {
        self.broadcast(&Action::new(ActionKind::Read));
    }

    /// The (source id, complement) driving each PrimaryOutput, in PO order.
    pub fn po_drivers(&self) -> Vec<(usize, bool)> {
        self.pos.iter().map(|&po| self.get_fanin(po, 0)).collect()
    }

    /// Copy just the structural state (nodes, PIs, POs) into a fresh
    /// `Network` with no subscribers and no checkpoints. Used by the
    /// Scheduler to hand each worker a private copy (§5: Network is
    /// not `Sync`, so sharing one across threads is never attempted)
    /// and by the Partitioner when it needs a scratch copy to probe
    /// reachability without disturbing the live network.
    pub fn structural_clone(&self) -> Network {
        Network {
            nodes: self.nodes.clone(),
            pis: self.pis.clone(),
            pos: self.pos.clone(),
            callbacks: Vec::new(),
            checkpoints: Vec::new(),
        }
    }

    /// Redirect every current consumer of `id` onto `(new_src, new_c)`,
    /// the same rewiring `propagate` does for a collapsed node, exposed
    /// for the Partitioner's `Insert` step. Does not itself sweep `id`;
    /// callers run `sweep` afterward once every output has been rewired.
    pub fn rewire_consumers(&mut self, id: usize, new_src: usize, new_c: bool) {
        self.replace_node_with(id, new_src, new_c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_input_and(net: &mut Network) -> (usize, usize, usize, usize) {
        let a = net.add_pi();
        let b = net.add_pi();
        let t = net.add_and(vec![(a, false), (b, false)]);
        let p = net.add_po(t, false);
        (a, b, t, p)
    }

    #[test]
    fn basic_construction_invariants() {
        let mut net = Network::new();
        let (a, b, t, p) = two_input_and(&mut net);
        assert_eq!(net.const0_id(), 0);
        assert_eq!(net.num_pis(), 2);
        assert_eq!(net.num_pos(), 1);
        assert_eq!(net.num_fanins(t), 2);
        assert_eq!(net.get_fanin(t, 0), (a, false));
        assert_eq!(net.get_fanin(t, 1), (b, false));
        assert!(net.is_po(p));
        assert!(net.is_po_driver(t));
        assert_eq!(net.num_fanouts(a), 1);
        assert_eq!(net.num_fanouts(b), 1);
    }

    #[test]
    fn remove_fanin_fixes_fanout_back_references() {
        let mut net = Network::new();
        let a = net.add_pi();
        let b = net.add_pi();
        let c = net.add_pi();
        let t = net.add_and(vec![(a, false), (b, false), (c, false)]);
        net.remove_fanin(t, 1); // drop b
        assert_eq!(net.num_fanins(t), 2);
        assert_eq!(net.get_fanin(t, 0), (a, false));
        assert_eq!(net.get_fanin(t, 1), (c, false));
        assert_eq!(net.num_fanouts(b), 0);
        // c's fanout back-reference must now point at idx 1, not 2
        assert_eq!(net.fanouts(c), &[(t, 1)]);
    }

    #[test]
    fn propagate_buffer_rewires_consumers() {
        let mut net = Network::new();
        let a = net.add_pi();
        let b = net.add_pi();
        let c = net.add_pi();
        let u = net.add_and(vec![(a, false), (b, false)]);
        let t = net.add_and(vec![(u, false), (c, false)]);
        let _p = net.add_po(t, false);
        net.remove_fanin(t, 1); // t now has 1 fanin: u
        net.propagate(t);
        // t is now dead (rewired away); its PO driver is now u
        assert_eq!(net.num_fanouts(t), 0);
        assert!(net.is_po_driver(u));
    }

    #[test]
    fn sweep_removes_unreachable_nodes() {
        let mut net = Network::new();
        let a = net.add_pi();
        let b = net.add_pi();
        let t = net.add_and(vec![(a, false), (b, false)]);
        let _p = net.add_po(t, false);
        let dead = net.add_and(vec![(a, false), (b, false)]); // never used by a PO
        assert!(net.exists(dead));
        net.sweep(false);
        assert!(!net.exists(dead));
        assert!(net.exists(t));
    }

    #[test]
    fn save_load_round_trips_state() {
        let mut net = Network::new();
        let (a, b, t, _p) = two_input_and(&mut net);
        let slot = net.save();
        net.add_fanin(t, a, true);
        assert_eq!(net.num_fanins(t), 3);
        net.load(slot);
        assert_eq!(net.num_fanins(t), 2);
        assert_eq!(net.get_fanin(t, 0), (a, false));
        assert_eq!(net.get_fanin(t, 1), (b, false));
    }

    #[test]
    fn topo_order_respects_dependencies() {
        let mut net = Network::new();
        let (_a, _b, t, p) = two_input_and(&mut net);
        let order = net.topo_order();
        let pos_t = order.iter().position(|&x| x == t).unwrap();
        let pos_p = order.iter().position(|&x| x == p).unwrap();
        assert!(pos_t < pos_p);
    }

    #[test]
    fn trivial_decompose_splits_prefix() {
        let mut net = Network::new();
        let a = net.add_pi();
        let b = net.add_pi();
        let c = net.add_pi();
        let d = net.add_pi();
        let t = net.add_and(vec![(a, false), (b, false), (c, false), (d, false)]);
        let new_id = net.trivial_decompose(t, 2);
        assert_eq!(net.num_fanins(t), 2);
        assert_eq!(net.get_fanin(t, 0), (new_id, false));
        assert_eq!(net.num_fanins(new_id), 2);
    }
}
