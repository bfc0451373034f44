//! SAT-based miter Analyzer (SPEC_FULL.md §4.5). Grounded on
//! `examples/original_source/src/rrrSatSolver.h` (read in full):
//! `EncodeNode`/`EncodeMiter`, the `ActionCallback` reset rules, and
//! the reverse-justification counter-example walk in `GetCex`, ported
//! against the crate's own `SatSolver` trait (§6a) instead of the
//! source's direct `sat_solver_*` C calls. The mutable state lives
//! behind `Rc<RefCell<..>>` (the same shape `Simulator` and
//! `BddAnalyzer` use) so `assign_network` can register its own Action
//! callback instead of relying on callers to wire one up separately.

use super::Analyzer;
use crate::network::Network;
use crate::sat_solver::{Lit, SatSolver, Var};
use crate::types::{Action, ActionKind, SatResult, VarValue};
use std::cell::RefCell;
use std::rc::Rc;

/// A counter-example: a partial assignment over PrimaryInput ids,
/// handed to the Simulator (§4.3 "Counter-example ingestion").
pub type Cex = Vec<(usize, bool)>;

struct MiterState {
    /// Network node id -> SAT variable in the "primary copy". Sized to
    /// `net.capacity()`; the inverted copy gets fresh variables stored
    /// in `inverted`.
    vars: Vec<Var>,
    inverted: std::collections::HashMap<usize, Var>,
    /// `false` iff the miter was trivially UNSAT (target has no
    /// PrimaryOutput-observable effect at all — an empty XOR set).
    status: bool,
}

struct State<S> {
    solver: S,
    conflict_limit: usize,
    target: Option<usize>,
    fupdate: bool,
    miter: Option<MiterState>,
    last_values: Vec<VarValue>,
}

impl<S: SatSolver> State<S> {
    fn encode_node(&mut self, net: &Network, vars: &mut Vec<Var>, id: usize, to_negate: Option<usize>) {
        let fanins = net.fanins(id);
        let lit_for = |vars: &Vec<Var>, src: usize, c: bool| -> Lit { (vars[src], c ^ (Some(src) == to_negate)) };
        let mut acc: Option<Lit> = None;
        for &(src, c) in fanins {
            let lit = lit_for(vars, src, c);
            acc = Some(match acc {
                None => lit,
                Some(prev) => {
                    let z = self.solver.add_var();
                    if vars.len() <= z {
                        vars.resize(z + 1, 0);
                    }
                    self.solver.add_and(z, &[prev, lit]);
                    (z, false)
                }
            });
        }
        match acc {
            None => self.solver.add_const(vars[id], false),
            Some((v, neg)) => self.solver.add_buffer(vars[id], (v, neg)),
        }
    }

    /// Build the combinational miter for `target` from scratch: a
    /// "primary copy" of every internal node plus an "inverted copy"
    /// of `target`'s transitive fanout in which `target` is negated,
    /// XORed pairwise against the original PrimaryOutput drivers and
    /// ORed into one clause (§4.5).
    fn encode_miter(&mut self, net: &Network, target: usize) -> MiterState {
        self.solver.reset();
        let n = net.capacity();
        self.solver.set_num_vars(n);
        let mut vars: Vec<Var> = (0..n).collect();
        self.solver.add_const(vars[net.const0_id()], false);
        net.for_each_int(|id| self.encode_node(net, &mut vars, id, None));

        if net.is_po_driver(target) {
            return MiterState { vars, inverted: std::collections::HashMap::new(), status: true };
        }

        let original: Vec<Var> = net.po_drivers().iter().map(|&(fi, _)| vars[fi]).collect();

        let mut inverted = std::collections::HashMap::new();
        net.for_each_tfo(target, false, |fo| {
            let v = self.solver.add_var();
            if vars.len() <= v {
                vars.resize(v + 1, 0);
            }
            inverted.insert(fo, v);
            let saved = vars[fo];
            vars[fo] = v;
            self.encode_node(net, &mut vars, fo, Some(target));
            vars[fo] = saved;
        });

        let mut xor_lits: Vec<Lit> = Vec::new();
        for (idx, &(fi, _)) in net.po_drivers().iter().enumerate() {
            let inverted_var = *inverted.get(&fi).unwrap_or(&vars[fi]);
            if inverted_var != original[idx] {
                let x = self.solver.add_var();
                self.solver.add_xor(x, (inverted_var, false), (original[idx], false));
                xor_lits.push((x, false));
            }
        }
        if xor_lits.is_empty() {
            return MiterState { vars, inverted, status: false };
        }
        self.solver.add_clause(&xor_lits);
        MiterState { vars, inverted, status: true }
    }

    fn set_target(&mut self, net: &Network, id: usize) {
        if !self.fupdate && self.target == Some(id) {
            return;
        }
        self.fupdate = false;
        self.target = Some(id);
        self.miter = Some(self.encode_miter(net, id));
    }

    fn action_callback(&mut self, action: &Action) {
        let Some(target) = self.target else { return };
        match action.kind {
            ActionKind::RemoveFanin | ActionKind::AddFanin => {
                if action.id != Some(target) {
                    self.fupdate = true;
                }
            }
            ActionKind::RemoveBuffer | ActionKind::RemoveConst => {
                if action.id == Some(target) {
                    self.target = None;
                }
            }
            ActionKind::TrivialDecompose => self.fupdate = true,
            ActionKind::Load => self.target = None,
            ActionKind::Save
            | ActionKind::RemoveUnused
            | ActionKind::TrivialCollapse
            | ActionKind::SortFanins
            | ActionKind::Read
            | ActionKind::PopBack
            | ActionKind::Insert => {}
        }
    }

    /// Reverse-justification walk over the primary copy, matching
    /// `GetCex`: starting from the committed SAT model, walk internal
    /// nodes in reverse topological order and mark only the fanins
    /// actually required to justify each node's committed value,
    /// yielding a partial cube over PrimaryInputs.
    fn extract_cex(&self, net: &Network) -> Cex {
        let mut values = self.last_values.clone();
        net.for_each_int_reverse(|id| {
            match values[id] {
                VarValue::True => {
                    for &(fi, c) in net.fanins(id) {
                        values[fi] = values[fi].decide();
                        debug_assert!(matches!(values[fi], VarValue::True | VarValue::False));
                        let _ = c;
                    }
                }
                VarValue::False => {
                    let mut found = false;
                    for &(fi, c) in net.fanins(id) {
                        let is_forcing = if c { values[fi] == VarValue::True } else { values[fi] == VarValue::False };
                        if is_forcing {
                            found = true;
                            break;
                        }
                    }
                    if !found {
                        for &(fi, c) in net.fanins(id) {
                            let is_temp_forcing = if c {
                                values[fi] == VarValue::TempTrue
                            } else {
                                values[fi] == VarValue::TempFalse
                            };
                            if is_temp_forcing {
                                values[fi] = values[fi].decide();
                                break;
                            }
                        }
                    }
                }
                _ => {}
            }
        });
        net.pis()
            .iter()
            .filter_map(|&pi| match values[pi] {
                VarValue::True => Some((pi, true)),
                VarValue::False => Some((pi, false)),
                _ => None,
            })
            .collect()
    }

    fn collect_values(&mut self, net: &Network, vars: &[Var]) {
        self.last_values = vec![VarValue::Undef; net.capacity()];
        for &pi in net.pis() {
            self.last_values[pi] = if self.solver.var_value(vars[pi]) == Some(true) {
                VarValue::TempTrue
            } else {
                VarValue::TempFalse
            };
        }
        net.for_each_int(|id| {
            self.last_values[id] = if self.solver.var_value(vars[id]) == Some(true) {
                VarValue::TempTrue
            } else {
                VarValue::TempFalse
            };
        });
    }
}

/// SAT miter Analyzer, generic over the `SatSolver` backend (§6a).
pub struct SatAnalyzer<S> {
    state: Rc<RefCell<State<S>>>,
}

impl<S: SatSolver + Default> SatAnalyzer<S> {
    pub fn new(conflict_limit: usize) -> Self {
        SatAnalyzer {
            state: Rc::new(RefCell::new(State {
                solver: S::default(),
                conflict_limit,
                target: None,
                fupdate: false,
                miter: None,
                last_values: Vec::new(),
            })),
        }
    }
}

impl<S: SatSolver> Analyzer for SatAnalyzer<S> {
    fn assign_network(&mut self, net: &mut Network, reuse: bool) {
        if !reuse {
            let mut state = self.state.borrow_mut();
            state.target = None;
            state.fupdate = false;
            state.miter = None;
            state.last_values.clear();
        }
        let state = self.state.clone();
        net.add_callback(Box::new(move |action| {
            state.borrow_mut().action_callback(action);
        }));
    }

    fn check_redundancy(&mut self, net: &Network, id: usize, idx: usize) -> bool {
        let mut state = self.state.borrow_mut();
        state.set_target(net, id);
        let conflict_limit = state.conflict_limit;
        let miter = state.miter.as_ref().unwrap();
        if !miter.status {
            return true;
        }
        let vars = miter.vars.clone();
        let assumptions: Vec<Lit> = net
            .fanins(id)
            .iter()
            .enumerate()
            .map(|(i, &(fi, c))| (vars[fi], if i == idx { !c } else { c }))
            .collect();
        match state.solver.solve(&assumptions, conflict_limit) {
            SatResult::Unsat => true,
            SatResult::Sat => {
                state.collect_values(net, &vars);
                false
            }
            SatResult::Undef => false,
        }
    }

    fn check_feasibility(&mut self, net: &Network, id: usize, fi: usize, complement: bool) -> bool {
        let mut state = self.state.borrow_mut();
        state.set_target(net, id);
        let conflict_limit = state.conflict_limit;
        let miter = state.miter.as_ref().unwrap();
        if !miter.status {
            return true;
        }
        let vars = miter.vars.clone();
        let assumptions = [(vars[id], false), (vars[fi], !complement)];
        match state.solver.solve(&assumptions, conflict_limit) {
            SatResult::Unsat => true,
            SatResult::Sat => {
                state.collect_values(net, &vars);
                false
            }
            SatResult::Undef => false,
        }
    }
}

impl<S: SatSolver> SatAnalyzer<S> {
    /// The most recent SAT-producing query's counter-example, if any
    /// query since the last redundancy/feasibility check returned SAT.
    pub fn take_cex(&mut self, net: &Network) -> Option<Cex> {
        let state = self.state.borrow();
        if state.last_values.is_empty() {
            return None;
        }
        Some(state.extract_cex(net))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use crate::sat_solver::SimpleSatSolver;

    fn dominated_and() -> (Network, usize, usize) {
        let mut net = Network::new();
        let a = net.add_pi();
        let b = net.add_pi();
        let u = net.add_and(vec![(a, false), (b, false)]);
        let t = net.add_and(vec![(u, false), (b, false)]);
        let _p = net.add_po(t, false);
        (net, t, u)
    }

    #[test]
    fn redundant_fanin_is_unsat() {
        let (mut net, t, _u) = dominated_and();
        let mut analyzer = SatAnalyzer::<SimpleSatSolver>::new(0);
        analyzer.assign_network(&mut net, false);
        assert!(analyzer.check_redundancy(&net, t, 1));
    }

    #[test]
    fn non_redundant_fanin_is_sat() {
        let (mut net, t, _u) = dominated_and();
        let mut analyzer = SatAnalyzer::<SimpleSatSolver>::new(0);
        analyzer.assign_network(&mut net, false);
        assert!(!analyzer.check_redundancy(&net, t, 0));
    }

    #[test]
    fn action_callback_invalidates_target_on_unrelated_fanin_removal() {
        // t = u & b, u = a & b: fanin 0 (u) of t starts non-redundant.
        // Dropping a from u collapses u's function to b alone, so
        // t = u & b degenerates to b & b and fanin 0 becomes redundant.
        // If the callback never fired, the cached miter would still
        // report the stale (pre-mutation) answer.
        let (mut net, t, u) = dominated_and();
        let mut analyzer = SatAnalyzer::<SimpleSatSolver>::new(0);
        analyzer.assign_network(&mut net, false);
        assert!(!analyzer.check_redundancy(&net, t, 0));
        net.remove_fanin(u, 0);
        assert!(analyzer.check_redundancy(&net, t, 0));
    }
}
