//! The SAT library boundary (SPEC_FULL.md §6/§6a): a trait mirroring
//! the external service list the source's SAT Analyzer relies on,
//! plus a small reference DPLL solver. The miters this core builds
//! are always acyclic and modest in size, so a conflict-driven
//! learning solver isn't required for correctness.

use crate::types::SatResult;

/// A Tseitin-style CNF variable id, 0-based.
pub type Var = usize;
/// A literal: `(var, negated)`.
pub type Lit = (Var, bool);

/// External SAT solver services the Analyzer depends on (SPEC_FULL.md
/// §6's SAT list).
pub trait SatSolver {
    fn reset(&mut self);
    fn set_num_vars(&mut self, n: usize);
    fn add_var(&mut self) -> Var;
    /// `out = AND(inputs)` (each input may carry a complement flag).
    fn add_and(&mut self, out: Var, inputs: &[Lit]);
    fn add_buffer(&mut self, out: Var, input: Lit);
    fn add_const(&mut self, out: Var, value: bool);
    fn add_xor(&mut self, out: Var, a: Lit, b: Lit);
    fn add_clause(&mut self, lits: &[Lit]);
    /// Solve under the given assumptions, stopping after
    /// `conflict_limit` conflicts (0 = unbounded).
    fn solve(&mut self, assumptions: &[Lit], conflict_limit: usize) -> SatResult;
    fn var_value(&self, v: Var) -> Option<bool>;
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Val {
    Unassigned,
    True,
    False,
}

/// A small, dependency-free DPLL solver: unit propagation + naive
/// branching, bounded by a conflict counter that doubles as the
/// "decision" counter since this solver does no clause learning.
pub struct SimpleSatSolver {
    clauses: Vec<Vec<Lit>>,
    num_vars: usize,
    assignment: Vec<Val>,
}

impl Default for SimpleSatSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleSatSolver {
    pub fn new() -> Self {
        SimpleSatSolver {
            clauses: Vec::new(),
            num_vars: 0,
            assignment: Vec::new(),
        }
    }

    fn lit_value(assignment: &[Val], lit: Lit) -> Option<bool> {
        match assignment[lit.0] {
            Val::Unassigned => None,
            Val::True => Some(!lit.1),
            Val::False => Some(lit.1),
        }
    }

    fn dpll(
        clauses: &[Vec<Lit>],
        assignment: &mut Vec<Val>,
        conflicts: &mut usize,
        conflict_limit: usize,
    ) -> SatResult {
        loop {
            if conflict_limit != 0 && *conflicts > conflict_limit {
                return SatResult::Undef;
            }
            // unit propagation
            let mut progressed = false;
            for clause in clauses {
                let mut unassigned: Option<Lit> = None;
                let mut satisfied = false;
                let mut unassigned_count = 0;
                for &lit in clause {
                    match Self::lit_value(assignment, lit) {
                        Some(true) => {
                            satisfied = true;
                            break;
                        }
                        Some(false) => {}
                        None => {
                            unassigned_count += 1;
                            unassigned = Some(lit);
                        }
                    }
                }
                if satisfied {
                    continue;
                }
                if unassigned_count == 0 {
                    *conflicts += 1;
                    return SatResult::Unsat;
                }
                if unassigned_count == 1 {
                    let (v, neg) = unassigned.unwrap();
                    assignment[v] = if neg { Val::False } else { Val::True };
                    progressed = true;
                }
            }
            if progressed {
                continue;
            }
            break;
        }
        // pick an unassigned variable and branch
        let branch_var = assignment.iter().position(|&v| v == Val::Unassigned);
        let Some(bv) = branch_var else {
            return SatResult::Sat;
        };
        for &val in &[Val::True, Val::False] {
            let mut trial = assignment.clone();
            trial[bv] = val;
            let result = Self::dpll(clauses, &mut trial, conflicts, conflict_limit);
            if result == SatResult::Sat {
                *assignment = trial;
                return SatResult::Sat;
            }
            if result == SatResult::Undef {
                return SatResult::Undef;
            }
        }
        SatResult::Unsat
    }
}

impl SatSolver for SimpleSatSolver {
    fn reset(&mut self) {
        self.clauses.clear();
        self.num_vars = 0;
        self.assignment.clear();
    }

    fn set_num_vars(&mut self, n: usize) {
        self.num_vars = n;
        self.assignment = vec![Val::Unassigned; n];
    }

    fn add_var(&mut self) -> Var {
        let v = self.num_vars;
        self.num_vars += 1;
        self.assignment.push(Val::Unassigned);
        v
    }

    fn add_and(&mut self, out: Var, inputs: &[Lit]) {
        // out <-> AND(inputs): (out -> each input) and (all inputs -> out)
        for &(v, neg) in inputs {
            self.add_clause(&[(out, true), (v, neg)]);
        }
        let mut big = vec![(out, false)];
        for &(v, neg) in inputs {
            big.push((v, !neg));
        }
        self.add_clause(&big);
    }

    fn add_buffer(&mut self, out: Var, input: Lit) {
        self.add_clause(&[(out, true), (input.0, input.1)]);
        self.add_clause(&[(out, false), (input.0, !input.1)]);
    }

    fn add_const(&mut self, out: Var, value: bool) {
        self.add_clause(&[(out, !value)]);
    }

    fn add_xor(&mut self, out: Var, a: Lit, b: Lit) {
        // out <-> a XOR b
        self.add_clause(&[(out, true), (a.0, a.1), (b.0, b.1)]);
        self.add_clause(&[(out, true), (a.0, !a.1), (b.0, !b.1)]);
        self.add_clause(&[(out, false), (a.0, a.1), (b.0, !b.1)]);
        self.add_clause(&[(out, false), (a.0, !a.1), (b.0, b.1)]);
    }

    fn add_clause(&mut self, lits: &[Lit]) {
        self.clauses.push(lits.to_vec());
    }

    fn solve(&mut self, assumptions: &[Lit], conflict_limit: usize) -> SatResult {
        let mut assignment = vec![Val::Unassigned; self.num_vars];
        for &(v, neg) in assumptions {
            assignment[v] = if neg { Val::False } else { Val::True };
        }
        let mut all_clauses = self.clauses.clone();
        for &a in assumptions {
            all_clauses.push(vec![a]);
        }
        let mut conflicts = 0usize;
        let result = Self::dpll(&all_clauses, &mut assignment, &mut conflicts, conflict_limit);
        if result == SatResult::Sat {
            self.assignment = assignment;
        }
        result
    }

    fn var_value(&self, v: Var) -> Option<bool> {
        match self.assignment.get(v) {
            Some(Val::True) => Some(true),
            Some(Val::False) => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_gate_forces_output() {
        let mut s = SimpleSatSolver::new();
        s.set_num_vars(0);
        let a = s.add_var();
        let b = s.add_var();
        let out = s.add_var();
        s.add_and(out, &[(a, false), (b, false)]);
        // force a=1, b=1 -> out must be 1, so out=0 is UNSAT
        let r = s.solve(&[(a, false), (b, false), (out, true)], 0);
        assert_eq!(r, SatResult::Unsat);
        let r2 = s.solve(&[(a, false), (b, false), (out, false)], 0);
        assert_eq!(r2, SatResult::Sat);
    }

    #[test]
    fn xor_gate_truth_table() {
        let mut s = SimpleSatSolver::new();
        s.set_num_vars(0);
        let a = s.add_var();
        let b = s.add_var();
        let out = s.add_var();
        s.add_xor(out, (a, false), (b, false));
        assert_eq!(s.solve(&[(a, false), (b, true), (out, true)], 0), SatResult::Unsat);
        assert_eq!(s.solve(&[(a, false), (b, true), (out, false)], 0), SatResult::Sat);
    }

    #[test]
    fn empty_clause_is_unsat() {
        let mut s = SimpleSatSolver::new();
        s.set_num_vars(1);
        s.add_clause(&[]);
        assert_eq!(s.solve(&[], 0), SatResult::Unsat);
    }
}
