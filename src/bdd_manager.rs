//! The BDD library boundary (SPEC_FULL.md §6/§6a): a trait mirroring
//! the external service list the source's CSPF Analyzer relies on,
//! plus a pure-Rust reference implementation so the whole pipeline
//! builds and tests without an FFI binding to a real BDD package.

use std::collections::HashMap;

/// An opaque reference to a node inside a `BddManager`. Positive
/// values (including 0, the constant terminal) index the unique
/// table directly; the manager's `Not` always returns a fresh
/// complemented handle rather than relying on sign bits, keeping this
/// type a plain newtype instead of encoding polarity itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BddRef(pub usize);

/// External BDD manager services the Analyzer depends on (SPEC_FULL.md
/// §6's BDD list, one method per bullet).
pub trait BddManager {
    fn const0(&self) -> BddRef;
    fn const1(&self) -> BddRef;
    fn ith_var(&mut self, i: usize) -> BddRef;
    fn and(&mut self, a: BddRef, b: BddRef) -> BddRef;
    fn or(&mut self, a: BddRef, b: BddRef) -> BddRef;
    fn not(&mut self, a: BddRef) -> BddRef;
    fn lit_is_eq(&self, a: BddRef, b: BddRef) -> bool;
    fn is_const0(&self, a: BddRef) -> bool;
    fn is_const1(&self, a: BddRef) -> bool;
    fn inc_ref(&mut self, a: BddRef);
    fn dec_ref(&mut self, a: BddRef);
    fn reorder(&mut self);
    fn turn_off_reorder(&mut self);
    fn num_total_created_nodes(&self) -> usize;
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct BddNode {
    var: usize,
    then_ref: usize,
    else_ref: usize,
}

/// A textbook reduced, ordered, hash-consed BDD table. Node 0 is the
/// constant-0 terminal, node 1 is constant-1; every other node is
/// `(var, then, else)`. `Not` is implemented structurally (it builds
/// the complemented function rather than flipping a sign bit) to keep
/// `BddRef` a plain index, matching the trait's "opaque handle" shape.
pub struct SimpleBddManager {
    nodes: Vec<BddNode>,
    unique: HashMap<(usize, usize, usize), usize>,
    refs: Vec<u32>,
    num_vars: usize,
    reorder_enabled: bool,
    total_created: usize,
}

const CONST0_IDX: usize = 0;
const CONST1_IDX: usize = 1;

impl Default for SimpleBddManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleBddManager {
    pub fn new() -> Self {
        SimpleBddManager {
            nodes: vec![
                BddNode { var: usize::MAX, then_ref: 0, else_ref: 0 },
                BddNode { var: usize::MAX, then_ref: 1, else_ref: 1 },
            ],
            unique: HashMap::new(),
            refs: vec![0, 0],
            num_vars: 0,
            reorder_enabled: true,
            total_created: 2,
        }
    }

    fn make(&mut self, var: usize, then_ref: usize, else_ref: usize) -> usize {
        if then_ref == else_ref {
            return then_ref;
        }
        let key = (var, then_ref, else_ref);
        if let Some(&idx) = self.unique.get(&key) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(BddNode { var, then_ref, else_ref });
        self.refs.push(0);
        self.unique.insert(key, idx);
        self.total_created += 1;
        idx
    }

    fn var_of(&self, idx: usize) -> usize {
        self.nodes[idx].var
    }

    fn apply_and(&mut self, a: usize, b: usize) -> usize {
        if a == CONST0_IDX || b == CONST0_IDX {
            return CONST0_IDX;
        }
        if a == CONST1_IDX {
            return b;
        }
        if b == CONST1_IDX || a == b {
            return a;
        }
        let (top, other) = if self.var_of(a) <= self.var_of(b) {
            (a, b)
        } else {
            (b, a)
        };
        let top_var = self.var_of(top);
        let (then_t, else_t) = (self.nodes[top].then_ref, self.nodes[top].else_ref);
        let (then_o, else_o) = if self.var_of(other) == top_var {
            (self.nodes[other].then_ref, self.nodes[other].else_ref)
        } else {
            (other, other)
        };
        let then_res = self.apply_and(then_t, then_o);
        let else_res = self.apply_and(else_t, else_o);
        self.make(top_var, then_res, else_res)
    }

    fn apply_not(&mut self, a: usize) -> usize {
        if a == CONST0_IDX {
            return CONST1_IDX;
        }
        if a == CONST1_IDX {
            return CONST0_IDX;
        }
        let node = self.nodes[a];
        let then_res = self.apply_not(node.then_ref);
        let else_res = self.apply_not(node.else_ref);
        self.make(node.var, then_res, else_res)
    }
}

impl BddManager for SimpleBddManager {
    fn const0(&self) -> BddRef {
        BddRef(CONST0_IDX)
    }

    fn const1(&self) -> BddRef {
        BddRef(CONST1_IDX)
    }

    fn ith_var(&mut self, i: usize) -> BddRef {
        self.num_vars = self.num_vars.max(i + 1);
        let idx = self.make(i, CONST1_IDX, CONST0_IDX);
        BddRef(idx)
    }

    fn and(&mut self, a: BddRef, b: BddRef) -> BddRef {
        BddRef(self.apply_and(a.0, b.0))
    }

    fn or(&mut self, a: BddRef, b: BddRef) -> BddRef {
        let na = self.apply_not(a.0);
        let nb = self.apply_not(b.0);
        let and_n = self.apply_and(na, nb);
        BddRef(self.apply_not(and_n))
    }

    fn not(&mut self, a: BddRef) -> BddRef {
        BddRef(self.apply_not(a.0))
    }

    fn lit_is_eq(&self, a: BddRef, b: BddRef) -> bool {
        a.0 == b.0
    }

    fn is_const0(&self, a: BddRef) -> bool {
        a.0 == CONST0_IDX
    }

    fn is_const1(&self, a: BddRef) -> bool {
        a.0 == CONST1_IDX
    }

    fn inc_ref(&mut self, a: BddRef) {
        self.refs[a.0] = self.refs[a.0].saturating_add(1);
    }

    fn dec_ref(&mut self, a: BddRef) {
        self.refs[a.0] = self.refs[a.0].saturating_sub(1);
    }

    fn reorder(&mut self) {
        // The reference manager has no variable-order heuristic; this
        // is a deliberate no-op, matching SPEC_FULL.md §4.4's note
        // that reordering may legitimately do nothing.
        self.reorder_enabled = true;
    }

    fn turn_off_reorder(&mut self) {
        self.reorder_enabled = false;
    }

    fn num_total_created_nodes(&self) -> usize {
        self.total_created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_or_not_truth_table() {
        let mut m = SimpleBddManager::new();
        let x = m.ith_var(0);
        let y = m.ith_var(1);
        let and_xy = m.and(x, y);
        let or_xy = m.or(x, y);
        let not_x = m.not(x);

        assert!(!m.is_const0(and_xy) || m.is_const0(and_xy)); // sanity: no panic
        assert!(m.lit_is_eq(m.and(x, m.const1()), x));
        assert!(m.is_const0(m.and(x, not_x)));
        assert!(m.is_const1(m.or(x, not_x)));
        let _ = or_xy;
    }

    #[test]
    fn hash_consing_shares_identical_nodes() {
        let mut m = SimpleBddManager::new();
        let x = m.ith_var(0);
        let y = m.ith_var(1);
        let a = m.and(x, y);
        let b = m.and(x, y);
        assert_eq!(a, b);
    }

    #[test]
    fn double_negation_is_identity() {
        let mut m = SimpleBddManager::new();
        let x = m.ith_var(0);
        let nn = m.not(m.not(x));
        assert_eq!(nn, x);
    }
}
