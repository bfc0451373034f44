//! Shared vocabulary: node kinds, the Action broadcast payload, and the
//! small enums the SAT/BDD boundary traits speak in.

use std::fmt;

/// The kind of a network node.
///
/// Only `PrimaryInput`, `PrimaryOutput`, `And`, and the implicit
/// constant-zero (node id 0, itself an `And` with zero fanins) have
/// dedicated mutation/analysis paths in this crate. `Xor` and `Lut`
/// are kept in the enum for forward compatibility with the wider AIG
/// model but constructing one is `Error::Unsupported`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Const0,
    PrimaryInput,
    PrimaryOutput,
    And,
    Xor,
    Lut,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeType::Const0 => "const0",
            NodeType::PrimaryInput => "pi",
            NodeType::PrimaryOutput => "po",
            NodeType::And => "and",
            NodeType::Xor => "xor",
            NodeType::Lut => "lut",
        };
        f.write_str(s)
    }
}

/// Tag for an `Action` broadcast by the `Network` after every
/// structural mutation. See `rrrTypes.h::ActionType` for the source
/// this mirrors one-for-one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    RemoveFanin,
    RemoveUnused,
    RemoveBuffer,
    RemoveConst,
    AddFanin,
    TrivialCollapse,
    TrivialDecompose,
    SortFanins,
    Read,
    Save,
    Load,
    PopBack,
    Insert,
}

/// A single broadcast event describing one structural mutation.
///
/// Unused fields are `None`/empty rather than the source's `-1`
/// sentinels, per SPEC_FULL.md's REDESIGN FLAGS.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    pub id: Option<usize>,
    pub idx: Option<usize>,
    pub fi: Option<usize>,
    pub complement: bool,
    pub fanins: Vec<(usize, bool)>,
    pub indices: Vec<usize>,
    pub fanouts: Vec<(usize, usize)>,
}

impl Action {
    /// Build a minimal action carrying only `kind`; callers fill in
    /// whichever fields their specific mutation needs.
    pub fn new(kind: ActionKind) -> Self {
        Action {
            kind,
            id: None,
            idx: None,
            fi: None,
            complement: false,
            fanins: Vec::new(),
            indices: Vec::new(),
            fanouts: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: usize) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_idx(mut self, idx: usize) -> Self {
        self.idx = Some(idx);
        self
    }

    pub fn with_fi(mut self, fi: usize, complement: bool) -> Self {
        self.fi = Some(fi);
        self.complement = complement;
        self
    }

    pub fn with_fanins(mut self, fanins: Vec<(usize, bool)>) -> Self {
        self.fanins = fanins;
        self
    }

    pub fn with_indices(mut self, indices: Vec<usize>) -> Self {
        self.indices = indices;
        self
    }

    pub fn with_fanouts(mut self, fanouts: Vec<(usize, usize)>) -> Self {
        self.fanouts = fanouts;
        self
    }
}

/// Outcome of a SAT solve: the two-state result plus the resource-limit
/// "cannot tell" outcome the spec's error taxonomy treats as a soft
/// "cannot confirm" (§7).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Undef,
}

/// A variable's value inside the SAT encoding, including the
/// "temporary" values the miter's justification walk produces before
/// they're committed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VarValue {
    Undef,
    True,
    False,
    TempTrue,
    TempFalse,
}

impl VarValue {
    /// Collapse a temporary value to its committed counterpart.
    /// Panics on `Undef`, matching the source's `assert(0)` on that path.
    pub fn decide(self) -> VarValue {
        match self {
            VarValue::Undef => panic!("cannot decide an undefined VarValue"),
            VarValue::True | VarValue::TempTrue => VarValue::True,
            VarValue::False | VarValue::TempFalse => VarValue::False,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_builder_round_trips_fields() {
        let a = Action::new(ActionKind::AddFanin)
            .with_id(3)
            .with_fi(7, true);
        assert_eq!(a.kind, ActionKind::AddFanin);
        assert_eq!(a.id, Some(3));
        assert_eq!(a.fi, Some(7));
        assert!(a.complement);
        assert_eq!(a.idx, None);
    }

    #[test]
    fn var_value_decide_collapses_temp_states() {
        assert_eq!(VarValue::TempTrue.decide(), VarValue::True);
        assert_eq!(VarValue::TempFalse.decide(), VarValue::False);
        assert_eq!(VarValue::True.decide(), VarValue::True);
    }

    #[test]
    #[should_panic]
    fn var_value_decide_panics_on_undef() {
        let _ = VarValue::Undef.decide();
    }
}
