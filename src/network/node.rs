use crate::types::NodeType;

/// Per-node storage: its kind, its ordered fanin edges, and the
/// back-reference fanout set (§3 "Fanout list").
///
/// `fanouts` is kept in insertion order and may contain the same
/// consumer id more than once (a node that feeds two distinct edges
/// of the same consumer contributes one fanout entry per edge).
#[derive(Clone, Debug)]
pub struct NodeData {
    pub ntype: NodeType,
    /// Ordered fanin edges: (source id, complement flag).
    pub fanins: Vec<(usize, bool)>,
    /// (consumer id, edge index within the consumer's fanin list).
    pub fanouts: Vec<(usize, usize)>,
}

impl NodeData {
    pub fn new(ntype: NodeType) -> Self {
        NodeData {
            ntype,
            fanins: Vec::new(),
            fanouts: Vec::new(),
        }
    }

    /// Live iff it has at least one fanout, or it is itself a
    /// PrimaryOutput (I6).
    pub fn is_live(&self) -> bool {
        !self.fanouts.is_empty() || self.ntype == NodeType::PrimaryOutput
    }
}
