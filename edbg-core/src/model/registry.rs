//! All nodes of one connection

use std::collections::BTreeMap;

use super::{CpuNode, ModelError};

/// Owner of every node seen on a connection
#[derive(Debug, Clone, Default)]
pub struct Model {
    nodes: BTreeMap<u8, CpuNode>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a newly discovered node; a second node with the same id is rejected
    pub fn add_node(&mut self, node: CpuNode) -> Result<&mut CpuNode, ModelError> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(ModelError::NodeAlreadyKnown(id));
        }
        Ok(self.nodes.entry(id).or_insert(node))
    }

    pub fn node(&self, id: u8) -> Option<&CpuNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: u8) -> Option<&mut CpuNode> {
        self.nodes.get_mut(&id)
    }

    /// Node with `id`, or [`ModelError::UnknownNode`]
    pub fn require(&mut self, id: u8) -> Result<&mut CpuNode, ModelError> {
        self.nodes.get_mut(&id).ok_or(ModelError::UnknownNode(id))
    }

    pub fn contains(&self, id: u8) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CpuNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forget all nodes (on reconnect)
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edbg_protocol::Version;

    fn node(id: u8) -> CpuNode {
        CpuNode::new(id, Version::new(1, 0, 0), Version::new(0, 0, 1), "cpu", "")
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut model = Model::new();
        model.add_node(node(1)).unwrap();
        model.add_node(node(2)).unwrap();

        let err = model.add_node(node(1)).unwrap_err();
        assert_eq!(err, ModelError::NodeAlreadyKnown(1));
        assert_eq!(err.to_string(), "CpuNode already known");
        assert_eq!(model.len(), 2);
    }

    #[test]
    fn test_require_and_clear() {
        let mut model = Model::new();
        model.add_node(node(4)).unwrap();
        assert!(model.require(4).is_ok());
        assert_eq!(model.require(5).unwrap_err(), ModelError::UnknownNode(5));

        model.clear();
        assert!(model.is_empty());
        assert!(!model.contains(4));
    }
}
