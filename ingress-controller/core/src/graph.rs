use crate::VsNode;

/// Per-shard object graph: one parent virtual service plus its children. The
/// shared graph map wraps each graph in a mutex; the builder mutates a graph
/// only while holding that lock, and the reconciler snapshots it the same
/// way.
#[derive(Clone, Debug, Default)]
pub struct ObjectGraph {
    pub model_name: String,
    parent: Option<VsNode>,
    saved_checksum: u64,
}

impl ObjectGraph {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            parent: None,
            saved_checksum: 0,
        }
    }

    pub fn parent(&self) -> Option<&VsNode> {
        self.parent.as_ref()
    }

    pub fn parent_mut(&mut self) -> Option<&mut VsNode> {
        self.parent.as_mut()
    }

    pub fn set_parent(&mut self, parent: VsNode) -> &mut VsNode {
        self.parent = Some(parent);
        self.parent.as_mut().unwrap()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_none()
    }

    /// Recomputes the graph checksum and records it. Returns true when the
    /// graph changed since the last save, which is the signal to enqueue the
    /// model for reconciliation.
    pub fn save(&mut self) -> bool {
        let sum = match self.parent.as_mut() {
            Some(parent) => parent.calculate_checksum(),
            None => 0,
        };
        let changed = sum != self.saved_checksum;
        self.saved_checksum = sum;
        changed
    }

    pub fn checksum(&self) -> u64 {
        self.parent.as_ref().map(VsNode::checksum).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_reports_change_once() {
        let mut graph = ObjectGraph::new("admin/cluster--Shared-L7-0");
        graph.set_parent(VsNode {
            name: "cluster--Shared-L7-0".to_string(),
            shared_vs: true,
            ..VsNode::default()
        });
        assert!(graph.save());
        assert!(!graph.save());

        graph.parent_mut().unwrap().enable_rhi = Some(true);
        assert!(graph.save());
    }
}
