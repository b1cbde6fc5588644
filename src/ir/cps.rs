//! Threading of local variables through blocks.
//!
//! In threaded form every block starts with one phi per local it reads before
//! writing; the first `GetLocal` of such a local references the phi, and the
//! phi's children are the predecessors' tail values for that local. The block
//! snapshots `variables_at_head` / `variables_at_tail` record the phi and the
//! last access of each local.
//!
//! Structural transformations drop this information with
//! [`Graph::dethread`]; it is rebuilt by [`Graph::thread_locals`].

use crate::{
    ir::{
        BasicBlock, Children, Edge, Graph, GraphForm, Node, NodeData, NodeIndex, NodeKind,
        Operands,
    },
    utils::graph::BlockIndex,
};

impl Graph {
    /// Rebuilds phis, `GetLocal` links and head/tail snapshots for every
    /// reachable block.
    ///
    /// Recomputes reachability first so that phi children follow the current
    /// predecessor lists.
    pub fn thread_locals(&mut self) {
        self.reset_reachability();
        let num_locals = self.num_locals();
        let blocks: Vec<BlockIndex> = self
            .blocks()
            .filter(|block| block.is_reachable())
            .map(BasicBlock::index)
            .collect();

        for &block in &blocks {
            let nodes = self
                .block(block)
                .map(|b| b.nodes().to_vec())
                .unwrap_or_default();
            let mut head = Operands::new(num_locals);
            let mut tail = Operands::new(num_locals);
            let mut phis = Vec::new();

            for node in nodes {
                let (kind, operand, origin) = {
                    let n = self.node(node);
                    (n.kind, n.operand(), n.origin)
                };
                let Some(operand) = operand else {
                    continue;
                };
                match kind {
                    NodeKind::GetLocal => {
                        if tail.get(operand).is_none() {
                            let mut phi = Node::new(NodeKind::Phi, origin);
                            phi.prediction = self.node(node).prediction;
                            phi.data = NodeData::Local(operand);
                            let phi = self.add_node(phi);
                            phis.push(phi);
                            head.set(operand, Some(phi));
                            self.node_mut(node).children = Children::one(Edge::untyped(phi));
                        } else {
                            self.node_mut(node).children = Children::NONE;
                        }
                        tail.set(operand, Some(node));
                    }
                    NodeKind::SetLocal => tail.set(operand, Some(node)),
                    _ => {}
                }
            }

            if let Some(target) = self.block_mut(block) {
                target.phis = phis;
                target.variables_at_head = head;
                target.variables_at_tail = tail;
            }
        }

        for &block in &blocks {
            let (phis, predecessors) = match self.block(block) {
                Some(b) => (b.phis().to_vec(), b.predecessors().to_vec()),
                None => continue,
            };
            for phi in phis {
                let Some(operand) = self.node(phi).operand() else {
                    continue;
                };
                let incoming: Vec<NodeIndex> = predecessors
                    .iter()
                    .filter_map(|&pred| self.block(pred)?.variables_at_tail.get(operand))
                    .take(3)
                    .collect();
                let mut edges = [Edge::EMPTY; 3];
                for (slot, node) in edges.iter_mut().zip(incoming) {
                    *slot = Edge::untyped(node);
                }
                self.node_mut(phi).children = Children::Fixed(edges);
            }
        }

        self.set_form(GraphForm::ThreadedCps);
    }

    /// Drops threaded data-flow: phi children are cleared and the graph
    /// returns to load/store form.
    ///
    /// Phis and snapshots stay in place so that block structure can still be
    /// cloned; only their cross-block links are forgotten.
    pub fn dethread(&mut self) {
        if self.form() == GraphForm::LoadStore {
            return;
        }
        let phis: Vec<NodeIndex> = self
            .blocks()
            .flat_map(|block| block.phis().iter().copied())
            .collect();
        for phi in phis {
            self.node_mut(phi).children = Children::NONE;
        }
        self.set_form(GraphForm::LoadStore);
    }
}

#[cfg(test)]
mod tests {
    use crate::ir::{GraphForm, NodeKind, Operand};
    use crate::test::counted_loop;

    #[test]
    fn test_threading_creates_header_phis() {
        let fixture = counted_loop(0, 4, 1);
        let graph = &fixture.graph;
        assert_eq!(graph.form(), GraphForm::ThreadedCps);

        let header = graph.block(fixture.header).unwrap();
        let i = Operand(0);
        let phi = header.variables_at_head.get(i).unwrap();
        assert!(header.phis().contains(&phi));
        assert_eq!(graph.node(phi).kind, NodeKind::Phi);

        // Incoming values: the pre-header's store and the loop's own store.
        let incoming: Vec<_> = graph.child_edges(phi).collect();
        assert_eq!(incoming.len(), 2);

        let tail = header.variables_at_tail.get(i).unwrap();
        assert_eq!(graph.node(tail).kind, NodeKind::SetLocal);
    }

    #[test]
    fn test_dethread_clears_phi_children() {
        let mut fixture = counted_loop(0, 4, 1);
        fixture.graph.dethread();
        let graph = &fixture.graph;

        assert_eq!(graph.form(), GraphForm::LoadStore);
        for block in graph.blocks() {
            for &phi in block.phis() {
                assert_eq!(graph.child_edges(phi).count(), 0);
            }
        }
    }
}
