//! Textual and Graphviz dumps of graphs.

use std::fmt::{self, Write as _};

use crate::{
    ir::{BasicBlock, Children, Graph, NodeData, NodeIndex},
    utils::{dot_label, escape_dot, graph::BlockIndex},
};

impl Graph {
    /// Formats one node as `@n = Kind(operands, payload)`.
    #[must_use]
    pub fn format_node(&self, node: NodeIndex) -> String {
        let n = self.node(node);
        let mut parts: Vec<String> = Vec::new();
        match n.data {
            NodeData::Local(operand) => parts.push(operand.to_string()),
            NodeData::Constant(constant) => parts.push(constant.to_string()),
            NodeData::Property(id) => parts.push(format!("id{id}")),
            _ => {}
        }
        match n.children {
            Children::Fixed(edges) => {
                parts.extend(edges.iter().filter(|e| e.is_set()).map(ToString::to_string));
            }
            Children::VarArgs { first, count } => {
                parts.extend(
                    self.var_arg_children(first, count)
                        .iter()
                        .map(ToString::to_string),
                );
            }
        }

        let mut line = format!("{node} = {}", n.kind);
        if !parts.is_empty() {
            let _ = write!(line, "({})", parts.join(", "));
        }
        match n.data {
            NodeData::Jump(target) => {
                let _ = write!(line, " -> {target}");
            }
            NodeData::Branch(handle) => {
                if let Some(data) = self.branch_data(handle) {
                    let _ = write!(line, " -> T:{} F:{}", data.taken.block, data.not_taken.block);
                }
            }
            NodeData::Switch(handle) => {
                if let Some(data) = self.switch_data(handle) {
                    line.push_str(" ->");
                    for case in &data.cases {
                        let _ = write!(line, " {}:{}", case.value, case.target.block);
                    }
                    let _ = write!(line, " default:{}", data.fall_through.block);
                }
            }
            _ => {}
        }
        line
    }

    fn block_lines(&self, block: &BasicBlock) -> Vec<String> {
        let mut lines = Vec::with_capacity(block.phis().len() + block.nodes().len() + 1);
        let preds: Vec<String> = block.predecessors().iter().map(ToString::to_string).collect();
        let mut header = format!(
            "block {} (exec {}, preds [{}])",
            block.index(),
            block.execution_count,
            preds.join(", ")
        );
        if !block.flags.is_empty() {
            let _ = write!(header, " {:?}", block.flags);
        }
        lines.push(header);
        lines.extend(block.phis().iter().map(|&phi| format!("  {}", self.format_node(phi))));
        lines.extend(block.nodes().iter().map(|&node| format!("  {}", self.format_node(node))));
        lines
    }

    /// Renders the graph in Graphviz DOT format, one box per live block.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// std::fs::write("graph.dot", graph.to_dot())?;
    /// ```
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let title = if self.name().is_empty() { "graph" } else { self.name() };
        let _ = writeln!(dot, "digraph \"{}\" {{", escape_dot(title));
        dot.push_str("  node [shape=box, fontname=\"monospace\"];\n");

        for block in self.blocks() {
            let lines = self.block_lines(block);
            let label = dot_label(lines.iter().map(String::as_str));
            let style = if block.is_reachable() { "" } else { ", style=dashed" };
            let _ = writeln!(dot, "  {} [label=\"{}\"{}];", block_id(block.index()), label, style);
        }
        for block in self.block_ids() {
            let count = self.successor_count(block);
            for i in 0..count {
                let Some(target) = self.successor(block, i) else {
                    continue;
                };
                let label = match (count, i) {
                    (2, 0) => " [label=\"T\"]",
                    (2, 1) => " [label=\"F\"]",
                    _ => "",
                };
                let _ = writeln!(dot, "  {} -> {}{};", block_id(block), block_id(target), label);
            }
        }
        dot.push_str("}\n");
        dot
    }
}

fn block_id(block: BlockIndex) -> String {
    format!("bb{}", block.index())
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph {}", if self.name().is_empty() { "<anonymous>" } else { self.name() })?;
        if let Some(function) = self.function() {
            write!(f, " [{function}]")?;
        }
        writeln!(f, " ({:?}, {} locals)", self.form(), self.num_locals())?;
        for block in self.blocks() {
            for line in self.block_lines(block) {
                writeln!(f, "{line}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test::counted_loop;

    #[test]
    fn test_display_lists_blocks_and_nodes() {
        let fixture = counted_loop(0, 4, 1);
        let text = fixture.graph.to_string();

        assert!(text.starts_with("graph counted_loop"));
        assert!(text.contains("block #1"));
        assert!(text.contains("Phi(loc0"));
        assert!(text.contains("SetLocal(loc0, Int32:@"));
        assert!(text.contains("Branch("));
    }

    #[test]
    fn test_to_dot() {
        let fixture = counted_loop(0, 4, 1);
        let dot = fixture.graph.to_dot();

        assert!(dot.starts_with("digraph \"counted_loop\" {"));
        assert!(dot.contains("bb1 -> bb1 [label=\"T\"];"));
        assert!(dot.contains("bb1 -> bb2 [label=\"F\"];"));
        assert!(dot.contains("\\l"));
        assert!(dot.trim_end().ends_with('}'));
    }
}
