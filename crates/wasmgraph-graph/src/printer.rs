//! Text rendering of graphs, used by `trace_graph` and in test failures

use std::fmt;

use crate::graph::{Graph, NodeId, NodeKind, Terminator};

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter { index } => write!(f, "Parameter[{index}]"),
            Self::Int32Constant(v) => write!(f, "Int32Constant[{v}]"),
            Self::Float32Constant(v) => write!(f, "Float32Constant[{v:?}]"),
            Self::Float64Constant(v) => write!(f, "Float64Constant[{v:?}]"),
            Self::Binary { op, lhs, rhs } => write!(f, "{}({lhs}, {rhs})", op.name()),
            Self::Unary { op, input } => write!(f, "{}({input})", op.name()),
            Self::Load { mem, index } => write!(f, "Load[{mem}]({index})"),
            Self::Store { mem, index, value } => write!(f, "Store[{mem}]({index}, {value})"),
            Self::Phi { inputs } => {
                f.write_str("Phi(")?;
                write_list(f, inputs.iter())?;
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jump(target) => write!(f, "jump {target}"),
            Self::Branch {
                cond,
                if_true,
                if_false,
            } => write!(f, "branch {cond} ? {if_true} : {if_false}"),
            Self::Return(value) => write!(f, "return {value}"),
        }
    }
}

fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_node(f: &mut fmt::Formatter<'_>, graph: &Graph, id: NodeId) -> fmt::Result {
    let node = graph.node(id);
    match node.ty {
        Some(ty) => writeln!(f, "  {id}: {ty} = {}", node.kind),
        None => writeln!(f, "  {id}: {}", node.kind),
    }
}

/// Blocks are printed in reverse post-order; unreachable blocks are omitted.
impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("graph (")?;
        write_list(f, self.params().iter())?;
        write!(f, ") -> {}", self.return_type())?;
        if let Some(memory) = self.memory() {
            write!(f, ", memory {:#x}+{}", memory.start(), memory.len())?;
        }
        writeln!(f)?;

        for block in self.reverse_post_order() {
            let data = self.block(block);
            write!(f, "{block}:")?;
            if !data.preds.is_empty() {
                f.write_str(" <- ")?;
                write_list(f, data.preds.iter())?;
            }
            writeln!(f)?;
            for &node in &data.nodes {
                write_node(f, self, node)?;
            }
            match &data.terminator {
                Some(term) => writeln!(f, "  {term}")?,
                None => writeln!(f, "  <unterminated>")?,
            }
        }
        Ok(())
    }
}
