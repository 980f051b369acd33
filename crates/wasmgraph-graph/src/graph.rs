//! IR graph: an arena of nodes scheduled into basic blocks.
//!
//! Nodes and blocks are addressed by stable indices ([`NodeId`], [`BlockId`]).
//! Loops make the control-flow graph cyclic, so blocks refer to each other only
//! through these indices.
//!
//! Invariants maintained by the builder:
//! 1. A block's schedule lists its phis first, then every other node in program
//!    order. Loads and stores are never reordered.
//! 2. A phi has exactly one input per predecessor of its block, in predecessor
//!    order.
//! 3. Every block reachable from the entry ends with a terminator.

use std::fmt;

use smallvec::SmallVec;
use wasmgraph_bytecode::{MemType, MemoryRegion, Opcode, ValueType};

/// Index of a node in the graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Arena index
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Index of a basic block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl BlockId {
    /// Arena index
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Two-operand machine operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Wrapping int32 add
    I32Add,
    /// Wrapping int32 subtract
    I32Sub,
    /// Wrapping int32 multiply
    I32Mul,
    /// int32 bitwise and
    I32And,
    /// int32 bitwise or
    I32Ior,
    /// int32 bitwise xor
    I32Xor,
    /// int32 equality (0 or 1)
    I32Eq,
    /// int32 signed less-than (0 or 1)
    I32Slt,
    /// float32 add
    F32Add,
    /// float32 subtract
    F32Sub,
    /// float32 multiply
    F32Mul,
    /// float64 add
    F64Add,
    /// float64 subtract
    F64Sub,
    /// float64 multiply
    F64Mul,
}

impl BinaryOp {
    /// Machine operation for a binary opcode
    pub fn from_opcode(opcode: Opcode) -> Option<Self> {
        Some(match opcode {
            Opcode::Int32Add => Self::I32Add,
            Opcode::Int32Sub => Self::I32Sub,
            Opcode::Int32Mul => Self::I32Mul,
            Opcode::Int32And => Self::I32And,
            Opcode::Int32Ior => Self::I32Ior,
            Opcode::Int32Xor => Self::I32Xor,
            Opcode::Int32Eq => Self::I32Eq,
            Opcode::Int32Slt => Self::I32Slt,
            Opcode::Float32Add => Self::F32Add,
            Opcode::Float32Sub => Self::F32Sub,
            Opcode::Float32Mul => Self::F32Mul,
            Opcode::Float64Add => Self::F64Add,
            Opcode::Float64Sub => Self::F64Sub,
            Opcode::Float64Mul => Self::F64Mul,
            _ => return None,
        })
    }

    /// Get the name of this operation
    pub const fn name(self) -> &'static str {
        match self {
            Self::I32Add => "Int32Add",
            Self::I32Sub => "Int32Sub",
            Self::I32Mul => "Int32Mul",
            Self::I32And => "Int32And",
            Self::I32Ior => "Int32Ior",
            Self::I32Xor => "Int32Xor",
            Self::I32Eq => "Int32Equal",
            Self::I32Slt => "Int32LessThan",
            Self::F32Add => "Float32Add",
            Self::F32Sub => "Float32Sub",
            Self::F32Mul => "Float32Mul",
            Self::F64Add => "Float64Add",
            Self::F64Sub => "Float64Sub",
            Self::F64Mul => "Float64Mul",
        }
    }
}

/// One-operand machine operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// 1 if the int32 operand is zero, else 0
    I32Eqz,
    /// Saturating float32 to int32 truncation
    I32TruncF32,
    /// Saturating float64 to int32 truncation
    I32TruncF64,
    /// Signed int32 to float64
    F64ConvertI32,
}

impl UnaryOp {
    /// Machine operation for a unary opcode
    pub fn from_opcode(opcode: Opcode) -> Option<Self> {
        Some(match opcode {
            Opcode::LogicalNot => Self::I32Eqz,
            Opcode::Int32FromFloat32 => Self::I32TruncF32,
            Opcode::Int32FromFloat64 => Self::I32TruncF64,
            Opcode::Float64FromInt32 => Self::F64ConvertI32,
            _ => return None,
        })
    }

    /// Get the name of this operation
    pub const fn name(self) -> &'static str {
        match self {
            Self::I32Eqz => "Word32Equal0",
            Self::I32TruncF32 => "TruncateFloat32ToInt32",
            Self::I32TruncF64 => "TruncateFloat64ToInt32",
            Self::F64ConvertI32 => "ChangeInt32ToFloat64",
        }
    }
}

/// Operation performed by a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Function parameter `index`
    Parameter {
        /// Parameter position
        index: u32,
    },
    /// int32 constant
    Int32Constant(i32),
    /// float32 constant
    Float32Constant(f32),
    /// float64 constant
    Float64Constant(f64),
    /// Binary operation
    Binary {
        /// Operation
        op: BinaryOp,
        /// Left operand
        lhs: NodeId,
        /// Right operand
        rhs: NodeId,
    },
    /// Unary operation
    Unary {
        /// Operation
        op: UnaryOp,
        /// Operand
        input: NodeId,
    },
    /// Heap load at byte offset `index` from the memory start
    Load {
        /// Element type
        mem: MemType,
        /// Byte offset (int32, zero-extended)
        index: NodeId,
    },
    /// Heap store at byte offset `index` from the memory start
    Store {
        /// Element type
        mem: MemType,
        /// Byte offset (int32, zero-extended)
        index: NodeId,
        /// Stored value
        value: NodeId,
    },
    /// Merge of one value per predecessor of the owning block
    Phi {
        /// Inputs in predecessor order
        inputs: SmallVec<[NodeId; 2]>,
    },
}

impl NodeKind {
    /// Value operands of this node
    pub fn operands(&self) -> SmallVec<[NodeId; 2]> {
        match self {
            Self::Parameter { .. }
            | Self::Int32Constant(_)
            | Self::Float32Constant(_)
            | Self::Float64Constant(_) => SmallVec::new(),
            Self::Binary { lhs, rhs, .. } => SmallVec::from_slice(&[*lhs, *rhs]),
            Self::Unary { input, .. } => SmallVec::from_slice(&[*input]),
            Self::Load { index, .. } => SmallVec::from_slice(&[*index]),
            Self::Store { index, value, .. } => SmallVec::from_slice(&[*index, *value]),
            Self::Phi { inputs } => inputs.clone(),
        }
    }

    fn operands_mut(&mut self) -> SmallVec<[&mut NodeId; 2]> {
        match self {
            Self::Parameter { .. }
            | Self::Int32Constant(_)
            | Self::Float32Constant(_)
            | Self::Float64Constant(_) => SmallVec::new(),
            Self::Binary { lhs, rhs, .. } => SmallVec::from_iter([lhs, rhs]),
            Self::Unary { input, .. } => SmallVec::from_iter([input]),
            Self::Load { index, .. } => SmallVec::from_iter([index]),
            Self::Store { index, value, .. } => SmallVec::from_iter([index, value]),
            Self::Phi { inputs } => inputs.iter_mut().collect(),
        }
    }

    /// Whether this node reads or writes the heap
    #[inline]
    pub fn has_effect(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::Store { .. })
    }

    /// Whether this node is a phi
    #[inline]
    pub fn is_phi(&self) -> bool {
        matches!(self, Self::Phi { .. })
    }
}

/// A node: operation, result type and owning block
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Operation
    pub kind: NodeKind,
    /// Result type, `None` for stores
    pub ty: Option<ValueType>,
    /// Block the node is scheduled in
    pub block: BlockId,
}

/// How control leaves a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// Unconditional jump
    Jump(BlockId),
    /// Two-way branch on a nonzero int32
    Branch {
        /// int32 condition
        cond: NodeId,
        /// Target when `cond != 0`
        if_true: BlockId,
        /// Target when `cond == 0`
        if_false: BlockId,
    },
    /// Return a value from the function
    Return(NodeId),
}

impl Terminator {
    /// Successor blocks, in edge order
    pub fn successors(&self) -> SmallVec<[BlockId; 2]> {
        match *self {
            Self::Jump(target) => SmallVec::from_slice(&[target]),
            Self::Branch {
                if_true, if_false, ..
            } => SmallVec::from_slice(&[if_true, if_false]),
            Self::Return(_) => SmallVec::new(),
        }
    }
}

/// A basic block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    /// Scheduled nodes: phis first, then program order
    pub nodes: Vec<NodeId>,
    /// Predecessors, in the order their edges were added
    pub preds: SmallVec<[BlockId; 2]>,
    /// Block exit, `None` while under construction or when unreachable
    pub terminator: Option<Terminator>,
}

impl Block {
    /// Position of `pred` in the predecessor list
    pub fn pred_index(&self, pred: BlockId) -> Option<usize> {
        self.preds.iter().position(|&p| p == pred)
    }
}

/// The IR graph of one function
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    blocks: Vec<Block>,
    params: Vec<ValueType>,
    return_type: ValueType,
    memory: Option<MemoryRegion>,
}

impl Graph {
    /// Create a graph holding only an empty entry block
    pub fn new(params: Vec<ValueType>, return_type: ValueType, memory: Option<MemoryRegion>) -> Self {
        Self {
            nodes: Vec::new(),
            blocks: vec![Block::default()],
            params,
            return_type,
            memory,
        }
    }

    /// Entry block
    #[inline]
    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    /// Parameter types
    #[inline]
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// Return type
    #[inline]
    pub fn return_type(&self) -> ValueType {
        self.return_type
    }

    /// Bound linear memory, if any
    #[inline]
    pub fn memory(&self) -> Option<MemoryRegion> {
        self.memory
    }

    /// Number of nodes in the arena (including nodes removed from every schedule)
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of blocks
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Node by id
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Block by id
    #[inline]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    /// All block ids, in creation order
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len() as u32).map(BlockId)
    }

    /// Create an empty block
    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::default());
        id
    }

    /// Append a node to the end of `block`'s schedule
    pub fn add_node(&mut self, block: BlockId, kind: NodeKind, ty: Option<ValueType>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, ty, block });
        self.blocks[block.index()].nodes.push(id);
        id
    }

    /// Insert a phi after the existing phis of `block`
    pub fn add_phi(&mut self, block: BlockId, ty: ValueType, inputs: &[NodeId]) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind: NodeKind::Phi {
                inputs: SmallVec::from_slice(inputs),
            },
            ty: Some(ty),
            block,
        });
        let phi_count = self.blocks[block.index()]
            .nodes
            .iter()
            .take_while(|n| self.nodes[n.index()].kind.is_phi())
            .count();
        self.blocks[block.index()].nodes.insert(phi_count, id);
        id
    }

    /// Append an input to an existing phi
    pub fn add_phi_input(&mut self, phi: NodeId, input: NodeId) {
        if let NodeKind::Phi { inputs } = &mut self.nodes[phi.index()].kind {
            inputs.push(input);
        }
    }

    /// Whether `node` is a phi scheduled in `block`
    pub fn is_phi_of(&self, node: NodeId, block: BlockId) -> bool {
        let node = self.node(node);
        node.block == block && node.kind.is_phi()
    }

    /// Terminate `block` and register it as a predecessor of every successor
    pub fn set_terminator(&mut self, block: BlockId, terminator: Terminator) {
        for succ in terminator.successors() {
            self.blocks[succ.index()].preds.push(block);
        }
        self.blocks[block.index()].terminator = Some(terminator);
    }

    /// Blocks that end in a `Return`, with the returned value
    pub fn returns(&self) -> Vec<(BlockId, NodeId)> {
        self.block_ids()
            .filter_map(|id| match self.block(id).terminator {
                Some(Terminator::Return(value)) => Some((id, value)),
                _ => None,
            })
            .collect()
    }

    /// Blocks reachable from the entry, in reverse post-order.
    ///
    /// Every block appears after all of its dominators.
    pub fn reverse_post_order(&self) -> Vec<BlockId> {
        let mut visited = vec![false; self.blocks.len()];
        let mut post_order = Vec::with_capacity(self.blocks.len());
        // (block, index of the next successor to visit)
        let mut stack: Vec<(BlockId, usize)> = vec![(self.entry(), 0)];
        visited[self.entry().index()] = true;

        while let Some((block, next)) = stack.pop() {
            let succs = self
                .block(block)
                .terminator
                .map(|t| t.successors())
                .unwrap_or_default();
            if let Some(&succ) = succs.get(next) {
                stack.push((block, next + 1));
                if !visited[succ.index()] {
                    visited[succ.index()] = true;
                    stack.push((succ, 0));
                }
            } else {
                post_order.push(block);
            }
        }

        post_order.reverse();
        post_order
    }

    /// Rewrite every use of `old` (node operands and terminators) to `new`
    pub fn replace_all_uses(&mut self, old: NodeId, new: NodeId) {
        for node in &mut self.nodes {
            for operand in node.kind.operands_mut() {
                if *operand == old {
                    *operand = new;
                }
            }
        }
        for block in &mut self.blocks {
            match &mut block.terminator {
                Some(Terminator::Branch { cond, .. }) if *cond == old => *cond = new,
                Some(Terminator::Return(value)) if *value == old => *value = new,
                _ => {}
            }
        }
    }

    /// Take `node` out of its block's schedule. The arena slot stays allocated.
    pub fn unschedule(&mut self, node: NodeId) {
        let block = self.nodes[node.index()].block;
        self.blocks[block.index()].nodes.retain(|&n| n != node);
    }
}
