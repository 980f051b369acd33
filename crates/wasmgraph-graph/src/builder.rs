//! Single-pass bytecode decoder that builds the SSA graph.
//!
//! The decoder walks the expression tree once. Each local's current value is
//! tracked in an [`SsaEnv`]; control flow edges carry that environment into
//! their target block, and phis are created lazily where incoming
//! environments disagree.
//!
//! Merge policy: the first edge into a block records its environment. Every
//! later edge compares local by local. A local whose recorded value is already
//! a phi of the target gets one more input; a local whose values differ gets a
//! new phi, whose inputs are the recorded value repeated for each earlier
//! predecessor followed by the new value. Loop headers get a phi for every
//! local up front, since the back edge is only known after the body.

use smallvec::SmallVec;
use wasmgraph_bytecode::{
    BreakDepth, Environment, LocalIndex, MAX_NESTING, MemType, Opcode, Value, ValueType,
};

use crate::error::{DecodeError, DecodeErrorCode, Result};
use crate::graph::{BinaryOp, BlockId, Graph, NodeId, NodeKind, Terminator, UnaryOp};
use crate::passes::eliminate_redundant_phis;

/// A value-producing expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Typed {
    node: NodeId,
    ty: ValueType,
}

/// Result of decoding one expression; `None` for void expressions
type Expr = Option<Typed>;

/// Current SSA value of every local, parameters first
#[derive(Debug, Clone, PartialEq, Eq)]
struct SsaEnv {
    locals: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
struct BlockState {
    reachable: bool,
    /// Environment at block entry, merged from all edges seen so far
    incoming: Option<SsaEnv>,
}

/// Break target: the exit of an enclosing block or loop
#[derive(Debug, Clone, Copy)]
struct Frame {
    exit: BlockId,
}

/// Decode `bytes` against `env` into a verified SSA graph
pub fn build_graph(bytes: &[u8], env: &Environment) -> Result<Graph> {
    let mut builder = GraphBuilder::new(bytes, env);
    match builder.build() {
        Ok(()) => {
            let mut graph = builder.graph;
            let removed = eliminate_redundant_phis(&mut graph);
            tracing::debug!(
                target: "wasmgraph::builder",
                bytes = bytes.len(),
                blocks = graph.block_count(),
                nodes = graph.node_count(),
                phis_removed = removed,
                "graph built"
            );
            Ok(graph)
        }
        Err(err) => {
            tracing::debug!(
                target: "wasmgraph::builder",
                code = %err.code,
                opcode_offset = err.opcode_offset,
                offset = err.offset,
                "decode failed"
            );
            Err(err)
        }
    }
}

struct GraphBuilder<'a> {
    bytes: &'a [u8],
    pos: usize,
    env: &'a Environment,
    local_types: Vec<ValueType>,
    graph: Graph,
    current: BlockId,
    ssa: SsaEnv,
    states: Vec<BlockState>,
    frames: Vec<Frame>,
    /// Expressions currently being decoded
    depth: usize,
}

impl<'a> GraphBuilder<'a> {
    fn new(bytes: &'a [u8], env: &'a Environment) -> Self {
        let signature = env.signature();
        let mut graph = Graph::new(
            signature.params().to_vec(),
            signature.return_type(),
            env.memory(),
        );
        let entry = graph.entry();
        let local_types: Vec<ValueType> = env.local_types().collect();

        let param_count = signature.param_count();
        let locals = local_types
            .iter()
            .enumerate()
            .map(|(i, &ty)| {
                if i < param_count {
                    graph.add_node(entry, NodeKind::Parameter { index: i as u32 }, Some(ty))
                } else {
                    graph.add_node(entry, constant(ty.zero()), Some(ty))
                }
            })
            .collect();

        Self {
            bytes,
            pos: 0,
            env,
            local_types,
            graph,
            current: entry,
            ssa: SsaEnv { locals },
            states: vec![BlockState {
                reachable: true,
                incoming: None,
            }],
            frames: Vec::new(),
            depth: 0,
        }
    }

    fn build(&mut self) -> Result<()> {
        while self.pos < self.bytes.len() {
            self.expr()?;
        }
        if self.is_live() {
            let end = self.bytes.len();
            return Err(DecodeError::new(
                DecodeErrorCode::FallThrough,
                end,
                end,
                "control reaches the end of the body without a return",
            ));
        }
        Ok(())
    }

    // ---- control flow plumbing ----

    fn is_live(&self) -> bool {
        self.states[self.current.index()].reachable
    }

    fn new_block(&mut self) -> BlockId {
        self.states.push(BlockState::default());
        self.graph.create_block()
    }

    /// Continue in a fresh block with no predecessors
    fn start_dead_code(&mut self) {
        self.current = self.new_block();
    }

    fn switch_to(&mut self, block: BlockId) {
        self.current = block;
        if let Some(env) = &self.states[block.index()].incoming {
            self.ssa = env.clone();
        }
    }

    fn goto(&mut self, target: BlockId) {
        if !self.is_live() {
            return;
        }
        self.graph.set_terminator(self.current, Terminator::Jump(target));
        self.merge_into(target);
    }

    fn branch(&mut self, cond: NodeId, if_true: BlockId, if_false: BlockId) {
        if !self.is_live() {
            return;
        }
        self.graph.set_terminator(
            self.current,
            Terminator::Branch {
                cond,
                if_true,
                if_false,
            },
        );
        self.merge_into(if_true);
        self.merge_into(if_false);
    }

    /// Merge the current environment into `target`. The edge must already be
    /// registered as the last predecessor of `target`.
    fn merge_into(&mut self, target: BlockId) {
        let state = &mut self.states[target.index()];
        state.reachable = true;
        if state.incoming.is_none() {
            state.incoming = Some(self.ssa.clone());
            return;
        }
        let Some(incoming) = state.incoming.as_mut() else {
            return;
        };

        let earlier_preds = self.graph.block(target).preds.len() - 1;
        for (i, &value) in self.ssa.locals.iter().enumerate() {
            let recorded = incoming.locals[i];
            if self.graph.is_phi_of(recorded, target) {
                self.graph.add_phi_input(recorded, value);
            } else if recorded != value {
                let mut inputs: SmallVec<[NodeId; 4]> = SmallVec::from_elem(recorded, earlier_preds);
                inputs.push(value);
                incoming.locals[i] = self.graph.add_phi(target, self.local_types[i], &inputs);
            }
        }
    }

    fn begin_loop(&mut self) -> BlockId {
        let header = self.new_block();
        self.goto(header);
        self.current = header;
        if self.is_live() {
            for i in 0..self.ssa.locals.len() {
                let entry_value = self.ssa.locals[i];
                self.ssa.locals[i] = self.graph.add_phi(header, self.local_types[i], &[entry_value]);
            }
            self.states[header.index()].incoming = Some(self.ssa.clone());
        }
        header
    }

    // ---- byte reading ----

    fn byte(&mut self, at: usize) -> Result<u8> {
        let b = self.bytes.get(self.pos).copied().ok_or_else(|| {
            DecodeError::new(
                DecodeErrorCode::UnexpectedEnd,
                at,
                self.pos,
                "body ends inside an opcode",
            )
        })?;
        self.pos += 1;
        Ok(b)
    }

    fn array<const N: usize>(&mut self, at: usize) -> Result<[u8; N]> {
        let slice = self.bytes.get(self.pos..self.pos + N).ok_or_else(|| {
            DecodeError::new(
                DecodeErrorCode::UnexpectedEnd,
                at,
                self.bytes.len(),
                format!("expected {N} immediate bytes"),
            )
        })?;
        self.pos += N;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn local(&mut self, at: usize) -> Result<(LocalIndex, ValueType)> {
        let index = LocalIndex::new(self.byte(at)?);
        match self.env.local_type(index) {
            Some(ty) => Ok((index, ty)),
            None => Err(DecodeError::new(
                DecodeErrorCode::InvalidLocal,
                at,
                self.pos,
                format!(
                    "local {} out of range ({} locals)",
                    index.index(),
                    self.local_types.len()
                ),
            )),
        }
    }

    fn mem_type(&mut self, at: usize) -> Result<MemType> {
        let byte = self.byte(at)?;
        let mem = MemType::from_byte(byte).ok_or_else(|| {
            DecodeError::new(
                DecodeErrorCode::InvalidMemType,
                at,
                self.pos,
                format!("unknown memory type {byte:#04x}"),
            )
        })?;
        if self.env.memory().is_none() {
            return Err(DecodeError::new(
                DecodeErrorCode::MissingMemory,
                at,
                self.pos,
                "heap access without a bound memory",
            ));
        }
        Ok(mem)
    }

    // ---- expressions ----

    fn emit(&mut self, kind: NodeKind, ty: ValueType) -> Typed {
        let node = self.graph.add_node(self.current, kind, Some(ty));
        Typed { node, ty }
    }

    fn any_value(&mut self) -> Result<Typed> {
        let at = self.pos;
        self.expr()?.ok_or_else(|| {
            DecodeError::new(
                DecodeErrorCode::ExpectedValue,
                at,
                self.pos,
                "expression yields no value",
            )
        })
    }

    fn value(&mut self, expected: ValueType) -> Result<NodeId> {
        let at = self.pos;
        let typed = self.any_value()?;
        if typed.ty != expected {
            return Err(DecodeError::new(
                DecodeErrorCode::TypeMismatch,
                at,
                self.pos,
                format!("expected {expected}, found {}", typed.ty),
            ));
        }
        Ok(typed.node)
    }

    fn expr(&mut self) -> Result<Expr> {
        if self.depth >= MAX_NESTING {
            return Err(DecodeError::new(
                DecodeErrorCode::NestingTooDeep,
                self.pos,
                self.pos,
                format!("expressions nested deeper than {MAX_NESTING}"),
            ));
        }
        self.depth += 1;
        let expr = self.decode_expr();
        self.depth -= 1;
        expr
    }

    fn decode_expr(&mut self) -> Result<Expr> {
        let at = self.pos;
        let byte = self.byte(at)?;
        let opcode = Opcode::from_byte(byte).ok_or_else(|| {
            DecodeError::new(
                DecodeErrorCode::UnknownOpcode,
                at,
                self.pos,
                format!("invalid opcode {byte:#04x}"),
            )
        })?;
        tracing::trace!(target: "wasmgraph::builder", offset = at, opcode = opcode.name(), "decode");

        match opcode {
            Opcode::Nop => Ok(None),
            Opcode::Block => {
                let count = self.byte(at)?;
                let exit = self.new_block();
                self.frames.push(Frame { exit });
                for _ in 0..count {
                    self.expr()?;
                }
                self.frames.pop();
                self.goto(exit);
                self.switch_to(exit);
                Ok(None)
            }
            Opcode::Loop => {
                let count = self.byte(at)?;
                let header = self.begin_loop();
                let exit = self.new_block();
                self.frames.push(Frame { exit });
                for _ in 0..count {
                    self.expr()?;
                }
                self.frames.pop();
                self.goto(header);
                self.switch_to(exit);
                Ok(None)
            }
            Opcode::If => {
                let cond = self.value(ValueType::Int32)?;
                let then_block = self.new_block();
                let merge = self.new_block();
                self.branch(cond, then_block, merge);
                self.switch_to(then_block);
                self.expr()?;
                self.goto(merge);
                self.switch_to(merge);
                Ok(None)
            }
            Opcode::IfElse => {
                let cond = self.value(ValueType::Int32)?;
                let then_block = self.new_block();
                let else_block = self.new_block();
                let merge = self.new_block();
                self.branch(cond, then_block, else_block);
                self.switch_to(then_block);
                self.expr()?;
                self.goto(merge);
                self.switch_to(else_block);
                self.expr()?;
                self.goto(merge);
                self.switch_to(merge);
                Ok(None)
            }
            Opcode::Ternary => {
                let cond = self.value(ValueType::Int32)?;
                let then_block = self.new_block();
                let else_block = self.new_block();
                let merge = self.new_block();
                self.branch(cond, then_block, else_block);

                self.switch_to(then_block);
                let if_true = self.any_value()?;
                let then_live = self.is_live();
                self.goto(merge);

                self.switch_to(else_block);
                let if_false = self.value(if_true.ty)?;
                let else_live = self.is_live();
                self.goto(merge);

                self.switch_to(merge);
                let node = match (then_live, else_live) {
                    (true, true) if if_true.node != if_false => {
                        self.graph
                            .add_phi(merge, if_true.ty, &[if_true.node, if_false])
                    }
                    (false, true) => if_false,
                    _ => if_true.node,
                };
                Ok(Some(Typed {
                    node,
                    ty: if_true.ty,
                }))
            }
            Opcode::Comma => {
                self.expr()?;
                self.expr()
            }
            Opcode::Break => {
                let depth = BreakDepth::new(self.byte(at)?);
                let target = self
                    .frames
                    .len()
                    .checked_sub(1 + depth.depth() as usize)
                    .map(|i| self.frames[i]);
                let Some(frame) = target else {
                    return Err(DecodeError::new(
                        DecodeErrorCode::InvalidBreakDepth,
                        at,
                        self.pos,
                        format!(
                            "break depth {} with {} enclosing blocks",
                            depth.depth(),
                            self.frames.len()
                        ),
                    ));
                };
                self.goto(frame.exit);
                self.start_dead_code();
                Ok(None)
            }
            Opcode::Return => {
                let count = self.byte(at)?;
                if count != 1 {
                    return Err(DecodeError::new(
                        DecodeErrorCode::ArityMismatch,
                        at,
                        self.pos,
                        format!("return expects 1 value, got {count}"),
                    ));
                }
                let value = self.value(self.graph.return_type())?;
                if self.is_live() {
                    self.graph
                        .set_terminator(self.current, Terminator::Return(value));
                }
                self.start_dead_code();
                Ok(None)
            }
            Opcode::Int8Const => {
                let v = self.byte(at)? as i8;
                Ok(Some(self.emit(
                    NodeKind::Int32Constant(i32::from(v)),
                    ValueType::Int32,
                )))
            }
            Opcode::Int32Const => {
                let v = i32::from_le_bytes(self.array(at)?);
                Ok(Some(self.emit(NodeKind::Int32Constant(v), ValueType::Int32)))
            }
            Opcode::Float32Const => {
                let v = f32::from_le_bytes(self.array(at)?);
                Ok(Some(self.emit(NodeKind::Float32Constant(v), ValueType::Float32)))
            }
            Opcode::Float64Const => {
                let v = f64::from_le_bytes(self.array(at)?);
                Ok(Some(self.emit(NodeKind::Float64Constant(v), ValueType::Float64)))
            }
            Opcode::GetLocal => {
                let (index, ty) = self.local(at)?;
                Ok(Some(Typed {
                    node: self.ssa.locals[index.index() as usize],
                    ty,
                }))
            }
            Opcode::SetLocal => {
                let (index, ty) = self.local(at)?;
                let node = self.value(ty)?;
                self.ssa.locals[index.index() as usize] = node;
                Ok(Some(Typed { node, ty }))
            }
            Opcode::GetHeap => {
                let mem = self.mem_type(at)?;
                let index = self.value(ValueType::Int32)?;
                Ok(Some(self.emit(NodeKind::Load { mem, index }, mem.value_type())))
            }
            Opcode::SetHeap => {
                let mem = self.mem_type(at)?;
                let index = self.value(ValueType::Int32)?;
                let value = self.value(mem.value_type())?;
                self.graph
                    .add_node(self.current, NodeKind::Store { mem, index, value }, None);
                Ok(Some(Typed {
                    node: value,
                    ty: mem.value_type(),
                }))
            }
            _ => {
                if let (Some(op), Some((operand, result))) =
                    (BinaryOp::from_opcode(opcode), opcode.binary_signature())
                {
                    let lhs = self.value(operand)?;
                    let rhs = self.value(operand)?;
                    Ok(Some(self.emit(NodeKind::Binary { op, lhs, rhs }, result)))
                } else if let (Some(op), Some((operand, result))) =
                    (UnaryOp::from_opcode(opcode), opcode.unary_signature())
                {
                    let input = self.value(operand)?;
                    Ok(Some(self.emit(NodeKind::Unary { op, input }, result)))
                } else {
                    Err(DecodeError::new(
                        DecodeErrorCode::UnknownOpcode,
                        at,
                        self.pos,
                        format!("{} has no decoding", opcode.name()),
                    ))
                }
            }
        }
    }
}

fn constant(value: Value) -> NodeKind {
    match value {
        Value::I32(v) => NodeKind::Int32Constant(v),
        Value::F32(v) => NodeKind::Float32Constant(v),
        Value::F64(v) => NodeKind::Float64Constant(v),
    }
}
