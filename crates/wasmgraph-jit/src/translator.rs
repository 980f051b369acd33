//! Graph to Cranelift IR translation.
//!
//! The generated function has the signature `(args: ptr, ret: ptr)`. Each
//! argument occupies an 8-byte slot at `args + 8 * i` with its value bytes at
//! the start of the slot; the result is stored the same way at `ret`.
//!
//! Graph blocks map one-to-one onto Cranelift blocks and phis become block
//! parameters. Blocks are lowered in reverse post-order, so every operand is
//! defined before its use. Heap nodes address `region.start + index` directly.

use cranelift_codegen::ir::condcodes::IntCC;
use cranelift_codegen::ir::instructions::BlockArg;
use cranelift_codegen::ir::{self, InstBuilder, MemFlags, types};
use cranelift_frontend::FunctionBuilder;
use smallvec::SmallVec;
use wasmgraph_bytecode::{MemType, ValueType};
use wasmgraph_graph::{BinaryOp, BlockId, Graph, NodeId, NodeKind, Terminator, UnaryOp};

use crate::error::BackendError;

const SLOT_SIZE: i32 = 8;

/// Cranelift type of a graph value type
pub fn clif_type(ty: ValueType) -> ir::Type {
    match ty {
        ValueType::Int32 => types::I32,
        ValueType::Float32 => types::F32,
        ValueType::Float64 => types::F64,
    }
}

struct Lowering<'a, 'b> {
    builder: &'a mut FunctionBuilder<'b>,
    graph: &'a Graph,
    pointer_type: ir::Type,
    blocks: Vec<Option<ir::Block>>,
    values: Vec<Option<ir::Value>>,
    args_ptr: ir::Value,
    ret_ptr: ir::Value,
}

impl Lowering<'_, '_> {
    fn block(&self, id: BlockId) -> Result<ir::Block, BackendError> {
        self.blocks[id.index()]
            .ok_or_else(|| BackendError::Unsupported(format!("edge to unlowered block {id}")))
    }

    fn value(&self, id: NodeId) -> Result<ir::Value, BackendError> {
        self.values[id.index()]
            .ok_or_else(|| BackendError::Unsupported(format!("{id} used before definition")))
    }

    /// Block arguments for the edge `from -> to`: one per phi of `to`
    fn edge_args(&self, from: BlockId, to: BlockId) -> Result<SmallVec<[BlockArg; 4]>, BackendError> {
        let target = self.graph.block(to);
        let Some(pred) = target.pred_index(from) else {
            return Err(BackendError::Unsupported(format!(
                "{from} is not a predecessor of {to}"
            )));
        };
        let mut args = SmallVec::new();
        for &node in &target.nodes {
            match &self.graph.node(node).kind {
                NodeKind::Phi { inputs } => args.push(BlockArg::Value(self.value(inputs[pred])?)),
                _ => break,
            }
        }
        Ok(args)
    }

    fn heap_address(&mut self, index: NodeId) -> Result<ir::Value, BackendError> {
        let Some(region) = self.graph.memory() else {
            return Err(BackendError::Unsupported("heap access without memory".into()));
        };
        let index = self.value(index)?;
        let offset = if self.pointer_type == types::I32 {
            index
        } else {
            self.builder.ins().uextend(self.pointer_type, index)
        };
        let base = self
            .builder
            .ins()
            .iconst(self.pointer_type, region.start() as i64);
        Ok(self.builder.ins().iadd(base, offset))
    }

    fn lower_node(&mut self, id: NodeId) -> Result<(), BackendError> {
        let graph = self.graph;
        let node = graph.node(id);
        let value = match &node.kind {
            // Lowered as block parameters
            NodeKind::Phi { .. } => return Ok(()),
            NodeKind::Parameter { index } => {
                let ty = clif_type(graph.params()[*index as usize]);
                let offset = *index as i32 * SLOT_SIZE;
                self.builder
                    .ins()
                    .load(ty, MemFlags::trusted(), self.args_ptr, offset)
            }
            NodeKind::Int32Constant(v) => self.builder.ins().iconst(types::I32, i64::from(*v as u32)),
            NodeKind::Float32Constant(v) => self.builder.ins().f32const(*v),
            NodeKind::Float64Constant(v) => self.builder.ins().f64const(*v),
            NodeKind::Binary { op, lhs, rhs } => {
                let (l, r) = (self.value(*lhs)?, self.value(*rhs)?);
                let ins = self.builder.ins();
                match op {
                    BinaryOp::I32Add => ins.iadd(l, r),
                    BinaryOp::I32Sub => ins.isub(l, r),
                    BinaryOp::I32Mul => ins.imul(l, r),
                    BinaryOp::I32And => ins.band(l, r),
                    BinaryOp::I32Ior => ins.bor(l, r),
                    BinaryOp::I32Xor => ins.bxor(l, r),
                    BinaryOp::I32Eq | BinaryOp::I32Slt => {
                        let cc = if *op == BinaryOp::I32Eq {
                            IntCC::Equal
                        } else {
                            IntCC::SignedLessThan
                        };
                        let flag = ins.icmp(cc, l, r);
                        self.builder.ins().uextend(types::I32, flag)
                    }
                    BinaryOp::F32Add | BinaryOp::F64Add => ins.fadd(l, r),
                    BinaryOp::F32Sub | BinaryOp::F64Sub => ins.fsub(l, r),
                    BinaryOp::F32Mul | BinaryOp::F64Mul => ins.fmul(l, r),
                }
            }
            NodeKind::Unary { op, input } => {
                let x = self.value(*input)?;
                match op {
                    UnaryOp::I32Eqz => {
                        let flag = self.builder.ins().icmp_imm(IntCC::Equal, x, 0);
                        self.builder.ins().uextend(types::I32, flag)
                    }
                    UnaryOp::I32TruncF32 | UnaryOp::I32TruncF64 => {
                        self.builder.ins().fcvt_to_sint_sat(types::I32, x)
                    }
                    UnaryOp::F64ConvertI32 => self.builder.ins().fcvt_from_sint(types::F64, x),
                }
            }
            NodeKind::Load { mem, index } => {
                let addr = self.heap_address(*index)?;
                let ty = clif_type(MemType::value_type(*mem));
                self.builder.ins().load(ty, MemFlags::new(), addr, 0)
            }
            NodeKind::Store { index, value, .. } => {
                let addr = self.heap_address(*index)?;
                let v = self.value(*value)?;
                self.builder.ins().store(MemFlags::new(), v, addr, 0);
                return Ok(());
            }
        };
        self.values[id.index()] = Some(value);
        Ok(())
    }

    fn lower_terminator(&mut self, block: BlockId) -> Result<(), BackendError> {
        let Some(terminator) = self.graph.block(block).terminator else {
            return Err(BackendError::Unsupported(format!("{block} has no terminator")));
        };
        match terminator {
            Terminator::Jump(target) => {
                let args = self.edge_args(block, target)?;
                let target = self.block(target)?;
                self.builder.ins().jump(target, &args);
            }
            Terminator::Branch {
                cond,
                if_true,
                if_false,
            } => {
                let cond = self.value(cond)?;
                let then_args = self.edge_args(block, if_true)?;
                let else_args = self.edge_args(block, if_false)?;
                let (then_block, else_block) = (self.block(if_true)?, self.block(if_false)?);
                self.builder
                    .ins()
                    .brif(cond, then_block, &then_args, else_block, &else_args);
            }
            Terminator::Return(value) => {
                let value = self.value(value)?;
                self.builder
                    .ins()
                    .store(MemFlags::trusted(), value, self.ret_ptr, 0);
                self.builder.ins().return_(&[]);
            }
        }
        Ok(())
    }
}

/// Translate `graph` into the function under construction in `builder`.
///
/// `pointer_type` is the target's pointer type; the function signature must
/// already hold two parameters of that type.
pub fn translate_graph(
    builder: &mut FunctionBuilder<'_>,
    graph: &Graph,
    pointer_type: ir::Type,
) -> Result<(), BackendError> {
    let order = graph.reverse_post_order();
    let mut blocks = vec![None; graph.block_count()];
    let mut values = vec![None; graph.node_count()];

    for &id in &order {
        let block = builder.create_block();
        if id == graph.entry() {
            builder.append_block_params_for_function_params(block);
        }
        for &node in &graph.block(id).nodes {
            let data = graph.node(node);
            if !data.kind.is_phi() {
                break;
            }
            if let Some(ty) = data.ty {
                values[node.index()] = Some(builder.append_block_param(block, clif_type(ty)));
            }
        }
        blocks[id.index()] = Some(block);
    }

    let Some(entry) = blocks[graph.entry().index()] else {
        return Err(BackendError::Unsupported("graph has no entry block".into()));
    };
    let (args_ptr, ret_ptr) = match builder.block_params(entry) {
        &[args, ret] => (args, ret),
        params => {
            return Err(BackendError::Unsupported(format!(
                "entry expects 2 pointer parameters, found {}",
                params.len()
            )));
        }
    };

    let mut lowering = Lowering {
        builder,
        graph,
        pointer_type,
        blocks,
        values,
        args_ptr,
        ret_ptr,
    };

    for &id in &order {
        let block = lowering.block(id)?;
        lowering.builder.switch_to_block(block);
        for &node in &graph.block(id).nodes {
            lowering.lower_node(node)?;
        }
        lowering.lower_terminator(id)?;
    }

    lowering.builder.seal_all_blocks();
    Ok(())
}
