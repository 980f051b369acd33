//! Graph interpreter backend.
//!
//! Executes the graph block by block with the same semantics as the JIT:
//! wrapping int32 arithmetic, saturating float to int conversion and
//! native-endian heap access. Phis are evaluated on block entry from the
//! edge that was taken.

use smallvec::SmallVec;
use wasmgraph_bytecode::{FunctionSignature, MemType, MemoryRegion, Value};
use wasmgraph_graph::{BinaryOp, BlockId, Graph, NodeId, NodeKind, Terminator, UnaryOp};

use crate::backend::{Backend, NativeCallable, check_graph};
use crate::error::BackendError;

/// Backend that keeps the graph and walks it on every call.
#[derive(Debug, Default)]
pub struct GraphInterpreter;

impl GraphInterpreter {
    /// Create an interpreter backend
    pub fn new() -> Self {
        Self
    }
}

impl Backend for GraphInterpreter {
    fn name(&self) -> &'static str {
        "interpreter"
    }

    fn compile(
        &mut self,
        graph: Graph,
        signature: &FunctionSignature,
    ) -> Result<Box<dyn NativeCallable>, BackendError> {
        check_graph(&graph, signature)?;
        tracing::debug!(
            target: "wasmgraph::interp",
            signature = %signature,
            blocks = graph.block_count(),
            nodes = graph.node_count(),
            "prepared"
        );
        Ok(Box::new(InterpretedFunction {
            graph,
            signature: signature.clone(),
        }))
    }
}

/// A graph ready to be interpreted
#[derive(Debug)]
pub struct InterpretedFunction {
    graph: Graph,
    signature: FunctionSignature,
}

impl NativeCallable for InterpretedFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn call_unchecked(&self, args: &[Value]) -> Value {
        Frame {
            graph: &self.graph,
            args,
            values: vec![Value::I32(0); self.graph.node_count()],
        }
        .run()
    }
}

struct Frame<'a> {
    graph: &'a Graph,
    args: &'a [Value],
    values: Vec<Value>,
}

fn int(v: Value) -> i32 {
    match v {
        Value::I32(x) => x,
        other => unreachable!("expected int32, found {other}"),
    }
}

fn float32(v: Value) -> f32 {
    match v {
        Value::F32(x) => x,
        other => unreachable!("expected float32, found {other}"),
    }
}

fn float64(v: Value) -> f64 {
    match v {
        Value::F64(x) => x,
        other => unreachable!("expected float64, found {other}"),
    }
}

fn heap_address(region: Option<MemoryRegion>, offset: i32, mem: MemType) -> usize {
    let Some(region) = region else {
        unreachable!("heap access without memory");
    };
    let offset = offset as u32;
    assert!(
        region.contains(offset, mem),
        "heap access at offset {offset} of {} bytes is outside the {}-byte memory",
        mem.size(),
        region.len()
    );
    region.start() + offset as usize
}

impl Frame<'_> {
    fn get(&self, id: NodeId) -> Value {
        self.values[id.index()]
    }

    fn run(mut self) -> Value {
        let graph = self.graph;
        let mut block = graph.entry();
        let mut pred: Option<BlockId> = None;
        loop {
            let data = graph.block(block);
            if let Some(pred) = pred {
                self.enter_phis(block, pred);
            }
            for &node in &data.nodes {
                self.eval(node);
            }
            let Some(terminator) = data.terminator else {
                unreachable!("{block} has no terminator");
            };
            match terminator {
                Terminator::Jump(target) => {
                    pred = Some(block);
                    block = target;
                }
                Terminator::Branch {
                    cond,
                    if_true,
                    if_false,
                } => {
                    pred = Some(block);
                    block = if int(self.get(cond)) != 0 {
                        if_true
                    } else {
                        if_false
                    };
                }
                Terminator::Return(value) => return self.get(value),
            }
        }
    }

    /// Assign every phi of `block` from the `pred` edge, all at once
    fn enter_phis(&mut self, block: BlockId, pred: BlockId) {
        let graph = self.graph;
        let data = graph.block(block);
        let Some(edge) = data.pred_index(pred) else {
            unreachable!("{pred} is not a predecessor of {block}");
        };
        let incoming: SmallVec<[(NodeId, Value); 4]> = data
            .nodes
            .iter()
            .map_while(|&node| match &graph.node(node).kind {
                NodeKind::Phi { inputs } => Some((node, self.get(inputs[edge]))),
                _ => None,
            })
            .collect();
        for (node, value) in incoming {
            self.values[node.index()] = value;
        }
    }

    fn eval(&mut self, id: NodeId) {
        let graph = self.graph;
        let value = match &graph.node(id).kind {
            NodeKind::Phi { .. } => return,
            NodeKind::Parameter { index } => self.args[*index as usize],
            NodeKind::Int32Constant(v) => Value::I32(*v),
            NodeKind::Float32Constant(v) => Value::F32(*v),
            NodeKind::Float64Constant(v) => Value::F64(*v),
            NodeKind::Binary { op, lhs, rhs } => binary(*op, self.get(*lhs), self.get(*rhs)),
            NodeKind::Unary { op, input } => unary(*op, self.get(*input)),
            NodeKind::Load { mem, index } => {
                let addr = heap_address(graph.memory(), int(self.get(*index)), *mem);
                // SAFETY: the address lies inside the bound region, which the
                // caller keeps alive and untouched while the function runs.
                unsafe {
                    match mem {
                        MemType::Int32 => Value::I32((addr as *const i32).read_unaligned()),
                        MemType::Float32 => Value::F32((addr as *const f32).read_unaligned()),
                        MemType::Float64 => Value::F64((addr as *const f64).read_unaligned()),
                    }
                }
            }
            NodeKind::Store { mem, index, value } => {
                let addr = heap_address(graph.memory(), int(self.get(*index)), *mem);
                let value = self.get(*value);
                // SAFETY: as for loads; `LinearMemory` keeps its bytes in cells,
                // so writing through an address taken from `&self` is allowed.
                unsafe {
                    match mem {
                        MemType::Int32 => (addr as *mut i32).write_unaligned(int(value)),
                        MemType::Float32 => (addr as *mut f32).write_unaligned(float32(value)),
                        MemType::Float64 => (addr as *mut f64).write_unaligned(float64(value)),
                    }
                }
                return;
            }
        };
        self.values[id.index()] = value;
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Value {
    match op {
        BinaryOp::I32Add => Value::I32(int(lhs).wrapping_add(int(rhs))),
        BinaryOp::I32Sub => Value::I32(int(lhs).wrapping_sub(int(rhs))),
        BinaryOp::I32Mul => Value::I32(int(lhs).wrapping_mul(int(rhs))),
        BinaryOp::I32And => Value::I32(int(lhs) & int(rhs)),
        BinaryOp::I32Ior => Value::I32(int(lhs) | int(rhs)),
        BinaryOp::I32Xor => Value::I32(int(lhs) ^ int(rhs)),
        BinaryOp::I32Eq => Value::I32(i32::from(int(lhs) == int(rhs))),
        BinaryOp::I32Slt => Value::I32(i32::from(int(lhs) < int(rhs))),
        BinaryOp::F32Add => Value::F32(float32(lhs) + float32(rhs)),
        BinaryOp::F32Sub => Value::F32(float32(lhs) - float32(rhs)),
        BinaryOp::F32Mul => Value::F32(float32(lhs) * float32(rhs)),
        BinaryOp::F64Add => Value::F64(float64(lhs) + float64(rhs)),
        BinaryOp::F64Sub => Value::F64(float64(lhs) - float64(rhs)),
        BinaryOp::F64Mul => Value::F64(float64(lhs) * float64(rhs)),
    }
}

fn unary(op: UnaryOp, input: Value) -> Value {
    match op {
        UnaryOp::I32Eqz => Value::I32(i32::from(int(input) == 0)),
        // `as` saturates and maps NaN to 0
        UnaryOp::I32TruncF32 => Value::I32(float32(input) as i32),
        UnaryOp::I32TruncF64 => Value::I32(float64(input) as i32),
        UnaryOp::F64ConvertI32 => Value::F64(f64::from(int(input))),
    }
}
