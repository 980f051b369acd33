//! The seam between graph building and execution.

use wasmgraph_bytecode::{FunctionSignature, Value};
use wasmgraph_graph::{Graph, NodeKind};

use crate::error::BackendError;

/// Turns a graph into something callable.
pub trait Backend {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Compile `graph`, which was built for `signature`
    fn compile(
        &mut self,
        graph: Graph,
        signature: &FunctionSignature,
    ) -> Result<Box<dyn NativeCallable>, BackendError>;
}

/// A compiled function.
///
/// A function compiled against a memory region accesses it directly; the
/// memory must outlive the callable, and nothing else may touch it during a call.
pub trait NativeCallable {
    /// Signature the function was compiled for
    fn signature(&self) -> &FunctionSignature;

    /// Call without checking `args` against the signature. Use [`invoke`].
    fn call_unchecked(&self, args: &[Value]) -> Value;
}

/// Call `callable` with `args`.
///
/// # Panics
///
/// Panics if the argument count or any argument type differs from the
/// callable's signature.
pub fn invoke(callable: &dyn NativeCallable, args: &[Value]) -> Value {
    let signature = callable.signature();
    assert_eq!(
        args.len(),
        signature.param_count(),
        "{signature} called with {} arguments",
        args.len()
    );
    for (i, (arg, &ty)) in args.iter().zip(signature.params()).enumerate() {
        assert_eq!(arg.ty(), ty, "argument {i} of {signature} has type {}", arg.ty());
    }
    callable.call_unchecked(args)
}

/// Check the structural invariants every backend relies on.
pub(crate) fn check_graph(graph: &Graph, signature: &FunctionSignature) -> Result<(), BackendError> {
    if graph.params() != signature.params() || graph.return_type() != signature.return_type() {
        return Err(BackendError::Unsupported(format!(
            "graph built for a different signature than {signature}"
        )));
    }
    for block in graph.reverse_post_order() {
        let data = graph.block(block);
        if data.terminator.is_none() {
            return Err(BackendError::Unsupported(format!(
                "reachable block {block} has no terminator"
            )));
        }
        for &node in &data.nodes {
            match &graph.node(node).kind {
                NodeKind::Phi { inputs } if inputs.len() != data.preds.len() => {
                    return Err(BackendError::Unsupported(format!(
                        "phi {node} has {} inputs for {} predecessors",
                        inputs.len(),
                        data.preds.len()
                    )));
                }
                NodeKind::Load { .. } | NodeKind::Store { .. } if graph.memory().is_none() => {
                    return Err(BackendError::Unsupported(format!(
                        "heap access {node} without a bound memory"
                    )));
                }
                _ => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmgraph_bytecode::ValueType;

    struct Constant(FunctionSignature, Value);

    impl NativeCallable for Constant {
        fn signature(&self) -> &FunctionSignature {
            &self.0
        }

        fn call_unchecked(&self, _args: &[Value]) -> Value {
            self.1
        }
    }

    #[test]
    fn test_invoke_checks_pass() {
        let f = Constant(FunctionSignature::i_i(), Value::I32(7));
        assert_eq!(invoke(&f, &[Value::I32(1)]), Value::I32(7));
    }

    #[test]
    #[should_panic(expected = "called with 2 arguments")]
    fn test_invoke_rejects_arity() {
        let f = Constant(FunctionSignature::i_i(), Value::I32(7));
        invoke(&f, &[Value::I32(1), Value::I32(2)]);
    }

    #[test]
    #[should_panic(expected = "argument 0")]
    fn test_invoke_rejects_type() {
        let f = Constant(FunctionSignature::i_i(), Value::I32(7));
        invoke(&f, &[Value::F64(1.0)]);
    }

    #[test]
    fn test_check_graph_rejects_signature_mismatch() {
        let graph = Graph::new(vec![ValueType::Float32], ValueType::Int32, None);
        assert!(matches!(
            check_graph(&graph, &FunctionSignature::i_i()),
            Err(BackendError::Unsupported(_))
        ));
    }
}
