//! Structural tests for graph building

use proptest::prelude::*;
use wasmgraph_bytecode::encode::*;
use wasmgraph_bytecode::{Environment, FunctionSignature, LinearMemory, MemType, ValueType};
use wasmgraph_graph::{DecodeErrorCode, Graph, NodeKind, build_graph};

/// Every reachable block is terminated, phis come first, and each phi has one
/// input per predecessor.
fn assert_well_formed(graph: &Graph) {
    for block in graph.reverse_post_order() {
        let data = graph.block(block);
        assert!(data.terminator.is_some(), "{block} is unterminated\n{graph}");
        let mut seen_non_phi = false;
        for &node in &data.nodes {
            let n = graph.node(node);
            assert_eq!(n.block, block);
            match &n.kind {
                NodeKind::Phi { inputs } => {
                    assert!(!seen_non_phi, "phi {node} after a non-phi\n{graph}");
                    assert_eq!(inputs.len(), data.preds.len(), "phi {node} arity\n{graph}");
                }
                _ => seen_non_phi = true,
            }
        }
    }
}

fn count_down() -> Vec<u8> {
    block([
        loop_([
            if_(
                get_local(0),
                set_local(0, i32_sub(get_local(0), i8_const(1))),
            ),
            if_(not(get_local(0)), break_(0)),
        ]),
        return_(get_local(0)),
    ])
}

#[test]
fn test_building_twice_is_deterministic() {
    let env = Environment::new(FunctionSignature::i_i());
    let code = count_down();
    let first = build_graph(&code, &env).unwrap();
    let second = build_graph(&code, &env).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
    assert_well_formed(&first);
}

#[test]
fn test_missing_memory_is_rejected() {
    let env = Environment::new(FunctionSignature::i_v());
    let code = return_(get_heap(MemType::Int32, zero()));
    let err = build_graph(&code, &env).unwrap_err();
    assert_eq!(err.code, DecodeErrorCode::MissingMemory);
    assert_eq!(err.opcode_offset, 2);
}

#[test]
fn test_heap_sum_loop_is_well_formed() {
    let memory = LinearMemory::from_i32s(&[1, 2, 3, 4]);
    let mut env = Environment::new(FunctionSignature::i_i());
    let sum = env.allocate_local(ValueType::Int32).unwrap().index();
    env.bind_memory(memory.region()).unwrap();
    let code = block([
        while_(
            get_local(0),
            block([
                set_local(
                    sum,
                    i32_add(get_local(sum), get_heap(MemType::Int32, get_local(0))),
                ),
                set_local(0, i32_sub(get_local(0), i8_const(4))),
            ]),
        ),
        return_(get_local(sum)),
    ]);
    let graph = build_graph(&code, &env).unwrap();
    assert_well_formed(&graph);
    let loads = graph
        .reverse_post_order()
        .into_iter()
        .flat_map(|b| graph.block(b).nodes.clone())
        .filter(|&n| matches!(graph.node(n).kind, NodeKind::Load { .. }))
        .count();
    assert_eq!(loads, 1);
}

#[test]
fn test_nested_breaks_are_well_formed() {
    let code = block([
        block([
            if_else(get_local(0), break_(0), set_local(1, i8_const(5))),
            set_local(1, i32_add(get_local(1), get_local(1))),
        ]),
        return_(get_local(1)),
    ]);
    let graph = build_graph(&code, &Environment::new(FunctionSignature::i_ii())).unwrap();
    assert_well_formed(&graph);
    // The break and the fall-through both reach the return with different p1
    let (_, value) = graph.returns()[0];
    let NodeKind::Phi { inputs } = &graph.node(value).kind else {
        panic!("expected a phi\n{graph}");
    };
    assert_eq!(inputs.len(), 2);
}

#[test]
fn test_break_past_return_falls_through() {
    // Leaving the outer block skips the only return
    let code = block([
        loop_([if_(not(get_local(0)), break_(1))]),
        return_(get_local(0)),
    ]);
    let err = build_graph(&code, &Environment::new(FunctionSignature::i_i())).unwrap_err();
    assert_eq!(err.code, DecodeErrorCode::FallThrough);
}

fn arb_int_expr() -> impl Strategy<Value = Vec<u8>> {
    let leaf = prop_oneof![
        any::<i8>().prop_map(i8_const),
        any::<i32>().prop_map(i32_const),
        (0u8..2).prop_map(get_local),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| i32_add(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| i32_sub(a, b)),
            (0u8..2, inner.clone()).prop_map(|(i, v)| set_local(i, v)),
            inner.clone().prop_map(not),
            (inner.clone(), inner.clone(), inner.clone()).prop_map(|(c, a, b)| ternary(c, a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| comma(a, b)),
            (inner.clone(), inner).prop_map(|(c, v)| comma(if_(c, set_local(0, v)), get_local(0))),
        ]
    })
}

proptest! {
    #[test]
    fn prop_int_expressions_build_well_formed_graphs(expr in arb_int_expr()) {
        let env = Environment::new(FunctionSignature::i_ii());
        let graph = build_graph(&return_(expr), &env).unwrap();
        assert_well_formed(&graph);
        prop_assert_eq!(graph.returns().len(), 1);
    }

    #[test]
    fn prop_int32_constant_is_preserved(v in any::<i32>()) {
        let env = Environment::new(FunctionSignature::i_v());
        let graph = build_graph(&return_(i32_const(v)), &env).unwrap();
        let (_, value) = graph.returns()[0];
        prop_assert_eq!(&graph.node(value).kind, &NodeKind::Int32Constant(v));
    }
}
