//! End-to-end scenarios, each run on the Cranelift JIT and on the interpreter

use proptest::prelude::*;
use wasmgraph_bytecode::encode::*;
use wasmgraph_bytecode::{FunctionSignature, MemType, Opcode, Value, ValueType};
use wasmgraph_harness::{
    BackendKind, HarnessConfig, HarnessReport, MemoryInit, Prepared, Runner, Scenario,
    ScenarioOutcome, init_tracing,
};

const INT32_INPUTS: &[i32] = &[
    0,
    1,
    -1,
    2,
    -2,
    7,
    -7,
    0x11223344,
    0x7fff_ffff,
    -0x7fff_ffff,
    i32::MIN,
    0x3333_3333,
    0x6666_6666,
    -0x3333_3333,
    0x00ff_00ff,
    0x0f0f_0f0f,
    0x5555_5555,
    -0x5555_5555,
    0x7f7f_7f7f,
    -1_000_000,
    1_000_000,
    8192,
    -8192,
    65535,
    65536,
    -65536,
];

const HEAP_INT32: [i32; 5] = [-99999999, -88888, -7777, 6666666, 565555];

fn runners() -> Vec<Runner> {
    init_tracing();
    [BackendKind::Cranelift, BackendKind::Interpreter]
        .into_iter()
        .map(|backend| {
            Runner::new(HarnessConfig {
                backend,
                ..HarnessConfig::default()
            })
        })
        .collect()
}

/// Prepare `scenario` once per backend
fn prepare(scenario: &Scenario) -> Vec<Prepared> {
    runners()
        .iter_mut()
        .map(|runner| {
            runner
                .prepare(scenario)
                .unwrap_or_else(|e| panic!("{} on {}: {e}", scenario.name, runner.backend_name()))
        })
        .collect()
}

fn check(prepared: &Prepared, args: &[Value], expected: Value) {
    if let Err(mismatch) = prepared.check(args, expected) {
        panic!("{mismatch}");
    }
}

fn i(v: i32) -> Value {
    Value::I32(v)
}

#[test]
fn int8_const() {
    let scenario = Scenario::new("Int8Const", FunctionSignature::i_v(), return_(i8_const(121)));
    for p in prepare(&scenario) {
        check(&p, &[], i(121));
    }
}

#[test]
fn int8_const_all() {
    for value in i8::MIN..=i8::MAX {
        let scenario = Scenario::new(
            format!("Int8Const {value}"),
            FunctionSignature::i_v(),
            return_(i8_const(value)),
        );
        for p in prepare(&scenario) {
            check(&p, &[], i(i32::from(value)));
        }
    }
}

#[test]
fn int32_const() {
    let scenario = Scenario::new(
        "Int32Const",
        FunctionSignature::i_v(),
        return_(i32_const(0x11223344)),
    );
    for p in prepare(&scenario) {
        check(&p, &[], i(0x11223344));
    }
}

#[test]
fn int32_const_many() {
    for &value in INT32_INPUTS {
        let scenario = Scenario::new(
            format!("Int32Const {value}"),
            FunctionSignature::i_v(),
            return_(i32_const(value)),
        );
        for p in prepare(&scenario) {
            check(&p, &[], i(value));
        }
    }
}

#[test]
fn int32_param0() {
    let scenario = Scenario::new("Param0", FunctionSignature::i_i(), return_(get_local(0)));
    for p in prepare(&scenario) {
        for &x in INT32_INPUTS {
            check(&p, &[i(x)], i(x));
        }
    }
}

#[test]
fn int32_param1() {
    let scenario = Scenario::new("Param1", FunctionSignature::i_ii(), return_(get_local(1)));
    for p in prepare(&scenario) {
        for &x in INT32_INPUTS {
            check(&p, &[i(-111), i(x)], i(x));
        }
    }
}

#[test]
fn int32_add() {
    let scenario = Scenario::new(
        "Int32Add",
        FunctionSignature::i_v(),
        return_(i32_add(i8_const(11), i8_const(44))),
    );
    for p in prepare(&scenario) {
        check(&p, &[], i(55));
    }
}

#[test]
fn int32_add_param() {
    let scenario = Scenario::new(
        "Int32Add_P",
        FunctionSignature::i_i(),
        return_(i32_add(i8_const(13), get_local(0))),
    );
    for p in prepare(&scenario) {
        for &x in INT32_INPUTS {
            check(&p, &[i(x)], i(x.wrapping_add(13)));
        }
    }
}

#[test]
fn int32_add_two_params() {
    let scenario = Scenario::new(
        "Int32Add_P2",
        FunctionSignature::i_ii(),
        return_(i32_add(get_local(0), get_local(1))),
    );
    for p in prepare(&scenario) {
        for &x in INT32_INPUTS {
            for &y in INT32_INPUTS {
                check(&p, &[i(x), i(y)], i(x.wrapping_add(y)));
            }
        }
    }
}

#[test]
fn int32_binops() {
    let ops: [(Opcode, fn(i32, i32) -> i32); 8] = [
        (Opcode::Int32Add, i32::wrapping_add),
        (Opcode::Int32Sub, i32::wrapping_sub),
        (Opcode::Int32Mul, i32::wrapping_mul),
        (Opcode::Int32And, |a, b| a & b),
        (Opcode::Int32Ior, |a, b| a | b),
        (Opcode::Int32Xor, |a, b| a ^ b),
        (Opcode::Int32Eq, |a, b| i32::from(a == b)),
        (Opcode::Int32Slt, |a, b| i32::from(a < b)),
    ];
    for (opcode, reference) in ops {
        let scenario = Scenario::new(
            opcode.name(),
            FunctionSignature::i_ii(),
            return_(binop(opcode, get_local(0), get_local(1))),
        );
        for p in prepare(&scenario) {
            for &x in INT32_INPUTS {
                for &y in INT32_INPUTS.iter().take(8) {
                    check(&p, &[i(x), i(y)], i(reference(x, y)));
                }
            }
        }
    }
}

#[test]
fn float32_add() {
    let scenario = Scenario::new(
        "Float32Add",
        FunctionSignature::i_v(),
        return_(i32_from_f32(f32_add(f32_const(11.5), f32_const(44.5)))),
    );
    for p in prepare(&scenario) {
        check(&p, &[], i(56));
    }
}

#[test]
fn float64_add() {
    let scenario = Scenario::new(
        "Float64Add",
        FunctionSignature::i_v(),
        return_(i32_from_f64(f64_add(f64_const(13.5), f64_const(43.5)))),
    );
    for p in prepare(&scenario) {
        check(&p, &[], i(57));
    }
}

#[test]
fn float_params_and_results() {
    let scenario = Scenario::new(
        "Float32Mul",
        FunctionSignature::new([ValueType::Float32, ValueType::Float32], ValueType::Float32),
        return_(binop(Opcode::Float32Mul, get_local(0), get_local(1))),
    );
    for p in prepare(&scenario) {
        check(&p, &[Value::F32(1.5), Value::F32(-4.0)], Value::F32(-6.0));
    }
}

#[test]
fn if_else_return() {
    let scenario = Scenario::new(
        "IfThen_P",
        FunctionSignature::i_i(),
        if_else(
            get_local(0),
            return_(i8_const(11)),
            return_(i8_const(22)),
        ),
    );
    for p in prepare(&scenario) {
        for &x in INT32_INPUTS {
            check(&p, &[i(x)], i(if x != 0 { 11 } else { 22 }));
        }
    }
}

#[test]
fn block_if_return() {
    let scenario = Scenario::new(
        "Block_If_P",
        FunctionSignature::i_i(),
        block([
            if_(get_local(0), return_(i8_const(51))),
            return_(i8_const(52)),
        ]),
    );
    for p in prepare(&scenario) {
        for &x in INT32_INPUTS {
            check(&p, &[i(x)], i(if x != 0 { 51 } else { 52 }));
        }
    }
}

#[test]
fn block_if_else_assign() {
    let scenario = Scenario::new(
        "Block_IfThen_P_assign",
        FunctionSignature::i_i(),
        block([
            if_else(
                get_local(0),
                set_local(0, i8_const(71)),
                set_local(0, i8_const(72)),
            ),
            return_(get_local(0)),
        ]),
    );
    for p in prepare(&scenario) {
        for &x in INT32_INPUTS {
            check(&p, &[i(x)], i(if x != 0 { 71 } else { 72 }));
        }
    }
}

#[test]
fn block_if_assign() {
    let scenario = Scenario::new(
        "Block_If_P_assign",
        FunctionSignature::i_i(),
        block([
            if_(get_local(0), set_local(0, i8_const(61))),
            return_(get_local(0)),
        ]),
    );
    for p in prepare(&scenario) {
        for &x in INT32_INPUTS {
            check(&p, &[i(x)], i(if x != 0 { 61 } else { x }));
        }
    }
}

#[test]
fn ternary_param() {
    let scenario = Scenario::new(
        "Ternary_P",
        FunctionSignature::i_i(),
        return_(ternary(get_local(0), i8_const(11), i8_const(22))),
    );
    for p in prepare(&scenario) {
        for &x in INT32_INPUTS {
            check(&p, &[i(x)], i(if x != 0 { 11 } else { 22 }));
        }
    }
}

#[test]
fn comma_param() {
    let scenario = Scenario::new(
        "Comma_P",
        FunctionSignature::i_i(),
        return_(comma(get_local(0), i8_const(17))),
    );
    for p in prepare(&scenario) {
        for &x in INT32_INPUTS {
            check(&p, &[i(x)], i(17));
        }
    }
}

#[test]
fn count_down() {
    let scenario = Scenario::new(
        "CountDown",
        FunctionSignature::i_i(),
        block([
            loop_([
                if_(not(get_local(0)), break_(0)),
                set_local(0, i32_sub(get_local(0), i8_const(1))),
            ]),
            return_(get_local(0)),
        ]),
    );
    for p in prepare(&scenario) {
        for n in [1, 10, 100] {
            check(&p, &[i(n)], i(0));
        }
    }
}

#[test]
fn while_count_down() {
    let scenario = Scenario::new(
        "WhileCountDown",
        FunctionSignature::i_i(),
        block([
            while_(
                get_local(0),
                set_local(0, i32_sub(get_local(0), i8_const(1))),
            ),
            return_(get_local(0)),
        ]),
    );
    for p in prepare(&scenario) {
        for n in [1, 10, 100] {
            check(&p, &[i(n)], i(0));
        }
    }
}

#[test]
fn load_heap_int32_after_mutation() {
    let scenario = Scenario::new(
        "LoadHeapInt32",
        FunctionSignature::i_i(),
        return_(get_heap(MemType::Int32, i8_const(0))),
    )
    .with_memory(MemoryInit::Int32(vec![0; 5]));
    for p in prepare(&scenario) {
        let memory = p.memory().expect("scenario has memory");
        for value in [999, 888, 777] {
            memory.write_i32(0, value);
            check(&p, &[i(0)], i(value));
        }
    }
}

#[test]
fn load_heap_int32_param() {
    let scenario = Scenario::new(
        "LoadHeapInt32_P",
        FunctionSignature::i_i(),
        return_(get_heap(MemType::Int32, get_local(0))),
    )
    .with_memory(MemoryInit::Int32(HEAP_INT32.to_vec()));
    for p in prepare(&scenario) {
        for (k, &expected) in HEAP_INT32.iter().enumerate() {
            check(&p, &[i(4 * k as i32)], i(expected));
        }
    }
}

#[test]
fn load_heap_int32_every_byte_offset() {
    let scenario = Scenario::new(
        "LoadHeapInt32_P",
        FunctionSignature::i_i(),
        return_(get_heap(MemType::Int32, get_local(0))),
    )
    .with_memory(MemoryInit::Int32(HEAP_INT32.to_vec()));
    for p in prepare(&scenario) {
        let memory = p.memory().expect("scenario has memory");
        let last = memory.len() - 4;
        for offset in 0..=last {
            check(&p, &[i(offset as i32)], i(memory.read_i32(offset)));
        }
        // Rewrite the bytes and read every offset again
        for offset in (0..=last).step_by(4) {
            memory.write_i32(offset, !memory.read_i32(offset));
        }
        for offset in 0..=last {
            check(&p, &[i(offset as i32)], i(memory.read_i32(offset)));
        }
    }
}

fn heap_sum_loop(sum: u8, mem: MemType, add: Opcode) -> Vec<u8> {
    while_(
        get_local(0),
        block([
            set_local(
                sum,
                binop(add, get_local(sum), get_heap(mem, get_local(0))),
            ),
            set_local(0, i32_sub(get_local(0), i8_const(mem.size() as i8))),
        ]),
    )
}

#[test]
fn heap_int32_sum() {
    let scenario = Scenario::new(
        "HeapInt32_Sum",
        FunctionSignature::i_i(),
        block([
            heap_sum_loop(1, MemType::Int32, Opcode::Int32Add),
            return_(get_local(1)),
        ]),
    )
    .with_locals([ValueType::Int32])
    .with_memory(MemoryInit::Int32(HEAP_INT32.to_vec()));
    for p in prepare(&scenario) {
        check(&p, &[i(4 * (HEAP_INT32.len() as i32 - 1))], i(7135556));
    }
}

#[test]
fn heap_float32_sum() {
    let scenario = Scenario::new(
        "HeapFloat32_Sum",
        FunctionSignature::i_i(),
        block([
            heap_sum_loop(1, MemType::Float32, Opcode::Float32Add),
            set_heap(MemType::Float32, zero(), get_local(1)),
            return_(get_local(0)),
        ]),
    )
    .with_locals([ValueType::Float32])
    .with_memory(MemoryInit::Float32(vec![
        -99.25, -888.25, -77.25, 66666.25, 5555.25,
    ]));
    for p in prepare(&scenario) {
        check(&p, &[i(4 * 4)], i(0));
        let memory = p.memory().expect("scenario has memory");
        assert_ne!(memory.read_f32(0), -99.25);
        assert_eq!(memory.read_f32(0), 71256.0);
    }
}

#[test]
fn heap_float64_mul_fold() {
    let scenario = Scenario::new(
        "HeapFloat64_Mul",
        FunctionSignature::i_i(),
        block([
            set_local(1, get_heap(MemType::Float64, zero())),
            heap_sum_loop(1, MemType::Float64, Opcode::Float64Mul),
            set_heap(MemType::Float64, zero(), get_local(1)),
            return_(get_local(0)),
        ]),
    )
    .with_locals([ValueType::Float64])
    .with_memory(MemoryInit::Float64(vec![1.0, 2.0, 2.0, 2.0, 2.0, 2.0]));
    for p in prepare(&scenario) {
        check(&p, &[i(8 * 5)], i(0));
        assert_eq!(p.memory().map(|m| m.read_f64(0)), Some(32.0));
    }
}

#[test]
fn heap_access_without_memory_is_a_decode_failure() {
    let scenario = Scenario::new(
        "NoMemory",
        FunctionSignature::i_v(),
        return_(get_heap(MemType::Int32, zero())),
    );
    for mut runner in runners() {
        let result = runner.run_cases(&scenario, &[(vec![], i(0))]);
        assert!(
            matches!(result.outcome, ScenarioOutcome::DecodeFailure { .. }),
            "{result:?}"
        );
    }
}

#[test]
fn deeply_nested_body_is_a_decode_failure() {
    let code = return_((0..20_000).fold(get_local(0), |inner, _| not(inner)));
    let scenario = Scenario::new("DeepNot", FunctionSignature::i_i(), code);
    for mut runner in runners() {
        let result = runner.run_cases(&scenario, &[(vec![i(0)], i(1))]);
        let ScenarioOutcome::DecodeFailure { error } = &result.outcome else {
            panic!("{result:?}");
        };
        assert!(error.contains("nesting too deep"), "{error}");
    }
}

#[test]
fn decoding_twice_gives_identical_results() {
    let scenario = Scenario::new(
        "Block_If_P_assign",
        FunctionSignature::i_i(),
        block([
            if_(get_local(0), set_local(0, i8_const(61))),
            return_(get_local(0)),
        ]),
    );
    let first = prepare(&scenario);
    let second = prepare(&scenario);
    for (a, b) in first.iter().zip(&second) {
        for &x in INT32_INPUTS {
            assert_eq!(a.call(&[i(x)]), b.call(&[i(x)]));
        }
    }
}

#[test]
fn report_over_all_backends() {
    let scenarios = [
        (
            Scenario::new("Param0", FunctionSignature::i_i(), return_(get_local(0))),
            vec![(vec![i(5)], i(5))],
        ),
        (
            Scenario::new("Bad", FunctionSignature::i_v(), vec![0xff]),
            vec![(vec![], i(0))],
        ),
    ];
    let mut results = Vec::new();
    for mut runner in runners() {
        for (scenario, cases) in &scenarios {
            results.push(runner.run_cases(scenario, cases));
        }
    }
    let report = HarnessReport::from_results(&results);
    assert_eq!(report.total, 4);
    assert_eq!(report.passed, 2);
    assert_eq!(report.decode_failures, 2);
    assert_eq!(report.by_backend.len(), 2);
    let json = report.to_json().unwrap();
    assert!(json.contains("\"decode_failures\": 2"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_add_wraps(a in any::<i32>(), b in any::<i32>()) {
        let scenario = Scenario::new(
            "Int32Add_P2",
            FunctionSignature::i_ii(),
            return_(i32_add(get_local(0), get_local(1))),
        );
        for p in prepare(&scenario) {
            prop_assert_eq!(p.call(&[i(a), i(b)]), i(a.wrapping_add(b)));
        }
    }
}
