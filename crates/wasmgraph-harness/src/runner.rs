//! Scenario runner: environment → graph → backend → calls

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use wasmgraph_bytecode::{LinearMemory, Value, disasm};
use wasmgraph_graph::build_graph;
use wasmgraph_jit::{Backend, NativeCallable, invoke};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::scenario::Scenario;

/// Argument tuple and expected result of one call
pub type Case = (Vec<Value>, Value);

/// A call returned something other than the expected value
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{scenario}: called with {} expected {expected}, got {actual}\n{disassembly}", ArgList(.args))]
pub struct Mismatch {
    /// Scenario name
    pub scenario: String,
    /// Disassembled body
    pub disassembly: String,
    /// Arguments passed
    pub args: Vec<Value>,
    /// Expected result
    pub expected: Value,
    /// Actual result
    pub actual: Value,
}

struct ArgList<'a>(&'a [Value]);

impl fmt::Display for ArgList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

/// Outcome of running a scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    /// Every case returned the expected value
    Pass,
    /// A case returned the wrong value
    Fail {
        /// The first mismatching case
        mismatch: Mismatch,
    },
    /// The body did not decode (or its environment could not be built)
    DecodeFailure {
        /// Error message
        error: String,
    },
    /// The backend rejected the graph
    BackendFailure {
        /// Error message
        error: String,
    },
}

/// Result of [`Runner::run_cases`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Backend name
    pub backend: String,
    /// Number of cases executed
    pub cases_run: usize,
    /// Outcome
    #[serde(flatten)]
    pub outcome: ScenarioOutcome,
}

impl ScenarioResult {
    /// Whether the scenario passed
    pub fn passed(&self) -> bool {
        self.outcome == ScenarioOutcome::Pass
    }
}

/// A compiled scenario together with the memory it addresses.
///
/// The callable holds the memory's address, so both live and die together.
/// Each call has the memory to itself; the heap may be read or rewritten through
/// [`Prepared::memory`] between calls.
pub struct Prepared {
    name: String,
    disassembly: String,
    callable: Box<dyn NativeCallable>,
    memory: Option<LinearMemory>,
}

impl Prepared {
    /// Scenario name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Disassembled body
    pub fn disassembly(&self) -> &str {
        &self.disassembly
    }

    /// Call the compiled function. Panics on an argument list that does not
    /// match the signature.
    pub fn call(&self, args: &[Value]) -> Value {
        invoke(self.callable.as_ref(), args)
    }

    /// Call and compare against `expected`
    pub fn check(&self, args: &[Value], expected: Value) -> Result<(), Mismatch> {
        let actual = self.call(args);
        if actual == expected || actual.bit_eq(expected) {
            return Ok(());
        }
        Err(Mismatch {
            scenario: self.name.clone(),
            disassembly: self.disassembly.clone(),
            args: args.to_vec(),
            expected,
            actual,
        })
    }

    /// Heap contents
    pub fn memory(&self) -> Option<&LinearMemory> {
        self.memory.as_ref()
    }
}

/// Runs scenarios against one backend
pub struct Runner {
    backend: Box<dyn Backend>,
    config: HarnessConfig,
}

impl Runner {
    /// Create a runner using the backend named in `config`
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            backend: config.make_backend(),
            config,
        }
    }

    /// Create a runner with an explicit backend
    pub fn with_backend(backend: Box<dyn Backend>, config: HarnessConfig) -> Self {
        Self { backend, config }
    }

    /// Backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Configuration in effect
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Decode and compile `scenario`
    pub fn prepare(&mut self, scenario: &Scenario) -> Result<Prepared, HarnessError> {
        let memory = scenario.memory.as_ref().map(|init| init.to_memory());
        let env = scenario.environment(memory.as_ref())?;
        let disassembly = disasm::disassemble(&scenario.code)
            .unwrap_or_else(|e| format!("{}\n<{e}>", disasm::hex(&scenario.code)));

        let graph = build_graph(&scenario.code, &env)?;
        if self.config.trace_graph {
            tracing::debug!(
                target: "wasmgraph::harness",
                scenario = %scenario.name,
                "\n{disassembly}\n{graph}"
            );
        }

        let callable = self.backend.compile(graph, env.signature())?;
        Ok(Prepared {
            name: scenario.name.clone(),
            disassembly,
            callable,
            memory,
        })
    }

    /// Prepare `scenario` and run every case, stopping at the first mismatch
    pub fn run_cases(&mut self, scenario: &Scenario, cases: &[Case]) -> ScenarioResult {
        let backend = self.backend_name().to_string();
        let mut cases_run = 0;
        let outcome = match self.prepare(scenario) {
            Err(HarnessError::Backend(e)) => ScenarioOutcome::BackendFailure {
                error: e.to_string(),
            },
            Err(e) => ScenarioOutcome::DecodeFailure {
                error: e.to_string(),
            },
            Ok(prepared) => {
                let mut outcome = ScenarioOutcome::Pass;
                for (args, expected) in cases {
                    cases_run += 1;
                    if let Err(mismatch) = prepared.check(args, *expected) {
                        outcome = ScenarioOutcome::Fail { mismatch };
                        break;
                    }
                }
                outcome
            }
        };

        match &outcome {
            ScenarioOutcome::Pass => {
                tracing::debug!(target: "wasmgraph::harness", scenario = %scenario.name, %backend, cases_run, "pass");
            }
            other => {
                tracing::warn!(target: "wasmgraph::harness", scenario = %scenario.name, %backend, cases_run, outcome = ?other, "scenario failed");
            }
        }

        ScenarioResult {
            name: scenario.name.clone(),
            backend,
            cases_run,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmgraph_bytecode::encode::*;
    use wasmgraph_bytecode::{FunctionSignature, MemType};
    use wasmgraph_jit::GraphInterpreter;

    fn interpreter() -> Runner {
        Runner::with_backend(Box::new(GraphInterpreter::new()), HarnessConfig::default())
    }

    #[test]
    fn test_run_cases_pass() {
        let scenario = Scenario::new("param0", FunctionSignature::i_i(), return_(get_local(0)));
        let result = interpreter().run_cases(
            &scenario,
            &[(vec![Value::I32(3)], Value::I32(3)), (vec![Value::I32(-9)], Value::I32(-9))],
        );
        assert!(result.passed());
        assert_eq!(result.cases_run, 2);
        assert_eq!(result.backend, "interpreter");
    }

    #[test]
    fn test_run_cases_stops_at_mismatch() {
        let scenario = Scenario::new("const", FunctionSignature::i_v(), return_(i8_const(5)));
        let result = interpreter().run_cases(
            &scenario,
            &[(vec![], Value::I32(6)), (vec![], Value::I32(5))],
        );
        assert_eq!(result.cases_run, 1);
        let ScenarioOutcome::Fail { mismatch } = result.outcome else {
            panic!("expected a mismatch");
        };
        assert_eq!(mismatch.actual, Value::I32(5));
        assert!(mismatch.disassembly.contains("Int8Const 5"));
        assert!(mismatch.to_string().starts_with("const: called with () expected 6:i32, got 5:i32"));
    }

    #[test]
    fn test_decode_failure_is_recorded() {
        let scenario = Scenario::new(
            "no memory",
            FunctionSignature::i_v(),
            return_(get_heap(MemType::Int32, zero())),
        );
        let result = interpreter().run_cases(&scenario, &[(vec![], Value::I32(0))]);
        assert_eq!(result.cases_run, 0);
        assert!(matches!(result.outcome, ScenarioOutcome::DecodeFailure { .. }));
    }

    #[test]
    fn test_undecodable_body_still_disassembles_as_hex() {
        let scenario = Scenario::new("junk", FunctionSignature::i_v(), vec![0xff]);
        assert!(matches!(
            interpreter().prepare(&scenario),
            Err(HarnessError::Decode(_))
        ));
    }
}
