//! Test scenarios: a bytecode body plus everything needed to run it

use wasmgraph_bytecode::{Environment, FunctionSignature, LinearMemory, ValueType};

use crate::error::HarnessError;

/// Initial heap contents
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryInit {
    /// int32 elements
    Int32(Vec<i32>),
    /// float32 elements
    Float32(Vec<f32>),
    /// float64 elements
    Float64(Vec<f64>),
}

impl MemoryInit {
    /// Allocate a memory holding these elements
    pub fn to_memory(&self) -> LinearMemory {
        match self {
            Self::Int32(values) => LinearMemory::from_i32s(values),
            Self::Float32(values) => LinearMemory::from_f32s(values),
            Self::Float64(values) => LinearMemory::from_f64s(values),
        }
    }
}

/// A named function body with its signature, locals and heap
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Name used in logs and reports
    pub name: String,
    /// Function signature
    pub signature: FunctionSignature,
    /// Declared locals, allocated after the parameters in this order
    pub locals: Vec<ValueType>,
    /// Heap contents, if the body accesses the heap
    pub memory: Option<MemoryInit>,
    /// Bytecode body
    pub code: Vec<u8>,
}

impl Scenario {
    /// Create a scenario with no declared locals and no memory
    pub fn new(name: impl Into<String>, signature: FunctionSignature, code: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            signature,
            locals: Vec::new(),
            memory: None,
            code,
        }
    }

    /// Declare locals
    pub fn with_locals(mut self, locals: impl IntoIterator<Item = ValueType>) -> Self {
        self.locals.extend(locals);
        self
    }

    /// Attach heap contents
    pub fn with_memory(mut self, memory: MemoryInit) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Build the environment: allocate the declared locals and bind `memory`
    pub fn environment(&self, memory: Option<&LinearMemory>) -> Result<Environment, HarnessError> {
        let mut env = Environment::new(self.signature.clone());
        for &ty in &self.locals {
            env.allocate_local(ty)?;
        }
        if let Some(memory) = memory {
            env.bind_memory(memory.region())?;
        }
        Ok(env)
    }
}
