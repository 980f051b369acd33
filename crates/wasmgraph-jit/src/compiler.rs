//! Cranelift-backed JIT compiler.

use cranelift_codegen::ir::{AbiParam, UserFuncName};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{Linkage, Module, default_libcall_names};
use smallvec::SmallVec;
use wasmgraph_bytecode::{FunctionSignature, Value};
use wasmgraph_graph::Graph;

use crate::backend::{Backend, NativeCallable, check_graph};
use crate::error::BackendError;
use crate::translator;

/// Cranelift optimisation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    /// No optimisation
    None,
    /// Optimise for speed
    #[default]
    Speed,
    /// Optimise for speed and code size
    SpeedAndSize,
}

impl OptLevel {
    /// Cranelift setting value
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Speed => "speed",
            Self::SpeedAndSize => "speed_and_size",
        }
    }
}

/// Code generation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitOptions {
    /// Optimisation level
    pub opt_level: OptLevel,
    /// Run the Cranelift verifier on generated IR before compiling it
    pub verify_ir: bool,
}

impl Default for JitOptions {
    fn default() -> Self {
        Self {
            opt_level: OptLevel::Speed,
            verify_ir: true,
        }
    }
}

/// Compiles graphs to native code.
///
/// Every compiled function lives in its own [`JITModule`], owned by the
/// returned callable and freed when it is dropped.
pub struct JitCompiler {
    options: JitOptions,
    function_builder_ctx: FunctionBuilderContext,
    next_function_id: u64,
}

impl JitCompiler {
    /// Create a compiler with default options.
    pub fn new() -> Self {
        Self::with_options(JitOptions::default())
    }

    /// Create a compiler with the given options.
    pub fn with_options(options: JitOptions) -> Self {
        Self {
            options,
            function_builder_ctx: FunctionBuilderContext::new(),
            next_function_id: 0,
        }
    }

    /// Options in effect
    pub fn options(&self) -> JitOptions {
        self.options
    }

    fn make_module(&self) -> Result<JITModule, BackendError> {
        let mut flag_builder = settings::builder();
        flag_builder
            .set("opt_level", self.options.opt_level.as_str())
            .map_err(|e| BackendError::Builder(e.to_string()))?;
        let isa = cranelift_native::builder()
            .map_err(|e| BackendError::Builder(e.to_string()))?
            .finish(settings::Flags::new(flag_builder))
            .map_err(|e| BackendError::Builder(e.to_string()))?;
        Ok(JITModule::new(JITBuilder::with_isa(
            isa,
            default_libcall_names(),
        )))
    }
}

impl Default for JitCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for JitCompiler {
    fn name(&self) -> &'static str {
        "cranelift"
    }

    fn compile(
        &mut self,
        graph: Graph,
        signature: &FunctionSignature,
    ) -> Result<Box<dyn NativeCallable>, BackendError> {
        check_graph(&graph, signature)?;
        let mut module = self.make_module()?;
        let pointer_type = module.target_config().pointer_type();

        let mut clif_signature = module.make_signature();
        // Signature: (args_ptr, ret_ptr) -> ()
        clif_signature.params.push(AbiParam::new(pointer_type));
        clif_signature.params.push(AbiParam::new(pointer_type));

        let name = format!("wasmgraph_fn_{}", self.next_function_id);
        self.next_function_id = self.next_function_id.saturating_add(1);
        let func_id = module.declare_function(&name, Linkage::Local, &clif_signature)?;

        let mut context = module.make_context();
        context.func = cranelift_codegen::ir::Function::with_name_signature(
            UserFuncName::user(0, func_id.as_u32()),
            clif_signature,
        );

        {
            let mut builder = FunctionBuilder::new(&mut context.func, &mut self.function_builder_ctx);
            translator::translate_graph(&mut builder, &graph, pointer_type)?;
            builder.finalize();
        }

        if self.options.verify_ir {
            cranelift_codegen::verify_function(&context.func, module.isa())
                .map_err(|e| BackendError::Verifier(e.to_string()))?;
        }

        module.define_function(func_id, &mut context)?;
        let code_size = context
            .compiled_code()
            .map(|code| code.code_buffer().len())
            .unwrap_or(0);
        module.clear_context(&mut context);
        module.finalize_definitions()?;

        let code_ptr = module.get_finalized_function(func_id);
        tracing::debug!(
            target: "wasmgraph::jit",
            function = %name,
            signature = %signature,
            blocks = graph.block_count(),
            code_size,
            opt_level = self.options.opt_level.as_str(),
            "compiled"
        );

        Ok(Box::new(JitFunction {
            module: Some(module),
            code_ptr,
            signature: signature.clone(),
        }))
    }
}

/// Native code produced by [`JitCompiler`].
pub struct JitFunction {
    module: Option<JITModule>,
    code_ptr: *const u8,
    signature: FunctionSignature,
}

impl NativeCallable for JitFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn call_unchecked(&self, args: &[Value]) -> Value {
        let slots: SmallVec<[u64; 4]> = args.iter().map(|arg| arg.to_slot()).collect();
        let mut ret = 0u64;
        let func: extern "C" fn(*const u64, *mut u64) = unsafe {
            // SAFETY: `code_ptr` was finalized by this function's module with
            // signature `(args_ptr, ret_ptr) -> ()`, and the module is alive.
            std::mem::transmute(self.code_ptr)
        };
        func(slots.as_ptr(), &mut ret);
        Value::from_slot(self.signature.return_type(), ret)
    }
}

impl Drop for JitFunction {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            // SAFETY: the only pointer into this module is `code_ptr`, which
            // dies with `self`.
            unsafe { module.free_memory() };
        }
    }
}
