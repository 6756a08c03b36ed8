//! Execution engine, translation cache and dispatch loop
//!
//! One MCJIT execution engine serves the whole run. Every block is
//! translated into its own module, verified, handed to the engine,
//! and looked up by name; the resulting function is cached by guest
//! entry pc. The cache is append-only: there is no invalidation, so
//! self-modifying guest code is unsupported.
//!
//! The six memory helper symbols (read8..write32) referenced by
//! block modules resolve against an LLVM IR module supplied at
//! construction time and added to the engine alongside the blocks.
//! [`Jit::with_native_memory`] instead maps the helpers onto the
//! in-process Rust implementations, for embedders and tests that
//! have no IR module at hand. The ecall helper is always native.

use std::collections::HashMap;
use std::path::Path;

use inkwell::context::Context;
use inkwell::execution_engine::{ExecutionEngine, JitFunction};
use inkwell::memory_buffer::MemoryBuffer;
use inkwell::module::Module;
use inkwell::targets::{InitializationConfig, Target};
use inkwell::OptimizationLevel;
use thiserror::Error;

use crate::cpu::CpuState;
use crate::memory::{self, MemoryImage};
use crate::syscall;
use crate::translate::{self, TranslateError};

/// Signature of a translated block
pub type BlockFn = unsafe extern "C" fn(*mut CpuState);

#[derive(Debug, Error)]
pub enum JitError {
    #[error("failed to initialise native target: {0}")]
    Target(String),
    #[error("failed to create execution engine: {0}")]
    Engine(String),
    #[error("failed to load memory helper module: {0}")]
    MemoryImpl(String),
    #[error("translated module failed verification: {0}")]
    InvalidModule(String),
    #[error("could not add module to execution engine")]
    AddModule,
    #[error("translated block not found in execution engine: {0}")]
    Lookup(String),
    #[error(transparent)]
    Translate(#[from] TranslateError),
}

/// Why the dispatch loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The guest requested exit with this code
    Exited(i32),
    /// The block budget given to [`Jit::run`] was used up
    BlockBudget,
}

/// Point the helper declarations of a freshly added module at the
/// native implementations. Must happen before the engine compiles
/// the module.
fn register_native_helpers<'ctx>(
    engine: &ExecutionEngine<'ctx>,
    module: &Module<'ctx>,
    include_memory: bool,
) {
    let mut helpers: Vec<(&str, usize)> =
        vec![("ecall", syscall::host_ecall as usize)];
    if include_memory {
        helpers.extend_from_slice(&[
            ("read8", memory::host_read8 as usize),
            ("read16", memory::host_read16 as usize),
            ("read32", memory::host_read32 as usize),
            ("write8", memory::host_write8 as usize),
            ("write16", memory::host_write16 as usize),
            ("write32", memory::host_write32 as usize),
        ]);
    }
    for (name, addr) in helpers {
        if let Some(declaration) = module.get_function(name) {
            engine.add_global_mapping(&declaration, addr);
        }
    }
}

/// Owns the execution engine and the translated-block cache, and
/// drives guest execution
pub struct Jit<'ctx> {
    context: &'ctx Context,
    engine: ExecutionEngine<'ctx>,
    cache: HashMap<u32, JitFunction<'ctx, BlockFn>>,
    native_memory_helpers: bool,
    threshold: usize,
    debug: bool,
}

impl<'ctx> Jit<'ctx> {
    /// Create the execution engine. memory_impl is an LLVM IR module
    /// on disk (.ll or .bc) defining read8, read16, read32, write8,
    /// write16 and write32 with the documented signatures; block
    /// modules link against those definitions. threshold is the
    /// maximum number of guest instructions per translated block;
    /// debug additionally dumps each translated module and the CPU
    /// state after every block.
    pub fn new(
        context: &'ctx Context,
        memory_impl: &Path,
        threshold: usize,
        debug: bool,
    ) -> Result<Self, JitError> {
        let jit = Self::create(context, threshold, debug, false)?;
        let buffer = MemoryBuffer::create_from_file(memory_impl)
            .map_err(|err| JitError::MemoryImpl(err.to_string()))?;
        let module = context
            .create_module_from_ir(buffer)
            .map_err(|err| JitError::MemoryImpl(err.to_string()))?;
        jit.engine
            .add_module(&module)
            .map_err(|()| JitError::AddModule)?;
        Ok(jit)
    }

    /// Create the execution engine with the in-process memory helper
    /// implementations instead of an external IR module. For
    /// embedders and tests; the command line always supplies an IR
    /// module.
    pub fn with_native_memory(
        context: &'ctx Context,
        threshold: usize,
        debug: bool,
    ) -> Result<Self, JitError> {
        Self::create(context, threshold, debug, true)
    }

    fn create(
        context: &'ctx Context,
        threshold: usize,
        debug: bool,
        native_memory_helpers: bool,
    ) -> Result<Self, JitError> {
        Target::initialize_native(&InitializationConfig::default())
            .map_err(JitError::Target)?;
        let bootstrap = context.create_module("rvdbt");
        let engine = bootstrap
            .create_jit_execution_engine(OptimizationLevel::Default)
            .map_err(|err| JitError::Engine(err.to_string()))?;
        // The engine owns every module handed to it, including the
        // bootstrap module it was created from
        Ok(Self {
            context,
            engine,
            cache: HashMap::new(),
            native_memory_helpers,
            threshold,
            debug,
        })
    }

    /// Number of blocks translated so far
    pub fn cached_blocks(&self) -> usize {
        self.cache.len()
    }

    fn compile_block(
        &mut self,
        image: &MemoryImage,
        entry_pc: u32,
    ) -> Result<JitFunction<'ctx, BlockFn>, JitError> {
        let module =
            self.context.create_module(&translate::block_name(entry_pc));
        let name = translate::translate_block(
            self.context,
            &module,
            image,
            entry_pc,
            self.threshold,
        )?;
        module
            .verify()
            .map_err(|err| JitError::InvalidModule(err.to_string()))?;
        if self.debug {
            module.print_to_stderr();
        }
        self.engine
            .add_module(&module)
            .map_err(|()| JitError::AddModule)?;
        register_native_helpers(
            &self.engine,
            &module,
            self.native_memory_helpers,
        );
        let function = unsafe { self.engine.get_function::<BlockFn>(&name) }
            .map_err(|err| JitError::Lookup(err.to_string()))?;
        Ok(function)
    }

    /// The dispatch loop: look up (or translate) the block for the
    /// current pc, invoke it, and repeat. Returns when the guest
    /// exits or, if max_blocks is given, after that many block
    /// invocations. A block failing translation or compilation ends
    /// the run with an error and is not cached.
    pub fn run(
        &mut self,
        cpu: &mut CpuState,
        max_blocks: Option<u64>,
    ) -> Result<RunExit, JitError> {
        let mut executed = 0u64;
        loop {
            if let Some(limit) = max_blocks {
                if executed >= limit {
                    return Ok(RunExit::BlockBudget);
                }
            }
            let pc = cpu.pc;
            if !self.cache.contains_key(&pc) {
                let compiled = {
                    // The image is only borrowed for instruction
                    // fetch during translation, never across a block
                    // invocation
                    let image = unsafe { &*cpu.memory };
                    self.compile_block(image, pc)?
                };
                self.cache.insert(pc, compiled);
                tracing::debug!(
                    "cached block for 0x{pc:08x} ({} total)",
                    self.cache.len()
                );
            } else {
                tracing::trace!("cache hit for 0x{pc:08x}");
            }
            let block = self.cache.get(&pc).expect("inserted above");
            unsafe { block.call(cpu as *mut CpuState) };
            executed += 1;
            if let Some(code) = syscall::take_exit() {
                return Ok(RunExit::Exited(code));
            }
            if self.debug {
                println!("{cpu}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;
    use crate::memory::Segment;

    #[test]
    fn self_loop_is_translated_once() {
        let mut image = Box::new(MemoryImage::new());
        let mut bytes = Vec::new();
        // jal x0, 0 jumps to itself forever
        bytes.extend_from_slice(&encode::jal(0, 0).to_le_bytes());
        image.push_segment(Segment::new(0x1000, bytes));

        let mut cpu = CpuState::new(image.as_mut(), 0x1000);
        let context = Context::create();
        let mut jit = Jit::with_native_memory(&context, 64, false).unwrap();

        let exit = jit.run(&mut cpu, Some(5)).unwrap();
        assert_eq!(exit, RunExit::BlockBudget);
        assert_eq!(cpu.pc, 0x1000);
        assert_eq!(jit.cached_blocks(), 1);
    }
}
