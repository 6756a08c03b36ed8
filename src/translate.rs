//! Translation of guest instructions to LLVM IR
//!
//! A translated block is a void function taking one pointer to the
//! guest [`CpuState`](crate::cpu::CpuState). Register and program
//! counter accesses are ordinary loads and stores through GEPs into
//! that struct; guest memory accesses go through the helper
//! functions declared in each block's module and resolved by the
//! execution engine.
//!
//! Blocks are tracelets: straight-line runs of guest instructions.
//! Emission stops after a control-transfer instruction (which stores
//! its target to the pc slot), after an ecall (so the dispatch loop
//! sees a pending guest exit promptly), or when the instruction
//! threshold is reached. Branch targets are never followed during
//! translation; the dispatch loop re-reads the pc after every block.

use inkwell::builder::{Builder, BuilderError};
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::{ArrayType, StructType};
use inkwell::values::{FunctionValue, IntValue, PointerValue};
use inkwell::{AddressSpace, IntPredicate};
use thiserror::Error;

use crate::cpu::REG_COUNT;
use crate::instr::Instr;
use crate::memory::MemoryImage;

/// Field order of the CpuState struct: registers, pc, memory
const FIELD_REGISTERS: u32 = 0;
const FIELD_PC: u32 = 1;
const FIELD_MEMORY: u32 = 2;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("instruction fetch from unmapped guest address 0x{pc:08x}")]
    UnmappedFetch { pc: u32 },
    #[error("ir builder error: {0}")]
    Builder(#[from] BuilderError),
}

/// Name of the translated function for a block entry point
pub fn block_name(entry_pc: u32) -> String {
    format!("block_{entry_pc:08x}")
}

/// The LLVM view of [`CpuState`](crate::cpu::CpuState). Created once
/// per context and looked up by name afterwards; must stay in sync
/// with the #[repr(C)] struct on the Rust side.
pub fn cpu_state_type(context: &Context) -> StructType<'_> {
    if let Some(existing) = context.get_struct_type("CpuState") {
        return existing;
    }
    let cpu_type = context.opaque_struct_type("CpuState");
    cpu_type.set_body(
        &[
            context.i32_type().array_type(REG_COUNT as u32).into(),
            context.i32_type().into(),
            context.i8_type().ptr_type(AddressSpace::default()).into(),
        ],
        false,
    );
    cpu_type
}

/// The helper functions translated code may call, declared in the
/// module currently being built
struct Helpers<'ctx> {
    read8: FunctionValue<'ctx>,
    read16: FunctionValue<'ctx>,
    read32: FunctionValue<'ctx>,
    write8: FunctionValue<'ctx>,
    write16: FunctionValue<'ctx>,
    write32: FunctionValue<'ctx>,
    ecall: FunctionValue<'ctx>,
}

fn get_or_declare<'ctx>(
    module: &Module<'ctx>,
    name: &str,
    ty: inkwell::types::FunctionType<'ctx>,
) -> FunctionValue<'ctx> {
    module
        .get_function(name)
        .unwrap_or_else(|| module.add_function(name, ty, None))
}

/// Declare the memory and ecall helpers in a block module. The
/// signatures form the ABI with the host-side implementations:
/// reads are (memory*, u32 addr) -> uN, writes are
/// (memory*, u32 addr, uN data) -> void, ecall is (cpu*) -> void.
fn declare_helpers<'ctx>(
    context: &'ctx Context,
    module: &Module<'ctx>,
) -> Helpers<'ctx> {
    let ptr = context.i8_type().ptr_type(AddressSpace::default());
    let i8t = context.i8_type();
    let i16t = context.i16_type();
    let i32t = context.i32_type();
    let void = context.void_type();

    let read8_ty = i8t.fn_type(&[ptr.into(), i32t.into()], false);
    let read16_ty = i16t.fn_type(&[ptr.into(), i32t.into()], false);
    let read32_ty = i32t.fn_type(&[ptr.into(), i32t.into()], false);
    let write8_ty =
        void.fn_type(&[ptr.into(), i32t.into(), i8t.into()], false);
    let write16_ty =
        void.fn_type(&[ptr.into(), i32t.into(), i16t.into()], false);
    let write32_ty =
        void.fn_type(&[ptr.into(), i32t.into(), i32t.into()], false);
    let cpu_ptr = cpu_state_type(context).ptr_type(AddressSpace::default());
    let ecall_ty = void.fn_type(&[cpu_ptr.into()], false);

    Helpers {
        read8: get_or_declare(module, "read8", read8_ty),
        read16: get_or_declare(module, "read16", read16_ty),
        read32: get_or_declare(module, "read32", read32_ty),
        write8: get_or_declare(module, "write8", write8_ty),
        write16: get_or_declare(module, "write16", write16_ty),
        write32: get_or_declare(module, "write32", write32_ty),
        ecall: get_or_declare(module, "ecall", ecall_ty),
    }
}

enum MemWidth {
    Byte,
    Half,
    Word,
}

/// Emits the IR for one guest instruction at a time into the entry
/// block of a translated function
struct BlockEmitter<'a, 'ctx> {
    context: &'ctx Context,
    builder: &'a Builder<'ctx>,
    helpers: &'a Helpers<'ctx>,
    cpu_type: StructType<'ctx>,
    regs_type: ArrayType<'ctx>,
    cpu_ptr: PointerValue<'ctx>,
}

impl<'a, 'ctx> BlockEmitter<'a, 'ctx> {
    fn new(
        context: &'ctx Context,
        builder: &'a Builder<'ctx>,
        helpers: &'a Helpers<'ctx>,
        function: FunctionValue<'ctx>,
    ) -> Self {
        let cpu_ptr = function
            .get_first_param()
            .expect("block function takes the cpu state pointer")
            .into_pointer_value();
        Self {
            context,
            builder,
            helpers,
            cpu_type: cpu_state_type(context),
            regs_type: context.i32_type().array_type(REG_COUNT as u32),
            cpu_ptr,
        }
    }

    fn i32_const(&self, value: u32) -> IntValue<'ctx> {
        self.context.i32_type().const_int(u64::from(value), false)
    }

    fn reg_ptr(&self, reg: u8) -> Result<PointerValue<'ctx>, BuilderError> {
        let regs_ptr = self.builder.build_struct_gep(
            self.cpu_ptr,
            FIELD_REGISTERS,
            "regs",
        )?;
        unsafe {
            self.builder.build_in_bounds_gep(
                regs_ptr,
                &[self.i32_const(0), self.i32_const(u32::from(reg))],
                &format!("x{reg}"),
            )
        }
    }

    fn read_reg(&self, reg: u8) -> Result<IntValue<'ctx>, BuilderError> {
        let ptr = self.reg_ptr(reg)?;
        Ok(self
            .builder
            .build_load(ptr, &format!("x{reg}_val"))?
            .into_int_value())
    }

    /// Store to a guest register. The zero register is hardwired:
    /// stores to x0 are dropped at translation time.
    fn write_reg(
        &self,
        reg: u8,
        value: IntValue<'ctx>,
    ) -> Result<(), BuilderError> {
        if reg == 0 {
            return Ok(());
        }
        let ptr = self.reg_ptr(reg)?;
        self.builder.build_store(ptr, value)?;
        Ok(())
    }

    fn pc_ptr(&self) -> Result<PointerValue<'ctx>, BuilderError> {
        self.builder.build_struct_gep(
            self.cpu_ptr,
            FIELD_PC,
            "pc",
        )
    }

    fn read_pc(&self) -> Result<IntValue<'ctx>, BuilderError> {
        let ptr = self.pc_ptr()?;
        Ok(self
            .builder
            .build_load(ptr, "pc_val")?
            .into_int_value())
    }

    fn write_pc(&self, value: IntValue<'ctx>) -> Result<(), BuilderError> {
        let ptr = self.pc_ptr()?;
        self.builder.build_store(ptr, value)?;
        Ok(())
    }

    /// pc = pc + 4, the ending of every non-control instruction
    fn advance_pc(&self) -> Result<(), BuilderError> {
        let pc = self.read_pc()?;
        let next =
            self.builder.build_int_add(pc, self.i32_const(4), "next_pc")?;
        self.write_pc(next)
    }

    fn write_then_advance(
        &self,
        rd: u8,
        value: IntValue<'ctx>,
    ) -> Result<(), BuilderError> {
        self.write_reg(rd, value)?;
        self.advance_pc()
    }

    /// Load the memory pointer out of the cpu state
    fn memory_ptr(&self) -> Result<PointerValue<'ctx>, BuilderError> {
        let field = self.builder.build_struct_gep(
            self.cpu_ptr,
            FIELD_MEMORY,
            "memory",
        )?;
        Ok(self
            .builder
            .build_load(field, "memory_ptr")?
            .into_pointer_value())
    }

    /// rs1 + imm with wrap-around
    fn effective_address(
        &self,
        rs1: u8,
        imm: u32,
    ) -> Result<IntValue<'ctx>, BuilderError> {
        let base = self.read_reg(rs1)?;
        self.builder.build_int_add(base, self.i32_const(imm), "addr")
    }

    fn emit_branch(
        &self,
        predicate: IntPredicate,
        rs1: u8,
        rs2: u8,
        imm: u32,
        name: &str,
    ) -> Result<(), BuilderError> {
        let lhs = self.read_reg(rs1)?;
        let rhs = self.read_reg(rs2)?;
        let cond = self.builder.build_int_compare(predicate, lhs, rhs, name)?;
        let pc = self.read_pc()?;
        let taken =
            self.builder.build_int_add(pc, self.i32_const(imm), "taken")?;
        let not_taken = self.builder.build_int_add(
            pc,
            self.i32_const(4),
            "not_taken",
        )?;
        let next = self
            .builder
            .build_select(cond, taken, not_taken, "next_pc")?
            .into_int_value();
        self.write_pc(next)
    }

    fn emit_load(
        &self,
        rd: u8,
        rs1: u8,
        imm: u32,
        width: MemWidth,
        signed: bool,
    ) -> Result<(), BuilderError> {
        let memory = self.memory_ptr()?;
        let addr = self.effective_address(rs1, imm)?;
        let callee = match width {
            MemWidth::Byte => self.helpers.read8,
            MemWidth::Half => self.helpers.read16,
            MemWidth::Word => self.helpers.read32,
        };
        let raw = self
            .builder
            .build_call(callee, &[memory.into(), addr.into()], "loaded")?
            .try_as_basic_value()
            .basic()
            .expect("read helpers return a value")
            .into_int_value();
        let i32t = self.context.i32_type();
        let value = match width {
            MemWidth::Word => raw,
            _ if signed => {
                self.builder.build_int_s_extend(raw, i32t, "sext")?
            }
            _ => self.builder.build_int_z_extend(raw, i32t, "zext")?,
        };
        self.write_then_advance(rd, value)
    }

    fn emit_store(
        &self,
        rs1: u8,
        rs2: u8,
        imm: u32,
        width: MemWidth,
    ) -> Result<(), BuilderError> {
        let memory = self.memory_ptr()?;
        let addr = self.effective_address(rs1, imm)?;
        let full = self.read_reg(rs2)?;
        let (callee, data) = match width {
            MemWidth::Byte => (
                self.helpers.write8,
                self.builder.build_int_truncate(
                    full,
                    self.context.i8_type(),
                    "byte",
                )?,
            ),
            MemWidth::Half => (
                self.helpers.write16,
                self.builder.build_int_truncate(
                    full,
                    self.context.i16_type(),
                    "half",
                )?,
            ),
            MemWidth::Word => (self.helpers.write32, full),
        };
        self.builder.build_call(
            callee,
            &[memory.into(), addr.into(), data.into()],
            "",
        )?;
        self.advance_pc()
    }

    /// Mask a shift amount taken from a register to its low 5 bits
    fn shift_amount(
        &self,
        rs2: u8,
    ) -> Result<IntValue<'ctx>, BuilderError> {
        let raw = self.read_reg(rs2)?;
        self.builder.build_and(raw, self.i32_const(0x1f), "shamt")
    }

    fn emit_compare(
        &self,
        rd: u8,
        predicate: IntPredicate,
        lhs: IntValue<'ctx>,
        rhs: IntValue<'ctx>,
        name: &str,
    ) -> Result<(), BuilderError> {
        let cond = self.builder.build_int_compare(predicate, lhs, rhs, name)?;
        let value = self.builder.build_int_z_extend(
            cond,
            self.context.i32_type(),
            name,
        )?;
        self.write_then_advance(rd, value)
    }

    /// Append the IR for one decoded instruction. Every path ends by
    /// storing the next pc.
    fn emit(&self, instr: &Instr) -> Result<(), BuilderError> {
        use IntPredicate::{EQ, NE, SGE, SLT, UGE, ULT};
        let b = self.builder;
        match *instr {
            Instr::Lui { rd, imm } => {
                self.write_then_advance(rd, self.i32_const(imm))
            }
            Instr::Auipc { rd, imm } => {
                let pc = self.read_pc()?;
                let value =
                    b.build_int_add(pc, self.i32_const(imm), "auipc")?;
                self.write_reg(rd, value)?;
                let next =
                    b.build_int_add(pc, self.i32_const(4), "next_pc")?;
                self.write_pc(next)
            }
            Instr::Jal { rd, imm } => {
                let pc = self.read_pc()?;
                let link = b.build_int_add(pc, self.i32_const(4), "link")?;
                self.write_reg(rd, link)?;
                let target =
                    b.build_int_add(pc, self.i32_const(imm), "target")?;
                self.write_pc(target)
            }
            Instr::Jalr { rd, rs1, imm } => {
                let base = self.read_reg(rs1)?;
                let target =
                    b.build_int_add(base, self.i32_const(imm), "target")?;
                let pc = self.read_pc()?;
                let link = b.build_int_add(pc, self.i32_const(4), "link")?;
                self.write_reg(rd, link)?;
                // Clear bit 0 of the target
                let aligned = b.build_and(
                    target,
                    self.i32_const(!1),
                    "target_aligned",
                )?;
                self.write_pc(aligned)
            }
            Instr::Beq { rs1, rs2, imm } => {
                self.emit_branch(EQ, rs1, rs2, imm, "beq")
            }
            Instr::Bne { rs1, rs2, imm } => {
                self.emit_branch(NE, rs1, rs2, imm, "bne")
            }
            Instr::Blt { rs1, rs2, imm } => {
                self.emit_branch(SLT, rs1, rs2, imm, "blt")
            }
            Instr::Bge { rs1, rs2, imm } => {
                self.emit_branch(SGE, rs1, rs2, imm, "bge")
            }
            Instr::Bltu { rs1, rs2, imm } => {
                self.emit_branch(ULT, rs1, rs2, imm, "bltu")
            }
            Instr::Bgeu { rs1, rs2, imm } => {
                self.emit_branch(UGE, rs1, rs2, imm, "bgeu")
            }
            Instr::Lb { rd, rs1, imm } => {
                self.emit_load(rd, rs1, imm, MemWidth::Byte, true)
            }
            Instr::Lh { rd, rs1, imm } => {
                self.emit_load(rd, rs1, imm, MemWidth::Half, true)
            }
            Instr::Lw { rd, rs1, imm } => {
                self.emit_load(rd, rs1, imm, MemWidth::Word, false)
            }
            Instr::Lbu { rd, rs1, imm } => {
                self.emit_load(rd, rs1, imm, MemWidth::Byte, false)
            }
            Instr::Lhu { rd, rs1, imm } => {
                self.emit_load(rd, rs1, imm, MemWidth::Half, false)
            }
            Instr::Sb { rs1, rs2, imm } => {
                self.emit_store(rs1, rs2, imm, MemWidth::Byte)
            }
            Instr::Sh { rs1, rs2, imm } => {
                self.emit_store(rs1, rs2, imm, MemWidth::Half)
            }
            Instr::Sw { rs1, rs2, imm } => {
                self.emit_store(rs1, rs2, imm, MemWidth::Word)
            }
            Instr::Addi { rd, rs1, imm } => {
                let lhs = self.read_reg(rs1)?;
                let value =
                    b.build_int_add(lhs, self.i32_const(imm), "addi")?;
                self.write_then_advance(rd, value)
            }
            Instr::Slti { rd, rs1, imm } => {
                let lhs = self.read_reg(rs1)?;
                self.emit_compare(rd, SLT, lhs, self.i32_const(imm), "slti")
            }
            Instr::Sltiu { rd, rs1, imm } => {
                let lhs = self.read_reg(rs1)?;
                self.emit_compare(rd, ULT, lhs, self.i32_const(imm), "sltiu")
            }
            Instr::Xori { rd, rs1, imm } => {
                let lhs = self.read_reg(rs1)?;
                let value = b.build_xor(lhs, self.i32_const(imm), "xori")?;
                self.write_then_advance(rd, value)
            }
            Instr::Ori { rd, rs1, imm } => {
                let lhs = self.read_reg(rs1)?;
                let value = b.build_or(lhs, self.i32_const(imm), "ori")?;
                self.write_then_advance(rd, value)
            }
            Instr::Andi { rd, rs1, imm } => {
                let lhs = self.read_reg(rs1)?;
                let value = b.build_and(lhs, self.i32_const(imm), "andi")?;
                self.write_then_advance(rd, value)
            }
            Instr::Slli { rd, rs1, shamt } => {
                let lhs = self.read_reg(rs1)?;
                let value = b.build_left_shift(
                    lhs,
                    self.i32_const(u32::from(shamt)),
                    "slli",
                )?;
                self.write_then_advance(rd, value)
            }
            Instr::Srli { rd, rs1, shamt } => {
                let lhs = self.read_reg(rs1)?;
                let value = b.build_right_shift(
                    lhs,
                    self.i32_const(u32::from(shamt)),
                    false,
                    "srli",
                )?;
                self.write_then_advance(rd, value)
            }
            Instr::Srai { rd, rs1, shamt } => {
                let lhs = self.read_reg(rs1)?;
                let value = b.build_right_shift(
                    lhs,
                    self.i32_const(u32::from(shamt)),
                    true,
                    "srai",
                )?;
                self.write_then_advance(rd, value)
            }
            Instr::Add { rd, rs1, rs2 } => {
                let lhs = self.read_reg(rs1)?;
                let rhs = self.read_reg(rs2)?;
                let value = b.build_int_add(lhs, rhs, "add")?;
                self.write_then_advance(rd, value)
            }
            Instr::Sub { rd, rs1, rs2 } => {
                let lhs = self.read_reg(rs1)?;
                let rhs = self.read_reg(rs2)?;
                let value = b.build_int_sub(lhs, rhs, "sub")?;
                self.write_then_advance(rd, value)
            }
            Instr::Sll { rd, rs1, rs2 } => {
                let lhs = self.read_reg(rs1)?;
                let amount = self.shift_amount(rs2)?;
                let value = b.build_left_shift(lhs, amount, "sll")?;
                self.write_then_advance(rd, value)
            }
            Instr::Slt { rd, rs1, rs2 } => {
                let lhs = self.read_reg(rs1)?;
                let rhs = self.read_reg(rs2)?;
                self.emit_compare(rd, SLT, lhs, rhs, "slt")
            }
            Instr::Sltu { rd, rs1, rs2 } => {
                let lhs = self.read_reg(rs1)?;
                let rhs = self.read_reg(rs2)?;
                self.emit_compare(rd, ULT, lhs, rhs, "sltu")
            }
            Instr::Xor { rd, rs1, rs2 } => {
                let lhs = self.read_reg(rs1)?;
                let rhs = self.read_reg(rs2)?;
                let value = b.build_xor(lhs, rhs, "xor")?;
                self.write_then_advance(rd, value)
            }
            Instr::Srl { rd, rs1, rs2 } => {
                let lhs = self.read_reg(rs1)?;
                let amount = self.shift_amount(rs2)?;
                let value = b.build_right_shift(lhs, amount, false, "srl")?;
                self.write_then_advance(rd, value)
            }
            Instr::Sra { rd, rs1, rs2 } => {
                let lhs = self.read_reg(rs1)?;
                let amount = self.shift_amount(rs2)?;
                let value = b.build_right_shift(lhs, amount, true, "sra")?;
                self.write_then_advance(rd, value)
            }
            Instr::Or { rd, rs1, rs2 } => {
                let lhs = self.read_reg(rs1)?;
                let rhs = self.read_reg(rs2)?;
                let value = b.build_or(lhs, rhs, "or")?;
                self.write_then_advance(rd, value)
            }
            Instr::And { rd, rs1, rs2 } => {
                let lhs = self.read_reg(rs1)?;
                let rhs = self.read_reg(rs2)?;
                let value = b.build_and(lhs, rhs, "and")?;
                self.write_then_advance(rd, value)
            }
            // Memory ordering needs no IR on a single-threaded host
            Instr::Fence | Instr::FenceTso | Instr::Pause => {
                self.advance_pc()
            }
            Instr::Ecall => {
                b.build_call(self.helpers.ecall, &[self.cpu_ptr.into()], "")?;
                self.advance_pc()
            }
            Instr::Ebreak => self.advance_pc(),
            Instr::Unknown { .. } => self.advance_pc(),
        }
    }
}

/// True for instructions that end a tracelet
fn ends_block(instr: &Instr) -> bool {
    instr.is_control_transfer() || matches!(instr, Instr::Ecall)
}

/// Build the translated function for the block entered at entry_pc
/// into the given module, and return its name.
///
/// Decodes and emits consecutive instructions starting at entry_pc
/// until a control transfer or ecall has been emitted, or threshold
/// instructions have been emitted. Unknown words are skipped (their
/// IR is just the pc advance).
pub fn translate_block<'ctx>(
    context: &'ctx Context,
    module: &Module<'ctx>,
    image: &MemoryImage,
    entry_pc: u32,
    threshold: usize,
) -> Result<String, TranslateError> {
    let name = block_name(entry_pc);
    let fn_type = context.void_type().fn_type(
        &[cpu_state_type(context)
            .ptr_type(AddressSpace::default())
            .into()],
        false,
    );
    let function = module.add_function(&name, fn_type, None);
    let entry = context.append_basic_block(function, "entry");
    let builder = context.create_builder();
    builder.position_at_end(entry);

    let helpers = declare_helpers(context, module);
    let emitter = BlockEmitter::new(context, &builder, &helpers, function);

    let mut pc = entry_pc;
    let mut emitted = 0;
    loop {
        let word = image
            .read32(pc)
            .ok_or(TranslateError::UnmappedFetch { pc })?;
        let instr = Instr::decode(word);
        if let Instr::Unknown { word } = instr {
            tracing::debug!(
                "skipping unknown instruction word 0x{word:08x} at 0x{pc:08x}"
            );
        } else {
            tracing::trace!("0x{pc:08x}: {instr}");
        }
        emitter.emit(&instr)?;
        pc = pc.wrapping_add(4);
        emitted += 1;
        if emitted >= threshold || ends_block(&instr) {
            break;
        }
    }
    builder.build_return(None)?;
    tracing::debug!("translated {emitted} instructions into {name}");
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;
    use crate::memory::Segment;

    fn image_with_words(base: u32, words: &[u32]) -> MemoryImage {
        let mut bytes = Vec::new();
        for word in words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        let mut image = MemoryImage::new();
        image.push_segment(Segment::new(base, bytes));
        image
    }

    fn translated_ir(words: &[u32], threshold: usize) -> String {
        let context = Context::create();
        let module = context.create_module("test");
        let image = image_with_words(0x1000, words);
        let name =
            translate_block(&context, &module, &image, 0x1000, threshold)
                .unwrap();
        assert_eq!(name, "block_00001000");
        module.verify().unwrap();
        module.print_to_string().to_string()
    }

    #[test]
    fn block_names_are_hex_pcs() {
        assert_eq!(block_name(0x1000), "block_00001000");
        assert_eq!(block_name(0xffff_fff0), "block_fffffff0");
    }

    #[test]
    fn straight_line_block_verifies() {
        let ir = translated_ir(
            &[encode::addi(1, 0, 5), encode::addi(2, 1, -3)],
            2,
        );
        // Two instructions, one pc advance each
        assert_eq!(ir.matches("store").count(), 4);
    }

    #[test]
    fn branch_ends_the_block_before_threshold() {
        let ir = translated_ir(
            &[
                encode::addi(1, 0, 1),
                encode::beq(1, 1, 8),
                // Never translated: the branch ends the tracelet
                encode::addi(2, 0, 99),
            ],
            64,
        );
        assert_eq!(ir.matches("select").count(), 1);
        assert!(!ir.contains("99"));
    }

    #[test]
    fn ecall_ends_the_block() {
        let ir = translated_ir(
            &[encode::ecall(), encode::addi(2, 0, 99)],
            64,
        );
        assert!(ir.contains("call void @ecall"));
        assert!(!ir.contains("99"));
    }

    #[test]
    fn loads_and_stores_call_the_helpers() {
        let ir = translated_ir(
            &[
                encode::lw(4, 2, 0),
                encode::sb(3, 2, 1),
                encode::lbu(5, 2, 2),
            ],
            3,
        );
        assert!(ir.contains("@read32"));
        assert!(ir.contains("@write8"));
        assert!(ir.contains("@read8"));
        assert!(ir.contains("zext"));
    }

    #[test]
    fn writes_to_x0_are_dropped() {
        let ir = translated_ir(&[encode::addi(0, 0, 5)], 1);
        // Only the pc advance stores anything
        assert_eq!(ir.matches("store").count(), 1);
    }

    #[test]
    fn fetch_from_unmapped_pc_is_an_error() {
        let context = Context::create();
        let module = context.create_module("test");
        let image = image_with_words(0x1000, &[encode::addi(1, 0, 5)]);
        let result = translate_block(&context, &module, &image, 0x2000, 64);
        assert!(matches!(
            result,
            Err(TranslateError::UnmappedFetch { pc: 0x2000 })
        ));
    }

    #[test]
    fn threshold_caps_the_block() {
        let words = vec![encode::addi(1, 1, 1); 10];
        let ir = translated_ir(&words, 4);
        // Four adds of x1 plus four pc advances
        assert_eq!(ir.matches("store").count(), 8);
    }
}
