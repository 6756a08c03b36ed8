//! RV32I instruction decoding
//!
//! An instruction is decoded in two steps: the low 7-bit opcode picks
//! the major group, and funct3/funct7 (plus the immediate field for
//! the system and fence groups) select the instruction within the
//! group. Each variant of [`Instr`] carries the already-decoded
//! fields for that instruction, with immediates sign-extended to the
//! full register width.

use std::fmt;

use crate::utils::{extract_field, sign_extend};

const OP_LUI: u32 = 0x37;
const OP_AUIPC: u32 = 0x17;
const OP_JAL: u32 = 0x6f;
const OP_JALR: u32 = 0x67;
const OP_BRANCH: u32 = 0x63;
const OP_LOAD: u32 = 0x03;
const OP_STORE: u32 = 0x23;
const OP_IMM: u32 = 0x13;
const OP_REG: u32 = 0x33;
const OP_MISC_MEM: u32 = 0x0f;
const OP_SYSTEM: u32 = 0x73;

const FUNCT7_SUB: u32 = 0x20;
const FUNCT7_SRA: u32 = 0x20;

fn rd(word: u32) -> u8 {
    extract_field(word, 11, 7) as u8
}

fn rs1(word: u32) -> u8 {
    extract_field(word, 19, 15) as u8
}

fn rs2(word: u32) -> u8 {
    extract_field(word, 24, 20) as u8
}

/// The 20-bit upper immediate, already in bits [31:12]
fn imm_utype(word: u32) -> u32 {
    word & 0xffff_f000
}

/// The 12-bit I-type immediate, sign-extended
fn imm_itype(word: u32) -> u32 {
    sign_extend(extract_field(word, 31, 20), 11)
}

/// The 12-bit S-type immediate (split across two fields), sign-extended
fn imm_stype(word: u32) -> u32 {
    let imm11_5 = extract_field(word, 31, 25);
    let imm4_0 = extract_field(word, 11, 7);
    sign_extend((imm11_5 << 5) | imm4_0, 11)
}

/// The 13-bit B-type immediate (bit 0 always zero), sign-extended
fn imm_btype(word: u32) -> u32 {
    let imm12 = extract_field(word, 31, 31);
    let imm11 = extract_field(word, 7, 7);
    let imm10_5 = extract_field(word, 30, 25);
    let imm4_1 = extract_field(word, 11, 8);
    let imm = (imm12 << 12) | (imm11 << 11) | (imm10_5 << 5) | (imm4_1 << 1);
    sign_extend(imm, 12)
}

/// The 21-bit J-type immediate (bit 0 always zero), sign-extended
fn imm_jtype(word: u32) -> u32 {
    let imm20 = extract_field(word, 31, 31);
    let imm19_12 = extract_field(word, 19, 12);
    let imm11 = extract_field(word, 20, 20);
    let imm10_1 = extract_field(word, 30, 21);
    let imm = (imm20 << 20) | (imm19_12 << 12) | (imm11 << 11) | (imm10_1 << 1);
    sign_extend(imm, 20)
}

/// Shift amount for the shift-by-immediate instructions (never
/// sign-extended)
fn shamt(word: u32) -> u8 {
    extract_field(word, 24, 20) as u8
}

/// A decoded RV32I instruction
///
/// Register fields hold the register index (0..=31), not its
/// contents. Immediates are stored sign-extended as u32, so they can
/// take part in wrapping register arithmetic directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    /// Load imm (already shifted into bits [31:12]) into rd
    Lui { rd: u8, imm: u32 },
    /// rd = pc + imm (imm already shifted into bits [31:12])
    Auipc { rd: u8, imm: u32 },
    /// rd = pc + 4; pc = pc + imm
    Jal { rd: u8, imm: u32 },
    /// rd = pc + 4; pc = (rs1 + imm) with bit 0 cleared
    Jalr { rd: u8, rs1: u8, imm: u32 },
    /// If rs1 == rs2, pc = pc + imm, else pc = pc + 4
    Beq { rs1: u8, rs2: u8, imm: u32 },
    /// If rs1 != rs2, pc = pc + imm, else pc = pc + 4
    Bne { rs1: u8, rs2: u8, imm: u32 },
    /// If rs1 < rs2 (signed), pc = pc + imm, else pc = pc + 4
    Blt { rs1: u8, rs2: u8, imm: u32 },
    /// If rs1 >= rs2 (signed), pc = pc + imm, else pc = pc + 4
    Bge { rs1: u8, rs2: u8, imm: u32 },
    /// If rs1 < rs2 (unsigned), pc = pc + imm, else pc = pc + 4
    Bltu { rs1: u8, rs2: u8, imm: u32 },
    /// If rs1 >= rs2 (unsigned), pc = pc + imm, else pc = pc + 4
    Bgeu { rs1: u8, rs2: u8, imm: u32 },
    /// Load the byte at rs1 + imm, sign-extended, into rd
    Lb { rd: u8, rs1: u8, imm: u32 },
    /// Load the halfword at rs1 + imm, sign-extended, into rd
    Lh { rd: u8, rs1: u8, imm: u32 },
    /// Load the word at rs1 + imm into rd
    Lw { rd: u8, rs1: u8, imm: u32 },
    /// Load the byte at rs1 + imm, zero-extended, into rd
    Lbu { rd: u8, rs1: u8, imm: u32 },
    /// Load the halfword at rs1 + imm, zero-extended, into rd
    Lhu { rd: u8, rs1: u8, imm: u32 },
    /// Store the low byte of rs2 to rs1 + imm
    Sb { rs1: u8, rs2: u8, imm: u32 },
    /// Store the low halfword of rs2 to rs1 + imm
    Sh { rs1: u8, rs2: u8, imm: u32 },
    /// Store rs2 to rs1 + imm
    Sw { rs1: u8, rs2: u8, imm: u32 },
    /// rd = rs1 + imm (wrapping)
    Addi { rd: u8, rs1: u8, imm: u32 },
    /// rd = (rs1 < imm) ? 1 : 0, signed comparison
    Slti { rd: u8, rs1: u8, imm: u32 },
    /// rd = (rs1 < imm) ? 1 : 0, unsigned comparison
    Sltiu { rd: u8, rs1: u8, imm: u32 },
    /// rd = rs1 ^ imm
    Xori { rd: u8, rs1: u8, imm: u32 },
    /// rd = rs1 | imm
    Ori { rd: u8, rs1: u8, imm: u32 },
    /// rd = rs1 & imm
    Andi { rd: u8, rs1: u8, imm: u32 },
    /// rd = rs1 << shamt
    Slli { rd: u8, rs1: u8, shamt: u8 },
    /// rd = rs1 >> shamt (logical)
    Srli { rd: u8, rs1: u8, shamt: u8 },
    /// rd = rs1 >> shamt (arithmetic)
    Srai { rd: u8, rs1: u8, shamt: u8 },
    /// rd = rs1 + rs2 (wrapping)
    Add { rd: u8, rs1: u8, rs2: u8 },
    /// rd = rs1 - rs2 (wrapping)
    Sub { rd: u8, rs1: u8, rs2: u8 },
    /// rd = rs1 << (rs2 & 0x1f)
    Sll { rd: u8, rs1: u8, rs2: u8 },
    /// rd = (rs1 < rs2) ? 1 : 0, signed comparison
    Slt { rd: u8, rs1: u8, rs2: u8 },
    /// rd = (rs1 < rs2) ? 1 : 0, unsigned comparison
    Sltu { rd: u8, rs1: u8, rs2: u8 },
    /// rd = rs1 ^ rs2
    Xor { rd: u8, rs1: u8, rs2: u8 },
    /// rd = rs1 >> (rs2 & 0x1f) (logical)
    Srl { rd: u8, rs1: u8, rs2: u8 },
    /// rd = rs1 >> (rs2 & 0x1f) (arithmetic)
    Sra { rd: u8, rs1: u8, rs2: u8 },
    /// rd = rs1 | rs2
    Or { rd: u8, rs1: u8, rs2: u8 },
    /// rd = rs1 & rs2
    And { rd: u8, rs1: u8, rs2: u8 },
    /// Memory ordering fence (no-op on this single-threaded host)
    Fence,
    /// Total-store-ordering fence (fm=8, pred=rw, succ=rw)
    FenceTso,
    /// Spin-loop hint
    Pause,
    /// Environment call
    Ecall,
    /// Environment break
    Ebreak,
    /// A word matching no known encoding; carries the raw word
    Unknown { word: u32 },
}

impl Instr {
    /// Decode a 32-bit little-endian instruction word
    pub fn decode(word: u32) -> Self {
        let opcode = extract_field(word, 6, 0);
        let funct3 = extract_field(word, 14, 12);
        let funct7 = extract_field(word, 31, 25);
        match opcode {
            OP_LUI => Self::Lui {
                rd: rd(word),
                imm: imm_utype(word),
            },
            OP_AUIPC => Self::Auipc {
                rd: rd(word),
                imm: imm_utype(word),
            },
            OP_JAL => Self::Jal {
                rd: rd(word),
                imm: imm_jtype(word),
            },
            OP_JALR if funct3 == 0 => Self::Jalr {
                rd: rd(word),
                rs1: rs1(word),
                imm: imm_itype(word),
            },
            OP_BRANCH => {
                let (rs1, rs2, imm) = (rs1(word), rs2(word), imm_btype(word));
                match funct3 {
                    0b000 => Self::Beq { rs1, rs2, imm },
                    0b001 => Self::Bne { rs1, rs2, imm },
                    0b100 => Self::Blt { rs1, rs2, imm },
                    0b101 => Self::Bge { rs1, rs2, imm },
                    0b110 => Self::Bltu { rs1, rs2, imm },
                    0b111 => Self::Bgeu { rs1, rs2, imm },
                    _ => Self::Unknown { word },
                }
            }
            OP_LOAD => {
                let (rd, rs1, imm) = (rd(word), rs1(word), imm_itype(word));
                match funct3 {
                    0b000 => Self::Lb { rd, rs1, imm },
                    0b001 => Self::Lh { rd, rs1, imm },
                    0b010 => Self::Lw { rd, rs1, imm },
                    0b100 => Self::Lbu { rd, rs1, imm },
                    0b101 => Self::Lhu { rd, rs1, imm },
                    _ => Self::Unknown { word },
                }
            }
            OP_STORE => {
                let (rs1, rs2, imm) = (rs1(word), rs2(word), imm_stype(word));
                match funct3 {
                    0b000 => Self::Sb { rs1, rs2, imm },
                    0b001 => Self::Sh { rs1, rs2, imm },
                    0b010 => Self::Sw { rs1, rs2, imm },
                    _ => Self::Unknown { word },
                }
            }
            OP_IMM => {
                let (rd, rs1) = (rd(word), rs1(word));
                let imm = imm_itype(word);
                match funct3 {
                    0b000 => Self::Addi { rd, rs1, imm },
                    0b010 => Self::Slti { rd, rs1, imm },
                    0b011 => Self::Sltiu { rd, rs1, imm },
                    0b100 => Self::Xori { rd, rs1, imm },
                    0b110 => Self::Ori { rd, rs1, imm },
                    0b111 => Self::Andi { rd, rs1, imm },
                    0b001 if funct7 == 0 => Self::Slli {
                        rd,
                        rs1,
                        shamt: shamt(word),
                    },
                    0b101 if funct7 == 0 => Self::Srli {
                        rd,
                        rs1,
                        shamt: shamt(word),
                    },
                    0b101 if funct7 == FUNCT7_SRA => Self::Srai {
                        rd,
                        rs1,
                        shamt: shamt(word),
                    },
                    _ => Self::Unknown { word },
                }
            }
            OP_REG => {
                let (rd, rs1, rs2) = (rd(word), rs1(word), rs2(word));
                match funct3 {
                    0b000 if funct7 == 0 => Self::Add { rd, rs1, rs2 },
                    0b000 if funct7 == FUNCT7_SUB => Self::Sub { rd, rs1, rs2 },
                    0b001 => Self::Sll { rd, rs1, rs2 },
                    0b010 => Self::Slt { rd, rs1, rs2 },
                    0b011 => Self::Sltu { rd, rs1, rs2 },
                    0b100 => Self::Xor { rd, rs1, rs2 },
                    0b101 if funct7 == 0 => Self::Srl { rd, rs1, rs2 },
                    0b101 if funct7 == FUNCT7_SRA => Self::Sra { rd, rs1, rs2 },
                    0b110 => Self::Or { rd, rs1, rs2 },
                    0b111 => Self::And { rd, rs1, rs2 },
                    _ => Self::Unknown { word },
                }
            }
            OP_MISC_MEM if funct3 == 0 => {
                let fm = extract_field(word, 31, 28);
                let pred = extract_field(word, 27, 24);
                let succ = extract_field(word, 23, 20);
                if fm == 0x8 && pred == 0x3 && succ == 0x3 {
                    Self::FenceTso
                } else if (word & 0xffff_f000) == 0x0000_100f {
                    Self::Pause
                } else {
                    Self::Fence
                }
            }
            OP_SYSTEM if funct3 == 0 => match extract_field(word, 31, 20) {
                0x000 => Self::Ecall,
                0x001 => Self::Ebreak,
                _ => Self::Unknown { word },
            },
            _ => Self::Unknown { word },
        }
    }

    /// True for the jump and conditional branch instructions, which
    /// set the program counter to something other than pc + 4 and so
    /// end a translated block.
    pub fn is_control_transfer(&self) -> bool {
        matches!(
            self,
            Self::Jal { .. }
                | Self::Jalr { .. }
                | Self::Beq { .. }
                | Self::Bne { .. }
                | Self::Blt { .. }
                | Self::Bge { .. }
                | Self::Bltu { .. }
                | Self::Bgeu { .. }
        )
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Lui { rd, imm } => write!(f, "lui x{rd}, 0x{:x}", imm >> 12),
            Self::Auipc { rd, imm } => {
                write!(f, "auipc x{rd}, 0x{:x}", imm >> 12)
            }
            Self::Jal { rd, imm } => write!(f, "jal x{rd}, {}", imm as i32),
            Self::Jalr { rd, rs1, imm } => {
                write!(f, "jalr x{rd}, x{rs1}, {}", imm as i32)
            }
            Self::Beq { rs1, rs2, imm } => {
                write!(f, "beq x{rs1}, x{rs2}, {}", imm as i32)
            }
            Self::Bne { rs1, rs2, imm } => {
                write!(f, "bne x{rs1}, x{rs2}, {}", imm as i32)
            }
            Self::Blt { rs1, rs2, imm } => {
                write!(f, "blt x{rs1}, x{rs2}, {}", imm as i32)
            }
            Self::Bge { rs1, rs2, imm } => {
                write!(f, "bge x{rs1}, x{rs2}, {}", imm as i32)
            }
            Self::Bltu { rs1, rs2, imm } => {
                write!(f, "bltu x{rs1}, x{rs2}, {}", imm as i32)
            }
            Self::Bgeu { rs1, rs2, imm } => {
                write!(f, "bgeu x{rs1}, x{rs2}, {}", imm as i32)
            }
            Self::Lb { rd, rs1, imm } => {
                write!(f, "lb x{rd}, {}(x{rs1})", imm as i32)
            }
            Self::Lh { rd, rs1, imm } => {
                write!(f, "lh x{rd}, {}(x{rs1})", imm as i32)
            }
            Self::Lw { rd, rs1, imm } => {
                write!(f, "lw x{rd}, {}(x{rs1})", imm as i32)
            }
            Self::Lbu { rd, rs1, imm } => {
                write!(f, "lbu x{rd}, {}(x{rs1})", imm as i32)
            }
            Self::Lhu { rd, rs1, imm } => {
                write!(f, "lhu x{rd}, {}(x{rs1})", imm as i32)
            }
            Self::Sb { rs1, rs2, imm } => {
                write!(f, "sb x{rs2}, {}(x{rs1})", imm as i32)
            }
            Self::Sh { rs1, rs2, imm } => {
                write!(f, "sh x{rs2}, {}(x{rs1})", imm as i32)
            }
            Self::Sw { rs1, rs2, imm } => {
                write!(f, "sw x{rs2}, {}(x{rs1})", imm as i32)
            }
            Self::Addi { rd, rs1, imm } => {
                write!(f, "addi x{rd}, x{rs1}, {}", imm as i32)
            }
            Self::Slti { rd, rs1, imm } => {
                write!(f, "slti x{rd}, x{rs1}, {}", imm as i32)
            }
            Self::Sltiu { rd, rs1, imm } => {
                write!(f, "sltiu x{rd}, x{rs1}, {}", imm as i32)
            }
            Self::Xori { rd, rs1, imm } => {
                write!(f, "xori x{rd}, x{rs1}, {}", imm as i32)
            }
            Self::Ori { rd, rs1, imm } => {
                write!(f, "ori x{rd}, x{rs1}, {}", imm as i32)
            }
            Self::Andi { rd, rs1, imm } => {
                write!(f, "andi x{rd}, x{rs1}, {}", imm as i32)
            }
            Self::Slli { rd, rs1, shamt } => {
                write!(f, "slli x{rd}, x{rs1}, {shamt}")
            }
            Self::Srli { rd, rs1, shamt } => {
                write!(f, "srli x{rd}, x{rs1}, {shamt}")
            }
            Self::Srai { rd, rs1, shamt } => {
                write!(f, "srai x{rd}, x{rs1}, {shamt}")
            }
            Self::Add { rd, rs1, rs2 } => {
                write!(f, "add x{rd}, x{rs1}, x{rs2}")
            }
            Self::Sub { rd, rs1, rs2 } => {
                write!(f, "sub x{rd}, x{rs1}, x{rs2}")
            }
            Self::Sll { rd, rs1, rs2 } => {
                write!(f, "sll x{rd}, x{rs1}, x{rs2}")
            }
            Self::Slt { rd, rs1, rs2 } => {
                write!(f, "slt x{rd}, x{rs1}, x{rs2}")
            }
            Self::Sltu { rd, rs1, rs2 } => {
                write!(f, "sltu x{rd}, x{rs1}, x{rs2}")
            }
            Self::Xor { rd, rs1, rs2 } => {
                write!(f, "xor x{rd}, x{rs1}, x{rs2}")
            }
            Self::Srl { rd, rs1, rs2 } => {
                write!(f, "srl x{rd}, x{rs1}, x{rs2}")
            }
            Self::Sra { rd, rs1, rs2 } => {
                write!(f, "sra x{rd}, x{rs1}, x{rs2}")
            }
            Self::Or { rd, rs1, rs2 } => {
                write!(f, "or x{rd}, x{rs1}, x{rs2}")
            }
            Self::And { rd, rs1, rs2 } => {
                write!(f, "and x{rd}, x{rs1}, x{rs2}")
            }
            Self::Fence => write!(f, "fence"),
            Self::FenceTso => write!(f, "fence.tso"),
            Self::Pause => write!(f, "pause"),
            Self::Ecall => write!(f, "ecall"),
            Self::Ebreak => write!(f, "ebreak"),
            Self::Unknown { word } => write!(f, "unknown 0x{word:08x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;

    #[test]
    fn decode_utype() {
        assert_eq!(
            Instr::decode(0x1234_52b7),
            Instr::Lui {
                rd: 5,
                imm: 0x1234_5000
            }
        );
        assert_eq!(
            Instr::decode(encode::auipc(3, 0xfffff)),
            Instr::Auipc {
                rd: 3,
                imm: 0xffff_f000
            }
        );
    }

    #[test]
    fn decode_jal() {
        assert_eq!(
            Instr::decode(0x0100_00ef),
            Instr::Jal { rd: 1, imm: 16 }
        );
        // Negative offset sign-extends through bit 20
        assert_eq!(
            Instr::decode(encode::jal(0, -4)),
            Instr::Jal {
                rd: 0,
                imm: (-4i32) as u32
            }
        );
    }

    #[test]
    fn decode_jalr() {
        assert_eq!(
            Instr::decode(encode::jalr(1, 5, -2048)),
            Instr::Jalr {
                rd: 1,
                rs1: 5,
                imm: (-2048i32) as u32
            }
        );
        // Non-zero funct3 is not jalr
        assert_eq!(
            Instr::decode(encode::jalr(1, 5, 0) | 0x1000),
            Instr::Unknown {
                word: encode::jalr(1, 5, 0) | 0x1000
            }
        );
    }

    #[test]
    fn decode_branches() {
        assert_eq!(
            Instr::decode(0x0020_8463),
            Instr::Beq {
                rs1: 1,
                rs2: 2,
                imm: 8
            }
        );
        for (word, expected) in [
            (
                encode::bne(3, 4, -8),
                Instr::Bne {
                    rs1: 3,
                    rs2: 4,
                    imm: (-8i32) as u32,
                },
            ),
            (
                encode::blt(1, 2, 4094),
                Instr::Blt {
                    rs1: 1,
                    rs2: 2,
                    imm: 4094,
                },
            ),
            (
                encode::bge(1, 2, -4096),
                Instr::Bge {
                    rs1: 1,
                    rs2: 2,
                    imm: (-4096i32) as u32,
                },
            ),
            (
                encode::bltu(7, 8, 16),
                Instr::Bltu {
                    rs1: 7,
                    rs2: 8,
                    imm: 16,
                },
            ),
            (
                encode::bgeu(7, 8, 16),
                Instr::Bgeu {
                    rs1: 7,
                    rs2: 8,
                    imm: 16,
                },
            ),
        ] {
            assert_eq!(Instr::decode(word), expected);
        }
    }

    #[test]
    fn decode_loads_and_stores() {
        assert_eq!(
            Instr::decode(encode::lb(4, 2, -1)),
            Instr::Lb {
                rd: 4,
                rs1: 2,
                imm: u32::MAX
            }
        );
        assert_eq!(
            Instr::decode(encode::lh(4, 2, 4)),
            Instr::Lh {
                rd: 4,
                rs1: 2,
                imm: 4
            }
        );
        assert_eq!(
            Instr::decode(encode::lbu(4, 2, 0)),
            Instr::Lbu {
                rd: 4,
                rs1: 2,
                imm: 0
            }
        );
        assert_eq!(
            Instr::decode(encode::lhu(4, 2, 2047)),
            Instr::Lhu {
                rd: 4,
                rs1: 2,
                imm: 2047
            }
        );
        assert_eq!(
            Instr::decode(encode::lw(4, 2, 0)),
            Instr::Lw {
                rd: 4,
                rs1: 2,
                imm: 0
            }
        );
        assert_eq!(
            Instr::decode(encode::sb(3, 2, -2048)),
            Instr::Sb {
                rs1: 2,
                rs2: 3,
                imm: (-2048i32) as u32
            }
        );
        assert_eq!(
            Instr::decode(encode::sh(3, 2, 6)),
            Instr::Sh {
                rs1: 2,
                rs2: 3,
                imm: 6
            }
        );
        assert_eq!(
            Instr::decode(encode::sw(3, 2, 0x42)),
            Instr::Sw {
                rs1: 2,
                rs2: 3,
                imm: 0x42
            }
        );
        // funct3 = 3 (ld) is not an RV32I load
        assert!(matches!(
            Instr::decode(encode::lw(4, 2, 0) | 0x1000),
            Instr::Unknown { .. }
        ));
    }

    #[test]
    fn decode_reg_imm() {
        assert_eq!(
            Instr::decode(0x0050_0093),
            Instr::Addi {
                rd: 1,
                rs1: 0,
                imm: 5
            }
        );
        assert_eq!(
            Instr::decode(0xffd0_8113),
            Instr::Addi {
                rd: 2,
                rs1: 1,
                imm: (-3i32) as u32
            }
        );
        assert_eq!(
            Instr::decode(encode::slti(1, 2, -1)),
            Instr::Slti {
                rd: 1,
                rs1: 2,
                imm: u32::MAX
            }
        );
        assert_eq!(
            Instr::decode(encode::sltiu(1, 2, 2047)),
            Instr::Sltiu {
                rd: 1,
                rs1: 2,
                imm: 2047
            }
        );
        assert_eq!(
            Instr::decode(encode::xori(1, 2, -1)),
            Instr::Xori {
                rd: 1,
                rs1: 2,
                imm: u32::MAX
            }
        );
        assert_eq!(
            Instr::decode(encode::ori(1, 2, 0xff)),
            Instr::Ori {
                rd: 1,
                rs1: 2,
                imm: 0xff
            }
        );
        assert_eq!(
            Instr::decode(encode::andi(1, 2, -2048)),
            Instr::Andi {
                rd: 1,
                rs1: 2,
                imm: (-2048i32) as u32
            }
        );
    }

    #[test]
    fn decode_shift_imm() {
        assert_eq!(
            Instr::decode(encode::slli(1, 2, 31)),
            Instr::Slli {
                rd: 1,
                rs1: 2,
                shamt: 31
            }
        );
        assert_eq!(
            Instr::decode(encode::srli(1, 2, 0)),
            Instr::Srli {
                rd: 1,
                rs1: 2,
                shamt: 0
            }
        );
        assert_eq!(
            Instr::decode(encode::srai(1, 2, 4)),
            Instr::Srai {
                rd: 1,
                rs1: 2,
                shamt: 4
            }
        );
        // slli with a non-zero upper field is not a valid encoding
        assert!(matches!(
            Instr::decode(encode::slli(1, 2, 4) | 0x4000_0000),
            Instr::Unknown { .. }
        ));
    }

    #[test]
    fn decode_reg_reg() {
        assert_eq!(
            Instr::decode(encode::add(4, 1, 2)),
            Instr::Add {
                rd: 4,
                rs1: 1,
                rs2: 2
            }
        );
        assert_eq!(
            Instr::decode(encode::sub(3, 4, 1)),
            Instr::Sub {
                rd: 3,
                rs1: 4,
                rs2: 1
            }
        );
        for (word, expected) in [
            (
                encode::sll(1, 2, 3),
                Instr::Sll {
                    rd: 1,
                    rs1: 2,
                    rs2: 3,
                },
            ),
            (
                encode::slt(1, 2, 3),
                Instr::Slt {
                    rd: 1,
                    rs1: 2,
                    rs2: 3,
                },
            ),
            (
                encode::sltu(1, 2, 3),
                Instr::Sltu {
                    rd: 1,
                    rs1: 2,
                    rs2: 3,
                },
            ),
            (
                encode::xor(1, 2, 3),
                Instr::Xor {
                    rd: 1,
                    rs1: 2,
                    rs2: 3,
                },
            ),
            (
                encode::srl(1, 2, 3),
                Instr::Srl {
                    rd: 1,
                    rs1: 2,
                    rs2: 3,
                },
            ),
            (
                encode::sra(1, 2, 3),
                Instr::Sra {
                    rd: 1,
                    rs1: 2,
                    rs2: 3,
                },
            ),
            (
                encode::or(1, 2, 3),
                Instr::Or {
                    rd: 1,
                    rs1: 2,
                    rs2: 3,
                },
            ),
            (
                encode::and(1, 2, 3),
                Instr::And {
                    rd: 1,
                    rs1: 2,
                    rs2: 3,
                },
            ),
        ] {
            assert_eq!(Instr::decode(word), expected);
        }
    }

    #[test]
    fn decode_fences_and_system() {
        assert_eq!(Instr::decode(encode::fence()), Instr::Fence);
        assert_eq!(Instr::decode(0x8330_000f), Instr::FenceTso);
        // The pause hint (fm=0, pred=w, succ=0) matches neither the
        // tso pattern nor the pause pattern, so it decodes as a
        // plain fence
        assert_eq!(Instr::decode(0x0100_000f), Instr::Fence);
        assert_eq!(Instr::decode(0x0000_0073), Instr::Ecall);
        assert_eq!(Instr::decode(0x0010_0073), Instr::Ebreak);
        // Any other imm12 in the system group is unknown
        assert!(matches!(
            Instr::decode(0x0020_0073),
            Instr::Unknown { .. }
        ));
    }

    #[test]
    fn decode_unknown_words() {
        assert_eq!(Instr::decode(0), Instr::Unknown { word: 0 });
        assert_eq!(
            Instr::decode(0xffff_ffff),
            Instr::Unknown { word: 0xffff_ffff }
        );
    }

    #[test]
    fn control_transfer_kinds() {
        assert!(Instr::decode(encode::jal(1, 16)).is_control_transfer());
        assert!(Instr::decode(encode::jalr(0, 1, 0)).is_control_transfer());
        assert!(Instr::decode(encode::beq(1, 2, 8)).is_control_transfer());
        assert!(!Instr::decode(encode::addi(1, 0, 5)).is_control_transfer());
        assert!(!Instr::decode(encode::ecall()).is_control_transfer());
    }

    #[test]
    fn display_disassembly() {
        assert_eq!(Instr::decode(0x0050_0093).to_string(), "addi x1, x0, 5");
        assert_eq!(
            Instr::decode(0xffd0_8113).to_string(),
            "addi x2, x1, -3"
        );
        assert_eq!(Instr::decode(0x1234_52b7).to_string(), "lui x5, 0x12345");
        assert_eq!(
            Instr::decode(encode::sw(3, 2, 0)).to_string(),
            "sw x3, 0(x2)"
        );
    }
}
