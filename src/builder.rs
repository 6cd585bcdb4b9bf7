//! Instruction builders. Each function packs its operands into the fixed layout of one
//! addressing mode; [`crate::disasm`] reverses exactly these layouts.
//!
//! Immediates and offsets are squeezed into their fields with [`sign_compress`], so values that
//! are too wide lose their high bits rather than failing.

use crate::{
    bits::{sign_compress, Word},
    error::ConstructionError,
    symbol::{Condition, Opcode, Register, TrapVect},
};

// | 15 | 14 | 13 | 12 | 11 | 10 |  9 |  8 |  7 |  6 |  5 |  4 |  3 |  2 |  1 |  0 |
// |  opcode           |      DR      |      SR1     |              ...            |
#[inline]
fn dr(reg: Register) -> Word {
    reg.bits() << 9
}

#[inline]
fn sr(reg: Register) -> Word {
    reg.bits() << 6
}

/// `BR{n}{z}{p} PCoffset9`. Fails if no flag is requested.
pub fn br(cond: Condition, pc_offset9: Word) -> Result<Word, ConstructionError> {
    if cond.is_empty() {
        return Err(ConstructionError::NoConditionFlags);
    }
    Ok(Opcode::Br.bits() | sign_compress(cond.bits(), 3) << 9 | sign_compress(pc_offset9, 9))
}

pub fn add_reg(dest: Register, src1: Register, src2: Register) -> Word {
    Opcode::Add.bits() | dr(dest) | sr(src1) | src2.bits()
}

pub fn add_imm(dest: Register, src: Register, imm5: Word) -> Word {
    Opcode::Add.bits() | dr(dest) | sr(src) | 1 << 5 | sign_compress(imm5, 5)
}

pub fn and_reg(dest: Register, src1: Register, src2: Register) -> Word {
    Opcode::And.bits() | dr(dest) | sr(src1) | src2.bits()
}

pub fn and_imm(dest: Register, src: Register, imm5: Word) -> Word {
    Opcode::And.bits() | dr(dest) | sr(src) | 1 << 5 | sign_compress(imm5, 5)
}

pub fn ld(dest: Register, pc_offset9: Word) -> Word {
    Opcode::Ld.bits() | dr(dest) | sign_compress(pc_offset9, 9)
}

pub fn ldi(dest: Register, pc_offset9: Word) -> Word {
    Opcode::Ldi.bits() | dr(dest) | sign_compress(pc_offset9, 9)
}

pub fn lea(dest: Register, pc_offset9: Word) -> Word {
    Opcode::Lea.bits() | dr(dest) | sign_compress(pc_offset9, 9)
}

pub fn st(src: Register, pc_offset9: Word) -> Word {
    Opcode::St.bits() | dr(src) | sign_compress(pc_offset9, 9)
}

pub fn sti(src: Register, pc_offset9: Word) -> Word {
    Opcode::Sti.bits() | dr(src) | sign_compress(pc_offset9, 9)
}

pub fn ldr(dest: Register, base: Register, offset6: Word) -> Word {
    Opcode::Ldr.bits() | dr(dest) | sr(base) | sign_compress(offset6, 6)
}

pub fn str(src: Register, base: Register, offset6: Word) -> Word {
    Opcode::Str.bits() | dr(src) | sr(base) | sign_compress(offset6, 6)
}

/// Bits 5 to 0 are always set.
pub fn not(dest: Register, src: Register) -> Word {
    Opcode::Not.bits() | dr(dest) | sr(src) | 0b111111
}

/// Subroutine call relative to PC, bit 11 set.
pub fn jsr(pc_offset11: Word) -> Word {
    Opcode::Jsr.bits() | 1 << 11 | sign_compress(pc_offset11, 11)
}

/// Subroutine call through a base register, bit 11 clear.
pub fn jsrr(base: Register) -> Word {
    Opcode::Jsr.bits() | sr(base)
}

pub fn jmp(base: Register) -> Word {
    Opcode::Jmp.bits() | sr(base)
}

/// `JMP R7`.
pub fn ret() -> Word {
    jmp(Register::R7)
}

pub fn trap(trap_vect8: Word) -> Word {
    Opcode::Trap.bits() | sign_compress(trap_vect8, 8)
}

pub fn trap_named(vect: TrapVect) -> Word {
    trap(vect.vect())
}

pub fn getc() -> Word {
    trap_named(TrapVect::Getc)
}

pub fn out() -> Word {
    trap_named(TrapVect::Out)
}

pub fn puts() -> Word {
    trap_named(TrapVect::Puts)
}

pub fn in_() -> Word {
    trap_named(TrapVect::In)
}

pub fn putsp() -> Word {
    trap_named(TrapVect::Putsp)
}

pub fn halt() -> Word {
    trap_named(TrapVect::Halt)
}
