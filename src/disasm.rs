use std::fmt;

use crate::{
    bits::{get_bits, get_bits_extended, Word},
    symbol::{Condition, Opcode, Register, TrapVect},
};

/// How numeric literals are written in disassembly.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum LiteralMode {
    /// `x1f`, `xffff`
    #[default]
    Hex,
    /// `#31`, `#-1`
    Dec,
}

impl std::str::FromStr for LiteralMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hex" => Ok(LiteralMode::Hex),
            "dec" => Ok(LiteralMode::Dec),
            _ => Err(format!("Unknown literal mode '{}'", s)),
        }
    }
}

/// Canonical assembly text of a single word.
pub fn disassemble(instr: Word, mode: LiteralMode) -> String {
    Disasm { instr, mode }.to_string()
}

/// Lazily formatted disassembly of a single word.
#[derive(Clone, Copy, Debug)]
pub struct Disasm {
    pub instr: Word,
    pub mode: LiteralMode,
}

/// Literal taken from a sign-extended field.
struct Signed(Word, LiteralMode);

/// Literal taken from an unsigned field.
struct Unsigned(Word, LiteralMode);

impl fmt::Display for Signed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            LiteralMode::Hex => write!(f, "x{:x}", self.0),
            LiteralMode::Dec => write!(f, "#{}", self.0 as i16),
        }
    }
}

impl fmt::Display for Unsigned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            LiteralMode::Hex => write!(f, "x{:x}", self.0),
            LiteralMode::Dec => write!(f, "#{}", self.0),
        }
    }
}

impl fmt::Display for Disasm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let instr = self.instr;
        let mode = self.mode;
        let reg = |from| Register::from_bits(get_bits(instr, from, 3));
        let signed = |bits| Signed(get_bits_extended(instr, 0, bits), mode);
        // Immediate forms of ADD and AND select on bit 5
        let imm = get_bits(instr, 5, 1) == 1;

        match Opcode::of(instr) {
            Opcode::Br => {
                let cond = Condition::from_bits(get_bits(instr, 9, 3));
                if cond.is_empty() {
                    // Reserved encoding, includes zeroed memory
                    write!(f, "NOP")
                } else {
                    write!(f, "{} {}", cond, signed(9))
                }
            }
            Opcode::Add | Opcode::And => {
                let name = if Opcode::of(instr) == Opcode::Add {
                    "ADD"
                } else {
                    "AND"
                };
                write!(f, "{} {}, {}, ", name, reg(9), reg(6))?;
                if imm {
                    write!(f, "{}", signed(5))
                } else {
                    write!(f, "{}", reg(0))
                }
            }
            Opcode::Ld => write!(f, "LD {}, {}", reg(9), signed(9)),
            Opcode::Ldi => write!(f, "LDI {}, {}", reg(9), signed(9)),
            Opcode::Lea => write!(f, "LEA {}, {}", reg(9), signed(9)),
            Opcode::St => write!(f, "ST {}, {}", reg(9), signed(9)),
            Opcode::Sti => write!(f, "STI {}, {}", reg(9), signed(9)),
            Opcode::Ldr => write!(f, "LDR {}, {}, {}", reg(9), reg(6), signed(6)),
            Opcode::Str => write!(f, "STR {}, {}, {}", reg(9), reg(6), signed(6)),
            Opcode::Not => write!(f, "NOT {}, {}", reg(9), reg(6)),
            Opcode::Jsr => {
                if get_bits(instr, 11, 1) == 1 {
                    write!(f, "JSR {}", signed(11))
                } else {
                    write!(f, "JSRR {}", reg(6))
                }
            }
            Opcode::Jmp => match reg(6) {
                Register::R7 => write!(f, "RET"),
                base => write!(f, "JMP {}", base),
            },
            Opcode::Trap => {
                let vect = get_bits(instr, 0, 8);
                match TrapVect::from_vect(vect) {
                    Some(named) => f.write_str(named.mnemonic()),
                    None => write!(f, "TRAP {}", Unsigned(vect, mode)),
                }
            }
            Opcode::Rti => write!(f, "RTI"),
            Opcode::Res => write!(f, "RES"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use crate::symbol::Register::*;
    use LiteralMode::*;

    fn hex(word: Word) -> String {
        disassemble(word, Hex)
    }

    fn dec(word: Word) -> String {
        disassemble(word, Dec)
    }

    #[test]
    fn round_trip_operate() {
        assert_eq!(hex(builder::add_reg(R1, R2, R3)), "ADD R1, R2, R3");
        assert_eq!(hex(builder::add_imm(R1, R2, 3)), "ADD R1, R2, x3");
        assert_eq!(dec(builder::add_imm(R1, R2, -16i16 as Word)), "ADD R1, R2, #-16");
        assert_eq!(hex(builder::add_imm(R0, R0, -1i16 as Word)), "ADD R0, R0, xffff");
        assert_eq!(hex(builder::and_reg(R7, R0, R4)), "AND R7, R0, R4");
        assert_eq!(dec(builder::and_imm(R5, R7, 13)), "AND R5, R7, #13");
        assert_eq!(dec(builder::and_imm(R5, R7, -3i16 as Word)), "AND R5, R7, #-3");
        assert_eq!(hex(builder::not(R3, R4)), "NOT R3, R4");
    }

    #[test]
    fn round_trip_memory() {
        assert_eq!(dec(builder::ld(R0, -1i16 as Word)), "LD R0, #-1");
        assert_eq!(hex(builder::ld(R2, 0x2a)), "LD R2, x2a");
        assert_eq!(dec(builder::st(R5, 42)), "ST R5, #42");
        assert_eq!(dec(builder::ldi(R1, 255)), "LDI R1, #255");
        assert_eq!(dec(builder::sti(R1, -256i16 as Word)), "STI R1, #-256");
        assert_eq!(dec(builder::lea(R6, 7)), "LEA R6, #7");
        assert_eq!(dec(builder::ldr(R0, R6, 1)), "LDR R0, R6, #1");
        assert_eq!(dec(builder::str(R0, R6, -32i16 as Word)), "STR R0, R6, #-32");
    }

    #[test]
    fn round_trip_control() {
        let br = builder::br(Condition::N | Condition::Z, 5).unwrap();
        assert_eq!(dec(br), "BRNZ #5");
        let br = builder::br(Condition::NZP, -1i16 as Word).unwrap();
        assert_eq!(hex(br), "BRNZP xffff");
        assert_eq!(dec(builder::jsr(1)), "JSR #1");
        assert_eq!(dec(builder::jsr(-1024i16 as Word)), "JSR #-1024");
        assert_eq!(hex(builder::jsrr(R3)), "JSRR R3");
        assert_eq!(hex(builder::jmp(R2)), "JMP R2");
        assert_eq!(hex(builder::ret()), "RET");
    }

    #[test]
    fn traps() {
        assert_eq!(hex(builder::getc()), "GETC");
        assert_eq!(hex(builder::out()), "OUT");
        assert_eq!(hex(builder::puts()), "PUTS");
        assert_eq!(hex(builder::in_()), "IN");
        assert_eq!(hex(builder::putsp()), "PUTSP");
        assert_eq!(hex(builder::halt()), "HALT");
        assert_eq!(hex(builder::trap(0x30)), "TRAP x30");
        assert_eq!(dec(builder::trap(0xff)), "TRAP #255");
    }

    #[test]
    fn placeholders() {
        assert_eq!(hex(0x0000), "NOP");
        assert_eq!(hex(0x8000), "RTI");
        assert_eq!(hex(0xD000), "RES");
    }

    #[test]
    fn literal_mode_from_str() {
        assert_eq!("dec".parse::<LiteralMode>(), Ok(Dec));
        assert_eq!("HEX".parse::<LiteralMode>(), Ok(Hex));
        assert!("oct".parse::<LiteralMode>().is_err());
    }
}
