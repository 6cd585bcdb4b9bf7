use std::{fmt, str::FromStr};

use miette::SourceSpan;

use crate::bits::{get_bits, Word};

/// Keyboard status register. Bit 15 is set while a character is waiting in [`KBDR`].
pub const KBSR: Word = 0xFE00;
/// Keyboard data register.
pub const KBDR: Word = 0xFE02;

/// Location within source
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Span {
    offs: SrcOffset,
    len: usize,
}

impl Span {
    pub fn new(offs: SrcOffset, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn offs(&self) -> usize {
        self.offs.0
    }

    pub fn end(&self) -> usize {
        self.offs.0 + self.len
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}

/// Used to refer to offsets from the start of a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Debug)]
pub struct SrcOffset(pub usize);

/// Represents the CPU registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Register {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    /// Link register, written by `JSR`, `JSRR` and `TRAP`.
    R7,
}

impl Register {
    pub const ALL: [Register; 8] = [
        Register::R0,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
    ];

    /// Register selected by the low three bits of `bits`.
    pub fn from_bits(bits: Word) -> Self {
        Self::ALL[(bits & 0b111) as usize]
    }

    pub fn bits(self) -> Word {
        self as Word
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for Register {
    type Err = ();

    /// Exact, case-insensitive match of `R0` to `R7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            [b'r' | b'R', n @ b'0'..=b'7'] => Ok(Self::ALL[(n - b'0') as usize]),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.index())
    }
}

/// Four bit instruction class, stored in bits 15 to 12.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Rti = 0x8,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jmp = 0xC,
    Res = 0xD,
    Lea = 0xE,
    Trap = 0xF,
}

impl Opcode {
    pub fn of(instr: Word) -> Self {
        match get_bits(instr, 12, 4) {
            0x0 => Opcode::Br,
            0x1 => Opcode::Add,
            0x2 => Opcode::Ld,
            0x3 => Opcode::St,
            0x4 => Opcode::Jsr,
            0x5 => Opcode::And,
            0x6 => Opcode::Ldr,
            0x7 => Opcode::Str,
            0x8 => Opcode::Rti,
            0x9 => Opcode::Not,
            0xA => Opcode::Ldi,
            0xB => Opcode::Sti,
            0xC => Opcode::Jmp,
            0xD => Opcode::Res,
            0xE => Opcode::Lea,
            _ => Opcode::Trap,
        }
    }

    /// Opcode shifted into position.
    pub fn bits(self) -> Word {
        (self as Word) << 12
    }
}

/// Set by a subset of instructions, representing whether the result was negative, zero, or
/// positive.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunFlag {
    N = 0b100,
    Z = 0b010,
    P = 0b001,
    /// No flag-affecting instruction has run yet.
    Uninit = 0b000,
}

impl RunFlag {
    pub fn of(result: Word) -> Self {
        if result == 0 {
            RunFlag::Z
        } else if crate::bits::is_negative(result) {
            RunFlag::N
        } else {
            RunFlag::P
        }
    }

    pub fn bits(self) -> Word {
        self as Word
    }
}

impl fmt::Display for RunFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = self.bits();
        for (mask, ch) in [(0b100, 'N'), (0b010, 'Z'), (0b001, 'P')] {
            let ch = if bits & mask != 0 { ch } else { '_' };
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}

/// Set of condition codes tested by a branch, encoded `nzp` in bits 11 to 9.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Condition(Word);

impl Condition {
    pub const N: Condition = Condition(0b100);
    pub const Z: Condition = Condition(0b010);
    pub const P: Condition = Condition(0b001);
    pub const NZP: Condition = Condition(0b111);

    pub fn from_bits(bits: Word) -> Self {
        Condition(bits & 0b111)
    }

    /// Conditions named by a branch mnemonic such as `BRNZ`. Plain `BR` branches always.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        let suffix = mnemonic.strip_prefix("BR")?;
        if suffix.is_empty() {
            return Some(Self::NZP);
        }
        let mut cond = Condition::default();
        // Flags must appear in `nzp` order, at most once each
        let mut rest = suffix;
        for (ch, flag) in [('N', Self::N), ('Z', Self::Z), ('P', Self::P)] {
            if let Some(tail) = rest.strip_prefix(ch) {
                cond = cond | flag;
                rest = tail;
            }
        }
        rest.is_empty().then_some(cond)
    }

    pub fn bits(self) -> Word {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn matches(self, flag: RunFlag) -> bool {
        self.0 & flag.bits() != 0
    }
}

impl std::ops::BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Self) -> Self::Output {
        Condition(self.0 | rhs.0)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BR")?;
        for (mask, ch) in [(0b100, 'N'), (0b010, 'Z'), (0b001, 'P')] {
            if self.0 & mask != 0 {
                write!(f, "{ch}")?;
            }
        }
        Ok(())
    }
}

/// Trap vectors with a dedicated mnemonic.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TrapVect {
    Getc = 0x20,
    Out = 0x21,
    Puts = 0x22,
    In = 0x23,
    Putsp = 0x24,
    Halt = 0x25,
}

impl TrapVect {
    pub fn from_vect(vect: Word) -> Option<Self> {
        Some(match vect {
            0x20 => TrapVect::Getc,
            0x21 => TrapVect::Out,
            0x22 => TrapVect::Puts,
            0x23 => TrapVect::In,
            0x24 => TrapVect::Putsp,
            0x25 => TrapVect::Halt,
            _ => return None,
        })
    }

    pub fn vect(self) -> Word {
        self as Word
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            TrapVect::Getc => "GETC",
            TrapVect::Out => "OUT",
            TrapVect::Puts => "PUTS",
            TrapVect::In => "IN",
            TrapVect::Putsp => "PUTSP",
            TrapVect::Halt => "HALT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_names() {
        assert_eq!("R0".parse::<Register>(), Ok(Register::R0));
        assert_eq!("r7".parse::<Register>(), Ok(Register::R7));
        assert_eq!("R8".parse::<Register>(), Err(()));
        assert_eq!("R".parse::<Register>(), Err(()));
        assert_eq!("R01".parse::<Register>(), Err(()));
        assert_eq!(Register::from_bits(0b1101), Register::R5);
    }

    #[test]
    fn exactly_one_flag() {
        for word in [0u16, 1, 0x7fff, 0x8000, 0xffff, 42, 0x1234, 0xdead] {
            let flag = RunFlag::of(word);
            assert_eq!(flag.bits().count_ones(), 1);
            match flag {
                RunFlag::Z => assert_eq!(word, 0),
                RunFlag::N => assert!(word != 0 && word & 0x8000 != 0),
                RunFlag::P => assert!(word != 0 && word & 0x8000 == 0),
                RunFlag::Uninit => unreachable!(),
            }
        }
    }

    #[test]
    fn branch_mnemonics() {
        assert_eq!(Condition::from_mnemonic("BR"), Some(Condition::NZP));
        assert_eq!(Condition::from_mnemonic("BRN"), Some(Condition::N));
        assert_eq!(
            Condition::from_mnemonic("BRZP"),
            Some(Condition::Z | Condition::P)
        );
        assert_eq!(Condition::from_mnemonic("BRNZP"), Some(Condition::NZP));
        assert_eq!(Condition::from_mnemonic("BRPN"), None);
        assert_eq!(Condition::from_mnemonic("BRX"), None);
        assert_eq!(Condition::from_mnemonic("ADD"), None);
        assert_eq!((Condition::N | Condition::P).to_string(), "BRNP");
    }
}
