//! Plain-text views of machine state: a register header and a hex dump of memory with
//! disassembly alongside.

use std::fmt;

use crate::{
    bits::Word,
    disasm::{Disasm, LiteralMode},
    runtime::{Vm, MEMORY_MAX},
    symbol::Register,
    translator::LabelRegistry,
};

/// Words per row of the memory dump.
pub const WORDS_PER_LINE: usize = 8;

/// Word as its two bytes in hex followed by its unsigned value, like `30 00(12288)`.
pub struct WordBytes(pub Word);

impl fmt::Display for WordBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X}({})", self.0 >> 8, self.0 & 0xFF, self.0)
    }
}

/// Counter, PC, flags and registers, then the instruction at PC.
pub struct RegisterDump<'a> {
    pub vm: &'a Vm,
    pub mode: LiteralMode,
}

impl fmt::Display for RegisterDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vm = self.vm;
        writeln!(f, "Executed:  {}", vm.executed())?;
        write!(f, "Registers: PC {} Flags [{}]", WordBytes(vm.pc()), vm.flag())?;
        for reg in Register::ALL {
            write!(f, " r{}={}", reg.index(), WordBytes(vm.reg(reg)))?;
        }
        writeln!(f)?;
        let instr = vm.peek(vm.pc());
        writeln!(
            f,
            "Instruction: {}; {}",
            Disasm {
                instr,
                mode: self.mode
            },
            WordBytes(instr)
        )
    }
}

/// Labels in declaration order with their addresses.
pub struct LabelDump<'a>(pub &'a LabelRegistry);

impl fmt::Display for LabelDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Labels:")?;
        for (label, addr) in self.0 {
            writeln!(f, "  {label:<16} x{addr:04X}")?;
        }
        Ok(())
    }
}

/// Hex dump of all of memory. The first row is always shown; later runs of all-zero rows
/// collapse into a single `*` line.
pub struct MemoryDump<'a> {
    pub vm: &'a Vm,
    pub mode: LiteralMode,
}

impl fmt::Display for MemoryDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mem = self.vm.memory();
        let mut in_empty_run = false;
        for (row, words) in mem.chunks(WORDS_PER_LINE).enumerate() {
            let empty = words.iter().all(|&word| word == 0);
            if row > 0 && empty {
                if !in_empty_run {
                    writeln!(f, "   *")?;
                    in_empty_run = true;
                }
                continue;
            }
            in_empty_run = false;
            self.row(f, row * WORDS_PER_LINE, words)?;
        }
        Ok(())
    }
}

impl MemoryDump<'_> {
    fn row(&self, f: &mut fmt::Formatter<'_>, addr: usize, words: &[Word]) -> fmt::Result {
        debug_assert!(addr < MEMORY_MAX);
        write!(f, "0x{:04X}  ", addr)?;
        for word in words {
            write!(f, "{:02X} {:02X}  ", word >> 8, word & 0xFF)?;
        }
        for word in words {
            for byte in word.to_be_bytes() {
                let ch = if byte.is_ascii_graphic() || byte == b' ' {
                    byte as char
                } else {
                    '.'
                };
                write!(f, "{ch}")?;
            }
        }
        let listing = words
            .iter()
            .map(|&instr| {
                Disasm {
                    instr,
                    mode: self.mode,
                }
                .to_string()
            })
            .collect::<Vec<_>>()
            .join("; ");
        writeln!(f, " {listing}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;

    #[test]
    fn word_bytes() {
        assert_eq!(WordBytes(0x3000).to_string(), "30 00(12288)");
        assert_eq!(WordBytes(0xFFFF).to_string(), "FF FF(65535)");
        assert_eq!(WordBytes(7).to_string(), "00 07(7)");
    }

    #[test]
    fn register_header() {
        let mut vm = Vm::new();
        vm.write_mem(0x3000, builder::halt());
        vm.set_origin(0x3000).unwrap();
        vm.set_reg(Register::R2, 0xFFFF);
        let text = RegisterDump {
            vm: &vm,
            mode: LiteralMode::Hex,
        }
        .to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Executed:  0");
        assert!(lines[1].starts_with("Registers: PC 30 00(12288) Flags [___] r0=00 00(0)"));
        assert!(lines[1].contains(" r2=FF FF(65535) "));
        assert_eq!(lines[2], "Instruction: HALT; F0 25(61477)");
    }

    #[test]
    fn labels_in_order() {
        let (_, labels) = crate::assemble(".orig x3000\nzed halt\nabc .fill #1").unwrap();
        assert_eq!(
            LabelDump(&labels).to_string(),
            "Labels:\n  ZED              x3000\n  ABC              x3001\n"
        );
    }

    #[test]
    fn memory_rows() {
        let mut vm = Vm::new();
        vm.write_mem(0, builder::halt());
        vm.write_mem(0x3001, 'h' as Word);
        let text = MemoryDump {
            vm: &vm,
            mode: LiteralMode::Hex,
        }
        .to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);

        let expected = format!(
            "0x0000  F0 25  {}.%{} HALT{}",
            "00 00  ".repeat(7),
            ".".repeat(14),
            "; NOP".repeat(7)
        );
        assert_eq!(lines[0], expected);
        assert_eq!(lines[1], "   *");
        assert!(lines[2].starts_with("0x3000  00 00  00 68  "));
        assert!(lines[2].contains("...h"));
        assert_eq!(lines[3], "   *");
    }
}
