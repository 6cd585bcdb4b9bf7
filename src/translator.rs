//! Two-pass translation of parsed lines into VM memory.
//!
//! Pass 1 walks the lines and records every prefix label's address. Pass 2 repeats the walk
//! with the same address arithmetic, resolves operands against the finished registry and writes
//! encoded words.

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::{
    air::{Line, Operand},
    bits::Word,
    builder,
    error::AsmError,
    parser::parse,
    runtime::Vm,
    symbol::{Condition, Register},
};

/// Label name to absolute address, in declaration order.
pub type LabelRegistry = IndexMap<String, Word, FxBuildHasher>;

/// What an operand slot of a signature accepts.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OperandKind {
    Register,
    /// Number, or a label standing for its absolute address
    Immediate,
    /// Number, or a label standing for its distance from the incremented PC
    Offset,
    String,
}

impl OperandKind {
    pub fn accepts(self, operand: &Operand) -> bool {
        matches!(
            (self, operand),
            (OperandKind::Register, Operand::Register(_))
                | (
                    OperandKind::Immediate | OperandKind::Offset,
                    Operand::Number(_) | Operand::Label(_)
                )
                | (OperandKind::String, Operand::Str(_))
        )
    }
}

/// How a matched line becomes memory, keyed by the shape of its resolved operands.
#[derive(Clone, Copy, Debug)]
pub enum Encoder {
    RegRegReg(fn(Register, Register, Register) -> Word),
    RegRegVal(fn(Register, Register, Word) -> Word),
    RegReg(fn(Register, Register) -> Word),
    RegVal(fn(Register, Word) -> Word),
    Reg(fn(Register) -> Word),
    Val(fn(Word) -> Word),
    Nullary(fn() -> Word),
    /// Conditions come from the mnemonic suffix
    Branch,
    Orig,
    Fill,
    Blkw,
    Stringz,
    End,
}

#[derive(Clone, Copy, Debug)]
pub struct Signature {
    pub opcode: &'static str,
    pub operands: &'static [OperandKind],
    pub encoder: Encoder,
}

const fn sig(
    opcode: &'static str,
    operands: &'static [OperandKind],
    encoder: Encoder,
) -> Signature {
    Signature {
        opcode,
        operands,
        encoder,
    }
}

use Encoder as E;
use OperandKind::{Immediate as Imm, Offset as Off, Register as Reg, String as Str};

/// Every accepted line form. Searched in order, first match wins.
pub static SIGNATURES: &[Signature] = &[
    sig("BR", &[Off], E::Branch),
    sig("ADD", &[Reg, Reg, Reg], E::RegRegReg(builder::add_reg)),
    sig("ADD", &[Reg, Reg, Imm], E::RegRegVal(builder::add_imm)),
    sig("LD", &[Reg, Off], E::RegVal(builder::ld)),
    sig("ST", &[Reg, Off], E::RegVal(builder::st)),
    sig("JSR", &[Off], E::Val(builder::jsr)),
    sig("JSR", &[Reg], E::Reg(builder::jsrr)),
    sig("JSRR", &[Reg], E::Reg(builder::jsrr)),
    sig("AND", &[Reg, Reg, Imm], E::RegRegVal(builder::and_imm)),
    sig("AND", &[Reg, Reg, Reg], E::RegRegReg(builder::and_reg)),
    sig("LDR", &[Reg, Reg, Off], E::RegRegVal(builder::ldr)),
    sig("STR", &[Reg, Reg, Off], E::RegRegVal(builder::str)),
    sig("NOT", &[Reg, Reg], E::RegReg(builder::not)),
    sig("LDI", &[Reg, Off], E::RegVal(builder::ldi)),
    sig("STI", &[Reg, Off], E::RegVal(builder::sti)),
    sig("JMP", &[Reg], E::Reg(builder::jmp)),
    sig("RET", &[], E::Nullary(builder::ret)),
    sig("LEA", &[Reg, Off], E::RegVal(builder::lea)),
    sig("GETC", &[], E::Nullary(builder::getc)),
    sig("OUT", &[], E::Nullary(builder::out)),
    sig("PUTS", &[], E::Nullary(builder::puts)),
    sig("IN", &[], E::Nullary(builder::in_)),
    sig("PUTSP", &[], E::Nullary(builder::putsp)),
    sig("HALT", &[], E::Nullary(builder::halt)),
    sig("TRAP", &[Imm], E::Val(builder::trap)),
    sig(".FILL", &[Imm], E::Fill),
    sig(".BLKW", &[Imm], E::Blkw),
    sig(".ORIG", &[Imm], E::Orig),
    sig(".STRINGZ", &[Str], E::Stringz),
    sig(".END", &[], E::End),
];

/// First signature accepting `opcode` with these operands.
pub fn find_signature(opcode: &str, operands: &[Operand]) -> Option<&'static Signature> {
    // All branch mnemonics share one form
    let key = if Condition::from_mnemonic(opcode).is_some() {
        "BR"
    } else {
        opcode
    };
    SIGNATURES.iter().find(|sig| {
        sig.opcode == key
            && sig.operands.len() == operands.len()
            && sig.operands.iter().zip(operands).all(|(kind, op)| kind.accepts(op))
    })
}

/// Signature of a line, or `None` for lines without an opcode.
fn line_signature(line: &Line) -> Result<Option<&'static Signature>, AsmError> {
    let Some(opcode) = &line.opcode else {
        return Ok(None);
    };
    find_signature(opcode, &line.operands)
        .map(Some)
        .ok_or_else(|| AsmError::UnknownSignature {
            line: line.number,
            span: line.span,
            opcode: opcode.clone(),
        })
}

/// Address following `line` when it starts at `addr`. Both passes advance through here.
fn footprint(sig: &Signature, line: &Line, addr: Word) -> Result<Word, AsmError> {
    let next = match (sig.encoder, line.operands.as_slice()) {
        (E::Orig, [Operand::Number(origin)]) => *origin,
        (E::Orig, _) => {
            return Err(AsmError::OriginNotNumber {
                line: line.number,
                span: line.span,
            })
        }
        (E::Blkw, [Operand::Number(count)]) => addr.wrapping_add(*count),
        (E::Blkw, _) => {
            return Err(AsmError::UnknownSignature {
                line: line.number,
                span: line.span,
                opcode: sig.opcode.to_string(),
            })
        }
        (E::Stringz, [Operand::Str(text)]) => {
            addr.wrapping_add(text.len() as Word).wrapping_add(1)
        }
        (E::End, _) => addr,
        _ => addr.wrapping_add(1),
    };
    Ok(next)
}

/// Pass 1: address of every prefix label.
///
/// A label sharing a line with `.ORIG` gets the address in effect before the origin moves.
pub fn collect_labels(lines: &[Line]) -> Result<LabelRegistry, AsmError> {
    let mut labels = LabelRegistry::default();
    let mut addr: Word = 0;
    for line in lines {
        if let Some(label) = &line.label {
            if labels.contains_key(label) {
                return Err(AsmError::DuplicateLabel {
                    line: line.number,
                    span: line.span,
                    label: label.clone(),
                });
            }
            labels.insert(label.clone(), addr);
        }
        let Some(sig) = line_signature(line)? else {
            continue;
        };
        if matches!(sig.encoder, E::End) {
            break;
        }
        addr = footprint(sig, line, addr)?;
    }
    Ok(labels)
}

/// Operand after label resolution.
#[derive(Clone, Copy, Debug)]
enum Arg<'a> {
    Reg(Register),
    Val(Word),
    Str(&'a str),
}

fn resolve<'a>(
    kind: OperandKind,
    operand: &'a Operand,
    addr: Word,
    labels: &LabelRegistry,
    line: &Line,
) -> Result<Arg<'a>, AsmError> {
    let arg = match operand {
        Operand::Register(reg) => Arg::Reg(*reg),
        Operand::Number(val) => Arg::Val(*val),
        Operand::Str(text) => Arg::Str(text),
        Operand::Label(label) => {
            let target = *labels
                .get(label)
                .ok_or_else(|| AsmError::UndefinedLabel {
                    line: line.number,
                    span: line.span,
                    label: label.clone(),
                })?;
            match kind {
                OperandKind::Offset => Arg::Val(target.wrapping_sub(addr.wrapping_add(1))),
                _ => Arg::Val(target),
            }
        }
    };
    Ok(arg)
}

/// Pass 2: encode every line into `vm`, moving its origin on `.ORIG`.
fn emit(lines: &[Line], labels: &LabelRegistry, vm: &mut Vm) -> Result<(), AsmError> {
    let mut addr: Word = 0;
    for line in lines {
        let Some(sig) = line_signature(line)? else {
            continue;
        };
        let args = sig
            .operands
            .iter()
            .zip(&line.operands)
            .map(|(kind, op)| resolve(*kind, op, addr, labels, line))
            .collect::<Result<Vec<_>, _>>()?;
        let next = footprint(sig, line, addr)?;
        let mismatch = || AsmError::UnknownSignature {
            line: line.number,
            span: line.span,
            opcode: sig.opcode.to_string(),
        };

        let word = match (sig.encoder, args.as_slice()) {
            (E::RegRegReg(f), [Arg::Reg(a), Arg::Reg(b), Arg::Reg(c)]) => f(*a, *b, *c),
            (E::RegRegVal(f), [Arg::Reg(a), Arg::Reg(b), Arg::Val(v)]) => f(*a, *b, *v),
            (E::RegReg(f), [Arg::Reg(a), Arg::Reg(b)]) => f(*a, *b),
            (E::RegVal(f), [Arg::Reg(a), Arg::Val(v)]) => f(*a, *v),
            (E::Reg(f), [Arg::Reg(a)]) => f(*a),
            (E::Val(f), [Arg::Val(v)]) => f(*v),
            (E::Nullary(f), []) => f(),
            (E::Branch, [Arg::Val(offset)]) => {
                let opcode = line.opcode.as_deref().unwrap_or_default();
                let cond = Condition::from_mnemonic(opcode).ok_or_else(mismatch)?;
                builder::br(cond, *offset).map_err(|error| AsmError::Construction {
                    line: line.number,
                    span: line.span,
                    error,
                })?
            }
            (E::Fill, [Arg::Val(v)]) => *v,
            (E::Orig, _) => {
                // A running machine keeps its PC
                let _ = vm.set_origin(next);
                addr = next;
                continue;
            }
            (E::Blkw, _) => {
                let mut at = addr;
                while at != next {
                    vm.write_mem(at, 0);
                    at = at.wrapping_add(1);
                }
                addr = next;
                continue;
            }
            (E::Stringz, [Arg::Str(text)]) => {
                let mut at = addr;
                for byte in text.bytes() {
                    vm.write_mem(at, byte as Word);
                    at = at.wrapping_add(1);
                }
                vm.write_mem(at, 0);
                addr = next;
                continue;
            }
            (E::End, _) => break,
            _ => return Err(mismatch()),
        };
        vm.write_mem(addr, word);
        addr = next;
    }
    Ok(())
}

/// Translate parsed lines into `vm`, returning the labels used.
///
/// Words written before an error stay in memory.
pub fn translate(lines: &[Line], vm: &mut Vm) -> Result<LabelRegistry, AsmError> {
    let labels = collect_labels(lines)?;
    emit(lines, &labels, vm)?;
    Ok(labels)
}

/// Parse and translate `src` into a fresh machine.
pub fn assemble(src: &str) -> Result<(Vm, LabelRegistry), AsmError> {
    let lines = parse(src)?;
    let mut vm = Vm::new();
    let labels = translate(&lines, &mut vm)?;
    Ok((vm, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Register::*;

    fn lines(src: &str) -> Vec<Line> {
        parse(src).unwrap()
    }

    fn err(src: &str) -> AsmError {
        assemble(src).map(|_| ()).unwrap_err()
    }

    #[test]
    fn signature_order() {
        let ops = [
            Operand::Register(R0),
            Operand::Register(R1),
            Operand::Number(1),
        ];
        let sig = find_signature("ADD", &ops).unwrap();
        assert_eq!(sig.operands, &[Reg, Reg, Imm]);
        assert!(find_signature("ADD", &ops[..2]).is_none());
        assert!(find_signature("BRZP", &[Operand::Label("L".into())]).is_some());
        assert!(find_signature("BR", &[Operand::Register(R0)]).is_none());
        assert!(find_signature(".ORIG", &[Operand::Label("L".into())]).is_some());
        assert!(find_signature("HALT", &ops[..1]).is_none());
    }

    #[test]
    fn label_addresses() {
        let src = "start .orig x3000\nloop add r0, r0, #1\nbr loop\nmsg .stringz \"ab\"\nbuf .blkw #3\nend halt\n.end\nafter halt";
        let labels = collect_labels(&lines(src)).unwrap();
        let expected = [
            ("START", 0),
            ("LOOP", 0x3000),
            ("MSG", 0x3002),
            ("BUF", 0x3005),
            ("END", 0x3008),
        ];
        assert_eq!(labels.len(), expected.len());
        for (name, addr) in expected {
            assert_eq!(labels.get(name), Some(&addr), "label {name}");
        }
    }

    #[test]
    fn forward_and_backward_offsets() {
        let (vm, _) = assemble("back halt\nbrnzp back\nbr fwd\nfwd halt").unwrap();
        assert_eq!(vm.peek(1), builder::br(Condition::NZP, -2i16 as Word).unwrap());
        assert_eq!(vm.peek(2), builder::br(Condition::NZP, 0).unwrap());
    }

    #[test]
    fn immediate_labels_are_absolute() {
        let (vm, _) = assemble(".orig x3000\nptr .fill data\ndata .fill #-1\nld r1, data").unwrap();
        assert_eq!(vm.peek(0x3000), 0x3001);
        assert_eq!(vm.peek(0x3001), 0xFFFF);
        assert_eq!(vm.peek(0x3002), builder::ld(R1, -2i16 as Word));
        assert_eq!(vm.pc(), 0x3000);
    }

    #[test]
    fn directives() {
        let (vm, _) = assemble(".orig x10\n.stringz \"hi\"\n.blkw #2\n.fill x7\njsr r3\ntrap x30").unwrap();
        let words: Vec<Word> = (0x10..0x18).map(|addr| vm.peek(addr)).collect();
        assert_eq!(
            words,
            vec![
                'h' as Word,
                'i' as Word,
                0,
                0,
                0,
                7,
                builder::jsrr(R3),
                builder::trap(0x30)
            ]
        );
    }

    #[test]
    fn errors() {
        assert!(matches!(err("add r0"), AsmError::UnknownSignature { line: 1, .. }));
        assert!(matches!(
            err("halt\nld r0, nowhere"),
            AsmError::UndefinedLabel { line: 2, ref label, .. } if label == "NOWHERE"
        ));
        assert!(matches!(
            err("a halt\na halt"),
            AsmError::DuplicateLabel { line: 2, .. }
        ));
        assert!(matches!(
            err("l .orig l"),
            AsmError::OriginNotNumber { line: 1, .. }
        ));
        assert!(matches!(err("add r0, r0, #x"), AsmError::Parse(_)));
    }

    #[test]
    fn oversized_fields_wrap() {
        let (vm, _) = assemble("add r0, r0, #33").unwrap();
        assert_eq!(vm.peek(0), builder::add_imm(R0, R0, 1));
    }
}
