use std::fmt;

use crate::{bits::Word, symbol::Register, symbol::Span};

/// Single operand of a source line.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Operand {
    Register(Register),
    /// Numeric literal, already wrapped to a word.
    Number(Word),
    /// Contents of a string literal, escapes resolved.
    Str(String),
    /// Reference to a label, upper-cased.
    Label(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(reg) => write!(f, "{}", reg),
            Operand::Number(val) => write!(f, "x{:X}", val),
            Operand::Str(text) => write!(f, "{:?}", text),
            Operand::Label(label) => f.write_str(label),
        }
    }
}

/// One parsed source line. Every part is optional, so blank and comment-only lines are kept
/// too.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct Line {
    /// Upper-cased prefix label
    pub label: Option<String>,
    /// Upper-cased instruction, trap or directive keyword
    pub opcode: Option<String>,
    pub operands: Vec<Operand>,
    /// Text after `;`
    pub comment: Option<String>,
    /// 1-based line number
    pub number: usize,
    /// Whole line within the source, without its terminator
    pub span: Span,
}

impl Line {
    pub fn is_opcode(&self, opcode: &str) -> bool {
        self.opcode.as_deref() == Some(opcode)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(label) = &self.label {
            parts.push(label.clone());
        }
        if let Some(opcode) = &self.opcode {
            let operands = self
                .operands
                .iter()
                .map(Operand::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            if operands.is_empty() {
                parts.push(opcode.clone());
            } else {
                parts.push(format!("{} {}", opcode, operands));
            }
        }
        if let Some(comment) = &self.comment {
            parts.push(format!(";{}", comment));
        }
        f.write_str(&parts.join(" "))
    }
}
