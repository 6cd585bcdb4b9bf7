use std::{error::Error, fmt};

use miette::{miette, LabeledSpan, Report, Severity};

use crate::{bits::Word, symbol::Span};

/// Builder called with arguments that have no encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstructionError {
    /// `nzp` all clear; opcode 0 with no flags is reserved.
    NoConditionFlags,
}

/// Lexical or syntactic error on a single source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, in bytes.
    pub col: usize,
    /// Offending text within the whole source.
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    ExpectedLabelOrOpcode,
    ExpectedOpcode { found: String },
    /// Stray separator where an operand should be.
    ExpectedOperand,
    MalformedString,
    MalformedNumber { literal: String },
}

/// Failure while translating parsed lines into memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmError {
    Parse(ParseError),
    /// No signature accepts this mnemonic with these operand kinds.
    UnknownSignature {
        line: usize,
        span: Span,
        opcode: String,
    },
    UndefinedLabel {
        line: usize,
        span: Span,
        label: String,
    },
    DuplicateLabel {
        line: usize,
        span: Span,
        label: String,
    },
    OriginNotNumber {
        line: usize,
        span: Span,
    },
    Construction {
        line: usize,
        span: Span,
        error: ConstructionError,
    },
}

/// Reason a VM operation did not complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// `step` called while stopped. Expected once a program halts.
    NotRunning,
    /// Origin can only be moved while stopped.
    Running,
    /// `RTI` or the reserved opcode was fetched.
    BadInstruction { addr: Word, instr: Word },
    /// A string trap produced more characters than the output queue can ever hold.
    OutputOverflow {
        addr: Word,
        len: usize,
        capacity: usize,
    },
}

impl Error for ConstructionError {}
impl Error for ParseError {}
impl Error for AsmError {}
impl Error for Fault {}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoConditionFlags => write!(f, "impossible branch flags: 000"),
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExpectedLabelOrOpcode => write!(f, "label or opcode expected"),
            Self::ExpectedOpcode { found } => write!(f, "opcode expected, found `{}`", found),
            Self::ExpectedOperand => write!(f, "operand expected"),
            Self::MalformedString => write!(f, "malformed string literal"),
            Self::MalformedNumber { literal } => write!(f, "malformed numeric literal `{}`", literal),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.kind, self.line, self.col)
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{}", err),
            Self::UnknownSignature { line, opcode, .. } => {
                write!(f, "unknown opcode signature for `{}` at line {}", opcode, line)
            }
            Self::UndefinedLabel { line, label, .. } => {
                write!(f, "unknown label `{}` at line {}", label, line)
            }
            Self::DuplicateLabel { line, label, .. } => {
                write!(f, "duplicate label `{}` at line {}", label, line)
            }
            Self::OriginNotNumber { line, .. } => {
                write!(f, "number expected for .ORIG at line {}", line)
            }
            Self::Construction { line, error, .. } => write!(f, "{} at line {}", error, line),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRunning => write!(f, "vm is not running"),
            Self::Running => write!(f, "vm is running"),
            Self::BadInstruction { addr, instr } => {
                write!(f, "bad instruction 0x{:04x} at 0x{:04x}", instr, addr)
            }
            Self::OutputOverflow {
                addr,
                len,
                capacity,
            } => write!(
                f,
                "trap at 0x{:04x} writes {} characters, output holds at most {}",
                addr, len, capacity
            ),
        }
    }
}

impl From<ParseError> for AsmError {
    fn from(value: ParseError) -> Self {
        AsmError::Parse(value)
    }
}

impl AsmError {
    pub fn line(&self) -> usize {
        match self {
            Self::Parse(err) => err.line,
            Self::UnknownSignature { line, .. }
            | Self::UndefinedLabel { line, .. }
            | Self::DuplicateLabel { line, .. }
            | Self::OriginNotNumber { line, .. }
            | Self::Construction { line, .. } => *line,
        }
    }

    /// Render as a diagnostic pointing into `src`.
    pub fn to_report(&self, src: &str) -> Report {
        let report = match self {
            Self::Parse(err) => parse_report(err),
            Self::UnknownSignature { span, opcode, .. } => miette!(
                severity = Severity::Error,
                code = "asm::signature",
                help = "check the number and kind of operands allowed for this instruction.",
                labels = vec![LabeledSpan::at(*span, "no matching form")],
                "No form of `{}` accepts these operands",
                opcode
            ),
            Self::UndefinedLabel { span, label, .. } => miette!(
                severity = Severity::Error,
                code = "asm::undefined_label",
                help = "labels must be declared somewhere before `.END`.",
                labels = vec![LabeledSpan::at(*span, "used here")],
                "Reference to undefined label `{}`",
                label
            ),
            Self::DuplicateLabel { span, label, .. } => miette!(
                severity = Severity::Error,
                code = "asm::duplicate_label",
                help = "prefix labels are only allowed once per file",
                labels = vec![LabeledSpan::at(*span, "duplicate label")],
                "Duplicate prefix label `{}`",
                label
            ),
            Self::OriginNotNumber { span, .. } => miette!(
                severity = Severity::Error,
                code = "asm::orig",
                help = ".orig requires an integer or hex literal like x3000",
                labels = vec![LabeledSpan::at(*span, "not a numeric literal")],
                "Expected valid integer or hex literal",
            ),
            Self::Construction { span, error, .. } => miette!(
                severity = Severity::Error,
                code = "asm::construction",
                help = "branches need at least one of the n, z or p flags",
                labels = vec![LabeledSpan::at(*span, "cannot be encoded")],
                "{}",
                error
            ),
        };
        report.with_source_code(src.to_owned())
    }
}

fn parse_report(err: &ParseError) -> Report {
    match &err.kind {
        ParseErrorKind::ExpectedLabelOrOpcode => miette!(
            severity = Severity::Error,
            code = "parse::unexpected_token",
            help = "lines should start with a label, an instruction, a trap, or a directive.",
            labels = vec![LabeledSpan::at(err.span, "unexpected token")],
            "Expected a label or opcode",
        ),
        ParseErrorKind::ExpectedOpcode { found } => miette!(
            severity = Severity::Error,
            code = "parse::opcode",
            help = "a label may only be followed by an instruction, a trap, or a directive.",
            labels = vec![LabeledSpan::at(err.span, "not an opcode")],
            "Expected an opcode, found `{}`",
            found
        ),
        ParseErrorKind::ExpectedOperand => miette!(
            severity = Severity::Error,
            code = "parse::operand",
            help = "operands are registers, literals, strings, or labels separated by commas.",
            labels = vec![LabeledSpan::at(err.span, "missing operand")],
            "Expected an operand",
        ),
        ParseErrorKind::MalformedString => miette!(
            severity = Severity::Error,
            code = "parse::str_lit",
            help = "make sure to close string literals with a \" character and use known escapes.",
            labels = vec![LabeledSpan::at(err.span, "incorrect literal")],
            "Encountered an invalid string literal.",
        ),
        ParseErrorKind::MalformedNumber { literal } => miette!(
            severity = Severity::Error,
            code = "parse::bad_lit",
            help = "ranges from -65,535 to 65,535 are allowed, written as #10 or xA",
            labels = vec![LabeledSpan::at(err.span, "incorrect literal")],
            "Encountered an invalid literal: {}",
            literal
        ),
    }
}
