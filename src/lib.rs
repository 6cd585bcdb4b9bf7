// Encoding
pub mod bits;
pub use bits::Word;
pub mod builder;
pub mod disasm;
pub use disasm::{disassemble, LiteralMode};

// Parsing
mod lexer;
pub mod parser;
pub use parser::{parse, AsmParser};
pub mod air;
pub use air::{Line, Operand};

// Linking
pub mod translator;
pub use translator::{assemble, collect_labels, translate, LabelRegistry};

// Running
pub mod queue;
pub mod runtime;
pub use runtime::{StepOutcome, Vm};
pub mod dump;

pub mod symbol;
pub use symbol::{Condition, Register, RunFlag};

pub mod error;
pub use error::{AsmError, ConstructionError, Fault, ParseError, ParseErrorKind};

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;
