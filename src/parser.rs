use std::str::FromStr;

use crate::{
    air::{Line, Operand},
    error::{ParseError, ParseErrorKind},
    lexer::{self, cursor::Cursor},
    symbol::{Register, Span, SrcOffset},
};

/// Instruction, trap and directive keywords. Anything else in opcode position is a label.
const OPCODES: &[&str] = &[
    "ADD", "AND", "NOT", "BR", "BRN", "BRZ", "BRP", "BRNZ", "BRNP", "BRZP", "BRNZP", "JMP", "RET",
    "JSR", "JSRR", "LD", "LDI", "LDR", "LEA", "ST", "STI", "STR", "TRAP", "GETC", "OUT", "PUTS",
    "IN", "PUTSP", "HALT", ".ORIG", ".FILL", ".BLKW", ".STRINGZ", ".END",
];

pub fn is_opcode(ident: &str) -> bool {
    OPCODES.contains(&ident)
}

/// Parse a whole source file into lines.
pub fn parse(src: &str) -> Result<Vec<Line>, ParseError> {
    AsmParser::new(src).parse()
}

/// Where the scanner is within a line.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    LabelOrOpcode,
    Opcode,
    Operands,
}

/// Splits source into lines and scans each one on its own.
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    /// Tracker for current line
    line: usize,
    /// Offset of the current line within `src`
    offs: usize,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Self {
        AsmParser {
            src,
            line: 0,
            offs: 0,
        }
    }

    /// Parse lines until the input or a `.END` line runs out.
    pub fn parse(mut self) -> Result<Vec<Line>, ParseError> {
        let mut lines = Vec::new();
        let src = self.src;
        for raw in src.split_inclusive('\n') {
            self.line += 1;
            let text = raw.strip_suffix('\n').unwrap_or(raw);
            let text = text.strip_suffix('\r').unwrap_or(text);
            let line = self.parse_line(text)?;
            self.offs += raw.len();

            let end = line.is_opcode(".END");
            lines.push(line);
            if end {
                break;
            }
        }
        Ok(lines)
    }

    fn parse_line(&self, text: &str) -> Result<Line, ParseError> {
        let mut line = Line {
            number: self.line,
            span: Span::new(SrcOffset(self.offs), text.len()),
            ..Default::default()
        };
        let mut cur = Cursor::new(text);
        let mut state = State::LabelOrOpcode;

        loop {
            cur.skip_whitespace();
            let Some(c) = cur.first() else {
                break;
            };
            let col = cur.curr_pt();
            if c == ';' {
                cur.bump();
                line.comment = Some(cur.at_curr_pt().to_string());
                break;
            }

            match state {
                State::LabelOrOpcode => {
                    let ident = cur.identifier();
                    if ident.is_empty() {
                        return Err(self.error(ParseErrorKind::ExpectedLabelOrOpcode, col, 1));
                    }
                    let ident = ident.to_ascii_uppercase();
                    if is_opcode(&ident) {
                        line.opcode = Some(ident);
                        state = State::Operands;
                    } else {
                        line.label = Some(ident);
                        state = State::Opcode;
                    }
                }
                State::Opcode => {
                    let ident = cur.identifier();
                    let upper = ident.to_ascii_uppercase();
                    if !is_opcode(&upper) {
                        let kind = ParseErrorKind::ExpectedOpcode {
                            found: ident.to_string(),
                        };
                        return Err(self.error(kind, col, ident.len().max(1)));
                    }
                    line.opcode = Some(upper);
                    state = State::Operands;
                }
                State::Operands => {
                    let operand = self.operand(&mut cur)?;
                    line.operands.push(operand);
                    cur.skip_whitespace();
                    if cur.first() == Some(',') {
                        cur.bump();
                    }
                }
            }
        }
        Ok(line)
    }

    /// Scan one operand. Strings are tried first, then registers, numbers, and finally labels.
    fn operand(&self, cur: &mut Cursor) -> Result<Operand, ParseError> {
        let col = cur.curr_pt();
        if cur.first() == Some('"') {
            return cur.string_lit().map(Operand::Str).map_err(|_| {
                let len = cur.at_curr_pt().len() + (cur.curr_pt() - col);
                self.error(ParseErrorKind::MalformedString, col, len)
            });
        }

        let ident = cur.identifier();
        if ident.is_empty() {
            return Err(self.error(ParseErrorKind::ExpectedOperand, col, 1));
        }
        if let Ok(reg) = Register::from_str(ident) {
            return Ok(Operand::Register(reg));
        }
        let upper = ident.to_ascii_uppercase();
        match lexer::number(&upper) {
            Some(Ok(val)) => Ok(Operand::Number(val)),
            Some(Err(())) => {
                let kind = ParseErrorKind::MalformedNumber {
                    literal: ident.to_string(),
                };
                Err(self.error(kind, col, ident.len()))
            }
            None => Ok(Operand::Label(upper)),
        }
    }

    /// Error at byte `col` of the current line.
    fn error(&self, kind: ParseErrorKind, col: usize, len: usize) -> ParseError {
        ParseError {
            kind,
            line: self.line,
            col: col + 1,
            span: Span::new(SrcOffset(self.offs + col), len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Register::*;

    fn line(src: &str) -> Line {
        let mut lines = parse(src).unwrap();
        assert_eq!(lines.len(), 1);
        lines.remove(0)
    }

    fn err(src: &str) -> ParseError {
        parse(src).unwrap_err()
    }

    #[test]
    fn parse_instruction() {
        let l = line("  add r0, R1, #-3 ; sub");
        assert_eq!(l.label, None);
        assert_eq!(l.opcode.as_deref(), Some("ADD"));
        assert_eq!(
            l.operands,
            vec![
                Operand::Register(R0),
                Operand::Register(R1),
                Operand::Number(0xFFFD)
            ]
        );
        assert_eq!(l.comment.as_deref(), Some(" sub"));
        assert_eq!(l.number, 1);
    }

    #[test]
    fn parse_label() {
        let l = line("loop BRnz Loop");
        assert_eq!(l.label.as_deref(), Some("LOOP"));
        assert_eq!(l.opcode.as_deref(), Some("BRNZ"));
        assert_eq!(l.operands, vec![Operand::Label("LOOP".into())]);

        let l = line("alone");
        assert_eq!(l.label.as_deref(), Some("ALONE"));
        assert_eq!(l.opcode, None);
    }

    #[test]
    fn parse_commas_optional() {
        let l = line("ldr r0 r6,x1");
        assert_eq!(
            l.operands,
            vec![
                Operand::Register(R0),
                Operand::Register(R6),
                Operand::Number(1)
            ]
        );
    }

    #[test]
    fn parse_stringz() {
        let l = line(r#"msg .stringz "Hi, there\n";greeting"#);
        assert_eq!(l.opcode.as_deref(), Some(".STRINGZ"));
        assert_eq!(l.operands, vec![Operand::Str("Hi, there\n".into())]);
        assert_eq!(l.comment.as_deref(), Some("greeting"));
    }

    #[test]
    fn parse_hex_label() {
        let l = line(".fill xdead xloop");
        assert_eq!(
            l.operands,
            vec![Operand::Number(0xDEAD), Operand::Label("XLOOP".into())]
        );
    }

    #[test]
    fn parse_empty_lines() {
        let lines = parse("\n  ; comment only\r\n\nhalt\n").unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], Line { number: 1, ..Default::default() });
        assert_eq!(lines[1].comment.as_deref(), Some(" comment only"));
        assert_eq!(lines[1].span, Span::new(SrcOffset(1), 16));
        assert_eq!(lines[3].opcode.as_deref(), Some("HALT"));
        assert_eq!(lines[3].number, 4);
    }

    #[test]
    fn parse_stops_at_end() {
        let lines = parse(".orig x3000\nhalt\n.end\n!!! not parsed").unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].is_opcode(".END"));
    }

    #[test]
    fn expected_label_or_opcode() {
        let e = err("halt\n  , r0");
        assert_eq!(e.kind, ParseErrorKind::ExpectedLabelOrOpcode);
        assert_eq!((e.line, e.col), (2, 3));
        assert_eq!(e.span, Span::new(SrcOffset(7), 1));
    }

    #[test]
    fn expected_opcode() {
        let e = err("label other r0");
        assert_eq!(
            e.kind,
            ParseErrorKind::ExpectedOpcode {
                found: "other".into()
            }
        );
        assert_eq!((e.line, e.col), (1, 7));
    }

    #[test]
    fn malformed_literals() {
        let e = err("add r0, r0, #1a");
        assert_eq!(
            e.kind,
            ParseErrorKind::MalformedNumber {
                literal: "#1a".into()
            }
        );
        assert_eq!(e.col, 13);

        let e = err(".stringz \"open");
        assert_eq!(e.kind, ParseErrorKind::MalformedString);
        assert_eq!(e.col, 10);

        let e = err("add r0,,r1");
        assert_eq!(e.kind, ParseErrorKind::ExpectedOperand);
    }
}
