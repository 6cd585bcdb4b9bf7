use crate::bits::Word;
use crate::lexer::cursor::Cursor;

pub mod cursor;

/// Test if a character is considered to be whitespace.
pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Test if a character ends an identifier.
pub(crate) fn is_id_end(c: char) -> bool {
    // Comments may start directly after a token
    is_whitespace(c) || c == ',' || c == ';'
}

impl<'a> Cursor<'a> {
    pub fn skip_whitespace(&mut self) {
        self.take_while(is_whitespace);
    }

    /// Raw identifier starting at the cursor. Empty if the cursor sits on a separator.
    pub fn identifier(&mut self) -> &'a str {
        self.take_while(|c| !is_id_end(c))
    }

    /// Quoted string starting at the cursor, with escapes resolved. Fails on an unknown escape
    /// or a missing closing quote.
    pub fn string_lit(&mut self) -> Result<String, ()> {
        if self.bump() != Some('"') {
            return Err(());
        }
        let mut res = String::new();
        loop {
            match self.bump().ok_or(())? {
                '"' => return Ok(res),
                '\\' => res.push(self.escape()?),
                c => res.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char, ()> {
        let c = match self.bump().ok_or(())? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'v' => '\x0b',
            'e' => '\x1b',
            '0' => '\0',
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            'x' => {
                let digits = self.at_curr_pt().get(..2).ok_or(())?;
                let code = u8::from_str_radix(digits, 16).map_err(|_| ())?;
                self.advance(2);
                code as char
            }
            _ => return Err(()),
        };
        Ok(c)
    }
}

/// Classify an upper-cased identifier as a numeric literal.
///
/// Returns `None` when the identifier is not a number at all. A `#` prefix always means
/// decimal, so `#` followed by anything but an optional `-` and 16-bit digits is malformed. An
/// `X` prefix is only a number when followed by hex digits, which leaves labels such as `XLOOP`
/// usable.
pub fn number(ident: &str) -> Option<Result<Word, ()>> {
    if let Some(rest) = ident.strip_prefix('#') {
        return Some(magnitude(rest, 10));
    }
    let rest = ident.strip_prefix('X')?;
    let digits = rest.strip_prefix('-').unwrap_or(rest);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(magnitude(rest, 16))
}

/// Unsigned 16-bit value with an optional leading minus, negated with wrap-around.
fn magnitude(text: &str, radix: u32) -> Result<Word, ()> {
    let (neg, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text),
    };
    // `from_str_radix` accepts a leading `+`
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(());
    }
    let val = Word::from_str_radix(digits, radix).map_err(|_| ())?;
    Ok(if neg { val.wrapping_neg() } else { val })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(number("#10"), Some(Ok(10)));
        assert_eq!(number("#-1"), Some(Ok(0xFFFF)));
        assert_eq!(number("#65535"), Some(Ok(0xFFFF)));
        assert_eq!(number("#65536"), Some(Err(())));
        assert_eq!(number("#"), Some(Err(())));
        assert_eq!(number("#+3"), Some(Err(())));
        assert_eq!(number("#1A"), Some(Err(())));
        assert_eq!(number("X3000"), Some(Ok(0x3000)));
        assert_eq!(number("X-10"), Some(Ok(0xFFF0)));
        assert_eq!(number("XFFFF"), Some(Ok(0xFFFF)));
        assert_eq!(number("X10000"), Some(Err(())));
    }

    #[test]
    fn labels_are_not_numbers() {
        assert_eq!(number("X"), None);
        assert_eq!(number("XLOOP"), None);
        assert_eq!(number("X-"), None);
        assert_eq!(number("LOOP"), None);
        assert_eq!(number("10"), None);
    }

    #[test]
    fn identifiers_stop_at_separators() {
        let mut cur = Cursor::new("r0,r1;c");
        assert_eq!(cur.identifier(), "r0");
        assert_eq!(cur.bump(), Some(','));
        assert_eq!(cur.identifier(), "r1");
        assert_eq!(cur.first(), Some(';'));
    }

    #[test]
    fn string_escapes() {
        let mut cur = Cursor::new(r#""a\n\t\"b\\\e\x41\0" rest"#);
        assert_eq!(cur.string_lit(), Ok("a\n\t\"b\\\x1bA\0".to_string()));
        assert_eq!(cur.at_curr_pt(), " rest");
    }

    #[test]
    fn bad_strings() {
        assert_eq!(Cursor::new(r#""open"#).string_lit(), Err(()));
        assert_eq!(Cursor::new(r#""\q""#).string_lit(), Err(()));
        assert_eq!(Cursor::new(r#""\x4""#).string_lit(), Err(()));
        assert_eq!(Cursor::new(r#""trailing\"#).string_lit(), Err(()));
    }
}
