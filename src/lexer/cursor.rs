// Heavily inspired and referenced from `rustc_lexer` and adapted to suit the project.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

/// Peekable iterator over the characters of a single source line.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// Index that the cursor is pointing to in the line, in bytes
    curr_pt: usize,
    /// Line being scanned, without its terminator
    chars: &'a str,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            curr_pt: 0,
            chars: input,
        }
    }

    /// Line is finished scanning
    pub fn is_eof(&self) -> bool {
        self.curr_pt >= self.chars.len()
    }

    /// Peek at the next character without consuming it
    pub fn first(&self) -> Option<char> {
        self.at_curr_pt().chars().next()
    }

    /// Return slice of input starting at the current point of the cursor
    pub fn at_curr_pt(&self) -> &'a str {
        &self.chars[self.curr_pt..]
    }

    /// Move cursor ahead in the input by given amount of bytes
    pub fn advance(&mut self, amt: usize) {
        self.curr_pt = (self.curr_pt + amt).min(self.chars.len());
    }

    /// Consume one character
    pub fn bump(&mut self) -> Option<char> {
        let c = self.first()?;
        self.advance(c.len_utf8());
        Some(c)
    }

    /// Consume characters while `predicate` holds, returning them.
    pub fn take_while(&mut self, mut predicate: impl FnMut(char) -> bool) -> &'a str {
        let start = self.curr_pt;
        while let Some(c) = self.first() {
            if !predicate(c) {
                break;
            }
            self.advance(c.len_utf8());
        }
        &self.chars[start..self.curr_pt]
    }

    /// Returns current cursor position
    pub fn curr_pt(&self) -> usize {
        self.curr_pt
    }
}
