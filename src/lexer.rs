//! Lexical splitting of a command line into whitespace-separated words
//! under shell-like quoting and escaping rules.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    /// Between words or inside an unquoted word.
    Unquoted,
    /// Inside `'...'`: everything is copied verbatim.
    SingleQuote,
    /// Inside `"..."`: backslash is special only before `\`, `$`, `"` and newline.
    DoubleQuote,
}

struct LexFsm {
    input: Vec<char>,
    pos: usize,
    state: LexState,
    buffer: String,
}

impl LexFsm {
    fn new(line: &str) -> Self {
        LexFsm {
            input: line.chars().collect(),
            pos: 0,
            state: LexState::Unquoted,
            buffer: String::new(),
        }
    }

    /// Walk the input once, accumulating characters into `buffer` and cutting
    /// a token on unquoted whitespace. A quote left open at end-of-line
    /// extends to the end of the line.
    fn make_tokens(&mut self) -> Vec<String> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexState::Unquoted => self.handle_unquoted(ch, &mut out),
                LexState::SingleQuote => self.handle_single_quote(ch),
                LexState::DoubleQuote => self.handle_double_quote(ch),
            }
        }

        self.flush_token(&mut out);
        out
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_unquoted(&mut self, ch: char, out: &mut Vec<String>) {
        match ch {
            c if c.is_whitespace() => self.flush_token(out),
            '\\' => {
                // The next character is taken literally, whitespace included.
                // A lone trailing backslash escapes nothing and is dropped.
                if let Some(escaped) = self.read_char() {
                    self.buffer.push(escaped);
                }
            }
            '\'' => self.state = LexState::SingleQuote,
            '"' => self.state = LexState::DoubleQuote,
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexState::Unquoted,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexState::Unquoted,
            '\\' => match self.input.get(self.pos).copied() {
                Some(next @ ('\\' | '$' | '"' | '\n')) => {
                    self.pos += 1;
                    self.buffer.push(next);
                }
                // Before anything else the backslash itself is literal.
                _ => self.buffer.push('\\'),
            },
            c => self.buffer.push(c),
        }
    }

    /// Tokens are appended only when non-empty: `''` on its own produces
    /// nothing, while `''x` produces `x`.
    fn flush_token(&mut self, out: &mut Vec<String>) {
        if !self.buffer.is_empty() {
            out.push(std::mem::take(&mut self.buffer));
        }
    }
}

/// Split a command line into words. Never fails; malformed trailing quotes
/// are treated as extending to end-of-line.
pub fn tokenize(line: &str) -> Vec<String> {
    LexFsm::new(line).make_tokens()
}
