use crate::token::{Kind, Token};

const EOF_BYTE: u8 = b'\0';

/// Hand-written pull scanner. One call to `next_token` produces one token;
/// once the end of input is reached every further call returns EOF.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    position: usize,
    line: u32,
    column: u32,
    track_newlines: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            position: 0,
            line: 1,
            column: 1,
            track_newlines: false,
        }
    }

    /// Newline tokens are only emitted when tracking is enabled; the
    /// parser leaves it off.
    pub fn with_newlines(mut self) -> Self {
        self.track_newlines = true;
        self
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Free-form stderr diagnostic anchored at the current scan position.
    pub fn report_error(&self, message: &str) {
        eprintln!("Lexer error at line {}, column {}: {}", self.line, self.column, message);
    }

    fn is_eof(&self) -> bool {
        self.position >= self.bytes.len()
    }

    fn peek(&self) -> u8 {
        self.bytes.get(self.position).copied().unwrap_or(EOF_BYTE)
    }

    fn peek_next(&self) -> u8 {
        self.bytes.get(self.position + 1).copied().unwrap_or(EOF_BYTE)
    }

    fn advance(&mut self) {
        if self.position < self.bytes.len() {
            if self.bytes[self.position] == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\t' | b'\r' => self.advance(),
                b'\n' => {
                    if self.track_newlines {
                        return;
                    }
                    self.advance();
                }
                b'/' if self.peek_next() == b'/' => {
                    while !self.is_eof() && self.peek() != b'\n' {
                        self.advance();
                    }
                }
                b'/' if self.peek_next() == b'*' => {
                    self.advance();
                    self.advance();
                    // Non-nesting; an unterminated comment runs to EOF.
                    while !self.is_eof() {
                        if self.peek() == b'*' && self.peek_next() == b'/' {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn make(&self, kind: Kind, start: usize, line: u32, column: u32) -> Token {
        Token::new(kind, start..self.position, line, column)
    }

    fn read_number(&mut self, start: usize, line: u32, column: u32) -> Token {
        let mut is_float = false;

        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' {
            is_float = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        if self.peek() == b'e' || self.peek() == b'E' {
            is_float = true;
            self.advance();
            if self.peek() == b'+' || self.peek() == b'-' {
                self.advance();
            }
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = &self.source[start..self.position];
        let kind = if is_float {
            Kind::Float(text.parse::<f64>().unwrap_or(0.0))
        } else {
            Kind::Number(text.parse::<i64>().unwrap_or(0))
        };
        self.make(kind, start, line, column)
    }

    fn read_string(&mut self, start: usize, line: u32, column: u32) -> Token {
        self.advance(); // opening quote
        let value_start = self.position;

        while !self.is_eof() && self.peek() != b'"' {
            if self.peek() == b'\\' {
                // Escapes are passed through verbatim; the backslash and
                // the following byte are consumed as a pair.
                self.advance();
                if !self.is_eof() {
                    self.advance();
                }
            } else {
                self.advance();
            }
        }

        let value = self.source[value_start..self.position].to_string();

        if !self.is_eof() {
            self.advance(); // closing quote
        }

        self.make(Kind::Str(value), start, line, column)
    }

    fn read_char(&mut self, start: usize, line: u32, column: u32) -> Token {
        self.advance(); // opening quote
        let mut value = 0u8;

        if !self.is_eof() && self.peek() != b'\'' {
            if self.peek() == b'\\' {
                self.advance();
                if !self.is_eof() {
                    value = match self.peek() {
                        b'n' => b'\n',
                        b't' => b'\t',
                        b'r' => b'\r',
                        b'\\' => b'\\',
                        b'\'' => b'\'',
                        b'0' => b'\0',
                        c => c,
                    };
                    self.advance();
                }
            } else {
                value = self.peek();
                self.advance();
            }
        }

        if !self.is_eof() && self.peek() == b'\'' {
            self.advance(); // closing quote
        }

        self.make(Kind::Char(value), start, line, column)
    }

    fn read_identifier(&mut self, start: usize, line: u32, column: u32) -> Token {
        while is_identifier_char(self.peek()) {
            self.advance();
        }

        let text = &self.source[start..self.position];
        let kind = match Kind::keyword(text) {
            Some(kw) => kw,
            None => Kind::Identifier(text.to_string()),
        };
        self.make(kind, start, line, column)
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        if self.is_eof() {
            return Token::new(Kind::EOF, self.position..self.position, self.line, self.column);
        }

        let start = self.position;
        let line = self.line;
        let column = self.column;
        let c = self.peek();
        let next = self.peek_next();

        // Two-character operators win over their one-character prefixes.
        let two = match (c, next) {
            (b'+', b'+') => Some(Kind::Increment),
            (b'-', b'-') => Some(Kind::Decrement),
            (b'+', b'=') => Some(Kind::PlusAssign),
            (b'-', b'=') => Some(Kind::MinusAssign),
            (b'*', b'=') => Some(Kind::StarAssign),
            (b'/', b'=') => Some(Kind::SlashAssign),
            (b'%', b'=') => Some(Kind::PercentAssign),
            (b'=', b'=') => Some(Kind::DoubleEqual),
            (b'!', b'=') => Some(Kind::NotEqual),
            (b'<', b'=') => Some(Kind::LE),
            (b'>', b'=') => Some(Kind::GE),
            (b'&', b'&') => Some(Kind::DoubleAnd),
            (b'|', b'|') => Some(Kind::DoubleOr),
            (b'<', b'<') => Some(Kind::ShiftLeft),
            (b'>', b'>') => Some(Kind::ShiftRight),
            (b'-', b'>') => Some(Kind::Arrow),
            _ => None,
        };
        if let Some(kind) = two {
            self.advance();
            self.advance();
            return self.make(kind, start, line, column);
        }

        match c {
            b'"' => return self.read_string(start, line, column),
            b'\'' => return self.read_char(start, line, column),
            _ => {}
        }

        let single = match c {
            b'+' => Some(Kind::Plus),
            b'-' => Some(Kind::Minus),
            b'*' => Some(Kind::Star),
            b'/' => Some(Kind::Slash),
            b'%' => Some(Kind::Percent),
            b'=' => Some(Kind::Assign),
            b'<' => Some(Kind::LT),
            b'>' => Some(Kind::GT),
            b'!' => Some(Kind::Exclamation),
            b'&' => Some(Kind::Amp),
            b'|' => Some(Kind::Pipe),
            b'^' => Some(Kind::Caret),
            b'~' => Some(Kind::Tilde),
            b'.' => Some(Kind::Dot),
            b';' => Some(Kind::Semicolon),
            b':' => Some(Kind::Colon),
            b',' => Some(Kind::Comma),
            b'(' => Some(Kind::ParenOpen),
            b')' => Some(Kind::ParenClose),
            b'{' => Some(Kind::BraceOpen),
            b'}' => Some(Kind::BraceClose),
            b'[' => Some(Kind::BracketOpen),
            b']' => Some(Kind::BracketClose),
            b'?' => Some(Kind::Question),
            b'\n' => Some(Kind::NewLine), // only reachable when tracking newlines
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return self.make(kind, start, line, column);
        }

        if c.is_ascii_digit() {
            return self.read_number(start, line, column);
        }
        if is_identifier_start(c) {
            return self.read_identifier(start, line, column);
        }

        self.advance();
        self.make(Kind::Invalid(c as char), start, line, column)
    }
}

pub fn is_identifier_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

pub fn is_identifier_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    /// Iterator view for diagnostic dumps; stops at EOF instead of
    /// repeating it.
    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == Kind::EOF {
            None
        } else {
            Some(token)
        }
    }
}
