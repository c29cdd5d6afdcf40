use crate::lexer::Lexer;
use crate::token::{Kind, Token};

use super::lookahead::LookaheadBuffer;

/// Anything that can feed tokens to the parser. The production source
/// wraps the lexer; tests substitute canned token streams.
pub trait TokenSource {
    /// The next token, or `None` once the underlying stream is exhausted.
    fn next_token(&mut self) -> Option<Token>;
}

/// Combines a `TokenSource` with a lookahead buffer. `peek_at(n)` gives
/// the parser the multi-token window the declaration grammar needs.
pub struct TokenProvider<T: TokenSource> {
    source: T,
    buffer: LookaheadBuffer,
    exhausted: bool,
}

impl<T: TokenSource> TokenProvider<T> {
    pub fn new(source: T) -> Self {
        TokenProvider {
            source,
            buffer: LookaheadBuffer::new(),
            exhausted: false,
        }
    }

    pub fn peek(&mut self) -> Option<&Token> {
        self.ensure_available(1);
        self.buffer.peek()
    }

    pub fn peek_at(&mut self, relative_pos: usize) -> Option<&Token> {
        self.ensure_available(relative_pos + 1);
        self.buffer.peek_at(relative_pos)
    }

    pub fn advance(&mut self) {
        self.ensure_available(1);
        self.buffer.advance();
    }

    fn ensure_available(&mut self, count: usize) {
        while !self.exhausted && self.buffer.available() < count {
            match self.source.next_token() {
                Some(token) => self.buffer.push(token),
                None => self.exhausted = true,
            }
        }
    }

    pub fn reset(&mut self) {
        self.buffer.reset();
        self.exhausted = false;
    }
}

/// Lexer-backed token source. EOF terminates the stream; the parser
/// synthesizes its own EOF handling from `None`.
pub struct LexerTokenSource<'a> {
    lexer: Lexer<'a>,
    finished: bool,
}

impl<'a> LexerTokenSource<'a> {
    pub fn new(input: &'a str) -> Self {
        LexerTokenSource {
            lexer: Lexer::new(input),
            finished: false,
        }
    }
}

impl<'a> TokenSource for LexerTokenSource<'a> {
    fn next_token(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.lexer.next_token();
        if token.kind == Kind::EOF {
            self.finished = true;
            return None;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockTokenSource {
        tokens: Vec<Token>,
        position: usize,
    }

    impl MockTokenSource {
        fn new(tokens: Vec<Token>) -> Self {
            MockTokenSource { tokens, position: 0 }
        }
    }

    impl TokenSource for MockTokenSource {
        fn next_token(&mut self) -> Option<Token> {
            let token = self.tokens.get(self.position).cloned();
            self.position += 1;
            token
        }
    }

    fn token(kind: Kind, start: usize, end: usize) -> Token {
        Token::new(kind, start..end, 1, start as u32 + 1)
    }

    #[test]
    fn test_provider_basic_operations() {
        let tokens = vec![
            token(Kind::Number(42), 0, 2),
            token(Kind::Plus, 3, 4),
            token(Kind::Number(24), 5, 7),
        ];
        let mut provider = TokenProvider::new(MockTokenSource::new(tokens));

        assert_eq!(provider.peek().map(|t| &t.kind), Some(&Kind::Number(42)));
        assert_eq!(provider.peek_at(1).map(|t| &t.kind), Some(&Kind::Plus));
        assert_eq!(provider.peek_at(2).map(|t| &t.kind), Some(&Kind::Number(24)));

        provider.advance();
        assert_eq!(provider.peek().map(|t| &t.kind), Some(&Kind::Plus));

        provider.advance();
        provider.advance();
        assert_eq!(provider.peek(), None);
    }

    #[test]
    fn test_lexer_source_stops_at_eof() {
        let mut source = LexerTokenSource::new("1 + 2");
        assert_eq!(source.next_token().map(|t| t.kind), Some(Kind::Number(1)));
        assert_eq!(source.next_token().map(|t| t.kind), Some(Kind::Plus));
        assert_eq!(source.next_token().map(|t| t.kind), Some(Kind::Number(2)));
        assert_eq!(source.next_token(), None);
        assert_eq!(source.next_token(), None);
    }
}
