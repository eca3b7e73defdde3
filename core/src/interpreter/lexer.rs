//! Lexer: source text to a lazy, line-tagged token stream
//!
//! `tokenize` returns a `Tokens` iterator that produces tokens on demand. The
//! stream is finite (it ends right after `Eof` or the first error) and can be
//! restarted or cloned to scan the same source again.

use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("line {line}: unterminated block comment")]
    UnterminatedComment { line: usize },

    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar { ch: char, line: usize },

    #[error("line {line}: invalid number '{text}'")]
    InvalidNumber { text: String, line: usize },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::UnterminatedString { line }
            | LexError::UnterminatedComment { line }
            | LexError::UnexpectedChar { line, .. }
            | LexError::InvalidNumber { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Else,
    While,
    Do,
    Retry,
    Try,
    Catch,
    Function,
    Include,
    Var,
    Return,
    Throw,
    Exit,
    Delay,
    Const,
    True,
    False,
    Null,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Self> {
        let kw = match word {
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "while" => Keyword::While,
            "do" => Keyword::Do,
            "retry" => Keyword::Retry,
            "try" => Keyword::Try,
            "catch" => Keyword::Catch,
            "function" => Keyword::Function,
            "include" => Keyword::Include,
            "var" => Keyword::Var,
            "return" => Keyword::Return,
            "throw" => Keyword::Throw,
            "exit" => Keyword::Exit,
            "delay" => Keyword::Delay,
            "const" => Keyword::Const,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "null" => Keyword::Null,
            _ => return None,
        };
        Some(kw)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::Do => "do",
            Keyword::Retry => "retry",
            Keyword::Try => "try",
            Keyword::Catch => "catch",
            Keyword::Function => "function",
            Keyword::Include => "include",
            Keyword::Var => "var",
            Keyword::Return => "return",
            Keyword::Throw => "throw",
            Keyword::Exit => "exit",
            Keyword::Delay => "delay",
            Keyword::Const => "const",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    EqEq,
    BangEq,
    LtEq,
    GtEq,
    AndAnd,
    OrOr,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Lt,
    Gt,
    Eq,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Dot,
    At,
}

impl Punct {
    pub fn as_str(self) -> &'static str {
        match self {
            Punct::EqEq => "==",
            Punct::BangEq => "!=",
            Punct::LtEq => "<=",
            Punct::GtEq => ">=",
            Punct::AndAnd => "&&",
            Punct::OrOr => "||",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::Slash => "/",
            Punct::Percent => "%",
            Punct::Bang => "!",
            Punct::Lt => "<",
            Punct::Gt => ">",
            Punct::Eq => "=",
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::Comma => ",",
            Punct::Semicolon => ";",
            Punct::Dot => ".",
            Punct::At => "@",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Keyword(Keyword),
    Punct(Punct),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier '{}'", name),
            TokenKind::Int(i) => write!(f, "number {}", i),
            TokenKind::Float(x) => write!(f, "number {}", x),
            TokenKind::Str(s) => write!(f, "string {:?}", s),
            TokenKind::Keyword(kw) => write!(f, "'{}'", kw.as_str()),
            TokenKind::Punct(p) => write!(f, "'{}'", p.as_str()),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based line the token starts on
    pub line: usize,
}

/// Start scanning `source`
pub fn tokenize(source: &str) -> Tokens {
    Tokens {
        source: Rc::from(source),
        pos: 0,
        line: 1,
        finished: false,
    }
}

/// Lazy token stream over a source text
#[derive(Debug, Clone)]
pub struct Tokens {
    source: Rc<str>,
    pos: usize,
    line: usize,
    finished: bool,
}

impl Tokens {
    /// Rewind to the beginning of the source
    pub fn restart(&mut self) {
        self.pos = 0;
        self.line = 1;
        self.finished = false;
    }

    fn bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    fn cur(&self) -> u8 {
        self.bytes().get(self.pos).copied().unwrap_or(0)
    }

    fn peek(&self) -> u8 {
        self.bytes().get(self.pos + 1).copied().unwrap_or(0)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes().len()
    }

    fn advance(&mut self) {
        if self.cur() == b'\n' {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        while !self.at_end() {
            match self.cur() {
                b' ' | b'\t' | b'\n' | b'\r' => self.advance(),
                b'/' if self.peek() == b'/' => {
                    while !self.at_end() && self.cur() != b'\n' {
                        self.advance();
                    }
                }
                b'/' if self.peek() == b'*' => {
                    let start_line = self.line;
                    self.advance();
                    self.advance();
                    loop {
                        if self.at_end() {
                            return Err(LexError::UnterminatedComment { line: start_line });
                        }
                        if self.cur() == b'*' && self.peek() == b'/' {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn lex_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        while self.cur().is_ascii_digit() {
            self.advance();
        }
        let is_float = self.cur() == b'.' && self.peek().is_ascii_digit();
        if is_float {
            self.advance();
            while self.cur().is_ascii_digit() {
                self.advance();
            }
        }
        // A number running straight into a letter (`12ab`) is malformed
        if self.cur().is_ascii_alphabetic() || self.cur() == b'_' {
            while self.cur().is_ascii_alphanumeric() || self.cur() == b'_' {
                self.advance();
            }
            return Err(LexError::InvalidNumber {
                text: self.source[start..self.pos].to_string(),
                line: self.line,
            });
        }

        let text = &self.source[start..self.pos];
        let invalid = || LexError::InvalidNumber {
            text: text.to_string(),
            line: self.line,
        };
        if is_float {
            text.parse().map(TokenKind::Float).map_err(|_| invalid())
        } else {
            text.parse().map(TokenKind::Int).map_err(|_| invalid())
        }
    }

    fn lex_string(&mut self) -> Result<TokenKind, LexError> {
        let quote = self.cur();
        let start_line = self.line;
        self.advance();

        let mut buf: Vec<u8> = Vec::new();
        loop {
            if self.at_end() {
                return Err(LexError::UnterminatedString { line: start_line });
            }
            match self.cur() {
                c if c == quote => {
                    self.advance();
                    break;
                }
                b'\\' => {
                    self.advance();
                    if self.at_end() {
                        return Err(LexError::UnterminatedString { line: start_line });
                    }
                    let escaped = match self.cur() {
                        b'n' => b'\n',
                        b't' => b'\t',
                        b'r' => b'\r',
                        b'0' => b'\0',
                        other => other,
                    };
                    buf.push(escaped);
                    self.advance();
                }
                c => {
                    buf.push(c);
                    self.advance();
                }
            }
        }
        Ok(TokenKind::Str(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn lex_word(&mut self) -> TokenKind {
        let start = self.pos;
        while self.cur().is_ascii_alphanumeric() || self.cur() == b'_' {
            self.advance();
        }
        let word = &self.source[start..self.pos];
        match Keyword::from_word(word) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident(word.to_string()),
        }
    }

    fn lex_punct(&mut self) -> Result<TokenKind, LexError> {
        let two = match (self.cur(), self.peek()) {
            (b'=', b'=') => Some(Punct::EqEq),
            (b'!', b'=') => Some(Punct::BangEq),
            (b'<', b'=') => Some(Punct::LtEq),
            (b'>', b'=') => Some(Punct::GtEq),
            (b'&', b'&') => Some(Punct::AndAnd),
            (b'|', b'|') => Some(Punct::OrOr),
            _ => None,
        };
        if let Some(p) = two {
            self.advance();
            self.advance();
            return Ok(TokenKind::Punct(p));
        }

        let one = match self.cur() {
            b'+' => Punct::Plus,
            b'-' => Punct::Minus,
            b'*' => Punct::Star,
            b'/' => Punct::Slash,
            b'%' => Punct::Percent,
            b'!' => Punct::Bang,
            b'<' => Punct::Lt,
            b'>' => Punct::Gt,
            b'=' => Punct::Eq,
            b'(' => Punct::LParen,
            b')' => Punct::RParen,
            b'{' => Punct::LBrace,
            b'}' => Punct::RBrace,
            b'[' => Punct::LBracket,
            b']' => Punct::RBracket,
            b',' => Punct::Comma,
            b';' => Punct::Semicolon,
            b'.' => Punct::Dot,
            b'@' => Punct::At,
            _ => {
                let ch = self.source[self.pos..].chars().next().unwrap_or('\0');
                return Err(LexError::UnexpectedChar {
                    ch,
                    line: self.line,
                });
            }
        };
        self.advance();
        Ok(TokenKind::Punct(one))
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;
        let line = self.line;
        if self.at_end() {
            return Ok(Token {
                kind: TokenKind::Eof,
                line,
            });
        }

        let kind = match self.cur() {
            b'0'..=b'9' => self.lex_number()?,
            b'"' | b'\'' => self.lex_string()?,
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_word(),
            _ => self.lex_punct()?,
        };
        Ok(Token { kind, line })
    }
}

impl Iterator for Tokens {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        if matches!(
            result,
            Err(_)
                | Ok(Token {
                    kind: TokenKind::Eof,
                    ..
                })
        ) {
            self.finished = true;
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .map(|t| t.expect("lex failed").kind)
            .collect()
    }

    #[test]
    fn test_tokens_carry_start_lines() {
        let tokens: Vec<Token> = tokenize("a = 1;\n\nb = 'x';")
            .collect::<Result<_, _>>()
            .unwrap();
        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 1, 1, 1, 3, 3, 3, 3, 3]);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_keywords_numbers_and_operators() {
        assert_eq!(
            kinds("if (x >= 2.5) retry 3"),
            vec![
                TokenKind::Keyword(Keyword::If),
                TokenKind::Punct(Punct::LParen),
                TokenKind::Ident("x".into()),
                TokenKind::Punct(Punct::GtEq),
                TokenKind::Float(2.5),
                TokenKind::Punct(Punct::RParen),
                TokenKind::Keyword(Keyword::Retry),
                TokenKind::Int(3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\n\"b\"" 'it\'s' "\q""#),
            vec![
                TokenKind::Str("a\n\"b\"".into()),
                TokenKind::Str("it's".into()),
                TokenKind::Str("q".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped_and_advance_lines() {
        let tokens: Vec<Token> = tokenize("// one\n/* two\nthree */ x")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident("x".into()));
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn test_member_access_is_not_a_float() {
        assert_eq!(
            kinds("a.b"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Punct(Punct::Dot),
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_errors() {
        let err = tokenize("x = \"abc").find_map(Result::err).unwrap();
        assert_eq!(err, LexError::UnterminatedString { line: 1 });

        let err = tokenize("\n/* never closed").find_map(Result::err).unwrap();
        assert_eq!(err, LexError::UnterminatedComment { line: 2 });

        let err = tokenize("a # b").find_map(Result::err).unwrap();
        assert_eq!(err, LexError::UnexpectedChar { ch: '#', line: 1 });

        let err = tokenize("12ab").find_map(Result::err).unwrap();
        assert_eq!(
            err,
            LexError::InvalidNumber {
                text: "12ab".into(),
                line: 1
            }
        );
    }

    #[test]
    fn test_stream_is_finite_and_restartable() {
        let mut tokens = tokenize("a b");
        assert_eq!(tokens.by_ref().count(), 3);
        assert!(tokens.next().is_none());

        tokens.restart();
        assert_eq!(
            tokens.next().unwrap().unwrap().kind,
            TokenKind::Ident("a".into())
        );

        let mut copy = tokens.clone();
        assert_eq!(
            copy.next().unwrap().unwrap().kind,
            TokenKind::Ident("b".into())
        );
        assert_eq!(
            tokens.next().unwrap().unwrap().kind,
            TokenKind::Ident("b".into())
        );
    }

    #[test]
    fn test_stream_stops_after_error() {
        let mut tokens = tokenize("a $ b");
        assert!(tokens.next().unwrap().is_ok());
        assert!(tokens.next().unwrap().is_err());
        assert!(tokens.next().is_none());
    }
}
