//! Lossless tokenizer for C source.
//!
//! Every byte of the input lands in exactly one token, so rendering the
//! token stream reproduces the input. Whitespace and comments are kept as
//! trivia tokens; a preprocessor line is kept whole as a directive token.

use crate::token::{Token, TokenKind};
use c2pp_common::{Diagnostic, DiagnosticKind, Span};

const THREE_CHAR_PUNCT: &[&str] = &["...", "<<=", ">>="];

const TWO_CHAR_PUNCT: &[&str] = &[
    "->", "::", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "##",
];

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            at_line_start: true,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the entire source. Never fails; problems become diagnostics.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while self.pos < self.source.len() {
            self.next_token();
        }
        (self.tokens, self.diagnostics)
    }

    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.source.as_bytes().get(self.pos + ahead).copied()
    }

    fn rest(&self) -> &str {
        &self.source[self.pos..]
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let text = &self.source[start..self.pos];
        self.tokens.push(Token::new(
            kind,
            text,
            Span::new(start as u32, self.pos as u32),
        ));
    }

    fn next_token(&mut self) {
        let start = self.pos;
        let Some(c) = self.peek() else { return };

        if c.is_ascii_whitespace() {
            while let Some(c) = self.peek() {
                if !c.is_ascii_whitespace() {
                    break;
                }
                if c == b'\n' {
                    self.at_line_start = true;
                }
                self.pos += 1;
            }
            self.push(TokenKind::Whitespace, start);
            return;
        }

        let line_start = std::mem::replace(&mut self.at_line_start, false);

        match c {
            b'#' if line_start => self.lex_directive(start),
            b'/' if self.peek_at(1) == Some(b'/') => {
                while let Some(c) = self.peek() {
                    if c == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
                self.push(TokenKind::Comment, start);
            }
            b'/' if self.peek_at(1) == Some(b'*') => {
                match self.rest()[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => {
                        self.pos = self.source.len();
                        self.unterminated(start, "block comment");
                    }
                }
                self.push(TokenKind::Comment, start);
                // `/* c */ #define X 1` is still a directive.
                self.at_line_start = line_start;
            }
            b'"' => self.lex_quoted(start, b'"', TokenKind::Str),
            b'\'' => self.lex_quoted(start, b'\'', TokenKind::Char),
            c if c.is_ascii_digit() => self.lex_number(start),
            b'.' if self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) => self.lex_number(start),
            c if c == b'_' || c.is_ascii_alphabetic() => {
                while let Some(c) = self.peek() {
                    if c != b'_' && !c.is_ascii_alphanumeric() {
                        break;
                    }
                    self.pos += 1;
                }
                self.push(TokenKind::Ident, start);
            }
            _ => self.lex_punct(start),
        }
    }

    fn lex_directive(&mut self, start: usize) {
        let bytes = self.source.as_bytes();
        while let Some(c) = self.peek() {
            if c == b'\\' && self.peek_at(1) == Some(b'\n') {
                self.pos += 2;
                continue;
            }
            if c == b'\\' && self.peek_at(1) == Some(b'\r') && bytes.get(self.pos + 2) == Some(&b'\n') {
                self.pos += 3;
                continue;
            }
            if c == b'\n' {
                break;
            }
            self.pos += 1;
        }
        // Keep a trailing carriage return with the newline that follows it.
        let mut end = self.pos;
        if end > start && bytes[end - 1] == b'\r' {
            end -= 1;
        }
        let saved = self.pos;
        self.pos = end;
        self.push(TokenKind::Directive, start);
        self.pos = saved;
        if end < saved {
            self.push(TokenKind::Whitespace, end);
        }
    }

    fn lex_quoted(&mut self, start: usize, quote: u8, kind: TokenKind) {
        self.pos += 1;
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    self.unterminated(start, if quote == b'"' { "string literal" } else { "character literal" });
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    if self.pos < self.source.len() {
                        self.pos += self.char_len();
                    }
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += self.char_len(),
            }
        }
        self.push(kind, start);
    }

    fn lex_number(&mut self, start: usize) {
        let is_hex = self.rest().starts_with("0x") || self.rest().starts_with("0X");
        let exponent: &[u8] = if is_hex { b"pP" } else { b"eE" };
        let mut prev = 0u8;
        while let Some(c) = self.peek() {
            let sign_after_exponent = (c == b'+' || c == b'-') && exponent.contains(&prev);
            if !(c.is_ascii_alphanumeric() || c == b'.' || c == b'_' || sign_after_exponent) {
                break;
            }
            prev = c;
            self.pos += 1;
        }
        self.push(TokenKind::Number, start);
    }

    fn lex_punct(&mut self, start: usize) {
        let rest = self.rest();
        let len = THREE_CHAR_PUNCT
            .iter()
            .chain(TWO_CHAR_PUNCT)
            .find(|p| rest.starts_with(**p))
            .map(|p| p.len())
            .unwrap_or_else(|| self.char_len());
        self.pos += len;
        self.push(TokenKind::Punct, start);
    }

    fn char_len(&self) -> usize {
        self.rest().chars().next().map_or(1, char::len_utf8)
    }

    fn unterminated(&mut self, start: usize, what: &str) {
        self.diagnostics.push(
            Diagnostic::warning(DiagnosticKind::UnterminatedLiteral, format!("unterminated {}", what))
                .with_span(Span::new(start as u32, self.pos as u32))
                .with_label("starts here"),
        );
    }
}

/// Tokenize, discarding diagnostics.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize().0
}

/// Tokenize generated text, attributing every token to `origin`.
pub fn synthesize(text: &str, origin: Span) -> Vec<Token> {
    let mut tokens = tokenize(text);
    for tok in &mut tokens {
        tok.span = origin;
    }
    tokens
}
