//! Lexical analysis for the Nostos DSL.
//!
//! The lexer is a character-driven scanner producing tokens on demand; the
//! parser pulls tokens one at a time, so the producer can never outrun or
//! stall the consumer. The stream is single use and ends with exactly one
//! `Eof` token, or with a single `Error` token after which nothing else is
//! produced.
//!
//! Indentation is significant: each step is two spaces, horizontal tabs are
//! rejected, and every token carries the indent level active at its start.

use crate::position::Position;

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Lexing failure; the token text is the message. Ends the stream.
    Error,
    /// `.` outside a path literal.
    Dot,
    Eof,
    /// `-` starting a list item.
    ListMarker,
    Colon,
    /// `=>`
    Arrow,
    /// `<<`
    Shovel,
    LeftParen,
    RightParen,
    Number,
    Str,
    Path,
    Symbol,
    /// Keyword `let`
    Let,
    /// Keyword `in`
    In,
}

/// One lexical token with its source location and indent level.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
    /// Indent level of the line this token starts on, in 2-space steps.
    pub indent: u32,
}

/// Character scanner over one document.
pub struct Lexer<'a> {
    src: &'a str,
    /// Current byte offset.
    pos: usize,
    /// 0-indexed count of line feeds seen.
    line: u32,
    /// Character offset within the current line.
    character: u32,
    /// Indent level of the current line, in 2-space steps.
    indent: u32,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Lexer<'a> {
        Lexer {
            src,
            pos: 0,
            line: 0,
            character: 0,
            indent: 0,
            done: false,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        self.character += 1;
        Some(c)
    }

    fn token(&self, kind: TokenKind, start: usize, start_char: u32, text: &str) -> Token {
        Token {
            kind,
            text: text.to_string(),
            position: Position::new(
                start as u32,
                (self.pos - start) as u32,
                self.line,
                start_char,
            ),
            indent: self.indent,
        }
    }

    /// Emit an error token and terminate the stream.
    fn error(&mut self, start: usize, start_char: u32, message: String) -> Token {
        self.done = true;
        Token {
            kind: TokenKind::Error,
            text: message,
            position: Position::new(
                start as u32,
                (self.pos.max(start + 1) - start) as u32,
                self.line,
                start_char,
            ),
            indent: self.indent,
        }
    }

    /// Consume a newline and re-measure the indent of the following line.
    ///
    /// Returns an error token when the indent is not a multiple of two
    /// spaces; blank lines never error.
    fn scan_newline(&mut self) -> Option<Token> {
        self.bump(); // '\n'
        self.line += 1;
        self.character = 0;
        self.indent = 0;

        let start = self.pos;
        let mut spaces = 0u32;
        while self.peek_char() == Some(' ') {
            self.bump();
            spaces += 1;
        }
        match self.peek_char() {
            // Blank line (or trailing spaces before EOF): indent just updates.
            Some('\n') | None => {
                self.indent = spaces / 2;
                None
            }
            _ if spaces % 2 != 0 => Some(self.error(
                start,
                0,
                "indents must contain two spaces".to_string(),
            )),
            _ => {
                self.indent = spaces / 2;
                None
            }
        }
    }

    fn at_path_start(&self) -> bool {
        let rest = &self.src[self.pos..];
        rest.starts_with("./") || rest.starts_with("../") || rest.starts_with('/')
    }

    fn scan_path(&mut self) -> Token {
        let start = self.pos;
        let start_char = self.character;
        while self.peek_char().map_or(false, is_path_rune) {
            self.bump();
        }
        let text = &self.src[start..self.pos];
        self.token(TokenKind::Path, start, start_char, text)
    }

    fn scan_symbol(&mut self) -> Token {
        let start = self.pos;
        let start_char = self.character;
        while self.peek_char().map_or(false, is_key_rune) {
            self.bump();
        }
        let text = &self.src[start..self.pos];
        let kind = match text {
            "let" => TokenKind::Let,
            "in" => TokenKind::In,
            _ => TokenKind::Symbol,
        };
        self.token(kind, start, start_char, text)
    }

    fn scan_string(&mut self) -> Token {
        let quote_char = self.character;
        let quote_byte = self.pos;
        self.bump(); // opening quote
        let content_start = self.pos;
        loop {
            match self.peek_char() {
                None => {
                    return self.error(
                        quote_byte,
                        quote_char,
                        "EOF reached in unterminated string".to_string(),
                    );
                }
                Some('\\') => {
                    // Escapes are preserved verbatim in the token text.
                    self.bump();
                    if self.peek_char().is_some() {
                        self.bump();
                    }
                }
                Some('"') => break,
                Some(_) => {
                    self.bump();
                }
            }
        }
        let content = &self.src[content_start..self.pos];
        let token = Token {
            kind: TokenKind::Str,
            text: content.to_string(),
            position: Position::new(
                content_start as u32,
                content.len() as u32,
                self.line,
                // Consumers rely on the character offset pointing at the
                // opening quote for range underlining.
                quote_char,
            ),
            indent: self.indent,
        };
        self.bump(); // closing quote
        token
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        let start_char = self.character;
        if matches!(self.peek_char(), Some('+') | Some('-')) {
            self.bump();
        }
        let mut hex = false;
        if self.peek_char() == Some('0')
            && matches!(self.peek_second(), Some('x') | Some('X'))
        {
            self.bump();
            self.bump();
            hex = true;
        }
        let digit = |c: char| {
            if hex {
                c.is_ascii_hexdigit()
            } else {
                c.is_ascii_digit()
            }
        };
        while self.peek_char().map_or(false, digit) {
            self.bump();
        }
        if self.peek_char() == Some('.') && self.peek_second().map_or(false, digit) {
            self.bump();
            while self.peek_char().map_or(false, digit) {
                self.bump();
            }
        }
        if !hex && matches!(self.peek_char(), Some('e') | Some('E')) {
            self.bump();
            if matches!(self.peek_char(), Some('+') | Some('-')) {
                self.bump();
            }
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        // A trailing alphanumeric aborts the number.
        if self.peek_char().map_or(false, |c| c.is_ascii_alphanumeric()) {
            self.bump();
            let lexeme = &self.src[start..self.pos];
            return self.error(
                start,
                start_char,
                format!("bad number syntax: {lexeme:?}"),
            );
        }
        let text = &self.src[start..self.pos];
        self.token(TokenKind::Number, start, start_char, text)
    }

    fn scan_token(&mut self) -> Token {
        let start = self.pos;
        let start_char = self.character;
        // The dispatch below only runs with at least one char available.
        let c = self.peek_char().expect("scan_token at EOF");
        match c {
            '.' => {
                if self.at_path_start() {
                    return self.scan_path();
                }
                self.bump();
                self.token(TokenKind::Dot, start, start_char, ".")
            }
            '/' => self.scan_path(),
            '-' => {
                if self.peek_second().map_or(false, |c| c.is_ascii_digit()) {
                    return self.scan_number();
                }
                self.bump();
                self.token(TokenKind::ListMarker, start, start_char, "-")
            }
            '+' => {
                if self.peek_second().map_or(false, |c| c.is_ascii_digit()) {
                    return self.scan_number();
                }
                self.bump();
                self.error(start, start_char, "unexpected '+'".to_string())
            }
            '(' => {
                self.bump();
                self.token(TokenKind::LeftParen, start, start_char, "(")
            }
            ')' => {
                self.bump();
                self.token(TokenKind::RightParen, start, start_char, ")")
            }
            ':' => {
                self.bump();
                self.token(TokenKind::Colon, start, start_char, ":")
            }
            '=' => {
                self.bump();
                if self.peek_char() == Some('>') {
                    self.bump();
                    self.token(TokenKind::Arrow, start, start_char, "=>")
                } else {
                    self.error(start, start_char, "unexpected '='".to_string())
                }
            }
            '<' => {
                self.bump();
                if self.peek_char() == Some('<') {
                    self.bump();
                    self.token(TokenKind::Shovel, start, start_char, "<<")
                } else {
                    self.error(start, start_char, "unexpected '<'".to_string())
                }
            }
            '"' => self.scan_string(),
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_ascii_alphabetic() => self.scan_symbol(),
            c => {
                self.bump();
                self.error(start, start_char, format!("unexpected character {c:?}"))
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        loop {
            match self.peek_char() {
                None => {
                    self.done = true;
                    let pos = self.pos;
                    let character = self.character;
                    return Some(self.token(TokenKind::Eof, pos, character, ""));
                }
                Some('\n') => {
                    if let Some(err) = self.scan_newline() {
                        return Some(err);
                    }
                }
                Some('\r') => {
                    self.bump();
                }
                Some(' ') => {
                    self.bump();
                }
                Some('\t') => {
                    let start = self.pos;
                    let character = self.character;
                    self.bump();
                    return Some(self.error(
                        start,
                        character,
                        "horizontal tabs are not supported".to_string(),
                    ));
                }
                Some(_) => return Some(self.scan_token()),
            }
        }
    }
}

fn is_path_rune(c: char) -> bool {
    !matches!(c, ' ' | '\n' | '\t' | '\r' | ':' | '(' | ')')
}

fn is_key_rune(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '/' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        Lexer::new(src).collect()
    }

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn symbols_and_colon() {
        let tokens = lex("foo: bar");
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Symbol,
                TokenKind::Colon,
                TokenKind::Symbol,
                TokenKind::Eof
            ]
        );
        assert_eq!(tokens[0].text, "foo");
        assert_eq!(tokens[2].text, "bar");
        assert_eq!(tokens[2].position.character, 5);
    }

    #[test]
    fn stream_ends_with_exactly_one_eof() {
        let tokens = lex("foo: 1\nbar: 2");
        let eofs = tokens.iter().filter(|t| t.kind == TokenKind::Eof).count();
        assert_eq!(eofs, 1);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn quoted_string_keeps_escapes() {
        let tokens = lex(r#""this is a \"quoted\" string""#);
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].text, r#"this is a \"quoted\" string"#);
        // Character offset points at the opening quote.
        assert_eq!(tokens[0].position.character, 0);
    }

    #[test]
    fn unterminated_string_errors_at_the_quote() {
        let tokens = lex(r#"key: "unterminated"#);
        let err = tokens.last().unwrap();
        assert_eq!(err.kind, TokenKind::Error);
        assert_eq!(err.text, "EOF reached in unterminated string");
        assert_eq!(err.position.character, 5);
    }

    #[test]
    fn error_token_terminates_the_stream() {
        let tokens = lex("foo:\tbar");
        let errors: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].text.contains("horizontal tabs"));
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Error);
    }

    #[test]
    fn numbers() {
        for (src, text) in [
            ("42", "42"),
            ("-17", "-17"),
            ("3.14", "3.14"),
            ("5.67e-8", "5.67e-8"),
            ("1e10", "1e10"),
            ("0x1F", "0x1F"),
        ] {
            let tokens = lex(src);
            assert_eq!(tokens[0].kind, TokenKind::Number, "{src}");
            assert_eq!(tokens[0].text, text, "{src}");
        }
    }

    #[test]
    fn bad_number_syntax() {
        let tokens = lex("123zed");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert!(tokens[0].text.starts_with("bad number syntax"));
    }

    #[test]
    fn dash_is_a_list_marker_unless_signed_number() {
        assert_eq!(
            kinds("- yo"),
            vec![TokenKind::ListMarker, TokenKind::Symbol, TokenKind::Eof]
        );
        assert_eq!(kinds("-1"), vec![TokenKind::Number, TokenKind::Eof]);
    }

    #[test]
    fn paths() {
        for src in ["./redis.no", "../up.no", "/abs/file.no"] {
            let tokens = lex(src);
            assert_eq!(tokens[0].kind, TokenKind::Path, "{src}");
            assert_eq!(tokens[0].text, src, "{src}");
        }
        // Paths end at colon and parens.
        let tokens = lex("import(./svc.no)");
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Symbol,
                TokenKind::LeftParen,
                TokenKind::Path,
                TokenKind::RightParen,
                TokenKind::Eof
            ]
        );
        assert_eq!(tokens[2].text, "./svc.no");
    }

    #[test]
    fn dotted_symbol_is_one_token() {
        let tokens = lex("svc.spec.ports");
        assert_eq!(tokens[0].kind, TokenKind::Symbol);
        assert_eq!(tokens[0].text, "svc.spec.ports");
    }

    #[test]
    fn operators_and_keywords() {
        assert_eq!(
            kinds("let x => y << z in"),
            vec![
                TokenKind::Let,
                TokenKind::Symbol,
                TokenKind::Arrow,
                TokenKind::Symbol,
                TokenKind::Shovel,
                TokenKind::Symbol,
                TokenKind::In,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn stray_equals_is_an_error() {
        let tokens = lex("a = b");
        let err = tokens.iter().find(|t| t.kind == TokenKind::Error).unwrap();
        assert_eq!(err.text, "unexpected '='");
    }

    #[test]
    fn indent_levels() {
        let tokens = lex("a:\n  b: 1\n    c: 2");
        let b = tokens.iter().find(|t| t.text == "b").unwrap();
        let c = tokens.iter().find(|t| t.text == "c").unwrap();
        assert_eq!(b.indent, 1);
        assert_eq!(c.indent, 2);
        assert_eq!(b.position.line, 1);
        assert_eq!(b.position.character, 2);
    }

    #[test]
    fn odd_indent_is_an_error() {
        let tokens = lex("a:\n   b: 1");
        let err = tokens.last().unwrap();
        assert_eq!(err.kind, TokenKind::Error);
        assert_eq!(err.text, "indents must contain two spaces");
    }

    #[test]
    fn blank_lines_do_not_error() {
        let tokens = lex("a: 1\n\n   \nb: 2");
        assert!(tokens.iter().all(|t| t.kind != TokenKind::Error));
        let b = tokens.iter().find(|t| t.text == "b").unwrap();
        assert_eq!(b.position.line, 3);
        assert_eq!(b.indent, 0);
    }

    #[test]
    fn positions_are_byte_accurate() {
        let tokens = lex("ab: cd");
        assert_eq!(tokens[0].position.offset, 0);
        assert_eq!(tokens[0].position.length, 2);
        assert_eq!(tokens[2].position.offset, 4);
        assert_eq!(tokens[2].position.length, 2);
    }

    #[test]
    fn every_source_terminates() {
        // Exhaustive-ish sweep over small inputs of tricky characters.
        let alphabet = ['a', '1', '"', '\\', '\n', ' ', ':', '-', '.', '/', '(', ')', '='];
        for &a in &alphabet {
            for &b in &alphabet {
                let src: String = [a, b].iter().collect();
                let tokens: Vec<_> = Lexer::new(&src).take(100).collect();
                let last = tokens.last().unwrap();
                assert!(
                    matches!(last.kind, TokenKind::Eof | TokenKind::Error),
                    "source {src:?} did not terminate cleanly: {tokens:?}"
                );
            }
        }
    }
}
