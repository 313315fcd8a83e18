//! Lexer for the Spanner SQL dialect.
//!
//! The whole input is tokenized up front; the parser then walks the token
//! vector with a plain index, so backtracking is a matter of restoring that
//! index. Comments are collected on the side for association with DDL nodes.

use crate::ast::{Comment, Position};
use crate::error::{ParseError, ParseResult};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Integer literal. The text stays unparsed until the parser knows
    /// whether a leading `-` or `+` belongs to it.
    Int64 { base: u32 },
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Unquoted identifier or keyword.
    Ident,
    /// Backtick-quoted identifier, decoded.
    QuotedIdent(String),
    /// `@name` query parameter.
    Param(String),
    /// Operator or punctuation.
    Symbol,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw source text of the token.
    pub value: String,
    pub line: usize,
    pub offset: usize,
}

impl Token {
    pub fn position(&self) -> Position {
        Position::new(self.line, self.offset)
    }

    /// Whether this is a bare word or symbol spelled `want` (ASCII
    /// case-insensitive). Literals and quoted identifiers never match.
    pub fn is(&self, want: &str) -> bool {
        matches!(self.kind, TokenKind::Ident | TokenKind::Symbol)
            && self.value.eq_ignore_ascii_case(want)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

/// Two-byte operators, checked before the single-byte ones.
const OPERATORS_2: &[&str] = &["||", "<<", ">>", "<=", ">=", "!=", "<>"];
const OPERATORS_1: &[char] = &['~', '/', '&', '^', '|', '<', '>', '='];

pub struct Lexer {
    filename: String,
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
    line: usize,
    offset: usize,
    prev_ident: bool,
    comments: Vec<Comment>,
}

impl Lexer {
    pub fn new(filename: &str, input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            filename: filename.to_string(),
            input: chars,
            position: 0,
            current_char,
            line: 1,
            offset: 0,
            prev_ident: false,
            comments: Vec::new(),
        }
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char {
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
            }
        }
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn error_at(&self, line: usize, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::new(self.filename.clone(), line, offset, message)
    }

    /// Comments seen so far, in source order.
    pub fn take_comments(&mut self) -> Vec<Comment> {
        std::mem::take(&mut self.comments)
    }

    /// Tokenize the whole input. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn is_space(ch: char) -> bool {
        matches!(ch, ' ' | '\u{8}' | '\t' | '\n' | '\r')
    }

    /// Skip whitespace and comments, recording the comments.
    fn skip_space(&mut self) -> ParseResult<()> {
        let init_line = self.line;
        // Index of the comment being extended during this call.
        let mut building: Option<usize> = None;

        loop {
            match self.current_char {
                Some(ch) if Self::is_space(ch) => {
                    self.advance();
                    continue;
                }
                _ => {}
            }

            let (marker, term) = if self.starts_with("#") {
                ("#", "\n")
            } else if self.starts_with("--") {
                ("--", "\n")
            } else if self.starts_with("/*") {
                ("/*", "*/")
            } else {
                return Ok(());
            };

            let (start_line, start_offset) = (self.line, self.offset);
            for _ in 0..marker.len() {
                self.advance();
            }
            let mut body = String::new();
            let mut terminated = false;
            while let Some(ch) = self.current_char {
                if self.starts_with(term) {
                    terminated = true;
                    break;
                }
                body.push(ch);
                self.advance();
            }
            // Line comments may run to the end of input.
            if !terminated && term == "*/" {
                return Err(self.error_at(start_line, start_offset, "unterminated comment"));
            }

            if let Some(idx) = building {
                let prev = &self.comments[idx];
                if prev.end.line + 1 < start_line || prev.marker != marker {
                    building = None;
                }
            }
            let idx = match building {
                Some(idx) => idx,
                None => {
                    self.comments.push(Comment {
                        marker: marker.to_string(),
                        isolated: start_line != init_line || start_line == 1,
                        start: Position::new(start_line, start_offset),
                        end: Position::default(),
                        text: Vec::new(),
                    });
                    self.comments.len() - 1
                }
            };
            let lines: Vec<String> = body.split('\n').map(str::to_string).collect();
            let end_line = start_line + lines.len() - 1;
            let comment = &mut self.comments[idx];
            comment.text.extend(lines);
            comment.end = Position::new(end_line, self.offset);
            let isolated = comment.isolated;

            if terminated {
                for _ in 0..term.len() {
                    self.advance();
                }
            }

            building = if isolated { Some(idx) } else { None };
        }
    }

    pub fn next_token(&mut self) -> ParseResult<Token> {
        let prev_ident = self.prev_ident;
        self.skip_space()?;

        let (line, offset, start) = (self.line, self.offset, self.position);
        let token = |lexer: &Self, kind: TokenKind| Token {
            kind,
            value: lexer.input[start..lexer.position].iter().collect(),
            line,
            offset,
        };

        let Some(ch) = self.current_char else {
            self.prev_ident = false;
            return Ok(Token {
                kind: TokenKind::Eof,
                value: String::new(),
                line,
                offset,
            });
        };

        // After an identifier a dot separates path elements.
        if prev_ident && ch == '.' {
            self.advance();
            self.prev_ident = false;
            return Ok(token(self, TokenKind::Symbol));
        }

        let kind = match ch {
            ',' | ';' | '(' | ')' | '{' | '}' | '[' | ']' | '*' | '+' | '-' => {
                self.advance();
                TokenKind::Symbol
            }
            '`' => {
                let content = self.read_string_content("`", false, true, "quoted identifier")?;
                let name = self.utf8(content, line, offset, "quoted identifier")?;
                TokenKind::QuotedIdent(name)
            }
            'B' | 'b' | 'R' | 'r' | '"' | '\'' => match self.string_prefix() {
                Some((raw, bytes)) => self.read_string(raw, bytes, line, offset)?,
                None => self.read_identifier(),
            },
            '@' => self.read_identifier(),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(),
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number(line, offset)?
            }
            c if c.is_ascii_digit() => self.read_number(line, offset)?,
            _ => self.read_operator(ch, line, offset)?,
        };

        self.prev_ident = matches!(kind, TokenKind::Ident | TokenKind::QuotedIdent(_));
        Ok(token(self, kind))
    }

    /// Detects a string literal prefix (`B`, `R`, `BR`, `rb`, ...) followed by
    /// a quote. Returns the raw/bytes flags without consuming anything.
    fn string_prefix(&self) -> Option<(bool, bool)> {
        let (mut raw, mut bytes) = (false, false);
        for i in 0..4 {
            match self.peek_at(i)? {
                'R' | 'r' if !raw => raw = true,
                'B' | 'b' if !bytes => bytes = true,
                '"' | '\'' => return Some((raw, bytes)),
                _ => return None,
            }
        }
        None
    }

    fn read_identifier(&mut self) -> TokenKind {
        let is_param = self.current_char == Some('@');
        let mut name = String::new();
        self.advance();
        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        match (is_param, name.is_empty()) {
            (true, true) => TokenKind::Symbol,
            (true, false) => TokenKind::Param(name),
            (false, _) => TokenKind::Ident,
        }
    }

    fn read_operator(&mut self, ch: char, line: usize, offset: usize) -> ParseResult<TokenKind> {
        if let Some(op) = OPERATORS_2.iter().find(|op| self.starts_with(op)) {
            for _ in 0..op.len() {
                self.advance();
            }
            return Ok(TokenKind::Symbol);
        }
        if OPERATORS_1.contains(&ch) {
            self.advance();
            return Ok(TokenKind::Symbol);
        }
        let mut buf = [0u8; 4];
        let byte = ch.encode_utf8(&mut buf).as_bytes()[0];
        Err(self.error_at(line, offset, format!("unexpected byte {:#x}", byte)))
    }

    fn read_number(&mut self, line: usize, offset: usize) -> ParseResult<TokenKind> {
        let mut base = 10;
        if self.starts_with("0x") || self.starts_with("0X") {
            base = 16;
            self.advance();
            self.advance();
        }

        let mut digits = 0;
        let (mut is_float, mut seen_e, mut seen_dot) = (false, false, false);
        let mut text = String::new();
        while let Some(ch) = self.current_char {
            match ch {
                '0'..='9' => {}
                'a'..='f' | 'A'..='F' if base == 16 => {}
                'e' | 'E' if base == 10 => {
                    if seen_e {
                        return Err(self.error_at(line, offset, format!("bad token {:?}", text)));
                    }
                    is_float = true;
                    seen_e = true;
                    text.push(ch);
                    self.advance();
                    if let Some(sign @ ('+' | '-')) = self.current_char {
                        text.push(sign);
                        self.advance();
                    }
                    continue;
                }
                '.' if base == 10 => {
                    if seen_dot || seen_e {
                        return Err(self.error_at(line, offset, format!("bad token {:?}", text)));
                    }
                    is_float = true;
                    seen_dot = true;
                    text.push(ch);
                    self.advance();
                    continue;
                }
                _ => break,
            }
            digits += 1;
            text.push(ch);
            self.advance();
        }

        if digits == 0 {
            return Err(self.error_at(line, offset, "no digits in numeric literal"));
        }
        if !is_float {
            return Ok(TokenKind::Int64 { base });
        }
        let x = text
            .parse::<f64>()
            .map_err(|e| self.error_at(line, offset, format!("bad numeric literal {:?}: {}", text, e)))?;
        if !x.is_finite() {
            return Err(self.error_at(line, offset, format!("numeric literal {:?} out of range", text)));
        }
        Ok(TokenKind::Float64(x))
    }

    fn read_string(
        &mut self,
        raw: bool,
        bytes: bool,
        line: usize,
        offset: usize,
    ) -> ParseResult<TokenKind> {
        // Skip the prefix letters.
        while matches!(self.current_char, Some(c) if c != '"' && c != '\'') {
            self.advance();
        }
        let quote = self.current_char.unwrap_or('"');
        let delim: String = if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
            std::iter::repeat(quote).take(3).collect()
        } else {
            quote.to_string()
        };

        let name = match (raw, bytes) {
            (true, true) => "raw bytes literal",
            (true, false) => "raw string literal",
            (false, true) => "bytes literal",
            (false, false) => "string literal",
        };
        let content = self.read_string_content(&delim, raw, !bytes, name)?;
        if bytes {
            return Ok(TokenKind::Bytes(content));
        }
        Ok(TokenKind::String(self.utf8(content, line, offset, name)?))
    }

    fn utf8(&self, content: Vec<u8>, line: usize, offset: usize, name: &str) -> ParseResult<String> {
        String::from_utf8(content)
            .map_err(|_| self.error_at(line, offset, format!("invalid UTF-8 in {}", name)))
    }

    /// Consume a delimited literal including both delimiters.
    ///
    /// `raw` keeps escapes verbatim; `unicode` permits `\u` and `\U`.
    fn read_string_content(
        &mut self,
        delim: &str,
        raw: bool,
        unicode: bool,
        name: &str,
    ) -> ParseResult<Vec<u8>> {
        let (line, offset) = (self.line, self.offset);
        let name = if delim.len() == 3 {
            format!("triple-quoted {}", name)
        } else {
            name.to_string()
        };
        let illegal = |lexer: &Self, what: String| {
            lexer.error_at(line, offset, format!("illegal escape sequence: {}", what))
        };

        for _ in 0..delim.len() {
            self.advance();
        }
        let mut content = Vec::new();

        while let Some(ch) = self.current_char {
            if self.starts_with(delim) {
                for _ in 0..delim.len() {
                    self.advance();
                }
                return Ok(content);
            }

            if ch == '\\' {
                self.advance();
                let Some(esc) = self.current_char else {
                    break;
                };
                if raw {
                    content.push(b'\\');
                    push_char(&mut content, esc);
                    self.advance();
                    continue;
                }
                match esc {
                    'a' => content.push(0x07),
                    'b' => content.push(0x08),
                    'f' => content.push(0x0c),
                    'n' => content.push(b'\n'),
                    'r' => content.push(b'\r'),
                    't' => content.push(b'\t'),
                    'v' => content.push(0x0b),
                    '\\' | '?' | '"' | '\'' | '`' => content.push(esc as u8),
                    'x' | 'X' => {
                        let hex = self.take_digits(1, 2, 16);
                        let Some(value) = hex else {
                            return Err(illegal(
                                self,
                                "hex escape sequence must be followed by 2 hex digits".to_string(),
                            ));
                        };
                        content.push(value as u8);
                        continue;
                    }
                    'u' | 'U' => {
                        if !unicode {
                            return Err(illegal(self, format!("\\{}", esc)));
                        }
                        let size = if esc == 'U' { 8 } else { 4 };
                        let Some(code) = self.take_digits(1, size, 16) else {
                            return Err(illegal(
                                self,
                                format!(
                                    "\\{} escape sequence must be followed by {} hex digits",
                                    esc, size
                                ),
                            ));
                        };
                        let Some(c) = char::from_u32(code) else {
                            return Err(illegal(self, format!("invalid codepoint: {:x}", code)));
                        };
                        push_char(&mut content, c);
                        continue;
                    }
                    '0'..='7' => {
                        let Some(value) = self.take_digits(0, 3, 8) else {
                            return Err(illegal(
                                self,
                                "octal escape sequence must be followed by 3 octal digits"
                                    .to_string(),
                            ));
                        };
                        if value >= 256 {
                            return Err(illegal(self, format!("octal digits overflow: {:o} ({})", value, value)));
                        }
                        content.push(value as u8);
                        continue;
                    }
                    other => return Err(illegal(self, format!("\\{}", other))),
                }
                self.advance();
                continue;
            }

            if ch == '\n' && delim.len() != 3 {
                return Err(self.error_at(line, offset, format!("newline forbidden in {}", name)));
            }

            push_char(&mut content, ch);
            self.advance();
        }

        Err(self.error_at(line, offset, format!("unclosed {}", name)))
    }

    /// Read exactly `count` digits in `radix` starting `skip` characters
    /// ahead. Consumes the skipped characters and the digits on success,
    /// nothing on failure.
    fn take_digits(&mut self, skip: usize, count: usize, radix: u32) -> Option<u32> {
        let digits: String = (skip..skip + count)
            .map(|i| self.peek_at(i))
            .collect::<Option<String>>()?;
        if !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        let value = u32::from_str_radix(&digits, radix).ok()?;
        for _ in 0..skip + count {
            self.advance();
        }
        Some(value)
    }
}

fn push_char(buf: &mut Vec<u8>, ch: char) {
    let mut tmp = [0u8; 4];
    buf.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
}

/// Resolve the text of an integer token, applying a sign taken from a
/// preceding unary operator.
pub fn parse_int64(text: &str, base: u32, negative: bool) -> Result<i64, String> {
    let digits = if base == 16 {
        text.get(2..).unwrap_or_default()
    } else {
        text
    };
    let magnitude = u64::from_str_radix(digits, base)
        .map_err(|_| format!("integer literal {:?} out of range", text))?;
    if negative {
        if magnitude > i64::MAX as u64 + 1 {
            return Err(format!("integer literal -{} out of range", text));
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).map_err(|_| format!("integer literal {:?} out of range", text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new("-", input).tokenize().unwrap()
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).into_iter().map(|t| t.kind).collect()
    }

    fn lex_err(input: &str) -> String {
        Lexer::new("-", input).tokenize().unwrap_err().message
    }

    #[test]
    fn test_words_and_symbols() {
        let tokens = lex("SELECT a, b FROM T WHERE a <= @lim");
        let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(
            values,
            vec!["SELECT", "a", ",", "b", "FROM", "T", "WHERE", "a", "<=", "@lim", ""]
        );
        assert_eq!(tokens[9].kind, TokenKind::Param("lim".to_string()));
        assert!(tokens[0].is("select"));
        assert!(tokens.last().unwrap().is_eof());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 0x1F 1.5 .5 3e2 1E-3"),
            vec![
                TokenKind::Int64 { base: 10 },
                TokenKind::Int64 { base: 16 },
                TokenKind::Float64(1.5),
                TokenKind::Float64(0.5),
                TokenKind::Float64(300.0),
                TokenKind::Float64(0.001),
                TokenKind::Eof,
            ]
        );
        assert_eq!(lex_err("1.2.3"), "bad token \"1.2\"");
        assert_eq!(lex_err("0x"), "no digits in numeric literal");
        assert_eq!(lex_err("1e400"), "numeric literal \"1e400\" out of range");
    }

    #[test]
    fn test_dot_after_identifier_is_path_separator() {
        let tokens = lex("a.b .5");
        assert_eq!(tokens[1].kind, TokenKind::Symbol);
        assert_eq!(tokens[1].value, ".");
        assert_eq!(tokens[2].kind, TokenKind::Ident);
        assert_eq!(tokens[3].kind, TokenKind::Float64(0.5));
    }

    #[test]
    fn test_parse_int64() {
        assert_eq!(parse_int64("42", 10, false), Ok(42));
        assert_eq!(parse_int64("0x1F", 16, true), Ok(-31));
        assert_eq!(parse_int64("9223372036854775808", 10, true), Ok(i64::MIN));
        assert!(parse_int64("9223372036854775808", 10, false).is_err());
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(
            kinds(r#""a\tb""#)[0],
            TokenKind::String("a\tb".to_string())
        );
        assert_eq!(kinds(r#"R"a\tb""#)[0], TokenKind::String("a\\tb".to_string()));
        assert_eq!(kinds(r#"b"\x00\xff""#)[0], TokenKind::Bytes(vec![0, 255]));
        assert_eq!(kinds(r#"rb'\x'"#)[0], TokenKind::Bytes(b"\\x".to_vec()));
        assert_eq!(kinds(r#""é\101""#)[0], TokenKind::String("éA".to_string()));
        assert_eq!(
            kinds("'''two\nlines'''")[0],
            TokenKind::String("two\nlines".to_string())
        );
    }

    #[test]
    fn test_string_errors() {
        assert_eq!(lex_err("'abc"), "unclosed string literal");
        assert_eq!(lex_err("\"a\nb\""), "newline forbidden in string literal");
        assert_eq!(lex_err("'''abc"), "unclosed triple-quoted string literal");
        assert_eq!(
            lex_err(r#"b"\u0041""#),
            "illegal escape sequence: \\u"
        );
        assert_eq!(
            lex_err(r#""\uD800""#),
            "illegal escape sequence: invalid codepoint: d800"
        );
        assert_eq!(lex_err(r#""\q""#), "illegal escape sequence: \\q");
        assert_eq!(
            lex_err(r#""\477""#),
            "illegal escape sequence: octal digits overflow: 477 (319)"
        );
    }

    #[test]
    fn test_quoted_identifier() {
        let tokens = lex("`SELECT`");
        assert_eq!(tokens[0].kind, TokenKind::QuotedIdent("SELECT".to_string()));
        assert!(!tokens[0].is("SELECT"));
    }

    #[test]
    fn test_identifier_with_string_prefix_letters() {
        let tokens = lex("Bob rb");
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[1].kind, TokenKind::Ident);
    }

    #[test]
    fn test_unexpected_byte() {
        let err = Lexer::new("q.sql", "SELECT ?").tokenize().unwrap_err();
        assert_eq!(err.to_string(), "q.sql:1.7: unexpected byte 0x3f");
    }

    #[test]
    fn test_comments_are_collected() {
        let mut lexer = Lexer::new(
            "-",
            "-- first\n-- second\n\n# other\nCREATE /* inline */\n/* unterminated",
        );
        let err = lexer.tokenize().unwrap_err();
        assert_eq!(err.message, "unterminated comment");
        assert_eq!(err.line, 6);

        let mut lexer = Lexer::new("-", "-- first\n-- second\n\n# other\nCREATE /* inline */");
        lexer.tokenize().unwrap();
        let comments = lexer.take_comments();
        assert_eq!(comments.len(), 3);
        assert_eq!(comments[0].text, vec![" first", " second"]);
        assert_eq!(comments[0].start.line, 1);
        assert_eq!(comments[0].end.line, 2);
        assert!(comments[0].isolated);
        assert_eq!(comments[1].marker, "#");
        assert!(!comments[2].isolated);
        assert_eq!(comments[2].text, vec![" inline "]);
    }

    #[test]
    fn test_line_numbers() {
        let tokens = lex("a\n  b\n\nc");
        assert_eq!((tokens[0].line, tokens[0].offset), (1, 0));
        assert_eq!((tokens[1].line, tokens[1].offset), (2, 4));
        assert_eq!((tokens[2].line, tokens[2].offset), (4, 7));
    }
}
