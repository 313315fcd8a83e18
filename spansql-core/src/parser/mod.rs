//! Recursive-descent parser for the Spanner SQL dialect.
//!
//! The parser walks a fully tokenized input with a cursor. Lookahead is
//! done by peeking; backtracking saves the cursor with [`Parser::checkpoint`]
//! and puts it back with [`Parser::restore`], so nothing is mutated until a
//! production is confirmed.
//!
//! Entry points:
//! - [`parse_ddl`]: a file of `;`-separated DDL statements with comments
//! - [`parse_ddl_stmt`], [`parse_dml_stmt`], [`parse_query`]: one statement
//! - [`parse_expr`]: a standalone expression

mod ddl;
mod dml;
mod expressions;
mod query;

#[cfg(test)]
mod tests;

use crate::ast::{Comment, Ddl, DdlStmt, DmlStmt, Expr, Query};
use crate::error::{ParseError, ParseResult};
use crate::lexer::{Lexer, Token, TokenKind};

static EOF: Token = Token {
    kind: TokenKind::Eof,
    value: String::new(),
    line: 0,
    offset: 0,
};

/// Parse a whole DDL file.
pub fn parse_ddl(filename: &str, input: &str) -> ParseResult<Ddl> {
    let mut parser = Parser::new(filename, input)?;
    let mut list = Vec::new();

    while !parser.current_token().is_eof() {
        list.push(parser.parse_ddl_stmt()?);
        if parser.eat(&[";"]) {
            continue;
        }
        let tok = parser.current_token();
        if !tok.is_eof() {
            return Err(parser.error_at(tok, format!("unexpected token {:?}", tok.value)));
        }
    }
    parser.expect_end("unexpected trailing contents")?;

    let comments = parser.comments.drain(..).map(tidy_comment).collect();
    Ok(Ddl {
        list,
        filename: filename.to_string(),
        comments,
    })
}

/// Parse a single DDL statement.
pub fn parse_ddl_stmt(input: &str) -> ParseResult<DdlStmt> {
    let mut parser = Parser::new("-", input)?;
    let stmt = parser.parse_ddl_stmt()?;
    parser.expect_end("unexpected trailing contents")?;
    Ok(stmt)
}

/// Parse a single DML statement.
pub fn parse_dml_stmt(input: &str) -> ParseResult<DmlStmt> {
    let mut parser = Parser::new("-", input)?;
    let stmt = parser.parse_dml_stmt()?;
    parser.expect_end("unexpected trailing contents")?;
    Ok(stmt)
}

/// Parse a query.
pub fn parse_query(input: &str) -> ParseResult<Query> {
    let mut parser = Parser::new("-", input)?;
    let query = parser.parse_query()?;
    parser.expect_end("unexpected trailing query contents")?;
    Ok(query)
}

/// Parse a standalone expression.
pub fn parse_expr(input: &str) -> ParseResult<Expr> {
    let mut parser = Parser::new("-", input)?;
    let expr = parser.parse_expr()?;
    parser.expect_end("unexpected trailing contents")?;
    Ok(expr)
}

/// Trim trailing whitespace from each comment line and strip the leading
/// whitespace common to all of them.
fn tidy_comment(mut comment: Comment) -> Comment {
    const BLANK: &[char] = &[' ', '\u{8}', '\t'];

    for line in comment.text.iter_mut() {
        let trimmed = line.trim_end_matches(BLANK).len();
        line.truncate(trimmed);
    }
    let mut prefix: Option<&str> = None;
    for line in &comment.text {
        let indent = &line[..line.len() - line.trim_start_matches(BLANK).len()];
        prefix = Some(match prefix {
            None => indent,
            Some(p) => {
                let common = p
                    .chars()
                    .zip(indent.chars())
                    .take_while(|(a, b)| a == b)
                    .count();
                &p[..common]
            }
        });
        if prefix == Some("") {
            break;
        }
    }
    let strip = prefix.map(str::len).unwrap_or(0);
    if strip > 0 {
        for line in comment.text.iter_mut() {
            line.drain(..strip);
        }
    }
    comment
}

pub struct Parser {
    filename: String,
    input: String,
    tokens: Vec<Token>,
    position: usize,
    comments: Vec<Comment>,
}

impl Parser {
    pub fn new(filename: &str, input: &str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(filename, input);
        let tokens = lexer.tokenize()?;
        let comments = lexer.take_comments();

        Ok(Self {
            filename: filename.to_string(),
            input: input.to_string(),
            tokens,
            position: 0,
            comments,
        })
    }

    fn current_token(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&EOF)
    }

    fn peek_token(&self, offset: usize) -> &Token {
        self.tokens.get(self.position + offset).unwrap_or(&EOF)
    }

    fn advance(&mut self) {
        if !self.current_token().is_eof() {
            self.position += 1;
        }
    }

    /// Consume and return the current token.
    fn next(&mut self) -> Token {
        let tok = self.current_token().clone();
        self.advance();
        tok
    }

    fn checkpoint(&self) -> usize {
        self.position
    }

    fn restore(&mut self, checkpoint: usize) {
        self.position = checkpoint;
    }

    /// Whether the next tokens are exactly `want`, without consuming them.
    fn sniff(&self, want: &[&str]) -> bool {
        want.iter()
            .enumerate()
            .all(|(i, w)| self.peek_token(i).is(w))
    }

    /// Consume the next tokens if they are exactly `want`.
    fn eat(&mut self, want: &[&str]) -> bool {
        if !self.sniff(want) {
            return false;
        }
        self.position += want.len();
        true
    }

    fn expect(&mut self, want: &str) -> ParseResult<()> {
        let tok = self.current_token();
        if tok.is(want) {
            self.advance();
            return Ok(());
        }
        Err(self.error_at(tok, format!("got {} while expecting {:?}", describe(tok), want)))
    }

    /// Fail unless all input has been consumed.
    fn expect_end(&self, message: &str) -> ParseResult<()> {
        let tok = self.current_token();
        if tok.is_eof() {
            return Ok(());
        }
        let rest = self.input.get(tok.offset..).unwrap_or_default();
        Err(self.error_at(tok, format!("{} {:?}", message, rest)))
    }

    fn error_at(&self, tok: &Token, message: impl Into<String>) -> ParseError {
        ParseError::new(self.filename.clone(), tok.line, tok.offset, message)
    }

    /// Error positioned at the current token.
    fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.current_token(), message)
    }

    /// Parse `bra elem, elem, ... ket`, handing each element to `f`.
    /// An empty list and a trailing comma are both accepted.
    fn parse_comma_list<F>(&mut self, bra: &str, ket: &str, mut f: F) -> ParseResult<()>
    where
        F: FnMut(&mut Self) -> ParseResult<()>,
    {
        self.expect(bra)?;
        loop {
            if self.eat(&[ket]) {
                return Ok(());
            }
            f(self)?;

            let tok = self.next();
            if tok.is(ket) {
                return Ok(());
            }
            if !tok.is(",") {
                return Err(self.error_at(
                    &tok,
                    format!("got {}, want {:?} or \",\"", describe(&tok), ket),
                ));
            }
        }
    }

    /// Table, index, column, constraint and alias names.
    fn parse_name(&mut self) -> ParseResult<String> {
        let tok = self.current_token();
        let name = match &tok.kind {
            TokenKind::QuotedIdent(name) => name.clone(),
            TokenKind::Ident => tok.value.clone(),
            _ => return Err(self.error(format!("got {}, expected identifier", describe(tok)))),
        };
        self.advance();
        Ok(name)
    }

    fn parse_name_list(&mut self) -> ParseResult<Vec<String>> {
        let mut list = Vec::new();
        self.parse_comma_list("(", ")", |p| {
            list.push(p.parse_name()?);
            Ok(())
        })?;
        Ok(list)
    }
}

/// How a token is quoted in error messages.
fn describe(tok: &Token) -> String {
    if tok.is_eof() {
        "end of input".to_string()
    } else {
        format!("{:?}", tok.value)
    }
}
