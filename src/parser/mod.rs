//! Operation language parser
//!
//! Hand-written recursive descent parser for transaction schedules:
//! - `W_<txn>(<page>,<value>)` writes a value to a page
//! - `Commit_<txn>()` commits a transaction
//! - `Flush(<page>)` writes a buffered page to disk
//! - `Checkpoint()` records a checkpoint
//!
//! Operations are separated by commas; a trailing comma is allowed and an
//! empty schedule is valid. Ids and values are runs of ASCII letters and
//! digits. A value may be wrapped in double quotes.

use crate::error::{AriesError, Result};
use crate::lexer::{Lexer, Spanned, Token};

pub mod ast;
pub use self::ast::*;

//=============================================================================
// Parser
//=============================================================================

/// Operation language parser
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    /// Parse a schedule string into operations
    pub fn parse(input: &str) -> Result<Vec<Operation>> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Parser { tokens, pos: 0 };
        parser.parse_schedule()
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|spanned| &spanned.token)
            .unwrap_or(&Token::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|spanned| spanned.offset)
            .unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn error(&self, expected: &str) -> AriesError {
        AriesError::Syntax(format!(
            "expected {} at offset {}, found {}",
            expected,
            self.offset(),
            self.peek().describe()
        ))
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if *self.peek() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&token.describe()))
        }
    }

    /// Consume an alphanumeric id
    fn expect_word(&mut self, what: &str) -> Result<String> {
        match self.peek().clone() {
            Token::Word(word) => {
                self.advance();
                Ok(word)
            }
            _ => Err(self.error(what)),
        }
    }

    /// Consume a value, bare or double-quoted
    fn expect_value(&mut self) -> Result<String> {
        match self.peek().clone() {
            Token::Word(word) => {
                self.advance();
                Ok(word)
            }
            Token::Quoted(value)
                if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                self.advance();
                Ok(value)
            }
            _ => Err(self.error("an alphanumeric value")),
        }
    }

    fn parse_schedule(&mut self) -> Result<Vec<Operation>> {
        let mut operations = Vec::new();
        while *self.peek() != Token::Eof {
            operations.push(self.parse_operation()?);
            match self.peek() {
                Token::Comma => self.advance(),
                Token::Eof => break,
                _ => return Err(self.error("',' or end of input")),
            }
        }
        Ok(operations)
    }

    fn parse_operation(&mut self) -> Result<Operation> {
        let keyword = self.expect_word("an operation")?;
        match keyword.as_str() {
            "W" => {
                self.expect(Token::Underscore)?;
                let txn = self.expect_word("a transaction id")?;
                self.expect(Token::LeftParen)?;
                let page = self.expect_word("a page id")?;
                self.expect(Token::Comma)?;
                let value = self.expect_value()?;
                self.expect(Token::RightParen)?;
                Ok(Operation::Write { txn, page, value })
            }
            "Commit" => {
                self.expect(Token::Underscore)?;
                let txn = self.expect_word("a transaction id")?;
                self.expect(Token::LeftParen)?;
                self.expect(Token::RightParen)?;
                Ok(Operation::Commit { txn })
            }
            "Flush" => {
                self.expect(Token::LeftParen)?;
                let page = self.expect_word("a page id")?;
                self.expect(Token::RightParen)?;
                Ok(Operation::Flush { page })
            }
            "Checkpoint" => {
                self.expect(Token::LeftParen)?;
                self.expect(Token::RightParen)?;
                Ok(Operation::Checkpoint)
            }
            other => Err(AriesError::Syntax(format!(
                "unknown operation '{}' before offset {}",
                other,
                self.offset()
            ))),
        }
    }
}
