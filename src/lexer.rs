use crate::error::{AriesError, Result};

//=============================================================================
// Lexer (Tokenizer)
//=============================================================================

/// Token types for the operation language
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Run of letters and digits: keywords, ids and values
    Word(String),
    /// Double-quoted value, quotes stripped
    Quoted(String),

    // Punctuation
    Underscore, // _
    Comma,      // ,
    LeftParen,  // (
    RightParen, // )

    // End of input
    Eof,
}

impl Token {
    /// Short description for error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Word(word) => format!("'{}'", word),
            Token::Quoted(value) => format!("\"{}\"", value),
            Token::Underscore => "'_'".to_string(),
            Token::Comma => "','".to_string(),
            Token::LeftParen => "'('".to_string(),
            Token::RightParen => "')'".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// A token and the byte offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Lexer state
pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map(|&(i, _)| i).unwrap_or(self.input.len())
    }

    fn advance(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut result = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() {
                result.push(c);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_quoted(&mut self, start: usize) -> Result<String> {
        self.advance(); // Skip opening quote
        let mut result = String::new();
        while let Some(c) = self.advance() {
            if c == '"' {
                return Ok(result);
            }
            result.push(c);
        }
        Err(AriesError::Syntax(format!(
            "unterminated value starting at offset {}",
            start
        )))
    }

    pub fn next_token(&mut self) -> Result<Spanned> {
        self.skip_whitespace();
        let offset = self.offset();

        let c = match self.peek() {
            Some(c) => c,
            None => {
                return Ok(Spanned {
                    token: Token::Eof,
                    offset,
                })
            }
        };

        let token = match c {
            '_' => {
                self.advance();
                Token::Underscore
            }
            ',' => {
                self.advance();
                Token::Comma
            }
            '(' => {
                self.advance();
                Token::LeftParen
            }
            ')' => {
                self.advance();
                Token::RightParen
            }
            '"' => Token::Quoted(self.read_quoted(offset)?),
            c if c.is_ascii_alphanumeric() => Token::Word(self.read_word()),
            other => {
                return Err(AriesError::Syntax(format!(
                    "unexpected character '{}' at offset {}",
                    other, offset
                )))
            }
        };

        Ok(Spanned { token, offset })
    }

    pub fn tokenize(&mut self) -> Result<Vec<Spanned>> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                break;
            }
        }
        Ok(tokens)
    }
}
