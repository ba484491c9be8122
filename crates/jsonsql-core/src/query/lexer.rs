/// Lexer for tokenizing SQL-like queries
///
/// Converts raw query text into a flat stream of tokens for parsing.
use std::fmt;

use thiserror::Error;

/// Operator spellings, longest candidates first so that `<>` wins over `<`.
const OPERATORS: &[&str] = &["<>", ">=", "<=", "!=", "=", ">", "<", "+", "-", "/"];

/// Recognised keywords. Multi-word entries come first so that the longest
/// match wins ("LEFT OUTER JOIN" before "LEFT JOIN", "IS NOT" before "IS").
const KEYWORDS: &[&str] = &[
    "LEFT OUTER JOIN",
    "RIGHT OUTER JOIN",
    "FULL OUTER JOIN",
    "INNER JOIN",
    "LEFT JOIN",
    "RIGHT JOIN",
    "FULL JOIN",
    "CROSS JOIN",
    "NATURAL JOIN",
    "ORDER BY",
    "GROUP BY",
    "IS NOT",
    "SELECT",
    "FROM",
    "WHERE",
    "AND",
    "AS",
    "ON",
    "OR",
    "NOT",
    "IN",
    "LIKE",
    "IS",
    "BETWEEN",
    "NULL",
    "EXISTS",
    "OFFSET",
    "DISTINCT",
    "HAVING",
    "ASC",
    "DESC",
    "JOIN",
    "LIMIT",
    "TRUE",
    "FALSE",
];

/// Kinds of tokens produced by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier, bare or double-quoted
    Name,
    /// Arithmetic or comparison operator
    Operator,
    /// Single-quoted string literal
    String,
    /// Integer literal
    Integer,
    /// Float literal
    Float,
    /// Keyword, normalised to upper case with single spaces
    Keyword,
    /// `*`
    Wildcard,
    /// `,`
    Comma,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
}

/// A token: its kind and its (unescaped) text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// True if this is the given keyword
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == keyword
    }

    /// True if this is the given operator
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::String => write!(f, "'{}'", self.text.replace('\'', "''")),
            _ => write!(f, "{}", self.text),
        }
    }
}

/// Lexer state
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    /// Create a new lexer from input string
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Get the next token, or `None` at end of input
    pub fn next_token(&mut self) -> Result<Option<Token>, LexerError> {
        self.skip_whitespace();

        if self.position >= self.input.len() {
            return Ok(None);
        }

        let ch = self.current_char();

        let token = match ch {
            '*' => {
                self.advance();
                Token::new(TokenKind::Wildcard, "*")
            }
            ',' => {
                self.advance();
                Token::new(TokenKind::Comma, ",")
            }
            '(' => {
                self.advance();
                Token::new(TokenKind::LeftParen, "(")
            }
            ')' => {
                self.advance();
                Token::new(TokenKind::RightParen, ")")
            }
            '\'' => Token::new(TokenKind::String, self.read_quoted('\'')?),
            '"' => Token::new(TokenKind::Name, self.read_quoted('"')?),
            c if c.is_ascii_digit() => self.read_number()?,
            c if c.is_alphabetic() || c == '_' => self.read_keyword_or_name(),
            _ => match self.read_operator() {
                Some(token) => token,
                None => {
                    return Err(LexerError::UnexpectedInput {
                        fragment: self.fragment(),
                        position: self.position,
                    })
                }
            },
        };

        Ok(Some(token))
    }

    /// Tokenize entire input into vector of tokens
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn char_at(&self, position: usize) -> Option<char> {
        self.input.get(position).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.position < self.input.len() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    /// Remaining input from the current position, truncated for messages
    fn fragment(&self) -> String {
        self.input[self.position..].iter().take(24).collect()
    }

    fn read_number(&mut self) -> Result<Token, LexerError> {
        let start = self.position;
        let mut is_float = false;

        while let Some(ch) = self.char_at(self.position) {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.' && !is_float {
                is_float = true;
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.input[start..self.position].iter().collect();

        if is_float {
            text.parse::<f64>()
                .map_err(|_| LexerError::InvalidNumber(text.clone()))?;
            Ok(Token::new(TokenKind::Float, text))
        } else {
            text.parse::<i64>()
                .map_err(|_| LexerError::InvalidNumber(text.clone()))?;
            Ok(Token::new(TokenKind::Integer, text))
        }
    }

    /// Read a quoted string or identifier; a doubled quote is an escaped quote
    fn read_quoted(&mut self, quote: char) -> Result<String, LexerError> {
        let start = self.position;
        self.advance(); // skip opening quote
        let mut value = String::new();

        loop {
            match self.char_at(self.position) {
                None => {
                    let fragment: String = self.input[start..].iter().take(24).collect();
                    return Err(if quote == '\'' {
                        LexerError::UnterminatedString(fragment)
                    } else {
                        LexerError::UnterminatedIdentifier(fragment)
                    });
                }
                Some(c) if c == quote => {
                    if self.char_at(self.position + 1) == Some(quote) {
                        value.push(quote);
                        self.position += 2;
                    } else {
                        self.advance(); // skip closing quote
                        return Ok(value);
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_operator(&mut self) -> Option<Token> {
        let op = OPERATORS.iter().find(|op| {
            op.chars()
                .enumerate()
                .all(|(i, c)| self.char_at(self.position + i) == Some(c))
        })?;
        self.position += op.chars().count();
        Some(Token::new(TokenKind::Operator, *op))
    }

    fn read_keyword_or_name(&mut self) -> Token {
        for keyword in KEYWORDS {
            if let Some(end) = self.match_keyword(keyword) {
                self.position = end;
                return Token::new(TokenKind::Keyword, *keyword);
            }
        }

        let start = self.position;
        while let Some(ch) = self.char_at(self.position) {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.input[start..self.position].iter().collect();
        Token::new(TokenKind::Name, text)
    }

    /// Try to match `keyword` at the current position without consuming.
    /// Words may be separated by any whitespace run and the match must end
    /// on a word boundary. Returns the end position on success.
    fn match_keyword(&self, keyword: &str) -> Option<usize> {
        let mut pos = self.position;

        for (i, word) in keyword.split(' ').enumerate() {
            if i > 0 {
                let before = pos;
                while self.char_at(pos).is_some_and(char::is_whitespace) {
                    pos += 1;
                }
                if pos == before {
                    return None;
                }
            }
            for expected in word.chars() {
                match self.char_at(pos) {
                    Some(c) if c.eq_ignore_ascii_case(&expected) => pos += 1,
                    _ => return None,
                }
            }
        }

        match self.char_at(pos) {
            Some(c) if c.is_alphanumeric() || c == '_' => None,
            _ => Some(pos),
        }
    }
}

/// Lexer errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexerError {
    #[error("Unrecognized input at position {position}: '{fragment}'")]
    UnexpectedInput { fragment: String, position: usize },
    #[error("Invalid number: '{0}'")]
    InvalidNumber(String),
    #[error("Unterminated string literal: {0}")]
    UnterminatedString(String),
    #[error("Unterminated quoted identifier: {0}")]
    UnterminatedIdentifier(String),
}

/// True if `word` is, or begins, a keyword and so cannot be written as a
/// bare name (case-insensitive)
pub fn is_reserved_word(word: &str) -> bool {
    KEYWORDS
        .iter()
        .flat_map(|keyword| keyword.split(' '))
        .any(|part| part.eq_ignore_ascii_case(word))
}

/// Tokenize query text.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexerError> {
    Lexer::new(input).tokenize()
}
