/// Parser for SQL-like queries
///
/// Recursive descent over the token stream, one rule per clause. A clause
/// rule that does not see its introducing keyword returns `None` without
/// consuming anything, so the caller moves on to the next clause.
use super::ast::*;
use super::lexer::{Lexer, Token, TokenKind};
use thiserror::Error;

/// Parser for SQL-like queries
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Tokenize `input` and create a parser over the tokens
    pub fn new(input: &str) -> crate::Result<Self> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self::from_tokens(tokens))
    }

    /// Create a parser over an existing token stream
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parse exactly one SELECT statement; leftover tokens are an error
    pub fn parse(&mut self) -> Result<Select, ParseError> {
        let select = self.parse_select()?;

        if let Some(token) = self.current_token() {
            return Err(ParseError::TrailingTokens {
                found: token.clone(),
            });
        }

        Ok(select)
    }

    fn parse_select(&mut self) -> Result<Select, ParseError> {
        self.expect_keyword("SELECT")?;

        let fields = self.parse_fields()?;
        let from = self.parse_from()?;
        let where_clause = self.parse_where()?;
        let group_by = self.parse_group_by()?;
        let order_by = self.parse_order_by()?;
        let limit = self.parse_limit()?;

        Ok(Select {
            fields,
            from,
            where_clause,
            group_by,
            order_by,
            limit,
        })
    }

    fn parse_fields(&mut self) -> Result<Vec<SelectField>, ParseError> {
        let mut fields = Vec::new();

        loop {
            if self.check_kind(TokenKind::Wildcard) {
                self.advance();
                fields.push(SelectField {
                    expression: Expression::Wildcard,
                    alias: None,
                });
            } else {
                let expression = self.parse_expression()?;
                let alias = if self.check_keyword("AS") {
                    self.advance();
                    Some(self.expect_name("alias")?)
                } else {
                    None
                };
                fields.push(SelectField { expression, alias });
            }

            if self.check_kind(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        Ok(fields)
    }

    fn parse_from(&mut self) -> Result<Option<FromClause>, ParseError> {
        if !self.check_keyword("FROM") {
            return Ok(None);
        }
        self.advance();

        let table = self.expect_name("table name")?;
        let mut joins = Vec::new();

        while let Some(kind) = self.current_token().and_then(join_kind) {
            self.advance();
            let join_table = self.expect_name("table name")?;

            let on = if self.check_keyword("ON") {
                self.advance();
                self.parse_expression()?
            } else if matches!(kind, JoinKind::Cross | JoinKind::Natural) {
                Expression::Literal(Literal::Boolean(true))
            } else {
                return Err(self.unexpected("ON"));
            };

            joins.push(Join {
                kind,
                table: join_table,
                on,
            });
        }

        Ok(Some(FromClause { table, joins }))
    }

    fn parse_where(&mut self) -> Result<Option<WhereClause>, ParseError> {
        if !self.check_keyword("WHERE") {
            return Ok(None);
        }
        self.advance();

        let condition = self.parse_expression()?;
        Ok(Some(WhereClause { condition }))
    }

    fn parse_group_by(&mut self) -> Result<Option<GroupByClause>, ParseError> {
        if !self.check_keyword("GROUP BY") {
            return Ok(None);
        }
        self.advance();

        let mut fields = vec![self.parse_expression()?];
        while self.check_kind(TokenKind::Comma) {
            self.advance();
            fields.push(self.parse_expression()?);
        }

        Ok(Some(GroupByClause { fields }))
    }

    fn parse_order_by(&mut self) -> Result<Option<OrderByClause>, ParseError> {
        if !self.check_keyword("ORDER BY") {
            return Ok(None);
        }
        self.advance();

        let mut fields = Vec::new();

        loop {
            let expression = self.parse_expression()?;

            let direction = if self.check_keyword("DESC") {
                self.advance();
                OrderDirection::Desc
            } else {
                if self.check_keyword("ASC") {
                    self.advance();
                }
                OrderDirection::Asc
            };

            fields.push(OrderByField {
                expression,
                direction,
            });

            if self.check_kind(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        Ok(Some(OrderByClause { fields }))
    }

    fn parse_limit(&mut self) -> Result<Option<LimitClause>, ParseError> {
        if !self.check_keyword("LIMIT") {
            return Ok(None);
        }
        self.advance();

        let limit = self.expect_count("LIMIT value")?;

        let offset = if self.check_keyword("OFFSET") {
            self.advance();
            self.expect_count("OFFSET value")?
        } else {
            0
        };

        Ok(Some(LimitClause { limit, offset }))
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_and()?;

        while self.check_keyword("OR") {
            self.advance();
            let right = self.parse_logical_and()?;
            left = Expression::Logical {
                left: Box::new(left),
                op: LogicalOperator::Or,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_not()?;

        while self.check_keyword("AND") {
            self.advance();
            let right = self.parse_not()?;
            left = Expression::Logical {
                left: Box::new(left),
                op: LogicalOperator::And,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression, ParseError> {
        if self.check_keyword("NOT") {
            self.advance();
            let expr = self.parse_not()?;
            return Ok(Expression::Not(Box::new(expr)));
        }

        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;

        while let Some(op) = self.current_token().and_then(comparison_operator) {
            self.advance();
            let right = self.parse_additive()?;
            left = Expression::Comparison {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Some(t) if t.is_operator("+") => ArithmeticOperator::Add,
                Some(t) if t.is_operator("-") => ArithmeticOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::Arithmetic {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Some(t) if t.kind == TokenKind::Wildcard => ArithmeticOperator::Multiply,
                Some(t) if t.is_operator("/") => ArithmeticOperator::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Arithmetic {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        match self.current_token() {
            Some(t) if t.is_operator("-") => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(match operand {
                    Expression::Literal(Literal::Integer(i)) => {
                        Expression::Literal(Literal::Integer(-i))
                    }
                    Expression::Literal(Literal::Float(f)) => {
                        Expression::Literal(Literal::Float(-f))
                    }
                    other => Expression::Arithmetic {
                        left: Box::new(Expression::Literal(Literal::Integer(0))),
                        op: ArithmeticOperator::Subtract,
                        right: Box::new(other),
                    },
                })
            }
            Some(t) if t.is_operator("+") => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let token = match self.current_token() {
            Some(token) => token.clone(),
            None => {
                return Err(ParseError::UnexpectedEnd {
                    expected: "expression".to_string(),
                })
            }
        };

        match token.kind {
            TokenKind::Integer => {
                self.advance();
                token
                    .text
                    .parse::<i64>()
                    .map(|i| Expression::Literal(Literal::Integer(i)))
                    .map_err(|_| ParseError::InvalidNumber(token.text.clone()))
            }
            TokenKind::Float => {
                self.advance();
                token
                    .text
                    .parse::<f64>()
                    .map(|f| Expression::Literal(Literal::Float(f)))
                    .map_err(|_| ParseError::InvalidNumber(token.text.clone()))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expression::Literal(Literal::String(token.text)))
            }
            TokenKind::Keyword if token.text == "TRUE" => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            TokenKind::Keyword if token.text == "FALSE" => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            TokenKind::Keyword if token.text == "NULL" => {
                self.advance();
                Ok(Expression::Literal(Literal::Null))
            }
            TokenKind::Name => {
                self.advance();
                if self.check_kind(TokenKind::LeftParen) {
                    self.advance();
                    let args = self.parse_arguments()?;
                    Ok(Expression::Function {
                        name: token.text,
                        args,
                    })
                } else {
                    Ok(Expression::Name(token.text))
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_kind(TokenKind::RightParen, ")")?;
                Ok(expr)
            }
            _ => Err(ParseError::UnexpectedToken {
                expected: "expression".to_string(),
                found: token,
            }),
        }
    }

    /// Arguments after the opening parenthesis, through the closing one
    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut args = Vec::new();

        if self.check_kind(TokenKind::RightParen) {
            self.advance();
            return Ok(args);
        }

        loop {
            let standalone_wildcard = self.check_kind(TokenKind::Wildcard)
                && matches!(
                    self.token_at(self.position + 1).map(|t| t.kind),
                    Some(TokenKind::Comma) | Some(TokenKind::RightParen)
                );

            if standalone_wildcard {
                self.advance();
                args.push(Expression::Wildcard);
            } else {
                args.push(self.parse_expression()?);
            }

            if self.check_kind(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect_kind(TokenKind::RightParen, ")")?;
        Ok(args)
    }

    fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn token_at(&self, position: usize) -> Option<&Token> {
        self.tokens.get(position)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        self.current_token().is_some_and(|t| t.is_keyword(keyword))
    }

    fn check_kind(&self, kind: TokenKind) -> bool {
        self.current_token().is_some_and(|t| t.kind == kind)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current_token() {
            Some(token) => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.clone(),
            },
            None => ParseError::UnexpectedEnd {
                expected: expected.to_string(),
            },
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(keyword))
        }
    }

    fn expect_kind(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ParseError> {
        match self.current_token() {
            Some(token) if token.kind == kind => {
                let token = token.clone();
                self.advance();
                Ok(token)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn expect_name(&mut self, expected: &str) -> Result<String, ParseError> {
        self.expect_kind(TokenKind::Name, expected)
            .map(|token| token.text)
    }

    fn expect_count(&mut self, expected: &str) -> Result<usize, ParseError> {
        let token = self.expect_kind(TokenKind::Integer, expected)?;
        token
            .text
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidNumber(token.text))
    }
}

fn join_kind(token: &Token) -> Option<JoinKind> {
    if token.kind != TokenKind::Keyword {
        return None;
    }
    match token.text.as_str() {
        "JOIN" | "INNER JOIN" => Some(JoinKind::Inner),
        "LEFT JOIN" | "LEFT OUTER JOIN" => Some(JoinKind::Left),
        "RIGHT JOIN" | "RIGHT OUTER JOIN" => Some(JoinKind::Right),
        "FULL JOIN" | "FULL OUTER JOIN" => Some(JoinKind::Full),
        "CROSS JOIN" => Some(JoinKind::Cross),
        "NATURAL JOIN" => Some(JoinKind::Natural),
        _ => None,
    }
}

fn comparison_operator(token: &Token) -> Option<ComparisonOperator> {
    if token.kind != TokenKind::Operator {
        return None;
    }
    match token.text.as_str() {
        "=" => Some(ComparisonOperator::Eq),
        "<>" | "!=" => Some(ComparisonOperator::Ne),
        ">" => Some(ComparisonOperator::Gt),
        ">=" => Some(ComparisonOperator::Ge),
        "<" => Some(ComparisonOperator::Lt),
        "<=" => Some(ComparisonOperator::Le),
        _ => None,
    }
}

/// Parse query text into a SELECT statement
pub fn parse(input: &str) -> crate::Result<Select> {
    let mut parser = Parser::new(input)?;
    Ok(parser.parse()?)
}

/// Parser errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: Token },
    #[error("Expected {expected}, found end of input")]
    UnexpectedEnd { expected: String },
    #[error("Unexpected tokens after statement, starting at {found}")]
    TrailingTokens { found: Token },
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}
