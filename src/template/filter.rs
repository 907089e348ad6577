//! Constrained filter-clause grammar for `$F{}` placeholders.
//!
//! The reference behavior spliced the `condition` parameter into the query as
//! raw text, which admits arbitrary SQL. Here a filter value must parse under
//! this grammar before it reaches a query, and the SQL that is spliced is
//! re-rendered from the validated AST — the caller's text itself never
//! appears in the statement.
//!
//! ```text
//! clause      := disjunction [ order_by ]
//! disjunction := conjunction { OR conjunction }
//! conjunction := predicate { AND predicate }
//! predicate   := column op literal | '(' disjunction ')'
//! column      := IDENT { '.' IDENT }
//! op          := '=' | '!=' | '<>' | '<' | '<=' | '>' | '>=' | LIKE
//! literal     := 'string' | number
//! order_by    := ORDER BY column [ASC|DESC] { ',' column [ASC|DESC] }
//! ```
//!
//! Everything else — semicolons, comments, subqueries, function calls — is a
//! parse error.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FilterParseError(String);

impl FilterParseError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl CmpOp {
    fn as_sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    /// Unescaped text; single quotes are re-doubled at render time.
    Text(String),
    /// Kept as the scanned digit string and rendered verbatim.
    Number(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Number(n) => f.write_str(n),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Cmp {
        column: String,
        op: CmpOp,
        value: Literal,
    },
    All(Vec<Expr>),
    Any(Vec<Expr>),
}

impl Expr {
    fn render(&self, out: &mut String) {
        match self {
            Expr::Cmp { column, op, value } => {
                out.push_str(column);
                out.push(' ');
                out.push_str(op.as_sql());
                out.push(' ');
                out.push_str(&value.to_string());
            }
            Expr::All(children) => render_joined(children, " AND ", out),
            Expr::Any(children) => render_joined(children, " OR ", out),
        }
    }
}

fn render_joined(children: &[Expr], sep: &str, out: &mut String) {
    for (idx, child) in children.iter().enumerate() {
        if idx > 0 {
            out.push_str(sep);
        }
        match child {
            Expr::Cmp { .. } => child.render(out),
            _ => {
                out.push('(');
                child.render(out);
                out.push(')');
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct OrderKey {
    column: String,
    descending: bool,
}

/// A validated filter expression with an optional ORDER BY tail.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    expr: Expr,
    order: Vec<OrderKey>,
}

impl FilterClause {
    /// Parse `input` under the filter grammar.
    pub fn parse(input: &str) -> Result<Self, FilterParseError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.disjunction()?;
        let order = parser.order_by()?;
        if let Some(tok) = parser.peek() {
            return Err(FilterParseError::new(format!(
                "unexpected trailing input near `{tok}`"
            )));
        }
        Ok(Self { expr, order })
    }

    /// Render the clause back to SQL. The predicate part is parenthesized so
    /// the result can follow an `AND` in the host query.
    pub fn to_sql(&self) -> String {
        let mut out = String::from("(");
        self.expr.render(&mut out);
        out.push(')');
        if !self.order.is_empty() {
            out.push_str(" ORDER BY ");
            for (idx, key) in self.order.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                out.push_str(&key.column);
                if key.descending {
                    out.push_str(" DESC");
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(String),
    Op(CmpOp),
    LParen,
    RParen,
    Comma,
    Dot,
    And,
    Or,
    Order,
    By,
    Asc,
    Desc,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => f.write_str(s),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Num(s) => f.write_str(s),
            Token::Op(op) => f.write_str(op.as_sql()),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Dot => f.write_str("."),
            Token::And => f.write_str("AND"),
            Token::Or => f.write_str("OR"),
            Token::Order => f.write_str("ORDER"),
            Token::By => f.write_str("BY"),
            Token::Asc => f.write_str("ASC"),
            Token::Desc => f.write_str("DESC"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, FilterParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match word.to_ascii_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "ORDER" => Token::Order,
                    "BY" => Token::By,
                    "ASC" => Token::Asc,
                    "DESC" => Token::Desc,
                    "LIKE" => Token::Op(CmpOp::Like),
                    _ => Token::Ident(word),
                });
            }
            c if c.is_ascii_digit() => {
                let mut num = String::new();
                let mut seen_dot = false;
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        num.push(c);
                        chars.next();
                    } else if c == '.' && !seen_dot {
                        seen_dot = true;
                        num.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if num.ends_with('.') {
                    return Err(FilterParseError::new(format!("malformed number `{num}`")));
                }
                tokens.push(Token::Num(num));
            }
            '\'' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('\'') => {
                            // doubled quote is an escaped quote
                            if chars.peek() == Some(&'\'') {
                                chars.next();
                                text.push('\'');
                            } else {
                                break;
                            }
                        }
                        Some(c) => text.push(c),
                        None => {
                            return Err(FilterParseError::new("unterminated string literal"));
                        }
                    }
                }
                tokens.push(Token::Str(text));
            }
            '=' => {
                chars.next();
                tokens.push(Token::Op(CmpOp::Eq));
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(CmpOp::Ne));
                } else {
                    return Err(FilterParseError::new("unexpected character `!`"));
                }
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Op(CmpOp::Le));
                    }
                    Some('>') => {
                        chars.next();
                        tokens.push(Token::Op(CmpOp::Ne));
                    }
                    _ => tokens.push(Token::Op(CmpOp::Lt)),
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(CmpOp::Ge));
                } else {
                    tokens.push(Token::Op(CmpOp::Gt));
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            other => {
                return Err(FilterParseError::new(format!(
                    "unexpected character `{other}`"
                )));
            }
        }
    }

    if tokens.is_empty() {
        return Err(FilterParseError::new("empty filter expression"));
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn disjunction(&mut self) -> Result<Expr, FilterParseError> {
        let mut terms = vec![self.conjunction()?];
        while self.eat(&Token::Or) {
            terms.push(self.conjunction()?);
        }
        Ok(if terms.len() == 1 {
            terms.pop().unwrap()
        } else {
            Expr::Any(terms)
        })
    }

    fn conjunction(&mut self) -> Result<Expr, FilterParseError> {
        let mut terms = vec![self.predicate()?];
        while self.eat(&Token::And) {
            terms.push(self.predicate()?);
        }
        Ok(if terms.len() == 1 {
            terms.pop().unwrap()
        } else {
            Expr::All(terms)
        })
    }

    fn predicate(&mut self) -> Result<Expr, FilterParseError> {
        if self.eat(&Token::LParen) {
            let inner = self.disjunction()?;
            if !self.eat(&Token::RParen) {
                return Err(FilterParseError::new("expected `)`"));
            }
            return Ok(inner);
        }

        let column = self.column()?;
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            Some(other) => {
                return Err(FilterParseError::new(format!(
                    "expected comparison operator after `{column}`, found `{other}`"
                )));
            }
            None => {
                return Err(FilterParseError::new(format!(
                    "expected comparison operator after `{column}`"
                )));
            }
        };
        let value = match self.next() {
            Some(Token::Str(s)) => Literal::Text(s),
            Some(Token::Num(n)) => Literal::Number(n),
            Some(other) => {
                return Err(FilterParseError::new(format!(
                    "expected literal, found `{other}`"
                )));
            }
            None => return Err(FilterParseError::new("expected literal")),
        };
        if op == CmpOp::Like && !matches!(value, Literal::Text(_)) {
            return Err(FilterParseError::new("LIKE requires a string literal"));
        }
        Ok(Expr::Cmp { column, op, value })
    }

    fn column(&mut self) -> Result<String, FilterParseError> {
        let mut name = match self.next() {
            Some(Token::Ident(name)) => name,
            Some(other) => {
                return Err(FilterParseError::new(format!(
                    "expected column name, found `{other}`"
                )));
            }
            None => return Err(FilterParseError::new("expected column name")),
        };
        while self.eat(&Token::Dot) {
            match self.next() {
                Some(Token::Ident(part)) => {
                    name.push('.');
                    name.push_str(&part);
                }
                _ => return Err(FilterParseError::new("expected identifier after `.`")),
            }
        }
        Ok(name)
    }

    fn order_by(&mut self) -> Result<Vec<OrderKey>, FilterParseError> {
        if !self.eat(&Token::Order) {
            return Ok(Vec::new());
        }
        if !self.eat(&Token::By) {
            return Err(FilterParseError::new("expected BY after ORDER"));
        }
        let mut keys = Vec::new();
        loop {
            let column = self.column()?;
            let descending = if self.eat(&Token::Desc) {
                true
            } else {
                self.eat(&Token::Asc);
                false
            };
            keys.push(OrderKey { column, descending });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_reference_condition() {
        let clause = FilterClause::parse("LAST_NAME = 'Smith' ORDER BY FIRST_NAME")
            .expect("reference condition must parse");
        assert_eq!(
            clause.to_sql(),
            "(LAST_NAME = 'Smith') ORDER BY FIRST_NAME"
        );
    }

    #[test]
    fn parses_conjunctions_and_disjunctions() {
        let clause =
            FilterClause::parse("SALARY >= 100000 AND (LAST_NAME = 'Smith' OR LAST_NAME = 'Doe')")
                .expect("boolean combination must parse");
        assert_eq!(
            clause.to_sql(),
            "(SALARY >= 100000 AND (LAST_NAME = 'Smith' OR LAST_NAME = 'Doe'))"
        );
    }

    #[test]
    fn parses_qualified_columns_and_desc_keys() {
        let clause = FilterClause::parse("E.SALARY > 0 ORDER BY E.LAST_NAME DESC, E.ID ASC")
            .expect("qualified columns must parse");
        assert_eq!(
            clause.to_sql(),
            "(E.SALARY > 0) ORDER BY E.LAST_NAME DESC, E.ID"
        );
    }

    #[test]
    fn escapes_embedded_quotes_on_render() {
        let clause = FilterClause::parse("LAST_NAME = 'O''Brien'").expect("escaped quote parses");
        assert_eq!(clause.to_sql(), "(LAST_NAME = 'O''Brien')");
    }

    #[test]
    fn rejects_statement_injection() {
        let err = FilterClause::parse("LAST_NAME = 'Smith';DROP TABLE EMPLOYEE--")
            .expect_err("semicolon must be rejected");
        assert!(err.to_string().contains(";"), "error names the bad char: {err}");
    }

    #[test]
    fn rejects_comments_and_subqueries() {
        assert!(FilterClause::parse("LAST_NAME = 'Smith' -- comment").is_err());
        assert!(FilterClause::parse("ID IN (SELECT ID FROM EMAIL)").is_err());
        assert!(FilterClause::parse("1 = 1").is_err(), "left side must be a column");
    }

    #[test]
    fn rejects_empty_and_trailing_input() {
        assert!(FilterClause::parse("").is_err());
        assert!(FilterClause::parse("   ").is_err());
        assert!(FilterClause::parse("LAST_NAME = 'Smith' EXTRA").is_err());
        assert!(FilterClause::parse("LAST_NAME = 'Smith' ORDER BY").is_err());
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = FilterClause::parse("LAST_NAME = 'Smi").expect_err("must fail");
        assert_eq!(err.to_string(), "unterminated string literal");
    }

    #[test]
    fn like_requires_string_literal() {
        assert!(FilterClause::parse("LAST_NAME LIKE 'S%'").is_ok());
        assert!(FilterClause::parse("LAST_NAME LIKE 5").is_err());
    }
}
