//! Template expression sub-language.
//!
//! A small recursive-descent parser and interpreter over decimal values.
//! Permitted: literal numbers, event-field references, arithmetic
//! `+ - * / ( )`, the built-ins `round(x, n)`, `abs(x)`, `min(a, b)`,
//! `max(a, b)`, the conditional `if(cond, a, b)`, comparisons
//! `= != < <= > >=`, and boolean `and` / `or`. Everything else (free
//! function invocation, attribute access, I/O) is rejected at parse time.
//! Evaluation runs over a read-only environment of event fields.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Expression parse or evaluation failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExprError {
    /// Lexical or syntactic error.
    #[error("Parse error at column {column}: {message}")]
    Parse {
        /// 1-based column of the failure.
        column: usize,
        /// What went wrong.
        message: String,
    },

    /// Identifier did not resolve to an event field.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Only the whitelisted built-ins may be called.
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Built-in called with the wrong number of arguments.
    #[error("{function} expects {expected} arguments, got {got}")]
    WrongArity {
        /// Function name.
        function: &'static str,
        /// Expected argument count.
        expected: usize,
        /// Actual argument count.
        got: usize,
    },

    /// Division by zero during evaluation.
    #[error("Division by zero")]
    DivisionByZero,
}

/// Whitelisted built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Builtin {
    Round,
    Abs,
    Min,
    Max,
    If,
}

impl Builtin {
    fn resolve(name: &str) -> Option<Self> {
        match name {
            "round" => Some(Self::Round),
            "abs" => Some(Self::Abs),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "if" => Some(Self::If),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Round => "round",
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::If => "if",
        }
    }

    fn arity(self) -> usize {
        match self {
            Self::Abs => 1,
            Self::Round | Self::Min | Self::Max => 2,
            Self::If => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(Decimal),
    Field(String),
    Neg(Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Call(Builtin, Vec<Node>),
}

/// A parsed, reusable expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    root: Node,
}

impl Expr {
    /// Parses an expression.
    ///
    /// # Errors
    ///
    /// Returns `ExprError::Parse` for malformed input and
    /// `ExprError::UnknownFunction` for calls outside the whitelist.
    pub fn parse(input: &str) -> Result<Self, ExprError> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Parser {
            tokens,
            position: 0,
        };
        let root = parser.parse_or()?;
        parser.expect_end()?;
        Ok(Self { root })
    }

    /// Evaluates against a read-only field environment.
    ///
    /// Comparisons and booleans yield `1` or `0`.
    ///
    /// # Errors
    ///
    /// Returns `ExprError::UnknownField` for unresolved identifiers and
    /// `ExprError::DivisionByZero` when a divisor evaluates to zero.
    pub fn eval(&self, env: &BTreeMap<String, Decimal>) -> Result<Decimal, ExprError> {
        eval_node(&self.root, env)
    }

    /// The field names the expression references.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_fields(&self.root, &mut out);
        out.sort();
        out.dedup();
        out
    }
}

fn collect_fields(node: &Node, out: &mut Vec<String>) {
    match node {
        Node::Field(name) => out.push(name.clone()),
        Node::Neg(inner) => collect_fields(inner, out),
        Node::Binary(_, lhs, rhs) => {
            collect_fields(lhs, out);
            collect_fields(rhs, out);
        }
        Node::Call(_, args) => {
            for arg in args {
                collect_fields(arg, out);
            }
        }
        Node::Number(_) => {}
    }
}

fn eval_node(node: &Node, env: &BTreeMap<String, Decimal>) -> Result<Decimal, ExprError> {
    match node {
        Node::Number(value) => Ok(*value),
        Node::Field(name) => env
            .get(name)
            .copied()
            .ok_or_else(|| ExprError::UnknownField(name.clone())),
        Node::Neg(inner) => Ok(-eval_node(inner, env)?),
        Node::Binary(op, lhs, rhs) => {
            let l = eval_node(lhs, env)?;
            let r = eval_node(rhs, env)?;
            let bool_dec = |b: bool| if b { Decimal::ONE } else { Decimal::ZERO };
            match op {
                BinaryOp::Add => Ok(l + r),
                BinaryOp::Sub => Ok(l - r),
                BinaryOp::Mul => Ok(l * r),
                BinaryOp::Div => {
                    if r.is_zero() {
                        Err(ExprError::DivisionByZero)
                    } else {
                        Ok(l / r)
                    }
                }
                BinaryOp::Eq => Ok(bool_dec(l == r)),
                BinaryOp::Ne => Ok(bool_dec(l != r)),
                BinaryOp::Lt => Ok(bool_dec(l < r)),
                BinaryOp::Le => Ok(bool_dec(l <= r)),
                BinaryOp::Gt => Ok(bool_dec(l > r)),
                BinaryOp::Ge => Ok(bool_dec(l >= r)),
                BinaryOp::And => Ok(bool_dec(!l.is_zero() && !r.is_zero())),
                BinaryOp::Or => Ok(bool_dec(!l.is_zero() || !r.is_zero())),
            }
        }
        Node::Call(builtin, args) => {
            match builtin {
                Builtin::Abs => Ok(eval_node(&args[0], env)?.abs()),
                Builtin::Round => {
                    let value = eval_node(&args[0], env)?;
                    let places = eval_node(&args[1], env)?;
                    let places = places.trunc().to_u32().unwrap_or(0).min(28);
                    Ok(value
                        .round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero))
                }
                Builtin::Min => {
                    let a = eval_node(&args[0], env)?;
                    let b = eval_node(&args[1], env)?;
                    Ok(a.min(b))
                }
                Builtin::Max => {
                    let a = eval_node(&args[0], env)?;
                    let b = eval_node(&args[1], env)?;
                    Ok(a.max(b))
                }
                Builtin::If => {
                    let cond = eval_node(&args[0], env)?;
                    if cond.is_zero() {
                        eval_node(&args[2], env)
                    } else {
                        eval_node(&args[1], env)
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Decimal),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    LeftParen,
    RightParen,
    Comma,
}

struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.chars().peekable(),
            column: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> ExprError {
        ExprError::Parse {
            column: self.column.max(1),
            message: message.into(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        self.column += 1;
        self.input.next()
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, ExprError> {
        let mut tokens = Vec::new();
        while let Some(&ch) = self.input.peek() {
            let column = self.column + 1;
            match ch {
                ' ' | '\t' | '\n' | '\r' => {
                    self.bump();
                }
                '0'..='9' | '.' => {
                    let mut literal = String::new();
                    while let Some(&c) = self.input.peek() {
                        if c.is_ascii_digit() || c == '.' {
                            literal.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    let value: Decimal = literal
                        .parse()
                        .map_err(|_| self.error(format!("invalid number: {literal}")))?;
                    tokens.push((Token::Number(value), column));
                }
                'a'..='z' | 'A'..='Z' | '_' => {
                    let mut ident = String::new();
                    while let Some(&c) = self.input.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            ident.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    let token = match ident.as_str() {
                        "and" => Token::And,
                        "or" => Token::Or,
                        _ => Token::Ident(ident),
                    };
                    tokens.push((token, column));
                }
                '+' => {
                    self.bump();
                    tokens.push((Token::Plus, column));
                }
                '-' => {
                    self.bump();
                    tokens.push((Token::Minus, column));
                }
                '*' | '×' => {
                    self.bump();
                    tokens.push((Token::Star, column));
                }
                '/' | '÷' => {
                    self.bump();
                    tokens.push((Token::Slash, column));
                }
                '(' => {
                    self.bump();
                    tokens.push((Token::LeftParen, column));
                }
                ')' => {
                    self.bump();
                    tokens.push((Token::RightParen, column));
                }
                ',' => {
                    self.bump();
                    tokens.push((Token::Comma, column));
                }
                '=' => {
                    self.bump();
                    // Both `=` and `==` compare.
                    if self.input.peek() == Some(&'=') {
                        self.bump();
                    }
                    tokens.push((Token::Eq, column));
                }
                '≠' => {
                    self.bump();
                    tokens.push((Token::Ne, column));
                }
                '≤' => {
                    self.bump();
                    tokens.push((Token::Le, column));
                }
                '≥' => {
                    self.bump();
                    tokens.push((Token::Ge, column));
                }
                '!' => {
                    self.bump();
                    if self.bump() == Some('=') {
                        tokens.push((Token::Ne, column));
                    } else {
                        return Err(self.error("expected '=' after '!'"));
                    }
                }
                '<' => {
                    self.bump();
                    if self.input.peek() == Some(&'=') {
                        self.bump();
                        tokens.push((Token::Le, column));
                    } else {
                        tokens.push((Token::Lt, column));
                    }
                }
                '>' => {
                    self.bump();
                    if self.input.peek() == Some(&'=') {
                        self.bump();
                        tokens.push((Token::Ge, column));
                    } else {
                        tokens.push((Token::Gt, column));
                    }
                }
                other => return Err(self.error(format!("unexpected character: {other}"))),
            }
        }
        Ok(tokens)
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(t, _)| t)
    }

    fn column(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map_or(1, |(_, c)| *c)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).map(|(t, _)| t.clone());
        self.position += 1;
        token
    }

    fn error(&self, message: impl Into<String>) -> ExprError {
        ExprError::Parse {
            column: self.column(),
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ExprError> {
        if self.peek() == Some(expected) {
            self.position += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expect_end(&self) -> Result<(), ExprError> {
        if self.position == self.tokens.len() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }

    fn parse_or(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.bump();
            let rhs = self.parse_and()?;
            node = Node::Binary(BinaryOp::Or, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_comparison()?;
        while self.peek() == Some(&Token::And) {
            self.bump();
            let rhs = self.parse_comparison()?;
            node = Node::Binary(BinaryOp::And, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_comparison(&mut self) -> Result<Node, ExprError> {
        let node = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(BinaryOp::Eq),
            Some(Token::Ne) => Some(BinaryOp::Ne),
            Some(Token::Lt) => Some(BinaryOp::Lt),
            Some(Token::Le) => Some(BinaryOp::Le),
            Some(Token::Gt) => Some(BinaryOp::Gt),
            Some(Token::Ge) => Some(BinaryOp::Ge),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let rhs = self.parse_additive()?;
            Ok(Node::Binary(op, Box::new(node), Box::new(rhs)))
        } else {
            Ok(node)
        }
    }

    fn parse_additive(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_multiplicative()?;
            node = Node::Binary(op, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_multiplicative(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            node = Node::Binary(op, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Node, ExprError> {
        if self.peek() == Some(&Token::Minus) {
            self.bump();
            let inner = self.parse_unary()?;
            Ok(Node::Neg(Box::new(inner)))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Node, ExprError> {
        match self.bump() {
            Some(Token::Number(value)) => Ok(Node::Number(value)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LeftParen) {
                    let builtin = Builtin::resolve(&name)
                        .ok_or_else(|| ExprError::UnknownFunction(name.clone()))?;
                    self.bump();
                    let mut args = Vec::new();
                    if self.peek() != Some(&Token::RightParen) {
                        loop {
                            args.push(self.parse_or()?);
                            if self.peek() == Some(&Token::Comma) {
                                self.bump();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RightParen, "')'")?;
                    if args.len() != builtin.arity() {
                        return Err(ExprError::WrongArity {
                            function: builtin.name(),
                            expected: builtin.arity(),
                            got: args.len(),
                        });
                    }
                    Ok(Node::Call(builtin, args))
                } else {
                    Ok(Node::Field(name))
                }
            }
            Some(Token::LeftParen) => {
                let node = self.parse_or()?;
                self.expect(&Token::RightParen, "')'")?;
                Ok(node)
            }
            _ => Err(self.error("expected a number, field, or '('")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn env(pairs: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect()
    }

    #[test]
    fn test_arithmetic_precedence() {
        let expr = Expr::parse("1 + 2 * 3").unwrap();
        assert_eq!(expr.eval(&env(&[])).unwrap(), dec!(7));

        let expr = Expr::parse("(1 + 2) * 3").unwrap();
        assert_eq!(expr.eval(&env(&[])).unwrap(), dec!(9));
    }

    #[test]
    fn test_field_reference() {
        let expr = Expr::parse("amount * rate").unwrap();
        let result = expr
            .eval(&env(&[("amount", dec!(1000)), ("rate", dec!(0.13))]))
            .unwrap();
        assert_eq!(result, dec!(130.00));
        assert_eq!(expr.fields(), vec!["amount".to_string(), "rate".to_string()]);
    }

    #[test]
    fn test_unknown_field() {
        let expr = Expr::parse("missing + 1").unwrap();
        assert_eq!(
            expr.eval(&env(&[])),
            Err(ExprError::UnknownField("missing".into()))
        );
    }

    #[test]
    fn test_round_and_abs() {
        let expr = Expr::parse("round(amount / 3, 2)").unwrap();
        assert_eq!(
            expr.eval(&env(&[("amount", dec!(100))])).unwrap(),
            dec!(33.33)
        );

        let expr = Expr::parse("abs(0 - 5)").unwrap();
        assert_eq!(expr.eval(&env(&[])).unwrap(), dec!(5));
    }

    #[test]
    fn test_min_max() {
        let expr = Expr::parse("max(ebt, 0) * rate").unwrap();
        assert_eq!(
            expr.eval(&env(&[("ebt", dec!(-100)), ("rate", dec!(0.25))]))
                .unwrap(),
            dec!(0)
        );
        let expr = Expr::parse("min(a, b)").unwrap();
        assert_eq!(
            expr.eval(&env(&[("a", dec!(3)), ("b", dec!(7))])).unwrap(),
            dec!(3)
        );
    }

    #[test]
    fn test_conditional() {
        let expr = Expr::parse("if(amount > 1000, amount * 0.1, 0)").unwrap();
        assert_eq!(
            expr.eval(&env(&[("amount", dec!(2000))])).unwrap(),
            dec!(200.0)
        );
        assert_eq!(expr.eval(&env(&[("amount", dec!(500))])).unwrap(), dec!(0));
    }

    #[test]
    fn test_boolean_connectives() {
        let expr = Expr::parse("if(a > 0 and b > 0, 1, 2)").unwrap();
        assert_eq!(
            expr.eval(&env(&[("a", dec!(1)), ("b", dec!(1))])).unwrap(),
            dec!(1)
        );
        assert_eq!(
            expr.eval(&env(&[("a", dec!(1)), ("b", dec!(0))])).unwrap(),
            dec!(2)
        );

        let expr = Expr::parse("if(a != 0 or b != 0, 1, 2)").unwrap();
        assert_eq!(
            expr.eval(&env(&[("a", dec!(0)), ("b", dec!(5))])).unwrap(),
            dec!(1)
        );
    }

    #[test]
    fn test_unicode_operators() {
        let expr = Expr::parse("if(a ≥ 10, a × 2, a ÷ 2)").unwrap();
        assert_eq!(expr.eval(&env(&[("a", dec!(10))])).unwrap(), dec!(20));
        assert_eq!(expr.eval(&env(&[("a", dec!(4))])).unwrap(), dec!(2));
        let expr = Expr::parse("if(a ≠ 0, 1, 0)").unwrap();
        assert_eq!(expr.eval(&env(&[("a", dec!(3))])).unwrap(), dec!(1));
    }

    #[test]
    fn test_rejects_unknown_function() {
        assert_eq!(
            Expr::parse("exec(1)"),
            Err(ExprError::UnknownFunction("exec".into()))
        );
        assert_eq!(
            Expr::parse("eval(amount)"),
            Err(ExprError::UnknownFunction("eval".into()))
        );
    }

    #[test]
    fn test_rejects_attribute_access() {
        assert!(matches!(
            Expr::parse("amount.value"),
            Err(ExprError::Parse { .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_arity() {
        assert_eq!(
            Expr::parse("round(1)"),
            Err(ExprError::WrongArity {
                function: "round",
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_division_by_zero() {
        let expr = Expr::parse("1 / n").unwrap();
        assert_eq!(
            expr.eval(&env(&[("n", dec!(0))])),
            Err(ExprError::DivisionByZero)
        );
    }

    #[test]
    fn test_negative_literal() {
        let expr = Expr::parse("-5 + 3").unwrap();
        assert_eq!(expr.eval(&env(&[])).unwrap(), dec!(-2));
    }
}
