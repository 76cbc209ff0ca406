//! Arithmetic for amount expressions and `defs` blocks.
//!
//! Expressions are parsed completely before evaluation, so a malformed
//! expression is always reported as a syntax error even when it also
//! mentions an undefined name.
//!
//! Supported: decimal literals (with optional exponent), names,
//! `+ - * /`, unary minus and parentheses. Evaluation is bounded only by the
//! length of the input; do not feed it untrusted documents.

use std::collections::BTreeMap;

use crate::error::{GraphError, Result};

/// Names defined by a `defs` block.
pub type Scope = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Op(char),
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Name(String),
    Neg(Box<Expr>),
    Binary(char, Box<Expr>, Box<Expr>),
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| GraphError::syntax(source, format!("bad number \"{text}\"")))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            other => {
                return Err(GraphError::syntax(
                    source,
                    format!("unexpected character '{other}'"),
                ))
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expression(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Name(name)) => Ok(Expr::Name(name)),
            Some(Token::Open) => {
                let inner = self.expression()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(GraphError::syntax(self.source, "expected ')'")),
                }
            }
            Some(other) => Err(GraphError::syntax(
                self.source,
                format!("unexpected {}", describe(&other)),
            )),
            None => Err(GraphError::syntax(self.source, "unexpected end of expression")),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => format!("number {n}"),
        Token::Name(name) => format!("name \"{name}\""),
        Token::Op(op) => format!("operator '{op}'"),
        Token::Open => "'('".to_string(),
        Token::Close => "')'".to_string(),
    }
}

fn parse(source: &str) -> Result<Expr> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(GraphError::syntax(source, "empty expression"));
    }
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let expr = parser.expression()?;
    if let Some(extra) = parser.peek() {
        return Err(GraphError::syntax(
            source,
            format!("unexpected {} after end of expression", describe(extra)),
        ));
    }
    Ok(expr)
}

fn eval(expr: &Expr, scope: &Scope) -> Result<f64> {
    Ok(match expr {
        Expr::Number(n) => *n,
        Expr::Name(name) => *scope
            .get(name)
            .ok_or_else(|| GraphError::UndefinedName(name.clone()))?,
        Expr::Neg(inner) => -eval(inner, scope)?,
        Expr::Binary(op, lhs, rhs) => {
            let (a, b) = (eval(lhs, scope)?, eval(rhs, scope)?);
            match op {
                '+' => a + b,
                '-' => a - b,
                '*' => a * b,
                _ => a / b,
            }
        }
    })
}

/// Evaluates an arithmetic expression against a scope.
///
/// # Errors
///
/// [`GraphError::ExpressionSyntax`] for malformed input or a non-finite
/// result, [`GraphError::UndefinedName`] for a name missing from `scope`.
pub fn evaluate(source: &str, scope: &Scope) -> Result<f64> {
    let expr = parse(source)?;
    let value = eval(&expr, scope)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GraphError::syntax(source, "result is not a finite number"))
    }
}

/// Runs the `name = expression` statements of a `defs` block in order.
///
/// Statements are separated by newlines or `;`. Blank statements and lines
/// starting with `#` are skipped. Later statements may use earlier names.
///
/// # Errors
///
/// Any statement that is not an assignment, or whose expression fails to
/// evaluate.
pub fn evaluate_defs(defs: &str) -> Result<Scope> {
    let mut scope = Scope::new();
    for statement in defs.lines().flat_map(|line| line.split(';')) {
        let statement = statement.trim();
        if statement.is_empty() || statement.starts_with('#') {
            continue;
        }
        let (name, value) = statement
            .split_once('=')
            .ok_or_else(|| GraphError::syntax(statement, "expected \"name = expression\""))?;
        let name = name.trim();
        if !is_identifier(name) {
            return Err(GraphError::syntax(
                statement,
                format!("\"{name}\" is not a valid name"),
            ));
        }
        let value = evaluate(value, &scope)?;
        scope.insert(name.to_string(), value);
    }
    Ok(scope)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_str(s: &str) -> Result<f64> {
        evaluate(s, &Scope::new())
    }

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(eval_str("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(eval_str("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(eval_str("8 / 4 / 2").unwrap(), 1.0);
        assert_eq!(eval_str("-2 * -(3 - 1)").unwrap(), 4.0);
        assert_eq!(eval_str("1.5e3").unwrap(), 1500.0);
        assert_eq!(eval_str("2 * 0.1").unwrap(), 0.2);
    }

    #[test]
    fn names_come_from_scope() {
        let mut scope = Scope::new();
        scope.insert("k".into(), 2.0);
        assert_eq!(evaluate("k * 0.1", &scope).unwrap(), 0.2);
    }

    #[test]
    fn undefined_name() {
        assert_eq!(
            eval_str("k * 0.1").unwrap_err(),
            GraphError::UndefinedName("k".into())
        );
    }

    #[test]
    fn syntax_errors_win_over_undefined_names() {
        assert!(matches!(
            eval_str("k * "),
            Err(GraphError::ExpressionSyntax { .. })
        ));
        assert!(matches!(
            eval_str("(1 + 2"),
            Err(GraphError::ExpressionSyntax { .. })
        ));
        assert!(matches!(
            eval_str("1 2"),
            Err(GraphError::ExpressionSyntax { .. })
        ));
        assert!(matches!(
            eval_str("__import__('os')"),
            Err(GraphError::ExpressionSyntax { .. })
        ));
    }

    #[test]
    fn division_by_zero_is_rejected() {
        assert!(eval_str("1 / 0").is_err());
    }

    #[test]
    fn defs_are_evaluated_in_order() {
        let scope = evaluate_defs("a = 1\nb = 2\nk = a * b").unwrap();
        assert_eq!(scope.get("k"), Some(&2.0));
        let scope = evaluate_defs("# yield\nx = 0.5; y = x * 4\n\n").unwrap();
        assert_eq!(scope.get("y"), Some(&2.0));
    }

    #[test]
    fn defs_reject_non_assignments() {
        assert!(matches!(
            evaluate_defs("del options"),
            Err(GraphError::ExpressionSyntax { .. })
        ));
        assert_eq!(
            evaluate_defs("b = a + 1").unwrap_err(),
            GraphError::UndefinedName("a".into())
        );
    }
}
