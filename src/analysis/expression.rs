//! # 约束表达式
//!
//! 递归下降解析算术表达式并求值。
//!
//! 语法（优先级由低到高）：
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | power
//! power  := atom ('^' unary)?
//! atom   := number | ident | ident '(' expr ')' | '(' expr ')'
//! ```
//! `**` 与 `^` 等价。函数: sqrt sin cos tan exp ln log10 abs；常量: pi。
//!
//! ## 依赖关系
//! - 被 `analysis/constraints.rs` 使用

use crate::error::{DiffError, Result};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Ident(usize, usize),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sqrt,
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Log10,
    Abs,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sqrt" => Self::Sqrt,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "exp" => Self::Exp,
            "ln" => Self::Ln,
            "log10" => Self::Log10,
            "abs" => Self::Abs,
            _ => return None,
        })
    }

    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Sqrt => x.sqrt(),
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Exp => x.exp(),
            Self::Ln => x.ln(),
            Self::Log10 => x.log10(),
            Self::Abs => x.abs(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Sqrt => "sqrt",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Log10 => "log10",
            Self::Abs => "abs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// 表达式语法树
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Box<Expr>),
}

impl Expr {
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text).map_err(|reason| invalid(text, reason))?;
        let mut parser = Parser {
            text,
            tokens: &tokens,
            pos: 0,
        };
        let expr = parser.expr().map_err(|reason| invalid(text, reason))?;
        if parser.pos != tokens.len() {
            return Err(invalid(text, "unexpected trailing input".to_string()));
        }
        Ok(expr)
    }

    /// 表达式中出现的变量名（按出现顺序去重）
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut Vec<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            Expr::Neg(inner) | Expr::Call(_, inner) => inner.collect_variables(names),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            }
        }
    }

    /// 求值，`lookup` 提供变量值
    pub fn evaluate<F>(&self, lookup: &F) -> Result<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        Ok(match self {
            Expr::Number(v) => *v,
            Expr::Variable(name) => {
                lookup(name).ok_or_else(|| DiffError::not_found("alias", name))?
            }
            Expr::Neg(inner) => -inner.evaluate(lookup)?,
            Expr::Call(func, inner) => func.apply(inner.evaluate(lookup)?),
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.evaluate(lookup)?;
                let b = rhs.evaluate(lookup)?;
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Pow => a.powf(b),
                }
            }
        })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) => write!(f, "{}", v),
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Neg(inner) => write!(f, "-({})", inner),
            Expr::Call(func, inner) => write!(f, "{}({})", func.name(), inner),
            Expr::Binary(op, lhs, rhs) => {
                let symbol = match op {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    BinaryOp::Pow => "^",
                };
                write!(f, "({} {} {})", lhs, symbol, rhs)
            }
        }
    }
}

fn invalid(expr: &str, reason: String) -> DiffError {
    DiffError::InvalidExpression {
        expr: expr.to_string(),
        reason,
    }
}

// ─────────────────────────────────────────────────────────────
// 词法分析
// ─────────────────────────────────────────────────────────────

fn tokenize(text: &str) -> std::result::Result<Vec<Token>, String> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' => i += 1,
            b'+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            b'-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                tokens.push(Token::Caret);
                i += 2;
            }
            b'*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            b'/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            b'^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            b'(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            b')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            b'0'..=b'9' | b'.' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        i = j;
                        while i < bytes.len() && bytes[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal = &text[start..i];
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("'{}' is not a number", literal))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push(Token::Ident(start, i));
            }
            _ => {
                let ch = text[i..].chars().next().unwrap_or('?');
                return Err(format!("unexpected character '{}'", ch));
            }
        }
    }
    Ok(tokens)
}

// ─────────────────────────────────────────────────────────────
// 语法分析
// ─────────────────────────────────────────────────────────────

struct Parser<'a> {
    text: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

type ParseResult = std::result::Result<Expr, String>;

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> ParseResult {
        let mut lhs = self.term()?;
        while let Some(token @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            let op = if token == Token::Plus {
                BinaryOp::Add
            } else {
                BinaryOp::Sub
            };
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> ParseResult {
        let mut lhs = self.unary()?;
        while let Some(token @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            let op = if token == Token::Star {
                BinaryOp::Mul
            } else {
                BinaryOp::Div
            };
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> ParseResult {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> ParseResult {
        let base = self.atom()?;
        if self.peek() == Some(Token::Caret) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> ParseResult {
        match self.next() {
            Some(Token::Number(v)) => Ok(Expr::Number(v)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            Some(Token::Ident(start, end)) => {
                let name = &self.text[start..end];
                if self.peek() == Some(Token::LParen) {
                    let func = Function::from_name(name)
                        .ok_or_else(|| format!("unknown function '{}'", name))?;
                    self.pos += 1;
                    let arg = self.expr()?;
                    self.expect_rparen()?;
                    return Ok(Expr::Call(func, Box::new(arg)));
                }
                if name == "pi" {
                    return Ok(Expr::Number(std::f64::consts::PI));
                }
                Ok(Expr::Variable(name.to_string()))
            }
            Some(other) => Err(format!("unexpected token {:?}", other)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn expect_rparen(&mut self) -> std::result::Result<(), String> {
        match self.next() {
            Some(Token::RParen) => Ok(()),
            _ => Err("missing ')'".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str) -> f64 {
        Expr::parse(text).unwrap().evaluate(&|_| None).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3"), 7.0);
        assert_eq!(eval("(1 + 2) * 3"), 9.0);
        assert_eq!(eval("-2^2"), -4.0);
        assert_eq!(eval("2^3^2"), 512.0);
        assert_eq!(eval("2**-1"), 0.5);
        assert_eq!(eval("10 / 4 - 1"), 1.5);
    }

    #[test]
    fn test_functions_and_constants() {
        assert!((eval("sqrt(16) + cos(pi)") - 3.0).abs() < 1e-12);
        assert!((eval("ln(exp(2))") - 2.0).abs() < 1e-12);
        assert!((eval("log10(1e3)") - 3.0).abs() < 1e-12);
        assert_eq!(eval("abs(-1.5e-1)"), 0.15);
    }

    #[test]
    fn test_variables() {
        let expr = Expr::parse("biso_La * 0.5 + biso_Ba").unwrap();
        assert_eq!(expr.variables(), vec!["biso_La", "biso_Ba"]);
        let value = expr
            .evaluate(&|name| match name {
                "biso_La" => Some(2.0),
                "biso_Ba" => Some(0.25),
                _ => None,
            })
            .unwrap();
        assert_eq!(value, 1.25);
        assert!(expr.evaluate(&|_| None).is_err());
    }

    #[test]
    fn test_syntax_errors() {
        assert!(Expr::parse("1 +").is_err());
        assert!(Expr::parse("(1 + 2").is_err());
        assert!(Expr::parse("foo(1)").is_err());
        assert!(Expr::parse("1 $ 2").is_err());
        assert!(Expr::parse("1 2").is_err());
    }
}
