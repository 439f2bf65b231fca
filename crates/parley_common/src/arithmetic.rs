//! Arithmetic evaluator
//!
//! Spots a small calculation inside free text ("what is 15 times 3?",
//! "calculate (2 + 3) * 4") and answers it. Expressions are evaluated by a
//! hand-written recursive-descent parser that only knows numbers,
//! `+ - * /`, parentheses and (for the single binary form) `^`. Nothing else
//! in the message is ever interpreted.

use regex::Regex;
use thiserror::Error;

/// Nesting limit for parenthesised expressions
const MAX_DEPTH: usize = 32;

/// Longest cleaned expression the parser will look at
const MAX_EXPRESSION_CHARS: usize = 256;

/// Why a cleaned expression could not be evaluated
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token")]
    UnexpectedToken,

    #[error("division by zero")]
    DivisionByZero,

    #[error("expression nested too deeply")]
    TooDeep,

    #[error("expression too long")]
    TooLong,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExprError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            other => return Err(ExprError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

/// Recursive-descent evaluator over a token slice
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    binary_ops: usize,
    parens: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            binary_ops: 0,
            parens: 0,
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, ExprError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            self.binary_ops += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<f64, ExprError> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            self.binary_ops += 1;
            let rhs = self.unary()?;
            if op == Token::Star {
                value *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err(ExprError::DivisionByZero);
                }
                value /= rhs;
            }
        }
        Ok(value)
    }

    // unary := ('-' | '+') unary | primary
    fn unary(&mut self) -> Result<f64, ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }

        let result = match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.unary().map(|v| -v)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        };

        self.depth -= 1;
        result
    }

    // primary := number | '(' expr ')'
    fn primary(&mut self) -> Result<f64, ExprError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                self.parens += 1;
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    Some(_) => Err(ExprError::UnexpectedToken),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(_) => Err(ExprError::UnexpectedToken),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

/// Result of evaluating a whole expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    /// Number of binary operators applied
    pub binary_ops: usize,
    /// Whether the expression used parentheses
    pub grouped: bool,
}

/// Evaluate an arithmetic expression made of numbers, `+ - * /` and parentheses
pub fn eval_expression(expr: &str) -> Result<Evaluation, ExprError> {
    if expr.chars().count() > MAX_EXPRESSION_CHARS {
        return Err(ExprError::TooLong);
    }

    let tokens = tokenize(expr)?;
    let mut parser = Parser::new(&tokens);
    let value = parser.expr()?;

    if parser.pos != tokens.len() {
        return Err(ExprError::UnexpectedToken);
    }

    Ok(Evaluation {
        value,
        binary_ops: parser.binary_ops,
        grouped: parser.parens > 0,
    })
}

/// Render a number the way replies show it: integers without a decimal
/// point, everything else rounded to 4 places
pub fn format_number(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

fn render_outcome(expression: &str, value: f64) -> String {
    if value.is_nan() {
        format!("🔢 {} = undefined (not a real number)", expression)
    } else if value.is_infinite() {
        format!("🔢 {} = undefined (result is out of range)", expression)
    } else {
        format!("🔢 {} = {}", expression, format_number(value))
    }
}

fn division_by_zero(expression: &str) -> String {
    format!("🔢 {} = undefined (can't divide by zero)", expression)
}

/// Detects and answers calculations in chat messages
#[derive(Debug, Clone)]
pub struct ArithmeticEvaluator {
    filler: Regex,
    word_ops: Vec<(Regex, &'static str)>,
    letter_times: Regex,
    binary: Regex,
    spaces: Regex,
}

impl ArithmeticEvaluator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            filler: Regex::new(r"\b(?:what is|what's|whats|calculate|compute)\b")?,
            word_ops: vec![
                (Regex::new(r"\bmultiplied by\b")?, " * "),
                (Regex::new(r"\bdivided by\b")?, " / "),
                (Regex::new(r"\bto the power of\b")?, " ^ "),
                (Regex::new(r"\btimes\b")?, " * "),
                (Regex::new(r"\bplus\b")?, " + "),
                (Regex::new(r"\bminus\b")?, " - "),
            ],
            letter_times: Regex::new(r"(\d)\s*[x×]\s*(\d)")?,
            binary: Regex::new(
                r"(?P<lhs>[-+]?\d+(?:\.\d+)?)\s*(?P<op>[-+*/^])\s*(?P<rhs>[-+]?\d+(?:\.\d+)?)",
            )?,
            spaces: Regex::new(r"\s+")?,
        })
    }

    /// Strip filler words and turn operator words into symbols
    fn prepare(&self, message: &str) -> String {
        let mut text = message.to_lowercase().replace('÷', " / ");
        text = self.filler.replace_all(&text, " ").into_owned();
        for (pattern, symbol) in &self.word_ops {
            text = pattern.replace_all(&text, *symbol).into_owned();
        }

        // "3x4x5": each pass rewrites non-overlapping pairs
        loop {
            let next = self.letter_times.replace_all(&text, "$1 * $2").into_owned();
            if next == text {
                break;
            }
            text = next;
        }

        text
    }

    /// Only digits, whitespace and `+-*/.()` survive, whitespace collapsed
    fn clean(&self, prepared: &str) -> String {
        let kept: String = prepared
            .chars()
            .filter(|c| c.is_ascii_digit() || c.is_whitespace() || "+-*/.()".contains(*c))
            .collect();
        self.spaces.replace_all(kept.trim(), " ").into_owned()
    }

    /// Answer the calculation in `message`, if there is one
    pub fn evaluate(&self, message: &str) -> Option<String> {
        let prepared = self.prepare(message);
        let cleaned = self.clean(&prepared);

        let binary = self.binary.captures(&prepared);

        // A longer expression that contains the binary match is answered as a
        // whole so "(2 + 3) * 4" is not reduced to "2 + 3"
        if !prepared.contains('^') && !cleaned.is_empty() {
            match eval_expression(&cleaned) {
                Ok(eval) if eval.binary_ops > 1 || (eval.grouped && eval.binary_ops > 0) => {
                    return Some(render_outcome(&cleaned, eval.value));
                }
                Ok(eval) if binary.is_none() && eval.binary_ops > 0 => {
                    return Some(render_outcome(&cleaned, eval.value));
                }
                Err(ExprError::DivisionByZero) => {
                    return Some(division_by_zero(&cleaned));
                }
                _ => {}
            }
        }

        let caps = binary?;
        let lhs: f64 = caps.name("lhs")?.as_str().parse().ok()?;
        let rhs: f64 = caps.name("rhs")?.as_str().parse().ok()?;
        let op = caps.name("op")?.as_str();
        let expression = format!("{} {} {}", format_number(lhs), op, format_number(rhs));

        let value = match op {
            "+" => lhs + rhs,
            "-" => lhs - rhs,
            "*" => lhs * rhs,
            "/" => {
                if rhs == 0.0 {
                    return Some(division_by_zero(&expression));
                }
                lhs / rhs
            }
            "^" => lhs.powf(rhs),
            _ => return None,
        };

        Some(render_outcome(&expression, value))
    }
}
