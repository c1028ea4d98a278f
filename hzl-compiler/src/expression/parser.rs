//! Recursive descent parser for harmonic series expressions
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr  := term (('+' | '-') term)*
//! term  := unary (('*' | '/') unary)*
//! unary := ('+' | '-') unary | power
//! power := atom ('^' unary)?
//! atom  := number | constant | 'harmonic_index'
//!        | function '(' expr (',' expr)* ')'
//!        | '(' expr ')'
//! ```
//!
//! Exponentiation is right-associative and binds tighter than unary minus,
//! so `-2^2` is `-4` and `2^3^2` is `512`. Identifiers are resolved while
//! parsing: constants fold to literals, unknown names are errors.

use std::f64::consts::{E, PI};
use std::fmt;

use super::lexer::{tokenize, Spanned, Token};

/// Name of the single free variable
pub const HARMONIC_INDEX: &str = "harmonic_index";

/// Deepest allowed nesting of parentheses, signs, and exponents
pub const MAX_DEPTH: usize = 256;

/// Longest accepted expression, in tokens; bounds the depth of operator chains
pub const MAX_TOKENS: usize = 4096;

/// Parse failure with the byte offset it was detected at
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
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

/// Built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Sqrt,
    Exp,
    /// Natural log, or `log(x, base)`
    Log,
    Ln,
    Abs,
    Floor,
    Ceiling,
    Min,
    Max,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "asin" => Function::Asin,
            "acos" => Function::Acos,
            "atan" => Function::Atan,
            "sinh" => Function::Sinh,
            "cosh" => Function::Cosh,
            "tanh" => Function::Tanh,
            "sqrt" => Function::Sqrt,
            "exp" => Function::Exp,
            "log" => Function::Log,
            "ln" => Function::Ln,
            "abs" | "Abs" => Function::Abs,
            "floor" => Function::Floor,
            "ceiling" | "ceil" => Function::Ceiling,
            "min" | "Min" => Function::Min,
            "max" | "Max" => Function::Max,
            _ => return None,
        };
        Some(function)
    }

    /// Accepted argument count, inclusive
    fn arity(self) -> (usize, usize) {
        match self {
            Function::Log => (1, 2),
            Function::Min | Function::Max => (2, usize::MAX),
            _ => (1, 1),
        }
    }
}

/// Expression tree with identifiers already resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    HarmonicIndex,
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

/// Parse a complete expression; trailing tokens are an error
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    if tokens.len() > MAX_TOKENS {
        return Err(ParseError::new(
            format!("expression exceeds {} tokens", MAX_TOKENS),
            tokens[MAX_TOKENS].1,
        ));
    }
    let mut stream = TokenStream::new(&tokens, source.len());
    let expr = stream.expr()?;
    match stream.peek() {
        None => Ok(expr),
        Some((token, at)) => Err(ParseError::new(format!("unexpected {}", describe(token)), at)),
    }
}

fn describe(token: Token<'_>) -> String {
    match token {
        Token::Number(n) => format!("number {}", n),
        Token::Ident(name) => format!("identifier '{}'", name),
        Token::Pi => "'π'".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::Caret => "'^'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::Comma => "','".to_string(),
    }
}

/// Token cursor with one token of lookahead
struct TokenStream<'a, 'src> {
    tokens: &'a [Spanned<'src>],
    pos: usize,
    end: usize,
    depth: usize,
}

impl<'a, 'src> TokenStream<'a, 'src> {
    fn new(tokens: &'a [Spanned<'src>], end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<(Token<'src>, usize)> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<(Token<'src>, usize)> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consume the next token if it equals `expected`
    fn eat(&mut self, expected: Token<'_>) -> bool {
        match self.peek() {
            Some((token, _)) if token == expected => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, expected: Token<'_>) -> Result<(), ParseError> {
        if self.eat(expected) {
            return Ok(());
        }
        Err(match self.peek() {
            Some((token, at)) => ParseError::new(
                format!("expected {}, found {}", describe(expected), describe(token)),
                at,
            ),
            None => ParseError::new(format!("expected {}, found end of input", describe(expected)), self.end),
        })
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;
        loop {
            let op = if self.eat(Token::Plus) {
                BinaryOp::Add
            } else if self.eat(Token::Minus) {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            let right = self.term()?;
            left = binary(op, left, right);
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = if self.eat(Token::Star) {
                BinaryOp::Mul
            } else if self.eat(Token::Slash) {
                BinaryOp::Div
            } else {
                return Ok(left);
            };
            let right = self.unary()?;
            left = binary(op, left, right);
        }
    }

    /// Every recursive path passes through here, so the depth guard lives here
    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.depth >= MAX_DEPTH {
            let at = self.peek().map_or(self.end, |(_, at)| at);
            return Err(ParseError::new(
                format!("expression nested deeper than {} levels", MAX_DEPTH),
                at,
            ));
        }
        self.depth += 1;
        let result = self.unary_inner();
        self.depth -= 1;
        result
    }

    fn unary_inner(&mut self) -> Result<Expr, ParseError> {
        if self.eat(Token::Minus) {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if self.eat(Token::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.atom()?;
        if self.eat(Token::Caret) {
            let exponent = self.unary()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        let Some((token, at)) = self.advance() else {
            return Err(ParseError::new("unexpected end of input", self.end));
        };
        match token {
            Token::Number(value) => Ok(Expr::Number(value)),
            Token::Pi => Ok(Expr::Number(PI)),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if self.eat(Token::LParen) {
                    self.call(name, at)
                } else {
                    resolve_identifier(name, at)
                }
            }
            other => Err(ParseError::new(format!("unexpected {}", describe(other)), at)),
        }
    }

    /// Function call, opening parenthesis already consumed
    fn call(&mut self, name: &str, at: usize) -> Result<Expr, ParseError> {
        let function = Function::from_name(name)
            .ok_or_else(|| ParseError::new(format!("unknown function '{}'", name), at))?;

        let mut args = vec![self.expr()?];
        while self.eat(Token::Comma) {
            args.push(self.expr()?);
        }
        self.expect(Token::RParen)?;

        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            return Err(ParseError::new(
                format!("function '{}' does not take {} argument(s)", name, args.len()),
                at,
            ));
        }
        Ok(Expr::Call { function, args })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn resolve_identifier(name: &str, at: usize) -> Result<Expr, ParseError> {
    match name {
        HARMONIC_INDEX => Ok(Expr::HarmonicIndex),
        "pi" => Ok(Expr::Number(PI)),
        "E" => Ok(Expr::Number(E)),
        _ => Err(ParseError::new(format!("unbound identifier '{}'", name), at)),
    }
}
