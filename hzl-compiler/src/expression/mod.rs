//! Expression evaluation for per-harmonic parameter values
//!
//! An expression is an algebraic formula in the single variable
//! `harmonic_index`, e.g. `1 / harmonic_index^2` or
//! `sin(harmonic_index * π / 4)`. It is parsed once into a tree and then
//! evaluated for each harmonic. Results are plain `f64`; a NaN or infinite
//! value anywhere in the tree is an evaluation failure, never a substitute
//! result.

mod lexer;
mod parser;

pub use parser::{BinaryOp, Expr, Function, ParseError, HARMONIC_INDEX};

use hzl_common::{Error, Result};

/// A parsed expression, ready to evaluate at any harmonic index
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> std::result::Result<Self, ParseError> {
        Ok(Self {
            source: source.to_string(),
            root: parser::parse(source)?,
        })
    }

    /// Substitute `harmonic_index` and reduce to a finite number
    pub fn evaluate(&self, harmonic_index: u32) -> Result<f64> {
        eval(&self.root, f64::from(harmonic_index))
            .map_err(|cause| expression_error(&self.source, harmonic_index, cause))
    }
}

/// Parse and evaluate in one step
pub fn evaluate(expression: &str, harmonic_index: u32) -> Result<f64> {
    Expression::parse(expression)
        .map_err(|e| expression_error(expression, harmonic_index, e.to_string()))?
        .evaluate(harmonic_index)
}

pub(crate) fn expression_error(expression: &str, harmonic_index: u32, cause: String) -> Error {
    Error::Expression {
        expression: expression.to_string(),
        harmonic_index,
        cause,
    }
}

fn finite(value: f64, what: &str) -> std::result::Result<f64, String> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{} produced a non-finite result ({})", what, value))
    }
}

fn eval(expr: &Expr, harmonic_index: f64) -> std::result::Result<f64, String> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::HarmonicIndex => Ok(harmonic_index),
        Expr::Neg(inner) => Ok(-eval(inner, harmonic_index)?),
        Expr::Binary { op, left, right } => {
            let a = eval(left, harmonic_index)?;
            let b = eval(right, harmonic_index)?;
            let value = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    a / b
                }
                BinaryOp::Pow => {
                    if a == 0.0 && b < 0.0 {
                        return Err("division by zero".to_string());
                    }
                    a.powf(b)
                }
            };
            finite(value, op_name(*op))
        }
        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| eval(arg, harmonic_index))
                .collect::<std::result::Result<Vec<f64>, String>>()?;
            finite(apply(*function, &values)?, function_name(*function))
        }
    }
}

fn apply(function: Function, args: &[f64]) -> std::result::Result<f64, String> {
    let x = args[0];
    let value = match function {
        Function::Sin => x.sin(),
        Function::Cos => x.cos(),
        Function::Tan => x.tan(),
        Function::Asin => x.asin(),
        Function::Acos => x.acos(),
        Function::Atan => x.atan(),
        Function::Sinh => x.sinh(),
        Function::Cosh => x.cosh(),
        Function::Tanh => x.tanh(),
        Function::Sqrt => x.sqrt(),
        Function::Exp => x.exp(),
        Function::Ln => x.ln(),
        Function::Log => match args.get(1) {
            None => x.ln(),
            Some(&base) => {
                let denominator = base.ln();
                if denominator == 0.0 {
                    return Err("logarithm base 1".to_string());
                }
                x.ln() / denominator
            }
        },
        Function::Abs => x.abs(),
        Function::Floor => x.floor(),
        Function::Ceiling => x.ceil(),
        Function::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
        Function::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };
    Ok(value)
}

fn op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "addition",
        BinaryOp::Sub => "subtraction",
        BinaryOp::Mul => "multiplication",
        BinaryOp::Div => "division",
        BinaryOp::Pow => "exponentiation",
    }
}

fn function_name(function: Function) -> &'static str {
    match function {
        Function::Sin => "sin",
        Function::Cos => "cos",
        Function::Tan => "tan",
        Function::Asin => "asin",
        Function::Acos => "acos",
        Function::Atan => "atan",
        Function::Sinh => "sinh",
        Function::Cosh => "cosh",
        Function::Tanh => "tanh",
        Function::Sqrt => "sqrt",
        Function::Exp => "exp",
        Function::Log => "log",
        Function::Ln => "ln",
        Function::Abs => "abs",
        Function::Floor => "floor",
        Function::Ceiling => "ceiling",
        Function::Min => "min",
        Function::Max => "max",
    }
}
