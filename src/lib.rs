//! lisplet - a minimal tree-walking interpreter for a Scheme-like language.
//!
//! Source text is read into a tree of [`ast::Value`] expressions and evaluated
//! directly against a chain of variable-binding frames; there is no bytecode
//! stage. The language covers the classic core:
//!
//! ```scheme
//! (+ 1 2)
//! (define x 42)
//! (if (> x 10) 1 2)
//! (define add (lambda (a b) (+ a b)))
//! (set! x (+ x 1))
//! (quote (1 2 3))
//! ```
//!
//! ## Modules
//!
//! - `reader`: tokenizing and parsing source text into expressions
//! - `evaluator`: environments and the recursive evaluation engine
//! - `builtins`: the standard table of native procedures
//! - `ast`: the value/expression union and its canonical rendering
//!
//! ## Evaluation model
//!
//! Evaluation is single-threaded, strict, and left-to-right. Closures capture
//! their defining environment by reference, so a frame created for a call
//! lives as long as the longest-lived closure that captured it. Recursion
//! depth is bounded by [`MAX_EVAL_DEPTH`]; exceeding it reports
//! [`Error::StackExhausted`] instead of crashing the host stack.

use std::fmt;

use crate::ast::Value;
use crate::evaluator::Env;

/// Maximum parsing depth; deeper nesting is reported as a syntax error
/// rather than overflowing the host stack.
pub const MAX_PARSE_DEPTH: usize = 128;

/// Maximum evaluation depth. Each unit of depth costs several host stack
/// frames, so the limit is kept low enough that the counter fires while the
/// host stack still has headroom.
pub const MAX_EVAL_DEPTH: usize = 500;

/// Error types for the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed or incomplete source text, or an expression shape the
    /// evaluator does not recognize
    Syntax(String),
    /// Variable lookup or `set!` target not found anywhere in the chain
    Unbound(String),
    /// Call head evaluated to something that is neither a procedure nor a
    /// native function
    NotCallable(String),
    /// A native procedure was applied to the wrong kind of value
    Type(String),
    /// Runtime failure inside a native procedure (overflow, division by
    /// zero, `car` of an empty list, ...)
    Eval(String),
    /// Procedure called with the wrong number of arguments
    Arity { expected: usize, got: usize },
    /// Evaluation depth exceeded [`MAX_EVAL_DEPTH`]
    StackExhausted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Syntax(msg) => write!(f, "SyntaxError: {msg}"),
            Error::Unbound(name) => write!(f, "unbound identifier: {name}"),
            Error::NotCallable(what) => write!(f, "not callable: {what}"),
            Error::Type(msg) => write!(f, "Type error: {msg}"),
            Error::Eval(msg) => write!(f, "EvaluationError: {msg}"),
            Error::Arity { expected, got } => {
                write!(f, "ArityError: expected {expected} arguments, got {got}")
            }
            Error::StackExhausted => write!(
                f,
                "stack exhausted: evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
            ),
        }
    }
}

pub mod ast;
pub mod builtins;
pub mod evaluator;
pub mod reader;

/// Evaluate one expression against a fresh global environment.
pub fn evaluate(source: &str) -> Result<Value, Error> {
    let env = evaluator::global_env();
    evaluate_in(source, &env)
}

/// Evaluate one expression against an existing environment.
pub fn evaluate_in(source: &str, env: &Env) -> Result<Value, Error> {
    let expr = reader::parse(source)?;
    evaluator::eval(&expr, env)
}

/// Evaluate a sequence of top-level forms left to right against an existing
/// environment, returning the value of the last one.
///
/// [`reader::parse`] itself reads exactly one expression; this is the entry
/// point for whole programs and interactive lines that contain several forms.
pub fn evaluate_program(source: &str, env: &Env) -> Result<Value, Error> {
    let mut last = Value::Unspecified;
    for expr in &reader::parse_program(source)? {
        last = evaluator::eval(expr, env)?;
    }
    Ok(last)
}
