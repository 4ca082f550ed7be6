//! Core expression and value types.
//!
//! One tagged union, [`Value`], serves both as the parsed expression tree and
//! as the result of evaluation: numbers, symbols, lists, booleans, closures
//! and native procedures all flow through it. Expressions are immutable once
//! produced by the reader; evaluation only produces new values.
//!
//! The `Display` implementation is the canonical textual rendering: parsing
//! is a left-inverse of it, so `render(parse(render(v))) == render(v)` for
//! any value built from numbers, symbols and lists.

use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::evaluator::Env;

/// Signature of a native procedure bound in the root environment.
pub type NativeFn = fn(&[Value]) -> Result<Value, Error>;

/// Numbers are either exact integers or floats. Mixed arithmetic promotes
/// to float; equality and ordering treat `2` and `2.0` as the same number.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }

    pub fn add(self, other: Number) -> Result<Number, Error> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_add(b)
                .map(Number::Int)
                .ok_or_else(|| Error::Eval("integer overflow in addition".to_owned())),
            (a, b) => Ok(Number::Float(a.as_f64() + b.as_f64())),
        }
    }

    pub fn sub(self, other: Number) -> Result<Number, Error> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_sub(b)
                .map(Number::Int)
                .ok_or_else(|| Error::Eval("integer overflow in subtraction".to_owned())),
            (a, b) => Ok(Number::Float(a.as_f64() - b.as_f64())),
        }
    }

    pub fn mul(self, other: Number) -> Result<Number, Error> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_mul(b)
                .map(Number::Int)
                .ok_or_else(|| Error::Eval("integer overflow in multiplication".to_owned())),
            (a, b) => Ok(Number::Float(a.as_f64() * b.as_f64())),
        }
    }

    /// True division: the result is always a float, as in `(/ 1 2)` = `0.5`.
    pub fn div(self, other: Number) -> Result<Number, Error> {
        if other.as_f64() == 0.0 {
            return Err(Error::Eval("division by zero".to_owned()));
        }
        Ok(Number::Float(self.as_f64() / other.as_f64()))
    }

    pub fn neg(self) -> Result<Number, Error> {
        match self {
            Number::Int(n) => n
                .checked_neg()
                .map(Number::Int)
                .ok_or_else(|| Error::Eval("integer overflow in negation".to_owned())),
            Number::Float(x) => Ok(Number::Float(-x)),
        }
    }

    pub fn abs(self) -> Result<Number, Error> {
        match self {
            Number::Int(n) => n
                .checked_abs()
                .map(Number::Int)
                .ok_or_else(|| Error::Eval("integer overflow in abs".to_owned())),
            Number::Float(x) => Ok(Number::Float(x.abs())),
        }
    }

    /// Exponentiation: exact when both operands are integers and the
    /// exponent is non-negative, float otherwise.
    pub fn expt(self, exp: Number) -> Result<Number, Error> {
        if let (Number::Int(base), Number::Int(e)) = (self, exp) {
            if let Ok(e) = u32::try_from(e) {
                return base
                    .checked_pow(e)
                    .map(Number::Int)
                    .ok_or_else(|| Error::Eval("integer overflow in expt".to_owned()));
            }
        }
        Ok(Number::Float(self.as_f64().powf(exp.as_f64())))
    }

    /// Round to the nearest integer, halves away from zero. Floats outside
    /// the `i64` range (and NaN) do not round to an integer.
    pub fn round(self) -> Result<Number, Error> {
        match self {
            Number::Int(n) => Ok(Number::Int(n)),
            Number::Float(x) => {
                let rounded = x.round();
                if rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
                    Ok(Number::Int(rounded as i64))
                } else {
                    Err(Error::Eval("integer overflow in round".to_owned()))
                }
            }
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.partial_cmp(b),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            // Debug formatting keeps a trailing ".0" on whole floats, so the
            // integer/float distinction survives a render/parse round trip.
            Number::Float(x) => write!(f, "{x:?}"),
        }
    }
}

/// A user-defined procedure: formal parameters, an unevaluated body, and the
/// environment captured (by reference) at the point of the `lambda`.
pub struct Procedure {
    pub params: Vec<String>,
    pub body: Value,
    pub env: Env,
}

/// The expression/value union.
///
/// The reader produces only `Number`, `Symbol` and `List`; the remaining
/// variants arise during evaluation. A `Symbol` whose text begins with `"`
/// is a string literal and evaluates to itself without lookup.
#[derive(Clone)]
pub enum Value {
    Number(Number),
    Symbol(String),
    /// The only recursive case: both data lists and code like `(if a b c)`
    List(Vec<Value>),
    /// Produced by comparison and predicate procedures; the reader never
    /// yields a boolean
    Bool(bool),
    /// User-defined closure
    Procedure(Rc<Procedure>),
    /// Native procedure bound in the root environment
    Native { name: String, func: NativeFn },
    /// Result of `define`, `set!` and `print`; never shown by the prompt
    Unspecified,
}

impl Value {
    /// Truthiness for `if`, `not`, `and` and `or`: false, numeric zero and
    /// the empty list are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64() != 0.0,
            Value::List(items) => !items.is_empty(),
            _ => true,
        }
    }

    /// Check if a value is the empty list.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::List(items) if items.is_empty())
    }

    /// Symbols starting with `"` are string literals.
    pub fn is_string_literal(&self) -> bool {
        matches!(self, Value::Symbol(s) if s.starts_with('"'))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::List(items) => {
                write!(f, "List(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                write!(f, ")")
            }
            Value::Bool(b) => write!(f, "Bool({b})"),
            // The captured environment is omitted: it may contain the
            // procedure itself, and printing it would recurse forever.
            Value::Procedure(p) => {
                write!(f, "Procedure(params={:?}, body={:?})", p.params, p.body)
            }
            Value::Native { name, .. } => write!(f, "Native({name})"),
            Value::Unspecified => write!(f, "Unspecified"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Procedure(_) => write!(f, "#<procedure>"),
            Value::Native { name, .. } => write!(f, "#<native:{name}>"),
            Value::Unspecified => write!(f, "#<unspecified>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            // Closures are equal only to themselves
            (Value::Procedure(a), Value::Procedure(b)) => Rc::ptr_eq(a, b),
            (Value::Native { name: a, .. }, Value::Native { name: b, .. }) => a == b,
            (Value::Unspecified, Value::Unspecified) => true,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::Int(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(Number::Float(x))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Number::Int(i64::from(n)))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(Into::into).collect())
    }
}

/// Helper for creating symbols in tests and mixed lists.
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper for creating values from Rust literals.
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper for the empty list.
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn nil() -> Value {
    Value::List(vec![])
}
