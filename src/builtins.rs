//! The standard table of native procedures.
//!
//! Every entry is an ordinary [`NativeFn`]: it receives already-evaluated
//! arguments and has no access to the environment, which is why `quote`,
//! `if`, `define`, `set!`, `lambda`, `apply` and `map` live in the evaluator
//! instead. `begin`, `and` and `or` appear here as plain procedures, so
//! their operands are always evaluated; there is no short-circuiting.

use crate::ast::{NativeFn, Number, Value};
use crate::Error;

/// Name-to-procedure table used to seed the root environment.
pub fn standard_table() -> &'static [(&'static str, NativeFn)] {
    &[
        ("+", builtin_add),
        ("-", builtin_sub),
        ("*", builtin_mul),
        ("/", builtin_div),
        (">", builtin_gt),
        ("<", builtin_lt),
        (">=", builtin_ge),
        ("<=", builtin_le),
        ("=", builtin_num_eq),
        ("equal?", builtin_equal),
        ("car", builtin_car),
        ("cdr", builtin_cdr),
        ("cons", builtin_cons),
        ("list", builtin_list),
        ("length", builtin_length),
        ("append", builtin_append),
        ("null?", builtin_is_null),
        ("list?", builtin_is_list),
        ("number?", builtin_is_number),
        ("symbol?", builtin_is_symbol),
        ("procedure?", builtin_is_procedure),
        ("begin", builtin_begin),
        ("not", builtin_not),
        ("and", builtin_and),
        ("or", builtin_or),
        ("expt", builtin_expt),
        ("sqrt", builtin_sqrt),
        ("abs", builtin_abs),
        ("round", builtin_round),
        ("max", builtin_max),
        ("min", builtin_min),
        ("print", builtin_print),
    ]
}

fn expect_number(op: &str, value: &Value) -> Result<Number, Error> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(Error::Type(format!("{op} expects numbers, got {other}"))),
    }
}

fn expect_numbers(op: &str, args: &[Value]) -> Result<Vec<Number>, Error> {
    args.iter().map(|v| expect_number(op, v)).collect()
}

fn expect_list<'a>(op: &str, value: &'a Value) -> Result<&'a [Value], Error> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(Error::Type(format!("{op} expects a list, got {other}"))),
    }
}

fn require_at_least(op: &str, min: usize, args: &[Value]) -> Result<(), Error> {
    if args.len() < min {
        return Err(Error::Eval(format!(
            "{op} expects at least {min} arguments, got {}",
            args.len()
        )));
    }
    Ok(())
}

macro_rules! numeric_comparison {
    ($func:ident, $label:expr, $op:tt) => {
        /// Chained numeric comparison: true when every adjacent pair holds.
        fn $func(args: &[Value]) -> Result<Value, Error> {
            require_at_least($label, 2, args)?;
            let nums = expect_numbers($label, args)?;
            Ok(Value::Bool(nums.windows(2).all(|w| w[0] $op w[1])))
        }
    };
}

numeric_comparison!(builtin_gt, ">", >);
numeric_comparison!(builtin_lt, "<", <);
numeric_comparison!(builtin_ge, ">=", >=);
numeric_comparison!(builtin_le, "<=", <=);
numeric_comparison!(builtin_num_eq, "=", ==);

fn builtin_add(args: &[Value]) -> Result<Value, Error> {
    let mut acc = Number::Int(0);
    for n in expect_numbers("+", args)? {
        acc = acc.add(n)?;
    }
    Ok(Value::Number(acc))
}

/// `(- x)` negates; `(- x y ...)` subtracts left to right.
fn builtin_sub(args: &[Value]) -> Result<Value, Error> {
    require_at_least("-", 1, args)?;
    let nums = expect_numbers("-", args)?;
    if let [only] = nums[..] {
        return only.neg().map(Value::Number);
    }
    let mut acc = nums[0];
    for n in &nums[1..] {
        acc = acc.sub(*n)?;
    }
    Ok(Value::Number(acc))
}

fn builtin_mul(args: &[Value]) -> Result<Value, Error> {
    let mut acc = Number::Int(1);
    for n in expect_numbers("*", args)? {
        acc = acc.mul(n)?;
    }
    Ok(Value::Number(acc))
}

/// True division; the result is always a float.
fn builtin_div(args: &[Value]) -> Result<Value, Error> {
    require_at_least("/", 2, args)?;
    let nums = expect_numbers("/", args)?;
    let mut acc = nums[0];
    for n in &nums[1..] {
        acc = acc.div(*n)?;
    }
    Ok(Value::Number(acc))
}

/// Structural equality on any two values.
fn builtin_equal(args: &[Value]) -> Result<Value, Error> {
    match args {
        [a, b] => Ok(Value::Bool(a == b)),
        _ => Err(Error::Arity {
            expected: 2,
            got: args.len(),
        }),
    }
}

fn builtin_car(args: &[Value]) -> Result<Value, Error> {
    match args {
        [list] => expect_list("car", list)?
            .first()
            .cloned()
            .ok_or_else(|| Error::Eval("car of empty list".to_owned())),
        _ => Err(Error::Arity {
            expected: 1,
            got: args.len(),
        }),
    }
}

fn builtin_cdr(args: &[Value]) -> Result<Value, Error> {
    match args {
        [list] => {
            let items = expect_list("cdr", list)?;
            if items.is_empty() {
                return Err(Error::Eval("cdr of empty list".to_owned()));
            }
            Ok(Value::List(items[1..].to_vec()))
        }
        _ => Err(Error::Arity {
            expected: 1,
            got: args.len(),
        }),
    }
}

/// `(cons x xs)` prepends `x` to the list `xs`.
fn builtin_cons(args: &[Value]) -> Result<Value, Error> {
    match args {
        [head, tail] => {
            let rest = expect_list("cons", tail)?;
            let mut items = Vec::with_capacity(rest.len() + 1);
            items.push(head.clone());
            items.extend_from_slice(rest);
            Ok(Value::List(items))
        }
        _ => Err(Error::Arity {
            expected: 2,
            got: args.len(),
        }),
    }
}

fn builtin_list(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::List(args.to_vec()))
}

fn builtin_length(args: &[Value]) -> Result<Value, Error> {
    match args {
        [list] => Ok(Value::Number(Number::Int(
            expect_list("length", list)?.len() as i64,
        ))),
        _ => Err(Error::Arity {
            expected: 1,
            got: args.len(),
        }),
    }
}

fn builtin_append(args: &[Value]) -> Result<Value, Error> {
    let mut items = Vec::new();
    for arg in args {
        items.extend_from_slice(expect_list("append", arg)?);
    }
    Ok(Value::List(items))
}

fn builtin_is_null(args: &[Value]) -> Result<Value, Error> {
    unary_predicate(args, |v| v.is_nil())
}

fn builtin_is_list(args: &[Value]) -> Result<Value, Error> {
    unary_predicate(args, |v| matches!(v, Value::List(_)))
}

fn builtin_is_number(args: &[Value]) -> Result<Value, Error> {
    unary_predicate(args, |v| matches!(v, Value::Number(_)))
}

fn builtin_is_symbol(args: &[Value]) -> Result<Value, Error> {
    unary_predicate(args, |v| matches!(v, Value::Symbol(_)))
}

fn builtin_is_procedure(args: &[Value]) -> Result<Value, Error> {
    unary_predicate(args, |v| {
        matches!(v, Value::Procedure(_) | Value::Native { .. })
    })
}

fn unary_predicate(args: &[Value], pred: fn(&Value) -> bool) -> Result<Value, Error> {
    match args {
        [value] => Ok(Value::Bool(pred(value))),
        _ => Err(Error::Arity {
            expected: 1,
            got: args.len(),
        }),
    }
}

/// Operands were already evaluated left to right; return the last value.
fn builtin_begin(args: &[Value]) -> Result<Value, Error> {
    Ok(args.last().cloned().unwrap_or(Value::Unspecified))
}

fn builtin_not(args: &[Value]) -> Result<Value, Error> {
    unary_predicate(args, |v| !v.is_truthy())
}

fn builtin_and(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args.iter().all(Value::is_truthy)))
}

fn builtin_or(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args.iter().any(Value::is_truthy)))
}

fn builtin_expt(args: &[Value]) -> Result<Value, Error> {
    match args {
        [base, exp] => expect_number("expt", base)?
            .expt(expect_number("expt", exp)?)
            .map(Value::Number),
        _ => Err(Error::Arity {
            expected: 2,
            got: args.len(),
        }),
    }
}

fn builtin_sqrt(args: &[Value]) -> Result<Value, Error> {
    match args {
        [n] => {
            let x = expect_number("sqrt", n)?.as_f64();
            if x < 0.0 {
                return Err(Error::Eval(format!("sqrt of negative number: {x}")));
            }
            Ok(Value::Number(Number::Float(x.sqrt())))
        }
        _ => Err(Error::Arity {
            expected: 1,
            got: args.len(),
        }),
    }
}

fn builtin_abs(args: &[Value]) -> Result<Value, Error> {
    match args {
        [n] => expect_number("abs", n)?.abs().map(Value::Number),
        _ => Err(Error::Arity {
            expected: 1,
            got: args.len(),
        }),
    }
}

fn builtin_round(args: &[Value]) -> Result<Value, Error> {
    match args {
        [n] => expect_number("round", n)?.round().map(Value::Number),
        _ => Err(Error::Arity {
            expected: 1,
            got: args.len(),
        }),
    }
}

fn builtin_max(args: &[Value]) -> Result<Value, Error> {
    fold_extremum("max", args, |a, b| if b > a { b } else { a })
}

fn builtin_min(args: &[Value]) -> Result<Value, Error> {
    fold_extremum("min", args, |a, b| if b < a { b } else { a })
}

fn fold_extremum(
    op: &str,
    args: &[Value],
    pick: fn(Number, Number) -> Number,
) -> Result<Value, Error> {
    require_at_least(op, 1, args)?;
    let nums = expect_numbers(op, args)?;
    let mut acc = nums[0];
    for n in &nums[1..] {
        acc = pick(acc, *n);
    }
    Ok(Value::Number(acc))
}

fn builtin_print(args: &[Value]) -> Result<Value, Error> {
    let rendered: Vec<String> = args.iter().map(|v| format!("{v}")).collect();
    println!("{}", rendered.join(" "));
    Ok(Value::Unspecified)
}
