//! Environments and the recursive evaluation engine.
//!
//! An [`Env`] is a handle to one frame in a chain of variable-binding frames.
//! Frames are shared: a `lambda` captures its defining frame by reference,
//! and every call builds a fresh child frame on top of the captured one, so
//! closed-over variables keep resolving to the bindings that were live at
//! definition time and `set!` through a closure is visible to every holder
//! of the frame.
//!
//! Evaluation is a single recursive walk over the expression tree with a
//! depth counter; special forms are dispatched on the head symbol before
//! ordinary application.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{NativeFn, Number, Procedure, Value};
use crate::builtins;
use crate::{Error, MAX_EVAL_DEPTH};

struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Env>,
}

/// A shared handle to a binding frame. Cloning an `Env` aliases the same
/// frame; it never copies bindings.
#[derive(Clone)]
pub struct Env(Rc<RefCell<Frame>>);

impl Env {
    /// Create a root frame with no parent.
    pub fn root() -> Env {
        Env(Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent: None,
        })))
    }

    /// Create an empty frame whose lookups fall through to `self`.
    pub fn child(&self) -> Env {
        Env(Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    /// Bind (or rebind) a name in this frame only. Outer bindings of the
    /// same name are shadowed, not modified.
    pub fn define(&self, name: &str, value: Value) {
        self.0.borrow_mut().bindings.insert(name.to_owned(), value);
    }

    /// Bind a native procedure under its language-level name.
    pub fn define_native(&self, name: &str, func: NativeFn) {
        self.define(
            name,
            Value::Native {
                name: name.to_owned(),
                func,
            },
        );
    }

    /// Walk outward along the parent chain to the innermost frame that binds
    /// `name`. This is the one scoping primitive; lookup and assignment are
    /// both built on it.
    pub fn search(&self, name: &str) -> Option<Env> {
        if self.0.borrow().bindings.contains_key(name) {
            return Some(self.clone());
        }
        let parent = self.0.borrow().parent.clone();
        parent.and_then(|p| p.search(name))
    }

    /// Resolve a name to its value, innermost binding first.
    pub fn lookup(&self, name: &str) -> Result<Value, Error> {
        self.search(name)
            .and_then(|frame| frame.0.borrow().bindings.get(name).cloned())
            .ok_or_else(|| Error::Unbound(name.to_owned()))
    }

    /// Overwrite an existing binding wherever it lives in the chain. Unlike
    /// [`Env::define`], this never creates a binding.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), Error> {
        let frame = self.search(name).ok_or_else(|| Error::Unbound(name.to_owned()))?;
        frame.0.borrow_mut().bindings.insert(name.to_owned(), value);
        Ok(())
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Frames can reach themselves through captured procedures, so only
        // the local names are printed.
        let frame = self.0.borrow();
        let mut names: Vec<&String> = frame.bindings.keys().collect();
        names.sort();
        f.debug_struct("Env")
            .field("names", &names)
            .field("has_parent", &frame.parent.is_some())
            .finish()
    }
}

/// Create a root environment seeded with the standard table of natives and
/// the numeric constants.
pub fn global_env() -> Env {
    let env = Env::root();
    for (name, func) in builtins::standard_table() {
        env.define_native(name, *func);
    }
    env.define("pi", Value::Number(Number::Float(std::f64::consts::PI)));
    env
}

/// Evaluate one expression in the given environment.
pub fn eval(expr: &Value, env: &Env) -> Result<Value, Error> {
    eval_at_depth(expr, env, 0)
}

fn eval_at_depth(expr: &Value, env: &Env, depth: usize) -> Result<Value, Error> {
    if depth > MAX_EVAL_DEPTH {
        return Err(Error::StackExhausted);
    }
    match expr {
        Value::Symbol(name) if expr.is_string_literal() => Ok(Value::Symbol(name.clone())),
        Value::Symbol(name) => env.lookup(name),
        Value::List(items) => {
            let Some(head) = items.first() else {
                return Err(Error::Syntax("unexpected expression: ()".to_owned()));
            };
            if let Value::Symbol(op) = head {
                match op.as_str() {
                    "quote" => return eval_quote(&items[1..]),
                    "if" => return eval_if(&items[1..], env, depth),
                    "define" => return eval_define(&items[1..], env, depth),
                    "set!" => return eval_set(&items[1..], env, depth),
                    "lambda" => return eval_lambda(&items[1..], env),
                    "apply" => return eval_apply(&items[1..], env, depth),
                    "map" => return eval_map(&items[1..], env, depth),
                    _ => {}
                }
            }
            let func = eval_at_depth(head, env, depth + 1)?;
            let mut args = Vec::with_capacity(items.len() - 1);
            for arg in &items[1..] {
                args.push(eval_at_depth(arg, env, depth + 1)?);
            }
            apply_callable(&func, &args, depth)
        }
        // Numbers, booleans, procedures and the unspecified value are
        // self-evaluating
        _ => Ok(expr.clone()),
    }
}

/// `(quote expr)`: return the operand unevaluated.
fn eval_quote(args: &[Value]) -> Result<Value, Error> {
    match args {
        [quoted] => Ok(quoted.clone()),
        _ => Err(Error::Syntax(format!(
            "quote expects 1 operand, got {}",
            args.len()
        ))),
    }
}

/// `(if test conseq)` or `(if test conseq alt)`: only the selected branch is
/// evaluated; a false test with no alternative yields the unspecified value.
fn eval_if(args: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let (test, conseq, alt) = match args {
        [test, conseq] => (test, conseq, None),
        [test, conseq, alt] => (test, conseq, Some(alt)),
        _ => {
            return Err(Error::Syntax(format!(
                "if expects 2 or 3 operands, got {}",
                args.len()
            )));
        }
    };
    if eval_at_depth(test, env, depth + 1)?.is_truthy() {
        eval_at_depth(conseq, env, depth + 1)
    } else {
        match alt {
            Some(alt) => eval_at_depth(alt, env, depth + 1),
            None => Ok(Value::Unspecified),
        }
    }
}

/// `(define name expr)`: bind in the innermost frame, shadowing outer
/// bindings of the same name.
fn eval_define(args: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let [Value::Symbol(name), expr] = args else {
        return Err(Error::Syntax(
            "define expects a name and one expression".to_owned(),
        ));
    };
    if name.starts_with('"') {
        return Err(Error::Syntax(format!("cannot define a string literal: {name}")));
    }
    let value = eval_at_depth(expr, env, depth + 1)?;
    env.define(name, value);
    Ok(Value::Unspecified)
}

/// `(set! name expr)`: overwrite the innermost existing binding anywhere in
/// the chain; an unbound name is an error, never an implicit define.
fn eval_set(args: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let [Value::Symbol(name), expr] = args else {
        return Err(Error::Syntax(
            "set! expects a name and one expression".to_owned(),
        ));
    };
    let value = eval_at_depth(expr, env, depth + 1)?;
    env.assign(name, value)?;
    Ok(Value::Unspecified)
}

/// `(lambda (params...) body)`: capture the current environment by reference.
fn eval_lambda(args: &[Value], env: &Env) -> Result<Value, Error> {
    let [Value::List(params), body] = args else {
        return Err(Error::Syntax(
            "lambda expects a parameter list and one body expression".to_owned(),
        ));
    };
    let mut names = Vec::with_capacity(params.len());
    for param in params {
        match param {
            Value::Symbol(name) if !name.starts_with('"') => {
                if names.contains(name) {
                    return Err(Error::Syntax(format!(
                        "duplicate lambda parameter: {name}"
                    )));
                }
                names.push(name.clone());
            }
            other => {
                return Err(Error::Syntax(format!(
                    "lambda parameter must be a symbol, got {other}"
                )));
            }
        }
    }
    Ok(Value::Procedure(Rc::new(Procedure {
        params: names,
        body: body.clone(),
        env: env.clone(),
    })))
}

/// `(apply f list)`: call `f` with the elements of `list` as its arguments.
/// Dispatched here rather than as a native so the call shares the current
/// depth budget.
fn eval_apply(args: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let [func_expr, list_expr] = args else {
        return Err(Error::Syntax(
            "apply expects a procedure and an argument list".to_owned(),
        ));
    };
    let func = eval_at_depth(func_expr, env, depth + 1)?;
    match eval_at_depth(list_expr, env, depth + 1)? {
        Value::List(items) => apply_callable(&func, &items, depth),
        other => Err(Error::Type(format!(
            "apply expects an argument list, got {other}"
        ))),
    }
}

/// `(map f list)`: apply `f` to each element of `list`, collecting the
/// results in order. Dispatched here for the same reason as `apply`.
fn eval_map(args: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let [func_expr, list_expr] = args else {
        return Err(Error::Syntax(
            "map expects a procedure and a list".to_owned(),
        ));
    };
    let func = eval_at_depth(func_expr, env, depth + 1)?;
    match eval_at_depth(list_expr, env, depth + 1)? {
        Value::List(items) => {
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                mapped.push(apply_callable(&func, &[item], depth)?);
            }
            Ok(Value::List(mapped))
        }
        other => Err(Error::Type(format!("map expects a list, got {other}"))),
    }
}

/// Call a procedure or native with already-evaluated arguments.
fn apply_callable(func: &Value, args: &[Value], depth: usize) -> Result<Value, Error> {
    match func {
        Value::Native { func, .. } => func(args),
        Value::Procedure(p) => {
            if args.len() != p.params.len() {
                return Err(Error::Arity {
                    expected: p.params.len(),
                    got: args.len(),
                });
            }
            let call_env = p.env.child();
            for (param, arg) in p.params.iter().zip(args) {
                call_env.define(param, arg.clone());
            }
            eval_at_depth(&p.body, &call_env, depth + 1)
        }
        other => Err(Error::NotCallable(format!("{other}"))),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ast::{nil, sym, val};
    use crate::{evaluate, evaluate_in, evaluate_program};

    fn run_eval_tests(cases: Vec<(&str, Result<Value, Error>)>) {
        for (input, expected) in cases {
            assert_eq!(evaluate(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_environment_chain() {
        let root = Env::root();
        root.define("x", val(1));
        let inner = root.child();
        assert_eq!(inner.lookup("x"), Ok(val(1)));

        inner.define("x", val(2));
        assert_eq!(inner.lookup("x"), Ok(val(2)));
        assert_eq!(root.lookup("x"), Ok(val(1)));

        assert_eq!(inner.lookup("y"), Err(Error::Unbound("y".to_owned())));
        assert!(inner.search("y").is_none());
    }

    #[test]
    fn test_assign_walks_the_chain() {
        let root = Env::root();
        root.define("counter", val(0));
        let inner = root.child();
        inner.assign("counter", val(5)).unwrap();
        assert_eq!(root.lookup("counter"), Ok(val(5)));
        assert_eq!(
            inner.assign("missing", val(1)),
            Err(Error::Unbound("missing".to_owned()))
        );
    }

    #[test]
    fn test_self_evaluating_forms() {
        run_eval_tests(vec![
            ("42", Ok(val(42))),
            ("2.5", Ok(val(2.5))),
            ("\"hello", Ok(sym("\"hello"))),
            (
                "()",
                Err(Error::Syntax("unexpected expression: ()".to_owned())),
            ),
        ]);
    }

    #[test]
    fn test_lookup_and_unbound() {
        run_eval_tests(vec![(
            "nosuchthing",
            Err(Error::Unbound("nosuchthing".to_owned())),
        )]);
        let env = global_env();
        env.define("answer", val(42));
        assert_eq!(evaluate_in("answer", &env), Ok(val(42)));
    }

    #[test]
    fn test_quote_prevents_evaluation() {
        run_eval_tests(vec![
            ("(quote foo)", Ok(sym("foo"))),
            (
                "(quote (+ 1 2))",
                Ok(val(vec![sym("+"), val(1), val(2)])),
            ),
            ("(quote ())", Ok(nil())),
            (
                "(quote a b)",
                Err(Error::Syntax("quote expects 1 operand, got 2".to_owned())),
            ),
        ]);
    }

    #[test]
    fn test_if_evaluates_one_branch() {
        run_eval_tests(vec![
            ("(if (> 2 1) 10 20)", Ok(val(10))),
            ("(if (> 1 2) 10 20)", Ok(val(20))),
            // The untaken branch is never evaluated, so its error is unseen
            ("(if 1 10 (car (list)))", Ok(val(10))),
            ("(if 0 10 20)", Ok(val(20))),
            ("(if (quote ()) 10 20)", Ok(val(20))),
            ("(if (> 2 1) 10)", Ok(val(10))),
            ("(if (> 1 2) 10)", Ok(Value::Unspecified)),
        ]);
    }

    #[test]
    fn test_define_and_set() {
        let env = global_env();
        assert_eq!(evaluate_in("(define x 3)", &env), Ok(Value::Unspecified));
        assert_eq!(evaluate_in("(+ x 1)", &env), Ok(val(4)));
        assert_eq!(evaluate_in("(set! x 10)", &env), Ok(Value::Unspecified));
        assert_eq!(evaluate_in("x", &env), Ok(val(10)));
        assert_eq!(
            evaluate_in("(set! nosuch 1)", &env),
            Err(Error::Unbound("nosuch".to_owned()))
        );
        assert!(matches!(
            evaluate_in("(define x)", &env),
            Err(Error::Syntax(_))
        ));
    }

    #[test]
    fn test_closures_capture_definition_environment() {
        let env = global_env();
        let program = "(define f (lambda (x) (lambda (y) (+ x y))))
                       (define g (f 3))
                       (define x 100)
                       (g 4)";
        assert_eq!(evaluate_program(program, &env), Ok(val(7)));
    }

    #[test]
    fn test_set_through_closure() {
        let env = global_env();
        let program = "(define make-counter
                         (lambda ()
                           (begin (define n 0)
                                  (lambda () (begin (set! n (+ n 1)) n)))))
                       (define counter (make-counter))
                       (counter)
                       (counter)";
        assert_eq!(evaluate_program(program, &env), Ok(val(2)));
    }

    #[test]
    fn test_recursive_procedure() {
        let env = global_env();
        let program = "(define fact
                         (lambda (n) (if (< n 2) 1 (* n (fact (- n 1))))))
                       (fact 10)";
        assert_eq!(evaluate_program(program, &env), Ok(val(3_628_800)));
        // Deep but legitimate recursion stays under the depth limit
        assert_eq!(
            evaluate_in("(fact 20)", &env),
            Ok(val(2_432_902_008_176_640_000_i64))
        );
    }

    #[test]
    fn test_arity_mismatch_fails_fast() {
        let env = global_env();
        evaluate_in("(define add (lambda (a b) (+ a b)))", &env).unwrap();
        assert_eq!(evaluate_in("(add 1 2)", &env), Ok(val(3)));
        assert_eq!(
            evaluate_in("(add 1)", &env),
            Err(Error::Arity { expected: 2, got: 1 })
        );
        assert_eq!(
            evaluate_in("(add 1 2 3)", &env),
            Err(Error::Arity { expected: 2, got: 3 })
        );
    }

    #[test]
    fn test_not_callable() {
        run_eval_tests(vec![
            ("(1 2 3)", Err(Error::NotCallable("1".to_owned()))),
            (
                "((quote (a b)) 1)",
                Err(Error::NotCallable("(a b)".to_owned())),
            ),
        ]);
    }

    #[test]
    fn test_apply_form() {
        run_eval_tests(vec![
            ("(apply + (list 1 2 3))", Ok(val(6))),
            ("(apply car (list (list 1 2)))", Ok(val(1))),
            (
                "(apply + 3)",
                Err(Error::Type("apply expects an argument list, got 3".to_owned())),
            ),
        ]);
        let env = global_env();
        evaluate_in("(define add (lambda (a b) (+ a b)))", &env).unwrap();
        assert_eq!(evaluate_in("(apply add (list 4 5))", &env), Ok(val(9)));
    }

    #[test]
    fn test_map_form() {
        run_eval_tests(vec![
            ("(map abs (list -1 2 -3))", Ok(val([1, 2, 3]))),
            (
                "(map (lambda (x) (* x x)) (list 1 2 3))",
                Ok(val([1, 4, 9])),
            ),
            ("(map abs (list))", Ok(nil())),
            (
                "(map abs 3)",
                Err(Error::Type("map expects a list, got 3".to_owned())),
            ),
        ]);
    }

    #[test]
    fn test_lambda_shape_errors() {
        run_eval_tests(vec![
            (
                "(lambda x (+ x 1))",
                Err(Error::Syntax(
                    "lambda expects a parameter list and one body expression".to_owned(),
                )),
            ),
            (
                "(lambda (1) 2)",
                Err(Error::Syntax(
                    "lambda parameter must be a symbol, got 1".to_owned(),
                )),
            ),
            (
                "(lambda (a a) a)",
                Err(Error::Syntax("duplicate lambda parameter: a".to_owned())),
            ),
        ]);
    }

    #[test]
    fn test_deep_recursion_hits_the_depth_limit() {
        let env = global_env();
        evaluate_in("(define loop (lambda (n) (loop (+ n 1))))", &env).unwrap();
        assert_eq!(evaluate_in("(loop 0)", &env), Err(Error::StackExhausted));
    }

    #[test]
    fn test_seeding_hook() {
        let env = Env::root();
        env.define_native("double", |args| match args {
            [Value::Number(n)] => n.mul(crate::ast::Number::Int(2)).map(Value::Number),
            _ => Err(Error::Type("double expects one number".to_owned())),
        });
        assert_eq!(evaluate_in("(double 21)", &env), Ok(val(42)));
    }
}
