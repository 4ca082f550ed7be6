//! The reader: tokenizer and recursive-descent parser.
//!
//! Tokenization is deliberately simple: pad every parenthesis with spaces and
//! split on whitespace. Atoms are tried as integer, then float, then symbol,
//! so `42` is exact, `1e3` is the float `1000.0`, and anything else
//! (including `"`-prefixed string literals) is a symbol.

use crate::ast::{Number, Value};
use crate::{Error, MAX_PARSE_DEPTH};

/// Split source text into parenthesis and atom tokens.
pub fn tokenize(source: &str) -> Vec<String> {
    source
        .replace('(', " ( ")
        .replace(')', " ) ")
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// Parse exactly one expression; trailing tokens are a syntax error.
pub fn parse(source: &str) -> Result<Value, Error> {
    let tokens = tokenize(source);
    let mut pos = 0;
    let expr = read_expr(&tokens, &mut pos, 0)?;
    if pos < tokens.len() {
        return Err(Error::Syntax(format!(
            "unexpected trailing token: {}",
            tokens[pos]
        )));
    }
    Ok(expr)
}

/// Parse a whole program: zero or more expressions in sequence.
pub fn parse_program(source: &str) -> Result<Vec<Value>, Error> {
    let tokens = tokenize(source);
    let mut pos = 0;
    let mut exprs = Vec::new();
    while pos < tokens.len() {
        exprs.push(read_expr(&tokens, &mut pos, 0)?);
    }
    Ok(exprs)
}

fn read_expr(tokens: &[String], pos: &mut usize, depth: usize) -> Result<Value, Error> {
    if depth > MAX_PARSE_DEPTH {
        return Err(Error::Syntax(format!(
            "nesting too deep (max: {MAX_PARSE_DEPTH})"
        )));
    }
    let Some(token) = tokens.get(*pos) else {
        return Err(Error::Syntax("unexpected EOF".to_owned()));
    };
    *pos += 1;
    match token.as_str() {
        "(" => {
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos) {
                    None => return Err(Error::Syntax("unexpected EOF".to_owned())),
                    Some(t) if t == ")" => {
                        *pos += 1;
                        return Ok(Value::List(items));
                    }
                    Some(_) => items.push(read_expr(tokens, pos, depth + 1)?),
                }
            }
        }
        ")" => Err(Error::Syntax("unexpected close paren".to_owned())),
        atom => Ok(parse_atom(atom)),
    }
}

fn parse_atom(token: &str) -> Value {
    if let Ok(n) = token.parse::<i64>() {
        return Value::Number(Number::Int(n));
    }
    if let Ok(x) = token.parse::<f64>() {
        return Value::Number(Number::Float(x));
    }
    Value::Symbol(token.to_owned())
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ast::{nil, sym, val};

    fn run_parse_tests(cases: Vec<(&str, Result<Value, Error>)>) {
        for (input, expected) in cases {
            assert_eq!(parse(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("(+ 1 2)"), vec!["(", "+", "1", "2", ")"]);
        assert_eq!(tokenize("  atom  "), vec!["atom"]);
        assert_eq!(tokenize(""), Vec::<String>::new());
        assert_eq!(
            tokenize("(a\n (b))"),
            vec!["(", "a", "(", "b", ")", ")"]
        );
    }

    #[test]
    fn test_parse_atoms() {
        run_parse_tests(vec![
            ("42", Ok(val(42))),
            ("-17", Ok(val(-17))),
            ("2.5", Ok(val(2.5))),
            ("1e3", Ok(val(1000.0))),
            ("foo", Ok(sym("foo"))),
            ("+", Ok(sym("+"))),
            ("\"hello", Ok(sym("\"hello"))),
        ]);
    }

    #[test]
    fn test_parse_lists() {
        run_parse_tests(vec![
            ("()", Ok(nil())),
            ("(+ 1 2)", Ok(val(vec![sym("+"), val(1), val(2)]))),
            (
                "(* (+ 1 2) 3)",
                Ok(val(vec![
                    sym("*"),
                    val(vec![sym("+"), val(1), val(2)]),
                    val(3),
                ])),
            ),
            ("(() ())", Ok(val(vec![nil(), nil()]))),
        ]);
    }

    #[test]
    fn test_parse_errors() {
        run_parse_tests(vec![
            ("", Err(Error::Syntax("unexpected EOF".to_owned()))),
            ("(", Err(Error::Syntax("unexpected EOF".to_owned()))),
            ("(+ 1 2", Err(Error::Syntax("unexpected EOF".to_owned()))),
            (")", Err(Error::Syntax("unexpected close paren".to_owned()))),
            (
                "(+ 1 2) 3",
                Err(Error::Syntax("unexpected trailing token: 3".to_owned())),
            ),
        ]);
    }

    #[test]
    fn test_parse_depth_limit() {
        let deep = "(".repeat(MAX_PARSE_DEPTH + 2) + &")".repeat(MAX_PARSE_DEPTH + 2);
        assert!(matches!(parse(&deep), Err(Error::Syntax(_))));
        let ok = "(".repeat(20) + &")".repeat(20);
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn test_parse_program() {
        let exprs = parse_program("(define x 1) (+ x 2)").unwrap();
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[1], val(vec![sym("+"), sym("x"), val(2)]));
        assert_eq!(parse_program("").unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn test_render_parse_round_trip() {
        for source in ["42", "2.5", "foo", "(+ 1 (* 2 3))", "()", "(a (b (c)))"] {
            let parsed = parse(source).unwrap();
            let rendered = format!("{parsed}");
            assert_eq!(parse(&rendered).unwrap(), parsed, "source: {source:?}");
        }
    }
}
