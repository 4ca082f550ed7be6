//! Interactive prompt and script runner.
//!
//! With no arguments, starts a read-eval-print loop against one persistent
//! global environment; with a file argument, evaluates the file as a program
//! and prints the value of its last form.

use std::process::ExitCode;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use lisplet::ast::Value;
use lisplet::evaluator::global_env;
use lisplet::evaluate_program;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    match args.next() {
        Some(path) => run_file(&path),
        None => repl(),
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let env = global_env();
    match evaluate_program(&source, &env) {
        Ok(Value::Unspecified) => ExitCode::SUCCESS,
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn repl() -> ExitCode {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("failed to start line editor: {err}");
            return ExitCode::FAILURE;
        }
    };
    println!("lisplet - type expressions, Ctrl-D to exit");
    let env = global_env();
    loop {
        match editor.readline("lisplet> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(&line);
                match evaluate_program(&line, &env) {
                    Ok(Value::Unspecified) => {}
                    Ok(value) => println!("{value}"),
                    Err(err) => eprintln!("{err}"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("read error: {err}");
                return ExitCode::FAILURE;
            }
        }
    }
}
