//! Interpreter command-line.
//!
//! When called without argument it drops into an interactive
//! read-evaluate-print loop; syntax errors there do not end the session.
//!
//! When called with a script path it runs the file once and exits 65 on a
//! static error or 70 on a runtime error. Any other invocation prints usage
//! and exits 64.

use std::env;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::process;

use anyhow::{self, Context};

use treelox::interpreter::Interpreter;

fn main() -> Result<(), anyhow::Error> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    match args.as_slice() {
        [] => run_prompt()?,
        [path] => run_file(path)?,
        _ => {
            println!("Usage: treelox [script]");
            process::exit(64);
        }
    }
    Ok(())
}

fn run_file(path: &str) -> Result<(), anyhow::Error> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;

    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let mut interp = Interpreter::new(&mut stdout, &mut stderr);
    interp.run(&source)?;

    if interp.had_error() {
        process::exit(65);
    }
    if interp.had_runtime_error() {
        process::exit(70);
    }
    Ok(())
}

fn run_prompt() -> Result<(), anyhow::Error> {
    let stdin = io::stdin();
    let mut prompt_stdout = io::stdout();
    let mut interp_stdout = io::stdout();
    let mut stderr = io::stderr();

    let mut interp = Interpreter::new(&mut interp_stdout, &mut stderr);

    let mut input = String::new();
    loop {
        prompt_stdout.write_all(b"> ")?;
        prompt_stdout.flush()?;

        input.clear();
        let nbytes = stdin.read_line(&mut input)?;
        if nbytes == 0 {
            break;
        }

        interp.run(&input)?;
        // A bad line should not poison the next one.
        interp.clear_error();
    }

    Ok(())
}
