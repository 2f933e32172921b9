//! Stack machine runner CLI.
//!
//! Assembles a source file and executes it, printing the program's output to
//! stdout and its return value on completion. With no file argument it runs
//! the built-in FizzBuzz demo.
//!
//! # Usage
//! ```text
//! stackvm [file.asm] [OPTIONS]
//! ```
//!
//! # Options
//! - `--limit <n>`: FizzBuzz bound for the built-in demo (default 15)
//! - `--entry <addr>`: Cell address to start execution at (default 0)
//! - `--step-limit <n>`: Abort after n executed instructions
//! - `--listing`: Print the disassembly instead of running

use stackvm::assembler::{assemble_file, render_diagnostic};
use stackvm::samples;
use stackvm::vm::{ExecContext, VM};
use stackvm::{error, info};
use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() >= 2 && (args[1] == "--help" || args[1] == "-h") {
        print_usage(&args[0]);
        process::exit(0);
    }

    let mut input_path: Option<&str> = None;
    let mut bound = samples::DEFAULT_BOUND;
    let mut ctx = ExecContext::default();
    let mut listing = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => {
                i += 1;
                if i >= args.len() {
                    error!("--limit requires an argument");
                    process::exit(1);
                }
                bound = args[i].parse::<i64>().unwrap_or_else(|_| {
                    error!("Invalid limit: '{}' is not a valid number", args[i]);
                    process::exit(1);
                });
                i += 1;
            }
            "--entry" => {
                i += 1;
                if i >= args.len() {
                    error!("--entry requires an argument");
                    process::exit(1);
                }
                ctx.entry = args[i].parse::<usize>().unwrap_or_else(|_| {
                    error!("Invalid entry address: '{}' is not a valid number", args[i]);
                    process::exit(1);
                });
                i += 1;
            }
            "--step-limit" => {
                i += 1;
                if i >= args.len() {
                    error!("--step-limit requires an argument");
                    process::exit(1);
                }
                let limit = args[i].parse::<u64>().unwrap_or_else(|_| {
                    error!("Invalid step limit: '{}' is not a valid number", args[i]);
                    process::exit(1);
                });
                ctx.step_limit = Some(limit);
                i += 1;
            }
            "--listing" => {
                listing = true;
                i += 1;
            }
            other if other.starts_with('-') => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                if input_path.is_some() {
                    error!("Multiple input files given: {}\n", path);
                    print_usage(&args[0]);
                    process::exit(1);
                }
                input_path = Some(path);
                i += 1;
            }
        }
    }

    let program = match input_path {
        Some(path) => {
            if !Path::new(path).exists() {
                error!("Input file does not exist: {}", path);
                process::exit(1);
            }
            match assemble_file(path) {
                Ok(p) => p,
                Err(e) => {
                    let source = fs::read_to_string(path).unwrap_or_default();
                    match render_diagnostic(path, &source, &e) {
                        Some(diag) => error!("Assembly failed:\n{}", diag),
                        None => error!("Assembly failed: {}", e),
                    }
                    process::exit(1);
                }
            }
        }
        None => {
            let source = samples::fizzbuzz(bound);
            match stackvm::assembler::assemble_source(&source) {
                Ok(p) => p,
                Err(e) => {
                    error!("Built-in demo failed to assemble: {}", e);
                    process::exit(1);
                }
            }
        }
    };

    if listing {
        print!("{}", program.listing());
        return;
    }

    let mut vm = VM::with_context(&program, ctx);
    let mut stdout = io::stdout();

    match vm.run(&mut stdout) {
        Ok(value) => {
            info!("Halted after {} steps", vm.steps());
            println!("Returned: {}", value);
        }
        Err(e) => {
            error!("Execution failed after {} steps: {}", vm.steps(), e);
            process::exit(1);
        }
    }
}

const USAGE: &str = "\
Stack Machine Runner

USAGE:
    {program} [file.asm] [OPTIONS]

ARGS:
    [file.asm]    Assembly source file to run (default: built-in FizzBuzz)

OPTIONS:
    --limit <n>         FizzBuzz bound for the built-in demo (default 15)
    --entry <addr>      Cell address to start execution at (default 0)
    --step-limit <n>    Abort after n executed instructions
    --listing           Print the disassembly instead of running
    -h, --help          Print this help message

EXAMPLES:
    # Run the built-in FizzBuzz demo
    {program}

    # FizzBuzz up to 100
    {program} --limit 100

    # Run a program from a source file, bounded to a million steps
    {program} program.asm --step-limit 1000000

    # Inspect the cell layout of a program
    {program} program.asm --listing
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
