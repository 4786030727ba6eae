//! Frame VM runner.
//!
//! Loads a program file and runs it to completion.
//!
//! # Usage
//! ```text
//! framevm <program.bin> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `program.bin`: Program file produced by [`Program::save`]
//!
//! # Options
//! - `--arch <bits>`: Register width in bits (defaults to 32)
//! - `--heap <bytes>`: Heap capacity (defaults to 256)
//! - `--stack <bytes>`: Stack capacity (defaults to 256)
//! - `--trace`: Print the final machine state to stderr
//!
//! Settings are read from `FRAMEVM_ARCH_BITS`, `FRAMEVM_HEAP_SIZE` and
//! `FRAMEVM_STACK_SIZE` first, then overridden by the options above.
//! `FRAMEVM_LOG` selects the minimum log level.
//!
//! # Exit status
//! The halt signal on a clean halt, 3 on any fault, 1 on a usage error.

use framevm::utils::log;
use framevm::virtual_machine::config::Config;
use framevm::virtual_machine::program::Program;
use framevm::virtual_machine::vm::VM;
use framevm::{debug, error, info};
use std::env;
use std::process;
use std::str::FromStr;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    if let Err(e) = log::init_from_env() {
        eprintln!("{e}");
        process::exit(1);
    }

    let program_path = &args[1];
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            process::exit(e.exit_status());
        }
    };
    let mut trace = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--arch" => {
                config.arch_bits = parse_value(&args, &mut i, "--arch");
            }
            "--heap" => {
                config.heap_size = parse_value(&args, &mut i, "--heap");
            }
            "--stack" => {
                config.stack_size = parse_value(&args, &mut i, "--stack");
            }
            "--trace" => {
                trace = true;
                i += 1;
            }
            other => {
                eprintln!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let program = match Program::load(program_path) {
        Ok(program) => program,
        Err(e) => {
            error!("Failed to load {}: {}", program_path, e);
            process::exit(e.exit_status());
        }
    };
    debug!("Loaded {} frames from {}", program.len(), program_path);

    let mut vm = match VM::new(config) {
        Ok(vm) => vm,
        Err(e) => {
            error!("{e}");
            process::exit(e.exit_status());
        }
    };

    let result = vm.run_program(program);
    if trace {
        eprintln!("{}", vm.snapshot());
    }

    match result {
        Ok(status) => {
            info!("Halted with status {} after {} cycles", status, vm.cycles());
            process::exit(status as i32);
        }
        Err(e) => {
            error!(
                "Fault at frame {} after {} cycles: {}",
                vm.instruction_pointer(),
                vm.cycles(),
                e
            );
            process::exit(e.exit_status());
        }
    }
}

/// Reads the value following the option at `args[*i]` and advances past both.
fn parse_value<T: FromStr>(args: &[String], i: &mut usize, name: &str) -> T {
    *i += 1;
    if *i >= args.len() {
        eprintln!("{} requires an argument", name);
        process::exit(1);
    }
    let value = match args[*i].parse() {
        Ok(value) => value,
        Err(_) => {
            eprintln!("Invalid value for {}: {}", name, args[*i]);
            process::exit(1);
        }
    };
    *i += 1;
    value
}

fn print_usage(program: &str) {
    eprintln!(
        "Usage: {} <program.bin> [OPTIONS]\n\n\
         Options:\n  \
         --arch <bits>    Register width in bits (default 32)\n  \
         --heap <bytes>   Heap capacity (default 256)\n  \
         --stack <bytes>  Stack capacity (default 256)\n  \
         --trace          Print the final machine state\n  \
         -h, --help       Show this help",
        program
    );
}
