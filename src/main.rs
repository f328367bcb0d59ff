use std::fs;
use std::process;

use clap::Parser;
use colored::Colorize;

use cflat::loader::load_program;
use cflat::typechecker::check_program;

#[derive(Parser)]
#[command(name = "cflat", about = "Static type checker for the Cflat language")]
struct Cli {
    /// Path to the program tree document (JSON)
    file: String,
}

fn main() {
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", format!("Cannot open file '{}': {}", cli.file, e).red());
            process::exit(1);
        }
    };

    let document: serde_json::Value = match serde_json::from_str(&source) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{}", format!("JSON parsing error: {}", e).red());
            process::exit(1);
        }
    };

    let program = match load_program(&document) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            process::exit(1);
        }
    };

    // The verdict goes to stdout uncoloured: a rejected program is still
    // a successful run of the checker.
    match check_program(&program) {
        Ok(()) => println!("valid"),
        Err(e) => println!("invalid: {}", e.message),
    }
}
