// File: src/main.rs
//
// Main entry point for the Selve language interpreter.
// Handles command-line argument parsing and dispatches to the appropriate
// subcommand (run, check, ast, or repl).

use clap::{Parser as ClapParser, Subcommand};
use colored::Colorize;
use selve::ast::Program;
use selve::errors::{SelveError, SourceLocation};
use selve::interpreter::Interpreter;
use selve::parser::parse_source;
use selve::repl::Repl;
use selve::type_checker::TypeChecker;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

/// Stack reserved for the thread that parses, checks and runs scripts
const INTERPRETER_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Call depth allowed by the CLI, which runs on `INTERPRETER_STACK_SIZE`
const CLI_MAX_CALL_DEPTH: usize = 1000;

#[derive(ClapParser)]
#[command(
    name = "selve",
    about = "Selve: a small expression language with structs, enums and closures",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    /// Starts the REPL when omitted
    #[command(subcommand)]
    command: Option<Commands>,

    /// Deepest nesting of function calls before evaluation stops with an error
    #[arg(long, global = true, default_value_t = CLI_MAX_CALL_DEPTH)]
    max_call_depth: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Selve script file
    Run {
        /// Path to the script
        file: PathBuf,

        /// Skip the static type check before running
        #[arg(long)]
        no_check: bool,

        /// Print the parsed AST before running
        #[arg(long)]
        dump_ast: bool,
    },

    /// Type check a script without running it
    Check {
        /// Path to the script
        file: PathBuf,
    },

    /// Print the parsed AST of a script
    Ast {
        /// Path to the script
        file: PathBuf,

        /// Print JSON instead of the debug form
        #[arg(long)]
        json: bool,
    },

    /// Launch interactive Selve REPL
    Repl,
}

/// A script with its source text, kept for error reports
struct Script {
    name: String,
    source: String,
    program: Program,
}

impl Script {
    fn load(file: &Path) -> Result<Self, Vec<SelveError>> {
        let name = file.display().to_string();
        let source = fs::read_to_string(file).map_err(|err| {
            vec![SelveError::runtime_error(
                format!("Could not read {}: {}", name, err),
                SourceLocation::unknown(),
            )]
        })?;

        let program =
            parse_source(&source).map_err(|err| vec![err.in_source(Some(&name), &source)])?;
        log::debug!("parsed {} statements from {}", program.body.len(), name);

        Ok(Script { name, source, program })
    }

    fn type_check(&self) -> Result<(), Vec<SelveError>> {
        TypeChecker::new().check(&self.program).map_err(|errors| {
            errors
                .into_iter()
                .map(|err| err.in_source(Some(&self.name), &self.source))
                .collect()
        })
    }
}

fn run(file: &Path, no_check: bool, dump_ast: bool, max_call_depth: usize) -> Result<(), Vec<SelveError>> {
    let script = Script::load(file)?;

    if dump_ast {
        println!("{:#?}", script.program);
    }

    if !no_check {
        script.type_check()?;
    }

    let mut interpreter = Interpreter::new();
    interpreter.set_max_call_depth(max_call_depth);
    interpreter.set_source(script.name.clone(), &script.source);
    interpreter.eval_program(&script.program).map_err(|err| vec![err])?;
    Ok(())
}

fn check(file: &Path) -> Result<(), Vec<SelveError>> {
    let script = Script::load(file)?;
    script.type_check()?;
    println!("{}: {}", script.name, "no type errors".bright_green());
    Ok(())
}

fn ast(file: &Path, json: bool) -> Result<(), Vec<SelveError>> {
    let script = Script::load(file)?;
    if json {
        let rendered = serde_json::to_string_pretty(&script.program).map_err(|err| {
            vec![SelveError::runtime_error(
                format!("Could not serialize the AST: {}", err),
                SourceLocation::unknown(),
            )]
        })?;
        println!("{}", rendered);
    } else {
        println!("{:#?}", script.program);
    }
    Ok(())
}

fn repl(max_call_depth: usize) -> Result<(), Vec<SelveError>> {
    let failed = |err: Box<dyn std::error::Error>| {
        vec![SelveError::runtime_error(format!("REPL failed: {}", err), SourceLocation::unknown())]
    };
    Repl::new(max_call_depth).map_err(failed)?.run().map_err(failed)
}

fn dispatch(cli: Cli) -> Result<(), Vec<SelveError>> {
    let depth = cli.max_call_depth;
    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Run { file, no_check, dump_ast } => run(&file, no_check, dump_ast, depth),
        Commands::Check { file } => check(&file),
        Commands::Ast { file, json } => ast(&file, json),
        Commands::Repl => repl(depth),
    }
}

/// Runs the command on a thread with a large stack, since evaluation and
/// parsing recurse once per nesting level of the script
fn dispatch_on_large_stack(cli: Cli) -> Result<(), Vec<SelveError>> {
    let internal = |message: String| vec![SelveError::runtime_error(message, SourceLocation::unknown())];

    let handle = thread::Builder::new()
        .name("selve".to_string())
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(move || dispatch(cli))
        .map_err(|err| internal(format!("Could not start the interpreter thread: {}", err)))?;

    handle
        .join()
        .unwrap_or_else(|_| Err(internal("The interpreter thread panicked".to_string())))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("SELVE_LOG", "warn")).init();

    let cli = Cli::parse();

    match dispatch_on_large_stack(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(errors) => {
            for err in &errors {
                eprint!("{}", err);
            }
            ExitCode::FAILURE
        }
    }
}
