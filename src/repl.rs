// File: src/repl.rs
//
// Interactive REPL (Read-Eval-Print Loop) for the Selve language.
// Provides an interactive shell for executing Selve code with features like:
// - Multi-line input while braces, brackets or parentheses are open
// - Command history with up/down arrow navigation
// - Special commands (:help, :clear, :quit, :vars, :reset, :ast)
// - Persistent state across inputs

use crate::errors::{Result, SelveError};
use crate::interpreter::{Interpreter, Value};
use crate::parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const SOURCE_NAME: &str = "<repl>";

/// REPL session that maintains interpreter state and handles user interaction
pub struct Repl {
    interpreter: Interpreter,
    editor: DefaultEditor,
    /// Print the parsed AST before evaluating each input
    show_ast: bool,
    max_call_depth: usize,
}

impl Repl {
    /// Creates a new REPL session with a fresh interpreter
    pub fn new(max_call_depth: usize) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let editor = DefaultEditor::new()?;
        Ok(Repl { interpreter: fresh_interpreter(max_call_depth), editor, show_ast: false, max_call_depth })
    }

    /// Displays the welcome banner with version and help information
    fn show_banner(&self) {
        println!(
            "{} {}",
            "Selve REPL".bright_cyan().bold(),
            format!("v{}", env!("CARGO_PKG_VERSION")).bright_cyan()
        );
        println!(
            "  Type {} for commands, {} or {} to leave",
            ":help".bright_yellow(),
            ":quit".bright_yellow(),
            "exit".bright_yellow()
        );
        println!();
    }

    /// Starts the REPL loop
    pub fn run(&mut self) -> std::result::Result<(), Box<dyn std::error::Error>> {
        self.show_banner();

        let mut buffer = String::new();

        loop {
            let prompt = if buffer.is_empty() {
                "selve> ".bright_green().to_string()
            } else {
                "....> ".bright_blue().to_string()
            };

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let _ = self.editor.add_history_entry(line.as_str());

                    // Commands are only recognized outside multi-line input
                    if buffer.is_empty() {
                        let trimmed = line.trim();
                        if trimmed == "exit" {
                            break;
                        }
                        if trimmed.starts_with(':') {
                            if self.handle_command(trimmed) {
                                continue;
                            } else {
                                break;
                            }
                        }
                    }

                    buffer.push_str(&line);
                    buffer.push('\n');

                    if is_input_complete(&buffer) {
                        self.eval_input(&buffer);
                        buffer.clear();
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C (Ctrl+D or :quit to exit)".bright_yellow());
                    buffer.clear();
                }
                Err(ReadlineError::Eof) => {
                    break;
                }
                Err(err) => {
                    eprintln!("{} {}", "Error:".bright_red(), err);
                    break;
                }
            }
        }

        println!("{}", "Goodbye!".bright_cyan());
        Ok(())
    }

    /// Handles special REPL commands starting with ':'
    /// Returns true to continue REPL, false to quit
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":help" | ":h" => self.show_help(),
            ":quit" | ":q" => return false,
            ":clear" | ":c" => {
                print!("\x1B[2J\x1B[1;1H");
                self.show_banner();
            }
            ":vars" | ":v" => self.show_variables(),
            ":reset" | ":r" => {
                self.interpreter = fresh_interpreter(self.max_call_depth);
                println!("{}", "Environment reset".bright_green());
            }
            ":ast" => {
                self.show_ast = !self.show_ast;
                let state = if self.show_ast { "on" } else { "off" };
                println!("AST display {}", state.bright_yellow());
            }
            _ => {
                println!(
                    "{} Unknown command: {}. Type {} for available commands.",
                    "Error:".bright_red(),
                    cmd.bright_yellow(),
                    ":help".bright_yellow()
                );
            }
        }
        true
    }

    /// Displays help information about available commands
    fn show_help(&self) {
        println!();
        println!("{}", "REPL Commands:".bright_cyan().bold());
        println!("  {}  Display this help message", ":help  or :h".bright_yellow());
        println!("  {}  Exit the REPL (also: exit)", ":quit  or :q".bright_yellow());
        println!("  {}  Clear the screen", ":clear or :c".bright_yellow());
        println!("  {}  Show defined variables", ":vars  or :v".bright_yellow());
        println!("  {}  Reset environment", ":reset or :r".bright_yellow());
        println!("  {}  Toggle printing the parsed AST", ":ast        ".bright_yellow());
        println!();
        println!("{}", "Multi-line Input:".bright_cyan().bold());
        println!("  Leave braces, brackets, or parentheses unclosed to continue");
        println!("  on the next line. Close them to execute the statement.");
        println!();
        println!("{}", "Examples:".bright_cyan().bold());
        println!("  {}", "selve> let x = 42".dimmed());
        println!("  {}", "selve> fn add(a, b) {".dimmed());
        println!("  {}", "....>     a + b".dimmed());
        println!("  {}", "....> }".dimmed());
        println!("  {}", "selve> add(x, 1)".dimmed());
        println!("  {}", "=> 43".dimmed());
        println!();
    }

    /// Displays all user-defined globals
    fn show_variables(&self) {
        let bindings = self.interpreter.global_bindings();
        if bindings.is_empty() {
            println!("  {}", "(no variables defined)".dimmed());
            return;
        }
        for (name, value, constant) in bindings {
            let keyword = if constant { "const" } else { "let" };
            println!("  {} {} = {}", keyword.dimmed(), name.bright_yellow(), value);
        }
    }

    /// Evaluates the input code and displays the result
    fn eval_input(&mut self, input: &str) {
        if input.trim().is_empty() {
            return;
        }

        match evaluate(&mut self.interpreter, input, self.show_ast) {
            Ok(Value::Null) => {}
            Ok(value) => println!("{} {}", "=>".bright_blue(), value),
            Err(err) => self.print_error(err),
        }
    }

    /// Displays an error report
    fn print_error(&self, err: SelveError) {
        eprint!("{}", err);
    }
}

fn fresh_interpreter(max_call_depth: usize) -> Interpreter {
    let mut interpreter = Interpreter::new();
    interpreter.set_max_call_depth(max_call_depth);
    interpreter
}

/// Parses and runs one input. Lines are numbered across the whole session,
/// so an error inside a function from an earlier input shows that input's line.
fn evaluate(interpreter: &mut Interpreter, input: &str, show_ast: bool) -> Result<Value> {
    let first_line = interpreter.append_source(SOURCE_NAME, input);
    let program =
        parser::parse_source_at(input, first_line).map_err(|err| interpreter.decorate(err))?;

    if show_ast {
        println!("{}", format!("{:#?}", program.body).dimmed());
    }

    interpreter.eval_program(&program)
}

/// Checks if the input is syntactically complete
/// Returns true unless a brace, bracket or parenthesis is still open.
/// Delimiters inside `//` comments are ignored.
pub fn is_input_complete(input: &str) -> bool {
    let mut brace_count = 0i32;
    let mut bracket_count = 0i32;
    let mut paren_count = 0i32;

    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '{' => brace_count += 1,
            '}' => brace_count -= 1,
            '[' => bracket_count += 1,
            ']' => bracket_count -= 1,
            '(' => paren_count += 1,
            ')' => paren_count -= 1,
            _ => {}
        }
    }

    // Extra closers are left for the parser to report
    brace_count <= 0 && bracket_count <= 0 && paren_count <= 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_input_is_complete() {
        assert!(is_input_complete("let x = 1;\n"));
        assert!(is_input_complete(""));
        assert!(is_input_complete("fn add(a, b) { a + b }\n"));
    }

    #[test]
    fn open_delimiters_continue() {
        assert!(!is_input_complete("fn add(a, b) {\n"));
        assert!(!is_input_complete("print(1,\n"));
        assert!(!is_input_complete("let p = Point { x: 1,\n"));
    }

    #[test]
    fn comments_are_ignored() {
        assert!(is_input_complete("let x = 1; // {\n"));
        assert!(!is_input_complete("fn f() { // }\n"));
        assert!(is_input_complete("fn f() { // }\n}\n"));
    }

    #[test]
    fn extra_closers_are_complete() {
        assert!(is_input_complete("}\n"));
    }

    #[test]
    fn errors_point_at_the_input_that_defined_the_code() {
        let mut interpreter = Interpreter::new();
        evaluate(&mut interpreter, "fn boom() {\n  1 / 0\n}\n", false).unwrap();
        let err = evaluate(&mut interpreter, "let a = 1;\nboom()\n", false).unwrap_err();
        assert_eq!(err.location.line, 2);
        assert_eq!(err.location.file.as_deref(), Some(SOURCE_NAME));
        assert_eq!(err.source_line.as_deref(), Some("  1 / 0"));
    }

    #[test]
    fn parse_errors_use_session_line_numbers() {
        let mut interpreter = Interpreter::new();
        evaluate(&mut interpreter, "let a = 1;\n", false).unwrap();
        let err = evaluate(&mut interpreter, "let = 2;\n", false).unwrap_err();
        assert_eq!(err.location.line, 2);
        assert_eq!(err.source_line.as_deref(), Some("let = 2;"));
    }
}
