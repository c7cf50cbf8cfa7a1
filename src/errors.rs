// File: src/errors.rs
//
// Error handling and reporting for the Selve language.
// Every stage (lexer, parser, type checker, interpreter) reports failures as a
// SelveError carrying its source location, rendered as a colored report.

use colored::Colorize;
use serde::Serialize;
use std::fmt;

/// Result alias used by every fallible stage of the pipeline
pub type Result<T> = std::result::Result<T, SelveError>;

/// Source location information for tracking where code appears in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column, file: None }
    }

    pub fn unknown() -> Self {
        Self { line: 0, column: 0, file: None }
    }

    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref file) = self.file {
            write!(f, "{}:{}:{}", file, self.line, self.column)
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Types of errors that can occur in Selve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    LexError,
    ParseError,
    RuntimeError,
    TypeError,
    UndefinedVariable,
    DivisionByZero,
    InvalidOperation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::LexError => write!(f, "Lex Error"),
            ErrorKind::ParseError => write!(f, "Parse Error"),
            ErrorKind::RuntimeError => write!(f, "Runtime Error"),
            ErrorKind::TypeError => write!(f, "Type Error"),
            ErrorKind::UndefinedVariable => write!(f, "Undefined Variable"),
            ErrorKind::DivisionByZero => write!(f, "Division By Zero"),
            ErrorKind::InvalidOperation => write!(f, "Invalid Operation"),
        }
    }
}

/// A structured error with location information
#[derive(Debug, Clone)]
pub struct SelveError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: SourceLocation,
    pub source_line: Option<String>,
    pub suggestion: Option<String>,
    pub help: Option<String>,
    pub note: Option<String>,
}

impl SelveError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            message: message.into(),
            location,
            source_line: None,
            suggestion: None,
            help: None,
            note: None,
        }
    }

    pub fn with_source(mut self, source_line: String) -> Self {
        self.source_line = Some(source_line);
        self
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Fills in the location only if the error does not have one yet.
    /// Lets inner helpers raise location-less errors that the caller anchors.
    pub fn at(mut self, location: &SourceLocation) -> Self {
        if !self.location.is_known() {
            self.location = location.clone();
        }
        self
    }

    /// Attaches the file name and the offending line of `source`, when the
    /// error has a location and those are not set yet
    pub fn in_source(mut self, file: Option<&str>, source: &str) -> Self {
        if !self.location.is_known() {
            return self;
        }
        if self.location.file.is_none() {
            self.location.file = file.map(str::to_string);
        }
        if self.source_line.is_none() {
            self.source_line = source.lines().nth(self.location.line - 1).map(str::to_string);
        }
        self
    }

    pub fn lex_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::LexError, message, location)
    }

    pub fn parse_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::ParseError, message, location)
    }

    pub fn runtime_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::RuntimeError, message, location)
    }

    pub fn type_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::TypeError, message, location)
    }

    /// Create an undefined variable error
    pub fn undefined_variable(name: &str, location: SourceLocation) -> Self {
        Self::new(
            ErrorKind::UndefinedVariable,
            format!("Cannot resolve {} since it doesnt exist", name),
            location,
        )
    }
}

impl fmt::Display for SelveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind_str = format!("{}", self.kind);
        writeln!(f, "{}: {}", kind_str.red().bold(), self.message.bold())?;

        if self.location.is_known() {
            let location_str = format!("  --> {}", self.location);
            writeln!(f, "{}", location_str.bright_blue())?;
        }

        if let Some(ref source) = self.source_line {
            let line_num = self.location.line;
            let col_num = self.location.column;

            writeln!(f, "   {}", "|".bright_blue())?;
            writeln!(
                f,
                "{} {} {}",
                format!("{:3}", line_num).bright_blue(),
                "|".bright_blue(),
                source
            )?;
            writeln!(
                f,
                "   {} {}{}",
                "|".bright_blue(),
                " ".repeat(col_num.saturating_sub(1)),
                "^".red().bold()
            )?;
            writeln!(f, "   {}", "|".bright_blue())?;
        }

        if let Some(ref help) = self.help {
            writeln!(
                f,
                "   {} {}",
                "=".bright_yellow(),
                format!("help: {}", help).bright_yellow()
            )?;
        }

        if let Some(ref suggestion) = self.suggestion {
            writeln!(
                f,
                "   {} {}",
                "=".bright_green(),
                format!("Did you mean '{}'?", suggestion).bright_green()
            )?;
        }

        if let Some(ref note) = self.note {
            writeln!(f, "   {} {}", "=".bright_cyan(), format!("note: {}", note).bright_cyan())?;
        }

        Ok(())
    }
}

impl std::error::Error for SelveError {}

/// Computes the Levenshtein distance between two strings
/// Used for "Did you mean?" suggestions
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rolling rows instead of the full matrix
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Find the closest match from a list of candidates using Levenshtein distance
/// Returns None if no good match is found (distance > 3)
pub fn find_closest_match<'a>(target: &str, candidates: &'a [String]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|candidate| (levenshtein_distance(target, candidate), candidate))
        .filter(|(distance, _)| *distance <= 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("foo", "foo"), 0);
    }

    #[test]
    fn closest_match_respects_threshold() {
        let names = vec!["print".to_string(), "result".to_string()];
        assert_eq!(find_closest_match("prnt", &names), Some("print"));
        assert_eq!(find_closest_match("completely_different", &names), None);
    }

    #[test]
    fn at_keeps_existing_location() {
        let err = SelveError::runtime_error("boom", SourceLocation::new(2, 4))
            .at(&SourceLocation::new(9, 9));
        assert_eq!(err.location, SourceLocation::new(2, 4));

        let err = SelveError::runtime_error("boom", SourceLocation::unknown())
            .at(&SourceLocation::new(9, 9));
        assert_eq!(err.location, SourceLocation::new(9, 9));
    }

    #[test]
    fn in_source_picks_the_error_line() {
        let err = SelveError::runtime_error("boom", SourceLocation::new(2, 1))
            .in_source(Some("main.sv"), "let a = 1;\nlet b = c;\n");
        assert_eq!(err.location.file.as_deref(), Some("main.sv"));
        assert_eq!(err.source_line.as_deref(), Some("let b = c;"));

        let err = SelveError::runtime_error("boom", SourceLocation::unknown()).in_source(None, "x");
        assert!(err.source_line.is_none());
    }

    #[test]
    fn display_includes_source_context() {
        colored::control::set_override(false);
        let err = SelveError::parse_error("Expected ';'", SourceLocation::new(1, 5))
            .with_source("let x = 1".to_string())
            .with_help("terminate the statement");
        let rendered = err.to_string();
        assert!(rendered.contains("Parse Error: Expected ';'"));
        assert!(rendered.contains("--> 1:5"));
        assert!(rendered.contains("    ^"));
        assert!(rendered.contains("help: terminate the statement"));
    }
}
