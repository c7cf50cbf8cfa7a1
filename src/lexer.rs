// File: src/lexer.rs
//
// Lexical analyzer (tokenizer) for the Selve language.
// Converts source code text into a stream of tokens for parsing.
//
// Supports:
// - Keywords: let, const, fn, struct, enum, return, if, else
// - Identifiers and integer literals
// - Operators: +, -, *, /, %, =, ==, !=, <, >, <=, >=, !
// - Punctuation: ( ) { } [ ] : ; , .
// - Line comments starting with //, kept as tokens

use crate::errors::{Result, SelveError, SourceLocation};
use serde::Serialize;

pub const KEYWORDS: &[&str] = &["let", "const", "fn", "struct", "enum", "return", "if", "else"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Identifier(String),
    Number(i64),
    Operator(String),
    Punctuation(char),
    Keyword(String),
    Comment(String),
    Eof,
}

impl TokenKind {
    /// Human readable form used in parse error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Operator(op) => format!("'{}'", op),
            TokenKind::Punctuation(c) => format!("'{}'", c),
            TokenKind::Keyword(k) => format!("keyword '{}'", k),
            TokenKind::Comment(_) => "comment".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

/// Tokenizes Selve source code into a vector of tokens.
///
/// Processes the input character by character, recognizing keywords, identifiers,
/// numbers, operators, punctuation and `//` comments. An `Eof` token is always
/// appended. Characters outside the language are reported with their location.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1;
    let mut col = 1;

    while let Some(&c) = chars.peek() {
        let start_col = col;

        let kind = match c {
            ' ' | '\t' | '\r' => {
                chars.next();
                col += 1;
                None
            }
            '\n' => {
                chars.next();
                line += 1;
                col = 1;
                None
            }
            '/' => {
                chars.next();
                col += 1;
                if chars.peek() == Some(&'/') {
                    chars.next();
                    col += 1;
                    let mut text = String::new();
                    while let Some(&ch) = chars.peek() {
                        if ch == '\n' {
                            break;
                        }
                        text.push(ch);
                        chars.next();
                        col += 1;
                    }
                    Some(TokenKind::Comment(text))
                } else {
                    Some(TokenKind::Operator("/".into()))
                }
            }
            '0'..='9' => {
                let mut num = String::new();
                while let Some(&ch) = chars.peek() {
                    if !ch.is_ascii_digit() {
                        break;
                    }
                    num.push(ch);
                    chars.next();
                    col += 1;
                }
                let value = num.parse::<i64>().map_err(|_| {
                    SelveError::lex_error(
                        format!("Number literal {} is out of range", num),
                        SourceLocation::new(line, start_col),
                    )
                })?;
                Some(TokenKind::Number(value))
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if !(ch.is_alphanumeric() || ch == '_') {
                        break;
                    }
                    ident.push(ch);
                    chars.next();
                    col += 1;
                }

                if KEYWORDS.contains(&ident.as_str()) {
                    Some(TokenKind::Keyword(ident))
                } else {
                    Some(TokenKind::Identifier(ident))
                }
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                col += 1;
                // Check for == != <= >=
                if chars.peek() == Some(&'=') {
                    chars.next();
                    col += 1;
                    Some(TokenKind::Operator(format!("{}=", c)))
                } else {
                    Some(TokenKind::Operator(c.to_string()))
                }
            }
            '+' | '-' | '*' | '%' => {
                chars.next();
                col += 1;
                Some(TokenKind::Operator(c.to_string()))
            }
            '(' | ')' | '{' | '}' | '[' | ']' | ':' | ';' | ',' | '.' => {
                chars.next();
                col += 1;
                Some(TokenKind::Punctuation(c))
            }
            other => {
                return Err(SelveError::lex_error(
                    format!("Unexpected character '{}'", other),
                    SourceLocation::new(line, start_col),
                ));
            }
        };

        if let Some(kind) = kind {
            tokens.push(Token { kind, line, column: start_col });
        }
    }

    tokens.push(Token { kind: TokenKind::Eof, line, column: col });

    log::debug!("tokenized {} tokens over {} lines", tokens.len(), line);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).expect("tokenize failed").into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn basic() {
        assert_eq!(
            kinds("let x  = 5 + (4 / 3);"),
            vec![
                TokenKind::Keyword("let".into()),
                TokenKind::Identifier("x".into()),
                TokenKind::Operator("=".into()),
                TokenKind::Number(5),
                TokenKind::Operator("+".into()),
                TokenKind::Punctuation('('),
                TokenKind::Number(4),
                TokenKind::Operator("/".into()),
                TokenKind::Number(3),
                TokenKind::Punctuation(')'),
                TokenKind::Punctuation(';'),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(
            kinds("a == b != c <= d >= e < f > !g"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Operator("==".into()),
                TokenKind::Identifier("b".into()),
                TokenKind::Operator("!=".into()),
                TokenKind::Identifier("c".into()),
                TokenKind::Operator("<=".into()),
                TokenKind::Identifier("d".into()),
                TokenKind::Operator(">=".into()),
                TokenKind::Identifier("e".into()),
                TokenKind::Operator("<".into()),
                TokenKind::Identifier("f".into()),
                TokenKind::Operator(">".into()),
                TokenKind::Operator("!".into()),
                TokenKind::Identifier("g".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_kept_without_newline() {
        let tokens = tokenize("// this is a comment!\nlet x = 1; // trailing").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Comment(" this is a comment!".into()));
        assert_eq!(tokens[1].kind, TokenKind::Keyword("let".into()));
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[6].kind, TokenKind::Comment(" trailing".into()));
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("fn struct enum return if else const letter _tmp x1 true"),
            vec![
                TokenKind::Keyword("fn".into()),
                TokenKind::Keyword("struct".into()),
                TokenKind::Keyword("enum".into()),
                TokenKind::Keyword("return".into()),
                TokenKind::Keyword("if".into()),
                TokenKind::Keyword("else".into()),
                TokenKind::Keyword("const".into()),
                TokenKind::Identifier("letter".into()),
                TokenKind::Identifier("_tmp".into()),
                TokenKind::Identifier("x1".into()),
                TokenKind::Identifier("true".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_columns() {
        let tokens = tokenize("let foo\n  = 42;").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 5));
        assert_eq!((tokens[2].line, tokens[2].column), (2, 3));
        assert_eq!((tokens[3].line, tokens[3].column), (2, 5));
    }

    #[test]
    fn unexpected_character_is_an_error() {
        let err = tokenize("let x = 5 $ 3;").unwrap_err();
        assert_eq!(err.message, "Unexpected character '$'");
        assert_eq!(err.location, SourceLocation::new(1, 11));
    }

    #[test]
    fn oversized_number_is_an_error() {
        let err = tokenize("99999999999999999999").unwrap_err();
        assert!(err.message.contains("out of range"));
    }
}
