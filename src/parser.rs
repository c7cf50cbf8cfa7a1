// File: src/parser.rs
//
// Recursive descent parser for the Selve language.
// Transforms a sequence of tokens into an Abstract Syntax Tree (AST).
//
// Each precedence level has its own method, from assignment (lowest) down to
// postfix member/index/call chains and primaries. Comments are kept as
// statements when they appear between statements and are skipped everywhere
// else.
//
// Struct literals (`Point { x: 1 }`) are disabled while parsing an `if`
// condition so that `if p { ... }` reads the block as the branch body.

use crate::ast::{
    EnumDecl, Expr, FieldDecl, FnDecl, Program, Property, Stmt, StructDecl, TypeAnnotation,
    VariantDecl, VariantKind,
};
use crate::errors::{Result, SelveError, SourceLocation};
use crate::lexer::{Token, TokenKind};

/// Deepest nesting of expressions and blocks accepted in a program
pub const MAX_NESTING_DEPTH: usize = 200;

/// Parser maintains position in token stream and provides methods to parse statements and expressions
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    allow_struct_literal: bool,
    /// Current nesting of expressions and blocks, bounded by MAX_NESTING_DEPTH
    depth: usize,
}

impl Parser {
    /// Creates a new parser from a vector of tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0, allow_struct_literal: true, depth: 0 }
    }

    /// Enters one more level of nesting
    fn descend(&mut self) -> Result<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(SelveError::parse_error("Expression nested too deeply", self.location())
                .with_help(format!("at most {} levels of nesting are allowed", MAX_NESTING_DEPTH)));
        }
        self.depth += 1;
        Ok(())
    }

    /// Runs `f` one nesting level deeper
    fn nested<T>(&mut self, f: fn(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.depth;
        self.descend()?;
        let result = f(self);
        self.depth = saved;
        result
    }

    /// Index of the next token that is not a comment
    fn significant_pos(&self) -> usize {
        let mut pos = self.pos;
        while let Some(Token { kind: TokenKind::Comment(_), .. }) = self.tokens.get(pos) {
            pos += 1;
        }
        pos
    }

    /// Peek at the current token without consuming it, skipping comments
    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.significant_pos())
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    /// Location of the current token
    fn location(&self) -> SourceLocation {
        self.tokens
            .get(self.significant_pos())
            .or_else(|| self.tokens.last())
            .map(Token::location)
            .unwrap_or_else(SourceLocation::unknown)
    }

    /// Consume and return the current token, then advance to the next
    fn advance(&mut self) -> TokenKind {
        self.pos = self.significant_pos();
        let tok = self.tokens.get(self.pos).map(|t| t.kind.clone()).unwrap_or(TokenKind::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check_punct(&self, c: char) -> bool {
        matches!(self.peek(), TokenKind::Punctuation(p) if *p == c)
    }

    fn check_op(&self, op: &str) -> bool {
        matches!(self.peek(), TokenKind::Operator(o) if o == op)
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if k == keyword)
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn unexpected(&self, expected: &str) -> SelveError {
        SelveError::parse_error(
            format!("Expected {} but found {}", expected, self.peek().describe()),
            self.location(),
        )
    }

    fn expect_punct(&mut self, c: char, context: &str) -> Result<()> {
        if self.check_punct(c) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}' {}", c, context)))
        }
    }

    fn expect_identifier(&mut self, context: &str) -> Result<String> {
        match self.peek() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(&format!("identifier {}", context))),
        }
    }

    /// Parse the entire token stream into a program
    pub fn parse(&mut self) -> Result<Program> {
        let mut body = Vec::new();
        loop {
            // Skip semicolons between statements
            while self.check_punct(';') && !self.at_comment() {
                self.advance();
            }
            if self.at_comment() {
                body.push(self.parse_stmt()?);
                continue;
            }
            if self.at_end() {
                break;
            }
            body.push(self.parse_stmt()?);
        }
        log::debug!("parsed {} top level statements", body.len());
        Ok(Program { body })
    }

    /// True when the raw token at the cursor is a comment
    fn at_comment(&self) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token { kind: TokenKind::Comment(_), .. }))
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        if let Some(Token { kind: TokenKind::Comment(text), .. }) = self.tokens.get(self.pos) {
            let stmt = Stmt::Comment(text.clone());
            self.pos += 1;
            return Ok(stmt);
        }

        match self.peek() {
            TokenKind::Keyword(k) if k == "let" || k == "const" => {
                let stmt = self.parse_let()?;
                self.expect_terminator()?;
                Ok(stmt)
            }
            TokenKind::Keyword(k) if k == "fn" => self.parse_fn().map(Stmt::FnDecl),
            TokenKind::Keyword(k) if k == "struct" => self.parse_struct().map(Stmt::StructDecl),
            TokenKind::Keyword(k) if k == "enum" => self.parse_enum().map(Stmt::EnumDecl),
            TokenKind::Keyword(k) if k == "return" => {
                let location = self.location();
                self.advance(); // return
                let value = if self.check_punct(';') || self.check_punct('}') || self.at_end() {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect_terminator()?;
                Ok(Stmt::Return { value, location })
            }
            _ => {
                let expr = self.parse_expr()?;
                if matches!(expr, Expr::If { .. }) {
                    // Block-terminated statements take an optional semicolon
                    if self.check_punct(';') {
                        self.advance();
                    }
                } else {
                    self.expect_terminator()?;
                }
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// A statement ends with `;`, or right before a closing brace or end of input
    fn expect_terminator(&mut self) -> Result<()> {
        if self.check_punct(';') {
            self.advance();
            return Ok(());
        }
        if self.check_punct('}') || self.at_end() {
            return Ok(());
        }
        Err(self.unexpected("';' after statement"))
    }

    fn parse_let(&mut self) -> Result<Stmt> {
        let location = self.location();
        let constant = self.check_keyword("const");
        self.advance(); // let | const

        let name = self.expect_identifier("after let or const keyword")?;

        let type_annotation = if self.check_punct(':') {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };

        let value = if self.check_op("=") {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };

        if constant && value.is_none() {
            return Err(SelveError::parse_error(
                "A value is required for const assignment",
                location,
            ));
        }

        Ok(Stmt::Let { name, constant, type_annotation, value, location })
    }

    fn parse_type(&mut self) -> Result<TypeAnnotation> {
        match self.peek() {
            TokenKind::Identifier(name) => {
                let ty = TypeAnnotation::from_name(name);
                self.advance();
                Ok(ty)
            }
            TokenKind::Keyword(k) if k == "fn" => {
                self.advance();
                Ok(TypeAnnotation::Fn)
            }
            _ => Err(self.unexpected("type name")),
        }
    }

    fn parse_fn(&mut self) -> Result<FnDecl> {
        let location = self.location();
        self.advance(); // fn
        let name = self.expect_identifier("following fn keyword")?;

        self.expect_punct('(', "to open the parameter list")?;
        let mut params: Vec<String> = Vec::new();
        while !self.check_punct(')') {
            let param = self.expect_identifier("as parameter name")?;
            if params.contains(&param) {
                return Err(SelveError::parse_error(
                    format!("Duplicate parameter {} in function {}", param, name),
                    self.location(),
                ));
            }
            params.push(param);
            if self.check_punct(',') {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_punct(')', "to close the parameter list")?;

        let body = self.parse_block()?;
        Ok(FnDecl { name, params, body, location })
    }

    /// `{ stmt* }`
    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.nested(Self::parse_block_body)
    }

    fn parse_block_body(&mut self) -> Result<Vec<Stmt>> {
        self.expect_punct('{', "to open a block")?;

        let saved = self.allow_struct_literal;
        self.allow_struct_literal = true;

        let mut body = Vec::new();
        loop {
            while self.check_punct(';') && !self.at_comment() {
                self.advance();
            }
            if self.at_comment() {
                body.push(self.parse_stmt()?);
                continue;
            }
            if self.check_punct('}') || self.at_end() {
                break;
            }
            body.push(self.parse_stmt()?);
        }

        self.allow_struct_literal = saved;
        self.expect_punct('}', "to close the block")?;
        Ok(body)
    }

    /// `name: type` entries up to the closing brace, which is consumed
    fn parse_field_decls(&mut self, owner: &str) -> Result<Vec<FieldDecl>> {
        let mut fields: Vec<FieldDecl> = Vec::new();
        while !self.check_punct('}') {
            let location = self.location();
            let name = self.expect_identifier("as field name")?;
            self.expect_punct(':', "after field name")?;
            let ty = self.parse_type()?;
            if fields.iter().any(|f| f.name == name) {
                return Err(SelveError::parse_error(
                    format!("Duplicate field {} in {}", name, owner),
                    location,
                ));
            }
            fields.push(FieldDecl { name, ty });

            if self.check_punct(',') {
                self.advance();
            } else if !self.check_punct('}') {
                return Err(self.unexpected("',' or '}' after field"));
            }
        }
        self.expect_punct('}', "to close the field list")?;
        Ok(fields)
    }

    fn parse_struct(&mut self) -> Result<StructDecl> {
        self.advance(); // struct
        let name = self.expect_identifier("following struct keyword")?;
        self.expect_punct('{', "to open the struct body")?;
        let fields = self.parse_field_decls(&name)?;
        Ok(StructDecl { name, fields })
    }

    fn parse_enum(&mut self) -> Result<EnumDecl> {
        self.advance(); // enum
        let name = self.expect_identifier("following enum keyword")?;
        self.expect_punct('{', "to open the enum body")?;

        let mut variants: Vec<VariantDecl> = Vec::new();
        while !self.check_punct('}') {
            let location = self.location();
            let variant = self.expect_identifier("as variant name")?;

            let kind = if self.check_punct('{') {
                self.advance();
                VariantKind::Struct(self.parse_field_decls(&format!("{}.{}", name, variant))?)
            } else if self.check_punct('(') {
                self.advance();
                let mut types = Vec::new();
                while !self.check_punct(')') {
                    types.push(self.parse_type()?);
                    if self.check_punct(',') {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect_punct(')', "to close the variant payload")?;
                VariantKind::Tuple(types)
            } else {
                VariantKind::Unit
            };

            if variants.iter().any(|v| v.name == variant) {
                return Err(SelveError::parse_error(
                    format!("Duplicate variant {} in enum {}", variant, name),
                    location,
                ));
            }
            variants.push(VariantDecl { name: variant, kind });

            if self.check_punct(',') {
                self.advance();
            } else if !self.check_punct('}') {
                return Err(self.unexpected("',' or '}' after variant"));
            }
        }
        self.expect_punct('}', "to close the enum body")?;

        Ok(EnumDecl { name, variants })
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        let left = self.parse_equality()?;

        if self.check_op("=") {
            let location = self.location();
            self.advance(); // =
            if !matches!(left, Expr::Identifier { .. } | Expr::Member { .. } | Expr::Index { .. }) {
                return Err(SelveError::parse_error("Invalid assignment target", location));
            }
            let value = self.nested(Self::parse_assignment)?;
            return Ok(Expr::Assign { target: Box::new(left), value: Box::new(value), location });
        }

        Ok(left)
    }

    /// Left associative binary level over `ops`, with `next` as the operand parser
    fn parse_binary_level(
        &mut self,
        ops: &[&str],
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut left = next(self)?;

        // Each operator in a chain nests the tree one level deeper
        let base = self.depth;
        while let TokenKind::Operator(op) = self.peek() {
            if !ops.contains(&op.as_str()) {
                break;
            }
            let op = op.clone();
            let location = self.location();
            self.descend()?;
            self.advance();
            let right = next(self)?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), location };
        }
        self.depth = base;

        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        self.parse_binary_level(&["==", "!="], Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        self.parse_binary_level(&["<", ">", "<=", ">="], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        self.parse_binary_level(&["+", "-"], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        self.parse_binary_level(&["*", "/", "%"], Self::parse_unary)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.check_op("-") || self.check_op("!") {
            let location = self.location();
            let op = match self.advance() {
                TokenKind::Operator(op) => op,
                other => return Err(SelveError::parse_error(
                    format!("Unexpected {}", other.describe()),
                    location,
                )),
            };
            let operand = self.nested(Self::parse_unary)?;
            return Ok(Expr::Unary { op, operand: Box::new(operand), location });
        }
        self.parse_postfix()
    }

    /// primary followed by any chain of `.field`, `[index]`, `(args)` and struct bodies
    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;

        let base = self.depth;
        loop {
            let location = self.location();
            if matches!(self.peek(), TokenKind::Punctuation('.' | '[' | '(' | '{')) {
                self.descend()?;
            }
            match self.peek() {
                TokenKind::Punctuation('.') => {
                    self.advance(); // .
                    let property = match self.peek() {
                        TokenKind::Identifier(name) => name.clone(),
                        _ => {
                            return Err(SelveError::parse_error(
                                "Expected identifier after '.'",
                                self.location(),
                            ))
                        }
                    };
                    self.advance();
                    expr = Expr::Member { object: Box::new(expr), property, location };
                }
                TokenKind::Punctuation('[') => {
                    self.advance(); // [
                    let index = self.with_struct_literals(Self::parse_expr)?;
                    self.expect_punct(']', "to close the index expression")?;
                    expr = Expr::Index { object: Box::new(expr), index: Box::new(index), location };
                }
                TokenKind::Punctuation('(') => {
                    self.advance(); // (
                    let args = self.parse_args()?;
                    expr = Expr::Call { callee: Box::new(expr), args, location };
                }
                TokenKind::Punctuation('{') if self.allow_struct_literal && expr.is_path() => {
                    self.advance(); // {
                    let fields = self.parse_properties()?;
                    expr = Expr::StructLiteral { path: Box::new(expr), fields, location };
                }
                _ => break,
            }
        }
        self.depth = base;

        Ok(expr)
    }

    /// Runs `f` with struct literals enabled, restoring the previous setting
    fn with_struct_literals<T>(&mut self, f: fn(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.allow_struct_literal;
        self.allow_struct_literal = true;
        let result = f(self);
        self.allow_struct_literal = saved;
        result
    }

    /// foo(...args)
    ///     ^.....^   the opening paren is already consumed
    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.check_punct(')') {
            args.push(self.with_struct_literals(Self::parse_expr)?);
            if self.check_punct(',') {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_punct(')', "to close the argument list")?;
        Ok(args)
    }

    /// { foo: foo, bar, baz: null }
    ///  ^ the opening brace is already consumed
    fn parse_properties(&mut self) -> Result<Vec<Property>> {
        let mut properties = Vec::new();
        while !self.check_punct('}') {
            let location = self.location();
            let key = self.expect_identifier("as property name")?;

            let value = if self.check_punct(':') {
                self.advance();
                Some(self.with_struct_literals(Self::parse_expr)?)
            } else {
                None
            };
            properties.push(Property { key, value, location });

            if self.check_punct(',') {
                self.advance();
            } else if !self.check_punct('}') {
                return Err(self.unexpected("',' or '}' after property"));
            }
        }
        self.expect_punct('}', "to close the literal")?;
        Ok(properties)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let location = self.location();
        match self.peek().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Identifier { name, location })
            }
            TokenKind::Punctuation('(') => {
                self.advance();
                let value = self.with_struct_literals(Self::parse_expr)?;
                self.expect_punct(')', "to close the parenthesized expression")?;
                Ok(value)
            }
            TokenKind::Punctuation('{') => {
                self.advance();
                Ok(Expr::Object(self.parse_properties()?))
            }
            TokenKind::Keyword(k) if k == "if" => self.parse_if(),
            other => Err(SelveError::parse_error(
                format!("Unexpected {}", other.describe()),
                location,
            )),
        }
    }

    fn parse_if(&mut self) -> Result<Expr> {
        let location = self.location();
        self.advance(); // if

        let saved = self.allow_struct_literal;
        self.allow_struct_literal = false;
        let condition = self.parse_expr();
        self.allow_struct_literal = saved;
        let condition = condition?;

        let then_branch = self.parse_block()?;

        let else_branch = if self.check_keyword("else") {
            self.advance(); // else
            if self.check_keyword("if") {
                Some(vec![Stmt::Expr(self.nested(Self::parse_if)?)])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Expr::If { condition: Box::new(condition), then_branch, else_branch, location })
    }
}

/// Convenience for callers holding source text: tokenize then parse
pub fn parse_source(source: &str) -> Result<Program> {
    parse_source_at(source, 1)
}

/// Like `parse_source`, for text that starts at `first_line` of a longer
/// session (the REPL numbers lines across all of its inputs)
pub fn parse_source_at(source: &str, first_line: usize) -> Result<Program> {
    let offset = first_line.saturating_sub(1);
    let tokens = crate::lexer::tokenize(source).map_err(|mut err| {
        if err.location.is_known() {
            err.location.line += offset;
        }
        err
    })?;
    let tokens = tokens
        .into_iter()
        .map(|token| Token { line: token.line + offset, ..token })
        .collect();
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compact prefix rendering so tests can assert tree shape without locations
    fn sexpr(expr: &Expr) -> String {
        match expr {
            Expr::Number(n) => n.to_string(),
            Expr::Identifier { name, .. } => name.clone(),
            Expr::Object(props) => format!("{{{}}}", props_sexpr(props)),
            Expr::StructLiteral { path, fields, .. } => {
                format!("(new {} {{{}}})", sexpr(path), props_sexpr(fields))
            }
            Expr::Binary { left, op, right, .. } => {
                format!("({} {} {})", op, sexpr(left), sexpr(right))
            }
            Expr::Unary { op, operand, .. } => format!("({} {})", op, sexpr(operand)),
            Expr::Assign { target, value, .. } => format!("(= {} {})", sexpr(target), sexpr(value)),
            Expr::Member { object, property, .. } => format!("(. {} {})", sexpr(object), property),
            Expr::Index { object, index, .. } => format!("([] {} {})", sexpr(object), sexpr(index)),
            Expr::Call { callee, args, .. } => {
                let args: Vec<String> = args.iter().map(sexpr).collect();
                format!("(call {} [{}])", sexpr(callee), args.join(" "))
            }
            Expr::If { condition, then_branch, else_branch, .. } => {
                let mut out = format!("(if {} [{}]", sexpr(condition), block_sexpr(then_branch));
                if let Some(else_branch) = else_branch {
                    out.push_str(&format!(" else [{}]", block_sexpr(else_branch)));
                }
                out.push(')');
                out
            }
        }
    }

    fn props_sexpr(props: &[Property]) -> String {
        props
            .iter()
            .map(|p| match &p.value {
                Some(v) => format!("{}: {}", p.key, sexpr(v)),
                None => p.key.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn stmt_sexpr(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Comment(text) => format!("//{}", text),
            Stmt::Let { name, constant, type_annotation, value, .. } => {
                let kw = if *constant { "const" } else { "let" };
                let ty = type_annotation.as_ref().map(|t| format!(": {}", t)).unwrap_or_default();
                match value {
                    Some(v) => format!("({} {}{} {})", kw, name, ty, sexpr(v)),
                    None => format!("({} {}{})", kw, name, ty),
                }
            }
            Stmt::FnDecl(decl) => {
                format!("(fn {} ({}) [{}])", decl.name, decl.params.join(" "), block_sexpr(&decl.body))
            }
            Stmt::StructDecl(decl) => format!("(struct {})", decl.name),
            Stmt::EnumDecl(decl) => format!("(enum {})", decl.name),
            Stmt::Return { value, .. } => match value {
                Some(v) => format!("(return {})", sexpr(v)),
                None => "(return)".to_string(),
            },
            Stmt::Expr(e) => sexpr(e),
        }
    }

    fn block_sexpr(stmts: &[Stmt]) -> String {
        stmts.iter().map(stmt_sexpr).collect::<Vec<_>>().join("; ")
    }

    fn parse(src: &str) -> Vec<String> {
        let program = parse_source(src).expect("Unable to parse");
        program.body.iter().map(stmt_sexpr).collect()
    }

    fn parse_err(src: &str) -> SelveError {
        parse_source(src).expect_err("Should not parse")
    }

    #[test]
    fn basic() {
        assert_eq!(parse("45 + (foo + 4) % bar"), vec!["(+ 45 (% (+ foo 4) bar))"]);
    }

    #[test]
    fn precedence_levels() {
        assert_eq!(
            parse("a = 1 + 2 * 3 < 4 == !b;"),
            vec!["(= a (== (< (+ 1 (* 2 3)) 4) (! b)))"]
        );
        assert_eq!(parse("-x - -y;"), vec!["(- (- x) (- y))"]);
        assert_eq!(parse("a = b = 3;"), vec!["(= a (= b 3))"]);
    }

    #[test]
    fn assignment() {
        let input = r#"
            let foo = 50 / 2;
            const bar = {
                x: 100,
                y: 32,
                foo,
                baz: {
                    z: true,
                },
            };
        "#;
        assert_eq!(
            parse(input),
            vec!["(let foo (/ 50 2))", "(const bar {x: 100, y: 32, foo, baz: {z: true}})"]
        );
    }

    #[test]
    fn declare_function() {
        let input = r#"
            fn add(x,y) {
                fn subtract() {
                    print();
                }

                let result = x + y;

                print(result);
                result
            }
        "#;
        assert_eq!(
            parse(input),
            vec![
                "(fn add (x y) [(fn subtract () [(call print [])]); (let result (+ x y)); (call print [result]); result])"
            ]
        );
    }

    #[test]
    fn comment() {
        let input = r#"
            // this is a comment!
            let foo = 50 / 2;

            // this does stuff
            print(40 * 2 + foo); // so does this!
        "#;
        assert_eq!(
            parse(input),
            vec![
                "// this is a comment!",
                "(let foo (/ 50 2))",
                "// this does stuff",
                "(call print [(+ (* 40 2) foo)])",
                "// so does this!",
            ]
        );
    }

    #[test]
    fn comments_inside_expressions_are_skipped() {
        let input = "let p = {\n x: 1, // first\n y: 2\n};";
        assert_eq!(parse(input), vec!["(let p {x: 1, y: 2})"]);
    }

    #[test]
    fn nested_call_expression() {
        assert_eq!(parse("print(print(5));"), vec!["(call print [(call print [5])])"]);
        assert_eq!(parse("make()(1)(2);"), vec!["(call (call (call make []) [1]) [2])"]);
    }

    #[test]
    fn member_and_index_chains() {
        assert_eq!(
            parse("a.b[0].c(1).d = 2;"),
            vec!["(= (. (call (. ([] (. a b) 0) c) [1]) d) 2)"]
        );
    }

    #[test]
    fn const_requires_value() {
        let error = parse_err("const foo;");
        assert_eq!("A value is required for const assignment", error.message);
        assert!(parse_source("const foo = 6;").is_ok());
    }

    #[test]
    fn let_without_value_and_with_type() {
        assert_eq!(parse("let a; let b: number = 2;"), vec!["(let a)", "(let b: number 2)"]);
    }

    #[test]
    fn struct_and_enum_declarations() {
        let program = parse_source(
            r#"
            struct Point { x: number, y: number }
            enum Shape {
                Empty,
                Circle { radius: number },
                Pair(number, Point),
            }
            "#,
        )
        .unwrap();

        match &program.body[0] {
            Stmt::StructDecl(decl) => {
                assert_eq!(decl.name, "Point");
                assert_eq!(decl.fields.len(), 2);
                assert_eq!(decl.field("y").map(|f| &f.ty), Some(&TypeAnnotation::Number));
            }
            other => panic!("expected struct, got {:?}", other),
        }

        match &program.body[1] {
            Stmt::EnumDecl(decl) => {
                assert_eq!(decl.variant("Empty").map(|v| &v.kind), Some(&VariantKind::Unit));
                assert!(matches!(
                    decl.variant("Circle").map(|v| &v.kind),
                    Some(VariantKind::Struct(fields)) if fields.len() == 1
                ));
                assert_eq!(
                    decl.variant("Pair").map(|v| &v.kind),
                    Some(&VariantKind::Tuple(vec![
                        TypeAnnotation::Number,
                        TypeAnnotation::Named("Point".into())
                    ]))
                );
            }
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn struct_literals() {
        assert_eq!(
            parse("let p = Point { x: 1, y };"),
            vec!["(let p (new Point {x: 1, y}))"]
        );
        assert_eq!(
            parse("Shape.Circle { radius: 2 };"),
            vec!["(new (. Shape Circle) {radius: 2})"]
        );
    }

    #[test]
    fn if_condition_disables_struct_literals() {
        assert_eq!(
            parse("if ready { 1 } else if other { 2 } else { 3 }"),
            vec!["(if ready [1] else [(if other [2] else [3])])"]
        );
        assert_eq!(
            parse("if (Point { x: 1 }) == p { 1 }"),
            vec!["(if (== (new Point {x: 1}) p) [1])"]
        );
    }

    #[test]
    fn return_statements() {
        assert_eq!(
            parse("fn f(x) { return x; } fn g() { return }"),
            vec!["(fn f (x) [(return x)])", "(fn g () [(return)])"]
        );
    }

    #[test]
    fn missing_semicolon_is_reported() {
        let err = parse_err("let x = 1 let y = 2;");
        assert!(err.message.contains("';' after statement"), "{}", err.message);
        assert_eq!(err.location, SourceLocation::new(1, 11));
    }

    #[test]
    fn invalid_assignment_target() {
        assert_eq!(parse_err("1 + 2 = 3;").message, "Invalid assignment target");
    }

    #[test]
    fn dot_requires_identifier() {
        assert_eq!(parse_err("foo.1;").message, "Expected identifier after '.'");
    }

    #[test]
    fn deep_nesting_is_a_parse_error() {
        let depth = 5000;
        let too_deep = [
            format!("{}1{}", "(".repeat(depth), ")".repeat(depth)),
            format!("{}1", "- ".repeat(depth)),
            format!("{}{}", "if 1 { ".repeat(depth), "}".repeat(depth)),
            vec!["1"; depth].join(" + "),
            format!("x{}", ".y".repeat(depth)),
            format!("a{}", " = a".repeat(depth)),
        ];
        for src in &too_deep {
            let err = parse_err(src);
            assert_eq!(err.message, "Expression nested too deeply");
            assert_eq!(err.kind, crate::errors::ErrorKind::ParseError);
        }
    }

    #[test]
    fn moderate_nesting_parses() {
        assert_eq!(parse(&format!("{}1{}", "(".repeat(50), ")".repeat(50))), vec!["1"]);
        assert!(parse_source(&vec!["1"; 100].join(" + ")).is_ok());
        assert!(parse_source(&format!("{}1{}", "if 1 { ".repeat(40), "}".repeat(40))).is_ok());
    }

    #[test]
    fn parse_at_offsets_line_numbers() {
        let program = parse_source_at("let a = 1;\nlet b = 2;", 10).unwrap();
        let lines: Vec<usize> = program
            .body
            .iter()
            .map(|stmt| match stmt {
                Stmt::Let { location, .. } => location.line,
                _ => 0,
            })
            .collect();
        assert_eq!(lines, vec![10, 11]);
        assert_eq!(parse_source_at("\nlet = 1;", 5).unwrap_err().location.line, 6);
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        assert!(parse_err("struct P { x: number, x: bool }").message.contains("Duplicate field x"));
    }
}
