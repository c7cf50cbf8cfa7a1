// File: src/type_checker.rs
//
// Type checker for the Selve language.
// Performs type inference and type checking on the AST before interpretation.
//
// Features:
// - Type inference for expressions and variables
// - Annotation checks on let/const and on assignments to typed variables
// - Strict struct literals against known struct and variant declarations
// - Arity checks for calls to known functions and tuple variants
// - Gradual typing: an unknown inferred type never produces an error
//
// The type checker uses a two-pass approach:
// 1. First pass: Collect struct, enum and function declarations, and the
//    names reassigned anywhere in the program
// 2. Second pass: Check statements and infer types
//
// Declarations live in the same scoped table as variables, as they do at
// runtime, so a nested `struct P` or a local `let add` shadows the outer one.

use crate::ast::{EnumDecl, Expr, FieldDecl, Program, Property, Stmt, StructDecl, TypeAnnotation, VariantKind};
use crate::errors::{SelveError, SourceLocation};
use std::collections::{HashMap, HashSet};

/// Arity and result type of a callable known by name
#[derive(Debug, Clone)]
struct FunctionSignature {
    /// None for variadic natives
    arity: Option<usize>,
    return_type: Option<TypeAnnotation>,
}

/// What a name is bound to, as far as the checker can tell
#[derive(Debug, Clone)]
enum Binding {
    Value,
    Function(FunctionSignature),
    Struct(StructDecl),
    Enum(EnumDecl),
}

#[derive(Debug, Clone)]
struct VarInfo {
    ty: Option<TypeAnnotation>,
    /// Declared with an annotation, so assignments must keep the type
    annotated: bool,
    binding: Binding,
}

/// Type checker maintains a scoped symbol table for variables and declarations
pub struct TypeChecker {
    /// Symbol table mapping names to their types and declarations
    variables: HashMap<String, VarInfo>,
    /// Stack of scopes for nested blocks
    scope_stack: Vec<HashMap<String, VarInfo>>,
    /// Names that appear as `name = value` somewhere in the program
    reassigned: HashSet<String>,
    /// Collect errors instead of failing immediately
    errors: Vec<SelveError>,
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeChecker {
    /// Creates a new type checker that knows only the built-in globals
    pub fn new() -> Self {
        let mut checker = TypeChecker {
            variables: HashMap::new(),
            scope_stack: Vec::new(),
            reassigned: HashSet::new(),
            errors: Vec::new(),
        };

        checker.register_builtins();

        checker
    }

    fn register_builtins(&mut self) {
        self.define("true", Some(TypeAnnotation::Bool), false);
        self.define("false", Some(TypeAnnotation::Bool), false);
        self.define("null", Some(TypeAnnotation::Null), false);

        self.define_function(
            "print",
            FunctionSignature { arity: None, return_type: Some(TypeAnnotation::Null) },
        );
        self.define_function(
            "time",
            FunctionSignature { arity: Some(0), return_type: Some(TypeAnnotation::Number) },
        );
    }

    fn define(&mut self, name: &str, ty: Option<TypeAnnotation>, annotated: bool) {
        self.bind(name, VarInfo { ty, annotated, binding: Binding::Value });
    }

    fn define_function(&mut self, name: &str, signature: FunctionSignature) {
        let info = VarInfo {
            ty: Some(TypeAnnotation::Fn),
            annotated: false,
            binding: Binding::Function(signature),
        };
        self.bind(name, info);
    }

    fn bind(&mut self, name: &str, info: VarInfo) {
        self.variables.insert(name.to_string(), info);
    }

    /// Binds a declaration the way the interpreter does when it runs it
    fn declare(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::StructDecl(decl) => {
                let info = VarInfo { ty: None, annotated: false, binding: Binding::Struct(decl.clone()) };
                self.bind(&decl.name, info);
            }
            Stmt::EnumDecl(decl) => {
                let info = VarInfo { ty: None, annotated: false, binding: Binding::Enum(decl.clone()) };
                self.bind(&decl.name, info);
            }
            Stmt::FnDecl(decl) => {
                let signature = FunctionSignature { arity: Some(decl.params.len()), return_type: None };
                self.define_function(&decl.name, signature);
            }
            _ => {}
        }
    }

    fn struct_decl(&self, name: &str) -> Option<&StructDecl> {
        match self.variables.get(name) {
            Some(VarInfo { binding: Binding::Struct(decl), .. }) => Some(decl),
            _ => None,
        }
    }

    fn enum_decl(&self, name: &str) -> Option<&EnumDecl> {
        match self.variables.get(name) {
            Some(VarInfo { binding: Binding::Enum(decl), .. }) => Some(decl),
            _ => None,
        }
    }

    fn error(&mut self, message: String, location: &SourceLocation) {
        self.errors.push(SelveError::type_error(message, location.clone()));
    }

    /// Type check a program
    ///
    /// Returns Ok(()) if type checking succeeds, or Err with collected errors
    pub fn check(&mut self, program: &Program) -> Result<(), Vec<SelveError>> {
        // First pass: collect declarations so use before declaration resolves
        collect_reassigned(&program.body, &mut self.reassigned);
        for stmt in &program.body {
            self.declare(stmt);
        }

        // Second pass: check statements
        for stmt in &program.body {
            self.check_stmt(stmt);
        }

        log::debug!("type check finished with {} errors", self.errors.len());

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    /// Check a single statement, returning the type of its value if known
    fn check_stmt(&mut self, stmt: &Stmt) -> Option<TypeAnnotation> {
        match stmt {
            Stmt::Comment(_) => None,

            Stmt::Let { name, constant, type_annotation, value, location } => {
                let inferred = match value {
                    Some(expr) => self.infer_expr(expr),
                    None => Some(TypeAnnotation::Null),
                };

                // Once `name = ...` appears anywhere, only the annotation (if
                // any) says what this binding holds
                let reassigned = !*constant && self.reassigned.contains(name);
                let binding = match value {
                    Some(Expr::Identifier { name: source, .. }) if !reassigned => self
                        .variables
                        .get(source)
                        .map(|info| info.binding.clone())
                        .unwrap_or(Binding::Value),
                    _ => Binding::Value,
                };

                if let Some(annotated) = type_annotation {
                    let known = self.check_type_exists(annotated, location);
                    if let (true, Some(actual)) = (known, &inferred) {
                        if !annotated.matches(actual) {
                            self.error(
                                format!(
                                    "Type mismatch: {} declared as {} but assigned {}",
                                    name, annotated, actual
                                ),
                                location,
                            );
                        }
                    }
                    let info = VarInfo { ty: Some(annotated.clone()), annotated: true, binding };
                    self.bind(name, info);
                    Some(annotated.clone())
                } else {
                    let ty = if reassigned { None } else { inferred.clone() };
                    self.bind(name, VarInfo { ty, annotated: false, binding });
                    inferred
                }
            }

            Stmt::FnDecl(decl) => {
                // Declared before the body is checked so it can recurse
                self.declare(stmt);

                self.push_scope();
                for param in &decl.params {
                    self.define(param, None, false);
                }
                for stmt in &decl.body {
                    self.check_stmt(stmt);
                }
                self.pop_scope();

                Some(TypeAnnotation::Fn)
            }

            Stmt::StructDecl(decl) => {
                self.declare(stmt);
                for field in &decl.fields {
                    self.check_type_exists(&field.ty, &SourceLocation::unknown());
                }
                None
            }

            Stmt::EnumDecl(decl) => {
                self.declare(stmt);
                for variant in &decl.variants {
                    match &variant.kind {
                        VariantKind::Unit => {}
                        VariantKind::Tuple(types) => {
                            for ty in types {
                                self.check_type_exists(ty, &SourceLocation::unknown());
                            }
                        }
                        VariantKind::Struct(fields) => {
                            for field in fields {
                                self.check_type_exists(&field.ty, &SourceLocation::unknown());
                            }
                        }
                    }
                }
                None
            }

            Stmt::Return { value, .. } => {
                if let Some(expr) = value {
                    self.infer_expr(expr);
                }
                None
            }

            Stmt::Expr(expr) => self.infer_expr(expr),
        }
    }

    /// Reports annotation names that cannot be a struct or an enum.
    /// Returns whether the name is a known type.
    fn check_type_exists(&mut self, ty: &TypeAnnotation, location: &SourceLocation) -> bool {
        let TypeAnnotation::Named(name) = ty else {
            return true;
        };
        match self.variables.get(name) {
            Some(VarInfo { binding: Binding::Struct(_) | Binding::Enum(_), .. }) => true,
            // A variable of unknown type may hold a struct or enum definition
            Some(VarInfo { binding: Binding::Value, ty: None, .. }) => false,
            _ => {
                self.error(format!("Unknown type {}", name), location);
                false
            }
        }
    }

    /// Checks a block in its own scope, returning the type of its last statement
    fn check_block(&mut self, stmts: &[Stmt]) -> Option<TypeAnnotation> {
        self.push_scope();
        let mut last = None;
        for stmt in stmts {
            if !matches!(stmt, Stmt::Comment(_)) {
                last = self.check_stmt(stmt);
            }
        }
        self.pop_scope();
        last
    }

    /// Infer the type of an expression
    fn infer_expr(&mut self, expr: &Expr) -> Option<TypeAnnotation> {
        match expr {
            Expr::Number(_) => Some(TypeAnnotation::Number),

            Expr::Identifier { name, .. } => {
                self.variables.get(name).and_then(|info| info.ty.clone())
            }

            Expr::Object(props) => {
                for prop in props {
                    self.infer_property(prop);
                }
                Some(TypeAnnotation::Object)
            }

            Expr::StructLiteral { path, fields, location } => {
                self.check_struct_literal(path, fields, location)
            }

            Expr::Binary { left, op, right, location } => {
                let left_type = self.infer_expr(left);
                let right_type = self.infer_expr(right);

                match op.as_str() {
                    "==" | "!=" => Some(TypeAnnotation::Bool),
                    "<" | ">" | "<=" | ">=" => {
                        self.expect_number(op, &left_type, location);
                        self.expect_number(op, &right_type, location);
                        Some(TypeAnnotation::Bool)
                    }
                    _ => {
                        self.expect_number(op, &left_type, location);
                        self.expect_number(op, &right_type, location);
                        Some(TypeAnnotation::Number)
                    }
                }
            }

            Expr::Unary { op, operand, location } => {
                let operand_type = self.infer_expr(operand);
                if op == "!" {
                    Some(TypeAnnotation::Bool)
                } else {
                    self.expect_number(op, &operand_type, location);
                    Some(TypeAnnotation::Number)
                }
            }

            Expr::Assign { target, value, location } => {
                let value_type = self.infer_expr(value);

                if let Expr::Identifier { name, .. } = target.as_ref() {
                    let declared = self
                        .variables
                        .get(name)
                        .filter(|info| info.annotated)
                        .and_then(|info| info.ty.clone());
                    if let (Some(declared), Some(actual)) = (declared, &value_type) {
                        if !declared.matches(actual) {
                            self.error(
                                format!(
                                    "Cannot assign {} to {} of type {}",
                                    actual, name, declared
                                ),
                                location,
                            );
                        }
                    }
                } else {
                    self.infer_expr(target);
                }

                value_type
            }

            Expr::Member { object, property, location } => {
                if let Some(decl) = self.enum_named_by(object) {
                    return self.variant_access(&decl, property, location);
                }

                match self.infer_expr(object) {
                    Some(TypeAnnotation::Named(name)) => {
                        let decl = self.struct_decl(&name)?;
                        let field_type = decl.field(property).map(|field| field.ty.clone());
                        if field_type.is_none() {
                            let message = format!("Property {} does not exist on {}", property, name);
                            self.error(message, location);
                        }
                        field_type
                    }
                    Some(ty @ (TypeAnnotation::Number | TypeAnnotation::Bool | TypeAnnotation::Null)) => {
                        self.error(format!("Cannot read property {} of {}", property, ty), location);
                        None
                    }
                    _ => None,
                }
            }

            Expr::Index { object, index, location } => {
                self.infer_expr(object);
                let index_type = self.infer_expr(index);
                if let Some(ty) = index_type {
                    if !TypeAnnotation::Number.matches(&ty) {
                        self.error(format!("Index must be a number but got {}", ty), location);
                    }
                }
                None
            }

            Expr::Call { callee, args, location } => {
                let arg_types: Vec<Option<TypeAnnotation>> =
                    args.iter().map(|arg| self.infer_expr(arg)).collect();
                self.check_call(callee, &arg_types, location)
            }

            Expr::If { condition, then_branch, else_branch, .. } => {
                self.infer_expr(condition);
                let then_type = self.check_block(then_branch);
                let else_type = else_branch.as_ref().map(|stmts| self.check_block(stmts));
                match (then_type, else_type) {
                    (Some(a), Some(Some(b))) if a == b => Some(a),
                    _ => None,
                }
            }
        }
    }

    fn infer_property(&mut self, prop: &Property) -> Option<TypeAnnotation> {
        match &prop.value {
            Some(expr) => self.infer_expr(expr),
            None => self.variables.get(&prop.key).and_then(|info| info.ty.clone()),
        }
    }

    fn expect_number(&mut self, op: &str, ty: &Option<TypeAnnotation>, location: &SourceLocation) {
        if let Some(ty) = ty {
            if !TypeAnnotation::Number.matches(ty) {
                self.error(format!("Operator '{}' expects numbers but got {}", op, ty), location);
            }
        }
    }

    /// The enum declaration an identifier is bound to
    fn enum_named_by(&self, expr: &Expr) -> Option<EnumDecl> {
        match expr {
            Expr::Identifier { name, .. } => self.enum_decl(name).cloned(),
            _ => None,
        }
    }

    fn variant_access(
        &mut self,
        decl: &EnumDecl,
        variant: &str,
        location: &SourceLocation,
    ) -> Option<TypeAnnotation> {
        match decl.variant(variant).map(|v| &v.kind) {
            Some(VariantKind::Unit) => Some(TypeAnnotation::Named(decl.name.clone())),
            Some(VariantKind::Tuple(_)) => Some(TypeAnnotation::Fn),
            Some(VariantKind::Struct(_)) => None,
            None => {
                self.error(format!("{} has no variant {}", decl.name, variant), location);
                None
            }
        }
    }

    fn check_call(
        &mut self,
        callee: &Expr,
        arg_types: &[Option<TypeAnnotation>],
        location: &SourceLocation,
    ) -> Option<TypeAnnotation> {
        // Tuple variant constructors: arity and payload types are declared
        if let Expr::Member { object, property, .. } = callee {
            if let Some(decl) = self.enum_named_by(object) {
                if let Some(VariantKind::Tuple(types)) = decl.variant(property).map(|v| &v.kind) {
                    self.check_arity(types.len(), arg_types.len(), location);
                    for (i, (expected, actual)) in types.iter().zip(arg_types).enumerate() {
                        if let Some(actual) = actual {
                            if !expected.matches(actual) {
                                self.error(
                                    format!(
                                        "Value {} of {}.{} expects {} but got {}",
                                        i, decl.name, property, expected, actual
                                    ),
                                    location,
                                );
                            }
                        }
                    }
                    return Some(TypeAnnotation::Named(decl.name.clone()));
                }
                return self.variant_access(&decl, property, location);
            }
        }

        if let Expr::Identifier { name, .. } = callee {
            let signature = match self.variables.get(name) {
                Some(VarInfo { binding: Binding::Function(signature), .. }) => Some(signature.clone()),
                _ => None,
            };
            if let Some(signature) = signature {
                if let Some(arity) = signature.arity {
                    self.check_arity(arity, arg_types.len(), location);
                }
                return signature.return_type;
            }
        }

        match self.infer_expr(callee) {
            Some(ty @ (TypeAnnotation::Number | TypeAnnotation::Bool | TypeAnnotation::Null | TypeAnnotation::Object)) => {
                self.error(format!("{} is not callable", ty), location);
                None
            }
            _ => None,
        }
    }

    fn check_arity(&mut self, expected: usize, got: usize, location: &SourceLocation) {
        if expected != got {
            self.error(format!("Expected {} arguments but got {}", expected, got), location);
        }
    }

    /// Strict struct literal check: every declared field exactly once, no
    /// unknown fields, and known field types must match
    fn check_struct_literal(
        &mut self,
        path: &Expr,
        props: &[Property],
        location: &SourceLocation,
    ) -> Option<TypeAnnotation> {
        let target = path.path_name().and_then(|name| self.literal_fields(&name));
        let Some((owner, type_name, declared)) = target else {
            for prop in props {
                self.infer_property(prop);
            }
            return None;
        };

        let mut seen = HashSet::new();
        for prop in props {
            let actual = self.infer_property(prop);
            if !seen.insert(prop.key.as_str()) {
                self.error(format!("Field {} specified more than once", prop.key), &prop.location);
                continue;
            }
            match declared.iter().find(|f| f.name == prop.key) {
                None => {
                    self.error(format!("Unknown field {} for {}", prop.key, owner), &prop.location)
                }
                Some(field) => {
                    if let Some(actual) = actual {
                        if !field.ty.matches(&actual) {
                            self.error(
                                format!(
                                    "Field {} of {} expects {} but got {}",
                                    field.name, owner, field.ty, actual
                                ),
                                &prop.location,
                            );
                        }
                    }
                }
            }
        }

        for field in &declared {
            if !seen.contains(field.name.as_str()) {
                self.error(format!("Missing field {} for {}", field.name, owner), location);
            }
        }

        Some(TypeAnnotation::Named(type_name))
    }

    /// Declared fields for a struct literal path: `Point` or `Shape.Circle`.
    /// Returns (owner used in messages, resulting type name, fields).
    fn literal_fields(&self, path: &str) -> Option<(String, String, Vec<FieldDecl>)> {
        match path.split_once('.') {
            None => self
                .struct_decl(path)
                .map(|decl| (decl.name.clone(), decl.name.clone(), decl.fields.clone())),
            Some((enum_name, variant)) => {
                let decl = self.enum_decl(enum_name)?;
                match decl.variant(variant).map(|v| &v.kind) {
                    Some(VariantKind::Struct(fields)) => {
                        Some((path.to_string(), decl.name.clone(), fields.clone()))
                    }
                    _ => None,
                }
            }
        }
    }

    /// Push a new scope onto the scope stack
    fn push_scope(&mut self) {
        self.scope_stack.push(self.variables.clone());
    }

    /// Pop a scope from the scope stack
    fn pop_scope(&mut self) {
        if let Some(prev_scope) = self.scope_stack.pop() {
            self.variables = prev_scope;
        }
    }
}

/// Collects every name assigned with `name = value`, in any scope
fn collect_reassigned(stmts: &[Stmt], names: &mut HashSet<String>) {
    for stmt in stmts {
        match stmt {
            Stmt::Let { value: Some(expr), .. }
            | Stmt::Return { value: Some(expr), .. }
            | Stmt::Expr(expr) => collect_reassigned_in(expr, names),
            Stmt::FnDecl(decl) => collect_reassigned(&decl.body, names),
            _ => {}
        }
    }
}

fn collect_reassigned_in(expr: &Expr, names: &mut HashSet<String>) {
    match expr {
        Expr::Number(_) | Expr::Identifier { .. } => {}
        Expr::Object(props) => {
            for value in props.iter().filter_map(|prop| prop.value.as_ref()) {
                collect_reassigned_in(value, names);
            }
        }
        Expr::StructLiteral { path, fields, .. } => {
            collect_reassigned_in(path, names);
            for value in fields.iter().filter_map(|prop| prop.value.as_ref()) {
                collect_reassigned_in(value, names);
            }
        }
        Expr::Binary { left, right, .. } => {
            collect_reassigned_in(left, names);
            collect_reassigned_in(right, names);
        }
        Expr::Unary { operand, .. } => collect_reassigned_in(operand, names),
        Expr::Assign { target, value, .. } => {
            match target.as_ref() {
                Expr::Identifier { name, .. } => {
                    names.insert(name.clone());
                }
                other => collect_reassigned_in(other, names),
            }
            collect_reassigned_in(value, names);
        }
        Expr::Member { object, .. } => collect_reassigned_in(object, names),
        Expr::Index { object, index, .. } => {
            collect_reassigned_in(object, names);
            collect_reassigned_in(index, names);
        }
        Expr::Call { callee, args, .. } => {
            collect_reassigned_in(callee, names);
            for arg in args {
                collect_reassigned_in(arg, names);
            }
        }
        Expr::If { condition, then_branch, else_branch, .. } => {
            collect_reassigned_in(condition, names);
            collect_reassigned(then_branch, names);
            if let Some(else_branch) = else_branch {
                collect_reassigned(else_branch, names);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn check(source: &str) -> Result<(), Vec<SelveError>> {
        let program = parse_source(source).expect("parse failed");
        TypeChecker::new().check(&program)
    }

    fn messages(source: &str) -> Vec<String> {
        match check(source) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.into_iter().map(|e| e.message).collect(),
        }
    }

    #[test]
    fn test_simple_type_inference() {
        let mut checker = TypeChecker::new();
        let program = parse_source("let x: number = 42; let y = x + 1;").unwrap();

        assert!(checker.check(&program).is_ok());
        assert_eq!(checker.variables.get("x").and_then(|i| i.ty.clone()), Some(TypeAnnotation::Number));
        assert_eq!(checker.variables.get("y").and_then(|i| i.ty.clone()), Some(TypeAnnotation::Number));
    }

    #[test]
    fn test_type_mismatch() {
        assert_eq!(
            messages("let x: number = true;"),
            vec!["Type mismatch: x declared as number but assigned bool"]
        );
        assert_eq!(
            messages("const f: bool = 1 < 2; let g: number = 1 == 1;"),
            vec!["Type mismatch: g declared as number but assigned bool"]
        );
    }

    #[test]
    fn test_untyped_code_is_accepted() {
        assert!(check("fn add(a, b) { a + b }\nlet r = add(1, 2);\nr = true;").is_ok());
    }

    #[test]
    fn test_typed_assignment() {
        assert_eq!(
            messages("let n: number = 1;\nn = 2;\nn = null;"),
            vec!["Cannot assign null to n of type number"]
        );
    }

    #[test]
    fn test_strict_struct_literals() {
        let source = "struct Point { x: number, y: number }\n\
                      let a = Point { x: 1 };\n\
                      let b = Point { x: 1, y: 2, z: 3 };\n\
                      let c = Point { x: true, y: 2 };";
        assert_eq!(
            messages(source),
            vec![
                "Missing field y for Point",
                "Unknown field z for Point",
                "Field x of Point expects number but got bool",
            ]
        );
    }

    #[test]
    fn test_struct_variant_literals_and_types() {
        let source = "enum Shape { Empty, Pair(number, number), Circle { radius: number } }\n\
                      let c: Shape = Shape.Circle { radius: 3 };\n\
                      let p: Shape = Shape.Pair(1, 2);\n\
                      let e: Shape = Shape.Empty;\n\
                      let bad = Shape.Circle { r: 3 };";
        assert_eq!(
            messages(source),
            vec!["Unknown field r for Shape.Circle", "Missing field radius for Shape.Circle"]
        );
    }

    #[test]
    fn test_unknown_types() {
        assert_eq!(
            messages("struct Line { from: Point }\nlet x: Ghost = 1;"),
            vec!["Unknown type Point", "Unknown type Ghost"]
        );
    }

    #[test]
    fn test_declarations_are_collected_first() {
        assert!(check("let p: Point = Point { x: 1 };\nstruct Point { x: number }").is_ok());
    }

    #[test]
    fn test_arithmetic_on_non_numbers() {
        assert_eq!(messages("let x = true + 1;"), vec!["Operator '+' expects numbers but got bool"]);
        assert_eq!(messages("let y = -{ a: 1 };"), vec!["Operator '-' expects numbers but got object"]);
    }

    #[test]
    fn test_call_arity() {
        assert_eq!(
            messages("fn add(a, b) { a + b }\nadd(1);\ntime(1);\nprint(1, 2, 3);"),
            vec!["Expected 2 arguments but got 1", "Expected 0 arguments but got 1"]
        );
    }

    #[test]
    fn test_enum_variants() {
        let source = "enum Shape { Empty, Pair(number, bool) }\n\
                      let a = Shape.Missing;\n\
                      let b = Shape.Pair(1, 2);";
        assert_eq!(
            messages(source),
            vec!["Shape has no variant Missing", "Value 1 of Shape.Pair expects bool but got number"]
        );
    }

    #[test]
    fn test_reassigned_bindings_have_unknown_type() {
        assert!(check("let r = null;\nr = 5;\nr + 1").is_ok());
        assert!(check("let flag = true; if flag { flag = 1 } flag * 2").is_ok());
        assert!(check("let n = null;\nfn set() { n = 3 }\nset();\nn - 1").is_ok());
        assert!(check("let f = time;\nf = fn_two;\nfn fn_two(a, b) { a }\nf(1, 2)").is_ok());

        // Annotated and constant bindings keep what is known about them
        assert_eq!(
            messages("let t: bool = true;\nt = false;\nt + 1"),
            vec!["Operator '+' expects numbers but got bool"]
        );
        assert_eq!(messages("const c = true;\nc * 2"), vec!["Operator '*' expects numbers but got bool"]);
    }

    #[test]
    fn test_nested_declarations_are_scoped() {
        let source = "struct P { b: number }\n\
                      fn f() { struct P { a: number } P { a: 1 } }\n\
                      let q = P { b: 2 };\n\
                      q.b";
        assert!(check(source).is_ok());

        let source = "fn add(a, b) { a + b }\nfn f() { let add = time; add() }\nf()";
        assert!(check(source).is_ok());

        // Outside the function the outer declarations are back in force
        assert_eq!(
            messages("fn add(a, b) { a + b }\nfn f() { let add = time; add() }\nadd(1)"),
            vec!["Expected 2 arguments but got 1"]
        );
    }

    #[test]
    fn test_copied_bindings_keep_their_declaration() {
        assert_eq!(
            messages("fn g() { let now = time; now(1) }"),
            vec!["Expected 0 arguments but got 1"]
        );
        assert_eq!(
            messages("struct P { a: number }\nlet Q = P;\nlet q = Q { b: 1 };"),
            vec!["Unknown field b for P", "Missing field a for P"]
        );
    }

    #[test]
    fn test_struct_field_types_flow_through_members() {
        let source = "struct Point { x: number, y: number }\n\
                      let p = Point { x: 1, y: 2 };\n\
                      let s: bool = p.x;\n\
                      p.z;";
        assert_eq!(
            messages(source),
            vec![
                "Type mismatch: s declared as bool but assigned number",
                "Property z does not exist on Point",
            ]
        );
    }
}
