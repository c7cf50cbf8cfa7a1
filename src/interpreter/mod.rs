// File: src/interpreter/mod.rs
//
// Tree-walking interpreter for the Selve language.
// Executes Selve programs by traversing the Abstract Syntax Tree (AST).
//
// The interpreter keeps a chain of scopes for variables and declarations,
// evaluates expressions to produce values, and executes statements in order.
// It supports:
// - Variable binding, typed bindings and reassignment
// - Functions as closures over their declaring scope
// - Strict struct literals and enum variants (unit, tuple and struct-like)
// - Member, index and nested assignment
// - if/else expressions and early return
//
// Every failure is reported as a SelveError. `return` travels through the
// error channel as a ControlFlow signal until the enclosing call catches it.

mod control_flow;
mod environment;
mod native_functions;
mod value;

pub use environment::{EnvRef, Environment};
pub use native_functions::NATIVE_NAMES;
pub use value::{Fields, Function, Payload, Value};

use control_flow::{ControlFlow, Flow};
use value::check_field;

use crate::ast::{EnumDecl, Expr, FieldDecl, Program, Property, Stmt, StructDecl, TypeAnnotation, VariantKind};
use crate::errors::{find_closest_match, ErrorKind, Result, SelveError, SourceLocation};
use std::io::Write;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// Nesting limit for user function calls before the interpreter gives up.
/// Sized for a 2 MiB thread stack in unoptimized builds; callers that run
/// on a larger stack raise it with `set_max_call_depth`.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 32;

/// Constants bound in the global scope besides the natives
const GLOBAL_CONSTANTS: &[&str] = &["true", "false", "null"];

/// What a struct literal path resolved to
enum LiteralTarget {
    Struct(Rc<StructDecl>),
    Variant(Rc<EnumDecl>, String),
}

/// One step of an assignment path such as `a.b[0].c`
enum Accessor {
    Member(String),
    Index(i64),
}

/// Main interpreter that executes Selve programs
pub struct Interpreter {
    env: EnvRef,
    globals: EnvRef,
    output: Option<Arc<Mutex<Vec<u8>>>>,
    pub source_file: Option<String>,
    pub source_lines: Vec<String>,
    call_stack: Vec<String>, // Names of the functions being called, innermost last
    max_call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new interpreter with only the built-in globals
    pub fn new() -> Self {
        let globals = Environment::new().into_ref();
        let mut interpreter = Interpreter {
            env: globals.clone(),
            globals,
            output: None,
            source_file: None,
            source_lines: Vec::new(),
            call_stack: Vec::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        };

        interpreter.register_builtins();

        interpreter
    }

    fn register_builtins(&mut self) {
        let builtins = [
            ("true", Value::Bool(true)),
            ("false", Value::Bool(false)),
            ("null", Value::Null),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .chain(NATIVE_NAMES.iter().map(|name| (name.to_string(), Value::NativeFunction(name.to_string()))));

        let mut globals = self.globals.borrow_mut();
        for (name, value) in builtins {
            // The global scope is fresh, so these names cannot collide
            let _ = globals.declare(&name, value, true);
        }
    }

    /// Redirects `print` into a shared buffer instead of stdout
    pub fn set_output(&mut self, output: Arc<Mutex<Vec<u8>>>) {
        self.output = Some(output);
    }

    /// Sets the source file name and content for error reporting
    pub fn set_source(&mut self, file: String, content: &str) {
        self.source_file = Some(file);
        self.source_lines = content.lines().map(|s| s.to_string()).collect();
    }

    /// Appends another chunk of source under `file`, as the REPL does for
    /// each input, and returns the line number the chunk starts at
    pub fn append_source(&mut self, file: &str, content: &str) -> usize {
        self.source_file = Some(file.to_string());
        let first_line = self.source_lines.len() + 1;
        self.source_lines.extend(content.lines().map(str::to_string));
        first_line
    }

    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_call_depth = depth;
    }

    /// Runs a program in the global scope and returns the value of its last
    /// statement. Bindings persist across calls, which the REPL relies on.
    pub fn eval_program(&mut self, program: &Program) -> Result<Value> {
        log::debug!("evaluating {} top-level statements", program.body.len());
        self.env = self.globals.clone();
        self.call_stack.clear();
        self.eval_statements(&program.body).map_err(|flow| self.decorate(flow.into_error()))
    }

    /// Looks up a variable visible from the global scope
    pub fn get_var(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name)
    }

    /// User-defined global bindings as (name, value, is_constant), in declaration order
    pub fn global_bindings(&self) -> Vec<(String, Value, bool)> {
        self.globals
            .borrow()
            .bindings()
            .into_iter()
            .filter(|(name, ..)| {
                !GLOBAL_CONSTANTS.contains(&name.as_str()) && !NATIVE_NAMES.contains(&name.as_str())
            })
            .collect()
    }

    /// Gets the source line at a given line number (1-indexed)
    fn get_source_line(&self, line: usize) -> Option<String> {
        if line > 0 && line <= self.source_lines.len() {
            Some(self.source_lines[line - 1].clone())
        } else {
            None
        }
    }

    /// Attaches the file name and offending source line to an error
    pub(crate) fn decorate(&self, mut err: SelveError) -> SelveError {
        if !err.location.is_known() {
            return err;
        }
        if err.location.file.is_none() {
            err.location.file = self.source_file.clone();
        }
        if err.source_line.is_none() {
            if let Some(line) = self.get_source_line(err.location.line) {
                err = err.with_source(line);
            }
        }
        err
    }

    pub(crate) fn write_output(&self, msg: &str) {
        if let Some(out) = &self.output {
            if let Ok(mut buffer) = out.lock() {
                let _ = writeln!(buffer, "{}", msg);
            }
        } else {
            println!("{}", msg);
        }
    }

    /// Evaluates statements in order, yielding the value of the last one that
    /// produced a value (comments produce none)
    fn eval_statements(&mut self, stmts: &[Stmt]) -> Flow<Value> {
        let mut last = Value::Null;
        for stmt in stmts {
            if let Some(value) = self.eval_stmt(stmt)? {
                last = value;
            }
        }
        Ok(last)
    }

    /// Runs `f` with `scope` as the current scope, restoring the previous one
    /// afterwards even when `f` fails
    fn with_scope<T>(&mut self, scope: EnvRef, f: impl FnOnce(&mut Self) -> Flow<T>) -> Flow<T> {
        let saved = std::mem::replace(&mut self.env, scope);
        let result = f(self);
        self.env = saved;
        result
    }

    fn eval_block(&mut self, stmts: &[Stmt]) -> Flow<Value> {
        let scope = Environment::with_parent(self.env.clone()).into_ref();
        self.with_scope(scope, |interp| interp.eval_statements(stmts))
    }

    /// Evaluates a single statement
    fn eval_stmt(&mut self, stmt: &Stmt) -> Flow<Option<Value>> {
        match stmt {
            Stmt::Comment(_) => Ok(None),
            Stmt::Let { name, constant, type_annotation, value, location } => {
                Ok(Some(self.eval_let(name, *constant, type_annotation.as_ref(), value.as_ref(), location)?))
            }
            Stmt::FnDecl(decl) => {
                log::trace!("declare fn {}({})", decl.name, decl.params.join(", "));
                let func = Value::Function(Rc::new(Function {
                    decl: decl.clone(),
                    closure: self.env.clone(),
                }));
                let declared = self.env.borrow_mut().declare(&decl.name, func, true);
                Ok(Some(declared.map_err(|e| e.at(&decl.location))?))
            }
            Stmt::StructDecl(decl) => {
                log::trace!("declare struct {}", decl.name);
                let def = Value::StructDef(Rc::new(decl.clone()));
                Ok(Some(self.env.borrow_mut().declare(&decl.name, def, true)?))
            }
            Stmt::EnumDecl(decl) => {
                log::trace!("declare enum {}", decl.name);
                let def = Value::EnumDef(Rc::new(decl.clone()));
                Ok(Some(self.env.borrow_mut().declare(&decl.name, def, true)?))
            }
            Stmt::Return { value, location } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Null,
                };
                Err(ControlFlow::Return { value, location: location.clone() })
            }
            Stmt::Expr(expr) => Ok(Some(self.eval_expr(expr)?)),
        }
    }

    fn eval_let(
        &mut self,
        name: &str,
        constant: bool,
        type_annotation: Option<&TypeAnnotation>,
        value: Option<&Expr>,
        location: &SourceLocation,
    ) -> Flow<Value> {
        let value = match value {
            Some(expr) => self.eval_expr(expr)?,
            None => Value::Null,
        };

        let declared = match type_annotation {
            Some(ty) => {
                self.check_annotation(name, ty, &value, location)?;
                self.env.borrow_mut().declare_typed(name, value, constant, ty.clone())
            }
            None => self.env.borrow_mut().declare(name, value, constant),
        };
        Ok(declared.map_err(|e| e.at(location))?)
    }

    /// Checks the initial value of a typed binding
    fn check_annotation(
        &self,
        name: &str,
        ty: &TypeAnnotation,
        value: &Value,
        location: &SourceLocation,
    ) -> Result<()> {
        if let TypeAnnotation::Named(type_name) = ty {
            let known = matches!(
                self.env.borrow().get(type_name),
                Some(Value::StructDef(_)) | Some(Value::EnumDef(_))
            );
            if !known {
                return Err(SelveError::type_error(
                    format!("Unknown type {}", type_name),
                    location.clone(),
                ));
            }
        }

        if value.matches_type(ty) {
            Ok(())
        } else {
            Err(SelveError::type_error(
                format!(
                    "Type mismatch: {} declared as {} but assigned {}",
                    name,
                    ty,
                    value.type_name()
                ),
                location.clone(),
            ))
        }
    }

    /// Evaluates an expression and returns its value
    fn eval_expr(&mut self, expr: &Expr) -> Flow<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Identifier { name, location } => Ok(self.lookup(name, location)?),
            Expr::Object(props) => self.eval_object(props),
            Expr::StructLiteral { path, fields, location } => {
                self.eval_struct_literal(path, fields, location)
            }
            Expr::Binary { left, op, right, location } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                Ok(apply_binary(op, &left, &right).map_err(|e| e.at(location))?)
            }
            Expr::Unary { op, operand, location } => {
                let operand = self.eval_expr(operand)?;
                Ok(apply_unary(op, &operand).map_err(|e| e.at(location))?)
            }
            Expr::Assign { target, value, location } => {
                let value = self.eval_expr(value)?;
                self.assign_to(target, value.clone(), location)?;
                Ok(value)
            }
            Expr::Member { object, property, location } => {
                let object = self.eval_expr(object)?;
                Ok(self.member(&object, property, location)?)
            }
            Expr::Index { object, index, location } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_index(index, location)?;
                Ok(object.get_index(index).map_err(|e| e.at(location))?)
            }
            Expr::Call { callee, args, location } => self.eval_call(callee, args, location),
            Expr::If { condition, then_branch, else_branch, .. } => {
                self.eval_if(condition, then_branch, else_branch.as_deref())
            }
        }
    }

    // The arms below live outside eval_expr to keep its frame small: every
    // level of a recursive Selve call passes through eval_expr several times.

    fn eval_object(&mut self, props: &[Property]) -> Flow<Value> {
        let mut fields = Fields::new();
        for prop in props {
            let value = self.eval_property(prop)?;
            fields.insert(prop.key.clone(), value);
        }
        Ok(Value::Object(fields))
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], location: &SourceLocation) -> Flow<Value> {
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval_expr(arg)?);
        }
        let callee = self.eval_expr(callee)?;
        self.call_value(callee, arg_values, location)
    }

    fn eval_if(
        &mut self,
        condition: &Expr,
        then_branch: &[Stmt],
        else_branch: Option<&[Stmt]>,
    ) -> Flow<Value> {
        if self.eval_expr(condition)?.is_truthy() {
            self.eval_block(then_branch)
        } else if let Some(else_branch) = else_branch {
            self.eval_block(else_branch)
        } else {
            Ok(Value::Null)
        }
    }

    /// Resolves a name, suggesting a close visible name on a miss
    fn lookup(&self, name: &str, location: &SourceLocation) -> Result<Value> {
        let env = self.env.borrow();
        env.lookup(name).map_err(|err| {
            let err = err.at(location);
            match find_closest_match(name, &env.visible_names()) {
                Some(closest) => err.with_suggestion(closest.to_string()),
                None => err,
            }
        })
    }

    fn eval_property(&mut self, prop: &Property) -> Flow<Value> {
        match &prop.value {
            Some(expr) => self.eval_expr(expr),
            // `{ foo }` reads the variable foo
            None => Ok(self.lookup(&prop.key, &prop.location)?),
        }
    }

    fn eval_index(&mut self, index: &Expr, location: &SourceLocation) -> Flow<i64> {
        match self.eval_expr(index)? {
            Value::Number(i) => Ok(i),
            other => Err(SelveError::type_error(
                format!("Index must be a number but got {}", other.type_name()),
                location.clone(),
            )
            .into()),
        }
    }

    /// `object.property`, including `Enum.Variant`
    fn member(&self, object: &Value, property: &str, location: &SourceLocation) -> Result<Value> {
        match object {
            Value::EnumDef(decl) => enum_variant(decl, property, location),
            other => other.get_member(property).map_err(|e| e.at(location)),
        }
    }

    fn eval_struct_literal(
        &mut self,
        path: &Expr,
        props: &[Property],
        location: &SourceLocation,
    ) -> Flow<Value> {
        match self.literal_target(path)? {
            LiteralTarget::Struct(decl) => {
                let fields = self.build_fields(&decl.name, &decl.fields, props, location)?;
                Ok(Value::Struct { decl, fields })
            }
            LiteralTarget::Variant(decl, variant) => {
                let owner = format!("{}.{}", decl.name, variant);
                let declared = match decl.variant(&variant).map(|v| &v.kind) {
                    Some(VariantKind::Struct(declared)) => declared.clone(),
                    _ => Vec::new(),
                };
                let fields = self.build_fields(&owner, &declared, props, location)?;
                Ok(Value::Enum { decl, variant, payload: Payload::Struct(fields) })
            }
        }
    }

    /// Resolves the path in front of a struct literal body
    fn literal_target(&mut self, path: &Expr) -> Flow<LiteralTarget> {
        let value = match path {
            Expr::Member { object, property, location } => {
                let base = self.eval_expr(object)?;
                if let Value::EnumDef(decl) = &base {
                    return match decl.variant(property).map(|v| &v.kind) {
                        Some(VariantKind::Struct(_)) => {
                            Ok(LiteralTarget::Variant(decl.clone(), property.clone()))
                        }
                        Some(_) => Err(SelveError::type_error(
                            format!("{}.{} is not a struct-like variant", decl.name, property),
                            location.clone(),
                        )
                        .into()),
                        None => Err(no_such_variant(decl, property, location).into()),
                    };
                }
                self.member(&base, property, location)?
            }
            other => self.eval_expr(other)?,
        };

        match value {
            Value::StructDef(decl) => Ok(LiteralTarget::Struct(decl)),
            other => Err(SelveError::type_error(
                format!(
                    "{} is not a struct",
                    path.path_name().unwrap_or_else(|| other.describe())
                ),
                path.location(),
            )
            .into()),
        }
    }

    /// Evaluates the fields of a struct literal against the declaration.
    /// Every declared field must be given exactly once; the result keeps
    /// declaration order.
    fn build_fields(
        &mut self,
        owner: &str,
        declared: &[FieldDecl],
        props: &[Property],
        location: &SourceLocation,
    ) -> Flow<Fields> {
        let mut given = Fields::new();
        for prop in props {
            let field = declared.iter().find(|f| f.name == prop.key).ok_or_else(|| {
                SelveError::runtime_error(
                    format!("Unknown field {} for {}", prop.key, owner),
                    prop.location.clone(),
                )
            })?;
            if given.contains_key(&prop.key) {
                return Err(SelveError::runtime_error(
                    format!("Field {} specified more than once", prop.key),
                    prop.location.clone(),
                )
                .into());
            }
            let value = self.eval_property(prop)?;
            check_field(owner, field, &value).map_err(|e| e.at(&prop.location))?;
            given.insert(prop.key.clone(), value);
        }

        let mut fields = Fields::new();
        for field in declared {
            match given.swap_remove(&field.name) {
                Some(value) => {
                    fields.insert(field.name.clone(), value);
                }
                None => {
                    return Err(SelveError::runtime_error(
                        format!("Missing field {} for {}", field.name, owner),
                        location.clone(),
                    )
                    .into())
                }
            }
        }
        Ok(fields)
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>, location: &SourceLocation) -> Flow<Value> {
        match callee {
            Value::Function(func) => self.call_function(&func, args, location),
            Value::NativeFunction(name) => {
                log::trace!("call native {}({} args)", name, args.len());
                Ok(native_functions::call_native_function(self, &name, &args)
                    .map_err(|e| e.at(location))?)
            }
            Value::VariantConstructor { decl, variant } => {
                Ok(construct_variant(decl, variant, args).map_err(|e| e.at(location))?)
            }
            other => Err(SelveError::type_error(
                format!("{} is not callable", other.describe()),
                location.clone(),
            )
            .into()),
        }
    }

    /// Calls a user function: binds the parameters in a child of the captured
    /// scope and runs the body there
    fn call_function(
        &mut self,
        func: &Rc<Function>,
        args: Vec<Value>,
        location: &SourceLocation,
    ) -> Flow<Value> {
        let decl = &func.decl;
        check_arity(decl.params.len(), args.len(), location)?;

        if self.call_stack.len() >= self.max_call_depth {
            return Err(SelveError::runtime_error(
                format!("Maximum call depth of {} exceeded", self.max_call_depth),
                location.clone(),
            )
            .with_note(format!("while calling {}", decl.name))
            .into());
        }

        log::trace!("call {}({} args) at depth {}", decl.name, args.len(), self.call_stack.len() + 1);

        let mut scope = Environment::with_parent(func.closure.clone());
        for (param, arg) in decl.params.iter().zip(args) {
            scope.declare(param, arg, false).map_err(|e| e.at(&decl.location))?;
        }

        self.call_stack.push(decl.name.clone());
        let result = self.with_scope(scope.into_ref(), |interp| interp.eval_statements(&decl.body));
        self.call_stack.pop();

        match result {
            Err(ControlFlow::Return { value, .. }) => Ok(value),
            other => other,
        }
    }

    /// Assigns to an identifier, or to a member/index path rooted at one
    fn assign_to(&mut self, target: &Expr, value: Value, location: &SourceLocation) -> Flow<()> {
        let mut accessors = Vec::new();
        let root = self.collect_path(target, &mut accessors)?;

        let Some((last, parents)) = accessors.split_last() else {
            self.env.borrow_mut().assign(root, value).map_err(|e| e.at(location))?;
            return Ok(());
        };

        self.env
            .borrow_mut()
            .mutate(root, |slot| {
                let mut current = slot;
                for accessor in parents {
                    current = match accessor {
                        Accessor::Member(name) => current.member_mut(name)?,
                        Accessor::Index(i) => current.index_mut(*i)?,
                    };
                }
                match last {
                    Accessor::Member(name) => current.set_member(name, value),
                    Accessor::Index(i) => current.set_index(*i, value),
                }
            })
            .map_err(|e| e.at(location))?;
        Ok(())
    }

    /// Walks an assignment target down to its root variable, evaluating index
    /// expressions left to right
    fn collect_path<'a>(&mut self, expr: &'a Expr, accessors: &mut Vec<Accessor>) -> Flow<&'a str> {
        match expr {
            Expr::Identifier { name, .. } => Ok(name.as_str()),
            Expr::Member { object, property, .. } => {
                let root = self.collect_path(object, accessors)?;
                accessors.push(Accessor::Member(property.clone()));
                Ok(root)
            }
            Expr::Index { object, index, location } => {
                let root = self.collect_path(object, accessors)?;
                let index = self.eval_index(index, location)?;
                accessors.push(Accessor::Index(index));
                Ok(root)
            }
            other => {
                Err(SelveError::runtime_error("Invalid assignment target", other.location()).into())
            }
        }
    }
}

fn check_arity(expected: usize, got: usize, location: &SourceLocation) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(SelveError::runtime_error(
            format!("Expected {} arguments but got {}", expected, got),
            location.clone(),
        ))
    }
}

fn no_such_variant(decl: &EnumDecl, name: &str, location: &SourceLocation) -> SelveError {
    let names: Vec<String> = decl.variants.iter().map(|v| v.name.clone()).collect();
    let err = SelveError::runtime_error(format!("{} has no variant {}", decl.name, name), location.clone());
    match find_closest_match(name, &names) {
        Some(closest) => err.with_suggestion(closest.to_string()),
        None => err,
    }
}

/// `Enum.Variant`: unit variants are values, tuple variants are constructors
fn enum_variant(decl: &Rc<EnumDecl>, name: &str, location: &SourceLocation) -> Result<Value> {
    let variant = decl.variant(name).ok_or_else(|| no_such_variant(decl, name, location))?;
    match &variant.kind {
        VariantKind::Unit => Ok(Value::Enum {
            decl: decl.clone(),
            variant: name.to_string(),
            payload: Payload::Unit,
        }),
        VariantKind::Tuple(_) => {
            Ok(Value::VariantConstructor { decl: decl.clone(), variant: name.to_string() })
        }
        VariantKind::Struct(_) => Err(SelveError::runtime_error(
            format!("{}.{} is a struct-like variant", decl.name, name),
            location.clone(),
        )
        .with_help(format!("construct it with {}.{} {{ ... }}", decl.name, name))),
    }
}

/// Calls a tuple variant constructor, checking arity and payload types
fn construct_variant(decl: Rc<EnumDecl>, variant: String, args: Vec<Value>) -> Result<Value> {
    let types = match decl.variant(&variant).map(|v| &v.kind) {
        Some(VariantKind::Tuple(types)) => types,
        _ => {
            return Err(SelveError::runtime_error(
                format!("{}.{} is not a tuple-like variant", decl.name, variant),
                SourceLocation::unknown(),
            ))
        }
    };
    check_arity(types.len(), args.len(), &SourceLocation::unknown())?;

    for (i, (ty, value)) in types.iter().zip(&args).enumerate() {
        if !value.matches_type(ty) {
            return Err(SelveError::type_error(
                format!(
                    "Value {} of {}.{} expects {} but got {}",
                    i,
                    decl.name,
                    variant,
                    ty,
                    value.type_name()
                ),
                SourceLocation::unknown(),
            ));
        }
    }

    Ok(Value::Enum { decl, variant, payload: Payload::Tuple(args) })
}

fn overflow(a: i64, op: &str, b: i64) -> SelveError {
    SelveError::runtime_error(
        format!("Arithmetic overflow in {} {} {}", a, op, b),
        SourceLocation::unknown(),
    )
}

/// Applies a binary operator. Equality works on any values; everything else
/// needs two numbers.
fn apply_binary(op: &str, left: &Value, right: &Value) -> Result<Value> {
    match op {
        "==" => return Ok(Value::Bool(left == right)),
        "!=" => return Ok(Value::Bool(left != right)),
        _ => {}
    }

    let (a, b) = match (left, right) {
        (Value::Number(a), Value::Number(b)) => (*a, *b),
        _ => {
            return Err(SelveError::type_error(
                format!(
                    "Cannot apply '{}' to {} and {}",
                    op,
                    left.type_name(),
                    right.type_name()
                ),
                SourceLocation::unknown(),
            ))
        }
    };

    let checked = match op {
        "+" => a.checked_add(b),
        "-" => a.checked_sub(b),
        "*" => a.checked_mul(b),
        "/" | "%" if b == 0 => {
            return Err(SelveError::new(
                ErrorKind::DivisionByZero,
                "Division by zero",
                SourceLocation::unknown(),
            ))
        }
        "/" => a.checked_div(b),
        "%" => a.checked_rem(b),
        "<" => return Ok(Value::Bool(a < b)),
        ">" => return Ok(Value::Bool(a > b)),
        "<=" => return Ok(Value::Bool(a <= b)),
        ">=" => return Ok(Value::Bool(a >= b)),
        other => {
            return Err(SelveError::new(
                ErrorKind::InvalidOperation,
                format!("Unknown operator {}", other),
                SourceLocation::unknown(),
            ))
        }
    };

    checked.map(Value::Number).ok_or_else(|| overflow(a, op, b))
}

fn apply_unary(op: &str, operand: &Value) -> Result<Value> {
    match (op, operand) {
        ("!", value) => Ok(Value::Bool(!value.is_truthy())),
        ("-", Value::Number(n)) => n.checked_neg().map(Value::Number).ok_or_else(|| {
            SelveError::runtime_error(format!("Arithmetic overflow in -{}", n), SourceLocation::unknown())
        }),
        ("-", other) => Err(SelveError::type_error(
            format!("Cannot negate {}", other.type_name()),
            SourceLocation::unknown(),
        )),
        (other, _) => Err(SelveError::new(
            ErrorKind::InvalidOperation,
            format!("Unknown operator {}", other),
            SourceLocation::unknown(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn run(interp: &mut Interpreter, source: &str) -> Result<Value> {
        let program = parse_source(source)?;
        interp.eval_program(&program)
    }

    #[test]
    fn arithmetic_is_checked() {
        assert_eq!(apply_binary("+", &Value::Number(2), &Value::Number(3)).unwrap(), Value::Number(5));
        let err = apply_binary("/", &Value::Number(1), &Value::Number(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
        let err = apply_binary("*", &Value::Number(i64::MAX), &Value::Number(2)).unwrap_err();
        assert!(err.message.starts_with("Arithmetic overflow"));
        let err = apply_binary("%", &Value::Number(i64::MIN), &Value::Number(-1)).unwrap_err();
        assert!(err.message.starts_with("Arithmetic overflow"));
    }

    #[test]
    fn comparisons_need_numbers() {
        let err = apply_binary("<", &Value::Bool(true), &Value::Number(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(err.message, "Cannot apply '<' to bool and number");
        assert_eq!(apply_binary("==", &Value::Null, &Value::Bool(false)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn scope_is_restored_after_an_error() {
        let mut interp = Interpreter::new();
        assert!(run(&mut interp, "if true { let inner = 1; 1 / 0 }").is_err());
        assert!(Rc::ptr_eq(&interp.env, &interp.globals));
        assert!(interp.get_var("inner").is_none());
        assert_eq!(run(&mut interp, "let after = 2; after").unwrap(), Value::Number(2));
    }

    #[test]
    fn call_depth_is_limited() {
        let mut interp = Interpreter::new();
        interp.set_max_call_depth(16);
        let err = run(&mut interp, "fn down(n) { down(n + 1) }\ndown(0)").unwrap_err();
        assert_eq!(err.message, "Maximum call depth of 16 exceeded");
        assert!(interp.call_stack.is_empty());
    }

    #[test]
    fn runaway_recursion_stops_at_the_default_depth() {
        let mut interp = Interpreter::new();
        let source = "fn down(n) { if n == 0 { 0 } else { down(n - 1) + 1 } }\ndown(1000)";
        let err = run(&mut interp, source).unwrap_err();
        assert_eq!(err.message, format!("Maximum call depth of {} exceeded", DEFAULT_MAX_CALL_DEPTH));
        assert_eq!(run(&mut interp, "down(20)").unwrap(), Value::Number(20));
    }

    #[test]
    fn appended_sources_keep_their_line_numbers() {
        let mut interp = Interpreter::new();
        assert_eq!(interp.append_source("<repl>", "fn boom() {\n  1 / 0\n}\n"), 1);
        assert_eq!(interp.append_source("<repl>", "boom()\n"), 4);
        assert_eq!(interp.get_source_line(2).as_deref(), Some("  1 / 0"));
        assert_eq!(interp.get_source_line(4).as_deref(), Some("boom()"));
    }

    #[test]
    fn global_bindings_skip_builtins() {
        let mut interp = Interpreter::new();
        run(&mut interp, "let a = 1; const b = 2;").unwrap();
        let names: Vec<(String, bool)> =
            interp.global_bindings().into_iter().map(|(name, _, constant)| (name, constant)).collect();
        assert_eq!(names, vec![("a".to_string(), false), ("b".to_string(), true)]);
    }

    #[test]
    fn errors_are_decorated_with_source() {
        let mut interp = Interpreter::new();
        let source = "let a = 1;\nlet b = a / 0;";
        interp.set_source("demo.sv".to_string(), source);
        let err = run(&mut interp, source).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
        assert_eq!(err.location.file.as_deref(), Some("demo.sv"));
        assert_eq!(err.source_line.as_deref(), Some("let b = a / 0;"));
    }
}
