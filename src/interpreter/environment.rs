// File: src/interpreter/environment.rs
//
// Lexical scoping environment for variable management in the Selve interpreter.
// Each scope links to its parent; closures keep a shared handle to the scope
// they were declared in so they observe later declarations and can recurse.

use super::value::Value;
use crate::ast::TypeAnnotation;
use crate::errors::{Result, SelveError, SourceLocation};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Shared handle to a scope
pub type EnvRef = Rc<RefCell<Environment>>;

/// Variable storage for one scope
///
/// Lookups and assignments walk from this scope out through its parents.
/// Declarations always land in this scope, so inner scopes shadow outer ones.
///
/// # Examples
///
/// ```ignore
/// let global = Environment::new().into_ref();
/// global.borrow_mut().declare("x", Value::Number(10), false)?;
///
/// let mut inner = Environment::with_parent(global.clone());
/// inner.declare("x", Value::Number(20), false)?;       // shadows outer x
/// assert_eq!(inner.lookup("x")?, Value::Number(20));
/// assert_eq!(global.borrow().lookup("x")?, Value::Number(10));
/// ```
#[derive(Debug, Default)]
pub struct Environment {
    parent: Option<EnvRef>,
    variables: HashMap<String, Value>,
    constants: HashSet<String>,
    types: HashMap<String, TypeAnnotation>,
    /// Declaration order, for listing bindings
    order: Vec<String>,
}

impl Environment {
    /// Create a new root scope with no bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a child scope of `parent`
    pub fn with_parent(parent: EnvRef) -> Self {
        Self { parent: Some(parent), ..Self::default() }
    }

    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Declare a variable in this scope
    pub fn declare(&mut self, name: &str, value: Value, constant: bool) -> Result<Value> {
        if self.variables.contains_key(name) {
            return Err(SelveError::runtime_error(
                format!("Cannot redeclare variable {}", name),
                SourceLocation::unknown(),
            ));
        }

        if constant {
            self.constants.insert(name.to_owned());
        }

        self.order.push(name.to_owned());
        self.variables.insert(name.to_owned(), value.clone());
        Ok(value)
    }

    /// Declare a variable whose later assignments must keep matching `ty`
    pub fn declare_typed(
        &mut self,
        name: &str,
        value: Value,
        constant: bool,
        ty: TypeAnnotation,
    ) -> Result<Value> {
        let value = self.declare(name, value, constant)?;
        self.types.insert(name.to_owned(), ty);
        Ok(value)
    }

    /// Set an existing variable, searching from inner to outer scopes
    pub fn assign(&mut self, name: &str, value: Value) -> Result<Value> {
        if self.variables.contains_key(name) {
            if self.constants.contains(name) {
                return Err(SelveError::runtime_error(
                    format!("Cannot reassign to constant {}", name),
                    SourceLocation::unknown(),
                ));
            }
            if let Some(ty) = self.types.get(name) {
                if !value.matches_type(ty) {
                    return Err(SelveError::type_error(
                        format!("Cannot assign {} to {} of type {}", value.type_name(), name, ty),
                        SourceLocation::unknown(),
                    ));
                }
            }
            self.variables.insert(name.to_owned(), value.clone());
            return Ok(value);
        }

        match &self.parent {
            Some(parent) => parent.borrow_mut().assign(name, value),
            None => Err(SelveError::undefined_variable(name, SourceLocation::unknown())),
        }
    }

    /// Get a variable from the environment, searching from inner to outer scopes
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.variables.get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.borrow().get(name))
    }

    /// Like `get`, but a miss is an undefined variable error
    pub fn lookup(&self, name: &str) -> Result<Value> {
        self.get(name)
            .ok_or_else(|| SelveError::undefined_variable(name, SourceLocation::unknown()))
    }

    /// Mutate an existing variable in place using a closure
    ///
    /// Used for member and index assignment (`p.x = 1`), where the binding
    /// itself stays the same but part of its value changes.
    pub fn mutate<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Value) -> Result<()>,
    {
        if let Some(value) = self.variables.get_mut(name) {
            return f(value);
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().mutate(name, f),
            None => Err(SelveError::undefined_variable(name, SourceLocation::unknown())),
        }
    }

    /// All names visible from this scope, innermost first
    pub fn visible_names(&self) -> Vec<String> {
        let mut names = self.order.clone();
        if let Some(parent) = &self.parent {
            for name in parent.borrow().visible_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Bindings declared directly in this scope, in declaration order
    pub fn bindings(&self) -> Vec<(String, Value, bool)> {
        self.order
            .iter()
            .filter_map(|name| {
                self.variables
                    .get(name)
                    .map(|value| (name.clone(), value.clone(), self.constants.contains(name)))
            })
            .collect()
    }
}
