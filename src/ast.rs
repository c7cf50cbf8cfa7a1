// File: src/ast.rs
//
// Abstract Syntax Tree (AST) definitions for the Selve language.
// Defines the structure of parsed Selve programs.
//
// Expressions (Expr) represent values and computations, while Statements (Stmt)
// represent declarations and actions. Nodes that can fail at run time keep the
// SourceLocation of the token that produced them.

use crate::errors::SourceLocation;
use serde::Serialize;
use std::fmt;

/// A parsed source unit: the top level statements in order
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub body: Vec<Stmt>,
}

/// Type annotations for variables, struct fields and variant payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeAnnotation {
    Number,
    Bool,
    Null,
    Object,
    Fn,
    Any,
    /// A user declared struct or enum
    Named(String),
}

impl TypeAnnotation {
    pub fn from_name(name: &str) -> Self {
        match name {
            "number" => TypeAnnotation::Number,
            "bool" => TypeAnnotation::Bool,
            "null" => TypeAnnotation::Null,
            "object" => TypeAnnotation::Object,
            "fn" => TypeAnnotation::Fn,
            "any" => TypeAnnotation::Any,
            other => TypeAnnotation::Named(other.to_string()),
        }
    }

    /// Returns true if a value of type `other` may be stored where `self` is expected
    pub fn matches(&self, other: &TypeAnnotation) -> bool {
        match (self, other) {
            (TypeAnnotation::Any, _) | (_, TypeAnnotation::Any) => true,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeAnnotation::Number => write!(f, "number"),
            TypeAnnotation::Bool => write!(f, "bool"),
            TypeAnnotation::Null => write!(f, "null"),
            TypeAnnotation::Object => write!(f, "object"),
            TypeAnnotation::Fn => write!(f, "fn"),
            TypeAnnotation::Any => write!(f, "any"),
            TypeAnnotation::Named(name) => write!(f, "{}", name),
        }
    }
}

/// `key: value` inside an object or struct literal. `value` is None for the
/// `{ key }` shorthand, which reads the variable of the same name.
#[derive(Debug, Clone, Serialize)]
pub struct Property {
    pub key: String,
    pub value: Option<Expr>,
    pub location: SourceLocation,
}

/// Declared field of a struct or of a struct-like enum variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeAnnotation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

impl StructDecl {
    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum VariantKind {
    Unit,
    Tuple(Vec<TypeAnnotation>),
    Struct(Vec<FieldDecl>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantDecl {
    pub name: String,
    pub kind: VariantKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDecl {
    pub name: String,
    pub variants: Vec<VariantDecl>,
}

impl EnumDecl {
    pub fn variant(&self, name: &str) -> Option<&VariantDecl> {
        self.variants.iter().find(|v| v.name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// Represents an expression in Selve - something that evaluates to a value
#[derive(Debug, Clone, Serialize)]
pub enum Expr {
    Number(i64),
    Identifier {
        name: String,
        location: SourceLocation,
    },
    /// `{ x: 1, y }`
    Object(Vec<Property>),
    /// `Point { x: 1 }` or `Shape.Circle { radius: 2 }`
    StructLiteral {
        path: Box<Expr>,
        fields: Vec<Property>,
        location: SourceLocation,
    },
    Binary {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        location: SourceLocation,
    },
    /// `object.property`
    Member {
        object: Box<Expr>,
        property: String,
        location: SourceLocation,
    },
    /// `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        location: SourceLocation,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    If {
        condition: Box<Expr>,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
        location: SourceLocation,
    },
}

impl Expr {
    /// Returns the source location of this expression, or unknown for literals
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::Number(_) | Expr::Object(_) => SourceLocation::unknown(),
            Expr::Identifier { location, .. }
            | Expr::StructLiteral { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Unary { location, .. }
            | Expr::Assign { location, .. }
            | Expr::Member { location, .. }
            | Expr::Index { location, .. }
            | Expr::Call { location, .. }
            | Expr::If { location, .. } => location.clone(),
        }
    }

    /// True for identifiers and `.`-chains of identifiers, the only
    /// expressions that may name a struct or a struct-like variant
    pub fn is_path(&self) -> bool {
        match self {
            Expr::Identifier { .. } => true,
            Expr::Member { object, .. } => object.is_path(),
            _ => false,
        }
    }

    /// Renders a path expression back to source form (`Shape.Circle`)
    pub fn path_name(&self) -> Option<String> {
        match self {
            Expr::Identifier { name, .. } => Some(name.clone()),
            Expr::Member { object, property, .. } => {
                object.path_name().map(|base| format!("{}.{}", base, property))
            }
            _ => None,
        }
    }
}

/// Represents a statement in Selve - a declaration or an evaluated expression
#[derive(Debug, Clone, Serialize)]
pub enum Stmt {
    Comment(String),
    Let {
        name: String,
        constant: bool,
        type_annotation: Option<TypeAnnotation>,
        value: Option<Expr>,
        location: SourceLocation,
    },
    FnDecl(FnDecl),
    StructDecl(StructDecl),
    EnumDecl(EnumDecl),
    Return {
        value: Option<Expr>,
        location: SourceLocation,
    },
    Expr(Expr),
}
