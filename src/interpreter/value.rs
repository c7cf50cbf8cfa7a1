// File: src/interpreter/value.rs
//
// Runtime value types for the Selve language.
// Defines every value that can be represented and manipulated at runtime,
// along with type matching against annotations and display formatting.

use super::environment::EnvRef;
use crate::ast::{EnumDecl, FieldDecl, FnDecl, StructDecl, TypeAnnotation, VariantKind};
use crate::errors::{Result, SelveError, SourceLocation};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Insertion ordered field storage for objects, structs and struct-like variants
pub type Fields = IndexMap<String, Value>;

/// A user defined function together with the scope it closes over
pub struct Function {
    pub decl: FnDecl,
    pub closure: EnvRef,
}

impl fmt::Debug for Function {
    // The closure scope usually contains this function, so it is left out
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Function({}({}))", self.decl.name, self.decl.params.join(", "))
    }
}

/// Data carried by an enum value
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Unit,
    Tuple(Vec<Value>),
    Struct(Fields),
}

/// Runtime values in the Selve interpreter
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// 64-bit signed integer, the only numeric type
    Number(i64),
    /// Anonymous object from `{ key: value }`
    Object(Fields),
    /// Struct instance; fields are kept in declaration order
    Struct { decl: Rc<StructDecl>, fields: Fields },
    /// Enum value of one of the declared variants
    Enum { decl: Rc<EnumDecl>, variant: String, payload: Payload },
    Function(Rc<Function>),
    /// Native (built-in) function by name
    NativeFunction(String),
    StructDef(Rc<StructDecl>),
    EnumDef(Rc<EnumDecl>),
    /// `Enum.Variant` for a tuple-like variant, awaiting its arguments
    VariantConstructor { decl: Rc<EnumDecl>, variant: String },
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Struct { decl: da, fields: fa }, Value::Struct { decl: db, fields: fb }) => {
                da.name == db.name && fa == fb
            }
            (
                Value::Enum { decl: da, variant: va, payload: pa },
                Value::Enum { decl: db, variant: vb, payload: pb },
            ) => da.name == db.name && va == vb && pa == pb,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => a == b,
            (Value::StructDef(a), Value::StructDef(b)) => Rc::ptr_eq(a, b),
            (Value::EnumDef(a), Value::EnumDef(b)) => Rc::ptr_eq(a, b),
            (
                Value::VariantConstructor { decl: da, variant: va },
                Value::VariantConstructor { decl: db, variant: vb },
            ) => Rc::ptr_eq(da, db) && va == vb,
            _ => false,
        }
    }
}

impl Value {
    /// Name of this value's type, as written in annotations
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Number(_) => "number".to_string(),
            Value::Object(_) => "object".to_string(),
            Value::Struct { decl, .. } => decl.name.clone(),
            Value::Enum { decl, .. } => decl.name.clone(),
            Value::Function(_) | Value::NativeFunction(_) | Value::VariantConstructor { .. } => {
                "fn".to_string()
            }
            Value::StructDef(_) => "struct".to_string(),
            Value::EnumDef(_) => "enum".to_string(),
        }
    }

    /// `null` and `false` are falsy, everything else is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::NativeFunction(_) | Value::VariantConstructor { .. }
        )
    }

    /// Whether this value may be stored where `ty` is declared
    pub fn matches_type(&self, ty: &TypeAnnotation) -> bool {
        match ty {
            TypeAnnotation::Any => true,
            TypeAnnotation::Number => matches!(self, Value::Number(_)),
            TypeAnnotation::Bool => matches!(self, Value::Bool(_)),
            TypeAnnotation::Null => matches!(self, Value::Null),
            TypeAnnotation::Object => matches!(self, Value::Object(_)),
            TypeAnnotation::Fn => self.is_callable(),
            TypeAnnotation::Named(name) => match self {
                Value::Struct { decl, .. } => &decl.name == name,
                Value::Enum { decl, .. } => &decl.name == name,
                _ => false,
            },
        }
    }

    /// Read `self.name`
    pub fn get_member(&self, name: &str) -> Result<Value> {
        let fields = match self {
            Value::Object(fields) => fields,
            Value::Struct { fields, .. } => fields,
            Value::Enum { payload: Payload::Struct(fields), .. } => fields,
            other => {
                return Err(SelveError::type_error(
                    format!("Cannot read property {} of {}", name, other.type_name()),
                    SourceLocation::unknown(),
                ))
            }
        };

        fields.get(name).cloned().ok_or_else(|| {
            SelveError::runtime_error(
                format!("Property {} does not exist on {}", name, self.describe()),
                SourceLocation::unknown(),
            )
        })
    }

    /// Mutable access to `self.name`, used when assigning through nested paths
    pub fn member_mut(&mut self, name: &str) -> Result<&mut Value> {
        let description = self.describe();
        let fields = match self {
            Value::Object(fields) => fields,
            Value::Struct { fields, .. } => fields,
            Value::Enum { payload: Payload::Struct(fields), .. } => fields,
            other => {
                return Err(SelveError::type_error(
                    format!("Cannot read property {} of {}", name, other.type_name()),
                    SourceLocation::unknown(),
                ))
            }
        };
        fields.get_mut(name).ok_or_else(|| {
            SelveError::runtime_error(
                format!("Property {} does not exist on {}", name, description),
                SourceLocation::unknown(),
            )
        })
    }

    /// Write `self.name = value`
    ///
    /// Objects accept new keys. Structs and struct-like variants only accept
    /// declared fields, and the value must match the declared field type.
    pub fn set_member(&mut self, name: &str, value: Value) -> Result<()> {
        match self {
            Value::Object(fields) => {
                fields.insert(name.to_string(), value);
                Ok(())
            }
            Value::Struct { decl, fields } => {
                let field = decl.field(name).ok_or_else(|| {
                    SelveError::runtime_error(
                        format!("Unknown field {} for {}", name, decl.name),
                        SourceLocation::unknown(),
                    )
                })?;
                check_field(&decl.name, field, &value)?;
                fields.insert(name.to_string(), value);
                Ok(())
            }
            Value::Enum { decl, variant, payload: Payload::Struct(fields) } => {
                let owner = format!("{}.{}", decl.name, variant);
                let declared = match decl.variant(variant).map(|v| &v.kind) {
                    Some(VariantKind::Struct(declared)) => declared,
                    _ => {
                        return Err(SelveError::runtime_error(
                            format!("Unknown variant {}", owner),
                            SourceLocation::unknown(),
                        ))
                    }
                };
                let field = declared.iter().find(|f| f.name == name).ok_or_else(|| {
                    SelveError::runtime_error(
                        format!("Unknown field {} for {}", name, owner),
                        SourceLocation::unknown(),
                    )
                })?;
                check_field(&owner, field, &value)?;
                fields.insert(name.to_string(), value);
                Ok(())
            }
            other => Err(SelveError::type_error(
                format!("Cannot set property {} on {}", name, other.type_name()),
                SourceLocation::unknown(),
            )),
        }
    }

    fn index_error(&self, index: i64, len: usize) -> SelveError {
        SelveError::runtime_error(
            format!("Index {} is out of bounds for {} with {} values", index, self.describe(), len),
            SourceLocation::unknown(),
        )
    }

    fn not_indexable(&self) -> SelveError {
        SelveError::type_error(
            format!("Cannot index into {}", self.type_name()),
            SourceLocation::unknown(),
        )
    }

    /// Read `self[index]` on a tuple-like variant
    pub fn get_index(&self, index: i64) -> Result<Value> {
        match self {
            Value::Enum { payload: Payload::Tuple(items), .. } => usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| self.index_error(index, items.len())),
            _ => Err(self.not_indexable()),
        }
    }

    fn tuple_items_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Enum { payload: Payload::Tuple(items), .. } => Some(items),
            _ => None,
        }
    }

    /// Mutable access to `self[index]`
    pub fn index_mut(&mut self, index: i64) -> Result<&mut Value> {
        let len = match &*self {
            Value::Enum { payload: Payload::Tuple(items), .. } => items.len(),
            _ => return Err(self.not_indexable()),
        };
        let Some(slot) = usize::try_from(index).ok().filter(|i| *i < len) else {
            return Err(self.index_error(index, len));
        };
        self.tuple_items_mut().and_then(|items| items.get_mut(slot)).ok_or_else(|| {
            SelveError::runtime_error("Value is not a tuple variant", SourceLocation::unknown())
        })
    }

    /// Write `self[index] = value`, keeping the declared payload type
    pub fn set_index(&mut self, index: i64, value: Value) -> Result<()> {
        let expected = match self {
            Value::Enum { decl, variant, .. } => match decl.variant(variant).map(|v| &v.kind) {
                Some(VariantKind::Tuple(types)) => usize::try_from(index)
                    .ok()
                    .and_then(|i| types.get(i))
                    .map(|ty| (ty.clone(), format!("{}.{}", decl.name, variant))),
                _ => None,
            },
            _ => None,
        };
        if let Some((ty, owner)) = expected {
            if !value.matches_type(&ty) {
                return Err(SelveError::type_error(
                    format!(
                        "Value {} of {} expects {} but got {}",
                        index,
                        owner,
                        ty,
                        value.type_name()
                    ),
                    SourceLocation::unknown(),
                ));
            }
        }
        *self.index_mut(index)? = value;
        Ok(())
    }

    /// Short description used in error messages (`Point`, `Shape.Circle`, `object`)
    pub fn describe(&self) -> String {
        match self {
            Value::Enum { decl, variant, .. } => format!("{}.{}", decl.name, variant),
            other => other.type_name(),
        }
    }
}

/// Checks a value against a declared field, naming the owner in the error
pub fn check_field(owner: &str, field: &FieldDecl, value: &Value) -> Result<()> {
    if value.matches_type(&field.ty) {
        Ok(())
    } else {
        Err(SelveError::type_error(
            format!(
                "Field {} of {} expects {} but got {}",
                field.name,
                owner,
                field.ty,
                value.type_name()
            ),
            SourceLocation::unknown(),
        ))
    }
}

fn write_fields(f: &mut fmt::Formatter, fields: &Fields) -> fmt::Result {
    if fields.is_empty() {
        return write!(f, "{{}}");
    }
    write!(f, "{{ ")?;
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}: {}", key, value)?;
    }
    write!(f, " }}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Object(fields) => write_fields(f, fields),
            Value::Struct { decl, fields } => {
                write!(f, "{} ", decl.name)?;
                write_fields(f, fields)
            }
            Value::Enum { decl, variant, payload } => {
                write!(f, "{}.{}", decl.name, variant)?;
                match payload {
                    Payload::Unit => Ok(()),
                    Payload::Tuple(items) => {
                        let items: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                        write!(f, "({})", items.join(", "))
                    }
                    Payload::Struct(fields) => {
                        write!(f, " ")?;
                        write_fields(f, fields)
                    }
                }
            }
            Value::Function(func) => {
                write!(f, "<fn {}({})>", func.decl.name, func.decl.params.join(", "))
            }
            Value::NativeFunction(name) => write!(f, "<native fn {}>", name),
            Value::StructDef(decl) => write!(f, "<struct {}>", decl.name),
            Value::EnumDef(decl) => write!(f, "<enum {}>", decl.name),
            Value::VariantConstructor { decl, variant } => {
                write!(f, "<variant {}.{}>", decl.name, variant)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::VariantDecl;

    fn point_decl() -> Rc<StructDecl> {
        Rc::new(StructDecl {
            name: "Point".into(),
            fields: vec![
                FieldDecl { name: "x".into(), ty: TypeAnnotation::Number },
                FieldDecl { name: "y".into(), ty: TypeAnnotation::Number },
            ],
        })
    }

    fn shape_decl() -> Rc<EnumDecl> {
        Rc::new(EnumDecl {
            name: "Shape".into(),
            variants: vec![
                VariantDecl { name: "Empty".into(), kind: VariantKind::Unit },
                VariantDecl {
                    name: "Pair".into(),
                    kind: VariantKind::Tuple(vec![TypeAnnotation::Number, TypeAnnotation::Bool]),
                },
            ],
        })
    }

    fn point(x: i64, y: i64) -> Value {
        let mut fields = Fields::new();
        fields.insert("x".into(), Value::Number(x));
        fields.insert("y".into(), Value::Number(y));
        Value::Struct { decl: point_decl(), fields }
    }

    #[test]
    fn display_forms() {
        let mut obj = Fields::new();
        obj.insert("a".into(), Value::Number(1));
        obj.insert("b".into(), Value::Bool(false));
        assert_eq!(Value::Object(obj).to_string(), "{ a: 1, b: false }");
        assert_eq!(Value::Object(Fields::new()).to_string(), "{}");
        assert_eq!(point(1, 2).to_string(), "Point { x: 1, y: 2 }");

        let pair = Value::Enum {
            decl: shape_decl(),
            variant: "Pair".into(),
            payload: Payload::Tuple(vec![Value::Number(1), Value::Bool(true)]),
        };
        assert_eq!(pair.to_string(), "Shape.Pair(1, true)");
        let empty = Value::Enum { decl: shape_decl(), variant: "Empty".into(), payload: Payload::Unit };
        assert_eq!(empty.to_string(), "Shape.Empty");
        assert_eq!(Value::NativeFunction("print".into()).to_string(), "<native fn print>");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Number(0).is_truthy());
        assert!(Value::Object(Fields::new()).is_truthy());
    }

    #[test]
    fn named_types_match_instances() {
        let p = point(0, 0);
        assert!(p.matches_type(&TypeAnnotation::Named("Point".into())));
        assert!(!p.matches_type(&TypeAnnotation::Named("Other".into())));
        assert!(p.matches_type(&TypeAnnotation::Any));
        assert!(!Value::Number(1).matches_type(&TypeAnnotation::Bool));
    }

    #[test]
    fn struct_fields_are_strict() {
        let mut p = point(1, 2);
        p.set_member("x", Value::Number(9)).unwrap();
        assert_eq!(p.get_member("x").unwrap(), Value::Number(9));

        let err = p.set_member("x", Value::Bool(true)).unwrap_err();
        assert_eq!(err.message, "Field x of Point expects number but got bool");

        let err = p.set_member("z", Value::Number(0)).unwrap_err();
        assert_eq!(err.message, "Unknown field z for Point");
    }

    #[test]
    fn tuple_payload_indexing() {
        let mut pair = Value::Enum {
            decl: shape_decl(),
            variant: "Pair".into(),
            payload: Payload::Tuple(vec![Value::Number(1), Value::Bool(true)]),
        };
        assert_eq!(pair.get_index(1).unwrap(), Value::Bool(true));
        assert!(pair.get_index(2).is_err());
        assert!(pair.get_index(-1).is_err());
        pair.set_index(0, Value::Number(7)).unwrap();
        assert_eq!(pair.get_index(0).unwrap(), Value::Number(7));
        assert!(pair.set_index(0, Value::Null).is_err());
    }

    #[test]
    fn structural_equality() {
        assert_eq!(point(1, 2), point(1, 2));
        assert_ne!(point(1, 2), point(2, 1));
        assert_ne!(Value::Number(0), Value::Bool(false));
    }
}
