//! The type system (component B): `BasicType`, the `null` type, the `any`
//! type, nullable tuple types with projection, and relation types with
//! cardinality.

pub mod basic;
pub mod relation;
pub mod tuple;

pub use basic::{common_type, BasicType, CommonTypeOp, TypeClass, TypeCode};
pub use relation::{Cardinality, RelationType};
pub use tuple::{Column, TupleType};

use std::fmt;
use std::rc::Rc;

/// A value's type: the null singleton, the dynamic `any` parameter type,
/// a scalar, a row schema, or a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// The singleton type of the literal `null`. Always nullable; widens
    /// with any `T` to `T`'s nullable form.
    Null,
    /// Runtime-dynamic parameter type; widens with any `T` to `T`'s
    /// nullable form, and requires a runtime conversion at evaluation.
    Any,
    Basic(BasicType),
    Tuple(Rc<TupleType>),
    Relation(Rc<RelationType>),
}

impl Type {
    pub fn basic(clazz: TypeClass) -> Self {
        Type::Basic(BasicType::new(clazz))
    }

    pub fn tuple(t: TupleType) -> Self {
        Type::Tuple(Rc::new(t))
    }

    pub fn relation(t: RelationType) -> Self {
        Type::Relation(Rc::new(t))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Type::Null)
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    pub fn as_basic(&self) -> Option<BasicType> {
        match self {
            Type::Basic(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&Rc<TupleType>> {
        match self {
            Type::Tuple(t) => Some(t),
            _ => None,
        }
    }

    /// Whether a `null` value can be observed as a value of this type.
    pub fn is_nullable(&self) -> bool {
        match self {
            Type::Null | Type::Any => true,
            Type::Basic(b) => b.is_nullable(),
            Type::Tuple(_) | Type::Relation(_) => false,
        }
    }

    /// This type with its nullable flag set (idempotent on `Null`/`Any`).
    pub fn nullable(&self) -> Type {
        match self {
            Type::Null => Type::Null,
            Type::Any => Type::Any,
            Type::Basic(b) => Type::Basic(b.nullable()),
            other => other.clone(),
        }
    }

    /// Widens `self` and `other` to a common type under `op`'s leniency.
    /// `Null`/`Any` paired with any `T` widen to `T.nullable()`, per
    /// spec.md §3.
    pub fn common_type(&self, other: &Type, op: CommonTypeOp) -> Option<Type> {
        match (self, other) {
            (Type::Null, t) | (t, Type::Null) => Some(t.nullable()),
            (Type::Any, t) | (t, Type::Any) => Some(t.nullable()),
            (Type::Basic(a), Type::Basic(b)) => common_type(*a, *b, op).map(Type::Basic),
            _ => None,
        }
    }

    /// Component A: writes this type's canonical key encoding into
    /// `enc`. `Tuple`/`Relation` delegate to their own `encode_key`,
    /// which go through `enc.encode_entity` since they're `Rc`-shared —
    /// the same row schema referenced from many `ColumnExpr`s should
    /// only be written out once per key.
    pub fn encode_key(&self, enc: &mut crate::keyenc::KeyEncoder) -> crate::error::Result<()> {
        use crate::keyenc::*;
        match self {
            Type::Null => enc.write_u8(*TAG_TYPE_NULL),
            Type::Any => enc.write_u8(*TAG_TYPE_ANY),
            Type::Basic(b) => {
                enc.write_u8(*TAG_TYPE_BASIC);
                enc.write_u8(b.clazz as u8);
                enc.write_u8(b.code.bits());
            }
            Type::Tuple(t) => t.encode_key(enc)?,
            Type::Relation(r) => r.encode_key(enc)?,
        }
        Ok(())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Null => write!(f, "null"),
            Type::Any => write!(f, "any"),
            Type::Basic(b) => write!(f, "{b}"),
            Type::Tuple(t) => write!(f, "{{{t}}}"),
            Type::Relation(r) => write!(f, "{r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_widens_to_nullable_other() {
        let i = Type::basic(TypeClass::Int32);
        let r = Type::Null.common_type(&i, CommonTypeOp::Arithmetic).unwrap();
        assert!(r.is_nullable());
        assert_eq!(r.as_basic().unwrap().clazz, TypeClass::Int32);
    }

    #[test]
    fn any_widens_to_nullable_other() {
        let i = Type::basic(TypeClass::Int32);
        let r = i.common_type(&Type::Any, CommonTypeOp::Arithmetic).unwrap();
        assert!(r.is_nullable());
    }
}
