use std::fmt;

/// Minimal, dependency-free flag set. A hand-rolled equivalent of the
/// `bitflags` crate's API surface, kept local since this is the only flag
/// type in the crate.
macro_rules! bitflags_like {
    (
        $(#[$meta:meta])*
        struct $name:ident: $repr:ty {
            $($flag:ident = $value:expr),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name($repr);

        impl $name {
            $(pub const $flag: $name = $name($value);)*

            pub const fn empty() -> Self {
                $name(0)
            }

            pub fn with(self, other: $name) -> Self {
                $name(self.0 | other.0)
            }

            pub fn without(self, other: $name) -> Self {
                $name(self.0 & !other.0)
            }

            pub fn has(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn bits(self) -> $repr {
                self.0
            }
        }
    };
}

/// Scalar class, independent of the nullable/unsigned/ordering flags
/// carried by `TypeCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeClass {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    BigInteger,
    BigDecimal,
    String,
}

impl TypeClass {
    pub fn is_numeric(self) -> bool {
        !matches!(self, TypeClass::Boolean | TypeClass::String)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            TypeClass::UInt8 | TypeClass::UInt16 | TypeClass::UInt32 | TypeClass::UInt64
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, TypeClass::Float | TypeClass::Double)
    }

    /// Bit width for fixed-width integer/float classes; `None` for
    /// classes without a fixed width (boolean, bignum, string).
    pub fn width(self) -> Option<u32> {
        use TypeClass::*;
        match self {
            Int8 | UInt8 => Some(8),
            Int16 | UInt16 => Some(16),
            Int32 | UInt32 | Float => Some(32),
            Int64 | UInt64 | Double => Some(64),
            Boolean | BigInteger | BigDecimal | String => None,
        }
    }

    /// The narrowest signed integer class that can represent every value
    /// of this unsigned class. Identity for already-signed classes.
    pub fn widen_unsigned(self) -> TypeClass {
        match self {
            TypeClass::UInt8 => TypeClass::Int16,
            TypeClass::UInt16 => TypeClass::Int32,
            TypeClass::UInt32 => TypeClass::Int64,
            TypeClass::UInt64 => TypeClass::BigInteger,
            other => other,
        }
    }
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

bitflags_like! {
    /// Flags carried alongside a `TypeClass`.
    ///
    /// `nullable` marks that `null` is an observable value of this type;
    /// `unsigned`/`descending`/`null_low` are ordering/representation
    /// hints consumed by downstream projection and window code, mirrored
    /// from the teacher's `ColumnDef` flags (`nullable`, `clustering_key`).
    struct TypeCode: u8 {
        NULLABLE = 0b0001,
        UNSIGNED = 0b0010,
        DESCENDING = 0b0100,
        NULL_LOW = 0b1000,
    }
}

/// A scalar value type: boolean, a signed/unsigned integer width, a
/// float/double, a big-integer, a big-decimal, or a UTF-8 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicType {
    pub clazz: TypeClass,
    pub code: TypeCode,
}

impl BasicType {
    pub const fn new(clazz: TypeClass) -> Self {
        Self {
            clazz,
            code: TypeCode::empty(),
        }
    }

    pub fn nullable(self) -> Self {
        Self {
            code: self.code.with(TypeCode::NULLABLE),
            ..self
        }
    }

    pub fn non_nullable(self) -> Self {
        Self {
            code: self.code.without(TypeCode::NULLABLE),
            ..self
        }
    }

    pub fn is_nullable(self) -> bool {
        self.code.has(TypeCode::NULLABLE)
    }

    pub fn descending(self) -> Self {
        Self {
            code: self.code.with(TypeCode::DESCENDING),
            ..self
        }
    }

    pub fn is_descending(self) -> bool {
        self.code.has(TypeCode::DESCENDING)
    }

    pub fn null_low(self) -> Self {
        Self {
            code: self.code.with(TypeCode::NULL_LOW),
            ..self
        }
    }

    pub fn is_null_low(self) -> bool {
        self.code.has(TypeCode::NULL_LOW)
    }

    pub fn is_numeric(self) -> bool {
        self.clazz.is_numeric()
    }

    /// Strips ordering/nullability flags: two basic types with the same
    /// `clazz` compare equal here regardless of how they'll be rendered.
    pub fn erase_flags(self) -> Self {
        Self {
            clazz: self.clazz,
            code: TypeCode::empty(),
        }
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.clazz)?;
        if self.is_nullable() {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// Which family of widening is requested by `common_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommonTypeOp {
    /// Comparison (`op >= 0` in the source): lenient, may collapse two
    /// otherwise-incompatible types to `String`.
    Comparison,
    /// Arithmetic (`op == -1` in the source): strict, rejects a
    /// non-numeric operand paired with a numeric one.
    Arithmetic,
}

/// Widens two basic types to a common type under `op`'s leniency.
///
/// Numeric widening follows a fixed lattice: big-decimal dominates
/// everything; big-integer dominates every other integer/float; floating
/// classes widen an integer counterpart to the float width that can hold
/// it (`<=32` bits -> `Float`, wider -> `Double`); unsigned integers widen
/// to the narrowest wider signed class before the integer-width
/// comparison; otherwise the wider fixed-width integer wins.
pub fn common_type(a: BasicType, b: BasicType, op: CommonTypeOp) -> Option<BasicType> {
    let nullable = a.is_nullable() || b.is_nullable();
    if a.erase_flags() == b.erase_flags() {
        let mut r = a;
        if nullable {
            r = r.nullable();
        }
        return Some(r);
    }
    if a.clazz.is_numeric() && b.clazz.is_numeric() {
        let mut r = common_numeric(a.clazz, b.clazz)?;
        if nullable {
            r = r.nullable();
        }
        return Some(r);
    }
    match op {
        CommonTypeOp::Arithmetic => None,
        CommonTypeOp::Comparison => {
            let mut r = BasicType::new(TypeClass::String);
            if nullable {
                r = r.nullable();
            }
            Some(r)
        }
    }
}

fn common_numeric(a: TypeClass, b: TypeClass) -> Option<BasicType> {
    if a == TypeClass::BigDecimal || b == TypeClass::BigDecimal {
        return Some(BasicType::new(TypeClass::BigDecimal));
    }
    if a == TypeClass::BigInteger || b == TypeClass::BigInteger {
        return Some(BasicType::new(TypeClass::BigInteger));
    }
    let a_w = a.widen_unsigned();
    let b_w = b.widen_unsigned();
    if a_w == TypeClass::BigInteger || b_w == TypeClass::BigInteger {
        return Some(BasicType::new(TypeClass::BigInteger));
    }
    if a_w.is_floating() || b_w.is_floating() {
        let width = a_w.width()?.max(b_w.width()?);
        return Some(BasicType::new(if width <= 32 {
            TypeClass::Float
        } else {
            TypeClass::Double
        }));
    }
    let width = a_w.width()?.max(b_w.width()?);
    Some(BasicType::new(match width {
        8 => TypeClass::Int8,
        16 => TypeClass::Int16,
        32 => TypeClass::Int32,
        _ => TypeClass::Int64,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_widens_to_next_signed() {
        let r = common_numeric(TypeClass::UInt8, TypeClass::Int8).unwrap();
        assert_eq!(r.clazz, TypeClass::Int16);
    }

    #[test]
    fn bigdecimal_dominates() {
        let r = common_numeric(TypeClass::BigDecimal, TypeClass::Int64).unwrap();
        assert_eq!(r.clazz, TypeClass::BigDecimal);
    }

    #[test]
    fn integer_and_float_widen_by_width() {
        let r = common_numeric(TypeClass::Int32, TypeClass::Float).unwrap();
        assert_eq!(r.clazz, TypeClass::Float);
        let r = common_numeric(TypeClass::Int64, TypeClass::Float).unwrap();
        assert_eq!(r.clazz, TypeClass::Double);
    }

    #[test]
    fn comparison_collapses_to_string() {
        let a = BasicType::new(TypeClass::Boolean);
        let b = BasicType::new(TypeClass::String);
        let r = common_type(a, b, CommonTypeOp::Comparison).unwrap();
        assert_eq!(r.clazz, TypeClass::String);
    }

    #[test]
    fn arithmetic_rejects_non_numeric() {
        let a = BasicType::new(TypeClass::Boolean);
        let b = BasicType::new(TypeClass::Int32);
        assert!(common_type(a, b, CommonTypeOp::Arithmetic).is_none());
    }

    #[test]
    fn nullable_propagates() {
        let a = BasicType::new(TypeClass::Int32).nullable();
        let b = BasicType::new(TypeClass::Int32);
        let r = common_type(a, b, CommonTypeOp::Arithmetic).unwrap();
        assert!(r.is_nullable());
    }
}
