use crate::types::{BasicType, Type, TypeClass};
use rust_decimal::Decimal;
use std::rc::Rc;

/// Runtime value carried by a `ConstantExpr`. Bit-pattern equality for
/// floats (not IEEE equality) so `ConstValue: Eq + Hash` can hold, which
/// `KeyEncoder` relies on to guarantee equal expressions encode
/// identically (spec.md §8's `encode(e1) == encode(e2) <=> e1.equals(e2)`).
#[derive(Debug, Clone)]
pub enum ConstValue {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    BigInteger(i128),
    BigDecimal(Decimal),
    Str(Rc<str>),
    /// A folded `a..b` literal (see `RangeExpr::fold`). Not one of
    /// spec.md §3's scalar `BasicType` classes — ranges don't participate
    /// in `common_type` widening, they only ever appear on the right-hand
    /// side of `InExpr`/membership tests, so they're carried as a
    /// constant value without a matching `TypeClass`.
    Range(Rc<(Option<ConstValue>, Option<ConstValue>)>),
}

impl PartialEq for ConstValue {
    fn eq(&self, other: &Self) -> bool {
        use ConstValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int8(a), Int8(b)) => a == b,
            (Int16(a), Int16(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (UInt8(a), UInt8(b)) => a == b,
            (UInt16(a), UInt16(b)) => a == b,
            (UInt32(a), UInt32(b)) => a == b,
            (UInt64(a), UInt64(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (BigInteger(a), BigInteger(b)) => a == b,
            (BigDecimal(a), BigDecimal(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Range(a), Range(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for ConstValue {}

impl ConstValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ConstValue::Null)
    }

    pub fn is_zero(&self) -> bool {
        use ConstValue::*;
        match self {
            Int8(v) => *v == 0,
            Int16(v) => *v == 0,
            Int32(v) => *v == 0,
            Int64(v) => *v == 0,
            UInt8(v) => *v == 0,
            UInt16(v) => *v == 0,
            UInt32(v) => *v == 0,
            UInt64(v) => *v == 0,
            Float(v) => *v == 0.0,
            Double(v) => *v == 0.0,
            BigInteger(v) => *v == 0,
            BigDecimal(v) => v.is_zero(),
            _ => false,
        }
    }

    pub fn is_one(&self) -> bool {
        use ConstValue::*;
        match self {
            Int8(v) => *v == 1,
            Int16(v) => *v == 1,
            Int32(v) => *v == 1,
            Int64(v) => *v == 1,
            UInt8(v) => *v == 1,
            UInt16(v) => *v == 1,
            UInt32(v) => *v == 1,
            UInt64(v) => *v == 1,
            Float(v) => *v == 1.0,
            Double(v) => *v == 1.0,
            BigInteger(v) => *v == 1,
            BigDecimal(v) => v.is_one(),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Writes this value's discriminant and payload into `enc`
    /// (component A). Variant discriminants here are plain bytes, not
    /// `KeyEncoder`'s monotone type tags — `ConstValue` is a payload
    /// inside `Expr::Constant`, not one of the `Type`/`Expr` variants the
    /// tag allocator tracks.
    pub fn encode_key(&self, enc: &mut crate::keyenc::KeyEncoder) {
        use ConstValue::*;
        match self {
            Null => enc.write_u8(0),
            Bool(v) => {
                enc.write_u8(1);
                enc.write_bool(*v);
            }
            Int8(v) => {
                enc.write_u8(2);
                enc.write_u8(*v as u8);
            }
            Int16(v) => {
                enc.write_u8(3);
                enc.write_i16(*v);
            }
            Int32(v) => {
                enc.write_u8(4);
                enc.write_i32(*v);
            }
            Int64(v) => {
                enc.write_u8(5);
                enc.write_i64(*v);
            }
            UInt8(v) => {
                enc.write_u8(6);
                enc.write_u8(*v);
            }
            UInt16(v) => {
                enc.write_u8(7);
                enc.write_i16(*v as i16);
            }
            UInt32(v) => {
                enc.write_u8(8);
                enc.write_i32(*v as i32);
            }
            UInt64(v) => {
                enc.write_u8(9);
                enc.write_i64(*v as i64);
            }
            Float(v) => {
                enc.write_u8(10);
                enc.write_f32(*v);
            }
            Double(v) => {
                enc.write_u8(11);
                enc.write_f64(*v);
            }
            BigInteger(v) => {
                enc.write_u8(12);
                enc.write_i64((*v >> 64) as i64);
                enc.write_i64(*v as i64);
            }
            BigDecimal(v) => {
                enc.write_u8(13);
                enc.write_object(v.to_string());
            }
            Str(v) => {
                enc.write_u8(14);
                enc.write_object(Rc::clone(v));
            }
            Range(pair) => {
                enc.write_u8(15);
                match &pair.0 {
                    Some(v) => {
                        enc.write_bool(true);
                        v.encode_key(enc);
                    }
                    None => enc.write_bool(false),
                }
                match &pair.1 {
                    Some(v) => {
                        enc.write_bool(true);
                        v.encode_key(enc);
                    }
                    None => enc.write_bool(false),
                }
            }
        }
    }
}

/// A literal value. `negate`/`not` constant-fold here with overflow
/// promotion (e.g. negating `i32::MIN` widens to `i64`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantExpr {
    pub ty: Type,
    pub value: ConstValue,
}

impl ConstantExpr {
    pub fn null() -> Self {
        Self {
            ty: Type::Null,
            value: ConstValue::Null,
        }
    }

    pub fn bool(v: bool) -> Self {
        Self {
            ty: Type::basic(TypeClass::Boolean),
            value: ConstValue::Bool(v),
        }
    }

    pub fn int32(v: i32) -> Self {
        Self {
            ty: Type::basic(TypeClass::Int32),
            value: ConstValue::Int32(v),
        }
    }

    pub fn int64(v: i64) -> Self {
        Self {
            ty: Type::basic(TypeClass::Int64),
            value: ConstValue::Int64(v),
        }
    }

    pub fn double(v: f64) -> Self {
        Self {
            ty: Type::basic(TypeClass::Double),
            value: ConstValue::Double(v),
        }
    }

    pub fn string(v: impl Into<Rc<str>>) -> Self {
        Self {
            ty: Type::basic(TypeClass::String),
            value: ConstValue::Str(v.into()),
        }
    }

    /// From an integer literal, choosing the narrowest signed width that
    /// holds the value (falling back to `BigInteger` beyond `i64`).
    pub fn from_int_literal(v: i128) -> Self {
        if let Ok(v) = i32::try_from(v) {
            Self {
                ty: Type::basic(TypeClass::Int32),
                value: ConstValue::Int32(v),
            }
        } else if let Ok(v) = i64::try_from(v) {
            Self {
                ty: Type::basic(TypeClass::Int64),
                value: ConstValue::Int64(v),
            }
        } else {
            Self {
                ty: Type::basic(TypeClass::BigInteger),
                value: ConstValue::BigInteger(v),
            }
        }
    }

    /// Ones'-complement/arithmetic negation with overflow promotion.
    pub fn negate(&self, widen: bool) -> Option<ConstantExpr> {
        use ConstValue::*;
        Some(match &self.value {
            Int32(v) => match v.checked_neg() {
                Some(r) => ConstantExpr {
                    ty: self.ty.clone(),
                    value: Int32(r),
                },
                None if widen => ConstantExpr {
                    ty: Type::basic(TypeClass::Int64),
                    value: Int64(-(*v as i64)),
                },
                None => return None,
            },
            Int64(v) => match v.checked_neg() {
                Some(r) => ConstantExpr {
                    ty: self.ty.clone(),
                    value: Int64(r),
                },
                None if widen => ConstantExpr {
                    ty: Type::basic(TypeClass::BigInteger),
                    value: BigInteger(-(*v as i128)),
                },
                None => return None,
            },
            Int8(v) => match v.checked_neg() {
                Some(r) => ConstantExpr {
                    ty: self.ty.clone(),
                    value: Int8(r),
                },
                None if widen => ConstantExpr {
                    ty: Type::basic(TypeClass::Int16),
                    value: Int16(-(*v as i16)),
                },
                None => return None,
            },
            Int16(v) => match v.checked_neg() {
                Some(r) => ConstantExpr {
                    ty: self.ty.clone(),
                    value: Int16(r),
                },
                None if widen => ConstantExpr {
                    ty: Type::basic(TypeClass::Int32),
                    value: Int32(-(*v as i32)),
                },
                None => return None,
            },
            Float(v) => ConstantExpr {
                ty: self.ty.clone(),
                value: Float(-v),
            },
            Double(v) => ConstantExpr {
                ty: self.ty.clone(),
                value: Double(-v),
            },
            BigInteger(v) => ConstantExpr {
                ty: self.ty.clone(),
                value: BigInteger(-v),
            },
            BigDecimal(v) => ConstantExpr {
                ty: self.ty.clone(),
                value: BigDecimal(-v),
            },
            _ => return None,
        })
    }

    pub fn not(&self) -> Option<ConstantExpr> {
        match &self.value {
            ConstValue::Bool(b) => Some(ConstantExpr::bool(!b)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negate_min_i32_widens_to_i64() {
        let min = ConstantExpr::int32(i32::MIN);
        let negated = min.negate(true).unwrap();
        assert_eq!(negated.value, ConstValue::Int64(-(i32::MIN as i64)));
    }

    #[test]
    fn negate_min_i32_without_widen_fails() {
        let min = ConstantExpr::int32(i32::MIN);
        assert!(min.negate(false).is_none());
    }

    #[test]
    fn negate_min_i8_widens_to_i16() {
        let min = ConstantExpr {
            ty: Type::basic(TypeClass::Int8),
            value: ConstValue::Int8(i8::MIN),
        };
        let negated = min.negate(true).unwrap();
        assert_eq!(negated.value, ConstValue::Int16(-(i8::MIN as i16)));
    }

    #[test]
    fn negate_min_i8_without_widen_fails() {
        let min = ConstantExpr {
            ty: Type::basic(TypeClass::Int8),
            value: ConstValue::Int8(i8::MIN),
        };
        assert!(min.negate(false).is_none());
    }

    #[test]
    fn negate_min_i16_widens_to_i32() {
        let min = ConstantExpr {
            ty: Type::basic(TypeClass::Int16),
            value: ConstValue::Int16(i16::MIN),
        };
        let negated = min.negate(true).unwrap();
        assert_eq!(negated.value, ConstValue::Int32(-(i16::MIN as i32)));
    }

    #[test]
    fn negate_min_i16_without_widen_fails() {
        let min = ConstantExpr {
            ty: Type::basic(TypeClass::Int16),
            value: ConstValue::Int16(i16::MIN),
        };
        assert!(min.negate(false).is_none());
    }

    #[test]
    fn not_folds_booleans() {
        let t = ConstantExpr::bool(true);
        assert_eq!(t.not().unwrap().value, ConstValue::Bool(false));
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(ConstValue::Double(f64::NAN), ConstValue::Double(f64::NAN));
    }
}
