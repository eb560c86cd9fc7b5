use super::TupleType;
use std::fmt;
use std::rc::Rc;

/// Row-count multiplicity of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Provably zero rows.
    Zero,
    /// Provably exactly one row.
    One,
    /// Zero or one row.
    Optional,
    /// Any number of rows (the default, unconstrained case).
    Many,
}

impl Cardinality {
    /// Combines the cardinalities of two relations joined/composed
    /// together. Kept exactly as spec.md §3 states it, including the
    /// `Optional * Many = Many` fallthrough case.
    pub fn multiply(self, other: Cardinality) -> Cardinality {
        use Cardinality::*;
        match (self, other) {
            (Zero, _) | (_, Zero) => Zero,
            (One, x) | (x, One) => x,
            (Optional, Optional) => Optional,
            _ => Many,
        }
    }

    /// Cardinality of a relation after a filter whose truth value is
    /// statically known (`Some(true)`/`Some(false)`) or not (`None`).
    pub fn filter(self, constant: Option<bool>) -> Cardinality {
        match constant {
            Some(true) => self,
            Some(false) => Cardinality::Zero,
            None => self.multiply(Cardinality::Optional),
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The type of a relation: a row schema plus how many rows it yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationType {
    pub row_type: Rc<TupleType>,
    pub cardinality: Cardinality,
}

impl RelationType {
    pub fn new(row_type: TupleType, cardinality: Cardinality) -> Self {
        Self {
            row_type: Rc::new(row_type),
            cardinality,
        }
    }

    /// Component A: entity-deduplicated the same way as `TupleType`.
    pub fn encode_key(&self, enc: &mut crate::keyenc::KeyEncoder) -> crate::error::Result<()> {
        if !enc.encode_entity(self, *crate::keyenc::TAG_TYPE_RELATION)? {
            return Ok(());
        }
        enc.write_u8(self.cardinality as u8);
        self.row_type.encode_key(enc)
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Relation<{}>[{}]", self.row_type, self.cardinality)
    }
}

#[cfg(test)]
mod tests {
    use super::Cardinality::*;

    #[test]
    fn multiply_matches_spec_table() {
        assert_eq!(Zero.multiply(Many), Zero);
        assert_eq!(Many.multiply(Zero), Zero);
        assert_eq!(One.multiply(Many), Many);
        assert_eq!(Many.multiply(One), Many);
        assert_eq!(Optional.multiply(Optional), Optional);
        assert_eq!(Optional.multiply(Many), Many);
        assert_eq!(Many.multiply(Optional), Many);
    }

    #[test]
    fn multiply_commutative_without_zero_optional_asymmetry() {
        assert_eq!(One.multiply(Many), Many.multiply(One));
        assert_eq!(Many.multiply(Many), Many.multiply(Many));
    }

    #[test]
    fn filter_on_constant_true_preserves() {
        assert_eq!(Many.filter(Some(true)), Many);
    }

    #[test]
    fn filter_on_constant_false_is_zero() {
        assert_eq!(One.filter(Some(false)), Zero);
    }

    #[test]
    fn filter_on_unknown_multiplies_by_optional() {
        assert_eq!(One.filter(None), One.multiply(Optional));
        assert_eq!(Many.filter(None), Many);
    }
}
