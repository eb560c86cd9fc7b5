use super::constant::{ConstValue, ConstantExpr};
use super::Expr;
use crate::types::Type;
use std::rc::Rc;

/// An inclusive, possibly-open range (`a..b`, `a..`, `..b`). If both
/// endpoints are constants (or absent), `RangeExpr::fold` produces a
/// canonicalized `Range` constant instead of keeping the node around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeExpr {
    pub start: Option<Box<Expr>>,
    pub end: Option<Box<Expr>>,
}

impl RangeExpr {
    pub fn new(start: Option<Expr>, end: Option<Expr>) -> Self {
        Self {
            start: start.map(Box::new),
            end: end.map(Box::new),
        }
    }

    /// Folds to a constant `Range` value when both endpoints are
    /// constants or absent; returns `None` when either endpoint is a
    /// non-constant expression.
    pub fn fold(&self) -> Option<ConstantExpr> {
        let start = fold_endpoint(&self.start)?;
        let end = fold_endpoint(&self.end)?;
        Some(ConstantExpr {
            ty: Type::Any,
            value: ConstValue::Range(Rc::new((start, end))),
        })
    }
}

fn fold_endpoint(e: &Option<Box<Expr>>) -> Option<Option<ConstValue>> {
    match e {
        None => Some(None),
        Some(e) => match e.as_ref() {
            Expr::Constant(c) => Some(Some(c.value.clone())),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ConstantExpr as CE;

    #[test]
    fn folds_when_both_endpoints_constant() {
        let r = RangeExpr::new(
            Some(Expr::Constant(CE::int32(1))),
            Some(Expr::Constant(CE::int32(10))),
        );
        let folded = r.fold().unwrap();
        match folded.value {
            ConstValue::Range(pair) => {
                assert_eq!(pair.0, Some(ConstValue::Int32(1)));
                assert_eq!(pair.1, Some(ConstValue::Int32(10)));
            }
            _ => panic!("expected Range"),
        }
    }

    #[test]
    fn open_start_folds_to_none() {
        let r = RangeExpr::new(None, Some(Expr::Constant(CE::int32(10))));
        let folded = r.fold().unwrap();
        match folded.value {
            ConstValue::Range(pair) => assert_eq!(pair.0, None),
            _ => panic!("expected Range"),
        }
    }

    #[test]
    fn non_constant_endpoint_does_not_fold() {
        let r = RangeExpr::new(
            Some(Expr::Constant(CE::int32(1))),
            Some(Expr::Param(crate::expr::ParamExpr::new(1))),
        );
        assert!(r.fold().is_none());
    }
}
