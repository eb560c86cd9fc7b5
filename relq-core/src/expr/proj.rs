use super::Expr;

/// Flags a projection term can carry: `~name` excludes it from the
/// output, `+name`/`-name` request ascending/descending order, and a
/// trailing `!` after the sign requests null-low ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjFlags {
    pub exclude: bool,
    pub order_by: bool,
    pub descending: bool,
    pub null_low: bool,
}

/// A single projection term: an inner expression plus the flags above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjExpr {
    pub inner: Box<Expr>,
    pub flags: ProjFlags,
}

impl ProjExpr {
    pub fn new(inner: Expr, flags: ProjFlags) -> Self {
        Self {
            inner: Box::new(inner),
            flags,
        }
    }

    pub fn plain(inner: Expr) -> Self {
        Self::new(inner, ProjFlags::default())
    }

    /// An ordering-only projection term (`exclude && !order_by` would
    /// drop it from both output *and* ordering; `exclude && order_by`
    /// keeps it in the ordering spec without emitting it as an output
    /// column).
    pub fn should_exclude(&self) -> bool {
        self.flags.exclude && !self.flags.order_by
    }

    /// Renders this term's contribution to an order-by spec string:
    /// `+name`, `-name`, `+!name`, or `-!name`.
    pub fn append_to_order_by_spec(&self, name: &str, out: &mut String) {
        if !self.flags.order_by {
            return;
        }
        if !out.is_empty() {
            out.push(',');
        }
        out.push(if self.flags.descending { '-' } else { '+' });
        if self.flags.null_low {
            out.push('!');
        }
        out.push_str(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ColumnExpr, Expr};
    use crate::types::{BasicType, Column, Type, TypeClass, TupleType};
    use std::collections::BTreeMap;
    use std::rc::Rc;

    fn col_expr(name: &str) -> Expr {
        let row = Rc::new(TupleType::new(BTreeMap::from([(
            name.to_string(),
            Column::new(name, Type::Basic(BasicType::new(TypeClass::Int32))),
        )])));
        Expr::Column(ColumnExpr::new(row, vec![name.to_string()]).unwrap())
    }

    #[test]
    fn order_by_spec_emits_sign_and_null_low() {
        let p = ProjExpr::new(
            col_expr("a"),
            ProjFlags {
                exclude: false,
                order_by: true,
                descending: true,
                null_low: true,
            },
        );
        let mut out = String::new();
        p.append_to_order_by_spec("a", &mut out);
        assert_eq!(out, "-!a");
    }

    #[test]
    fn exclude_without_order_by_excludes() {
        let p = ProjExpr::new(
            col_expr("a"),
            ProjFlags {
                exclude: true,
                order_by: false,
                ..Default::default()
            },
        );
        assert!(p.should_exclude());
    }

    #[test]
    fn exclude_with_order_by_keeps_ordering_only() {
        let p = ProjExpr::new(
            col_expr("a"),
            ProjFlags {
                exclude: true,
                order_by: true,
                ..Default::default()
            },
        );
        assert!(!p.should_exclude());
        let mut out = String::new();
        p.append_to_order_by_spec("a", &mut out);
        assert_eq!(out, "+a");
    }
}
