use super::{AggKind, Expr};
use crate::types::Type;

/// Binds `name` to `inner`'s value in the evaluation context. Pure iff
/// `inner` is pure; referentially opaque to most predicates (a filter
/// can't see through an assignment, it can only read it back through a
/// `VarExpr`). A duplicate name at the same scope shadows: the second
/// `AssignExpr` with that name wins.
///
/// `agg_kind` starts `None` and is set by `Expr::as_aggregate`/`as_window`
/// when this binding is lifted into a per-group or per-frame computation;
/// `VarExpr` reads copy it at construction so a reader can tell an
/// aggregating binder from a plain one without a pointer back to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignExpr {
    pub name: String,
    pub inner: Box<Expr>,
    pub agg_kind: AggKind,
}

impl AssignExpr {
    pub fn new(name: impl Into<String>, inner: Expr) -> Self {
        Self {
            name: name.into(),
            inner: Box::new(inner),
            agg_kind: AggKind::None,
        }
    }

    pub fn with_agg_kind(name: impl Into<String>, inner: Expr, agg_kind: AggKind) -> Self {
        Self {
            name: name.into(),
            inner: Box::new(inner),
            agg_kind,
        }
    }

    pub fn type_of(&self) -> Type {
        self.inner.type_of()
    }
}
