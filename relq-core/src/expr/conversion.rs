use super::Expr;
use crate::types::Type;

/// An explicit or inferred type conversion. Evaluation emits either a
/// safe widening or a lossy, runtime-throwing convert — which one is a
/// property of the source and target types, not of this node, so it's
/// surfaced via `ConversionExpr::is_lossy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionExpr {
    pub target: Type,
    pub inner: Box<Expr>,
}

impl ConversionExpr {
    pub fn new(target: Type, inner: Expr) -> Self {
        Self {
            target,
            inner: Box::new(inner),
        }
    }

    /// Best-effort classification of whether converting `from` to `self.target`
    /// can lose information at runtime (and thus can throw).
    pub fn is_lossy(&self, from: &Type) -> bool {
        match (from.as_basic(), self.target.as_basic()) {
            (Some(a), Some(b)) => {
                let (aw, bw) = (a.clazz.width(), b.clazz.width());
                match (aw, bw) {
                    (Some(aw), Some(bw)) => aw > bw || (a.clazz.is_unsigned() && !b.clazz.is_unsigned() && aw == bw),
                    _ => a.clazz != b.clazz,
                }
            }
            _ => from != &self.target,
        }
    }
}
