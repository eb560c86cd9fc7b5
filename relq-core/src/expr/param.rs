use crate::types::Type;

/// A positional parameter (`?1`, `?2`, ...). `as_type` rebinds the
/// declared type; evaluation indexes the argument vector at
/// `ordinal - 1`, applying a runtime conversion whenever the declared
/// type isn't `any`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamExpr {
    pub ordinal: u32,
    pub ty: Type,
}

impl ParamExpr {
    pub fn new(ordinal: u32) -> Self {
        Self {
            ordinal,
            ty: Type::Any,
        }
    }

    pub fn with_type(ordinal: u32, ty: Type) -> Self {
        Self { ordinal, ty }
    }

    /// Whether this parameter's declared type requires a runtime
    /// conversion when read (i.e. it isn't `any`).
    pub fn needs_conversion(&self) -> bool {
        !self.ty.is_any()
    }
}
