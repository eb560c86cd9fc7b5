use super::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOpType {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOpType {
    pub fn is_comparison(self) -> bool {
        use BinaryOpType::*;
        matches!(self, Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOpType::And | BinaryOpType::Or)
    }

    pub fn is_arithmetic(self) -> bool {
        use BinaryOpType::*;
        matches!(self, Add | Sub | Mul | Div | Rem)
    }

    pub fn is_bitwise(self) -> bool {
        use BinaryOpType::*;
        matches!(self, BitAnd | BitOr | BitXor)
    }

    /// The complementary relational operator (`a op b` negated becomes
    /// `a complement(op) b`); only meaningful for comparisons.
    pub fn complement(self) -> Option<BinaryOpType> {
        use BinaryOpType::*;
        Some(match self {
            Equal => NotEqual,
            NotEqual => Equal,
            Less => GreaterEqual,
            LessEqual => Greater,
            Greater => LessEqual,
            GreaterEqual => Less,
            _ => return None,
        })
    }

    /// `a op b` with sides reversed becomes `b reversed(op) a`.
    pub fn reversed(self) -> BinaryOpType {
        use BinaryOpType::*;
        match self {
            Less => Greater,
            Greater => Less,
            LessEqual => GreaterEqual,
            GreaterEqual => LessEqual,
            other => other,
        }
    }
}

/// Comparison (`=, !=, >=, <, <=, >`), logical (`&&`, `||`), arithmetic
/// (`+ - * / %`), and bitwise (`& | ^`) binary operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryOpExpr {
    pub op: BinaryOpType,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

impl BinaryOpExpr {
    pub fn new(op: BinaryOpType, left: Expr, right: Expr) -> Self {
        Self {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}
