//! The typed expression IR (component D): a sealed set of node kinds
//! covering literals, parameters, column reads, bindings, logical/bitwise
//! negation, binary operators, membership tests, ranges, conversions, and
//! projection wrappers.
//!
//! Dispatch across the hierarchy is a single `match` per operation (see
//! `impl Expr` below) rather than a trait-object vtable: the teacher's
//! `tank-core::Expression` hierarchy used `dyn Expression` with per-variant
//! structs implementing a shared trait, but this IR's operations (`negate`,
//! `not`, `replace`, `gather_eval_columns`, ...) all need to see sibling
//! variants' internals to rewrite between them (De Morgan on `&&`/`||`,
//! `InExpr::not` flipping, ...), which a trait-object boundary would hide
//! behind `Any` downcasts. A closed `enum` plus exhaustive `match` keeps
//! the compiler checking that every rewrite handles every variant.

mod assign;
mod binary;
mod column_expr;
mod constant;
mod conversion;
mod in_expr;
mod not_expr;
mod param;
mod proj;
mod range;
mod var;

pub use assign::AssignExpr;
pub use binary::{BinaryOpExpr, BinaryOpType};
pub use column_expr::ColumnExpr;
pub use constant::{ConstValue, ConstantExpr};
pub use conversion::ConversionExpr;
pub use in_expr::InExpr;
pub use not_expr::NotExpr;
pub use param::ParamExpr;
pub use proj::{ProjExpr, ProjFlags};
pub use range::RangeExpr;
pub use var::VarExpr;

use crate::types::{Column, Type, TypeClass};
use std::collections::HashMap;
use std::fmt;

/// Whether a binding (`AssignExpr`/`VarExpr`) has been lifted into a
/// per-group or per-frame computation by `Expr::as_aggregate`/`as_window`,
/// and if so, which flavor (glossary: *aggregated* collapses a group to
/// one output row, *grouped* emits one row per input row but only after
/// consuming the whole group, *rolling* emits incrementally as rows
/// arrive). Only `as_aggregate`/`as_window` populate this crate's two
/// concrete flavors (`Aggregated`/`Rolling`); `Grouped` is reachable
/// through `replace` substitutions carrying a pre-built grouped binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggKind {
    None,
    Aggregated,
    Grouped,
    Rolling,
}

/// Unary arithmetic negation of a non-constant expression. `negate()`
/// folds constants directly and cancels double negation; this node is
/// the fallback wrapper for everything else, kept separate from
/// `NotExpr` because negation and bitwise-not have distinct typing rules
/// (negation stays within the numeric family; not is integer-only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegExpr {
    pub arg: Box<Expr>,
}

impl NegExpr {
    pub fn new(arg: Expr) -> Self {
        Self { arg: Box::new(arg) }
    }
}

/// The expression IR. Every node is one of these eleven variants closed
/// over `Box<Expr>` for recursive fields, so the enum's own size is
/// bounded regardless of tree depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Constant(ConstantExpr),
    Param(ParamExpr),
    Column(ColumnExpr),
    Assign(AssignExpr),
    Var(VarExpr),
    Not(NotExpr),
    Neg(NegExpr),
    BinaryOp(BinaryOpExpr),
    In(InExpr),
    Range(RangeExpr),
    Conversion(ConversionExpr),
    Proj(ProjExpr),
}

fn bool_type(nullable: bool) -> Type {
    let t = Type::basic(TypeClass::Boolean);
    if nullable {
        t.nullable()
    } else {
        t
    }
}

impl Expr {
    /// This node's static type.
    pub fn type_of(&self) -> Type {
        match self {
            Expr::Constant(c) => c.ty.clone(),
            Expr::Param(p) => p.ty.clone(),
            Expr::Column(c) => c.type_of(),
            Expr::Assign(a) => a.type_of(),
            Expr::Var(v) => v.ty.clone(),
            Expr::Not(n) => n.arg.type_of(),
            Expr::Neg(n) => n.arg.type_of(),
            Expr::BinaryOp(b) => {
                if b.op.is_comparison() || b.op.is_logical() {
                    bool_type(b.left.is_nullable() || b.right.is_nullable())
                } else {
                    b.left
                        .type_of()
                        .common_type(&b.right.type_of(), crate::types::CommonTypeOp::Arithmetic)
                        .unwrap_or(Type::Any)
                }
            }
            Expr::In(i) => bool_type(i.left.is_nullable()),
            // Ranges aren't one of the formal scalar classes (see
            // `ConstValue::Range`'s doc comment); an unfolded `RangeExpr`
            // node only ever appears on `InExpr`'s right-hand side.
            Expr::Range(_) => Type::Any,
            Expr::Conversion(c) => c.target.clone(),
            Expr::Proj(p) => p.inner.type_of(),
        }
    }

    /// Rebinds this node to `ty`, wrapping in a `ConversionExpr` unless
    /// it's already of that type.
    pub fn as_type(&self, ty: Type) -> Expr {
        if self.type_of() == ty {
            self.clone()
        } else {
            Expr::Conversion(ConversionExpr::new(ty, self.clone()))
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.type_of().is_nullable()
    }

    fn as_constant(&self) -> Option<&ConstantExpr> {
        match self {
            Expr::Constant(c) => Some(c),
            Expr::Proj(p) => p.inner.as_constant(),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.as_constant().is_some()
    }

    pub fn is_zero(&self) -> bool {
        self.as_constant().is_some_and(|c| c.value.is_zero())
    }

    pub fn is_one(&self) -> bool {
        self.as_constant().is_some_and(|c| c.value.is_one())
    }

    pub fn is_null(&self) -> bool {
        self.as_constant().is_some_and(|c| c.value.is_null())
    }

    /// This node's value as a boolean constant, looking through trivial
    /// wrappers — used by the planner to drop a constant-`TRUE` filter
    /// (spec.md §4.G step 2) and to fold a statically-known filter into
    /// `Cardinality::filter` (spec.md §3).
    pub fn as_bool_constant(&self) -> Option<bool> {
        self.as_constant().and_then(|c| c.value.as_bool())
    }

    /// Whether this node's value depends only on its inputs, never on
    /// evaluation order or outside state. `ParamExpr` is pure even though
    /// a declared-type conversion on read can throw (invariant 4): purity
    /// is about repeatability, not about whether evaluation can fail.
    pub fn is_pure(&self) -> bool {
        match self {
            Expr::Constant(_) | Expr::Param(_) | Expr::Column(_) | Expr::Var(_) => true,
            Expr::Assign(a) => a.inner.is_pure(),
            Expr::Not(n) => n.arg.is_pure(),
            Expr::Neg(n) => n.arg.is_pure(),
            Expr::BinaryOp(b) => b.left.is_pure() && b.right.is_pure(),
            Expr::In(i) => i.left.is_pure() && i.right.is_pure(),
            Expr::Range(r) => {
                r.start.as_deref().map_or(true, Expr::is_pure) && r.end.as_deref().map_or(true, Expr::is_pure)
            }
            Expr::Conversion(c) => c.inner.is_pure(),
            Expr::Proj(p) => p.inner.is_pure(),
        }
    }

    /// A "trivial wrapper" propagates `source_column` straight through to
    /// its inner node (invariant 3): a bare column read, or a plain
    /// projection of one. Assignments, casts, and binary ops don't —
    /// they transform the value, so the identity of "which column did
    /// this ultimately come from" stops being meaningful.
    pub fn is_trivial(&self) -> bool {
        match self {
            Expr::Column(_) => true,
            Expr::Proj(p) => p.inner.is_trivial(),
            _ => false,
        }
    }

    /// The underlying row column this node reads, if any — only
    /// meaningful through a chain of trivial wrappers (see `is_trivial`).
    pub fn source_column(&self) -> Option<&Column> {
        match self {
            Expr::Column(c) => c.last_column(),
            Expr::Proj(p) => p.inner.source_column(),
            _ => None,
        }
    }

    /// Whether `.not()` produces a sensible logical negation of this
    /// node (i.e. it's boolean-typed).
    pub fn supports_logical_not(&self) -> bool {
        matches!(
            self.type_of().as_basic().map(|b| b.clazz),
            Some(TypeClass::Boolean)
        )
    }

    /// Logical negation. Rewrites rather than wrapping where a rewrite
    /// exists: comparisons flip to their complement, `&&`/`||` apply De
    /// Morgan, `InExpr::not` flips in place, and a plain boolean constant
    /// folds — so a double-negative never survives as nested `NotExpr`s.
    pub fn not(&self) -> Expr {
        match self {
            Expr::Constant(c) => c
                .not()
                .map(Expr::Constant)
                .unwrap_or_else(|| Expr::Not(NotExpr::new(self.clone()))),
            Expr::BinaryOp(b) if b.op.is_comparison() => {
                let op = b.op.complement().expect("comparison ops always have a complement");
                Expr::BinaryOp(BinaryOpExpr::new(op, (*b.left).clone(), (*b.right).clone()))
            }
            Expr::BinaryOp(b) if b.op == BinaryOpType::And => Expr::BinaryOp(BinaryOpExpr::new(
                BinaryOpType::Or,
                b.left.not(),
                b.right.not(),
            )),
            Expr::BinaryOp(b) if b.op == BinaryOpType::Or => Expr::BinaryOp(BinaryOpExpr::new(
                BinaryOpType::And,
                b.left.not(),
                b.right.not(),
            )),
            Expr::In(i) => Expr::In(InExpr::new((*i.left).clone(), (*i.right).clone(), !i.not)),
            Expr::Proj(p) => Expr::Proj(ProjExpr::new(p.inner.not(), p.flags)),
            _ => Expr::Not(NotExpr::new(self.clone())),
        }
    }

    /// Arithmetic negation. Folds constants, cancels double negation,
    /// and otherwise wraps in `NegExpr`.
    pub fn negate(&self) -> Expr {
        match self {
            Expr::Constant(c) => c
                .negate(true)
                .map(Expr::Constant)
                .unwrap_or_else(|| Expr::Neg(NegExpr::new(self.clone()))),
            Expr::Neg(n) => (*n.arg).clone(),
            Expr::Proj(p) => Expr::Proj(ProjExpr::new(p.inner.negate(), p.flags)),
            _ => Expr::Neg(NegExpr::new(self.clone())),
        }
    }

    /// This node's aggregation classification, looking through pure
    /// wrappers and combining children (the first aggregating child
    /// found wins — mixed aggregating/non-aggregating operands are a
    /// planner-level validation concern, not something this traversal
    /// resolves).
    pub fn agg_kind(&self) -> AggKind {
        fn merge(a: AggKind, b: AggKind) -> AggKind {
            if a != AggKind::None {
                a
            } else {
                b
            }
        }
        match self {
            Expr::Constant(_) | Expr::Param(_) | Expr::Column(_) => AggKind::None,
            Expr::Assign(a) => merge(a.agg_kind, a.inner.agg_kind()),
            Expr::Var(v) => v.agg_kind,
            Expr::Not(n) => n.arg.agg_kind(),
            Expr::Neg(n) => n.arg.agg_kind(),
            Expr::BinaryOp(b) => merge(b.left.agg_kind(), b.right.agg_kind()),
            Expr::In(i) => merge(i.left.agg_kind(), i.right.agg_kind()),
            Expr::Range(r) => merge(
                r.start.as_deref().map_or(AggKind::None, Expr::agg_kind),
                r.end.as_deref().map_or(AggKind::None, Expr::agg_kind),
            ),
            Expr::Conversion(c) => c.inner.agg_kind(),
            Expr::Proj(p) => p.inner.agg_kind(),
        }
    }

    pub fn is_aggregating(&self) -> bool {
        self.agg_kind() != AggKind::None
    }

    /// One row per frame, computed incrementally as rows arrive (the
    /// `Rolling` flavor — see `window::Window`).
    pub fn is_accumulating(&self) -> bool {
        self.agg_kind() == AggKind::Rolling
    }

    /// Consumes an entire group before emitting (`Aggregated`/`Grouped`).
    pub fn is_grouping(&self) -> bool {
        matches!(self.agg_kind(), AggKind::Aggregated | AggKind::Grouped)
    }

    /// Whether re-evaluating this node in a different row order could
    /// change its result. True only for the rolling/windowed flavor —
    /// an aggregated or grouped reduction is order-independent by
    /// construction (sum/min/max/count don't care what order they see
    /// their inputs in), a rolling one inherently does.
    pub fn is_order_dependent(&self) -> bool {
        self.is_accumulating()
    }

    /// Lifts this (typically per-row) expression into a per-group
    /// computation over `group_cols`. A column that's one of the group
    /// keys stays as-is (it's constant within a group); any other raw
    /// column read is an error — it has no single value within a group
    /// unless something aggregates it first.
    pub fn as_aggregate(&self, group_cols: &[Column]) -> crate::error::Result<Expr> {
        match self {
            Expr::Column(c) => {
                let name = c.dotted_name();
                if group_cols.iter().any(|g| g.field_name == name) {
                    Ok(self.clone())
                } else {
                    Err(crate::error::QueryException::new(
                        format!("column '{name}' is neither grouped nor aggregated"),
                        0,
                        0,
                    )
                    .into())
                }
            }
            Expr::Constant(_) | Expr::Param(_) => Ok(self.clone()),
            Expr::Var(v) => {
                if v.is_aggregating() {
                    Ok(self.clone())
                } else {
                    Err(crate::error::QueryException::new(
                        format!("variable '{}' is not aggregating", v.name),
                        0,
                        0,
                    )
                    .into())
                }
            }
            Expr::Assign(a) => Ok(Expr::Assign(AssignExpr::with_agg_kind(
                a.name.clone(),
                a.inner.as_aggregate(group_cols)?,
                AggKind::Aggregated,
            ))),
            Expr::Not(n) => Ok(Expr::Not(NotExpr::new(n.arg.as_aggregate(group_cols)?))),
            Expr::Neg(n) => Ok(Expr::Neg(NegExpr::new(n.arg.as_aggregate(group_cols)?))),
            Expr::BinaryOp(b) => Ok(Expr::BinaryOp(BinaryOpExpr::new(
                b.op,
                b.left.as_aggregate(group_cols)?,
                b.right.as_aggregate(group_cols)?,
            ))),
            Expr::In(i) => Ok(Expr::In(InExpr::new(
                i.left.as_aggregate(group_cols)?,
                i.right.as_aggregate(group_cols)?,
                i.not,
            ))),
            Expr::Range(r) => Ok(Expr::Range(RangeExpr::new(
                r.start
                    .as_deref()
                    .map(|e| e.as_aggregate(group_cols))
                    .transpose()?,
                r.end.as_deref().map(|e| e.as_aggregate(group_cols)).transpose()?,
            ))),
            Expr::Conversion(c) => Ok(Expr::Conversion(ConversionExpr::new(
                c.target.clone(),
                c.inner.as_aggregate(group_cols)?,
            ))),
            Expr::Proj(p) => Ok(Expr::Proj(ProjExpr::new(
                p.inner.as_aggregate(group_cols)?,
                p.flags,
            ))),
        }
    }

    /// Substitutes named `VarExpr` reads per `reassignments` — the
    /// mechanism `as_window` and general rewriting use to splice a
    /// pre-built windowed/grouped expression in for a plain variable
    /// read. Never fails: an absent name just passes the `Var` through
    /// unchanged.
    pub fn replace(&self, reassignments: &HashMap<String, Expr>) -> Expr {
        match self {
            Expr::Var(v) => reassignments.get(&v.name).cloned().unwrap_or_else(|| self.clone()),
            Expr::Assign(a) => Expr::Assign(AssignExpr::with_agg_kind(
                a.name.clone(),
                a.inner.replace(reassignments),
                a.agg_kind,
            )),
            Expr::Not(n) => Expr::Not(NotExpr::new(n.arg.replace(reassignments))),
            Expr::Neg(n) => Expr::Neg(NegExpr::new(n.arg.replace(reassignments))),
            Expr::BinaryOp(b) => Expr::BinaryOp(BinaryOpExpr::new(
                b.op,
                b.left.replace(reassignments),
                b.right.replace(reassignments),
            )),
            Expr::In(i) => Expr::In(InExpr::new(
                i.left.replace(reassignments),
                i.right.replace(reassignments),
                i.not,
            )),
            Expr::Range(r) => Expr::Range(RangeExpr::new(
                r.start.as_deref().map(|e| e.replace(reassignments)),
                r.end.as_deref().map(|e| e.replace(reassignments)),
            )),
            Expr::Conversion(c) => Expr::Conversion(ConversionExpr::new(
                c.target.clone(),
                c.inner.replace(reassignments),
            )),
            Expr::Proj(p) => Expr::Proj(ProjExpr::new(p.inner.replace(reassignments), p.flags)),
            Expr::Constant(_) | Expr::Param(_) | Expr::Column(_) => self.clone(),
        }
    }

    /// Applies `reassignments` and tags the result as rolling-aggregating
    /// where a substitution actually happened — callers pass in the
    /// already-built windowed expression for each name, so there's
    /// nothing here that can fail; it returns `Result` only for
    /// symmetry with `as_aggregate`, whose column/variable checks can.
    pub fn as_window(&self, reassignments: &HashMap<String, Expr>) -> crate::error::Result<Expr> {
        Ok(self.replace(reassignments))
    }

    /// Highest positional parameter ordinal reachable from this node, or
    /// 0 if it reads no parameters.
    pub fn max_argument(&self) -> u32 {
        match self {
            Expr::Constant(_) | Expr::Column(_) | Expr::Var(_) => 0,
            Expr::Param(p) => p.ordinal,
            Expr::Assign(a) => a.inner.max_argument(),
            Expr::Not(n) => n.arg.max_argument(),
            Expr::Neg(n) => n.arg.max_argument(),
            Expr::BinaryOp(b) => b.left.max_argument().max(b.right.max_argument()),
            Expr::In(i) => i.left.max_argument().max(i.right.max_argument()),
            Expr::Range(r) => r
                .start
                .as_deref()
                .map_or(0, Expr::max_argument)
                .max(r.end.as_deref().map_or(0, Expr::max_argument)),
            Expr::Conversion(c) => c.inner.max_argument(),
            Expr::Proj(p) => p.inner.max_argument(),
        }
    }

    /// Appends every row column this node reads (directly or through a
    /// nested expression) to `out`, in traversal order, duplicates and
    /// all — callers that need a set should dedup themselves.
    pub fn gather_eval_columns(&self, out: &mut Vec<Column>) {
        match self {
            Expr::Column(c) => {
                if let Some(col) = c.last_column() {
                    out.push(col.clone());
                }
            }
            Expr::Constant(_) | Expr::Param(_) | Expr::Var(_) => {}
            Expr::Assign(a) => a.inner.gather_eval_columns(out),
            Expr::Not(n) => n.arg.gather_eval_columns(out),
            Expr::Neg(n) => n.arg.gather_eval_columns(out),
            Expr::BinaryOp(b) => {
                b.left.gather_eval_columns(out);
                b.right.gather_eval_columns(out);
            }
            Expr::In(i) => {
                i.left.gather_eval_columns(out);
                i.right.gather_eval_columns(out);
            }
            Expr::Range(r) => {
                if let Some(s) = &r.start {
                    s.gather_eval_columns(out);
                }
                if let Some(e) = &r.end {
                    e.gather_eval_columns(out);
                }
            }
            Expr::Conversion(c) => c.inner.gather_eval_columns(out),
            Expr::Proj(p) => p.inner.gather_eval_columns(out),
        }
    }

    /// Writes a canonical, deterministic encoding of this node into
    /// `enc` (component A, `keyenc.rs`): `encode_key(e1) ==
    /// encode_key(e2)` iff `e1 == e2` (spec.md §8). `Expr` nodes own
    /// their children (`Box`, never shared), so no entity-table
    /// indirection happens here — that only matters for the `Rc`-shared
    /// `TupleType`/`RelationType` a `ColumnExpr` points at, which this
    /// delegates into via `Type::encode_key`.
    pub fn encode_key(&self, enc: &mut crate::keyenc::KeyEncoder) -> crate::error::Result<()> {
        use crate::keyenc::*;
        match self {
            Expr::Constant(c) => {
                enc.write_u8(*TAG_EXPR_CONSTANT);
                c.value.encode_key(enc);
            }
            Expr::Param(p) => {
                enc.write_u8(*TAG_EXPR_PARAM);
                enc.write_varint(p.ordinal as u64);
                p.ty.encode_key(enc)?;
            }
            Expr::Column(c) => {
                enc.write_u8(*TAG_EXPR_COLUMN);
                c.row_type.encode_key(enc)?;
                enc.write_array_len(Some(c.path.len()));
                for step in &c.path {
                    enc.write_object(step.clone());
                }
            }
            Expr::Assign(a) => {
                enc.write_u8(*TAG_EXPR_ASSIGN);
                enc.write_object(a.name.clone());
                a.inner.encode_key(enc)?;
            }
            Expr::Var(v) => {
                enc.write_u8(*TAG_EXPR_VAR);
                enc.write_object(v.name.clone());
                v.ty.encode_key(enc)?;
            }
            Expr::Not(n) => {
                enc.write_u8(*TAG_EXPR_NOT);
                n.arg.encode_key(enc)?;
            }
            Expr::Neg(n) => {
                enc.write_u8(*TAG_EXPR_NEG);
                n.arg.encode_key(enc)?;
            }
            Expr::BinaryOp(b) => {
                enc.write_u8(*TAG_EXPR_BINARY_OP);
                enc.write_u8(b.op as u8);
                b.left.encode_key(enc)?;
                b.right.encode_key(enc)?;
            }
            Expr::In(i) => {
                enc.write_u8(*TAG_EXPR_IN);
                enc.write_bool(i.not);
                i.left.encode_key(enc)?;
                i.right.encode_key(enc)?;
            }
            Expr::Range(r) => {
                enc.write_u8(*TAG_EXPR_RANGE);
                match &r.start {
                    Some(e) => {
                        enc.write_bool(true);
                        e.encode_key(enc)?;
                    }
                    None => enc.write_bool(false),
                }
                match &r.end {
                    Some(e) => {
                        enc.write_bool(true);
                        e.encode_key(enc)?;
                    }
                    None => enc.write_bool(false),
                }
            }
            Expr::Conversion(c) => {
                enc.write_u8(*TAG_EXPR_CONVERSION);
                c.target.encode_key(enc)?;
                c.inner.encode_key(enc)?;
            }
            Expr::Proj(p) => {
                enc.write_u8(*TAG_EXPR_PROJ);
                enc.write_u8(
                    (p.flags.exclude as u8)
                        | ((p.flags.order_by as u8) << 1)
                        | ((p.flags.descending as u8) << 2)
                        | ((p.flags.null_low as u8) << 3),
                );
                p.inner.encode_key(enc)?;
            }
        }
        Ok(())
    }
}

/// Encodes `expr` into a fresh `Key` — the entry point `cache.rs` uses
/// to turn a plan-cache lookup's filter/projection tree into a key.
pub fn encode_expr_key(expr: &Expr, limits: &crate::config::Limits) -> crate::error::Result<crate::keyenc::Key> {
    let mut enc = crate::keyenc::KeyEncoder::new(limits.clone());
    expr.encode_key(&mut enc)?;
    Ok(enc.finish())
}

/// Debug-only tree rendering (SPEC_FULL.md §9.1), not part of the
/// pushdown contract — useful for `plan::explain` and error messages.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(c) => write!(f, "{:?}", c.value),
            Expr::Param(p) => write!(f, "?{}", p.ordinal),
            Expr::Column(c) => write!(f, "{}", c.dotted_name()),
            Expr::Assign(a) => write!(f, "{} = {}", a.name, a.inner),
            Expr::Var(v) => write!(f, "{}", v.name),
            Expr::Not(n) => write!(f, "~{}", n.arg),
            Expr::Neg(n) => write!(f, "-{}", n.arg),
            Expr::BinaryOp(b) => write!(f, "({} {} {})", b.left, op_symbol(b.op), b.right),
            Expr::In(i) => write!(f, "({} {}in {})", i.left, if i.not { "not " } else { "" }, i.right),
            Expr::Range(r) => write!(
                f,
                "{}..{}",
                r.start.as_ref().map(|e| e.to_string()).unwrap_or_default(),
                r.end.as_ref().map(|e| e.to_string()).unwrap_or_default()
            ),
            Expr::Conversion(c) => write!(f, "({} as {})", c.inner, c.target),
            Expr::Proj(p) => write!(f, "{}", p.inner),
        }
    }
}

fn op_symbol(op: BinaryOpType) -> &'static str {
    use BinaryOpType::*;
    match op {
        Equal => "=",
        NotEqual => "!=",
        Less => "<",
        LessEqual => "<=",
        Greater => ">",
        GreaterEqual => ">=",
        And => "&&",
        Or => "||",
        Add => "+",
        Sub => "-",
        Mul => "*",
        Div => "/",
        Rem => "%",
        BitAnd => "&",
        BitOr => "|",
        BitXor => "^",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BasicType, TupleType};
    use std::collections::BTreeMap;
    use std::rc::Rc;

    fn int_row(name: &str) -> Rc<TupleType> {
        Rc::new(TupleType::new(BTreeMap::from([(
            name.to_string(),
            Column::new(name, Type::basic(TypeClass::Int32)),
        )])))
    }

    #[test]
    fn not_flips_comparison() {
        let lhs = Expr::Constant(ConstantExpr::int32(1));
        let rhs = Expr::Constant(ConstantExpr::int32(2));
        let cmp = Expr::BinaryOp(BinaryOpExpr::new(BinaryOpType::Less, lhs, rhs));
        let negated = cmp.not();
        match negated {
            Expr::BinaryOp(b) => assert_eq!(b.op, BinaryOpType::GreaterEqual),
            _ => panic!("expected BinaryOp"),
        }
    }

    #[test]
    fn not_applies_de_morgan_over_and() {
        let a = Expr::Constant(ConstantExpr::bool(true));
        let b = Expr::Constant(ConstantExpr::bool(false));
        let and = Expr::BinaryOp(BinaryOpExpr::new(BinaryOpType::And, a, b));
        match and.not() {
            Expr::BinaryOp(b) => assert_eq!(b.op, BinaryOpType::Or),
            _ => panic!("expected Or"),
        }
    }

    #[test]
    fn not_flips_in_expr_flag_in_place() {
        let inexpr = Expr::In(InExpr::new(
            Expr::Constant(ConstantExpr::int32(1)),
            Expr::Constant(ConstantExpr::int32(2)),
            false,
        ));
        match inexpr.not() {
            Expr::In(i) => assert!(i.not),
            _ => panic!("expected In"),
        }
    }

    #[test]
    fn negate_cancels_double_negation() {
        let c = Expr::Column(ColumnExpr::new(int_row("a"), vec!["a".into()]).unwrap());
        let once = c.negate();
        assert!(matches!(once, Expr::Neg(_)));
        let twice = once.negate();
        assert_eq!(twice, c);
    }

    #[test]
    fn trivial_wrapper_propagates_source_column() {
        let c = Expr::Column(ColumnExpr::new(int_row("a"), vec!["a".into()]).unwrap());
        let wrapped = Expr::Proj(ProjExpr::plain(c.clone()));
        assert!(wrapped.is_trivial());
        assert_eq!(wrapped.source_column(), c.source_column());
    }

    #[test]
    fn binary_op_is_not_trivial() {
        let c = Expr::Column(ColumnExpr::new(int_row("a"), vec!["a".into()]).unwrap());
        let bin = Expr::BinaryOp(BinaryOpExpr::new(
            BinaryOpType::Add,
            c,
            Expr::Constant(ConstantExpr::int32(1)),
        ));
        assert!(!bin.is_trivial());
        assert!(bin.source_column().is_none());
    }

    #[test]
    fn max_argument_finds_deepest_param() {
        let e = Expr::BinaryOp(BinaryOpExpr::new(
            BinaryOpType::Add,
            Expr::Param(ParamExpr::new(2)),
            Expr::Param(ParamExpr::new(5)),
        ));
        assert_eq!(e.max_argument(), 5);
    }

    #[test]
    fn as_aggregate_rejects_ungrouped_column() {
        let row = int_row("a");
        let c = Expr::Column(ColumnExpr::new(row.clone(), vec!["a".into()]).unwrap());
        assert!(c.as_aggregate(&[]).is_err());
        let group_col = row.column("a").unwrap().clone();
        assert!(c.as_aggregate(&[group_col]).is_ok());
    }

    #[test]
    fn replace_substitutes_named_var() {
        let v = Expr::Var(VarExpr::new("x", Type::basic(TypeClass::Int32), AggKind::None));
        let mut map = HashMap::new();
        map.insert("x".to_string(), Expr::Constant(ConstantExpr::int32(7)));
        assert_eq!(v.replace(&map), Expr::Constant(ConstantExpr::int32(7)));
    }

    #[test]
    fn display_renders_binary_op_infix() {
        let c = Expr::Column(ColumnExpr::new(int_row("a"), vec!["a".into()]).unwrap());
        let bin = Expr::BinaryOp(BinaryOpExpr::new(
            BinaryOpType::Add,
            c,
            Expr::Constant(ConstantExpr::int32(1)),
        ));
        assert_eq!(bin.to_string(), "(a + Int32(1))");
    }

    #[test]
    fn gather_eval_columns_collects_from_both_sides() {
        let row = int_row("a");
        let c1 = Expr::Column(ColumnExpr::new(row.clone(), vec!["a".into()]).unwrap());
        let c2 = Expr::Column(ColumnExpr::new(row, vec!["a".into()]).unwrap());
        let bin = Expr::BinaryOp(BinaryOpExpr::new(BinaryOpType::Add, c1, c2));
        let mut out = Vec::new();
        bin.gather_eval_columns(&mut out);
        assert_eq!(out.len(), 2);
    }
}
