//! Component G, "the centerpiece": lowering a typed filter expression into
//! the column-filter algebra, then the nine-step construction algorithm
//! that turns `(from, filter, projection)` into a pushdown/residual plan
//! tree of `TableExpr` / `UnmappedQueryExpr` / `MappedQueryExpr` nodes.

use crate::config::Limits;
use crate::error::QueryException;
use crate::expr::{AssignExpr, BinaryOpExpr, BinaryOpType, ColumnExpr, Expr, InExpr, ProjExpr};
use crate::filter::RowFilter;
use crate::types::{Cardinality, Column, TupleType, Type, TypeClass};
use std::collections::HashSet;
use std::rc::Rc;

/// Leaf relation: the join-identity table (the unit relation every query
/// without an explicit `from` builds on) or a physical table placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableExpr {
    pub row_type: Rc<TupleType>,
    pub cardinality: Cardinality,
    pub is_identity: bool,
}

impl TableExpr {
    pub fn identity(row_type: Rc<TupleType>) -> Self {
        Self {
            row_type,
            cardinality: Cardinality::One,
            is_identity: true,
        }
    }

    pub fn table(row_type: Rc<TupleType>, cardinality: Cardinality) -> Self {
        Self {
            row_type,
            cardinality,
            is_identity: false,
        }
    }
}

/// A pure `(projection, orderBy, filter)` triple handed to the underlying
/// table (see spec.md §6) — no per-row transform needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub projection: Vec<String>,
    pub order_by: String,
    pub filter: RowFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedQueryExpr {
    pub from: Rc<TableExpr>,
    pub spec: QuerySpec,
    pub row_type: Rc<TupleType>,
    pub cardinality: Cardinality,
}

/// Materializes a per-row transform on top of `from`: gathers the source
/// columns it actually reads, eagerly evaluates its `AssignExpr`s (see
/// spec.md §9 open question on eagerness), applies the residual filter,
/// and projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedQueryExpr {
    pub from: Box<QueryExpr>,
    pub eval_columns: Vec<Column>,
    pub assigns: Vec<AssignExpr>,
    pub residual_filter: RowFilter,
    pub projection: Vec<ProjExpr>,
    pub row_type: Rc<TupleType>,
    pub cardinality: Cardinality,
    /// Comma-joined source column names, set only when the read set is a
    /// strict subset of `from`'s row type (spec.md §4.G).
    pub source_projection: Option<String>,
}

/// Sealed: a query plan is a table, a pushed-down spec, or a mapped
/// per-row transform over either of those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpr {
    Table(TableExpr),
    Unmapped(UnmappedQueryExpr),
    Mapped(MappedQueryExpr),
}

impl QueryExpr {
    pub fn row_type(&self) -> Rc<TupleType> {
        match self {
            QueryExpr::Table(t) => t.row_type.clone(),
            QueryExpr::Unmapped(u) => u.row_type.clone(),
            QueryExpr::Mapped(m) => m.row_type.clone(),
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            QueryExpr::Table(t) => t.cardinality,
            QueryExpr::Unmapped(u) => u.cardinality,
            QueryExpr::Mapped(m) => m.cardinality,
        }
    }
}

/// Visitor turning a boolean expression tree into a `RowFilter` (spec.md
/// §4.G step 5): `&&`/`||` recurse into `and`/`or`; a relational
/// comparison with a column on one side and a column/param/constant on
/// the other becomes the matching `ColumnTo...Filter` (reversed if the
/// column sits on the right); everything else is `Opaque`.
pub fn to_row_filter(expr: &Expr) -> RowFilter {
    match expr {
        Expr::Constant(c) => match c.value.as_bool() {
            Some(true) => RowFilter::True,
            Some(false) => RowFilter::False,
            None => opaque(expr),
        },
        Expr::BinaryOp(b) if b.op == BinaryOpType::And => to_row_filter(&b.left).and(to_row_filter(&b.right)),
        Expr::BinaryOp(b) if b.op == BinaryOpType::Or => to_row_filter(&b.left).or(to_row_filter(&b.right)),
        Expr::BinaryOp(b) if b.op.is_comparison() => comparison_to_filter(b).unwrap_or_else(|| opaque(expr)),
        Expr::In(i) => in_to_filter(i).unwrap_or_else(|| opaque(expr)),
        Expr::Proj(p) => to_row_filter(&p.inner),
        _ => opaque(expr),
    }
}

fn opaque(expr: &Expr) -> RowFilter {
    RowFilter::Opaque {
        expr: Box::new(expr.clone()),
        negated: false,
    }
}

/// A `ColumnExpr` resolvable in the row, looking through trivial wrappers
/// (plain projections of a column read — see `Expr::is_trivial`).
fn as_column(e: &Expr) -> Option<&ColumnExpr> {
    match e {
        Expr::Column(c) => Some(c),
        Expr::Proj(p) if p.inner.is_trivial() => as_column(&p.inner),
        _ => None,
    }
}

fn comparison_to_filter(b: &BinaryOpExpr) -> Option<RowFilter> {
    if let Some(lcol) = as_column(&b.left) {
        let col = lcol.last_column()?.clone();
        if let Some(rcol) = as_column(&b.right) {
            return Some(RowFilter::ColumnToColumn {
                left: col,
                op: b.op,
                right: rcol.last_column()?.clone(),
            });
        }
        return match b.right.as_ref() {
            Expr::Param(p) => Some(RowFilter::ColumnToArg { col, op: b.op, arg: p.ordinal }),
            Expr::Constant(c) => Some(RowFilter::ColumnToConstant { col, op: b.op, value: c.value.clone() }),
            _ => None,
        };
    }
    if let Some(rcol) = as_column(&b.right) {
        let col = rcol.last_column()?.clone();
        let op = b.op.reversed();
        return match b.left.as_ref() {
            Expr::Param(p) => Some(RowFilter::ColumnToArg { col, op, arg: p.ordinal }),
            Expr::Constant(c) => Some(RowFilter::ColumnToConstant { col, op, value: c.value.clone() }),
            _ => None,
        };
    }
    None
}

fn in_to_filter(i: &InExpr) -> Option<RowFilter> {
    let col = as_column(&i.left)?.last_column()?.clone();
    match i.right.as_ref() {
        Expr::Param(p) => Some(RowFilter::In { col, arg: p.ordinal, not: i.not }),
        _ => None,
    }
}

/// True iff every term wraps a depth-1 `ColumnExpr`, there are no
/// duplicates, none are excluded, and none request ordering (spec.md
/// §4.G step 4).
fn is_pure_projection(projection: &[ProjExpr]) -> bool {
    let mut seen = HashSet::new();
    projection.iter().all(|p| {
        if p.flags.exclude || p.flags.order_by {
            return false;
        }
        match p.inner.as_ref() {
            Expr::Column(c) if c.path.len() == 1 => seen.insert(c.path[0].clone()),
            _ => false,
        }
    })
}

/// Builds a query plan for `from` (identity table if `None`), an optional
/// `filter`, and a projection list, following spec.md §4.G's nine steps.
pub fn build(
    from: Option<QueryExpr>,
    filter: Option<Expr>,
    projection: Vec<ProjExpr>,
    identity_row_type: Rc<TupleType>,
    limits: &Limits,
) -> Result<QueryExpr, QueryException> {
    // Step 1.
    let from = from.unwrap_or_else(|| QueryExpr::Table(TableExpr::identity(identity_row_type)));

    // Step 2: coerce to boolean (wrapping in a runtime-checked conversion
    // if it isn't already boolean-ish), then drop a constant-TRUE filter.
    let filter = filter.map(|f| {
        if is_boolean_ish(&f.type_of()) {
            f
        } else {
            let mut ty = Type::basic(TypeClass::Boolean);
            if f.is_nullable() {
                ty = ty.nullable();
            }
            f.as_type(ty)
        }
    });
    let filter = match filter {
        Some(f) if f.as_bool_constant() == Some(true) => None,
        other => other,
    };

    // Step 3: max_argument is a caller-visible property of the built plan,
    // not consumed further by construction itself; computed for callers
    // that need to size an argument vector (see `eval.rs`).
    let _max_argument = projection
        .iter()
        .map(|p| p.inner.max_argument())
        .chain(filter.iter().map(Expr::max_argument))
        .max()
        .unwrap_or(0);

    let row_type = from.row_type();
    let all_columns: HashSet<String> = row_type.columns.keys().cloned().collect();

    // Step 4.
    let natural_order: Vec<&str> = row_type.ordered_columns().iter().map(|c| c.field_name.as_str()).collect();
    let pure_projection = !projection.is_empty() && is_pure_projection(&projection);
    let spans_natural_order = pure_projection
        && projection.len() == natural_order.len()
        && projection.iter().zip(&natural_order).all(|(p, name)| match p.inner.as_ref() {
            Expr::Column(c) => c.path.len() == 1 && c.path[0] == *name,
            _ => false,
        });
    let needs_projection = !projection.is_empty() && !spans_natural_order;

    // Step 5.
    let row_filter = filter.as_ref().map(to_row_filter).unwrap_or(RowFilter::True);

    // Step 6.
    let row_filter = match row_filter.cnf(limits) {
        Ok(cnf) if !cnf.has_repeated_non_pure_opaque() => cnf,
        Ok(_) => {
            log::warn!("CNF expansion would duplicate a non-pure predicate, keeping original filter");
            row_filter
        }
        Err(_) => {
            log::warn!("filter too complex to normalize to CNF, keeping original filter");
            row_filter
        }
    };

    // Step 7.
    let (unmapped_row_filter, mapped_row_filter) = row_filter.split(&all_columns);

    // Step 8: pushdown.
    let all_columns_accounted = !needs_projection;
    if mapped_row_filter == RowFilter::True && pure_projection && all_columns_accounted {
        let spec = QuerySpec {
            projection: projection.iter().filter_map(proj_name).collect(),
            order_by: order_by_spec(&projection),
            filter: unmapped_row_filter,
        };
        return Ok(Ok::<QueryExpr, QueryException>(pushed_down(from, spec, row_type))?);
    }

    let pushed_from = if unmapped_row_filter != RowFilter::True {
        pushed_down(
            from,
            QuerySpec {
                projection: Vec::new(),
                order_by: String::new(),
                filter: unmapped_row_filter,
            },
            row_type.clone(),
        )
    } else {
        from
    };

    // Step 9.
    if mapped_row_filter == RowFilter::True && projection.is_empty() {
        return Ok(pushed_from);
    }

    let mut eval_columns = Vec::new();
    for p in &projection {
        p.inner.gather_eval_columns(&mut eval_columns);
    }
    if let Some(f) = &filter {
        f.gather_eval_columns(&mut eval_columns);
    }
    let read_names: HashSet<&str> = eval_columns.iter().map(|c| c.field_name.as_str()).collect();
    let source_projection = if read_names.len() < all_columns.len() {
        let mut names: Vec<&str> = read_names.into_iter().collect();
        names.sort_unstable();
        Some(names.join(","))
    } else {
        None
    };

    let assigns = projection
        .iter()
        .filter_map(|p| match p.inner.as_ref() {
            Expr::Assign(a) => Some(a.clone()),
            _ => None,
        })
        .collect();

    let out_row_type = output_row_type(&projection, &row_type);
    let cardinality = pushed_from.cardinality().filter(constant_bool(&filter));

    Ok(QueryExpr::Mapped(MappedQueryExpr {
        row_type: Rc::new(out_row_type),
        cardinality,
        from: Box::new(pushed_from),
        eval_columns,
        assigns,
        residual_filter: mapped_row_filter,
        projection,
        source_projection,
    }))
}

fn pushed_down(from: QueryExpr, spec: QuerySpec, row_type: Rc<TupleType>) -> QueryExpr {
    match from {
        QueryExpr::Table(t) => {
            let cardinality = t.cardinality;
            QueryExpr::Unmapped(UnmappedQueryExpr {
                from: Rc::new(t),
                spec,
                row_type,
                cardinality,
            })
        }
        // Already an UnmappedQueryExpr underneath: fold the new spec's
        // filter into the existing one rather than nesting (spec.md §4.G
        // describes a single pushed-down node, not a chain).
        QueryExpr::Unmapped(mut u) => {
            u.spec.filter = u.spec.filter.clone().and(spec.filter);
            if !spec.projection.is_empty() {
                u.spec.projection = spec.projection;
            }
            if !spec.order_by.is_empty() {
                u.spec.order_by = spec.order_by;
            }
            QueryExpr::Unmapped(u)
        }
        mapped @ QueryExpr::Mapped(_) => mapped,
    }
}

fn output_row_type(projection: &[ProjExpr], source: &TupleType) -> TupleType {
    if projection.is_empty() {
        return source.clone();
    }
    let columns = projection
        .iter()
        .filter(|p| !p.should_exclude())
        .filter_map(|p| {
            let name = proj_name(p)?;
            Some((name, p.inner.type_of()))
        });
    TupleType::make(columns)
}

fn proj_name(p: &ProjExpr) -> Option<String> {
    match p.inner.as_ref() {
        Expr::Column(c) => c.path.last().cloned(),
        Expr::Assign(a) => Some(a.name.clone()),
        _ => None,
    }
}

fn order_by_spec(projection: &[ProjExpr]) -> String {
    let mut out = String::new();
    for p in projection {
        if let Some(name) = proj_name(p) {
            p.append_to_order_by_spec(&name, &mut out);
        }
    }
    out
}

fn constant_bool(filter: &Option<Expr>) -> Option<bool> {
    filter.as_ref().and_then(Expr::as_bool_constant)
}

fn is_boolean_ish(ty: &Type) -> bool {
    ty.is_null() || ty.is_any() || matches!(ty.as_basic().map(|b| b.clazz), Some(TypeClass::Boolean))
}

/// Renders a plan tree for debugging (SPEC_FULL.md §9.1) — not part of
/// the pushdown contract.
pub fn explain(plan: &QueryExpr) -> String {
    match plan {
        QueryExpr::Table(t) => {
            if t.is_identity {
                "Table(identity)".to_string()
            } else {
                format!("Table[{}]", t.cardinality)
            }
        }
        QueryExpr::Unmapped(u) => format!(
            "Unmapped(filter={:?}, proj={:?}) <- {}",
            u.spec.filter, u.spec.projection, explain(&QueryExpr::Table((*u.from).clone()))
        ),
        QueryExpr::Mapped(m) => format!(
            "Mapped(residual={:?}, assigns={}) <- {}",
            m.residual_filter,
            m.assigns.len(),
            explain(&m.from)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ColumnExpr, ConstantExpr, ParamExpr, ProjFlags};
    use crate::types::BasicType;
    use std::collections::BTreeMap;

    fn row() -> Rc<TupleType> {
        Rc::new(TupleType::new(BTreeMap::from([
            ("a".to_string(), Column::new("a", Type::basic(TypeClass::Int32))),
            ("b".to_string(), Column::new("b", Type::basic(TypeClass::Int32))),
        ])))
    }

    fn col(row: &Rc<TupleType>, name: &str) -> Expr {
        Expr::Column(ColumnExpr::new(row.clone(), vec![name.to_string()]).unwrap())
    }

    #[test]
    fn to_row_filter_lowers_comparison_against_param() {
        let row = row();
        let cmp = Expr::BinaryOp(BinaryOpExpr::new(
            BinaryOpType::Greater,
            col(&row, "a"),
            Expr::Param(ParamExpr::new(1)),
        ));
        match to_row_filter(&cmp) {
            RowFilter::ColumnToArg { op, arg, .. } => {
                assert_eq!(op, BinaryOpType::Greater);
                assert_eq!(arg, 1);
            }
            other => panic!("expected ColumnToArg, got {other:?}"),
        }
    }

    #[test]
    fn to_row_filter_reverses_op_when_column_on_right() {
        let row = row();
        let cmp = Expr::BinaryOp(BinaryOpExpr::new(
            BinaryOpType::Less,
            Expr::Param(ParamExpr::new(1)),
            col(&row, "a"),
        ));
        match to_row_filter(&cmp) {
            RowFilter::ColumnToArg { op, .. } => assert_eq!(op, BinaryOpType::Greater),
            other => panic!("expected ColumnToArg, got {other:?}"),
        }
    }

    #[test]
    fn to_row_filter_falls_back_to_opaque() {
        let row = row();
        let sum = Expr::BinaryOp(BinaryOpExpr::new(BinaryOpType::Add, col(&row, "a"), col(&row, "b")));
        let cmp = Expr::BinaryOp(BinaryOpExpr::new(BinaryOpType::Greater, sum, Expr::Constant(ConstantExpr::int32(0))));
        assert!(matches!(to_row_filter(&cmp), RowFilter::Opaque { .. }));
    }

    #[test]
    fn pure_full_projection_pushes_down_entirely() {
        let row = row();
        let limits = Limits::default();
        let projection = vec![ProjExpr::plain(col(&row, "a")), ProjExpr::plain(col(&row, "b"))];
        let filter = Expr::BinaryOp(BinaryOpExpr::new(
            BinaryOpType::Greater,
            col(&row, "a"),
            Expr::Param(ParamExpr::new(1)),
        ));
        let plan = build(None, Some(filter), projection, row.clone(), &limits).unwrap();
        assert!(matches!(plan, QueryExpr::Unmapped(_)));
    }

    #[test]
    fn opaque_filter_forces_mapped_residual() {
        let row = row();
        let limits = Limits::default();
        let sum = Expr::BinaryOp(BinaryOpExpr::new(BinaryOpType::Add, col(&row, "a"), col(&row, "b")));
        let filter = Expr::BinaryOp(BinaryOpExpr::new(BinaryOpType::Greater, sum, Expr::Constant(ConstantExpr::int32(0))));
        let plan = build(None, Some(filter), Vec::new(), row.clone(), &limits).unwrap();
        match plan {
            QueryExpr::Mapped(m) => assert!(matches!(m.residual_filter, RowFilter::Opaque { .. })),
            other => panic!("expected Mapped, got {other:?}"),
        }
    }

    #[test]
    fn true_filter_and_no_projection_returns_from_unchanged() {
        let row = row();
        let limits = Limits::default();
        let plan = build(None, None, Vec::new(), row.clone(), &limits).unwrap();
        assert!(matches!(plan, QueryExpr::Table(t) if t.is_identity));
    }

    #[test]
    fn assign_projection_produces_mapped_with_assigns() {
        let row = row();
        let limits = Limits::default();
        let assign = Expr::Assign(AssignExpr::new("c", Expr::BinaryOp(BinaryOpExpr::new(
            BinaryOpType::Add,
            col(&row, "a"),
            Expr::Constant(ConstantExpr::int32(1)),
        ))));
        let projection = vec![ProjExpr::plain(assign), ProjExpr::new(col(&row, "a"), ProjFlags::default())];
        let plan = build(None, None, projection, row.clone(), &limits).unwrap();
        match plan {
            QueryExpr::Mapped(m) => assert_eq!(m.assigns.len(), 1),
            other => panic!("expected Mapped, got {other:?}"),
        }
    }

    #[test]
    fn explain_renders_without_panicking() {
        let row = row();
        let limits = Limits::default();
        let plan = build(None, None, Vec::new(), row, &limits).unwrap();
        assert!(!explain(&plan).is_empty());
    }
}
