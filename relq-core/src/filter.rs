//! Component F: the column-filter algebra `to_row_filter` lowers boolean
//! expression trees into. Flat `And`/`Or`, CNF normalization under a
//! term budget, simplification (`reduce_more`), and the pushdown/residual
//! `split` the planner (component G) builds its plan tree from.

use crate::config::Limits;
use crate::error::ComplexFilter;
use crate::expr::{BinaryOpType, ConstValue, Expr};
use crate::types::Column;
use std::collections::HashSet;

/// A lowered boolean predicate over a row. Mirrors the teacher's flat,
/// visitable operator-enum style (`expression::matcher`) rather than a
/// trait-object hierarchy, since every operation here (`not`, `cnf`,
/// `split`) needs to pattern-match across every shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    True,
    False,
    /// Flat conjunction; always at least 2 children (construct via `and`,
    /// never directly, to preserve that invariant).
    And(Vec<RowFilter>),
    Or(Vec<RowFilter>),
    Not(Box<RowFilter>),
    ColumnToArg {
        col: Column,
        op: BinaryOpType,
        arg: u32,
    },
    ColumnToConstant {
        col: Column,
        op: BinaryOpType,
        value: ConstValue,
    },
    ColumnToColumn {
        left: Column,
        op: BinaryOpType,
        right: Column,
    },
    In {
        col: Column,
        arg: u32,
        not: bool,
    },
    /// Escape hatch for a predicate that doesn't decompose into the
    /// shapes above — carries the original expression and whether it's
    /// logically negated (rather than re-deriving `expr.not()`, which
    /// may not exist for a non-boolean-rewritable node).
    Opaque {
        expr: Box<Expr>,
        negated: bool,
    },
}

impl RowFilter {
    pub fn and(self, other: RowFilter) -> RowFilter {
        match (self, other) {
            (RowFilter::False, _) | (_, RowFilter::False) => RowFilter::False,
            (RowFilter::True, x) | (x, RowFilter::True) => x,
            (RowFilter::And(mut a), RowFilter::And(b)) => {
                a.extend(b);
                RowFilter::And(a)
            }
            (RowFilter::And(mut a), b) => {
                a.push(b);
                RowFilter::And(a)
            }
            (a, RowFilter::And(mut b)) => {
                b.insert(0, a);
                RowFilter::And(b)
            }
            (a, b) => RowFilter::And(vec![a, b]),
        }
    }

    pub fn or(self, other: RowFilter) -> RowFilter {
        match (self, other) {
            (RowFilter::True, _) | (_, RowFilter::True) => RowFilter::True,
            (RowFilter::False, x) | (x, RowFilter::False) => x,
            (RowFilter::Or(mut a), RowFilter::Or(b)) => {
                a.extend(b);
                RowFilter::Or(a)
            }
            (RowFilter::Or(mut a), b) => {
                a.push(b);
                RowFilter::Or(a)
            }
            (a, RowFilter::Or(mut b)) => {
                b.insert(0, a);
                RowFilter::Or(b)
            }
            (a, b) => RowFilter::Or(vec![a, b]),
        }
    }

    /// Pushes negation inward: De Morgan over `And`/`Or`, operator
    /// complement over the column comparisons, flag flip on `In`,
    /// cancellation on double-`Not`.
    pub fn not(self) -> RowFilter {
        match self {
            RowFilter::True => RowFilter::False,
            RowFilter::False => RowFilter::True,
            RowFilter::Not(inner) => *inner,
            RowFilter::And(children) => RowFilter::Or(children.into_iter().map(RowFilter::not).collect()),
            RowFilter::Or(children) => RowFilter::And(children.into_iter().map(RowFilter::not).collect()),
            RowFilter::ColumnToArg { col, op, arg } => match op.complement() {
                Some(op) => RowFilter::ColumnToArg { col, op, arg },
                None => RowFilter::Not(Box::new(RowFilter::ColumnToArg { col, op, arg })),
            },
            RowFilter::ColumnToConstant { col, op, value } => match op.complement() {
                Some(op) => RowFilter::ColumnToConstant { col, op, value },
                None => RowFilter::Not(Box::new(RowFilter::ColumnToConstant { col, op, value })),
            },
            RowFilter::ColumnToColumn { left, op, right } => match op.complement() {
                Some(op) => RowFilter::ColumnToColumn { left, op, right },
                None => RowFilter::Not(Box::new(RowFilter::ColumnToColumn { left, op, right })),
            },
            RowFilter::In { col, arg, not } => RowFilter::In { col, arg, not: !not },
            RowFilter::Opaque { expr, negated } => RowFilter::Opaque { expr, negated: !negated },
        }
    }

    /// Converts to conjunctive normal form, charging `limits.max_cnf_terms`
    /// against every intermediate clause/term produced; raises
    /// `ComplexFilter` rather than let an adversarial `Or`-of-`And`s blow
    /// up memory via the distribution step.
    pub fn cnf(&self, limits: &Limits) -> Result<RowFilter, ComplexFilter> {
        let mut budget = limits.max_cnf_terms;
        cnf_rec(self, &mut budget)
    }

    /// Idempotence (duplicate child removal), absorption (`True`/`False`
    /// terminators collapse their parent), and contradiction/tautology
    /// detection (`f && !f` -> `False`, `f || !f` -> `True`) restricted to
    /// direct siblings — not a full SAT solver, just the cheap local
    /// rewrites the source spec calls for.
    pub fn reduce_more(&self) -> RowFilter {
        match self {
            RowFilter::And(children) => reduce_assoc(children, true),
            RowFilter::Or(children) => reduce_assoc(children, false),
            RowFilter::Not(inner) => inner.reduce_more().not(),
            other => other.clone(),
        }
    }

    /// Splits into `(pushable, residual)` over `all_columns`: a top-level
    /// conjunct is pushable iff every column it mentions is in
    /// `all_columns` and it contains no `Opaque` subterm.
    pub fn split(&self, all_columns: &HashSet<String>) -> (RowFilter, RowFilter) {
        let clauses: Vec<&RowFilter> = match self {
            RowFilter::And(cs) => cs.iter().collect(),
            other => vec![other],
        };
        let mut pushable = Vec::new();
        let mut residual = Vec::new();
        for c in clauses {
            if c.is_pushable(all_columns) {
                pushable.push(c.clone());
            } else {
                residual.push(c.clone());
            }
        }
        (combine_and(pushable), combine_and(residual))
    }

    fn is_pushable(&self, all_columns: &HashSet<String>) -> bool {
        match self {
            RowFilter::True | RowFilter::False => true,
            RowFilter::ColumnToArg { col, .. } | RowFilter::ColumnToConstant { col, .. } => {
                all_columns.contains(&col.field_name)
            }
            RowFilter::ColumnToColumn { left, right, .. } => {
                all_columns.contains(&left.field_name) && all_columns.contains(&right.field_name)
            }
            RowFilter::In { col, .. } => all_columns.contains(&col.field_name),
            RowFilter::Opaque { .. } => false,
            RowFilter::Not(inner) => inner.is_pushable(all_columns),
            RowFilter::And(cs) | RowFilter::Or(cs) => cs.iter().all(|c| c.is_pushable(all_columns)),
        }
    }

    /// Whether any non-pure `Opaque` expression appears more than once —
    /// the signal `plan.rs` uses to reject a CNF expansion that would
    /// re-run a non-pure predicate (spec.md §7.4, "hasRepeatedNonPureFunctions").
    pub fn has_repeated_non_pure_opaque(&self) -> bool {
        let mut seen: Vec<&Expr> = Vec::new();
        self.collect_non_pure_opaques(&mut seen);
        seen.iter()
            .enumerate()
            .any(|(i, e)| seen[i + 1..].contains(e))
    }

    fn collect_non_pure_opaques<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        match self {
            RowFilter::And(cs) | RowFilter::Or(cs) => {
                for c in cs {
                    c.collect_non_pure_opaques(out);
                }
            }
            RowFilter::Not(c) => c.collect_non_pure_opaques(out),
            RowFilter::Opaque { expr, .. } if !expr.is_pure() => out.push(expr),
            _ => {}
        }
    }
}

fn combine_and(clauses: Vec<RowFilter>) -> RowFilter {
    clauses.into_iter().fold(RowFilter::True, RowFilter::and)
}

fn reduce_assoc(children: &[RowFilter], is_and: bool) -> RowFilter {
    let (identity, absorbing) = if is_and {
        (RowFilter::True, RowFilter::False)
    } else {
        (RowFilter::False, RowFilter::True)
    };
    let mut reduced: Vec<RowFilter> = Vec::new();
    for c in children {
        let r = c.reduce_more();
        if r == absorbing {
            return absorbing;
        }
        if r == identity {
            continue;
        }
        let same_shape_children = match &r {
            RowFilter::And(sub) if is_and => Some(sub.clone()),
            RowFilter::Or(sub) if !is_and => Some(sub.clone()),
            _ => None,
        };
        match same_shape_children {
            Some(sub) => {
                for s in sub {
                    if !reduced.contains(&s) {
                        reduced.push(s);
                    }
                }
            }
            None => {
                if !reduced.contains(&r) {
                    reduced.push(r);
                }
            }
        }
    }
    for i in 0..reduced.len() {
        for j in (i + 1)..reduced.len() {
            if reduced[i] == reduced[j].clone().not() {
                return absorbing;
            }
        }
    }
    match reduced.len() {
        0 => identity,
        1 => reduced.into_iter().next().unwrap(),
        _ if is_and => RowFilter::And(reduced),
        _ => RowFilter::Or(reduced),
    }
}

fn cnf_rec(f: &RowFilter, budget: &mut usize) -> Result<RowFilter, ComplexFilter> {
    match f {
        RowFilter::Not(inner) => cnf_rec(&(**inner).clone().not(), budget),
        RowFilter::And(children) => {
            let mut out = Vec::new();
            for c in children {
                match cnf_rec(c, budget)? {
                    RowFilter::And(sub) => out.extend(sub),
                    other => out.push(other),
                }
            }
            charge(budget, out.len())?;
            Ok(if out.len() == 1 {
                out.into_iter().next().unwrap()
            } else {
                RowFilter::And(out)
            })
        }
        RowFilter::Or(children) => {
            let mut clause_lists: Vec<Vec<RowFilter>> = Vec::new();
            for c in children {
                match cnf_rec(c, budget)? {
                    RowFilter::And(sub) => clause_lists.push(sub),
                    other => clause_lists.push(vec![other]),
                }
            }
            let mut acc: Vec<Vec<RowFilter>> = vec![Vec::new()];
            for clauses in clause_lists {
                let mut next = Vec::new();
                for prefix in &acc {
                    for clause in &clauses {
                        charge(budget, 1)?;
                        let mut p = prefix.clone();
                        p.push(clause.clone());
                        next.push(p);
                    }
                }
                acc = next;
            }
            let terms: Vec<RowFilter> = acc
                .into_iter()
                .map(|ors| {
                    if ors.len() == 1 {
                        ors.into_iter().next().unwrap()
                    } else {
                        RowFilter::Or(ors)
                    }
                })
                .collect();
            charge(budget, terms.len())?;
            Ok(if terms.len() == 1 {
                terms.into_iter().next().unwrap()
            } else {
                RowFilter::And(terms)
            })
        }
        other => Ok(other.clone()),
    }
}

fn charge(budget: &mut usize, n: usize) -> Result<(), ComplexFilter> {
    if n > *budget {
        return Err(ComplexFilter);
    }
    *budget -= n;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BasicType, Type, TypeClass};

    fn col(name: &str) -> Column {
        Column::new(name, Type::Basic(BasicType::new(TypeClass::Int32)))
    }

    fn cmp(name: &str, op: BinaryOpType, arg: u32) -> RowFilter {
        RowFilter::ColumnToArg { col: col(name), op, arg }
    }

    #[test]
    fn not_flips_column_to_arg_complement() {
        let f = cmp("a", BinaryOpType::Greater, 1);
        match f.not() {
            RowFilter::ColumnToArg { op, .. } => assert_eq!(op, BinaryOpType::LessEqual),
            _ => panic!("expected ColumnToArg"),
        }
    }

    #[test]
    fn double_not_cancels() {
        let f = cmp("a", BinaryOpType::Greater, 1);
        assert_eq!(f.clone().not().not(), f);
    }

    #[test]
    fn and_absorbs_false() {
        let f = cmp("a", BinaryOpType::Greater, 1).and(RowFilter::False);
        assert_eq!(f, RowFilter::False);
    }

    #[test]
    fn and_flattens_nested_and() {
        let f = RowFilter::True
            .and(cmp("a", BinaryOpType::Greater, 1))
            .and(cmp("b", BinaryOpType::Less, 2));
        match f {
            RowFilter::And(children) => assert_eq!(children.len(), 2),
            _ => panic!("expected flat And"),
        }
    }

    #[test]
    fn reduce_more_drops_duplicates() {
        let f = RowFilter::And(vec![
            cmp("a", BinaryOpType::Greater, 1),
            cmp("a", BinaryOpType::Greater, 1),
        ]);
        assert_eq!(f.reduce_more(), cmp("a", BinaryOpType::Greater, 1));
    }

    #[test]
    fn reduce_more_is_idempotent() {
        let f = RowFilter::And(vec![
            cmp("a", BinaryOpType::Greater, 1),
            RowFilter::True,
            cmp("b", BinaryOpType::Less, 2),
        ]);
        let once = f.reduce_more();
        assert_eq!(once.clone().reduce_more(), once);
    }

    #[test]
    fn reduce_more_detects_contradiction() {
        let a = cmp("a", BinaryOpType::Greater, 1);
        let f = RowFilter::And(vec![a.clone(), a.not()]);
        assert_eq!(f.reduce_more(), RowFilter::False);
    }

    #[test]
    fn cnf_distributes_or_over_and() {
        let limits = Limits::default();
        let a = cmp("a", BinaryOpType::Greater, 1);
        let b = cmp("b", BinaryOpType::Greater, 2);
        let c = cmp("c", BinaryOpType::Greater, 3);
        // a || (b && c)  ==  (a || b) && (a || c)
        let f = a.clone().or(RowFilter::And(vec![b.clone(), c.clone()]));
        let cnf = f.cnf(&limits).unwrap();
        match cnf {
            RowFilter::And(clauses) => assert_eq!(clauses.len(), 2),
            _ => panic!("expected And of two Or clauses"),
        }
    }

    #[test]
    fn split_separates_pushable_from_opaque() {
        let pushable = cmp("a", BinaryOpType::Greater, 1);
        let opaque = RowFilter::Opaque {
            expr: Box::new(crate::expr::Expr::Constant(crate::expr::ConstantExpr::bool(true))),
            negated: false,
        };
        let f = RowFilter::And(vec![pushable.clone(), opaque.clone()]);
        let mut all_columns = HashSet::new();
        all_columns.insert("a".to_string());
        let (unmapped, mapped) = f.split(&all_columns);
        assert_eq!(unmapped, pushable);
        assert_eq!(mapped, opaque);
    }
}
