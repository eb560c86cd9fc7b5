use crate::error::QueryException;
use crate::types::{Column, TupleType, Type};
use std::rc::Rc;

/// A (possibly dotted) column read. Pure and non-throwing: it never
/// constant-folds, but it also never fails at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnExpr {
    pub row_type: Rc<TupleType>,
    pub path: Vec<String>,
    resolved_type: Type,
    resolved_nullable: bool,
}

impl ColumnExpr {
    /// Resolves `path` against `row_type`, walking into nested tuple
    /// columns for each dotted step. A step becomes nullable if any
    /// ancestor step's column is nullable (spec.md §3 invariant 5).
    pub fn new(row_type: Rc<TupleType>, path: Vec<String>) -> Result<Self, QueryException> {
        if path.is_empty() {
            return Err(QueryException::new("Empty column path", 0, 0));
        }
        let mut current = row_type.clone();
        let mut nullable = false;
        let mut last_type = Type::Null;
        for (i, step) in path.iter().enumerate() {
            let col = current
                .column(step)
                .ok_or_else(|| QueryException::new(format!("Unknown column '{step}'"), 0, 0))?;
            nullable |= col.nullable;
            last_type = col.r#type.clone();
            let is_last = i + 1 == path.len();
            if !is_last {
                current = match &col.r#type {
                    Type::Tuple(t) => t.clone(),
                    _ => {
                        return Err(QueryException::new(
                            format!("'{step}' is not a nested row"),
                            0,
                            0,
                        ));
                    }
                };
            }
        }
        let resolved_type = if nullable {
            last_type.nullable()
        } else {
            last_type
        };
        Ok(Self {
            row_type,
            path,
            resolved_type,
            resolved_nullable: nullable,
        })
    }

    pub fn type_of(&self) -> Type {
        self.resolved_type.clone()
    }

    pub fn is_nullable(&self) -> bool {
        self.resolved_nullable
    }

    /// Last column definition on the path (the one this expression
    /// ultimately reads).
    pub fn last_column(&self) -> Option<&Column> {
        let mut current = &self.row_type;
        let mut col = None;
        for (i, step) in self.path.iter().enumerate() {
            col = current.column(step);
            if i + 1 < self.path.len() {
                current = match col.map(|c| &c.r#type) {
                    Some(Type::Tuple(t)) => t,
                    _ => return None,
                };
            }
        }
        col
    }

    /// Dotted name, e.g. `"address.city"`.
    pub fn dotted_name(&self) -> String {
        self.path.join(".")
    }
}
