use super::Type;
use crate::error::QueryException;
use std::collections::BTreeMap;
use std::fmt;

/// A row schema column: a named slot of a given `Type`, possibly excluded
/// from the default projection (`hidden`).
///
/// Mirrors the teacher's `ColumnDef`/`ColumnRef` split (identity vs.
/// metadata) collapsed into one struct since this crate has no SQL
/// rendering concern to separate them for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub r#type: Type,
    pub visible_name: String,
    pub field_name: String,
    pub hidden: bool,
    /// Whether this *position in the row* can be null, independent of
    /// `type`'s own nullable flag — needed so a nested/joined row (whose
    /// `type` is itself a `TupleType`, which carries no nullable flag of
    /// its own) can still be absent, e.g. after an outer join.
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, r#type: Type) -> Self {
        let name = name.into();
        let nullable = r#type.is_nullable();
        Self {
            r#type,
            visible_name: name.clone(),
            field_name: name,
            hidden: false,
            nullable,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Splits `field_name` on `.`, e.g. `"address.city"` -> `["address", "city"]`.
    pub fn sub_names(&self) -> Vec<&str> {
        self.field_name.split('.').collect()
    }
}

/// A row schema: an ordered, possibly-projected set of named columns.
///
/// `row_class` names the reflected row type when one exists (mirrors the
/// teacher's `ColumnRef::table`); `projection`, when present, records the
/// explicit output order a query requested (a subset/reordering of
/// `columns`' natural order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleType {
    pub row_class: Option<String>,
    pub projection: Option<Vec<String>>,
    pub columns: BTreeMap<String, Column>,
}

impl TupleType {
    pub fn new(columns: BTreeMap<String, Column>) -> Self {
        Self {
            row_class: None,
            projection: None,
            columns,
        }
    }

    pub fn with_row_class(mut self, row_class: impl Into<String>) -> Self {
        self.row_class = Some(row_class.into());
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Columns in the order the projection established, falling back to
    /// natural (name-sorted) order when no projection was applied.
    pub fn ordered_columns(&self) -> Vec<&Column> {
        match &self.projection {
            Some(names) => names.iter().filter_map(|n| self.columns.get(n)).collect(),
            None => self
                .columns
                .values()
                .filter(|c| !c.hidden)
                .collect(),
        }
    }

    /// Returns the subset tuple containing exactly the columns named by
    /// `names`, in that order. Errors if a name is absent.
    pub fn with_projection(&self, names: &[&str]) -> Result<TupleType, QueryException> {
        // Plain `std::result::Result`, not the crate's `anyhow`-based alias:
        // duplicate-column/unknown-column are caller-visible type errors
        // with a concrete kind the parser needs to pattern-match on.
        let mut columns = BTreeMap::new();
        for name in names {
            let col = self
                .columns
                .get(*name)
                .ok_or_else(|| QueryException::new(format!("Unknown column '{name}'"), 0, 0))?;
            columns.insert((*name).to_string(), col.clone());
        }
        Ok(TupleType {
            row_class: self.row_class.clone(),
            projection: Some(names.iter().map(|n| n.to_string()).collect()),
            columns,
        })
    }

    /// Component A: writes this schema's canonical key encoding,
    /// entity-deduplicated on `self`'s address — every `Rc<TupleType>`
    /// clone dereferences to the same allocation, so a row schema shared
    /// by many `ColumnExpr`s in one tree is only written out the first
    /// time it's seen.
    pub fn encode_key(&self, enc: &mut crate::keyenc::KeyEncoder) -> crate::error::Result<()> {
        if !enc.encode_entity(self, *crate::keyenc::TAG_TYPE_TUPLE)? {
            return Ok(());
        }
        match &self.row_class {
            Some(name) => {
                enc.write_bool(true);
                enc.write_object(name.clone());
            }
            None => enc.write_bool(false),
        }
        enc.write_array_len(Some(self.columns.len()));
        for (name, col) in &self.columns {
            enc.write_object(name.clone());
            col.r#type.encode_key(enc)?;
            enc.write_bool(col.hidden);
            enc.write_bool(col.nullable);
        }
        Ok(())
    }

    /// True iff `names` refers to every non-hidden column exactly once,
    /// unordered (a "pure, full" projection needs no subset tuple).
    pub fn is_full_projection(&self, names: &[&str]) -> bool {
        let visible: BTreeMap<&str, ()> = self
            .columns
            .iter()
            .filter(|(_, c)| !c.hidden)
            .map(|(n, _)| (n.as_str(), ()))
            .collect();
        if names.len() != visible.len() {
            return false;
        }
        let mut seen = std::collections::BTreeSet::new();
        names.iter().all(|n| visible.contains_key(n) && seen.insert(*n))
    }

    /// Synthesizes a fresh row type from a set of `(name, type)` pairs,
    /// deduplicated by that key — the type-system-level counterpart of
    /// the teacher's row-class codegen (`TupleType.make` in spec.md);
    /// the actual row-object class generation is delegated to the
    /// embedding engine (out of scope here, see `spec.md` §1).
    pub fn make(columns: impl IntoIterator<Item = (String, Type)>) -> Self {
        let mut map = BTreeMap::new();
        for (name, ty) in columns {
            map.entry(name.clone())
                .or_insert_with(|| Column::new(name, ty));
        }
        TupleType::new(map)
    }
}

impl fmt::Display for TupleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for col in self.ordered_columns() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}: {}", col.visible_name, col.r#type)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::basic::{BasicType, TypeClass};

    fn int_col(name: &str) -> Column {
        Column::new(name, Type::Basic(BasicType::new(TypeClass::Int32)))
    }

    #[test]
    fn with_projection_subsets() {
        let t = TupleType::new(BTreeMap::from([
            ("a".into(), int_col("a")),
            ("b".into(), int_col("b")),
            ("c".into(), int_col("c")),
        ]));
        let sub = t.with_projection(&["c", "a"]).unwrap();
        assert_eq!(sub.columns.len(), 2);
        assert_eq!(sub.ordered_columns()[0].visible_name, "c");
        assert_eq!(sub.ordered_columns()[1].visible_name, "a");
    }

    #[test]
    fn with_projection_unknown_column_errors() {
        let t = TupleType::new(BTreeMap::from([("a".into(), int_col("a"))]));
        assert!(t.with_projection(&["zzz"]).is_err());
    }

    #[test]
    fn is_full_projection_checks_coverage() {
        let t = TupleType::new(BTreeMap::from([
            ("a".into(), int_col("a")),
            ("b".into(), int_col("b")),
        ]));
        assert!(t.is_full_projection(&["a", "b"]));
        assert!(t.is_full_projection(&["b", "a"]));
        assert!(!t.is_full_projection(&["a"]));
        assert!(!t.is_full_projection(&["a", "a"]));
    }

    #[test]
    fn sub_names_splits_dotted_path() {
        let c = int_col("address.city");
        assert_eq!(c.sub_names(), vec!["address", "city"]);
    }
}
