//! Evaluation context and code emitter (component H): the per-build
//! state threaded through expression-tree emission, and the abstract
//! surface a concrete codegen backend implements against.
//!
//! Grounded on the teacher's `writer::Context`/`SqlWriter`
//! (`writer/context.rs`): a mutable context carrying emission-scoped
//! state, consumed by a trait-object-shaped writer. That crate's
//! `Context` tracks SQL-text concerns (current fragment, table
//! qualification); this one tracks the concerns an expression-tree
//! lowering pass needs instead (argument/row handles, a
//! common-subexpression memo, local bindings) — same shape, generalized
//! away from SQL emission to arbitrary bytecode/native emission.
//!
//! No concrete `Emitter` ships here — a backend (bytecode interpreter,
//! JIT, tree-walking evaluator) is out of this crate's scope (spec.md
//! §1, §6); `Emitter` is the contract a caller's backend must satisfy.

use smallvec::SmallVec;
use std::collections::HashMap;

use crate::expr::{BinaryOpType, ConstValue};
use crate::types::Type;

/// Abstract codegen operations an `EvalContext` drives while walking an
/// `Expr` tree. A concrete implementation owns the actual target
/// representation (bytecode buffer, SSA builder, ...); `Var`/`Label` are
/// opaque handles into it that `EvalContext` only ever threads through,
/// never inspects.
pub trait Emitter {
    type Var: Clone;
    type Label: Clone;

    fn alloc_var(&mut self, ty: &Type) -> Self::Var;
    fn alloc_label(&mut self) -> Self::Label;
    fn mark_label(&mut self, label: &Self::Label);
    fn branch(&mut self, target: &Self::Label);
    fn branch_if_false(&mut self, cond: &Self::Var, target: &Self::Label);

    fn constant(&mut self, value: &ConstValue) -> Self::Var;
    fn load_arg(&mut self, ordinal: u32) -> Self::Var;
    fn load_field(&mut self, base: &Self::Var, field_name: &str) -> Self::Var;
    fn binary_op(&mut self, op: BinaryOpType, left: &Self::Var, right: &Self::Var) -> Self::Var;
    fn not_op(&mut self, arg: &Self::Var) -> Self::Var;
    fn convert(&mut self, value: &Self::Var, target: &Type) -> Self::Var;
    fn invoke_method(&mut self, name: &str, args: &[Self::Var]) -> Self::Var;
    fn new_instance(&mut self, row_type_name: &str, fields: &[(String, Self::Var)]) -> Self::Var;
}

/// A point in time in `EvalContext`'s memo/locals, for scoping the
/// short-circuited right-hand side of `&&`/`||`: emit it speculatively,
/// then either `ref_commit` (it ran) or `ref_rollback` (it didn't, so
/// undo any memo entries and local bindings it created).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savepoint {
    memo_len: usize,
    locals_len: usize,
}

struct MemoSlot<V> {
    key: *const (),
    value: V,
    valid: bool,
}

/// Per-emission state: an argument-vector handle, a source-row handle, a
/// result memo keyed by expression identity (for common-subexpression
/// reuse within one emission), and a local-variable name→handle table.
/// Generic over the `Emitter` backend it drives.
pub struct EvalContext<E: Emitter> {
    pub emitter: E,
    args: SmallVec<[E::Var; 4]>,
    row: E::Var,
    memo: Vec<MemoSlot<E::Var>>,
    memo_index: HashMap<*const (), usize>,
    locals: SmallVec<[(String, E::Var); 4]>,
}

impl<E: Emitter> EvalContext<E> {
    pub fn new(emitter: E, args: Vec<E::Var>, row: E::Var) -> Self {
        Self {
            emitter,
            args: SmallVec::from_vec(args),
            row,
            memo: Vec::new(),
            memo_index: HashMap::new(),
            locals: SmallVec::new(),
        }
    }

    pub fn row(&self) -> &E::Var {
        &self.row
    }

    pub fn arg(&self, ordinal: u32) -> &E::Var {
        &self.args[ordinal as usize]
    }

    pub fn ref_savepoint(&self) -> Savepoint {
        Savepoint {
            memo_len: self.memo.len(),
            locals_len: self.locals.len(),
        }
    }

    /// Invalidates every memo entry and local binding created since
    /// `sp`. The memo vector itself isn't truncated (entries may still
    /// be referenced by an index taken before the rollback point via
    /// `memo_index`'s surviving keys), just marked dead and removed from
    /// the identity index so a later lookup treats them as a fresh miss.
    pub fn ref_rollback(&mut self, sp: Savepoint) {
        for slot in &mut self.memo[sp.memo_len..] {
            slot.valid = false;
        }
        self.memo_index.retain(|_, idx| *idx < sp.memo_len);
        self.locals.truncate(sp.locals_len);
    }

    /// Keeps everything created since `sp` — the branch ran for real.
    pub fn ref_commit(&mut self, _sp: Savepoint) {}

    /// Looks up the memoized emission for `key`'s identity; on a miss
    /// (absent, or rolled back since) calls `build` and records the
    /// result.
    pub fn memoize<T>(&mut self, key: &T, build: impl FnOnce(&mut Self) -> E::Var) -> E::Var {
        let ptr = key as *const T as *const ();
        if let Some(&idx) = self.memo_index.get(&ptr) {
            if self.memo[idx].valid {
                return self.memo[idx].value.clone();
            }
        }
        let value = build(self);
        let idx = self.memo.len();
        self.memo.push(MemoSlot {
            key: ptr,
            value: value.clone(),
            valid: true,
        });
        self.memo_index.insert(ptr, idx);
        value
    }

    pub fn bind_local(&mut self, name: impl Into<String>, value: E::Var) {
        self.locals.push((name.into(), value));
    }

    /// Most recent binding of `name` wins (shadowing), matching
    /// `AssignExpr`'s "a duplicate name at the same scope shadows"
    /// semantics (`expr/assign.rs`).
    pub fn lookup_local(&self, name: &str) -> Option<&E::Var> {
        self.locals.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingEmitter {
        next_var: u32,
    }

    impl Emitter for CountingEmitter {
        type Var = u32;
        type Label = u32;

        fn alloc_var(&mut self, _ty: &Type) -> Self::Var {
            self.next_var += 1;
            self.next_var
        }
        fn alloc_label(&mut self) -> Self::Label {
            self.next_var += 1;
            self.next_var
        }
        fn mark_label(&mut self, _label: &Self::Label) {}
        fn branch(&mut self, _target: &Self::Label) {}
        fn branch_if_false(&mut self, _cond: &Self::Var, _target: &Self::Label) {}
        fn constant(&mut self, _value: &ConstValue) -> Self::Var {
            self.alloc_var(&Type::Null)
        }
        fn load_arg(&mut self, ordinal: u32) -> Self::Var {
            ordinal
        }
        fn load_field(&mut self, base: &Self::Var, _field_name: &str) -> Self::Var {
            *base
        }
        fn binary_op(&mut self, _op: BinaryOpType, left: &Self::Var, _right: &Self::Var) -> Self::Var {
            *left
        }
        fn not_op(&mut self, arg: &Self::Var) -> Self::Var {
            *arg
        }
        fn convert(&mut self, value: &Self::Var, _target: &Type) -> Self::Var {
            *value
        }
        fn invoke_method(&mut self, _name: &str, _args: &[Self::Var]) -> Self::Var {
            self.alloc_var(&Type::Null)
        }
        fn new_instance(&mut self, _row_type_name: &str, _fields: &[(String, Self::Var)]) -> Self::Var {
            self.alloc_var(&Type::Null)
        }
    }

    #[test]
    fn memoize_reuses_within_savepoint() {
        let mut ctx = EvalContext::new(CountingEmitter::default(), vec![10, 20], 0);
        let key = 42u32;
        let mut builds = 0;
        let first = ctx.memoize(&key, |_| {
            builds += 1;
            99
        });
        let second = ctx.memoize(&key, |_| {
            builds += 1;
            100
        });
        assert_eq!(first, second);
        assert_eq!(builds, 1);
    }

    #[test]
    fn rollback_invalidates_entries_since_savepoint() {
        let mut ctx = EvalContext::new(CountingEmitter::default(), vec![], 0);
        let sp = ctx.ref_savepoint();
        let key = 7u32;
        ctx.memoize(&key, |_| 1);
        ctx.ref_rollback(sp);
        let mut builds = 0;
        ctx.memoize(&key, |_| {
            builds += 1;
            2
        });
        assert_eq!(builds, 1, "rolled-back memo entry must miss on next lookup");
    }

    #[test]
    fn commit_keeps_entries_since_savepoint() {
        let mut ctx = EvalContext::new(CountingEmitter::default(), vec![], 0);
        let sp = ctx.ref_savepoint();
        let key = 7u32;
        ctx.memoize(&key, |_| 1);
        ctx.ref_commit(sp);
        let mut builds = 0;
        let v = ctx.memoize(&key, |_| {
            builds += 1;
            2
        });
        assert_eq!(builds, 0, "committed memo entry must still hit");
        assert_eq!(v, 1);
    }

    #[test]
    fn locals_shadow_and_unwind_on_rollback() {
        let mut ctx = EvalContext::new(CountingEmitter::default(), vec![], 0);
        ctx.bind_local("x", 1);
        let sp = ctx.ref_savepoint();
        ctx.bind_local("x", 2);
        assert_eq!(*ctx.lookup_local("x").unwrap(), 2);
        ctx.ref_rollback(sp);
        assert_eq!(*ctx.lookup_local("x").unwrap(), 1);
    }
}
