//! Core of `relq`: tokenizer, recursive-descent parser, typed expression
//! IR, boolean filter algebra, and the two-stage query planner, plus the
//! supporting cache-key encoder, evaluation-context/emitter contract,
//! rolling-window value buffers, and weak compiled-artifact cache.
//!
//! This crate is the implementation; `relq` is a thin facade re-exporting
//! it (mirrors the teacher's `tank-core`/`tank` split).

pub mod cache;
pub mod config;
pub mod error;
pub mod eval;
pub mod expr;
pub mod filter;
pub mod keyenc;
pub mod parser;
pub mod plan;
pub mod token;
pub mod types;
pub mod window;

pub use config::Limits;
pub use error::{ComplexFilter, Error, QueryException, Result};
pub use expr::Expr;
pub use filter::RowFilter;
pub use keyenc::{Key, KeyEncoder};
pub use parser::{parse, ParsedQuery};
pub use plan::{build as build_plan, explain, MappedQueryExpr, QueryExpr, QuerySpec, TableExpr, UnmappedQueryExpr};
pub use token::{tokenize, Token, TokenKind};
pub use types::{BasicType, Cardinality, Column, RelationType, Type, TypeClass, TupleType};
