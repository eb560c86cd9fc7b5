use std::fmt;

/// Crate-wide result alias using `anyhow` for internal plumbing.
pub type Result<T> = anyhow::Result<T>;
/// Crate-wide error alias using `anyhow`.
pub type Error = anyhow::Error;

/// A compile-time error with the source span of the offending construct.
///
/// Every lex, parse, type, and plan error surfaces as one of these; the
/// planner never swallows one except `ComplexFilter`, which is recovered
/// from locally (see `filter::RowFilter::cnf`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryException {
    pub message: String,
    pub start_pos: usize,
    pub end_pos: usize,
}

impl QueryException {
    pub fn new(message: impl Into<String>, start_pos: usize, end_pos: usize) -> Self {
        Self {
            message: message.into(),
            start_pos,
            end_pos,
        }
    }

    pub fn span(&self) -> (usize, usize) {
        (self.start_pos, self.end_pos)
    }
}

impl fmt::Display for QueryException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}..{})",
            self.message, self.start_pos, self.end_pos
        )
    }
}

impl std::error::Error for QueryException {}

/// Raised internally by `RowFilter::cnf` when the conjunctive-normal-form
/// expansion would exceed `Limits::max_cnf_terms`. Never propagated past
/// the planner: `to_row_filter` catches it and falls back to the
/// pre-CNF filter before `split`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexFilter;

impl fmt::Display for ComplexFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter too complex to normalize to CNF")
    }
}

impl std::error::Error for ComplexFilter {}
