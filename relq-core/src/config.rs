/// Compile-time tunables for the planner and encoder.
///
/// There is no persisted configuration at this layer (the embedding table
/// engine owns whatever configuration surface it exposes); this struct
/// only gathers the handful of budgets the spec calls out explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Upper bound on the number of clauses `RowFilter::cnf` will produce
    /// before giving up and raising `ComplexFilter`.
    pub max_cnf_terms: usize,
    /// Upper bound on entities tracked by a single `KeyEncoder` session
    /// before it refuses further `encode` calls (guards against runaway
    /// shared-subtree fan-out turning into an unbounded entity table).
    pub max_entity_table_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_cnf_terms: 256,
            max_entity_table_len: 4096,
        }
    }
}
