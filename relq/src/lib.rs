//! Facade crate: re-exports the compiler front-end from `relq-core`.
//!
//! Downstream table engines depend on this crate for the parser, typed
//! expression IR, filter algebra and planner. The physical `Table` /
//! `Mapper` runtime and the code emitter are supplied by the engine itself.

pub use relq_core::*;
