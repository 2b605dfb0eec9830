//! # Hornlog
//!
//! A minimal Horn-clause resolution engine in Rust.
//!
//! ## Features
//!
//! - First-order unification without occurs check
//! - Depth-first, left-to-right SLD resolution with lazy backtracking
//! - Canonical rendering of answers (`_.0`, `_.1`, ...)
//! - Example blocks embedded in rule files, run as conformance tests
//!
//! ## Example
//!
//! ```rust
//! use hornlog::{load, render, Query};
//!
//! let store = load(
//!     "LookUp (Bind val _) Z val.
//!      LookUp (Bind _ r) (S x) val <- LookUp r x val.",
//! )
//! .unwrap();
//!
//! let query = Query::parse("LookUp (Bind X (Bind Y [])) (S Z) v").unwrap();
//! let solution = store.solve(&query).next().unwrap().unwrap();
//! assert_eq!(render(&solution).to_string(), "v: Y");
//! ```

/// Runner settings.
pub mod config;
/// Resolution engine.
pub mod engine;
/// Error types.
pub mod error;
/// Rule-file and query parser.
pub mod parser;
/// Canonical answer rendering.
pub mod render;
/// Example block runner.
pub mod runner;
/// Clause storage.
pub mod store;
/// Substitutions.
pub mod subst;
/// Terms.
pub mod term;
/// Unification.
pub mod unify;

pub use config::RunnerConfig;
pub use engine::{query, Query, Solution, Solutions};
pub use error::{EngineError, ParseError};
pub use render::{render, Numbering, RenderedSolution, Renderer};
pub use runner::{Example, Failure, Outcome, Report, RuleFile};
pub use store::{Clause, ClauseStore, PredicateKey};
pub use subst::Substitution;
pub use term::{Name, Term, VarId};
pub use unify::unify;

/// Parses rule-file text into a clause store.
///
/// # Errors
///
/// Returns the first [`ParseError`] in the text; nothing is loaded then.
pub fn load(source: &str) -> Result<ClauseStore, ParseError> {
    let store: ClauseStore = parser::parse_program(source)?.into_iter().collect();
    log::debug!(
        "loaded {} clauses for {} predicates",
        store.len(),
        store.predicates().count()
    );
    Ok(store)
}
