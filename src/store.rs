use std::fmt;

use indexmap::IndexMap;
use log::debug;
use smallvec::SmallVec;

use crate::term::{Name, Term};

/// Predicate name and arity (e.g. `LookUp/3`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PredicateKey {
    /// The predicate symbol
    pub name: Name,
    /// Number of arguments
    pub arity: usize,
}

impl PredicateKey {
    /// Create a key from a name and arity
    #[must_use]
    pub fn new(name: &str, arity: usize) -> Self {
        Self {
            name: Name::from(name),
            arity,
        }
    }
}

impl fmt::Display for PredicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// A Horn clause (e.g. `LookUp (Bind _ r) (S x) val <- LookUp r x val`)
///
/// Variables are numbered clause-locally from zero, so an instance is made by
/// shifting every id into a fresh block of the substitution arena.
#[derive(Debug, Clone)]
pub struct Clause {
    /// The conclusion of the clause
    pub head: Term,
    /// Goals that must hold for the head to hold; empty for a fact
    pub body: SmallVec<[Term; 4]>,
    var_count: usize,
}

impl Clause {
    /// Create a clause, counting the clause-local variables it uses.
    ///
    /// # Panics
    ///
    /// Panics if the head is not an atom or compound.
    #[must_use]
    pub fn new(head: Term, body: impl IntoIterator<Item = Term>) -> Self {
        assert!(
            head.functor().is_some(),
            "clause head must be an atom or compound, got {head}"
        );
        let body: SmallVec<[Term; 4]> = body.into_iter().collect();
        let var_count = std::iter::once(&head)
            .chain(&body)
            .filter_map(Term::max_var)
            .max()
            .map_or(0, |max| max.index() + 1);
        Self {
            head,
            body,
            var_count,
        }
    }

    /// Create a fact (clause with an empty body)
    #[must_use]
    pub fn fact(head: Term) -> Self {
        Self::new(head, [])
    }

    /// Returns true if this is a fact (no body)
    #[must_use]
    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    /// Number of clause-local variables (`0..var_count`)
    #[must_use]
    pub fn var_count(&self) -> usize {
        self.var_count
    }

    /// The predicate this clause defines
    ///
    /// # Panics
    ///
    /// Does not panic for clauses built through [`Clause::new`].
    #[must_use]
    pub fn key(&self) -> PredicateKey {
        let (name, arity) = self
            .head
            .functor()
            .expect("clause heads are checked on construction");
        PredicateKey {
            name: name.clone(),
            arity,
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        for (i, goal) in self.body.iter().enumerate() {
            write!(f, "{}{goal}", if i == 0 { " <- " } else { ", " })?;
        }
        write!(f, ".")
    }
}

/// Clauses grouped by predicate, each group in declaration order.
///
/// Declaration order is resolution priority. The store is never mutated while
/// a query borrows it.
#[derive(Debug, Clone, Default)]
pub struct ClauseStore {
    clauses_by_pred: IndexMap<PredicateKey, Vec<Clause>>,
}

impl ClauseStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a clause after every clause already declared for its predicate
    pub fn add_clause(&mut self, clause: Clause) {
        let key = clause.key();
        debug!("declare {key}: {clause}");
        self.clauses_by_pred.entry(key).or_default().push(clause);
    }

    /// Clauses for `name/arity` in declaration order; empty if none exist
    #[must_use]
    pub fn lookup(&self, name: &str, arity: usize) -> &[Clause] {
        self.clauses_by_pred
            .get(&PredicateKey::new(name, arity))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Clauses for a predicate key; empty if none exist
    #[must_use]
    pub fn clauses(&self, key: &PredicateKey) -> &[Clause] {
        self.clauses_by_pred
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Declared predicates in order of first declaration
    pub fn predicates(&self) -> impl Iterator<Item = &PredicateKey> {
        self.clauses_by_pred.keys()
    }

    /// Every clause, grouped by predicate
    pub fn iter(&self) -> impl Iterator<Item = &Clause> {
        self.clauses_by_pred.values().flatten()
    }

    /// Total number of clauses
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses_by_pred.values().map(Vec::len).sum()
    }

    /// Returns true if no clause has been added
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses_by_pred.is_empty()
    }
}

impl Extend<Clause> for ClauseStore {
    fn extend<I: IntoIterator<Item = Clause>>(&mut self, clauses: I) {
        for clause in clauses {
            self.add_clause(clause);
        }
    }
}

impl FromIterator<Clause> for ClauseStore {
    fn from_iter<I: IntoIterator<Item = Clause>>(clauses: I) -> Self {
        let mut store = Self::new();
        store.extend(clauses);
        store
    }
}
