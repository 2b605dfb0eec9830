//! Substitutions as an arena of variable slots.
//!
//! Every variable live during a proof search owns one slot. A slot is either
//! unbound or bound to a term, and a binding is never overwritten while the
//! proof path that made it is active. Every binding is recorded on a trail,
//! so backtracking to a [`Mark`] unbinds the trailed suffix and truncates the
//! arena back to its earlier high-water mark.

use indexmap::IndexSet;
use smallvec::{smallvec, SmallVec};

use crate::error::{EngineError, Result};
use crate::term::{Name, Term, VarId};

/// Pending step of [`Substitution::apply`].
enum Apply<'a> {
    Visit(&'a Term),
    /// Wraps the last `arity` built terms in a compound
    Build(&'a Name, usize),
    /// Ends the expansion of the innermost bound variable
    Leave,
}

/// Snapshot of a substitution that can be restored with [`Substitution::undo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    slots: usize,
    trail: usize,
}

/// Variable bindings built up during unification and resolution.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    slots: Vec<Option<Term>>,
    trail: Vec<VarId>,
}

impl Substitution {
    /// Create an empty substitution with no variables allocated
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a substitution with `count` unbound variables `0..count`
    #[must_use]
    pub fn with_vars(count: usize) -> Self {
        let mut subst = Self::new();
        subst.fresh_block(count);
        subst
    }

    /// Allocates `count` unbound variables and returns the id of the first one.
    ///
    /// A clause with clause-local variables `0..count` is instantiated by
    /// renaming it with the returned offset.
    ///
    /// # Panics
    ///
    /// Panics if the arena outgrows the `u32` id space.
    pub fn fresh_block(&mut self, count: usize) -> VarId {
        let base = u32::try_from(self.slots.len()).expect("variable arena exhausted");
        self.slots.resize(self.slots.len() + count, None);
        VarId(base)
    }

    /// Number of allocated variables.
    #[must_use]
    pub fn var_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of bindings currently in effect.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.trail.len()
    }

    /// The term `var` is directly bound to, if any.
    #[must_use]
    pub fn lookup(&self, var: VarId) -> Option<&Term> {
        self.slots.get(var.index()).and_then(Option::as_ref)
    }

    /// Binds an unbound variable.
    pub(crate) fn bind(&mut self, var: VarId, term: Term) {
        debug_assert!(self.lookup(var).is_none(), "rebinding {var}");
        if var.index() >= self.slots.len() {
            self.slots.resize(var.index() + 1, None);
        }
        self.slots[var.index()] = Some(term);
        self.trail.push(var);
    }

    /// Follows variable bindings from `term` until reaching an unbound
    /// variable or a non-variable term.
    #[must_use]
    pub fn walk<'a>(&'a self, mut term: &'a Term) -> &'a Term {
        while let Term::Var(var) = term {
            match self.lookup(*var) {
                Some(bound) => term = bound,
                None => break,
            }
        }
        term
    }

    /// Replaces every bound variable in `term`, at any depth, leaving only
    /// unbound variables.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CyclicBinding`] when a variable is reached again
    /// while its own binding is being expanded.
    pub fn apply(&self, term: &Term) -> Result<Term> {
        // Variables whose bindings are being expanded, innermost last
        let mut expanding = IndexSet::<VarId>::new();
        let mut tasks: SmallVec<[Apply<'_>; 16]> = smallvec![Apply::Visit(term)];
        let mut built: Vec<Term> = Vec::new();

        while let Some(task) = tasks.pop() {
            match task {
                Apply::Visit(term) => match term {
                    Term::Var(var) => match self.lookup(*var) {
                        None => built.push(term.clone()),
                        Some(bound) => {
                            if !expanding.insert(*var) {
                                return Err(EngineError::CyclicBinding { var: *var });
                            }
                            tasks.push(Apply::Leave);
                            tasks.push(Apply::Visit(bound));
                        }
                    },
                    Term::Compound(functor, args) => {
                        tasks.push(Apply::Build(functor, args.len()));
                        tasks.extend(args.iter().rev().map(Apply::Visit));
                    }
                    Term::Atom(_) | Term::Int(_) | Term::Str(_) => built.push(term.clone()),
                },
                Apply::Leave => {
                    expanding.pop();
                }
                Apply::Build(functor, arity) => {
                    let args = built.split_off(built.len() - arity);
                    built.push(Term::Compound(functor.clone(), args.into()));
                }
            }
        }
        Ok(built.pop().unwrap_or_else(|| term.clone()))
    }

    /// Current state, for a later [`Substitution::undo`].
    #[must_use]
    pub fn mark(&self) -> Mark {
        Mark {
            slots: self.slots.len(),
            trail: self.trail.len(),
        }
    }

    /// Discards every binding and variable made since `mark`.
    pub fn undo(&mut self, mark: Mark) {
        for var in self.trail.drain(mark.trail..) {
            if let Some(slot) = self.slots.get_mut(var.index()) {
                *slot = None;
            }
        }
        self.slots.truncate(mark.slots);
    }
}
