//! SLD resolution with backtracking.
//!
//! Goals are solved depth-first and left to right, trying clauses in
//! declaration order. Alternatives are kept on an explicit stack of choice
//! points rather than the native call stack, so the search can be paused
//! between solutions and deep derivations do not overflow.

use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace, warn};

use crate::error::{ParseError, Result};
use crate::parser;
use crate::store::{Clause, ClauseStore, PredicateKey};
use crate::subst::{Mark, Substitution};
use crate::term::{Name, Term, VarId};
use crate::unify::unify;

/// A conjunction of goals to prove (e.g. `Type (L x (V x)) [] t`)
#[derive(Debug, Clone)]
pub struct Query {
    goals: Vec<Term>,
    vars: IndexMap<Name, VarId>,
    var_count: usize,
}

impl Query {
    /// Create a query from goals whose variables are numbered from zero.
    ///
    /// `vars` names the variables reported in each solution; any other
    /// variable in `goals` (e.g. an anonymous one) is solved but not reported.
    #[must_use]
    pub fn new(goals: Vec<Term>, vars: IndexMap<Name, VarId>) -> Self {
        let var_count = goals
            .iter()
            .filter_map(Term::max_var)
            .chain(vars.values().copied())
            .max()
            .map_or(0, |max| max.index() + 1);
        Self {
            goals,
            vars,
            var_count,
        }
    }

    /// Parses query text such as `Member x [5, 7], Member x [7, 8]`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] for malformed text.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        parser::parse_query(source)
    }

    /// The goals, left to right
    #[must_use]
    pub fn goals(&self) -> &[Term] {
        &self.goals
    }

    /// Names of the reported variables in order of first occurrence
    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(|name| &**name)
    }

    /// The variable behind a name
    #[must_use]
    pub fn var(&self, name: &str) -> Option<VarId> {
        self.vars.get(name).copied()
    }

    /// Number of variables, named and anonymous
    #[must_use]
    pub fn var_count(&self) -> usize {
        self.var_count
    }
}

/// Bindings of a query's named variables for one proof.
///
/// Terms are fully applied; variables left in them are unbound and are
/// given canonical names by [`crate::Renderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    bindings: IndexMap<Name, Term>,
}

impl Solution {
    /// The term bound to a query variable
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.bindings.get(name)
    }

    /// Bindings in query order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.bindings.iter().map(|(name, term)| (&**name, term))
    }

    /// Number of reported variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if the query had no named variables
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Remaining goals as a persistent list, shared between choice points.
type Goals = Option<Rc<GoalNode>>;

#[derive(Debug)]
struct GoalNode {
    goal: Term,
    next: Goals,
}

fn push_goals(goals: impl DoubleEndedIterator<Item = Term>, rest: Goals) -> Goals {
    goals
        .rev()
        .fold(rest, |next, goal| Some(Rc::new(GoalNode { goal, next })))
}

/// A goal whose remaining clauses have not been tried yet.
#[derive(Debug)]
struct ChoicePoint<'s> {
    goal: Term,
    rest: Goals,
    clauses: &'s [Clause],
    next: usize,
    mark: Mark,
}

/// Lazy stream of solutions to a query.
///
/// Each call to [`Iterator::next`] resumes the search where the previous
/// solution was found. Dropping the iterator abandons the search; a rule set
/// whose search does not terminate makes `next` not return.
#[derive(Debug)]
pub struct Solutions<'s> {
    store: &'s ClauseStore,
    vars: IndexMap<Name, VarId>,
    subst: Substitution,
    choices: Vec<ChoicePoint<'s>>,
    start: Option<Goals>,
    undefined: IndexSet<PredicateKey>,
    steps: u64,
}

impl<'s> Solutions<'s> {
    fn new(store: &'s ClauseStore, query: &Query) -> Self {
        debug!(
            "solve {}",
            query
                .goals()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Self {
            store,
            vars: query.vars.clone(),
            subst: Substitution::with_vars(query.var_count()),
            choices: Vec::new(),
            start: Some(push_goals(query.goals.iter().cloned(), None)),
            undefined: IndexSet::new(),
            steps: 0,
        }
    }

    /// Predicates called so far that have no clauses.
    ///
    /// A call to an undefined predicate fails like any other goal; this list
    /// tells such failures apart from an honest lack of proofs.
    pub fn undefined_predicates(&self) -> impl Iterator<Item = &PredicateKey> {
        self.undefined.iter()
    }

    /// Number of goals expanded so far
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Bindings of the current proof state
    #[must_use]
    pub fn substitution(&self) -> &Substitution {
        &self.subst
    }

    /// Pushes a choice point for `goal`, or records why it cannot be called.
    fn expand(&mut self, goal: &Term, rest: Goals) {
        self.steps += 1;
        let store = self.store;
        let goal = self.subst.walk(goal).clone();

        let Some((name, arity)) = goal.functor() else {
            warn!("goal {goal} is not callable");
            return;
        };
        let key = PredicateKey {
            name: name.clone(),
            arity,
        };
        let clauses = store.clauses(&key);
        if clauses.is_empty() {
            debug!("undefined predicate {key}");
            self.undefined.insert(key);
            return;
        }

        trace!("call {goal} ({} candidates)", clauses.len());
        self.choices.push(ChoicePoint {
            goal,
            rest,
            clauses,
            next: 0,
            mark: self.subst.mark(),
        });
    }

    /// Resumes the most recent choice point that still has a matching clause
    /// and returns the goals to prove next.
    fn backtrack(&mut self) -> Option<Goals> {
        while let Some(mut choice) = self.choices.pop() {
            self.subst.undo(choice.mark);
            let clauses = choice.clauses;

            while let Some(clause) = clauses.get(choice.next) {
                choice.next += 1;
                let offset = self.subst.fresh_block(clause.var_count()).0;
                let head = clause.head.rename(offset);

                if unify(&choice.goal, &head, &mut self.subst) {
                    trace!("resolve {} with clause {}", choice.goal, choice.next - 1);
                    let goals = push_goals(
                        clause.body.iter().map(|goal| goal.rename(offset)),
                        choice.rest.clone(),
                    );
                    if choice.next < clauses.len() {
                        self.choices.push(choice);
                    }
                    return Some(goals);
                }
                self.subst.undo(choice.mark);
            }
        }
        debug!("search exhausted after {} steps", self.steps);
        None
    }

    fn solution(&self) -> Result<Solution> {
        let bindings = self
            .vars
            .iter()
            .map(|(name, var)| {
                self.subst
                    .apply(&Term::Var(*var))
                    .map(|term| (name.clone(), term))
            })
            .collect::<Result<_>>()?;
        Ok(Solution { bindings })
    }
}

impl Iterator for Solutions<'_> {
    type Item = Result<Solution>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut goals = match self.start.take() {
            Some(goals) => goals,
            None => self.backtrack()?,
        };
        loop {
            let Some(node) = goals else {
                return Some(self.solution());
            };
            self.expand(&node.goal, node.next.clone());
            goals = self.backtrack()?;
        }
    }
}

impl ClauseStore {
    /// Starts a lazy proof search for `query` against this store.
    #[must_use]
    pub fn solve<'s>(&'s self, query: &Query) -> Solutions<'s> {
        Solutions::new(self, query)
    }
}

/// Starts a lazy proof search for `query` against `store`.
#[must_use]
pub fn query<'s>(store: &'s ClauseStore, query: &Query) -> Solutions<'s> {
    store.solve(query)
}
