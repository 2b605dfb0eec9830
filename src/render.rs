//! Canonical display of solutions.
//!
//! Unbound variables carry arena ids that depend on how the search went, so
//! they are renamed `_.0`, `_.1`, ... in order of first occurrence. The same
//! query against the same rules therefore always prints the same text.

use std::fmt;

use indexmap::{IndexMap, IndexSet};

use crate::engine::Solution;
use crate::term::{Term, VarId};

/// How canonical variable numbers are shared between the variables of one
/// solution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Numbering {
    /// One numbering for the whole solution: a variable keeps its name in
    /// every binding it appears in.
    #[default]
    Shared,
    /// Numbering restarts at `_.0` for each reported variable.
    PerVariable,
}

/// Rendered bindings of one solution, sorted by variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedSolution {
    bindings: IndexMap<String, String>,
}

impl RenderedSolution {
    /// Rendered text for a variable
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    /// `(name, text)` pairs sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(name, text)| (name.as_str(), text.as_str()))
    }

    /// Number of rendered variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if nothing was rendered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Display for RenderedSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, text)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{name}: {text}")?;
        }
        Ok(())
    }
}

/// Turns solutions into canonical text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    numbering: Numbering,
}

impl Renderer {
    /// Create a renderer with the given numbering mode
    #[must_use]
    pub fn new(numbering: Numbering) -> Self {
        Self { numbering }
    }

    /// Renders every variable of `solution`.
    #[must_use]
    pub fn render(&self, solution: &Solution) -> RenderedSolution {
        let mut names: Vec<&str> = solution.iter().map(|(name, _)| name).collect();
        names.sort_unstable();
        self.render_sorted(solution, &names)
    }

    /// Renders only the listed variables; names the solution does not bind
    /// are skipped.
    #[must_use]
    pub fn render_vars(&self, solution: &Solution, names: &[&str]) -> RenderedSolution {
        let mut names: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| solution.get(name).is_some())
            .collect();
        names.sort_unstable();
        names.dedup();
        self.render_sorted(solution, &names)
    }

    fn render_sorted(&self, solution: &Solution, names: &[&str]) -> RenderedSolution {
        let mut canon = Canonical::default();
        let mut bindings = IndexMap::new();
        for name in names {
            let Some(term) = solution.get(name) else {
                continue;
            };
            if self.numbering == Numbering::PerVariable {
                canon = Canonical::default();
            }
            let mut text = String::new();
            canon.write(&mut text, term);
            bindings.insert((*name).to_string(), text);
        }
        RenderedSolution { bindings }
    }

    /// Renders a single term with its own numbering.
    #[must_use]
    pub fn render_term(term: &Term) -> String {
        let mut text = String::new();
        Canonical::default().write(&mut text, term);
        text
    }
}

/// Renders every variable of `solution` with shared numbering.
#[must_use]
pub fn render(solution: &Solution) -> RenderedSolution {
    Renderer::default().render(solution)
}

/// First-occurrence numbering of unbound variables.
#[derive(Debug, Default)]
struct Canonical {
    seen: IndexSet<VarId>,
}

impl Canonical {
    fn write(&mut self, out: &mut String, term: &Term) {
        if let Some(items) = term.list_elements() {
            out.push('[');
            for (i, item) in items.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                self.write(out, item);
            }
            out.push(']');
            return;
        }
        match term {
            Term::Atom(name) | Term::Str(name) => out.push_str(name),
            Term::Int(value) => out.push_str(&value.to_string()),
            Term::Var(var) => {
                let (index, _) = self.seen.insert_full(*var);
                out.push_str("_.");
                out.push_str(&index.to_string());
            }
            Term::Compound(functor, args) => {
                out.push('(');
                out.push_str(functor);
                for arg in args.iter() {
                    out.push(' ');
                    self.write(out, arg);
                }
                out.push(')');
            }
        }
    }
}
