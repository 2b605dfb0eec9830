use std::fmt;
use std::rc::Rc;

/// Shared, immutable symbol text.
pub type Name = Rc<str>;

/// Functor of a non-empty list cell.
pub const CONS: &str = "Cons";
/// Atom standing for the empty list.
pub const NIL: &str = "Nil";

/// Identity of a logic variable.
///
/// Inside a stored clause ids are clause-local (`0..var_count`); during
/// resolution they index the slots of a [`crate::Substitution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

impl VarId {
    /// Slot index of this variable.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_G{}", self.0)
    }
}

/// A first-order term.
///
/// Equality is structural; variables compare by identity, never by the name
/// they had in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A nullary symbol (e.g. `Z`, `Nil`)
    Atom(Name),
    /// A logic variable
    Var(VarId),
    /// A functor applied to one or more arguments (e.g. `(Fn a b)`)
    Compound(Name, Rc<[Term]>),
    /// An integer literal
    Int(i64),
    /// A string literal
    Str(Name),
}

impl Term {
    /// Builds an atom.
    #[must_use]
    pub fn atom(name: &str) -> Self {
        Self::Atom(Rc::from(name))
    }

    /// Builds a variable reference.
    #[must_use]
    pub fn var(id: u32) -> Self {
        Self::Var(VarId(id))
    }

    /// Builds a compound; an empty argument list yields an atom.
    #[must_use]
    pub fn compound(functor: &str, args: impl IntoIterator<Item = Term>) -> Self {
        let args: Rc<[Term]> = args.into_iter().collect();
        if args.is_empty() {
            Self::atom(functor)
        } else {
            Self::Compound(Rc::from(functor), args)
        }
    }

    /// Builds an integer literal.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Int(value)
    }

    /// Builds a string literal.
    #[must_use]
    pub fn string(text: &str) -> Self {
        Self::Str(Rc::from(text))
    }

    /// Builds a proper list `(Cons a (Cons b Nil))` from its elements.
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Term>) -> Self {
        Self::list_with_tail(items, Self::atom(NIL))
    }

    /// Builds a list whose final tail is `tail` instead of `Nil`.
    #[must_use]
    pub fn list_with_tail(items: impl IntoIterator<Item = Term>, tail: Term) -> Self {
        let items: Vec<Term> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(tail, |rest, head| Self::compound(CONS, [head, rest]))
    }

    /// Predicate name and arity when this term is usable as a goal or head.
    #[must_use]
    pub fn functor(&self) -> Option<(&Name, usize)> {
        match self {
            Self::Atom(name) => Some((name, 0)),
            Self::Compound(name, args) => Some((name, args.len())),
            Self::Var(_) | Self::Int(_) | Self::Str(_) => None,
        }
    }

    /// Shifts every variable id by `offset`, giving a clause-local term fresh
    /// identities in the substitution arena.
    #[must_use]
    pub fn rename(&self, offset: u32) -> Self {
        match self {
            Self::Var(VarId(id)) => Self::Var(VarId(id + offset)),
            Self::Compound(functor, args) => Self::Compound(
                functor.clone(),
                args.iter().map(|arg| arg.rename(offset)).collect(),
            ),
            Self::Atom(_) | Self::Int(_) | Self::Str(_) => self.clone(),
        }
    }

    /// Highest variable id occurring in the term, if any.
    #[must_use]
    pub fn max_var(&self) -> Option<VarId> {
        let mut max = None;
        let mut pending = vec![self];
        while let Some(term) = pending.pop() {
            match term {
                Self::Var(id) => max = max.max(Some(*id)),
                Self::Compound(_, args) => pending.extend(args.iter()),
                Self::Atom(_) | Self::Int(_) | Self::Str(_) => {}
            }
        }
        max
    }

    /// Elements of a proper list (`Nil`-terminated `Cons` chain), or `None`.
    #[must_use]
    pub fn list_elements(&self) -> Option<Vec<&Term>> {
        let mut items = Vec::new();
        let mut cursor = self;
        loop {
            match cursor {
                Self::Atom(name) if &**name == NIL => return Some(items),
                Self::Compound(functor, args) if &**functor == CONS && args.len() == 2 => {
                    items.push(&args[0]);
                    cursor = &args[1];
                }
                _ => return None,
            }
        }
    }
}

/// Debug-oriented notation; variables print by raw id. Use
/// [`crate::Renderer`] for canonical output.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(items) = self.list_elements() {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
            return write!(f, "]");
        }
        match self {
            Self::Atom(name) => write!(f, "{name}"),
            Self::Var(id) => write!(f, "{id}"),
            Self::Compound(functor, args) => {
                write!(f, "({functor}")?;
                for arg in args.iter() {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(text) => write!(f, "{text:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_without_args_is_atom() {
        assert_eq!(Term::compound("Z", []), Term::atom("Z"));
    }

    #[test]
    fn test_structural_equality() {
        let a = Term::compound("Fn", [Term::atom("A"), Term::var(0)]);
        let b = Term::compound("Fn", [Term::atom("A"), Term::var(0)]);
        let c = Term::compound("Fn", [Term::atom("A"), Term::var(1)]);
        assert_eq!(a, b);
        assert_ne!(a, c, "variables compare by identity");
        assert_ne!(Term::atom("A"), Term::string("A"));
    }

    #[test]
    fn test_list_sugar() {
        let list = Term::list([Term::int(1), Term::int(2)]);
        assert_eq!(
            list,
            Term::compound(
                CONS,
                [
                    Term::int(1),
                    Term::compound(CONS, [Term::int(2), Term::atom(NIL)])
                ]
            )
        );
        assert_eq!(list.list_elements().map(|items| items.len()), Some(2));
        assert_eq!(Term::atom(NIL).list_elements(), Some(vec![]));

        let open = Term::list_with_tail([Term::int(1)], Term::var(3));
        assert!(open.list_elements().is_none());
    }

    #[test]
    fn test_rename_shifts_every_variable() {
        let term = Term::compound("Bind", [Term::var(0), Term::atom("Z"), Term::var(2)]);
        let renamed = term.rename(10);
        assert_eq!(
            renamed,
            Term::compound("Bind", [Term::var(10), Term::atom("Z"), Term::var(12)])
        );
        assert_eq!(renamed.max_var(), Some(VarId(12)));
        assert_eq!(Term::atom("Z").max_var(), None);
    }

    #[test]
    fn test_functor_of_goals() {
        let goal = Term::compound("LookUp", [Term::var(0), Term::atom("Z"), Term::var(1)]);
        let (name, arity) = goal.functor().unwrap();
        assert_eq!((&**name, arity), ("LookUp", 3));
        assert_eq!(Term::atom("Main").functor().map(|(_, a)| a), Some(0));
        assert!(Term::var(0).functor().is_none());
    }

    #[test]
    fn test_display() {
        let list = Term::list([Term::atom("A"), Term::string("s")]);
        let term = Term::compound("Fn", [Term::var(4), list]);
        assert_eq!(term.to_string(), "(Fn _G4 [A, \"s\"])");
    }
}
