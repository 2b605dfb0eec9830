//! Robinson unification over a [`Substitution`].
//!
//! No occurs check is performed: `x` unifies with `(S x)` and produces a
//! cyclic binding. The rule sets this engine targets were written against
//! occurs-check-free unification; [`Substitution::apply`] reports any cycle
//! that reaches a rendered answer.

use log::trace;
use smallvec::{smallvec, SmallVec};

use crate::subst::Substitution;
use crate::term::Term;

/// Unifies `left` and `right`, extending `subst` with the bindings needed.
///
/// Returns `false` when the terms do not unify; `subst` is then exactly as it
/// was on entry.
pub fn unify(left: &Term, right: &Term, subst: &mut Substitution) -> bool {
    let mark = subst.mark();
    if unify_pairs(left, right, subst) {
        true
    } else {
        subst.undo(mark);
        false
    }
}

fn unify_pairs(left: &Term, right: &Term, subst: &mut Substitution) -> bool {
    // Pairs still to unify; arguments are pushed in reverse so they are
    // visited left to right.
    let mut pending: SmallVec<[(Term, Term); 16]> = smallvec![(left.clone(), right.clone())];

    while let Some((left, right)) = pending.pop() {
        let left = subst.walk(&left).clone();
        let right = subst.walk(&right).clone();

        match (&left, &right) {
            (Term::Var(a), Term::Var(b)) if a == b => {}
            (Term::Var(var), other) | (other, Term::Var(var)) => {
                subst.bind(*var, other.clone());
            }
            (Term::Atom(a), Term::Atom(b)) | (Term::Str(a), Term::Str(b)) => {
                if a != b {
                    trace!("clash: {a} vs {b}");
                    return false;
                }
            }
            (Term::Int(a), Term::Int(b)) => {
                if a != b {
                    trace!("clash: {a} vs {b}");
                    return false;
                }
            }
            (Term::Compound(f, xs), Term::Compound(g, ys)) => {
                if f != g || xs.len() != ys.len() {
                    trace!("clash: {f}/{} vs {g}/{}", xs.len(), ys.len());
                    return false;
                }
                pending.extend(xs.iter().cloned().zip(ys.iter().cloned()).rev());
            }
            _ => {
                trace!("clash: {left} vs {right}");
                return false;
            }
        }
    }
    true
}
