//! Rule-file and query syntax.
//!
//! ```text
//! rule    := call ("<-" call ("," call)*)? "."
//! call    := Symbol term*
//! term    := "(" Symbol term* ")" | "[" (term ("," term)*)? "]"
//!          | Symbol | variable | _anon | integer | "string"
//! ```
//!
//! Identifiers are classified when parsed:
//!
//! - an uppercase initial makes a symbol (`Z`, `Fn`, `LookUp`),
//! - a lowercase initial makes a named variable, scoped to its clause or query,
//! - a `_` initial makes an anonymous variable, fresh at every occurrence.
//!
//! `#` starts a comment running to the end of the line, which is also how
//! example blocks (`##`, `#.`) stay invisible to the clause grammar.

use indexmap::IndexMap;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace1, not_line_ending, satisfy},
    combinator::{cut, eof, map, map_res, recognize, success, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{many0, many0_count, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser,
};

use crate::engine::Query;
use crate::error::ParseError;
use crate::store::Clause;
use crate::term::{Name, Term, VarId};

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Syntax tree of a term before its variables are numbered.
#[derive(Debug, Clone, PartialEq)]
enum Expr<'a> {
    Symbol(&'a str, Vec<Expr<'a>>),
    List(Vec<Expr<'a>>),
    Var(&'a str),
    Anon,
    Int(i64),
    Str(&'a str),
}

/// Parses a whole rule file into clauses, in file order.
///
/// # Errors
///
/// Returns the location of the first clause that does not parse.
pub fn parse_program(source: &str) -> Result<Vec<Clause>, ParseError> {
    let mut clauses = Vec::new();
    let mut rest = skip_ws(source);
    while !rest.is_empty() {
        let (next, (head, body)) = rule(rest).map_err(|err| to_parse_error(source, err))?;
        let mut scope = Scope::default();
        let head = scope.lower(&head);
        let body: Vec<Term> = body.iter().map(|goal| scope.lower(goal)).collect();
        clauses.push(Clause::new(head, body));
        rest = skip_ws(next);
    }
    Ok(clauses)
}

/// Parses a query: one or more comma-separated goals.
///
/// # Errors
///
/// Returns the location of the first syntax error.
pub fn parse_query(source: &str) -> Result<Query, ParseError> {
    let mut parser = terminated(calls, pair(ws, eof));
    let (_, goals) = parser(source).map_err(|err| to_parse_error(source, err))?;
    let mut scope = Scope::default();
    let goals: Vec<Term> = goals.iter().map(|goal| scope.lower(goal)).collect();
    Ok(Query::new(goals, scope.names))
}

/// Clause- or query-local variable numbering.
#[derive(Debug, Default)]
struct Scope {
    names: IndexMap<Name, VarId>,
    next: u32,
}

impl Scope {
    fn fresh(&mut self) -> VarId {
        let id = VarId(self.next);
        self.next += 1;
        id
    }

    fn lower(&mut self, expr: &Expr<'_>) -> Term {
        match expr {
            Expr::Symbol(name, args) => {
                let args: Vec<Term> = args.iter().map(|arg| self.lower(arg)).collect();
                Term::compound(name, args)
            }
            Expr::List(items) => {
                let items: Vec<Term> = items.iter().map(|item| self.lower(item)).collect();
                Term::list(items)
            }
            Expr::Var(name) => {
                if let Some(id) = self.names.get(*name) {
                    return Term::Var(*id);
                }
                let id = self.fresh();
                self.names.insert(Name::from(*name), id);
                Term::Var(id)
            }
            Expr::Anon => Term::Var(self.fresh()),
            Expr::Int(value) => Term::int(*value),
            Expr::Str(text) => Term::string(text),
        }
    }
}

fn skip_ws(input: &str) -> &str {
    match ws(input) {
        Ok((rest, ())) => rest,
        Err(_) => input,
    }
}

/// Whitespace and `#` comments.
fn ws(input: &str) -> PResult<'_, ()> {
    value(
        (),
        many0_count(alt((
            value((), multispace1),
            value((), pair(char('#'), not_line_ending)),
        ))),
    )(input)
}

fn token<'a, O, P>(parser: P) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    P: Parser<&'a str, O, VerboseError<&'a str>>,
{
    preceded(ws, parser)
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn symbol(input: &str) -> PResult<'_, &str> {
    let initial = satisfy(|c| c.is_ascii_uppercase());
    recognize(pair(initial, take_while(is_word)))(input)
}

fn variable(input: &str) -> PResult<'_, &str> {
    let initial = satisfy(|c| c.is_ascii_lowercase());
    recognize(pair(initial, take_while(is_word)))(input)
}

fn anonymous(input: &str) -> PResult<'_, &str> {
    recognize(pair(char('_'), take_while(is_word)))(input)
}

fn integer(input: &str) -> PResult<'_, i64> {
    map_res(digit1, str::parse::<i64>)(input)
}

fn string(input: &str) -> PResult<'_, &str> {
    delimited(
        char('"'),
        take_while(|c| c != '"'),
        context("closing '\"'", char('"')),
    )(input)
}

fn term(input: &str) -> PResult<'_, Expr<'_>> {
    context(
        "term",
        alt((
            preceded(
                token(char('(')),
                cut(terminated(
                    map(
                        pair(token(context("functor symbol", symbol)), many0(term)),
                        |(name, args)| Expr::Symbol(name, args),
                    ),
                    token(char(')')),
                )),
            ),
            preceded(
                token(char('[')),
                cut(terminated(
                    map(separated_list0(token(char(',')), term), Expr::List),
                    token(char(']')),
                )),
            ),
            map(token(symbol), |name| Expr::Symbol(name, Vec::new())),
            map(token(variable), Expr::Var),
            map(token(anonymous), |_| Expr::Anon),
            map(token(integer), Expr::Int),
            map(token(string), Expr::Str),
        )),
    )(input)
}

fn call(input: &str) -> PResult<'_, Expr<'_>> {
    map(
        pair(token(context("predicate symbol", symbol)), many0(term)),
        |(name, args)| Expr::Symbol(name, args),
    )(input)
}

fn calls(input: &str) -> PResult<'_, Vec<Expr<'_>>> {
    separated_list1(token(char(',')), call)(input)
}

fn rule(input: &str) -> PResult<'_, (Expr<'_>, Vec<Expr<'_>>)> {
    let (input, head) = context("clause head", call)(input)?;
    let (input, body) = alt((
        preceded(token(tag("<-")), cut(context("clause body", calls))),
        success(Vec::new()),
    ))(input)?;
    let (input, _) = cut(token(char('.')))(input)?;
    Ok((input, (head, body)))
}

fn to_parse_error(source: &str, err: nom::Err<VerboseError<&str>>) -> ParseError {
    let errors = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.errors,
        nom::Err::Incomplete(_) => {
            return ParseError::at_offset(source, source.len(), "unexpected end of input")
        }
    };
    let Some((remaining, _)) = errors.first() else {
        return ParseError::at_offset(source, 0, "syntax error");
    };
    let offset = source.len() - remaining.len();

    let message = errors
        .iter()
        .find_map(|(_, kind)| match kind {
            VerboseErrorKind::Char(c) => Some(format!("expected '{c}'")),
            VerboseErrorKind::Context(what) => Some(format!("expected {what}")),
            VerboseErrorKind::Nom(_) => None,
        })
        .unwrap_or_else(|| "unexpected input".to_string());
    let found = remaining.lines().next().unwrap_or_default().trim();
    if found.is_empty() {
        ParseError::at_offset(source, offset, format!("{message}, found end of input"))
    } else {
        let found: String = found.chars().take(20).collect();
        ParseError::at_offset(source, offset, format!("{message}, found `{found}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(source: &str) -> Clause {
        let mut clauses = parse_program(source).unwrap();
        assert_eq!(clauses.len(), 1, "expected a single clause in {source:?}");
        clauses.remove(0)
    }

    #[test]
    fn test_fact_with_compound_args() {
        let clause = parse_one("LookUp (Bind val _) Z val.");
        assert!(clause.is_fact());
        assert_eq!(
            clause.head,
            Term::compound(
                "LookUp",
                [
                    Term::compound("Bind", [Term::var(0), Term::var(1)]),
                    Term::atom("Z"),
                    Term::var(0),
                ]
            )
        );
        assert_eq!(clause.var_count(), 2);
    }

    #[test]
    fn test_rule_shares_variables_between_head_and_body() {
        let clause = parse_one("LookUp (Bind _ r) (S x) val <- LookUp r x val.");
        assert_eq!(clause.body.len(), 1);
        assert_eq!(
            clause.body[0],
            Term::compound("LookUp", [Term::var(1), Term::var(2), Term::var(3)])
        );
        assert_eq!(clause.var_count(), 4);
    }

    #[test]
    fn test_anonymous_variables_are_distinct() {
        let clause = parse_one("Pair _ _x _.");
        assert_eq!(
            clause.head,
            Term::compound("Pair", [Term::var(0), Term::var(1), Term::var(2)])
        );
    }

    #[test]
    fn test_lists_literals_and_comments() {
        let source = r#"
            # a comment line
            Data [1, "two", Three] [] x.   # trailing comment
            ## Data a b c
            #. a: [1, two, Three]
        "#;
        let clause = parse_one(source);
        assert_eq!(
            clause.head,
            Term::compound(
                "Data",
                [
                    Term::list([Term::int(1), Term::string("two"), Term::atom("Three")]),
                    Term::atom("Nil"),
                    Term::var(0),
                ]
            )
        );
    }

    #[test]
    fn test_nullary_predicates_and_parenthesised_atoms() {
        let clauses = parse_program("Main <- Go (Z).\nGo Z.").unwrap();
        assert_eq!(clauses[0].head, Term::atom("Main"));
        assert_eq!(clauses[0].body[0], Term::compound("Go", [Term::atom("Z")]));
        assert_eq!(clauses[1].key().to_string(), "Go/1");
    }

    #[test]
    fn test_multi_goal_body_keeps_order() {
        let clause = parse_one("Type (C f a) env t <- Type f env (Fn at t), Type a env at.");
        assert_eq!(clause.body.len(), 2);
        assert_eq!(
            clause.body[1],
            Term::compound("Type", [Term::var(1), Term::var(2), Term::var(4)])
        );
    }

    #[test]
    fn test_query_records_named_variables() {
        let query = parse_query("Member x [5, 7], Member x [7, _]").unwrap();
        assert_eq!(query.goals().len(), 2);
        assert_eq!(query.var_names().collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(query.var_count(), 2);
    }

    #[test]
    fn test_missing_period_is_reported() {
        let err = parse_program("Foo a.\nBar b").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("expected '.'"), "{err}");
    }

    #[test]
    fn test_unclosed_compound_is_reported() {
        let err = parse_program("Foo (Bar a.\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("expected ')'"), "{err}");
    }

    #[test]
    fn test_lowercase_predicate_is_rejected() {
        let err = parse_program("foo A.").unwrap_err();
        assert_eq!((err.line, err.column), (1, 1));
        assert!(err.message.contains("predicate symbol"), "{err}");
    }

    #[test]
    fn test_identifiers_are_ascii() {
        let err = parse_program("Foo é.").unwrap_err();
        assert_eq!((err.line, err.column), (1, 5));
        assert!(parse_program("Émile a.").is_err());
        assert!(parse_program("Foo xé.").is_err());
        assert_eq!(parse_one("Foo x_1 Y2.").var_count(), 1);
    }

    #[test]
    fn test_query_rejects_trailing_garbage() {
        assert!(parse_query("Member x [1] ]").is_err());
        assert!(parse_query("").is_err());
    }
}
