//! Example blocks embedded in rule files.
//!
//! ```text
//! ## Member x a        # n=3
//! #. a: (Cons _.0 _.1); x: _.0
//! #. a: (Cons _.0 (Cons _.1 _.2)); x: _.1
//! #. a: (Cons _.0 (Cons _.1 (Cons _.2 _.3))); x: _.2
//! ```
//!
//! A `##` line holds a query and an optional `# key=value` comment
//! (`n=<count>` solutions to pull, `vars=a,b` variables to render). Each `#.`
//! line after it is the expected rendering of the next solution. A query with
//! no `#.` lines expects no solution at all. Lines starting with `###` are
//! disabled examples and are ignored.

use std::fmt;

use log::{debug, info};

use crate::config::RunnerConfig;
use crate::engine::{Query, Solution};
use crate::error::ParseError;
use crate::render::{RenderedSolution, Renderer};
use crate::store::ClauseStore;

/// Expected rendering of one solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expected {
    /// 1-based line of the `#.` line
    pub line: usize,
    /// `(variable, rendered term)` pairs in the order written
    pub bindings: Vec<(String, String)>,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, text)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{name}: {text}")?;
        }
        Ok(())
    }
}

/// A query with its expected solutions.
#[derive(Debug, Clone)]
pub struct Example {
    /// 1-based line of the `##` header
    pub line: usize,
    /// Query text as written
    pub source: String,
    /// Parsed query
    pub query: Query,
    /// Number of solutions to pull (`n=`); defaults to the expected count
    pub limit: Option<usize>,
    /// Variables to render (`vars=`); defaults to all named variables
    pub vars: Option<Vec<String>>,
    /// Expected solutions in order
    pub expected: Vec<Expected>,
}

/// Why an example block failed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum Failure {
    /// A variable rendered differently from the expected text
    Mismatch {
        /// 0-based solution index
        solution: usize,
        /// Variable name
        var: String,
        /// Expected rendering
        expected: String,
        /// Actual rendering
        actual: String,
    },
    /// The search ran out before an expected solution
    MissingSolution {
        /// 0-based solution index
        solution: usize,
        /// Expected rendering of the missing solution
        expected: String,
    },
    /// A solution was found where none was expected
    UnexpectedSolution {
        /// 0-based solution index
        solution: usize,
        /// Rendering of the extra solution
        actual: String,
    },
    /// An expected line names a variable that is not rendered
    UnknownVariable {
        /// 0-based solution index
        solution: usize,
        /// The unknown name
        var: String,
    },
    /// The engine reported an internal error
    Engine {
        /// Error description
        message: String,
    },
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch {
                solution,
                var,
                expected,
                actual,
            } => write!(
                f,
                "solution {}: {var}: expected `{expected}`, got `{actual}`",
                solution + 1
            ),
            Self::MissingSolution { solution, expected } => {
                write!(
                    f,
                    "solution {}: no solution, expected `{expected}`",
                    solution + 1
                )
            }
            Self::UnexpectedSolution { solution, actual } => {
                write!(f, "solution {}: unexpected `{actual}`", solution + 1)
            }
            Self::UnknownVariable { solution, var } => {
                write!(
                    f,
                    "solution {}: `{var}` is not a rendered query variable",
                    solution + 1
                )
            }
            Self::Engine { message } => write!(f, "engine error: {message}"),
        }
    }
}

/// Result of running one example block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Outcome {
    /// 1-based line of the `##` header
    pub line: usize,
    /// Query text as written
    pub query: String,
    /// Number of solutions pulled
    pub solutions: usize,
    /// Everything that went wrong; empty when the block passed
    pub failures: Vec<Failure>,
    /// Undefined predicates called during the search (e.g. `Lookup/3`)
    pub undefined: Vec<String>,
}

impl Outcome {
    /// Returns true if the block produced exactly what it expected
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed() { "PASS" } else { "FAIL" };
        write!(f, "{status} line {}: {}", self.line, self.query)?;
        for failure in &self.failures {
            write!(f, "\n    {failure}")?;
        }
        if !self.passed() && !self.undefined.is_empty() {
            write!(
                f,
                "\n    undefined predicates: {}",
                self.undefined.join(", ")
            )?;
        }
        Ok(())
    }
}

/// Outcomes of every example block that was run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Report {
    /// Per-block outcomes in file order
    pub outcomes: Vec<Outcome>,
}

impl Report {
    /// Runs `examples` against `store`.
    #[must_use]
    pub fn run(store: &ClauseStore, examples: &[Example], config: &RunnerConfig) -> Self {
        let mut outcomes = Vec::with_capacity(examples.len());
        for example in examples {
            let outcome = run_example(store, example, config);
            let failed = !outcome.passed();
            outcomes.push(outcome);
            if failed && config.fail_fast {
                break;
            }
        }
        Self { outcomes }
    }

    /// Number of passing blocks
    #[must_use]
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    /// Number of failing blocks
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    /// Returns true if no block failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Appends the outcomes of another report
    pub fn merge(&mut self, other: Report) {
        self.outcomes.extend(other.outcomes);
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} passed, {} failed", self.passed(), self.failed())
    }
}

/// Clauses and example blocks loaded from one rule file.
#[derive(Debug, Clone)]
pub struct RuleFile {
    /// The file's clauses
    pub store: ClauseStore,
    /// The file's example blocks
    pub examples: Vec<Example>,
}

impl RuleFile {
    /// Parses clauses and example blocks from rule-file text.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`] in a clause or example block.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let store = crate::load(source)?;
        let examples = extract_examples(source)?;
        debug!("found {} example blocks", examples.len());
        Ok(Self { store, examples })
    }

    /// Runs every example block against the file's clauses.
    #[must_use]
    pub fn run(&self, config: &RunnerConfig) -> Report {
        Report::run(&self.store, &self.examples, config)
    }
}

/// Collects the example blocks of rule-file text.
///
/// # Errors
///
/// Returns a [`ParseError`] for a malformed header, metadata, or expected
/// line, or for a `#.` line that follows no header.
pub fn extract_examples(source: &str) -> Result<Vec<Example>, ParseError> {
    let mut examples = Vec::new();
    let mut current: Option<Example> = None;

    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let text = raw.trim_start();
        let indent = raw.len() - text.len();

        if text.starts_with("###") {
            examples.extend(current.take());
        } else if let Some(rest) = text.strip_prefix("#.") {
            let Some(example) = current.as_mut() else {
                return Err(ParseError::at_line(
                    line,
                    "expected output without a preceding `##` query",
                ));
            };
            example.expected.push(parse_expected(line, rest)?);
        } else if let Some(rest) = text.strip_prefix("##") {
            examples.extend(current.take());
            current = Some(parse_header(line, indent + 2, rest)?);
        } else {
            examples.extend(current.take());
        }
    }
    examples.extend(current);
    Ok(examples)
}

fn parse_header(line: usize, column: usize, rest: &str) -> Result<Example, ParseError> {
    let (query_text, meta) = split_comment(rest);
    let query = Query::parse(query_text).map_err(|err| ParseError {
        line,
        column: column + err.column,
        message: err.message,
    })?;

    let mut limit = None;
    let mut vars = None;
    for entry in meta.split_whitespace() {
        match entry.split_once('=') {
            Some(("n", count)) => {
                let count = count.parse::<usize>().map_err(|_| {
                    ParseError::at_line(line, format!("invalid solution count `{count}`"))
                })?;
                limit = Some(count);
            }
            Some(("vars", names)) => {
                let names: Vec<String> = names
                    .split(',')
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect();
                if let Some(unknown) = names.iter().find(|name| query.var(name).is_none()) {
                    return Err(ParseError::at_line(
                        line,
                        format!("`{unknown}` is not a variable of the query"),
                    ));
                }
                vars = Some(names);
            }
            _ => {
                return Err(ParseError::at_line(
                    line,
                    format!("unknown example option `{entry}`"),
                ))
            }
        }
    }

    Ok(Example {
        line,
        source: query_text.trim().to_string(),
        query,
        limit,
        vars,
        expected: Vec::new(),
    })
}

/// Splits a header at the first `#` outside a string literal.
fn split_comment(text: &str) -> (&str, &str) {
    let mut in_string = false;
    for (pos, c) in text.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return (&text[..pos], &text[pos + 1..]),
            _ => {}
        }
    }
    (text, "")
}

fn parse_expected(line: usize, rest: &str) -> Result<Expected, ParseError> {
    let rest = rest.trim();
    let mut bindings = Vec::new();
    if !rest.is_empty() {
        for entry in rest.split("; ") {
            let Some((name, text)) = entry.split_once(':') else {
                return Err(ParseError::at_line(
                    line,
                    format!("expected `name: value`, found `{entry}`"),
                ));
            };
            bindings.push((name.trim().to_string(), text.trim().to_string()));
        }
    }
    Ok(Expected { line, bindings })
}

/// Runs one example block.
#[must_use]
pub fn run_example(store: &ClauseStore, example: &Example, config: &RunnerConfig) -> Outcome {
    let renderer = Renderer::new(config.numbering);
    let var_names: Option<Vec<&str>> = example
        .vars
        .as_ref()
        .map(|vars| vars.iter().map(String::as_str).collect());
    let render = |solution: &Solution| match &var_names {
        Some(names) => renderer.render_vars(solution, names),
        None => renderer.render(solution),
    };

    let mut solutions = store.solve(&example.query);
    let mut failures = Vec::new();
    let mut pulled = 0;
    // Without `n=` and with nothing expected, one pull shows whether the
    // query has a solution.
    let wanted = example
        .limit
        .unwrap_or_else(|| example.expected.len().max(1));

    while pulled < wanted {
        let solution = match solutions.next() {
            None => break,
            Some(Err(err)) => {
                failures.push(Failure::Engine {
                    message: err.to_string(),
                });
                break;
            }
            Some(Ok(solution)) => solution,
        };
        let rendered = render(&solution);
        match example.expected.get(pulled) {
            Some(expected) => compare(pulled, expected, &rendered, &mut failures),
            None => failures.push(Failure::UnexpectedSolution {
                solution: pulled,
                actual: rendered.to_string(),
            }),
        }
        pulled += 1;
    }

    for (index, expected) in example.expected.iter().enumerate().skip(pulled) {
        failures.push(Failure::MissingSolution {
            solution: index,
            expected: expected.to_string(),
        });
    }

    let outcome = Outcome {
        line: example.line,
        query: example.source.clone(),
        solutions: pulled,
        failures,
        undefined: solutions
            .undefined_predicates()
            .map(ToString::to_string)
            .collect(),
    };
    info!(
        "line {}: {} after {} steps",
        outcome.line,
        if outcome.passed() { "pass" } else { "fail" },
        solutions.steps()
    );
    outcome
}

fn compare(
    solution: usize,
    expected: &Expected,
    rendered: &RenderedSolution,
    failures: &mut Vec<Failure>,
) {
    for (var, text) in &expected.bindings {
        match rendered.get(var) {
            None => failures.push(Failure::UnknownVariable {
                solution,
                var: var.clone(),
            }),
            Some(actual) if actual == text => {}
            Some(actual) => failures.push(Failure::Mismatch {
                solution,
                var: var.clone(),
                expected: text.clone(),
                actual: actual.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Numbering;

    const LOOKUP_RULES: &str = include_str!("../rules/lookup.hl");
    const LAMBDA_RULES: &str = include_str!("../rules/lambda.hl");
    const LIST_RULES: &str = include_str!("../rules/lists.hl");

    fn run(source: &str) -> Report {
        RuleFile::parse(source)
            .unwrap()
            .run(&RunnerConfig::default())
    }

    fn assert_all_pass(report: &Report) {
        for outcome in &report.outcomes {
            assert!(outcome.passed(), "{outcome}");
        }
    }

    #[test]
    fn test_lookup_examples_pass() {
        let report = run(LOOKUP_RULES);
        assert!(report.outcomes.len() >= 2);
        assert_all_pass(&report);
    }

    #[test]
    fn test_lambda_examples_pass() {
        let report = run(LAMBDA_RULES);
        assert!(report.outcomes.len() >= 3);
        assert_all_pass(&report);
    }

    #[test]
    fn test_list_examples_pass() {
        let report = run(LIST_RULES);
        assert!(report.outcomes.len() >= 6);
        assert_all_pass(&report);
    }

    #[test]
    fn test_extract_header_options_and_expected_lines() {
        let source = "
            Member x (Cons x _).
            ## Member x a   # n=2 vars=x
            #. x: _.0
            #. x: _.0
            ### Member x []
            ###. x: 1
            ## Member q []
        ";
        let examples = extract_examples(source).unwrap();
        assert_eq!(examples.len(), 2);

        let first = &examples[0];
        assert_eq!(first.line, 3);
        assert_eq!(first.source, "Member x a");
        assert_eq!(first.limit, Some(2));
        assert_eq!(first.vars, Some(vec!["x".to_string()]));
        assert_eq!(first.expected.len(), 2);
        assert_eq!(first.expected[0].bindings, vec![("x".into(), "_.0".into())]);

        assert_eq!(examples[1].source, "Member q []");
        assert!(examples[1].expected.is_empty());
    }

    #[test]
    fn test_expected_line_without_header_is_an_error() {
        let err = extract_examples("Foo A.\n#. x: A\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_malformed_header_reports_its_line() {
        let err = extract_examples("\n\n## Member x (Cons\n").unwrap_err();
        assert_eq!(err.line, 3);
        let err = extract_examples("## Member x a # depth=3\n").unwrap_err();
        assert!(err.message.contains("depth=3"), "{err}");
        let err = extract_examples("## Member x a # vars=x,q\n").unwrap_err();
        assert!(err.message.contains("`q`"), "{err}");
    }

    #[test]
    fn test_mismatch_is_reported_per_variable() {
        let report = run("
            Id x x.
            ## Id A y
            #. y: B
        ");
        let outcome = &report.outcomes[0];
        assert!(!outcome.passed());
        assert_eq!(
            outcome.failures,
            vec![Failure::Mismatch {
                solution: 0,
                var: "y".into(),
                expected: "B".into(),
                actual: "A".into(),
            }]
        );
    }

    #[test]
    fn test_missing_and_unexpected_solutions() {
        let report = run("
            Pick A.
            Pick B.
            ## Pick x
            #. x: A
            #. x: B
            #. x: C
            ## Pick x   # n=2
            #. x: A
        ");
        assert_eq!(
            report.outcomes[0].failures,
            vec![Failure::MissingSolution {
                solution: 2,
                expected: "x: C".into(),
            }]
        );
        assert_eq!(
            report.outcomes[1].failures,
            vec![Failure::UnexpectedSolution {
                solution: 1,
                actual: "x: B".into(),
            }]
        );
        assert_eq!(report.failed(), 2);
    }

    #[test]
    fn test_no_expected_lines_means_no_solution() {
        let report = run("
            Pick A.
            ## Pick B
            ## Pick A
        ");
        assert!(report.outcomes[0].passed());
        assert!(!report.outcomes[1].passed());
    }

    #[test]
    fn test_explicit_zero_count_pulls_nothing() {
        let report = run("
            Pick A.
            ## Pick x   # n=0
        ");
        let outcome = &report.outcomes[0];
        assert!(outcome.passed(), "{outcome}");
        assert_eq!(outcome.solutions, 0);
    }

    #[test]
    fn test_undefined_predicate_is_surfaced() {
        let report = run("
            LookUp (Bind val _) Z val.
            ## Lookup (Bind A []) Z v
            #. v: A
        ");
        let outcome = &report.outcomes[0];
        assert!(!outcome.passed());
        assert_eq!(outcome.undefined, vec!["Lookup/3"]);
        let text = outcome.to_string();
        assert!(text.contains("undefined predicates: Lookup/3"), "{text}");
    }

    #[test]
    fn test_unknown_variable_in_expected_line() {
        let report = run("
            Pick A.
            ## Pick x
            #. y: A
        ");
        assert_eq!(
            report.outcomes[0].failures,
            vec![Failure::UnknownVariable {
                solution: 0,
                var: "y".into(),
            }]
        );
    }

    #[test]
    fn test_fail_fast_stops_after_first_failure() {
        let source = "
            Pick A.
            ## Pick B
            #.
            ## Pick A
        ";
        let file = RuleFile::parse(source).unwrap();
        let report = file.run(&RunnerConfig::new().with_fail_fast(true));
        assert_eq!(report.outcomes.len(), 1);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_per_variable_numbering_config() {
        let source = "
            Member x (Cons x _).
            Member x (Cons _ rest) <- Member x rest.
            ## Member x a   # n=2
            #. a: (Cons _.0 _.1); x: _.0
            #. a: (Cons _.0 (Cons _.1 _.2)); x: _.0
        ";
        let file = RuleFile::parse(source).unwrap();
        assert!(!file.run(&RunnerConfig::default()).all_passed());
        let config = RunnerConfig::new().with_numbering(Numbering::PerVariable);
        assert!(file.run(&config).all_passed());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_report_serializes_to_json() {
        let report = run("
            Pick A.
            ## Pick x
            #. x: B
        ");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"][0]["failures"][0]["kind"], "mismatch");
        assert_eq!(json["outcomes"][0]["failures"][0]["actual"], "A");
    }
}
