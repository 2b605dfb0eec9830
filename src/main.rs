//! Hornlog CLI
//!
//! Runs the example blocks of rule files, or an ad-hoc query against them.
//!
//! - `hornlog rules/lambda.hl` - run every example block in the file
//! - `hornlog rules/lists.hl -q "Append xs ys [1, 2]"` - print each solution
//! - `hornlog rules/*.hl --fail-fast -vv` - stop at the first failure, with logs

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use hornlog::{ClauseStore, Numbering, Query, Renderer, Report, RuleFile, RunnerConfig};

#[derive(Debug, Parser)]
#[command(name = "hornlog")]
#[command(about = "Horn-clause resolution engine and example runner")]
#[command(version)]
struct Cli {
    /// Rule files to load
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Restart `_.N` numbering for each reported variable
    #[arg(long)]
    per_variable: bool,
    /// Stop at the first failing example block
    #[arg(long)]
    fail_fast: bool,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
    /// Run this query against all loaded files instead of their examples
    #[arg(short, long)]
    query: Option<String>,
    /// Maximum number of solutions to print for `--query` [default: 10]
    #[arg(short = 'n', long)]
    limit: Option<usize>,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> RunnerConfig {
        let numbering = if self.per_variable {
            Numbering::PerVariable
        } else {
            Numbering::Shared
        };
        let config = RunnerConfig::new()
            .with_numbering(numbering)
            .with_fail_fast(self.fail_fast);
        match self.limit {
            Some(limit) => config.with_limit(limit),
            None => config,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let files = cli
        .files
        .iter()
        .map(|path| load_file(path).map(|file| (path, file)))
        .collect::<Result<Vec<_>>>()?;

    let passed = match &cli.query {
        Some(text) => {
            let store: ClauseStore = files
                .iter()
                .flat_map(|(_, file)| file.store.iter().cloned())
                .collect();
            run_query(&store, text, &cli.config())?
        }
        None => run_examples(&files, &cli)?,
    };

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Info);
        }
        2 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

fn load_file(path: &Path) -> Result<RuleFile> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    RuleFile::parse(&source).with_context(|| format!("failed to load {}", path.display()))
}

fn run_examples(files: &[(&PathBuf, RuleFile)], cli: &Cli) -> Result<bool> {
    let config = cli.config();
    let mut report = Report::default();

    for (path, file) in files {
        let file_report = file.run(&config);
        if !cli.json {
            println!("{}", path.display());
            for outcome in &file_report.outcomes {
                println!("  {}", outcome.to_string().replace('\n', "\n  "));
            }
        }
        report.merge(file_report);
        if config.fail_fast && !report.all_passed() {
            break;
        }
    }

    if cli.json {
        print_json(&report)?;
    } else {
        println!("{report}");
    }
    Ok(report.all_passed())
}

#[cfg(feature = "serde")]
fn print_json(report: &Report) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[cfg(not(feature = "serde"))]
fn print_json(_report: &Report) -> Result<()> {
    anyhow::bail!("JSON output requires the `serde` feature")
}

fn run_query(store: &ClauseStore, text: &str, config: &RunnerConfig) -> Result<bool> {
    let query = Query::parse(text).with_context(|| format!("invalid query `{text}`"))?;
    let renderer = Renderer::new(config.numbering);
    let mut solutions = store.solve(&query);
    let mut found = 0;

    while found < config.limit {
        let Some(solution) = solutions.next() else {
            break;
        };
        let solution = solution.context("search failed")?;
        let rendered = renderer.render(&solution);
        if rendered.is_empty() {
            println!("yes");
        } else {
            println!("{rendered}");
        }
        found += 1;
    }

    if found == 0 {
        println!("no");
        for key in solutions.undefined_predicates() {
            eprintln!("undefined predicate: {key}");
        }
    }
    Ok(found > 0)
}
