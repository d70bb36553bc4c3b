mod error_formatter;
mod formatter;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use formatter::Formatter;
use std::fs;
use std::path::{Path, PathBuf};
use tally::formula::{self, StaticResolver};
use tally::{Engine, GameState, ResourceLimits};
use tracing::debug;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Scoring formulas and rules for board-game scorekeeping.")]
#[command(
    long_about = "Tally evaluates scoring formulas, aggregates category totals and runs scoring rules.\nThe CLI works on single formulas or on a JSON snapshot of a scorekeeping store."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Maximum formula length in bytes
    #[arg(long, global = true)]
    max_formula_length: Option<usize>,

    /// Maximum parenthesis nesting depth
    #[arg(long, global = true)]
    max_depth: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a formula with reference bindings
    ///
    /// Bindings give each reference a number (format: name=value).
    /// Unbound references evaluate to 0.
    ///
    /// Examples:
    ///   tally eval "{cities} * 2 + {settlements}" cities=3 settlements=4
    ///   tally eval "max({a}, {b})" a=1 b=5
    Eval {
        /// Formula to evaluate
        formula: String,
        /// Reference bindings (format: name=value)
        bindings: Vec<String>,
        /// Output the bare number only (for piping to other tools)
        #[arg(short = 'r', long)]
        raw: bool,
    },
    /// Check that a formula compiles
    Validate {
        /// Formula to check
        formula: String,
    },
    /// List the references a formula reads
    Refs {
        /// Formula to inspect
        formula: String,
    },
    /// Show the scoreboard of a session
    ///
    /// Loads a JSON snapshot of the store and prints every player's category
    /// totals, total and the current winners.
    Score {
        /// JSON snapshot with sessions, templates, categories, entries, objects and rules
        state: PathBuf,
        /// Session to score (default: the first session in the snapshot)
        #[arg(short = 's', long)]
        session: Option<String>,
        /// Only count entries from this round
        #[arg(long)]
        round: Option<String>,
        /// Output JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Run one rule evaluation cycle for the latest entry
    ///
    /// Prints the entries the rules would append. Nothing is written back to
    /// the snapshot.
    Cycle {
        /// JSON snapshot of the store
        state: PathBuf,
        /// Session to evaluate (default: the first session in the snapshot)
        #[arg(short = 's', long)]
        session: Option<String>,
        /// Output JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Report template and session problems
    ///
    /// Checks formulas, category nesting, object definitions, object values
    /// and rules. Exits with an error when any issue is found.
    Check {
        /// JSON snapshot of the store
        state: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = Engine::with_limits(limits(&cli));

    let result = match &cli.command {
        Commands::Eval {
            formula,
            bindings,
            raw,
        } => eval_command(&engine, formula, bindings, *raw),
        Commands::Validate { formula } => validate_command(formula),
        Commands::Refs { formula } => refs_command(formula),
        Commands::Score {
            state,
            session,
            round,
            json,
        } => score_command(&engine, state, session.as_deref(), round.as_deref(), *json),
        Commands::Cycle {
            state,
            session,
            json,
        } => cycle_command(&engine, state, session.as_deref(), *json),
        Commands::Check { state } => check_command(&engine, state),
    };

    if let Err(e) = result {
        // Formula errors get a source excerpt, everything else a plain message
        if let Some(tally_err) = e.downcast_ref::<tally::TallyError>() {
            eprintln!("{}", error_formatter::format_error(tally_err));
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn limits(cli: &Cli) -> ResourceLimits {
    let defaults = ResourceLimits::default();
    ResourceLimits {
        max_formula_length: cli.max_formula_length.unwrap_or(defaults.max_formula_length),
        max_expression_depth: cli.max_depth.unwrap_or(defaults.max_expression_depth),
        ..defaults
    }
}

fn eval_command(engine: &Engine, formula_text: &str, bindings: &[String], raw: bool) -> Result<()> {
    let resolver = parse_bindings(bindings)?;
    let value = engine.evaluate_formula(formula_text, &resolver)?;

    let formatter = Formatter::default();
    print!("{}", formatter.format_value(formula_text, value, raw));
    Ok(())
}

fn validate_command(formula_text: &str) -> Result<()> {
    // Compile first so the error keeps its span for the report
    formula::compile(formula_text, &ResourceLimits::default())?;
    println!("Formula is valid");
    Ok(())
}

fn refs_command(formula_text: &str) -> Result<()> {
    formula::compile(formula_text, &ResourceLimits::default())?;
    for reference in formula::extract_references(formula_text) {
        println!("{}", reference);
    }
    Ok(())
}

fn score_command(
    engine: &Engine,
    path: &Path,
    session: Option<&str>,
    round: Option<&str>,
    json: bool,
) -> Result<()> {
    let state = load_state(path)?;
    let session_id = pick_session(&state, session)?;
    let scoreboard = engine.scoreboard(&state, &session_id, round)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scoreboard)?);
    } else {
        let formatter = Formatter::default();
        print!("{}", formatter.format_scoreboard(&state, &scoreboard));
    }
    Ok(())
}

fn cycle_command(engine: &Engine, path: &Path, session: Option<&str>, json: bool) -> Result<()> {
    let state = load_state(path)?;
    let session_id = pick_session(&state, session)?;
    let outcome = engine.run_cycle(&state, &session_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        let formatter = Formatter::default();
        print!("{}", formatter.format_cycle(&outcome));
    }
    Ok(())
}

fn check_command(engine: &Engine, path: &Path) -> Result<()> {
    let state = load_state(path)?;
    let issues = engine.check(&state);

    let formatter = Formatter::default();
    print!("{}", formatter.format_issues(&issues));
    if issues.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("{} issue(s) found", issues.len()))
    }
}

fn load_state(path: &Path) -> Result<GameState> {
    let json = fs::read_to_string(path)
        .map_err(|e| anyhow!("Cannot read '{}': {}", path.display(), e))?;
    let state = GameState::from_json(&json)?;
    debug!(
        sessions = state.sessions.len(),
        entries = state.entries.len(),
        "loaded state snapshot"
    );
    Ok(state)
}

/// The requested session, or the first one in the snapshot
fn pick_session(state: &GameState, requested: Option<&str>) -> Result<String> {
    match requested {
        Some(id) => Ok(id.to_string()),
        None => state
            .sessions
            .first()
            .map(|session| session.id.clone())
            .ok_or_else(|| anyhow!("The snapshot has no sessions")),
    }
}

/// Parse "name=value" bindings into a resolver
fn parse_bindings(bindings: &[String]) -> Result<StaticResolver> {
    let mut resolver = StaticResolver::new();
    for binding in bindings {
        let (name, value) = binding
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid binding '{}': expected name=value", binding))?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid number in binding '{}'", binding))?;
        resolver.insert(name.trim(), value);
    }
    Ok(resolver)
}
