//! `temper`: a thin CLI wrapper around the orchestrator, for manual runs
//! and fixture generation. All state (baseline, Elo, replay rules) starts
//! from its documented defaults — the core never reads a store.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use temper_core::{DecisionEloState, ReplayRules, UserBaseline};
use temper_orchestrator::AnalyzeSessionInput;

#[derive(Parser)]
#[command(name = "temper", version, about = "Deterministic trading-behavior analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a CSV execution log, reconstruct sessions, and print the
    /// resulting `TemperReport`s as a JSON array.
    Analyze {
        /// Path to the CSV execution log.
        input: PathBuf,
        /// Identifier to stamp on every reconstructed session.
        #[arg(long, default_value = "default-user")]
        user_id: String,
        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },
    /// Run `analyze`, then project each report into its coach-facts payload.
    CoachFacts {
        input: PathBuf,
        #[arg(long, default_value = "default-user")]
        user_id: String,
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "temper=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze { input, user_id, pretty } => {
            let reports = analyze_file(&input, &user_id)?;
            print_json(&reports, pretty)
        }
        Command::CoachFacts { input, user_id, pretty } => {
            let reports = analyze_file(&input, &user_id)?;
            let facts: Vec<_> = reports.iter().map(temper_orchestrator::build_coach_facts).collect();
            print_json(&facts, pretty)
        }
    }
}

fn analyze_file(input: &PathBuf, user_id: &str) -> Result<Vec<temper_core::TemperReport>> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let parsed = temper_orchestrator::parse(&bytes);
    for error in &parsed.errors {
        tracing::warn!(row = error.row_index, message = %error.message, "skipped row");
    }
    if parsed.valid_rows == 0 {
        anyhow::bail!(temper_core::TemperError::EmptyInput);
    }

    let baseline = UserBaseline::default();
    let sessions = temper_orchestrator::reconstruct_sessions(user_id, &parsed.trades, &baseline);

    let mut elo = DecisionEloState::default();
    let rules = ReplayRules::default();
    let mut reports = Vec::with_capacity(sessions.len());

    for session in &sessions {
        let output = temper_orchestrator::analyze_session(AnalyzeSessionInput {
            session,
            baseline: &baseline,
            previous_elo: &elo,
            rules: &rules,
        })?;
        elo = output.new_elo;
        reports.push(output.report);
    }

    Ok(reports)
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
