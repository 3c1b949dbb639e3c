//! reimburse: command-line estimator for trip reimbursements
//!
//! Loads the historical corpus once, then answers a single query:
//! - `reimburse <days> <miles> <receipts>` prints the rounded estimate
//! - `reimburse explain ...` prints the ensemble breakdown
//! - `reimburse eval` scores the engine against labelled cases
//! - `reimburse info` describes the corpus and configuration

mod cli;
mod config;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing::{debug, info, warn};

use cli::{Cli, Commands, TripArgs};
use config::Config;
use reimburse_engine::corpus::load_labeled_cases;
use reimburse_engine::{Query, ReimbursementEngine};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.command.is_none() && cli.trip().is_none() {
        Cli::command().print_help()?;
        std::process::exit(1);
    }

    let engine_directive = if cli.verbose {
        "reimburse_engine=debug"
    } else {
        "reimburse_engine=warn"
    };

    // Logs go to stderr so stdout carries only results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reimburse=info".parse()?)
                .add_directive(engine_directive.parse()?),
        )
        .init();

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    if let Some(corpus) = &cli.corpus {
        config.corpus.path = corpus.clone();
    }
    debug!(config = %cli.config.display(), corpus = %config.corpus.path.display(), "Configuration resolved");

    let engine_config = config.engine_config(&cli.variant)?;
    let engine = ReimbursementEngine::from_path(&config.corpus.path, engine_config)
        .with_context(|| format!("cannot start without corpus {}", config.corpus.path.display()))?;

    match cli.command {
        Some(Commands::Explain(trip)) => {
            let query = query_from(trip)?;
            warn_out_of_range(&engine, &query);
            print!("{}", engine.predict_detailed(&query).explain());
        }
        Some(Commands::Eval { cases, worst }) => {
            let path = cases.unwrap_or_else(|| config.corpus.path.clone());
            info!(path = %path.display(), "Evaluating");
            let labeled = load_labeled_cases(&path)
                .with_context(|| format!("failed to read cases {}", path.display()))?;
            print!("{}", engine.evaluate(&labeled, worst));
        }
        Some(Commands::Info) => {
            let summary = engine.summary();
            println!("Corpus:        {}", config.corpus.path.display());
            println!("Cases:         {}", summary.cases);
            println!("Days:          {} - {}", summary.min_days, summary.max_days);
            println!("Miles:         {} - {}", summary.min_distance, summary.max_distance);
            println!("Receipts:      {:.2} - {:.2}", summary.min_expense, summary.max_expense);
            println!("Mean outcome:  {:.2}", summary.mean_outcome);
            println!("Density cells: {}", engine.predictor().density().bucket_count());
            println!("\n[engine]\n{}", toml::to_string_pretty(engine.config())?);
        }
        None => {
            let trip = cli.trip().context("missing trip arguments")?;
            let query = query_from(trip)?;
            warn_out_of_range(&engine, &query);
            println!("{:.2}", engine.predict(&query));
        }
    }

    Ok(())
}

fn query_from(trip: TripArgs) -> anyhow::Result<Query> {
    Ok(Query::new(trip.days, trip.miles, trip.receipts)?)
}

/// Log each input lying well outside the corpus; the estimate still runs.
fn warn_out_of_range(engine: &ReimbursementEngine, query: &Query) -> usize {
    let warnings = engine.check_range(query);
    for warning in &warnings {
        warn!(%warning, "Input significantly outside training range");
    }
    warnings.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reimburse_engine::{EngineConfig, LabeledCase, TrainingCorpus};

    fn engine() -> ReimbursementEngine {
        let corpus = TrainingCorpus::from_labeled(&[
            LabeledCase::new(3, 93.0, 1.42, 364.51),
            LabeledCase::new(5, 800.0, 1000.0, 1500.0),
        ])
        .unwrap();
        ReimbursementEngine::new(corpus, EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_out_of_range_inputs_are_reported() {
        let engine = engine();
        let inside = Query::new(4, 500.0, 900.0).unwrap();
        assert_eq!(warn_out_of_range(&engine, &inside), 0);

        let outside = Query::new(20, 500.0, 5000.0).unwrap();
        assert_eq!(warn_out_of_range(&engine, &outside), 2);
    }
}
