//! `ember-fixtures`: run JSON VM and state test fixtures against the
//! Ember EVM

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ember_evm_tests::{load_rules, FixtureConfig, TestRunner, TestStats};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Deeply nested fixtures recurse once per call frame
const RUNNER_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Run EVM JSON fixtures
#[derive(Parser, Debug, Clone)]
#[command(name = "ember-fixtures")]
#[command(about = "Run VM and state test fixtures against the Ember EVM")]
#[command(version)]
struct Cli {
    /// Fixture file, or directory searched recursively for .json files
    path: PathBuf,

    /// Fork whose rules apply (frontier, homestead, gas_reprice, diehard,
    /// atlantis, classic)
    #[arg(long, default_value = "homestead")]
    fork: String,

    /// JSON chain config overriding the fork's activation blocks
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only run tests whose name contains this
    #[arg(long)]
    filter: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let mut config = FixtureConfig::for_fork(&cli.fork)?.with_filter(cli.filter.clone());
    if let Some(path) = &cli.config {
        let rules = load_rules(path).with_context(|| format!("loading chain config {}", path.display()))?;
        config = config.with_rules(rules);
    }

    let path = cli.path.clone();
    let stats = std::thread::Builder::new()
        .name("fixtures".into())
        .stack_size(RUNNER_STACK_SIZE)
        .spawn(move || -> Result<TestStats> {
            let runner = TestRunner::new(config);
            runner
                .run_path(&path)
                .with_context(|| format!("running fixtures under {}", path.display()))
        })?
        .join()
        .map_err(|_| anyhow::anyhow!("fixture thread panicked"))??;

    stats.print_summary();
    Ok(if stats.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["ember-fixtures", "fixtures/VMTests"]);
        assert_eq!(cli.path, PathBuf::from("fixtures/VMTests"));
        assert_eq!(cli.fork, "homestead");
        assert!(cli.config.is_none());
        assert!(cli.filter.is_none());
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "ember-fixtures",
            "st.json",
            "--fork",
            "atlantis",
            "--config",
            "chain.json",
            "--filter",
            "sstore",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.fork, "atlantis");
        assert_eq!(cli.config, Some(PathBuf::from("chain.json")));
        assert_eq!(cli.filter.as_deref(), Some("sstore"));
        assert_eq!(cli.log_level, "debug");
    }
}
