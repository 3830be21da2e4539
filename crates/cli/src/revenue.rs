//! `revcohort run | validate | classify`: config-driven revenue cohorts.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use revcohort_revenue::load::{load_classifier, load_input, load_rules_file};
use revcohort_revenue::model::UnitReport;
use revcohort_revenue::{Classifier, PipelineConfig, RevenueError};

use crate::exit_codes::{revenue_exit_code, EXIT_ERROR, EXIT_REVENUE_RUNTIME, EXIT_USAGE};
use crate::CliError;

#[derive(Subcommand)]
pub enum RevenueCommands {
    /// Rank customers and select coverage cohorts from a TOML config file
    #[command(after_help = "\
Examples:
  revcohort run budget.toml
  revcohort run budget.toml --json
  revcohort run budget.toml --output cohorts.json
  revcohort run budget.toml --unit Kandy --json")]
    Run {
        /// Path to the pipeline .toml config file
        config: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Run a single configured unit
        #[arg(long, value_name = "NAME")]
        unit: Option<String>,
    },

    /// Validate a pipeline config and its rule set without running
    #[command(after_help = "\
Examples:
  revcohort validate budget.toml")]
    Validate {
        /// Path to the pipeline .toml config file
        config: PathBuf,
    },

    /// Tag customer names with the keyword classifier
    #[command(after_help = "\
Examples:
  revcohort classify \"Vodafone UK\" \"Telstra Corporation Ltd\"
  revcohort classify \"Comcast Cable\" --rules industries.toml --unit Kandy
  revcohort classify \"Starhub\" --json")]
    Classify {
        /// Customer names to classify
        #[arg(required = true)]
        names: Vec<String>,

        /// Rule set .toml file (defaults to the built-in regions)
        #[arg(long, value_name = "FILE")]
        rules: Option<PathBuf>,

        /// Unit name, enables unit-scoped rules
        #[arg(long, value_name = "HINT")]
        unit: Option<String>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_revenue(cmd: RevenueCommands) -> Result<(), CliError> {
    match cmd {
        RevenueCommands::Run { config, json, output, unit } => cmd_run(config, json, output, unit),
        RevenueCommands::Validate { config } => cmd_validate(config),
        RevenueCommands::Classify { names, rules, unit, json } => {
            cmd_classify(names, rules, unit, json)
        }
    }
}

fn revenue_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

impl From<RevenueError> for CliError {
    fn from(err: RevenueError) -> Self {
        let hint = match &err {
            RevenueError::MissingLedger { .. } => {
                Some("ledger paths resolve relative to the config file's directory".to_string())
            }
            RevenueError::MissingColumn { .. } => {
                Some("check the [ledgers.*.columns] mapping against the CSV header".to_string())
            }
            _ => None,
        };
        CliError { code: revenue_exit_code(&err), message: err.to_string(), hint }
    }
}

/// Read and validate a config; return it with the directory its paths resolve against.
fn load_config(config_path: &Path) -> Result<(PipelineConfig, PathBuf), CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| revenue_err(EXIT_REVENUE_RUNTIME, format!("cannot read config: {e}")))?;
    let config = PipelineConfig::from_toml(&config_str)?;

    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((config, base_dir))
}

fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    unit: Option<String>,
) -> Result<(), CliError> {
    let (mut config, base_dir) = load_config(&config_path)?;

    if let Some(ref name) = unit {
        config.restrict_to_unit(name).map_err(|e| {
            revenue_err(EXIT_USAGE, e.to_string())
                .with_hint("omit --unit to run every configured unit")
        })?;
    }

    let input = load_input(&config, &base_dir)?;
    let classifier = load_classifier(&config, &base_dir)?;
    let report = revcohort_revenue::run(&config, &classifier, &input)?;

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| revenue_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| revenue_err(EXIT_REVENUE_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    for unit in report.units.iter().chain(report.portfolio.as_ref()) {
        eprintln!("{}", summary_line(unit));
    }

    Ok(())
}

fn summary_line(unit: &UnitReport) -> String {
    let c = &unit.cohort;
    format!(
        "{}: {} customers, grand total {:.2}, cohort {} covering {:.1}% (target {:.0}%), {} at-risk subscription(s)",
        unit.unit,
        unit.summary.customer_count,
        c.grand_total,
        c.cohort_size,
        c.coverage_fraction_achieved * 100.0,
        c.coverage_fraction_target * 100.0,
        unit.summary.at_risk_subscriptions,
    )
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let classifier = load_classifier(&config, &base_dir)?;

    eprintln!(
        "valid: '{}' with {} unit(s), scope {}, coverage {}, rule set {} ({} rule(s))",
        config.name,
        config.units.len(),
        config.scope,
        config.coverage_fraction,
        classifier.version(),
        classifier.rules().rule_count(),
    );
    Ok(())
}

fn cmd_classify(
    names: Vec<String>,
    rules: Option<PathBuf>,
    unit: Option<String>,
    json_output: bool,
) -> Result<(), CliError> {
    let classifier = match rules {
        Some(ref path) => load_rules_file(path)?,
        None => Classifier::builtin()?,
    };

    let results = classifier.classify_all(names.iter().map(String::as_str), unit.as_deref());

    if json_output {
        let json_str = serde_json::to_string_pretty(&results)
            .map_err(|e| revenue_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        for r in &results {
            println!("{}\t{}\t{}", r.identity, r.tag, r.rule_id);
        }
    }

    log::debug!("classified {} name(s) with rule set {}", results.len(), classifier.version());
    Ok(())
}
