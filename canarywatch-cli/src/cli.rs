//! CLI argument parsing using clap derive API
//!
//! This module is purely declarative with no side effects or I/O.
//! Flags given here take precedence over the config file and environment.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// canarywatch -- score, alert on, and evaluate security telemetry.
///
/// Use `canarywatch <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "canarywatch", version, about, long_about = None)]
pub struct Cli {
    /// Path to an optional canarywatch.toml configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Console report format. Artifacts on disk are always JSON.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score every event through the scoring endpoint and write detections as JSON Lines.
    Ingest(IngestArgs),

    /// Run the heuristic detection rules over an event file.
    Rules(RulesArgs),

    /// Compare detections against ground-truth labels.
    Evaluate(EvaluateArgs),

    /// Summarize one run, persist it locally and post it to the metrics sink.
    Summarize(SummarizeArgs),

    /// Inspect configuration.
    Config(ConfigArgs),
}

// ---- ingest ----

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Event file (JSON Lines, JSON array, or a single JSON object).
    #[arg(short, long, alias = "in", alias = "events")]
    pub input: PathBuf,

    /// Detections output file.
    #[arg(long, default_value = "detections.jsonl")]
    pub out: PathBuf,

    /// Per-request timeout in seconds (overrides scoring.timeout_secs).
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Maximum in-flight scoring requests (overrides scoring.concurrency).
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Scoring endpoint URL (overrides scoring.endpoint).
    #[arg(long)]
    pub endpoint: Option<String>,
}

// ---- rules ----

#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Event file to run the rules over.
    #[arg(short, long, alias = "in")]
    pub input: PathBuf,

    /// Alerts output file.
    #[arg(long, default_value = "alerts.json")]
    pub out: PathBuf,
}

// ---- evaluate ----

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Ground-truth file with event ids and labels.
    #[arg(long, alias = "ground-truth")]
    pub truth: PathBuf,

    /// Predictions file, usually the output of `ingest`.
    #[arg(long, default_value = "detections.jsonl")]
    pub pred: PathBuf,

    /// Also write the report to this file.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

// ---- summarize ----

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Run identifier, used in the summary file name.
    pub run_id: String,

    /// Raw event file of the run.
    #[arg(long)]
    pub raw: PathBuf,

    /// Processed detections file of the run.
    #[arg(long)]
    pub proc: PathBuf,

    /// Directory for `<run_id>_summary.json` (overrides metrics.out_dir).
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Metrics sink URL (overrides metrics.url).
    #[arg(long)]
    pub url: Option<String>,

    /// Metrics sink timeout in seconds (overrides metrics.timeout_secs).
    #[arg(long)]
    pub timeout: Option<f64>,
}

// ---- config ----

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the effective configuration and report errors.
    Validate,
    /// Show the effective configuration (defaults + file + env overrides).
    Show {
        /// Show only one section (general, scoring, metrics, rules, aliases).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ingest_defaults() {
        let cli = Cli::try_parse_from(["canarywatch", "ingest", "-i", "events.jsonl"])
            .expect("should parse ingest");
        match cli.command {
            Commands::Ingest(args) => {
                assert_eq!(args.input, PathBuf::from("events.jsonl"));
                assert_eq!(args.out, PathBuf::from("detections.jsonl"));
                assert!(args.timeout.is_none());
                assert!(args.concurrency.is_none());
                assert!(args.endpoint.is_none());
            }
            _ => panic!("expected Ingest command"),
        }
        assert!(cli.config.is_none());
        assert_eq!(cli.output, OutputFormat::Text);
    }

    #[test]
    fn test_ingest_input_aliases() {
        for flag in ["--input", "--in", "--events"] {
            let cli = Cli::try_parse_from(["canarywatch", "ingest", flag, "raw.json"])
                .unwrap_or_else(|e| panic!("{} should parse: {}", flag, e));
            match cli.command {
                Commands::Ingest(args) => assert_eq!(args.input, PathBuf::from("raw.json")),
                _ => panic!("expected Ingest command"),
            }
        }
    }

    #[test]
    fn test_ingest_overrides() {
        let cli = Cli::try_parse_from([
            "canarywatch",
            "ingest",
            "--in",
            "e.jsonl",
            "--out",
            "d.jsonl",
            "--timeout",
            "2.5",
            "--concurrency",
            "8",
            "--endpoint",
            "http://10.0.0.5:8080/v1/infer",
        ])
        .expect("should parse ingest with overrides");
        match cli.command {
            Commands::Ingest(args) => {
                assert_eq!(args.out, PathBuf::from("d.jsonl"));
                assert_eq!(args.timeout, Some(2.5));
                assert_eq!(args.concurrency, Some(8));
                assert_eq!(args.endpoint.as_deref(), Some("http://10.0.0.5:8080/v1/infer"));
            }
            _ => panic!("expected Ingest command"),
        }
    }

    #[test]
    fn test_ingest_requires_input() {
        let err = Cli::try_parse_from(["canarywatch", "ingest"]).expect_err("input is required");
        assert_eq!(err.exit_code(), 2, "usage errors exit with 2");
    }

    #[test]
    fn test_rules_defaults() {
        let cli = Cli::try_parse_from(["canarywatch", "rules", "--in", "events.jsonl"])
            .expect("should parse rules");
        match cli.command {
            Commands::Rules(args) => {
                assert_eq!(args.input, PathBuf::from("events.jsonl"));
                assert_eq!(args.out, PathBuf::from("alerts.json"));
            }
            _ => panic!("expected Rules command"),
        }
    }

    #[test]
    fn test_evaluate_ground_truth_alias() {
        let cli = Cli::try_parse_from(["canarywatch", "evaluate", "--ground-truth", "truth.jsonl"])
            .expect("should parse evaluate");
        match cli.command {
            Commands::Evaluate(args) => {
                assert_eq!(args.truth, PathBuf::from("truth.jsonl"));
                assert_eq!(args.pred, PathBuf::from("detections.jsonl"));
                assert!(args.out.is_none());
            }
            _ => panic!("expected Evaluate command"),
        }
    }

    #[test]
    fn test_summarize_positional_run_id() {
        let cli = Cli::try_parse_from([
            "canarywatch",
            "summarize",
            "run-42",
            "--raw",
            "raw.jsonl",
            "--proc",
            "detections.jsonl",
            "--url",
            "http://sink:9000/ingest",
        ])
        .expect("should parse summarize");
        match cli.command {
            Commands::Summarize(args) => {
                assert_eq!(args.run_id, "run-42");
                assert_eq!(args.raw, PathBuf::from("raw.jsonl"));
                assert_eq!(args.proc, PathBuf::from("detections.jsonl"));
                assert!(args.out_dir.is_none());
                assert_eq!(args.url.as_deref(), Some("http://sink:9000/ingest"));
            }
            _ => panic!("expected Summarize command"),
        }
    }

    #[test]
    fn test_summarize_requires_raw_and_proc() {
        let result = Cli::try_parse_from(["canarywatch", "summarize", "run-1", "--raw", "r.jsonl"]);
        assert!(result.is_err(), "--proc is required");
    }

    #[test]
    fn test_config_show_section() {
        let cli = Cli::try_parse_from(["canarywatch", "config", "show", "--section", "scoring"])
            .expect("should parse config show");
        match cli.command {
            Commands::Config(args) => match args.action {
                ConfigAction::Show { section } => assert_eq!(section.as_deref(), Some("scoring")),
                ConfigAction::Validate => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "canarywatch",
            "rules",
            "-i",
            "e.jsonl",
            "--output",
            "json",
            "--log-level",
            "debug",
            "--config",
            "/etc/canarywatch.toml",
        ])
        .expect("global flags should be accepted after the subcommand");
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/canarywatch.toml")));
    }

    #[test]
    fn test_invalid_output_format_rejected() {
        let result = Cli::try_parse_from(["canarywatch", "--output", "yaml", "config", "validate"]);
        assert!(result.is_err(), "unknown output format should be rejected");
    }
}
