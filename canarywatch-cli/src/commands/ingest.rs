//! `canarywatch ingest` command handler

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use canarywatch_core::config::CanarywatchConfig;
use canarywatch_core::event::EventNormalizer;
use canarywatch_pipeline::{IngestPipeline, IngestStats, ScoringClient};

use crate::cli::IngestArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `ingest` command.
///
/// Flag overrides are applied on top of the loaded configuration and the
/// result is validated again before any request is sent.
pub async fn execute(
    args: IngestArgs,
    config: &CanarywatchConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = effective_config(&args, config)?;
    let report = run(&args, &config).await?;
    writer.render(&report)
}

/// Apply `--endpoint`, `--timeout` and `--concurrency` to a copy of the config.
pub fn effective_config(
    args: &IngestArgs,
    config: &CanarywatchConfig,
) -> Result<CanarywatchConfig, CliError> {
    let mut config = config.clone();
    if let Some(endpoint) = &args.endpoint {
        config.scoring.endpoint = endpoint.clone();
    }
    if let Some(timeout) = args.timeout {
        config.scoring.timeout_secs = timeout;
    }
    if let Some(concurrency) = args.concurrency {
        config.scoring.concurrency = concurrency;
    }
    config.validate()?;
    Ok(config)
}

/// Score the input file and build the report.
pub async fn run(args: &IngestArgs, config: &CanarywatchConfig) -> Result<IngestReport, CliError> {
    info!(
        input = %args.input.display(),
        output = %args.out.display(),
        endpoint = %config.scoring.endpoint,
        "starting ingestion"
    );

    let client = ScoringClient::from_config(&config.scoring)?;
    let stats = IngestPipeline::new(client)
        .with_concurrency(config.scoring.concurrency)
        .run_files(
            &args.input,
            &args.out,
            EventNormalizer::new(config.aliases.clone()),
        )
        .await?;

    Ok(IngestReport {
        input: args.input.clone(),
        output: args.out.clone(),
        endpoint: config.scoring.endpoint.clone(),
        concurrency: config.scoring.concurrency,
        stats,
    })
}

/// Ingestion run report.
#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub endpoint: String,
    pub concurrency: usize,
    #[serde(flatten)]
    pub stats: IngestStats,
}

impl Render for IngestReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Ingestion: {}", self.input.display().to_string().bold())?;
        writeln!(w, "  Endpoint:     {}", self.endpoint)?;
        writeln!(w, "  Concurrency:  {}", self.concurrency)?;
        writeln!(w, "  Events read:  {}", self.stats.events_read)?;
        writeln!(w, "  Detections:   {}", self.stats.detections_written)?;

        let errors = self.stats.scoring_errors.to_string();
        if self.stats.scoring_errors > 0 {
            writeln!(w, "  Scoring errors: {}", errors.yellow().bold())?;
        } else {
            writeln!(w, "  Scoring errors: {}", errors.green())?;
        }
        if self.stats.malformed_lines > 0 || self.stats.skipped_records > 0 {
            writeln!(
                w,
                "  Skipped:      {} malformed line(s), {} non-object record(s)",
                self.stats.malformed_lines, self.stats.skipped_records
            )?;
        }
        writeln!(w, "Wrote {}", self.output.display())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> IngestArgs {
        IngestArgs {
            input: PathBuf::from("events.jsonl"),
            out: PathBuf::from("detections.jsonl"),
            timeout: None,
            concurrency: None,
            endpoint: None,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut args = args();
        args.endpoint = Some("http://10.0.0.5:8080/v1/infer".to_owned());
        args.timeout = Some(2.5);
        args.concurrency = Some(6);

        let config = effective_config(&args, &CanarywatchConfig::default())
            .expect("overrides should validate");
        assert_eq!(config.scoring.endpoint, "http://10.0.0.5:8080/v1/infer");
        assert!((config.scoring.timeout_secs - 2.5).abs() < f64::EPSILON);
        assert_eq!(config.scoring.concurrency, 6);
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let base = CanarywatchConfig::default();
        let config = effective_config(&args(), &base).expect("defaults are valid");
        assert_eq!(config.scoring.endpoint, base.scoring.endpoint);
        assert_eq!(config.scoring.concurrency, base.scoring.concurrency);
    }

    #[test]
    fn test_zero_concurrency_is_a_config_error() {
        let mut args = args();
        args.concurrency = Some(0);
        let err = effective_config(&args, &CanarywatchConfig::default())
            .expect_err("zero concurrency is invalid");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_negative_timeout_is_a_config_error() {
        let mut args = args();
        args.timeout = Some(-1.0);
        let err = effective_config(&args, &CanarywatchConfig::default())
            .expect_err("negative timeout is invalid");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_report_json_flattens_stats() {
        let report = IngestReport {
            input: PathBuf::from("e.jsonl"),
            output: PathBuf::from("d.jsonl"),
            endpoint: "http://127.0.0.1:8080/v1/infer".to_owned(),
            concurrency: 1,
            stats: IngestStats {
                events_read: 4,
                detections_written: 4,
                scoring_errors: 1,
                skipped_records: 0,
                malformed_lines: 2,
            },
        };
        let json = serde_json::to_value(&report).expect("serializable");
        assert_eq!(json["events_read"], 4);
        assert_eq!(json["scoring_errors"], 1);
        assert_eq!(json["output"], "d.jsonl");
    }
}
