//! `canarywatch summarize` command handler

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use canarywatch_core::config::CanarywatchConfig;
use canarywatch_core::event::EventNormalizer;
use canarywatch_core::types::RunSummary;
use canarywatch_pipeline::summary::summarize_files;
use canarywatch_pipeline::{ForwardOutcome, MetricsForwarder, SummaryWriter};

use crate::cli::SummarizeArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `summarize` command.
///
/// A failed post to the metrics sink is reported but never changes the exit status.
pub async fn execute(
    args: SummarizeArgs,
    config: &CanarywatchConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = effective_config(&args, config)?;
    let report = run(&args, &config).await?;
    writer.render(&report)
}

/// Apply `--out-dir`, `--url` and `--timeout` to a copy of the config.
pub fn effective_config(
    args: &SummarizeArgs,
    config: &CanarywatchConfig,
) -> Result<CanarywatchConfig, CliError> {
    let mut config = config.clone();
    if let Some(out_dir) = &args.out_dir {
        config.metrics.out_dir = out_dir.display().to_string();
    }
    if let Some(url) = &args.url {
        config.metrics.url = url.clone();
    }
    if let Some(timeout) = args.timeout {
        config.metrics.timeout_secs = timeout;
    }
    config.validate()?;
    Ok(config)
}

/// Summarize, persist locally, then forward.
pub async fn run(
    args: &SummarizeArgs,
    config: &CanarywatchConfig,
) -> Result<SummarizeReport, CliError> {
    let normalizer = EventNormalizer::new(config.aliases.clone());
    let summary = summarize_files(&args.run_id, &args.raw, &args.proc, &normalizer).await?;

    let path = SummaryWriter::new(&config.metrics.out_dir)
        .persist(&summary)
        .await?;

    let outcome = match MetricsForwarder::from_config(&config.metrics) {
        Ok(forwarder) => forwarder.forward(&summary).await,
        Err(e) => {
            warn!(url = %config.metrics.url, error = %e, "failed to build metrics forwarder");
            ForwardOutcome::Failed {
                reason: e.to_string(),
            }
        }
    };

    info!(
        run_id = %summary.run_id,
        packets = summary.llm_packets,
        forwarded = outcome.is_success(),
        "run summarized"
    );

    let (forwarded, forward_error) = match outcome {
        ForwardOutcome::Succeeded { .. } => (true, None),
        ForwardOutcome::Failed { reason } => (false, Some(reason)),
    };

    Ok(SummarizeReport {
        path,
        url: config.metrics.url.clone(),
        forwarded,
        forward_error,
        summary,
    })
}

/// Summarize console output.
#[derive(Debug, Serialize)]
pub struct SummarizeReport {
    pub path: PathBuf,
    pub url: String,
    pub forwarded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_error: Option<String>,
    pub summary: RunSummary,
}

impl Render for SummarizeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let s = &self.summary;
        writeln!(w, "Run summary: {}", s.run_id.bold())?;
        writeln!(w, "  File reads:   {}", s.file_reads)?;
        writeln!(w, "  File writes:  {}", s.file_writes)?;
        writeln!(w, "  LLM packets:  {}", s.llm_packets)?;
        writeln!(w, "  LLM bytes:    {}", s.llm_total_bytes)?;
        writeln!(w, "  Packet rate:  {:.3}/s", s.llm_packet_rate)?;
        writeln!(w, "Wrote local summary: {}", self.path.display())?;

        match &self.forward_error {
            None => writeln!(w, "Posted metrics to {}", self.url.green())?,
            Some(reason) => writeln!(
                w,
                "{} failed to post metrics to {}: {}",
                "warning:".yellow().bold(),
                self.url,
                reason
            )?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> SummarizeArgs {
        SummarizeArgs {
            run_id: "run-7".to_owned(),
            raw: PathBuf::from("raw.jsonl"),
            proc: PathBuf::from("detections.jsonl"),
            out_dir: None,
            url: None,
            timeout: None,
        }
    }

    #[test]
    fn test_flags_override_metrics_section() {
        let mut args = args();
        args.out_dir = Some(PathBuf::from("/var/lib/canarywatch/metrics"));
        args.url = Some("http://sink:9000/ingest".to_owned());
        args.timeout = Some(1.5);

        let config = effective_config(&args, &CanarywatchConfig::default())
            .expect("overrides should validate");
        assert_eq!(config.metrics.out_dir, "/var/lib/canarywatch/metrics");
        assert_eq!(config.metrics.url, "http://sink:9000/ingest");
        assert!((config.metrics.timeout_secs - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_out_dir_is_metrics() {
        let config =
            effective_config(&args(), &CanarywatchConfig::default()).expect("defaults are valid");
        assert_eq!(config.metrics.out_dir, "metrics");
    }

    #[test]
    fn test_empty_url_is_a_config_error() {
        let mut args = args();
        args.url = Some(String::new());
        let err = effective_config(&args, &CanarywatchConfig::default())
            .expect_err("empty url is invalid");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_unbuildable_forwarder_still_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let raw = dir.path().join("raw.jsonl");
        let proc = dir.path().join("detections.jsonl");
        tokio::fs::write(&raw, "{\"event_type\":\"file_write\"}\n")
            .await
            .expect("write raw");
        tokio::fs::write(&proc, "{\"event_id\":\"1\"}\n")
            .await
            .expect("write proc");

        let mut args = args();
        args.raw = raw;
        args.proc = proc;
        args.out_dir = Some(dir.path().join("metrics"));
        // finite and positive, but too large for a Duration
        args.timeout = Some(1e300);

        let config = effective_config(&args, &CanarywatchConfig::default()).expect("valid");
        let report = run(&args, &config)
            .await
            .expect("forwarder failure must not fail the command");

        assert!(!report.forwarded);
        assert!(report.forward_error.is_some());
        assert!(report.path.exists());
    }

    #[tokio::test]
    async fn test_unreachable_sink_still_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let raw = dir.path().join("raw.jsonl");
        let proc = dir.path().join("detections.jsonl");
        tokio::fs::write(&raw, "{\"event_type\":\"file_read\"}\n{\"event_type\":\"file_write\"}\n")
            .await
            .expect("write raw");
        tokio::fs::write(
            &proc,
            "{\"event_id\":\"1\",\"timestamp\":\"2025-01-01T00:00:00Z\",\"llm_req_bytes\":10,\"llm_resp_bytes\":5}\n",
        )
        .await
        .expect("write proc");

        let mut args = args();
        args.raw = raw;
        args.proc = proc;
        args.out_dir = Some(dir.path().join("metrics"));
        // Port 9 (discard) is not expected to accept HTTP on the loopback interface.
        args.url = Some("http://127.0.0.1:9/ingest".to_owned());
        args.timeout = Some(1.0);

        let config = effective_config(&args, &CanarywatchConfig::default()).expect("valid");
        let report = run(&args, &config).await.expect("summarize should succeed");

        assert!(!report.forwarded);
        assert!(report.forward_error.is_some());
        assert!(report.path.ends_with("run-7_summary.json"));
        assert!(report.path.exists());
        assert_eq!(report.summary.file_reads, 1);
        assert_eq!(report.summary.file_writes, 1);
        assert_eq!(report.summary.llm_packets, 1);
        assert_eq!(report.summary.llm_total_bytes, 15);
    }
}
