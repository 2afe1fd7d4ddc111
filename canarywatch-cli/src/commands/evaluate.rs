//! `canarywatch evaluate` command handler

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use canarywatch_core::config::CanarywatchConfig;
use canarywatch_core::event::EventNormalizer;
use canarywatch_pipeline::evaluate::compute;
use canarywatch_pipeline::{EvaluationReport, write_report};

use crate::cli::EvaluateArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `evaluate` command.
pub async fn execute(
    args: EvaluateArgs,
    config: &CanarywatchConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let output = run(&args, config).await?;
    writer.render(&output)
}

/// Join predictions against ground truth and optionally persist the report.
pub async fn run(
    args: &EvaluateArgs,
    config: &CanarywatchConfig,
) -> Result<EvaluateOutput, CliError> {
    info!(
        truth = %args.truth.display(),
        pred = %args.pred.display(),
        "evaluating detections"
    );

    let normalizer = EventNormalizer::new(config.aliases.clone());
    let report = compute(&args.truth, &args.pred, &normalizer).await?.report();

    if let Some(out) = &args.out {
        write_report(out, &report).await?;
    }

    Ok(EvaluateOutput {
        written_to: args.out.clone(),
        report,
    })
}

/// Evaluation console output.
///
/// JSON output is the report object itself plus `written_to`.
#[derive(Debug, Serialize)]
pub struct EvaluateOutput {
    #[serde(flatten)]
    pub report: EvaluationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<PathBuf>,
}

impl Render for EvaluateOutput {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{}", self.report)?;
        if let Some(path) = &self.written_to {
            writeln!(w, "Wrote {}", path.display())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, body).await.expect("write fixture");
        path
    }

    #[tokio::test]
    async fn test_report_written_when_out_given() {
        let dir = tempfile::tempdir().expect("tempdir");
        let truth = write(
            &dir,
            "truth.jsonl",
            "{\"event_id\":\"e1\",\"label\":\"attack\"}\n{\"event_id\":\"e2\",\"label\":\"normal\"}\n",
        )
        .await;
        let pred = write(
            &dir,
            "detections.jsonl",
            "{\"event_id\":\"e1\",\"event_type\":\"file_encrypt\"}\n{\"event_id\":\"e2\",\"event_type\":\"file_read\"}\n",
        )
        .await;
        let out = dir.path().join("metrics.json");

        let args = EvaluateArgs {
            truth,
            pred,
            out: Some(out.clone()),
        };
        let output = run(&args, &CanarywatchConfig::default())
            .await
            .expect("evaluation should succeed");

        assert_eq!(output.report.tp, 1);
        assert_eq!(output.report.fp, 0);
        assert_eq!(output.report.fn_, 0);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).expect("report file"))
                .expect("report JSON");
        assert_eq!(written["TP"], 1);
        assert_eq!(written["pred_count"], 2);
        assert!(written.get("written_to").is_none());
    }

    #[tokio::test]
    async fn test_missing_truth_exits_with_config_code() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = EvaluateArgs {
            truth: dir.path().join("nope.jsonl"),
            pred: dir.path().join("detections.jsonl"),
            out: None,
        };
        let err = run(&args, &CanarywatchConfig::default())
            .await
            .expect_err("missing truth file");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_text_output_matches_report_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let truth = write(&dir, "truth.json", "[{\"event_id\":\"a\",\"label\":\"attack\"}]").await;
        let pred = write(&dir, "pred.jsonl", "{\"event_id\":\"a\",\"event_type\":\"file_read\"}\n").await;

        let args = EvaluateArgs {
            truth,
            pred,
            out: None,
        };
        let output = run(&args, &CanarywatchConfig::default())
            .await
            .expect("evaluation should succeed");

        let mut buffer = Vec::new();
        output.render_text(&mut buffer).expect("render");
        let text = String::from_utf8(buffer).expect("utf-8");
        assert!(text.starts_with("TP=0 FP=0 FN=1"), "got: {}", text);
    }
}
