//! `canarywatch rules` command handler

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use canarywatch_core::config::CanarywatchConfig;
use canarywatch_core::event::EventNormalizer;
use canarywatch_core::types::{Alert, Severity};
use canarywatch_pipeline::{EventReader, RuleEngine, write_alerts};

use crate::cli::RulesArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Alerts listed in text output before the rest are elided.
const TEXT_ALERT_LIMIT: usize = 20;

/// Execute the `rules` command.
pub async fn execute(
    args: RulesArgs,
    config: &CanarywatchConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = run(&args, config).await?;
    writer.render(&report)
}

/// Run every configured rule over the input and write the alerts file.
pub async fn run(args: &RulesArgs, config: &CanarywatchConfig) -> Result<RulesReport, CliError> {
    let mut events =
        EventReader::open(&args.input, EventNormalizer::new(config.aliases.clone())).await?;
    let mut engine = RuleEngine::from_config(&config.rules);

    info!(
        input = %args.input.display(),
        rules = ?engine.rule_ids(),
        "applying detection rules"
    );

    let alerts = engine.apply_rules(events.by_ref());
    write_alerts(&args.out, &alerts).await?;

    let mut by_rule = BTreeMap::new();
    for alert in &alerts {
        *by_rule.entry(alert.rule.clone()).or_insert(0u64) += 1;
    }

    Ok(RulesReport {
        input: args.input.clone(),
        output: args.out.clone(),
        rules: engine.rule_ids().into_iter().map(str::to_owned).collect(),
        total: alerts.len(),
        by_rule,
        malformed_lines: events.malformed_lines(),
        skipped_records: events.skipped_records(),
        alerts,
    })
}

/// Rule run report.
#[derive(Debug, Serialize)]
pub struct RulesReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rules: Vec<String>,
    pub total: usize,
    pub by_rule: BTreeMap<String, u64>,
    pub malformed_lines: usize,
    pub skipped_records: usize,
    /// Already written to `output`; omitted from the JSON report.
    #[serde(skip)]
    pub alerts: Vec<Alert>,
}

impl Render for RulesReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Rules: {} ({} active)",
            self.input.display().to_string().bold(),
            self.rules.join(", ")
        )?;

        if self.alerts.is_empty() {
            writeln!(w, "  {}", "No alerts".green())?;
        } else {
            writeln!(w, "  Alerts: {}", self.total.to_string().bold())?;
            for (rule, count) in &self.by_rule {
                writeln!(w, "    {:<20} {}", rule, count)?;
            }
            writeln!(w)?;
            for alert in self.alerts.iter().take(TEXT_ALERT_LIMIT) {
                let severity = match alert.severity {
                    Severity::Critical | Severity::High => alert.severity.to_string().red().bold(),
                    Severity::Medium => alert.severity.to_string().yellow().bold(),
                    _ => alert.severity.to_string().normal(),
                };
                writeln!(
                    w,
                    "  [{}] {} {} {}",
                    severity,
                    alert.rule,
                    alert.timestamp.as_deref().unwrap_or("-"),
                    alert.description
                )?;
            }
            if self.alerts.len() > TEXT_ALERT_LIMIT {
                writeln!(w, "  ... {} more", self.alerts.len() - TEXT_ALERT_LIMIT)?;
            }
        }

        writeln!(w, "Wrote {}", self.output.display())?;
        Ok(())
    }
}
