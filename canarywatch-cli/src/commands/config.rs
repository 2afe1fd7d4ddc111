//! `canarywatch config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use canarywatch_core::config::CanarywatchConfig;
use canarywatch_core::error::CanarywatchError;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

const SECTIONS: &str = "general, scoring, metrics, rules, aliases";

/// Execute the `config` command.
///
/// `loaded` is the result of loading the effective configuration in `main`;
/// `validate` reports a failure instead of propagating it.
pub async fn execute(
    args: ConfigArgs,
    config_path: Option<&Path>,
    loaded: Result<CanarywatchConfig, CanarywatchError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let source = source_label(config_path);
    match args.action {
        ConfigAction::Validate => execute_validate(source, loaded, writer),
        ConfigAction::Show { section } => execute_show(source, loaded?, section, writer),
    }
}

fn source_label(config_path: Option<&Path>) -> String {
    config_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults + environment)".to_owned())
}

fn execute_validate(
    source: String,
    loaded: Result<CanarywatchConfig, CanarywatchError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(source = %source, "validating configuration");

    let report = match loaded {
        Ok(_) => ConfigValidationReport {
            source,
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source,
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    Ok(())
}

fn execute_show(
    source: String,
    config: CanarywatchConfig,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = build_show_report(source, &config, section)?;
    writer.render(&report)
}

/// Serialize the whole config or one section as TOML.
pub fn build_show_report(
    source: String,
    config: &CanarywatchConfig,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let rendered = match section.as_deref() {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("scoring") => toml::to_string_pretty(&config.scoring),
        Some("metrics") => toml::to_string_pretty(&config.metrics),
        Some("rules") => toml::to_string_pretty(&config.rules),
        Some("aliases") => toml::to_string_pretty(&config.aliases),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other, SECTIONS
            )));
        }
    };

    let config_toml =
        rendered.map_err(|e| CliError::Command(format!("failed to serialize config: {}", e)))?;
    let value = serde_json::to_value(config)?;
    let config_json = match &section {
        Some(name) => value.get(name).cloned().unwrap_or_default(),
        None => value,
    };

    Ok(ConfigReport {
        source,
        section,
        config: config_json,
        config_toml,
    })
}

/// Configuration display report.
///
/// Text output uses the TOML rendering; JSON output embeds the same values.
#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub config: serde_json::Value,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;
        Ok(())
    }
}

/// Configuration validation report.
#[derive(Debug, Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty when valid.
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_full_config_contains_all_sections() {
        let report = build_show_report("test".to_owned(), &CanarywatchConfig::default(), None)
            .expect("default config should serialize");
        for section in ["[general]", "[scoring]", "[metrics]", "[rules]", "[aliases]"] {
            assert!(report.config_toml.contains(section), "missing {}", section);
        }
        assert!(report.config["scoring"]["endpoint"].is_string());
    }

    #[test]
    fn test_show_single_section() {
        let report = build_show_report(
            "test".to_owned(),
            &CanarywatchConfig::default(),
            Some("rules".to_owned()),
        )
        .expect("rules section should serialize");
        assert!(report.config_toml.contains("canary_marker"));
        assert!(!report.config_toml.contains("endpoint"));
        assert_eq!(report.config["canary_marker"], "canary");
    }

    #[test]
    fn test_show_unknown_section_fails() {
        let err = build_show_report(
            "test".to_owned(),
            &CanarywatchConfig::default(),
            Some("ebpf".to_owned()),
        )
        .expect_err("unknown section");
        assert!(err.to_string().contains("unknown section"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_validation_report_render_invalid() {
        let report = ConfigValidationReport {
            source: "canarywatch.toml".to_owned(),
            valid: false,
            errors: vec!["invalid config value for 'scoring.concurrency'".to_owned()],
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let text = String::from_utf8(buffer).expect("utf-8");
        assert!(text.contains("INVALID"));
        assert!(text.contains("scoring.concurrency"));
    }

    #[test]
    fn test_source_label_without_path() {
        assert_eq!(source_label(None), "(defaults + environment)");
        assert_eq!(
            source_label(Some(Path::new("/etc/canarywatch.toml"))),
            "/etc/canarywatch.toml"
        );
    }
}
