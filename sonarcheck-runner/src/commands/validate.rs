//! `sonarcheck validate` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use sonarcheck_core::config::HarnessConfig;

use crate::cli::{OutputFormat, ValidateArgs};
use crate::error::RunnerError;
use crate::output::{OutputWriter, Render};
use crate::scenario::ScenarioSuite;

/// Execute the `validate` command.
///
/// The configuration has already been loaded and validated by the time this
/// runs; the scenario file, when given, is loaded and validated here.
pub async fn execute(args: ValidateArgs, config: &HarnessConfig) -> Result<(), RunnerError> {
    let mut report = ValidationReport {
        server: config.server.image_ref(),
        scanner: config.scanner.image.clone(),
        auth_mode: config.auth.mode.clone(),
        scenarios: Vec::new(),
    };

    if let Some(path) = &args.scenarios {
        info!(path = %path.display(), "validating scenario catalogue");
        let suite = ScenarioSuite::load(path).await?;
        report.scenarios = suite
            .names()
            .into_iter()
            .map(|(kind, name)| format!("{kind} {name}"))
            .collect();
    }

    OutputWriter::new(OutputFormat::Text).render(&report)?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub server: String,
    pub scanner: String,
    pub auth_mode: String,
    pub scenarios: Vec<String>,
}

impl Render for ValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "configuration ok")?;
        writeln!(w, "  server:  {}", self.server)?;
        writeln!(w, "  scanner: {}", self.scanner)?;
        writeln!(w, "  auth:    {}", self.auth_mode)?;
        if !self.scenarios.is_empty() {
            writeln!(w, "{} scenarios:", self.scenarios.len())?;
            for s in &self.scenarios {
                writeln!(w, "  {s}")?;
            }
        }
        Ok(())
    }
}
